// ---------------------------------------------------------------------------
// Module transformer: one source file to one executable ES module
// ---------------------------------------------------------------------------
//
// Files are parsed with tree-sitter (TSX grammar for .tsx/.jsx/.js, the
// TypeScript grammar for .ts), then re-emitted: type-only syntax is erased,
// JSX is lowered to `__jsx(...)` calls and every import specifier is rewritten
// to an absolute tree path, a runtime module, or a failing sentinel.
// ---------------------------------------------------------------------------

mod emit;
mod jsx;
mod refs;

use std::collections::BTreeSet;

use tree_sitter::{Language, Node, Parser};
use uigen_vfs::path::extension;

use crate::config::PreviewConfig;
use crate::diagnostic::Diagnostic;
use crate::error::PreviewError;
use crate::resolve::is_code_file;

use emit::Emitter;
use refs::References;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedImport {
	pub specifier: String,
	/// Import-map key the specifier was rewritten to.
	pub key: String,
	pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedModule {
	pub path: String,
	pub code: String,
	/// Stylesheets referenced by this file, first-seen order.
	pub css_imports: Vec<String>,
	pub diagnostics: Vec<Diagnostic>,
	/// Local modules this file imports.
	pub dependencies: Vec<String>,
	pub unresolved: Vec<UnresolvedImport>,
	/// Set when `code` is a placeholder that throws on load.
	pub failed: bool,
}

impl TransformedModule {
	/// A module standing in for a file that could not be compiled.
	pub fn failed(path: &str, diagnostic: Diagnostic) -> Self {
		let location = match (diagnostic.line, diagnostic.column) {
			(Some(line), Some(column)) => format!(" ({}:{})", line, column),
			_ => String::new(),
		};
		let message = format!("{}{}: {}", path, location, diagnostic.message);
		Self {
			path: path.to_string(),
			code: failing_module("SyntaxError", &message),
			css_imports: Vec::new(),
			diagnostics: vec![diagnostic],
			dependencies: Vec::new(),
			unresolved: Vec::new(),
			failed: true,
		}
	}
}

/// Transform one code file. `known` holds every file path in the tree and is
/// used to resolve local imports.
pub fn transform(
	path: &str,
	source: &str,
	known: &BTreeSet<String>,
	config: &PreviewConfig,
) -> Result<TransformedModule, PreviewError> {
	if !is_code_file(path) {
		return Err(PreviewError::UnsupportedFileType(path.to_string()));
	}

	let language = if extension(path) == Some("ts") {
		Language::from(tree_sitter_typescript::LANGUAGE_TYPESCRIPT)
	} else {
		Language::from(tree_sitter_typescript::LANGUAGE_TSX)
	};
	let mut parser = Parser::new();
	parser
		.set_language(&language)
		.map_err(|e| PreviewError::Parser(e.to_string()))?;
	let tree = parser
		.parse(source, None)
		.ok_or_else(|| PreviewError::Parser(format!("no syntax tree produced for {}", path)))?;

	let root = tree.root_node();
	if let Some(bad) = first_error(root) {
		let diagnostic = syntax_diagnostic(path, source, bad);
		tracing::debug!(path, message = %diagnostic.message, "syntax error");
		return Ok(TransformedModule::failed(path, diagnostic));
	}

	let refs = References::collect(root, source);
	let mut emitter = Emitter::new(source, path, known, config, refs);
	emitter.emit(root);
	let module = emitter.finish();
	tracing::debug!(
		path,
		dependencies = module.dependencies.len(),
		diagnostics = module.diagnostics.len(),
		"transformed module"
	);
	Ok(module)
}

/// Source of a module that throws `message` as soon as it is evaluated.
pub fn failing_module(error_type: &str, message: &str) -> String {
	format!("throw new {}({});\nexport {{}};\n", error_type, quote(message))
}

pub(crate) fn quote(value: &str) -> String {
	serde_json::Value::String(value.to_string()).to_string()
}

// ---------------------------------------------------------------------------
// Syntax errors
// ---------------------------------------------------------------------------

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
	if node.is_error() || node.is_missing() {
		return Some(node);
	}
	if !node.has_error() {
		return None;
	}
	emit::children(node).into_iter().find_map(first_error)
}

fn syntax_diagnostic(path: &str, source: &str, node: Node<'_>) -> Diagnostic {
	let pos = node.start_position();
	let message = if node.is_missing() {
		format!("Syntax error: expected '{}'", node.kind())
	} else {
		let text = &source[node.start_byte()..node.end_byte()];
		let snippet: String = text
			.lines()
			.map(str::trim)
			.find(|line| !line.is_empty())
			.unwrap_or("")
			.chars()
			.take(24)
			.collect();
		if snippet.is_empty() {
			"Syntax error: unexpected end of input".to_string()
		} else {
			format!("Syntax error: unexpected '{}'", snippet)
		}
	};
	Diagnostic::error(path, message).at(pos.row + 1, pos.column + 1)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostic::Severity;

	fn known(paths: &[&str]) -> BTreeSet<String> {
		paths.iter().map(|p| p.to_string()).collect()
	}

	fn run(path: &str, source: &str, files: &[&str]) -> TransformedModule {
		transform(path, source, &known(files), &PreviewConfig::default()).unwrap()
	}

	// -- File kinds --

	#[test]
	fn non_code_files_are_rejected() {
		let err = transform("/styles.css", "a{}", &known(&[]), &PreviewConfig::default())
			.unwrap_err();
		assert_eq!(err, PreviewError::UnsupportedFileType("/styles.css".into()));
	}

	#[test]
	fn plain_javascript_passes_through() {
		let src = "export const add = (a, b) => a + b;\n";
		let module = run("/math.js", src, &[]);
		assert_eq!(module.code, src);
		assert!(module.diagnostics.is_empty());
		assert!(!module.failed);
	}

	// -- TypeScript erasure --

	#[test]
	fn erases_annotations_and_generics() {
		let module = run(
			"/util.ts",
			"export function id<T>(value: T, label?: string): T {\n  return value as T;\n}\n",
			&[],
		);
		assert!(!module.code.contains(": T"));
		assert!(!module.code.contains("<T>"));
		assert!(!module.code.contains(" as "));
		assert!(!module.code.contains("label?"));
		assert!(module.code.contains("function id(value, label)"));
		assert!(module.code.contains("return value"));
	}

	#[test]
	fn drops_interfaces_and_type_aliases() {
		let module = run(
			"/types.ts",
			"interface Props {\n  title: string;\n}\ntype Id = string;\nexport type Alias = number;\nexport const x = 1;\n",
			&[],
		);
		assert!(!module.code.contains("interface"));
		assert!(!module.code.contains("type "));
		assert!(module.code.contains("export const x = 1;"));
		assert_eq!(module.code.matches('\n').count(), 6);
	}

	#[test]
	fn drops_type_only_imports() {
		let module = run(
			"/App.tsx",
			"import type { Props } from './types';\nimport { type Id, useState } from 'react';\nexport default useState;\n",
			&["/types.ts"],
		);
		assert!(!module.code.contains("types"));
		assert!(module.code.contains("import { useState } from 'react';"));
		assert!(module.dependencies.is_empty());
	}

	#[test]
	fn imports_used_only_as_types_are_dropped() {
		let types = run(
			"/types.ts",
			"export interface ButtonProps {\n  label: string;\n}\n",
			&[],
		);
		assert_eq!(types.code.trim(), "");

		let module = run(
			"/Button.tsx",
			"import { ButtonProps } from './types';\nexport default function Button(p: ButtonProps) {\n  return <button>{p.label}</button>;\n}\n",
			&["/types.ts"],
		);
		assert!(!module.code.contains("types"));
		assert!(!module.code.contains("ButtonProps"));
		assert!(module.code.contains("export default function Button(p)"));
		assert!(module.dependencies.is_empty());
		assert!(module.diagnostics.is_empty());
		assert_eq!(module.code.matches('\n').count(), 4);
	}

	#[test]
	fn mixed_imports_keep_value_bindings() {
		let module = run(
			"/Counter.tsx",
			"import React, { useState, FC, type ReactNode } from 'react';\nimport * as Shapes from './shapes';\nconst Counter: FC<{ icon: ReactNode; shape: Shapes.Kind }> = () => {\n  const [n] = useState(0);\n  return n;\n};\nexport default Counter;\n",
			&["/shapes.ts"],
		);
		assert!(module.code.contains("import React, { useState } from 'react';"));
		assert!(!module.code.contains("shapes"));
		assert!(module.dependencies.is_empty());
	}

	#[test]
	fn local_type_exports_are_dropped() {
		let module = run(
			"/index.ts",
			"interface Props {}\ntype Id = string;\nconst size = 1;\nexport { Props, size, Id };\n",
			&[],
		);
		assert!(module.code.contains("export { size }"));
		assert!(!module.code.contains("Props"));

		let only_types = run("/t.ts", "interface Props {}\nexport { Props };\n", &[]);
		assert!(!only_types.code.contains("export"));
	}

	#[test]
	fn this_parameter_is_dropped() {
		let module = run(
			"/a.ts",
			"function f(this: Window, a: number) { return a; }\nfunction g(this: Window) { return this; }\n",
			&[],
		);
		assert!(module.code.contains("function f(a) { return a; }"));
		assert!(module.code.contains("function g() { return this; }"));
	}

	#[test]
	fn parameter_properties_assign_fields() {
		let module = run(
			"/a.ts",
			"class A {\n  constructor(private x: number, readonly y = 2, z?: string) {}\n}\n",
			&[],
		);
		assert!(!module.code.contains("private"));
		assert!(!module.code.contains("readonly"));
		assert!(module.code.contains("{ this.x = x; this.y = y;}"));
		assert!(!module.code.contains("this.z"));
		assert_eq!(module.code.matches('\n').count(), 3);
	}

	#[test]
	fn parameter_properties_follow_super_call() {
		let module = run(
			"/a.ts",
			"class B extends A {\n  constructor(public name: string) {\n    super(name);\n    this.ready();\n  }\n}\n",
			&[],
		);
		assert!(module.code.contains("super(name); this.name = name;\n    this.ready();"));
	}

	#[test]
	fn non_null_and_satisfies_are_erased() {
		let module = run(
			"/a.ts",
			"const el = document.getElementById('root')!;\nconst c = { a: 1 } satisfies Record<string, number>;\n",
			&[],
		);
		assert!(module.code.contains("document.getElementById('root');"));
		assert!(module.code.contains("const c = { a: 1 };"));
	}

	#[test]
	fn enums_become_frozen_objects() {
		let module = run("/a.ts", "export enum Color { Red, Green = 5, Blue }\n", &[]);
		assert!(module
			.code
			.contains("export const Color = Object.freeze({ Red: 0, Green: 5, Blue: 6 });"));
	}

	#[test]
	fn enum_members_can_refer_to_each_other() {
		let module = run(
			"/a.ts",
			"enum Flag { None = 0, Read = 1 << 0, Write = 1 << 1, All = Read | Write, Next }\n",
			&[],
		);
		assert!(module.code.contains(
			"const Flag = (() => { const None = 0; const Read = 1 << 0; const Write = 1 << 1; const All = Read | Write; const Next = All + 1; return Object.freeze({ None, Read, Write, All, Next }); })();"
		));
	}

	#[test]
	fn class_modifiers_are_erased() {
		let module = run(
			"/a.ts",
			"class Box implements Thing {\n  private readonly size: number = 1;\n  public area(): number { return this.size; }\n}\n",
			&[],
		);
		assert!(!module.code.contains("implements"));
		assert!(!module.code.contains("private"));
		assert!(!module.code.contains("readonly"));
		assert!(!module.code.contains("public"));
		assert!(module.code.contains("size = 1;"));
	}

	// -- JSX --

	#[test]
	fn lowers_jsx_elements() {
		let module = run(
			"/App.jsx",
			"export default function App() {\n  return <div className=\"app\">Hello</div>;\n}\n",
			&[],
		);
		assert!(module.code.starts_with(
			"import { createElement as __jsx, Fragment as __Fragment } from \"react\";"
		));
		assert!(module
			.code
			.contains("__jsx(\"div\", {className: \"app\"}, \"Hello\")"));
	}

	#[test]
	fn jsx_components_fragments_and_props() {
		let module = run(
			"/App.tsx",
			"const x = <><Button primary label={name} {...rest} aria-label=\"go\" /></>;\n",
			&[],
		);
		assert!(module.code.contains(
			"__jsx(__Fragment, null, __jsx(Button, {primary: true, label: name, ...rest, \"aria-label\": \"go\"}))"
		));
	}

	#[test]
	fn jsx_text_and_expressions() {
		let module = run(
			"/A.tsx",
			"const x = (\n  <p>\n    Count: {count}\n    {/* note */}\n    &amp; more\n  </p>\n);\n",
			&[],
		);
		assert!(module
			.code
			.contains("__jsx(\"p\", null, \"Count: \", count, \"& more\")"));
		assert_eq!(module.code.matches('\n').count(), 7);
	}

	#[test]
	fn space_between_expressions_is_one_child() {
		let module = run("/A.tsx", "const x = <li>{a} {b}</li>;\n", &[]);
		assert!(module.code.contains("__jsx(\"li\", null, a, \" \", b)"));
	}

	#[test]
	fn no_jsx_means_no_runtime_import() {
		let module = run("/a.ts", "export const a = 1;\n", &[]);
		assert!(!module.code.contains("__jsx"));
	}

	// -- Specifiers --

	#[test]
	fn rewrites_alias_and_relative_imports() {
		let module = run(
			"/App.tsx",
			"import Button from '@/components/Button';\nimport { cn } from './lib/utils';\nimport React from 'react';\n",
			&["/components/Button.tsx", "/lib/utils.ts"],
		);
		assert!(module
			.code
			.contains("import Button from \"/components/Button.tsx\";"));
		assert!(module.code.contains("import { cn } from \"/lib/utils.ts\";"));
		assert!(module.code.contains("import React from 'react';"));
		assert_eq!(
			module.dependencies,
			vec!["/components/Button.tsx", "/lib/utils.ts"]
		);
		assert!(module.diagnostics.is_empty());
	}

	#[test]
	fn missing_module_is_an_error_with_sentinel() {
		let module = run("/App.tsx", "\nimport Button from '@/components/Button';\n", &[]);
		assert_eq!(module.diagnostics.len(), 1);
		let diag = &module.diagnostics[0];
		assert_eq!(diag.severity, Severity::Error);
		assert!(diag.message.contains("Module not found"));
		assert_eq!(diag.line, Some(2));
		assert!(module
			.code
			.contains("import Button from \"missing:@/components/Button\";"));
		assert_eq!(module.unresolved[0].key, "missing:@/components/Button");
	}

	#[test]
	fn unsupported_bare_specifier() {
		let module = run("/App.tsx", "import _ from 'lodash';\n", &[]);
		assert!(module.diagnostics[0].message.contains("Unsupported import"));
		assert!(module.code.contains("\"missing:lodash\""));
	}

	#[test]
	fn runtime_subpaths_are_untouched() {
		let module = run(
			"/main.tsx",
			"import { createRoot } from 'react-dom/client';\n",
			&[],
		);
		assert!(module.code.contains("from 'react-dom/client'"));
		assert!(module.diagnostics.is_empty());
	}

	#[test]
	fn reexports_and_dynamic_imports_are_rewritten() {
		let module = run(
			"/index.ts",
			"export { Button } from './Button';\nexport * from './Card';\nconst lazy = () => import('./Modal');\n",
			&["/Button.tsx", "/Card.tsx", "/Modal.tsx"],
		);
		assert!(module.code.contains("export { Button } from \"/Button.tsx\";"));
		assert!(module.code.contains("export * from \"/Card.tsx\";"));
		assert!(module.code.contains("import(\"/Modal.tsx\")"));
	}

	// -- CSS --

	#[test]
	fn css_imports_are_recorded_and_dropped() {
		let module = run(
			"/components/Card.tsx",
			"import './card.css';\nimport '../theme.css';\nconst href = 'https://cdn.example.com/x.css';\n",
			&["/components/card.css"],
		);
		assert_eq!(
			module.css_imports,
			vec![
				"/components/card.css",
				"/theme.css",
				"https://cdn.example.com/x.css"
			]
		);
		assert!(!module.code.contains("import './card.css'"));
		assert_eq!(module.diagnostics.len(), 1);
		assert_eq!(module.diagnostics[0].severity, Severity::Warning);
	}

	// -- Syntax errors --

	#[test]
	fn syntax_error_yields_diagnostic_and_failing_module() {
		let module = run("/Broken.tsx", "export const a = ;\n", &[]);
		assert!(module.failed);
		assert_eq!(module.diagnostics.len(), 1);
		let diag = &module.diagnostics[0];
		assert_eq!(diag.severity, Severity::Error);
		assert_eq!(diag.line, Some(1));
		assert!(diag.column.is_some());
		assert!(module.code.starts_with("throw new SyntaxError("));
	}

	#[test]
	fn failing_module_quotes_message() {
		assert_eq!(
			failing_module("Error", "Module not found: \"x\""),
			"throw new Error(\"Module not found: \\\"x\\\"\");\nexport {};\n"
		);
	}
}
