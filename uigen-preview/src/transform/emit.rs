// ---------------------------------------------------------------------------
// Emitter: copies source text through the syntax tree, erasing TypeScript
// syntax and rewriting import specifiers on the way
// ---------------------------------------------------------------------------

use std::collections::{BTreeSet, HashMap, HashSet};

use tree_sitter::Node;

use crate::config::PreviewConfig;
use crate::diagnostic::Diagnostic;
use crate::resolve::{resolve_specifier, sentinel_key, Resolved};

use super::refs::References;
use super::{quote, TransformedModule, UnresolvedImport};

/// Nodes dropped from the output entirely.
const ERASED_KINDS: &[&str] = &[
	"type_annotation",
	"type_parameters",
	"type_arguments",
	"asserts_annotation",
	"type_predicate_annotation",
	"interface_declaration",
	"type_alias_declaration",
	"ambient_declaration",
	"function_signature",
	"method_signature",
	"abstract_method_signature",
	"index_signature",
	"implements_clause",
	"accessibility_modifier",
	"override_modifier",
];

/// Declarations that make an `export` statement type-only.
const TYPE_ONLY_DECLARATIONS: &[&str] = &[
	"interface_declaration",
	"type_alias_declaration",
	"ambient_declaration",
	"function_signature",
];

/// What a rewritten specifier should become.
enum Target {
	Keep,
	Path(String),
	Stylesheet,
}

pub(super) struct Emitter<'a> {
	pub(super) src: &'a str,
	pub(super) path: &'a str,
	known: &'a BTreeSet<String>,
	pub(super) config: &'a PreviewConfig,
	pub(super) out: String,
	pub(super) uses_jsx: bool,
	css_imports: Vec<String>,
	diagnostics: Vec<Diagnostic>,
	dependencies: Vec<String>,
	unresolved: Vec<UnresolvedImport>,
	overrides: HashMap<usize, String>,
	refs: References,
}

pub(super) fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
	let mut cursor = node.walk();
	node.children(&mut cursor).collect()
}

pub(super) fn has_token(node: Node<'_>, token: &str) -> bool {
	children(node)
		.iter()
		.any(|c| !c.is_named() && c.kind() == token)
}

/// Anonymous tokens that carry only type information in a given parent.
fn is_type_token(parent: &str, token: &str) -> bool {
	matches!(
		(parent, token),
		("optional_parameter", "?")
			| ("required_parameter" | "optional_parameter", "readonly")
			| ("public_field_definition", "?" | "!" | "readonly" | "abstract")
			| ("variable_declarator", "!")
			| ("method_definition", "?")
			| ("abstract_class_declaration", "abstract")
	)
}

impl<'a> Emitter<'a> {
	pub(super) fn new(
		src: &'a str,
		path: &'a str,
		known: &'a BTreeSet<String>,
		config: &'a PreviewConfig,
		refs: References,
	) -> Self {
		Self {
			src,
			path,
			known,
			config,
			out: String::with_capacity(src.len() + 128),
			uses_jsx: false,
			css_imports: Vec::new(),
			diagnostics: Vec::new(),
			dependencies: Vec::new(),
			unresolved: Vec::new(),
			overrides: HashMap::new(),
			refs,
		}
	}

	pub(super) fn finish(self) -> TransformedModule {
		let code = if self.uses_jsx {
			format!(
				"import {{ createElement as __jsx, Fragment as __Fragment }} from {};{}",
				quote(&self.config.jsx_import_source),
				self.out
			)
		} else {
			self.out
		};
		TransformedModule {
			path: self.path.to_string(),
			code,
			css_imports: self.css_imports,
			diagnostics: self.diagnostics,
			dependencies: self.dependencies,
			unresolved: self.unresolved,
			failed: false,
		}
	}

	// -- Text helpers -----------------------------------------------------

	pub(super) fn text(&self, node: Node<'_>) -> &'a str {
		&self.src[node.start_byte()..node.end_byte()]
	}

	/// Contents of a string literal without its quotes.
	pub(super) fn string_value(&self, node: Node<'_>) -> &'a str {
		let text = self.text(node);
		if text.len() >= 2 {
			&text[1..text.len() - 1]
		} else {
			text
		}
	}

	/// Keep the line count of a dropped node so later positions still line up.
	pub(super) fn blank(&mut self, node: Node<'_>) {
		let newlines = self.text(node).matches('\n').count();
		for _ in 0..newlines {
			self.out.push('\n');
		}
	}

	/// Pad with newlines until the output written since `mark` spans as
	/// many lines as the source of `node`.
	pub(super) fn pad_since(&mut self, mark: usize, node: Node<'_>) {
		let emitted = self.out[mark..].matches('\n').count();
		let original = self.text(node).matches('\n').count();
		for _ in emitted..original {
			self.out.push('\n');
		}
	}

	// -- Traversal --------------------------------------------------------

	pub(super) fn emit(&mut self, node: Node<'_>) {
		if let Some(replacement) = self.overrides.remove(&node.id()) {
			self.out.push_str(&replacement);
			return;
		}

		match node.kind() {
			kind if ERASED_KINDS.contains(&kind) => self.blank(node),
			"import_statement" => self.emit_import(node),
			"export_statement" => self.emit_export(node),
			"call_expression" => self.emit_call(node),
			"string" => self.emit_string(node),
			"enum_declaration" => self.emit_enum(node),
			"formal_parameters" => self.emit_parameters(node),
			"method_definition" => {
				self.lower_parameter_properties(node);
				self.emit_children(node);
			}
			"as_expression" | "satisfies_expression" | "non_null_expression" => {
				match node.named_child(0) {
					Some(inner) => self.emit(inner),
					None => self.emit_children(node),
				}
			}
			"type_assertion" => {
				let count = node.named_child_count();
				match count.checked_sub(1).and_then(|i| node.named_child(i)) {
					Some(inner) => self.emit(inner),
					None => self.emit_children(node),
				}
			}
			"public_field_definition" if has_token(node, "declare") => self.blank(node),
			"jsx_element" | "jsx_self_closing_element" | "jsx_fragment" => self.emit_jsx(node),
			_ => self.emit_children(node),
		}
	}

	/// Copy a node's text, recursing into children and keeping the gaps
	/// between them verbatim.
	pub(super) fn emit_children(&mut self, node: Node<'_>) {
		let kids = children(node);
		if kids.is_empty() {
			self.out.push_str(self.text(node));
			return;
		}

		let src = self.src;
		let parent = node.kind();
		let mut pos = node.start_byte();
		for child in kids {
			self.out.push_str(&src[pos..child.start_byte()]);
			pos = child.end_byte();
			if !child.is_named() && is_type_token(parent, child.kind()) {
				continue;
			}
			self.emit(child);
		}
		self.out.push_str(&src[pos..node.end_byte()]);
	}

	// -- Specifiers -------------------------------------------------------

	fn rewrite_target(&mut self, specifier: &str, at: Node<'_>) -> Target {
		match resolve_specifier(specifier, self.path, self.known, self.config) {
			Resolved::Runtime => Target::Keep,
			Resolved::Local(path) => {
				if !self.dependencies.contains(&path) {
					self.dependencies.push(path.clone());
				}
				Target::Path(path)
			}
			Resolved::Stylesheet { path, missing } => {
				self.record_css(path, missing, at);
				Target::Stylesheet
			}
			Resolved::NotFound => {
				let message = format!("Module not found: '{}'", specifier);
				self.fail_import(specifier, message, at)
			}
			Resolved::Unsupported => {
				let message = format!(
					"Unsupported import: '{}' is not an available runtime module",
					specifier
				);
				self.fail_import(specifier, message, at)
			}
		}
	}

	fn fail_import(&mut self, specifier: &str, message: String, at: Node<'_>) -> Target {
		let pos = at.start_position();
		self.diagnostics.push(
			Diagnostic::error(self.path, message.clone()).at(pos.row + 1, pos.column + 1),
		);
		let key = sentinel_key(specifier);
		if !self.unresolved.iter().any(|u| u.key == key) {
			self.unresolved.push(UnresolvedImport {
				specifier: specifier.to_string(),
				key: key.clone(),
				message,
			});
		}
		Target::Path(key)
	}

	fn record_css(&mut self, path: String, missing: bool, at: Node<'_>) {
		if self.css_imports.contains(&path) {
			return;
		}
		if missing {
			let pos = at.start_position();
			self.diagnostics.push(
				Diagnostic::warning(self.path, format!("Stylesheet not found: '{}'", path))
					.at(pos.row + 1, pos.column + 1),
			);
		}
		self.css_imports.push(path);
	}

	pub(super) fn note_css_literal(&mut self, value: &str, at: Node<'_>) {
		if !value.ends_with(".css") {
			return;
		}
		if let Resolved::Stylesheet { path, missing } =
			resolve_specifier(value, self.path, self.known, self.config)
		{
			self.record_css(path, missing, at);
		}
	}

	fn emit_string(&mut self, node: Node<'_>) {
		let value = self.string_value(node);
		self.note_css_literal(value, node);
		self.out.push_str(self.text(node));
	}

	// -- Imports & exports ------------------------------------------------

	fn emit_import(&mut self, node: Node<'_>) {
		if has_token(node, "type") {
			self.blank(node);
			return;
		}
		let Some(source) = node.child_by_field_name("source") else {
			self.emit_children(node);
			return;
		};

		let clause = children(node)
			.into_iter()
			.find(|c| c.kind() == "import_clause");
		let bindings = match clause {
			Some(clause) => match self.import_bindings(clause) {
				Some(bindings) => Some(bindings),
				None => {
					self.blank(node);
					return;
				}
			},
			None => None,
		};

		let specifier = self.string_value(source);
		let source_text = match self.rewrite_target(specifier, source) {
			Target::Keep => self.text(source).to_string(),
			Target::Path(path) => quote(&path),
			Target::Stylesheet => {
				self.blank(node);
				return;
			}
		};

		self.out.push_str("import ");
		if let Some(bindings) = bindings {
			self.out.push_str(&bindings);
			self.out.push_str(" from ");
		}
		self.out.push_str(&source_text);
		self.out.push(';');
		self.blank(node);
	}

	/// Value bindings of an import clause; `None` when every binding is
	/// type-only, either marked `type` or used only in type positions.
	fn import_bindings(&self, clause: Node<'_>) -> Option<String> {
		let mut parts = Vec::new();
		for child in children(clause) {
			match child.kind() {
				"identifier" if !self.refs.is_type_only(self.text(child)) => {
					parts.push(self.text(child).to_string());
				}
				"namespace_import" => {
					let local = children(child)
						.into_iter()
						.find(|c| c.kind() == "identifier")
						.map(|c| self.text(c));
					if !local.is_some_and(|name| self.refs.is_type_only(name)) {
						parts.push(self.text(child).to_string());
					}
				}
				"named_imports" => {
					let kept = self.value_specifiers(child, "import_specifier", true);
					if !kept.is_empty() {
						parts.push(format!("{{ {} }}", kept.join(", ")));
					}
				}
				_ => {}
			}
		}
		if parts.is_empty() {
			None
		} else {
			Some(parts.join(", "))
		}
	}

	/// `name` / `name as alias` for each specifier not marked `type`. With
	/// `local_names`, specifiers whose local binding is type-only go too.
	fn value_specifiers(&self, list: Node<'_>, kind: &str, local_names: bool) -> Vec<String> {
		children(list)
			.into_iter()
			.filter(|s| s.kind() == kind && !has_token(*s, "type") && !has_token(*s, "typeof"))
			.filter_map(|s| {
				let name = s.child_by_field_name("name")?;
				let alias = s.child_by_field_name("alias");
				if local_names {
					// imports bind the alias, exports read the name
					let local = match (kind, alias) {
						("import_specifier", Some(alias)) => alias,
						_ => name,
					};
					if self.refs.is_type_only(self.text(local)) {
						return None;
					}
				}
				Some(match alias {
					Some(alias) => format!("{} as {}", self.text(name), self.text(alias)),
					None => self.text(name).to_string(),
				})
			})
			.collect()
	}

	fn emit_export(&mut self, node: Node<'_>) {
		if let Some(decl) = node.child_by_field_name("declaration") {
			if TYPE_ONLY_DECLARATIONS.contains(&decl.kind()) {
				self.blank(node);
				return;
			}
		}
		if has_token(node, "type") {
			self.blank(node);
			return;
		}

		if let Some(clause) = children(node).into_iter().find(|c| c.kind() == "export_clause") {
			let total = children(clause)
				.iter()
				.filter(|s| s.kind() == "export_specifier")
				.count();
			let local = node.child_by_field_name("source").is_none();
			let kept = self.value_specifiers(clause, "export_specifier", local);
			if kept.len() != total {
				if kept.is_empty() {
					self.blank(node);
					return;
				}
				self.overrides
					.insert(clause.id(), format!("{{ {} }}", kept.join(", ")));
			}
		}

		if let Some(source) = node.child_by_field_name("source") {
			let specifier = self.string_value(source);
			match self.rewrite_target(specifier, source) {
				Target::Keep => {}
				Target::Path(path) => {
					self.overrides.insert(source.id(), quote(&path));
				}
				Target::Stylesheet => {
					self.blank(node);
					return;
				}
			}
		}

		self.emit_children(node);
	}

	/// Literal dynamic `import("...")` gets the same rewriting as a static
	/// import.
	fn emit_call(&mut self, node: Node<'_>) {
		let is_dynamic_import = node
			.child_by_field_name("function")
			.is_some_and(|f| f.kind() == "import");
		if is_dynamic_import {
			let literal = node
				.child_by_field_name("arguments")
				.and_then(|args| args.named_child(0))
				.filter(|arg| arg.kind() == "string");
			if let Some(literal) = literal {
				let specifier = self.string_value(literal);
				match self.rewrite_target(specifier, literal) {
					Target::Keep => {}
					Target::Path(path) => {
						self.overrides.insert(literal.id(), quote(&path));
					}
					Target::Stylesheet => {
						self.out.push_str("Promise.resolve({})");
						self.blank(node);
						return;
					}
				}
			}
		}
		self.emit_children(node);
	}

	// -- Parameters -------------------------------------------------------

	/// A `this` parameter only types the receiver; it goes with its comma.
	fn emit_parameters(&mut self, node: Node<'_>) {
		let src = self.src;
		let mut pos = node.start_byte();
		let mut after_this = false;
		let mut trim_gap = false;
		for child in children(node) {
			let mut gap = &src[pos..child.start_byte()];
			pos = child.end_byte();
			if trim_gap {
				gap = gap.trim_start_matches([' ', '\t']);
				trim_gap = false;
			}
			self.out.push_str(gap);
			if is_this_parameter(child) {
				self.blank(child);
				after_this = true;
				continue;
			}
			if after_this && child.kind() == "," {
				after_this = false;
				trim_gap = true;
				continue;
			}
			after_this = false;
			self.emit(child);
		}
		self.out.push_str(&src[pos..node.end_byte()]);
	}

	/// `constructor(private x)` becomes `constructor(x) { this.x = x; ... }`.
	/// In derived classes the assignments follow the `super(...)` call.
	fn lower_parameter_properties(&mut self, method: Node<'_>) {
		let is_constructor = method
			.child_by_field_name("name")
			.is_some_and(|name| self.text(name) == "constructor");
		let (true, Some(params), Some(body)) = (
			is_constructor,
			method.child_by_field_name("parameters"),
			method.child_by_field_name("body"),
		) else {
			return;
		};

		let assignments: Vec<String> = children(params)
			.into_iter()
			.filter(|param| is_parameter_property(*param))
			.filter_map(|param| param.child_by_field_name("pattern"))
			.filter(|pattern| pattern.kind() == "identifier")
			.map(|pattern| {
				let name = self.text(pattern);
				format!("this.{} = {};", name, name)
			})
			.collect();
		if assignments.is_empty() {
			return;
		}

		let statements = children(body);
		let anchor = statements
			.iter()
			.find(|stmt| is_super_call(**stmt))
			.map(|stmt| last_leaf(*stmt))
			.or_else(|| statements.iter().find(|c| c.kind() == "{").copied());
		let Some(anchor) = anchor else {
			return;
		};
		let text = self.text(anchor);
		let separator = if text == "{" || text == ";" { " " } else { "; " };
		self.overrides.insert(
			anchor.id(),
			format!("{}{}{}", text, separator, assignments.join(" ")),
		);
	}

	// -- Enums ------------------------------------------------------------

	/// `enum E { A, B = 5 }` → `const E = Object.freeze({ A: 0, B: 5 });`
	///
	/// When an initializer names another member, the members become locals
	/// of an arrow function that returns the frozen object.
	fn emit_enum(&mut self, node: Node<'_>) {
		let (Some(name), Some(body)) = (
			node.child_by_field_name("name"),
			node.child_by_field_name("body"),
		) else {
			self.emit_children(node);
			return;
		};
		let members: Vec<Node<'_>> = children(body)
			.into_iter()
			.filter(|m| m.is_named() && m.kind() != "comment")
			.collect();

		let mark = self.out.len();
		self.out.push_str("const ");
		self.out.push_str(self.text(name));
		if self.members_refer_to_members(&members) {
			self.emit_enum_scope(&members);
		} else {
			self.emit_enum_object(&members);
		}
		self.pad_since(mark, node);
	}

	fn emit_enum_object(&mut self, members: &[Node<'_>]) {
		self.out.push_str(" = Object.freeze({ ");
		let mut next: Option<i64> = Some(0);
		let mut first = true;
		for member in members {
			let Some((key, value)) = enum_member(*member) else {
				continue;
			};
			if !first {
				self.out.push_str(", ");
			}
			first = false;

			self.out.push_str(self.text(key));
			self.out.push_str(": ");
			match value {
				Some(value) => {
					self.emit(value);
					next = parse_enum_number(self.text(value)).map(|n| n + 1);
				}
				None => match next {
					Some(n) => {
						self.out.push_str(&n.to_string());
						next = Some(n + 1);
					}
					None => self.out.push_str("undefined"),
				},
			}
		}
		self.out.push_str(" });");
	}

	/// `const E = (() => { const A = 1; const B = A * 2; return Object.freeze({ A, B }); })();`
	fn emit_enum_scope(&mut self, members: &[Node<'_>]) {
		let mut statements = Vec::new();
		let mut entries = Vec::new();
		let mut next: Option<i64> = Some(0);
		let mut previous: Option<&str> = None;
		for member in members {
			let Some((key, value)) = enum_member(*member) else {
				continue;
			};
			let value_text = match value {
				Some(value) => {
					let start = self.out.len();
					self.emit(value);
					next = parse_enum_number(self.text(value)).map(|n| n + 1);
					self.out.split_off(start)
				}
				None => match (next, previous) {
					(Some(n), _) => {
						next = Some(n + 1);
						n.to_string()
					}
					(None, Some(previous)) => format!("{} + 1", previous),
					(None, None) => "undefined".to_string(),
				},
			};
			let key_text = self.text(key);
			if key.kind() == "property_identifier" {
				statements.push(format!("const {} = {};", key_text, value_text));
				entries.push(key_text.to_string());
				previous = Some(key_text);
			} else {
				entries.push(format!("{}: {}", key_text, value_text));
				previous = None;
			}
		}
		self.out.push_str(" = (() => { ");
		for statement in &statements {
			self.out.push_str(statement);
			self.out.push(' ');
		}
		self.out.push_str("return Object.freeze({ ");
		self.out.push_str(&entries.join(", "));
		self.out.push_str(" }); })();");
	}

	fn members_refer_to_members(&self, members: &[Node<'_>]) -> bool {
		let names: HashSet<&str> = members
			.iter()
			.filter_map(|m| enum_member(*m))
			.filter(|(key, _)| key.kind() == "property_identifier")
			.map(|(key, _)| self.text(key))
			.collect();
		members
			.iter()
			.filter_map(|m| enum_member(*m).and_then(|(_, value)| value))
			.any(|value| self.mentions(value, &names))
	}

	fn mentions(&self, node: Node<'_>, names: &HashSet<&str>) -> bool {
		if node.kind() == "identifier" {
			return names.contains(self.text(node));
		}
		children(node).into_iter().any(|c| self.mentions(c, names))
	}
}

/// Name and initializer of an enum member.
fn enum_member(member: Node<'_>) -> Option<(Node<'_>, Option<Node<'_>>)> {
	if member.kind() == "enum_assignment" {
		Some((
			member.child_by_field_name("name")?,
			Some(member.child_by_field_name("value")?),
		))
	} else {
		Some((member, None))
	}
}

fn is_this_parameter(node: Node<'_>) -> bool {
	node.kind() == "required_parameter"
		&& node
			.child_by_field_name("pattern")
			.is_some_and(|p| p.kind() == "this")
}

/// A constructor parameter that also declares a field.
fn is_parameter_property(node: Node<'_>) -> bool {
	matches!(node.kind(), "required_parameter" | "optional_parameter")
		&& children(node).iter().any(|c| {
			matches!(c.kind(), "accessibility_modifier" | "override_modifier")
				|| (!c.is_named() && c.kind() == "readonly")
		})
}

fn is_super_call(stmt: Node<'_>) -> bool {
	stmt.kind() == "expression_statement"
		&& stmt
			.named_child(0)
			.filter(|e| e.kind() == "call_expression")
			.and_then(|call| call.child_by_field_name("function"))
			.is_some_and(|f| f.kind() == "super")
}

fn last_leaf(node: Node<'_>) -> Node<'_> {
	let mut leaf = node;
	while let Some(child) = leaf.child(leaf.child_count().saturating_sub(1)) {
		leaf = child;
	}
	leaf
}

fn parse_enum_number(text: &str) -> Option<i64> {
	let text = text.trim();
	text.parse::<i64>().ok().or_else(|| {
		let hex = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))?;
		i64::from_str_radix(hex, 16).ok()
	})
}
