// ---------------------------------------------------------------------------
// Name references: which names a module uses as values and which only as
// types, so imports that exist for their types can be elided
// ---------------------------------------------------------------------------

use std::collections::HashSet;

use tree_sitter::Node;

use super::emit::{children, has_token};

/// Subtrees where every name is a type.
const TYPE_CONTEXTS: &[&str] = &[
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
];

#[derive(Debug, Default)]
pub(super) struct References {
	values: HashSet<String>,
	types: HashSet<String>,
	/// Interfaces, type aliases and `type`-marked import bindings.
	type_declarations: HashSet<String>,
}

impl References {
	pub(super) fn collect(root: Node<'_>, src: &str) -> Self {
		let mut refs = Self::default();
		refs.walk(root, src, false);
		refs
	}

	/// `name` appears only where a type is expected. Names never mentioned
	/// at all are not type-only.
	pub(super) fn is_type_only(&self, name: &str) -> bool {
		!self.values.contains(name)
			&& (self.types.contains(name) || self.type_declarations.contains(name))
	}

	fn walk(&mut self, node: Node<'_>, src: &str, in_type: bool) {
		let text = |n: Node<'_>| src[n.start_byte()..n.end_byte()].to_string();
		match node.kind() {
			"import_statement" => {
				self.note_type_imports(node, src);
				return;
			}
			// `export { a }` names a local binding without using it
			"export_clause" => return,
			"interface_declaration" | "type_alias_declaration" => {
				if let Some(name) = node.child_by_field_name("name") {
					self.type_declarations.insert(text(name));
				}
			}
			"identifier" | "type_identifier" if in_type => {
				self.types.insert(text(node));
				return;
			}
			"identifier" | "shorthand_property_identifier" | "type_identifier" => {
				self.values.insert(text(node));
				return;
			}
			_ => {}
		}

		let in_type = in_type || TYPE_CONTEXTS.contains(&node.kind());
		// `value as T` and `value satisfies T`: only the first operand is a value
		let typed_operand = matches!(node.kind(), "as_expression" | "satisfies_expression");
		let mut named = 0;
		for child in children(node) {
			let child_in_type = in_type || (typed_operand && child.is_named() && named > 0);
			if child.is_named() {
				named += 1;
			}
			self.walk(child, src, child_in_type);
		}
	}

	fn note_type_imports(&mut self, node: Node<'_>, src: &str) {
		let whole = has_token(node, "type");
		let Some(clause) = children(node).into_iter().find(|c| c.kind() == "import_clause") else {
			return;
		};
		for binding in import_locals(clause) {
			if whole || binding.marked_type {
				self.type_declarations
					.insert(src[binding.node.start_byte()..binding.node.end_byte()].to_string());
			}
		}
	}
}

struct ImportLocal<'t> {
	/// The local identifier the binding introduces.
	node: Node<'t>,
	marked_type: bool,
}

/// Every local name an import clause binds, default and namespace
/// bindings included.
fn import_locals<'t>(clause: Node<'t>) -> Vec<ImportLocal<'t>> {
	let mut locals = Vec::new();
	for child in children(clause) {
		match child.kind() {
			"identifier" => locals.push(ImportLocal { node: child, marked_type: false }),
			"namespace_import" => {
				if let Some(name) = children(child).into_iter().find(|c| c.kind() == "identifier") {
					locals.push(ImportLocal { node: name, marked_type: false });
				}
			}
			"named_imports" => {
				for spec in children(child) {
					if spec.kind() != "import_specifier" {
						continue;
					}
					let local = spec
						.child_by_field_name("alias")
						.or_else(|| spec.child_by_field_name("name"));
					if let Some(local) = local {
						locals.push(ImportLocal {
							node: local,
							marked_type: has_token(spec, "type") || has_token(spec, "typeof"),
						});
					}
				}
			}
			_ => {}
		}
	}
	locals
}

#[cfg(test)]
mod tests {
	use super::*;
	use tree_sitter::{Language, Parser};

	fn references(source: &str) -> References {
		let mut parser = Parser::new();
		parser
			.set_language(&Language::from(tree_sitter_typescript::LANGUAGE_TSX))
			.unwrap();
		let tree = parser.parse(source, None).unwrap();
		References::collect(tree.root_node(), source)
	}

	#[test]
	fn annotations_and_generics_are_type_positions() {
		let refs = references(
			"import { Props, Item, useState } from './x';\nfunction f(p: Props) { return useState<Item[]>([]); }\n",
		);
		assert!(refs.is_type_only("Props"));
		assert!(refs.is_type_only("Item"));
		assert!(!refs.is_type_only("useState"));
	}

	#[test]
	fn value_use_wins_over_type_use() {
		let refs = references(
			"import { Theme } from './x';\nconst t: Theme = Theme.dark;\nconst n = v as Mode;\n",
		);
		assert!(!refs.is_type_only("Theme"));
		assert!(refs.is_type_only("Mode"));
		assert!(!refs.is_type_only("v"));
	}

	#[test]
	fn jsx_names_and_shorthand_are_values() {
		let refs = references(
			"import { Card, label } from './x';\nconst o = { label };\nconst e = <Card />;\n",
		);
		assert!(!refs.is_type_only("Card"));
		assert!(!refs.is_type_only("label"));
	}

	#[test]
	fn declared_types_and_unmentioned_names() {
		let refs = references("interface Props {}\ntype Id = string;\nexport { Props, Id };\n");
		assert!(refs.is_type_only("Props"));
		assert!(refs.is_type_only("Id"));
		assert!(!refs.is_type_only("Unused"));
	}

	#[test]
	fn class_names_are_values() {
		let refs = references("class Store {}\nlet s: Store;\nexport { Store };\n");
		assert!(!refs.is_type_only("Store"));
	}
}
