// ---------------------------------------------------------------------------
// JSX lowering: elements become `__jsx(type, props, ...children)` calls
// ---------------------------------------------------------------------------

use tree_sitter::Node;

use super::emit::{children, Emitter};
use super::quote;

impl<'a> Emitter<'a> {
	pub(super) fn emit_jsx(&mut self, node: Node<'_>) {
		self.uses_jsx = true;
		let mark = self.out.len();
		self.lower_element(node);
		self.pad_since(mark, node);
	}

	fn lower_element(&mut self, node: Node<'_>) {
		let kids = children(node);

		match node.kind() {
			"jsx_self_closing_element" => {
				self.open_call(node);
				self.out.push(')');
			}
			"jsx_element" => {
				let opening = kids.iter().find(|c| c.kind() == "jsx_opening_element");
				let closing = kids.iter().rev().find(|c| c.kind() == "jsx_closing_element");
				let start = match opening {
					Some(open) => {
						self.open_call(*open);
						open.end_byte()
					}
					None => {
						self.out.push_str("__jsx(__Fragment, null");
						node.start_byte()
					}
				};
				let end = closing.map_or(node.end_byte(), |c| c.start_byte());
				self.emit_jsx_children(&kids, start, end);
				self.out.push(')');
			}
			_ => {
				// `<>...</>` in grammars that give fragments their own node
				let start = kids
					.iter()
					.find(|c| c.kind() == ">")
					.map_or(node.start_byte(), |c| c.end_byte());
				let end = kids
					.iter()
					.rev()
					.find(|c| c.kind() == "<")
					.map_or(node.end_byte(), |c| c.start_byte());
				self.out.push_str("__jsx(__Fragment, null");
				self.emit_jsx_children(&kids, start, end);
				self.out.push(')');
			}
		}
	}

	/// `__jsx(type, props` for an opening or self-closing tag.
	fn open_call(&mut self, tag: Node<'_>) {
		self.out.push_str("__jsx(");
		let name = tag.child_by_field_name("name");
		match name {
			Some(name) => {
				let element_type = self.element_type(name);
				self.out.push_str(&element_type);
			}
			None => self.out.push_str("__Fragment"),
		}
		self.out.push_str(", ");

		let attributes: Vec<Node<'_>> = children(tag)
			.into_iter()
			.filter(|c| matches!(c.kind(), "jsx_attribute" | "jsx_expression"))
			.collect();
		if attributes.is_empty() {
			self.out.push_str("null");
			return;
		}

		self.out.push('{');
		for (i, attr) in attributes.into_iter().enumerate() {
			if i > 0 {
				self.out.push_str(", ");
			}
			if attr.kind() == "jsx_expression" {
				// {...props}
				if let Some(inner) = expression_child(attr) {
					self.emit(inner);
				}
				continue;
			}

			let parts: Vec<Node<'_>> = children(attr)
				.into_iter()
				.filter(|c| c.is_named() && c.kind() != "comment")
				.collect();
			let Some(key) = parts.first() else {
				continue;
			};
			let key = self.text(*key);
			if is_identifier(key) {
				self.out.push_str(key);
			} else {
				self.out.push_str(&quote(key));
			}
			self.out.push_str(": ");
			match parts.get(1) {
				None => self.out.push_str("true"),
				Some(value) => self.emit_attribute_value(*value),
			}
		}
		self.out.push('}');
	}

	fn element_type(&self, name: Node<'_>) -> String {
		let text = self.text(name);
		match name.kind() {
			"jsx_namespace_name" => quote(text),
			"identifier" if is_intrinsic(text) => quote(text),
			_ => text.to_string(),
		}
	}

	fn emit_attribute_value(&mut self, value: Node<'_>) {
		match value.kind() {
			"string" => {
				let raw = self.string_value(value);
				self.note_css_literal(raw, value);
				self.out.push_str(&quote(&decode_entities(raw)));
			}
			"jsx_expression" => match expression_child(value) {
				Some(inner) => self.emit(inner),
				None => self.out.push_str("true"),
			},
			_ => self.emit(value),
		}
	}

	/// Child arguments between the opening and closing tags. Text between
	/// nested elements is taken from the raw source so that entities and
	/// whitespace are cleaned together.
	fn emit_jsx_children(&mut self, kids: &[Node<'_>], start: usize, end: usize) {
		let mut text_start = start;
		for child in kids {
			if child.start_byte() < start || child.end_byte() > end {
				continue;
			}
			match child.kind() {
				"jsx_element" | "jsx_self_closing_element" | "jsx_fragment" => {
					self.flush_text(text_start, child.start_byte());
					text_start = child.end_byte();
					self.out.push_str(", ");
					self.emit(*child);
				}
				"jsx_expression" => {
					self.flush_text(text_start, child.start_byte());
					text_start = child.end_byte();
					if let Some(inner) = expression_child(*child) {
						self.out.push_str(", ");
						self.emit(inner);
					}
				}
				_ => {}
			}
		}
		self.flush_text(text_start, end);
	}

	fn flush_text(&mut self, start: usize, end: usize) {
		if start >= end {
			return;
		}
		let cleaned = clean_jsx_text(&self.src[start..end]);
		if !cleaned.is_empty() {
			self.out.push_str(", ");
			self.out.push_str(&quote(&decode_entities(&cleaned)));
		}
	}
}

/// The expression inside `{...}`, ignoring comments. `None` for `{}` and
/// `{/* comment */}`.
fn expression_child(node: Node<'_>) -> Option<Node<'_>> {
	children(node)
		.into_iter()
		.find(|c| c.is_named() && c.kind() != "comment")
}

/// Lowercase or dashed names are host elements and become string types.
fn is_intrinsic(name: &str) -> bool {
	name.starts_with(|c: char| c.is_ascii_lowercase()) || name.contains('-')
}

fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
		_ => return false,
	}
	chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// JSX text whitespace rules: lines are trimmed where they touch a line
/// break, whitespace-only lines vanish, and the surviving lines are joined
/// with single spaces.
pub(super) fn clean_jsx_text(raw: &str) -> String {
	let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
	let lines: Vec<&str> = normalized.split('\n').collect();
	let last_non_empty = lines
		.iter()
		.rposition(|line| line.chars().any(|c| c != ' ' && c != '\t'))
		.unwrap_or(0);

	let mut out = String::new();
	for (i, line) in lines.iter().enumerate() {
		let mut trimmed = line.replace('\t', " ");
		if i != 0 {
			trimmed = trimmed.trim_start_matches(' ').to_string();
		}
		if i != lines.len() - 1 {
			trimmed = trimmed.trim_end_matches(' ').to_string();
		}
		if trimmed.is_empty() {
			continue;
		}
		if i != last_non_empty {
			trimmed.push(' ');
		}
		out.push_str(&trimmed);
	}
	out
}

/// Decode HTML character references (`&amp;`, `&#169;`, `&#x1F600;`).
/// Unknown references are kept as written.
pub(super) fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_string();
	}

	let mut out = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(amp) = rest.find('&') {
		out.push_str(&rest[..amp]);
		let tail = &rest[amp..];
		let decoded = tail
			.find(';')
			.filter(|&semi| semi > 1 && semi <= 10)
			.and_then(|semi| Some((decode_reference(&tail[1..semi])?, semi)));
		match decoded {
			Some((ch, semi)) => {
				out.push(ch);
				rest = &tail[semi + 1..];
			}
			None => {
				out.push('&');
				rest = &tail[1..];
			}
		}
	}
	out.push_str(rest);
	out
}

fn decode_reference(name: &str) -> Option<char> {
	if let Some(num) = name.strip_prefix('#') {
		let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
			Some(hex) => u32::from_str_radix(hex, 16).ok()?,
			None => num.parse::<u32>().ok()?,
		};
		return char::from_u32(code);
	}
	let ch = match name {
		"amp" => '&',
		"lt" => '<',
		"gt" => '>',
		"quot" => '"',
		"apos" => '\'',
		"nbsp" => '\u{a0}',
		"copy" => '\u{a9}',
		"reg" => '\u{ae}',
		"trade" => '\u{2122}',
		"hellip" => '\u{2026}',
		"mdash" => '\u{2014}',
		"ndash" => '\u{2013}',
		"lsquo" => '\u{2018}',
		"rsquo" => '\u{2019}',
		"ldquo" => '\u{201c}',
		"rdquo" => '\u{201d}',
		"laquo" => '\u{ab}',
		"raquo" => '\u{bb}',
		"bull" => '\u{2022}',
		"middot" => '\u{b7}',
		"times" => '\u{d7}',
		"divide" => '\u{f7}',
		"deg" => '\u{b0}',
		"plusmn" => '\u{b1}',
		"larr" => '\u{2190}',
		"uarr" => '\u{2191}',
		"rarr" => '\u{2192}',
		"darr" => '\u{2193}',
		"euro" => '\u{20ac}',
		"pound" => '\u{a3}',
		"yen" => '\u{a5}',
		"cent" => '\u{a2}',
		"sect" => '\u{a7}',
		"para" => '\u{b6}',
		_ => return None,
	};
	Some(ch)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn text_on_one_line_is_kept() {
		assert_eq!(clean_jsx_text("Hello "), "Hello ");
		assert_eq!(clean_jsx_text("  a  b  "), "  a  b  ");
	}

	#[test]
	fn text_across_lines_is_trimmed_and_joined() {
		assert_eq!(clean_jsx_text("\n    Hello\n    world\n  "), "Hello world");
		assert_eq!(clean_jsx_text("\n   \n  "), "");
	}

	#[test]
	fn space_only_text_on_one_line_is_kept() {
		assert_eq!(clean_jsx_text(" "), " ");
		assert_eq!(clean_jsx_text("\t"), " ");
		assert_eq!(clean_jsx_text("  \n  "), "");
	}

	#[test]
	fn trailing_space_before_break_is_dropped() {
		assert_eq!(clean_jsx_text("Count: \n  "), "Count:");
	}

	#[test]
	fn entities_decode() {
		assert_eq!(decode_entities("a &amp; b"), "a & b");
		assert_eq!(decode_entities("&copy; 2024"), "\u{a9} 2024");
		assert_eq!(decode_entities("&#65;&#x42;"), "AB");
		assert_eq!(decode_entities("&bogus; & done"), "&bogus; & done");
	}

	#[test]
	fn identifiers() {
		assert!(is_identifier("className"));
		assert!(is_identifier("$x"));
		assert!(!is_identifier("aria-label"));
		assert!(!is_identifier("data-testid"));
	}

	#[test]
	fn intrinsic_names() {
		assert!(is_intrinsic("div"));
		assert!(is_intrinsic("my-element"));
		assert!(!is_intrinsic("Button"));
	}
}
