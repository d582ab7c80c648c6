// ---------------------------------------------------------------------------
// Edit commands: the text-editor and file-manager tool surfaces
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::error::VfsError;
use crate::tree::{NodeKind, VirtualFileTree, VirtualNode};

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

/// 1-indexed inclusive line range. On the wire it is a `[start, end]` pair
/// where `end = -1` runs to the last line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[i64; 2]", into = "[i64; 2]")]
pub struct LineRange {
	pub start: usize,
	pub end: Option<usize>,
}

impl TryFrom<[i64; 2]> for LineRange {
	type Error = String;

	fn try_from([start, end]: [i64; 2]) -> Result<Self, Self::Error> {
		if start < 0 {
			return Err(format!("view_range start must be non-negative, got {}", start));
		}
		let end = match end {
			-1 => None,
			e if e < 0 => {
				return Err(format!("view_range end must be -1 or non-negative, got {}", e));
			}
			e => Some(e as usize),
		};
		Ok(Self {
			start: start as usize,
			end,
		})
	}
}

impl From<LineRange> for [i64; 2] {
	fn from(range: LineRange) -> Self {
		[range.start as i64, range.end.map_or(-1, |e| e as i64)]
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditCommand {
	View {
		path: String,
		#[serde(rename = "view_range", default, skip_serializing_if = "Option::is_none")]
		range: Option<LineRange>,
	},
	Create {
		path: String,
		#[serde(rename = "file_text")]
		content: String,
	},
	StrReplace {
		path: String,
		#[serde(rename = "old_str")]
		old_text: String,
		#[serde(rename = "new_str", default)]
		new_text: String,
	},
	Insert {
		path: String,
		#[serde(rename = "insert_line")]
		after_line: usize,
		#[serde(rename = "new_str")]
		text: String,
	},
}

impl EditCommand {
	pub fn path(&self) -> &str {
		match self {
			Self::View { path, .. }
			| Self::Create { path, .. }
			| Self::StrReplace { path, .. }
			| Self::Insert { path, .. } => path,
		}
	}

	pub fn is_mutation(&self) -> bool {
		!matches!(self, Self::View { .. })
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum FileCommand {
	Rename { path: String, new_path: String },
	Delete { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutput {
	Content(String),
	Done,
}

impl EditOutput {
	pub fn content(&self) -> Option<&str> {
		match self {
			Self::Content(text) => Some(text),
			Self::Done => None,
		}
	}
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn apply(tree: &mut VirtualFileTree, command: &EditCommand) -> Result<EditOutput, VfsError> {
	tracing::debug!(command = ?command_name(command), path = %command.path(), "edit command");
	match command {
		EditCommand::View { path, range } => view(tree, path, *range).map(EditOutput::Content),
		EditCommand::Create { path, content } => {
			create(tree, path, content)?;
			Ok(EditOutput::Done)
		}
		EditCommand::StrReplace {
			path,
			old_text,
			new_text,
		} => {
			str_replace(tree, path, old_text, new_text)?;
			Ok(EditOutput::Done)
		}
		EditCommand::Insert {
			path,
			after_line,
			text,
		} => {
			insert(tree, path, *after_line, text)?;
			Ok(EditOutput::Done)
		}
	}
}

pub fn apply_file_command(tree: &mut VirtualFileTree, command: &FileCommand) -> Result<(), VfsError> {
	match command {
		FileCommand::Rename { path, new_path } => tree.rename(path, new_path),
		FileCommand::Delete { path } => tree.delete(path),
	}
}

fn command_name(command: &EditCommand) -> &'static str {
	match command {
		EditCommand::View { .. } => "view",
		EditCommand::Create { .. } => "create",
		EditCommand::StrReplace { .. } => "str_replace",
		EditCommand::Insert { .. } => "insert",
	}
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// File content, optionally sliced to a line range. A directory yields its
/// immediate children, one per line.
pub fn view(tree: &VirtualFileTree, path: &str, range: Option<LineRange>) -> Result<String, VfsError> {
	if let Some(VirtualNode::Directory { .. }) = tree.node(path) {
		let listing: Vec<String> = tree
			.list(path)?
			.into_iter()
			.map(|entry| match entry.kind {
				NodeKind::Directory => format!("[DIR] {}", entry.name),
				NodeKind::File => format!("[FILE] {}", entry.name),
			})
			.collect();
		return Ok(listing.join("\n"));
	}

	let content = tree.read_file(path)?;
	let Some(range) = range else {
		return Ok(content.to_string());
	};

	let lines = split_lines(content);
	let count = lines.len();
	let end = range.end.unwrap_or(count);
	if range.start < 1 || range.start > end || end > count {
		return Err(VfsError::RangeOutOfBounds(format!(
			"[{}, {}] in {} ({} lines)",
			range.start,
			range.end.map_or(-1, |e| e as i64),
			path,
			count
		)));
	}
	Ok(lines[range.start - 1..end].join("\n"))
}

/// Create a new file. Never overwrites.
pub fn create(tree: &mut VirtualFileTree, path: &str, content: &str) -> Result<(), VfsError> {
	tree.create_file(path, content)
}

/// Replace the single occurrence of `old_text`. Zero or several occurrences
/// leave the file untouched.
pub fn str_replace(
	tree: &mut VirtualFileTree,
	path: &str,
	old_text: &str,
	new_text: &str,
) -> Result<(), VfsError> {
	if old_text.is_empty() {
		return Err(VfsError::InvalidOperation(
			"old_str must not be empty".to_string(),
		));
	}

	let content = tree.read_file(path)?;
	let updated = match count_occurrences(content, old_text) {
		0 => return Err(VfsError::NoMatch(path.to_string())),
		1 => content.replacen(old_text, new_text, 1),
		count => {
			return Err(VfsError::AmbiguousMatch {
				path: path.to_string(),
				count,
			});
		}
	};
	tree.update_file(path, &updated)
}

/// Insert `text` as new line(s) after line `after_line` (0 prepends).
pub fn insert(
	tree: &mut VirtualFileTree,
	path: &str,
	after_line: usize,
	text: &str,
) -> Result<(), VfsError> {
	let content = tree.read_file(path)?;
	let count = split_lines(content).len();
	if after_line > count {
		return Err(VfsError::LineOutOfBounds(format!(
			"insert_line {} in {} ({} lines)",
			after_line, path, count
		)));
	}

	let mut block = text.to_string();
	if !block.ends_with('\n') {
		block.push('\n');
	}

	let updated = if after_line == count && !content.is_empty() && !content.ends_with('\n') {
		format!("{}\n{}", content, block)
	} else {
		let offset: usize = content
			.split_inclusive('\n')
			.take(after_line)
			.map(str::len)
			.sum();
		let mut out = String::with_capacity(content.len() + block.len());
		out.push_str(&content[..offset]);
		out.push_str(&block);
		out.push_str(&content[offset..]);
		out
	};
	tree.update_file(path, &updated)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split on `\n`. A trailing newline does not start a new line and an
/// empty string has no lines.
fn split_lines(content: &str) -> Vec<&str> {
	if content.is_empty() {
		return Vec::new();
	}
	content
		.strip_suffix('\n')
		.unwrap_or(content)
		.split('\n')
		.collect()
}

/// Occurrences of `needle`, overlapping ones included.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
	let step = needle.chars().next().map_or(1, char::len_utf8);
	let mut count = 0;
	let mut start = 0;
	while let Some(pos) = haystack[start..].find(needle) {
		count += 1;
		start += pos + step;
	}
	count
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
