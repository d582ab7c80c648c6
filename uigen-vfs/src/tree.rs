// ---------------------------------------------------------------------------
// Virtual file tree: arena of path → node, rooted at `/`
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::VfsError;
use crate::path::{
	ancestor_paths, base_name, is_root, normalize_path, parent_path, validate_path, VfsLimits,
	ROOT,
};

// ---------------------------------------------------------------------------
// Node types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	File,
	Directory,
}

impl NodeKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::File => "file",
			Self::Directory => "directory",
		}
	}
}

/// A single entry in the tree. Directories hold the *names* of their
/// children in insertion order; the full child path is `path + "/" + name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualNode {
	File {
		path: String,
		content: String,
		last_modified: u64,
	},
	Directory {
		path: String,
		children: Vec<String>,
	},
}

impl VirtualNode {
	pub fn path(&self) -> &str {
		match self {
			Self::File { path, .. } | Self::Directory { path, .. } => path,
		}
	}

	pub fn kind(&self) -> NodeKind {
		match self {
			Self::File { .. } => NodeKind::File,
			Self::Directory { .. } => NodeKind::Directory,
		}
	}

	fn set_path(&mut self, new_path: String) {
		match self {
			Self::File { path, .. } | Self::Directory { path, .. } => *path = new_path,
		}
	}

	fn root() -> Self {
		Self::Directory {
			path: ROOT.to_string(),
			children: Vec::new(),
		}
	}
}

// ---------------------------------------------------------------------------
// Public result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
	pub path: String,
	#[serde(rename = "type")]
	pub kind: NodeKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
}

/// Ordered records sufficient to rebuild a tree. Parents always precede
/// their children and siblings keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
	pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
	pub fn file(path: impl Into<String>, content: impl Into<String>) -> SnapshotEntry {
		SnapshotEntry {
			path: path.into(),
			kind: NodeKind::File,
			content: Some(content.into()),
		}
	}

	pub fn directory(path: impl Into<String>) -> SnapshotEntry {
		SnapshotEntry {
			path: path.into(),
			kind: NodeKind::Directory,
			content: None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeMetrics {
	pub total_size: u64,
	pub node_count: usize,
	pub file_count: usize,
	pub directory_count: usize,
}

#[derive(Debug, Clone)]
pub struct TreeConfig {
	pub limits: VfsLimits,
	/// Create missing ancestor directories on file/directory creation.
	/// When off, creation under an absent parent fails with `MissingParent`.
	pub auto_create_parents: bool,
}

impl Default for TreeConfig {
	fn default() -> Self {
		Self {
			limits: VfsLimits::default(),
			auto_create_parents: true,
		}
	}
}

// ---------------------------------------------------------------------------
// VirtualFileTree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VirtualFileTree {
	nodes: HashMap<String, VirtualNode>,
	config: TreeConfig,
	revision: u64,
	total_size: u64,
}

impl Default for VirtualFileTree {
	fn default() -> Self {
		Self::new(TreeConfig::default())
	}
}

impl VirtualFileTree {
	// -- Constructors -----------------------------------------------------

	pub fn new(config: TreeConfig) -> Self {
		let mut nodes = HashMap::new();
		nodes.insert(ROOT.to_string(), VirtualNode::root());
		Self {
			nodes,
			config,
			revision: 0,
			total_size: 0,
		}
	}

	/// Build a fresh tree from a snapshot. The snapshot is fully validated
	/// before any node is created.
	pub fn deserialize(snapshot: &Snapshot, config: TreeConfig) -> Result<Self, VfsError> {
		let mut tree = Self::new(config);
		let (nodes, total_size) = tree.build_nodes(snapshot)?;
		tree.nodes = nodes;
		tree.total_size = total_size;
		Ok(tree)
	}

	// -- Accessors --------------------------------------------------------

	/// Monotonic counter bumped by every successful mutation.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	pub fn config(&self) -> &TreeConfig {
		&self.config
	}

	/// Path-indexed lookup. Invalid paths simply miss.
	pub fn node(&self, path: &str) -> Option<&VirtualNode> {
		let normalized = normalize_path(path).ok()?;
		self.nodes.get(&normalized)
	}

	// -- Helpers (private) ------------------------------------------------

	fn now() -> u64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or_default()
			.as_millis() as u64
	}

	fn bump(&mut self) {
		self.revision += 1;
	}

	fn resolve(&self, path: &str) -> Result<String, VfsError> {
		let normalized = normalize_path(path)?;
		if let Some(err) = validate_path(&normalized, &self.config.limits) {
			return Err(VfsError::InvalidPath(format!("{}: {}", path, err)));
		}
		Ok(normalized)
	}

	fn assert_file_size(&self, size: u64, path: &str) -> Result<(), VfsError> {
		if size > self.config.limits.max_file_size {
			return Err(VfsError::LimitExceeded(format!(
				"File size {} exceeds limit ({}): {}",
				size, self.config.limits.max_file_size, path
			)));
		}
		Ok(())
	}

	fn assert_total_size(&self, old_size: u64, new_size: u64) -> Result<(), VfsError> {
		let projected = self.total_size - old_size + new_size;
		if projected > self.config.limits.max_total_size {
			return Err(VfsError::LimitExceeded(format!(
				"Total storage size would exceed limit ({})",
				self.config.limits.max_total_size
			)));
		}
		Ok(())
	}

	fn assert_node_capacity(&self, additional: usize) -> Result<(), VfsError> {
		if self.nodes.len() + additional > self.config.limits.max_node_count {
			return Err(VfsError::LimitExceeded(format!(
				"Maximum node count exceeded ({})",
				self.config.limits.max_node_count
			)));
		}
		Ok(())
	}

	/// Work out which ancestors of `path` must be created, without touching
	/// the tree. Fails if an ancestor is a file, or if one is missing and
	/// auto-creation is off.
	fn plan_parents(&self, path: &str) -> Result<Vec<String>, VfsError> {
		let mut missing = Vec::new();
		for ancestor in ancestor_paths(path) {
			match self.nodes.get(&ancestor) {
				Some(VirtualNode::Directory { .. }) => {}
				Some(VirtualNode::File { .. }) => {
					return Err(VfsError::PathConflict(format!(
						"{} is a file, not a directory",
						ancestor
					)));
				}
				None if self.config.auto_create_parents => missing.push(ancestor),
				None => return Err(VfsError::MissingParent(ancestor)),
			}
		}
		Ok(missing)
	}

	fn create_planned(&mut self, missing: Vec<String>) {
		for dir in missing {
			tracing::debug!(path = %dir, "auto-creating directory");
			attach(&mut self.nodes, &dir);
			self.nodes.insert(
				dir.clone(),
				VirtualNode::Directory {
					path: dir,
					children: Vec::new(),
				},
			);
		}
	}

	/// All descendants of a directory, parents before children.
	fn descendants(&self, dir_path: &str) -> Vec<String> {
		let mut out = Vec::new();
		self.collect_descendants(dir_path, &mut out);
		out
	}

	fn collect_descendants(&self, dir_path: &str, out: &mut Vec<String>) {
		if let Some(VirtualNode::Directory { children, .. }) = self.nodes.get(dir_path) {
			for name in children {
				let child = child_path(dir_path, name);
				out.push(child.clone());
				self.collect_descendants(&child, out);
			}
		}
	}

	// -- File operations --------------------------------------------------

	/// Create a new file. Fails with `AlreadyExists` when a file is already
	/// present; modification goes through `update_file`.
	pub fn create_file(&mut self, path: &str, content: &str) -> Result<(), VfsError> {
		let normalized = self.resolve(path)?;
		match self.nodes.get(&normalized) {
			Some(VirtualNode::File { .. }) => {
				return Err(VfsError::AlreadyExists(normalized));
			}
			Some(VirtualNode::Directory { .. }) => {
				return Err(VfsError::PathConflict(format!(
					"{} is a directory",
					normalized
				)));
			}
			None => {}
		}

		let size = content.len() as u64;
		self.assert_file_size(size, &normalized)?;
		self.assert_total_size(0, size)?;
		let missing = self.plan_parents(&normalized)?;
		self.assert_node_capacity(missing.len() + 1)?;

		self.create_planned(missing);
		attach(&mut self.nodes, &normalized);
		self.nodes.insert(
			normalized.clone(),
			VirtualNode::File {
				path: normalized.clone(),
				content: content.to_string(),
				last_modified: Self::now(),
			},
		);
		self.total_size += size;
		self.bump();

		tracing::debug!(path = %normalized, bytes = size, revision = self.revision, "created file");
		Ok(())
	}

	pub fn read_file(&self, path: &str) -> Result<&str, VfsError> {
		let normalized = self.resolve(path)?;
		match self.nodes.get(&normalized) {
			Some(VirtualNode::File { content, .. }) => Ok(content),
			Some(VirtualNode::Directory { .. }) => Err(VfsError::NotFound(format!(
				"{} is a directory, not a file",
				normalized
			))),
			None => Err(VfsError::NotFound(normalized)),
		}
	}

	pub fn update_file(&mut self, path: &str, content: &str) -> Result<(), VfsError> {
		let normalized = self.resolve(path)?;
		let old_size = match self.nodes.get(&normalized) {
			Some(VirtualNode::File { content, .. }) => content.len() as u64,
			Some(VirtualNode::Directory { .. }) => {
				return Err(VfsError::NotFound(format!(
					"{} is a directory, not a file",
					normalized
				)));
			}
			None => return Err(VfsError::NotFound(normalized)),
		};

		let new_size = content.len() as u64;
		self.assert_file_size(new_size, &normalized)?;
		self.assert_total_size(old_size, new_size)?;

		if let Some(VirtualNode::File {
			content: current,
			last_modified,
			..
		}) = self.nodes.get_mut(&normalized)
		{
			*current = content.to_string();
			*last_modified = Self::now();
		}
		self.total_size = self.total_size - old_size + new_size;
		self.bump();

		tracing::debug!(path = %normalized, bytes = new_size, revision = self.revision, "updated file");
		Ok(())
	}

	// -- Directory operations ---------------------------------------------

	/// Create a directory. Creating an existing directory is a no-op.
	pub fn create_directory(&mut self, path: &str) -> Result<(), VfsError> {
		let normalized = self.resolve(path)?;
		match self.nodes.get(&normalized) {
			Some(VirtualNode::Directory { .. }) => return Ok(()),
			Some(VirtualNode::File { .. }) => {
				return Err(VfsError::PathConflict(format!("{} is a file", normalized)));
			}
			None => {}
		}

		let missing = self.plan_parents(&normalized)?;
		self.assert_node_capacity(missing.len() + 1)?;

		self.create_planned(missing);
		attach(&mut self.nodes, &normalized);
		self.nodes.insert(
			normalized.clone(),
			VirtualNode::Directory {
				path: normalized.clone(),
				children: Vec::new(),
			},
		);
		self.bump();

		tracing::debug!(path = %normalized, revision = self.revision, "created directory");
		Ok(())
	}

	/// Immediate children of a directory, in insertion order.
	pub fn list(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
		let normalized = self.resolve(path)?;
		let children = match self.nodes.get(&normalized) {
			Some(VirtualNode::Directory { children, .. }) => children,
			Some(VirtualNode::File { .. }) => {
				return Err(VfsError::PathConflict(format!(
					"{} is a file, not a directory",
					normalized
				)));
			}
			None => return Err(VfsError::NotFound(normalized)),
		};

		let mut entries = Vec::with_capacity(children.len());
		for name in children {
			if let Some(node) = self.nodes.get(&child_path(&normalized, name)) {
				entries.push(DirEntry {
					name: name.clone(),
					kind: node.kind(),
				});
			}
		}
		Ok(entries)
	}

	// -- Shared operations ------------------------------------------------

	/// Remove a file, or a directory together with its whole subtree.
	pub fn delete(&mut self, path: &str) -> Result<(), VfsError> {
		let normalized = self.resolve(path)?;
		if is_root(&normalized) {
			return Err(VfsError::InvalidOperation(
				"Cannot delete the root directory".to_string(),
			));
		}
		if !self.nodes.contains_key(&normalized) {
			return Err(VfsError::NotFound(normalized));
		}

		let mut doomed = self.descendants(&normalized);
		doomed.push(normalized.clone());
		for p in &doomed {
			if let Some(VirtualNode::File { content, .. }) = self.nodes.remove(p) {
				self.total_size -= content.len() as u64;
			}
		}
		detach(&mut self.nodes, &normalized);
		self.bump();

		tracing::debug!(path = %normalized, removed = doomed.len(), revision = self.revision, "deleted");
		Ok(())
	}

	pub fn exists(&self, path: &str) -> bool {
		self.node(path).is_some()
	}

	/// Move a file or a directory subtree to a new path.
	pub fn rename(&mut self, from: &str, to: &str) -> Result<(), VfsError> {
		let from = self.resolve(from)?;
		let to = self.resolve(to)?;

		if is_root(&from) || is_root(&to) {
			return Err(VfsError::InvalidOperation(
				"Cannot rename the root directory".to_string(),
			));
		}
		if from == to {
			return Ok(());
		}

		let kind = match self.nodes.get(&from) {
			Some(node) => node.kind(),
			None => return Err(VfsError::NotFound(from)),
		};
		if kind == NodeKind::Directory && to.starts_with(&format!("{}/", from)) {
			return Err(VfsError::InvalidOperation(format!(
				"Cannot move directory into its own descendant: {} -> {}",
				from, to
			)));
		}
		if self.nodes.contains_key(&to) {
			return Err(VfsError::AlreadyExists(to));
		}

		let missing = self.plan_parents(&to)?;
		self.assert_node_capacity(missing.len())?;
		self.create_planned(missing);

		let mut moved = vec![from.clone()];
		moved.extend(self.descendants(&from));
		detach(&mut self.nodes, &from);

		for old_path in moved {
			if let Some(mut node) = self.nodes.remove(&old_path) {
				let new_path = format!("{}{}", to, &old_path[from.len()..]);
				node.set_path(new_path.clone());
				self.nodes.insert(new_path, node);
			}
		}
		attach(&mut self.nodes, &to);
		self.bump();

		tracing::debug!(from = %from, to = %to, revision = self.revision, "renamed");
		Ok(())
	}

	// -- Queries ----------------------------------------------------------

	/// Every file as `(path, content)`, in lexical path order.
	pub fn files(&self) -> Vec<(&str, &str)> {
		let mut files: Vec<(&str, &str)> = self
			.nodes
			.values()
			.filter_map(|node| match node {
				VirtualNode::File { path, content, .. } => Some((path.as_str(), content.as_str())),
				VirtualNode::Directory { .. } => None,
			})
			.collect();
		files.sort_by(|a, b| a.0.cmp(b.0));
		files
	}

	pub fn metrics(&self) -> TreeMetrics {
		let file_count = self
			.nodes
			.values()
			.filter(|n| n.kind() == NodeKind::File)
			.count();
		TreeMetrics {
			total_size: self.total_size,
			node_count: self.nodes.len(),
			file_count,
			directory_count: self.nodes.len() - file_count,
		}
	}

	/// ASCII rendering of the tree, directories suffixed with `/`.
	pub fn render_tree(&self) -> String {
		let mut lines = vec![ROOT.to_string()];
		self.build_tree(ROOT, "", &mut lines);
		lines.join("\n")
	}

	fn build_tree(&self, dir_path: &str, prefix: &str, lines: &mut Vec<String>) {
		let mut children = match self.nodes.get(dir_path) {
			Some(VirtualNode::Directory { children, .. }) => children.clone(),
			_ => return,
		};
		children.sort();

		for (i, name) in children.iter().enumerate() {
			let child = child_path(dir_path, name);
			let Some(node) = self.nodes.get(&child) else {
				continue;
			};
			let is_last = i == children.len() - 1;
			let connector = if is_last {
				"\u{2514}\u{2500}\u{2500} "
			} else {
				"\u{251C}\u{2500}\u{2500} "
			};
			let child_prefix = if is_last { "    " } else { "\u{2502}   " };

			match node {
				VirtualNode::Directory { .. } => {
					lines.push(format!("{}{}{}/", prefix, connector, name));
					self.build_tree(&child, &format!("{}{}", prefix, child_prefix), lines);
				}
				VirtualNode::File { content, .. } => {
					lines.push(format!(
						"{}{}{} ({} bytes)",
						prefix,
						connector,
						name,
						content.len()
					));
				}
			}
		}
	}

	// -- Snapshot & Restore -----------------------------------------------

	pub fn serialize(&self) -> Snapshot {
		let mut entries = Vec::with_capacity(self.nodes.len().saturating_sub(1));
		for path in self.descendants(ROOT) {
			match self.nodes.get(&path) {
				Some(VirtualNode::File { content, .. }) => {
					entries.push(Snapshot::file(path, content.clone()));
				}
				Some(VirtualNode::Directory { .. }) => entries.push(Snapshot::directory(path)),
				None => {}
			}
		}
		Snapshot { entries }
	}

	/// Replace the whole tree with the snapshot's contents. On error the
	/// tree is left untouched.
	pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), VfsError> {
		let (nodes, total_size) = self.build_nodes(snapshot)?;
		self.nodes = nodes;
		self.total_size = total_size;
		self.bump();

		tracing::info!(
			nodes = self.nodes.len(),
			revision = self.revision,
			"restored tree from snapshot"
		);
		Ok(())
	}

	/// Reset to an empty root.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.nodes.insert(ROOT.to_string(), VirtualNode::root());
		self.total_size = 0;
		self.bump();
	}

	fn build_nodes(
		&self,
		snapshot: &Snapshot,
	) -> Result<(HashMap<String, VirtualNode>, u64), VfsError> {
		let limits = &self.config.limits;
		let ts = Self::now();
		let mut nodes: HashMap<String, VirtualNode> = HashMap::new();
		nodes.insert(ROOT.to_string(), VirtualNode::root());
		let mut total_size: u64 = 0;

		for entry in &snapshot.entries {
			let normalized = self.resolve(&entry.path)?;
			if is_root(&normalized) {
				if entry.kind == NodeKind::Directory {
					continue;
				}
				return Err(VfsError::PathConflict("/ must be a directory".to_string()));
			}
			if nodes.contains_key(&normalized) {
				return Err(VfsError::PathConflict(format!(
					"Duplicate snapshot entry: {}",
					normalized
				)));
			}

			let parent = parent_path(&normalized).unwrap_or_else(|| ROOT.to_string());
			match nodes.get(&parent) {
				Some(VirtualNode::Directory { .. }) => {}
				Some(VirtualNode::File { .. }) => {
					return Err(VfsError::PathConflict(format!(
						"{} is a file, not a directory",
						parent
					)));
				}
				None => return Err(VfsError::MissingParent(parent)),
			}

			let node = match entry.kind {
				NodeKind::File => {
					let content = entry.content.clone().unwrap_or_default();
					let size = content.len() as u64;
					if size > limits.max_file_size {
						return Err(VfsError::LimitExceeded(format!(
							"File size {} exceeds limit ({}): {}",
							size, limits.max_file_size, normalized
						)));
					}
					total_size += size;
					VirtualNode::File {
						path: normalized.clone(),
						content,
						last_modified: ts,
					}
				}
				NodeKind::Directory => VirtualNode::Directory {
					path: normalized.clone(),
					children: Vec::new(),
				},
			};

			attach(&mut nodes, &normalized);
			nodes.insert(normalized, node);
		}

		if nodes.len() > limits.max_node_count {
			return Err(VfsError::LimitExceeded(format!(
				"Snapshot node count {} exceeds limit ({})",
				nodes.len(),
				limits.max_node_count
			)));
		}
		if total_size > limits.max_total_size {
			return Err(VfsError::LimitExceeded(format!(
				"Snapshot total size {} exceeds limit ({})",
				total_size, limits.max_total_size
			)));
		}

		Ok((nodes, total_size))
	}
}

// ---------------------------------------------------------------------------
// Arena helpers
// ---------------------------------------------------------------------------

fn child_path(dir: &str, name: &str) -> String {
	if is_root(dir) {
		format!("/{}", name)
	} else {
		format!("{}/{}", dir, name)
	}
}

/// Record `path`'s name in its parent's child list.
fn attach(nodes: &mut HashMap<String, VirtualNode>, path: &str) {
	let Some(parent) = parent_path(path) else {
		return;
	};
	let name = base_name(path);
	if let Some(VirtualNode::Directory { children, .. }) = nodes.get_mut(&parent) {
		if !children.iter().any(|c| c == name) {
			children.push(name.to_string());
		}
	}
}

/// Drop `path`'s name from its parent's child list.
fn detach(nodes: &mut HashMap<String, VirtualNode>, path: &str) {
	let Some(parent) = parent_path(path) else {
		return;
	};
	let name = base_name(path);
	if let Some(VirtualNode::Directory { children, .. }) = nodes.get_mut(&parent) {
		children.retain(|c| c != name);
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
