// ---------------------------------------------------------------------------
// Session: one project tree plus the preview state derived from it
// ---------------------------------------------------------------------------

use uigen_preview::{
	BuildCoordinator, BuildOutcome, ImportMap, ImportMapBuilder, InMemoryRegistry, PreviewConfig,
	PreviewError, Resource, ResourceHandle, ResourceRegistry,
};
use uigen_vfs::{Snapshot, TreeConfig, VfsError, VirtualFileTree};

pub struct Session {
	pub tree: VirtualFileTree,
	preview: PreviewConfig,
	registry: InMemoryRegistry,
	coordinator: BuildCoordinator,
	live: Option<ImportMap>,
}

impl Session {
	pub fn new(tree_config: TreeConfig, preview: PreviewConfig) -> Self {
		Self::with_tree(VirtualFileTree::new(tree_config), preview)
	}

	pub fn from_snapshot(
		snapshot: &Snapshot,
		tree_config: TreeConfig,
		preview: PreviewConfig,
	) -> Result<Self, VfsError> {
		let tree = VirtualFileTree::deserialize(snapshot, tree_config)?;
		Ok(Self::with_tree(tree, preview))
	}

	fn with_tree(tree: VirtualFileTree, preview: PreviewConfig) -> Self {
		Self {
			tree,
			preview,
			registry: InMemoryRegistry::new(),
			coordinator: BuildCoordinator::new(),
			live: None,
		}
	}

	pub fn preview_config(&self) -> &PreviewConfig {
		&self.preview
	}

	/// No accepted pass reflects the current tree revision.
	pub fn is_stale(&self) -> bool {
		self.coordinator.live_revision() != Some(self.tree.revision())
	}

	/// Run one pass at the current revision. Returns the map when the pass
	/// was accepted.
	pub fn rebuild(&mut self) -> Option<&ImportMap> {
		let ticket = self.coordinator.begin(self.tree.revision());
		let output = ImportMapBuilder::new(&self.preview, &mut self.registry).build(&self.tree);
		match self.coordinator.complete(ticket, output) {
			BuildOutcome::Accepted(map) => {
				self.live = Some(map);
				self.live.as_ref()
			}
			BuildOutcome::Discarded { resources, .. } => {
				for handle in &resources {
					self.registry.release(handle);
				}
				None
			}
		}
	}

	/// The live map, building first when the tree has moved on.
	pub fn current_map(&mut self) -> Option<&ImportMap> {
		if self.is_stale() {
			self.rebuild();
		}
		self.live.as_ref()
	}

	pub fn resource(&self, handle: &str) -> Result<&Resource, PreviewError> {
		self.registry
			.get(&ResourceHandle::from(handle.to_string()))
			.ok_or_else(|| PreviewError::UnknownResource(handle.to_string()))
	}

	/// The renderer has switched to `revision`; free every older pass.
	pub fn release(&mut self, revision: u64) -> usize {
		let handles = self.coordinator.acknowledge(revision);
		let released = handles
			.iter()
			.filter(|handle| self.registry.release(handle))
			.count();
		tracing::debug!(revision, released, "released retired resources");
		released
	}

	pub fn resource_count(&self) -> usize {
		self.registry.len()
	}
}
