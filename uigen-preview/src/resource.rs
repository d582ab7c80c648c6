// ---------------------------------------------------------------------------
// Ephemeral resources the preview loads modules and stylesheets from
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const HANDLE_PREFIX: &str = "blob:uigen/";

/// Opaque identifier of one loadable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
	pub fn generate() -> Self {
		Self(format!("{}{}", HANDLE_PREFIX, uuid::Uuid::new_v4()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for ResourceHandle {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl fmt::Display for ResourceHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
	Module,
	Stylesheet,
	/// Stand-in for an unresolved import; throws when loaded.
	Sentinel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
	pub handle: ResourceHandle,
	pub kind: ResourceKind,
	pub module_path: String,
	pub code: String,
}

/// Allocates and frees resources. Handles stay valid until released.
pub trait ResourceRegistry {
	fn register(&mut self, module_path: &str, kind: ResourceKind, code: String) -> ResourceHandle;

	/// Returns `false` when the handle was unknown or already released.
	fn release(&mut self, handle: &ResourceHandle) -> bool;
}

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
	resources: HashMap<ResourceHandle, Resource>,
}

impl InMemoryRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, handle: &ResourceHandle) -> Option<&Resource> {
		self.resources.get(handle)
	}

	pub fn len(&self) -> usize {
		self.resources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.resources.is_empty()
	}
}

impl ResourceRegistry for InMemoryRegistry {
	fn register(&mut self, module_path: &str, kind: ResourceKind, code: String) -> ResourceHandle {
		let handle = ResourceHandle::generate();
		self.resources.insert(
			handle.clone(),
			Resource {
				handle: handle.clone(),
				kind,
				module_path: module_path.to_string(),
				code,
			},
		);
		handle
	}

	fn release(&mut self, handle: &ResourceHandle) -> bool {
		self.resources.remove(handle).is_some()
	}
}
