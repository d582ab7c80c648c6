use std::collections::BTreeSet;

use uigen_vfs::path::{extension, parent_path, ROOT};

use crate::error::PreviewError;

/// Checked in order before falling back to any root-level component.
pub const ENTRY_CANDIDATES: [&str; 4] = ["/App.tsx", "/App.jsx", "/index.tsx", "/index.jsx"];

/// Pick the module the preview boots from.
pub fn resolve_entry<'a>(paths: impl IntoIterator<Item = &'a str>) -> Result<String, PreviewError> {
	let paths: BTreeSet<&str> = paths.into_iter().collect();

	if let Some(found) = ENTRY_CANDIDATES.iter().find(|c| paths.contains(**c)) {
		return Ok(found.to_string());
	}

	paths
		.iter()
		.find(|p| {
			parent_path(p).as_deref() == Some(ROOT) && matches!(extension(p), Some("jsx" | "tsx"))
		})
		.map(|p| p.to_string())
		.ok_or(PreviewError::NoEntryFound)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn app_beats_index() {
		assert_eq!(resolve_entry(["/index.tsx", "/App.tsx"]).unwrap(), "/App.tsx");
	}

	#[test]
	fn precedence_order() {
		assert_eq!(resolve_entry(["/index.jsx", "/App.jsx"]).unwrap(), "/App.jsx");
		assert_eq!(resolve_entry(["/index.jsx", "/index.tsx"]).unwrap(), "/index.tsx");
	}

	#[test]
	fn falls_back_to_first_root_component() {
		assert_eq!(
			resolve_entry(["/Zed.tsx", "/Main.jsx", "/components/A.tsx", "/util.ts"]).unwrap(),
			"/Main.jsx"
		);
	}

	#[test]
	fn nested_components_do_not_count() {
		assert_eq!(
			resolve_entry(["/components/App.tsx", "/util.ts", "/styles.css"]),
			Err(PreviewError::NoEntryFound)
		);
	}

	#[test]
	fn empty_tree_has_no_entry() {
		assert_eq!(resolve_entry([]), Err(PreviewError::NoEntryFound));
	}
}
