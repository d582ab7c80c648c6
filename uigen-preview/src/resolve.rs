// ---------------------------------------------------------------------------
// Specifier resolution against the set of files in the tree
// ---------------------------------------------------------------------------

use std::collections::BTreeSet;

use uigen_vfs::path::{extension, join_path, normalize_path, parent_path, ROOT};

use crate::config::PreviewConfig;

/// Prefix of the import-map key a failed specifier is rewritten to.
pub const SENTINEL_PREFIX: &str = "missing:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
	/// A code module in the tree, by absolute path.
	Local(String),
	/// A `.css` reference. Local paths are absolute; other specifiers
	/// (CDN URLs, package stylesheets) are kept verbatim.
	Stylesheet { path: String, missing: bool },
	/// Allow-listed runtime module, left as written.
	Runtime,
	/// Relative, absolute or aliased specifier that matched no file.
	NotFound,
	/// Bare specifier outside the allow-list.
	Unsupported,
}

pub fn is_code_file(path: &str) -> bool {
	matches!(extension(path), Some("tsx" | "ts" | "jsx" | "js"))
}

pub fn is_stylesheet(path: &str) -> bool {
	extension(path) == Some("css")
}

pub fn sentinel_key(specifier: &str) -> String {
	format!("{}{}", SENTINEL_PREFIX, specifier)
}

/// Map a specifier as written in `importer` to what it refers to.
pub fn resolve_specifier(
	specifier: &str,
	importer: &str,
	known: &BTreeSet<String>,
	config: &PreviewConfig,
) -> Resolved {
	if config.is_runtime(specifier) {
		return Resolved::Runtime;
	}

	let Some(base) = local_base(specifier, importer, config) else {
		if specifier.ends_with(".css") {
			return Resolved::Stylesheet {
				path: specifier.to_string(),
				missing: false,
			};
		}
		return Resolved::Unsupported;
	};

	let Ok(base) = base else {
		return Resolved::NotFound;
	};

	if is_stylesheet(&base) {
		return Resolved::Stylesheet {
			missing: !known.contains(&base),
			path: base,
		};
	}

	match lookup_module(&base, known, config) {
		Some(path) => Resolved::Local(path),
		None => Resolved::NotFound,
	}
}

/// The absolute path a local specifier points at, before extension probing.
/// `None` for bare specifiers.
fn local_base(
	specifier: &str,
	importer: &str,
	config: &PreviewConfig,
) -> Option<Result<String, uigen_vfs::VfsError>> {
	if !config.root_alias.is_empty() {
		if let Some(rest) = specifier.strip_prefix(config.root_alias.as_str()) {
			return Some(normalize_path(&format!("/{}", rest)));
		}
	}
	if specifier.starts_with('/') {
		return Some(normalize_path(specifier));
	}
	if specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../") {
		let dir = parent_path(importer).unwrap_or_else(|| ROOT.to_string());
		return Some(join_path(&dir, specifier));
	}
	None
}

/// Exact path, then each candidate extension, then `index.<ext>` inside a
/// directory of that name.
pub fn lookup_module(base: &str, known: &BTreeSet<String>, config: &PreviewConfig) -> Option<String> {
	if is_code_file(base) && known.contains(base) {
		return Some(base.to_string());
	}
	for ext in &config.candidate_extensions {
		let candidate = format!("{}.{}", base, ext);
		if known.contains(&candidate) {
			return Some(candidate);
		}
	}
	let dir = base.trim_end_matches('/');
	for ext in &config.candidate_extensions {
		let candidate = format!("{}/index.{}", dir, ext);
		if known.contains(&candidate) {
			return Some(candidate);
		}
	}
	None
}
