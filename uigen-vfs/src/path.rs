use crate::error::VfsError;

// ── Constants ───────────────────────────────────────────────────────────────

pub const ROOT: &str = "/";

// ── Limits ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsLimits {
    pub max_file_size: u64,
    pub max_total_size: u64,
    pub max_path_depth: usize,
    pub max_name_length: usize,
    pub max_node_count: usize,
    pub max_path_length: usize,
}

impl Default for VfsLimits {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024,        // 1 MB
            max_total_size: 20 * 1024 * 1024,  // 20 MB
            max_path_depth: 32,
            max_name_length: 255,
            max_node_count: 5_000,
            max_path_length: 1024,
        }
    }
}

// ── Path functions ──────────────────────────────────────────────────────────

/// Normalize a virtual path: replace backslashes, add the leading `/`,
/// collapse repeated separators, drop `.` segments and resolve `..`.
///
/// A `..` that would climb above the root is rejected rather than clamped.
pub fn normalize_path(input: &str) -> Result<String, VfsError> {
    if input.is_empty() {
        return Err(VfsError::InvalidPath("Path cannot be empty".to_string()));
    }

    let p = input.replace('\\', "/");
    let mut resolved: Vec<&str> = Vec::new();

    for seg in p.split('/') {
        match seg {
            "" | "." => continue,
            ".." => {
                if resolved.pop().is_none() {
                    return Err(VfsError::InvalidPath(format!(
                        "Path escapes the project root: {}",
                        input
                    )));
                }
            }
            other => resolved.push(other),
        }
    }

    if resolved.is_empty() {
        Ok(ROOT.to_string())
    } else {
        Ok(format!("/{}", resolved.join("/")))
    }
}

/// Resolve `relative` against the directory `dir`. An absolute `relative`
/// ignores `dir`.
pub fn join_path(dir: &str, relative: &str) -> Result<String, VfsError> {
    if relative.starts_with('/') {
        return normalize_path(relative);
    }
    normalize_path(&format!("{}/{}", dir, relative))
}

pub fn is_root(normalized_path: &str) -> bool {
    normalized_path == ROOT
}

/// Return the parent path of a normalized path.
/// Returns `None` for the root path.
pub fn parent_path(normalized_path: &str) -> Option<String> {
    if is_root(normalized_path) {
        return None;
    }
    match normalized_path.rfind('/') {
        Some(0) | None => Some(ROOT.to_string()),
        Some(pos) => Some(normalized_path[..pos].to_string()),
    }
}

/// Return the final segment of a normalized path.
/// Returns an empty string for the root path.
pub fn base_name(normalized_path: &str) -> &str {
    if is_root(normalized_path) {
        return "";
    }
    match normalized_path.rfind('/') {
        Some(pos) => &normalized_path[pos + 1..],
        None => normalized_path,
    }
}

/// Return all ancestor paths of a normalized path, from root to parent.
/// Does not include the path itself.
pub fn ancestor_paths(normalized_path: &str) -> Vec<String> {
    if is_root(normalized_path) {
        return Vec::new();
    }
    let mut result = vec![ROOT.to_string()];
    let segments: Vec<&str> = normalized_path.split('/').filter(|s| !s.is_empty()).collect();
    for i in 0..segments.len().saturating_sub(1) {
        result.push(format!("/{}", segments[..=i].join("/")));
    }
    result
}

/// Root has depth 0, `/foo` has depth 1, `/foo/bar` has depth 2, etc.
pub fn path_depth(normalized_path: &str) -> usize {
    normalized_path.split('/').filter(|s| !s.is_empty()).count()
}

/// Extension of the final segment without the dot (`"tsx"` for `/App.tsx`).
/// Dotfiles such as `/.env` have no extension.
pub fn extension(normalized_path: &str) -> Option<&str> {
    let name = base_name(normalized_path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(pos) => Some(&name[pos + 1..]),
    }
}

/// The path with the extension of its final segment removed.
pub fn strip_extension(normalized_path: &str) -> &str {
    match extension(normalized_path) {
        Some(ext) => &normalized_path[..normalized_path.len() - ext.len() - 1],
        None => normalized_path,
    }
}

/// Check if a path segment contains forbidden characters (control chars).
fn has_forbidden_chars(segment: &str) -> bool {
    segment.bytes().any(|b| b <= 0x1f || b == 0x7f)
}

/// Validate a single path segment. Returns `Some(error_message)` if invalid.
pub fn validate_segment(segment: &str, max_name_length: usize) -> Option<String> {
    if segment.is_empty() {
        return Some("Path segment cannot be empty".to_string());
    }
    if segment.len() > max_name_length {
        return Some(format!(
            "Path segment exceeds max name length ({})",
            max_name_length
        ));
    }
    if has_forbidden_chars(segment) {
        return Some("Path segment contains forbidden characters".to_string());
    }
    None
}

/// Validate a normalized path against limits. Returns `Some(error_message)` if invalid.
pub fn validate_path(normalized_path: &str, limits: &VfsLimits) -> Option<String> {
    if normalized_path.len() > limits.max_path_length {
        return Some(format!(
            "Path exceeds max length ({})",
            limits.max_path_length
        ));
    }
    let depth = path_depth(normalized_path);
    if depth > limits.max_path_depth {
        return Some(format!(
            "Path exceeds max depth ({})",
            limits.max_path_depth
        ));
    }
    for seg in normalized_path.split('/').filter(|s| !s.is_empty()) {
        if let Some(err) = validate_segment(seg, limits.max_name_length) {
            return Some(err);
        }
    }
    None
}

// ── Tests ───────────────────────────────────────────────────────────────────
