pub const DEFAULT_ROOT_ALIAS: &str = "@/";
pub const DEFAULT_RUNTIME_MODULES: &[&str] = &["react", "react-dom", "clsx"];
pub const DEFAULT_CANDIDATE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];
pub const DEFAULT_JSX_IMPORT_SOURCE: &str = "react";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    /// Prefix mapped to the tree root (`@/components/Button` → `/components/Button`).
    pub root_alias: String,
    /// Bare specifiers left untouched for the host page's import map.
    /// Subpaths (`react-dom/client`) are allowed too.
    pub runtime_modules: Vec<String>,
    /// Tried in order when a specifier has no extension, without the dot.
    pub candidate_extensions: Vec<String>,
    /// Module providing `createElement` and `Fragment` for JSX.
    pub jsx_import_source: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            root_alias: DEFAULT_ROOT_ALIAS.to_string(),
            runtime_modules: DEFAULT_RUNTIME_MODULES.iter().map(|s| s.to_string()).collect(),
            candidate_extensions: DEFAULT_CANDIDATE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            jsx_import_source: DEFAULT_JSX_IMPORT_SOURCE.to_string(),
        }
    }
}

impl PreviewConfig {
    pub fn is_runtime(&self, specifier: &str) -> bool {
        self.runtime_modules.iter().any(|module| {
            specifier == module
                || specifier
                    .strip_prefix(module.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
