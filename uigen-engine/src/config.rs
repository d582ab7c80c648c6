use clap::Parser;
use uigen_preview::config::{DEFAULT_JSX_IMPORT_SOURCE, DEFAULT_ROOT_ALIAS, DEFAULT_RUNTIME_MODULES};
use uigen_preview::PreviewConfig;
use uigen_vfs::{TreeConfig, VfsLimits};

#[derive(Parser, Debug)]
#[command(name = "uigen-engine", about = "In-memory project tree and live-preview server over JSON-RPC")]
pub struct CliArgs {
    /// Import prefix mapped to the project root
    #[arg(long, default_value = DEFAULT_ROOT_ALIAS, env = "UIGEN_ROOT_ALIAS")]
    pub root_alias: String,

    /// Bare module the preview page provides (repeatable). Defaults to react, react-dom and clsx.
    #[arg(long = "runtime-module", env = "UIGEN_RUNTIME_MODULES", value_delimiter = ',')]
    pub runtime_modules: Vec<String>,

    /// Module providing createElement and Fragment for compiled JSX
    #[arg(long, default_value = DEFAULT_JSX_IMPORT_SOURCE, env = "UIGEN_JSX_IMPORT_SOURCE")]
    pub jsx_import_source: String,

    /// Maximum size of a single file in bytes
    #[arg(long, env = "UIGEN_MAX_FILE_SIZE")]
    pub max_file_size: Option<u64>,

    /// Maximum number of nodes in the tree
    #[arg(long, env = "UIGEN_MAX_NODE_COUNT")]
    pub max_node_count: Option<usize>,

    /// Fail with a missing-parent error instead of creating ancestor directories
    #[arg(long, env = "UIGEN_NO_AUTO_CREATE_PARENTS")]
    pub no_auto_create_parents: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "UIGEN_LOG_LEVEL")]
    pub log_level: String,
}

impl CliArgs {
    pub fn preview_config(&self) -> PreviewConfig {
        let runtime_modules = if self.runtime_modules.is_empty() {
            DEFAULT_RUNTIME_MODULES.iter().map(|s| s.to_string()).collect()
        } else {
            self.runtime_modules.clone()
        };
        PreviewConfig {
            root_alias: self.root_alias.clone(),
            runtime_modules,
            jsx_import_source: self.jsx_import_source.clone(),
            ..PreviewConfig::default()
        }
    }

    pub fn tree_config(&self) -> TreeConfig {
        let defaults = VfsLimits::default();
        TreeConfig {
            limits: VfsLimits {
                max_file_size: self.max_file_size.unwrap_or(defaults.max_file_size),
                max_node_count: self.max_node_count.unwrap_or(defaults.max_node_count),
                ..defaults
            },
            auto_create_parents: !self.no_auto_create_parents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let args = CliArgs::parse_from(["uigen-engine"]);
        assert_eq!(args.preview_config(), PreviewConfig::default());
        let tree = args.tree_config();
        assert_eq!(tree.limits, VfsLimits::default());
        assert!(tree.auto_create_parents);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn flags_override() {
        let args = CliArgs::parse_from([
            "uigen-engine",
            "--root-alias",
            "~/",
            "--runtime-module",
            "react",
            "--runtime-module",
            "lucide-react",
            "--max-node-count",
            "10",
            "--no-auto-create-parents",
        ]);
        let preview = args.preview_config();
        assert_eq!(preview.root_alias, "~/");
        assert_eq!(preview.runtime_modules, vec!["react", "lucide-react"]);
        let tree = args.tree_config();
        assert_eq!(tree.limits.max_node_count, 10);
        assert!(!tree.auto_create_parents);
    }
}
