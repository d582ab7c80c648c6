// ---------------------------------------------------------------------------
// Import map builder: one full pass over the tree per revision
// ---------------------------------------------------------------------------

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use uigen_vfs::path::{base_name, parent_path, strip_extension};
use uigen_vfs::VirtualFileTree;

use crate::config::PreviewConfig;
use crate::diagnostic::Diagnostic;
use crate::entry::resolve_entry;
use crate::error::PreviewError;
use crate::resolve::{is_code_file, lookup_module};
use crate::resource::{ResourceHandle, ResourceKind, ResourceRegistry};
use crate::transform::{failing_module, transform, TransformedModule};

/// What the preview renderer consumes after every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMap {
	pub revision: u64,
	pub specifier_to_resource: BTreeMap<String, ResourceHandle>,
	pub css_imports: Vec<String>,
	pub diagnostics: Vec<Diagnostic>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub entry_path: Option<String>,
}

impl ImportMap {
	pub fn resource_for(&self, specifier: &str) -> Option<&ResourceHandle> {
		self.specifier_to_resource.get(specifier)
	}

	pub fn has_errors(&self) -> bool {
		self.diagnostics.iter().any(Diagnostic::is_error)
	}
}

/// Per-file outcome of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
	pub path: String,
	pub code: String,
	pub resource: ResourceHandle,
	pub css_imports: Vec<String>,
	pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct BuildOutput {
	pub import_map: ImportMap,
	pub modules: Vec<TransformResult>,
	/// Every handle registered by this pass.
	pub resources: Vec<ResourceHandle>,
}

pub struct ImportMapBuilder<'a, R: ResourceRegistry> {
	config: &'a PreviewConfig,
	registry: &'a mut R,
}

impl<'a, R: ResourceRegistry> ImportMapBuilder<'a, R> {
	pub fn new(config: &'a PreviewConfig, registry: &'a mut R) -> Self {
		Self { config, registry }
	}

	/// Transform every code file and register its resources. Never releases
	/// anything; that is up to the caller once the pass is superseded.
	pub fn build(&mut self, tree: &VirtualFileTree) -> BuildOutput {
		let files = tree.files();
		let known: BTreeSet<String> = files.iter().map(|(p, _)| p.to_string()).collect();

		let mut map = ImportMap {
			revision: tree.revision(),
			..ImportMap::default()
		};
		let mut modules = Vec::new();
		let mut resources = Vec::new();
		let mut sentinels: BTreeMap<String, String> = BTreeMap::new();

		for (path, content) in &files {
			if !is_code_file(path) {
				continue;
			}
			let module = match transform(path, content, &known, self.config) {
				Ok(module) => module,
				Err(e) => {
					tracing::warn!(path, error = %e, "transform failed");
					TransformedModule::failed(path, Diagnostic::error(*path, e.to_string()))
				}
			};

			let handle = self
				.registry
				.register(path, ResourceKind::Module, module.code.clone());
			resources.push(handle.clone());
			for key in self.module_keys(path, &known) {
				map.specifier_to_resource.insert(key, handle.clone());
			}

			for css in &module.css_imports {
				if !map.css_imports.contains(css) {
					map.css_imports.push(css.clone());
				}
			}
			for unresolved in &module.unresolved {
				sentinels
					.entry(unresolved.key.clone())
					.or_insert_with(|| unresolved.message.clone());
			}
			map.diagnostics.extend(module.diagnostics.iter().cloned());

			modules.push(TransformResult {
				path: module.path,
				code: module.code,
				resource: handle,
				css_imports: module.css_imports,
				diagnostics: module.diagnostics,
			});
		}

		for css in &map.css_imports {
			if !known.contains(css) {
				continue;
			}
			let content = tree.read_file(css).map(str::to_string).unwrap_or_default();
			let handle = self.registry.register(css, ResourceKind::Stylesheet, content);
			resources.push(handle.clone());
			map.specifier_to_resource.insert(css.clone(), handle);
		}

		for (key, message) in sentinels {
			let handle =
				self.registry
					.register(&key, ResourceKind::Sentinel, failing_module("Error", &message));
			resources.push(handle.clone());
			map.specifier_to_resource.insert(key, handle);
		}

		match resolve_entry(files.iter().map(|(p, _)| *p)) {
			Ok(entry) => map.entry_path = Some(entry),
			Err(e @ PreviewError::NoEntryFound) => {
				map.diagnostics.push(Diagnostic::warning("/", e.to_string()));
			}
			Err(e) => map.diagnostics.push(Diagnostic::error("/", e.to_string())),
		}

		tracing::info!(
			revision = map.revision,
			modules = modules.len(),
			resources = resources.len(),
			diagnostics = map.diagnostics.len(),
			"built import map"
		);

		BuildOutput {
			import_map: map,
			modules,
			resources,
		}
	}

	/// The module path itself plus the aliased and extensionless forms that
	/// resolve to it.
	fn module_keys(&self, path: &str, known: &BTreeSet<String>) -> Vec<String> {
		let alias = |p: &str| format!("{}{}", self.config.root_alias, p.trim_start_matches('/'));

		let mut keys = vec![path.to_string()];
		if !self.config.root_alias.is_empty() {
			keys.push(alias(path));
		}

		let mut bases = vec![strip_extension(path).to_string()];
		if strip_extension(base_name(path)) == "index" {
			if let Some(dir) = parent_path(path) {
				bases.push(dir);
			}
		}
		for base in bases {
			if base == "/" || lookup_module(&base, known, self.config).as_deref() != Some(path) {
				continue;
			}
			if !self.config.root_alias.is_empty() {
				keys.push(alias(&base));
			}
			keys.push(base);
		}
		keys
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostic::Severity;
	use crate::resource::InMemoryRegistry;

	fn tree(files: &[(&str, &str)]) -> VirtualFileTree {
		let mut tree = VirtualFileTree::default();
		for (path, content) in files {
			tree.create_file(path, content).unwrap();
		}
		tree
	}

	fn build(tree: &VirtualFileTree) -> (BuildOutput, InMemoryRegistry) {
		let config = PreviewConfig::default();
		let mut registry = InMemoryRegistry::new();
		let output = ImportMapBuilder::new(&config, &mut registry).build(tree);
		(output, registry)
	}

	#[test]
	fn maps_modules_and_aliases() {
		let t = tree(&[
			("/App.tsx", "import Button from '@/components/Button';\nexport default Button;\n"),
			("/components/Button.tsx", "export default () => null;\n"),
			("/components/ui/index.ts", "export const x = 1;\n"),
		]);
		let (output, registry) = build(&t);
		let map = &output.import_map;

		let button = map.resource_for("/components/Button.tsx").unwrap();
		for key in ["@/components/Button", "@/components/Button.tsx", "/components/Button"] {
			assert_eq!(map.resource_for(key), Some(button), "{}", key);
		}
		let ui = map.resource_for("/components/ui/index.ts").unwrap();
		assert_eq!(map.resource_for("@/components/ui"), Some(ui));
		assert_eq!(map.resource_for("/components/ui"), Some(ui));

		assert_eq!(map.entry_path.as_deref(), Some("/App.tsx"));
		assert!(map.diagnostics.is_empty());
		assert_eq!(registry.get(button).unwrap().kind, ResourceKind::Module);
		assert_eq!(output.modules.len(), 3);
		assert_eq!(output.resources.len(), registry.len());
	}

	#[test]
	fn alias_keys_follow_lookup_order() {
		let t = tree(&[("/a.ts", "export {};\n"), ("/a.tsx", "export {};\n")]);
		let (output, _) = build(&t);
		let map = &output.import_map;
		assert_eq!(map.resource_for("/a"), map.resource_for("/a.tsx"));
		assert_ne!(map.resource_for("/a"), map.resource_for("/a.ts"));
	}

	#[test]
	fn css_is_deduplicated_and_registered() {
		let t = tree(&[
			("/App.tsx", "import './styles.css';\nexport default 1;\n"),
			("/Other.tsx", "import './styles.css';\nexport default 2;\n"),
			("/styles.css", "body { margin: 0; }"),
		]);
		let (output, registry) = build(&t);
		let map = &output.import_map;
		assert_eq!(map.css_imports, vec!["/styles.css"]);
		let sheet = map.resource_for("/styles.css").unwrap();
		let resource = registry.get(sheet).unwrap();
		assert_eq!(resource.kind, ResourceKind::Stylesheet);
		assert_eq!(resource.code, "body { margin: 0; }");
	}

	#[test]
	fn unresolved_imports_get_one_sentinel() {
		let t = tree(&[
			("/App.tsx", "import A from './Missing';\nexport default A;\n"),
			("/B.tsx", "import A from './Missing';\nexport default A;\n"),
		]);
		let (output, registry) = build(&t);
		let map = &output.import_map;
		let sentinel = map.resource_for("missing:./Missing").unwrap();
		let resource = registry.get(sentinel).unwrap();
		assert_eq!(resource.kind, ResourceKind::Sentinel);
		assert!(resource.code.contains("Module not found"));
		assert_eq!(map.diagnostics.len(), 2);
		assert!(map.has_errors());
	}

	#[test]
	fn broken_file_does_not_stop_others() {
		let t = tree(&[
			("/App.tsx", "import Good from './Good';\nexport default Good;\n"),
			("/Bad.tsx", "export const = ;\n"),
			("/Good.tsx", "export default 1;\n"),
		]);
		let (output, _) = build(&t);
		assert_eq!(output.modules.len(), 3);
		let errors: Vec<_> = output
			.import_map
			.diagnostics
			.iter()
			.filter(|d| d.severity == Severity::Error)
			.collect();
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].file_path, "/Bad.tsx");
		let good = output.modules.iter().find(|m| m.path == "/Good.tsx").unwrap();
		assert!(good.diagnostics.is_empty());
		assert!(good.code.contains("export default 1;"));
	}

	#[test]
	fn missing_entry_is_a_trailing_warning() {
		let t = tree(&[("/lib/util.ts", "export const a = 1;\n")]);
		let (output, _) = build(&t);
		let map = &output.import_map;
		assert_eq!(map.entry_path, None);
		let last = map.diagnostics.last().unwrap();
		assert_eq!(last.severity, Severity::Warning);
		assert!(!map.has_errors());
	}

	#[test]
	fn revision_is_tagged() {
		let mut t = tree(&[("/App.tsx", "export default 1;\n")]);
		t.update_file("/App.tsx", "export default 2;\n").unwrap();
		let (output, _) = build(&t);
		assert_eq!(output.import_map.revision, t.revision());
	}

	#[test]
	fn serializes_camel_case() {
		let t = tree(&[("/App.tsx", "export default 1;\n")]);
		let (output, _) = build(&t);
		let json = serde_json::to_value(&output.import_map).unwrap();
		assert!(json.get("specifierToResource").is_some());
		assert!(json.get("cssImports").is_some());
		assert_eq!(json["entryPath"], "/App.tsx");
	}
}
