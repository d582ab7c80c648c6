// ---------------------------------------------------------------------------
// PreviewServer: JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes NDJSON requests from stdin to the session's tree and preview
// pipeline. Every request that moves the tree revision is followed by one
// build pass and a `preview/updated` notification.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead, Write};

use serde::de::DeserializeOwned;
use uigen_preview::PreviewConfig;
use uigen_vfs::edit::{self, EditCommand, FileCommand};
use uigen_vfs::TreeConfig;

use crate::error::EngineError;
use crate::protocol::*;
use crate::session::Session;
use crate::transport::NdjsonTransport;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct PreviewServer<W: Write = io::Stdout> {
	transport: NdjsonTransport<W>,
	tree_config: TreeConfig,
	preview_config: PreviewConfig,
	session: Option<Session>,
}

impl<W: Write> PreviewServer<W> {
	/// The session is created by `session/initialize`; the configs given
	/// here are its defaults.
	pub fn new(
		transport: NdjsonTransport<W>,
		tree_config: TreeConfig,
		preview_config: PreviewConfig,
	) -> Self {
		Self {
			transport,
			tree_config,
			preview_config,
			session: None,
		}
	}

	pub fn into_transport(self) -> NdjsonTransport<W> {
		self.transport
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> Result<(), EngineError> {
		let stdin = io::stdin();
		self.serve(stdin.lock())
	}

	pub fn serve(&mut self, reader: impl BufRead) -> Result<(), EngineError> {
		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::warn!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		tracing::info!("stdin closed, shutting down");
		Ok(())
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		let params = req.params;
		let result = match req.method.as_str() {
			// -- Lifecycle -----------------------------------------------
			"session/initialize" => self.handle_initialize(params),

			// -- Tree ----------------------------------------------------
			"vfs/createFile" => self.with_session_mut(|s| {
				let p: WriteFileParams = parse_params(params)?;
				s.tree.create_file(&p.path, &p.content)?;
				Ok(revision(s))
			}),
			"vfs/createDirectory" => self.with_session_mut(|s| {
				let p: PathParams = parse_params(params)?;
				s.tree.create_directory(&p.path)?;
				Ok(revision(s))
			}),
			"vfs/readFile" => self.with_session(|s| {
				let p: PathParams = parse_params(params)?;
				let content = s.tree.read_file(&p.path)?;
				Ok(serde_json::json!({ "content": content }))
			}),
			"vfs/updateFile" => self.with_session_mut(|s| {
				let p: WriteFileParams = parse_params(params)?;
				s.tree.update_file(&p.path, &p.content)?;
				Ok(revision(s))
			}),
			"vfs/delete" => self.with_session_mut(|s| {
				let p: PathParams = parse_params(params)?;
				s.tree.delete(&p.path)?;
				Ok(revision(s))
			}),
			"vfs/rename" => self.with_session_mut(|s| {
				let p: RenameParams = parse_params(params)?;
				s.tree.rename(&p.path, &p.new_path)?;
				Ok(revision(s))
			}),
			"vfs/exists" => self.with_session(|s| {
				let p: PathParams = parse_params(params)?;
				Ok(serde_json::json!({ "exists": s.tree.exists(&p.path) }))
			}),
			"vfs/list" => self.with_session(|s| {
				let p: PathParams = parse_params(params)?;
				let entries = s.tree.list(&p.path)?;
				Ok(serde_json::json!({ "entries": entries }))
			}),
			"vfs/tree" => self.with_session(|s| Ok(serde_json::json!({ "tree": s.tree.render_tree() }))),
			"vfs/metrics" => self.with_session(|s| Ok(serde_json::to_value(s.tree.metrics())?)),
			"vfs/serialize" => {
				self.with_session(|s| Ok(serde_json::json!({ "snapshot": s.tree.serialize() })))
			}
			"vfs/deserialize" => self.with_session_mut(|s| {
				let p: SnapshotParams = parse_params(params)?;
				s.tree.restore(&p.snapshot)?;
				Ok(revision(s))
			}),

			// -- Agent tools ---------------------------------------------
			"editor/command" => self.with_session_mut(|s| {
				let command: EditCommand = parse_params(params)?;
				let output = edit::apply(&mut s.tree, &command)?;
				Ok(match output.content() {
					Some(content) => serde_json::json!({ "content": content }),
					None => serde_json::json!({}),
				})
			}),
			"files/command" => self.with_session_mut(|s| {
				let command: FileCommand = parse_params(params)?;
				edit::apply_file_command(&mut s.tree, &command)?;
				Ok(revision(s))
			}),

			// -- Preview -------------------------------------------------
			"preview/build" => self.with_session_mut(|s| Ok(serde_json::to_value(s.current_map())?)),
			"preview/resource" => self.with_session(|s| {
				let p: ResourceParams = parse_params(params)?;
				Ok(serde_json::to_value(s.resource(&p.handle)?)?)
			}),
			"preview/release" => self.with_session_mut(|s| {
				let p: ReleaseParams = parse_params(params)?;
				Ok(serde_json::json!({ "released": s.release(p.revision) }))
			}),

			// -- Unknown -------------------------------------------------
			_ => {
				tracing::warn!(method = %req.method, "unknown method");
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(e) => {
				let code = match &e {
					EngineError::InvalidParams(_) => INVALID_PARAMS,
					EngineError::Io(_) | EngineError::Json(_) => INTERNAL_ERROR,
					_ => ENGINE_ERROR,
				};
				tracing::debug!(method = %req.method, error = %e, "request failed");
				self.transport
					.write_error(id, code, e.to_string(), Some(e.to_json_rpc_error()));
			}
		}

		self.publish_if_stale();
	}

	/// Build and announce a new map when the tree has moved past the live one.
	fn publish_if_stale(&mut self) {
		let Some(session) = self.session.as_mut() else {
			return;
		};
		if !session.is_stale() {
			return;
		}
		let Some(map) = session.rebuild() else {
			return;
		};
		match serde_json::to_value(map) {
			Ok(value) => self.transport.write_notification(PREVIEW_UPDATED, value),
			Err(e) => tracing::error!("Failed to serialize import map: {}", e),
		}
	}

	// ── Session accessors ─────────────────────────────────────────────────

	fn with_session<F>(&self, f: F) -> Result<serde_json::Value, EngineError>
	where
		F: FnOnce(&Session) -> Result<serde_json::Value, EngineError>,
	{
		match &self.session {
			Some(s) => f(s),
			None => Err(EngineError::NotInitialized),
		}
	}

	fn with_session_mut<F>(&mut self, f: F) -> Result<serde_json::Value, EngineError>
	where
		F: FnOnce(&mut Session) -> Result<serde_json::Value, EngineError>,
	{
		match &mut self.session {
			Some(s) => f(s),
			None => Err(EngineError::NotInitialized),
		}
	}

	// ── Initialize ────────────────────────────────────────────────────────

	fn handle_initialize(
		&mut self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, EngineError> {
		let p: InitializeParams = if params.is_null() {
			InitializeParams::default()
		} else {
			parse_params(params)?
		};

		let mut preview = self.preview_config.clone();
		if let Some(alias) = p.root_alias {
			preview.root_alias = alias;
		}
		if let Some(modules) = p.runtime_modules {
			preview.runtime_modules = modules;
		}
		if let Some(source) = p.jsx_import_source {
			preview.jsx_import_source = source;
		}

		let mut tree_config = self.tree_config.clone();
		if let Some(auto) = p.auto_create_parents {
			tree_config.auto_create_parents = auto;
		}

		let session = match &p.snapshot {
			Some(snapshot) => Session::from_snapshot(snapshot, tree_config, preview)?,
			None => Session::new(tree_config, preview),
		};
		let result = revision(&session);
		tracing::info!(
			root_alias = %session.preview_config().root_alias,
			files = session.tree.metrics().file_count,
			"session initialized"
		);
		self.session = Some(session);
		Ok(result)
	}
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, EngineError> {
	serde_json::from_value(params).map_err(|e| EngineError::InvalidParams(e.to_string()))
}

fn revision(session: &Session) -> serde_json::Value {
	serde_json::json!({ "revision": session.tree.revision() })
}
