// ---------------------------------------------------------------------------
// Build coordinator: orders passes by revision and tracks which resources
// are still in use
// ---------------------------------------------------------------------------

use crate::import_map::{BuildOutput, ImportMap};
use crate::resource::ResourceHandle;

/// Issued when a pass starts; handed back when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTicket {
	revision: u64,
}

impl BuildTicket {
	pub fn revision(&self) -> u64 {
		self.revision
	}
}

#[derive(Debug)]
pub enum BuildOutcome {
	/// The pass is now live.
	Accepted(ImportMap),
	/// The pass was superseded; its resources can be released right away.
	Discarded {
		revision: u64,
		resources: Vec<ResourceHandle>,
	},
}

#[derive(Debug, Default)]
pub struct BuildCoordinator {
	latest_started: Option<u64>,
	live: Option<(u64, Vec<ResourceHandle>)>,
	retired: Vec<(u64, Vec<ResourceHandle>)>,
}

impl BuildCoordinator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn begin(&mut self, revision: u64) -> BuildTicket {
		self.latest_started = Some(self.latest_started.map_or(revision, |r| r.max(revision)));
		BuildTicket { revision }
	}

	/// Accept the pass if it is the newest one started and newer than the
	/// live map. The previous live pass is retired, not released.
	pub fn complete(&mut self, ticket: BuildTicket, output: BuildOutput) -> BuildOutcome {
		let revision = ticket.revision;
		let superseded = self.latest_started.is_some_and(|latest| revision < latest);
		let stale = self.live.as_ref().is_some_and(|(live, _)| revision <= *live);

		if superseded || stale {
			tracing::warn!(
				revision,
				latest = ?self.latest_started,
				"discarding stale build pass"
			);
			return BuildOutcome::Discarded {
				revision,
				resources: output.resources,
			};
		}

		if let Some(previous) = self.live.replace((revision, output.resources)) {
			self.retired.push(previous);
		}
		BuildOutcome::Accepted(output.import_map)
	}

	/// The renderer now shows `revision`; everything retired before it can go.
	pub fn acknowledge(&mut self, revision: u64) -> Vec<ResourceHandle> {
		let mut released = Vec::new();
		self.retired.retain_mut(|(rev, handles)| {
			if *rev < revision {
				released.append(handles);
				false
			} else {
				true
			}
		});
		released
	}

	pub fn live_revision(&self) -> Option<u64> {
		self.live.as_ref().map(|(rev, _)| *rev)
	}

	pub fn retired_count(&self) -> usize {
		self.retired.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn output(revision: u64, handles: &[&str]) -> BuildOutput {
		BuildOutput {
			import_map: ImportMap {
				revision,
				..ImportMap::default()
			},
			modules: Vec::new(),
			resources: handles
				.iter()
				.map(|h| ResourceHandle::from(h.to_string()))
				.collect(),
		}
	}

	#[test]
	fn newer_pass_wins_over_older_completion() {
		let mut coord = BuildCoordinator::new();
		let first = coord.begin(1);
		let second = coord.begin(2);

		match coord.complete(second, output(2, &["b"])) {
			BuildOutcome::Accepted(map) => assert_eq!(map.revision, 2),
			other => panic!("expected accept, got {:?}", other),
		}
		match coord.complete(first, output(1, &["a"])) {
			BuildOutcome::Discarded { revision, resources } => {
				assert_eq!(revision, 1);
				assert_eq!(resources, vec![ResourceHandle::from("a".to_string())]);
			}
			other => panic!("expected discard, got {:?}", other),
		}
		assert_eq!(coord.live_revision(), Some(2));
	}

	#[test]
	fn older_pass_completing_first_is_still_discarded() {
		let mut coord = BuildCoordinator::new();
		let first = coord.begin(1);
		let _second = coord.begin(2);
		assert!(matches!(
			coord.complete(first, output(1, &["a"])),
			BuildOutcome::Discarded { .. }
		));
		assert_eq!(coord.live_revision(), None);
	}

	#[test]
	fn previous_pass_released_only_after_acknowledge() {
		let mut coord = BuildCoordinator::new();
		let t1 = coord.begin(1);
		coord.complete(t1, output(1, &["a1", "a2"]));
		let t2 = coord.begin(2);
		coord.complete(t2, output(2, &["b1"]));
		assert_eq!(coord.retired_count(), 1);

		assert!(coord.acknowledge(1).is_empty());
		let released = coord.acknowledge(2);
		assert_eq!(released.len(), 2);
		assert_eq!(coord.retired_count(), 0);
		assert!(coord.acknowledge(2).is_empty());
	}

	#[test]
	fn same_revision_twice_is_stale() {
		let mut coord = BuildCoordinator::new();
		let t = coord.begin(3);
		coord.complete(t, output(3, &[]));
		let again = coord.begin(3);
		assert!(matches!(
			coord.complete(again, output(3, &["x"])),
			BuildOutcome::Discarded { .. }
		));
	}
}
