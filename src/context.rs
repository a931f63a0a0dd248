//! Explicit per-run state.
//!
//! One [`RunContext`] is created at the start of each invocation and handed
//! to every component; dropping it discards all caches and counters, so runs
//! never leak state into each other.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::config::HarvestConfig;
use crate::files::FileMaterializer;
use crate::schema::DataStore;

/// Degradation counters accumulated while a run progresses.
///
/// Non-fatal problems (a reference that cannot be resolved, an attachment
/// that cannot be fetched, an entity type whose rows cannot be loaded) are
/// logged where they happen and counted here so the final report can surface
/// them prominently.
#[derive(Debug, Default)]
pub struct RunStats {
	unresolved_references: AtomicUsize,
	attachment_failures: AtomicUsize,
	load_failures: AtomicUsize,
}

impl RunStats {
	/// Creates zeroed counters.
	pub fn new() -> Self {
		Self::default()
	}

	/// Counts one foreign key that could not be resolved.
	pub fn record_unresolved_reference(&self) {
		self.unresolved_references.fetch_add(1, Ordering::Relaxed);
	}

	/// Counts one attachment that could not be materialized.
	pub fn record_attachment_failure(&self) {
		self.attachment_failures.fetch_add(1, Ordering::Relaxed);
	}

	/// Counts one entity type whose rows could not be loaded.
	pub fn record_load_failure(&self) {
		self.load_failures.fetch_add(1, Ordering::Relaxed);
	}

	/// Returns the number of unresolved references so far.
	pub fn unresolved_references(&self) -> usize {
		self.unresolved_references.load(Ordering::Relaxed)
	}

	/// Returns the number of failed attachment materializations so far.
	pub fn attachment_failures(&self) -> usize {
		self.attachment_failures.load(Ordering::Relaxed)
	}

	/// Returns the number of failed row loads so far.
	pub fn load_failures(&self) -> usize {
		self.load_failures.load(Ordering::Relaxed)
	}
}

/// Everything one extraction run operates on: the store, the resolved
/// configuration, the attachment materializer, and the degradation counters.
pub struct RunContext<'a> {
	store: &'a dyn DataStore,
	config: &'a HarvestConfig,
	materializer: FileMaterializer,
	stats: RunStats,
}

impl<'a> RunContext<'a> {
	/// Creates the context for one run; the materializer targets the
	/// configuration's seed directory.
	pub fn new(store: &'a dyn DataStore, config: &'a HarvestConfig) -> Self {
		Self {
			store,
			config,
			materializer: FileMaterializer::new(config.seed_dir()),
			stats: RunStats::new(),
		}
	}

	/// Replaces the attachment materializer, e.g. to add a fetch timeout.
	pub fn with_materializer(mut self, materializer: FileMaterializer) -> Self {
		self.materializer = materializer;
		self
	}

	/// Returns the data store the run reads from.
	pub fn store(&self) -> &dyn DataStore {
		self.store
	}

	/// Returns the run's configuration.
	pub fn config(&self) -> &HarvestConfig {
		self.config
	}

	/// Returns the attachment materializer.
	pub fn materializer(&self) -> &FileMaterializer {
		&self.materializer
	}

	/// Returns the run's degradation counters.
	pub fn stats(&self) -> &RunStats {
		&self.stats
	}
}

/// Summary of one finished extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
	/// Entity types that produced an artifact, in write order.
	pub entities_written: Vec<String>,

	/// Entity types skipped because no rows were in scope.
	pub entities_skipped: Vec<String>,

	/// Total number of records across all written artifacts.
	pub records_written: usize,

	/// Foreign keys left unresolved (null) in the output.
	pub unresolved_references: usize,

	/// Attachments dropped because they could not be materialized.
	pub attachment_failures: usize,

	/// Entity types whose rows could not be loaded.
	pub load_failures: usize,
}

impl HarvestReport {
	/// Returns true if the run finished without any degradation.
	pub fn is_clean(&self) -> bool {
		self.unresolved_references == 0 && self.attachment_failures == 0 && self.load_failures == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_stats_counters() {
		let stats = RunStats::new();
		stats.record_unresolved_reference();
		stats.record_unresolved_reference();
		stats.record_attachment_failure();

		assert_eq!(stats.unresolved_references(), 2);
		assert_eq!(stats.attachment_failures(), 1);
		assert_eq!(stats.load_failures(), 0);
	}

	#[rstest]
	fn test_report_cleanliness() {
		let clean = HarvestReport {
			entities_written: vec!["User".to_string()],
			entities_skipped: vec![],
			records_written: 3,
			unresolved_references: 0,
			attachment_failures: 0,
			load_failures: 0,
		};
		assert!(clean.is_clean());

		let degraded = HarvestReport {
			unresolved_references: 1,
			..clean
		};
		assert!(!degraded.is_clean());
	}
}
