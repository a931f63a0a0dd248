//! harvest command implementation.
//!
//! This command extracts every configured entity type from a data store into
//! environment-scoped YAML seed files.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::HarvestConfig;
use crate::context::{HarvestReport, RunContext};
use crate::emitter::{SeedEmitter, YamlSeedWriter};
use crate::error::HarvestResult;
use crate::schema::DataStore;

/// Options for the harvest command.
///
/// String-valued options accept the raw forms environment variables carry
/// (comma-separated lists, `"true"` flags); they are normalized when the
/// configuration is built.
#[derive(Debug, Clone, Default)]
pub struct HarvestOptions {
	/// Target environment the seeds are extracted for.
	pub target_env: Option<String>,

	/// Directory seed environments are created under.
	pub seed_root: Option<PathBuf>,

	/// Comma-separated allowlist of entity type names.
	pub models: Option<String>,

	/// Comma-separated attribute names excluded from every record.
	pub ignored_attrs: Option<String>,

	/// Association names to ignore, keyed by entity type name (or `"all"`).
	pub ignored_dependencies: HashMap<String, Vec<String>>,

	/// Omit-empty flag in its raw string form.
	pub omit_empty_attrs: Option<String>,

	/// Top-level key to nest every artifact under.
	pub namespace: Option<String>,

	/// Verbosity level.
	pub verbosity: u8,
}

impl HarvestOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the target environment.
	pub fn with_target_env(mut self, env: impl Into<String>) -> Self {
		self.target_env = Some(env.into());
		self
	}

	/// Sets the seed root directory.
	pub fn with_seed_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.seed_root = Some(root.into());
		self
	}

	/// Sets the comma-separated entity type allowlist.
	pub fn with_models(mut self, models: impl Into<String>) -> Self {
		self.models = Some(models.into());
		self
	}

	/// Sets the comma-separated excluded attribute names.
	pub fn with_ignored_attrs(mut self, attrs: impl Into<String>) -> Self {
		self.ignored_attrs = Some(attrs.into());
		self
	}

	/// Sets the ignored dependency map.
	pub fn with_ignored_dependencies(mut self, map: HashMap<String, Vec<String>>) -> Self {
		self.ignored_dependencies = map;
		self
	}

	/// Sets the omit-empty flag from its raw string form.
	pub fn with_omit_empty_attrs(mut self, input: impl Into<String>) -> Self {
		self.omit_empty_attrs = Some(input.into());
		self
	}

	/// Nests every artifact under the given top-level key.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	/// Sets the verbosity level.
	pub fn with_verbosity(mut self, level: u8) -> Self {
		self.verbosity = level;
		self
	}

	/// Resolves the options into a run configuration.
	fn build_config(&self) -> HarvestConfig {
		let mut config = HarvestConfig::new()
			.with_ignored_dependencies(self.ignored_dependencies.clone());
		if let Some(env) = &self.target_env {
			config = config.with_target_env(env);
		}
		if let Some(root) = &self.seed_root {
			config = config.with_seed_root(root.clone());
		}
		if let Some(models) = &self.models {
			config = config.with_models_list(models);
		}
		if let Some(attrs) = &self.ignored_attrs {
			config = config.with_ignored_attrs_list(attrs);
		}
		if let Some(flag) = &self.omit_empty_attrs {
			config = config.with_omit_empty_attrs_str(flag);
		}
		config
	}
}

/// The harvest command for extracting seed files from a data store.
///
/// # Example
///
/// ```ignore
/// let command = HarvestCommand::new();
/// let options = HarvestOptions::new()
///     .with_target_env("staging")
///     .with_models("User, Post")
///     .with_verbosity(1);
/// let report = command.execute(&store, options)?;
/// println!("Wrote {} records", report.records_written);
/// ```
#[derive(Debug, Default)]
pub struct HarvestCommand;

impl HarvestCommand {
	/// Creates a new harvest command.
	pub fn new() -> Self {
		Self
	}

	/// Returns the command name.
	pub fn name(&self) -> &str {
		"harvest"
	}

	/// Returns the command description.
	pub fn description(&self) -> &str {
		"Extracts replayable seed files from the connected data store"
	}

	/// Returns the command help text.
	pub fn help(&self) -> &str {
		r#"
Usage: harvest [options]

Extracts every configured entity type into ordered YAML seed files under
<seed_root>/<target_env>/, with attachments copied to the files/ subdirectory.

Options:
  --target-env ENV         Environment the seeds are extracted for
  --models LIST            Comma-separated entity type allowlist
  --ignored-attrs LIST     Comma-separated attribute names to exclude
  --omit-empty-attrs BOOL  Drop empty attribute values ("true" to enable)
  --namespace KEY          Nest every artifact under a top-level key
  --verbosity LEVEL        Verbosity level (0=minimal, 1=normal)
"#
	}

	/// Executes the harvest command against the given store.
	///
	/// # Arguments
	///
	/// * `store` - Data store to extract from
	/// * `options` - Command options
	///
	/// # Returns
	///
	/// Returns the harvest report with per-run statistics.
	pub fn execute(
		&self,
		store: &dyn DataStore,
		options: HarvestOptions,
	) -> HarvestResult<HarvestReport> {
		let config = options.build_config();
		let ctx = RunContext::new(store, &config);

		let mut writer = YamlSeedWriter::new(config.seed_dir());
		if let Some(namespace) = &options.namespace {
			writer = writer.with_namespace(namespace.clone());
		}

		let report = SeedEmitter::new(&ctx, writer).run()?;

		if options.verbosity > 0 {
			self.print_report(&report);
		}

		Ok(report)
	}

	/// Prints the harvest report summary.
	fn print_report(&self, report: &HarvestReport) {
		println!(
			"Wrote {} record(s) across {} seed file(s)",
			report.records_written,
			report.entities_written.len()
		);

		if !report.entities_skipped.is_empty() {
			println!("Skipped (no records): {:?}", report.entities_skipped);
		}

		if !report.is_clean() {
			eprintln!(
				"Degraded: {} unresolved reference(s), {} attachment failure(s), {} load failure(s)",
				report.unresolved_references, report.attachment_failures, report.load_failures
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::HarvestError;
	use crate::memory::MemoryStore;
	use rstest::rstest;
	use serde_json::json;
	use tempfile::tempdir;

	fn store() -> MemoryStore {
		MemoryStore::new()
			.entity("User", &["id", "name"])
			.row("User", 1, json!({"name": "Bo"}))
	}

	#[rstest]
	fn test_command_metadata() {
		let cmd = HarvestCommand::new();
		assert_eq!(cmd.name(), "harvest");
		assert!(!cmd.description().is_empty());
		assert!(!cmd.help().is_empty());
	}

	#[rstest]
	fn test_options_builder() {
		let options = HarvestOptions::new()
			.with_target_env("staging")
			.with_models("User, Post")
			.with_ignored_attrs("created_at")
			.with_omit_empty_attrs("true")
			.with_namespace("records")
			.with_verbosity(2);

		assert_eq!(options.target_env, Some("staging".to_string()));
		assert_eq!(options.models, Some("User, Post".to_string()));
		assert_eq!(options.ignored_attrs, Some("created_at".to_string()));
		assert_eq!(options.omit_empty_attrs, Some("true".to_string()));
		assert_eq!(options.namespace, Some("records".to_string()));
		assert_eq!(options.verbosity, 2);
	}

	#[rstest]
	fn test_execute_writes_seed_files() {
		let dir = tempdir().unwrap();
		let cmd = HarvestCommand::new();
		let options = HarvestOptions::new()
			.with_seed_root(dir.path())
			.with_target_env("dreamland");

		let report = cmd.execute(&store(), options).unwrap();
		assert_eq!(report.entities_written, ["User"]);
		assert_eq!(report.records_written, 1);
		assert!(dir.path().join("dreamland/user.yml").exists());
	}

	#[rstest]
	fn test_execute_unknown_model_fails_fast() {
		let dir = tempdir().unwrap();
		let cmd = HarvestCommand::new();
		let options = HarvestOptions::new()
			.with_seed_root(dir.path())
			.with_models("Banana");

		let result = cmd.execute(&store(), options);
		assert!(matches!(
			result,
			Err(HarvestError::InvalidConfiguration(_))
		));
	}
}
