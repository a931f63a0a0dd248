//! Run configuration.
//!
//! A [`HarvestConfig`] is the resolved settings object one run operates on:
//! which environment the seeds target, where they are written, which entity
//! types are in scope, and which attributes and relationships are excluded.
//! Inputs arriving as strings (environment variables, task arguments) are
//! normalized by the `*_list`/`*_str` builders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::schema::{EntityType, RowScope};

/// Key under which ignored dependencies apply to every entity type.
pub const ALL_ENTITIES_KEY: &str = "all";

/// Subdirectory of the seed directory holding materialized attachments.
pub const FILES_SUBDIR: &str = "files";

/// One entity type selected for extraction, with the rows it contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelection {
	entity: EntityType,
	scope: RowScope,
}

impl ModelSelection {
	/// Selects every row of the named entity type.
	pub fn all(name: impl AsRef<str>) -> Self {
		Self {
			entity: EntityType::new(name),
			scope: RowScope::All,
		}
	}

	/// Selects a filtered subset of the named entity type.
	pub fn scoped(name: impl AsRef<str>, scope: RowScope) -> Self {
		Self {
			entity: EntityType::new(name),
			scope,
		}
	}

	/// Returns the selected entity type.
	pub fn entity(&self) -> &EntityType {
		&self.entity
	}

	/// Returns the row scope of this selection.
	pub fn scope(&self) -> &RowScope {
		&self.scope
	}
}

/// Resolved settings for one extraction run.
///
/// Built with the `with_*` methods and read-only once the run starts.
///
/// # Examples
///
/// ```rust
/// use harvest::config::HarvestConfig;
///
/// let config = HarvestConfig::new()
/// 	.with_target_env(" Staging ")
/// 	.with_ignored_attrs_list("created_at, updated_at");
///
/// assert_eq!(config.target_env(), "staging");
/// assert_eq!(config.ignored_attrs(), ["created_at", "updated_at"]);
/// ```
#[derive(Debug, Clone)]
pub struct HarvestConfig {
	target_env: String,
	seed_root: PathBuf,
	selections: Option<Vec<ModelSelection>>,
	ignored_attrs: Vec<String>,
	ignored_dependencies: HashMap<String, Vec<String>>,
	omit_empty_attrs: bool,
}

impl Default for HarvestConfig {
	fn default() -> Self {
		Self {
			target_env: "development".to_string(),
			seed_root: PathBuf::from("db/seeds"),
			selections: None,
			ignored_attrs: Vec::new(),
			ignored_dependencies: HashMap::new(),
			omit_empty_attrs: false,
		}
	}
}

impl HarvestConfig {
	/// Creates a configuration with default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the target environment the seeds are extracted for.
	///
	/// The name is trimmed and lowercased; blank input keeps the current
	/// environment.
	pub fn with_target_env(mut self, env: impl AsRef<str>) -> Self {
		let normalized = env.as_ref().trim().to_lowercase();
		if !normalized.is_empty() {
			self.target_env = normalized;
		}
		self
	}

	/// Sets the directory seed environments are created under.
	pub fn with_seed_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.seed_root = root.into();
		self
	}

	/// Restricts the run to an explicit set of entity types.
	pub fn with_selections(mut self, selections: Vec<ModelSelection>) -> Self {
		self.selections = Some(selections);
		self
	}

	/// Restricts the run to a comma-separated list of entity type names,
	/// each selecting all rows.
	pub fn with_models_list(mut self, list: &str) -> Self {
		let selections: Vec<ModelSelection> = list
			.split(',')
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.map(ModelSelection::all)
			.collect();
		if !selections.is_empty() {
			self.selections = Some(selections);
		}
		self
	}

	/// Sets the attribute names excluded from every projected record.
	pub fn with_ignored_attrs(mut self, attrs: Vec<String>) -> Self {
		self.ignored_attrs = attrs;
		self
	}

	/// Sets the excluded attribute names from a comma-separated list.
	pub fn with_ignored_attrs_list(mut self, list: &str) -> Self {
		self.ignored_attrs = list
			.split(',')
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.map(str::to_string)
			.collect();
		self
	}

	/// Sets the ignored dependency map wholesale.
	///
	/// Keys are entity type names (or [`ALL_ENTITIES_KEY`]); values are the
	/// association names to drop for that entity type.
	pub fn with_ignored_dependencies(mut self, map: HashMap<String, Vec<String>>) -> Self {
		self.ignored_dependencies = map;
		self
	}

	/// Ignores one association, for one entity type or for all of them.
	pub fn ignore_dependency(mut self, entity: impl AsRef<str>, association: impl AsRef<str>) -> Self {
		self.ignored_dependencies
			.entry(entity.as_ref().to_string())
			.or_default()
			.push(association.as_ref().to_string());
		self
	}

	/// Sets whether empty attribute values are omitted from projections.
	pub fn with_omit_empty_attrs(mut self, omit: bool) -> Self {
		self.omit_empty_attrs = omit;
		self
	}

	/// Enables omit-empty when the input string is `"true"`, ignoring case
	/// and surrounding whitespace. Any other input leaves the flag unchanged.
	pub fn with_omit_empty_attrs_str(mut self, input: &str) -> Self {
		if input.trim().eq_ignore_ascii_case("true") {
			self.omit_empty_attrs = true;
		}
		self
	}

	/// Returns the target environment name.
	pub fn target_env(&self) -> &str {
		&self.target_env
	}

	/// Returns the directory seed environments are created under.
	pub fn seed_root(&self) -> &Path {
		&self.seed_root
	}

	/// Returns the explicit entity type selections, if any.
	///
	/// `None` means every entity type the store knows about is in scope.
	pub fn selections(&self) -> Option<&[ModelSelection]> {
		self.selections.as_deref()
	}

	/// Returns the attribute names excluded from every projection.
	pub fn ignored_attrs(&self) -> &[String] {
		&self.ignored_attrs
	}

	/// Returns the association names ignored for the given entity type,
	/// merging its own entry with the [`ALL_ENTITIES_KEY`] entry.
	pub fn ignored_dependencies_for(&self, entity: &EntityType) -> Vec<String> {
		let mut names: Vec<String> = self
			.ignored_dependencies
			.get(entity.name())
			.cloned()
			.unwrap_or_default();
		if let Some(global) = self.ignored_dependencies.get(ALL_ENTITIES_KEY) {
			for name in global {
				if !names.contains(name) {
					names.push(name.clone());
				}
			}
		}
		names
	}

	/// Returns true if empty attribute values are omitted from projections.
	pub fn omit_empty_attrs(&self) -> bool {
		self.omit_empty_attrs
	}

	/// Returns the environment-scoped directory the artifacts are written to.
	pub fn seed_dir(&self) -> PathBuf {
		self.seed_root.join(&self.target_env)
	}

	/// Returns the directory materialized attachments are written to.
	pub fn files_dir(&self) -> PathBuf {
		self.seed_dir().join(FILES_SUBDIR)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let config = HarvestConfig::new();
		assert_eq!(config.target_env(), "development");
		assert_eq!(config.seed_root(), Path::new("db/seeds"));
		assert!(config.selections().is_none());
		assert!(config.ignored_attrs().is_empty());
		assert!(!config.omit_empty_attrs());
	}

	#[rstest]
	fn test_target_env_is_normalized() {
		let config = HarvestConfig::new().with_target_env("  DreamLand \n");
		assert_eq!(config.target_env(), "dreamland");
		assert_eq!(config.seed_dir(), PathBuf::from("db/seeds/dreamland"));
		assert_eq!(config.files_dir(), PathBuf::from("db/seeds/dreamland/files"));
	}

	#[rstest]
	fn test_blank_target_env_keeps_default() {
		let config = HarvestConfig::new().with_target_env("   ");
		assert_eq!(config.target_env(), "development");
	}

	#[rstest]
	fn test_models_list_parsing() {
		let config = HarvestConfig::new().with_models_list("User, Post ,,Comment");
		let selections = config.selections().unwrap();
		let names: Vec<&str> = selections.iter().map(|s| s.entity().name()).collect();
		assert_eq!(names, ["User", "Post", "Comment"]);
		assert!(selections.iter().all(|s| *s.scope() == RowScope::All));
	}

	#[rstest]
	fn test_empty_models_list_selects_everything() {
		let config = HarvestConfig::new().with_models_list(" , ");
		assert!(config.selections().is_none());
	}

	#[rstest]
	fn test_ignored_attrs_list_parsing() {
		let config = HarvestConfig::new().with_ignored_attrs_list(" created_at ,updated_at, ");
		assert_eq!(config.ignored_attrs(), ["created_at", "updated_at"]);
	}

	#[rstest]
	fn test_ignored_dependencies_merge_global_entry() {
		let config = HarvestConfig::new()
			.ignore_dependency("Post", "poster")
			.ignore_dependency(ALL_ENTITIES_KEY, "tenant");

		let for_post = config.ignored_dependencies_for(&EntityType::new("Post"));
		assert_eq!(for_post, ["poster", "tenant"]);

		let for_user = config.ignored_dependencies_for(&EntityType::new("User"));
		assert_eq!(for_user, ["tenant"]);
	}

	#[rstest]
	#[case("true", true)]
	#[case(" TRUE ", true)]
	#[case("false", false)]
	#[case("yes", false)]
	#[case("", false)]
	fn test_omit_empty_attrs_str(#[case] input: &str, #[case] expected: bool) {
		let config = HarvestConfig::new().with_omit_empty_attrs_str(input);
		assert_eq!(config.omit_empty_attrs(), expected);
	}
}
