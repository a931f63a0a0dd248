//! Error types for the harvest crate.
//!
//! One enum covers the whole pipeline: fatal structural errors abort the run,
//! everything else is reported per record or per attribute by the caller.

use thiserror::Error;

/// Errors that can occur while extracting seed data.
#[derive(Debug, Error)]
pub enum HarvestError {
	/// The dependency graph contains a cycle.
	///
	/// Any ordering produced from a cyclic graph could corrupt replay, so the
	/// run aborts instead of emitting a partial result.
	#[error("cyclic dependency between entity types: {0}")]
	CyclicDependency(String),

	/// An entity type depends on another that is not part of this run.
	#[error("missing dependency: {required_by} depends on {entity}, which is not part of this run")]
	MissingDependency {
		/// The entity type that could not be found.
		entity: String,
		/// The entity type that declared the dependency.
		required_by: String,
	},

	/// The run was configured with invalid settings.
	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),

	/// The underlying data store rejected an operation.
	#[error("store error: {0}")]
	Store(String),

	/// An attachment could not be retrieved from its current location.
	#[error("attachment fetch failed: {0}")]
	Fetch(String),

	/// A foreign key points at a row that cannot be found in its target model.
	#[error("unresolvable reference: no {entity} record with id {id} (via {association})")]
	UnresolvableReference {
		/// The referenced entity type.
		entity: String,
		/// The raw foreign-key value, rendered for display.
		id: String,
		/// The association the reference was declared through.
		association: String,
	},

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON (de)serialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// YAML serialization error.
	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for harvest operations.
pub type HarvestResult<T> = Result<T, HarvestError>;
