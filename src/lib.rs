//! Portable seed extraction from relational data stores.
//!
//! This crate turns a live dataset into ordered, replayable YAML seed
//! artifacts. Auto-generated identifiers do not survive a move between
//! environments, so a naive dump breaks on replay: rows come out in the wrong
//! order and foreign keys point at identifiers the target environment has
//! never seen. Harvest solves both problems in one pass:
//!
//! - **Dependency ordering**: entity types are sorted topologically over
//!   their belongs-to relationships, so dependent data is always written
//!   after what it depends on.
//! - **Portable identifiers**: every row gets a run-local `seed_id`, and
//!   every foreign key (including polymorphic ones) is rewritten to the
//!   referenced row's `seed_id`.
//! - **Attachment materialization**: file-valued attributes are copied into
//!   the seed directory's `files/` area, with collision-safe naming and
//!   support for remotely stored files.
//!
//! # Quick Start
//!
//! ```rust
//! use harvest::commands::{HarvestCommand, HarvestOptions};
//! use harvest::memory::MemoryStore;
//! use harvest::schema::AssociationDescriptor;
//! use serde_json::json;
//!
//! # fn main() -> harvest::HarvestResult<()> {
//! let store = MemoryStore::new()
//! 	.entity("User", &["id", "name"])
//! 	.entity("Post", &["id", "user_id", "title"])
//! 	.association("Post", AssociationDescriptor::fixed("author", "user_id", "User"))
//! 	.row("User", 1, json!({"name": "Bo"}))
//! 	.row("Post", 1, json!({"user_id": 1, "title": "hello"}));
//!
//! let dir = tempfile::tempdir().unwrap();
//! let report = HarvestCommand::new().execute(
//! 	&store,
//! 	HarvestOptions::new()
//! 		.with_seed_root(dir.path())
//! 		.with_target_env("staging"),
//! )?;
//!
//! assert_eq!(report.entities_written, ["User", "Post"]);
//! # Ok(())
//! # }
//! ```
//!
//! Any persistence layer can be harvested by implementing the two capability
//! traits in [`schema`]: [`SchemaIntrospector`] answers what entity types
//! exist and how they relate, [`DataStore`] hands over their rows.
//!
//! # Architecture
//!
//! - [`graph::DependencyGraph`] - deterministic topological ordering with
//!   cycle and missing-node detection
//! - [`model::EntityModel`] / [`model::ModelSet`] - per-type extraction state
//!   and the ordered run registry
//! - [`record::SeedRecord`] - row projection: portable ids, reference
//!   rewriting, attachment paths
//! - [`files::FileMaterializer`] - attachment detection and materialization
//! - [`emitter::SeedEmitter`] - drives a run and writes the artifacts
//! - [`commands::HarvestCommand`] - the whole pipeline behind one call
//!
//! Fatal errors (a cyclic schema, an unknown entity type in the allowlist)
//! abort a run before anything is written. Per-record problems (a dangling
//! foreign key, an attachment that cannot be fetched) are logged via
//! [`tracing`], counted in the run's [`context::HarvestReport`], and leave
//! visible nulls in the output instead of silently wrong values.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod commands;
pub mod config;
pub mod context;
pub mod emitter;
pub mod error;
pub mod files;
pub mod graph;
pub mod memory;
pub mod model;
pub mod prelude;
pub mod record;
pub mod schema;

// Re-export commonly used types at crate root
pub use config::{HarvestConfig, ModelSelection};
pub use context::{HarvestReport, RunContext, RunStats};
pub use emitter::{SeedArtifact, SeedEmitter, SeedWriter, YamlSeedWriter};
pub use error::{HarvestError, HarvestResult};
pub use graph::DependencyGraph;
pub use model::{EntityModel, ModelSet};
pub use record::SeedRecord;
pub use schema::{
	AssociationDescriptor, AssociationTarget, DataStore, EntityType, RawRow, RowScope,
	SchemaIntrospector,
};
