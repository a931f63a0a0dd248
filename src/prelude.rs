//! Convenience re-exports for common usage.
//!
//! This module provides a single import for the most commonly used items
//! from the harvest crate.
//!
//! # Example
//!
//! ```rust
//! use harvest::prelude::*;
//!
//! let entity = EntityType::new("User");
//! assert_eq!(entity.artifact_name(), "user");
//! ```

// Error types
pub use crate::error::{HarvestError, HarvestResult};

// Capability surface
pub use crate::schema::{
	AssociationDescriptor, AssociationTarget, DataStore, EntityType, RawRow, RowScope,
	SchemaIntrospector,
};

// Configuration and run state
pub use crate::config::{HarvestConfig, ModelSelection};
pub use crate::context::{HarvestReport, RunContext, RunStats};

// Pipeline types
pub use crate::emitter::{SeedArtifact, SeedEmitter, SeedWriter, YamlSeedWriter};
pub use crate::files::{FileAttribute, FileHandle, FileLocation, FileMaterializer};
pub use crate::graph::DependencyGraph;
pub use crate::model::{EntityModel, ModelSet};
pub use crate::record::SeedRecord;

// Command types
pub use crate::commands::{HarvestCommand, HarvestOptions};

// In-memory store
pub use crate::memory::MemoryStore;
