//! Per-entity-type extraction units and the run-scoped model registry.
//!
//! An [`EntityModel`] resolves everything one entity type contributes to a
//! run: its attribute list (minus exclusions), its associations, its write
//! order dependencies, and its lazily loaded rows, wrapped as [`SeedRecord`]s.
//! The [`ModelSet`] builds one model per configured type and orders them so
//! that every model is fully materialized before anything references into it.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde_json::Value;

use crate::config::ModelSelection;
use crate::context::RunContext;
use crate::emitter::SeedArtifact;
use crate::error::{HarvestError, HarvestResult};
use crate::graph::DependencyGraph;
use crate::record::SeedRecord;
use crate::schema::{AssociationDescriptor, AssociationTarget, EntityType, RowScope};

/// One entity type's extraction state for the lifetime of a run.
pub struct EntityModel {
	entity: EntityType,
	scope: RowScope,
	attributes: Vec<String>,
	associations: Vec<AssociationDescriptor>,
	dependencies: Vec<EntityType>,
	records: OnceCell<Vec<Arc<SeedRecord>>>,
	assigned_ids: RwLock<Vec<Value>>,
}

impl EntityModel {
	/// Resolves the model for one entity type: attribute list minus the
	/// configured exclusions, declared associations, and the dependency set
	/// those associations imply.
	///
	/// A polymorphic association contributes every target type observed in
	/// existing rows (via the store's distinct-values query), not a single
	/// static type. Associations whose name is ignored for this entity type,
	/// or globally, contribute nothing.
	pub fn build(ctx: &RunContext<'_>, entity: EntityType, scope: RowScope) -> HarvestResult<Self> {
		let config = ctx.config();
		let store = ctx.store();

		let attributes: Vec<String> = store
			.attribute_names(&entity)?
			.into_iter()
			.filter(|name| !config.ignored_attrs().contains(name))
			.collect();

		let associations = store.associations(&entity)?;
		let ignored = config.ignored_dependencies_for(&entity);

		let mut dependencies: Vec<EntityType> = Vec::new();
		for association in &associations {
			if ignored.iter().any(|name| name == association.name()) {
				continue;
			}
			match association.target() {
				AssociationTarget::Fixed(target) => {
					if !dependencies.contains(target) {
						dependencies.push(target.clone());
					}
				}
				AssociationTarget::Polymorphic { discriminator } => {
					for value in store.distinct_values(&entity, discriminator)? {
						if let Some(name) = value.as_str() {
							let target = EntityType::new(name);
							if !dependencies.contains(&target) {
								dependencies.push(target);
							}
						}
					}
				}
			}
		}

		Ok(Self {
			entity,
			scope,
			attributes,
			associations,
			dependencies,
			records: OnceCell::new(),
			assigned_ids: RwLock::new(Vec::new()),
		})
	}

	/// Returns the entity type this model extracts.
	pub fn entity(&self) -> &EntityType {
		&self.entity
	}

	/// Returns the rows-in-scope restriction.
	pub fn scope(&self) -> &RowScope {
		&self.scope
	}

	/// Returns the attribute names that survive into projections.
	pub fn attributes(&self) -> &[String] {
		&self.attributes
	}

	/// Returns the declared belongs-to associations.
	pub fn associations(&self) -> &[AssociationDescriptor] {
		&self.associations
	}

	/// Returns the entity types this model's artifact must be written after.
	pub fn dependencies(&self) -> &[EntityType] {
		&self.dependencies
	}

	/// Returns the association whose foreign key is the given attribute.
	pub fn association_for(&self, attribute: &str) -> Option<&AssociationDescriptor> {
		self.associations
			.iter()
			.find(|association| association.foreign_key() == attribute)
	}

	/// Loads and wraps the rows in scope, once; cached for the run.
	///
	/// A load failure is not fatal to the run: it is logged, counted, and the
	/// model continues with an empty record set.
	pub fn records(&self, ctx: &RunContext<'_>) -> &[Arc<SeedRecord>] {
		self.records
			.get_or_init(|| match ctx.store().load_rows(&self.entity, &self.scope) {
				Ok(rows) => rows
					.into_iter()
					.map(|row| Arc::new(SeedRecord::new(self.entity.clone(), row)))
					.collect(),
				Err(error) => {
					tracing::error!(
						entity = %self.entity,
						error = %error,
						"failed to load rows; continuing with an empty record set"
					);
					ctx.stats().record_load_failure();
					Vec::new()
				}
			})
	}

	/// Returns the record whose underlying row has the given native
	/// identifier.
	pub fn find(&self, ctx: &RunContext<'_>, native_id: &Value) -> Option<Arc<SeedRecord>> {
		self.records(ctx)
			.iter()
			.find(|record| record.native_id() == native_id)
			.cloned()
	}

	/// Computes the next unused integer portable identifier.
	///
	/// Only integer values already assigned participate in the maximum;
	/// manually registered non-integer identifiers (strings, floats) are
	/// ignored. With nothing assigned the first identifier is `1`.
	pub fn next_portable_id(&self) -> i64 {
		let ids = self.assigned_ids.read();
		ids.iter()
			.filter_map(Value::as_i64)
			.max()
			.map_or(1, |max| max + 1)
	}

	/// Assigns and registers the next portable identifier in one step.
	pub fn assign_portable_id(&self) -> Value {
		let mut ids = self.assigned_ids.write();
		let next = ids
			.iter()
			.filter_map(Value::as_i64)
			.max()
			.map_or(1, |max| max + 1);
		let value = Value::from(next);
		ids.push(value.clone());
		value
	}

	/// Registers an externally chosen portable identifier (a manual
	/// override). Non-integer values are accepted but never influence
	/// [`Self::next_portable_id`].
	pub fn register_portable_id(&self, id: impl Into<Value>) {
		self.assigned_ids.write().push(id.into());
	}

	/// Produces this model's seed artifact: the ordered, fully projected
	/// attribute maps of every record in scope.
	///
	/// Returns `None` when no records are in scope: "nothing to write", as
	/// opposed to an artifact containing an empty collection.
	pub fn serialize(&self, ctx: &RunContext<'_>, set: &ModelSet) -> Option<SeedArtifact> {
		let records = self.records(ctx);
		if records.is_empty() {
			return None;
		}
		let projected = records
			.iter()
			.map(|record| record.projected(ctx, set, self))
			.collect();
		Some(SeedArtifact::new(self.entity.clone(), projected))
	}
}

impl std::fmt::Debug for EntityModel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EntityModel")
			.field("entity", &self.entity)
			.field("dependencies", &self.dependencies)
			.finish_non_exhaustive()
	}
}

/// The run's models, ordered so dependencies come first.
#[derive(Debug)]
pub struct ModelSet {
	models: Vec<Arc<EntityModel>>,
	index: HashMap<EntityType, usize>,
}

impl ModelSet {
	/// Builds one model per configured entity type and orders them by their
	/// dependencies.
	///
	/// An explicit selection naming an entity type the store does not know,
	/// or naming the same type twice, fails fast with
	/// [`HarvestError::InvalidConfiguration`] before any rows are touched.
	/// Structural graph problems (cycles, dependencies on types outside the
	/// run) abort with the corresponding error.
	pub fn build(ctx: &RunContext<'_>) -> HarvestResult<Self> {
		let known = ctx.store().entity_types();

		let selections: Vec<ModelSelection> = match ctx.config().selections() {
			Some(explicit) => {
				for selection in explicit {
					if !known.contains(selection.entity()) {
						return Err(HarvestError::InvalidConfiguration(format!(
							"`{}` is not a known entity type",
							selection.entity()
						)));
					}
				}
				explicit.to_vec()
			}
			None => known
				.iter()
				.map(|entity| ModelSelection::all(entity.name()))
				.collect(),
		};

		let mut models: Vec<Arc<EntityModel>> = Vec::with_capacity(selections.len());
		for selection in &selections {
			if models
				.iter()
				.any(|model| model.entity() == selection.entity())
			{
				return Err(HarvestError::InvalidConfiguration(format!(
					"`{}` is selected more than once",
					selection.entity()
				)));
			}
			models.push(Arc::new(EntityModel::build(
				ctx,
				selection.entity().clone(),
				selection.scope().clone(),
			)?));
		}

		let mut graph = DependencyGraph::new();
		for model in &models {
			graph.add_node(model.entity().clone());
		}
		for model in &models {
			for dependency in model.dependencies() {
				graph.depend_on(model.entity().clone(), dependency.clone());
			}
		}
		let order = graph.sort()?;

		let mut by_type: HashMap<EntityType, Arc<EntityModel>> = models
			.into_iter()
			.map(|model| (model.entity().clone(), model))
			.collect();
		let mut ordered = Vec::with_capacity(order.len());
		let mut index = HashMap::with_capacity(order.len());
		for entity in order {
			if let Some(model) = by_type.remove(&entity) {
				index.insert(entity, ordered.len());
				ordered.push(model);
			}
		}

		Ok(Self {
			models: ordered,
			index,
		})
	}

	/// Returns the model for the given entity type, if it is part of the run.
	pub fn get(&self, entity: &EntityType) -> Option<&Arc<EntityModel>> {
		self.index.get(entity).map(|position| &self.models[*position])
	}

	/// Iterates the models in dependency order.
	pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityModel>> {
		self.models.iter()
	}

	/// Returns the number of models in the run.
	pub fn len(&self) -> usize {
		self.models.len()
	}

	/// Returns true if the run has no models.
	pub fn is_empty(&self) -> bool {
		self.models.is_empty()
	}

	/// Locates a record across models by entity type and native identifier.
	pub fn find(
		&self,
		ctx: &RunContext<'_>,
		entity: &EntityType,
		native_id: &Value,
	) -> Option<Arc<SeedRecord>> {
		self.get(entity)
			.and_then(|model| model.find(ctx, native_id))
	}
}
