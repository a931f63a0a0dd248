//! In-memory data store.
//!
//! A builder-style [`DataStore`] implementation holding everything in plain
//! collections. It is the reference implementation of the capability traits,
//! the backbone of this crate's own tests, and a convenient way to harvest
//! data that never lived in a database in the first place.
//!
//! # Examples
//!
//! ```rust
//! use harvest::memory::MemoryStore;
//! use harvest::schema::{AssociationDescriptor, DataStore, EntityType, RowScope};
//! use serde_json::json;
//!
//! let store = MemoryStore::new()
//! 	.entity("User", &["id", "name"])
//! 	.entity("Post", &["id", "user_id"])
//! 	.association("Post", AssociationDescriptor::fixed("author", "user_id", "User"))
//! 	.row("User", 1, json!({"name": "Bo"}));
//!
//! let rows = store.load_rows(&EntityType::new("User"), &RowScope::All).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{HarvestError, HarvestResult};
use crate::schema::{
	AssociationDescriptor, DataStore, EntityType, RawRow, RowScope, SchemaIntrospector,
};

struct EntityDef {
	entity: EntityType,
	attributes: Vec<String>,
	associations: Vec<AssociationDescriptor>,
	rows: Vec<RawRow>,
}

/// In-memory store declared through a builder.
///
/// Entity types keep their declaration order, which is the enumeration order
/// the dependency sort ties on.
#[derive(Default)]
pub struct MemoryStore {
	entities: Vec<EntityDef>,
	failing_loads: HashSet<String>,
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Declares an entity type with its persisted attribute names.
	pub fn entity(mut self, name: &str, attributes: &[&str]) -> Self {
		self.entities.push(EntityDef {
			entity: EntityType::new(name),
			attributes: attributes.iter().map(|a| a.to_string()).collect(),
			associations: Vec::new(),
			rows: Vec::new(),
		});
		self
	}

	/// Declares a belongs-to association on a previously declared entity
	/// type.
	///
	/// # Panics
	///
	/// Panics if the entity type has not been declared with
	/// [`Self::entity`] yet.
	pub fn association(mut self, name: &str, association: AssociationDescriptor) -> Self {
		self.entity_mut(name).associations.push(association);
		self
	}

	/// Adds a row for a previously declared entity type.
	///
	/// `values` must be a JSON object; the native identifier is kept separate
	/// from it but also mirrored into the `id` attribute, the way stores
	/// expose their primary key column.
	///
	/// # Panics
	///
	/// Panics if the entity type has not been declared yet or `values` is not
	/// an object.
	pub fn row(mut self, name: &str, id: impl Into<Value>, values: Value) -> Self {
		let Value::Object(mut map) = values else {
			panic!("row values for {name} must be a JSON object");
		};
		let id = id.into();
		map.insert("id".to_string(), id.clone());
		self.entity_mut(name).rows.push(RawRow::new(id, map));
		self
	}

	/// Makes every row load for the named entity type fail, to exercise
	/// degraded runs.
	pub fn fail_loads_for(mut self, name: &str) -> Self {
		self.failing_loads.insert(name.to_string());
		self
	}

	fn entity_mut(&mut self, name: &str) -> &mut EntityDef {
		self.entities
			.iter_mut()
			.find(|def| def.entity.name() == name)
			.unwrap_or_else(|| panic!("unknown entity type {name}; declare it with entity() first"))
	}

	fn entity_def(&self, entity: &EntityType) -> HarvestResult<&EntityDef> {
		self.entities
			.iter()
			.find(|def| &def.entity == entity)
			.ok_or_else(|| HarvestError::Store(format!("unknown entity type {entity}")))
	}
}

impl SchemaIntrospector for MemoryStore {
	fn entity_types(&self) -> Vec<EntityType> {
		self.entities.iter().map(|def| def.entity.clone()).collect()
	}

	fn attribute_names(&self, entity: &EntityType) -> HarvestResult<Vec<String>> {
		Ok(self.entity_def(entity)?.attributes.clone())
	}

	fn associations(&self, entity: &EntityType) -> HarvestResult<Vec<AssociationDescriptor>> {
		Ok(self.entity_def(entity)?.associations.clone())
	}
}

impl DataStore for MemoryStore {
	fn load_rows(&self, entity: &EntityType, scope: &RowScope) -> HarvestResult<Vec<RawRow>> {
		if self.failing_loads.contains(entity.name()) {
			return Err(HarvestError::Store(format!(
				"simulated load failure for {entity}"
			)));
		}
		Ok(self
			.entity_def(entity)?
			.rows
			.iter()
			.filter(|row| scope.matches(row))
			.cloned()
			.collect())
	}

	fn distinct_values(&self, entity: &EntityType, attribute: &str) -> HarvestResult<Vec<Value>> {
		let mut seen: Vec<Value> = Vec::new();
		for row in &self.entity_def(entity)?.rows {
			if let Some(value) = row.get(attribute)
				&& !value.is_null()
				&& !seen.contains(value)
			{
				seen.push(value.clone());
			}
		}
		Ok(seen)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn store() -> MemoryStore {
		MemoryStore::new()
			.entity("Vote", &["id", "votable_id", "votable_type"])
			.row("Vote", 1, json!({"votable_id": 1, "votable_type": "Post"}))
			.row("Vote", 2, json!({"votable_id": 2, "votable_type": "Post"}))
			.row("Vote", 3, json!({"votable_id": 1, "votable_type": "User"}))
			.row("Vote", 4, json!({"votable_id": 9, "votable_type": null}))
	}

	#[rstest]
	fn test_rows_mirror_the_native_id() {
		let rows = store()
			.load_rows(&EntityType::new("Vote"), &RowScope::All)
			.unwrap();
		assert_eq!(rows.len(), 4);
		assert_eq!(rows[0].get("id"), Some(&json!(1)));
		assert_eq!(rows[0].id, json!(1));
	}

	#[rstest]
	fn test_scoped_load() {
		let rows = store()
			.load_rows(
				&EntityType::new("Vote"),
				&RowScope::eq("votable_type", "Post"),
			)
			.unwrap();
		assert_eq!(rows.len(), 2);
	}

	#[rstest]
	fn test_distinct_values_skip_null_and_duplicates() {
		let values = store()
			.distinct_values(&EntityType::new("Vote"), "votable_type")
			.unwrap();
		assert_eq!(values, vec![json!("Post"), json!("User")]);
	}

	#[rstest]
	fn test_unknown_entity_is_a_store_error() {
		let result = store().load_rows(&EntityType::new("Banana"), &RowScope::All);
		assert!(matches!(result, Err(HarvestError::Store(_))));
	}

	#[rstest]
	fn test_failing_loads() {
		let store = store().fail_loads_for("Vote");
		let result = store.load_rows(&EntityType::new("Vote"), &RowScope::All);
		assert!(matches!(result, Err(HarvestError::Store(_))));
	}
}
