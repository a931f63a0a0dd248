//! The capability surface consumed from the host persistence layer.
//!
//! The pipeline never talks to a database directly. It sees entity types,
//! their attribute lists, their declared belongs-to associations, and their
//! rows, all through the narrow [`SchemaIntrospector`] and [`DataStore`]
//! traits. Any persistence technology that can answer those questions can be
//! harvested.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HarvestResult;

/// Opaque handle identifying one kind of persisted entity.
///
/// Equality and hashing are by name; the handle is used as the dependency
/// graph's node key and as the lookup key for models within a run.
///
/// # Examples
///
/// ```rust
/// use harvest::schema::EntityType;
///
/// let entity = EntityType::new("BlogPost");
/// assert_eq!(entity.name(), "BlogPost");
/// assert_eq!(entity.artifact_name(), "blog_post");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityType(Arc<str>);

impl EntityType {
	/// Creates a handle for the entity type with the given name.
	pub fn new(name: impl AsRef<str>) -> Self {
		Self(Arc::from(name.as_ref()))
	}

	/// Returns the entity type's name as declared by the host store.
	pub fn name(&self) -> &str {
		&self.0
	}

	/// Returns the snake_cased name used for seed artifact file names.
	pub fn artifact_name(&self) -> String {
		let chars: Vec<char> = self.0.chars().collect();
		let mut out = String::with_capacity(self.0.len() + 4);
		for (i, c) in chars.iter().enumerate() {
			if c.is_uppercase() {
				let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
				let next_lower = i + 1 < chars.len() && chars[i + 1].is_lowercase();
				if i > 0 && (prev_lower || next_lower) {
					out.push('_');
				}
				out.extend(c.to_lowercase());
			} else {
				out.push(*c);
			}
		}
		out
	}
}

impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for EntityType {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

/// One persisted row as handed over by the store: a native identifier plus an
/// attribute map.
///
/// The native identifier is whatever the store uses internally (usually an
/// auto-generated integer); it never survives into the emitted artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
	/// Native identifier of the row in the source store.
	pub id: Value,

	/// Attribute values keyed by attribute name.
	pub values: Map<String, Value>,
}

impl RawRow {
	/// Creates a row from its native identifier and attribute map.
	pub fn new(id: impl Into<Value>, values: Map<String, Value>) -> Self {
		Self {
			id: id.into(),
			values,
		}
	}

	/// Returns the value of the named attribute, if present.
	pub fn get(&self, attribute: &str) -> Option<&Value> {
		self.values.get(attribute)
	}
}

/// The set of rows an entity model extracts: everything, or a filtered subset.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RowScope {
	/// All rows of the entity type.
	#[default]
	All,

	/// Only rows whose `attribute` equals `value`.
	Eq {
		/// Attribute to compare.
		attribute: String,
		/// Value the attribute must equal.
		value: Value,
	},
}

impl RowScope {
	/// Creates an equality scope over the given attribute.
	pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::Eq {
			attribute: attribute.into(),
			value: value.into(),
		}
	}

	/// Returns true if the row falls inside this scope.
	pub fn matches(&self, row: &RawRow) -> bool {
		match self {
			Self::All => true,
			Self::Eq { attribute, value } => row.get(attribute) == Some(value),
		}
	}
}

/// Where a belongs-to association points.
///
/// Most associations name their target statically. A polymorphic association
/// stores the target entity type next to the foreign key, in a discriminator
/// attribute, and is resolved per row.
#[derive(Debug, Clone, PartialEq)]
pub enum AssociationTarget {
	/// The association always references the same entity type.
	Fixed(EntityType),

	/// The target entity type is read from a discriminator attribute on each
	/// row.
	Polymorphic {
		/// Attribute holding the target entity type's name.
		discriminator: String,
	},
}

/// One belongs-to relationship declared by an entity type.
///
/// Immutable after construction; owned by exactly one entity type's model.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationDescriptor {
	name: String,
	foreign_key: String,
	target: AssociationTarget,
}

impl AssociationDescriptor {
	/// Creates a descriptor for an association with a fixed target type.
	pub fn fixed(
		name: impl Into<String>,
		foreign_key: impl Into<String>,
		target: impl Into<EntityType>,
	) -> Self {
		Self {
			name: name.into(),
			foreign_key: foreign_key.into(),
			target: AssociationTarget::Fixed(target.into()),
		}
	}

	/// Creates a descriptor for a polymorphic association.
	pub fn polymorphic(
		name: impl Into<String>,
		foreign_key: impl Into<String>,
		discriminator: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			foreign_key: foreign_key.into(),
			target: AssociationTarget::Polymorphic {
				discriminator: discriminator.into(),
			},
		}
	}

	/// Returns the symbolic name of the relationship.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the attribute holding the raw foreign-key value.
	pub fn foreign_key(&self) -> &str {
		&self.foreign_key
	}

	/// Returns the association's target description.
	pub fn target(&self) -> &AssociationTarget {
		&self.target
	}

	/// Returns true if the target type is decided per row.
	pub fn is_polymorphic(&self) -> bool {
		matches!(self.target, AssociationTarget::Polymorphic { .. })
	}

	/// Returns the discriminator attribute for polymorphic associations.
	pub fn discriminator(&self) -> Option<&str> {
		match &self.target {
			AssociationTarget::Polymorphic { discriminator } => Some(discriminator),
			AssociationTarget::Fixed(_) => None,
		}
	}

	/// Resolves the concrete entity type this association references for the
	/// given row.
	///
	/// Returns `None` for a polymorphic association whose discriminator is
	/// absent or not a string.
	pub fn target_for(&self, row: &RawRow) -> Option<EntityType> {
		match &self.target {
			AssociationTarget::Fixed(entity) => Some(entity.clone()),
			AssociationTarget::Polymorphic { discriminator } => row
				.get(discriminator)
				.and_then(Value::as_str)
				.map(EntityType::new),
		}
	}
}

/// Schema-level capabilities the pipeline needs from the host store.
///
/// Called once per entity type during setup; the returned descriptors are
/// treated as immutable for the rest of the run.
pub trait SchemaIntrospector {
	/// Enumerates every entity type the store knows about, in a stable order.
	fn entity_types(&self) -> Vec<EntityType>;

	/// Lists the persisted attribute names of the given entity type.
	fn attribute_names(&self, entity: &EntityType) -> HarvestResult<Vec<String>>;

	/// Lists the belongs-to associations declared by the given entity type.
	fn associations(&self, entity: &EntityType) -> HarvestResult<Vec<AssociationDescriptor>>;
}

/// Row-level capabilities the pipeline needs from the host store.
pub trait DataStore: SchemaIntrospector {
	/// Loads the rows of the given entity type that fall inside `scope`.
	fn load_rows(&self, entity: &EntityType, scope: &RowScope) -> HarvestResult<Vec<RawRow>>;

	/// Returns the distinct non-null values of one attribute across all rows
	/// of the entity type.
	///
	/// Used to compute the closure of target types reachable through a
	/// polymorphic association.
	fn distinct_values(&self, entity: &EntityType, attribute: &str) -> HarvestResult<Vec<Value>>;
}
