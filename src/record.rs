//! Row projections.
//!
//! A [`SeedRecord`] wraps one raw row and produces its portable form: the
//! native identifier is replaced by a run-local portable identifier, foreign
//! keys are rewritten to the portable identifiers of the rows they reference,
//! and file-valued attributes are swapped for the relative paths of their
//! materialized copies.

use once_cell::sync::OnceCell;
use serde_json::{Map, Value};

use crate::context::RunContext;
use crate::error::{HarvestError, HarvestResult};
use crate::files::FileAttribute;
use crate::model::{EntityModel, ModelSet};
use crate::schema::{AssociationDescriptor, EntityType, RawRow};

/// Attribute carrying the portable identifier in projected records.
pub const PORTABLE_ID_ATTR: &str = "seed_id";

/// Attribute holding the native identifier on raw rows.
const NATIVE_ID_ATTR: &str = "id";

/// One row wrapped for extraction.
///
/// Identity is (entity type, native id); records never outlive the run that
/// created them.
#[derive(Debug)]
pub struct SeedRecord {
	entity: EntityType,
	row: RawRow,
	portable_id: OnceCell<Value>,
}

impl SeedRecord {
	/// Wraps a raw row of the given entity type.
	pub(crate) fn new(entity: EntityType, row: RawRow) -> Self {
		Self {
			entity,
			row,
			portable_id: OnceCell::new(),
		}
	}

	/// Returns the entity type this record belongs to.
	pub fn entity(&self) -> &EntityType {
		&self.entity
	}

	/// Returns the row's native identifier in the source store.
	pub fn native_id(&self) -> &Value {
		&self.row.id
	}

	/// Returns the underlying raw row.
	pub fn raw(&self) -> &RawRow {
		&self.row
	}

	/// Returns the record's portable identifier, assigning one through the
	/// owning model on first request. Stable for the rest of the run.
	pub fn portable_id(&self, model: &EntityModel) -> Value {
		self.portable_id
			.get_or_init(|| model.assign_portable_id())
			.clone()
	}

	/// Produces the record's projected attribute map.
	///
	/// The map carries [`PORTABLE_ID_ATTR`]; the native identifier is not
	/// copied. Foreign keys are replaced by referenced portable identifiers,
	/// file-valued attributes by materialized relative paths, and everything
	/// else passes through (empty values optionally omitted).
	///
	/// Degradations never abort: an unresolvable reference or a failed
	/// materialization is logged, counted, and serialized as null so the gap
	/// stays visible in the artifact.
	pub fn projected(
		&self,
		ctx: &RunContext<'_>,
		set: &ModelSet,
		model: &EntityModel,
	) -> Map<String, Value> {
		let mut out = Map::new();
		out.insert(PORTABLE_ID_ATTR.to_string(), self.portable_id(model));

		for attribute in model.attributes() {
			if attribute == NATIVE_ID_ATTR {
				continue;
			}
			let raw = self.row.get(attribute).cloned().unwrap_or(Value::Null);

			if let Some(association) = model.association_for(attribute) {
				let resolved = match self.resolve_reference(ctx, set, association, &raw) {
					Ok(value) => value,
					Err(error) => {
						tracing::warn!(
							entity = %self.entity,
							native_id = %self.row.id,
							association = association.name(),
							error = %error,
							"leaving unresolved reference as null"
						);
						ctx.stats().record_unresolved_reference();
						Value::Null
					}
				};
				out.insert(attribute.clone(), resolved);
				continue;
			}

			if let Some(file) = FileAttribute::detect(&raw) {
				let materialized = match ctx.materializer().materialize(&file) {
					Ok(handle) => Value::String(handle.relative_path().display().to_string()),
					Err(error) => {
						tracing::warn!(
							entity = %self.entity,
							native_id = %self.row.id,
							attribute = attribute.as_str(),
							error = %error,
							"dropping attachment that could not be materialized"
						);
						ctx.stats().record_attachment_failure();
						Value::Null
					}
				};
				out.insert(attribute.clone(), materialized);
				continue;
			}

			if ctx.config().omit_empty_attrs() && is_empty(&raw) {
				continue;
			}
			out.insert(attribute.clone(), raw);
		}

		out
	}

	/// Resolves one foreign key to the referenced row's portable identifier.
	///
	/// A null foreign key resolves to null. Anything else must lead to a row
	/// in an already materialized model of the run.
	fn resolve_reference(
		&self,
		ctx: &RunContext<'_>,
		set: &ModelSet,
		association: &AssociationDescriptor,
		raw: &Value,
	) -> HarvestResult<Value> {
		if raw.is_null() {
			return Ok(Value::Null);
		}

		let unresolvable = |entity: &str| HarvestError::UnresolvableReference {
			entity: entity.to_string(),
			id: raw.to_string(),
			association: association.name().to_string(),
		};

		let target = association
			.target_for(&self.row)
			.ok_or_else(|| unresolvable("<unknown>"))?;

		let target_model = set
			.get(&target)
			.ok_or_else(|| unresolvable(target.name()))?;
		let referenced = target_model
			.find(ctx, raw)
			.ok_or_else(|| unresolvable(target.name()))?;

		Ok(referenced.portable_id(target_model.as_ref()))
	}
}

impl PartialEq for SeedRecord {
	fn eq(&self, other: &Self) -> bool {
		self.entity == other.entity && self.row.id == other.row.id
	}
}

/// Returns true for values the omit-empty policy drops: null and the empty
/// string.
fn is_empty(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::HarvestConfig;
	use crate::memory::MemoryStore;
	use crate::schema::AssociationDescriptor;
	use rstest::rstest;
	use serde_json::json;
	use tempfile::tempdir;

	fn blog_store() -> MemoryStore {
		MemoryStore::new()
			.entity("User", &["id", "first_name", "nickname"])
			.entity("Post", &["id", "user_id", "title"])
			.association(
				"Post",
				AssociationDescriptor::fixed("poster", "user_id", "User"),
			)
			.entity("Vote", &["id", "votable_id", "votable_type"])
			.association(
				"Vote",
				AssociationDescriptor::polymorphic("votable", "votable_id", "votable_type"),
			)
			.row("User", 7, json!({"first_name": "Bo", "nickname": ""}))
			.row("Post", 3, json!({"user_id": 7, "title": "hello"}))
			.row("Vote", 1, json!({"votable_id": 3, "votable_type": "Post"}))
			.row("Vote", 2, json!({"votable_id": 7, "votable_type": "User"}))
	}

	fn run<'a>(
		store: &'a MemoryStore,
		config: &'a HarvestConfig,
	) -> (RunContext<'a>, ModelSet) {
		let ctx = RunContext::new(store, config);
		let set = ModelSet::build(&ctx).unwrap();
		(ctx, set)
	}

	#[rstest]
	fn test_portable_id_is_memoized() {
		let store = blog_store();
		let config = HarvestConfig::new();
		let (ctx, set) = run(&store, &config);

		let user = set.get(&EntityType::new("User")).unwrap();
		let record = user.find(&ctx, &json!(7)).unwrap();
		let first = record.portable_id(user.as_ref());
		let second = record.portable_id(user.as_ref());
		assert_eq!(first, json!(1));
		assert_eq!(first, second);
		assert_eq!(user.next_portable_id(), 2);
	}

	#[rstest]
	fn test_fixed_reference_round_trips() {
		let store = blog_store();
		let config = HarvestConfig::new();
		let (ctx, set) = run(&store, &config);

		let user = set.get(&EntityType::new("User")).unwrap();
		let user_record = user.find(&ctx, &json!(7)).unwrap();
		let user_portable = user_record.portable_id(user.as_ref());

		let post = set.get(&EntityType::new("Post")).unwrap();
		let projected = post
			.find(&ctx, &json!(3))
			.unwrap()
			.projected(&ctx, &set, post.as_ref());

		assert_eq!(projected.get("user_id"), Some(&user_portable));
		assert_eq!(projected.get("title"), Some(&json!("hello")));
		assert!(!projected.contains_key("id"));
		assert_eq!(projected.get(PORTABLE_ID_ATTR), Some(&json!(1)));
	}

	#[rstest]
	fn test_polymorphic_reference_round_trips() {
		let store = blog_store();
		let config = HarvestConfig::new();
		let (ctx, set) = run(&store, &config);

		let post = set.get(&EntityType::new("Post")).unwrap();
		let post_portable = post.find(&ctx, &json!(3)).unwrap().portable_id(post.as_ref());
		let user = set.get(&EntityType::new("User")).unwrap();
		let user_portable = user.find(&ctx, &json!(7)).unwrap().portable_id(user.as_ref());

		let vote = set.get(&EntityType::new("Vote")).unwrap();
		let onto_post = vote
			.find(&ctx, &json!(1))
			.unwrap()
			.projected(&ctx, &set, vote.as_ref());
		let onto_user = vote
			.find(&ctx, &json!(2))
			.unwrap()
			.projected(&ctx, &set, vote.as_ref());

		assert_eq!(onto_post.get("votable_id"), Some(&post_portable));
		assert_eq!(onto_post.get("votable_type"), Some(&json!("Post")));
		assert_eq!(onto_user.get("votable_id"), Some(&user_portable));
		assert_eq!(onto_user.get("votable_type"), Some(&json!("User")));
	}

	#[rstest]
	fn test_unresolvable_reference_becomes_null_and_is_counted() {
		let store = blog_store().row("Post", 4, json!({"user_id": 999, "title": "orphan"}));
		let config = HarvestConfig::new();
		let (ctx, set) = run(&store, &config);

		let post = set.get(&EntityType::new("Post")).unwrap();
		let projected = post
			.find(&ctx, &json!(4))
			.unwrap()
			.projected(&ctx, &set, post.as_ref());

		assert_eq!(projected.get("user_id"), Some(&Value::Null));
		assert_eq!(ctx.stats().unresolved_references(), 1);
	}

	#[rstest]
	fn test_null_foreign_key_stays_null_without_warning() {
		let store = blog_store().row("Post", 5, json!({"user_id": null, "title": "draft"}));
		let config = HarvestConfig::new();
		let (ctx, set) = run(&store, &config);

		let post = set.get(&EntityType::new("Post")).unwrap();
		let projected = post
			.find(&ctx, &json!(5))
			.unwrap()
			.projected(&ctx, &set, post.as_ref());

		assert_eq!(projected.get("user_id"), Some(&Value::Null));
		assert_eq!(ctx.stats().unresolved_references(), 0);
	}

	#[rstest]
	fn test_ignored_attrs_never_appear() {
		let store = blog_store();
		let config = HarvestConfig::new().with_ignored_attrs_list("title");
		let (ctx, set) = run(&store, &config);

		let post = set.get(&EntityType::new("Post")).unwrap();
		let projected = post
			.find(&ctx, &json!(3))
			.unwrap()
			.projected(&ctx, &set, post.as_ref());

		assert!(!projected.contains_key("title"));
	}

	#[rstest]
	fn test_omit_empty_attrs() {
		let store = blog_store();
		let config = HarvestConfig::new().with_omit_empty_attrs(true);
		let (ctx, set) = run(&store, &config);

		let user = set.get(&EntityType::new("User")).unwrap();
		let projected = user
			.find(&ctx, &json!(7))
			.unwrap()
			.projected(&ctx, &set, user.as_ref());

		assert!(!projected.contains_key("nickname"));
		assert_eq!(projected.get("first_name"), Some(&json!("Bo")));
	}

	#[rstest]
	fn test_file_attribute_replaced_with_relative_path() {
		let source_dir = tempdir().unwrap();
		let seed_root = tempdir().unwrap();
		let avatar = source_dir.path().join("avatar.png");
		std::fs::write(&avatar, b"bytes").unwrap();

		let store = MemoryStore::new()
			.entity("User", &["id", "avatar"])
			.row("User", 1, json!({"avatar": {"path": avatar.to_string_lossy()}}));
		let config = HarvestConfig::new().with_seed_root(seed_root.path());
		let (ctx, set) = run(&store, &config);

		let user = set.get(&EntityType::new("User")).unwrap();
		let projected = user
			.find(&ctx, &json!(1))
			.unwrap()
			.projected(&ctx, &set, user.as_ref());

		assert_eq!(projected.get("avatar"), Some(&json!("files/avatar.png")));
		assert!(ctx.materializer().files_dir().join("avatar.png").exists());
	}

	#[rstest]
	fn test_failed_materialization_drops_attribute_to_null() {
		let seed_root = tempdir().unwrap();
		let store = MemoryStore::new()
			.entity("User", &["id", "avatar"])
			.row("User", 1, json!({"avatar": {"path": "/nope/missing.png"}}));
		let config = HarvestConfig::new().with_seed_root(seed_root.path());
		let (ctx, set) = run(&store, &config);

		let user = set.get(&EntityType::new("User")).unwrap();
		let projected = user
			.find(&ctx, &json!(1))
			.unwrap()
			.projected(&ctx, &set, user.as_ref());

		assert_eq!(projected.get("avatar"), Some(&Value::Null));
		assert_eq!(ctx.stats().attachment_failures(), 1);
	}

	#[rstest]
	fn test_record_identity() {
		let a = SeedRecord::new(EntityType::new("User"), RawRow::new(json!(1), Map::new()));
		let b = SeedRecord::new(EntityType::new("User"), RawRow::new(json!(1), Map::new()));
		let c = SeedRecord::new(EntityType::new("User"), RawRow::new(json!(2), Map::new()));
		assert_eq!(a, b);
		assert_ne!(a, c);
	}
}
