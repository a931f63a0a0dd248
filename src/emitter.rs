//! Seed artifact emission.
//!
//! The emitter walks the run's models in dependency order, serializes each
//! one's projected records, and hands every non-empty artifact to a writer.
//! Models with nothing in scope are skipped entirely rather than producing
//! empty files.

use std::fs;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::context::{HarvestReport, RunContext};
use crate::error::HarvestResult;
use crate::model::ModelSet;
use crate::schema::EntityType;

/// The ordered, reference-resolved output for one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedArtifact {
	entity: EntityType,
	records: Vec<Map<String, Value>>,
}

impl SeedArtifact {
	/// Creates an artifact from projected records. Callers only build one
	/// when there is at least one record.
	pub(crate) fn new(entity: EntityType, records: Vec<Map<String, Value>>) -> Self {
		Self { entity, records }
	}

	/// Returns the entity type the artifact belongs to.
	pub fn entity(&self) -> &EntityType {
		&self.entity
	}

	/// Returns the projected records, in extraction order.
	pub fn records(&self) -> &[Map<String, Value>] {
		&self.records
	}

	/// Returns the number of records in the artifact.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns true if the artifact holds no records.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Renders the artifact as YAML, optionally nested under a namespace key.
	pub fn to_yaml(&self, namespace: Option<&str>) -> HarvestResult<String> {
		let records = Value::Array(self.records.iter().cloned().map(Value::Object).collect());
		let document = match namespace {
			Some(key) => {
				let mut wrapper = Map::new();
				wrapper.insert(key.to_string(), records);
				Value::Object(wrapper)
			}
			None => records,
		};
		Ok(serde_yaml::to_string(&document)?)
	}
}

/// Destination for seed artifacts.
///
/// The filesystem writer below is the normal choice; tests and alternative
/// output stages provide their own.
pub trait SeedWriter {
	/// Persists one artifact and returns where it went.
	fn write(&mut self, artifact: &SeedArtifact) -> HarvestResult<PathBuf>;
}

/// Writes one YAML file per entity type into the seed directory.
#[derive(Debug, Clone)]
pub struct YamlSeedWriter {
	seed_dir: PathBuf,
	namespace: Option<String>,
}

impl YamlSeedWriter {
	/// Creates a writer targeting the given seed directory.
	pub fn new(seed_dir: impl Into<PathBuf>) -> Self {
		Self {
			seed_dir: seed_dir.into(),
			namespace: None,
		}
	}

	/// Nests every artifact under the given top-level key.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	/// Returns the path an artifact for the given entity type would go to.
	pub fn target_path(&self, entity: &EntityType) -> PathBuf {
		self.seed_dir.join(format!("{}.yml", entity.artifact_name()))
	}
}

impl SeedWriter for YamlSeedWriter {
	fn write(&mut self, artifact: &SeedArtifact) -> HarvestResult<PathBuf> {
		fs::create_dir_all(&self.seed_dir)?;
		let path = self.target_path(artifact.entity());
		fs::write(&path, artifact.to_yaml(self.namespace.as_deref())?)?;
		Ok(path)
	}
}

/// Drives one extraction run end to end.
pub struct SeedEmitter<'a, W: SeedWriter> {
	ctx: &'a RunContext<'a>,
	writer: W,
}

impl<'a, W: SeedWriter> SeedEmitter<'a, W> {
	/// Creates an emitter over the given run context and writer.
	pub fn new(ctx: &'a RunContext<'a>, writer: W) -> Self {
		Self { ctx, writer }
	}

	/// Builds the model set, serializes every model in dependency order, and
	/// writes the non-empty artifacts.
	///
	/// # Errors
	///
	/// Structural graph errors, invalid configuration, and writer failures
	/// abort the run. Per-record and per-attribute degradations do not; they
	/// are reflected in the returned report.
	pub fn run(mut self) -> HarvestResult<HarvestReport> {
		tracing::debug!("harvesting records from the data store");

		let set = ModelSet::build(self.ctx)?;

		let mut entities_written = Vec::new();
		let mut entities_skipped = Vec::new();
		let mut records_written = 0;

		for model in set.iter() {
			match model.serialize(self.ctx, &set) {
				Some(artifact) => {
					let path = self.writer.write(&artifact)?;
					tracing::debug!(
						entity = %model.entity(),
						records = artifact.len(),
						path = %path.display(),
						"wrote seed artifact"
					);
					records_written += artifact.len();
					entities_written.push(model.entity().name().to_string());
				}
				None => {
					tracing::debug!(entity = %model.entity(), "no records in scope; skipping");
					entities_skipped.push(model.entity().name().to_string());
				}
			}
		}

		let stats = self.ctx.stats();
		let report = HarvestReport {
			entities_written,
			entities_skipped,
			records_written,
			unresolved_references: stats.unresolved_references(),
			attachment_failures: stats.attachment_failures(),
			load_failures: stats.load_failures(),
		};

		tracing::debug!(
			entities = report.entities_written.len(),
			records = report.records_written,
			"finished harvesting"
		);

		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn artifact() -> SeedArtifact {
		let mut first = Map::new();
		first.insert("seed_id".to_string(), json!(1));
		first.insert("title".to_string(), json!("hello"));
		let mut second = Map::new();
		second.insert("seed_id".to_string(), json!(2));
		second.insert("title".to_string(), json!("world"));
		SeedArtifact::new(EntityType::new("BlogPost"), vec![first, second])
	}

	#[rstest]
	fn test_to_yaml_without_namespace() {
		let yaml = artifact().to_yaml(None).unwrap();
		let parsed: Value = serde_yaml::from_str(&yaml).unwrap();
		assert_eq!(
			parsed,
			json!([
				{"seed_id": 1, "title": "hello"},
				{"seed_id": 2, "title": "world"},
			])
		);
	}

	#[rstest]
	fn test_to_yaml_with_namespace() {
		let yaml = artifact().to_yaml(Some("records")).unwrap();
		let parsed: Value = serde_yaml::from_str(&yaml).unwrap();
		assert_eq!(
			parsed,
			json!({
				"records": [
					{"seed_id": 1, "title": "hello"},
					{"seed_id": 2, "title": "world"},
				]
			})
		);
	}

	#[rstest]
	fn test_writer_target_path_uses_artifact_name() {
		let writer = YamlSeedWriter::new("db/seeds/production");
		assert_eq!(
			writer.target_path(&EntityType::new("BlogPost")),
			PathBuf::from("db/seeds/production/blog_post.yml")
		);
	}

	#[rstest]
	fn test_writer_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let mut writer = YamlSeedWriter::new(dir.path());

		let path = writer.write(&artifact()).unwrap();
		assert_eq!(path, dir.path().join("blog_post.yml"));

		let contents = fs::read_to_string(&path).unwrap();
		let parsed: Value = serde_yaml::from_str(&contents).unwrap();
		assert_eq!(parsed.as_array().unwrap().len(), 2);
	}
}
