//! Dependency graph over entity types.
//!
//! Every entity type becomes a node; every belongs-to relationship becomes an
//! edge towards the referenced type. The topological order produced here is
//! the write order of the seed artifacts: a type's dependencies are always
//! emitted before the type itself, so replay never sees a dangling reference.
//!
//! # Examples
//!
//! ```rust
//! use harvest::graph::DependencyGraph;
//! use harvest::schema::EntityType;
//!
//! let user = EntityType::new("User");
//! let post = EntityType::new("Post");
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node(post.clone());
//! graph.add_node(user.clone());
//! graph.depend_on(post.clone(), user.clone());
//!
//! let order = graph.sort().unwrap();
//! assert_eq!(order, vec![user, post]);
//! ```

use std::collections::HashMap;

use crate::error::{HarvestError, HarvestResult};
use crate::schema::EntityType;

/// Visit state of a node during the depth-first sort.
enum Mark {
	InProgress,
	Done,
}

/// Directed dependency graph with a deterministic topological sort.
///
/// Nodes keep their insertion order and each node's dependencies keep their
/// declared order, so the sort is stable across runs on an unchanged schema.
#[derive(Debug, Default)]
pub struct DependencyGraph {
	nodes: Vec<EntityType>,
	deps: HashMap<EntityType, Vec<EntityType>>,
}

impl DependencyGraph {
	/// Creates an empty graph.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a node, keeping the first insertion's position. Idempotent.
	pub fn add_node(&mut self, entity: EntityType) {
		if !self.deps.contains_key(&entity) {
			self.nodes.push(entity.clone());
			self.deps.insert(entity, Vec::new());
		}
	}

	/// Records that `entity` depends on `dep`.
	///
	/// The owning node is added if absent; the dependency target is not. A
	/// dependency on an unknown node surfaces as
	/// [`HarvestError::MissingDependency`] at sort time.
	pub fn depend_on(&mut self, entity: EntityType, dep: EntityType) {
		self.add_node(entity.clone());
		if let Some(deps) = self.deps.get_mut(&entity)
			&& !deps.contains(&dep)
		{
			deps.push(dep);
		}
	}

	/// Returns true if the entity type has been added as a node.
	pub fn contains(&self, entity: &EntityType) -> bool {
		self.deps.contains_key(entity)
	}

	/// Returns the number of nodes.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Returns true if the graph has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Produces a dependency-respecting ordering of all nodes.
	///
	/// Depth-first with post-order emission: a node is emitted only after
	/// every node it depends on. Nodes are visited in insertion order and
	/// dependencies in declared order, which makes the result deterministic.
	///
	/// # Errors
	///
	/// Returns [`HarvestError::CyclicDependency`] if any node reaches itself,
	/// and [`HarvestError::MissingDependency`] if a dependency names a node
	/// that was never added. Either way no partial ordering is returned.
	pub fn sort(&self) -> HarvestResult<Vec<EntityType>> {
		let mut marks: HashMap<EntityType, Mark> = HashMap::new();
		let mut order = Vec::with_capacity(self.nodes.len());
		let mut path: Vec<EntityType> = Vec::new();

		for node in &self.nodes {
			self.visit(node, &mut marks, &mut order, &mut path)?;
		}

		Ok(order)
	}

	fn visit(
		&self,
		node: &EntityType,
		marks: &mut HashMap<EntityType, Mark>,
		order: &mut Vec<EntityType>,
		path: &mut Vec<EntityType>,
	) -> HarvestResult<()> {
		match marks.get(node) {
			Some(Mark::Done) => return Ok(()),
			Some(Mark::InProgress) => {
				return Err(HarvestError::CyclicDependency(render_cycle(path, node)));
			}
			None => {}
		}

		marks.insert(node.clone(), Mark::InProgress);
		path.push(node.clone());

		let deps = self.deps.get(node).map(Vec::as_slice).unwrap_or(&[]);
		for dep in deps {
			if !self.deps.contains_key(dep) {
				return Err(HarvestError::MissingDependency {
					entity: dep.name().to_string(),
					required_by: node.name().to_string(),
				});
			}
			self.visit(dep, marks, order, path)?;
		}

		path.pop();
		marks.insert(node.clone(), Mark::Done);
		order.push(node.clone());
		Ok(())
	}
}

/// Renders the in-progress path from the first occurrence of `node` back to
/// itself, e.g. `Post -> Comment -> Post`.
fn render_cycle(path: &[EntityType], node: &EntityType) -> String {
	let mut names: Vec<&str> = path
		.iter()
		.skip_while(|entity| *entity != node)
		.map(EntityType::name)
		.collect();
	names.push(node.name());
	names.join(" -> ")
}
