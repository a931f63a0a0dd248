//! Shared blog-domain fixture store.
//!
//! Entity types are declared out of dependency order on purpose: Comment and
//! Post arrive before User, and Vote references Post or User per row through
//! its `votable` association. The pipeline has to reorder them.

use std::path::Path;

use harvest::prelude::*;
use serde_json::json;

/// Builds the blog store. `avatar` is the on-disk file backing the single
/// user's avatar attachment.
pub fn blog_store(avatar: &Path) -> MemoryStore {
	MemoryStore::new()
		.entity("Comment", &["id", "post_id", "body"])
		.association(
			"Comment",
			AssociationDescriptor::fixed("post", "post_id", "Post"),
		)
		.entity("Post", &["id", "user_id", "title"])
		.association(
			"Post",
			AssociationDescriptor::fixed("poster", "user_id", "User"),
		)
		.entity("User", &["id", "first_name", "last_name", "avatar"])
		.entity("Vote", &["id", "votable_id", "votable_type"])
		.association(
			"Vote",
			AssociationDescriptor::polymorphic("votable", "votable_id", "votable_type"),
		)
		.entity("Tag", &["id", "label"])
		.row(
			"User",
			1,
			json!({
				"first_name": "Bo",
				"last_name": "Janglez",
				"avatar": {"path": avatar.to_string_lossy()},
			}),
		)
		.row("Post", 1, json!({"user_id": 1, "title": "first"}))
		.row("Post", 2, json!({"user_id": 1, "title": "second"}))
		.row("Comment", 1, json!({"post_id": 1, "body": "nice"}))
		.row("Comment", 2, json!({"post_id": 2, "body": ""}))
		.row("Vote", 1, json!({"votable_id": 1, "votable_type": "Post"}))
		.row("Vote", 2, json!({"votable_id": 1, "votable_type": "User"}))
}
