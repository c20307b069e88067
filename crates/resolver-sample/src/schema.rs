//! # Blog Schema
//!
//! The schema table of the blog domain. Between them, the `Article` fields use every kind of
//! reference the resolver supports:
//!
//! | Field | Kind |
//! |-------|------|
//! | `author` | single, concrete |
//! | `owner` | single, union of person and organization |
//! | `reviewer` | single, editors only |
//! | `comments` | array, limited per viewer, hidden comments for editors only |
//! | `tags` | array, wire name `field_tags` |
//! | `location` | single, embedded in the article (never fetched) |

use crate::model::Viewer;
use entity_resolver::{FieldSpec, NameCasing, SchemaTable, TypeSchema};
use serde_json::Value;

pub const ARTICLE: &str = "Article";

fn comment_visible(viewer: &Viewer, meta: &Value, index: Option<usize>) -> bool {
    let within_limit = index.map_or(true, |i| i < viewer.comment_limit);
    let hidden = meta.get("hidden").and_then(Value::as_bool).unwrap_or(false);
    within_limit && (!hidden || viewer.is_editor())
}

pub fn blog_schema() -> SchemaTable<Viewer> {
    SchemaTable::new()
        .register(
            ARTICLE,
            TypeSchema::new()
                .reference(FieldSpec::single("author", "Person"))
                .reference(FieldSpec::single_union(
                    "owner",
                    [("person--user", "Person"), ("person--org", "Organization")],
                ))
                .reference(
                    FieldSpec::single("reviewer", "Person")
                        .when(|viewer: &Viewer, _meta: &Value, _index| viewer.is_editor()),
                )
                .reference(FieldSpec::array("comments", "Comment").when(comment_visible))
                .reference(FieldSpec::array("tags", "Tag").wire_name("field_tags"))
                .reference(FieldSpec::single("location", "Address").parent_entity_holder())
                .expose_all(
                    [
                        "title",
                        "body",
                        "publishedAt",
                        "author",
                        "owner",
                        "reviewer",
                        "comments",
                        "location",
                    ],
                    NameCasing::Snake,
                )
                .expose_as("tags", "field_tags"),
        )
        .register(
            "Person",
            TypeSchema::new().expose_all(["type", "name", "email"], NameCasing::AsIs),
        )
        .register(
            "Organization",
            TypeSchema::new()
                .reference(FieldSpec::array("members", "Person"))
                .expose_all(["type", "name", "members"], NameCasing::AsIs),
        )
        .register(
            "Comment",
            TypeSchema::new()
                .reference(FieldSpec::single("author", "Person"))
                .expose_all(["text", "author"], NameCasing::AsIs),
        )
        .register("Tag", TypeSchema::new().expose_all(["label"], NameCasing::AsIs))
        .register(
            "Address",
            TypeSchema::new()
                .reference(FieldSpec::single("country", "Country"))
                .expose_all(["street", "city", "country"], NameCasing::AsIs),
        )
        .register(
            "Country",
            TypeSchema::new().expose_all(["name", "code"], NameCasing::AsIs),
        )
}
