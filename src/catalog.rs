//! Collection catalog for the Atrium site
//!
//! Every content type the marketing site serves is one entry here. The
//! admin panel's per-type editors all speak the same CRUD + reorder
//! protocol, so the per-type differences reduce to three things: the
//! collection name, the name of the integer column that carries display
//! order (the legacy schemas are inconsistent - `order`, `order_index`,
//! and `sort_order` all appear - and renaming columns in the hosted store
//! is not an option), and which fields a create must carry.

/// Descriptor for one content collection
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    /// Collection name: URL segment under /api/ and store collection name
    pub name: &'static str,
    /// Name of the integer column that defines display sequence
    pub order_field: &'static str,
    /// Fields that must be present and non-empty on create
    pub required_fields: &'static [&'static str],
    /// Field holding hashtags, normalized to an array of strings at the boundary
    pub tag_field: Option<&'static str>,
}

/// All collections served by the API, one per admin editor
pub const COLLECTIONS: &[CollectionSpec] = &[
    CollectionSpec {
        name: "hero",
        order_field: "order",
        required_fields: &["title"],
        tag_field: None,
    },
    CollectionSpec {
        name: "about",
        order_field: "order",
        required_fields: &["title"],
        tag_field: None,
    },
    CollectionSpec {
        name: "projects",
        order_field: "order",
        required_fields: &["title"],
        tag_field: None,
    },
    CollectionSpec {
        name: "team_members",
        order_field: "sort_order",
        required_fields: &["name"],
        tag_field: None,
    },
    CollectionSpec {
        name: "blog_posts",
        order_field: "order_index",
        required_fields: &["title"],
        tag_field: Some("hashtags"),
    },
    CollectionSpec {
        name: "features",
        order_field: "order",
        required_fields: &["title"],
        tag_field: None,
    },
    CollectionSpec {
        name: "values",
        order_field: "order",
        required_fields: &["title"],
        tag_field: None,
    },
    CollectionSpec {
        name: "quotes",
        order_field: "sort_order",
        required_fields: &["text"],
        tag_field: None,
    },
    CollectionSpec {
        name: "contact_info",
        order_field: "order",
        required_fields: &["label"],
        tag_field: None,
    },
];

/// Look up a collection by name
pub fn find(name: &str) -> Option<&'static CollectionSpec> {
    COLLECTIONS.iter().find(|spec| spec.name == name)
}
