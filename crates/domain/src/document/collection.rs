//! Collection and folder snapshot types.

use serde::{Deserialize, Serialize};

/// Top-level API collection metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Unique identifier.
    pub id: String,

    /// Human-readable collection name.
    pub name: String,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// API version advertised in generated documents.
    #[serde(default = "default_version")]
    pub version: String,

    /// Base URL of the documented API, may contain placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Schema version of the stored collection.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_schema_version() -> String {
    "1".to_string()
}

impl Collection {
    /// Creates a collection with default version metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            version: default_version(),
            base_url: None,
            schema_version: default_schema_version(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the API version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// A folder grouping endpoints inside a collection.
///
/// Folders form a forest through `parent_id`; a folder without a parent
/// sits at the collection root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Unique identifier.
    pub id: String,

    /// Owning collection.
    pub collection_id: String,

    /// Parent folder, `None` for root folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Folder name.
    pub name: String,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Position among siblings.
    #[serde(default)]
    pub sort_order: i32,
}

impl Folder {
    /// Creates a root folder.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        collection_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            collection_id: collection_id.into(),
            parent_id: None,
            name: name.into(),
            description: None,
            sort_order: 0,
        }
    }

    /// Nests this folder under `parent_id`.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the sibling position.
    #[must_use]
    pub const fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collection_defaults_when_deserializing() {
        let json = r#"{"id": "c1", "name": "Pets"}"#;
        let collection: Collection = serde_json::from_str(json).unwrap();

        assert_eq!(collection.version, "1.0.0");
        assert_eq!(collection.schema_version, "1");
        assert!(collection.base_url.is_none());
    }

    #[test]
    fn test_folder_builder() {
        let folder = Folder::new("f2", "c1", "Admin")
            .with_parent("f1")
            .with_sort_order(3);

        assert_eq!(folder.parent_id.as_deref(), Some("f1"));
        assert_eq!(folder.sort_order, 3);
    }
}
