//! Entity kinds as configuration values.

use crate::entity::NewEntity;

/// One part of an entity's unique key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRef {
    /// A child field, by path.
    Field(String),
    /// An attribute of the entity element.
    Attribute(String),
}

impl KeyRef {
    /// Creates a field key part.
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }

    /// Creates an attribute key part.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }

    /// Returns the relative selector of this key part (`name` or `@name`).
    #[must_use]
    pub fn selector(&self) -> String {
        match self {
            Self::Field(path) => path.clone(),
            Self::Attribute(name) => format!("@{name}"),
        }
    }

    /// Reads this key part from a new entity.
    #[must_use]
    pub fn value_in<'a>(&self, entity: &'a NewEntity) -> Option<&'a str> {
        match self {
            Self::Field(path) => entity.field_value(path).map(|v| v.as_str()),
            Self::Attribute(name) => entity.attribute_value(name),
        }
    }
}

/// Describes one kind of entity and the document that holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    /// Document name, e.g. `DMSUsers.xml`.
    pub document: String,
    /// Name of the entities-root element, e.g. `users`.
    pub entities_root: String,
    /// Element name of each entity, e.g. `user`.
    pub tag: String,
    /// Key parts that must be unique across entities; empty for none.
    pub unique_key: Vec<KeyRef>,
    /// Attributes and fields every new entity starts with.
    pub template: NewEntity,
}

impl EntitySchema {
    /// Creates a schema with no key and an empty template.
    pub fn new(
        document: impl Into<String>,
        entities_root: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        let tag = tag.into();
        Self {
            document: document.into(),
            entities_root: entities_root.into(),
            template: NewEntity::new(tag.clone()),
            tag,
            unique_key: Vec::new(),
        }
    }

    /// Adds a unique key part.
    #[must_use]
    pub fn with_key(mut self, key: KeyRef) -> Self {
        self.unique_key.push(key);
        self
    }

    /// Adds a template attribute.
    #[must_use]
    pub fn with_default_attribute(mut self, name: &str, value: &str) -> Self {
        self.template = self.template.attribute(name, value);
        self
    }

    /// Adds empty template fields.
    #[must_use]
    pub fn with_default_fields(mut self, paths: &[&str]) -> Self {
        for path in paths {
            self.template = self.template.field(*path, "");
        }
        self
    }

    /// Returns the markup of an empty document for this schema.
    #[must_use]
    pub fn bootstrap_markup(&self, root_element: &str) -> String {
        format!("<{root_element}><{}/></{root_element}>", self.entities_root)
    }

    /// Extracts the unique-key values of `entity`, or `None` if the schema
    /// has no key or the entity lacks one of the parts.
    #[must_use]
    pub fn key_values(&self, entity: &NewEntity) -> Option<Vec<(KeyRef, String)>> {
        if self.unique_key.is_empty() {
            return None;
        }
        self.unique_key
            .iter()
            .map(|key| key.value_in(entity).map(|v| (key.clone(), v.to_string())))
            .collect()
    }

    /// User accounts, unique by `@username`.
    #[must_use]
    pub fn users() -> Self {
        Self::new("DMSUsers.xml", "users", "user")
            .with_key(KeyRef::attribute("username"))
            .with_default_attribute("active", "yes")
            .with_default_fields(&[
                "info/firstname",
                "info/lastname",
                "info/address",
                "info/email",
                "info/tel",
                "info/mobile",
                "info/role",
                "info/comment",
                "info/accepted",
                "groups",
                "actions",
            ])
    }

    /// Organisations, unique by `@groupname`.
    #[must_use]
    pub fn groups() -> Self {
        Self::new("DMSGroups.xml", "groups", "group")
            .with_key(KeyRef::attribute("groupname"))
            .with_default_fields(&["info/name", "info/seat", "info/country", "info/information"])
    }

    /// Tag definitions, unique by their `xpath` field.
    #[must_use]
    pub fn tags() -> Self {
        Self::new("DMSTags.xml", "tags", "tag")
            .with_key(KeyRef::field("xpath"))
            .with_default_fields(&["xpath", "tagName", "displayName", "order"])
    }

    /// Saved queries; not keyed.
    #[must_use]
    pub fn queries() -> Self {
        Self::new("DMSXQueries.xml", "queries", "query").with_default_fields(&[
            "info/name",
            "info/category",
            "info/source",
            "info/external_source",
            "info/operator",
            "targets",
            "inputs",
            "outputs",
            "orderBy",
        ])
    }

    /// Collections, unique by `name`.
    #[must_use]
    pub fn collections() -> Self {
        Self::new("DMSCollections.xml", "collections", "collection")
            .with_key(KeyRef::field("name"))
            .with_default_fields(&["name"])
    }

    /// Administrators of a file in a collection, unique by both.
    #[must_use]
    pub fn admins() -> Self {
        Self::new("DMSAdmins.xml", "admins", "admin")
            .with_key(KeyRef::field("file"))
            .with_key(KeyRef::field("collection"))
            .with_default_fields(&["file", "collection"])
    }

    /// Returns every preset.
    #[must_use]
    pub fn standard() -> Vec<Self> {
        vec![
            Self::users(),
            Self::groups(),
            Self::tags(),
            Self::queries(),
            Self::collections(),
            Self::admins(),
        ]
    }

    /// Looks up a preset by its entities-root name (`users`, `groups`, ...).
    #[must_use]
    pub fn preset(kind: &str) -> Option<Self> {
        Self::standard().into_iter().find(|s| s.entities_root == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_cover_the_standard_documents() {
        let docs: Vec<String> = EntitySchema::standard()
            .into_iter()
            .map(|s| s.document)
            .collect();
        assert_eq!(
            docs,
            vec![
                "DMSUsers.xml",
                "DMSGroups.xml",
                "DMSTags.xml",
                "DMSXQueries.xml",
                "DMSCollections.xml",
                "DMSAdmins.xml"
            ]
        );
        assert_eq!(EntitySchema::preset("tags").unwrap().tag, "tag");
        assert!(EntitySchema::preset("nope").is_none());
    }

    #[test]
    fn bootstrap_markup() {
        assert_eq!(
            EntitySchema::users().bootstrap_markup("DMS"),
            "<DMS><users/></DMS>"
        );
    }

    #[test]
    fn key_values() {
        let admins = EntitySchema::admins();
        let entity = NewEntity::new("admin")
            .field("file", "a.xml")
            .field("collection", "c1");
        assert_eq!(
            admins.key_values(&entity).unwrap(),
            vec![
                (KeyRef::field("file"), "a.xml".to_string()),
                (KeyRef::field("collection"), "c1".to_string()),
            ]
        );

        let partial = NewEntity::new("admin").field("file", "a.xml");
        assert!(admins.key_values(&partial).is_none());
        assert!(EntitySchema::queries().key_values(&entity).is_none());
    }

    #[test]
    fn user_template() {
        let users = EntitySchema::users();
        assert_eq!(users.template.attribute_value("active"), Some("yes"));
        assert!(users.template.field_value("info/email").is_some());
        assert_eq!(users.unique_key, vec![KeyRef::attribute("username")]);
    }
}
