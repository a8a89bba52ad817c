//! Path-expression construction.
//!
//! Every selector the entity layer sends to a document is built here.
//! Caller-supplied values only ever appear inside string literals produced
//! by [`literal`]; names are validated before they are spliced in.

use std::fmt;

use entidoc_session::xml::escape::is_valid_name;

use crate::config::Config;
use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::schema::KeyRef;

/// Quotes `value` as a path-expression string literal.
///
/// Values containing only one kind of quote are wrapped in the other kind.
/// Values containing both are split into a `concat(..)` of literals.
#[must_use]
pub fn literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }

    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Validates an element or attribute name.
///
/// # Errors
///
/// Returns `CoreError::InvalidName` if `name` is not a valid XML name.
pub fn check_name(name: &str) -> CoreResult<&str> {
    if is_valid_name(name) {
        Ok(name)
    } else {
        Err(CoreError::invalid_name(name))
    }
}

/// A validated, possibly nested field path such as `info/email`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parses a `/`-separated field path.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidName` if any segment is empty or not a
    /// valid element name.
    pub fn parse(path: &str) -> CoreResult<Self> {
        let segments = path
            .split('/')
            .map(|segment| check_name(segment).map(str::to_string))
            .collect::<CoreResult<Vec<_>>>()
            .map_err(|_| CoreError::invalid_name(path))?;
        Ok(Self(segments))
    }

    /// Returns the path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the last segment.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Returns the path without its last segment, if any remains.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() > 1 {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Builds selectors for entities and fields in one document.
///
/// Documents have the shape `/<root>/<entitiesRoot>/<entity id="N">`; the
/// entities root is addressed positionally as the first child of the
/// wrapper, so the builder does not need to know its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBuilder {
    root_element: String,
    id_attribute: String,
}

impl PathBuilder {
    /// Creates a builder for the given wrapper element and id attribute.
    #[must_use]
    pub fn new(root_element: impl Into<String>, id_attribute: impl Into<String>) -> Self {
        Self {
            root_element: root_element.into(),
            id_attribute: id_attribute.into(),
        }
    }

    /// Creates a builder from a catalog configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.root_element, &config.id_attribute)
    }

    /// Returns the id attribute name.
    #[must_use]
    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    /// Selects the entities root: `/DMS/*[1]`.
    #[must_use]
    pub fn entities_root(&self) -> String {
        format!("/{}/*[1]", self.root_element)
    }

    /// Selects every entity, optionally restricted to one tag.
    #[must_use]
    pub fn all_entities(&self, tag: Option<&str>) -> String {
        format!("{}/{}", self.entities_root(), tag.unwrap_or("*"))
    }

    /// Selects the id attribute of every entity.
    #[must_use]
    pub fn all_ids(&self) -> String {
        format!("{}/@{}", self.all_entities(None), self.id_attribute)
    }

    /// Selects one entity by id: `/DMS/*[1]/*[@id='7']`.
    #[must_use]
    pub fn entity_by_id(&self, id: EntityId) -> String {
        format!(
            "{}[@{}='{}']",
            self.all_entities(None),
            self.id_attribute,
            id
        )
    }

    /// Selects entities whose attribute equals `value`.
    #[must_use]
    pub fn entity_by_attribute(&self, tag: Option<&str>, attribute: &str, value: &str) -> String {
        format!(
            "{}[@{}={}]",
            self.all_entities(tag),
            attribute,
            literal(value)
        )
    }

    /// Selects entities of `tag` whose field text equals `value`.
    #[must_use]
    pub fn entity_by_predicate(&self, tag: Option<&str>, field: &FieldPath, value: &str) -> String {
        format!("{}[{}={}]", self.all_entities(tag), field, literal(value))
    }

    /// Selects entities matching every key part.
    #[must_use]
    pub fn entity_matching(&self, tag: Option<&str>, keys: &[(KeyRef, String)]) -> String {
        if keys.is_empty() {
            return self.all_entities(tag);
        }
        let conditions: Vec<String> = keys
            .iter()
            .map(|(key, value)| format!("{}={}", key.selector(), literal(value)))
            .collect();
        format!("{}[{}]", self.all_entities(tag), conditions.join(" and "))
    }

    /// Selects a field below an entity selector.
    #[must_use]
    pub fn field_of(&self, entity: &str, field: &FieldPath) -> String {
        format!("{entity}/{field}")
    }

    /// Selects an attribute of the nodes matched by `target`.
    #[must_use]
    pub fn attribute_of(&self, target: &str, attribute: &str) -> String {
        format!("{target}/@{attribute}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> PathBuilder {
        PathBuilder::from_config(&Config::default())
    }

    #[test]
    fn entity_selectors() {
        let p = paths();
        assert_eq!(p.entities_root(), "/DMS/*[1]");
        assert_eq!(p.entity_by_id(EntityId::new(7)), "/DMS/*[1]/*[@id='7']");
        assert_eq!(p.all_ids(), "/DMS/*[1]/*/@id");
        assert_eq!(
            p.entity_by_attribute(Some("user"), "username", "alice"),
            "/DMS/*[1]/user[@username='alice']"
        );
    }

    #[test]
    fn field_selectors() {
        let p = paths();
        let email = FieldPath::parse("info/email").unwrap();
        let entity = p.entity_by_id(EntityId::new(1));
        assert_eq!(p.field_of(&entity, &email), "/DMS/*[1]/*[@id='1']/info/email");
        assert_eq!(
            p.entity_by_predicate(Some("user"), &email, "a@x.com"),
            "/DMS/*[1]/user[info/email='a@x.com']"
        );
        assert_eq!(
            p.attribute_of(&entity, "active"),
            "/DMS/*[1]/*[@id='1']/@active"
        );
    }

    #[test]
    fn composite_keys() {
        let p = paths();
        let keys = vec![
            (KeyRef::field("file"), "a.xml".to_string()),
            (KeyRef::field("collection"), "c1".to_string()),
        ];
        assert_eq!(
            p.entity_matching(Some("admin"), &keys),
            "/DMS/*[1]/admin[file='a.xml' and collection='c1']"
        );
    }

    #[test]
    fn literals_quote_safely() {
        assert_eq!(literal("plain"), "'plain'");
        assert_eq!(literal("it's"), "\"it's\"");
        assert_eq!(literal("say \"hi\""), "'say \"hi\"'");
        assert_eq!(
            literal("it's \"x\""),
            "concat('it', \"'\", 's \"x\"')"
        );
        assert_eq!(literal("'"), "concat('', \"'\", '')");
    }

    #[test]
    fn field_paths() {
        let path = FieldPath::parse("info/email").unwrap();
        assert_eq!(path.segments(), ["info", "email"]);
        assert_eq!(path.leaf(), "email");
        assert_eq!(path.parent().unwrap().to_string(), "info");
        assert!(FieldPath::parse("email").unwrap().parent().is_none());

        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("info/").is_err());
        assert!(FieldPath::parse("a b").is_err());
        assert!(FieldPath::parse("x']|//*[").is_err());
        assert!(FieldPath::parse("a:b").is_err());
        assert!(check_name("xu:name").is_err());
    }
}
