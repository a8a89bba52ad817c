//! Entity creation payloads.

use entidoc_session::xml::escape::{escape_attribute, escape_text};

use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::path::{check_name, FieldPath};

/// The value of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Text content; escaped when embedded.
    Text(String),
    /// Child markup embedded verbatim.
    Markup(String),
}

impl FieldValue {
    /// Returns the raw value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Markup(s) => s,
        }
    }

    pub(crate) fn render(&self) -> String {
        match self {
            Self::Text(s) => escape_text(s).into_owned(),
            Self::Markup(s) => s.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An entity to be created.
///
/// Fields are addressed by path, so `info/email` produces
/// `<info><email>..</email></info>`. Later values for the same path or
/// attribute replace earlier ones.
///
/// ```rust
/// use entidoc_core::NewEntity;
///
/// let user = NewEntity::new("user")
///     .attribute("username", "alice")
///     .field("info/email", "a@x.com");
/// assert_eq!(user.tag(), "user");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntity {
    tag: String,
    attributes: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
}

impl NewEntity {
    /// Starts an entity with the given element name.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Sets a text field.
    #[must_use]
    pub fn field(self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.value(path, FieldValue::Text(value.into()))
    }

    /// Sets a markup field.
    #[must_use]
    pub fn markup(self, path: impl Into<String>, markup: impl Into<String>) -> Self {
        self.value(path, FieldValue::Markup(markup.into()))
    }

    /// Sets a field to an arbitrary value.
    #[must_use]
    pub fn value(mut self, path: impl Into<String>, value: FieldValue) -> Self {
        let path = path.into();
        match self.fields.iter_mut().find(|(p, _)| *p == path) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((path, value)),
        }
        self
    }

    /// Returns the element name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the attributes in insertion order.
    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Returns the fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Returns the value of an attribute.
    #[must_use]
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn field_value(&self, path: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(p, _)| p == path).map(|(_, v)| v)
    }

    /// Layers `self` over `defaults`: values present in both come from
    /// `self`, keeping the position they have in `defaults`.
    #[must_use]
    pub fn over(self, defaults: &Self) -> Self {
        let mut merged = defaults.clone();
        merged.tag = self.tag;
        for (name, value) in self.attributes {
            merged = merged.attribute(name, value);
        }
        for (path, value) in self.fields {
            merged = merged.value(path, value);
        }
        merged
    }

    /// Renders the entity element with the given id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for an invalid tag, attribute or field name, if
    /// an attribute named like the id attribute is supplied, or if a field
    /// path is given both a value and nested fields.
    pub fn render(&self, id_attribute: &str, id: EntityId) -> CoreResult<String> {
        check_name(&self.tag)?;

        let mut out = format!("<{} {}=\"{}\"", self.tag, id_attribute, id);
        for (name, value) in &self.attributes {
            if name == id_attribute {
                return Err(CoreError::invalid_name(name.as_str()));
            }
            check_name(name)?;
            out.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
        }

        let mut tree = Vec::new();
        for (raw, value) in &self.fields {
            let path = FieldPath::parse(raw)?;
            insert(&mut tree, path.segments(), value.clone(), raw)?;
        }

        if tree.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            render_slots(&tree, &mut out);
            out.push_str(&format!("</{}>", self.tag));
        }
        Ok(out)
    }
}

enum Slot {
    Value(FieldValue),
    Group(Vec<(String, Slot)>),
}

fn insert(
    slots: &mut Vec<(String, Slot)>,
    segments: &[String],
    value: FieldValue,
    path: &str,
) -> CoreResult<()> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(());
    };
    let Some(index) = slots.iter().position(|(name, _)| name == head) else {
        if rest.is_empty() {
            slots.push((head.clone(), Slot::Value(value)));
        } else {
            let mut children = Vec::new();
            insert(&mut children, rest, value, path)?;
            slots.push((head.clone(), Slot::Group(children)));
        }
        return Ok(());
    };

    // A path cannot be both a value and a group of nested fields.
    match (&mut slots[index].1, rest.is_empty()) {
        (Slot::Group(children), false) => insert(children, rest, value, path),
        (Slot::Value(existing), true) => {
            *existing = value;
            Ok(())
        }
        _ => Err(CoreError::invalid_name(path)),
    }
}

fn render_slots(slots: &[(String, Slot)], out: &mut String) {
    for (name, slot) in slots {
        let inner = match slot {
            Slot::Value(value) => value.render(),
            Slot::Group(children) => {
                let mut inner = String::new();
                render_slots(children, &mut inner);
                inner
            }
        };
        if inner.is_empty() {
            out.push_str(&format!("<{name}/>"));
        } else {
            out.push_str(&format!("<{name}>{inner}</{name}>"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_flat_fields() {
        let e = NewEntity::new("user").field("username", "alice");
        assert_eq!(
            e.render("id", EntityId::new(1)).unwrap(),
            "<user id=\"1\"><username>alice</username></user>"
        );
    }

    #[test]
    fn renders_nested_fields_grouped() {
        let e = NewEntity::new("user")
            .field("info/firstname", "Alice")
            .field("groups", "")
            .field("info/email", "a@x.com");
        assert_eq!(
            e.render("id", EntityId::new(2)).unwrap(),
            "<user id=\"2\"><info><firstname>Alice</firstname><email>a@x.com</email></info><groups/></user>"
        );
    }

    #[test]
    fn escapes_values() {
        let e = NewEntity::new("tag")
            .attribute("label", "a \"b\" <c>")
            .field("xpath", "//a[b<'c' & d]");
        assert_eq!(
            e.render("id", EntityId::new(3)).unwrap(),
            "<tag id=\"3\" label=\"a &quot;b&quot; &lt;c&gt;\"><xpath>//a[b&lt;'c' &amp; d]</xpath></tag>"
        );
    }

    #[test]
    fn markup_is_verbatim() {
        let e = NewEntity::new("query").markup("targets", "<path>/a</path>");
        assert_eq!(
            e.render("id", EntityId::new(1)).unwrap(),
            "<query id=\"1\"><targets><path>/a</path></targets></query>"
        );
    }

    #[test]
    fn empty_entity_self_closes() {
        assert_eq!(
            NewEntity::new("c").render("id", EntityId::new(9)).unwrap(),
            "<c id=\"9\"/>"
        );
    }

    #[test]
    fn overrides_keep_template_order() {
        let template = NewEntity::new("")
            .attribute("active", "yes")
            .field("info/email", "")
            .field("groups", "");
        let e = NewEntity::new("user")
            .attribute("username", "alice")
            .field("info/email", "a@x.com")
            .over(&template);
        assert_eq!(
            e.render("id", EntityId::new(1)).unwrap(),
            "<user id=\"1\" active=\"yes\" username=\"alice\"><info><email>a@x.com</email></info><groups/></user>"
        );
    }

    #[test]
    fn value_and_group_on_one_path_conflict() {
        let value_first = NewEntity::new("user")
            .field("info", "x")
            .field("info/email", "y");
        assert!(matches!(
            value_first.render("id", EntityId::new(1)),
            Err(CoreError::InvalidName { name }) if name == "info/email"
        ));

        let group_first = NewEntity::new("user")
            .field("info/email", "y")
            .field("info", "x");
        assert!(matches!(
            group_first.render("id", EntityId::new(1)),
            Err(CoreError::InvalidName { name }) if name == "info"
        ));
    }

    #[test]
    fn rejects_bad_names() {
        assert!(NewEntity::new("a b").render("id", EntityId::new(1)).is_err());
        assert!(NewEntity::new("u")
            .attribute("id", "7")
            .render("id", EntityId::new(1))
            .is_err());
        assert!(NewEntity::new("u")
            .field("info//x", "v")
            .render("id", EntityId::new(1))
            .is_err());
    }
}
