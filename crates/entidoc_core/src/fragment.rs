//! Update-fragment construction.
//!
//! Each constructor returns a complete `xupdate:modifications` document.
//! Builders never talk to a document; a malformed selector or markup
//! payload only surfaces when the fragment is executed.

use std::fmt;

use entidoc_session::xml::escape::{escape_attribute, escape_text};
use entidoc_session::XUPDATE_NAMESPACE;

/// Where copied or moved content lands relative to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// As the preceding sibling of the destination.
    Before,
    /// As the following sibling of the destination.
    After,
    /// As the last child of the destination.
    Inside,
}

impl Placement {
    fn operation(self) -> &'static str {
        match self {
            Self::Before => "insert-before",
            Self::After => "insert-after",
            Self::Inside => "append",
        }
    }
}

/// The new content of an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Plain text; escaped before embedding.
    Text(String),
    /// Markup embedded verbatim.
    Markup(String),
}

impl Payload {
    /// Creates a text payload.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a markup payload.
    pub fn markup(value: impl Into<String>) -> Self {
        Self::Markup(value.into())
    }

    fn raw(&self) -> &str {
        match self {
            Self::Text(s) | Self::Markup(s) => s,
        }
    }

    /// Returns true if the payload is blank once trimmed.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.raw().trim().is_empty()
    }

    fn render(&self) -> String {
        match self {
            Self::Text(s) => escape_text(s).into_owned(),
            Self::Markup(s) => s.clone(),
        }
    }
}

/// A complete update-fragment document.
///
/// The selector the fragment targets is kept alongside the text so a
/// rejected fragment can be reported against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFragment {
    selector: String,
    text: String,
}

impl UpdateFragment {
    fn wrap(selector: &str, operations: &str) -> Self {
        Self {
            selector: selector.to_string(),
            text: format!(
                "<?xml version=\"1.0\"?>\
                 <xupdate:modifications version=\"1.0\" xmlns:xupdate=\"{XUPDATE_NAMESPACE}\">\
                 {operations}\
                 </xupdate:modifications>"
            ),
        }
    }

    fn operation(kind: &str, selector: &str, body: &str) -> String {
        let selector = escape_attribute(selector);
        if body.is_empty() {
            format!("<xupdate:{kind} select=\"{selector}\"/>")
        } else {
            format!("<xupdate:{kind} select=\"{selector}\">{body}</xupdate:{kind}>")
        }
    }

    /// Appends `markup` as the last content of every node matched by `selector`.
    #[must_use]
    pub fn append(selector: &str, markup: &str) -> Self {
        Self::wrap(selector, &Self::operation("append", selector, markup))
    }

    /// Inserts `markup` before every node matched by `selector`.
    #[must_use]
    pub fn insert_before(selector: &str, markup: &str) -> Self {
        Self::wrap(selector, &Self::operation("insert-before", selector, markup))
    }

    /// Inserts `markup` after every node matched by `selector`.
    #[must_use]
    pub fn insert_after(selector: &str, markup: &str) -> Self {
        Self::wrap(selector, &Self::operation("insert-after", selector, markup))
    }

    /// Removes every node matched by `selector`.
    #[must_use]
    pub fn remove(selector: &str) -> Self {
        Self::wrap(selector, &Self::operation("remove", selector, ""))
    }

    /// Renames every element or attribute matched by `selector`.
    #[must_use]
    pub fn rename(selector: &str, new_name: &str) -> Self {
        Self::wrap(selector, &Self::operation("rename", selector, &escape_text(new_name)))
    }

    /// Sets attribute `name` on every element matched by `selector`.
    #[must_use]
    pub fn add_attribute(selector: &str, name: &str, value: &str) -> Self {
        let body = format!(
            "<xupdate:attribute name=\"{}\">{}</xupdate:attribute>",
            escape_attribute(name),
            escape_text(value)
        );
        Self::wrap(selector, &Self::operation("append", selector, &body))
    }

    /// Copies the nodes matched by `source` relative to `destination`.
    #[must_use]
    pub fn copy(source: &str, destination: &str, placement: Placement) -> Self {
        Self::transfer(source, destination, placement, false)
    }

    /// Moves the nodes matched by `source` relative to `destination`.
    #[must_use]
    pub fn move_to(source: &str, destination: &str, placement: Placement) -> Self {
        Self::transfer(source, destination, placement, true)
    }

    /// Captures the source into `$copy`, optionally removes it, then inserts
    /// the captured nodes at the destination.
    fn transfer(source: &str, destination: &str, placement: Placement, remove: bool) -> Self {
        let mut ops = format!(
            "<xupdate:variable name=\"copy\" select=\"{}\"/>",
            escape_attribute(source)
        );
        if remove {
            ops.push_str(&Self::operation("remove", "$copy", ""));
        }
        ops.push_str(&Self::operation(
            placement.operation(),
            destination,
            "<xupdate:value-of select=\"$copy\"/>",
        ));
        Self::wrap(destination, &ops)
    }

    /// Replaces the content of the nodes matched by `selector`.
    ///
    /// A payload that trims to empty is rewritten: for an attribute
    /// selector (`.../@name`) the attribute is re-added on the parent with
    /// an empty value; for an element selector all child elements are
    /// removed and then all direct text, leaving the element present and
    /// content-free.
    #[must_use]
    pub fn update(selector: &str, payload: &Payload) -> Self {
        if !payload.is_blank() {
            return Self::wrap(selector, &Self::operation("update", selector, &payload.render()));
        }

        match split_attribute(selector) {
            Some((parent, name)) => Self::add_attribute(parent, name, ""),
            None => {
                let mut ops = Self::operation("remove", &format!("{selector}/*"), "");
                ops.push_str(&Self::operation(
                    "remove",
                    &format!("{selector}/text()"),
                    "",
                ));
                Self::wrap(selector, &ops)
            }
        }
    }

    /// Returns the selector the fragment targets.
    ///
    /// For copies and moves this is the destination.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Returns the fragment text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the fragment, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for UpdateFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for UpdateFragment {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Splits `parent/@name` into its parent selector and attribute name.
///
/// Only a final `/@name` step with no further `/` counts.
fn split_attribute(selector: &str) -> Option<(&str, &str)> {
    let (parent, last) = selector.rsplit_once('/')?;
    let name = last.strip_prefix('@')?;
    if name.is_empty() || parent.is_empty() {
        None
    } else {
        Some((parent, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(fragment: &UpdateFragment) -> &str {
        let s = fragment.as_str();
        let start = s.find("xupdate\">").map(|i| i + "xupdate\">".len()).unwrap();
        let end = s.rfind("</xupdate:modifications>").unwrap();
        &s[start..end]
    }

    #[test]
    fn envelope() {
        let f = UpdateFragment::remove("/DMS/*[1]/*[@id='1']");
        assert!(f.as_str().starts_with("<?xml version=\"1.0\"?><xupdate:modifications version=\"1.0\""));
        assert!(f.as_str().contains(XUPDATE_NAMESPACE));
        assert_eq!(
            body(&f),
            "<xupdate:remove select=\"/DMS/*[1]/*[@id='1']\"/>"
        );
    }

    #[test]
    fn fragments_remember_their_target() {
        assert_eq!(UpdateFragment::remove("/a/b").selector(), "/a/b");
        assert_eq!(
            UpdateFragment::move_to("/a/b", "/c", Placement::Inside).selector(),
            "/c"
        );
        assert_eq!(
            UpdateFragment::update("/e/@x", &Payload::text("")).selector(),
            "/e"
        );
    }

    #[test]
    fn append_and_inserts() {
        assert_eq!(
            body(&UpdateFragment::append("/DMS/*[1]", "<user id=\"1\"/>")),
            "<xupdate:append select=\"/DMS/*[1]\"><user id=\"1\"/></xupdate:append>"
        );
        assert_eq!(
            body(&UpdateFragment::insert_before("/a", "<b/>")),
            "<xupdate:insert-before select=\"/a\"><b/></xupdate:insert-before>"
        );
        assert_eq!(
            body(&UpdateFragment::insert_after("/a", "<b/>")),
            "<xupdate:insert-after select=\"/a\"><b/></xupdate:insert-after>"
        );
    }

    #[test]
    fn selectors_are_attribute_escaped() {
        let f = UpdateFragment::remove("/DMS/*[1]/user[name='say \"hi\" & <bye>']");
        assert_eq!(
            body(&f),
            "<xupdate:remove select=\"/DMS/*[1]/user[name='say &quot;hi&quot; &amp; &lt;bye&gt;']\"/>"
        );
    }

    #[test]
    fn text_updates_are_escaped() {
        let f = UpdateFragment::update("/e/f", &Payload::text("a < b & c"));
        assert_eq!(
            body(&f),
            "<xupdate:update select=\"/e/f\">a &lt; b &amp; c</xupdate:update>"
        );
        let f = UpdateFragment::update("/e/f", &Payload::markup("<g>1</g>"));
        assert_eq!(
            body(&f),
            "<xupdate:update select=\"/e/f\"><g>1</g></xupdate:update>"
        );
    }

    #[test]
    fn empty_update_on_element_removes_children_then_text() {
        let f = UpdateFragment::update("/e/f", &Payload::text("   "));
        assert_eq!(
            body(&f),
            "<xupdate:remove select=\"/e/f/*\"/><xupdate:remove select=\"/e/f/text()\"/>"
        );
    }

    #[test]
    fn empty_update_on_attribute_readds_on_parent() {
        let f = UpdateFragment::update("/DMS/*[1]/*[@id='1']/@active", &Payload::text(""));
        assert_eq!(
            body(&f),
            "<xupdate:append select=\"/DMS/*[1]/*[@id='1']\">\
             <xupdate:attribute name=\"active\"></xupdate:attribute></xupdate:append>"
        );
    }

    #[test]
    fn attribute_detection() {
        assert_eq!(split_attribute("/a/b/@c"), Some(("/a/b", "c")));
        assert_eq!(split_attribute("/a/*[@id='1']"), None);
        assert_eq!(split_attribute("/a/@"), None);
        assert_eq!(split_attribute("/a/*[@x='p/q']"), None);
    }

    #[test]
    fn rename() {
        assert_eq!(
            body(&UpdateFragment::rename("/e/f", "g")),
            "<xupdate:rename select=\"/e/f\">g</xupdate:rename>"
        );
    }

    #[test]
    fn copy_and_move() {
        let f = UpdateFragment::copy("/a/x", "/b", Placement::Inside);
        assert_eq!(
            body(&f),
            "<xupdate:variable name=\"copy\" select=\"/a/x\"/>\
             <xupdate:append select=\"/b\"><xupdate:value-of select=\"$copy\"/></xupdate:append>"
        );

        let f = UpdateFragment::move_to("/a/x", "/b/y", Placement::Before);
        assert_eq!(
            body(&f),
            "<xupdate:variable name=\"copy\" select=\"/a/x\"/>\
             <xupdate:remove select=\"$copy\"/>\
             <xupdate:insert-before select=\"/b/y\"><xupdate:value-of select=\"$copy\"/></xupdate:insert-before>"
        );
    }
}
