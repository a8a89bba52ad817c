//! Update-fragment execution.
//!
//! A fragment is an `xupdate:modifications` document whose children are
//! applied in order. All operations run against a working copy of the tree
//! which replaces the original only when every operation succeeded.

use roxmltree::Node;

use crate::error::{SessionError, SessionResult};
use crate::xml::escape::is_valid_name;
use crate::xml::{is_layout, Document, NodeId};
use crate::xpath::{Item, Variables, XPath};

/// Namespace of update-fragment elements.
pub const XUPDATE_NAMESPACE: &str = "http://www.xmldb.org/xupdate";

/// Applies an update fragment to `doc` and returns the number of modified
/// nodes.
///
/// # Errors
///
/// Returns `SessionError::Fragment` if the fragment is not well-formed or
/// uses an unsupported operation, and `SessionError::Query` if one of its
/// selectors is invalid. `doc` is unchanged on error.
pub fn apply(doc: &mut Document, fragment: &str) -> SessionResult<u64> {
    let (next, modified) = stage(doc, fragment)?;
    *doc = next;
    Ok(modified)
}

/// Runs an update fragment against a copy of `doc` and returns the
/// updated copy with the number of modified nodes.
///
/// `doc` itself is never touched, so the caller decides when (and whether)
/// the result replaces it.
///
/// # Errors
///
/// Same as [`apply`].
pub fn stage(doc: &Document, fragment: &str) -> SessionResult<(Document, u64)> {
    let parsed = roxmltree::Document::parse(fragment)
        .map_err(|e| SessionError::fragment(format!("fragment is not well-formed: {e}")))?;
    let envelope = parsed.root_element();
    if !is_xupdate(envelope, "modifications") {
        return Err(SessionError::fragment(format!(
            "expected xupdate:modifications, found <{}>",
            envelope.tag_name().name()
        )));
    }

    let mut work = doc.clone();
    let mut vars = Variables::new();
    let mut modified = 0;
    for op in envelope.children().filter(Node::is_element) {
        modified += execute(&mut work, &mut vars, op)?;
    }
    Ok((work, modified))
}

fn is_xupdate(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XUPDATE_NAMESPACE)
        && node.tag_name().name() == local
}

fn required<'a>(op: Node<'a, '_>, attr: &str) -> SessionResult<&'a str> {
    op.attribute(attr).ok_or_else(|| {
        SessionError::fragment(format!(
            "xupdate:{} requires a `{attr}` attribute",
            op.tag_name().name()
        ))
    })
}

fn select(work: &Document, vars: &Variables, op: Node<'_, '_>) -> SessionResult<Vec<Item>> {
    let expr = required(op, "select")?;
    let items = XPath::parse(expr)?.evaluate(work, vars)?;
    if items
        .iter()
        .any(|i| !matches!(i, Item::Node(_) | Item::Attribute(..)))
    {
        return Err(SessionError::fragment(format!(
            "select `{expr}` does not address nodes"
        )));
    }
    Ok(items)
}

fn execute(work: &mut Document, vars: &mut Variables, op: Node<'_, '_>) -> SessionResult<u64> {
    if op.tag_name().namespace() != Some(XUPDATE_NAMESPACE) {
        return Err(SessionError::fragment(format!(
            "unexpected element <{}> in modifications",
            op.tag_name().name()
        )));
    }

    let name = op.tag_name().name();
    if name == "variable" {
        let var = required(op, "name")?.to_string();
        let items = select(work, vars, op)?;
        vars.insert(var, items);
        return Ok(0);
    }

    let targets = select(work, vars, op)?;
    let mut modified = 0;
    for target in targets {
        modified += match name {
            "append" => append(work, vars, op, &target)?,
            "insert-before" | "insert-after" => {
                insert_sibling(work, vars, op, &target, name == "insert-after")?
            }
            "remove" => remove(work, &target)?,
            "rename" => rename(work, op, &target)?,
            "update" => update(work, vars, op, &target)?,
            other => {
                return Err(SessionError::fragment(format!(
                    "unsupported operation xupdate:{other}"
                )))
            }
        };
    }
    Ok(modified)
}

/// Content produced by constructors inside an operation.
enum Content {
    Node(NodeId),
    Attribute(String, String),
}

fn element_target(work: &Document, target: &Item, op: &str) -> SessionResult<NodeId> {
    match target {
        Item::Node(id) if !work.is_text(*id) => Ok(*id),
        _ => Err(SessionError::fragment(format!(
            "xupdate:{op} target must be an element"
        ))),
    }
}

fn append(
    work: &mut Document,
    vars: &Variables,
    op: Node<'_, '_>,
    target: &Item,
) -> SessionResult<u64> {
    let parent = element_target(work, target, "append")?;
    for content in build(work, vars, op)? {
        match content {
            Content::Node(id) => work.append_child(parent, id),
            Content::Attribute(name, value) => {
                if !work.set_attribute(parent, &name, value) {
                    return Err(SessionError::fragment(
                        "attributes can only be appended to elements",
                    ));
                }
            }
        }
    }
    Ok(1)
}

fn insert_sibling(
    work: &mut Document,
    vars: &Variables,
    op: Node<'_, '_>,
    target: &Item,
    after: bool,
) -> SessionResult<u64> {
    let Item::Node(anchor) = target else {
        return Err(SessionError::fragment(
            "sibling insertion target must be a node",
        ));
    };
    let mut anchor = *anchor;
    for content in build(work, vars, op)? {
        let Content::Node(id) = content else {
            return Err(SessionError::fragment(
                "attributes cannot be inserted as siblings",
            ));
        };
        let placed = if after {
            work.insert_after(anchor, id)
        } else {
            work.insert_before(anchor, id)
        };
        if !placed {
            return Err(SessionError::fragment("target has no parent"));
        }
        if after {
            anchor = id;
        }
    }
    Ok(1)
}

fn remove(work: &mut Document, target: &Item) -> SessionResult<u64> {
    let removed = match target {
        Item::Node(id) if *id == work.root() => {
            return Err(SessionError::fragment("cannot remove the document node"))
        }
        Item::Node(id) => work.detach(*id),
        Item::Attribute(owner, name) => work.remove_attribute(*owner, name),
        _ => false,
    };
    Ok(u64::from(removed))
}

fn rename(work: &mut Document, op: Node<'_, '_>, target: &Item) -> SessionResult<u64> {
    let to = text_of(op).trim().to_string();
    if !is_valid_name(&to) {
        return Err(SessionError::fragment(format!("invalid new name `{to}`")));
    }
    let renamed = match target {
        Item::Node(id) => work.rename(*id, &to),
        Item::Attribute(owner, name) => work.rename_attribute(*owner, name, &to),
        _ => false,
    };
    if !renamed {
        return Err(SessionError::fragment("rename target must be an element or attribute"));
    }
    Ok(1)
}

fn update(
    work: &mut Document,
    vars: &Variables,
    op: Node<'_, '_>,
    target: &Item,
) -> SessionResult<u64> {
    match target {
        Item::Attribute(owner, name) => {
            let value = text_content(work, vars, op)?;
            work.set_attribute(*owner, name, value);
        }
        Item::Node(id) if work.is_text(*id) => {
            let value = text_content(work, vars, op)?;
            let replacement = work.create_text(value);
            work.insert_before(*id, replacement);
            work.detach(*id);
        }
        Item::Node(id) => {
            let id = *id;
            let content = build(work, vars, op)?;
            for child in work.children(id).to_vec() {
                work.detach(child);
            }
            for item in content {
                match item {
                    Content::Node(node) => work.append_child(id, node),
                    Content::Attribute(name, value) => {
                        work.set_attribute(id, &name, value);
                    }
                }
            }
        }
        _ => return Err(SessionError::fragment("update target must be a node")),
    }
    Ok(1)
}

/// Concatenated direct text of a fragment element.
fn text_of(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

/// Text produced by an element's content, with `value-of` expanded.
fn text_content(work: &Document, vars: &Variables, node: Node<'_, '_>) -> SessionResult<String> {
    let mut out = String::new();
    for child in node.children() {
        if child.is_text() {
            out.push_str(child.text().unwrap_or_default());
        } else if is_xupdate(child, "value-of") {
            let items = select(work, vars, child)?;
            for item in &items {
                out.push_str(&item_text(work, item));
            }
        } else if child.is_element() {
            out.push_str(&text_content(work, vars, child)?);
        }
    }
    Ok(out)
}

fn item_text(work: &Document, item: &Item) -> String {
    match item {
        Item::Node(id) => work.string_value(*id),
        Item::Attribute(owner, name) => work.attribute(*owner, name).unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

/// Builds fresh, detached content for the children of `node`.
fn build(work: &mut Document, vars: &Variables, node: Node<'_, '_>) -> SessionResult<Vec<Content>> {
    let mut out = Vec::new();
    for child in node.children() {
        if child.is_text() {
            if !is_layout(child) {
                out.push(Content::Node(work.create_text(child.text().unwrap_or_default())));
            }
            continue;
        }
        if !child.is_element() {
            continue;
        }

        if child.tag_name().namespace() == Some(XUPDATE_NAMESPACE) {
            match child.tag_name().name() {
                "attribute" => {
                    let name = constructor_name(child)?;
                    let value = text_content(work, vars, child)?;
                    out.push(Content::Attribute(name, value));
                }
                "element" => {
                    let name = constructor_name(child)?;
                    let element = work.create_element(name);
                    let content = build(work, vars, child)?;
                    attach(work, element, content);
                    out.push(Content::Node(element));
                }
                "text" => {
                    let text = text_of(child);
                    out.push(Content::Node(work.create_text(text)));
                }
                "value-of" => {
                    for item in select(work, vars, child)? {
                        match item {
                            Item::Node(id) => out.push(Content::Node(work.deep_copy(id))),
                            Item::Attribute(owner, name) => {
                                let value = work.attribute(owner, &name).unwrap_or_default().to_string();
                                out.push(Content::Attribute(name, value));
                            }
                            _ => {}
                        }
                    }
                }
                other => {
                    return Err(SessionError::fragment(format!(
                        "unsupported constructor xupdate:{other}"
                    )))
                }
            }
            continue;
        }

        let element = work.create_element(child.tag_name().name());
        for attr in child.attributes() {
            work.set_attribute(element, attr.name(), attr.value());
        }
        let content = build(work, vars, child)?;
        attach(work, element, content);
        out.push(Content::Node(element));
    }
    Ok(out)
}

fn constructor_name(node: Node<'_, '_>) -> SessionResult<String> {
    let name = required(node, "name")?;
    if is_valid_name(name) {
        Ok(name.to_string())
    } else {
        Err(SessionError::fragment(format!("invalid name `{name}`")))
    }
}

fn attach(work: &mut Document, parent: NodeId, content: Vec<Content>) {
    for item in content {
        match item {
            Content::Node(id) => work.append_child(parent, id),
            Content::Attribute(name, value) => {
                work.set_attribute(parent, &name, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::query;

    fn wrap(ops: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><xupdate:modifications version=\"1.0\" \
             xmlns:xupdate=\"{XUPDATE_NAMESPACE}\">{ops}</xupdate:modifications>"
        )
    }

    fn doc() -> Document {
        Document::parse(
            "t",
            "<DMS><users><user id=\"1\"><name>alice</name><f>x</f></user></users></DMS>",
        )
        .unwrap()
    }

    fn user(doc: &Document) -> String {
        query(doc, "/DMS/users/user[@id='1']").unwrap().concat()
    }

    #[test]
    fn append_literal_markup() {
        let mut d = doc();
        let n = apply(
            &mut d,
            &wrap("<xupdate:append select=\"/DMS/*[1]\"><user id=\"2\"><name>bob</name></user></xupdate:append>"),
        )
        .unwrap();
        assert_eq!(n, 1);
        assert_eq!(query(&d, "count(/DMS/users/user)").unwrap(), vec!["2"]);
    }

    #[test]
    fn append_element_and_attribute_constructors() {
        let mut d = doc();
        apply(
            &mut d,
            &wrap(
                "<xupdate:append select=\"/DMS/users/user\">\
                   <xupdate:attribute name=\"active\">yes</xupdate:attribute>\
                   <xupdate:element name=\"email\">a@x.com</xupdate:element>\
                 </xupdate:append>",
            ),
        )
        .unwrap();
        assert_eq!(
            user(&d),
            "<user id=\"1\" active=\"yes\"><name>alice</name><f>x</f><email>a@x.com</email></user>"
        );
    }

    #[test]
    fn blank_leaf_values_survive_but_indentation_does_not() {
        let mut d = doc();
        apply(
            &mut d,
            &wrap(
                "<xupdate:append select=\"/DMS/*[1]\">\n  \
                   <user id=\"2\"><f>  </f></user>\n\
                 </xupdate:append>",
            ),
        )
        .unwrap();
        assert_eq!(
            query(&d, "/DMS/users/user[@id='2']").unwrap(),
            vec!["<user id=\"2\"><f>  </f></user>".to_string()]
        );
    }

    #[test]
    fn remove_children_then_text_leaves_empty_element() {
        let mut d = Document::parse("t", "<e id=\"1\"><f>x<g/>y</f></e>").unwrap();
        let n = apply(
            &mut d,
            &wrap(
                "<xupdate:remove select=\"/e/f/*\"/>\
                 <xupdate:remove select=\"/e/f/text()\"/>",
            ),
        )
        .unwrap();
        assert_eq!(n, 3);
        assert_eq!(d.serialize(d.root()), "<e id=\"1\"><f/></e>");
    }

    #[test]
    fn remove_attribute() {
        let mut d = doc();
        let n = apply(&mut d, &wrap("<xupdate:remove select=\"//user/@id\"/>")).unwrap();
        assert_eq!(n, 1);
        assert!(query(&d, "//user/@id").unwrap().is_empty());
    }

    #[test]
    fn remove_nothing_counts_zero() {
        let mut d = doc();
        let n = apply(&mut d, &wrap("<xupdate:remove select=\"//user[@id='9']\"/>")).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn update_element_and_attribute() {
        let mut d = doc();
        apply(
            &mut d,
            &wrap(
                "<xupdate:update select=\"//user/f\">a &lt; b</xupdate:update>\
                 <xupdate:update select=\"//user/@id\">7</xupdate:update>",
            ),
        )
        .unwrap();
        assert_eq!(
            query(&d, "//user/f/text()").unwrap(),
            vec!["a < b".to_string()]
        );
        assert_eq!(query(&d, "//user/@id").unwrap(), vec!["7".to_string()]);
    }

    #[test]
    fn rename_element() {
        let mut d = doc();
        apply(&mut d, &wrap("<xupdate:rename select=\"//user/f\">g</xupdate:rename>")).unwrap();
        assert_eq!(query(&d, "//user/g/text()").unwrap(), vec!["x".to_string()]);
    }

    #[test]
    fn insert_siblings_keep_order() {
        let mut d = doc();
        apply(
            &mut d,
            &wrap(
                "<xupdate:insert-before select=\"//user/f\"><a/><b/></xupdate:insert-before>\
                 <xupdate:insert-after select=\"//user/f\"><c/><d/></xupdate:insert-after>",
            ),
        )
        .unwrap();
        assert_eq!(
            query(&d, "//user/*/name()").unwrap(),
            vec!["name", "a", "b", "f", "c", "d"]
        );
    }

    #[test]
    fn variable_move() {
        let mut d = Document::parse(
            "t",
            "<DMS><users><user id=\"1\"><f>x</f></user><user id=\"2\"/></users></DMS>",
        )
        .unwrap();
        apply(
            &mut d,
            &wrap(
                "<xupdate:variable name=\"copy\" select=\"//user[@id='1']/f\"/>\
                 <xupdate:remove select=\"$copy\"/>\
                 <xupdate:append select=\"//user[@id='2']\"><xupdate:value-of select=\"$copy\"/></xupdate:append>",
            ),
        )
        .unwrap();
        assert_eq!(
            d.serialize(d.root()),
            "<DMS><users><user id=\"1\"/><user id=\"2\"><f>x</f></user></users></DMS>"
        );
    }

    #[test]
    fn failure_leaves_document_untouched() {
        let mut d = doc();
        let before = d.serialize(d.root());
        let result = apply(
            &mut d,
            &wrap(
                "<xupdate:remove select=\"//user/f\"/>\
                 <xupdate:frobnicate select=\"//user\"/>",
            ),
        );
        assert!(matches!(result, Err(SessionError::Fragment { .. })));
        assert_eq!(d.serialize(d.root()), before);
    }

    #[test]
    fn staging_leaves_the_source_alone() {
        let d = doc();
        let (next, n) = stage(&d, &wrap("<xupdate:remove select=\"//user/f\"/>")).unwrap();
        assert_eq!(n, 1);
        assert_eq!(query(&d, "count(//user/f)").unwrap(), vec!["1"]);
        assert_eq!(query(&next, "count(//user/f)").unwrap(), vec!["0"]);
    }

    #[test]
    fn rejects_bad_envelopes() {
        let mut d = doc();
        assert!(matches!(
            apply(&mut d, "<modifications/>"),
            Err(SessionError::Fragment { .. })
        ));
        assert!(matches!(
            apply(&mut d, "<xupdate:modifications"),
            Err(SessionError::Fragment { .. })
        ));
        assert!(matches!(
            apply(&mut d, &wrap("<xupdate:remove select=\"count(//user)\"/>")),
            Err(SessionError::Fragment { .. })
        ));
        assert!(matches!(
            apply(&mut d, &wrap("<xupdate:remove select=\"//user[\"/>")),
            Err(SessionError::Query { .. })
        ));
    }
}
