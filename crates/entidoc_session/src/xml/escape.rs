//! Markup escaping.

use std::borrow::Cow;

/// Escapes a value for use as element text content.
///
/// `&`, `<` and `>` are replaced; quotes are legal in text. Carriage
/// returns become character references, since a parser folds a literal
/// CR or CRLF into LF.
#[must_use]
pub fn escape_text(raw: &str) -> Cow<'_, str> {
    escape_with(raw, false)
}

/// Escapes a value for use inside a double-quoted attribute value.
#[must_use]
pub fn escape_attribute(raw: &str) -> Cow<'_, str> {
    escape_with(raw, true)
}

fn escape_with(raw: &str, quotes: bool) -> Cow<'_, str> {
    let needs = |c: char| {
        matches!(c, '&' | '<' | '>' | '\r') || (quotes && matches!(c, '"' | '\n' | '\t'))
    };
    if !raw.chars().any(needs) {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '"' if quotes => out.push_str("&quot;"),
            '\n' if quotes => out.push_str("&#10;"),
            '\t' if quotes => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Returns true if `name` is usable as an element or attribute name.
///
/// This is the XML `Name` production restricted to the characters the
/// store generates: a letter or underscore followed by letters, digits,
/// `-`, `_` or `.`. Colons are refused because the parser resolves them
/// as namespace prefixes.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(escape_text("hello"), Cow::Borrowed("hello")));
        assert!(matches!(escape_attribute("it's"), Cow::Borrowed(_)));
    }

    #[test]
    fn text_escapes_markup_characters() {
        assert_eq!(escape_text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_text("say \"hi\""), "say \"hi\"");
    }

    #[test]
    fn attribute_escapes_quotes() {
        assert_eq!(escape_attribute("x=\"1\""), "x=&quot;1&quot;");
        assert_eq!(escape_attribute("a\nb"), "a&#10;b");
    }

    #[test]
    fn carriage_returns_become_references() {
        assert_eq!(escape_text("a\r\nb"), "a&#13;\nb");
        assert_eq!(escape_attribute("a\r\nb"), "a&#13;&#10;b");
    }

    #[test]
    fn escaped_values_survive_a_parse() {
        let raw = "x\r\ny\rz\t<&>";
        let xml = format!("<r a=\"{}\">{}</r>", escape_attribute(raw), escape_text(raw));
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let root = doc.root_element();
        assert_eq!(root.attribute("a"), Some(raw));
        assert_eq!(root.text(), Some(raw));
    }

    #[test]
    fn names() {
        assert!(is_valid_name("email"));
        assert!(is_valid_name("external_source"));
        assert!(is_valid_name("_x-1.2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1abc"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("a'b"));
        assert!(!is_valid_name("a:b"));
        assert!(!is_valid_name("xupdate:append"));
    }
}
