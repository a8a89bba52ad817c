//! Path-expression engine.
//!
//! Covers the subset of the path language the entity layer generates:
//! location paths with child, attribute, parent, self and `//` steps,
//! predicates, comparisons, unions, variables, a small function library
//! and function steps such as `/@id/string()` that map each item to a value.

mod eval;
mod lexer;
mod parser;

pub use eval::{format_number, Item, Variables};

use crate::error::{SessionError, SessionResult};
use crate::xml::Document;
use eval::Evaluator;
use parser::Expr;

/// A parsed path expression.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    /// Parses an expression.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Query` if the expression is not valid.
    pub fn parse(source: &str) -> SessionResult<Self> {
        let expr = parser::parse(source).map_err(|msg| SessionError::query(source, msg))?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Returns the expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression against `doc` with the given bindings.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Query` on evaluation failures such as an
    /// unknown function or an unbound variable.
    pub fn evaluate(&self, doc: &Document, vars: &Variables) -> SessionResult<Vec<Item>> {
        Evaluator::new(doc, vars)
            .evaluate(&self.expr)
            .map_err(|msg| SessionError::query(&self.source, msg))
    }

    /// Evaluates the expression and renders each result as a string.
    ///
    /// Elements render as markup, text nodes as their text, attributes as
    /// their value and atomic values in their lexical form.
    ///
    /// # Errors
    ///
    /// See [`XPath::evaluate`].
    pub fn strings(&self, doc: &Document) -> SessionResult<Vec<String>> {
        let vars = Variables::new();
        let items = self.evaluate(doc, &vars)?;
        let evaluator = Evaluator::new(doc, &vars);
        Ok(items.iter().map(|item| evaluator.render(item)).collect())
    }
}

/// Parses and evaluates `expr`, returning rendered results.
///
/// # Errors
///
/// Returns `SessionError::Query` if the expression cannot be parsed or
/// evaluated.
pub fn query(doc: &Document, expr: &str) -> SessionResult<Vec<String>> {
    XPath::parse(expr)?.strings(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Document {
        Document::parse(
            "DMSUsers.xml",
            r#"<DMS>
                <users>
                    <user id="1" username="alice"><info><email>a@x.com</email></info><groups/></user>
                    <user id="2" username="bob"><info><email>b@x.com</email></info></user>
                    <user id="5" username="carol"><note>it's "quoted"</note></user>
                </users>
            </DMS>"#,
        )
        .unwrap()
    }

    fn q(doc: &Document, expr: &str) -> Vec<String> {
        query(doc, expr).unwrap()
    }

    #[test]
    fn entity_by_id() {
        let doc = users();
        assert_eq!(
            q(&doc, "/DMS/*[1]/*[@id='2']/@username"),
            vec!["bob".to_string()]
        );
        assert!(q(&doc, "/DMS/*[1]/*[@id='3']").is_empty());
    }

    #[test]
    fn max_of_ids() {
        let doc = users();
        assert_eq!(q(&doc, "max(/DMS/*[1]/*/@id)"), vec!["5".to_string()]);
        assert_eq!(q(&doc, "min(/DMS/*[1]/*/@id)"), vec!["1".to_string()]);
        assert!(q(&doc, "max(/DMS/*[1]/*/@missing)").is_empty());
        assert_eq!(q(&doc, "max(/DMS/*[1]/*/@username)"), vec!["NaN".to_string()]);
    }

    #[test]
    fn element_results_render_as_markup() {
        let doc = users();
        assert_eq!(
            q(&doc, "/DMS/*[1]/*[@id='1']/info"),
            vec!["<info><email>a@x.com</email></info>".to_string()]
        );
        assert_eq!(
            q(&doc, "/DMS/*[1]/*[@id='1']/info/email/text()"),
            vec!["a@x.com".to_string()]
        );
        assert_eq!(
            q(&doc, "/DMS/*[1]/*[@id='1']/groups"),
            vec!["<groups/>".to_string()]
        );
    }

    #[test]
    fn mapping_steps() {
        let doc = users();
        assert_eq!(q(&doc, "/DMS/*/name()"), vec!["users".to_string()]);
        assert_eq!(
            q(&doc, "/DMS/*[1]/*/@id/string()"),
            vec!["1".to_string(), "2".to_string(), "5".to_string()]
        );
        assert_eq!(
            q(&doc, "/DMS/*[1]/*[@id='1']/*/name()"),
            vec!["info".to_string(), "groups".to_string()]
        );
    }

    #[test]
    fn field_predicates() {
        let doc = users();
        assert_eq!(
            q(&doc, "/DMS/*[1]/user[info/email='b@x.com']/@id"),
            vec!["2".to_string()]
        );
        assert_eq!(
            q(
                &doc,
                "/DMS/*[1]/user[note=concat('it', \"'\", 's \"quoted\"')]/@id"
            ),
            vec!["5".to_string()]
        );
        assert_eq!(
            q(&doc, "/DMS/*[1]/*[@id > 1 and @id < 5]/@username"),
            vec!["bob".to_string()]
        );
    }

    #[test]
    fn counting_and_positions() {
        let doc = users();
        assert_eq!(q(&doc, "count(/DMS/*[1]/*)"), vec!["3".to_string()]);
        assert_eq!(
            q(&doc, "/DMS/*[1]/*[last()]/@id"),
            vec!["5".to_string()]
        );
        assert_eq!(
            q(&doc, "/DMS/*[1]/*[position() != 1]/@id"),
            vec!["2".to_string(), "5".to_string()]
        );
    }

    #[test]
    fn descendants_and_parents() {
        let doc = users();
        assert_eq!(q(&doc, "count(//email)"), vec!["2".to_string()]);
        assert_eq!(
            q(&doc, "//email[.='b@x.com']/../../@id"),
            vec!["2".to_string()]
        );
    }

    #[test]
    fn unions_are_deduplicated() {
        let doc = users();
        assert_eq!(
            q(&doc, "count(//user[@id='1'] | /DMS/users/user[1])"),
            vec!["1".to_string()]
        );
    }

    #[test]
    fn boolean_results() {
        let doc = users();
        assert_eq!(q(&doc, "not(//user[@id='9'])"), vec!["true".to_string()]);
        assert_eq!(
            q(&doc, "contains(//user[1]/info/email, '@x')"),
            vec!["true".to_string()]
        );
    }

    #[test]
    fn variables() {
        let doc = users();
        let path = XPath::parse("$picked/@username").unwrap();
        let mut vars = Variables::new();
        let picked = XPath::parse("//user[@id='2']")
            .unwrap()
            .evaluate(&doc, &Variables::new())
            .unwrap();
        vars.insert("picked".to_string(), picked);
        let items = path.evaluate(&doc, &vars).unwrap();
        assert_eq!(items.len(), 1);

        let unbound = XPath::parse("$nope").unwrap().evaluate(&doc, &Variables::new());
        assert!(matches!(unbound, Err(SessionError::Query { .. })));
    }

    #[test]
    fn errors_carry_the_expression() {
        let doc = users();
        let err = query(&doc, "frobnicate(1)").unwrap_err();
        match err {
            SessionError::Query { expr, message } => {
                assert_eq!(expr, "frobnicate(1)");
                assert!(message.contains("frobnicate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
