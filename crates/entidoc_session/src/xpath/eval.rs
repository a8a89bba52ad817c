//! Expression evaluation over a [`Document`].

use std::collections::HashMap;

use super::parser::{Axis, CmpOp, Expr, NodeTest, Step};
use crate::xml::{Document, NodeId, NodeKind};

/// One member of an evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A document, element or text node.
    Node(NodeId),
    /// An attribute, identified by its owner element and name.
    Attribute(NodeId, String),
    /// A string value.
    Str(String),
    /// A numeric value.
    Num(f64),
    /// A boolean value.
    Bool(bool),
}

impl Item {
    fn is_node(&self) -> bool {
        matches!(self, Self::Node(_) | Self::Attribute(..))
    }

    fn same_node(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Node(a), Self::Node(b)) => a == b,
            (Self::Attribute(a, x), Self::Attribute(b, y)) => a == b && x == y,
            _ => false,
        }
    }
}

/// Variable bindings visible to an expression.
pub type Variables = HashMap<String, Vec<Item>>;

type EvalResult<T> = Result<T, String>;

#[derive(Debug, Clone)]
struct Focus {
    item: Item,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'a> {
    doc: &'a Document,
    vars: &'a Variables,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(doc: &'a Document, vars: &'a Variables) -> Self {
        Self { doc, vars }
    }

    /// Evaluates `expr` with the document node as context.
    pub(crate) fn evaluate(&self, expr: &Expr) -> EvalResult<Vec<Item>> {
        let focus = Focus {
            item: Item::Node(self.doc.root()),
            position: 1,
            size: 1,
        };
        self.eval(expr, &focus)
    }

    fn eval(&self, expr: &Expr, focus: &Focus) -> EvalResult<Vec<Item>> {
        match expr {
            Expr::Literal(s) => Ok(vec![Item::Str(s.clone())]),
            Expr::Number(n) => Ok(vec![Item::Num(*n)]),
            Expr::Variable(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| format!("unbound variable ${name}")),
            Expr::Or(lhs, rhs) => {
                let value = self.truthy(lhs, focus)? || self.truthy(rhs, focus)?;
                Ok(vec![Item::Bool(value)])
            }
            Expr::And(lhs, rhs) => {
                let value = self.truthy(lhs, focus)? && self.truthy(rhs, focus)?;
                Ok(vec![Item::Bool(value)])
            }
            Expr::Compare(op, lhs, rhs) => {
                let lhs = self.eval(lhs, focus)?;
                let rhs = self.eval(rhs, focus)?;
                Ok(vec![Item::Bool(self.compare(*op, &lhs, &rhs))])
            }
            Expr::Union(lhs, rhs) => {
                let mut items = self.eval(lhs, focus)?;
                items.extend(self.eval(rhs, focus)?);
                if items.iter().any(|i| !i.is_node()) {
                    return Err("union operands must be node sequences".to_string());
                }
                Ok(dedupe(items))
            }
            Expr::Path { absolute, steps } => {
                let start = if *absolute {
                    Item::Node(self.doc.root())
                } else {
                    focus.item.clone()
                };
                self.walk(vec![start], steps)
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let items = self.eval(primary, focus)?;
                let items = self.filter(items, predicates)?;
                self.walk(items, steps)
            }
            Expr::Call(name, args) => self.call(name, args, focus),
        }
    }

    fn truthy(&self, expr: &Expr, focus: &Focus) -> EvalResult<bool> {
        Ok(effective_boolean(&self.eval(expr, focus)?))
    }

    fn walk(&self, mut current: Vec<Item>, steps: &[Step]) -> EvalResult<Vec<Item>> {
        for step in steps {
            let mut next = Vec::new();
            if let NodeTest::Map(name, args) = &step.test {
                let size = current.len();
                for (index, item) in current.iter().enumerate() {
                    let focus = Focus {
                        item: item.clone(),
                        position: index + 1,
                        size,
                    };
                    next.extend(self.call(name, args, &focus)?);
                }
                current = self.filter(next, &step.predicates)?;
                continue;
            }
            for item in &current {
                let candidates = self.axis(item, step)?;
                next.extend(self.filter(candidates, &step.predicates)?);
            }
            current = dedupe(next);
        }
        Ok(current)
    }

    fn axis(&self, item: &Item, step: &Step) -> EvalResult<Vec<Item>> {
        let doc = self.doc;
        let node = match item {
            Item::Node(id) => *id,
            Item::Attribute(owner, name) => {
                return Ok(match step.axis {
                    Axis::Parent => vec![Item::Node(*owner)],
                    Axis::SelfNode | Axis::DescendantOrSelf
                        if matches!(step.test, NodeTest::Node) =>
                    {
                        vec![Item::Attribute(*owner, name.clone())]
                    }
                    _ => Vec::new(),
                });
            }
            _ => return Err("location step applied to an atomic value".to_string()),
        };

        let items = match step.axis {
            Axis::Child => doc
                .children(node)
                .iter()
                .copied()
                .filter(|&c| self.matches(c, &step.test))
                .map(Item::Node)
                .collect(),
            Axis::Attribute => doc
                .attributes(node)
                .iter()
                .filter(|(n, _)| match &step.test {
                    NodeTest::Any | NodeTest::Node => true,
                    NodeTest::Name(want) => n == want,
                    _ => false,
                })
                .map(|(n, _)| Item::Attribute(node, n.clone()))
                .collect(),
            Axis::Parent => doc
                .parent(node)
                .filter(|&p| self.matches(p, &step.test))
                .map(Item::Node)
                .into_iter()
                .collect(),
            Axis::SelfNode => {
                if self.matches(node, &step.test) {
                    vec![Item::Node(node)]
                } else {
                    Vec::new()
                }
            }
            Axis::DescendantOrSelf => {
                let mut all = Vec::new();
                doc.descendants_or_self(node, &mut all);
                all.into_iter()
                    .filter(|&n| self.matches(n, &step.test))
                    .map(Item::Node)
                    .collect()
            }
        };
        Ok(items)
    }

    fn matches(&self, node: NodeId, test: &NodeTest) -> bool {
        match (test, self.doc.kind(node)) {
            (NodeTest::Node, _) => true,
            (NodeTest::Any, NodeKind::Element { .. }) => true,
            (NodeTest::Name(want), NodeKind::Element { name, .. }) => name == want,
            (NodeTest::Text, NodeKind::Text(_)) => true,
            _ => false,
        }
    }

    fn filter(&self, items: Vec<Item>, predicates: &[Expr]) -> EvalResult<Vec<Item>> {
        let mut items = items;
        for predicate in predicates {
            let size = items.len();
            let mut kept = Vec::with_capacity(size);
            for (index, item) in items.into_iter().enumerate() {
                let focus = Focus {
                    item,
                    position: index + 1,
                    size,
                };
                let result = self.eval(predicate, &focus)?;
                let keep = match result.as_slice() {
                    [Item::Num(n)] => (index + 1) as f64 == *n,
                    other => effective_boolean(other),
                };
                if keep {
                    kept.push(focus.item);
                }
            }
            items = kept;
        }
        Ok(items)
    }

    fn compare(&self, op: CmpOp, lhs: &[Item], rhs: &[Item]) -> bool {
        let single_bool = |items: &[Item]| matches!(items, [Item::Bool(_)]);
        if single_bool(lhs) || single_bool(rhs) {
            let a = effective_boolean(lhs);
            let b = effective_boolean(rhs);
            return compare_numbers(op, f64::from(u8::from(a)), f64::from(u8::from(b)));
        }

        let lhs: Vec<Item> = lhs.iter().map(|i| self.atomize(i)).collect();
        let rhs: Vec<Item> = rhs.iter().map(|i| self.atomize(i)).collect();
        lhs.iter().any(|a| {
            rhs.iter().any(|b| {
                let numeric = matches!(a, Item::Num(_))
                    || matches!(b, Item::Num(_))
                    || !matches!(op, CmpOp::Eq | CmpOp::Ne);
                if numeric {
                    compare_numbers(op, self.number_of(a), self.number_of(b))
                } else {
                    let (a, b) = (self.string_of(a), self.string_of(b));
                    match op {
                        CmpOp::Eq => a == b,
                        _ => a != b,
                    }
                }
            })
        })
    }

    fn atomize(&self, item: &Item) -> Item {
        match item {
            Item::Node(_) | Item::Attribute(..) => Item::Str(self.string_of(item)),
            other => other.clone(),
        }
    }

    /// The string value of an item.
    pub(crate) fn string_of(&self, item: &Item) -> String {
        match item {
            Item::Node(id) => self.doc.string_value(*id),
            Item::Attribute(owner, name) => {
                self.doc.attribute(*owner, name).unwrap_or_default().to_string()
            }
            Item::Str(s) => s.clone(),
            Item::Num(n) => format_number(*n),
            Item::Bool(b) => b.to_string(),
        }
    }

    fn number_of(&self, item: &Item) -> f64 {
        match item {
            Item::Num(n) => *n,
            Item::Bool(b) => f64::from(u8::from(*b)),
            other => parse_number(&self.string_of(other)),
        }
    }

    fn first_string(&self, items: &[Item]) -> String {
        items.first().map(|i| self.string_of(i)).unwrap_or_default()
    }

    fn string_arg(&self, args: &[Expr], focus: &Focus) -> EvalResult<String> {
        match args.first() {
            Some(arg) => Ok(self.first_string(&self.eval(arg, focus)?)),
            None => Ok(self.string_of(&focus.item)),
        }
    }

    fn call(&self, name: &str, args: &[Expr], focus: &Focus) -> EvalResult<Vec<Item>> {
        let arity = |min: usize, max: usize| -> EvalResult<()> {
            if args.len() < min || args.len() > max {
                Err(format!("{name}() takes {min}..={max} arguments, got {}", args.len()))
            } else {
                Ok(())
            }
        };

        let value = match name {
            "max" | "min" => {
                arity(1, 1)?;
                let items = self.eval(&args[0], focus)?;
                if items.is_empty() {
                    return Ok(Vec::new());
                }
                let numbers: Vec<f64> = items.iter().map(|i| self.number_of(i)).collect();
                let folded = if numbers.iter().any(|n| n.is_nan()) {
                    f64::NAN
                } else if name == "max" {
                    numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max)
                } else {
                    numbers.iter().copied().fold(f64::INFINITY, f64::min)
                };
                Item::Num(folded)
            }
            "count" => {
                arity(1, 1)?;
                Item::Num(self.eval(&args[0], focus)?.len() as f64)
            }
            "sum" => {
                arity(1, 1)?;
                let items = self.eval(&args[0], focus)?;
                Item::Num(items.iter().map(|i| self.number_of(i)).sum())
            }
            "string" => {
                arity(0, 1)?;
                Item::Str(self.string_arg(args, focus)?)
            }
            "name" | "local-name" => {
                arity(0, 1)?;
                let target = match args.first() {
                    Some(arg) => self.eval(arg, focus)?.into_iter().next(),
                    None => Some(focus.item.clone()),
                };
                let full = match &target {
                    Some(Item::Node(id)) => self.doc.name(*id).unwrap_or_default().to_string(),
                    Some(Item::Attribute(_, attr)) => attr.clone(),
                    _ => String::new(),
                };
                if name == "local-name" {
                    let local = full.rsplit(':').next().unwrap_or_default().to_string();
                    Item::Str(local)
                } else {
                    Item::Str(full)
                }
            }
            "concat" => {
                let mut out = String::new();
                for arg in args {
                    out.push_str(&self.first_string(&self.eval(arg, focus)?));
                }
                Item::Str(out)
            }
            "contains" | "starts-with" => {
                arity(2, 2)?;
                let haystack = self.first_string(&self.eval(&args[0], focus)?);
                let needle = self.first_string(&self.eval(&args[1], focus)?);
                Item::Bool(if name == "contains" {
                    haystack.contains(&needle)
                } else {
                    haystack.starts_with(&needle)
                })
            }
            "not" => {
                arity(1, 1)?;
                Item::Bool(!self.truthy(&args[0], focus)?)
            }
            "true" | "false" => {
                arity(0, 0)?;
                Item::Bool(name == "true")
            }
            "number" => {
                arity(0, 1)?;
                let item = match args.first() {
                    Some(arg) => self.eval(arg, focus)?.into_iter().next(),
                    None => Some(focus.item.clone()),
                };
                Item::Num(item.map_or(f64::NAN, |i| self.number_of(&i)))
            }
            "position" => {
                arity(0, 0)?;
                Item::Num(focus.position as f64)
            }
            "last" => {
                arity(0, 0)?;
                Item::Num(focus.size as f64)
            }
            "string-length" => {
                arity(0, 1)?;
                Item::Num(self.string_arg(args, focus)?.chars().count() as f64)
            }
            "normalize-space" => {
                arity(0, 1)?;
                let s = self.string_arg(args, focus)?;
                Item::Str(s.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            other => return Err(format!("unknown function {other}()")),
        };
        Ok(vec![value])
    }

    /// Renders a result item as query output.
    pub(crate) fn render(&self, item: &Item) -> String {
        match item {
            Item::Node(id) if !self.doc.is_text(*id) => self.doc.serialize(*id),
            other => self.string_of(other),
        }
    }
}

fn effective_boolean(items: &[Item]) -> bool {
    match items {
        [] => false,
        [first, ..] if first.is_node() => true,
        [Item::Bool(b)] => *b,
        [Item::Num(n)] => *n != 0.0 && !n.is_nan(),
        [Item::Str(s)] => !s.is_empty(),
        _ => true,
    }
}

fn compare_numbers(op: CmpOp, a: f64, b: f64) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

fn dedupe(items: Vec<Item>) -> Vec<Item> {
    let mut out: Vec<Item> = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_node() || !out.iter().any(|seen| seen.same_node(&item)) {
            out.push(item);
        }
    }
    out
}

/// Parses a string as a number; anything that is not a plain decimal is NaN.
pub(crate) fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    let plain = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'));
    if plain {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Formats a number the way query results print it: integral values
/// without a fractional part.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(6.0), "6");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number(" 12 "), 12.0);
        assert_eq!(parse_number("1.5"), 1.5);
        assert!(parse_number("abc").is_nan());
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("").is_nan());
    }

    #[test]
    fn booleans() {
        assert!(!effective_boolean(&[]));
        assert!(effective_boolean(&[Item::Str("x".into())]));
        assert!(!effective_boolean(&[Item::Str(String::new())]));
        assert!(!effective_boolean(&[Item::Num(0.0)]));
        assert!(effective_boolean(&[Item::Node(Document::new().root())]));
    }
}
