//! Recursive-descent parser for path expressions.

use super::lexer::{tokenize, Token};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Navigation axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Attribute,
    Parent,
    SelfNode,
    DescendantOrSelf,
}

/// What a step selects on its axis.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeTest {
    Name(String),
    Any,
    Text,
    Node,
    /// A function applied to each context item, e.g. `/@id/string()`.
    Map(String, Vec<Expr>),
}

/// One location step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path {
        absolute: bool,
        steps: Vec<Step>,
    },
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Literal(String),
    Number(f64),
    Variable(String),
    Call(String, Vec<Expr>),
}

/// Parses a complete expression.
pub(crate) fn parse(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected token {token:?}")),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected {expected:?}, found {:?}", self.peek()))
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(n)) if n == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.and_expr()?;
        while self.eat_keyword("or") {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.comparison()?;
        while self.eat_keyword("and") {
            let rhs = self.comparison()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let mut lhs = self.union()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CmpOp::Eq,
                Some(Token::Ne) => CmpOp::Ne,
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.union()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn union(&mut self) -> Result<Expr, String> {
        let mut lhs = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            let rhs = self.path_expr()?;
            lhs = Expr::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn starts_primary(&self) -> bool {
        match self.peek() {
            Some(Token::Literal(_) | Token::Number(_) | Token::Variable(_) | Token::LParen) => true,
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen) && !matches!(name.as_str(), "text" | "node")
            }
            _ => false,
        }
    }

    fn path_expr(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Slash) {
            let steps = if self.starts_step() {
                self.relative_steps(Vec::new())?
            } else {
                Vec::new()
            };
            return Ok(Expr::Path {
                absolute: true,
                steps,
            });
        }
        if self.eat(&Token::DoubleSlash) {
            let steps = self.relative_steps(vec![descendant_or_self()])?;
            return Ok(Expr::Path {
                absolute: true,
                steps,
            });
        }
        if self.starts_primary() {
            let primary = self.primary()?;
            let predicates = self.predicates()?;
            let steps = self.trailing_steps()?;
            if predicates.is_empty() && steps.is_empty() {
                return Ok(primary);
            }
            return Ok(Expr::Filter {
                primary: Box::new(primary),
                predicates,
                steps,
            });
        }
        let steps = self.relative_steps(Vec::new())?;
        Ok(Expr::Path {
            absolute: false,
            steps,
        })
    }

    fn trailing_steps(&mut self) -> Result<Vec<Step>, String> {
        let mut steps = Vec::new();
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(descendant_or_self());
                steps.push(self.step()?);
            } else {
                return Ok(steps);
            }
        }
    }

    fn relative_steps(&mut self, mut steps: Vec<Step>) -> Result<Vec<Step>, String> {
        steps.push(self.step()?);
        steps.extend(self.trailing_steps()?);
        Ok(steps)
    }

    fn step(&mut self) -> Result<Step, String> {
        let (axis, test) = match self.advance() {
            Some(Token::Dot) => (Axis::SelfNode, NodeTest::Node),
            Some(Token::DotDot) => (Axis::Parent, NodeTest::Node),
            Some(Token::Star) => (Axis::Child, NodeTest::Any),
            Some(Token::At) => match self.advance() {
                Some(Token::Star) => (Axis::Attribute, NodeTest::Any),
                Some(Token::Name(name)) => (Axis::Attribute, NodeTest::Name(name)),
                other => return Err(format!("expected attribute name, found {other:?}")),
            },
            Some(Token::Name(name)) => {
                if self.eat(&Token::LParen) {
                    match name.as_str() {
                        "text" => {
                            self.expect(&Token::RParen)?;
                            (Axis::Child, NodeTest::Text)
                        }
                        "node" => {
                            self.expect(&Token::RParen)?;
                            (Axis::Child, NodeTest::Node)
                        }
                        _ => (Axis::SelfNode, NodeTest::Map(name, self.arguments()?)),
                    }
                } else {
                    (Axis::Child, NodeTest::Name(name))
                }
            }
            other => return Err(format!("expected location step, found {other:?}")),
        };
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn predicates(&mut self) -> Result<Vec<Expr>, String> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.or_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }

    /// Parses a comma-separated argument list after the opening paren.
    fn arguments(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.or_expr()?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(&Token::Comma)?;
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Variable(v)) => Ok(Expr::Variable(v)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                self.expect(&Token::LParen)?;
                Ok(Expr::Call(name, self.arguments()?))
            }
            other => Err(format!("expected expression, found {other:?}")),
        }
    }
}

fn descendant_or_self() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::Node,
        predicates: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step {
            axis: Axis::Child,
            test: NodeTest::Name(name.into()),
            predicates: Vec::new(),
        }
    }

    #[test]
    fn absolute_path() {
        let expr = parse("/DMS/users").unwrap();
        assert_eq!(
            expr,
            Expr::Path {
                absolute: true,
                steps: vec![child("DMS"), child("users")],
            }
        );
    }

    #[test]
    fn root_only() {
        assert_eq!(
            parse("/").unwrap(),
            Expr::Path {
                absolute: true,
                steps: Vec::new()
            }
        );
    }

    #[test]
    fn function_with_path_argument() {
        let expr = parse("max(/DMS/*[1]/*/@id)").unwrap();
        let Expr::Call(name, args) = expr else {
            panic!("expected call");
        };
        assert_eq!(name, "max");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn mapping_step() {
        let expr = parse("/DMS/*/name()").unwrap();
        let Expr::Path { steps, .. } = expr else {
            panic!("expected path");
        };
        assert_eq!(steps[2].test, NodeTest::Map("name".into(), Vec::new()));
    }

    #[test]
    fn text_step_is_not_a_call() {
        let expr = parse("e/text()").unwrap();
        let Expr::Path { absolute, steps } = expr else {
            panic!("expected path");
        };
        assert!(!absolute);
        assert_eq!(steps[1].test, NodeTest::Text);
    }

    #[test]
    fn variable_with_steps() {
        let expr = parse("$copy/name").unwrap();
        assert!(matches!(expr, Expr::Filter { .. }));
    }

    #[test]
    fn boolean_precedence() {
        let expr = parse("a = 'x' or b = 'y' and c").unwrap();
        let Expr::Or(_, rhs) = expr else {
            panic!("expected or");
        };
        assert!(matches!(*rhs, Expr::And(..)));
    }

    #[test]
    fn element_named_like_keyword() {
        let expr = parse("/DMS/and").unwrap();
        let Expr::Path { steps, .. } = expr else {
            panic!("expected path");
        };
        assert_eq!(steps[1], child("and"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("/DMS[").is_err());
        assert!(parse("/DMS]").is_err());
        assert!(parse("max(1,").is_err());
    }
}
