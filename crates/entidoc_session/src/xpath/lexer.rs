//! Tokenizer for path expressions.

use logos::Logos;

/// A lexical token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub(crate) enum Token {
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("@")]
    At,
    #[token(",")]
    Comma,
    #[token("|")]
    Pipe,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("*")]
    Star,
    #[token("=")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    // A single colon joins a prefix to a local name.
    #[regex(r"[\p{L}_][\p{L}\p{N}_.\-]*(:[\p{L}_][\p{L}\p{N}_.\-]*)?", |lex| lex.slice().to_owned())]
    Name(String),

    #[regex(r"'[^']*'", unquote)]
    #[regex(r#""[^"]*""#, unquote)]
    Literal(String),

    #[regex(r"[0-9]+(\.[0-9]*)?|\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"\$[\p{L}_][\p{L}\p{N}_.\-:]*", |lex| lex.slice()[1..].to_owned())]
    Variable(String),
}

fn unquote(lex: &mut logos::Lexer<Token>) -> String {
    let quoted = lex.slice();
    quoted[1..quoted.len() - 1].to_owned()
}

/// Splits an expression into tokens.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Token::lexer(src);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => {
                return Err(format!(
                    "unexpected `{}` at offset {}",
                    lexer.slice(),
                    lexer.span().start
                ))
            }
        }
    }
    Ok(tokens)
}
