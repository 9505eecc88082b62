#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use logos::Logos;
use miette::Diagnostic;
use scopecheck_ast::{span_between, Span};
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(scopecheck::lex))]
#[allow(unused_assignments)]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
enum RawToken {
    #[token("package")]
    KwPackage,
    #[token("import")]
    KwImport,
    #[token("class")]
    KwClass,
    #[token("interface")]
    KwInterface,
    #[token("object")]
    KwObject,
    #[token("fun")]
    KwFun,
    #[token("val")]
    KwVal,
    #[token("var")]
    KwVar,
    #[token("typealias")]
    KwTypealias,
    #[token("return")]
    KwReturn,
    #[token("if")]
    KwIf,
    #[token("else")]
    KwElse,
    #[token("when")]
    KwWhen,
    #[token("while")]
    KwWhile,
    #[token("do")]
    KwDo,
    #[token("for")]
    KwFor,
    #[token("try")]
    KwTry,
    #[token("catch")]
    KwCatch,
    #[token("finally")]
    KwFinally,
    #[token("throw")]
    KwThrow,
    #[token("break")]
    KwBreak,
    #[token("continue")]
    KwContinue,
    #[token("this")]
    KwThis,
    #[token("super")]
    KwSuper,
    #[token("null")]
    KwNull,
    #[token("true")]
    KwTrue,
    #[token("false")]
    KwFalse,
    #[token("is")]
    KwIs,
    #[token("in")]
    KwIn,
    #[token("as")]
    KwAs,
    #[token("as?")]
    KwAsSafe,

    #[token("->")]
    Arrow,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("?.")]
    SafeDot,
    #[token("..")]
    DotDot,
    #[token("..<")]
    DotDotLt,
    #[token("?")]
    Question,
    #[token("?:")]
    Elvis,
    #[token("!!")]
    BangBang,
    #[token("!")]
    Bang,
    #[token("@")]
    At,

    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    Neq,
    #[token("!==")]
    NeqEq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,
    #[regex(r"#![^\n]*")]
    Shebang,

    #[regex(r"0[xX][0-9a-fA-F_]+[uUlL]*", |lex| lex.slice().to_string())]
    #[regex(r"0[bB][01_]+[uUlL]*", |lex| lex.slice().to_string())]
    #[regex(r"[0-9][0-9_]*[uUlL]*", |lex| lex.slice().to_string())]
    Int(String),

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[fF]?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+[fF]?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9][0-9_]*[fF]", |lex| lex.slice().to_string())]
    Float(String),

    #[regex(r"'([^'\\\n]|\\[^\n])*'", |lex| lex.slice().to_string())]
    Char(String),

    #[token("\"", string_literal)]
    String(Option<String>),

    #[token("\"\"\"", raw_string_literal)]
    RawString(Option<String>),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    #[regex(r"`[^`\n]+`", |lex| lex.slice().trim_matches('`').to_string())]
    Ident(String),
}

/// Consumes a (possibly nested) block comment after the opening `/*`.
fn block_comment(lex: &mut logos::Lexer<RawToken>) -> bool {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();
    let mut depth = 1usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            depth += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                lex.bump(i);
                return true;
            }
            continue;
        }
        i += 1;
    }
    false
}

/// Consumes a single-line string after the opening quote. Template
/// expressions (`${...}`) are kept as raw text.
fn string_literal(lex: &mut logos::Lexer<RawToken>) -> Option<String> {
    let rest = lex.remainder();
    let end = scan_string_body(rest)?;
    lex.bump(end + 1);
    Some(rest[..end].to_string())
}

/// Returns the byte index of the closing quote.
fn scan_string_body(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            b'\n' => return None,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = skip_template(bytes, i + 2)?;
            }
            _ => i += 1,
        }
    }
    None
}

/// Skips a `${ ... }` template body starting just after `${`; returns the index after `}`.
fn skip_template(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut depth = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'"' => {
                let inner = std::str::from_utf8(&bytes[i + 1..]).ok()?;
                i += scan_string_body(inner)? + 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn raw_string_literal(lex: &mut logos::Lexer<RawToken>) -> Option<String> {
    let rest = lex.remainder();
    let end = rest.find("\"\"\"")?;
    // Trailing quotes beyond the closing triple belong to the string.
    let extra = rest[end + 3..].bytes().take_while(|b| *b == b'"').count();
    lex.bump(end + 3 + extra);
    Some(rest[..end + extra].to_string())
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut lex = RawToken::lexer(self.src);

        while let Some(raw) = lex.next() {
            let range = lex.span();
            let span = span_between(range.start, range.end);

            let kind = match raw {
                Ok(RawToken::LineComment) | Ok(RawToken::BlockComment) | Ok(RawToken::Shebang) => {
                    continue;
                }

                Ok(RawToken::KwPackage) => TokenKind::KwPackage,
                Ok(RawToken::KwImport) => TokenKind::KwImport,
                Ok(RawToken::KwClass) => TokenKind::KwClass,
                Ok(RawToken::KwInterface) => TokenKind::KwInterface,
                Ok(RawToken::KwObject) => TokenKind::KwObject,
                Ok(RawToken::KwFun) => TokenKind::KwFun,
                Ok(RawToken::KwVal) => TokenKind::KwVal,
                Ok(RawToken::KwVar) => TokenKind::KwVar,
                Ok(RawToken::KwTypealias) => TokenKind::KwTypealias,
                Ok(RawToken::KwReturn) => TokenKind::KwReturn,
                Ok(RawToken::KwIf) => TokenKind::KwIf,
                Ok(RawToken::KwElse) => TokenKind::KwElse,
                Ok(RawToken::KwWhen) => TokenKind::KwWhen,
                Ok(RawToken::KwWhile) => TokenKind::KwWhile,
                Ok(RawToken::KwDo) => TokenKind::KwDo,
                Ok(RawToken::KwFor) => TokenKind::KwFor,
                Ok(RawToken::KwTry) => TokenKind::KwTry,
                Ok(RawToken::KwCatch) => TokenKind::KwCatch,
                Ok(RawToken::KwFinally) => TokenKind::KwFinally,
                Ok(RawToken::KwThrow) => TokenKind::KwThrow,
                Ok(RawToken::KwBreak) => TokenKind::KwBreak,
                Ok(RawToken::KwContinue) => TokenKind::KwContinue,
                Ok(RawToken::KwThis) => TokenKind::KwThis,
                Ok(RawToken::KwSuper) => TokenKind::KwSuper,
                Ok(RawToken::KwNull) => TokenKind::KwNull,
                Ok(RawToken::KwTrue) => TokenKind::KwTrue,
                Ok(RawToken::KwFalse) => TokenKind::KwFalse,
                Ok(RawToken::KwIs) => TokenKind::KwIs,
                Ok(RawToken::KwIn) => TokenKind::KwIn,
                Ok(RawToken::KwAs) => TokenKind::KwAs,
                Ok(RawToken::KwAsSafe) => TokenKind::KwAsSafe,

                Ok(RawToken::Arrow) => TokenKind::Arrow,
                Ok(RawToken::ColonColon) => TokenKind::ColonColon,
                Ok(RawToken::Colon) => TokenKind::Colon,
                Ok(RawToken::Semi) => TokenKind::Semi,
                Ok(RawToken::Comma) => TokenKind::Comma,
                Ok(RawToken::Dot) => TokenKind::Dot,
                Ok(RawToken::SafeDot) => TokenKind::SafeDot,
                Ok(RawToken::DotDot) => TokenKind::DotDot,
                Ok(RawToken::DotDotLt) => TokenKind::DotDotLt,
                Ok(RawToken::Question) => TokenKind::Question,
                Ok(RawToken::Elvis) => TokenKind::Elvis,
                Ok(RawToken::BangBang) => TokenKind::BangBang,
                Ok(RawToken::Bang) => TokenKind::Bang,
                Ok(RawToken::At) => TokenKind::At,

                Ok(RawToken::Eq) => TokenKind::Eq,
                Ok(RawToken::EqEq) => TokenKind::EqEq,
                Ok(RawToken::EqEqEq) => TokenKind::EqEqEq,
                Ok(RawToken::Neq) => TokenKind::Neq,
                Ok(RawToken::NeqEq) => TokenKind::NeqEq,
                Ok(RawToken::PlusEq) => TokenKind::PlusEq,
                Ok(RawToken::MinusEq) => TokenKind::MinusEq,
                Ok(RawToken::StarEq) => TokenKind::StarEq,
                Ok(RawToken::SlashEq) => TokenKind::SlashEq,
                Ok(RawToken::PercentEq) => TokenKind::PercentEq,
                Ok(RawToken::PlusPlus) => TokenKind::PlusPlus,
                Ok(RawToken::MinusMinus) => TokenKind::MinusMinus,
                Ok(RawToken::Lt) => TokenKind::Lt,
                Ok(RawToken::Gt) => TokenKind::Gt,
                Ok(RawToken::Le) => TokenKind::Le,
                Ok(RawToken::Ge) => TokenKind::Ge,
                Ok(RawToken::AndAnd) => TokenKind::AndAnd,
                Ok(RawToken::OrOr) => TokenKind::OrOr,

                Ok(RawToken::Plus) => TokenKind::Plus,
                Ok(RawToken::Minus) => TokenKind::Minus,
                Ok(RawToken::Star) => TokenKind::Star,
                Ok(RawToken::Slash) => TokenKind::Slash,
                Ok(RawToken::Percent) => TokenKind::Percent,

                Ok(RawToken::LParen) => TokenKind::LParen,
                Ok(RawToken::RParen) => TokenKind::RParen,
                Ok(RawToken::LBrace) => TokenKind::LBrace,
                Ok(RawToken::RBrace) => TokenKind::RBrace,
                Ok(RawToken::LBracket) => TokenKind::LBracket,
                Ok(RawToken::RBracket) => TokenKind::RBracket,

                Ok(RawToken::Newline) => TokenKind::Newline,

                Ok(RawToken::Int(s)) => TokenKind::Int(s),
                Ok(RawToken::Float(s)) => TokenKind::Float(s),
                Ok(RawToken::Char(s)) => TokenKind::Char(s),
                Ok(RawToken::Ident(s)) => TokenKind::Ident(s),
                Ok(RawToken::String(Some(s))) | Ok(RawToken::RawString(Some(s))) => {
                    TokenKind::String(s)
                }
                Ok(RawToken::String(None)) | Ok(RawToken::RawString(None)) => {
                    return Err(LexError {
                        message: "unterminated string literal".to_string(),
                        span,
                    });
                }

                Err(_) => {
                    let message = if self.src[range.start..].starts_with("/*") {
                        "unterminated block comment".to_string()
                    } else {
                        "unexpected character".to_string()
                    };
                    return Err(LexError { message, span });
                }
            };

            tokens.push(Token { kind, span });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: span_between(self.src.len(), self.src.len()),
        });

        Ok(tokens)
    }
}
