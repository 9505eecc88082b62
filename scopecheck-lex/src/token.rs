#![forbid(unsafe_code)]

use scopecheck_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwPackage,
    KwImport,
    KwClass,
    KwInterface,
    KwObject,
    KwFun,
    KwVal,
    KwVar,
    KwTypealias,
    KwReturn,
    KwIf,
    KwElse,
    KwWhen,
    KwWhile,
    KwDo,
    KwFor,
    KwTry,
    KwCatch,
    KwFinally,
    KwThrow,
    KwBreak,
    KwContinue,
    KwThis,
    KwSuper,
    KwNull,
    KwTrue,
    KwFalse,
    KwIs,
    KwIn,
    KwAs,
    KwAsSafe,

    // Operators / punctuation
    Arrow,
    ColonColon,
    Colon,
    Semi,
    Comma,
    Dot,
    SafeDot,
    DotDot,
    DotDotLt,
    Question,
    Elvis,
    BangBang,
    Bang,
    At,

    Eq,
    EqEq,
    EqEqEq,
    Neq,
    NeqEq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    PlusPlus,
    MinusMinus,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Newline,
    Eof,

    // Literals / identifiers
    Ident(String),
    Int(String),
    Float(String),
    Char(String),
    String(String),
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("identifier '{s}'"),
            TokenKind::Int(s) | TokenKind::Float(s) => format!("number '{s}'"),
            TokenKind::Char(_) => "character literal".to_string(),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::Eof => "end of file".to_string(),
            other => format!("{other:?}"),
        }
    }
}
