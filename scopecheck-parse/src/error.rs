#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use scopecheck_ast::Span;
use thiserror::Error;

#[derive(Clone, Debug, Error, Diagnostic)]
#[error("parse error: {message}")]
#[diagnostic(code(scopecheck::parse))]
#[allow(unused_assignments)]
pub struct ParseError {
    pub message: String,
    #[label]
    pub span: Span,
}
