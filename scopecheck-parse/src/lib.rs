#![forbid(unsafe_code)]

mod error;
mod parser;

use miette::IntoDiagnostic;
use scopecheck_lex::Lexer;

pub use error::ParseError;
pub use parser::Parser;

pub fn parse_source(src: &str) -> miette::Result<scopecheck_ast::SourceUnit> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_unit().into_diagnostic()
}

/// Parse a source file while attempting to recover from errors.
///
/// Returns a best-effort unit and the list of `ParseError`s encountered.
/// Lexical errors are not recoverable and fail the whole file.
pub fn parse_source_with_recovery(
    src: &str,
) -> miette::Result<(scopecheck_ast::SourceUnit, Vec<ParseError>)> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    Ok(parser.parse_unit_with_recovery())
}

pub fn parse_expr(src: &str) -> miette::Result<scopecheck_ast::Expr> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_expr_eof().into_diagnostic()
}
