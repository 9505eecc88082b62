#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use scopecheck_ast::Span;
use thiserror::Error;

/// Internal fault of one rule on one unit.
///
/// Never fatal for a run: the engine records it and moves on.
#[derive(Clone, Debug, Error, Diagnostic)]
#[error("rule {rule} failed: {message}")]
#[diagnostic(code(scopecheck::rule))]
#[allow(unused_assignments)]
pub struct RuleError {
    pub rule: String,
    pub message: String,
    #[label]
    pub span: Option<Span>,
}

impl RuleError {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            span: None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
#[error("unknown rule id `{0}`")]
#[diagnostic(
    code(scopecheck::rule_id),
    help("run `scopecheck rules` to list the available rules")
)]
pub struct UnknownRuleId(pub String);
