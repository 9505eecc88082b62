#![forbid(unsafe_code)]

use std::fmt;

use miette::{Diagnostic, LabeledSpan};
use scopecheck_ast::{span_between, Span};
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Finding severity as seen by downstream report tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Defect,
    CodeSmell,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "Warning",
            Severity::Defect => "Defect",
            Severity::CodeSmell => "CodeSmell",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimated remediation effort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Debt {
    FiveMins,
    TenMins,
    TwentyMins,
}

impl Debt {
    pub fn as_str(self) -> &'static str {
        match self {
            Debt::FiveMins => "FIVE_MINS",
            Debt::TenMins => "TEN_MINS",
            Debt::TwentyMins => "TWENTY_MINS",
        }
    }
}

impl fmt::Display for Debt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported violation.
///
/// Serializes to the flat shape report tooling consumes:
/// `{ruleId, severity, message, file, startOffset, endOffset, debt}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub debt: Debt,
    /// Remediation hint, rendered as miette help text.
    #[serde(skip)]
    pub hint: Option<String>,
}

impl Finding {
    pub fn span(&self) -> Span {
        span_between(self.start_offset, self.end_offset)
    }

    /// Sort key used for deterministic output.
    pub fn sort_key(&self) -> (&str, usize, usize, &str) {
        (&self.file, self.start_offset, self.end_offset, &self.rule_id)
    }
}

/// Builds findings for one rule with its configured severity and debt.
#[derive(Clone, Debug)]
pub struct Reporter<'a> {
    pub rule_id: &'a str,
    pub severity: Severity,
    pub debt: Debt,
    pub file: &'a str,
}

impl Reporter<'_> {
    pub fn finding(
        &self,
        span: Span,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Result<Finding, RuleError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(RuleError::new(self.rule_id, "finding without a message").at(span));
        }
        Ok(Finding {
            rule_id: self.rule_id.to_string(),
            severity: self.severity,
            message,
            file: self.file.to_string(),
            start_offset: span.offset(),
            end_offset: span.offset() + span.len(),
            debt: self.debt,
            hint,
        })
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Finding {}

impl Diagnostic for Finding {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.rule_id))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Defect => miette::Severity::Error,
            Severity::Warning | Severity::CodeSmell => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.hint
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_with_span(Some(self.debt.to_string()), self.span());
        Some(Box::new(std::iter::once(label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopecheck_ast::span;

    fn reporter() -> Reporter<'static> {
        Reporter {
            rule_id: "GlobalScopeRule",
            severity: Severity::CodeSmell,
            debt: Debt::FiveMins,
            file: "Main.kt",
        }
    }

    #[test]
    fn finding_serializes_to_flat_camel_case_shape() {
        let finding = reporter()
            .finding(span(10, 5), "Do not use GlobalScope.", Some("hint".into()))
            .unwrap();
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ruleId": "GlobalScopeRule",
                "severity": "CodeSmell",
                "message": "Do not use GlobalScope.",
                "file": "Main.kt",
                "startOffset": 10,
                "endOffset": 15,
                "debt": "FIVE_MINS",
            })
        );
    }

    #[test]
    fn empty_message_is_a_rule_error() {
        let err = reporter().finding(span(0, 1), "  ", None).unwrap_err();
        assert_eq!(err.rule, "GlobalScopeRule");
    }

    #[test]
    fn debt_names_round_trip_through_serde() {
        let debt: Debt = serde_json::from_str("\"TWENTY_MINS\"").unwrap();
        assert_eq!(debt, Debt::TwentyMins);
        assert_eq!(debt.to_string(), "TWENTY_MINS");
    }
}
