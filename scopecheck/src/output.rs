#![forbid(unsafe_code)]

use std::fmt::Write as _;

use clap::ValueEnum;
use miette::{IntoDiagnostic, NamedSource};
use scopecheck_core::{Finding, RuleFault};

use crate::files::Loaded;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Findings as miette reports against their source, then a summary line.
pub fn render_text(findings: &[Finding], faults: &[RuleFault], loaded: &Loaded) -> String {
    let mut out = String::new();
    for finding in findings {
        match loaded.source(&finding.file) {
            Some(src) => {
                let report = miette::Report::new(finding.clone())
                    .with_source_code(NamedSource::new(finding.file.clone(), src.to_string()));
                let _ = writeln!(out, "{report:?}");
            }
            None => {
                let _ = writeln!(
                    out,
                    "{}:{}: [{}] {}",
                    finding.file, finding.start_offset, finding.rule_id, finding.message
                );
            }
        }
    }
    for fault in faults {
        let _ = writeln!(out, "{} failed on {}: {}", fault.rule_id, fault.file, fault.message);
    }
    let _ = writeln!(
        out,
        "{} finding(s) in {} file(s)",
        findings.len(),
        loaded.len()
    );
    out
}

/// A JSON array of findings. Rule faults are logged, not serialized.
pub fn render_json(findings: &[Finding]) -> miette::Result<String> {
    serde_json::to_string_pretty(findings).into_diagnostic()
}
