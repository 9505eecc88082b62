#![forbid(unsafe_code)]

use serde::Deserialize;

use crate::diagnostics::{Debt, Severity};

/// Run-wide analysis switches (`[analysis]` table).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisOptions {
    /// Build a binding context per unit; `false` leaves only the textual fallback.
    pub resolve_types: bool,
    /// Remediation hints name `viewModelScope`/`lifecycleScope`.
    pub lifecycle_hint: bool,
    /// Extra qualified names treated as lifecycle-bound scopes.
    pub bounded_scopes: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            resolve_types: true,
            lifecycle_hint: false,
            bounded_scopes: Vec::new(),
        }
    }
}

/// Effective options of one rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleOptions {
    pub active: bool,
    pub severity: Severity,
    pub debt: Debt,
}

/// Partial rule options as written in a `[rules.<id>]` table; absent keys keep defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub active: Option<bool>,
    pub severity: Option<Severity>,
    pub debt: Option<Debt>,
}

impl RuleOptions {
    pub fn apply(&mut self, config: &RuleConfig) {
        if let Some(active) = config.active {
            self.active = active;
        }
        if let Some(severity) = config.severity {
            self.severity = severity;
        }
        if let Some(debt) = config.debt {
            self.debt = debt;
        }
    }
}
