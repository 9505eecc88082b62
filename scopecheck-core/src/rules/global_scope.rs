#![forbid(unsafe_code)]

use crate::catalog;
use crate::classify::ScopeLifetime;
use crate::config::{RuleConfig, RuleOptions};
use crate::detect::ScopeOrigin;
use crate::diagnostics::{Debt, Finding, Severity};
use crate::error::RuleError;

use super::{call_span, sweep_launches, AnalysisContext, Rule, RuleId};

const MESSAGE: &str = "Do not use GlobalScope. Use a structured coroutine scope instead (e.g., viewModelScope, lifecycleScope, etc.).";

/// Launches on the detached singleton or on a scope built inline that no one
/// can cancel.
#[derive(Clone, Debug)]
pub struct GlobalScopeRule {
    options: RuleOptions,
}

impl Default for GlobalScopeRule {
    fn default() -> Self {
        Self {
            options: RuleOptions {
                active: true,
                severity: Severity::CodeSmell,
                debt: Debt::FiveMins,
            },
        }
    }
}

fn hint(lifecycle: bool) -> String {
    if lifecycle {
        "launch from viewModelScope or lifecycleScope so the coroutine is cancelled with its owner".into()
    } else {
        "launch from a scope whose owner cancels it, or wrap the work in coroutineScope { } inside a suspend function".into()
    }
}

impl Rule for GlobalScopeRule {
    fn id(&self) -> RuleId {
        RuleId::GlobalScope
    }

    fn description(&self) -> &'static str {
        "Avoid using GlobalScope"
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn configure(&mut self, config: &RuleConfig) {
        self.options.apply(config);
    }

    fn analyze(&self, cx: &AnalysisContext<'_>) -> Result<Vec<Finding>, RuleError> {
        let reporter = cx.reporter(self.id(), self.options);
        let lifecycle = cx.options.lifecycle_hint;
        sweep_launches(cx, |launch, lex| {
            let span = call_span(launch.site.call);
            match (&launch.origin, launch.lifetime) {
                (ScopeOrigin::Detached, _) => reporter
                    .finding(span, MESSAGE, Some(hint(lifecycle)))
                    .map(Some),
                // A builder block waits for everything launched inside it.
                (ScopeOrigin::Fresh { .. }, _) if !lex.enclosing_builder_entries().is_empty() => {
                    Ok(None)
                }
                (ScopeOrigin::Fresh { type_name }, ScopeLifetime::Unbounded) => {
                    let message = format!(
                        "Coroutine started on a freshly created '{}' that nothing cancels. Keep a reference to the scope and cancel it, or use a structured coroutine scope.",
                        catalog::simple_name(type_name)
                    );
                    reporter.finding(span, message, Some(hint(lifecycle))).map(Some)
                }
                _ => Ok(None),
            }
        })
    }
}
