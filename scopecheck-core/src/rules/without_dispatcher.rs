#![forbid(unsafe_code)]

use crate::config::{RuleConfig, RuleOptions};
use crate::detect::{LaunchKind, ScopeOrigin};
use crate::diagnostics::{Debt, Finding, Severity};
use crate::dispatcher::has_explicit_context;
use crate::error::RuleError;

use super::{call_span, sweep_launches, AnalysisContext, Rule, RuleId};

/// `launch`/`async` calls that do not pass a dispatcher.
///
/// Launches on `GlobalScope` are reported by [`super::GlobalScopeRule`] only.
#[derive(Clone, Debug)]
pub struct CoroutineWithoutDispatcherRule {
    options: RuleOptions,
}

impl Default for CoroutineWithoutDispatcherRule {
    fn default() -> Self {
        Self {
            options: RuleOptions {
                active: true,
                severity: Severity::Defect,
                debt: Debt::TwentyMins,
            },
        }
    }
}

impl Rule for CoroutineWithoutDispatcherRule {
    fn id(&self) -> RuleId {
        RuleId::CoroutineWithoutDispatcher
    }

    fn description(&self) -> &'static str {
        "Coroutine launch/async should explicitly specify a dispatcher"
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn configure(&mut self, config: &RuleConfig) {
        self.options.apply(config);
    }

    fn analyze(&self, cx: &AnalysisContext<'_>) -> Result<Vec<Finding>, RuleError> {
        let reporter = cx.reporter(self.id(), self.options);
        let resolver = cx.resolver;
        sweep_launches(cx, |launch, _| {
            if launch.site.kind == LaunchKind::StreamSubscribe
                || launch.origin == ScopeOrigin::Detached
                || has_explicit_context(launch.site.call, resolver)
            {
                return Ok(None);
            }
            let callee = &launch.site.call.name.node;
            reporter
                .finding(
                    call_span(launch.site.call),
                    format!("Call to '{callee}' should specify a dispatcher (e.g. Dispatchers.IO)"),
                    Some("pass a dispatcher such as Dispatchers.IO or Dispatchers.Default as the context argument".into()),
                )
                .map(Some)
        })
    }
}
