#![forbid(unsafe_code)]

use crate::catalog;
use crate::classify::ScopeClassifier;
use crate::config::{RuleConfig, RuleOptions};
use crate::detect::{Launch, ScopeOrigin};
use crate::diagnostics::{Debt, Finding, Severity};
use crate::error::RuleError;
use crate::resolve::TypeResolver;
use crate::tracker::LexicalContext;

use super::{call_span, sweep_launches, AnalysisContext, Rule, RuleId};

/// Launches inside a suspend function that escape its structured scope: no
/// `coroutineScope { }` or `supervisorScope { }` between the launch and the
/// function.
#[derive(Clone, Debug)]
pub struct TopLevelCoroutineInSuspendFunRule {
    options: RuleOptions,
}

impl Default for TopLevelCoroutineInSuspendFunRule {
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

/// How the scope is named in the message, `None` when the launch is exempt.
fn scope_label(
    launch: &Launch<'_>,
    lex: &LexicalContext<'_>,
    classifier: ScopeClassifier<'_>,
    resolver: &dyn TypeResolver,
) -> Option<&'static str> {
    match &launch.origin {
        ScopeOrigin::Fresh { type_name } => {
            if catalog::simple_name(type_name) == "CoroutineScope" {
                Some("CoroutineScope()")
            } else {
                Some("[child of CoroutineScope]")
            }
        }
        ScopeOrigin::Parameter { provable, .. } => {
            provable.then_some("[CoroutineScope parameter]")
        }
        ScopeOrigin::Detached => Some("GlobalScope"),
        ScopeOrigin::Value(ty) => {
            if ty.qualified_name() == catalog::COROUTINE_SCOPE {
                Some("[CoroutineScope value]")
            } else {
                Some("[child of CoroutineScope]")
            }
        }
        ScopeOrigin::Named(name) => {
            if classifier.registry().contains_simple(name) {
                Some("[child of CoroutineScope]")
            } else {
                Some("[CoroutineScope value]")
            }
        }
        ScopeOrigin::Implicit => {
            (lex.lambda_depth() == 0 && implicit_scope(lex, classifier, resolver))
                .then_some("[CoroutineScope receiver]")
        }
        ScopeOrigin::Unknown => None,
    }
}

/// The enclosing function has a scope extension receiver, or is a member of
/// a scope class.
fn implicit_scope(
    lex: &LexicalContext<'_>,
    classifier: ScopeClassifier<'_>,
    resolver: &dyn TypeResolver,
) -> bool {
    let Some(function) = lex.enclosing_function() else {
        return false;
    };
    if let Some(receiver) = &function.receiver {
        return match resolver.resolve_type_ref(receiver) {
            Some(ty) => classifier.is_scope_type(&ty),
            None => receiver
                .written_name()
                .is_some_and(|w| classifier.is_scope_name(&w)),
        };
    }
    lex.enclosing_class().is_some_and(|class| {
        classifier.registry().contains_simple(&class.name.node)
            || class
                .supertypes
                .iter()
                .filter_map(|s| s.ty.written_name())
                .any(|w| classifier.is_scope_name(&w))
    })
}

impl Rule for TopLevelCoroutineInSuspendFunRule {
    fn id(&self) -> RuleId {
        RuleId::TopLevelCoroutineInSuspendFun
    }

    fn description(&self) -> &'static str {
        "Avoid running top level coroutines inside suspend functions"
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn configure(&mut self, config: &RuleConfig) {
        self.options.apply(config);
    }

    fn analyze(&self, cx: &AnalysisContext<'_>) -> Result<Vec<Finding>, RuleError> {
        let reporter = cx.reporter(self.id(), self.options);
        let classifier = cx.classifier();
        let resolver = cx.resolver;
        sweep_launches(cx, |launch, lex| {
            if !lex.is_suspending() || !lex.enclosing_builder_entries().is_empty() {
                return Ok(None);
            }
            let Some(label) = scope_label(launch, lex, classifier, resolver) else {
                return Ok(None);
            };
            let callee = &launch.site.call.name.node;
            reporter
                .finding(
                    call_span(launch.site.call),
                    format!("Detect {label}.{callee} in suspend function"),
                    Some("wrap the launch in coroutineScope { } so the suspend function waits for it and propagates its failure".into()),
                )
                .map(Some)
        })
    }
}
