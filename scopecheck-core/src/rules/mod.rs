#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use scopecheck_ast::{span_between, span_end, CallView, SourceUnit, Span};

use crate::classify::ScopeClassifier;
use crate::config::{AnalysisOptions, RuleConfig, RuleOptions};
use crate::detect::{CallClass, Launch, LaunchDetector};
use crate::diagnostics::{Finding, Reporter};
use crate::error::{RuleError, UnknownRuleId};
use crate::registry::ScopeRegistry;
use crate::resolve::TypeResolver;
use crate::tracker::{walk_unit, LexicalContext, Visitor};

mod global_scope;
mod top_level;
mod without_dispatcher;

pub use global_scope::GlobalScopeRule;
pub use top_level::TopLevelCoroutineInSuspendFunRule;
pub use without_dispatcher::CoroutineWithoutDispatcherRule;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleId {
    GlobalScope,
    CoroutineWithoutDispatcher,
    TopLevelCoroutineInSuspendFun,
}

impl RuleId {
    pub const ALL: [RuleId; 3] = [
        RuleId::GlobalScope,
        RuleId::CoroutineWithoutDispatcher,
        RuleId::TopLevelCoroutineInSuspendFun,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::GlobalScope => "GlobalScopeRule",
            RuleId::CoroutineWithoutDispatcher => "CoroutineWithoutDispatcherRule",
            RuleId::TopLevelCoroutineInSuspendFun => "TopLevelCoroutineInSuspendFunRule",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = UnknownRuleId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownRuleId(s.to_string()))
    }
}

/// Everything a rule may look at for one unit.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub unit: &'a SourceUnit,
    pub file: &'a str,
    pub resolver: &'a dyn TypeResolver,
    pub registry: &'a ScopeRegistry,
    pub options: &'a AnalysisOptions,
}

impl<'a> AnalysisContext<'a> {
    pub fn classifier(&self) -> ScopeClassifier<'a> {
        ScopeClassifier::new(self.registry, self.options)
    }

    pub fn detector(&self) -> LaunchDetector<'a> {
        LaunchDetector::new(self.resolver, self.classifier())
    }

    pub fn reporter(&self, id: RuleId, options: RuleOptions) -> Reporter<'a> {
        Reporter {
            rule_id: id.as_str(),
            severity: options.severity,
            debt: options.debt,
            file: self.file,
        }
    }
}

/// A structured-concurrency check.
///
/// `analyze` is a pure function of the context; rules keep no state between
/// calls besides their options.
pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;

    fn description(&self) -> &'static str;

    fn options(&self) -> RuleOptions;

    fn configure(&mut self, config: &RuleConfig);

    fn analyze(&self, cx: &AnalysisContext<'_>) -> Result<Vec<Finding>, RuleError>;
}

/// The shipped rule set with default options.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(GlobalScopeRule::default()),
        Box::new(CoroutineWithoutDispatcherRule::default()),
        Box::new(TopLevelCoroutineInSuspendFunRule::default()),
    ]
}

/// From the callee name to the end of the call: `launch(..) { .. }` without
/// its receiver.
pub(crate) fn call_span(call: CallView<'_>) -> Span {
    span_between(call.name.span.offset(), span_end(call.expr.span))
}

/// Runs `check` on every launch site of the unit, stopping at the first error.
pub(crate) fn sweep_launches<'a, F>(cx: &AnalysisContext<'a>, check: F) -> Result<Vec<Finding>, RuleError>
where
    F: FnMut(&Launch<'a>, &LexicalContext<'a>) -> Result<Option<Finding>, RuleError>,
{
    let mut sweep = Sweep {
        detector: cx.detector(),
        check,
        findings: Vec::new(),
        error: None,
    };
    walk_unit(cx.unit, &mut sweep);
    match sweep.error {
        Some(err) => Err(err),
        None => Ok(sweep.findings),
    }
}

struct Sweep<'a, F> {
    detector: LaunchDetector<'a>,
    check: F,
    findings: Vec<Finding>,
    error: Option<RuleError>,
}

impl<'a, F> Visitor<'a> for Sweep<'a, F>
where
    F: FnMut(&Launch<'a>, &LexicalContext<'a>) -> Result<Option<Finding>, RuleError>,
{
    fn visit_call(&mut self, call: CallView<'a>, lex: &LexicalContext<'a>) {
        if self.error.is_some() {
            return;
        }
        if let CallClass::DirectLaunch(launch) = self.detector.classify(call, lex) {
            match (self.check)(&launch, lex) {
                Ok(Some(finding)) => self.findings.push(finding),
                Ok(None) => {}
                Err(err) => self.error = Some(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_ids_parse_back() {
        for id in RuleId::ALL {
            assert_eq!(id.as_str().parse::<RuleId>().unwrap(), id);
        }
        let err = "NoSuchRule".parse::<RuleId>().unwrap_err();
        assert_eq!(err.0, "NoSuchRule");
    }

    #[test]
    fn default_rules_cover_every_id_once() {
        let ids: Vec<_> = default_rules().iter().map(|r| r.id()).collect();
        assert_eq!(ids, RuleId::ALL.to_vec());
    }
}
