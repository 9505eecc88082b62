#![forbid(unsafe_code)]

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use scopecheck_ast::SourceUnit;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::binding::BindingContext;
use crate::config::{AnalysisOptions, RuleConfig};
use crate::diagnostics::Finding;
use crate::registry::ScopeRegistry;
use crate::resolve::{TypeResolver, UnresolvedTypes};
use crate::rules::{default_rules, AnalysisContext, Rule, RuleId};

/// One parsed file of a run.
#[derive(Clone, Debug)]
pub struct SourceInput {
    pub path: String,
    pub unit: SourceUnit,
}

impl SourceInput {
    pub fn new(path: impl Into<String>, unit: SourceUnit) -> Self {
        Self {
            path: path.into(),
            unit,
        }
    }
}

/// A rule that failed on one unit; the rest of the run is unaffected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFault {
    pub rule_id: String,
    pub file: String,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct Report {
    /// Sorted by file, start offset, end offset and rule id.
    pub findings: Vec<Finding>,
    pub faults: Vec<RuleFault>,
}

impl Report {
    pub fn count(&self, rule: RuleId) -> usize {
        self.findings
            .iter()
            .filter(|f| f.rule_id == rule.as_str())
            .count()
    }
}

pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
    options: AnalysisOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(AnalysisOptions::default())
    }
}

impl Engine {
    pub fn new(options: AnalysisOptions) -> Self {
        Self::with_rules(default_rules(), options)
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>, options: AnalysisOptions) -> Self {
        Self { rules, options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn configure_rule(&mut self, id: RuleId, config: &RuleConfig) {
        for rule in self.rules.iter_mut().filter(|r| r.id() == id) {
            rule.configure(config);
        }
    }

    /// Keeps only the listed rules; an empty list keeps all.
    pub fn restrict(&mut self, ids: &[RuleId]) {
        if !ids.is_empty() {
            self.rules.retain(|r| ids.contains(&r.id()));
        }
    }

    /// Declaration pre-pass, then parallel detection over all units.
    ///
    /// The registry lives for this call only.
    pub fn run(&self, inputs: &[SourceInput]) -> Report {
        let started = Instant::now();
        info!("Analyzing {} unit(s)", inputs.len());

        let registry = ScopeRegistry::collect(inputs.iter().map(|i| &i.unit));
        debug!("Registry holds {} scope subtype(s)", registry.len());

        let results: Vec<(Vec<Finding>, Vec<RuleFault>)> = inputs
            .par_iter()
            .map(|input| self.analyze_unit(input, &registry))
            .collect();

        let mut report = Report::default();
        for (findings, faults) in results {
            report.findings.extend(findings);
            report.faults.extend(faults);
        }
        report.findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        report.findings.dedup();

        info!(
            "Found {} finding(s), {} rule fault(s) in {:?}",
            report.findings.len(),
            report.faults.len(),
            started.elapsed()
        );
        report
    }

    /// Runs every active rule on one unit against an already collected registry.
    pub fn analyze_unit(
        &self,
        input: &SourceInput,
        registry: &ScopeRegistry,
    ) -> (Vec<Finding>, Vec<RuleFault>) {
        let started = Instant::now();
        let binding;
        let resolver: &dyn TypeResolver = if self.options.resolve_types {
            binding = BindingContext::build(&input.unit);
            &binding
        } else {
            &UnresolvedTypes
        };
        let cx = AnalysisContext {
            unit: &input.unit,
            file: &input.path,
            resolver,
            registry,
            options: &self.options,
        };

        let mut findings = Vec::new();
        let mut faults = Vec::new();
        for rule in self.rules.iter().filter(|r| r.options().active) {
            let id = rule.id();
            match catch_unwind(AssertUnwindSafe(|| rule.analyze(&cx))) {
                Ok(Ok(found)) => findings.extend(found),
                Ok(Err(e)) => {
                    error!("{} failed on {}: {}", id, input.path, e);
                    faults.push(RuleFault {
                        rule_id: id.as_str().to_string(),
                        file: input.path.clone(),
                        message: e.to_string(),
                    });
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "rule panicked".to_string());
                    error!("{} panicked on {}: {}", id, input.path, message);
                    faults.push(RuleFault {
                        rule_id: id.as_str().to_string(),
                        file: input.path.clone(),
                        message,
                    });
                }
            }
        }
        debug!(
            "{}: {} finding(s) in {:?}",
            input.path,
            findings.len(),
            started.elapsed()
        );
        (findings, faults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleOptions;
    use crate::diagnostics::{Debt, Severity};
    use crate::error::RuleError;

    struct Failing {
        panic: bool,
    }

    impl Rule for Failing {
        fn id(&self) -> RuleId {
            RuleId::GlobalScope
        }

        fn description(&self) -> &'static str {
            "fails"
        }

        fn options(&self) -> RuleOptions {
            RuleOptions {
                active: true,
                severity: Severity::Warning,
                debt: Debt::FiveMins,
            }
        }

        fn configure(&mut self, _config: &RuleConfig) {}

        fn analyze(&self, cx: &AnalysisContext<'_>) -> Result<Vec<Finding>, RuleError> {
            if self.panic {
                panic!("boom in {}", cx.file);
            }
            Err(RuleError::new("GlobalScopeRule", "broken"))
        }
    }

    fn input(path: &str, src: &str) -> SourceInput {
        SourceInput::new(path, scopecheck_parse::parse_source(src).expect("parse"))
    }

    #[test]
    fn faults_are_isolated_per_rule_and_unit() {
        let mut rules = default_rules();
        rules.push(Box::new(Failing { panic: false }));
        rules.push(Box::new(Failing { panic: true }));
        let engine = Engine::with_rules(rules, AnalysisOptions::default());
        let report = engine.run(&[
            input("a.kt", "fun a() {\n    GlobalScope.launch { }\n}\n"),
            input("b.kt", "fun b() {\n    GlobalScope.launch { }\n}\n"),
        ]);
        assert_eq!(report.count(RuleId::GlobalScope), 2);
        assert_eq!(report.faults.len(), 4);
        assert!(report.faults.iter().any(|f| f.message.contains("boom in a.kt")));
    }

    #[test]
    fn restrict_and_configure() {
        let mut engine = Engine::default();
        engine.restrict(&[RuleId::CoroutineWithoutDispatcher]);
        assert_eq!(engine.rules().count(), 1);
        engine.configure_rule(
            RuleId::CoroutineWithoutDispatcher,
            &RuleConfig {
                active: Some(false),
                ..RuleConfig::default()
            },
        );
        let report = engine.run(&[input("a.kt", "fun a(s: CoroutineScope) {\n    s.launch { }\n}\n")]);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn findings_are_sorted_by_file_then_offset() {
        let engine = Engine::default();
        let report = engine.run(&[
            input("b.kt", "fun b(s: CoroutineScope) {\n    s.launch { }\n}\n"),
            input("a.kt", "fun a(s: CoroutineScope) {\n    s.launch { }\n    s.async { }\n}\n"),
        ]);
        let keys: Vec<_> = report
            .findings
            .iter()
            .map(|f| (f.file.clone(), f.start_offset))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0].0, "a.kt");
    }
}
