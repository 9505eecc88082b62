#![forbid(unsafe_code)]

mod binding;
pub mod catalog;
mod classify;
mod config;
mod detect;
mod diagnostics;
mod dispatcher;
mod engine;
mod error;
mod registry;
mod resolve;
pub mod rules;
mod tracker;

pub use binding::BindingContext;
pub use classify::{ScopeClassifier, ScopeLifetime};
pub use config::{AnalysisOptions, RuleConfig, RuleOptions};
pub use detect::{CallClass, Launch, LaunchDetector, LaunchKind, LaunchSite, ScopeOrigin};
pub use diagnostics::{Debt, Finding, Reporter, Severity};
pub use dispatcher::has_explicit_context;
pub use engine::{Engine, Report, RuleFault, SourceInput};
pub use error::{RuleError, UnknownRuleId};
pub use registry::ScopeRegistry;
pub use resolve::{TypeDescriptor, TypeResolver, TypeTable, UnresolvedTypes};
pub use rules::{
    AnalysisContext, CoroutineWithoutDispatcherRule, GlobalScopeRule, Rule, RuleId,
    TopLevelCoroutineInSuspendFunRule,
};
pub use tracker::{builder_kind, is_suspending, walk_unit, BuilderKind, Frame, LexicalContext, Visitor};
