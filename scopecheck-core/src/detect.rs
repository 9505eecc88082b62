#![forbid(unsafe_code)]

use scopecheck_ast::{CallView, Expr, ExprKind};

use crate::catalog;
use crate::classify::{ScopeClassifier, ScopeLifetime};
use crate::resolve::{TypeDescriptor, TypeResolver};
use crate::tracker::{builder_kind, BuilderKind, LexicalContext};

/// Receiver-less names that denote lifecycle-bound scopes.
const WELL_KNOWN_SCOPES: &[&str] = &["viewModelScope", "lifecycleScope"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchKind {
    Launch,
    Async,
    /// `flow.launchIn(scope)`.
    StreamSubscribe,
}

impl LaunchKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "launch" => Some(LaunchKind::Launch),
            "async" => Some(LaunchKind::Async),
            "launchIn" => Some(LaunchKind::StreamSubscribe),
            _ => None,
        }
    }
}

/// How the scope of a launch site was identified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeOrigin {
    /// The process-wide `GlobalScope` singleton.
    Detached,
    /// A scope constructed inline (`CoroutineScope(ctx).launch {}`).
    Fresh { type_name: String },
    /// A parameter of the enclosing function; `provable` when its declared
    /// type is the base scope or a known subtype.
    Parameter { name: String, provable: bool },
    /// Any other expression whose type resolved to a scope.
    Value(TypeDescriptor),
    /// Unresolved name matched textually against well-known or registered scopes.
    Named(String),
    /// No receiver: the implicit `this` scope.
    Implicit,
    Unknown,
}

#[derive(Clone, Copy, Debug)]
pub struct LaunchSite<'a> {
    pub call: CallView<'a>,
    pub kind: LaunchKind,
    /// Receiver for `launch`/`async`, the argument for `launchIn`.
    pub scope: Option<&'a Expr>,
}

/// A launch site with its classified scope.
#[derive(Clone, Debug)]
pub struct Launch<'a> {
    pub site: LaunchSite<'a>,
    pub origin: ScopeOrigin,
    pub lifetime: ScopeLifetime,
}

#[derive(Clone, Debug)]
pub enum CallClass<'a> {
    NotALaunch,
    DirectLaunch(Launch<'a>),
    BuilderEntry(BuilderKind),
}

/// Recognizes launch sites: semantic classification of the scope when the
/// resolver answers, textual matching otherwise, never both for one site.
#[derive(Clone, Copy)]
pub struct LaunchDetector<'a> {
    resolver: &'a dyn TypeResolver,
    classifier: ScopeClassifier<'a>,
}

impl<'a> LaunchDetector<'a> {
    pub fn new(resolver: &'a dyn TypeResolver, classifier: ScopeClassifier<'a>) -> Self {
        Self {
            resolver,
            classifier,
        }
    }

    pub fn resolver(&self) -> &'a dyn TypeResolver {
        self.resolver
    }

    pub fn classifier(&self) -> ScopeClassifier<'a> {
        self.classifier
    }

    pub fn classify<'u>(&self, call: CallView<'u>, cx: &LexicalContext<'u>) -> CallClass<'u> {
        if let Some(kind) = builder_kind(call) {
            return CallClass::BuilderEntry(kind);
        }
        let Some(kind) = LaunchKind::from_name(&call.name.node) else {
            return CallClass::NotALaunch;
        };

        let scope = match kind {
            LaunchKind::Launch | LaunchKind::Async => {
                if call.body_lambda().is_none() {
                    return CallClass::NotALaunch;
                }
                call.receiver
            }
            LaunchKind::StreamSubscribe => {
                let Some(flow) = call.receiver else {
                    return CallClass::NotALaunch;
                };
                if let Some(ty) = self.resolver.resolve(flow) {
                    if !ty.is_subtype_of(catalog::FLOW) {
                        return CallClass::NotALaunch;
                    }
                }
                match call.value_args().next() {
                    Some(arg) => Some(arg),
                    None => return CallClass::NotALaunch,
                }
            }
        };

        let origin = match scope {
            None => ScopeOrigin::Implicit,
            Some(e) => match self.origin(e, cx) {
                Some(o) => o,
                None => return CallClass::NotALaunch,
            },
        };
        let lifetime = self.classifier.lifetime(&origin);
        CallClass::DirectLaunch(Launch {
            site: LaunchSite { call, kind, scope },
            origin,
            lifetime,
        })
    }

    /// `None` when the scope expression resolved to something that is not a scope.
    fn origin<'u>(&self, scope: &'u Expr, cx: &LexicalContext<'u>) -> Option<ScopeOrigin> {
        let scope = scope.unparen();
        match self.resolver.resolve(scope) {
            Some(ty) => self.resolved_origin(scope, ty, cx),
            None => Some(self.textual_origin(scope, cx)),
        }
    }

    fn resolved_origin(
        &self,
        scope: &Expr,
        ty: TypeDescriptor,
        cx: &LexicalContext<'_>,
    ) -> Option<ScopeOrigin> {
        if !self.classifier.is_scope_type(&ty) {
            return None;
        }
        if self.classifier.is_detached(&ty) {
            return Some(ScopeOrigin::Detached);
        }
        match &scope.kind {
            ExprKind::Call { callee, .. } if matches!(callee.kind, ExprKind::Name(_)) => {
                Some(ScopeOrigin::Fresh {
                    type_name: ty.qualified_name().to_string(),
                })
            }
            ExprKind::Name(n) if is_parameter(cx, &n.node) => Some(ScopeOrigin::Parameter {
                name: n.node.clone(),
                provable: true,
            }),
            _ => Some(ScopeOrigin::Value(ty)),
        }
    }

    fn textual_origin(&self, scope: &Expr, cx: &LexicalContext<'_>) -> ScopeOrigin {
        match &scope.kind {
            ExprKind::Name(n) => {
                let name = n.node.as_str();
                if name == "GlobalScope" {
                    return ScopeOrigin::Detached;
                }
                if let Some(param) = cx.enclosing_function().and_then(|f| f.params.find(name)) {
                    let provable = param
                        .ty
                        .as_ref()
                        .and_then(|t| t.written_name())
                        .is_some_and(|w| self.classifier.is_scope_name(&w));
                    return ScopeOrigin::Parameter {
                        name: name.to_string(),
                        provable,
                    };
                }
                if WELL_KNOWN_SCOPES.contains(&name) || self.classifier.registry().contains_simple(name)
                {
                    return ScopeOrigin::Named(name.to_string());
                }
                ScopeOrigin::Unknown
            }
            ExprKind::Call { callee, .. } => {
                let Some(path) = callee.dotted_path() else {
                    return ScopeOrigin::Unknown;
                };
                let simple = catalog::simple_name(&path).to_string();
                match simple.as_str() {
                    "CoroutineScope" | "MainScope" => ScopeOrigin::Fresh {
                        type_name: catalog::COROUTINE_SCOPE.to_string(),
                    },
                    s if self.classifier.registry().contains_simple(s) => ScopeOrigin::Fresh {
                        type_name: path,
                    },
                    _ => ScopeOrigin::Unknown,
                }
            }
            ExprKind::Member { member, .. } => {
                let path = scope.dotted_path();
                if path.as_deref() == Some(catalog::GLOBAL_SCOPE) {
                    return ScopeOrigin::Detached;
                }
                if WELL_KNOWN_SCOPES.contains(&member.node.as_str()) {
                    return ScopeOrigin::Named(member.node.clone());
                }
                ScopeOrigin::Unknown
            }
            _ => ScopeOrigin::Unknown,
        }
    }
}

fn is_parameter(cx: &LexicalContext<'_>, name: &str) -> bool {
    cx.enclosing_function()
        .is_some_and(|f| f.params.find(name).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingContext;
    use crate::config::AnalysisOptions;
    use crate::registry::ScopeRegistry;
    use crate::resolve::UnresolvedTypes;
    use crate::tracker::{walk_unit, Visitor};
    use scopecheck_ast::SourceUnit;

    struct Origins<'d> {
        detector: LaunchDetector<'d>,
        out: Vec<(String, Option<ScopeOrigin>)>,
    }

    impl<'a> Visitor<'a> for Origins<'_> {
        fn visit_call(&mut self, call: CallView<'a>, cx: &LexicalContext<'a>) {
            match self.detector.classify(call, cx) {
                CallClass::DirectLaunch(l) => self.out.push((call.name.node.clone(), Some(l.origin))),
                CallClass::BuilderEntry(_) => self.out.push((call.name.node.clone(), None)),
                CallClass::NotALaunch => {}
            }
        }
    }

    fn origins(unit: &SourceUnit, resolver: &dyn TypeResolver) -> Vec<(String, Option<ScopeOrigin>)> {
        let registry = ScopeRegistry::collect([unit]);
        let options = AnalysisOptions::default();
        let detector = LaunchDetector::new(resolver, ScopeClassifier::new(&registry, &options));
        let mut v = Origins {
            detector,
            out: Vec::new(),
        };
        walk_unit(unit, &mut v);
        v.out
    }

    fn parse(src: &str) -> SourceUnit {
        scopecheck_parse::parse_source(src).expect("parse")
    }

    #[test]
    fn launch_requires_a_body() {
        let unit = parse("fun f(launcher: Launcher) {\n    launcher.launch(input)\n}\n");
        assert!(origins(&unit, &UnresolvedTypes).is_empty());
    }

    #[test]
    fn textual_fallback_classifies_receivers() {
        let unit = parse(
            "interface CoScope : CoroutineScope\n\nfun f(scope: CoroutineScope, other: Foo) {\n    GlobalScope.launch { }\n    CoroutineScope(Dispatchers.IO).launch { }\n    CoScope(Dispatchers.IO).async { }\n    scope.launch { }\n    other.launch { }\n    viewModelScope.launch { }\n    launch { }\n    coroutineScope { }\n}\n",
        );
        let out = origins(&unit, &UnresolvedTypes);
        let got: Vec<_> = out.into_iter().map(|(_, o)| o).collect();
        assert_eq!(
            got,
            vec![
                Some(ScopeOrigin::Detached),
                Some(ScopeOrigin::Fresh {
                    type_name: catalog::COROUTINE_SCOPE.into()
                }),
                Some(ScopeOrigin::Fresh {
                    type_name: "CoScope".into()
                }),
                Some(ScopeOrigin::Parameter {
                    name: "scope".into(),
                    provable: true
                }),
                Some(ScopeOrigin::Parameter {
                    name: "other".into(),
                    provable: false
                }),
                Some(ScopeOrigin::Named("viewModelScope".into())),
                Some(ScopeOrigin::Implicit),
                None,
            ]
        );
    }

    #[test]
    fn resolved_non_scope_receivers_are_not_launches() {
        let unit = parse(
            "import kotlinx.coroutines.*\n\nfun f(job: Job, scope: CoroutineScope) {\n    job.launch { }\n    scope.launch { }\n}\n",
        );
        let ctx = BindingContext::build(&unit);
        let out = origins(&unit, &ctx);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].1,
            Some(ScopeOrigin::Parameter {
                name: "scope".into(),
                provable: true
            })
        );
    }

    #[test]
    fn launch_in_takes_its_scope_argument() {
        let unit = parse(
            "import kotlinx.coroutines.*\nimport kotlinx.coroutines.flow.*\n\nsuspend fun f() {\n    flowOf(1).launchIn(CoroutineScope(Dispatchers.Main))\n}\n",
        );
        let ctx = BindingContext::build(&unit);
        let out = origins(&unit, &ctx);
        assert_eq!(out[0].0, "launchIn");
        assert_eq!(
            out[0].1,
            Some(ScopeOrigin::Fresh {
                type_name: catalog::COROUTINE_SCOPE.into()
            })
        );
    }

    #[test]
    fn resolved_global_scope_is_detached() {
        let unit = parse(
            "import kotlinx.coroutines.GlobalScope\n\nval g = GlobalScope\n\nfun f() {\n    g.launch { }\n}\n",
        );
        let ctx = BindingContext::build(&unit);
        let out = origins(&unit, &ctx);
        assert_eq!(out[0].1, Some(ScopeOrigin::Detached));
    }
}
