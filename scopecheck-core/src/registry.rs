#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::sync::OnceLock;

use scopecheck_ast::{ClassDecl, Decl, FunctionBody, SourceUnit, Stmt};
use tracing::debug;

use crate::catalog;
use crate::resolve::TypeTable;

/// Declared scope subtypes of one analysis run.
///
/// Built once by [`ScopeRegistry::collect`] before detection starts and only
/// read afterwards; a new run starts from an empty registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeRegistry {
    qualified: BTreeSet<String>,
    simple: BTreeSet<String>,
}

struct Candidate {
    qualified: String,
    simple: String,
    /// Supertype names as written.
    supertypes: Vec<String>,
}

impl ScopeRegistry {
    /// Declaration pre-pass: records every class, interface or object whose
    /// supertype list names the base scope or an already recorded subtype,
    /// iterated until nothing new is found.
    pub fn collect<'a>(units: impl IntoIterator<Item = &'a SourceUnit>) -> Self {
        let mut candidates = Vec::new();
        for unit in units {
            let prefix = unit.package_name();
            gather(&unit.decls, &prefix, &mut candidates);
            for stmt in &unit.statements {
                if let Stmt::Decl(d) = stmt {
                    gather(std::slice::from_ref(d), &prefix, &mut candidates);
                }
            }
        }

        let mut registry = Self::default();
        loop {
            let mut changed = false;
            for c in &candidates {
                if registry.qualified.contains(&c.qualified) {
                    continue;
                }
                if c.supertypes.iter().any(|s| registry.names_scope(s)) {
                    registry.qualified.insert(c.qualified.clone());
                    registry.simple.insert(c.simple.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        debug!(
            "scope registry: {} subtype(s) from {} declaration(s): {:?}",
            registry.qualified.len(),
            candidates.len(),
            registry.qualified
        );
        registry
    }

    /// Whether a written type name denotes the base scope, a runtime scope
    /// subtype or a recorded subtype.
    pub fn names_scope(&self, written: &str) -> bool {
        is_runtime_scope(written)
            || self.qualified.contains(written)
            || self.simple.contains(catalog::simple_name(written))
    }

    pub fn contains(&self, qualified: &str) -> bool {
        self.qualified.contains(qualified)
    }

    pub fn contains_simple(&self, simple: &str) -> bool {
        self.simple.contains(simple)
    }

    pub fn len(&self) -> usize {
        self.qualified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qualified.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.qualified.iter().map(String::as_str)
    }
}

/// Simple names of the runtime types that are scopes.
fn runtime_scopes() -> &'static BTreeSet<&'static str> {
    static SCOPES: OnceLock<BTreeSet<&'static str>> = OnceLock::new();
    SCOPES.get_or_init(|| {
        let table = TypeTable::default();
        catalog::TYPES
            .iter()
            .map(|(q, _)| *q)
            .filter(|q| {
                table
                    .descriptor(q)
                    .is_some_and(|d| d.is_subtype_of(catalog::COROUTINE_SCOPE))
            })
            .map(catalog::simple_name)
            .collect()
    })
}

/// Runtime types that are scopes, matched by qualified or simple name.
fn is_runtime_scope(written: &str) -> bool {
    runtime_scopes().contains(catalog::simple_name(written))
}

fn gather(decls: &[Decl], prefix: &str, out: &mut Vec<Candidate>) {
    for decl in decls {
        match decl {
            Decl::Class(class) => gather_class(class, prefix, out),
            Decl::Function(f) => {
                if let Some(FunctionBody::Block(body)) = &f.body {
                    for stmt in &body.stmts {
                        if let Stmt::Decl(d) = stmt {
                            gather(std::slice::from_ref(d), prefix, out);
                        }
                    }
                }
            }
            Decl::Property(_) => {}
        }
    }
}

fn gather_class(class: &ClassDecl, prefix: &str, out: &mut Vec<Candidate>) {
    let qualified = if prefix.is_empty() {
        class.name.node.clone()
    } else {
        format!("{prefix}.{}", class.name.node)
    };
    out.push(Candidate {
        qualified: qualified.clone(),
        simple: class.name.node.clone(),
        supertypes: class
            .supertypes
            .iter()
            .filter_map(|s| s.ty.written_name())
            .collect(),
    });
    gather(&class.members, &qualified, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SourceUnit {
        scopecheck_parse::parse_source(src).expect("parse")
    }

    #[test]
    fn runtime_scopes_match_by_simple_or_qualified_name() {
        assert!(is_runtime_scope("CoroutineScope"));
        assert!(is_runtime_scope(catalog::COROUTINE_SCOPE));
        assert!(is_runtime_scope("GlobalScope"));
        assert!(!is_runtime_scope("Job"));
        assert!(!is_runtime_scope("app.Repository"));
    }

    #[test]
    fn direct_subtypes_are_recorded() {
        let unit = parse("package app\n\ninterface CoScope : CoroutineScope {}\nclass Plain\n");
        let registry = ScopeRegistry::collect([&unit]);
        assert!(registry.contains("app.CoScope"));
        assert!(registry.contains_simple("CoScope"));
        assert!(!registry.contains_simple("Plain"));
    }

    #[test]
    fn subtypes_at_any_distance_across_units_and_order() {
        let leaf = parse("package b\n\nclass Leaf : Mid()\n");
        let mid = parse("package a\n\nopen class Mid : Base\n");
        let base = parse("package a\n\ninterface Base : kotlinx.coroutines.CoroutineScope\n");
        let registry = ScopeRegistry::collect([&leaf, &mid, &base]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("b.Leaf"));
    }

    #[test]
    fn nested_and_local_classes_are_visited() {
        let src = "class Outer {\n    class Inner : CoroutineScope by MainScope()\n}\n\nfun f() {\n    class Local : LifecycleCoroutineScope()\n}\n";
        let unit = parse(src);
        let registry = ScopeRegistry::collect([&unit]);
        assert!(registry.contains("Outer.Inner"));
        assert!(registry.contains("Local"));
    }

    #[test]
    fn each_run_starts_empty() {
        let unit = parse("class S : CoroutineScope\n");
        assert_eq!(ScopeRegistry::collect([&unit]).len(), 1);
        assert!(ScopeRegistry::collect(std::iter::empty()).is_empty());
    }
}
