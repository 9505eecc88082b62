#![forbid(unsafe_code)]

use std::collections::{BTreeSet, HashMap};

use scopecheck_ast::{Expr, TypeRef};

use crate::catalog;

/// Static type of an expression: canonical qualified name plus the
/// transitive supertype set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    supertypes: Vec<String>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, supertypes: impl IntoIterator<Item = String>) -> Self {
        let name = name.into();
        let mut supertypes: Vec<String> = supertypes
            .into_iter()
            .filter(|s| *s != name)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        supertypes.shrink_to_fit();
        Self { name, supertypes }
    }

    pub fn qualified_name(&self) -> &str {
        &self.name
    }

    pub fn simple_name(&self) -> &str {
        catalog::simple_name(&self.name)
    }

    /// Transitive supertypes, sorted, excluding the type itself.
    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    /// The type itself or any of its supertypes is `qualified`.
    pub fn is_subtype_of(&self, qualified: &str) -> bool {
        self.name == qualified || self.supertypes.iter().any(|s| s == qualified)
    }
}

/// Source of static type information for one unit.
///
/// Implementations fail open: `None` means "unknown", and callers fall back
/// to textual matching.
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, expr: &Expr) -> Option<TypeDescriptor>;

    /// Resolves a written type (parameter, receiver or property type).
    fn resolve_type_ref(&self, ty: &TypeRef) -> Option<TypeDescriptor> {
        let _ = ty;
        None
    }

    /// Whether this resolver ever answers; `false` for lint-only passes.
    fn is_available(&self) -> bool {
        true
    }
}

/// Lint-only resolver: nothing resolves.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnresolvedTypes;

impl TypeResolver for UnresolvedTypes {
    fn resolve(&self, _expr: &Expr) -> Option<TypeDescriptor> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Known types and their direct supertypes: the runtime catalog plus
/// classes declared in the analyzed unit.
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    local: HashMap<String, Vec<String>>,
}

impl TypeTable {
    pub fn declare(&mut self, name: String, supertypes: Vec<String>) {
        self.local.insert(name, supertypes);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.local.contains_key(name) || catalog::is_known_type(name)
    }

    fn direct(&self, name: &str) -> Vec<String> {
        if let Some(local) = self.local.get(name) {
            return local.clone();
        }
        catalog::direct_supertypes(name)
            .map(|s| s.iter().map(|n| n.to_string()).collect())
            .unwrap_or_default()
    }

    /// Descriptor with the transitive supertype closure; cycles in local
    /// declarations terminate.
    pub fn descriptor(&self, name: &str) -> Option<TypeDescriptor> {
        if !self.contains(name) {
            return None;
        }
        let mut seen = BTreeSet::new();
        let mut work = self.direct(name);
        while let Some(next) = work.pop() {
            if next == name || !seen.insert(next.clone()) {
                continue;
            }
            work.extend(self.direct(&next));
        }
        Some(TypeDescriptor::new(name, seen))
    }
}
