#![forbid(unsafe_code)]

use crate::catalog;
use crate::config::AnalysisOptions;
use crate::detect::ScopeOrigin;
use crate::registry::ScopeRegistry;
use crate::resolve::TypeDescriptor;

/// Well-known lifecycle-bound scope properties, matched textually.
const BOUNDED_SCOPE_NAMES: &[&str] = &["viewModelScope", "lifecycleScope"];

/// How long the tasks of a scope may outlive their launcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeLifetime {
    /// Process lifetime; nothing ever cancels its tasks.
    Detached,
    /// Cancelled with a component lifecycle.
    Bounded,
    /// Owned by the caller; the analyzer cannot see it.
    External,
    Unbounded,
}

/// Decides what is a scope and whether it is bounded.
#[derive(Clone, Copy, Debug)]
pub struct ScopeClassifier<'a> {
    registry: &'a ScopeRegistry,
    bounded: &'a [String],
}

impl<'a> ScopeClassifier<'a> {
    pub fn new(registry: &'a ScopeRegistry, options: &'a AnalysisOptions) -> Self {
        Self {
            registry,
            bounded: &options.bounded_scopes,
        }
    }

    pub fn registry(&self) -> &'a ScopeRegistry {
        self.registry
    }

    pub fn is_scope_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is_subtype_of(catalog::COROUTINE_SCOPE)
            || self.registry.contains(ty.qualified_name())
            || self.registry.contains_simple(ty.simple_name())
    }

    /// Textual counterpart of [`Self::is_scope_type`] for unresolved names.
    pub fn is_scope_name(&self, written: &str) -> bool {
        self.registry.names_scope(written)
    }

    pub fn is_detached(&self, ty: &TypeDescriptor) -> bool {
        ty.qualified_name() == catalog::GLOBAL_SCOPE
    }

    pub fn is_bounded_scope(&self, name: &str) -> bool {
        catalog::BOUNDED_SCOPE_PROPERTIES.contains(&name)
            || name == catalog::LIFECYCLE_SCOPE
            || BOUNDED_SCOPE_NAMES.contains(&name)
            || self.bounded.iter().any(|b| b == name)
    }

    pub fn lifetime(&self, origin: &ScopeOrigin) -> ScopeLifetime {
        let bounded_or_not = |name: &str| {
            if self.is_bounded_scope(name) {
                ScopeLifetime::Bounded
            } else {
                ScopeLifetime::Unbounded
            }
        };
        match origin {
            ScopeOrigin::Detached => ScopeLifetime::Detached,
            ScopeOrigin::Fresh { type_name } => bounded_or_not(type_name),
            ScopeOrigin::Value(ty) => bounded_or_not(ty.qualified_name()),
            ScopeOrigin::Named(name) => bounded_or_not(name),
            ScopeOrigin::Parameter { .. } | ScopeOrigin::Implicit | ScopeOrigin::Unknown => {
                ScopeLifetime::External
            }
        }
    }
}
