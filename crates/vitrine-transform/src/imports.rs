//! Bare-import resolution table.
//!
//! Example modules import by short name (`"vane"`, `"demo-api"`). The host
//! registers, at startup, which specifiers exist, what each resolves to, and
//! which names it exports. The table is populated once and never mutated
//! afterwards; the transformer only reads it.

use std::collections::BTreeMap;

/// Where a bare specifier points after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleTarget {
    /// The resolved specifier written into the compiled module — the key the
    /// realm's module registry is indexed by.
    pub resolved: String,
    /// Names this module exports, for compile-time export checking.
    pub exports: Vec<String>,
}

/// Mapping of bare import specifiers to resolvable module targets.
#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    entries: BTreeMap<String, ModuleTarget>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a specifier. Later registrations replace earlier ones.
    pub fn insert(
        &mut self,
        specifier: impl Into<String>,
        resolved: impl Into<String>,
        exports: Vec<String>,
    ) {
        self.entries.insert(
            specifier.into(),
            ModuleTarget {
                resolved: resolved.into(),
                exports,
            },
        );
    }

    /// Look up a bare specifier.
    pub fn resolve(&self, specifier: &str) -> Option<&ModuleTarget> {
        self.entries.get(specifier)
    }

    /// Registered specifiers, in stable order.
    pub fn specifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
