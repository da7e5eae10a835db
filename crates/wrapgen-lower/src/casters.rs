//! Run-wide registry of types that may need a custom caster.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use wrapgen_config::CasterTable;

use crate::types::strip_template_args;

/// Every distinct raw type seen during a run.
///
/// Types are recorded eagerly and only resolved to include paths once the
/// run is complete, since the same type shows up many times.
#[derive(Debug, Clone, Default)]
pub struct TypeCasterRegistry {
    types: FxHashSet<String>,
}

impl TypeCasterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw type string.
    pub fn record(&mut self, ty: &str) {
        if !self.types.contains(ty) {
            self.types.insert(ty.to_string());
        }
    }

    pub fn contains(&self, ty: &str) -> bool {
        self.types.contains(ty)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Merge the types recorded by another registry (e.g. a worker's).
    pub fn merge(&mut self, other: TypeCasterRegistry) {
        self.types.extend(other.types);
    }

    /// Sorted, deduplicated caster headers required by the recorded types.
    pub fn resolve_includes(&self, table: &CasterTable) -> Vec<String> {
        let includes: BTreeSet<&str> = self
            .types
            .iter()
            .filter_map(|ty| table.header_for(strip_template_args(ty)))
            .collect();
        includes.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CasterTable {
        let mut table = CasterTable::new();
        table.insert("std::vector", "pybind11/stl.h");
        table.insert("std::function", "pybind11/functional.h");
        table.insert("units::meter_t", "units_caster.h");
        table
    }

    #[test]
    fn test_resolve_includes_sorted_and_deduplicated() {
        let mut registry = TypeCasterRegistry::new();
        registry.record("units::meter_t");
        registry.record("std::vector<int>");
        registry.record("std::vector<double>");
        registry.record("std::function<void()>");
        registry.record("int");
        registry.record("int");

        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.resolve_includes(&table()),
            vec!["pybind11/functional.h", "pybind11/stl.h", "units_caster.h"]
        );
    }

    #[test]
    fn test_merge() {
        let mut a = TypeCasterRegistry::new();
        a.record("std::vector<int>");
        let mut b = TypeCasterRegistry::new();
        b.record("units::meter_t");
        a.merge(b);

        assert!(a.contains("units::meter_t"));
        assert_eq!(a.resolve_includes(&table()).len(), 2);
    }

    #[test]
    fn test_empty_registry() {
        assert!(TypeCasterRegistry::new()
            .resolve_includes(&table())
            .is_empty());
    }
}
