//! Type-caster table: which header provides the caster for a type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Type-caster declarations as written in a package config.
///
/// ```toml
/// [type_casters]
/// "units_caster.h" = ["units::meter_t", "units::second_t"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CasterConfig {
    /// Header path → type names it provides casters for.
    pub type_casters: IndexMap<String, Vec<String>>,
}

impl CasterConfig {
    /// Load caster declarations from a TOML file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CasterConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Lookup table from type name to the header providing its caster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasterTable {
    headers: IndexMap<String, String>,
}

impl CasterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from one or more caster configs, later configs
    /// overriding earlier ones.
    ///
    /// Every qualified name is also registered under its last path
    /// component, so `units::meter_t` matches a bare `meter_t`. Explicit
    /// entries always win over derived ones.
    pub fn from_configs<'a>(configs: impl IntoIterator<Item = &'a CasterConfig>) -> Self {
        let mut table = Self::new();
        for config in configs {
            for (header, types) in &config.type_casters {
                for ty in types {
                    table.insert(ty, header);
                }
            }
        }

        let derived: Vec<(String, String)> = table
            .headers
            .iter()
            .filter_map(|(ty, header)| {
                let short = ty.rsplit("::").next()?;
                (short != ty).then(|| (short.to_string(), header.clone()))
            })
            .collect();
        for (short, header) in derived {
            table.headers.entry(short).or_insert(header);
        }
        table
    }

    /// Register `ty` as provided by `header`.
    pub fn insert(&mut self, ty: &str, header: &str) {
        self.headers.insert(ty.to_string(), header.to_string());
    }

    /// Header providing the caster for `ty`, if any.
    pub fn header_for(&self, ty: &str) -> Option<&str> {
        self.headers.get(ty).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unqualified_names_derived() {
        let config: CasterConfig = toml::from_str(
            r#"
[type_casters]
"units_caster.h" = ["units::meter_t"]
"span_caster.h" = ["wpi::span"]
            "#,
        )
        .unwrap();

        let table = CasterTable::from_configs([&config]);
        assert_eq!(table.header_for("units::meter_t"), Some("units_caster.h"));
        assert_eq!(table.header_for("meter_t"), Some("units_caster.h"));
        assert_eq!(table.header_for("span"), Some("span_caster.h"));
        assert_eq!(table.header_for("vector"), None);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_explicit_entry_wins_over_derived() {
        let mut config = CasterConfig::default();
        config
            .type_casters
            .insert("a.h".to_string(), vec!["ns::Thing".to_string()]);
        config
            .type_casters
            .insert("b.h".to_string(), vec!["Thing".to_string()]);

        let table = CasterTable::from_configs([&config]);
        assert_eq!(table.header_for("Thing"), Some("b.h"));
        assert_eq!(table.header_for("ns::Thing"), Some("a.h"));
    }
}
