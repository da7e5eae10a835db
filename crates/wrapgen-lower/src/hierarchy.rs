//! Base class resolution and the run-wide class hierarchy.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use wrapgen_config::ClassOverride;

use crate::decl::{BaseDecl, ClassDecl};
use crate::error::{LowerError, Result};
use crate::naming::mangle;
use crate::types::strip_template_args;

/// A base class after qualification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBase {
    /// Name as declared.
    pub name: String,
    pub qualname: String,
    pub qualname_mangled: String,
}

/// Join a namespace and a name; an empty namespace adds nothing.
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}::{name}")
    }
}

/// Qualified name of `base` as seen from a class in `namespace`.
///
/// An explicit `base_qualnames` entry wins; an unqualified base is assumed
/// to live in the derived class's namespace.
pub fn resolve_base_qualname(base: &BaseDecl, namespace: &str, data: &ClassOverride) -> String {
    if let Some(qualname) = data.base_qualnames.get(&base.name) {
        qualname.clone()
    } else if !base.name.contains("::") {
        qualify(namespace, &base.name)
    } else {
        base.name.clone()
    }
}

/// Declared bases minus `ignored_bases`, qualified.
///
/// Every ignored name must be a declared base.
pub fn filter_bases(class: &ClassDecl, data: &ClassOverride) -> Result<Vec<ResolvedBase>> {
    let mut ignored: IndexMap<&str, bool> = data
        .ignored_bases
        .iter()
        .map(|name| (name.as_str(), true))
        .collect();

    let bases = class
        .bases
        .iter()
        .filter(|base| ignored.shift_remove(base.name.as_str()).is_none())
        .map(|base| {
            let qualname = resolve_base_qualname(base, &class.namespace, data);
            ResolvedBase {
                name: base.name.clone(),
                qualname_mangled: mangle(&qualname),
                qualname,
            }
        })
        .collect();

    if !ignored.is_empty() {
        let invalid: Vec<&str> = ignored.keys().copied().collect();
        let valid: Vec<&str> = class.bases.iter().map(|b| b.name.as_str()).collect();
        return Err(LowerError::InvalidIgnoredBases {
            class: class.name.clone(),
            invalid: invalid.join(", "),
            valid: valid.join(", "),
        });
    }
    Ok(bases)
}

/// Whether host-language subclasses need a proxy class to override
/// virtual methods of `class`.
pub fn is_polymorphic(class: &ClassDecl, data: &ClassOverride) -> bool {
    data.is_polymorphic
        || !class.bases.is_empty()
        || class
            .methods
            .iter()
            .any(|m| m.function.is_virtual || m.function.is_override)
}

pub fn requires_trampoline(polymorphic: bool, is_final: bool, force_no_trampoline: bool) -> bool {
    polymorphic && !is_final && !force_no_trampoline
}

/// Qualified class name → qualified base names plus forced dependencies.
///
/// Accumulated over a whole run, in lowering order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClassHierarchy {
    graph: IndexMap<String, Vec<String>>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class; each qualified name may only be added once.
    pub fn insert(&mut self, qualname: String, deps: Vec<String>) -> Result<()> {
        if self.graph.contains_key(&qualname) {
            return Err(LowerError::DuplicateClass(qualname));
        }
        self.graph.insert(qualname, deps);
        Ok(())
    }

    pub fn get(&self, qualname: &str) -> Option<&[String]> {
        self.graph.get(qualname).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.graph.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Merge a graph built by another worker.
    pub fn merge(&mut self, other: ClassHierarchy) -> Result<()> {
        for (qualname, deps) in other.graph {
            self.insert(qualname, deps)?;
        }
        Ok(())
    }
}

/// Order in which header modules must be initialised so that base classes
/// are registered before the classes deriving from them.
///
/// Headers without classes come first, in input order. The rest are sorted
/// in dependency layers, each layer ordered by name. Dependencies on
/// classes no header defines are ignored.
pub fn init_order(headers: &[(String, &ClassHierarchy)]) -> Result<Vec<String>> {
    let mut ordering = Vec::new();
    let mut owner: FxHashMap<&str, &str> = FxHashMap::default();

    for (header, hierarchy) in headers {
        if hierarchy.is_empty() {
            ordering.push(header.clone());
        }
        for (qualname, _) in hierarchy.iter() {
            let class = strip_template_args(qualname);
            if let Some(first) = owner.insert(class, header.as_str()) {
                return Err(LowerError::DuplicateHeaderClass {
                    class: class.to_string(),
                    first: first.to_string(),
                    second: header.clone(),
                });
            }
        }
    }

    let mut deps: IndexMap<&str, FxHashSet<&str>> = IndexMap::new();
    for (header, hierarchy) in headers {
        for (_, bases) in hierarchy.iter() {
            let entry = deps.entry(header.as_str()).or_default();
            for base in bases {
                match owner.get(strip_template_args(base)) {
                    Some(&dep) if dep != header.as_str() => {
                        entry.insert(dep);
                    }
                    _ => {}
                }
            }
        }
    }

    while !deps.is_empty() {
        let ready: BTreeSet<&str> = deps
            .iter()
            .filter(|(_, d)| d.is_empty())
            .map(|(&h, _)| h)
            .collect();
        if ready.is_empty() {
            let remaining: Vec<&str> = deps.keys().copied().collect();
            return Err(LowerError::DependencyCycle(remaining.join(", ")));
        }
        for header in &ready {
            deps.shift_remove(header);
        }
        for d in deps.values_mut() {
            d.retain(|h| !ready.contains(h));
        }
        tracing::trace!(layer = ?ready, "init layer");
        ordering.extend(ready.into_iter().map(str::to_string));
    }

    Ok(ordering)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{AccessLevel, FunctionDecl};

    fn overrides(toml: &str) -> ClassOverride {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_base_qualification() {
        let class = ClassDecl::new("Derived", "frc")
            .with_base("Base")
            .with_base("wpi::Sendable")
            .with_base("Remapped");
        let data = overrides(
            r#"
[base_qualnames]
Remapped = "other::Remapped"
            "#,
        );
        let bases = filter_bases(&class, &data).unwrap();
        let names: Vec<&str> = bases.iter().map(|b| b.qualname.as_str()).collect();
        assert_eq!(names, vec!["frc::Base", "wpi::Sendable", "other::Remapped"]);
        assert_eq!(bases[1].qualname_mangled, "wpi__Sendable");
    }

    #[test]
    fn test_global_namespace_base() {
        let class = ClassDecl::new("Derived", "").with_base("Base");
        let bases = filter_bases(&class, &ClassOverride::default()).unwrap();
        assert_eq!(bases[0].qualname, "Base");
    }

    #[test]
    fn test_ignored_bases_filtered() {
        let class = ClassDecl::new("Derived", "frc").with_base("Base").with_base("Mixin");
        let data = overrides(r#"ignored_bases = ["Mixin"]"#);
        let bases = filter_bases(&class, &data).unwrap();
        assert_eq!(bases.len(), 1);
        assert_eq!(bases[0].name, "Base");
    }

    #[test]
    fn test_invalid_ignored_bases() {
        let class = ClassDecl::new("Derived", "frc").with_base("Base");
        let data = overrides(r#"ignored_bases = ["Other", "Base"]"#);
        let err = filter_bases(&class, &data).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Derived: ignored_bases contains non-existent bases Other; valid bases are Base"
        );
    }

    #[test]
    fn test_trampoline_requirement() {
        let base_only = ClassDecl::new("Derived", "frc").with_base("Base");
        assert!(is_polymorphic(&base_only, &ClassOverride::default()));

        let plain = ClassDecl::new("Plain", "frc")
            .with_method(AccessLevel::Public, FunctionDecl::new("Get", "int"));
        assert!(!is_polymorphic(&plain, &ClassOverride::default()));

        let virt = ClassDecl::new("Virt", "frc").with_method(
            AccessLevel::Private,
            FunctionDecl::new("Run", "void").virtual_(),
        );
        assert!(is_polymorphic(&virt, &ClassOverride::default()));

        let forced = overrides("is_polymorphic = true");
        assert!(is_polymorphic(&plain, &forced));

        assert!(requires_trampoline(true, false, false));
        assert!(!requires_trampoline(true, true, false));
        assert!(!requires_trampoline(true, false, true));
        assert!(!requires_trampoline(false, false, false));
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let mut h = ClassHierarchy::new();
        h.insert("frc::Motor".to_string(), vec![]).unwrap();
        let err = h.insert("frc::Motor".to_string(), vec![]).unwrap_err();
        assert!(matches!(err, LowerError::DuplicateClass(name) if name == "frc::Motor"));
    }

    fn graph(entries: &[(&str, &[&str])]) -> ClassHierarchy {
        let mut h = ClassHierarchy::new();
        for (name, bases) in entries {
            h.insert(name.to_string(), bases.iter().map(|b| b.to_string()).collect())
                .unwrap();
        }
        h
    }

    #[test]
    fn test_init_order_bases_first() {
        let motor = graph(&[("frc::Motor", &["frc::MotorBase"])]);
        let base = graph(&[("frc::MotorBase", &["wpi::Sendable"])]);
        let talon = graph(&[("frc::Talon<T>", &["frc::Motor"])]);
        let apple = graph(&[("frc::Apple", &[])]);
        let consts = ClassHierarchy::new();

        let order = init_order(&[
            ("talon".to_string(), &talon),
            ("motor".to_string(), &motor),
            ("consts".to_string(), &consts),
            ("base".to_string(), &base),
            ("apple".to_string(), &apple),
        ])
        .unwrap();
        assert_eq!(order, vec!["consts", "apple", "base", "motor", "talon"]);
    }

    #[test]
    fn test_init_order_errors() {
        let a = graph(&[("A", &["B"])]);
        let b = graph(&[("B", &["A"])]);
        let err = init_order(&[("a".to_string(), &a), ("b".to_string(), &b)]).unwrap_err();
        assert!(matches!(err, LowerError::DependencyCycle(_)));

        let dup = graph(&[("A<int>", &[])]);
        let err = init_order(&[("a".to_string(), &a), ("dup".to_string(), &dup)]).unwrap_err();
        assert_eq!(err.to_string(), "duplicate class A (defined by a and dup)");
    }
}
