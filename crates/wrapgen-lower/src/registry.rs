//! Override lookup and missing-symbol tracking.
//!
//! Every lookup that falls back to a default override is recorded, so that a
//! scaffolding override file can be produced after a full run.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use wrapgen_config::{ClassOverride, EnumOverride, FunctionOverride, OverrideFile, PropertyOverride};

use crate::decl::FunctionDecl;

/// Overload key of a function.
///
/// Each parameter contributes its enum type (or raw type) followed by one
/// `&` per reference level and one `*` per pointer level; parameters are
/// joined with `", "` and `" >"` is collapsed to `">"`. A const member
/// function appends `" [const]"` (or is just `"[const]"` without
/// parameters). The key depends on parameter order only through this
/// concatenation, so independent implementations agree byte for byte.
pub fn function_signature(func: &FunctionDecl) -> String {
    let mut sig = func
        .params
        .iter()
        .map(|p| {
            let mut part = p.enum_type.as_deref().unwrap_or(&p.raw_type).to_string();
            part.push_str(&"&".repeat(p.reference as usize));
            part.push_str(&"*".repeat(p.pointer as usize));
            part
        })
        .collect::<Vec<_>>()
        .join(", ")
        .replace(" >", ">");

    if func.is_const {
        if sig.is_empty() {
            sig.push_str("[const]");
        } else {
            sig.push_str(" [const]");
        }
    }
    sig
}

/// Looks up overrides for the declarations of one header.
pub struct OverrideRegistry<'a> {
    file: &'a OverrideFile,
    missing: MissingReport,
}

impl<'a> OverrideRegistry<'a> {
    pub fn new(file: &'a OverrideFile) -> Self {
        Self {
            file,
            missing: MissingReport::default(),
        }
    }

    /// Configured prefixes stripped from exported names.
    pub fn strip_prefixes(&self) -> &'a [String] {
        &self.file.strip_prefixes
    }

    /// Override of a free function.
    pub fn function(&mut self, name: &str, signature: &str) -> Cow<'a, FunctionOverride> {
        let file = self.file;
        let found = file.functions.get(name);
        let slot = self.missing.functions.entry(name.to_string());
        match found {
            Some(entry) => match select_overload(entry, signature) {
                Some(data) => Cow::Borrowed(data),
                None => {
                    slot.or_default().insert(signature.to_string());
                    Cow::Borrowed(entry)
                }
            },
            None => {
                slot.or_default().insert(signature.to_string());
                Cow::Owned(FunctionOverride::default())
            }
        }
    }

    /// Override of a class, keyed by its enclosing-class path.
    pub fn class(&mut self, key: &str) -> Cow<'a, ClassOverride> {
        let file = self.file;
        match file.classes.get(key) {
            Some(data) => Cow::Borrowed(data),
            None => {
                self.missing.class_mut(key).missing = true;
                Cow::Owned(ClassOverride::default())
            }
        }
    }

    /// Override of a method of `class`.
    pub fn method<'c>(
        &mut self,
        class_key: &str,
        class: &'c ClassOverride,
        name: &str,
        signature: &str,
    ) -> Cow<'c, FunctionOverride> {
        match class.methods.get(name) {
            Some(entry) => match select_overload(entry, signature) {
                Some(data) => Cow::Borrowed(data),
                None => {
                    self.missing
                        .class_mut(class_key)
                        .methods
                        .entry(name.to_string())
                        .or_default()
                        .insert(signature.to_string());
                    Cow::Borrowed(entry)
                }
            },
            None => {
                self.missing
                    .class_mut(class_key)
                    .methods
                    .entry(name.to_string())
                    .or_default()
                    .insert(signature.to_string());
                Cow::Owned(FunctionOverride::default())
            }
        }
    }

    /// Override of a data member of `class`.
    pub fn class_property<'c>(
        &mut self,
        class_key: &str,
        class: &'c ClassOverride,
        name: &str,
    ) -> Cow<'c, PropertyOverride> {
        match class.attributes.get(name) {
            Some(data) => Cow::Borrowed(data),
            None => {
                self.missing
                    .class_mut(class_key)
                    .attributes
                    .insert(name.to_string());
                Cow::Owned(PropertyOverride::default())
            }
        }
    }

    /// Override of an enum nested in `class`.
    pub fn class_enum<'c>(
        &mut self,
        class_key: &str,
        class: &'c ClassOverride,
        name: Option<&str>,
    ) -> Cow<'c, EnumOverride> {
        let Some(name) = name else {
            return Cow::Owned(EnumOverride::default());
        };
        match class.enums.get(name) {
            Some(data) => Cow::Borrowed(data),
            None => {
                self.missing
                    .class_mut(class_key)
                    .enums
                    .insert(name.to_string());
                Cow::Owned(EnumOverride::default())
            }
        }
    }

    /// Override of a header-level enum; anonymous enums are never recorded.
    pub fn enum_(&mut self, name: Option<&str>) -> Cow<'a, EnumOverride> {
        let Some(name) = name else {
            return Cow::Owned(EnumOverride::default());
        };
        let file = self.file;
        match file.enums.get(name) {
            Some(data) => Cow::Borrowed(data),
            None => {
                self.missing.enums.insert(name.to_string());
                Cow::Owned(EnumOverride::default())
            }
        }
    }

    /// Override of a header-level variable.
    pub fn variable(&mut self, name: &str) -> Cow<'a, PropertyOverride> {
        let file = self.file;
        match file.attributes.get(name) {
            Some(data) => Cow::Borrowed(data),
            None => {
                self.missing.attributes.insert(name.to_string());
                Cow::Owned(PropertyOverride::default())
            }
        }
    }

    pub fn missing(&self) -> &MissingReport {
        &self.missing
    }

    pub fn into_missing(self) -> MissingReport {
        self.missing
    }
}

/// The entry to use for `signature`, or `None` when the function has
/// overload entries and none matches.
fn select_overload<'b>(entry: &'b FunctionOverride, signature: &str) -> Option<&'b FunctionOverride> {
    if entry.overloads.is_empty() {
        Some(entry)
    } else {
        entry.overloads.get(signature)
    }
}

/// Symbols that had no override entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingReport {
    /// Function name → signatures seen.
    pub functions: BTreeMap<String, BTreeSet<String>>,
    pub classes: BTreeMap<String, MissingClass>,
    pub enums: BTreeSet<String>,
    pub attributes: BTreeSet<String>,
}

/// Missing members of a class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingClass {
    /// The class itself has no entry.
    pub missing: bool,
    pub methods: BTreeMap<String, BTreeSet<String>>,
    pub attributes: BTreeSet<String>,
    pub enums: BTreeSet<String>,
}

impl MissingReport {
    fn class_mut(&mut self, key: &str) -> &mut MissingClass {
        self.classes.entry(key.to_string()).or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.classes.is_empty()
            && self.enums.is_empty()
            && self.attributes.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: MissingReport) {
        for (name, sigs) in other.functions {
            self.functions.entry(name).or_default().extend(sigs);
        }
        for (key, cls) in other.classes {
            let entry = self.class_mut(&key);
            entry.missing |= cls.missing;
            for (name, sigs) in cls.methods {
                entry.methods.entry(name).or_default().extend(sigs);
            }
            entry.attributes.extend(cls.attributes);
            entry.enums.extend(cls.enums);
        }
        self.enums.extend(other.enums);
        self.attributes.extend(other.attributes);
    }

    /// Render a scaffolding override file for the missing symbols.
    ///
    /// Functions seen with more than one signature get one `overloads`
    /// entry per signature.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let mut root = toml::Table::new();

        if !self.functions.is_empty() {
            root.insert("functions".into(), functions_table(&self.functions).into());
        }

        if !self.classes.is_empty() {
            let mut classes = toml::Table::new();
            for (key, cls) in &self.classes {
                let mut entry = toml::Table::new();
                if !cls.methods.is_empty() {
                    entry.insert("methods".into(), functions_table(&cls.methods).into());
                }
                if !cls.attributes.is_empty() {
                    entry.insert("attributes".into(), names_table(&cls.attributes).into());
                }
                if !cls.enums.is_empty() {
                    entry.insert("enums".into(), names_table(&cls.enums).into());
                }
                classes.insert(key.clone(), entry.into());
            }
            root.insert("classes".into(), classes.into());
        }

        if !self.enums.is_empty() {
            root.insert("enums".into(), names_table(&self.enums).into());
        }
        if !self.attributes.is_empty() {
            root.insert("attributes".into(), names_table(&self.attributes).into());
        }

        toml::to_string(&root)
    }
}

fn functions_table(functions: &BTreeMap<String, BTreeSet<String>>) -> toml::Table {
    let mut table = toml::Table::new();
    for (name, sigs) in functions {
        let mut entry = toml::Table::new();
        if sigs.len() > 1 {
            entry.insert("overloads".into(), names_table(sigs).into());
        }
        table.insert(name.clone(), entry.into());
    }
    table
}

fn names_table(names: &BTreeSet<String>) -> toml::Table {
    names
        .iter()
        .map(|name| (name.clone(), toml::Table::new().into()))
        .collect()
}

/// Collects missing-symbol reports per override file across headers.
#[derive(Debug, Default)]
pub struct MissingReporter {
    reports: BTreeMap<String, MissingReport>,
}

impl MissingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the missing symbols of a header whose overrides live in `file`.
    pub fn add(&mut self, file: &str, report: MissingReport) {
        if report.is_empty() {
            return;
        }
        self.reports.entry(file.to_string()).or_default().merge(report);
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// `(file, scaffolding)` pairs, ordered by file name.
    pub fn as_toml(&self) -> Result<Vec<(String, String)>, toml::ser::Error> {
        self.reports
            .iter()
            .map(|(file, report)| Ok((file.clone(), report.to_toml()?)))
            .collect()
    }
}
