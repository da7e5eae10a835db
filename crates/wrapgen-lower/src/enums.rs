//! Enum lowering and enumerator name shortening.

use serde::Serialize;
use wrapgen_config::EnumOverride;

use crate::decl::EnumDecl;
use crate::function::quote_doc;
use crate::naming::{module_var, resolve_name};

/// An enumerator ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEnumValue {
    /// Native name, used for qualified lookups.
    pub name: String,
    /// Exported short name.
    pub x_name: String,
}

/// An enum ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEnum {
    pub name: Option<String>,
    /// Exported name; `None` for anonymous enums.
    pub x_name: Option<String>,
    /// Scope prefix the enumerators are qualified with.
    pub namespace: String,
    pub values: Vec<ResolvedEnumValue>,
    pub module_var: String,
    pub doc_quoted: Vec<String>,
}

/// Short name of an enumerator: `prefix` and then a single leading `_`
/// are removed. A name that would become empty is kept as is.
pub fn short_value_name<'n>(name: &'n str, prefix: &str) -> &'n str {
    if prefix.is_empty() {
        return name;
    }
    match name.strip_prefix(prefix) {
        Some(rest) => {
            let rest = rest.strip_prefix('_').unwrap_or(rest);
            if rest.is_empty() {
                name
            } else {
                rest
            }
        }
        None => name,
    }
}

/// Lower an enum declared in `namespace`.
///
/// The value prefix defaults to the enum's own name; anonymous enums keep
/// their enumerator names.
pub fn lower_enum(
    decl: &EnumDecl,
    data: &EnumOverride,
    namespace: &str,
    strip_prefixes: &[String],
) -> ResolvedEnum {
    let prefix = decl
        .name
        .as_deref()
        .map(|name| data.value_prefix.as_deref().unwrap_or(name))
        .unwrap_or("");

    let values = decl
        .values
        .iter()
        .map(|v| ResolvedEnumValue {
            name: v.name.clone(),
            x_name: short_value_name(&v.name, prefix).to_string(),
        })
        .collect();

    let doc = data.doc.as_deref().or(decl.doc.as_deref()).unwrap_or("");

    ResolvedEnum {
        name: decl.name.clone(),
        x_name: decl
            .name
            .as_deref()
            .map(|name| resolve_name(name, data.rename.as_deref(), strip_prefixes)),
        namespace: namespace.to_string(),
        values,
        module_var: module_var(data.subpackage.as_deref()),
        doc_quoted: quote_doc(doc),
    }
}
