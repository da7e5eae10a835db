//! Which class members are bound, and how.

use serde::Serialize;
use wrapgen_config::{PropAccess, PropertyOverride};

use crate::decl::{AccessLevel, MethodDecl, PropertyDecl};
use crate::function::quote_doc;
use crate::types::strip_template_args;

/// Why a declaration was left out of the bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    Operator,
    Destructor,
    /// Copy or move constructor.
    CopyConstructor,
    Private,
    /// Nested in a private section of its enclosing class.
    PrivateNested,
    /// Protected data member of a class without a proxy class.
    ProtectedWithoutTrampoline,
    /// `ignore = true` in the override.
    Ignored,
}

/// The class being filtered, as its type may be spelled in a signature.
#[derive(Debug, Clone, Copy)]
pub struct ClassIdent<'a> {
    pub name: &'a str,
    /// Namespace, enclosing classes and name.
    pub qualname: &'a str,
    /// Enclosing classes and name.
    pub lookup_key: &'a str,
}

impl ClassIdent<'_> {
    /// Whether `ty` names this class.
    ///
    /// A bare name matches the class name. A qualified name must match the
    /// full qualname or the path through the enclosing classes, so a
    /// same-named class from another namespace does not match.
    fn is_named_by(&self, ty: &str) -> bool {
        let ty = strip_template_args(ty.trim_start_matches("::"));
        if ty.contains("::") {
            ty == self.qualname || ty == self.lookup_key
        } else {
            ty == self.name
        }
    }
}

/// Whether a constructor's first parameter is the class itself.
fn is_copy_constructor(method: &MethodDecl, class: ClassIdent<'_>) -> bool {
    let func = &method.function;
    func.is_constructor
        && func
            .params
            .first()
            .is_some_and(|p| class.is_named_by(&p.raw_type))
}

/// Reason `method` is never bound, if any.
pub fn method_exclusion(method: &MethodDecl, class: ClassIdent<'_>) -> Option<Exclusion> {
    let func = &method.function;
    if func.is_operator {
        Some(Exclusion::Operator)
    } else if func.is_destructor {
        Some(Exclusion::Destructor)
    } else if is_copy_constructor(method, class) {
        Some(Exclusion::CopyConstructor)
    } else if method.access == AccessLevel::Private {
        Some(Exclusion::Private)
    } else {
        None
    }
}

/// Reason a data member is not bound, if any.
///
/// Protected members are only reachable through the proxy class.
pub fn property_exclusion(access: AccessLevel, has_trampoline: bool) -> Option<Exclusion> {
    match access {
        AccessLevel::Public => None,
        AccessLevel::Protected if has_trampoline => None,
        AccessLevel::Protected => Some(Exclusion::ProtectedWithoutTrampoline),
        AccessLevel::Private => Some(Exclusion::Private),
    }
}

/// Whether a property is exposed read-only.
///
/// Without an explicit setting, only fundamental and reference members are
/// writable; everything else (pointers included) is read-only.
pub fn is_readonly(prop: &PropertyDecl, access: PropAccess) -> bool {
    match access {
        PropAccess::Auto => !prop.fundamental && prop.reference == 0,
        PropAccess::ReadOnly => true,
        PropAccess::ReadWrite => false,
    }
}

/// Exported name of a data member; protected members get a leading `_`.
pub fn property_name(prop: &PropertyDecl, rename: Option<&str>) -> String {
    match rename {
        Some(rename) => rename.to_string(),
        None if prop.access == AccessLevel::Protected => format!("_{}", prop.name),
        None => prop.name.clone(),
    }
}

/// A data member or variable ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedProperty {
    pub name: String,
    pub x_name: String,
    pub raw_type: String,
    pub access: AccessLevel,
    pub readonly: bool,
    pub is_static: bool,
    pub doc_quoted: Vec<String>,
}

/// Resolve a visible data member with its override.
pub fn resolve_property(prop: &PropertyDecl, data: &PropertyOverride) -> ResolvedProperty {
    let doc = data.doc.as_deref().or(prop.doc.as_deref()).unwrap_or("");
    ResolvedProperty {
        name: prop.name.clone(),
        x_name: property_name(prop, data.rename.as_deref()),
        raw_type: prop.raw_type.clone(),
        access: prop.access,
        readonly: is_readonly(prop, data.access),
        is_static: prop.is_static,
        doc_quoted: quote_doc(doc),
    }
}
