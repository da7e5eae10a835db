//! Exported names and mangled identifiers.

/// Characters of a qualified name that cannot appear in a generated symbol.
const QUALNAME_BAD_CHARS: [char; 4] = [':', '<', '>', '='];

/// Namespace generated proxy classes live in.
pub const TRAMPOLINE_NAMESPACE: &str = "wrapgen";

/// Apply a rename or strip the first matching prefix.
///
/// An explicit rename wins outright. Otherwise the prefixes are tried in
/// order and the first one that matches is stripped once.
pub fn resolve_name(name: &str, rename: Option<&str>, strip_prefixes: &[String]) -> String {
    if let Some(rename) = rename {
        return rename.to_string();
    }
    strip_prefixes
        .iter()
        .find_map(|pfx| name.strip_prefix(pfx.as_str()))
        .unwrap_or(name)
        .to_string()
}

/// Exported name of a function before internal/constructor adjustments.
///
/// Without a rename, the first letter is lowered unless the name leads with
/// an acronym (`GetValue` → `getValue`, `CANStatus` stays).
pub fn function_name(name: &str, rename: Option<&str>, strip_prefixes: &[String]) -> String {
    let resolved = resolve_name(name, rename, strip_prefixes);
    if rename.is_some() || leads_with_acronym(&resolved) {
        return resolved;
    }
    lower_first(&resolved)
}

/// The first two characters contain an uppercase letter and no lowercase
/// letter.
fn leads_with_acronym(name: &str) -> bool {
    let head: Vec<char> = name.chars().take(2).collect();
    head.iter().any(|c| c.is_uppercase()) && !head.iter().any(|c| c.is_lowercase())
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Replace `:`, `<`, `>` and `=` with `_`.
///
/// The mapping is a pure function of its input, so every occurrence of a
/// qualified name mangles to the same identifier.
pub fn mangle(qualname: &str) -> String {
    qualname.replace(QUALNAME_BAD_CHARS, "_")
}

/// Name of the proxy class generated for a class.
pub fn trampoline_name(qualname: &str, class_name: &str) -> String {
    format!("{TRAMPOLINE_NAMESPACE}::Py{}<{class_name}>", mangle(qualname))
}

/// Identifier used for `using` aliases of a class member.
pub fn using_signature(class_qualname: &str, member: &str) -> String {
    format!("{}_{member}", mangle(class_qualname))
}

/// Module variable a declaration is registered on.
pub fn module_var(subpackage: Option<&str>) -> String {
    match subpackage {
        Some(pkg) => format!("pkg_{}", pkg.replace('.', "_")),
        None => "m".to_string(),
    }
}
