//! Helpers over native type spellings.

/// Whether `raw_type` is one of the fixed-width integer aliases
/// (`int8_t` .. `uint64_t`, the `_fast`/`_least` variants, `intmax_t`,
/// `uintmax_t`).
pub fn is_fixed_width_int(raw_type: &str) -> bool {
    if raw_type == "intmax_t" || raw_type == "uintmax_t" {
        return true;
    }
    let Some(rest) = raw_type.strip_suffix("_t") else {
        return false;
    };
    let rest = rest
        .strip_prefix("uint")
        .or_else(|| rest.strip_prefix("int"));
    let Some(rest) = rest else {
        return false;
    };
    let bits = rest
        .strip_prefix("_fast")
        .or_else(|| rest.strip_prefix("_least"))
        .unwrap_or(rest);
    matches!(bits, "8" | "16" | "32" | "64")
}

/// Strip template arguments: everything from the first `<` on.
///
/// # Example
/// ```ignore
/// assert_eq!(strip_template_args("std::vector<int>"), "std::vector");
/// ```
pub fn strip_template_args(ty: &str) -> &str {
    match ty.find('<') {
        Some(idx) => &ty[..idx],
        None => ty,
    }
}
