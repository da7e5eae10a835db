//! Override configuration for the wrapgen binding generator.
//!
//! This crate provides:
//! - Per-header override records (`<header>.toml`)
//! - Type-caster declarations and the resolved caster table
//!
//! # Example
//!
//! ```toml
//! strip_prefixes = ["HAL_"]
//!
//! [functions.HAL_GetValue]
//! buffers = [{ src = "buf", len = "len", type = "in" }]
//!
//! [classes.Motor]
//! ignored_bases = ["Sendable"]
//!
//! [enums.Color]
//! value_prefix = "kColor"
//! ```

mod casters;
mod error;
mod overrides;

pub use casters::{CasterConfig, CasterTable};
pub use error::{ConfigError, Result};
pub use overrides::{
    BufferDirection, BufferSpec, ClassOverride, EnumOverride, FunctionOverride, OverrideFile,
    ParamOverride, PropAccess, PropertyOverride, ReturnPolicy,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file() {
        let file = OverrideFile::from_toml("").expect("Failed to parse empty config");
        assert!(file.functions.is_empty());
        assert!(file.classes.is_empty());
        assert!(file.strip_prefixes.is_empty());
    }
}
