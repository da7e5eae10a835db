//! Override records (per-header generation data, TOML format).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Root of a per-header override file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverrideFile {
    /// Prefixes stripped from exported names; the first match wins.
    pub strip_prefixes: Vec<String>,

    /// Free functions, keyed by unqualified name.
    pub functions: IndexMap<String, FunctionOverride>,

    /// Classes, keyed by enclosing-class path (`Outer::Inner`).
    pub classes: IndexMap<String, ClassOverride>,

    /// Header-level enums.
    pub enums: IndexMap<String, EnumOverride>,

    /// Header-level variables.
    pub attributes: IndexMap<String, PropertyOverride>,
}

/// Overrides applied to a function or method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FunctionOverride {
    /// Don't bind this function at all.
    pub ignore: bool,

    /// Bind under a leading-underscore name.
    pub internal: bool,

    /// Exported name, used verbatim.
    pub rename: Option<String>,

    /// Docstring replacing the parsed documentation.
    pub doc: Option<String>,

    /// Per-parameter overrides keyed by parameter name.
    pub param_override: IndexMap<String, ParamOverride>,

    /// Buffer protocol parameters.
    pub buffers: Vec<BufferSpec>,

    /// Ownership policy of the returned value.
    pub return_value_policy: ReturnPolicy,

    /// Explicit keep-alive pairs `(nurse, patient)`.
    pub keepalive: Option<Vec<(u32, u32)>>,

    /// Keep the interpreter lock held during the call.
    pub no_release_gil: Option<bool>,

    /// Hand-written glue replacing the generated call.
    pub cpp_code: Option<String>,

    /// Module the binding is placed in.
    pub subpackage: Option<String>,

    /// Overload-specific overrides keyed by parameter signature.
    pub overloads: IndexMap<String, FunctionOverride>,
}

/// Overrides applied to a single parameter.
///
/// Every field that is set replaces the corresponding parsed attribute
/// before the parameter is classified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamOverride {
    pub ignore: bool,
    pub force_out: bool,
    pub x_type: Option<String>,
    pub default: Option<String>,
    pub pointer: Option<u8>,
    pub reference: Option<u8>,
    pub constant: Option<bool>,
    pub fundamental: Option<bool>,
    pub array: Option<bool>,
    pub array_size: Option<usize>,
}

/// A parameter accepting a buffer-protocol object, paired with its length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferSpec {
    /// Name of the pointer parameter the buffer feeds.
    pub src: String,

    /// Name of the length parameter.
    pub len: String,

    /// Whether the callee reads from or writes to the buffer.
    #[serde(rename = "type")]
    pub direction: BufferDirection,

    /// Minimum buffer size in bytes.
    #[serde(default)]
    pub minsz: Option<usize>,
}

impl BufferSpec {
    pub fn new(src: &str, len: &str, direction: BufferDirection) -> Self {
        Self {
            src: src.to_string(),
            len: len.to_string(),
            direction,
            minsz: None,
        }
    }

    /// Set the minimum buffer size.
    pub fn with_minsz(mut self, minsz: usize) -> Self {
        self.minsz = Some(minsz);
        self
    }
}

/// Direction of data flow through a buffer parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferDirection {
    /// Callee only reads the buffer.
    #[serde(alias = "read")]
    In,
    /// Callee writes into the buffer.
    #[serde(alias = "write")]
    Out,
    /// Callee reads and writes.
    InOut,
}

impl BufferDirection {
    /// Whether a writable view of the buffer must be requested.
    pub fn is_writable(self) -> bool {
        !matches!(self, BufferDirection::In)
    }
}

/// Ownership transfer semantics of a returned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnPolicy {
    TakeOwnership,
    Copy,
    Move,
    Reference,
    ReferenceInternal,
    #[default]
    Automatic,
    AutomaticReference,
}

impl ReturnPolicy {
    /// Extra argument appended to the generated `def` call.
    pub fn policy_arg(self) -> &'static str {
        match self {
            ReturnPolicy::TakeOwnership => ", py::return_value_policy::take_ownership",
            ReturnPolicy::Copy => ", py::return_value_policy::copy",
            ReturnPolicy::Move => ", py::return_value_policy::move",
            ReturnPolicy::Reference => ", py::return_value_policy::reference",
            ReturnPolicy::ReferenceInternal => ", py::return_value_policy::reference_internal",
            ReturnPolicy::Automatic => "",
            ReturnPolicy::AutomaticReference => ", py::return_value_policy::automatic_reference",
        }
    }
}

/// Overrides applied to a class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassOverride {
    pub ignore: bool,
    pub rename: Option<String>,
    pub doc: Option<String>,
    pub subpackage: Option<String>,

    /// Declared bases that are not exposed.
    pub ignored_bases: Vec<String>,

    /// Explicit qualified names for declared bases.
    pub base_qualnames: IndexMap<String, String>,

    /// Extra dependency edges added to the class hierarchy.
    pub force_depends: Vec<String>,

    /// Never generate a proxy class.
    pub force_no_trampoline: bool,

    /// Treat the class as polymorphic even without virtual methods.
    pub is_polymorphic: bool,

    pub methods: IndexMap<String, FunctionOverride>,
    pub attributes: IndexMap<String, PropertyOverride>,
    pub enums: IndexMap<String, EnumOverride>,
}

/// Overrides applied to a property or variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertyOverride {
    pub ignore: bool,
    pub rename: Option<String>,
    pub access: PropAccess,
    pub doc: Option<String>,
}

/// How a property is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropAccess {
    /// Decided from the property's type.
    #[default]
    #[serde(alias = "automatic")]
    Auto,
    #[serde(alias = "read_only")]
    ReadOnly,
    #[serde(alias = "read_write")]
    ReadWrite,
}

/// Overrides applied to an enum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnumOverride {
    pub ignore: bool,
    pub rename: Option<String>,
    pub doc: Option<String>,
    pub subpackage: Option<String>,

    /// Prefix stripped from value names; defaults to the enum name.
    pub value_prefix: Option<String>,
}

impl OverrideFile {
    /// Load an override file from disk.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate an override file.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let file: OverrideFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Reject buffer specs whose source and length name the same parameter.
    pub fn validate(&self) -> crate::Result<()> {
        for (name, func) in &self.functions {
            func.validate(&format!("functions.{name}"))?;
        }
        for (cls_name, cls) in &self.classes {
            for (name, method) in &cls.methods {
                method.validate(&format!("classes.{cls_name}.methods.{name}"))?;
            }
        }
        Ok(())
    }
}

impl FunctionOverride {
    fn validate(&self, symbol: &str) -> crate::Result<()> {
        for buf in &self.buffers {
            if buf.src == buf.len {
                return Err(ConfigError::BufferAlias {
                    symbol: symbol.to_string(),
                    src: buf.src.clone(),
                    len: buf.len.clone(),
                });
            }
        }
        for (sig, overload) in &self.overloads {
            overload.validate(&format!("{symbol}.overloads.\"{sig}\""))?;
        }
        Ok(())
    }
}
