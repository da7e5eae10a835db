//! Parsed declaration records.
//!
//! These are produced by the external header parser and are never mutated
//! by the engine; lowering produces separate `Resolved*` records.

use serde::{Deserialize, Serialize};

/// Member access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Accessible from anywhere
    #[default]
    Public,
    /// Accessible from the class and derived classes
    Protected,
    /// Accessible only from within the class
    Private,
}

/// All declarations found in one header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderDecls {
    pub functions: Vec<FunctionDecl>,
    pub classes: Vec<ClassDecl>,
    pub enums: Vec<EnumDecl>,
    pub variables: Vec<PropertyDecl>,
}

/// A default argument as written in the declaration.
///
/// Variant order matters for deserialization: integers too large for
/// `i64` land in `UInt` rather than `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Expr(String),
}

/// A function or method parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamDecl {
    /// Parameter name; may be empty.
    pub name: String,
    /// Declared type without qualifiers (`const`, `*`, `&`).
    pub raw_type: String,
    /// Fully resolved enum type, when the parameter is an enum.
    pub enum_type: Option<String>,
    pub pointer: u8,
    pub reference: u8,
    pub constant: bool,
    pub array: bool,
    pub array_size: Option<usize>,
    /// Built-in arithmetic type.
    pub fundamental: bool,
    pub default: Option<DefaultValue>,
}

/// A free function or member function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionDecl {
    pub name: String,
    pub namespace: String,
    /// Declared return type; `void` for none.
    pub returns: String,
    pub params: Vec<ParamDecl>,
    /// Trailing `const` on a member function.
    pub is_const: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
    pub is_override: bool,
    pub is_final: bool,
    pub is_operator: bool,
    pub is_constructor: bool,
    pub is_destructor: bool,
    pub doc: Option<String>,
}

/// A member function together with its access level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodDecl {
    pub access: AccessLevel,
    #[serde(flatten)]
    pub function: FunctionDecl,
}

/// A base class specifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseDecl {
    /// Base name as written (possibly qualified).
    pub name: String,
    pub access: AccessLevel,
    pub is_virtual: bool,
}

/// A class data member or a header-level variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyDecl {
    pub name: String,
    pub raw_type: String,
    pub access: AccessLevel,
    pub pointer: u8,
    pub reference: u8,
    pub constant: bool,
    pub fundamental: bool,
    pub is_static: bool,
    pub doc: Option<String>,
}

/// An enumerator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumValueDecl {
    pub name: String,
    pub value: Option<String>,
}

/// An enum declaration; anonymous enums have no name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumDecl {
    pub name: Option<String>,
    pub namespace: String,
    pub access: AccessLevel,
    pub values: Vec<EnumValueDecl>,
    pub doc: Option<String>,
}

/// A class or struct declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDecl {
    pub name: String,
    /// Enclosing namespace, without enclosing classes.
    pub namespace: String,
    /// Access of the section the class is declared in, for nested classes.
    pub access_in_parent: Option<AccessLevel>,
    pub bases: Vec<BaseDecl>,
    pub methods: Vec<MethodDecl>,
    pub properties: Vec<PropertyDecl>,
    pub enums: Vec<EnumDecl>,
    pub nested: Vec<ClassDecl>,
    pub is_final: bool,
    pub doc: Option<String>,
}

impl ParamDecl {
    /// Create a by-value parameter.
    pub fn new(name: &str, raw_type: &str) -> Self {
        Self {
            name: name.to_string(),
            raw_type: raw_type.to_string(),
            ..Self::default()
        }
    }

    pub fn with_pointer(mut self, count: u8) -> Self {
        self.pointer = count;
        self
    }

    pub fn with_reference(mut self, count: u8) -> Self {
        self.reference = count;
        self
    }

    pub fn with_const(mut self) -> Self {
        self.constant = true;
        self
    }

    pub fn with_array(mut self, size: Option<usize>) -> Self {
        self.array = true;
        self.array_size = size;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, enum_type: &str) -> Self {
        self.enum_type = Some(enum_type.to_string());
        self
    }

    /// Mark as a built-in arithmetic type.
    pub fn fundamental(mut self) -> Self {
        self.fundamental = true;
        self
    }
}

impl FunctionDecl {
    /// Create a function declaration with no parameters.
    pub fn new(name: &str, returns: &str) -> Self {
        Self {
            name: name.to_string(),
            returns: returns.to_string(),
            ..Self::default()
        }
    }

    /// Create a constructor for `class_name`.
    pub fn constructor(class_name: &str) -> Self {
        Self {
            is_constructor: true,
            ..Self::new(class_name, "void")
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn with_param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    pub fn virtual_(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn const_(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Whether the declared return type is `void`.
    pub fn returns_void(&self) -> bool {
        self.returns.trim() == "void" || self.returns.trim().is_empty()
    }
}

impl PropertyDecl {
    pub fn new(name: &str, raw_type: &str, access: AccessLevel) -> Self {
        Self {
            name: name.to_string(),
            raw_type: raw_type.to_string(),
            access,
            ..Self::default()
        }
    }

    pub fn fundamental(mut self) -> Self {
        self.fundamental = true;
        self
    }

    pub fn with_reference(mut self, count: u8) -> Self {
        self.reference = count;
        self
    }

    pub fn with_pointer(mut self, count: u8) -> Self {
        self.pointer = count;
        self
    }
}

impl EnumDecl {
    pub fn new(name: &str, values: &[&str]) -> Self {
        Self {
            name: Some(name.to_string()),
            values: values
                .iter()
                .map(|v| EnumValueDecl {
                    name: v.to_string(),
                    value: None,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }
}

impl ClassDecl {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ..Self::default()
        }
    }

    pub fn with_base(mut self, name: &str) -> Self {
        self.bases.push(BaseDecl {
            name: name.to_string(),
            access: AccessLevel::Public,
            is_virtual: false,
        });
        self
    }

    pub fn with_method(mut self, access: AccessLevel, function: FunctionDecl) -> Self {
        self.methods.push(MethodDecl { access, function });
        self
    }

    pub fn with_property(mut self, property: PropertyDecl) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_enum(mut self, decl: EnumDecl) -> Self {
        self.enums.push(decl);
        self
    }

    /// Add a nested class declared in the `access` section.
    pub fn with_nested(mut self, access: AccessLevel, mut nested: ClassDecl) -> Self {
        nested.access_in_parent = Some(access);
        self.nested.push(nested);
        self
    }

    pub fn final_(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Names of public data members, used to qualify default arguments.
    pub fn public_property_names(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|p| p.access == AccessLevel::Public)
            .map(|p| p.name.as_str())
    }
}
