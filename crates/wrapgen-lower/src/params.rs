//! Parameter role classification.
//!
//! Each parameter is assigned exactly one role, first match wins:
//!
//! 1. buffer source: the caller passes a buffer-protocol object
//! 2. buffer length: computed from the buffer; returned when the callee can
//!    write it through a pointer, hidden otherwise
//! 3. forced out, or a non-const pointer to a fundamental type
//! 4. fixed-size array: returned through a `std::array`
//! 5. everything else is passed in as declared

use indexmap::IndexMap;
use serde::Serialize;
use wrapgen_config::{BufferDirection, BufferSpec, FunctionOverride, ParamOverride};

use crate::casters::TypeCasterRegistry;
use crate::decl::{DefaultValue, FunctionDecl, ParamDecl};
use crate::error::{LowerError, Result};
use crate::types::is_fixed_width_int;

/// Type the caller passes for a buffer parameter.
pub const BUFFER_HANDLE_TYPE: &str = "py::buffer";

/// How a parameter crosses the binding boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamRole {
    /// Passed by the caller as declared.
    In,
    /// Captured in a zero-initialised temporary and returned.
    Out,
    /// A buffer-protocol object whose storage is passed to the callee.
    Buffer {
        /// Local holding the requested `buffer_info`.
        handle: String,
        direction: BufferDirection,
        /// Length parameter fed from the buffer size.
        length: String,
        min_size: Option<usize>,
    },
    /// Hidden from the caller; the callee receives `value`.
    IgnoredTemporary { value: String },
}

/// A parameter after classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedParam {
    pub name: String,
    pub role: ParamRole,
    /// Resolved type, `const `-prefixed when constant.
    pub x_type: String,
    /// `x_type` with reference and pointer markers.
    pub type_full: String,
    /// Expression passed at the native call.
    pub call_name: String,
    /// Name the value is returned under.
    pub ret_name: String,
    /// `"<type_full> <name>"`.
    pub decl: String,
    /// Argument descriptor, with the default appended.
    pub arg: String,
    pub default: Option<String>,
    pub pointer: u8,
    pub reference: u8,
    pub constant: bool,
    pub fundamental: bool,
}

impl ResolvedParam {
    /// Visible to the caller as an argument.
    pub fn is_input(&self) -> bool {
        matches!(self.role, ParamRole::In | ParamRole::Buffer { .. })
    }

    pub fn is_out(&self) -> bool {
        matches!(self.role, ParamRole::Out)
    }
}

/// Public data members of the class declaring a method.
///
/// Defaults that name one of them are qualified so they stay valid outside
/// member-function context.
#[derive(Debug, Clone, Copy)]
pub struct MemberScope<'a> {
    pub qualname: &'a str,
    pub public_members: &'a [&'a str],
}

/// Result of classifying every parameter of one function.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedParams {
    /// Parameters passed to the native call, in declaration order.
    /// Parameters ignored by an override are not included.
    pub params: Vec<ResolvedParam>,
    /// Temporary declarations, in parameter order.
    pub temporaries: Vec<String>,
    /// Buffer requests, length computations and size checks.
    pub buffer_statements: Vec<String>,
    /// Keep-alive pairs implied by reference parameters of constructors.
    pub keepalives: Vec<(u32, u32)>,
    /// A buffer parameter forces a wrapper lambda.
    pub has_buffers: bool,
}

/// A parameter while its override is applied and its role decided.
struct Working {
    name: String,
    x_type: String,
    pointer: u8,
    reference: u8,
    constant: bool,
    array: bool,
    array_size: Option<usize>,
    fundamental: bool,
    default: Option<DefaultValue>,
    force_out: bool,
    ignore: bool,
}

impl Working {
    fn new(index: usize, decl: &ParamDecl) -> Self {
        let name = if decl.name.is_empty() {
            format!("param{index}")
        } else {
            decl.name.clone()
        };
        Self {
            name,
            x_type: decl.enum_type.clone().unwrap_or_else(|| decl.raw_type.clone()),
            pointer: decl.pointer,
            reference: decl.reference,
            constant: decl.constant,
            array: decl.array,
            array_size: decl.array_size,
            fundamental: decl.fundamental || is_fixed_width_int(&decl.raw_type),
            default: decl.default.clone(),
            force_out: false,
            ignore: false,
        }
    }

    fn apply(&mut self, po: &ParamOverride) {
        self.ignore = po.ignore;
        self.force_out = po.force_out;
        if let Some(x_type) = &po.x_type {
            self.x_type = x_type.clone();
        }
        if let Some(default) = &po.default {
            self.default = Some(DefaultValue::Expr(default.clone()));
        }
        if let Some(pointer) = po.pointer {
            self.pointer = pointer;
        }
        if let Some(reference) = po.reference {
            self.reference = reference;
        }
        if let Some(constant) = po.constant {
            self.constant = constant;
        }
        if let Some(fundamental) = po.fundamental {
            self.fundamental = fundamental;
        }
        if let Some(array) = po.array {
            self.array = array;
        }
        if po.array_size.is_some() {
            self.array_size = po.array_size;
        }
    }
}

/// Render a default argument so it is valid at the binding site.
///
/// Numbers are rendered verbatim and `NULL`/`nullptr` pass through. Any
/// other name matching a public member of the declaring class is qualified
/// with the class name.
pub fn resolve_default(default: &DefaultValue, scope: Option<MemberScope<'_>>) -> String {
    let name = match default {
        DefaultValue::Int(v) => return v.to_string(),
        DefaultValue::UInt(v) => return v.to_string(),
        // `{:?}` keeps the decimal point, the sign of zero and exponents.
        DefaultValue::Float(v) => return format!("{v:?}"),
        DefaultValue::Expr(expr) => expr.as_str(),
    };
    if name == "NULL" || name == "nullptr" {
        return name.to_string();
    }
    match scope {
        Some(scope) if scope.public_members.contains(&name) => {
            format!("{}::{}", scope.qualname, name)
        }
        _ => name.to_string(),
    }
}

/// Classify every parameter of `func`.
///
/// Fails if a buffer spec aliases its source and length, or names a
/// parameter that does not exist.
pub fn classify_params(
    func: &FunctionDecl,
    data: &FunctionOverride,
    scope: Option<MemberScope<'_>>,
    casters: &mut TypeCasterRegistry,
) -> Result<ClassifiedParams> {
    let mut buffer_src: IndexMap<&str, &BufferSpec> = IndexMap::new();
    let mut buffer_len: IndexMap<&str, &BufferSpec> = IndexMap::new();
    for spec in &data.buffers {
        if spec.src == spec.len {
            return Err(LowerError::BufferAlias {
                function: func.name.clone(),
                src: spec.src.clone(),
                len: spec.len.clone(),
            });
        }
        buffer_src.insert(&spec.src, spec);
        buffer_len.insert(&spec.len, spec);
    }

    let mut out = ClassifiedParams::default();

    for (index, decl) in func.params.iter().enumerate() {
        if func.is_constructor && decl.reference > 0 {
            out.keepalives.push((1, index as u32 + 2));
        }

        let mut p = Working::new(index, decl);
        if let Some(po) = data.param_override.get(&p.name) {
            p.apply(po);
        }

        let default = p.default.as_ref().map(|d| resolve_default(d, scope));
        let mut arg = format!("py::arg(\"{}\")", p.name);
        if let Some(default) = &default {
            arg.push('=');
            arg.push_str(default);
        }

        let mut call_name = p.name.clone();
        let buffer = buffer_src.shift_remove(p.name.as_str());
        let length = buffer_len.shift_remove(p.name.as_str());

        let role = if let Some(spec) = buffer {
            let handle = format!("__{}", spec.src);
            p.constant = true;
            p.reference = 1;
            p.pointer = 0;
            call_name = format!("({}*){}.ptr", p.x_type, handle);
            p.x_type = BUFFER_HANDLE_TYPE.to_string();

            out.buffer_statements.push(format!(
                "auto {handle} = {}.request({})",
                p.name,
                spec.direction.is_writable()
            ));
            out.buffer_statements
                .push(format!("{} = {handle}.size * {handle}.itemsize", spec.len));
            if let Some(minsz) = spec.minsz.filter(|&sz| sz > 0) {
                out.buffer_statements.push(format!(
                    "if ({} < {minsz}) throw py::value_error(\"{}: minimum buffer size is {minsz}\")",
                    spec.len, p.name
                ));
            }
            out.has_buffers = true;

            ParamRole::Buffer {
                handle,
                direction: spec.direction,
                length: spec.len.clone(),
                min_size: spec.minsz,
            }
        } else if let Some(spec) = length {
            if p.pointer > 0 {
                call_name = format!("&{}", spec.len);
                ParamRole::Out
            } else {
                // The callee can't write through a value parameter.
                call_name = spec.len.clone();
                out.temporaries.push(temporary(&p));
                let handle = format!("__{}", spec.src);
                ParamRole::IgnoredTemporary {
                    value: format!("{handle}.size * {handle}.itemsize"),
                }
            }
        } else if p.force_out || (p.pointer > 0 && !p.constant && p.fundamental) {
            call_name = format!("&{call_name}");
            ParamRole::Out
        } else if p.array {
            if let Some(size) = p.array_size.filter(|&sz| sz > 0) {
                p.x_type = format!("std::array<{}, {size}>", p.x_type);
                call_name = format!("{call_name}.data()");
            }
            ParamRole::Out
        } else {
            ParamRole::In
        };

        tracing::trace!(function = %func.name, param = %p.name, role = ?role, "classified parameter");

        if !p.ignore && role == ParamRole::Out {
            out.temporaries.push(temporary(&p));
        }

        casters.record(&p.x_type);

        let x_type = if p.constant {
            format!("const {}", p.x_type)
        } else {
            p.x_type.clone()
        };
        let type_full = format!(
            "{x_type}{}{}",
            "&".repeat(p.reference as usize),
            "*".repeat(p.pointer as usize)
        );

        if p.ignore {
            continue;
        }

        out.params.push(ResolvedParam {
            decl: format!("{type_full} {}", p.name),
            ret_name: p.name.clone(),
            name: p.name,
            role,
            x_type,
            type_full,
            call_name,
            arg,
            default,
            pointer: p.pointer,
            reference: p.reference,
            constant: p.constant,
            fundamental: p.fundamental,
        });
    }

    if !buffer_src.is_empty() || !buffer_len.is_empty() {
        let names: Vec<&str> = buffer_src.keys().chain(buffer_len.keys()).copied().collect();
        return Err(LowerError::UnmatchedBuffer {
            function: func.name.clone(),
            names: names.join("', '"),
        });
    }

    if let Some(keepalive) = &data.keepalive {
        out.keepalives = keepalive.clone();
    }

    Ok(out)
}

/// Zero-initialised declaration of the temporary backing a parameter.
fn temporary(p: &Working) -> String {
    if p.x_type.starts_with("std::array<") {
        format!("{} {}{{}}", p.x_type, p.name)
    } else {
        format!("{} {} = 0", p.x_type, p.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(func: &FunctionDecl, data: &FunctionOverride) -> Result<ClassifiedParams> {
        classify_params(func, data, None, &mut TypeCasterRegistry::new())
    }

    fn buffers(specs: Vec<BufferSpec>) -> FunctionOverride {
        FunctionOverride {
            buffers: specs,
            ..FunctionOverride::default()
        }
    }

    #[test]
    fn test_plain_in_params() {
        let func = FunctionDecl::new("Set", "void")
            .with_param(ParamDecl::new("speed", "double").fundamental())
            .with_param(ParamDecl::new("name", "std::string").with_const().with_reference(1));

        let out = classify(&func, &FunctionOverride::default()).unwrap();
        assert_eq!(out.params.len(), 2);
        assert!(out.params.iter().all(|p| p.role == ParamRole::In));
        assert_eq!(out.params[1].x_type, "const std::string");
        assert_eq!(out.params[1].decl, "const std::string& name");
        assert!(out.temporaries.is_empty());
    }

    #[test]
    fn test_placeholder_names() {
        let func = FunctionDecl::new("f", "void")
            .with_param(ParamDecl::new("", "int"))
            .with_param(ParamDecl::new("", "int"));
        let out = classify(&func, &FunctionOverride::default()).unwrap();
        assert_eq!(out.params[0].name, "param0");
        assert_eq!(out.params[1].arg, "py::arg(\"param1\")");
    }

    #[test]
    fn test_fundamental_pointer_is_out() {
        let func = FunctionDecl::new("GetRange", "void")
            .with_param(ParamDecl::new("lo", "double").with_pointer(1).fundamental())
            .with_param(ParamDecl::new("hi", "uint8_t").with_pointer(1))
            .with_param(ParamDecl::new("cfg", "Config").with_pointer(1));

        let out = classify(&func, &FunctionOverride::default()).unwrap();
        assert_eq!(out.params[0].role, ParamRole::Out);
        assert_eq!(out.params[0].call_name, "&lo");
        // fixed-width integers count as fundamental
        assert_eq!(out.params[1].role, ParamRole::Out);
        assert!(out.params[1].fundamental);
        assert_eq!(out.params[2].role, ParamRole::In);
        assert_eq!(out.temporaries, vec!["double lo = 0", "uint8_t hi = 0"]);
    }

    #[test]
    fn test_const_pointer_stays_in() {
        let func = FunctionDecl::new("Sum", "int")
            .with_param(ParamDecl::new("v", "int").with_pointer(1).with_const().fundamental());
        let out = classify(&func, &FunctionOverride::default()).unwrap();
        assert_eq!(out.params[0].role, ParamRole::In);
        assert_eq!(out.params[0].type_full, "const int*");
    }

    #[test]
    fn test_force_out_override() {
        let func = FunctionDecl::new("Read", "void")
            .with_param(ParamDecl::new("status", "Status").with_reference(1));
        let mut data = FunctionOverride::default();
        data.param_override.insert(
            "status".to_string(),
            ParamOverride {
                force_out: true,
                ..ParamOverride::default()
            },
        );

        let out = classify(&func, &data).unwrap();
        assert_eq!(out.params[0].role, ParamRole::Out);
        assert_eq!(out.params[0].call_name, "&status");
    }

    #[test]
    fn test_fixed_array_out() {
        let func = FunctionDecl::new("GetMatrix", "void")
            .with_param(ParamDecl::new("m", "double").with_array(Some(9)))
            .with_param(ParamDecl::new("rest", "double").with_array(None));

        let out = classify(&func, &FunctionOverride::default()).unwrap();
        assert_eq!(out.params[0].role, ParamRole::Out);
        assert_eq!(out.params[0].x_type, "std::array<double, 9>");
        assert_eq!(out.params[0].call_name, "m.data()");
        assert_eq!(out.params[1].role, ParamRole::Out);
        assert_eq!(out.params[1].x_type, "double");
        assert_eq!(out.params[1].call_name, "rest");
        assert_eq!(out.temporaries[0], "std::array<double, 9> m{}");
    }

    #[test]
    fn test_buffer_with_value_length() {
        let func = FunctionDecl::new("Write", "int")
            .with_param(ParamDecl::new("data", "uint8_t").with_pointer(1))
            .with_param(ParamDecl::new("size", "int"));
        let data = buffers(vec![BufferSpec::new("data", "size", BufferDirection::In)]);

        let out = classify(&func, &data).unwrap();
        assert_eq!(out.params.len(), 2);

        let buf = &out.params[0];
        assert!(matches!(buf.role, ParamRole::Buffer { .. }));
        assert_eq!(buf.x_type, "const py::buffer");
        assert_eq!(buf.type_full, "const py::buffer&");
        assert_eq!(buf.call_name, "(uint8_t*)__data.ptr");
        assert!(buf.is_input());

        let len = &out.params[1];
        assert_eq!(
            len.role,
            ParamRole::IgnoredTemporary {
                value: "__data.size * __data.itemsize".to_string()
            }
        );
        assert_eq!(len.call_name, "size");
        assert!(!len.is_input());

        assert_eq!(out.temporaries, vec!["int size = 0"]);
        insta::assert_snapshot!(out.buffer_statements.join("\n"), @r"
        auto __data = data.request(false)
        size = __data.size * __data.itemsize
        ");
    }

    #[test]
    fn test_buffer_with_pointer_length_and_minimum() {
        let func = FunctionDecl::new("Read", "void")
            .with_param(ParamDecl::new("buf", "uint8_t").with_pointer(1))
            .with_param(ParamDecl::new("len", "size_t").with_pointer(1));
        let data = buffers(vec![
            BufferSpec::new("buf", "len", BufferDirection::Out).with_minsz(16)
        ]);

        let out = classify(&func, &data).unwrap();
        assert_eq!(out.params[1].role, ParamRole::Out);
        assert_eq!(out.params[1].call_name, "&len");
        assert_eq!(out.temporaries, vec!["size_t len = 0"]);
        insta::assert_snapshot!(out.buffer_statements.join("\n"), @r#"
        auto __buf = buf.request(true)
        len = __buf.size * __buf.itemsize
        if (len < 16) throw py::value_error("buf: minimum buffer size is 16")
        "#);
    }

    #[test]
    fn test_buffer_alias_rejected() {
        let func = FunctionDecl::new("Read", "void")
            .with_param(ParamDecl::new("buf", "uint8_t").with_pointer(1));
        let data = buffers(vec![BufferSpec::new("buf", "buf", BufferDirection::In)]);

        let err = classify(&func, &data).unwrap_err();
        assert!(matches!(err, LowerError::BufferAlias { .. }));
        assert_eq!(err.to_string(), "Read: buffer src(buf) and len(buf) cannot be the same");
    }

    #[test]
    fn test_unmatched_buffer_names() {
        let func = FunctionDecl::new("Read", "void")
            .with_param(ParamDecl::new("buf", "uint8_t").with_pointer(1));
        let data = buffers(vec![BufferSpec::new("buffer", "length", BufferDirection::In)]);

        let err = classify(&func, &data).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Read: incorrect buffer param names 'buffer', 'length'"
        );
    }

    #[test]
    fn test_ignored_param_still_records_type() {
        let func = FunctionDecl::new("Log", "void")
            .with_param(ParamDecl::new("ctx", "frc::Context").with_pointer(1))
            .with_param(ParamDecl::new("msg", "std::string"));
        let mut data = FunctionOverride::default();
        data.param_override.insert(
            "ctx".to_string(),
            ParamOverride {
                ignore: true,
                ..ParamOverride::default()
            },
        );

        let mut casters = TypeCasterRegistry::new();
        let out = classify_params(&func, &data, None, &mut casters).unwrap();
        assert_eq!(out.params.len(), 1);
        assert_eq!(out.params[0].name, "msg");
        assert!(casters.contains("frc::Context"));
    }

    #[test]
    fn test_override_replaces_type() {
        let func = FunctionDecl::new("Set", "void").with_param(ParamDecl::new("v", "T"));
        let mut data = FunctionOverride::default();
        data.param_override.insert(
            "v".to_string(),
            ParamOverride {
                x_type: Some("double".to_string()),
                default: Some("0.5".to_string()),
                ..ParamOverride::default()
            },
        );

        let out = classify(&func, &data).unwrap();
        assert_eq!(out.params[0].x_type, "double");
        assert_eq!(out.params[0].arg, "py::arg(\"v\")=0.5");
    }

    #[test]
    fn test_default_resolution() {
        let members = ["kDefaultPeriod"];
        let scope = MemberScope {
            qualname: "frc::Timer",
            public_members: &members,
        };

        assert_eq!(resolve_default(&DefaultValue::Int(3), Some(scope)), "3");
        assert_eq!(resolve_default(&DefaultValue::Float(0.25), Some(scope)), "0.25");
        assert_eq!(
            resolve_default(&DefaultValue::Expr("nullptr".into()), Some(scope)),
            "nullptr"
        );
        assert_eq!(
            resolve_default(&DefaultValue::Expr("kDefaultPeriod".into()), Some(scope)),
            "frc::Timer::kDefaultPeriod"
        );
        assert_eq!(
            resolve_default(&DefaultValue::Expr("kOther".into()), Some(scope)),
            "kOther"
        );
        assert_eq!(
            resolve_default(&DefaultValue::Expr("kDefaultPeriod".into()), None),
            "kDefaultPeriod"
        );
    }

    #[test]
    fn test_numeric_defaults_keep_their_spelling() {
        let params: Vec<ParamDecl> = serde_json::from_str(
            r#"[
                {"name": "mask", "raw_type": "uint64_t", "default": 18446744073709551615},
                {"name": "offset", "raw_type": "int64_t", "default": -42},
                {"name": "gain", "raw_type": "double", "default": 1.0},
                {"name": "tiny", "raw_type": "double", "default": 1e-7},
                {"name": "zero", "raw_type": "double", "default": -0.0}
            ]"#,
        )
        .unwrap();

        assert_eq!(params[0].default, Some(DefaultValue::UInt(u64::MAX)));
        let rendered: Vec<String> = params
            .iter()
            .map(|p| resolve_default(p.default.as_ref().unwrap(), None))
            .collect();
        assert_eq!(
            rendered,
            vec!["18446744073709551615", "-42", "1.0", "1e-7", "-0.0"]
        );
    }

    #[test]
    fn test_constructor_keepalives() {
        let func = FunctionDecl::constructor("Command")
            .with_param(ParamDecl::new("name", "std::string"))
            .with_param(ParamDecl::new("req", "Subsystem").with_reference(1));
        let out = classify(&func, &FunctionOverride::default()).unwrap();
        assert_eq!(out.keepalives, vec![(1, 3)]);

        let data = FunctionOverride {
            keepalive: Some(vec![]),
            ..FunctionOverride::default()
        };
        assert!(classify(&func, &data).unwrap().keepalives.is_empty());
    }
}
