//! Function and method lowering.

use serde::Serialize;
use wrapgen_config::{FunctionOverride, ReturnPolicy};

use crate::casters::TypeCasterRegistry;
use crate::decl::FunctionDecl;
use crate::error::Result;
use crate::naming::{function_name, module_var};
use crate::params::{classify_params, MemberScope, ResolvedParam};
use crate::returns::{aggregate_returns, ReturnShape, RETURN_TEMP};

/// A function ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedFunction {
    /// Native name.
    pub name: String,
    /// Exported name.
    pub x_name: String,
    pub namespace: String,
    /// Overload key the override was looked up with.
    pub signature: String,
    pub return_type: String,
    /// Parameters passed to the native call.
    pub params: Vec<ResolvedParam>,
    pub returns: ReturnShape,
    pub return_policy: ReturnPolicy,
    /// Needs a wrapper lambda rather than a direct binding.
    pub gen_lambda: bool,
    /// Prefix of the native call expression.
    pub call_start: String,
    /// Statements run before the native call.
    pub lambda_pre: Vec<String>,
    pub wrap_return: Option<String>,
    pub keepalives: Vec<(u32, u32)>,
    pub no_release_gil: bool,
    pub cpp_code: Option<String>,
    pub doc: String,
    pub doc_quoted: Vec<String>,
    pub module_var: String,
    pub internal: bool,
    pub is_constructor: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
}

impl ResolvedFunction {
    /// Parameters the caller passes.
    pub fn in_params(&self) -> impl Iterator<Item = &ResolvedParam> {
        self.params.iter().filter(|p| p.is_input())
    }

    /// Parameters returned to the caller.
    pub fn out_params(&self) -> impl Iterator<Item = &ResolvedParam> {
        self.params.iter().filter(|p| p.is_out())
    }

    /// Extra `def` argument selecting the return value policy.
    pub fn policy_arg(&self) -> &'static str {
        self.return_policy.policy_arg()
    }
}

/// Where a function is being lowered.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionContext<'a> {
    pub strip_prefixes: &'a [String],
    /// Bound as an internal (leading underscore) member.
    pub internal: bool,
    pub scope: Option<MemberScope<'a>>,
}

/// Lower one function with its matched override.
pub fn lower_function(
    func: &FunctionDecl,
    data: &FunctionOverride,
    signature: String,
    cx: FunctionContext<'_>,
    casters: &mut TypeCasterRegistry,
) -> Result<ResolvedFunction> {
    let mut x_name = function_name(&func.name, data.rename.as_deref(), cx.strip_prefixes);

    casters.record(&func.returns);

    let classified = classify_params(func, data, cx.scope, casters)?;

    let returns_void = func.returns_void();
    let returns = aggregate_returns(&func.returns, returns_void, &classified.params);
    let has_outs = classified.params.iter().any(ResolvedParam::is_out);

    let call_start = if returns_void {
        String::new()
    } else {
        format!("auto {RETURN_TEMP} =")
    };

    let mut lambda_pre = classified.temporaries;
    lambda_pre.extend(classified.buffer_statements);

    let internal = data.internal || cx.internal;
    if let Some(rename) = &data.rename {
        x_name = rename.clone();
    } else if internal {
        x_name = format!("_{x_name}");
    } else if func.is_constructor {
        x_name = "__init__".to_string();
    }

    let doc = data.doc.clone().or_else(|| func.doc.clone()).unwrap_or_default();
    let doc_quoted = quote_doc(&doc);

    Ok(ResolvedFunction {
        name: func.name.clone(),
        x_name,
        namespace: func.namespace.clone(),
        signature,
        return_type: func.returns.clone(),
        wrap_return: returns.wrap_return(),
        gen_lambda: classified.has_buffers || has_outs,
        returns,
        params: classified.params,
        return_policy: data.return_value_policy,
        call_start,
        lambda_pre,
        keepalives: classified.keepalives,
        no_release_gil: data.no_release_gil.unwrap_or(data.cpp_code.is_some()),
        cpp_code: data.cpp_code.clone(),
        doc,
        doc_quoted,
        module_var: module_var(data.subpackage.as_deref()),
        internal,
        is_constructor: func.is_constructor,
        is_static: func.is_static,
        is_virtual: func.is_virtual,
        is_pure_virtual: func.is_pure_virtual,
    })
}

/// Escape a docstring and split it into quoted string literals, one per
/// line, with line breaks kept as `\n`.
pub fn quote_doc(doc: &str) -> Vec<String> {
    if doc.is_empty() {
        return Vec::new();
    }
    let escaped = doc.replace('\\', "\\\\").replace('"', "\\\"");
    escaped
        .split_inclusive('\n')
        .map(|line| format!("\"{}\"", line.replace('\n', "\\n")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::ParamDecl;
    use crate::params::ParamRole;
    use wrapgen_config::{BufferDirection, BufferSpec};

    fn lower(func: &FunctionDecl, data: &FunctionOverride, cx: FunctionContext<'_>) -> ResolvedFunction {
        lower_function(func, data, String::new(), cx, &mut TypeCasterRegistry::new()).unwrap()
    }

    #[test]
    fn test_direct_binding() {
        let func = FunctionDecl::new("GetValue", "int");
        let f = lower(&func, &FunctionOverride::default(), FunctionContext::default());
        assert_eq!(f.x_name, "getValue");
        assert!(!f.gen_lambda);
        assert_eq!(f.call_start, "auto __ret =");
        assert_eq!(f.wrap_return.as_deref(), Some("return __ret;"));
    }

    #[test]
    fn test_out_params_need_lambda() {
        let func = FunctionDecl::new("GetRange", "void")
            .with_param(ParamDecl::new("lo", "double").with_pointer(1).fundamental())
            .with_param(ParamDecl::new("hi", "double").with_pointer(1).fundamental());
        let f = lower(&func, &FunctionOverride::default(), FunctionContext::default());

        assert!(f.gen_lambda);
        assert_eq!(f.call_start, "");
        assert_eq!(f.in_params().count(), 0);
        assert_eq!(f.out_params().count(), 2);
        insta::assert_snapshot!(f.lambda_pre.join("\n"), @r"
        double lo = 0
        double hi = 0
        ");
        assert_eq!(f.wrap_return.as_deref(), Some("return std::make_tuple(lo,hi);"));
    }

    #[test]
    fn test_buffer_with_value_length_returns_primary_only() {
        let func = FunctionDecl::new("GetValue", "int")
            .with_param(ParamDecl::new("buf", "uint8_t").with_pointer(1))
            .with_param(ParamDecl::new("len", "int"));
        let data = FunctionOverride {
            buffers: vec![BufferSpec::new("buf", "len", BufferDirection::In)],
            ..FunctionOverride::default()
        };
        let f = lower(&func, &data, FunctionContext::default());

        assert!(f.gen_lambda);
        assert!(matches!(f.params[0].role, ParamRole::Buffer { .. }));
        assert!(matches!(f.params[1].role, ParamRole::IgnoredTemporary { .. }));
        assert_eq!(f.in_params().count(), 1);
        assert_eq!(f.returns.arity(), 1);
        assert_eq!(f.returns.values()[0].ty, "int");
        insta::assert_snapshot!(f.lambda_pre.join("\n"), @r"
        int len = 0
        auto __buf = buf.request(false)
        len = __buf.size * __buf.itemsize
        ");
    }

    #[test]
    fn test_buffer_with_pointer_length_returns_length() {
        let func = FunctionDecl::new("GetValue", "int")
            .with_param(ParamDecl::new("buf", "uint8_t").with_pointer(1))
            .with_param(ParamDecl::new("len", "int").with_pointer(1));
        let data = FunctionOverride {
            buffers: vec![BufferSpec::new("buf", "len", BufferDirection::In)],
            ..FunctionOverride::default()
        };
        let f = lower(&func, &data, FunctionContext::default());

        assert!(f.gen_lambda);
        assert!(matches!(f.params[0].role, ParamRole::Buffer { .. }));
        assert_eq!(f.params[1].role, ParamRole::Out);
        assert_eq!(f.in_params().count(), 1);
        assert_eq!(f.returns.arity(), 2);
        assert_eq!(f.wrap_return.as_deref(), Some("return std::make_tuple(__ret,len);"));
    }

    #[test]
    fn test_final_naming() {
        let prefixes = vec!["HAL_".to_string()];
        let cx = FunctionContext {
            strip_prefixes: &prefixes,
            ..FunctionContext::default()
        };

        let f = lower(&FunctionDecl::new("HAL_GetValue", "int"), &FunctionOverride::default(), cx);
        assert_eq!(f.x_name, "getValue");

        let internal = FunctionContext { internal: true, ..cx };
        let f = lower(&FunctionDecl::new("Refresh", "void"), &FunctionOverride::default(), internal);
        assert_eq!(f.x_name, "_refresh");
        assert!(f.internal);

        let f = lower(&FunctionDecl::constructor("Motor"), &FunctionOverride::default(), cx);
        assert_eq!(f.x_name, "__init__");

        let renamed = FunctionOverride {
            rename: Some("Refresh".to_string()),
            ..FunctionOverride::default()
        };
        let f = lower(&FunctionDecl::new("Refresh", "void"), &renamed, internal);
        assert_eq!(f.x_name, "Refresh");
    }

    #[test]
    fn test_gil_and_doc() {
        let func = FunctionDecl::new("Run", "void").with_doc("Runs \"it\".\nTwice.");
        let f = lower(&func, &FunctionOverride::default(), FunctionContext::default());
        assert!(!f.no_release_gil);
        assert_eq!(f.doc_quoted, vec!["\"Runs \\\"it\\\".\\n\"", "\"Twice.\""]);

        let data = FunctionOverride {
            cpp_code: Some("[](){}".to_string()),
            doc: Some("Override".to_string()),
            ..FunctionOverride::default()
        };
        let f = lower(&func, &data, FunctionContext::default());
        assert!(f.no_release_gil);
        assert_eq!(f.doc, "Override");
    }

    #[test]
    fn test_return_type_recorded() {
        let mut casters = TypeCasterRegistry::new();
        let func = FunctionDecl::new("Names", "std::vector<std::string>");
        lower_function(
            &func,
            &FunctionOverride::default(),
            String::new(),
            FunctionContext::default(),
            &mut casters,
        )
        .unwrap();
        assert!(casters.contains("std::vector<std::string>"));
    }

    #[test]
    fn test_quote_doc_empty() {
        assert!(quote_doc("").is_empty());
    }
}
