//! Lowering driver.
//!
//! A [`Lowerer`] owns the override registry for one header and the run
//! context shared by every header of a generation run. Callers either drive
//! it declaration by declaration or use [`lower_header`] for a whole header.

use indexmap::IndexMap;
use serde::Serialize;
use wrapgen_config::{CasterTable, OverrideFile};

use crate::casters::TypeCasterRegistry;
use crate::class::ResolvedClass;
use crate::decl::{EnumDecl, FunctionDecl, HeaderDecls, PropertyDecl};
use crate::enums::{self, ResolvedEnum};
use crate::error::Result;
use crate::filter::{resolve_property, Exclusion, ResolvedProperty};
use crate::function::{self, FunctionContext, ResolvedFunction};
use crate::hierarchy::ClassHierarchy;
use crate::naming::module_var;
use crate::registry::{function_signature, MissingReport, OverrideRegistry};

/// State accumulated over a whole generation run.
///
/// Thread one context through every header of a run, or give each worker
/// its own and merge them afterwards.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub casters: TypeCasterRegistry,
    pub hierarchy: ClassHierarchy,
    /// Subpackage → module variable.
    pub subpackages: IndexMap<String, String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a worker's context into this one.
    pub fn merge(&mut self, other: RunContext) -> Result<()> {
        self.casters.merge(other.casters);
        self.hierarchy.merge(other.hierarchy)?;
        self.subpackages.extend(other.subpackages);
        Ok(())
    }
}

/// A declaration that produces no binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoredDecl {
    pub name: String,
    pub reason: Exclusion,
}

/// What a [`Lowerer`] hands back when done.
#[derive(Debug)]
pub struct RunOutput {
    pub context: RunContext,
    pub missing: MissingReport,
    pub ignored: Vec<IgnoredDecl>,
}

/// Lowers the declarations of one header.
pub struct Lowerer<'a> {
    pub(crate) registry: OverrideRegistry<'a>,
    pub(crate) ctx: RunContext,
    pub(crate) ignored: Vec<IgnoredDecl>,
}

impl<'a> Lowerer<'a> {
    pub fn new(overrides: &'a OverrideFile) -> Self {
        Self::with_context(overrides, RunContext::new())
    }

    /// Continue a run with the context left by previous headers.
    pub fn with_context(overrides: &'a OverrideFile, ctx: RunContext) -> Self {
        Self {
            registry: OverrideRegistry::new(overrides),
            ctx,
            ignored: Vec::new(),
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub(crate) fn strip_prefixes(&self) -> &'a [String] {
        self.registry.strip_prefixes()
    }

    pub(crate) fn ignore(&mut self, name: &str, reason: Exclusion) {
        tracing::debug!(name, ?reason, "ignored");
        self.ignored.push(IgnoredDecl {
            name: name.to_string(),
            reason,
        });
    }

    /// Register a subpackage and return its module variable.
    pub(crate) fn subpackage(&mut self, subpackage: Option<&str>) -> String {
        let var = module_var(subpackage);
        if let Some(subpackage) = subpackage {
            self.ctx
                .subpackages
                .insert(subpackage.to_string(), var.clone());
        }
        var
    }

    /// Lower a free function; `None` if it is not bound.
    pub fn lower_function(&mut self, func: &FunctionDecl) -> Result<Option<ResolvedFunction>> {
        if func.is_operator {
            self.ignore(&func.name, Exclusion::Operator);
            return Ok(None);
        }

        let signature = function_signature(func);
        let data = self.registry.function(&func.name, &signature);
        if data.ignore {
            self.ignore(&func.name, Exclusion::Ignored);
            return Ok(None);
        }
        self.subpackage(data.subpackage.as_deref());

        let cx = FunctionContext {
            strip_prefixes: self.strip_prefixes(),
            ..FunctionContext::default()
        };
        let resolved = function::lower_function(func, &data, signature, cx, &mut self.ctx.casters)?;
        tracing::debug!(name = %func.name, x_name = %resolved.x_name, "lowered function");
        Ok(Some(resolved))
    }

    /// Lower a header-level enum; `None` if it is not bound.
    pub fn lower_enum(&mut self, decl: &EnumDecl) -> Option<ResolvedEnum> {
        let data = self.registry.enum_(decl.name.as_deref());
        if data.ignore {
            self.ignore(decl.name.as_deref().unwrap_or_default(), Exclusion::Ignored);
            return None;
        }
        self.subpackage(data.subpackage.as_deref());
        Some(enums::lower_enum(
            decl,
            &data,
            &decl.namespace,
            self.strip_prefixes(),
        ))
    }

    /// Lower a header-level variable; `None` if it is not bound.
    pub fn lower_variable(&mut self, var: &PropertyDecl) -> Option<ResolvedProperty> {
        let data = self.registry.variable(&var.name);
        self.ctx.casters.record(&var.raw_type);
        if data.ignore {
            self.ignore(&var.name, Exclusion::Ignored);
            return None;
        }
        Some(resolve_property(var, &data))
    }

    pub fn finish(self) -> RunOutput {
        RunOutput {
            context: self.ctx,
            missing: self.registry.into_missing(),
            ignored: self.ignored,
        }
    }
}

/// Everything the renderer needs for one header.
#[derive(Debug, Serialize)]
pub struct LoweredHeader {
    pub enums: Vec<ResolvedEnum>,
    pub variables: Vec<ResolvedProperty>,
    pub functions: Vec<ResolvedFunction>,
    /// Classes in lowering order; nested classes follow their parent.
    pub classes: Vec<ResolvedClass>,
    pub ignored: Vec<IgnoredDecl>,
    /// Sorted caster headers to include.
    pub type_caster_includes: Vec<String>,
    pub class_hierarchy: ClassHierarchy,
    pub subpackages: IndexMap<String, String>,
    #[serde(skip)]
    pub missing: MissingReport,
}

/// Lower every declaration of one header in a single pass.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(
        functions = header.functions.len(),
        classes = header.classes.len(),
        enums = header.enums.len(),
    )
)]
pub fn lower_header(
    header: &HeaderDecls,
    overrides: &OverrideFile,
    casters: &CasterTable,
) -> Result<LoweredHeader> {
    let mut lowerer = Lowerer::new(overrides);

    let enums = header
        .enums
        .iter()
        .filter_map(|e| lowerer.lower_enum(e))
        .collect();
    let variables = header
        .variables
        .iter()
        .filter_map(|v| lowerer.lower_variable(v))
        .collect();

    let mut functions = Vec::new();
    for func in &header.functions {
        functions.extend(lowerer.lower_function(func)?);
    }

    let mut classes = Vec::new();
    for class in &header.classes {
        classes.extend(lowerer.lower_class(class)?);
    }

    let RunOutput {
        context,
        missing,
        ignored,
    } = lowerer.finish();

    Ok(LoweredHeader {
        enums,
        variables,
        functions,
        classes,
        ignored,
        type_caster_includes: context.casters.resolve_includes(casters),
        class_hierarchy: context.hierarchy,
        subpackages: context.subpackages,
        missing,
    })
}
