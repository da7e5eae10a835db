//! Semantic lowering for the wrapgen binding generator.
//!
//! This crate provides:
//! - The parsed declaration model handed over by the header parser
//! - Override lookup with missing-symbol reporting
//! - Parameter classification and return aggregation
//! - Class hierarchy resolution and member filtering
//! - Run-wide type-caster and class hierarchy registries
//!
//! # Architecture
//!
//! ```text
//! HeaderDecls + OverrideFile → Lowerer → LoweredHeader → renderer
//!                                 ↓
//!                             RunContext (casters, hierarchy)
//! ```

mod casters;
mod class;
mod decl;
mod enums;
mod error;
mod filter;
mod function;
mod hierarchy;
mod lower;
mod naming;
mod params;
mod registry;
mod returns;
mod types;

pub use casters::TypeCasterRegistry;
pub use class::{ResolvedClass, ResolvedMethod};
pub use decl::{
    AccessLevel, BaseDecl, ClassDecl, DefaultValue, EnumDecl, EnumValueDecl, FunctionDecl,
    HeaderDecls, MethodDecl, ParamDecl, PropertyDecl,
};
pub use enums::{lower_enum, short_value_name, ResolvedEnum, ResolvedEnumValue};
pub use error::{LowerError, Result};
pub use filter::{
    is_readonly, method_exclusion, property_exclusion, ClassIdent, Exclusion, ResolvedProperty,
};
pub use function::{lower_function, FunctionContext, ResolvedFunction};
pub use hierarchy::{
    filter_bases, init_order, is_polymorphic, requires_trampoline, resolve_base_qualname,
    ClassHierarchy, ResolvedBase,
};
pub use lower::{lower_header, IgnoredDecl, LoweredHeader, Lowerer, RunContext, RunOutput};
pub use naming::{function_name, mangle, module_var, resolve_name, trampoline_name, using_signature};
pub use params::{classify_params, ClassifiedParams, MemberScope, ParamRole, ResolvedParam};
pub use registry::{function_signature, MissingClass, MissingReport, MissingReporter, OverrideRegistry};
pub use returns::{aggregate_returns, ReturnShape, ReturnValue};
