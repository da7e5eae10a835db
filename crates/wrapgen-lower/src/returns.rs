//! Return value aggregation.

use serde::Serialize;

use crate::params::ResolvedParam;

/// Local the primary return value is captured in.
pub const RETURN_TEMP: &str = "__ret";

/// One value handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnValue {
    pub name: String,
    pub ty: String,
}

/// What the wrapper returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ReturnShape {
    None,
    Single(ReturnValue),
    /// Primary return first, then out-parameters in declaration order.
    Tuple(Vec<ReturnValue>),
}

/// Combine the declared return type with the out-parameters.
pub fn aggregate_returns(return_type: &str, returns_void: bool, params: &[ResolvedParam]) -> ReturnShape {
    let mut values = Vec::new();
    if !returns_void {
        values.push(ReturnValue {
            name: RETURN_TEMP.to_string(),
            ty: return_type.to_string(),
        });
    }
    values.extend(params.iter().filter(|p| p.is_out()).map(|p| ReturnValue {
        name: p.ret_name.clone(),
        ty: p.x_type.clone(),
    }));

    match values.len() {
        0 => ReturnShape::None,
        1 => ReturnShape::Single(values.remove(0)),
        _ => ReturnShape::Tuple(values),
    }
}

impl ReturnShape {
    pub fn arity(&self) -> usize {
        match self {
            ReturnShape::None => 0,
            ReturnShape::Single(_) => 1,
            ReturnShape::Tuple(values) => values.len(),
        }
    }

    pub fn values(&self) -> &[ReturnValue] {
        match self {
            ReturnShape::None => &[],
            ReturnShape::Single(value) => std::slice::from_ref(value),
            ReturnShape::Tuple(values) => values,
        }
    }

    /// Return statement closing the wrapper, if any.
    pub fn wrap_return(&self) -> Option<String> {
        match self {
            ReturnShape::None => None,
            ReturnShape::Single(value) => Some(format!("return {};", value.name)),
            ReturnShape::Tuple(values) => {
                let names: Vec<&str> = values.iter().map(|v| v.name.as_str()).collect();
                Some(format!("return std::make_tuple({});", names.join(",")))
            }
        }
    }
}
