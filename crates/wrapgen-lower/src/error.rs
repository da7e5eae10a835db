//! Lowering errors.
//!
//! Every variant is a configuration error: it aborts lowering of the
//! current header rather than producing an inconsistent binding.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for lowering operations.
pub type Result<T> = std::result::Result<T, LowerError>;

#[derive(Error, Diagnostic, Debug)]
pub enum LowerError {
    /// A buffer spec names the same parameter as source and length.
    #[error("{function}: buffer src({src}) and len({len}) cannot be the same")]
    #[diagnostic(
        code(wrapgen::buffer_alias),
        help("point `len` at the parameter carrying the buffer length")
    )]
    BufferAlias {
        function: String,
        src: String,
        len: String,
    },

    /// Buffer spec names that no parameter consumed.
    #[error("{function}: incorrect buffer param names '{names}'")]
    #[diagnostic(
        code(wrapgen::unmatched_buffer),
        help("buffer `src` and `len` must name parameters of the function")
    )]
    UnmatchedBuffer { function: String, names: String },

    /// `ignored_bases` lists names that are not declared bases.
    #[error("{class}: ignored_bases contains non-existent bases {invalid}; valid bases are {valid}")]
    #[diagnostic(code(wrapgen::ignored_bases))]
    InvalidIgnoredBases {
        class: String,
        invalid: String,
        valid: String,
    },

    /// The same qualified class name was lowered twice in one run.
    #[error("duplicate class {0}")]
    #[diagnostic(code(wrapgen::duplicate_class))]
    DuplicateClass(String),

    /// Two headers define the same class.
    #[error("duplicate class {class} (defined by {first} and {second})")]
    #[diagnostic(code(wrapgen::duplicate_header_class))]
    DuplicateHeaderClass {
        class: String,
        first: String,
        second: String,
    },

    /// Header dependencies form a cycle.
    #[error("class dependency cycle between {0}")]
    #[diagnostic(code(wrapgen::dependency_cycle))]
    DependencyCycle(String),

    /// A method failed to lower; `path` is `Class::method`.
    #[error("{path}")]
    Method {
        path: String,
        #[source]
        source: Box<LowerError>,
    },
}

impl LowerError {
    /// Wrap an error raised while lowering a method of `class_key`.
    pub fn in_method(self, class_key: &str, method: &str) -> Self {
        LowerError::Method {
            path: format!("{class_key}::{method}"),
            source: Box::new(self),
        }
    }
}
