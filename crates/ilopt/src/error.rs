use ilopt_core::{Name, Span};

/// Fatal conditions of the optimiser. Passes abort on the first one; the
/// tree they were working on is left in an unspecified state.
#[derive(Debug, thiserror::Error)]
pub enum OptimiserError {
    #[error("{construct} at {}:{} is not supported by the optimiser", .span.start.line, .span.start.column)]
    IllegalConstruct { construct: &'static str, span: Span },
    #[error("unresolved name `{name}` at {}:{}", .span.start.line, .span.start.column)]
    UnresolvedName { name: Name, span: Span },
    #[error(
        "function `{name}` is defined inside a body being inlined ({}:{})",
        .span.start.line,
        .span.start.column
    )]
    NestedFunctionInInlinedBody { name: Name, span: Span },
    #[error(
        "arity mismatch for `{callee}` at {}:{}: expected {expected}, found {found}",
        .span.start.line,
        .span.start.column
    )]
    ArityMismatch {
        callee: Name,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("Diagnostics emitted:\n{0}")]
    Diagnostics(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OptimiserError {
    pub fn span(&self) -> Option<Span> {
        match self {
            OptimiserError::IllegalConstruct { span, .. }
            | OptimiserError::UnresolvedName { span, .. }
            | OptimiserError::NestedFunctionInInlinedBody { span, .. }
            | OptimiserError::ArityMismatch { span, .. } => Some(*span),
            OptimiserError::Diagnostics(_) | OptimiserError::Config(_) | OptimiserError::Io(_) => {
                None
            }
        }
    }
}

pub type Result<T, E = OptimiserError> = std::result::Result<T, E>;
