use jcfa_types::{Span, Spanned};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompileError {
    #[error("\"{name}\" is already declared in this scope.")]
    DuplicateDeclaration { name: String, span: Span },
    #[error("Type \"{name}\" is declared more than once.")]
    DuplicateType { name: String, span: Span },
    #[error("Type \"{name}\" is its own ancestor.")]
    CyclicTypeHierarchy { name: String, span: Span },
    #[error("Unsupported syntax: {construct}.")]
    UnsupportedSyntax { construct: &'static str, span: Span },
    #[error("Literal \"{literal}\" does not fit into type {ty}.")]
    LiteralOutOfRange {
        literal: String,
        ty: &'static str,
        span: Span,
    },
    #[error("Malformed literal \"{literal}\".")]
    MalformedLiteral { literal: String, span: Span },
    #[error("An expression of type void cannot be used as a value.")]
    VoidValueUsed { span: Span },
    #[error("\"break\" used outside of a loop or switch.")]
    BreakOutsideLoop { span: Span },
    #[error("\"continue\" used outside of a loop.")]
    ContinueOutsideLoop { span: Span },
    #[error("Label \"{label}\" is not declared.")]
    UnknownLabel { label: String, span: Span },
    #[error("\"continue {label}\" does not refer to a loop.")]
    ContinueToNonLoopLabel { label: String, span: Span },
    #[error("Entry function \"{name}\" was not found in the program.")]
    EntryFunctionNotFound { name: String },
    #[error("Entry function \"{name}\" is ambiguous, candidates are: {}.", candidates.join(", "))]
    AmbiguousEntryFunction {
        name: String,
        candidates: Vec<String>,
    },
    #[error("{error}\nin statement: {statement}")]
    InStatement {
        statement: String,
        error: Box<CompileError>,
    },
    #[error("Internal compiler error: {0}\nPlease file an issue on the repository and include the code that triggered this error.")]
    Internal(&'static str, Span),
    #[error("Internal compiler error: {0}\nPlease file an issue on the repository and include the code that triggered this error.")]
    InternalOwned(String, Span),
}

impl CompileError {
    /// Attaches the description of the statement that was being lowered.
    ///
    /// Errors that already carry a statement are left untouched so the innermost one is reported.
    pub fn in_statement(self, statement: impl Into<String>) -> CompileError {
        match self {
            err @ CompileError::InStatement { .. } => err,
            err => CompileError::InStatement {
                statement: statement.into(),
                error: Box::new(err),
            },
        }
    }

    pub fn is_internal(&self) -> bool {
        match self {
            CompileError::Internal(..) | CompileError::InternalOwned(..) => true,
            CompileError::InStatement { error, .. } => error.is_internal(),
            _ => false,
        }
    }

    /// The error without any statement context.
    pub fn root_cause(&self) -> &CompileError {
        match self {
            CompileError::InStatement { error, .. } => error.root_cause(),
            err => err,
        }
    }
}

impl Spanned for CompileError {
    fn span(&self) -> Span {
        use CompileError::*;
        match self {
            DuplicateDeclaration { span, .. } => span.clone(),
            DuplicateType { span, .. } => span.clone(),
            CyclicTypeHierarchy { span, .. } => span.clone(),
            UnsupportedSyntax { span, .. } => span.clone(),
            LiteralOutOfRange { span, .. } => span.clone(),
            MalformedLiteral { span, .. } => span.clone(),
            VoidValueUsed { span } => span.clone(),
            BreakOutsideLoop { span } => span.clone(),
            ContinueOutsideLoop { span } => span.clone(),
            UnknownLabel { span, .. } => span.clone(),
            ContinueToNonLoopLabel { span, .. } => span.clone(),
            EntryFunctionNotFound { .. } => Span::dummy(),
            AmbiguousEntryFunction { .. } => Span::dummy(),
            InStatement { error, .. } => error.span(),
            Internal(_, span) => span.clone(),
            InternalOwned(_, span) => span.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jcfa_types::SourceId;

    #[test]
    fn statement_context_wraps_once() {
        let span = Span::on_line(SourceId::new(1), 12);
        let err = CompileError::UnsupportedSyntax {
            construct: "throw statement",
            span: span.clone(),
        }
        .in_statement("throw e;")
        .in_statement("{ throw e; }");
        assert_eq!(
            err.to_string(),
            "Unsupported syntax: throw statement.\nin statement: throw e;"
        );
        assert_eq!(err.span(), span);
        assert!(matches!(
            err.root_cause(),
            CompileError::UnsupportedSyntax { .. }
        ));
    }
}
