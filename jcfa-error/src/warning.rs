use core::fmt;

use jcfa_types::{SourceId, Span, Spanned};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompileWarning {
    pub span: Span,
    pub warning_content: Warning,
}

impl Spanned for CompileWarning {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

impl CompileWarning {
    pub fn to_friendly_warning_string(&self) -> String {
        self.warning_content.to_string()
    }

    pub fn source_id(&self) -> Option<SourceId> {
        self.span.source_id().cloned()
    }
}

/// Unresolved symbols are lowered to placeholder declarations and reported here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Warning {
    UnresolvedVariable { name: String },
    UnresolvedField { name: String },
    UnresolvedMethod { name: String },
    /// A type referenced by the program but not declared in it.
    ExternalTypeQueued { name: String },
    UnreachableCode,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Warning::*;
        match self {
            UnresolvedVariable { name } => write!(
                f,
                "Variable \"{name}\" could not be resolved; a placeholder declaration is used."
            ),
            UnresolvedField { name } => write!(
                f,
                "Field \"{name}\" could not be resolved; a placeholder declaration is used."
            ),
            UnresolvedMethod { name } => write!(
                f,
                "Method \"{name}\" could not be resolved; a placeholder declaration is used."
            ),
            ExternalTypeQueued { name } => write!(
                f,
                "Type \"{name}\" is not part of the program and was queued for parsing."
            ),
            UnreachableCode => write!(f, "This code is unreachable."),
        }
    }
}
