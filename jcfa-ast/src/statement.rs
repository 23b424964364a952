use jcfa_types::{JType, Span, Spanned};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Expression, MethodBinding, Parameter, TypeDeclaration};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<Statement>, span: Span) -> Self {
        Block { statements, span }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclarator {
    pub name: String,
    pub ty: JType,
    pub initializer: Option<Expression>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Empty for the `default` case.
    pub labels: Vec<Expression>,
    pub is_default: bool,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructorInvocationKind {
    This,
    Super,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    Block(Block),
    LocalVariable {
        is_final: bool,
        declarators: Vec<VariableDeclarator>,
    },
    Expression(Expression),
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        condition: Expression,
    },
    For {
        init: Vec<Statement>,
        condition: Option<Expression>,
        update: Vec<Expression>,
        body: Box<Statement>,
    },
    ForEach {
        variable: Parameter,
        iterable: Expression,
        body: Box<Statement>,
    },
    Switch {
        selector: Expression,
        cases: Vec<SwitchCase>,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Return(Option<Expression>),
    Labeled {
        label: String,
        body: Box<Statement>,
    },
    Assert {
        condition: Expression,
        message: Option<Expression>,
    },
    Synchronized {
        lock: Expression,
        body: Block,
    },
    ConstructorInvocation {
        kind: ConstructorInvocationKind,
        arguments: Vec<Expression>,
        constructor: Option<MethodBinding>,
    },
    Throw(Expression),
    Try(Block),
    LocalTypeDeclaration(Box<TypeDeclaration>),
    Empty,
}

impl Statement {
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Statement { kind, span }
    }
}

impl Spanned for Statement {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

/// A one-line rendering of the statement head, for diagnostics.
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StatementKind::Block(_) => write!(f, "{{ .. }}"),
            StatementKind::LocalVariable { declarators, .. } => {
                let Some(first) = declarators.first() else {
                    return write!(f, ";");
                };
                write!(f, "{} ", first.ty)?;
                let decls = declarators
                    .iter()
                    .map(|decl| match &decl.initializer {
                        Some(init) => format!("{} = {init}", decl.name),
                        None => decl.name.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{decls};")
            }
            StatementKind::Expression(expr) => write!(f, "{expr};"),
            StatementKind::If { condition, .. } => write!(f, "if ({condition}) .."),
            StatementKind::While { condition, .. } => write!(f, "while ({condition}) .."),
            StatementKind::DoWhile { condition, .. } => write!(f, "do .. while ({condition});"),
            StatementKind::For { condition, .. } => match condition {
                Some(condition) => write!(f, "for (..; {condition}; ..) .."),
                None => write!(f, "for (..;; ..) .."),
            },
            StatementKind::ForEach {
                variable, iterable, ..
            } => write!(f, "for ({} {} : {iterable}) ..", variable.ty, variable.name),
            StatementKind::Switch { selector, .. } => write!(f, "switch ({selector}) .."),
            StatementKind::Break { label: None } => write!(f, "break;"),
            StatementKind::Break { label: Some(label) } => write!(f, "break {label};"),
            StatementKind::Continue { label: None } => write!(f, "continue;"),
            StatementKind::Continue { label: Some(label) } => write!(f, "continue {label};"),
            StatementKind::Return(None) => write!(f, "return;"),
            StatementKind::Return(Some(expr)) => write!(f, "return {expr};"),
            StatementKind::Labeled { label, .. } => write!(f, "{label}: .."),
            StatementKind::Assert { condition, .. } => write!(f, "assert {condition};"),
            StatementKind::Synchronized { lock, .. } => write!(f, "synchronized ({lock}) .."),
            StatementKind::ConstructorInvocation { kind, .. } => match kind {
                ConstructorInvocationKind::This => write!(f, "this(..);"),
                ConstructorInvocationKind::Super => write!(f, "super(..);"),
            },
            StatementKind::Throw(expr) => write!(f, "throw {expr};"),
            StatementKind::Try(_) => write!(f, "try .."),
            StatementKind::LocalTypeDeclaration(decl) => {
                write!(f, "class {} ..", decl.name.simple_name())
            }
            StatementKind::Empty => write!(f, ";"),
        }
    }
}
