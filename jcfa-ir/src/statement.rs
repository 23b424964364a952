use jcfa_types::TypeName;
use std::{fmt, sync::Arc};

use crate::{declaration::FunctionDeclaration, expression::Expression};

/// How the target of a call is selected at run time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    Static,
    /// Dispatched on the run-time type of the receiver.
    Virtual,
    /// Bound to exactly the named function: `super.m()`, `super(..)`, `this(..)` and private
    /// methods.
    Special,
    /// Instance creation, `new C(..)`.
    Constructor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub function: Arc<FunctionDeclaration>,
    pub receiver: Option<Expression>,
    pub arguments: Vec<Expression>,
    pub kind: CallKind,
    /// Set once the receiver is known to have exactly this run-time type.
    pub receiver_type: Option<TypeName>,
}

impl FunctionCall {
    /// The call with its receiver narrowed to the given run-time type and target.
    pub fn narrowed(&self, function: Arc<FunctionDeclaration>, receiver_type: TypeName) -> Self {
        FunctionCall {
            function,
            receiver: self.receiver.clone(),
            arguments: self.arguments.clone(),
            kind: self.kind,
            receiver_type: Some(receiver_type),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Expression(Expression),
    Assignment { lhs: Expression, rhs: Expression },
    Call(FunctionCall),
    CallAssignment { lhs: Expression, call: FunctionCall },
}

impl Statement {
    pub fn call(&self) -> Option<&FunctionCall> {
        match self {
            Statement::Call(call) | Statement::CallAssignment { call, .. } => Some(call),
            _ => None,
        }
    }

    /// The same statement with the call replaced; `None` for statements without a call.
    pub fn with_call(&self, call: FunctionCall) -> Option<Statement> {
        match self {
            Statement::Call(_) => Some(Statement::Call(call)),
            Statement::CallAssignment { lhs, .. } => Some(Statement::CallAssignment {
                lhs: lhs.clone(),
                call,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .arguments
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if self.kind == CallKind::Constructor {
            return write!(
                f,
                "new {}({args})",
                self.function.declaring_type.simple_name()
            );
        }
        match &self.receiver {
            Some(receiver) => write!(f, "{receiver}.{}({args})", self.function.name)?,
            None => write!(
                f,
                "{}.{}({args})",
                self.function.declaring_type.simple_name(),
                self.function.name
            )?,
        }
        match &self.receiver_type {
            Some(ty) => write!(f, " as {}", ty.simple_name()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Expression(expr) => write!(f, "{expr};"),
            Statement::Assignment { lhs, rhs } => write!(f, "{lhs} = {rhs};"),
            Statement::Call(call) => write!(f, "{call};"),
            Statement::CallAssignment { lhs, call } => write!(f, "{lhs} = {call};"),
        }
    }
}
