//! Linearization of expressions into side-effect free form.
//!
//! Lowering one expression yields a side-effect free CFA expression plus two ordered queues of
//! [`SideEffect`]s: those which must run before the expression's own edge and those which run
//! after it, i.e. postfix increments and decrements. The CFA builder drains both queues into
//! edges around the edge that consumes the value.

mod expression;
mod literal;

pub use expression::ExpressionLowerer;
pub(crate) use expression::{external_function, field_access};

use jcfa_ast as ast;
use jcfa_ir::{Declaration, Expression, FunctionCall, Statement, VariableDeclaration};
use jcfa_types::Span;
use std::{collections::VecDeque, sync::Arc};

/// A value which may be assigned to a variable: either a side-effect free expression or the
/// result of a call.
#[derive(Clone, Debug, PartialEq)]
pub enum Rhs {
    Expression(Expression),
    Call(FunctionCall),
}

impl Rhs {
    /// The statement assigning this value to `lhs`.
    pub fn assign_to(self, lhs: Expression) -> Statement {
        match self {
            Rhs::Expression(rhs) => Statement::Assignment { lhs, rhs },
            Rhs::Call(call) => Statement::CallAssignment { lhs, call },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SideEffect<'ast> {
    /// Declares a fresh temporary holding an intermediate value.
    Temporary {
        declaration: Arc<VariableDeclaration>,
        value: Rhs,
        span: Span,
    },
    /// An assignment made by a nested assignment, increment or decrement.
    Statement { statement: Statement, span: Span },
    /// A conditional expression whose arms may only be evaluated once the branch is taken.
    Conditional(PendingConditional<'ast>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConditionalArm<'ast> {
    Expression(&'ast ast::Expression),
    /// The fixed outcome of a short-circuit operator, e.g. `false` for the else arm of `a && b`.
    Constant(bool),
}

/// `temporary = condition ? then_arm : else_arm`, expanded into branches by the CFA builder.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingConditional<'ast> {
    pub temporary: Arc<VariableDeclaration>,
    pub condition: &'ast ast::Expression,
    pub then_arm: ConditionalArm<'ast>,
    pub else_arm: ConditionalArm<'ast>,
    pub span: Span,
}

impl PendingConditional<'_> {
    pub fn target(&self) -> Expression {
        Expression::id(Declaration::Variable(self.temporary.clone()))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SideEffects<'ast> {
    pub pre: VecDeque<SideEffect<'ast>>,
    pub post: VecDeque<SideEffect<'ast>>,
}

impl SideEffects<'_> {
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pre.len() + self.post.len()
    }
}

/// The result of lowering one expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Lowered<'ast, T> {
    pub value: T,
    pub effects: SideEffects<'ast>,
}
