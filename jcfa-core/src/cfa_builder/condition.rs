//! Branching on boolean conditions.
//!
//! Downstream analyses only understand assume edges over a single predicate, so boolean operators
//! are split into a decision tree with one pair of assume edges per operand. Operators are split
//! on the source expression first, which keeps the side effects of the right operand of `&&` and
//! `||` on the path where it is evaluated. Whatever remains after lowering is split once more.

use jcfa_ast::{self as ast, ExpressionKind as E};
use jcfa_error::error::CompileError;
use jcfa_ir::{Edge, EdgeKind, Expression, ExpressionKind, Node};
use jcfa_types::{BinaryOperator, Span, UnaryOperator};

use super::function::{FunctionBuilder, Task};
use crate::lowering::Lowered;

impl<'a, 'ast> FunctionBuilder<'a, 'ast> {
    /// Branch to `on_true` or `on_false` depending on `expression`.
    pub(super) fn lower_condition(
        &mut self,
        expression: &'ast ast::Expression,
        on_true: Node,
        on_false: Node,
    ) -> Result<(), CompileError> {
        let expression = expression.unparenthesized();
        match &expression.kind {
            E::Literal(ast::Literal::Boolean(value)) => {
                let target = if *value { on_true } else { on_false };
                self.jump(target, "");
            }
            E::Unary {
                op: UnaryOperator::Not,
                operand,
            } => self.schedule([Task::Condition {
                expression: operand,
                on_true: on_false,
                on_false: on_true,
            }]),
            E::Binary { op, lhs, rhs } if is_conjunction(*op, lhs) || is_disjunction(*op, lhs) => {
                let is_and = is_conjunction(*op, lhs);
                let rhs_node = self.new_node();
                // The eager operators still evaluate their right operand when the left one
                // decides the outcome.
                let eager_effects = !op.is_short_circuit() && rhs.has_side_effects();
                let decided = match (eager_effects, is_and) {
                    (false, true) => on_false,
                    (false, false) => on_true,
                    (true, _) => self.new_node(),
                };
                let (lhs_true, lhs_false) = match is_and {
                    true => (rhs_node, decided),
                    false => (decided, rhs_node),
                };
                let mut tasks = vec![Task::Condition {
                    expression: lhs,
                    on_true: lhs_true,
                    on_false: lhs_false,
                }];
                if eager_effects {
                    tasks.extend([
                        Task::Resume(decided),
                        Task::Evaluate(rhs),
                        Task::Jump {
                            target: if is_and { on_false } else { on_true },
                            description: "",
                        },
                    ]);
                }
                tasks.extend([
                    Task::Resume(rhs_node),
                    Task::Condition {
                        expression: rhs,
                        on_true,
                        on_false,
                    },
                ]);
                self.schedule(tasks);
            }
            E::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                let then_node = self.new_node();
                let else_node = self.new_node();
                self.schedule([
                    Task::Condition {
                        expression: condition,
                        on_true: then_node,
                        on_false: else_node,
                    },
                    Task::Resume(then_node),
                    Task::Condition {
                        expression: then_expr,
                        on_true,
                        on_false,
                    },
                    Task::Resume(else_node),
                    Task::Condition {
                        expression: else_expr,
                        on_true,
                        on_false,
                    },
                ]);
            }
            _ => {
                let Lowered { value, effects } = self.lowerer().lower_value(expression)?;
                let span = expression.span.clone();
                let (mut tasks, value) = self.settle(value, effects, &span);
                tasks.push(Task::Assume {
                    expression: value,
                    on_true,
                    on_false,
                    span,
                });
                self.schedule(tasks);
            }
        }
        Ok(())
    }

    /// Branch on a side-effect free condition, one pair of assume edges per boolean operand.
    pub(super) fn assume(
        &mut self,
        expression: Expression,
        on_true: Node,
        on_false: Node,
        span: Span,
    ) {
        match &expression.kind {
            ExpressionKind::BooleanLiteral(value) => {
                let target = if *value { on_true } else { on_false };
                self.jump(target, "");
            }
            ExpressionKind::Unary {
                op: UnaryOperator::Not,
                operand,
            } => self.schedule([Task::Assume {
                expression: (**operand).clone(),
                on_true: on_false,
                on_false: on_true,
                span,
            }]),
            ExpressionKind::Binary { op, lhs, rhs }
                if lhs.ty.is_boolean()
                    && matches!(
                        op,
                        BinaryOperator::ConditionalAnd
                            | BinaryOperator::BitAnd
                            | BinaryOperator::ConditionalOr
                            | BinaryOperator::BitOr
                    ) =>
            {
                let rhs_node = self.new_node();
                let (lhs_true, lhs_false) = match op {
                    BinaryOperator::ConditionalAnd | BinaryOperator::BitAnd => (rhs_node, on_false),
                    _ => (on_true, rhs_node),
                };
                self.schedule([
                    Task::Assume {
                        expression: (**lhs).clone(),
                        on_true: lhs_true,
                        on_false: lhs_false,
                        span: span.clone(),
                    },
                    Task::Resume(rhs_node),
                    Task::Assume {
                        expression: (**rhs).clone(),
                        on_true,
                        on_false,
                        span,
                    },
                ]);
            }
            _ => {
                if self.is_reachable(self.current) {
                    Edge::connect(
                        self.context,
                        self.current,
                        on_true,
                        EdgeKind::Assume {
                            expression: expression.clone(),
                            truth: true,
                        },
                        span.clone(),
                    );
                    Edge::connect(
                        self.context,
                        self.current,
                        on_false,
                        EdgeKind::Assume {
                            expression: expression.clone(),
                            truth: false,
                        },
                        span,
                    );
                }
                self.current = self.new_node();
            }
        }
    }
}

fn is_conjunction(op: BinaryOperator, lhs: &ast::Expression) -> bool {
    match op {
        BinaryOperator::ConditionalAnd => true,
        BinaryOperator::BitAnd => lhs.ty.is_boolean(),
        _ => false,
    }
}

fn is_disjunction(op: BinaryOperator, lhs: &ast::Expression) -> bool {
    match op {
        BinaryOperator::ConditionalOr => true,
        BinaryOperator::BitOr => lhs.ty.is_boolean(),
        _ => false,
    }
}
