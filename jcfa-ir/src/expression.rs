//! Side-effect free expressions, the only kind of expression an edge may carry.

use jcfa_types::{BinaryOperator, JType, TypeName, UnaryOperator};
use std::{fmt, sync::Arc};

use crate::declaration::{Declaration, FieldDeclaration};

#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub ty: JType,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExpressionKind {
    IntegerLiteral(i64),
    FloatLiteral(f64),
    CharLiteral(char),
    StringLiteral(String),
    BooleanLiteral(bool),
    NullLiteral,
    /// A reference to a variable, parameter or field by its declaration.
    Id(Declaration),
    /// `target.field`; the target is `None` for static fields.
    FieldAccess {
        target: Option<Box<Expression>>,
        field: Arc<FieldDeclaration>,
    },
    ArraySubscript {
        array: Box<Expression>,
        index: Box<Expression>,
    },
    /// `array.length`, which is not a field access.
    ArrayLength(Box<Expression>),
    ArrayCreation {
        element_type: JType,
        dimensions: Vec<Expression>,
        initializer: Option<Box<Expression>>,
    },
    ArrayInitializer(Vec<Expression>),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Cast {
        target: JType,
        operand: Box<Expression>,
    },
    This,
    /// True iff the dynamic type of `operand` is exactly `type_name`.
    RuntimeTypeEquals {
        operand: Box<Expression>,
        type_name: TypeName,
    },
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: JType) -> Self {
        Expression { kind, ty }
    }

    pub fn int(value: i64) -> Self {
        Expression::new(ExpressionKind::IntegerLiteral(value), JType::int())
    }

    pub fn boolean(value: bool) -> Self {
        Expression::new(ExpressionKind::BooleanLiteral(value), JType::boolean())
    }

    pub fn null() -> Self {
        Expression::new(ExpressionKind::NullLiteral, JType::Null)
    }

    pub fn id(declaration: Declaration) -> Self {
        let ty = declaration.ty().clone();
        Expression::new(ExpressionKind::Id(declaration), ty)
    }

    pub fn binary(op: BinaryOperator, lhs: Expression, rhs: Expression, ty: JType) -> Self {
        Expression::new(
            ExpressionKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn not(operand: Expression) -> Self {
        Expression::new(
            ExpressionKind::Unary {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            },
            JType::boolean(),
        )
    }

    pub fn array_length(array: Expression) -> Self {
        Expression::new(ExpressionKind::ArrayLength(Box::new(array)), JType::int())
    }

    pub fn runtime_type_equals(operand: Expression, type_name: TypeName) -> Self {
        Expression::new(
            ExpressionKind::RuntimeTypeEquals {
                operand: Box::new(operand),
                type_name,
            },
            JType::boolean(),
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::IntegerLiteral(_)
                | ExpressionKind::FloatLiteral(_)
                | ExpressionKind::CharLiteral(_)
                | ExpressionKind::StringLiteral(_)
                | ExpressionKind::BooleanLiteral(_)
                | ExpressionKind::NullLiteral
        )
    }

    /// Whether the expression denotes a storage location that may be assigned.
    pub fn is_lvalue(&self) -> bool {
        match &self.kind {
            ExpressionKind::Id(decl) => !matches!(
                decl,
                Declaration::Method(_) | Declaration::Constructor(_)
            ),
            ExpressionKind::FieldAccess { .. } | ExpressionKind::ArraySubscript { .. } => true,
            _ => false,
        }
    }

    /// Every declaration referenced by the expression, in evaluation order.
    pub fn referenced_declarations(&self) -> Vec<&Declaration> {
        let mut decls = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match &expr.kind {
                ExpressionKind::Id(decl) => decls.push(decl),
                ExpressionKind::FieldAccess { target, .. } => stack.extend(target.as_deref()),
                ExpressionKind::ArraySubscript { array, index } => {
                    stack.push(index);
                    stack.push(array);
                }
                ExpressionKind::ArrayLength(operand)
                | ExpressionKind::Unary { operand, .. }
                | ExpressionKind::Cast { operand, .. }
                | ExpressionKind::RuntimeTypeEquals { operand, .. } => stack.push(operand),
                ExpressionKind::Binary { lhs, rhs, .. } => {
                    stack.push(rhs);
                    stack.push(lhs);
                }
                ExpressionKind::ArrayCreation {
                    dimensions,
                    initializer,
                    ..
                } => {
                    stack.extend(initializer.as_deref());
                    stack.extend(dimensions.iter().rev());
                }
                ExpressionKind::ArrayInitializer(elements) => stack.extend(elements.iter().rev()),
                _ => {}
            }
        }
        decls
    }
}

fn needs_parens(expr: &Expression) -> bool {
    matches!(
        expr.kind,
        ExpressionKind::Binary { .. } | ExpressionKind::Cast { .. }
    )
}

struct Operand<'a>(&'a Expression);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if needs_parens(self.0) {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::IntegerLiteral(value) => match self.ty {
                JType::Primitive(jcfa_types::PrimitiveType::Long) => write!(f, "{value}L"),
                _ => write!(f, "{value}"),
            },
            ExpressionKind::FloatLiteral(value) => write!(f, "{value:?}"),
            ExpressionKind::CharLiteral(c) => write!(f, "{c:?}"),
            ExpressionKind::StringLiteral(s) => write!(f, "{s:?}"),
            ExpressionKind::BooleanLiteral(b) => write!(f, "{b}"),
            ExpressionKind::NullLiteral => write!(f, "null"),
            ExpressionKind::Id(decl) => write!(f, "{}", decl.name()),
            ExpressionKind::FieldAccess { target, field } => match target {
                Some(target) => write!(f, "{}.{}", Operand(target), field.name),
                None => write!(f, "{}.{}", field.declaring_type.simple_name(), field.name),
            },
            ExpressionKind::ArraySubscript { array, index } => {
                write!(f, "{}[{index}]", Operand(array))
            }
            ExpressionKind::ArrayLength(array) => write!(f, "{}.length", Operand(array)),
            ExpressionKind::ArrayCreation {
                element_type,
                dimensions,
                initializer,
            } => {
                write!(f, "new {element_type}")?;
                for dim in dimensions {
                    write!(f, "[{dim}]")?;
                }
                match initializer {
                    Some(init) => write!(f, "[] {init}"),
                    None => Ok(()),
                }
            }
            ExpressionKind::ArrayInitializer(elements) => {
                let elements = elements
                    .iter()
                    .map(|elem| elem.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{elements}}}")
            }
            ExpressionKind::Unary { op, operand } => write!(f, "{op}{}", Operand(operand)),
            ExpressionKind::Binary { op, lhs, rhs } => {
                write!(f, "{} {op} {}", Operand(lhs), Operand(rhs))
            }
            ExpressionKind::Cast { target, operand } => {
                write!(f, "({target}) {}", Operand(operand))
            }
            ExpressionKind::This => write!(f, "this"),
            ExpressionKind::RuntimeTypeEquals { operand, type_name } => {
                write!(f, "runtimeType({operand}) == {type_name}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::VariableDeclaration;
    use jcfa_types::Span;

    fn var(name: &str) -> Expression {
        Expression::id(Declaration::Variable(Arc::new(VariableDeclaration::unresolved(
            name,
            JType::int(),
            Span::dummy(),
        ))))
    }

    #[test]
    fn display_parenthesizes_nested_binaries() {
        let sum = Expression::binary(BinaryOperator::Add, var("a"), var("b"), JType::int());
        let product =
            Expression::binary(BinaryOperator::Mul, sum, Expression::int(2), JType::int());
        assert_eq!(product.to_string(), "(a + b) * 2");
        assert_eq!(Expression::not(var("c")).to_string(), "!c");
    }

    #[test]
    fn referenced_declarations_in_evaluation_order() {
        let expr = Expression::binary(
            BinaryOperator::Add,
            var("a"),
            Expression::binary(BinaryOperator::Sub, var("b"), var("c"), JType::int()),
            JType::int(),
        );
        let names = expr
            .referenced_declarations()
            .into_iter()
            .map(|decl| decl.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
