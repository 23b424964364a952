use jcfa_types::{
    BinaryOperator, Fixity, IncDecOperator, JType, Span, Spanned, TypeName, UnaryOperator,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FieldBinding, MethodBinding, NameBinding, Parameter, Statement};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    /// The resolved type of the expression.
    pub ty: JType,
    pub span: Span,
}

/// Literal tokens are kept as written so that range checks see the original text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(String),
    Floating(String),
    Character(char),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    Literal(Literal),
    Name {
        name: String,
        binding: NameBinding,
    },
    FieldAccess {
        target: Box<Expression>,
        name: String,
        /// `None` when the front end could not resolve the field, and for `array.length`.
        field: Option<FieldBinding>,
    },
    ArrayAccess {
        array: Box<Expression>,
        index: Box<Expression>,
    },
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
    IncDec {
        op: IncDecOperator,
        fixity: Fixity,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// `lhs = rhs` when `op` is `None`, otherwise the compound form `lhs op= rhs`.
    Assignment {
        op: Option<BinaryOperator>,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Box<Expression>,
    },
    Cast {
        target: JType,
        operand: Box<Expression>,
    },
    InstanceOf {
        operand: Box<Expression>,
        target: TypeName,
    },
    MethodCall {
        receiver: Option<Box<Expression>>,
        name: String,
        arguments: Vec<Expression>,
        method: Option<MethodBinding>,
        /// `super.name(..)`, always bound statically.
        is_super: bool,
    },
    New {
        class: TypeName,
        arguments: Vec<Expression>,
        constructor: Option<MethodBinding>,
    },
    This,
    Parenthesized(Box<Expression>),
    Lambda {
        parameters: Vec<Parameter>,
        body: Box<Statement>,
    },
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: JType, span: Span) -> Self {
        Expression { kind, ty, span }
    }

    /// Strips any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expression {
        let mut expr = self;
        while let ExpressionKind::Parenthesized(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }

    /// Whether evaluating the expression can change program state.
    ///
    /// Calls, instance creation, assignments and increments count as effects. Array creation does
    /// not, unless one of its dimensions or initializers has an effect.
    pub fn has_side_effects(&self) -> bool {
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match &expr.kind {
                ExpressionKind::MethodCall { .. }
                | ExpressionKind::New { .. }
                | ExpressionKind::Assignment { .. }
                | ExpressionKind::IncDec { .. } => return true,
                ExpressionKind::Conditional {
                    condition,
                    then_expr,
                    else_expr,
                } => stack.extend([&**condition, &**then_expr, &**else_expr]),
                ExpressionKind::FieldAccess { target, .. } => stack.push(target),
                ExpressionKind::ArrayAccess { array, index } => stack.extend([&**array, &**index]),
                ExpressionKind::ArrayCreation {
                    dimensions,
                    initializer,
                    ..
                } => {
                    stack.extend(dimensions.iter());
                    stack.extend(initializer.as_deref());
                }
                ExpressionKind::ArrayInitializer(elements) => stack.extend(elements.iter()),
                ExpressionKind::Unary { operand, .. }
                | ExpressionKind::Cast { operand, .. }
                | ExpressionKind::InstanceOf { operand, .. }
                | ExpressionKind::Parenthesized(operand) => stack.push(operand),
                ExpressionKind::Binary { lhs, rhs, .. } => stack.extend([&**lhs, &**rhs]),
                ExpressionKind::Literal(_)
                | ExpressionKind::Name { .. }
                | ExpressionKind::This
                | ExpressionKind::Lambda { .. } => {}
            }
        }
        false
    }

    /// The direct operands of the expression, in evaluation order.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            ExpressionKind::FieldAccess { target, .. } => vec![&**target],
            ExpressionKind::ArrayAccess { array, index } => vec![&**array, &**index],
            ExpressionKind::ArrayCreation {
                dimensions,
                initializer,
                ..
            } => dimensions.iter().chain(initializer.as_deref()).collect(),
            ExpressionKind::ArrayInitializer(elements) => elements.iter().collect(),
            ExpressionKind::Unary { operand, .. }
            | ExpressionKind::IncDec { operand, .. }
            | ExpressionKind::Cast { operand, .. }
            | ExpressionKind::InstanceOf { operand, .. }
            | ExpressionKind::Parenthesized(operand) => vec![&**operand],
            ExpressionKind::Binary { lhs, rhs, .. }
            | ExpressionKind::Assignment { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            ExpressionKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => vec![&**condition, &**then_expr, &**else_expr],
            ExpressionKind::MethodCall {
                receiver,
                arguments,
                ..
            } => receiver.as_deref().into_iter().chain(arguments).collect(),
            ExpressionKind::New { arguments, .. } => arguments.iter().collect(),
            ExpressionKind::Literal(_)
            | ExpressionKind::Name { .. }
            | ExpressionKind::This
            | ExpressionKind::Lambda { .. } => vec![],
        }
    }

    /// How often a variable or field called `name` is referenced within the expression.
    pub fn count_references(&self, name: &str) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match &expr.kind {
                ExpressionKind::Name { name: found, .. }
                | ExpressionKind::FieldAccess { name: found, .. }
                    if found == name =>
                {
                    count += 1
                }
                _ => {}
            }
            stack.extend(expr.children());
        }
        count
    }

    /// The name of the variable, field or array an assignable expression writes to.
    pub fn assigned_name(&self) -> Option<&str> {
        let mut expr = self.unparenthesized();
        loop {
            match &expr.kind {
                ExpressionKind::Name { name, .. } | ExpressionKind::FieldAccess { name, .. } => {
                    return Some(name)
                }
                ExpressionKind::ArrayAccess { array, .. } => expr = array.unparenthesized(),
                _ => return None,
            }
        }
    }
}

impl Spanned for Expression {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

fn comma_separated(exprs: &[Expression]) -> String {
    exprs
        .iter()
        .map(|expr| expr.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(text) | Literal::Floating(text) => write!(f, "{text}"),
            Literal::Character(c) => write!(f, "{c:?}"),
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Null => write!(f, "null"),
        }
    }
}

/// Renders the expression close to its source form, for diagnostics.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Literal(literal) => write!(f, "{literal}"),
            ExpressionKind::Name { name, .. } => write!(f, "{name}"),
            ExpressionKind::FieldAccess { target, name, .. } => write!(f, "{target}.{name}"),
            ExpressionKind::ArrayAccess { array, index } => write!(f, "{array}[{index}]"),
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
                write!(f, "{{{}}}", comma_separated(elements))
            }
            ExpressionKind::Unary { op, operand } => write!(f, "{op}{operand}"),
            ExpressionKind::IncDec {
                op,
                fixity: Fixity::Prefix,
                operand,
            } => write!(f, "{}{operand}", op.as_str()),
            ExpressionKind::IncDec {
                op,
                fixity: Fixity::Postfix,
                operand,
            } => write!(f, "{operand}{}", op.as_str()),
            ExpressionKind::Binary { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
            ExpressionKind::Assignment { op, lhs, rhs } => match op {
                Some(op) => write!(f, "{lhs} {op}= {rhs}"),
                None => write!(f, "{lhs} = {rhs}"),
            },
            ExpressionKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => write!(f, "{condition} ? {then_expr} : {else_expr}"),
            ExpressionKind::Cast { target, operand } => write!(f, "({target}) {operand}"),
            ExpressionKind::InstanceOf { operand, target } => {
                write!(f, "{operand} instanceof {target}")
            }
            ExpressionKind::MethodCall {
                receiver,
                name,
                arguments,
                is_super,
                ..
            } => {
                if *is_super {
                    write!(f, "super.")?;
                } else if let Some(receiver) = receiver {
                    write!(f, "{receiver}.")?;
                }
                write!(f, "{name}({})", comma_separated(arguments))
            }
            ExpressionKind::New {
                class, arguments, ..
            } => write!(f, "new {}({})", class.simple_name(), comma_separated(arguments)),
            ExpressionKind::This => write!(f, "this"),
            ExpressionKind::Parenthesized(inner) => write!(f, "({inner})"),
            ExpressionKind::Lambda { parameters, .. } => {
                let params = parameters
                    .iter()
                    .map(|param| param.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "({params}) -> {{ .. }}")
            }
        }
    }
}
