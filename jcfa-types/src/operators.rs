use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    ShiftLeft,
    ShiftRightSigned,
    ShiftRightUnsigned,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    BitAnd,
    BitOr,
    BitXor,
    ConditionalAnd,
    ConditionalOr,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            ShiftLeft => "<<",
            ShiftRightSigned => ">>",
            ShiftRightUnsigned => ">>>",
            Less => "<",
            Greater => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            Equal => "==",
            NotEqual => "!=",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            ConditionalAnd => "&&",
            ConditionalOr => "||",
        }
    }

    /// Whether the operator always yields a `boolean`.
    pub fn is_relational(&self) -> bool {
        use BinaryOperator::*;
        matches!(
            self,
            Less | Greater | LessEqual | GreaterEqual | Equal | NotEqual
        )
    }

    pub fn is_short_circuit(&self) -> bool {
        matches!(
            self,
            BinaryOperator::ConditionalAnd | BinaryOperator::ConditionalOr
        )
    }

    /// The relational operator testing the opposite outcome, if there is one.
    pub fn negated(&self) -> Option<BinaryOperator> {
        use BinaryOperator::*;
        Some(match self {
            Less => GreaterEqual,
            Greater => LessEqual,
            LessEqual => Greater,
            GreaterEqual => Less,
            Equal => NotEqual,
            NotEqual => Equal,
            _ => return None,
        })
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
    Complement,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::Complement => "~",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncDecOperator {
    Increment,
    Decrement,
}

impl IncDecOperator {
    /// The binary operator an increment or decrement desugars to.
    pub fn binary_operator(&self) -> BinaryOperator {
        match self {
            IncDecOperator::Increment => BinaryOperator::Add,
            IncDecOperator::Decrement => BinaryOperator::Sub,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IncDecOperator::Increment => "++",
            IncDecOperator::Decrement => "--",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fixity {
    Prefix,
    Postfix,
}
