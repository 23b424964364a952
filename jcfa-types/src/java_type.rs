//! The resolved type model shared by the syntax tree and the CFA.

use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// The fully qualified name of the universal root type.
pub const OBJECT_TYPE_NAME: &str = "java.lang.Object";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Byte
                | PrimitiveType::Short
                | PrimitiveType::Char
                | PrimitiveType::Int
                | PrimitiveType::Long
        )
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, PrimitiveType::Boolean)
    }
}

/// A fully qualified class or interface name, e.g. `java.util.List`.
///
/// Cheap to clone; the underlying string is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName(Arc<str>);

impl TypeName {
    pub fn new(name: impl AsRef<str>) -> Self {
        TypeName(Arc::from(name.as_ref()))
    }

    pub fn object() -> Self {
        TypeName::new(OBJECT_TYPE_NAME)
    }

    pub fn is_object(&self) -> bool {
        &*self.0 == OBJECT_TYPE_NAME
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The unqualified part of the name, `List` for `java.util.List`.
    pub fn simple_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        TypeName::new(name)
    }
}

/// A resolved type as reported by the front end.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JType {
    Primitive(PrimitiveType),
    Class(TypeName),
    Interface(TypeName),
    Array(Box<JType>),
    /// The type of the `null` literal.
    Null,
    Void,
    /// The front end could not determine a type.
    Unspecified,
}

impl JType {
    pub fn int() -> JType {
        JType::Primitive(PrimitiveType::Int)
    }

    pub fn long() -> JType {
        JType::Primitive(PrimitiveType::Long)
    }

    pub fn boolean() -> JType {
        JType::Primitive(PrimitiveType::Boolean)
    }

    pub fn object() -> JType {
        JType::Class(TypeName::object())
    }

    pub fn string() -> JType {
        JType::Class(TypeName::new("java.lang.String"))
    }

    pub fn array_of(element: JType) -> JType {
        JType::Array(Box::new(element))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, JType::Void)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JType::Primitive(PrimitiveType::Boolean))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, JType::Array(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            JType::Class(_) | JType::Interface(_) | JType::Array(_) | JType::Null
        )
    }

    pub fn element_type(&self) -> Option<&JType> {
        match self {
            JType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// The class or interface name of a reference type.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            JType::Class(name) | JType::Interface(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for JType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JType::Primitive(prim) => write!(f, "{}", prim.as_str()),
            JType::Class(name) | JType::Interface(name) => write!(f, "{name}"),
            JType::Array(element) => write!(f, "{element}[]"),
            JType::Null => write!(f, "null"),
            JType::Void => write!(f, "void"),
            JType::Unspecified => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        let list = TypeName::new("java.util.List");
        assert_eq!(list.simple_name(), "List");
        assert!(TypeName::object().is_object());
        assert_eq!(TypeName::new("Main").simple_name(), "Main");
    }

    #[test]
    fn display() {
        let ty = JType::array_of(JType::array_of(JType::int()));
        assert_eq!(ty.to_string(), "int[][]");
        assert_eq!(JType::string().to_string(), "java.lang.String");
        assert_eq!(ty.element_type(), Some(&JType::array_of(JType::int())));
    }
}
