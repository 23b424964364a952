//! Declarations referenced from CFA edges.
//!
//! Every declaration has a program-wide unique qualified name. Declarations are shared between
//! edges through [`Arc`]s and compared structurally.

use jcfa_types::{JType, Modifiers, Span, TypeName};
use std::{fmt, sync::Arc};

/// Prefix of the qualified name of declarations synthesized for unresolvable symbols.
pub const UNRESOLVED_PREFIX: &str = "__unresolved__";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VariableDeclaration {
    pub qualified_name: String,
    /// The name after disambiguation, unique within its function.
    pub name: String,
    /// The name as written in the source.
    pub original_name: String,
    pub ty: JType,
    pub modifiers: Modifiers,
    pub span: Span,
}

impl VariableDeclaration {
    /// A placeholder for a variable the front end could not resolve.
    pub fn unresolved(name: &str, ty: JType, span: Span) -> Self {
        VariableDeclaration {
            qualified_name: format!("{UNRESOLVED_PREFIX}::{name}"),
            name: name.to_string(),
            original_name: name.to_string(),
            ty,
            modifiers: Modifiers::default(),
            span,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParameterDeclaration {
    pub qualified_name: String,
    pub name: String,
    pub ty: JType,
    pub modifiers: Modifiers,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDeclaration {
    /// `pkg.A.field`.
    pub qualified_name: String,
    pub name: String,
    pub ty: JType,
    pub modifiers: Modifiers,
    pub declaring_type: TypeName,
    pub span: Span,
}

impl FieldDeclaration {
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    /// A placeholder for a field the front end could not resolve.
    pub fn unresolved(declaring_type: TypeName, name: &str, ty: JType, span: Span) -> Self {
        FieldDeclaration {
            qualified_name: format!("{UNRESOLVED_PREFIX}::{declaring_type}.{name}"),
            name: name.to_string(),
            ty,
            modifiers: Modifiers::default(),
            declaring_type,
            span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Method,
    Constructor,
    ClassInitializer,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionDeclaration {
    /// `pkg.A.foo(int,java.lang.String)`, the key of the function in the [`Context`](crate::Context).
    pub qualified_name: String,
    pub name: String,
    pub declaring_type: TypeName,
    pub parameters: Vec<Arc<ParameterDeclaration>>,
    pub return_type: JType,
    pub modifiers: Modifiers,
    pub kind: FunctionKind,
    /// Abstract, native and unresolved methods have no body and no CFA.
    pub has_body: bool,
    pub span: Span,
}

impl FunctionDeclaration {
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static || self.kind == FunctionKind::ClassInitializer
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    pub fn is_unresolved(&self) -> bool {
        self.qualified_name.starts_with(UNRESOLVED_PREFIX)
    }

    /// `foo(int,java.lang.String)`, shared by a method and all its overrides.
    pub fn signature(&self) -> &str {
        self.qualified_name
            .strip_prefix(self.declaring_type.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&self.qualified_name)
    }

    /// A placeholder for a method the front end could not resolve.
    pub fn unresolved(
        declaring_type: TypeName,
        name: &str,
        parameter_types: &[JType],
        return_type: JType,
        is_static: bool,
        span: Span,
    ) -> Self {
        let params = parameter_types
            .iter()
            .map(|ty| ty.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let qualified_name = format!("{UNRESOLVED_PREFIX}::{declaring_type}.{name}({params})");
        let parameters = parameter_types
            .iter()
            .enumerate()
            .map(|(idx, ty)| {
                Arc::new(ParameterDeclaration {
                    qualified_name: format!("{qualified_name}::arg{idx}"),
                    name: format!("arg{idx}"),
                    ty: ty.clone(),
                    modifiers: Modifiers::default(),
                    span: span.clone(),
                })
            })
            .collect();
        FunctionDeclaration {
            qualified_name,
            name: name.to_string(),
            declaring_type,
            parameters,
            return_type,
            modifiers: Modifiers {
                is_static,
                ..Modifiers::public()
            },
            kind: FunctionKind::Method,
            has_body: false,
            span,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Declaration {
    Variable(Arc<VariableDeclaration>),
    Parameter(Arc<ParameterDeclaration>),
    Field(Arc<FieldDeclaration>),
    Method(Arc<FunctionDeclaration>),
    Constructor(Arc<FunctionDeclaration>),
}

impl Declaration {
    pub fn qualified_name(&self) -> &str {
        match self {
            Declaration::Variable(decl) => &decl.qualified_name,
            Declaration::Parameter(decl) => &decl.qualified_name,
            Declaration::Field(decl) => &decl.qualified_name,
            Declaration::Method(decl) | Declaration::Constructor(decl) => &decl.qualified_name,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Declaration::Variable(decl) => &decl.name,
            Declaration::Parameter(decl) => &decl.name,
            Declaration::Field(decl) => &decl.name,
            Declaration::Method(decl) | Declaration::Constructor(decl) => &decl.name,
        }
    }

    /// The declared type, the return type for methods.
    pub fn ty(&self) -> &JType {
        match self {
            Declaration::Variable(decl) => &decl.ty,
            Declaration::Parameter(decl) => &decl.ty,
            Declaration::Field(decl) => &decl.ty,
            Declaration::Method(decl) | Declaration::Constructor(decl) => &decl.return_type,
        }
    }

    pub fn modifiers(&self) -> &Modifiers {
        match self {
            Declaration::Variable(decl) => &decl.modifiers,
            Declaration::Parameter(decl) => &decl.modifiers,
            Declaration::Field(decl) => &decl.modifiers,
            Declaration::Method(decl) | Declaration::Constructor(decl) => &decl.modifiers,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Declaration::Variable(decl) => &decl.span,
            Declaration::Parameter(decl) => &decl.span,
            Declaration::Field(decl) => &decl.span,
            Declaration::Method(decl) | Declaration::Constructor(decl) => &decl.span,
        }
    }

    /// The owning class or interface of fields, methods and constructors.
    pub fn declaring_type(&self) -> Option<&TypeName> {
        match self {
            Declaration::Field(decl) => Some(&decl.declaring_type),
            Declaration::Method(decl) | Declaration::Constructor(decl) => {
                Some(&decl.declaring_type)
            }
            Declaration::Variable(_) | Declaration::Parameter(_) => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.qualified_name().starts_with(UNRESOLVED_PREFIX)
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Method(decl) | Declaration::Constructor(decl) => {
                write!(f, "{}", decl.qualified_name)
            }
            decl => {
                let modifiers = decl.modifiers().to_string();
                if !modifiers.is_empty() {
                    write!(f, "{modifiers} ")?;
                }
                write!(f, "{} {}", decl.ty(), decl.name())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_strips_declaring_type() {
        let decl = FunctionDeclaration::unresolved(
            TypeName::new("pkg.A"),
            "foo",
            &[JType::int()],
            JType::Void,
            false,
            Span::dummy(),
        );
        assert!(decl.is_unresolved());
        assert_eq!(decl.parameters.len(), 1);
        assert_eq!(decl.qualified_name, "__unresolved__::pkg.A.foo(int)");

        let resolved = FunctionDeclaration {
            qualified_name: "pkg.A.foo(int)".to_string(),
            has_body: true,
            ..decl
        };
        assert_eq!(resolved.signature(), "foo(int)");
    }
}
