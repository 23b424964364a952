use jcfa_types::{JType, Modifiers, SourceId, Span, Spanned, TypeName};
use serde::{Deserialize, Serialize};

use crate::{method_signature, qualified_method_name, Block, Expression, CONSTRUCTOR_NAME};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub source_id: Option<SourceId>,
    pub types: Vec<TypeDeclaration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: TypeName,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    /// `None` means the universal root for classes and nothing for interfaces.
    pub super_class: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub fields: Vec<FieldDeclaration>,
    pub methods: Vec<MethodDeclaration>,
    pub initializers: Vec<Initializer>,
    pub member_types: Vec<TypeDeclaration>,
    pub span: Span,
}

impl TypeDeclaration {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodDeclaration> {
        self.methods
            .iter()
            .filter(|method| method.kind == MethodKind::Constructor)
    }
}

impl Spanned for TypeDeclaration {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: String,
    pub ty: JType,
    pub modifiers: Modifiers,
    pub initializer: Option<Expression>,
    pub span: Span,
}

/// A `static { .. }` or instance `{ .. }` initializer block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    pub is_static: bool,
    pub body: Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    Method,
    Constructor,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    /// The simple name; ignored for constructors.
    pub name: String,
    pub kind: MethodKind,
    pub parameters: Vec<Parameter>,
    pub return_type: JType,
    pub modifiers: Modifiers,
    /// `None` for abstract and native methods.
    pub body: Option<Block>,
    pub span: Span,
}

impl MethodDeclaration {
    pub fn simple_name(&self) -> &str {
        match self.kind {
            MethodKind::Method => &self.name,
            MethodKind::Constructor => CONSTRUCTOR_NAME,
        }
    }

    pub fn parameter_types(&self) -> Vec<JType> {
        self.parameters.iter().map(|param| param.ty.clone()).collect()
    }

    pub fn signature(&self) -> String {
        method_signature(self.simple_name(), &self.parameter_types())
    }

    pub fn qualified_name(&self, declaring_type: &TypeName) -> String {
        qualified_method_name(declaring_type, self.simple_name(), &self.parameter_types())
    }
}

impl Spanned for MethodDeclaration {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: JType,
    pub is_final: bool,
    pub span: Span,
}
