use jcfa_types::{JType, TypeName};
use serde::{Deserialize, Serialize};

/// What a simple name in expression position was resolved to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NameBinding {
    /// A local variable or parameter, looked up in the lexical scope by name.
    Local,
    Field(FieldBinding),
    /// A type name used as a qualifier, as in `Math.abs(x)`.
    Type(TypeName),
    Unresolved,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldBinding {
    pub declaring_type: TypeName,
    pub name: String,
    pub ty: JType,
    pub is_static: bool,
}

impl FieldBinding {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }
}

/// The method or constructor a call site was statically bound to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodBinding {
    pub declaring_type: TypeName,
    /// The simple name, `<init>` for constructors.
    pub name: String,
    pub parameter_types: Vec<JType>,
    pub return_type: JType,
    pub is_static: bool,
}

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const CLASS_INITIALIZER_NAME: &str = "<clinit>";

impl MethodBinding {
    pub fn constructor(declaring_type: TypeName, parameter_types: Vec<JType>) -> Self {
        MethodBinding {
            declaring_type,
            name: CONSTRUCTOR_NAME.to_string(),
            parameter_types,
            return_type: JType::Void,
            is_static: false,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// The program-wide unique name, e.g. `pkg.A.foo(int,java.lang.String)`.
    pub fn qualified_name(&self) -> String {
        qualified_method_name(&self.declaring_type, &self.name, &self.parameter_types)
    }

    /// The name and parameter list without the declaring type, used to match overrides.
    pub fn signature(&self) -> String {
        method_signature(&self.name, &self.parameter_types)
    }
}

pub fn method_signature(name: &str, parameter_types: &[JType]) -> String {
    let params = parameter_types
        .iter()
        .map(|ty| ty.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}({params})")
}

pub fn qualified_method_name(
    declaring_type: &TypeName,
    name: &str,
    parameter_types: &[JType],
) -> String {
    format!(
        "{declaring_type}.{}",
        method_signature(name, parameter_types)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_method_names() {
        let binding = MethodBinding {
            declaring_type: TypeName::new("pkg.A"),
            name: "foo".to_string(),
            parameter_types: vec![JType::int(), JType::string()],
            return_type: JType::Void,
            is_static: false,
        };
        assert_eq!(binding.qualified_name(), "pkg.A.foo(int,java.lang.String)");
        assert_eq!(binding.signature(), "foo(int,java.lang.String)");
        let ctor = MethodBinding::constructor(TypeName::new("pkg.A"), vec![]);
        assert_eq!(ctor.qualified_name(), "pkg.A.<init>()");
        assert!(ctor.is_constructor());
    }
}
