//! Lexical scopes and the program-wide declaration tables.
//!
//! Local variables and parameters live in a stack of block maps, keyed by their source name.
//! Fields and methods are kept in flat maps keyed by their qualified names. A per-function map of
//! all variable names handed out so far makes sure that two locals sharing a source name, e.g. in
//! sibling blocks, still get distinct names in the CFA.

use indexmap::IndexMap;
use jcfa_error::error::CompileError;
use jcfa_ir::{Declaration, FieldDeclaration, FunctionDeclaration, VariableDeclaration};
use jcfa_types::{JType, Modifiers, Span, TypeName};
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub const RETURN_VARIABLE_NAME: &str = "__retval__";
const TEMPORARY_PREFIX: &str = "__tmp_";

#[derive(Debug)]
pub struct Scope {
    /// One map per open block. The first block is the program block and is never left.
    blocks: Vec<FxHashMap<String, Declaration>>,
    fields: IndexMap<String, Arc<FieldDeclaration>>,
    methods: IndexMap<String, Arc<FunctionDeclaration>>,
    /// Every variable name used in the current function, after disambiguation.
    variable_names: FxHashMap<String, Declaration>,
    classes: Vec<TypeName>,
    current_method: Option<Arc<FunctionDeclaration>>,
    return_variable: Option<Arc<VariableDeclaration>>,
    next_temporary: usize,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            blocks: vec![FxHashMap::default()],
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            variable_names: FxHashMap::default(),
            classes: vec![],
            current_method: None,
            return_variable: None,
            next_temporary: 0,
        }
    }

    pub fn enter_class(&mut self, name: TypeName) {
        self.classes.push(name);
    }

    pub fn leave_class(&mut self) {
        self.classes.pop();
    }

    pub fn current_class(&self) -> Option<&TypeName> {
        self.classes.last()
    }

    /// Enter the body of `method` and bring its parameters into scope.
    pub fn enter_method(&mut self, method: Arc<FunctionDeclaration>) -> Result<(), CompileError> {
        self.variable_names.clear();
        self.next_temporary = 0;
        self.return_variable = None;
        self.current_method = Some(method.clone());
        self.enter_block();
        for param in &method.parameters {
            self.register_declaration(
                &param.name,
                Declaration::Parameter(param.clone()),
                &param.span,
            )?;
        }
        Ok(())
    }

    pub fn leave_method(&mut self) {
        self.leave_block();
        self.current_method = None;
        self.return_variable = None;
        self.variable_names.clear();
    }

    pub fn enter_block(&mut self) {
        self.blocks.push(FxHashMap::default());
    }

    pub fn leave_block(&mut self) {
        if self.blocks.len() > 1 {
            self.blocks.pop();
        }
    }

    /// The number of open blocks, including the program block.
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    pub fn register_field(&mut self, field: Arc<FieldDeclaration>) -> Result<(), CompileError> {
        if self.fields.contains_key(&field.qualified_name) {
            return Err(CompileError::DuplicateDeclaration {
                name: field.qualified_name.clone(),
                span: field.span.clone(),
            });
        }
        self.fields.insert(field.qualified_name.clone(), field);
        Ok(())
    }

    pub fn register_method(
        &mut self,
        method: Arc<FunctionDeclaration>,
    ) -> Result<(), CompileError> {
        if self.methods.contains_key(&method.qualified_name) {
            return Err(CompileError::DuplicateDeclaration {
                name: method.qualified_name.clone(),
                span: method.span.clone(),
            });
        }
        self.methods.insert(method.qualified_name.clone(), method);
        Ok(())
    }

    /// Remember a declaration for a method outside the program, e.g. a library method.
    pub fn register_external_method(
        &mut self,
        method: FunctionDeclaration,
    ) -> Arc<FunctionDeclaration> {
        self.methods
            .entry(method.qualified_name.clone())
            .or_insert_with(|| Arc::new(method))
            .clone()
    }

    /// Insert a variable or parameter into the innermost block under its source name.
    pub fn register_declaration(
        &mut self,
        name: &str,
        decl: Declaration,
        span: &Span,
    ) -> Result<(), CompileError> {
        let Some(block) = self.blocks.last_mut() else {
            return Err(CompileError::Internal("no open block", span.clone()));
        };
        if block.contains_key(name) {
            return Err(CompileError::DuplicateDeclaration {
                name: name.to_string(),
                span: span.clone(),
            });
        }
        block.insert(name.to_string(), decl.clone());
        self.variable_names.insert(decl.name().to_string(), decl);
        Ok(())
    }

    /// Declare a local variable in the innermost block.
    ///
    /// If the name was already used elsewhere in the current function, a counter is appended.
    pub fn declare_local(
        &mut self,
        name: &str,
        ty: JType,
        is_final: bool,
        span: &Span,
    ) -> Result<Arc<VariableDeclaration>, CompileError> {
        if self
            .blocks
            .last()
            .map(|block| block.contains_key(name))
            .unwrap_or(false)
        {
            return Err(CompileError::DuplicateDeclaration {
                name: name.to_string(),
                span: span.clone(),
            });
        }
        let unique_name = self.unique_variable_name(name);
        let decl = Arc::new(VariableDeclaration {
            qualified_name: self.qualify(&unique_name),
            name: unique_name,
            original_name: name.to_string(),
            ty,
            modifiers: Modifiers {
                is_final,
                ..Modifiers::default()
            },
            span: span.clone(),
        });
        self.register_declaration(name, Declaration::Variable(decl.clone()), span)?;
        Ok(decl)
    }

    /// Create a fresh variable for an intermediate value.
    ///
    /// Temporaries are not visible to name lookup.
    pub fn create_temporary(&mut self, ty: JType, span: &Span) -> Arc<VariableDeclaration> {
        let name = loop {
            let candidate = format!("{TEMPORARY_PREFIX}{}", self.next_temporary);
            self.next_temporary += 1;
            if !self.variable_names.contains_key(&candidate) {
                break candidate;
            }
        };
        let decl = Arc::new(VariableDeclaration {
            qualified_name: self.qualify(&name),
            name: name.clone(),
            original_name: name.clone(),
            ty,
            modifiers: Modifiers::default(),
            span: span.clone(),
        });
        self.variable_names
            .insert(name, Declaration::Variable(decl.clone()));
        decl
    }

    /// Create the variable holding the result of the current function.
    pub fn create_return_variable(&mut self, ty: JType, span: &Span) -> Arc<VariableDeclaration> {
        let decl = Arc::new(VariableDeclaration {
            qualified_name: self.qualify(RETURN_VARIABLE_NAME),
            name: RETURN_VARIABLE_NAME.to_string(),
            original_name: RETURN_VARIABLE_NAME.to_string(),
            ty,
            modifiers: Modifiers::default(),
            span: span.clone(),
        });
        self.variable_names.insert(
            RETURN_VARIABLE_NAME.to_string(),
            Declaration::Variable(decl.clone()),
        );
        self.return_variable = Some(decl.clone());
        decl
    }

    pub fn return_variable(&self) -> Option<&Arc<VariableDeclaration>> {
        self.return_variable.as_ref()
    }

    /// Resolve a simple name, innermost block first, then the fields of the enclosing classes.
    pub fn lookup_variable(&self, name: &str) -> Option<Declaration> {
        let local = self
            .blocks
            .iter()
            .rev()
            .find_map(|block| block.get(name).cloned());
        if local.is_some() {
            return local;
        }
        self.classes.iter().rev().find_map(|class| {
            self.fields
                .get(&format!("{class}.{name}"))
                .map(|field| Declaration::Field(field.clone()))
        })
    }

    pub fn lookup_field(&self, qualified_name: &str) -> Option<Arc<FieldDeclaration>> {
        self.fields.get(qualified_name).cloned()
    }

    pub fn lookup_method(&self, qualified_name: &str) -> Option<Arc<FunctionDeclaration>> {
        self.methods.get(qualified_name).cloned()
    }

    pub fn fields(&self) -> impl Iterator<Item = &Arc<FieldDeclaration>> {
        self.fields.values()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Arc<FunctionDeclaration>> {
        self.methods.values()
    }

    fn unique_variable_name(&self, name: &str) -> String {
        if !self.variable_names.contains_key(name) {
            return name.to_string();
        }
        (1..)
            .map(|counter| format!("{name}__{counter}"))
            .find(|candidate| !self.variable_names.contains_key(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    fn qualify(&self, name: &str) -> String {
        match (&self.current_method, self.classes.last()) {
            (Some(method), _) => format!("{}::{name}", method.qualified_name),
            (None, Some(class)) => format!("{class}::{name}"),
            (None, None) => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jcfa_ir::{FunctionKind, ParameterDeclaration};

    fn method() -> Arc<FunctionDeclaration> {
        Arc::new(FunctionDeclaration {
            qualified_name: "Main.f(int)".to_string(),
            name: "f".to_string(),
            declaring_type: TypeName::new("Main"),
            parameters: vec![Arc::new(ParameterDeclaration {
                qualified_name: "Main.f(int)::p".to_string(),
                name: "p".to_string(),
                ty: JType::int(),
                modifiers: Modifiers::default(),
                span: Span::dummy(),
            })],
            return_type: JType::Void,
            modifiers: Modifiers::default().with_static(),
            kind: FunctionKind::Method,
            has_body: true,
            span: Span::dummy(),
        })
    }

    #[test]
    fn sibling_blocks_get_distinct_names() {
        let mut scope = Scope::new();
        scope.enter_class(TypeName::new("Main"));
        scope.enter_method(method()).unwrap();

        scope.enter_block();
        let first = scope
            .declare_local("x", JType::int(), false, &Span::dummy())
            .unwrap();
        scope.leave_block();
        scope.enter_block();
        let second = scope
            .declare_local("x", JType::int(), false, &Span::dummy())
            .unwrap();

        assert_eq!(first.name, "x");
        assert_eq!(second.name, "x__1");
        assert_eq!(second.qualified_name, "Main.f(int)::x__1");
        assert_eq!(second.original_name, "x");
        assert_eq!(
            scope.lookup_variable("x").map(|decl| decl.name().to_string()),
            Some("x__1".to_string())
        );
        assert!(matches!(
            scope.lookup_variable("p"),
            Some(Declaration::Parameter(_))
        ));
        scope.leave_block();
        scope.leave_method();
        assert!(scope.lookup_variable("p").is_none());
    }

    #[test]
    fn duplicate_in_same_block_fails() {
        let mut scope = Scope::new();
        scope.enter_method(method()).unwrap();
        scope
            .declare_local("x", JType::int(), false, &Span::dummy())
            .unwrap();
        let err = scope
            .declare_local("x", JType::int(), false, &Span::dummy())
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDeclaration { .. }));
    }

    #[test]
    fn fields_are_found_through_enclosing_classes() {
        let mut scope = Scope::new();
        let field = Arc::new(FieldDeclaration {
            qualified_name: "Main.count".to_string(),
            name: "count".to_string(),
            ty: JType::int(),
            modifiers: Modifiers::default().with_static(),
            declaring_type: TypeName::new("Main"),
            span: Span::dummy(),
        });
        scope.register_field(field.clone()).unwrap();
        assert!(scope.register_field(field).is_err());
        scope.enter_class(TypeName::new("Main"));
        assert!(matches!(
            scope.lookup_variable("count"),
            Some(Declaration::Field(_))
        ));
    }

    #[test]
    fn temporaries_skip_taken_names() {
        let mut scope = Scope::new();
        scope.enter_method(method()).unwrap();
        scope
            .declare_local("__tmp_0", JType::int(), false, &Span::dummy())
            .unwrap();
        let tmp = scope.create_temporary(JType::int(), &Span::dummy());
        assert_eq!(tmp.name, "__tmp_1");
    }
}
