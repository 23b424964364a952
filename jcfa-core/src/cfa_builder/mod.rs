//! Construction of the control-flow automata of a whole program.
//!
//! Building happens in three passes over all type declarations: types are entered into the
//! hierarchy, then every field and method is declared, and only then are bodies lowered, so a body
//! may refer to any member of the program regardless of declaration order.

mod condition;
mod function;

pub(crate) use function::{FunctionBody, FunctionBuilder, InitializerItem, Prologue};

use indexmap::{IndexMap, IndexSet};
use jcfa_ast::{
    self as ast, qualified_method_name, CompilationUnit, ExpressionKind as E, MethodKind,
    TypeDeclaration, CLASS_INITIALIZER_NAME, CONSTRUCTOR_NAME,
};
use jcfa_error::{
    error::CompileError,
    handler::{ErrorEmitted, Handler},
};
use jcfa_ir::{
    Context, Expression, FieldDeclaration, FunctionDeclaration, FunctionKind, ParameterDeclaration,
};
use jcfa_types::{JType, Modifiers, Span, TypeName};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    build_config::BuildConfig, lowering::ExpressionLowerer, scope::Scope,
    type_hierarchy::TypeHierarchy,
};

/// A static field of the program, as handed to the analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticField {
    pub declaration: Arc<FieldDeclaration>,
    /// The initializer, if it is side-effect free. Other initializers run in the class initializer.
    pub initializer: Option<Expression>,
    /// Qualified name of the class initializer of the declaring class, if it has one.
    pub class_initializer: Option<String>,
}

/// A type declaration together with the classes enclosing it, outermost first.
struct ClassContext<'ast> {
    outer: Vec<TypeName>,
    decl: &'ast TypeDeclaration,
}

pub(crate) struct ProgramBuilder<'a, 'ast> {
    handler: &'a Handler,
    config: &'a BuildConfig,
    classes: Vec<ClassContext<'ast>>,
    pub(crate) context: Context,
    pub(crate) scope: Scope,
    pub(crate) hierarchy: TypeHierarchy,
    pub(crate) static_fields: Vec<StaticField>,
}

impl<'a, 'ast> ProgramBuilder<'a, 'ast> {
    pub(crate) fn new(
        handler: &'a Handler,
        config: &'a BuildConfig,
        units: &'ast [CompilationUnit],
    ) -> Self {
        let mut classes = vec![];
        let mut stack = units
            .iter()
            .rev()
            .flat_map(|unit| unit.types.iter().rev())
            .map(|decl| ClassContext {
                outer: vec![],
                decl,
            })
            .collect::<Vec<_>>();
        while let Some(class) = stack.pop() {
            let mut outer = class.outer.clone();
            outer.push(class.decl.name.clone());
            stack.extend(class.decl.member_types.iter().rev().map(|decl| ClassContext {
                outer: outer.clone(),
                decl,
            }));
            classes.push(class);
        }
        ProgramBuilder {
            handler,
            config,
            classes,
            context: Context::default(),
            scope: Scope::new(),
            hierarchy: TypeHierarchy::new(),
            static_fields: vec![],
        }
    }

    /// Enter every declared type into the hierarchy, supertypes before their subtypes.
    pub(crate) fn register_types(&mut self) -> Result<(), ErrorEmitted> {
        let mut decls = IndexMap::new();
        for class in &self.classes {
            if decls.insert(class.decl.name.clone(), class.decl).is_some() {
                return Err(self.handler.emit_err(CompileError::DuplicateType {
                    name: class.decl.name.to_string(),
                    span: class.decl.span.clone(),
                }));
            }
        }
        for decl in registration_order(&decls) {
            self.hierarchy
                .register_type(self.handler, decl)
                .map_err(|err| self.handler.emit_err(err))?;
        }
        info!(types = decls.len(), "registered types");
        Ok(())
    }

    /// Declare every field and method of the program.
    pub(crate) fn register_members(&mut self) -> Result<(), ErrorEmitted> {
        let handler = self.handler;
        handler.scope(|handler| {
            for class in &self.classes {
                let decl = class.decl;
                for field in &decl.fields {
                    request_referenced_type(&mut self.hierarchy, handler, &field.ty, &field.span);
                    let modifiers = match decl.is_interface() {
                        true => field.modifiers.with_static().with_final(),
                        false => field.modifiers,
                    };
                    let declaration = Arc::new(FieldDeclaration {
                        qualified_name: format!("{}.{}", decl.name, field.name),
                        name: field.name.clone(),
                        ty: field.ty.clone(),
                        modifiers,
                        declaring_type: decl.name.clone(),
                        span: field.span.clone(),
                    });
                    if let Err(err) = self.scope.register_field(declaration) {
                        handler.emit_err(err);
                    }
                }
                for method in &decl.methods {
                    let declaration = method_declaration(&decl.name, decl.is_interface(), method);
                    for (ty, span) in method
                        .parameters
                        .iter()
                        .map(|param| (&param.ty, &param.span))
                        .chain([(&method.return_type, &method.span)])
                    {
                        request_referenced_type(&mut self.hierarchy, handler, ty, span);
                    }
                    declare_method(&mut self.scope, &mut self.hierarchy, handler, declaration);
                }
                if !decl.is_interface() && decl.constructors().next().is_none() {
                    let declaration = default_constructor(decl);
                    declare_method(&mut self.scope, &mut self.hierarchy, handler, declaration);
                }
            }
            Ok(())
        })?;
        debug!(
            fields = self.scope.fields().count(),
            methods = self.scope.methods().count(),
            "registered members"
        );
        Ok(())
    }

    /// Lower the body of every method, constructor and class initializer into a CFA.
    ///
    /// All functions are built even if some fail, so that every error is reported.
    pub(crate) fn build_functions(&mut self) -> Result<(), ErrorEmitted> {
        let handler = self.handler;
        let classes = std::mem::take(&mut self.classes);
        let result = handler.scope(|handler| {
            for class in &classes {
                for outer in &class.outer {
                    self.scope.enter_class(outer.clone());
                }
                self.scope.enter_class(class.decl.name.clone());
                self.build_class(handler, class.decl);
                self.scope.leave_class();
                for _ in &class.outer {
                    self.scope.leave_class();
                }
            }
            Ok(())
        });
        self.classes = classes;
        result?;
        info!(
            functions = self.context.num_functions(),
            nodes = self.context.num_nodes(),
            "built function CFAs"
        );
        Ok(())
    }

    fn build_class(&mut self, handler: &Handler, decl: &'ast TypeDeclaration) {
        let mut instance_items = vec![];
        let mut static_items = vec![];
        let mut static_fields = vec![];
        for field in &decl.fields {
            let Some(declaration) = self
                .scope
                .lookup_field(&format!("{}.{}", decl.name, field.name))
            else {
                continue;
            };
            if !declaration.is_static() {
                if let Some(initializer) = &field.initializer {
                    instance_items.push(InitializerItem::Field {
                        field: declaration,
                        initializer,
                    });
                }
                continue;
            }
            let initializer = match &field.initializer {
                Some(initializer) if is_inline_initializer(initializer) => {
                    match self.lower_inline_initializer(initializer) {
                        Ok(value) => Some(value),
                        Err(err) => {
                            handler.emit_err(err);
                            None
                        }
                    }
                }
                Some(initializer) => {
                    static_items.push(InitializerItem::Field {
                        field: declaration.clone(),
                        initializer,
                    });
                    None
                }
                None => None,
            };
            static_fields.push(StaticField {
                declaration,
                initializer,
                class_initializer: None,
            });
        }
        for block in &decl.initializers {
            let item = InitializerItem::Block(&block.body);
            match block.is_static {
                true => static_items.push(item),
                false => instance_items.push(item),
            }
        }

        if !static_items.is_empty() {
            let declaration = Arc::new(class_initializer(decl));
            for field in &mut static_fields {
                field.class_initializer = Some(declaration.qualified_name.clone());
            }
            match self.scope.register_method(declaration.clone()) {
                Ok(()) => self.build_function(
                    handler,
                    declaration,
                    FunctionBody::ClassInitializer(static_items),
                ),
                Err(err) => {
                    handler.emit_err(err);
                }
            }
        }
        self.static_fields.extend(static_fields);

        let implicit_super = self.implicit_super_constructor(&decl.name);
        for method in &decl.methods {
            let Some(declaration) = self
                .scope
                .lookup_method(&method.qualified_name(&decl.name))
            else {
                continue;
            };
            let body = match (method.kind, &method.body) {
                (_, None) => continue,
                (MethodKind::Method, Some(body)) => FunctionBody::Method(body),
                (MethodKind::Constructor, Some(body)) => FunctionBody::Constructor {
                    body: Some(body),
                    prologue: Prologue {
                        items: instance_items.clone(),
                        implicit_super: implicit_super.clone(),
                    },
                },
            };
            self.build_function(handler, declaration, body);
        }
        if !decl.is_interface() && decl.constructors().next().is_none() {
            let name = qualified_method_name(&decl.name, CONSTRUCTOR_NAME, &[]);
            if let Some(declaration) = self.scope.lookup_method(&name) {
                let body = FunctionBody::Constructor {
                    body: None,
                    prologue: Prologue {
                        items: instance_items,
                        implicit_super,
                    },
                };
                self.build_function(handler, declaration, body);
            }
        }
    }

    fn build_function(
        &mut self,
        handler: &Handler,
        declaration: Arc<FunctionDeclaration>,
        body: FunctionBody<'ast>,
    ) {
        let result = FunctionBuilder::new(
            &mut self.context,
            &mut self.scope,
            &mut self.hierarchy,
            handler,
            self.config,
            declaration,
        )
        .and_then(|builder| builder.build(body));
        if let Err(err) = result {
            handler.emit_err(err);
        }
    }

    fn lower_inline_initializer(
        &mut self,
        initializer: &'ast ast::Expression,
    ) -> Result<Expression, CompileError> {
        let lowered = ExpressionLowerer::new(
            &mut self.scope,
            &mut self.hierarchy,
            self.handler,
            self.config.compound_assignment_order,
        )
        .lower_value(initializer)?;
        if !lowered.effects.is_empty() {
            return Err(CompileError::Internal(
                "side effects in a constant initializer",
                initializer.span.clone(),
            ));
        }
        Ok(lowered.value)
    }

    /// The no-argument constructor of the superclass, if the program declares one.
    fn implicit_super_constructor(&self, class: &TypeName) -> Option<Arc<FunctionDeclaration>> {
        let super_class = self.hierarchy.get(class)?.super_class.as_ref()?;
        if !self.hierarchy.is_declared(super_class) {
            return None;
        }
        self.scope
            .lookup_method(&qualified_method_name(super_class, CONSTRUCTOR_NAME, &[]))
    }
}

/// Declared supertypes come before the types extending them. Types taking part in a cycle are
/// kept in declaration order so that registering them reports the cycle.
fn registration_order<'ast>(
    decls: &IndexMap<TypeName, &'ast TypeDeclaration>,
) -> Vec<&'ast TypeDeclaration> {
    let mut order = vec![];
    let mut visited = IndexSet::new();
    for start in decls.keys() {
        // (type, whether its parents have been pushed already)
        let mut stack = vec![(start, false)];
        while let Some((name, expanded)) = stack.pop() {
            let Some(decl) = decls.get(name) else {
                continue;
            };
            if expanded {
                order.push(*decl);
                continue;
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            stack.push((name, true));
            for parent in decl.super_class.iter().chain(decl.interfaces.iter()) {
                if !visited.contains(parent) {
                    stack.push((parent, false));
                }
            }
        }
    }
    order
}

fn declare_method(
    scope: &mut Scope,
    hierarchy: &mut TypeHierarchy,
    handler: &Handler,
    method: FunctionDeclaration,
) {
    let method = Arc::new(method);
    match scope.register_method(method.clone()) {
        Ok(()) => hierarchy.register_method(&method.declaring_type.clone(), method),
        Err(err) => {
            handler.emit_err(err);
        }
    }
}

fn request_referenced_type(
    hierarchy: &mut TypeHierarchy,
    handler: &Handler,
    ty: &JType,
    span: &Span,
) {
    let mut ty = ty;
    while let Some(element) = ty.element_type() {
        ty = element;
    }
    if let Some(name) = ty.type_name() {
        hierarchy.request_type(handler, name, span);
    }
}

fn method_declaration(
    owner: &TypeName,
    in_interface: bool,
    method: &ast::MethodDeclaration,
) -> FunctionDeclaration {
    let qualified_name = method.qualified_name(owner);
    let parameters = method
        .parameters
        .iter()
        .map(|param| {
            Arc::new(ParameterDeclaration {
                qualified_name: format!("{qualified_name}::{}", param.name),
                name: param.name.clone(),
                ty: param.ty.clone(),
                modifiers: Modifiers {
                    is_final: param.is_final,
                    ..Modifiers::default()
                },
                span: param.span.clone(),
            })
        })
        .collect();
    let (kind, return_type) = match method.kind {
        MethodKind::Method => (FunctionKind::Method, method.return_type.clone()),
        MethodKind::Constructor => (FunctionKind::Constructor, JType::Void),
    };
    let modifiers = match in_interface && method.body.is_none() && !method.modifiers.is_static {
        true => method.modifiers.with_abstract(),
        false => method.modifiers,
    };
    FunctionDeclaration {
        qualified_name,
        name: method.simple_name().to_string(),
        declaring_type: owner.clone(),
        parameters,
        return_type,
        modifiers,
        kind,
        has_body: method.body.is_some(),
        span: method.span.clone(),
    }
}

fn default_constructor(decl: &TypeDeclaration) -> FunctionDeclaration {
    FunctionDeclaration {
        qualified_name: qualified_method_name(&decl.name, CONSTRUCTOR_NAME, &[]),
        name: CONSTRUCTOR_NAME.to_string(),
        declaring_type: decl.name.clone(),
        parameters: vec![],
        return_type: JType::Void,
        modifiers: Modifiers::public(),
        kind: FunctionKind::Constructor,
        has_body: true,
        span: decl.span.clone(),
    }
}

fn class_initializer(decl: &TypeDeclaration) -> FunctionDeclaration {
    FunctionDeclaration {
        qualified_name: qualified_method_name(&decl.name, CLASS_INITIALIZER_NAME, &[]),
        name: CLASS_INITIALIZER_NAME.to_string(),
        declaring_type: decl.name.clone(),
        parameters: vec![],
        return_type: JType::Void,
        modifiers: Modifiers::default().with_static(),
        kind: FunctionKind::ClassInitializer,
        has_body: true,
        span: decl.span.clone(),
    }
}

/// Whether a static initializer can be kept as a plain expression instead of running in the
/// class initializer.
fn is_inline_initializer(expr: &ast::Expression) -> bool {
    let mut stack = vec![expr];
    while let Some(expr) = stack.pop() {
        match &expr.kind {
            E::Literal(_) | E::Name { .. } => {}
            E::FieldAccess { target, .. } => stack.push(target),
            E::ArrayAccess { array, index } => stack.extend([&**array, &**index]),
            E::ArrayCreation {
                dimensions,
                initializer,
                ..
            } => {
                stack.extend(dimensions.iter());
                stack.extend(initializer.as_deref());
            }
            E::ArrayInitializer(elements) => stack.extend(elements.iter()),
            E::Unary { operand, .. } | E::Parenthesized(operand) => stack.push(operand),
            E::Binary { lhs, rhs, .. } => stack.extend([&**lhs, &**rhs]),
            _ => return false,
        }
    }
    true
}
