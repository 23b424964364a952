#![allow(dead_code)]

use jcfa_ast::{
    Block, CompilationUnit, Expression, ExpressionKind, FieldBinding, FieldDeclaration, Literal,
    MethodBinding, MethodDeclaration, MethodKind, NameBinding, Parameter, Statement,
    StatementKind, TypeDeclaration, TypeKind, VariableDeclarator,
};
use jcfa_core::{compile_program, BuildConfig, ProgramCfa};
use jcfa_error::{
    error::CompileError,
    handler::{ErrorEmitted, Handler},
    warning::CompileWarning,
};
use jcfa_ir::{Context, Function, Node, NodeKind};
use jcfa_types::{
    BinaryOperator, Fixity, IncDecOperator, JType, Modifiers, SourceEngine, Span, TypeName,
};

pub struct Compiled {
    pub result: Result<ProgramCfa, ErrorEmitted>,
    pub errors: Vec<CompileError>,
    pub warnings: Vec<CompileWarning>,
}

impl Compiled {
    pub fn program(&self) -> &ProgramCfa {
        match &self.result {
            Ok(program) => program,
            Err(_) => panic!("compilation failed: {:#?}", self.errors),
        }
    }

    /// The innermost error of every emitted error.
    pub fn root_causes(&self) -> Vec<&CompileError> {
        self.errors.iter().map(|err| err.root_cause()).collect()
    }
}

pub fn compile(config: &BuildConfig, types: Vec<TypeDeclaration>) -> Compiled {
    let handler = Handler::default();
    let units = vec![CompilationUnit {
        source_id: None,
        types,
    }];
    let result = compile_program(&handler, config, &SourceEngine::default(), &units);
    let (errors, warnings) = handler.consume();
    Compiled {
        result,
        errors,
        warnings,
    }
}

/// Compile with everything kept, so functions can be inspected regardless of the call graph.
pub fn compile_all(entry: &str, types: Vec<TypeDeclaration>) -> Compiled {
    compile(
        &BuildConfig::for_entry_function(entry).only_reachable_functions(false),
        types,
    )
}

pub fn function(program: &ProgramCfa, name: &str) -> Function {
    program
        .function(name)
        .unwrap_or_else(|| panic!("no function {name}"))
}

pub fn edge_texts(context: &Context, function: &Function) -> Vec<String> {
    function
        .edges(context)
        .iter()
        .map(|edge| edge.get_kind(context).to_string())
        .collect()
}

/// The edge texts from the entry node for as long as control does not branch or join.
pub fn straight_line(context: &Context, function: &Function) -> Vec<String> {
    let mut texts = vec![];
    let mut node = function.get_entry(context);
    while let [edge] = node.leaving_edges(context) {
        texts.push(edge.get_kind(context).to_string());
        node = edge.get_successor(context);
        if node.num_entering_edges(context) > 1 {
            break;
        }
    }
    texts
}

/// The node the edge with exactly this text leads to.
pub fn target_of(context: &Context, function: &Function, text: &str) -> Node {
    function
        .edges(context)
        .into_iter()
        .find(|edge| edge.get_kind(context).to_string() == text)
        .map(|edge| edge.get_successor(context))
        .unwrap_or_else(|| panic!("no edge `{text}`"))
}

pub fn nodes_of_kind(context: &Context, function: &Function, kind: &NodeKind) -> Vec<Node> {
    function
        .nodes(context)
        .into_iter()
        .filter(|node| node.get_kind(context) == kind)
        .collect()
}

// Expressions

fn expr(kind: ExpressionKind, ty: JType) -> Expression {
    Expression::new(kind, ty, Span::dummy())
}

pub fn int(text: &str) -> Expression {
    expr(ExpressionKind::Literal(Literal::Integer(text.to_string())), JType::int())
}

pub fn boolean(value: bool) -> Expression {
    expr(ExpressionKind::Literal(Literal::Boolean(value)), JType::boolean())
}

pub fn local(name: &str, ty: JType) -> Expression {
    expr(
        ExpressionKind::Name {
            name: name.to_string(),
            binding: NameBinding::Local,
        },
        ty,
    )
}

pub fn int_var(name: &str) -> Expression {
    local(name, JType::int())
}

pub fn bool_var(name: &str) -> Expression {
    local(name, JType::boolean())
}

pub fn class_type(name: &str) -> JType {
    JType::Class(TypeName::new(name))
}

pub fn field(owner: &str, name: &str, ty: JType, is_static: bool) -> FieldBinding {
    FieldBinding {
        declaring_type: TypeName::new(owner),
        name: name.to_string(),
        ty,
        is_static,
    }
}

pub fn field_name(binding: FieldBinding) -> Expression {
    let ty = binding.ty.clone();
    expr(
        ExpressionKind::Name {
            name: binding.name.clone(),
            binding: NameBinding::Field(binding),
        },
        ty,
    )
}

pub fn length_of(array: Expression) -> Expression {
    expr(
        ExpressionKind::FieldAccess {
            target: Box::new(array),
            name: "length".to_string(),
            field: None,
        },
        JType::int(),
    )
}

pub fn binary(op: BinaryOperator, lhs: Expression, rhs: Expression, ty: JType) -> Expression {
    expr(
        ExpressionKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

pub fn and(lhs: Expression, rhs: Expression) -> Expression {
    binary(BinaryOperator::ConditionalAnd, lhs, rhs, JType::boolean())
}

pub fn less(lhs: Expression, rhs: Expression) -> Expression {
    binary(BinaryOperator::Less, lhs, rhs, JType::boolean())
}

pub fn assign(lhs: Expression, rhs: Expression) -> Expression {
    let ty = lhs.ty.clone();
    expr(
        ExpressionKind::Assignment {
            op: None,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

pub fn compound(op: BinaryOperator, lhs: Expression, rhs: Expression) -> Expression {
    let ty = lhs.ty.clone();
    expr(
        ExpressionKind::Assignment {
            op: Some(op),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

pub fn increment(operand: Expression, fixity: Fixity) -> Expression {
    let ty = operand.ty.clone();
    expr(
        ExpressionKind::IncDec {
            op: IncDecOperator::Increment,
            fixity,
            operand: Box::new(operand),
        },
        ty,
    )
}

pub fn conditional(
    condition: Expression,
    then_expr: Expression,
    else_expr: Expression,
) -> Expression {
    let ty = then_expr.ty.clone();
    expr(
        ExpressionKind::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        },
        ty,
    )
}

pub fn instance_of(operand: Expression, target: &str) -> Expression {
    expr(
        ExpressionKind::InstanceOf {
            operand: Box::new(operand),
            target: TypeName::new(target),
        },
        JType::boolean(),
    )
}

pub fn method_binding(
    owner: &str,
    name: &str,
    return_type: JType,
    is_static: bool,
) -> MethodBinding {
    MethodBinding {
        declaring_type: TypeName::new(owner),
        name: name.to_string(),
        parameter_types: vec![],
        return_type,
        is_static,
    }
}

/// `owner.name()` for a static method without parameters.
pub fn static_call(owner: &str, name: &str, return_type: JType) -> Expression {
    expr(
        ExpressionKind::MethodCall {
            receiver: None,
            name: name.to_string(),
            arguments: vec![],
            method: Some(method_binding(owner, name, return_type.clone(), true)),
            is_super: false,
        },
        return_type,
    )
}

/// `receiver.name()` for an instance method of `owner` without parameters.
pub fn virtual_call(
    receiver: Expression,
    owner: &str,
    name: &str,
    return_type: JType,
) -> Expression {
    expr(
        ExpressionKind::MethodCall {
            receiver: Some(Box::new(receiver)),
            name: name.to_string(),
            arguments: vec![],
            method: Some(method_binding(owner, name, return_type.clone(), false)),
            is_super: false,
        },
        return_type,
    )
}

pub fn new_object(class: &str) -> Expression {
    expr(
        ExpressionKind::New {
            class: TypeName::new(class),
            arguments: vec![],
            constructor: Some(MethodBinding::constructor(TypeName::new(class), vec![])),
        },
        class_type(class),
    )
}

// Statements

fn stmt(kind: StatementKind) -> Statement {
    Statement::new(kind, Span::dummy())
}

pub fn eval(expression: Expression) -> Statement {
    stmt(StatementKind::Expression(expression))
}

pub fn declare(name: &str, ty: JType, initializer: Option<Expression>) -> Statement {
    stmt(StatementKind::LocalVariable {
        is_final: false,
        declarators: vec![VariableDeclarator {
            name: name.to_string(),
            ty,
            initializer,
            span: Span::dummy(),
        }],
    })
}

pub fn block(statements: Vec<Statement>) -> Block {
    Block::new(statements, Span::dummy())
}

pub fn block_stmt(statements: Vec<Statement>) -> Statement {
    stmt(StatementKind::Block(block(statements)))
}

pub fn if_else(
    condition: Expression,
    then_branch: Statement,
    else_branch: Option<Statement>,
) -> Statement {
    stmt(StatementKind::If {
        condition,
        then_branch: Box::new(then_branch),
        else_branch: else_branch.map(Box::new),
    })
}

pub fn while_loop(condition: Expression, body: Statement) -> Statement {
    stmt(StatementKind::While {
        condition,
        body: Box::new(body),
    })
}

pub fn do_while(body: Statement, condition: Expression) -> Statement {
    stmt(StatementKind::DoWhile {
        body: Box::new(body),
        condition,
    })
}

pub fn for_loop(
    init: Vec<Statement>,
    condition: Option<Expression>,
    update: Vec<Expression>,
    body: Statement,
) -> Statement {
    stmt(StatementKind::For {
        init,
        condition,
        update,
        body: Box::new(body),
    })
}

pub fn for_each(variable: &str, ty: JType, iterable: Expression, body: Statement) -> Statement {
    stmt(StatementKind::ForEach {
        variable: param(variable, ty),
        iterable,
        body: Box::new(body),
    })
}

pub fn switch(selector: Expression, cases: Vec<(Option<Expression>, Vec<Statement>)>) -> Statement {
    let cases = cases
        .into_iter()
        .map(|(label, body)| jcfa_ast::SwitchCase {
            is_default: label.is_none(),
            labels: label.into_iter().collect(),
            body,
            span: Span::dummy(),
        })
        .collect();
    stmt(StatementKind::Switch { selector, cases })
}

pub fn labeled(label: &str, body: Statement) -> Statement {
    stmt(StatementKind::Labeled {
        label: label.to_string(),
        body: Box::new(body),
    })
}

pub fn break_to(label: Option<&str>) -> Statement {
    stmt(StatementKind::Break {
        label: label.map(str::to_string),
    })
}

pub fn continue_to(label: Option<&str>) -> Statement {
    stmt(StatementKind::Continue {
        label: label.map(str::to_string),
    })
}

pub fn ret(value: Option<Expression>) -> Statement {
    stmt(StatementKind::Return(value))
}

pub fn assert_that(condition: Expression) -> Statement {
    stmt(StatementKind::Assert {
        condition,
        message: None,
    })
}

pub fn this_call(arguments: Vec<Expression>) -> Statement {
    stmt(StatementKind::ConstructorInvocation {
        kind: jcfa_ast::ConstructorInvocationKind::This,
        arguments,
        constructor: None,
    })
}

// Declarations

pub fn param(name: &str, ty: JType) -> Parameter {
    Parameter {
        name: name.to_string(),
        ty,
        is_final: false,
        span: Span::dummy(),
    }
}

pub fn static_method(
    name: &str,
    parameters: Vec<Parameter>,
    return_type: JType,
    body: Vec<Statement>,
) -> MethodDeclaration {
    MethodDeclaration {
        name: name.to_string(),
        kind: MethodKind::Method,
        parameters,
        return_type,
        modifiers: Modifiers::public().with_static(),
        body: Some(block(body)),
        span: Span::dummy(),
    }
}

pub fn instance_method(name: &str, return_type: JType, body: Vec<Statement>) -> MethodDeclaration {
    MethodDeclaration {
        modifiers: Modifiers::public(),
        ..static_method(name, vec![], return_type, body)
    }
}

pub fn constructor(parameters: Vec<Parameter>, body: Vec<Statement>) -> MethodDeclaration {
    MethodDeclaration {
        name: String::new(),
        kind: MethodKind::Constructor,
        parameters,
        return_type: JType::Void,
        modifiers: Modifiers::public(),
        body: Some(block(body)),
        span: Span::dummy(),
    }
}

pub fn field_decl(
    name: &str,
    ty: JType,
    modifiers: Modifiers,
    initializer: Option<Expression>,
) -> FieldDeclaration {
    FieldDeclaration {
        name: name.to_string(),
        ty,
        modifiers,
        initializer,
        span: Span::dummy(),
    }
}

pub fn class(
    name: &str,
    super_class: Option<&str>,
    methods: Vec<MethodDeclaration>,
) -> TypeDeclaration {
    TypeDeclaration {
        name: TypeName::new(name),
        kind: TypeKind::Class,
        modifiers: Modifiers::public(),
        super_class: super_class.map(TypeName::new),
        interfaces: vec![],
        fields: vec![],
        methods,
        initializers: vec![],
        member_types: vec![],
        span: Span::dummy(),
    }
}
