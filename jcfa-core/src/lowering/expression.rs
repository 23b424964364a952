use jcfa_ast::{self as ast, ExpressionKind as K, FieldBinding, MethodBinding, NameBinding};
use jcfa_error::{
    error::CompileError,
    handler::Handler,
    warning::{CompileWarning, Warning},
};
use jcfa_ir::{
    CallKind, Declaration, Expression, ExpressionKind, FieldDeclaration, FunctionCall,
    FunctionDeclaration, FunctionKind, ParameterDeclaration, Statement, VariableDeclaration,
};
use jcfa_types::{
    BinaryOperator, Fixity, JType, Modifiers, PrimitiveType, Span, TypeName, UnaryOperator,
};
use std::sync::Arc;

use super::{
    literal::{parse_floating, parse_integer},
    ConditionalArm, Lowered, PendingConditional, Rhs, SideEffect, SideEffects,
};
use crate::{build_config::EvaluationOrder, scope::Scope, type_hierarchy::TypeHierarchy};

/// Where the value of an expression ends up, which decides what may stay inline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Position {
    /// The whole expression statement. Assignments and calls become the statement itself.
    Statement,
    /// The right-hand side of an assignment or declaration. A call may stay in place.
    Rhs,
    /// A complete value consumed by an edge, e.g. a condition or a return value.
    Value,
    /// An operand of an enclosing expression.
    Nested,
}

enum Frame<'ast> {
    Enter(&'ast ast::Expression, Position),
    Exit(&'ast ast::Expression, Position),
    /// Copy the left operand of a compound assignment into a temporary before the right operand
    /// runs.
    SnapshotCompoundOperand(&'ast ast::Expression),
}

enum Value {
    Expression(Expression),
    Call(FunctionCall),
    Statement(Statement),
}

/// Lowers one source expression into a side-effect free expression and its queued effects.
///
/// A lowerer is consumed by lowering a single expression, so the queues it hands back are never
/// shared between two expressions.
pub struct ExpressionLowerer<'a, 'ast> {
    scope: &'a mut Scope,
    hierarchy: &'a mut TypeHierarchy,
    handler: &'a Handler,
    compound_order: EvaluationOrder,
    effects: SideEffects<'ast>,
    /// The expression currently being lowered as a whole.
    root: Option<&'ast ast::Expression>,
}

impl<'a, 'ast> ExpressionLowerer<'a, 'ast> {
    pub fn new(
        scope: &'a mut Scope,
        hierarchy: &'a mut TypeHierarchy,
        handler: &'a Handler,
        compound_order: EvaluationOrder,
    ) -> Self {
        ExpressionLowerer {
            scope,
            hierarchy,
            handler,
            compound_order,
            effects: SideEffects::default(),
            root: None,
        }
    }

    /// Lower an expression whose value is consumed as a whole.
    pub fn lower_value(
        mut self,
        expr: &'ast ast::Expression,
    ) -> Result<Lowered<'ast, Expression>, CompileError> {
        let value = match self.run(expr, Position::Value)? {
            Value::Expression(value) => value,
            _ => return Err(CompileError::Internal("expected a value", expr.span.clone())),
        };
        Ok(Lowered {
            value,
            effects: self.effects,
        })
    }

    /// Lower the right-hand side of an assignment or declaration.
    pub fn lower_rhs(
        mut self,
        expr: &'ast ast::Expression,
    ) -> Result<Lowered<'ast, Rhs>, CompileError> {
        let value = match self.run(expr, Position::Rhs)? {
            Value::Expression(value) => Rhs::Expression(value),
            Value::Call(call) => Rhs::Call(call),
            Value::Statement(_) => {
                return Err(CompileError::Internal(
                    "statement in value position",
                    expr.span.clone(),
                ))
            }
        };
        Ok(Lowered {
            value,
            effects: self.effects,
        })
    }

    /// Lower an expression statement. The result is `None` if all of its effects were queued.
    pub fn lower_statement(
        mut self,
        expr: &'ast ast::Expression,
    ) -> Result<Lowered<'ast, Option<Statement>>, CompileError> {
        let value = match self.run(expr, Position::Statement)? {
            Value::Statement(statement) => Some(statement),
            Value::Call(call) => Some(Statement::Call(call)),
            Value::Expression(value) if value.is_literal() || value.is_lvalue() => None,
            Value::Expression(value) => Some(Statement::Expression(value)),
        };
        Ok(Lowered {
            value,
            effects: self.effects,
        })
    }

    /// Lower an explicit `this(..)` or `super(..)` call at the start of a constructor body.
    pub fn lower_constructor_invocation(
        mut self,
        kind: ast::ConstructorInvocationKind,
        arguments: &'ast [ast::Expression],
        constructor: Option<&MethodBinding>,
        span: &Span,
    ) -> Result<Lowered<'ast, FunctionCall>, CompileError> {
        let mut lowered_arguments = Vec::with_capacity(arguments.len());
        for argument in arguments {
            match self.run(argument, Position::Nested)? {
                Value::Expression(value) => lowered_arguments.push(value),
                _ => return Err(CompileError::Internal("expected an argument", span.clone())),
            }
        }
        let class = self
            .scope
            .current_class()
            .cloned()
            .unwrap_or_else(TypeName::object);
        let target = match kind {
            ast::ConstructorInvocationKind::This => class,
            ast::ConstructorInvocationKind::Super => self
                .hierarchy
                .get(&class)
                .and_then(|entry| entry.super_class.clone())
                .unwrap_or_else(TypeName::object),
        };
        let binding = constructor.cloned().unwrap_or_else(|| {
            let parameter_types = lowered_arguments.iter().map(|arg| arg.ty.clone()).collect();
            MethodBinding::constructor(target, parameter_types)
        });
        let function = self.bound_function(&binding, span);
        let value = FunctionCall {
            function,
            receiver: Some(self.this_expression()),
            arguments: lowered_arguments,
            kind: CallKind::Special,
            receiver_type: None,
        };
        Ok(Lowered {
            value,
            effects: self.effects,
        })
    }

    fn run(
        &mut self,
        root: &'ast ast::Expression,
        position: Position,
    ) -> Result<Value, CompileError> {
        self.root = Some(root);
        let mut frames = vec![Frame::Enter(root, position)];
        let mut values = vec![];
        while let Some(frame) = frames.pop() {
            match frame {
                Frame::Enter(expr, position) => {
                    self.enter(expr, position, &mut frames, &mut values)?
                }
                Frame::Exit(expr, position) => {
                    let value = self.exit(expr, position, &mut values)?;
                    values.push(value);
                }
                Frame::SnapshotCompoundOperand(expr) => {
                    let Some(Value::Expression(lhs)) = values.last() else {
                        return Err(CompileError::Internal(
                            "missing compound assignment operand",
                            expr.span.clone(),
                        ));
                    };
                    let snapshot = self.hoist(Rhs::Expression(lhs.clone()), lhs.ty.clone(), expr);
                    values.push(Value::Expression(snapshot));
                }
            }
        }
        match (values.pop(), values.is_empty()) {
            (Some(value), true) => Ok(value),
            _ => Err(CompileError::Internal(
                "unbalanced expression lowering",
                root.span.clone(),
            )),
        }
    }

    fn enter(
        &mut self,
        expr: &'ast ast::Expression,
        position: Position,
        frames: &mut Vec<Frame<'ast>>,
        values: &mut Vec<Value>,
    ) -> Result<(), CompileError> {
        match &expr.kind {
            K::Parenthesized(inner) => frames.push(Frame::Enter(inner, position)),
            K::Literal(literal) => {
                values.push(Value::Expression(self.lower_literal(literal, false, expr)?))
            }
            K::Unary {
                op: UnaryOperator::Minus,
                operand,
            } if is_numeric_literal(operand) => {
                let K::Literal(literal) = &operand.kind else {
                    return Err(CompileError::Internal("expected a literal", expr.span.clone()));
                };
                values.push(Value::Expression(self.lower_literal(literal, true, operand)?));
            }
            K::Name { name, binding } => {
                values.push(Value::Expression(self.lower_name(name, binding, expr)?))
            }
            K::This => values.push(Value::Expression(self.this_expression())),
            K::FieldAccess {
                target,
                name,
                field,
            } => match type_qualifier(target) {
                Some(owner) => {
                    let owner_ty = JType::Class(owner.clone());
                    let field = self.resolve_field(field.as_ref(), name, &owner_ty, expr);
                    values.push(Value::Expression(field_access(None, field)));
                }
                None => {
                    frames.push(Frame::Exit(expr, position));
                    frames.push(Frame::Enter(target, Position::Nested));
                }
            },
            K::ArrayAccess { array, index } => {
                frames.push(Frame::Exit(expr, position));
                frames.push(Frame::Enter(index, Position::Nested));
                frames.push(Frame::Enter(array, Position::Nested));
            }
            K::ArrayCreation {
                dimensions,
                initializer,
                ..
            } => {
                frames.push(Frame::Exit(expr, position));
                if let Some(initializer) = initializer {
                    frames.push(Frame::Enter(initializer, Position::Nested));
                }
                for dimension in dimensions.iter().rev() {
                    frames.push(Frame::Enter(dimension, Position::Nested));
                }
            }
            K::ArrayInitializer(elements) => {
                frames.push(Frame::Exit(expr, position));
                for element in elements.iter().rev() {
                    frames.push(Frame::Enter(element, Position::Nested));
                }
            }
            K::Unary { operand, .. }
            | K::IncDec { operand, .. }
            | K::Cast { operand, .. }
            | K::InstanceOf { operand, .. } => {
                frames.push(Frame::Exit(expr, position));
                frames.push(Frame::Enter(operand, Position::Nested));
            }
            K::Binary { op, lhs, rhs } if op.is_short_circuit() && rhs.has_side_effects() => {
                // The right operand may only run if the left one does not decide the result.
                let (then_arm, else_arm) = match op {
                    BinaryOperator::ConditionalAnd => {
                        (ConditionalArm::Expression(rhs), ConditionalArm::Constant(false))
                    }
                    _ => (ConditionalArm::Constant(true), ConditionalArm::Expression(rhs)),
                };
                values.push(Value::Expression(
                    self.stage_conditional(lhs, then_arm, else_arm, expr),
                ));
            }
            K::Binary { lhs, rhs, .. } => {
                frames.push(Frame::Exit(expr, position));
                frames.push(Frame::Enter(rhs, Position::Nested));
                frames.push(Frame::Enter(lhs, Position::Nested));
            }
            K::Assignment { op, lhs, rhs } => {
                frames.push(Frame::Exit(expr, position));
                match op {
                    None => frames.push(Frame::Enter(rhs, Position::Rhs)),
                    Some(_) => {
                        frames.push(Frame::Enter(rhs, Position::Nested));
                        if self.snapshots_compound_operand(rhs) {
                            frames.push(Frame::SnapshotCompoundOperand(expr));
                        }
                    }
                }
                frames.push(Frame::Enter(lhs, Position::Nested));
            }
            K::Conditional {
                condition,
                then_expr,
                else_expr,
            } => values.push(Value::Expression(self.stage_conditional(
                condition,
                ConditionalArm::Expression(then_expr),
                ConditionalArm::Expression(else_expr),
                expr,
            ))),
            K::MethodCall {
                receiver,
                arguments,
                is_super,
                ..
            } => {
                frames.push(Frame::Exit(expr, position));
                for argument in arguments.iter().rev() {
                    frames.push(Frame::Enter(argument, Position::Nested));
                }
                if let Some(receiver) = evaluated_receiver(receiver.as_deref(), *is_super) {
                    frames.push(Frame::Enter(receiver, Position::Nested));
                }
            }
            K::New { arguments, .. } => {
                frames.push(Frame::Exit(expr, position));
                for argument in arguments.iter().rev() {
                    frames.push(Frame::Enter(argument, Position::Nested));
                }
            }
            K::Lambda { .. } => {
                return Err(CompileError::UnsupportedSyntax {
                    construct: "lambda expression",
                    span: expr.span.clone(),
                })
            }
        }
        Ok(())
    }

    fn exit(
        &mut self,
        expr: &'ast ast::Expression,
        position: Position,
        values: &mut Vec<Value>,
    ) -> Result<Value, CompileError> {
        let span = &expr.span;
        let value = match &expr.kind {
            K::FieldAccess { name, field, .. } => {
                let target = pop_expression(values, span)?;
                if field.is_none() && name == "length" && target.ty.is_array() {
                    Expression::array_length(target)
                } else {
                    let field = self.resolve_field(field.as_ref(), name, &target.ty, expr);
                    match field.is_static() {
                        true => field_access(None, field),
                        false => field_access(Some(target), field),
                    }
                }
            }
            K::ArrayAccess { .. } => {
                let index = pop_expression(values, span)?;
                let array = pop_expression(values, span)?;
                let ty = match &expr.ty {
                    JType::Unspecified => array
                        .ty
                        .element_type()
                        .cloned()
                        .unwrap_or(JType::Unspecified),
                    ty => ty.clone(),
                };
                Expression::new(
                    ExpressionKind::ArraySubscript {
                        array: Box::new(array),
                        index: Box::new(index),
                    },
                    ty,
                )
            }
            K::ArrayCreation {
                element_type,
                dimensions,
                initializer,
            } => {
                let initializer = match initializer {
                    Some(_) => Some(Box::new(pop_expression(values, span)?)),
                    None => None,
                };
                let dimensions = pop_expressions(values, dimensions.len(), span)?;
                Expression::new(
                    ExpressionKind::ArrayCreation {
                        element_type: element_type.clone(),
                        dimensions,
                        initializer,
                    },
                    expr.ty.clone(),
                )
            }
            K::ArrayInitializer(elements) => Expression::new(
                ExpressionKind::ArrayInitializer(pop_expressions(values, elements.len(), span)?),
                expr.ty.clone(),
            ),
            K::Unary { op, .. } => {
                let operand = pop_expression(values, span)?;
                let ty = match &expr.ty {
                    JType::Unspecified => operand.ty.clone(),
                    ty => ty.clone(),
                };
                Expression::new(
                    ExpressionKind::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    ty,
                )
            }
            K::IncDec {
                op,
                fixity,
                operand,
            } => {
                let target = pop_expression(values, span)?;
                if !target.is_lvalue() {
                    return Err(CompileError::UnsupportedSyntax {
                        construct: "increment of a non-variable",
                        span: span.clone(),
                    });
                }
                let ty = target.ty.clone();
                let updated = Expression::binary(
                    op.binary_operator(),
                    target.clone(),
                    Expression::int(1),
                    ty.clone(),
                );
                let statement = Statement::Assignment {
                    lhs: target.clone(),
                    rhs: updated,
                };
                let effect = SideEffect::Statement {
                    statement: statement.clone(),
                    span: span.clone(),
                };
                match (position, fixity) {
                    (Position::Statement, _) => return Ok(Value::Statement(statement)),
                    (_, Fixity::Prefix) => self.effects.pre.push_back(effect),
                    // Another read of the target must see the updated value, so the old one is
                    // copied and the update runs right away.
                    (_, Fixity::Postfix) if self.is_referenced_again(operand) => {
                        let old = self.hoist(Rhs::Expression(target), ty, expr);
                        self.effects.pre.push_back(effect);
                        return Ok(Value::Expression(old));
                    }
                    (_, Fixity::Postfix) => self.effects.post.push_back(effect),
                }
                target
            }
            K::Binary { op, .. } => {
                let rhs = pop_expression(values, span)?;
                let lhs = pop_expression(values, span)?;
                let ty = match &expr.ty {
                    JType::Unspecified if op.is_relational() || op.is_short_circuit() => {
                        JType::boolean()
                    }
                    JType::Unspecified => lhs.ty.clone(),
                    ty => ty.clone(),
                };
                Expression::binary(*op, lhs, rhs, ty)
            }
            K::Assignment { op, rhs, .. } => {
                let value = values.pop().ok_or_else(|| {
                    CompileError::Internal("missing assignment operand", span.clone())
                })?;
                let snapshot = match op.is_some() && self.snapshots_compound_operand(rhs) {
                    true => Some(pop_expression(values, span)?),
                    false => None,
                };
                let lhs = pop_expression(values, span)?;
                if !lhs.is_lvalue() {
                    return Err(CompileError::UnsupportedSyntax {
                        construct: "assignment to a non-variable",
                        span: span.clone(),
                    });
                }
                let statement = match (op, value) {
                    (None, Value::Expression(rhs)) => Statement::Assignment {
                        lhs: lhs.clone(),
                        rhs,
                    },
                    (None, Value::Call(call)) => Statement::CallAssignment {
                        lhs: lhs.clone(),
                        call,
                    },
                    (Some(op), Value::Expression(rhs)) => {
                        let operand = snapshot.unwrap_or_else(|| lhs.clone());
                        Statement::Assignment {
                            lhs: lhs.clone(),
                            rhs: Expression::binary(*op, operand, rhs, lhs.ty.clone()),
                        }
                    }
                    _ => {
                        return Err(CompileError::Internal(
                            "unexpected assignment operand",
                            span.clone(),
                        ))
                    }
                };
                if position == Position::Statement {
                    return Ok(Value::Statement(statement));
                }
                self.effects.pre.push_back(SideEffect::Statement {
                    statement,
                    span: span.clone(),
                });
                lhs
            }
            K::Cast { target, .. } => {
                let operand = pop_expression(values, span)?;
                let cast = Expression::new(
                    ExpressionKind::Cast {
                        target: target.clone(),
                        operand: Box::new(operand),
                    },
                    target.clone(),
                );
                match position {
                    Position::Nested => self.hoist(Rhs::Expression(cast), target.clone(), expr),
                    _ => cast,
                }
            }
            K::InstanceOf { target, .. } => {
                let operand = pop_expression(values, span)?;
                self.lower_instance_of(operand, target, span)
            }
            K::MethodCall {
                receiver,
                name,
                arguments,
                method,
                is_super,
            } => {
                let arguments = pop_expressions(values, arguments.len(), span)?;
                let receiver_value = match evaluated_receiver(receiver.as_deref(), *is_super) {
                    Some(_) => Some(pop_expression(values, span)?),
                    None => None,
                };
                let function = self.resolve_method(
                    method.as_ref(),
                    name,
                    receiver.as_deref(),
                    receiver_value.as_ref(),
                    &arguments,
                    expr,
                );
                let (kind, receiver) = if *is_super {
                    (CallKind::Special, Some(self.this_expression()))
                } else if function.is_static() {
                    (CallKind::Static, None)
                } else {
                    let kind = match function.modifiers.is_private() {
                        true => CallKind::Special,
                        false => CallKind::Virtual,
                    };
                    let receiver = receiver_value.unwrap_or_else(|| self.this_expression());
                    (kind, Some(receiver))
                };
                let call = FunctionCall {
                    function,
                    receiver,
                    arguments,
                    kind,
                    receiver_type: None,
                };
                return self.finish_call(call, expr, position);
            }
            K::New {
                class,
                arguments,
                constructor,
            } => {
                let arguments = pop_expressions(values, arguments.len(), span)?;
                let function =
                    self.resolve_constructor(class, constructor.as_ref(), &arguments, expr);
                let call = FunctionCall {
                    function,
                    receiver: None,
                    arguments,
                    kind: CallKind::Constructor,
                    receiver_type: None,
                };
                return self.finish_call(call, expr, position);
            }
            _ => {
                return Err(CompileError::Internal(
                    "expression has no exit frame",
                    span.clone(),
                ))
            }
        };
        Ok(Value::Expression(value))
    }

    fn finish_call(
        &mut self,
        call: FunctionCall,
        expr: &ast::Expression,
        position: Position,
    ) -> Result<Value, CompileError> {
        if matches!(position, Position::Statement | Position::Rhs) {
            return Ok(Value::Call(call));
        }
        let ty = match call.kind {
            CallKind::Constructor => JType::Class(call.function.declaring_type.clone()),
            _ => match &expr.ty {
                JType::Unspecified => call.function.return_type.clone(),
                ty => ty.clone(),
            },
        };
        if ty.is_void() {
            return Err(CompileError::VoidValueUsed {
                span: expr.span.clone(),
            });
        }
        Ok(Value::Expression(self.hoist(Rhs::Call(call), ty, expr)))
    }

    /// Store `value` in a fresh temporary and return a reference to it.
    fn hoist(&mut self, value: Rhs, ty: JType, expr: &ast::Expression) -> Expression {
        let declaration = self.scope.create_temporary(ty, &expr.span);
        self.effects.pre.push_back(SideEffect::Temporary {
            declaration: declaration.clone(),
            value,
            span: expr.span.clone(),
        });
        Expression::id(Declaration::Variable(declaration))
    }

    fn stage_conditional(
        &mut self,
        condition: &'ast ast::Expression,
        then_arm: ConditionalArm<'ast>,
        else_arm: ConditionalArm<'ast>,
        expr: &ast::Expression,
    ) -> Expression {
        let ty = match (&expr.ty, then_arm) {
            (JType::Unspecified, ConditionalArm::Expression(arm)) => arm.ty.clone(),
            (JType::Unspecified, ConditionalArm::Constant(_)) => JType::boolean(),
            (ty, _) => ty.clone(),
        };
        let temporary = self.scope.create_temporary(ty, &expr.span);
        self.effects
            .pre
            .push_back(SideEffect::Conditional(PendingConditional {
                temporary: temporary.clone(),
                condition,
                then_arm,
                else_arm,
                span: expr.span.clone(),
            }));
        Expression::id(Declaration::Variable(temporary))
    }

    fn is_referenced_again(&self, target: &ast::Expression) -> bool {
        let Some(root) = self.root else {
            return true;
        };
        match target.assigned_name() {
            Some(name) => root.count_references(name) > 1,
            None => true,
        }
    }

    fn snapshots_compound_operand(&self, rhs: &ast::Expression) -> bool {
        self.compound_order == EvaluationOrder::LeftToRight && rhs.has_side_effects()
    }

    fn lower_literal(
        &self,
        literal: &ast::Literal,
        negated: bool,
        expr: &ast::Expression,
    ) -> Result<Expression, CompileError> {
        let kind = match literal {
            ast::Literal::Integer(text) => return parse_integer(text, negated, &expr.span),
            ast::Literal::Floating(text) => return parse_floating(text, negated, &expr.span),
            ast::Literal::Character(c) => {
                return Ok(Expression::new(
                    ExpressionKind::CharLiteral(*c),
                    JType::Primitive(PrimitiveType::Char),
                ))
            }
            ast::Literal::String(s) => ExpressionKind::StringLiteral(s.clone()),
            ast::Literal::Boolean(b) => return Ok(Expression::boolean(*b)),
            ast::Literal::Null => return Ok(Expression::null()),
        };
        Ok(Expression::new(kind, JType::string()))
    }

    fn lower_name(
        &mut self,
        name: &str,
        binding: &NameBinding,
        expr: &ast::Expression,
    ) -> Result<Expression, CompileError> {
        match binding {
            NameBinding::Local => match self.scope.lookup_variable(name) {
                Some(Declaration::Field(field)) => Ok(self.implicit_field_access(field)),
                Some(declaration) => Ok(Expression::id(declaration)),
                None => Ok(self.unresolved_variable(name, expr)),
            },
            NameBinding::Field(binding) => {
                let owner = JType::Class(binding.declaring_type.clone());
                let field = self.resolve_field(Some(binding), name, &owner, expr);
                Ok(self.implicit_field_access(field))
            }
            NameBinding::Type(_) => Err(CompileError::UnsupportedSyntax {
                construct: "type name used as a value",
                span: expr.span.clone(),
            }),
            NameBinding::Unresolved => Ok(self.unresolved_variable(name, expr)),
        }
    }

    fn unresolved_variable(&self, name: &str, expr: &ast::Expression) -> Expression {
        self.handler.emit_warn(CompileWarning {
            span: expr.span.clone(),
            warning_content: Warning::UnresolvedVariable {
                name: name.to_string(),
            },
        });
        let declaration =
            VariableDeclaration::unresolved(name, expr.ty.clone(), expr.span.clone());
        Expression::id(Declaration::Variable(Arc::new(declaration)))
    }

    /// A field named without a target, `x` for `this.x` or `C.x`.
    fn implicit_field_access(&self, field: Arc<FieldDeclaration>) -> Expression {
        match field.is_static() {
            true => field_access(None, field),
            false => field_access(Some(self.this_expression()), field),
        }
    }

    fn resolve_field(
        &mut self,
        binding: Option<&FieldBinding>,
        name: &str,
        target_ty: &JType,
        expr: &ast::Expression,
    ) -> Arc<FieldDeclaration> {
        let Some(binding) = binding else {
            self.handler.emit_warn(CompileWarning {
                span: expr.span.clone(),
                warning_content: Warning::UnresolvedField {
                    name: name.to_string(),
                },
            });
            let owner = target_ty.type_name().cloned().unwrap_or_else(TypeName::object);
            return Arc::new(FieldDeclaration::unresolved(
                owner,
                name,
                expr.ty.clone(),
                expr.span.clone(),
            ));
        };
        if let Some(field) = self.scope.lookup_field(&binding.qualified_name()) {
            return field;
        }
        self.hierarchy
            .request_type(self.handler, &binding.declaring_type, &expr.span);
        let modifiers = match binding.is_static {
            true => Modifiers::public().with_static(),
            false => Modifiers::public(),
        };
        Arc::new(FieldDeclaration {
            qualified_name: binding.qualified_name(),
            name: binding.name.clone(),
            ty: binding.ty.clone(),
            modifiers,
            declaring_type: binding.declaring_type.clone(),
            span: Span::dummy(),
        })
    }

    fn resolve_method(
        &mut self,
        binding: Option<&MethodBinding>,
        name: &str,
        receiver: Option<&ast::Expression>,
        receiver_value: Option<&Expression>,
        arguments: &[Expression],
        expr: &ast::Expression,
    ) -> Arc<FunctionDeclaration> {
        if let Some(binding) = binding {
            return self.bound_function(binding, &expr.span);
        }
        self.handler.emit_warn(CompileWarning {
            span: expr.span.clone(),
            warning_content: Warning::UnresolvedMethod {
                name: name.to_string(),
            },
        });
        let qualifier = receiver.and_then(type_qualifier);
        let owner = qualifier
            .cloned()
            .or_else(|| receiver_value.and_then(|value| value.ty.type_name().cloned()))
            .or_else(|| self.scope.current_class().cloned())
            .unwrap_or_else(TypeName::object);
        let parameter_types = arguments.iter().map(|arg| arg.ty.clone()).collect::<Vec<_>>();
        Arc::new(FunctionDeclaration::unresolved(
            owner,
            name,
            &parameter_types,
            expr.ty.clone(),
            qualifier.is_some(),
            expr.span.clone(),
        ))
    }

    fn resolve_constructor(
        &mut self,
        class: &TypeName,
        binding: Option<&MethodBinding>,
        arguments: &[Expression],
        expr: &ast::Expression,
    ) -> Arc<FunctionDeclaration> {
        let binding = binding.cloned().unwrap_or_else(|| {
            let parameter_types = arguments.iter().map(|arg| arg.ty.clone()).collect();
            MethodBinding::constructor(class.clone(), parameter_types)
        });
        if self.scope.lookup_method(&binding.qualified_name()).is_none()
            && self.hierarchy.is_declared(class)
        {
            self.handler.emit_warn(CompileWarning {
                span: expr.span.clone(),
                warning_content: Warning::UnresolvedMethod {
                    name: binding.qualified_name(),
                },
            });
        }
        self.bound_function(&binding, &expr.span)
    }

    /// The declaration a binding refers to, synthesizing one for methods of external types.
    fn bound_function(&mut self, binding: &MethodBinding, span: &Span) -> Arc<FunctionDeclaration> {
        if let Some(function) = self.scope.lookup_method(&binding.qualified_name()) {
            return function;
        }
        self.hierarchy
            .request_type(self.handler, &binding.declaring_type, span);
        self.scope
            .register_external_method(external_function(binding))
    }

    fn lower_instance_of(
        &mut self,
        operand: Expression,
        target: &TypeName,
        span: &Span,
    ) -> Expression {
        if !self.hierarchy.contains(target) {
            self.hierarchy.request_type(self.handler, target, span);
        }
        let type_test = self
            .hierarchy
            .concrete_subclasses(target)
            .into_iter()
            .map(|class| Expression::runtime_type_equals(operand.clone(), class))
            .reduce(|tests, test| {
                Expression::binary(BinaryOperator::ConditionalOr, tests, test, JType::boolean())
            });
        let Some(type_test) = type_test else {
            return Expression::boolean(false);
        };
        let non_null = Expression::binary(
            BinaryOperator::NotEqual,
            operand,
            Expression::null(),
            JType::boolean(),
        );
        Expression::binary(
            BinaryOperator::ConditionalAnd,
            non_null,
            type_test,
            JType::boolean(),
        )
    }

    fn this_expression(&self) -> Expression {
        let class = self
            .scope
            .current_class()
            .cloned()
            .unwrap_or_else(TypeName::object);
        Expression::new(ExpressionKind::This, JType::Class(class))
    }
}

fn is_numeric_literal(expr: &ast::Expression) -> bool {
    matches!(
        expr.kind,
        K::Literal(ast::Literal::Integer(_) | ast::Literal::Floating(_))
    )
}

/// The type named by `expr` if it is a type used as a qualifier, as in `Math.PI`.
fn type_qualifier(expr: &ast::Expression) -> Option<&TypeName> {
    match &expr.unparenthesized().kind {
        K::Name {
            binding: NameBinding::Type(name),
            ..
        } => Some(name),
        _ => None,
    }
}

/// The receiver expression that is evaluated for a call, if any.
fn evaluated_receiver(
    receiver: Option<&ast::Expression>,
    is_super: bool,
) -> Option<&ast::Expression> {
    receiver.filter(|receiver| !is_super && type_qualifier(receiver).is_none())
}

pub(crate) fn field_access(target: Option<Expression>, field: Arc<FieldDeclaration>) -> Expression {
    let ty = field.ty.clone();
    Expression::new(
        ExpressionKind::FieldAccess {
            target: target.map(Box::new),
            field,
        },
        ty,
    )
}

fn pop_expression(values: &mut Vec<Value>, span: &Span) -> Result<Expression, CompileError> {
    match values.pop() {
        Some(Value::Expression(expr)) => Ok(expr),
        _ => Err(CompileError::Internal("expected an operand", span.clone())),
    }
}

/// Pop the last `count` operands, in evaluation order.
fn pop_expressions(
    values: &mut Vec<Value>,
    count: usize,
    span: &Span,
) -> Result<Vec<Expression>, CompileError> {
    if values.len() < count {
        return Err(CompileError::Internal("missing operands", span.clone()));
    }
    values
        .split_off(values.len() - count)
        .into_iter()
        .map(|value| match value {
            Value::Expression(expr) => Ok(expr),
            _ => Err(CompileError::Internal("expected an operand", span.clone())),
        })
        .collect()
}

/// A body-less declaration for a method of a type outside the program.
pub(crate) fn external_function(binding: &MethodBinding) -> FunctionDeclaration {
    let qualified_name = binding.qualified_name();
    let parameters = binding
        .parameter_types
        .iter()
        .enumerate()
        .map(|(idx, ty)| {
            Arc::new(ParameterDeclaration {
                qualified_name: format!("{qualified_name}::arg{idx}"),
                name: format!("arg{idx}"),
                ty: ty.clone(),
                modifiers: Modifiers::default(),
                span: Span::dummy(),
            })
        })
        .collect();
    let (kind, modifiers) = match (binding.is_constructor(), binding.is_static) {
        (true, _) => (FunctionKind::Constructor, Modifiers::public()),
        (false, true) => (FunctionKind::Method, Modifiers::public().with_static()),
        (false, false) => (FunctionKind::Method, Modifiers::public()),
    };
    FunctionDeclaration {
        qualified_name,
        name: binding.name.clone(),
        declaring_type: binding.declaring_type.clone(),
        parameters,
        return_type: binding.return_type.clone(),
        modifiers,
        kind,
        has_body: false,
        span: Span::dummy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jcfa_ast::{Expression as Ast, Literal};
    use jcfa_types::IncDecOperator;

    fn int_lit(text: &str) -> Ast {
        Ast::new(
            K::Literal(Literal::Integer(text.to_string())),
            JType::int(),
            Span::dummy(),
        )
    }

    fn local(name: &str) -> Ast {
        Ast::new(
            K::Name {
                name: name.to_string(),
                binding: NameBinding::Local,
            },
            JType::int(),
            Span::dummy(),
        )
    }

    fn setup() -> (Scope, TypeHierarchy, Handler) {
        let mut scope = Scope::new();
        scope.enter_block();
        for name in ["x", "y"] {
            scope
                .declare_local(name, JType::int(), false, &Span::dummy())
                .unwrap();
        }
        (scope, TypeHierarchy::new(), Handler::default())
    }

    #[test]
    fn postfix_increment_is_queued_after() {
        let (mut scope, mut hierarchy, handler) = setup();
        // y = x++ + 1
        let incremented = Ast::new(
            K::IncDec {
                op: IncDecOperator::Increment,
                fixity: Fixity::Postfix,
                operand: Box::new(local("x")),
            },
            JType::int(),
            Span::dummy(),
        );
        let sum = Ast::new(
            K::Binary {
                op: BinaryOperator::Add,
                lhs: Box::new(incremented),
                rhs: Box::new(int_lit("1")),
            },
            JType::int(),
            Span::dummy(),
        );
        let lowered = ExpressionLowerer::new(
            &mut scope,
            &mut hierarchy,
            &handler,
            EvaluationOrder::Legacy,
        )
        .lower_value(&sum)
        .unwrap();
        assert_eq!(lowered.value.to_string(), "x + 1");
        assert!(lowered.effects.pre.is_empty());
        assert_eq!(lowered.effects.post.len(), 1);
    }

    #[test]
    fn postfix_target_read_again_is_copied_first() {
        let (mut scope, mut hierarchy, handler) = setup();
        // x++ + x
        let incremented = Ast::new(
            K::IncDec {
                op: IncDecOperator::Increment,
                fixity: Fixity::Postfix,
                operand: Box::new(local("x")),
            },
            JType::int(),
            Span::dummy(),
        );
        let sum = Ast::new(
            K::Binary {
                op: BinaryOperator::Add,
                lhs: Box::new(incremented),
                rhs: Box::new(local("x")),
            },
            JType::int(),
            Span::dummy(),
        );
        let lowered = ExpressionLowerer::new(
            &mut scope,
            &mut hierarchy,
            &handler,
            EvaluationOrder::Legacy,
        )
        .lower_value(&sum)
        .unwrap();
        assert_eq!(lowered.value.to_string(), "__tmp_0 + x");
        assert_eq!(lowered.effects.pre.len(), 2);
        assert!(lowered.effects.post.is_empty());
    }

    #[test]
    fn negated_literal_is_folded() {
        let (mut scope, mut hierarchy, handler) = setup();
        let min = Ast::new(
            K::Unary {
                op: UnaryOperator::Minus,
                operand: Box::new(int_lit("2147483648")),
            },
            JType::int(),
            Span::dummy(),
        );
        let lowered = ExpressionLowerer::new(
            &mut scope,
            &mut hierarchy,
            &handler,
            EvaluationOrder::Legacy,
        )
        .lower_value(&min)
        .unwrap();
        assert_eq!(lowered.value, Expression::int(i32::MIN as i64));
        assert!(lowered.effects.is_empty());
    }

    #[test]
    fn assignment_statement_has_no_effects() {
        let (mut scope, mut hierarchy, handler) = setup();
        let assign = Ast::new(
            K::Assignment {
                op: Some(BinaryOperator::Mul),
                lhs: Box::new(local("x")),
                rhs: Box::new(local("y")),
            },
            JType::int(),
            Span::dummy(),
        );
        let lowered = ExpressionLowerer::new(
            &mut scope,
            &mut hierarchy,
            &handler,
            EvaluationOrder::Legacy,
        )
        .lower_statement(&assign)
        .unwrap();
        assert!(lowered.effects.is_empty());
        let statement = lowered.value.unwrap();
        assert_eq!(statement.to_string(), "x = x * y;");
    }

    #[test]
    fn unresolved_name_warns() {
        let (mut scope, mut hierarchy, handler) = setup();
        let missing = local("missing");
        let lowered = ExpressionLowerer::new(
            &mut scope,
            &mut hierarchy,
            &handler,
            EvaluationOrder::Legacy,
        )
        .lower_value(&missing)
        .unwrap();
        assert!(handler.has_warnings());
        let ExpressionKind::Id(declaration) = &lowered.value.kind else {
            panic!("expected a variable reference");
        };
        assert!(declaration.is_unresolved());
    }
}
