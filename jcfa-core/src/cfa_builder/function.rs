use indexmap::IndexMap;
use jcfa_ast::{self as ast, StatementKind as S};
use jcfa_error::{
    error::CompileError,
    handler::Handler,
    warning::{CompileWarning, Warning},
};
use jcfa_ir::{
    prune_unreachable, CallKind, Context, Declaration, Edge, EdgeKind, Expression, ExpressionKind,
    FieldDeclaration, Function, FunctionCall, FunctionDeclaration, Node, NodeKind, Statement,
    VariableDeclaration,
};
use jcfa_types::{BinaryOperator, JType, Span, TypeName};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::{
    build_config::BuildConfig,
    lowering::{
        external_function, field_access, ConditionalArm, ExpressionLowerer, Lowered, Rhs,
        SideEffect, SideEffects,
    },
    scope::Scope,
    type_hierarchy::TypeHierarchy,
};

const ITERATOR_TYPE_NAME: &str = "java.util.Iterator";
const ITERABLE_TYPE_NAME: &str = "java.lang.Iterable";

/// The code a function's CFA is built from.
pub(crate) enum FunctionBody<'ast> {
    Method(&'ast ast::Block),
    /// `body` is `None` for a synthesized default constructor.
    Constructor {
        body: Option<&'ast ast::Block>,
        prologue: Prologue<'ast>,
    },
    ClassInitializer(Vec<InitializerItem<'ast>>),
}

/// Code that runs at the start of every constructor not delegating to `this(..)`.
pub(crate) struct Prologue<'ast> {
    pub items: Vec<InitializerItem<'ast>>,
    /// The superclass constructor called when the body does not invoke one explicitly.
    pub implicit_super: Option<Arc<FunctionDeclaration>>,
}

#[derive(Clone)]
pub(crate) enum InitializerItem<'ast> {
    Field {
        field: Arc<FieldDeclaration>,
        initializer: &'ast ast::Expression,
    },
    Block(&'ast ast::Block),
}

/// One step of the builder's stack machine.
///
/// Every task starts at the current node and leaves the builder at the node where control
/// continues. Tasks are popped from the end of the stack, so they are pushed in reverse.
pub(super) enum Task<'ast> {
    Statement(&'ast ast::Statement),
    Block(&'ast ast::Block),
    EnterBlock,
    LeaveBlock,
    /// Report errors of the following tasks as part of this statement.
    Within(&'ast ast::Statement),
    /// Continue building at the given node.
    Resume(Node),
    /// Connect the current node to `target` if control can reach it.
    Jump {
        target: Node,
        description: &'static str,
    },
    LeaveLoop,
    LeaveSwitch,
    LeaveLabel(String),
    Declare {
        declarator: &'ast ast::VariableDeclarator,
        is_final: bool,
    },
    DeclareLoopVariable {
        variable: &'ast ast::Parameter,
        value: Rhs,
    },
    /// Evaluate an expression for its effects only.
    Evaluate(&'ast ast::Expression),
    Effect(SideEffect<'ast>),
    Edge {
        kind: EdgeKind,
        span: Span,
    },
    /// Add an edge from the current node straight into `target`.
    EdgeTo {
        kind: EdgeKind,
        span: Span,
        target: Node,
    },
    /// Branch on a source condition, splitting boolean operators into separate assumptions.
    Condition {
        expression: &'ast ast::Expression,
        on_true: Node,
        on_false: Node,
    },
    /// Branch on a lowered condition.
    Assume {
        expression: Expression,
        on_true: Node,
        on_false: Node,
        span: Span,
    },
    /// Assign one arm of a staged conditional to its temporary and continue at `join`.
    ConditionalArm {
        target: Expression,
        arm: ConditionalArm<'ast>,
        join: Node,
        span: Span,
    },
    FieldInitializer {
        field: Arc<FieldDeclaration>,
        initializer: &'ast ast::Expression,
    },
    ImplicitSuper(Arc<FunctionDeclaration>),
    Return {
        expression: Option<Expression>,
        span: Span,
    },
}

struct LabelTarget {
    exit: Node,
    /// Set when the labeled statement is a loop.
    continue_target: Option<Node>,
}

/// Builds the CFA of a single function from its body.
pub(crate) struct FunctionBuilder<'a, 'ast> {
    pub(super) context: &'a mut Context,
    pub(super) scope: &'a mut Scope,
    pub(super) hierarchy: &'a mut TypeHierarchy,
    pub(super) handler: &'a Handler,
    config: &'a BuildConfig,
    declaration: Arc<FunctionDeclaration>,
    pub(super) function: Function,
    pub(super) current: Node,
    tasks: Vec<Task<'ast>>,
    /// Targets of `continue`, innermost loop last.
    loop_starts: Vec<Node>,
    /// Targets of `break`, innermost loop or switch last.
    loop_exits: Vec<Node>,
    labels: IndexMap<String, LabelTarget>,
    /// The label of a loop which is about to be lowered.
    pending_label: Option<String>,
    statement: Option<&'ast ast::Statement>,
    base_depth: usize,
}

impl<'a, 'ast> FunctionBuilder<'a, 'ast> {
    pub(crate) fn new(
        context: &'a mut Context,
        scope: &'a mut Scope,
        hierarchy: &'a mut TypeHierarchy,
        handler: &'a Handler,
        config: &'a BuildConfig,
        declaration: Arc<FunctionDeclaration>,
    ) -> Result<Self, CompileError> {
        let base_depth = scope.depth();
        scope.enter_method(declaration.clone())?;
        let return_variable = if declaration.return_type.is_void() || declaration.is_constructor() {
            None
        } else {
            Some(scope.create_return_variable(declaration.return_type.clone(), &declaration.span))
        };
        let function = Function::new(context, declaration.clone(), return_variable)
            .map_err(|err| CompileError::InternalOwned(err.to_string(), declaration.span.clone()))?;
        let current = function.get_entry(context);
        Ok(FunctionBuilder {
            context,
            scope,
            hierarchy,
            handler,
            config,
            declaration,
            function,
            current,
            tasks: vec![],
            loop_starts: vec![],
            loop_exits: vec![],
            labels: IndexMap::new(),
            pending_label: None,
            statement: None,
            base_depth,
        })
    }

    /// Lower `body` into the function's CFA and prune the nodes it left unreachable.
    pub(crate) fn build(mut self, body: FunctionBody<'ast>) -> Result<Function, CompileError> {
        self.schedule(body_tasks(body));
        let result = self.run();
        while self.scope.depth() > self.base_depth + 1 {
            self.scope.leave_block();
        }
        self.scope.leave_method();
        result?;

        let exit = self.function.get_exit(self.context);
        self.connect_to(exit, "default return");
        let pruned = prune_unreachable(self.context, &self.function).map_err(|err| {
            CompileError::InternalOwned(err.to_string(), self.declaration.span.clone())
        })?;
        debug!(
            function = %self.declaration.qualified_name,
            nodes = self.function.num_nodes(self.context),
            pruned,
            "built function CFA"
        );
        Ok(self.function)
    }

    fn run(&mut self) -> Result<(), CompileError> {
        while let Some(task) = self.tasks.pop() {
            if let Err(err) = self.perform(task) {
                return Err(match self.statement {
                    Some(statement) => err.in_statement(statement.to_string()),
                    None => err,
                });
            }
        }
        Ok(())
    }

    /// Push tasks so that they run in the given order, before anything already scheduled.
    pub(super) fn schedule(&mut self, tasks: impl IntoIterator<Item = Task<'ast>>) {
        let tasks = tasks.into_iter().collect::<Vec<_>>();
        self.tasks.extend(tasks.into_iter().rev());
    }

    /// Schedule `tasks` surrounded by the side effects they depend on.
    pub(super) fn schedule_with_effects(
        &mut self,
        effects: SideEffects<'ast>,
        tasks: impl IntoIterator<Item = Task<'ast>>,
    ) {
        let SideEffects { pre, post } = effects;
        let tasks = pre
            .into_iter()
            .map(Task::Effect)
            .chain(tasks)
            .chain(post.into_iter().map(Task::Effect))
            .collect::<Vec<_>>();
        self.schedule(tasks);
    }

    fn perform(&mut self, task: Task<'ast>) -> Result<(), CompileError> {
        match task {
            Task::Statement(statement) => self.lower_statement(statement)?,
            Task::Block(block) => self.lower_block(block),
            Task::EnterBlock => self.scope.enter_block(),
            Task::LeaveBlock => self.scope.leave_block(),
            Task::Within(statement) => self.statement = Some(statement),
            Task::Resume(node) => self.current = node,
            Task::Jump {
                target,
                description,
            } => self.jump(target, description),
            Task::LeaveLoop => {
                self.loop_starts.pop();
                self.loop_exits.pop();
            }
            Task::LeaveSwitch => {
                self.loop_exits.pop();
            }
            Task::LeaveLabel(label) => {
                if let Some(target) = self.labels.shift_remove(&label) {
                    self.connect_to(target.exit, "");
                    self.current = target.exit;
                }
            }
            Task::Declare {
                declarator,
                is_final,
            } => self.declare(declarator, is_final)?,
            Task::DeclareLoopVariable { variable, value } => {
                let declaration = self.scope.declare_local(
                    &variable.name,
                    variable.ty.clone(),
                    variable.is_final,
                    &variable.span,
                )?;
                let tasks = declaration_edges(declaration, value, variable.span.clone());
                self.schedule(tasks);
            }
            Task::Evaluate(expression) => self.evaluate(expression)?,
            Task::Effect(effect) => self.perform_effect(effect),
            Task::Edge { kind, span } => self.emit(kind, span),
            Task::EdgeTo { kind, span, target } => self.emit_to(kind, span, target),
            Task::Condition {
                expression,
                on_true,
                on_false,
            } => self.lower_condition(expression, on_true, on_false)?,
            Task::Assume {
                expression,
                on_true,
                on_false,
                span,
            } => self.assume(expression, on_true, on_false, span),
            Task::ConditionalArm {
                target,
                arm,
                join,
                span,
            } => self.lower_conditional_arm(target, arm, join, span)?,
            Task::FieldInitializer { field, initializer } => {
                let Lowered { value, effects } = self.lowerer().lower_rhs(initializer)?;
                let target = match field.is_static() {
                    true => field_access(None, field),
                    false => {
                        let this = this_expression(field.declaring_type.clone());
                        field_access(Some(this), field)
                    }
                };
                let kind = EdgeKind::Statement(value.assign_to(target));
                let span = initializer.span.clone();
                self.schedule_with_effects(effects, [Task::Edge { kind, span }]);
            }
            Task::ImplicitSuper(function) => {
                let class = self.declaration.declaring_type.clone();
                let call = FunctionCall {
                    function,
                    receiver: Some(this_expression(class)),
                    arguments: vec![],
                    kind: CallKind::Special,
                    receiver_type: None,
                };
                let span = self.declaration.span.clone();
                self.emit(EdgeKind::Statement(Statement::Call(call)), span);
            }
            Task::Return { expression, span } => {
                let exit = self.function.get_exit(self.context);
                Edge::connect(
                    self.context,
                    self.current,
                    exit,
                    EdgeKind::Return { expression },
                    span,
                );
                self.current = self.new_node();
            }
        }
        Ok(())
    }

    fn lower_statement(&mut self, statement: &'ast ast::Statement) -> Result<(), CompileError> {
        self.statement = Some(statement);
        let label = self.pending_label.take();
        let span = statement.span.clone();
        if !self.is_reachable(self.current) && !matches!(statement.kind, S::Empty | S::Block(_)) {
            self.handler.emit_warn(CompileWarning {
                span: span.clone(),
                warning_content: Warning::UnreachableCode,
            });
        }
        trace!(statement = %statement, "lowering statement");

        match &statement.kind {
            S::Block(block) => self.lower_block(block),
            S::LocalVariable {
                is_final,
                declarators,
            } => self.schedule(declarators.iter().map(|declarator| Task::Declare {
                declarator,
                is_final: *is_final,
            })),
            S::Expression(expression) => self.evaluate(expression)?,
            S::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let then_node = self.new_node();
                let join = self.new_node();
                match else_branch {
                    Some(else_branch) => {
                        let else_node = self.new_node();
                        self.schedule([
                            Task::Condition {
                                expression: condition,
                                on_true: then_node,
                                on_false: else_node,
                            },
                            Task::Resume(then_node),
                            Task::Statement(then_branch),
                            Task::Jump {
                                target: join,
                                description: "",
                            },
                            Task::Resume(else_node),
                            Task::Statement(else_branch),
                            Task::Jump {
                                target: join,
                                description: "",
                            },
                            Task::Resume(join),
                        ]);
                    }
                    None => self.schedule([
                        Task::Condition {
                            expression: condition,
                            on_true: then_node,
                            on_false: join,
                        },
                        Task::Resume(then_node),
                        Task::Statement(then_branch),
                        Task::Jump {
                            target: join,
                            description: "",
                        },
                        Task::Resume(join),
                    ]),
                }
            }
            S::While { condition, body } => {
                let head = self.function.create_loop_head(self.context);
                self.connect_to(head, "while");
                self.current = head;
                let body_node = self.new_node();
                let post = self.new_node();
                self.enter_loop(label, head, post);
                self.schedule([
                    Task::Condition {
                        expression: condition,
                        on_true: body_node,
                        on_false: post,
                    },
                    Task::Resume(body_node),
                    Task::Statement(body),
                    Task::Jump {
                        target: head,
                        description: "",
                    },
                    Task::LeaveLoop,
                    Task::Resume(post),
                ]);
            }
            S::DoWhile { body, condition } => {
                let head = self.function.create_loop_head(self.context);
                self.connect_to(head, "do");
                self.current = head;
                let condition_node = self.new_node();
                let post = self.new_node();
                self.enter_loop(label, condition_node, post);
                self.schedule([
                    Task::Statement(body),
                    Task::Jump {
                        target: condition_node,
                        description: "",
                    },
                    Task::Resume(condition_node),
                    Task::Within(statement),
                    Task::Condition {
                        expression: condition,
                        on_true: head,
                        on_false: post,
                    },
                    Task::LeaveLoop,
                    Task::Resume(post),
                ]);
            }
            S::For {
                init,
                condition,
                update,
                body,
            } => {
                self.scope.enter_block();
                let head = self.function.create_loop_head(self.context);
                let body_node = self.new_node();
                let update_node = self.new_node();
                let post = self.new_node();
                self.enter_loop(label, update_node, post);

                let mut tasks = init.iter().map(Task::Statement).collect::<Vec<_>>();
                tasks.extend([
                    Task::Within(statement),
                    Task::Jump {
                        target: head,
                        description: "for",
                    },
                    Task::Resume(head),
                ]);
                tasks.push(match condition {
                    Some(condition) => Task::Condition {
                        expression: condition,
                        on_true: body_node,
                        on_false: post,
                    },
                    None => Task::Jump {
                        target: body_node,
                        description: "",
                    },
                });
                tasks.extend([
                    Task::Resume(body_node),
                    Task::Statement(body),
                    Task::Jump {
                        target: update_node,
                        description: "",
                    },
                    Task::Resume(update_node),
                    Task::Within(statement),
                ]);
                tasks.extend(update.iter().map(Task::Evaluate));
                tasks.extend([
                    Task::Jump {
                        target: head,
                        description: "",
                    },
                    Task::LeaveLoop,
                    Task::Resume(post),
                    Task::LeaveBlock,
                ]);
                self.schedule(tasks);
            }
            S::ForEach {
                variable,
                iterable,
                body,
            } => self.lower_for_each(label, variable, iterable, body)?,
            S::Switch { selector, cases } => self.lower_switch(selector, cases)?,
            S::Break { label: target } => {
                let target = match target {
                    Some(label) => match self.labels.get(label) {
                        Some(target) => target.exit,
                        None => {
                            return Err(CompileError::UnknownLabel {
                                label: label.clone(),
                                span,
                            })
                        }
                    },
                    None => match self.loop_exits.last() {
                        Some(exit) => *exit,
                        None => return Err(CompileError::BreakOutsideLoop { span }),
                    },
                };
                self.jump(target, "break");
            }
            S::Continue { label: target } => {
                let target = match target {
                    Some(label) => match self.labels.get(label) {
                        Some(LabelTarget {
                            continue_target: Some(target),
                            ..
                        }) => *target,
                        Some(_) => {
                            return Err(CompileError::ContinueToNonLoopLabel {
                                label: label.clone(),
                                span,
                            })
                        }
                        None => {
                            return Err(CompileError::UnknownLabel {
                                label: label.clone(),
                                span,
                            })
                        }
                    },
                    None => match self.loop_starts.last() {
                        Some(start) => *start,
                        None => return Err(CompileError::ContinueOutsideLoop { span }),
                    },
                };
                self.jump(target, "continue");
            }
            S::Return(None) => self.schedule([Task::Return {
                expression: None,
                span,
            }]),
            S::Return(Some(expression)) => {
                let Lowered { value, effects } = self.lowerer().lower_value(expression)?;
                let (mut tasks, value) = self.settle(value, effects, &span);
                tasks.push(Task::Return {
                    expression: Some(value),
                    span,
                });
                self.schedule(tasks);
            }
            S::Labeled { label, body } => {
                let exit = self
                    .function
                    .create_node(self.context, NodeKind::Label(label.clone()));
                self.labels.insert(
                    label.clone(),
                    LabelTarget {
                        exit,
                        continue_target: None,
                    },
                );
                if is_loop(body) {
                    self.pending_label = Some(label.clone());
                }
                self.schedule([Task::Statement(body), Task::LeaveLabel(label.clone())]);
            }
            S::Assert { condition, .. } => {
                if self.config.lower_asserts {
                    let success = self.new_node();
                    let failure = self
                        .function
                        .create_node(self.context, NodeKind::AssertionFailure);
                    self.schedule([
                        Task::Condition {
                            expression: condition,
                            on_true: success,
                            on_false: failure,
                        },
                        Task::Resume(success),
                    ]);
                }
            }
            S::Synchronized { lock, body } => {
                self.schedule([Task::Evaluate(lock), Task::Block(body)])
            }
            S::ConstructorInvocation {
                kind,
                arguments,
                constructor,
            } => {
                let Lowered { value, effects } = self.lowerer().lower_constructor_invocation(
                    *kind,
                    arguments,
                    constructor.as_ref(),
                    &span,
                )?;
                let kind = EdgeKind::Statement(Statement::Call(value));
                self.schedule_with_effects(effects, [Task::Edge { kind, span }]);
            }
            S::Throw(_) => {
                return Err(CompileError::UnsupportedSyntax {
                    construct: "throw statement",
                    span,
                })
            }
            S::Try(_) => {
                return Err(CompileError::UnsupportedSyntax {
                    construct: "try statement",
                    span,
                })
            }
            S::LocalTypeDeclaration(_) => {
                return Err(CompileError::UnsupportedSyntax {
                    construct: "local type declaration",
                    span,
                })
            }
            S::Empty => {}
        }
        Ok(())
    }

    fn lower_block(&mut self, block: &'ast ast::Block) {
        self.scope.enter_block();
        let tasks = block
            .statements
            .iter()
            .map(Task::Statement)
            .chain([Task::LeaveBlock])
            .collect::<Vec<_>>();
        self.schedule(tasks);
    }

    fn declare(
        &mut self,
        declarator: &'ast ast::VariableDeclarator,
        is_final: bool,
    ) -> Result<(), CompileError> {
        let span = declarator.span.clone();
        let Some(initializer) = &declarator.initializer else {
            let declaration = self.scope.declare_local(
                &declarator.name,
                declarator.ty.clone(),
                is_final,
                &span,
            )?;
            let kind = EdgeKind::Declaration {
                declaration: Declaration::Variable(declaration),
                initializer: None,
            };
            self.emit(kind, span);
            return Ok(());
        };
        let Lowered { value, effects } = self.lowerer().lower_rhs(initializer)?;
        let declaration =
            self.scope
                .declare_local(&declarator.name, declarator.ty.clone(), is_final, &span)?;
        let tasks = declaration_edges(declaration, value, span);
        self.schedule_with_effects(effects, tasks);
        Ok(())
    }

    fn evaluate(&mut self, expression: &'ast ast::Expression) -> Result<(), CompileError> {
        let Lowered { value, effects } = self.lowerer().lower_statement(expression)?;
        let span = expression.span.clone();
        let edge = value.map(|statement| Task::Edge {
            kind: EdgeKind::Statement(statement),
            span,
        });
        self.schedule_with_effects(effects, edge);
        Ok(())
    }

    fn lower_for_each(
        &mut self,
        label: Option<String>,
        variable: &'ast ast::Parameter,
        iterable: &'ast ast::Expression,
        body: &'ast ast::Statement,
    ) -> Result<(), CompileError> {
        let span = iterable.span.clone();
        let Lowered { value, effects } = self.lowerer().lower_value(iterable)?;
        self.scope.enter_block();
        let head = self.function.create_loop_head(self.context);
        let body_node = self.new_node();
        let update_node = self.new_node();
        let post = self.new_node();

        let SideEffects { pre, post: post_effects } = effects;
        let mut tasks = pre.into_iter().map(Task::Effect).collect::<Vec<_>>();
        if value.ty.is_array() {
            // for (T x : a) is lowered as for (int i = 0; i < a.length; i++) { T x = a[i]; .. }
            let array = self.scope.create_temporary(value.ty.clone(), &span);
            let index = self.scope.create_temporary(JType::int(), &span);
            let array_value = Expression::id(Declaration::Variable(array.clone()));
            let index_value = Expression::id(Declaration::Variable(index.clone()));
            let element_type = value.ty.element_type().cloned().unwrap_or(JType::Unspecified);
            tasks.push(declaration_edge(array, Some(value), span.clone()));
            tasks.extend(post_effects.into_iter().map(Task::Effect));
            tasks.push(declaration_edge(index, Some(Expression::int(0)), span.clone()));

            self.enter_loop(label, update_node, post);
            let element = Expression::new(
                ExpressionKind::ArraySubscript {
                    array: Box::new(array_value.clone()),
                    index: Box::new(index_value.clone()),
                },
                element_type,
            );
            let increment = Statement::Assignment {
                lhs: index_value.clone(),
                rhs: Expression::binary(
                    BinaryOperator::Add,
                    index_value.clone(),
                    Expression::int(1),
                    JType::int(),
                ),
            };
            tasks.extend([
                Task::Jump {
                    target: head,
                    description: "for",
                },
                Task::Resume(head),
                Task::Assume {
                    expression: Expression::binary(
                        BinaryOperator::Less,
                        index_value,
                        Expression::array_length(array_value),
                        JType::boolean(),
                    ),
                    on_true: body_node,
                    on_false: post,
                    span: span.clone(),
                },
                Task::Resume(body_node),
                Task::DeclareLoopVariable {
                    variable,
                    value: Rhs::Expression(element),
                },
                Task::Statement(body),
                Task::Jump {
                    target: update_node,
                    description: "",
                },
                Task::Resume(update_node),
                Task::Edge {
                    kind: EdgeKind::Statement(increment),
                    span: span.clone(),
                },
            ]);
        } else {
            let iterator_type = TypeName::new(ITERATOR_TYPE_NAME);
            let iterable_type = value
                .ty
                .type_name()
                .cloned()
                .unwrap_or_else(|| TypeName::new(ITERABLE_TYPE_NAME));
            let iterator = self
                .scope
                .create_temporary(JType::Interface(iterator_type.clone()), &span);
            let has_next = self.scope.create_temporary(JType::boolean(), &span);
            let iterator_value = Expression::id(Declaration::Variable(iterator.clone()));
            let has_next_value = Expression::id(Declaration::Variable(has_next.clone()));

            let iterator_call = self.library_call(
                iterable_type,
                "iterator",
                JType::Interface(iterator_type.clone()),
                value,
                &span,
            );
            let has_next_call = self.library_call(
                iterator_type.clone(),
                "hasNext",
                JType::boolean(),
                iterator_value.clone(),
                &span,
            );
            let next_call = self.library_call(
                iterator_type,
                "next",
                JType::object(),
                iterator_value,
                &span,
            );
            tasks.extend(declaration_edges(iterator, Rhs::Call(iterator_call), span.clone()));
            tasks.extend(post_effects.into_iter().map(Task::Effect));
            tasks.push(declaration_edge(has_next, None, span.clone()));

            // `continue` re-evaluates `hasNext()`, so the update node leads straight back.
            self.enter_loop(label, update_node, post);
            tasks.extend([
                Task::Jump {
                    target: head,
                    description: "for",
                },
                Task::Resume(head),
                Task::Edge {
                    kind: EdgeKind::Statement(Statement::CallAssignment {
                        lhs: has_next_value.clone(),
                        call: has_next_call,
                    }),
                    span: span.clone(),
                },
                Task::Assume {
                    expression: has_next_value,
                    on_true: body_node,
                    on_false: post,
                    span: span.clone(),
                },
                Task::Resume(body_node),
                Task::DeclareLoopVariable {
                    variable,
                    value: Rhs::Call(next_call),
                },
                Task::Statement(body),
                Task::Jump {
                    target: update_node,
                    description: "",
                },
                Task::Resume(update_node),
            ]);
        }
        tasks.extend([
            Task::Jump {
                target: head,
                description: "",
            },
            Task::LeaveLoop,
            Task::Resume(post),
            Task::LeaveBlock,
        ]);
        self.schedule(tasks);
        Ok(())
    }

    /// A virtual call to a parameterless library method, e.g. `Iterator.hasNext()`.
    fn library_call(
        &mut self,
        owner: TypeName,
        name: &str,
        return_type: JType,
        receiver: Expression,
        span: &Span,
    ) -> FunctionCall {
        let binding = ast::MethodBinding {
            declaring_type: owner.clone(),
            name: name.to_string(),
            parameter_types: vec![],
            return_type,
            is_static: false,
        };
        let function = match self.scope.lookup_method(&binding.qualified_name()) {
            Some(function) => function,
            None => {
                self.hierarchy.request_type(self.handler, &owner, span);
                self.scope
                    .register_external_method(external_function(&binding))
            }
        };
        FunctionCall {
            function,
            receiver: Some(receiver),
            arguments: vec![],
            kind: CallKind::Virtual,
            receiver_type: None,
        }
    }

    fn lower_switch(
        &mut self,
        selector: &'ast ast::Expression,
        cases: &'ast [ast::SwitchCase],
    ) -> Result<(), CompileError> {
        let span = selector.span.clone();
        let Lowered { value, effects } = self.lowerer().lower_value(selector)?;
        self.scope.enter_block();
        let selector_variable = self.scope.create_temporary(value.ty.clone(), &span);
        let selector_value = Expression::id(Declaration::Variable(selector_variable.clone()));
        let post = self.new_node();
        let mut bodies = Vec::with_capacity(cases.len());
        for _ in cases {
            bodies.push(self.new_node());
        }

        let SideEffects { pre, post: post_effects } = effects;
        let mut tasks = pre.into_iter().map(Task::Effect).collect::<Vec<_>>();
        tasks.push(declaration_edge(selector_variable, Some(value), span.clone()));
        tasks.extend(post_effects.into_iter().map(Task::Effect));

        // One equality test per label, in source order, then the default case.
        let mut default = None;
        for (case, body) in cases.iter().zip(&bodies) {
            if case.is_default {
                default = Some(*body);
            }
            for label in &case.labels {
                let Lowered { value, effects } = self.lowerer().lower_value(label)?;
                if !effects.is_empty() {
                    return Err(CompileError::UnsupportedSyntax {
                        construct: "switch label with side effects",
                        span: label.span.clone(),
                    });
                }
                let next = self.new_node();
                tasks.push(Task::Assume {
                    expression: Expression::binary(
                        BinaryOperator::Equal,
                        selector_value.clone(),
                        value,
                        JType::boolean(),
                    ),
                    on_true: *body,
                    on_false: next,
                    span: label.span.clone(),
                });
                tasks.push(Task::Resume(next));
            }
        }
        tasks.push(Task::Jump {
            target: default.unwrap_or(post),
            description: "default",
        });

        self.loop_exits.push(post);
        for (idx, (case, body)) in cases.iter().zip(&bodies).enumerate() {
            tasks.push(Task::Resume(*body));
            tasks.extend(case.body.iter().map(Task::Statement));
            tasks.push(match bodies.get(idx + 1) {
                Some(next) => Task::Jump {
                    target: *next,
                    description: "fall through",
                },
                None => Task::Jump {
                    target: post,
                    description: "",
                },
            });
        }
        tasks.extend([Task::LeaveSwitch, Task::Resume(post), Task::LeaveBlock]);
        self.schedule(tasks);
        Ok(())
    }

    fn perform_effect(&mut self, effect: SideEffect<'ast>) {
        match effect {
            SideEffect::Temporary {
                declaration,
                value,
                span,
            } => {
                let tasks = declaration_edges(declaration, value, span);
                self.schedule(tasks);
            }
            SideEffect::Statement { statement, span } => {
                self.emit(EdgeKind::Statement(statement), span)
            }
            SideEffect::Conditional(pending) => {
                let target = pending.target();
                let span = pending.span.clone();
                self.emit(
                    EdgeKind::Declaration {
                        declaration: Declaration::Variable(pending.temporary.clone()),
                        initializer: None,
                    },
                    span.clone(),
                );
                let then_node = self.new_node();
                let else_node = self.new_node();
                let join = self.new_node();
                self.schedule([
                    Task::Condition {
                        expression: pending.condition,
                        on_true: then_node,
                        on_false: else_node,
                    },
                    Task::Resume(then_node),
                    Task::ConditionalArm {
                        target: target.clone(),
                        arm: pending.then_arm,
                        join,
                        span: span.clone(),
                    },
                    Task::Resume(else_node),
                    Task::ConditionalArm {
                        target,
                        arm: pending.else_arm,
                        join,
                        span,
                    },
                    Task::Resume(join),
                ]);
            }
        }
    }

    fn lower_conditional_arm(
        &mut self,
        target: Expression,
        arm: ConditionalArm<'ast>,
        join: Node,
        span: Span,
    ) -> Result<(), CompileError> {
        match arm {
            ConditionalArm::Constant(value) => {
                let statement = Statement::Assignment {
                    lhs: target,
                    rhs: Expression::boolean(value),
                };
                self.schedule([Task::EdgeTo {
                    kind: EdgeKind::Statement(statement),
                    span,
                    target: join,
                }]);
            }
            ConditionalArm::Expression(expression) => {
                let Lowered { value, effects } = self.lowerer().lower_rhs(expression)?;
                let kind = EdgeKind::Statement(value.assign_to(target));
                let SideEffects { pre, post } = effects;
                let mut tasks = pre.into_iter().map(Task::Effect).collect::<Vec<_>>();
                // The assignment enters the join directly unless updates have to follow it.
                if post.is_empty() {
                    tasks.push(Task::EdgeTo {
                        kind,
                        span,
                        target: join,
                    });
                } else {
                    tasks.push(Task::Edge { kind, span });
                    tasks.extend(post.into_iter().map(Task::Effect));
                    tasks.push(Task::Jump {
                        target: join,
                        description: "",
                    });
                }
                self.schedule(tasks);
            }
        }
        Ok(())
    }

    /// The tasks which must run before `value` is consumed by an edge, and the value to consume.
    ///
    /// If post effects are pending the value is stored in a temporary first, so the effects cannot
    /// change it.
    pub(super) fn settle(
        &mut self,
        value: Expression,
        effects: SideEffects<'ast>,
        span: &Span,
    ) -> (Vec<Task<'ast>>, Expression) {
        let SideEffects { pre, post } = effects;
        let mut tasks = pre.into_iter().map(Task::Effect).collect::<Vec<_>>();
        if post.is_empty() {
            return (tasks, value);
        }
        let temporary = self.scope.create_temporary(value.ty.clone(), span);
        tasks.push(declaration_edge(temporary.clone(), Some(value), span.clone()));
        tasks.extend(post.into_iter().map(Task::Effect));
        (tasks, Expression::id(Declaration::Variable(temporary)))
    }

    pub(super) fn lowerer(&mut self) -> ExpressionLowerer<'_, 'ast> {
        ExpressionLowerer::new(
            self.scope,
            self.hierarchy,
            self.handler,
            self.config.compound_assignment_order,
        )
    }

    fn enter_loop(&mut self, label: Option<String>, continue_target: Node, exit: Node) {
        self.loop_starts.push(continue_target);
        self.loop_exits.push(exit);
        if let Some(target) = label.and_then(|label| self.labels.get_mut(&label)) {
            target.continue_target = Some(continue_target);
        }
    }

    /// Control can reach `node` if it is the entry node or has been connected to.
    pub(super) fn is_reachable(&self, node: Node) -> bool {
        node == self.function.get_entry(self.context) || node.num_entering_edges(self.context) > 0
    }

    pub(super) fn new_node(&mut self) -> Node {
        self.function.create_node(self.context, NodeKind::Plain)
    }

    /// Add an edge from the current node to a fresh node, which becomes current.
    pub(super) fn emit(&mut self, kind: EdgeKind, span: Span) {
        let next = self.new_node();
        Edge::connect(self.context, self.current, next, kind, span);
        self.current = next;
    }

    /// Add an edge from the current node into `target`. Code following it starts at an
    /// unreachable node.
    fn emit_to(&mut self, kind: EdgeKind, span: Span, target: Node) {
        Edge::connect(self.context, self.current, target, kind, span);
        self.current = self.new_node();
    }

    fn connect_to(&mut self, target: Node, description: &str) {
        if self.is_reachable(self.current) {
            let span = self.span();
            Edge::connect(
                self.context,
                self.current,
                target,
                EdgeKind::blank(description),
                span,
            );
        }
    }

    /// Transfer control to `target`. Code following the jump starts at an unreachable node.
    pub(super) fn jump(&mut self, target: Node, description: &str) {
        self.connect_to(target, description);
        self.current = self.new_node();
    }

    fn span(&self) -> Span {
        match self.statement {
            Some(statement) => statement.span.clone(),
            None => self.declaration.span.clone(),
        }
    }
}

fn body_tasks(body: FunctionBody<'_>) -> Vec<Task<'_>> {
    match body {
        FunctionBody::Method(block) => vec![Task::Block(block)],
        FunctionBody::ClassInitializer(items) => items.into_iter().map(initializer_task).collect(),
        FunctionBody::Constructor { body, prologue } => {
            let statements = body
                .map(|block| block.statements.as_slice())
                .unwrap_or_default();
            let (invocation, rest) = match statements.split_first() {
                Some((first, rest)) if matches!(first.kind, S::ConstructorInvocation { .. }) => {
                    (Some(first), rest)
                }
                _ => (None, statements),
            };
            let delegates = matches!(
                invocation.map(|statement| &statement.kind),
                Some(S::ConstructorInvocation {
                    kind: ast::ConstructorInvocationKind::This,
                    ..
                })
            );
            let mut tasks = vec![Task::EnterBlock];
            match invocation {
                Some(invocation) => tasks.push(Task::Statement(invocation)),
                None => tasks.extend(prologue.implicit_super.map(Task::ImplicitSuper)),
            }
            if !delegates {
                tasks.extend(prologue.items.into_iter().map(initializer_task));
            }
            tasks.extend(rest.iter().map(Task::Statement));
            tasks.push(Task::LeaveBlock);
            tasks
        }
    }
}

fn initializer_task(item: InitializerItem<'_>) -> Task<'_> {
    match item {
        InitializerItem::Field { field, initializer } => {
            Task::FieldInitializer { field, initializer }
        }
        InitializerItem::Block(block) => Task::Block(block),
    }
}

fn is_loop(statement: &ast::Statement) -> bool {
    matches!(
        statement.kind,
        S::While { .. } | S::DoWhile { .. } | S::For { .. } | S::ForEach { .. }
    )
}

fn this_expression(class: TypeName) -> Expression {
    Expression::new(ExpressionKind::This, JType::Class(class))
}

fn declaration_edge<'ast>(
    declaration: Arc<VariableDeclaration>,
    initializer: Option<Expression>,
    span: Span,
) -> Task<'ast> {
    Task::Edge {
        kind: EdgeKind::Declaration {
            declaration: Declaration::Variable(declaration),
            initializer,
        },
        span,
    }
}

/// Declare `declaration` and initialize it with `value`. A call result needs a separate edge.
fn declaration_edges<'ast>(
    declaration: Arc<VariableDeclaration>,
    value: Rhs,
    span: Span,
) -> Vec<Task<'ast>> {
    match value {
        Rhs::Expression(value) => vec![declaration_edge(declaration, Some(value), span)],
        Rhs::Call(call) => {
            let lhs = Expression::id(Declaration::Variable(declaration.clone()));
            vec![
                declaration_edge(declaration, None, span.clone()),
                Task::Edge {
                    kind: EdgeKind::Statement(Statement::CallAssignment { lhs, call }),
                    span,
                },
            ]
        }
    }
}
