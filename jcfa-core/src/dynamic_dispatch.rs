//! Lowering of virtual calls into explicit tests on the receiver's run-time type.
//!
//! A call `r.m()` whose target may be overridden is replaced by a chain of branches, one per
//! concrete receiver type that runs a different implementation:
//!
//! ```text
//!   [type(r) == B] r.m() as B  ──┐
//!   [type(r) != B]               │
//!     [type(r) == C] r.m() as C ─┤
//!     [type(r) != C]             │
//!       r.m()  ──────────────────┴─> join ──> original successor
//! ```
//!
//! Branches are per concrete class, not per override: a class inheriting an override still gets
//! its own test. With N such classes a call site turns into 2N assumptions and N + 1 calls.

use jcfa_ir::{
    CallKind, Context, Edge, EdgeContent, EdgeKind, Expression, Function, FunctionCall,
    FunctionDeclaration, IrError, Node, NodeKind, Statement,
};
use jcfa_types::TypeName;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::type_hierarchy::TypeHierarchy;

/// Rewrite every dispatching call of the program. Returns the number of rewritten call sites.
pub fn lower_dynamic_dispatch(
    context: &mut Context,
    hierarchy: &TypeHierarchy,
) -> Result<usize, IrError> {
    let functions = context.functions().collect::<Vec<_>>();
    let mut rewritten = 0;
    for function in functions {
        rewritten += lower_function(context, hierarchy, &function)?;
    }
    debug!(call_sites = rewritten, "lowered dynamic dispatch");
    Ok(rewritten)
}

fn lower_function(
    context: &mut Context,
    hierarchy: &TypeHierarchy,
    function: &Function,
) -> Result<usize, IrError> {
    let entry = function.get_entry(context);
    let mut visited = FxHashSet::default();
    visited.insert(entry);
    let mut worklist = vec![entry];
    let mut rewritten = 0;

    while let Some(node) = worklist.pop() {
        let leaving = node.leaving_edges(context).to_vec();
        for edge in leaving {
            let successor = edge.get_successor(context);
            if let Some(dispatch) = Dispatch::of(context, hierarchy, &edge) {
                let created = dispatch.rewrite(context, function, edge)?;
                visited.extend(created);
                rewritten += 1;
            }
            if visited.insert(successor) {
                worklist.push(successor);
            }
        }
    }
    Ok(rewritten)
}

/// A call site whose target may be overridden.
struct Dispatch {
    statement: Statement,
    call: FunctionCall,
    receiver: Expression,
    /// Each concrete receiver type running an implementation other than the static target.
    candidates: Vec<(TypeName, Arc<FunctionDeclaration>)>,
}

impl Dispatch {
    fn of(context: &Context, hierarchy: &TypeHierarchy, edge: &Edge) -> Option<Dispatch> {
        let statement = edge.get_call_statement(context)?;
        let call = statement.call()?;
        let target = &call.function;
        if call.kind != CallKind::Virtual
            || call.receiver_type.is_some()
            || target.is_static()
            || target.is_constructor()
            || target.modifiers.is_final
            || target.modifiers.is_private()
            || hierarchy.is_final(&target.declaring_type)
        {
            return None;
        }
        let receiver = call.receiver.as_ref()?;
        let static_type = receiver.ty.type_name().unwrap_or(&target.declaring_type);
        let candidates = hierarchy
            .concrete_subclasses(static_type)
            .into_iter()
            .filter_map(|class| {
                let implementation = hierarchy.find_implementation(&class, target.signature())?;
                (implementation.qualified_name != target.qualified_name)
                    .then_some((class, implementation))
            })
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            return None;
        }
        Some(Dispatch {
            statement: statement.clone(),
            call: call.clone(),
            receiver: receiver.clone(),
            candidates,
        })
    }

    /// Replace `edge` by the dispatch chain. Returns the nodes created.
    fn rewrite(
        self,
        context: &mut Context,
        function: &Function,
        edge: Edge,
    ) -> Result<Vec<Node>, IrError> {
        let EdgeContent {
            predecessor,
            successor,
            span,
            ..
        } = edge.remove(context)?;
        trace!(call = %self.call, candidates = self.candidates.len(), "lowering virtual call");

        let join = function.create_node(context, NodeKind::Plain);
        let mut created = vec![join];
        let mut current = predecessor;
        for (class, implementation) in self.candidates {
            let test = Expression::runtime_type_equals(self.receiver.clone(), class.clone());
            let on_true = function.create_node(context, NodeKind::Plain);
            let on_false = function.create_node(context, NodeKind::Plain);
            Edge::connect(
                context,
                current,
                on_true,
                EdgeKind::Assume {
                    expression: test.clone(),
                    truth: true,
                },
                span.clone(),
            );
            Edge::connect(
                context,
                current,
                on_false,
                EdgeKind::Assume {
                    expression: test,
                    truth: false,
                },
                span.clone(),
            );
            let narrowed = self
                .statement
                .with_call(self.call.narrowed(implementation, class))
                .unwrap_or_else(|| self.statement.clone());
            Edge::connect(
                context,
                on_true,
                join,
                EdgeKind::Statement(narrowed),
                span.clone(),
            );
            created.extend([on_true, on_false]);
            current = on_false;
        }
        Edge::connect(
            context,
            current,
            join,
            EdgeKind::Statement(self.statement),
            span.clone(),
        );
        Edge::connect(context, join, successor, EdgeKind::blank(""), span);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jcfa_ast::{TypeDeclaration, TypeKind};
    use jcfa_error::handler::Handler;
    use jcfa_ir::{Declaration, FunctionKind, VariableDeclaration};
    use jcfa_types::{JType, Modifiers, Span};

    fn class(name: &str, super_class: Option<&str>) -> TypeDeclaration {
        TypeDeclaration {
            name: TypeName::new(name),
            kind: TypeKind::Class,
            modifiers: Modifiers::public(),
            super_class: super_class.map(TypeName::new),
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            initializers: vec![],
            member_types: vec![],
            span: Span::dummy(),
        }
    }

    fn method(owner: &str, name: &str, kind: FunctionKind) -> Arc<FunctionDeclaration> {
        Arc::new(FunctionDeclaration {
            qualified_name: format!("{owner}.{name}()"),
            name: name.to_string(),
            declaring_type: TypeName::new(owner),
            parameters: vec![],
            return_type: JType::Void,
            modifiers: match kind {
                FunctionKind::Method => Modifiers::public(),
                _ => Modifiers::public().with_static(),
            },
            kind,
            has_body: true,
            span: Span::dummy(),
        })
    }

    /// `A <- B <- C`, each declaring `m()`, and a caller `Main.run()` doing `a.m()` on an `A`.
    fn setup() -> (Context, TypeHierarchy, Function) {
        let handler = Handler::default();
        let mut hierarchy = TypeHierarchy::new();
        for decl in [class("A", None), class("B", Some("A")), class("C", Some("B"))] {
            hierarchy.register_type(&handler, &decl).unwrap();
        }
        for owner in ["A", "B", "C"] {
            hierarchy.register_method(
                &TypeName::new(owner),
                method(owner, "m", FunctionKind::Method),
            );
        }

        let mut context = Context::default();
        let caller = Function::new(
            &mut context,
            method("Main", "run", FunctionKind::ClassInitializer),
            None,
        )
        .unwrap();
        let receiver = Arc::new(VariableDeclaration {
            qualified_name: "Main.run()::a".to_string(),
            name: "a".to_string(),
            original_name: "a".to_string(),
            ty: JType::Class(TypeName::new("A")),
            modifiers: Modifiers::default(),
            span: Span::dummy(),
        });
        let call = FunctionCall {
            function: method("A", "m", FunctionKind::Method),
            receiver: Some(Expression::id(Declaration::Variable(receiver))),
            arguments: vec![],
            kind: CallKind::Virtual,
            receiver_type: None,
        };
        let entry = caller.get_entry(&context);
        let exit = caller.get_exit(&context);
        let middle = caller.create_node(&mut context, NodeKind::Plain);
        Edge::connect(
            &mut context,
            entry,
            middle,
            EdgeKind::Statement(Statement::Call(call)),
            Span::dummy(),
        );
        Edge::connect(&mut context, middle, exit, EdgeKind::blank(""), Span::dummy());
        (context, hierarchy, caller)
    }

    #[test]
    fn overrides_become_a_chain_of_type_tests() {
        let (mut context, hierarchy, caller) = setup();
        let exit = caller.get_exit(&context);
        let successor = exit.predecessors(&context)[0];
        let entering_before = successor.num_entering_edges(&context);

        assert_eq!(lower_dynamic_dispatch(&mut context, &hierarchy).unwrap(), 1);

        let edges = caller.edges(&context);
        let calls = edges
            .iter()
            .filter(|edge| edge.get_call_statement(&context).is_some())
            .count();
        let assumes = edges.iter().filter(|edge| edge.is_assume(&context)).count();
        assert_eq!(calls, 3);
        assert_eq!(assumes, 4);
        assert_eq!(successor.num_entering_edges(&context), entering_before);
        context.verify().unwrap();

        // Running the pass again finds nothing left to rewrite.
        assert_eq!(lower_dynamic_dispatch(&mut context, &hierarchy).unwrap(), 0);
    }

    #[test]
    fn final_types_are_not_dispatched() {
        let (mut context, mut hierarchy, _) = setup();
        let handler = Handler::default();
        let mut decl = class("D", None);
        decl.modifiers = decl.modifiers.with_final();
        hierarchy.register_type(&handler, &decl).unwrap();
        hierarchy.register_method(&TypeName::new("D"), method("D", "m", FunctionKind::Method));
        let callee = method("D", "m", FunctionKind::Method);
        let caller = Function::new(
            &mut context,
            method("Main", "other", FunctionKind::ClassInitializer),
            None,
        )
        .unwrap();
        let receiver = Expression::new(
            jcfa_ir::ExpressionKind::NullLiteral,
            JType::Class(TypeName::new("D")),
        );
        let entry = caller.get_entry(&context);
        let exit = caller.get_exit(&context);
        Edge::connect(
            &mut context,
            entry,
            exit,
            EdgeKind::Statement(Statement::Call(FunctionCall {
                function: callee,
                receiver: Some(receiver),
                arguments: vec![],
                kind: CallKind::Virtual,
                receiver_type: None,
            })),
            Span::dummy(),
        );
        // Only the call in `Main.run()` is rewritten.
        assert_eq!(lower_dynamic_dispatch(&mut context, &hierarchy).unwrap(), 1);
        assert_eq!(caller.edges(&context).len(), 1);
    }
}
