//! Restriction of a program to the functions it can actually run.

use indexmap::IndexSet;
use jcfa_ir::{Context, Function, FunctionKind, IrError};
use tracing::debug;

/// Remove every function which is neither called transitively from `entry` nor a class
/// initializer. Returns the number of removed functions.
pub fn restrict_to_reachable(context: &mut Context, entry: Function) -> Result<usize, IrError> {
    let reachable = reachable_functions(context, entry);
    let unreachable = context
        .functions()
        .filter(|function| !reachable.contains(function))
        .collect::<Vec<_>>();
    let removed = unreachable.len();
    for function in unreachable {
        function.remove(context)?;
    }
    debug!(kept = reachable.len(), removed, "restricted program to reachable functions");
    Ok(removed)
}

/// The entry function, the class initializers and all functions they call, in discovery order.
pub fn reachable_functions(context: &Context, entry: Function) -> IndexSet<Function> {
    let mut reachable = IndexSet::new();
    let mut worklist = vec![entry];
    worklist.extend(context.functions().filter(|function| {
        function.get_declaration(context).kind == FunctionKind::ClassInitializer
    }));
    while let Some(function) = worklist.pop() {
        if !reachable.insert(function) {
            continue;
        }
        for edge in function.edges(context) {
            let Some(call) = edge
                .get_call_statement(context)
                .and_then(|statement| statement.call())
            else {
                continue;
            };
            // Calls into code without a CFA, e.g. library methods, have no function.
            if let Some(callee) = context.get_function(&call.function.qualified_name) {
                if !reachable.contains(&callee) {
                    worklist.push(callee);
                }
            }
        }
    }
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use jcfa_ir::{
        CallKind, Edge, EdgeKind, FunctionCall, FunctionDeclaration, NodeKind, Statement,
    };
    use jcfa_types::{JType, Modifiers, Span, TypeName};
    use std::sync::Arc;

    fn function(context: &mut Context, name: &str, kind: FunctionKind) -> Function {
        let declaration = Arc::new(FunctionDeclaration {
            qualified_name: format!("Main.{name}()"),
            name: name.to_string(),
            declaring_type: TypeName::new("Main"),
            parameters: vec![],
            return_type: JType::Void,
            modifiers: Modifiers::public().with_static(),
            kind,
            has_body: true,
            span: Span::dummy(),
        });
        let function = Function::new(context, declaration, None).unwrap();
        let entry = function.get_entry(context);
        let exit = function.get_exit(context);
        Edge::connect(context, entry, exit, EdgeKind::blank(""), Span::dummy());
        function
    }

    fn call(context: &mut Context, caller: Function, callee: Function) {
        let entry = caller.get_entry(context);
        let next = caller.create_node(context, NodeKind::Plain);
        let declaration = callee.get_declaration(context).clone();
        let edge = entry.leaving_edges(context)[0];
        let old = edge.remove(context).unwrap();
        Edge::connect(
            context,
            entry,
            next,
            EdgeKind::Statement(Statement::Call(FunctionCall {
                function: declaration,
                receiver: None,
                arguments: vec![],
                kind: CallKind::Static,
                receiver_type: None,
            })),
            Span::dummy(),
        );
        Edge::connect(context, next, old.successor, old.kind, old.span);
    }

    #[test]
    fn keeps_callees_and_class_initializers() {
        let mut context = Context::default();
        let main = function(&mut context, "main", FunctionKind::Method);
        let helper = function(&mut context, "helper", FunctionKind::Method);
        let nested = function(&mut context, "nested", FunctionKind::Method);
        function(&mut context, "unused", FunctionKind::Method);
        let clinit = function(&mut context, "<clinit>", FunctionKind::ClassInitializer);
        call(&mut context, main, helper);
        call(&mut context, helper, nested);
        call(&mut context, helper, main);

        assert_eq!(restrict_to_reachable(&mut context, main).unwrap(), 1);
        let names = context
            .functions()
            .map(|function| function.get_name(&context).to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "Main.main()".to_string(),
                "Main.helper()".to_string(),
                "Main.nested()".to_string(),
                "Main.<clinit>()".to_string(),
            ]
        );
        assert!(context.get_function("Main.unused()").is_none());
        assert_eq!(context.get_function("Main.<clinit>()"), Some(clinit));
        context.verify().unwrap();
    }
}
