//! ## Prune unreachable nodes
//!
//! Lowering leaves dead fragments behind, e.g. the code after a `return` or the join node of an
//! `if` whose branches both return. Every node that cannot be reached from the entry is removed
//! together with its edges. The exit node is kept even when it is unreachable.

use crate::{context::Context, error::IrError, function::Function};

/// Returns the number of removed nodes.
pub fn prune_unreachable(context: &mut Context, function: &Function) -> Result<usize, IrError> {
    let reachable = function.reachable_nodes(context);
    let exit = function.get_exit(context);
    let dead_nodes = function
        .nodes(context)
        .into_iter()
        .filter(|node| *node != exit && !reachable.contains(node))
        .collect::<Vec<_>>();
    for node in &dead_nodes {
        function.remove_node(context, *node)?;
    }
    Ok(dead_nodes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        declaration::{FunctionDeclaration, FunctionKind},
        edge::{Edge, EdgeKind},
        node::NodeKind,
    };
    use jcfa_types::{JType, Modifiers, Span, TypeName};
    use std::sync::Arc;

    #[test]
    fn prune_removes_dead_fragments_and_is_idempotent() {
        let mut context = Context::default();
        let decl = Arc::new(FunctionDeclaration {
            qualified_name: "Main.f()".to_string(),
            name: "f".to_string(),
            declaring_type: TypeName::new("Main"),
            parameters: vec![],
            return_type: JType::Void,
            modifiers: Modifiers::default(),
            kind: FunctionKind::Method,
            has_body: true,
            span: Span::dummy(),
        });
        let func = Function::new(&mut context, decl, None).unwrap();
        let entry = func.get_entry(&context);
        let exit = func.get_exit(&context);
        let live = func.create_node(&mut context, NodeKind::Plain);
        let dead_a = func.create_node(&mut context, NodeKind::Plain);
        let dead_b = func.create_node(&mut context, NodeKind::Plain);
        Edge::connect(&mut context, entry, live, EdgeKind::blank(""), Span::dummy());
        let ret = EdgeKind::Return { expression: None };
        Edge::connect(&mut context, live, exit, ret, Span::dummy());
        Edge::connect(&mut context, dead_a, dead_b, EdgeKind::blank(""), Span::dummy());
        Edge::connect(&mut context, dead_b, exit, EdgeKind::blank(""), Span::dummy());

        assert_eq!(prune_unreachable(&mut context, &func).unwrap(), 2);
        assert_eq!(func.num_nodes(&context), 3);
        assert_eq!(exit.num_entering_edges(&context), 1);

        let before = func.nodes(&context);
        assert_eq!(prune_unreachable(&mut context, &func).unwrap(), 0);
        assert_eq!(func.nodes(&context), before);
    }
}
