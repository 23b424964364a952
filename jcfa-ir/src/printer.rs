//! Print (or serialize) the CFA into a human readable string.
//!
//! Nodes are numbered per function in breadth-first order from the entry, followed by any nodes
//! which are not reachable, so the output does not depend on the order nodes were allocated in.

use indexmap::IndexMap;
use itertools::Itertools;

use crate::{context::Context, function::Function, node::Node, node::NodeKind};

pub fn to_string(context: &Context) -> String {
    context
        .functions()
        .map(|function| function_to_string(context, &function))
        .join("\n")
}

pub fn function_to_string(context: &Context, function: &Function) -> String {
    let numbering = number_nodes(context, function);
    let mut out = format!("function {} {{\n", function.get_name(context));
    for (node, number) in &numbering {
        out.push_str(&format!("    N{number}{}:\n", node_annotation(context, node)));
        for edge in node.leaving_edges(context) {
            let succ = edge.get_successor(context);
            let succ_number = numbering
                .get(&succ)
                .map(|num| num.to_string())
                .unwrap_or_else(|| "?".to_string());
            let text = edge.get_kind(context).to_string();
            if text.is_empty() {
                out.push_str(&format!("        -> N{succ_number}\n"));
            } else {
                out.push_str(&format!("        -> N{succ_number}: {text}\n"));
            }
        }
    }
    out.push_str("}\n");
    out
}

fn number_nodes(context: &Context, function: &Function) -> IndexMap<Node, usize> {
    function
        .reachable_nodes(context)
        .into_iter()
        .chain(function.nodes(context))
        .unique()
        .enumerate()
        .map(|(idx, node)| (node, idx + 1))
        .collect()
}

fn node_annotation(context: &Context, node: &Node) -> String {
    let mut notes = Vec::new();
    match node.get_kind(context) {
        NodeKind::FunctionEntry => notes.push("entry".to_string()),
        NodeKind::FunctionExit => notes.push("exit".to_string()),
        NodeKind::AssertionFailure => notes.push("assertion failure".to_string()),
        NodeKind::Label(label) => notes.push(format!("label {label}")),
        NodeKind::Plain => {}
    }
    if node.is_loop_start(context) {
        notes.push("loop".to_string());
    }
    if notes.is_empty() {
        String::new()
    } else {
        format!(" ({})", notes.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        declaration::{FunctionDeclaration, FunctionKind},
        edge::{Edge, EdgeKind},
        expression::Expression,
    };
    use jcfa_types::{JType, Modifiers, Span, TypeName};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn prints_in_breadth_first_order() {
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
        let head = func.create_loop_head(&mut context);
        Edge::connect(&mut context, entry, head, EdgeKind::blank("while"), Span::dummy());
        Edge::connect(
            &mut context,
            head,
            head,
            EdgeKind::Assume {
                expression: Expression::boolean(true),
                truth: true,
            },
            Span::dummy(),
        );
        Edge::connect(
            &mut context,
            head,
            exit,
            EdgeKind::Assume {
                expression: Expression::boolean(true),
                truth: false,
            },
            Span::dummy(),
        );
        let expected = "function Main.f() {
    N1 (entry):
        -> N2: while
    N2 (loop):
        -> N2: [true]
        -> N3: [!(true)]
    N3 (exit):
}
";
        assert_eq!(function_to_string(&context, &func), expected);
    }
}
