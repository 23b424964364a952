//! A function's control-flow automaton: the set of nodes it owns plus its entry and exit nodes.

use indexmap::IndexSet;
use slotmap::DefaultKey;
use std::sync::Arc;

use crate::{
    context::Context,
    declaration::{FunctionDeclaration, VariableDeclaration},
    edge::Edge,
    error::IrError,
    node::{Node, NodeKind},
};

/// A wrapper around a [slotmap](https://github.com/orlp/slotmap) handle into the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Function(pub DefaultKey);

#[doc(hidden)]
pub struct FunctionContent {
    pub name: String,
    pub declaration: Arc<FunctionDeclaration>,
    pub entry: Node,
    pub exit: Node,
    /// Every node of the function, in creation order.
    pub(crate) nodes: IndexSet<Node>,
    /// Holds the returned value of non-void functions.
    pub return_variable: Option<Arc<VariableDeclaration>>,
}

impl Function {
    /// Create a new function with fresh entry and exit nodes.
    ///
    /// The function is keyed by the qualified name of its declaration, which must not be taken.
    pub fn new(
        context: &mut Context,
        declaration: Arc<FunctionDeclaration>,
        return_variable: Option<Arc<VariableDeclaration>>,
    ) -> Result<Function, IrError> {
        let name = declaration.qualified_name.clone();
        if context.function_map.contains_key(&name) {
            return Err(IrError::DuplicateFunction(name));
        }
        let entry = Node::new(context, &name, NodeKind::FunctionEntry);
        let exit = Node::new(context, &name, NodeKind::FunctionExit);
        let content = FunctionContent {
            name: name.clone(),
            declaration,
            entry,
            exit,
            nodes: IndexSet::from([entry, exit]),
            return_variable,
        };
        let func = Function(context.functions.insert(content));
        context.function_map.insert(name, func);
        Ok(func)
    }

    /// Create a new node owned by this function.
    pub fn create_node(&self, context: &mut Context, kind: NodeKind) -> Node {
        let name = context.functions[self.0].name.clone();
        let node = Node::new(context, &name, kind);
        context.functions[self.0].nodes.insert(node);
        node
    }

    pub fn create_loop_head(&self, context: &mut Context) -> Node {
        let node = self.create_node(context, NodeKind::Plain);
        node.set_loop_start(context);
        node
    }

    pub fn get_name<'a>(&self, context: &'a Context) -> &'a str {
        &context.functions[self.0].name
    }

    pub fn get_declaration<'a>(&self, context: &'a Context) -> &'a Arc<FunctionDeclaration> {
        &context.functions[self.0].declaration
    }

    pub fn get_entry(&self, context: &Context) -> Node {
        context.functions[self.0].entry
    }

    pub fn get_exit(&self, context: &Context) -> Node {
        context.functions[self.0].exit
    }

    pub fn get_return_variable<'a>(
        &self,
        context: &'a Context,
    ) -> Option<&'a Arc<VariableDeclaration>> {
        context.functions[self.0].return_variable.as_ref()
    }

    /// Every node of the function, in creation order.
    pub fn nodes(&self, context: &Context) -> Vec<Node> {
        context.functions[self.0].nodes.iter().copied().collect()
    }

    pub fn num_nodes(&self, context: &Context) -> usize {
        context.functions[self.0].nodes.len()
    }

    pub fn contains_node(&self, context: &Context, node: &Node) -> bool {
        context.functions[self.0].nodes.contains(node)
    }

    /// Every edge leaving a node of the function, grouped by node in creation order.
    pub fn edges(&self, context: &Context) -> Vec<Edge> {
        context.functions[self.0]
            .nodes
            .iter()
            .flat_map(|node| node.leaving_edges(context).iter().copied())
            .collect()
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&self, context: &mut Context, node: Node) -> Result<(), IrError> {
        let content = &context.functions[self.0];
        if node == content.entry || node == content.exit {
            return Err(IrError::RemoveEntryOrExit(
                content.name.clone(),
                node.name(context),
            ));
        }
        if !content.nodes.contains(&node) {
            return Err(IrError::NodeNotFound(node.name(context)));
        }
        let edges = node
            .leaving_edges(context)
            .iter()
            .chain(node.entering_edges(context))
            .copied()
            .collect::<Vec<_>>();
        for edge in edges {
            // A self loop is listed twice.
            if edge.exists(context) {
                edge.remove(context)?;
            }
        }
        context.nodes.remove(node.0);
        context.functions[self.0].nodes.shift_remove(&node);
        Ok(())
    }

    /// Remove the function with all of its nodes and edges from the context.
    pub fn remove(self, context: &mut Context) -> Result<(), IrError> {
        let content = context
            .functions
            .remove(self.0)
            .ok_or_else(|| IrError::FunctionNotFound(format!("{:?}", self.0)))?;
        for node in &content.nodes {
            if let Some(node_content) = context.nodes.remove(node.0) {
                for edge in node_content.leaving {
                    context.edges.remove(edge.0);
                }
            }
        }
        context.function_map.shift_remove(&content.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeKind;
    use jcfa_types::{JType, Modifiers, Span, TypeName};

    pub(crate) fn declaration(name: &str) -> Arc<FunctionDeclaration> {
        Arc::new(FunctionDeclaration {
            qualified_name: format!("Main.{name}()"),
            name: name.to_string(),
            declaring_type: TypeName::new("Main"),
            parameters: vec![],
            return_type: JType::Void,
            modifiers: Modifiers::public().with_static(),
            kind: crate::FunctionKind::Method,
            has_body: true,
            span: Span::dummy(),
        })
    }

    #[test]
    fn duplicate_functions_are_rejected() {
        let mut context = Context::default();
        Function::new(&mut context, declaration("main"), None).unwrap();
        assert!(matches!(
            Function::new(&mut context, declaration("main"), None),
            Err(IrError::DuplicateFunction(_))
        ));
    }

    #[test]
    fn removing_a_node_removes_its_edges() {
        let mut context = Context::default();
        let func = Function::new(&mut context, declaration("main"), None).unwrap();
        let entry = func.get_entry(&context);
        let middle = func.create_node(&mut context, NodeKind::Plain);
        Edge::connect(&mut context, entry, middle, EdgeKind::blank(""), Span::dummy());
        Edge::connect(&mut context, middle, middle, EdgeKind::blank(""), Span::dummy());
        assert_eq!(context.num_edges(), 2);

        func.remove_node(&mut context, middle).unwrap();
        assert_eq!(context.num_edges(), 0);
        assert_eq!(entry.num_leaving_edges(&context), 0);
        assert_eq!(func.num_nodes(&context), 2);
        assert!(func.remove_node(&mut context, entry).is_err());

        func.remove(&mut context).unwrap();
        assert_eq!(context.num_nodes(), 0);
        assert_eq!(context.num_functions(), 0);
    }
}
