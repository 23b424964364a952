//! A location in a function's control-flow automaton.
//!
//! Nodes carry no operations themselves. A node has at most one leaving edge unless it is a
//! branch node, which has exactly two leaving assume edges with complementary truth values.

use slotmap::DefaultKey;

use crate::{context::Context, edge::Edge, error::IrError};

/// A wrapper around a [slotmap](https://github.com/orlp/slotmap) handle into the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Node(pub DefaultKey);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Plain,
    FunctionEntry,
    FunctionExit,
    /// Reached when an `assert` fails; it has no leaving edges.
    AssertionFailure,
    /// The target of a labeled statement.
    Label(String),
}

#[doc(hidden)]
pub struct NodeContent {
    /// Program-wide unique number, stable for the life of the node.
    pub id: u64,
    /// The qualified name of the owning function.
    pub function_name: String,
    pub kind: NodeKind,
    pub is_loop_start: bool,
    pub(crate) leaving: Vec<Edge>,
    pub(crate) entering: Vec<Edge>,
}

impl Node {
    /// Create a node which is not yet registered with any function.
    ///
    /// Use [`Function::create_node`](crate::Function::create_node) instead.
    pub(crate) fn new(context: &mut Context, function_name: &str, kind: NodeKind) -> Node {
        let id = context.next_node_id();
        let content = NodeContent {
            id,
            function_name: function_name.to_string(),
            kind,
            is_loop_start: false,
            leaving: Vec::new(),
            entering: Vec::new(),
        };
        Node(context.nodes.insert(content))
    }

    pub fn exists(&self, context: &Context) -> bool {
        context.nodes.contains_key(self.0)
    }

    pub fn get_id(&self, context: &Context) -> u64 {
        context.nodes[self.0].id
    }

    pub fn get_kind<'a>(&self, context: &'a Context) -> &'a NodeKind {
        &context.nodes[self.0].kind
    }

    pub fn get_function_name<'a>(&self, context: &'a Context) -> &'a str {
        &context.nodes[self.0].function_name
    }

    pub fn is_loop_start(&self, context: &Context) -> bool {
        context.nodes[self.0].is_loop_start
    }

    pub fn set_loop_start(&self, context: &mut Context) {
        context.nodes[self.0].is_loop_start = true;
    }

    /// The leaving edges in insertion order.
    pub fn leaving_edges<'a>(&self, context: &'a Context) -> &'a [Edge] {
        &context.nodes[self.0].leaving
    }

    pub fn entering_edges<'a>(&self, context: &'a Context) -> &'a [Edge] {
        &context.nodes[self.0].entering
    }

    pub fn num_leaving_edges(&self, context: &Context) -> usize {
        context.nodes[self.0].leaving.len()
    }

    pub fn num_entering_edges(&self, context: &Context) -> usize {
        context.nodes[self.0].entering.len()
    }

    pub fn successors(&self, context: &Context) -> Vec<Node> {
        self.leaving_edges(context)
            .iter()
            .map(|edge| edge.get_successor(context))
            .collect()
    }

    pub fn predecessors(&self, context: &Context) -> Vec<Node> {
        self.entering_edges(context)
            .iter()
            .map(|edge| edge.get_predecessor(context))
            .collect()
    }

    /// Whether any leaving edge is an assume edge, i.e. this node branches.
    pub fn is_branch(&self, context: &Context) -> bool {
        self.leaving_edges(context)
            .iter()
            .any(|edge| edge.is_assume(context))
    }

    pub(crate) fn name(&self, context: &Context) -> String {
        match context.nodes.get(self.0) {
            Some(content) => IrError::node_name(content.id),
            None => "<removed>".to_string(),
        }
    }
}
