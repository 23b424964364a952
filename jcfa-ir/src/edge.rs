//! The operations of a control-flow automaton.
//!
//! Every edge connects exactly one predecessor with exactly one successor and is registered in
//! the leaving list of the former and the entering list of the latter.

use jcfa_types::Span;
use slotmap::DefaultKey;
use std::fmt;

use crate::{
    context::Context, declaration::Declaration, error::IrError, expression::Expression,
    node::Node, statement::Statement,
};

/// A wrapper around a [slotmap](https://github.com/orlp/slotmap) handle into the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Edge(pub DefaultKey);

#[derive(Clone, Debug, PartialEq)]
pub enum EdgeKind {
    /// An unconditional transfer, described for printing, e.g. `while` or `goto: L`.
    Blank { description: String },
    Assume { expression: Expression, truth: bool },
    Statement(Statement),
    Declaration {
        declaration: Declaration,
        initializer: Option<Expression>,
    },
    /// Stores the value, if any, into the function's return variable and enters the exit node.
    Return { expression: Option<Expression> },
}

impl EdgeKind {
    pub fn blank(description: impl Into<String>) -> Self {
        EdgeKind::Blank {
            description: description.into(),
        }
    }
}

#[doc(hidden)]
#[derive(Clone, Debug)]
pub struct EdgeContent {
    pub kind: EdgeKind,
    pub predecessor: Node,
    pub successor: Node,
    pub span: Span,
}

impl Edge {
    /// Create a new edge from `predecessor` to `successor` and register it with both.
    pub fn connect(
        context: &mut Context,
        predecessor: Node,
        successor: Node,
        kind: EdgeKind,
        span: Span,
    ) -> Edge {
        let content = EdgeContent {
            kind,
            predecessor,
            successor,
            span,
        };
        let edge = Edge(context.edges.insert(content));
        context.nodes[predecessor.0].leaving.push(edge);
        context.nodes[successor.0].entering.push(edge);
        edge
    }

    /// Disconnect the edge from both of its nodes and drop it from the context.
    pub fn remove(&self, context: &mut Context) -> Result<EdgeContent, IrError> {
        let content = context
            .edges
            .remove(self.0)
            .ok_or_else(|| IrError::EdgeNotFound(format!("{:?}", self.0)))?;
        if let Some(pred) = context.nodes.get_mut(content.predecessor.0) {
            pred.leaving.retain(|edge| edge != self);
        }
        if let Some(succ) = context.nodes.get_mut(content.successor.0) {
            succ.entering.retain(|edge| edge != self);
        }
        Ok(content)
    }

    pub fn exists(&self, context: &Context) -> bool {
        context.edges.contains_key(self.0)
    }

    pub fn get_kind<'a>(&self, context: &'a Context) -> &'a EdgeKind {
        &context.edges[self.0].kind
    }

    pub fn get_predecessor(&self, context: &Context) -> Node {
        context.edges[self.0].predecessor
    }

    pub fn get_successor(&self, context: &Context) -> Node {
        context.edges[self.0].successor
    }

    pub fn get_span<'a>(&self, context: &'a Context) -> &'a Span {
        &context.edges[self.0].span
    }

    pub fn is_assume(&self, context: &Context) -> bool {
        matches!(self.get_kind(context), EdgeKind::Assume { .. })
    }

    /// The edge's statement if it performs a call.
    pub fn get_call_statement<'a>(&self, context: &'a Context) -> Option<&'a Statement> {
        match self.get_kind(context) {
            EdgeKind::Statement(stmt) if stmt.call().is_some() => Some(stmt),
            _ => None,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Blank { description } => write!(f, "{description}"),
            EdgeKind::Assume {
                expression,
                truth: true,
            } => write!(f, "[{expression}]"),
            EdgeKind::Assume {
                expression,
                truth: false,
            } => write!(f, "[!({expression})]"),
            EdgeKind::Statement(stmt) => write!(f, "{stmt}"),
            EdgeKind::Declaration {
                declaration,
                initializer,
            } => match initializer {
                Some(init) => write!(f, "{declaration} = {init};"),
                None => write!(f, "{declaration};"),
            },
            EdgeKind::Return {
                expression: Some(expr),
            } => write!(f, "return {expr};"),
            EdgeKind::Return { expression: None } => write!(f, "return;"),
        }
    }
}
