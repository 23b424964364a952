//! Forward reachability over the CFA.
//!
//! The search is an explicit breadth-first work-list, so it is safe on arbitrarily long graphs.

use indexmap::IndexSet;
use std::collections::VecDeque;

use crate::{context::Context, function::Function, node::Node};

/// Every node reachable from `start` by following leaving edges, in breadth-first order.
pub fn reachable_nodes(context: &Context, start: Node) -> IndexSet<Node> {
    let mut visited = IndexSet::from([start]);
    let mut worklist = VecDeque::from([start]);
    while let Some(node) = worklist.pop_front() {
        for edge in node.leaving_edges(context) {
            let succ = edge.get_successor(context);
            if visited.insert(succ) {
                worklist.push_back(succ);
            }
        }
    }
    visited
}

impl Function {
    /// Every node reachable from the function's entry, in breadth-first order.
    pub fn reachable_nodes(&self, context: &Context) -> IndexSet<Node> {
        reachable_nodes(context, self.get_entry(context))
    }
}
