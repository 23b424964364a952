//! The main handle to a CFA instance.
//!
//! [`Context`] contains several [slotmap](https://github.com/orlp/slotmap) collections to
//! maintain the graph. It is passed around as a mutable reference to most of the APIs in this
//! crate.

use indexmap::IndexMap;
use slotmap::{DefaultKey, SlotMap};

use crate::{edge::EdgeContent, function::Function, function::FunctionContent, node::NodeContent};

/// The main CFA context handle.
///
/// Every function, node and edge is stored here.
#[derive(Default)]
pub struct Context {
    pub(crate) functions: SlotMap<DefaultKey, FunctionContent>,
    pub(crate) nodes: SlotMap<DefaultKey, NodeContent>,
    pub(crate) edges: SlotMap<DefaultKey, EdgeContent>,

    /// Functions by qualified name, in creation order.
    pub(crate) function_map: IndexMap<String, Function>,

    next_node_id: u64,
}

impl Context {
    /// Return every function in creation order.
    pub fn functions(&self) -> impl Iterator<Item = Function> + '_ {
        self.function_map.values().copied()
    }

    pub fn get_function(&self, name: &str) -> Option<Function> {
        self.function_map.get(name).copied()
    }

    pub fn num_functions(&self) -> usize {
        self.function_map.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Get a program-wide unique node number.
    pub(crate) fn next_node_id(&mut self) -> u64 {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }
}

use std::fmt::{Display, Error, Formatter};

impl Display for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", crate::printer::to_string(self))
    }
}

impl From<Context> for String {
    fn from(context: Context) -> Self {
        crate::printer::to_string(&context)
    }
}
