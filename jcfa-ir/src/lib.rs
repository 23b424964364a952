//! The control-flow automaton (CFA) intermediate representation.
//!
//! A CFA is a graph of [`Node`]s connected by [`Edge`]s, one graph per [`Function`]. Edges carry
//! the program operations: assumptions, statements, declarations and returns. All expressions on
//! edges are side-effect free.
//!
//! Nodes, edges and functions live in arenas owned by a [`Context`] and are addressed through
//! small copyable handles, so edges can be removed and inserted while a graph is being walked.

pub mod analysis;
pub use analysis::*;
pub mod context;
pub use context::*;
pub mod declaration;
pub use declaration::*;
pub mod edge;
pub use edge::*;
pub mod error;
pub use error::*;
pub mod expression;
pub use expression::*;
pub mod function;
pub use function::*;
pub mod node;
pub use node::*;
pub mod optimize;
pub use optimize::*;
pub mod printer;
pub use printer::*;
pub mod statement;
pub use statement::*;
pub mod verify;
