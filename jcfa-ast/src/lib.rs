//! The type-resolved syntax tree handed over by the front end.
//!
//! Every name reference carries the binding the front end resolved for it, and every expression
//! carries its resolved type. Nothing in here is mutated by the lowering.

pub mod binding;
pub mod declaration;
pub mod expression;
pub mod statement;

pub use binding::*;
pub use declaration::*;
pub use expression::*;
pub use statement::*;
