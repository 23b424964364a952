pub mod prune;
pub use prune::*;
