pub mod java_type;
pub use java_type::*;

pub mod modifiers;
pub use modifiers::*;

pub mod operators;
pub use operators::*;

pub mod source_engine;
pub use source_engine::*;

pub mod span;
pub use span::*;

/// A unique identifier for a source file, handed out by the [SourceEngine].
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SourceId {
    id: u32,
}

impl SourceId {
    pub fn new(id: u32) -> Self {
        SourceId { id }
    }

    pub fn get(&self) -> u32 {
        self.id
    }
}
