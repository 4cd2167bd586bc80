pub mod group;
pub mod pagination;
pub mod pet;
pub mod pet_trait;

pub use group::*;
pub use pagination::*;
pub use pet::*;
pub use pet_trait::*;

/// Row identifier assigned by the store
pub type Id = i64;
