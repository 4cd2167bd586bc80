pub mod error;
pub mod pets;
pub mod resolve;
pub mod validate;

pub use error::*;
pub use pets::*;
pub use resolve::*;
pub use validate::*;
