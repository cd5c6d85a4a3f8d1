pub mod coord;
pub mod error;
pub mod label;
pub mod range;

pub use coord::*;
pub use error::*;
pub use label::*;
pub use range::*;
