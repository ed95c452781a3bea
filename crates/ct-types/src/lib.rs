pub mod control;
pub mod errors;
pub mod option;

pub use control::*;
pub use errors::*;
pub use option::*;
