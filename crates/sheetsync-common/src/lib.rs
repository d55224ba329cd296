pub mod color;
pub mod table;

pub use color::*;
pub use table::*;
