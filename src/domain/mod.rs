mod catalog;
mod expense;
mod money;

pub use catalog::*;
pub use expense::*;
pub use money::*;
