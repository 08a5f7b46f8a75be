//! Command building for turns.

mod builder;
mod options;

pub use builder::*;
pub use options::*;
