//! Native session history written by the tools themselves.

mod discovery;
mod transcript;

pub use discovery::*;
pub use transcript::*;
