//! Chunk-level reassembly of subprocess output.

mod lines;
mod toolcall;
mod utf8;

pub use lines::*;
pub use toolcall::*;
pub use utf8::*;
