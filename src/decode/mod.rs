//! Decoders that turn raw tool output into tool-agnostic events.

mod claude;
mod codex;
mod events;
mod gemini;
mod grammar;
mod marker;

pub use claude::*;
pub use codex::*;
pub use events::*;
pub use gemini::*;
pub use grammar::*;
pub use marker::*;
