//! Tool profiles: per-CLI invocation and output grammars.

mod detect;
mod registry;
mod types;

pub use detect::*;
pub use registry::*;
pub use types::*;
