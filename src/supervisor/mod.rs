//! Session process supervision: one live turn subprocess per session.

mod engine;
mod event;
mod process;
mod registry;
mod runner;
mod state;
mod throttle;

pub use engine::*;
pub use event::*;
pub use process::*;
pub use registry::*;
pub use runner::{OutputSource, TurnOutput, CHUNK_CHANNEL_BUFFER, EXIT_DRAIN_GRACE};
pub use state::*;
pub use throttle::*;
