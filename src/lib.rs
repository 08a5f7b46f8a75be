//! cli-relay - one conversation interface over several coding-assistant CLIs.
//!
//! Builds per-tool invocations, supervises one subprocess per in-flight
//! turn, and normalizes each tool's streaming output into [`decode::NormalizedEvent`]s.

pub mod command;
pub mod config;
pub mod decode;
pub mod display;
pub mod history;
pub mod profile;
pub mod stream;
pub mod supervisor;
