//! # drillpad-generator
//!
//! Pluggable external generator backend for the interview engine.
//!
//! A [`Generator`] is an optional large-model backend that may produce the
//! interviewer's turn instead of the built-in heuristic path. It can be absent,
//! slow, or return garbage; callers must bound it with a timeout and fall back
//! to the heuristic path on any failure.

mod command;
mod traits;

pub use command::CommandGenerator;
pub use traits::{Generator, GeneratorConfig, GeneratorError};
