//! # drillpad-engine
//!
//! The interview dialogue engine: given the user's free-text answer and their
//! latest diagram edit, decide what the interviewer says next.
//!
//! The engine is a pure function of `(input, memory) -> (output, memory)`.
//! There is no persistent state-machine object; the response mode is recomputed
//! every turn from the intent, the diagram change, and the session memory,
//! which is what allows the dialogue service to scale horizontally.
//!
//! ## Key Types
//!
//! - [`TurnInput`] / [`TurnOutput`] - the per-turn contract with the caller
//! - [`SessionMemory`] - everything remembered between turns, caller-persisted
//! - [`TurnRunner`] - generator-first entry point with heuristic fallback
//! - [`heuristic_turn`] - the deterministic heuristic path itself

mod coaching;
mod composer;
mod config;
mod intent;
mod memory;
mod orchestrator;
mod runner;
mod topics;
mod turn;

pub use composer::{
    build_retrieval_query, compose, extract_diagram_context, ComposeInput, ComposedQuestion,
    DiagramContext,
};
pub use config::EngineConfig;
pub use intent::{classify_intent, is_start_sentinel, UserIntent};
pub use memory::{question_hash, Section, SessionMemory};
pub use orchestrator::heuristic_turn;
pub use runner::TurnRunner;
pub use topics::{
    action_summary, is_no_op, normalize_label, topics_for_change, NoOpPolicy, Topic,
};
pub use turn::{
    DiagramChange, DiagramEdge, DiagramNode, DiagramSnapshot, Evaluation, QuestionPackSummary,
    ResponseIntent, Target, Transcript, TranscriptTurn, TurnInput, TurnOutput,
};
