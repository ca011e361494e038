//! # drillpad-corpus
//!
//! Offline keyword retrieval over a prebuilt set of knowledge chunks.
//!
//! The index is built once from a chunk file and is read-only afterwards,
//! so it can be shared freely across interview sessions.
//!
//! ## Key Types
//!
//! - [`Chunk`] - A pre-segmented unit of corpus text with tags and keywords
//! - [`CorpusIndex`] - The immutable index answering ranked queries
//! - [`RetrievedChunk`] - A scored query result, recomputed per query

mod chunk;
mod index;

pub use chunk::{load_chunks, Chunk, RetrievedChunk};
pub use index::{CorpusIndex, DEFAULT_K};
