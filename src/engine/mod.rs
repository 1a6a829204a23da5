//! Symbol routing, validation, and counters sitting above the per-symbol
//! books.

pub mod matching_engine;

pub use matching_engine::{EngineStats, MatchingEngine, OrderResult, SubmitRequest};
