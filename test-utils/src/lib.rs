//! Shared test doubles for `graphrag-core`, `graphrag-graphstore` and
//! `graphrag-cli`: a canned graph store fixture, a scripted LLM provider,
//! and a deterministic embedding stub.

pub mod deterministic_embedding;
pub mod fixture_store;
pub mod scripted_llm;

pub use deterministic_embedding::DeterministicEmbeddingProvider;
pub use fixture_store::goal_tracker_fixture;
pub use scripted_llm::{Scripted, ScriptedLlmProvider};
