#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

//! # GraphRAG Core
//!
//! The query-processing pipeline for a graph-RAG question answering service:
//! a question goes in, a validated read-only graph query comes out and runs,
//! its rows are augmented with vector-retrieved text and graph context, and
//! an LLM summary with verified citations comes back.
//!
//! ## Core Concepts
//!
//! - **Allow-list**: the schema snapshot (labels, relationships, properties)
//!   that the validator and generator both consult for a single request.
//! - **Plan**: the structured intent/entities/parameters extracted from a
//!   question, before any query text exists.
//! - **Candidate**: a generated (not yet validated) `(cypher, params)` pair.
//! - **Pipeline**: the orchestrator that folds a question through all twelve
//!   stages and produces a [`pipeline::Response`].
//!
//! ## Module Organization
//!
//! ### Pipeline stages
//! - [`catalog`]: schema introspection and allow-list publication (C1)
//! - [`embedder`]: schema-term embedding and vector index (C2)
//! - [`guardrail`]: fast heuristic input rejection (C3)
//! - [`planner`]: intent/entity extraction (C4)
//! - [`semantic_mapper`]: user-term to schema-label mapping (C5)
//! - [`generator`]: template + LLM query generation (C6)
//! - [`validator`]: defensive query validation (C7)
//! - [`executor`]: read-only query execution (C8, see [`executor::Executor`])
//! - [`augmentor`]: chunk retrieval and graph context expansion (C9)
//! - [`summariser`]: LLM summary with citation verification (C10)
//! - [`audit`]: append-only event sink (C11)
//! - [`rate_limiter`]: token-bucket LLM call governance (C12)
//!
//! ### Support modules
//! - [`model`]: shared data types (`AllowList`, `QueryPlan`, `ResultRow`, ...)
//! - [`policy`]: configurable runtime limits
//! - [`error`]: the closed reason-code taxonomy
//! - [`providers`]: the external-system traits (graph store, LLM, embeddings)
//! - [`resilience`]: the circuit breaker wrapping upstream boundary calls
//! - [`pipeline`]: the orchestrator tying every stage together
//!
//! ## Quick Start
//!
//! ```no_run
//! use graphrag_core::pipeline::Pipeline;
//!
//! # async fn example(pipeline: Pipeline) -> graphrag_core::Result<()> {
//! let response = pipeline.ask("What are the goals for Isabella Thomas?").await?;
//! println!("{}", response.summary);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod augmentor;
pub mod catalog;
pub mod embedder;
pub mod error;
pub mod executor;
pub mod generator;
pub mod guardrail;
pub mod model;
pub mod pipeline;
pub mod planner;
pub mod policy;
pub mod providers;
pub mod rate_limiter;
pub mod resilience;
pub mod semantic_mapper;
pub mod similarity;
pub mod summariser;
pub mod validator;

pub use error::{Error, ReasonCode, Result};
pub use policy::Policy;
