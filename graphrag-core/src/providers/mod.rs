//! Traits for the external systems the pipeline consumes (§6). Concrete
//! implementations live outside this crate (`graphrag-graphstore` for the
//! graph store; `test-utils` for the in-process fixtures used by tests and
//! the CLI's offline mode).

pub mod embedding;
pub mod graph_store;
pub mod llm;

pub use embedding::EmbeddingProvider;
pub use graph_store::{GraphStore, SchemaIntrospection, TxMode};
pub use llm::{JsonCompletionRequest, LlmProvider};
