//! Graph store backends for the GraphRAG query pipeline: a production
//! [`bolt::BoltGraphStore`] speaking Bolt to Neo4j, and an in-memory
//! [`fixture::FixtureGraphStore`] for tests and offline CLI use.
//!
//! Both implement [`graphrag_core::providers::GraphStore`]; the pipeline
//! itself never knows which one it is talking to.

pub mod bolt;
pub mod fixture;
pub mod resilient;

pub use bolt::{BoltConfig, BoltGraphStore};
pub use fixture::FixtureGraphStore;
pub use resilient::ResilientGraphStore;
