use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{AllowList, ResultRow, Scalar};
use crate::Result;

/// Whether a transaction may mutate the graph. The executor (C8) only ever
/// opens [`TxMode::ReadOnly`] transactions; [`TxMode::ReadWrite`] exists only
/// for the admin refresh path and is never reachable from request handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Raw schema introspection data, before it has been folded into an
/// [`AllowList`] and fingerprinted by the schema catalog (C1).
#[derive(Debug, Clone, Default)]
pub struct SchemaIntrospection {
    pub labels: Vec<String>,
    pub relationships: Vec<String>,
    /// `(label, property_name)` pairs.
    pub properties: Vec<(String, String)>,
}

/// The minimal surface a property-graph store must expose (§6).
///
/// The parameter channel and the execution-option channel (currently just
/// `timeout`) are intentionally separate arguments on [`GraphStore::query`]
/// rather than folded into one map — `timeout` must never be forwarded as a
/// Cypher parameter (testable invariant 7, §8).
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run parameterised Cypher in a transaction of the given mode, bounded
    /// by `timeout`. Implementations must reject any write operation when
    /// `mode` is [`TxMode::ReadOnly`], independent of what the validator
    /// already checked (belt-and-braces, §4.8).
    async fn query(
        &self,
        cypher: &str,
        params: &BTreeMap<String, Scalar>,
        mode: TxMode,
        timeout: Duration,
    ) -> Result<Vec<ResultRow>>;

    /// Schema introspection: all labels, relationships (both directions),
    /// and per-label properties currently present in the store.
    async fn introspect_schema(&self) -> Result<SchemaIntrospection>;

    /// Admin DDL: create a vector index with the given name and dimension.
    /// Only reachable from the admin refresh path (C1/C2).
    async fn create_vector_index(&self, name: &str, dimension: usize) -> Result<()>;

    /// Admin DDL: drop a vector index, used when the embedding provider's
    /// dimension changes (§4.2 Dimension handling).
    async fn drop_vector_index(&self, name: &str) -> Result<()>;

    /// Vector-KNN search against a named index, returning `(id, similarity)`
    /// pairs ordered by descending similarity. Used by the retriever (C9)
    /// for chunk retrieval. Returns an empty vec, not an error, when the
    /// index does not exist — callers decide whether that is fail-open.
    async fn vector_search(
        &self,
        index: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(String, f32)>>;

    /// Resolve a chunk id (as returned by [`GraphStore::vector_search`])
    /// into its text and source document id, for the retriever (C9) to hand
    /// to the summariser (C10). Returns `None`, not an error, when the chunk
    /// no longer exists — callers treat that as fail-open.
    async fn fetch_chunk(&self, chunk_id: &str) -> Result<Option<(String, String)>>;
}

/// Build an [`AllowList`] (minus fingerprint, which the catalog computes)
/// from raw introspection data. Free function rather than a method on
/// [`SchemaIntrospection`] so the catalog module owns fingerprinting.
#[must_use]
pub fn allow_list_from_introspection(introspection: &SchemaIntrospection) -> AllowList {
    let mut allow_list = AllowList::default();
    allow_list.labels.extend(introspection.labels.iter().cloned());
    allow_list
        .relationships
        .extend(introspection.relationships.iter().cloned());
    for (label, property) in &introspection.properties {
        allow_list
            .properties
            .entry(label.clone())
            .or_default()
            .insert(property.clone());
    }
    allow_list
}
