//! Schema Catalog (C1): turns graph-store schema introspection into an
//! allow-list and publishes it atomically.

use std::sync::Arc;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::model::AllowList;
use crate::providers::graph_store::allow_list_from_introspection;
use crate::providers::GraphStore;
use crate::{Error, Result};

/// Owns the currently-published [`AllowList`] and knows how to refresh it
/// from a [`GraphStore`]. Readers call [`SchemaCatalog::current`] and hold
/// the returned `Arc` for the life of their request — the snapshot they see
/// cannot change underneath them, only be superseded for future readers.
pub struct SchemaCatalog {
    current: RwLock<Arc<AllowList>>,
}

impl SchemaCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(AllowList::default())),
        }
    }

    /// The published snapshot. Cheap: clones an `Arc`, never the allow-list
    /// itself.
    #[must_use]
    pub fn current(&self) -> Arc<AllowList> {
        self.current.read().clone()
    }

    /// Query the store for the full schema, fingerprint it, and publish it
    /// atomically. Idempotent: if the fingerprint is unchanged, the snapshot
    /// pointer is not swapped and the caller can tell no downstream work
    /// (e.g. re-embedding, index rebuild) is needed by comparing the
    /// returned fingerprint to the previous one.
    ///
    /// Only reachable from the admin refresh path — normal request handling
    /// never calls this (§4.1 Write access).
    pub async fn refresh(&self, store: &dyn GraphStore) -> Result<RefreshOutcome> {
        let introspection = store
            .introspect_schema()
            .await
            .map_err(|e| Error::SchemaUnavailable(e.to_string()))?;

        let mut allow_list = allow_list_from_introspection(&introspection);
        allow_list.fingerprint = fingerprint(&allow_list);

        let previous_fingerprint = self.current.read().fingerprint;
        if previous_fingerprint == allow_list.fingerprint {
            return Ok(RefreshOutcome::Unchanged(previous_fingerprint));
        }

        let new_fingerprint = allow_list.fingerprint;
        *self.current.write() = Arc::new(allow_list);
        Ok(RefreshOutcome::Changed(new_fingerprint))
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a refresh actually changed the published snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Unchanged([u8; 32]),
    Changed([u8; 32]),
}

/// Stable hash over the sorted (label, relationship, property) triples.
/// Sorting first makes the fingerprint independent of the store's
/// introspection-result ordering.
#[must_use]
pub fn fingerprint(allow_list: &AllowList) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for label in &allow_list.labels {
        hasher.update(b"label:");
        hasher.update(label.as_bytes());
        hasher.update(b"\0");
    }
    for rel in &allow_list.relationships {
        hasher.update(b"rel:");
        hasher.update(rel.as_bytes());
        hasher.update(b"\0");
    }
    for (label, props) in &allow_list.properties {
        for prop in props {
            hasher.update(b"prop:");
            hasher.update(label.as_bytes());
            hasher.update(b".");
            hasher.update(prop.as_bytes());
            hasher.update(b"\0");
        }
    }
    hasher.finalize().into()
}
