//! Executor (C8): runs an accepted candidate in a read-only transaction with
//! a timeout, keeping the execution-option channel (timeout) strictly
//! separate from the Cypher parameter channel.

use crate::model::{CypherCandidate, ResultRow};
use crate::providers::graph_store::TxMode;
use crate::providers::GraphStore;
use crate::{Error, Policy, Result};

/// Wraps a [`GraphStore`] to run validated candidates. Owns no state beyond
/// the store reference — a thin seam so tests can swap in a fixture store.
pub struct Executor<'a> {
    store: &'a dyn GraphStore,
}

impl<'a> Executor<'a> {
    #[must_use]
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self { store }
    }

    /// Execute `candidate` read-only, bounded by `policy.timeout`. Rows are
    /// materialised eagerly up to `policy.max_cypher_results`; if the
    /// underlying result set is larger, the excess is truncated and the
    /// caller is told via the returned `truncated` flag so it can be
    /// recorded in the audit event (§4.8 Post-conditions).
    pub async fn execute(
        &self,
        candidate: &CypherCandidate,
        policy: &Policy,
    ) -> Result<ExecutionOutcome> {
        let query = self.store.query(
            &candidate.text,
            &candidate.params,
            TxMode::ReadOnly,
            policy.timeout,
        );

        let rows = match tokio::time::timeout(policy.timeout, query).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(Error::QueryTimeout),
        };

        let truncated = rows.len() > policy.max_cypher_results;
        let rows: Vec<ResultRow> = rows.into_iter().take(policy.max_cypher_results).collect();
        Ok(ExecutionOutcome { rows, truncated })
    }
}

/// Rows plus whether the underlying result set exceeded the cap.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub rows: Vec<ResultRow>,
    pub truncated: bool,
}
