//! The production [`GraphStore`] backend, talking Bolt to a real Neo4j (or
//! Neo4j-compatible) instance via `neo4rs`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use graphrag_core::guardrail::MUTATION_KEYWORDS;
use graphrag_core::model::{ResultRow, Scalar};
use graphrag_core::providers::graph_store::{SchemaIntrospection, TxMode};
use graphrag_core::providers::GraphStore;
use graphrag_core::{Error, Result};
use neo4rs::{BoltType, Graph, Query};

/// Connection configuration for a [`BoltGraphStore`].
#[derive(Debug, Clone)]
pub struct BoltConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Name of the vector index chunks are embedded into; used by
    /// [`GraphStore::vector_search`] callers, kept here only for reference.
    pub chunk_vector_index: String,
}

/// A Bolt-backed graph store. Every query runs inside its own auto-commit
/// transaction; read-only enforcement happens twice — once here by keyword
/// scan (belt-and-braces, §4.8) and once upstream in the validator (C7).
pub struct BoltGraphStore {
    graph: Graph,
}

impl BoltGraphStore {
    /// Open a connection pool against the configured Bolt endpoint.
    pub async fn connect(config: &BoltConfig) -> Result<Self> {
        let graph = Graph::new(&config.uri, &config.user, &config.password)
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
        Ok(Self { graph })
    }

    fn reject_writes_if_read_only(cypher: &str, mode: TxMode) -> Result<()> {
        if mode != TxMode::ReadOnly {
            return Ok(());
        }
        let upper = cypher.to_uppercase();
        for keyword in MUTATION_KEYWORDS {
            if upper.contains(keyword) {
                return Err(Error::WriteBlocked);
            }
        }
        Ok(())
    }
}

fn scalar_to_bolt(value: &Scalar) -> BoltType {
    match value {
        Scalar::String(s) => BoltType::from(s.as_str()),
        Scalar::Int(i) => BoltType::from(*i),
        Scalar::Float(f) => BoltType::from(*f),
        Scalar::Bool(b) => BoltType::from(*b),
        Scalar::List(items) => {
            let converted: Vec<BoltType> = items.iter().map(scalar_to_bolt).collect();
            BoltType::from(converted)
        }
        Scalar::Null => BoltType::Null(neo4rs::BoltNull),
    }
}

fn bolt_to_scalar(value: BoltType) -> Scalar {
    match value {
        BoltType::String(s) => Scalar::String(s.to_string()),
        BoltType::Integer(i) => Scalar::Int(i.value),
        BoltType::Float(f) => Scalar::Float(f.value),
        BoltType::Boolean(b) => Scalar::Bool(b.value),
        BoltType::List(items) => {
            Scalar::List(items.value.into_iter().map(bolt_to_scalar).collect())
        }
        BoltType::Node(node) => Scalar::List(
            node.labels()
                .iter()
                .map(|label| Scalar::String(label.clone()))
                .collect(),
        ),
        _ => Scalar::Null,
    }
}

fn node_id_of(value: &BoltType) -> Option<String> {
    match value {
        BoltType::Node(node) => Some(node.id().to_string()),
        _ => None,
    }
}

#[async_trait]
impl GraphStore for BoltGraphStore {
    async fn query(
        &self,
        cypher: &str,
        params: &BTreeMap<String, Scalar>,
        mode: TxMode,
        timeout: Duration,
    ) -> Result<Vec<ResultRow>> {
        Self::reject_writes_if_read_only(cypher, mode)?;

        let mut query = Query::new(cypher.to_string());
        for (key, value) in params {
            query = query.param(key, scalar_to_bolt(value));
        }

        let run = async {
            let mut stream = self
                .graph
                .execute(query)
                .await
                .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;

            let mut rows = Vec::new();
            while let Some(row) = stream
                .next()
                .await
                .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?
            {
                let columns: Vec<String> = row.keys().map(ToString::to_string).collect();
                let mut values = Vec::with_capacity(columns.len());
                let mut node_ids = std::collections::BTreeSet::new();
                for column in &columns {
                    let raw: BoltType = row
                        .get(column)
                        .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
                    if let Some(id) = node_id_of(&raw) {
                        node_ids.insert(id);
                    }
                    values.push(bolt_to_scalar(raw));
                }
                rows.push(ResultRow {
                    columns,
                    values,
                    node_ids: if node_ids.is_empty() {
                        None
                    } else {
                        Some(node_ids)
                    },
                });
            }
            Ok(rows)
        };

        tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| Error::QueryTimeout)?
    }

    async fn introspect_schema(&self) -> Result<SchemaIntrospection> {
        let mut introspection = SchemaIntrospection::default();

        let mut labels = self
            .graph
            .execute(Query::new("CALL db.labels() YIELD label".to_string()))
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
        while let Some(row) = labels
            .next()
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?
        {
            let label: String = row
                .get("label")
                .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
            introspection.labels.push(label);
        }

        let mut rels = self
            .graph
            .execute(Query::new(
                "CALL db.relationshipTypes() YIELD relationshipType".to_string(),
            ))
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
        while let Some(row) = rels
            .next()
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?
        {
            let rel_type: String = row
                .get("relationshipType")
                .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
            introspection.relationships.push(rel_type);
        }

        let mut props = self
            .graph
            .execute(Query::new(
                "CALL db.schema.nodeTypeProperties() YIELD nodeLabels, propertyName".to_string(),
            ))
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
        while let Some(row) = props
            .next()
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?
        {
            let node_labels: Vec<String> = row
                .get("nodeLabels")
                .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
            let property_name: Option<String> = row
                .get("propertyName")
                .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
            let Some(property_name) = property_name else {
                continue;
            };
            for label in node_labels {
                introspection.properties.push((label, property_name.clone()));
            }
        }

        Ok(introspection)
    }

    async fn create_vector_index(&self, name: &str, dimension: usize) -> Result<()> {
        let cypher = format!(
            "CREATE VECTOR INDEX {name} IF NOT EXISTS FOR (c:Chunk) ON (c.embedding) \
             OPTIONS {{indexConfig: {{`vector.dimensions`: {dimension}, `vector.similarity_function`: 'cosine'}}}}"
        );
        self.graph
            .run(Query::new(cypher))
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))
    }

    async fn drop_vector_index(&self, name: &str) -> Result<()> {
        let cypher = format!("DROP INDEX {name} IF EXISTS");
        self.graph
            .run(Query::new(cypher))
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))
    }

    async fn vector_search(
        &self,
        index: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(String, f32)>> {
        let query = Query::new(
            "CALL db.index.vector.queryNodes($index, $k, $embedding) YIELD node, score \
             RETURN elementId(node) AS id, score"
                .to_string(),
        )
        .param("index", index)
        .param("k", k as i64)
        .param("embedding", embedding.to_vec());

        let mut stream = self
            .graph
            .execute(query)
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;

        let mut hits = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?
        {
            let id: String = row
                .get("id")
                .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
            let score: f64 = row
                .get("score")
                .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
            hits.push((id, score as f32));
        }
        Ok(hits)
    }

    async fn fetch_chunk(&self, chunk_id: &str) -> Result<Option<(String, String)>> {
        let query = Query::new(
            "MATCH (c:Chunk) WHERE elementId(c) = $id \
             RETURN c.text AS text, c.sourceDocId AS sourceDocId"
                .to_string(),
        )
        .param("id", chunk_id);

        let mut stream = self
            .graph
            .execute(query)
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;

        let Some(row) = stream
            .next()
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?
        else {
            return Ok(None);
        };

        let text: String = row
            .get("text")
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
        let source_doc_id: String = row
            .get("sourceDocId")
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;
        Ok(Some((text, source_doc_id)))
    }
}
