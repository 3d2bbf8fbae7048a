use std::sync::Arc;

use anyhow::{bail, Context};
use graphrag_core::catalog::{RefreshOutcome, SchemaCatalog};
use graphrag_core::embedder::SchemaEmbedder;
use graphrag_core::policy::Mode;
use graphrag_core::providers::GraphStore;
use graphrag_graphstore::{BoltConfig, BoltGraphStore, ResilientGraphStore};
use test_utils::DeterministicEmbeddingProvider;

use crate::config::CliConfig;

/// Refresh the schema allow-list and vector index against the configured
/// graph store (C1/C2's admin refresh path, §4.1/§4.2). Requires `mode =
/// admin` in the CLI config — the admin surface is never reachable from
/// request handling (§6).
pub async fn refresh_schema(config: &CliConfig) -> anyhow::Result<()> {
    if config.mode != Mode::Admin {
        bail!("admin refresh-schema requires `mode = \"admin\"` in the CLI config");
    }
    let Some(neo4j) = &config.neo4j else {
        bail!("admin refresh-schema requires a [neo4j] connection block in the CLI config");
    };

    let bolt = BoltGraphStore::connect(&BoltConfig {
        uri: neo4j.uri.clone(),
        user: neo4j.user.clone(),
        password: neo4j.password.clone(),
        chunk_vector_index: neo4j.chunk_vector_index.clone(),
    })
    .await
    .context("connecting to the configured Bolt endpoint")?;
    let store: Arc<dyn GraphStore> = Arc::new(ResilientGraphStore::new(Arc::new(bolt), "neo4j"));

    let catalog = SchemaCatalog::new();
    let outcome = catalog
        .refresh(store.as_ref())
        .await
        .context("refreshing the schema catalog")?;

    match outcome {
        RefreshOutcome::Unchanged(fingerprint) => {
            println!("schema unchanged (fingerprint {})", to_hex(&fingerprint));
        }
        RefreshOutcome::Changed(fingerprint) => {
            println!("schema changed (new fingerprint {})", to_hex(&fingerprint));
        }
    }

    let embedder = SchemaEmbedder::new();
    let embedding_provider = DeterministicEmbeddingProvider;
    embedder
        .refresh(&catalog.current(), &Vec::new(), &embedding_provider, store.as_ref())
        .await
        .context("refreshing the schema embedder's vector index")?;

    println!(
        "vector index refreshed at dimension {}",
        embedder.dimension()
    );
    Ok(())
}

fn to_hex(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
