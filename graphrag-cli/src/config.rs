use std::path::Path;

use anyhow::Context;
use graphrag_core::policy::Mode;
use graphrag_core::Policy;
use serde::{Deserialize, Serialize};

/// Connection details for a live Bolt/Neo4j backend. Absent when the CLI
/// should run against the bundled fixture store instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    #[serde(default = "default_chunk_vector_index")]
    pub chunk_vector_index: String,
}

fn default_chunk_vector_index() -> String {
    "graphrag_chunks".to_string()
}

/// Operational toggles that sit alongside [`Policy`] rather than inside it —
/// `mode` and `allow_writes` govern what the admin surface may do, not a
/// tunable request limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub policy: Policy,
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default)]
    pub allow_writes: bool,
    pub neo4j: Option<Neo4jConfig>,
    pub audit_log_path: Option<String>,
}

fn default_mode() -> Mode {
    Mode::ReadOnly
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            mode: Mode::ReadOnly,
            allow_writes: false,
            neo4j: None,
            audit_log_path: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file, or fall back to defaults (the
    /// bundled fixture store, read-only mode) when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }
}
