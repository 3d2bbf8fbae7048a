//! Audit Sink (C11): append-only JSONL trail of every request, published
//! through a buffered background writer so a slow or unavailable disk never
//! blocks the pipeline (§4.11). Failure to persist is logged and swallowed —
//! the audit sink is an auxiliary concern, never a fatal one (§7).

use std::path::PathBuf;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::model::AuditEvent;

/// Where (and whether) audit events are persisted.
#[derive(Debug, Clone)]
pub struct AuditSinkConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for AuditSinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("audit.jsonl"),
        }
    }
}

/// Buffered JSONL audit sink. Every [`AuditEvent`] is also emitted through
/// `tracing` under the `"audit"` target, so a subscriber-based pipeline works
/// even without the file sink enabled.
#[derive(Clone)]
pub struct AuditSink {
    sender: Option<mpsc::UnboundedSender<AuditEvent>>,
}

impl AuditSink {
    /// Start the background writer task when `config.enabled`; otherwise the
    /// sink only emits `tracing` events.
    #[must_use]
    pub fn new(config: AuditSinkConfig) -> Self {
        if !config.enabled {
            return Self { sender: None };
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();
        let path = config.path;

        tokio::spawn(async move {
            let file = OpenOptions::new().create(true).append(true).open(&path).await;
            let mut file = match file {
                Ok(file) => file,
                Err(e) => {
                    error!("failed to open audit log at {}: {e}", path.display());
                    return;
                }
            };

            while let Some(event) = rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(mut line) => {
                        line.push('\n');
                        if let Err(e) = file.write_all(line.as_bytes()).await {
                            error!("failed to append audit entry: {e}");
                        }
                    }
                    Err(e) => error!("failed to serialise audit entry: {e}"),
                }
            }
        });

        Self { sender: Some(tx) }
    }

    /// A sink that only emits `tracing` events and never touches disk.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Record an event. Non-blocking; a full or closed channel is logged at
    /// debug level rather than propagated (§7 fail-open).
    pub fn record(&self, event: AuditEvent) {
        info!(
            target: "audit",
            trace_id = %event.trace_id,
            stage = %event.stage,
            outcome = ?event.outcome,
            reason_code = ?event.reason_code,
            "audit event",
        );

        if let Some(sender) = &self.sender {
            if let Err(e) = sender.send(event) {
                tracing::debug!("audit channel closed, dropping entry: {e}");
            }
        }
    }
}

impl Default for AuditSink {
    fn default() -> Self {
        Self::disabled()
    }
}
