//! Shutdown coordination.
//!
//! The telemetry sink lives for the whole process: opened at startup,
//! flushed here once the server has stopped accepting requests.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::telemetry::LogSink;

/// Broadcasts the shutdown signal and owns the final sink flush.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    sinks: Vec<Arc<dyn LogSink>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            sinks: Vec::new(),
        }
    }

    /// Register a sink to be flushed by `finish`.
    pub fn flush_on_exit(&mut self, sink: Arc<dyn LogSink>) {
        self.sinks.push(sink);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Flush every registered sink. Call after the server has drained.
    pub fn finish(self) {
        for sink in &self.sinks {
            if let Err(e) = sink.flush() {
                tracing::error!(error = %e, "Failed to flush telemetry sink");
            }
        }
        tracing::info!(sinks = self.sinks.len(), "Telemetry sinks flushed");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on Ctrl+C or when `rx` fires, whichever comes first.
pub async fn shutdown_signal(mut rx: broadcast::Receiver<()>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                // without a signal handler, only an explicit trigger stops us
                let _ = rx.recv().await;
            }
        }
        _ = rx.recv() => {}
    }
    tracing::info!("Shutdown signal received");
}
