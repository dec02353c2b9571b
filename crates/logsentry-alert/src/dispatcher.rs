//! Alert dispatcher - broadcast to every sink, record each outcome

use futures::FutureExt;
use logsentry_core::Alert;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, warn};

use crate::sink::AlertSink;

// outcome of one sink for one dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkOutcome {
    pub sink: String,
    pub success: bool,
}

/// Per-sink results of a dispatch, in notification order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    outcomes: Vec<SinkOutcome>,
}

impl DispatchResult {
    fn record(&mut self, sink: &str, success: bool) {
        self.outcomes.push(SinkOutcome {
            sink: sink.to_string(),
            success,
        });
    }

    pub fn get(&self, sink: &str) -> Option<bool> {
        self.outcomes.iter().find(|o| o.sink == sink).map(|o| o.success)
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter(|o| !o.success).map(|o| o.sink.as_str())
    }

    pub fn outcomes(&self) -> &[SinkOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[derive(Default)]
pub struct AlertDispatcher {
    // notified in insertion order
    sinks: Vec<Box<dyn AlertSink>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Send `alerts` to every sink. Never fails: an error or a panic inside a
    /// sink is recorded as `false` and the remaining sinks still run.
    pub async fn dispatch_all(&self, alerts: &[Alert]) -> DispatchResult {
        let mut result = DispatchResult::default();

        for sink in &self.sinks {
            let outcome = AssertUnwindSafe(sink.send(alerts)).catch_unwind().await;
            let success = match outcome {
                Ok(Ok(())) => {
                    debug!(sink = sink.name(), alerts = alerts.len(), "sink delivered");
                    true
                }
                Ok(Err(e)) => {
                    warn!(sink = sink.name(), error = %e, "sink failed");
                    false
                }
                Err(_) => {
                    error!(sink = sink.name(), "sink panicked");
                    false
                }
            };
            result.record(sink.name(), success);
        }

        result
    }
}
