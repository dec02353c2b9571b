//! Monitor: owns the tailer, analyzer, dispatcher and history and drives
//! the single-pass and continuous modes

use logsentry_core::{Alert, Batcher, LogLine, LogSource, Tailer};
use logsentry_llm::analyzer::{AnalyzerConfig, DEFAULT_SYSTEM_PROMPT};
use logsentry_llm::{LlmClient, LogAnalyzer};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::console::ConsoleSink;
use crate::dispatcher::{AlertDispatcher, DispatchResult};
use crate::email::EmailSink;
use crate::history::AlertHistory;
use crate::slack::SlackSink;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MonitorError {
    #[error("unknown log source '{0}'")]
    UnknownSource(String),
}

// what one pass over the sources produced
#[derive(Debug, Default)]
pub struct CycleReport {
    pub lines: usize,
    pub alerts: Vec<Alert>,
    // one entry per dispatch that happened during the pass
    pub dispatches: Vec<DispatchResult>,
}

// main runner that owns the tailer, analyzer and sinks for the process
pub struct Monitor {
    sources: Vec<LogSource>,
    tailer: Tailer,
    analyzer: LogAnalyzer,
    batcher: Batcher,
    dispatcher: AlertDispatcher,
    history: AlertHistory,
    interval: Duration,
}

impl Monitor {
    pub fn new(
        sources: Vec<LogSource>,
        analyzer: LogAnalyzer,
        batcher: Batcher,
        dispatcher: AlertDispatcher,
        interval: Duration,
    ) -> Self {
        Self {
            sources,
            tailer: Tailer::new(),
            analyzer,
            batcher,
            dispatcher,
            history: AlertHistory::default(),
            interval,
        }
    }

    // wire everything from a validated config
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let client: Arc<dyn LlmClient> = config
            .llm
            .build_client()
            .map_err(|e| ConfigError::Invalid(format!("llm: {}", e)))?;
        Self::with_client(config, client)
    }

    /// Same as from_config but with a caller-supplied oracle
    pub fn with_client(config: &AppConfig, client: Arc<dyn LlmClient>) -> Result<Self, ConfigError> {
        let analyzer = LogAnalyzer::new(
            client,
            AnalyzerConfig {
                prompt_template: config.prompt_template.clone(),
                system_prompt: config
                    .llm
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
                max_tokens: config.llm.max_tokens,
                severity_threshold: config.analysis.threshold(),
            },
        );

        let batcher = Batcher::new(config.analysis.batch_size).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut dispatcher = AlertDispatcher::new();
        let alerting = &config.alerting;
        if alerting.console.enabled {
            dispatcher.add_sink(Box::new(ConsoleSink::new(alerting.console.colored)));
        }
        if alerting.email.enabled {
            let sink = EmailSink::new(&alerting.email, alerting.timeout())
                .map_err(|e| ConfigError::Invalid(format!("alerting.email: {}", e)))?;
            dispatcher.add_sink(Box::new(sink));
        }
        if alerting.slack.enabled {
            let sink = SlackSink::new(alerting.slack.webhook_url.clone(), alerting.timeout())
                .map_err(|e| ConfigError::Invalid(format!("alerting.slack: {}", e)))?;
            dispatcher.add_sink(Box::new(sink));
        }
        let sinks = dispatcher.sink_names();
        if sinks.is_empty() {
            warn!("no alert sinks enabled, alerts will only be kept in history");
        } else {
            debug!(sinks = ?sinks, "alert sinks configured");
        }

        Ok(Self::new(
            config.log_sources.clone(),
            analyzer,
            batcher,
            dispatcher,
            config.analysis.interval(),
        ))
    }

    pub fn history(&self) -> &AlertHistory {
        &self.history
    }

    pub fn tailer(&self) -> &Tailer {
        &self.tailer
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.dispatcher.sink_names()
    }

    fn find_source(&self, name: &str) -> Result<&LogSource, MonitorError> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| MonitorError::UnknownSource(name.to_string()))
    }

    /// Snapshot of the last `count` lines of one source
    pub fn recent_lines(&mut self, source_name: &str, count: usize) -> Result<Vec<LogLine>, MonitorError> {
        let source = self.find_source(source_name)?.clone();
        Ok(self.tailer.read_last_n(&source, count))
    }

    /// One pipeline pass over the last `line_count` lines of one source, or of
    /// every enabled source when `source_name` is None
    pub async fn analyze(&mut self, source_name: Option<&str>, line_count: usize) -> Result<CycleReport, MonitorError> {
        let targets = match source_name {
            Some(name) => vec![self.find_source(name)?.clone()],
            None => self.enabled_sources(),
        };
        Ok(self.analyze_sources(&targets, line_count).await)
    }

    /// Single-pass mode over every enabled source
    pub async fn run_once(&mut self, line_count: usize) -> CycleReport {
        let targets = self.enabled_sources();
        let report = self.analyze_sources(&targets, line_count).await;
        if report.lines == 0 {
            info!("no log lines to analyze");
        } else if report.alerts.is_empty() {
            info!(lines = report.lines, "no alert-worthy activity found");
        }
        report
    }

    fn enabled_sources(&self) -> Vec<LogSource> {
        self.sources.iter().filter(|s| s.enabled).cloned().collect()
    }

    async fn analyze_sources(&mut self, targets: &[LogSource], line_count: usize) -> CycleReport {
        let mut entries = Vec::new();
        for source in targets {
            let lines = self.tailer.read_last_n(source, line_count);
            info!(source = %source.name, lines = lines.len(), "read recent lines");
            entries.extend(lines);
        }
        self.analyze_entries(entries).await
    }

    // classify everything, then one dispatch for the whole pass
    async fn analyze_entries(&mut self, entries: Vec<LogLine>) -> CycleReport {
        let mut report = CycleReport {
            lines: entries.len(),
            ..Default::default()
        };
        if entries.is_empty() {
            return report;
        }

        info!(lines = entries.len(), batch_size = self.batcher.size(), "analyzing");
        report.alerts = self.analyzer.classify_batches(&entries, &self.batcher).await;
        if !report.alerts.is_empty() {
            report.dispatches.push(self.deliver(&report.alerts).await);
        }
        report
    }

    /// One continuous-mode cycle: new lines only, each batch dispatched as soon
    /// as it is classified
    pub async fn run_cycle(&mut self) -> CycleReport {
        let entries = self.tailer.poll_all(&self.sources);
        let mut report = CycleReport {
            lines: entries.len(),
            ..Default::default()
        };
        if entries.is_empty() {
            debug!("no new log lines");
            return report;
        }
        info!(lines = entries.len(), "new log lines detected");

        let batcher = self.batcher;
        for batch in batcher.split(&entries) {
            let alerts = self.analyzer.filter_by_severity(self.analyzer.classify(batch).await);
            if alerts.is_empty() {
                continue;
            }
            report.dispatches.push(self.deliver(&alerts).await);
            report.alerts.extend(alerts);
        }
        report
    }

    async fn deliver(&mut self, alerts: &[Alert]) -> DispatchResult {
        let result = self.dispatcher.dispatch_all(alerts).await;
        self.history.record(alerts);

        let failed: Vec<&str> = result.failed().collect();
        if failed.is_empty() {
            info!(alerts = alerts.len(), sinks = result.len(), "alerts dispatched");
        } else {
            warn!(alerts = alerts.len(), failed = ?failed, "alerts dispatched with sink failures");
        }
        result
    }

    /// Continuous mode. Cancellation is honoured between cycles: a cycle in
    /// flight always completes, the sleep after it does not.
    pub async fn run(&mut self, cancel: CancellationToken) {
        self.tailer.initialize_positions(&self.sources);

        let names: Vec<&str> = self.sources.iter().filter(|s| s.enabled).map(|s| s.name.as_str()).collect();
        info!(interval_secs = self.interval.as_secs(), sources = ?names, "starting log monitoring");

        while !cancel.is_cancelled() {
            self.run_cycle().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("log monitoring stopped");
    }
}
