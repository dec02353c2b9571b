// Log analyzer
// Orchestrates: batch -> prompt -> LLM -> structured payload -> alerts -> severity filter

use logsentry_core::{Alert, Batcher, LogLine, Severity};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::extract::extract_json;
use crate::llm_client::{CompletionRequest, LlmClient};

/// Low temperature keeps classifications repeatable
pub const TEMPERATURE: f32 = 0.1;

// attribution used when the echoed log line matches nothing in the batch
pub const FALLBACK_SOURCE_NAME: &str = "demo";
pub const FALLBACK_SOURCE_TYPE: &str = "application";

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a system security and log analysis expert. Always answer in the requested JSON format.";

pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Analyze the following log lines and report anything that needs attention:
errors, failures, security events, resource exhaustion, repeated warnings.

Respond with JSON only, using this shape:
{
  "has_issues": true,
  "alerts": [
    {
      "severity": "info | warning | error | critical",
      "summary": "one line summary",
      "details": "what happened",
      "log_line": "the exact log line text",
      "recommendation": "what to do next"
    }
  ]
}
If nothing is wrong, respond with {"has_issues": false, "alerts": []}.

LOGS:
{logs}"#;

const LOGS_PLACEHOLDER: &str = "{logs}";

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub prompt_template: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub severity_threshold: Severity,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 500,
            severity_threshold: Severity::Warning,
        }
    }
}

// expected payload: {"has_issues": bool, "alerts": [...]}
#[derive(Debug, Deserialize)]
struct ClassificationPayload {
    #[serde(default)]
    has_issues: Option<bool>,
    #[serde(default)]
    alerts: Option<Vec<RawAlert>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAlert {
    severity: Option<String>,
    summary: Option<String>,
    details: Option<String>,
    log_line: Option<String>,
    recommendation: Option<String>,
}

pub struct LogAnalyzer {
    client: Arc<dyn LlmClient>,
    config: AnalyzerConfig,
}

impl LogAnalyzer {
    pub fn new(client: Arc<dyn LlmClient>, config: AnalyzerConfig) -> Self {
        Self { client, config }
    }

    pub fn severity_threshold(&self) -> Severity {
        self.config.severity_threshold
    }

    /// Fill the template with the batch transcript, one `[source:line] text` per line
    pub fn build_prompt(&self, batch: &[LogLine]) -> String {
        let transcript = batch.iter().map(LogLine::render).collect::<Vec<_>>().join("\n");
        if self.config.prompt_template.contains(LOGS_PLACEHOLDER) {
            self.config.prompt_template.replace(LOGS_PLACEHOLDER, &transcript)
        } else {
            format!("{}\n\n{}", self.config.prompt_template, transcript)
        }
    }

    /// Classify one batch. Transport errors and unusable responses yield no alerts.
    pub async fn classify(&self, batch: &[LogLine]) -> Vec<Alert> {
        if batch.is_empty() {
            return Vec::new();
        }

        let request = CompletionRequest {
            instructions: self.config.system_prompt.clone(),
            user_content: self.build_prompt(batch),
            max_output_tokens: self.config.max_tokens,
            temperature: TEMPERATURE,
        };

        match self.client.generate(&request).await {
            Ok(text) => parse_response(&text, batch),
            Err(e) => {
                warn!(
                    provider = self.client.provider(),
                    model = self.client.model(),
                    lines = batch.len(),
                    error = %e,
                    "classification request failed"
                );
                Vec::new()
            }
        }
    }

    // drop anything ranked below the configured threshold, order kept
    pub fn filter_by_severity(&self, alerts: Vec<Alert>) -> Vec<Alert> {
        let threshold = self.config.severity_threshold.rank();
        alerts.into_iter().filter(|a| a.severity.rank() >= threshold).collect()
    }

    /// Classify every batch in order and concatenate the filtered alerts
    pub async fn classify_batches(&self, entries: &[LogLine], batcher: &Batcher) -> Vec<Alert> {
        let mut all = Vec::new();
        for (index, batch) in batcher.split(entries).enumerate() {
            let alerts = self.filter_by_severity(self.classify(batch).await);
            debug!(batch = index, lines = batch.len(), alerts = alerts.len(), "batch classified");
            all.extend(alerts);
        }
        all
    }
}

/// Turn raw model output into alerts attributed to lines of `batch`
pub fn parse_response(text: &str, batch: &[LogLine]) -> Vec<Alert> {
    let Some(json) = extract_json(text) else {
        warn!(response_len = text.len(), "no structured payload in model response");
        return Vec::new();
    };

    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "model response payload is not valid JSON");
            return Vec::new();
        }
    };
    if !value.is_object() {
        warn!("model response payload is not a JSON object");
        return Vec::new();
    }

    let payload: ClassificationPayload = match serde_json::from_value(value) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "model response payload has unexpected shape");
            return Vec::new();
        }
    };

    if !payload.has_issues.unwrap_or(false) {
        debug!("has_issues is false, no alerts");
        return Vec::new();
    }

    let alerts: Vec<Alert> = payload
        .alerts
        .unwrap_or_default()
        .into_iter()
        .map(|raw| build_alert(raw, batch))
        .collect();

    info!(alerts = alerts.len(), "parsed alerts from model response");
    alerts
}

fn build_alert(raw: RawAlert, batch: &[LogLine]) -> Alert {
    let log_line = raw.log_line.unwrap_or_default();

    // same text in several sources: the last occurrence in the batch wins
    let (source_name, source_type) = match batch.iter().rev().find(|l| l.text == log_line) {
        Some(line) => (line.source_name.clone(), line.source_type.clone()),
        None => {
            debug!(log_line = %log_line, "echoed log line matches no input line, using fallback source");
            (FALLBACK_SOURCE_NAME.to_string(), FALLBACK_SOURCE_TYPE.to_string())
        }
    };

    let severity = match raw.severity.as_deref() {
        Some(s) => Severity::parse(s).unwrap_or_else(|| {
            debug!(severity = s, "unknown severity, treating as info");
            Severity::Info
        }),
        None => Severity::Info,
    };

    Alert {
        severity,
        summary: raw.summary.unwrap_or_default(),
        details: raw.details.unwrap_or_default(),
        log_line,
        recommendation: raw.recommendation.unwrap_or_default(),
        source_name,
        source_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(source: &str, kind: &str, text: &str, n: u64) -> LogLine {
        LogLine {
            source_name: source.to_string(),
            source_type: kind.to_string(),
            text: text.to_string(),
            line_number: n,
        }
    }

    #[test]
    fn test_has_issues_false_yields_nothing() {
        let batch = vec![line("auth", "security", "Failed password for root", 1)];
        assert!(parse_response(r#"{"has_issues": false}"#, &batch).is_empty());
    }

    #[test]
    fn test_missing_has_issues_yields_nothing() {
        let batch = vec![line("auth", "security", "x", 1)];
        assert!(parse_response(r#"{"alerts": [{"severity": "critical"}]}"#, &batch).is_empty());
    }

    #[test]
    fn test_alert_attributed_to_matching_line() {
        let batch = vec![
            line("nginx", "web", "GET / 200", 1),
            line("auth", "security", "Failed password for root from 10.0.0.1", 2),
        ];
        let text = r#"```json
{"has_issues": true, "alerts": [{"severity": "critical", "log_line": "Failed password for root from 10.0.0.1", "summary": "S", "details": "D", "recommendation": "R"}]}
```"#;
        let alerts = parse_response(text, &batch);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].source_name, "auth");
        assert_eq!(alerts[0].source_type, "security");
        assert_eq!(alerts[0].summary, "S");
        assert_eq!(alerts[0].details, "D");
        assert_eq!(alerts[0].recommendation, "R");
    }

    #[test]
    fn test_duplicate_text_attributed_to_last_source() {
        let batch = vec![
            line("nginx", "web", "Connection refused", 1),
            line("auth", "security", "Connection refused", 1),
        ];
        let text = r#"{"has_issues": true, "alerts": [{"severity": "error", "log_line": "Connection refused"}]}"#;
        let alerts = parse_response(text, &batch);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].source_name, "auth");
        assert_eq!(alerts[0].source_type, "security");
    }

    #[test]
    fn test_unmatched_line_falls_back() {
        let batch = vec![line("nginx", "web", "GET / 200", 1)];
        let text = r#"{"has_issues": true, "alerts": [{"severity": "error", "log_line": "paraphrased line"}]}"#;
        let alerts = parse_response(text, &batch);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].source_name, FALLBACK_SOURCE_NAME);
        assert_eq!(alerts[0].source_type, FALLBACK_SOURCE_TYPE);
        assert_eq!(alerts[0].summary, "");
    }

    #[test]
    fn test_garbage_and_non_objects_yield_nothing() {
        let batch = vec![line("a", "b", "c", 1)];
        assert!(parse_response("I could not analyze these logs.", &batch).is_empty());
        assert!(parse_response("{ this is not json }", &batch).is_empty());
        assert!(parse_response("```json\n[true, []]\n```", &batch).is_empty());
        assert!(parse_response(r#"{"has_issues": "yes"}"#, &batch).is_empty());
    }

    #[test]
    fn test_unknown_severity_is_info() {
        let batch = vec![line("a", "b", "c", 1)];
        let text = r#"{"has_issues": true, "alerts": [{"severity": "urgent", "log_line": "c"}, {"log_line": "c"}]}"#;
        let alerts = parse_response(text, &batch);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == Severity::Info));
    }
}
