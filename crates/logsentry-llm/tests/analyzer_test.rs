use async_trait::async_trait;
use logsentry_core::{Alert, Batcher, LogLine, Severity};
use logsentry_llm::analyzer::{AnalyzerConfig, LogAnalyzer, TEMPERATURE};
use logsentry_llm::{CompletionRequest, LlmClient, LlmError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// scripted oracle: pops one reply per call and records every request
struct MockOracle {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockOracle {
    fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockOracle {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(r#"{"has_issues": false}"#.to_string()))
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn provider(&self) -> &str {
        "mock"
    }
}

fn line(source: &str, text: &str, n: u64) -> LogLine {
    LogLine {
        source_name: source.to_string(),
        source_type: "application".to_string(),
        text: text.to_string(),
        line_number: n,
    }
}

fn analyzer(oracle: Arc<MockOracle>, threshold: Severity) -> LogAnalyzer {
    let config = AnalyzerConfig {
        prompt_template: "Check these:\n{logs}".to_string(),
        severity_threshold: threshold,
        ..Default::default()
    };
    LogAnalyzer::new(oracle, config)
}

fn alert(severity: Severity) -> Alert {
    Alert {
        severity,
        summary: severity.to_string(),
        details: String::new(),
        log_line: String::new(),
        recommendation: String::new(),
        source_name: "app".to_string(),
        source_type: "application".to_string(),
    }
}

#[tokio::test]
async fn test_empty_input_never_calls_oracle() {
    let oracle = MockOracle::new(vec![]);
    let analyzer = analyzer(oracle.clone(), Severity::Warning);

    let alerts = analyzer.classify_batches(&[], &Batcher::new(10).unwrap()).await;
    assert!(alerts.is_empty());
    assert!(analyzer.classify(&[]).await.is_empty());
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_request_carries_transcript_and_low_temperature() {
    let oracle = MockOracle::new(vec![Ok(r#"{"has_issues": false}"#.to_string())]);
    let analyzer = analyzer(oracle.clone(), Severity::Warning);

    let batch = vec![line("nginx", "GET / 502", 4), line("auth", "login ok", 9)];
    assert!(analyzer.classify(&batch).await.is_empty());

    let requests = oracle.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_content, "Check these:\n[nginx:4] GET / 502\n[auth:9] login ok");
    assert_eq!(requests[0].temperature, TEMPERATURE);
    assert_eq!(requests[0].max_output_tokens, 500);
}

#[tokio::test]
async fn test_classify_attributes_critical_alert() {
    let reply = r#"{"has_issues": true, "alerts": [{"severity":"critical","log_line":"disk full on /var","summary":"S","details":"D","recommendation":"R"}]}"#;
    let oracle = MockOracle::new(vec![Ok(reply.to_string())]);
    let analyzer = analyzer(oracle, Severity::Warning);

    let batch = vec![line("nginx", "GET / 200", 1), line("system", "disk full on /var", 2)];
    let alerts = analyzer.classify(&batch).await;

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Critical);
    assert_eq!(alerts[0].source_name, "system");
    assert_eq!(alerts[0].log_line, "disk full on /var");
}

#[tokio::test]
async fn test_transport_error_is_no_alerts() {
    let oracle = MockOracle::new(vec![Err(LlmError::EmptyResponse)]);
    let analyzer = analyzer(oracle, Severity::Info);

    assert!(analyzer.classify(&[line("a", "b", 1)]).await.is_empty());
}

#[test]
fn test_filter_keeps_error_and_above_in_order() {
    let oracle = MockOracle::new(vec![]);
    let analyzer = analyzer(oracle, Severity::Error);

    let input = vec![
        alert(Severity::Info),
        alert(Severity::Warning),
        alert(Severity::Error),
        alert(Severity::Critical),
    ];
    let kept: Vec<Severity> = analyzer.filter_by_severity(input).into_iter().map(|a| a.severity).collect();
    assert_eq!(kept, vec![Severity::Error, Severity::Critical]);
}

#[tokio::test]
async fn test_failed_batch_does_not_stop_later_batches() {
    let second = r#"{"has_issues": true, "alerts": [{"severity":"error","log_line":"c"}]}"#;
    let third = r#"```json
{"has_issues": true, "alerts": [{"severity":"info","log_line":"e"}, {"severity":"warning","log_line":"f"}]}
```"#;
    let oracle = MockOracle::new(vec![
        Err(LlmError::ApiError {
            status: 503,
            body: "overloaded".to_string(),
        }),
        Ok(second.to_string()),
        Ok(third.to_string()),
    ]);
    let analyzer = analyzer(oracle.clone(), Severity::Warning);

    let entries: Vec<LogLine> = ["a", "b", "c", "d", "e", "f"]
        .iter()
        .enumerate()
        .map(|(i, t)| line("app", t, i as u64 + 1))
        .collect();
    let alerts = analyzer.classify_batches(&entries, &Batcher::new(2).unwrap()).await;

    assert_eq!(oracle.calls(), 3);
    let lines: Vec<&str> = alerts.iter().map(|a| a.log_line.as_str()).collect();
    assert_eq!(lines, vec!["c", "f"]);
}
