//! Slack webhook integration

use async_trait::async_trait;
use chrono::Utc;
use logsentry_core::{Alert, Severity};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::sink::{AlertSink, SinkError, truncate};

// Slack sink posting one message per dispatch
pub struct SlackSink {
    client: Client,
    webhook_url: String,
}

// slack message payload
#[derive(Debug, Serialize)]
pub struct SlackMessage {
    text: String,
    attachments: Vec<SlackAttachment>,
}

// slack attachment (colored sidebar with details)
#[derive(Debug, Serialize)]
struct SlackAttachment {
    color: String,
    title: String,
    text: String,
    fields: Vec<SlackField>,
    footer: String,
    ts: i64,
}

// slack field (key value in attachment)
#[derive(Debug, Serialize)]
struct SlackField {
    title: String,
    value: String,
    short: bool,
}

impl SlackSink {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            webhook_url: webhook_url.into(),
        })
    }

    // Build Slack message from a batch of alerts
    pub fn build_message(alerts: &[Alert]) -> SlackMessage {
        let worst = alerts.iter().map(|a| a.severity).max().unwrap_or_default();
        let ts = Utc::now().timestamp();

        SlackMessage {
            text: format!("{} {} log alert(s) detected", severity_emoji(worst), alerts.len()),
            attachments: alerts
                .iter()
                .map(|alert| SlackAttachment {
                    color: severity_to_color(alert.severity).to_string(),
                    title: alert.summary.clone(),
                    text: format!("{}\n```{}```", alert.details, truncate(&alert.log_line, 300)),
                    fields: vec![
                        SlackField {
                            title: "Source".to_string(),
                            value: format!("{} ({})", alert.source_name, alert.source_type),
                            short: true,
                        },
                        SlackField {
                            title: "Severity".to_string(),
                            value: alert.severity.to_string(),
                            short: true,
                        },
                        SlackField {
                            title: "Recommendation".to_string(),
                            value: alert.recommendation.clone(),
                            short: false,
                        },
                    ],
                    footer: "LogSentry".to_string(),
                    ts,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl AlertSink for SlackSink {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, alerts: &[Alert]) -> Result<(), SinkError> {
        if alerts.is_empty() {
            return Ok(());
        }
        let message = Self::build_message(alerts);

        let response = self.client.post(&self.webhook_url).json(&message).send().await?;

        // Check response
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::Error => "🚨",
        Severity::Warning => "⚠️",
        Severity::Info => "ℹ️",
    }
}

// Convert severity to slack color
fn severity_to_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::Error => "danger",
        Severity::Warning => "warning",
        Severity::Info => "good",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(severity: Severity) -> Alert {
        Alert {
            severity,
            summary: "Brute force attempt".to_string(),
            details: "50 failed logins in a minute".to_string(),
            log_line: "Failed password for root from 10.0.0.1".to_string(),
            recommendation: "Block 10.0.0.1".to_string(),
            source_name: "auth".to_string(),
            source_type: "security".to_string(),
        }
    }

    #[test]
    fn test_message_shape() {
        let message = SlackSink::build_message(&[alert(Severity::Warning), alert(Severity::Critical)]);
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["text"], "🚨 2 log alert(s) detected");
        assert_eq!(json["attachments"].as_array().unwrap().len(), 2);
        assert_eq!(json["attachments"][0]["color"], "warning");
        assert_eq!(json["attachments"][1]["color"], "danger");
        assert_eq!(json["attachments"][0]["fields"][0]["value"], "auth (security)");
        assert_eq!(json["attachments"][0]["fields"][1]["value"], "warning");
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_an_error() {
        let sink = SlackSink::new("http://127.0.0.1:9/hook", Duration::from_millis(500)).unwrap();
        let result = sink.send(&[alert(Severity::Error)]).await;
        assert!(matches!(result, Err(SinkError::Http(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        // unroutable url: any request would fail
        let sink = SlackSink::new("http://127.0.0.1:9/hook", Duration::from_millis(200)).unwrap();
        assert!(sink.send(&[]).await.is_ok());
    }
}
