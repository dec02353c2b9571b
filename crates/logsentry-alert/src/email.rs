//! Email sink: multipart plaintext + HTML report over STARTTLS SMTP

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use logsentry_core::{Alert, Severity};
use std::time::Duration;
use tracing::info;

use crate::config::EmailConfig;
use crate::sink::{AlertSink, SinkError};

pub struct EmailSink {
    // pooled, reused across dispatches
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailSink {
    // addresses are parsed up front so a typo fails at startup, not at first alert
    pub fn new(config: &EmailConfig, timeout: Duration) -> Result<Self, SinkError> {
        let from = parse_mailbox(&config.from_addr)?;
        let to = config
            .to_addrs
            .iter()
            .map(|a| parse_mailbox(a))
            .collect::<Result<Vec<_>, _>>()?;

        // no connection is made until the first send
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .timeout(Some(timeout))
            .build();

        Ok(Self { transport, from, to })
    }

    pub fn subject(alerts: &[Alert]) -> String {
        format!("[LOG ALERT] {} new alert(s) detected", alerts.len())
    }

    pub fn render_text(alerts: &[Alert]) -> String {
        let mut body = String::from("Log Alert Report\n\n");
        for alert in alerts {
            body.push_str(&format!("[{}] {}\n", alert.severity.as_str().to_uppercase(), alert.summary));
            body.push_str(&format!("Source: {} ({})\n", alert.source_name, alert.source_type));
            body.push_str(&format!("Details: {}\n", alert.details));
            body.push_str(&format!("Recommendation: {}\n\n", alert.recommendation));
        }
        body
    }

    pub fn render_html(alerts: &[Alert], at: DateTime<Local>) -> String {
        let mut html = format!(
            r#"<html>
<head>
<style>
  body {{ font-family: Arial, sans-serif; }}
  .alert {{ border-left: 4px solid; padding: 10px; margin: 10px 0; background: #f8f9fa; }}
  .severity {{ font-weight: bold; padding: 2px 8px; border-radius: 3px; color: white; }}
  .log-line {{ font-family: monospace; background: #e9ecef; padding: 5px; font-size: 12px; }}
</style>
</head>
<body>
<h2>Log Alert Report</h2>
<p><strong>Time:</strong> {}</p>
<p><strong>Total alerts:</strong> {}</p>
<hr>
"#,
            at.format("%Y-%m-%d %H:%M:%S"),
            alerts.len()
        );

        for alert in alerts {
            let color = severity_color(alert.severity);
            html.push_str(&format!(
                r#"<div class="alert {sev}" style="border-color: {color};">
  <span class="severity" style="background: {color};">{tag}</span>
  <strong>{summary}</strong>
  <p><strong>Source:</strong> {source} ({kind})</p>
  <p><strong>Details:</strong> {details}</p>
  <div class="log-line">{log_line}</div>
  <p><strong>Recommendation:</strong> {recommendation}</p>
</div>
"#,
                sev = alert.severity.as_str(),
                color = color,
                tag = alert.severity.as_str().to_uppercase(),
                summary = escape_html(&alert.summary),
                source = escape_html(&alert.source_name),
                kind = escape_html(&alert.source_type),
                details = escape_html(&alert.details),
                log_line = escape_html(&alert.log_line),
                recommendation = escape_html(&alert.recommendation),
            ));
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    pub fn build_message(&self, alerts: &[Alert]) -> Result<Message, SinkError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(Self::subject(alerts));
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        builder
            .multipart(MultiPart::alternative_plain_html(
                Self::render_text(alerts),
                Self::render_html(alerts, Local::now()),
            ))
            .map_err(|e| SinkError::Message(e.to_string()))
    }
}

#[async_trait]
impl AlertSink for EmailSink {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, alerts: &[Alert]) -> Result<(), SinkError> {
        if alerts.is_empty() {
            return Ok(());
        }
        let message = self.build_message(alerts)?;
        self.transport.send(message).await?;
        info!(alerts = alerts.len(), recipients = self.to.len(), "alert email sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SinkError> {
    address.trim().parse::<Mailbox>().map_err(|e| SinkError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::Error => "#dc3545",
        Severity::Warning => "#ffc107",
        Severity::Info => "#17a2b8",
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
