//! Terminal report sink

use async_trait::async_trait;
use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use logsentry_core::{Alert, Severity};
use std::io::Write;

use crate::sink::{AlertSink, SinkError, truncate};

const RULE_WIDTH: usize = 60;
const LOG_EXCERPT_CHARS: usize = 100;

pub struct ConsoleSink {
    colored: bool,
}

impl ConsoleSink {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn paint(&self, text: &str, severity: Option<Severity>) -> String {
        if !self.colored {
            return text.to_string();
        }
        let painted: ColoredString = match severity {
            Some(Severity::Critical) => text.red().bold(),
            Some(Severity::Error) => text.red(),
            Some(Severity::Warning) => text.yellow(),
            Some(Severity::Info) => text.blue(),
            None => text.bold(),
        };
        painted.to_string()
    }

    /// Full report for one dispatch
    pub fn render(&self, alerts: &[Alert], at: DateTime<Local>) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();

        out.push_str(&format!("\n{}\n", rule));
        out.push_str(&self.paint(&format!("  LOG ALERTS - {}", at.format("%Y-%m-%d %H:%M:%S")), None));
        out.push_str(&format!("\n{}\n\n", rule));

        for alert in alerts {
            let tag = format!("[{}]", alert.severity.as_str().to_uppercase());
            out.push_str(&format!(
                "{} {}\n",
                self.paint(&tag, Some(alert.severity)),
                self.paint(&alert.summary, None)
            ));
            out.push_str(&format!("   Source: {} ({})\n", alert.source_name, alert.source_type));
            out.push_str(&format!("   Details: {}\n", alert.details));
            out.push_str(&format!("   Log: {}\n", truncate(&alert.log_line, LOG_EXCERPT_CHARS)));
            out.push_str(&format!("   Recommendation: {}\n\n", alert.recommendation));
        }

        out.push_str(&format!("{}\n  Total: {} alert(s)\n{}\n", rule, alerts.len(), rule));
        out
    }
}

#[async_trait]
impl AlertSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, alerts: &[Alert]) -> Result<(), SinkError> {
        if alerts.is_empty() {
            return Ok(());
        }
        let report = self.render(alerts, Local::now());
        write_stdout(&report)?;
        Ok(())
    }
}

fn write_stdout(report: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(report.as_bytes())?;
    stdout.flush()
}
