//! Configuration loading for the log sentry

use logsentry_core::{LogSource, Severity};
use logsentry_llm::analyzer::DEFAULT_PROMPT_TEMPLATE;
use logsentry_llm::{LlmProvider, LlmSettings};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/logsentry.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// Main config structure
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSettings,

    // sources to tail, in polling order
    #[serde(default)]
    pub log_sources: Vec<LogSource>,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    // must contain {logs}
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,

    #[serde(default)]
    pub alerting: AlertingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    // pause between polls in continuous mode
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    // one of info, warning, error, critical; checked by validate()
    #[serde(default = "default_threshold")]
    pub severity_threshold: String,

    // lines per source read by the single-pass mode
    #[serde(default = "default_once_line_count")]
    pub once_line_count: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            interval_seconds: default_interval_seconds(),
            severity_threshold: default_threshold(),
            once_line_count: default_once_line_count(),
        }
    }
}

impl AnalysisConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Parsed threshold. Falls back to warning, which validate() rules out.
    pub fn threshold(&self) -> Severity {
        Severity::parse(&self.severity_threshold).unwrap_or(Severity::Warning)
    }
}

#[derive(Debug, Deserialize)]
pub struct AlertingConfig {
    // per-delivery limit for the network sinks
    #[serde(default = "default_sink_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub console: ConsoleConfig,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub slack: SlackConfig,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_sink_timeout_seconds(),
            console: ConsoleConfig::default(),
            email: EmailConfig::default(),
            slack: SlackConfig::default(),
        }
    }
}

impl AlertingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

// SMTP submission settings
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub from_addr: String,

    #[serde(default)]
    pub to_addrs: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_addr: String::new(),
            to_addrs: Vec::new(),
        }
    }
}

// Slack webhook config
#[derive(Debug, Default, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub webhook_url: String,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// default value helpers for serde
fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    50
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_threshold() -> String {
    "warning".to_string()
}

fn default_sink_timeout_seconds() -> u64 {
    30
}

fn default_once_line_count() -> usize {
    100
}

fn default_smtp_port() -> u16 {
    587
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.to_string()
}

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env reference pattern"));

/// Replace every `${VAR}` with `lookup(VAR)`, unknown variables become ""
pub fn substitute_env(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_REF
        .replace_all(value, |caps: &regex::Captures| lookup(&caps[1]).unwrap_or_default())
        .into_owned()
}

// walk every string in the parsed document
fn resolve_env_vars(value: &mut toml::Value, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        toml::Value::String(s) => *s = substitute_env(s, lookup),
        toml::Value::Array(items) => items.iter_mut().for_each(|v| resolve_env_vars(v, lookup)),
        toml::Value::Table(table) => table.iter_mut().for_each(|(_, v)| resolve_env_vars(v, lookup)),
        _ => {}
    }
}

/// Parse and validate config text, resolving `${VAR}` through `lookup`
pub fn parse_config(content: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<AppConfig, ConfigError> {
    let table: toml::Table = content.parse()?;
    let mut value = toml::Value::Table(table);
    resolve_env_vars(&mut value, lookup);

    let config: AppConfig = value.try_into()?;
    config.validate()?;
    Ok(config)
}

// Load configuration from a TOML file, env vars taken from the process
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, &|name| std::env::var(name).ok())
}

impl AppConfig {
    pub fn enabled_sources(&self) -> impl Iterator<Item = &LogSource> {
        self.log_sources.iter().filter(|s| s.enabled)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.analysis.batch_size == 0 {
            return invalid("analysis.batch_size must be greater than 0".to_string());
        }
        if self.analysis.interval_seconds == 0 {
            return invalid("analysis.interval_seconds must be greater than 0".to_string());
        }
        if Severity::parse(&self.analysis.severity_threshold).is_none() {
            return invalid(format!(
                "analysis.severity_threshold '{}' is not one of info, warning, error, critical",
                self.analysis.severity_threshold
            ));
        }

        if self.log_sources.is_empty() {
            return invalid("at least one [[log_sources]] entry is required".to_string());
        }
        let mut names = HashSet::new();
        for source in &self.log_sources {
            if source.name.trim().is_empty() {
                return invalid(format!("log source at {} has an empty name", source.path.display()));
            }
            if !names.insert(source.name.as_str()) {
                return invalid(format!("duplicate log source name '{}'", source.name));
            }
        }

        if self.llm.provider == LlmProvider::OpenAi && self.llm.api_key.trim().is_empty() {
            return invalid("llm.api_key is required for the openai provider".to_string());
        }
        if self.llm.timeout_seconds == 0 {
            return invalid("llm.timeout_seconds must be greater than 0".to_string());
        }

        if self.alerting.timeout_seconds == 0 {
            return invalid("alerting.timeout_seconds must be greater than 0".to_string());
        }

        let email = &self.alerting.email;
        if email.enabled {
            for (field, value) in [
                ("smtp_host", &email.smtp_host),
                ("username", &email.username),
                ("password", &email.password),
                ("from_addr", &email.from_addr),
            ] {
                if value.trim().is_empty() {
                    return invalid(format!("alerting.email.{} is required when email is enabled", field));
                }
            }
            if email.to_addrs.is_empty() {
                return invalid("alerting.email.to_addrs needs at least one recipient".to_string());
            }
        }

        if self.alerting.slack.enabled && self.alerting.slack.webhook_url.trim().is_empty() {
            return invalid("alerting.slack.webhook_url is required when slack is enabled".to_string());
        }

        Ok(())
    }
}
