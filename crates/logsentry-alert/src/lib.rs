//! LogSentry alerting: config loading, alert sinks, dispatch and the monitor loop

pub mod config;
pub mod console;
pub mod dispatcher;
pub mod email;
pub mod history;
pub mod runner;
pub mod sink;
pub mod slack;

pub use config::{load_config, AppConfig, ConfigError};
pub use console::ConsoleSink;
pub use dispatcher::{AlertDispatcher, DispatchResult};
pub use email::EmailSink;
pub use history::AlertHistory;
pub use runner::{CycleReport, Monitor, MonitorError};
pub use sink::{AlertSink, SinkError};
pub use slack::SlackSink;
