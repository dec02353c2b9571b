// LogSentry CLI - LLM-assisted log monitoring

mod logging;

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use logsentry_alert::config::{load_config, AppConfig, DEFAULT_CONFIG_PATH};
use logsentry_alert::{AlertHistory, CycleReport, Monitor};
use logsentry_core::{Alert, Severity};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

// rows shown in the watch-mode recap
const HISTORY_RECAP: usize = 10;

#[derive(Parser)]
#[command(name = "logsentry")]
#[command(version = "0.1.0")]
#[command(about = "Watch log files and raise alerts classified by an LLM", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, env = "LOGSENTRY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the last lines of every enabled source once and exit
    Once {
        /// Lines to read per source (default: analysis.once_line_count)
        #[arg(short, long)]
        lines: Option<usize>,
    },

    /// Follow every enabled source until interrupted
    Watch,

    /// List configured log sources
    Sources,

    /// Print the most recent lines of one source
    Lines {
        /// Source name as configured
        source: String,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
    },

    /// Run one analysis pass and print the alerts
    Analyze {
        /// Only this source (default: all enabled)
        #[arg(short, long)]
        source: Option<String>,

        /// Lines to read per source
        #[arg(short, long, default_value = "100")]
        lines: usize,

        /// Print alerts as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Config error:".red().bold(), e);
            return ExitCode::from(2);
        }
    };
    logging::init(&config.logging.level, cli.verbose);

    // listing sources needs no oracle or sinks
    if let Commands::Sources = cli.command {
        show_sources(&config);
        return ExitCode::SUCCESS;
    }

    // keep stdout pure JSON
    if let Commands::Analyze { json: true, .. } = cli.command {
        config.alerting.console.enabled = false;
    }

    let mut monitor = match Monitor::from_config(&config) {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("{} {}", "Config error:".red().bold(), e);
            return ExitCode::from(2);
        }
    };

    match run(cli.command, &config, &mut monitor).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "logsentry failed");
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config: &AppConfig,
    monitor: &mut Monitor,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Commands::Once { lines } => {
            let count = lines.unwrap_or(config.analysis.once_line_count);
            let report = monitor.run_once(count).await;
            print_summary(&report);
            // non-zero when something was found, for cron and CI wrappers
            if !report.alerts.is_empty() {
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Watch => {
            let cancel = CancellationToken::new();
            tokio::spawn(shutdown_on_signal(cancel.clone()));
            info!(sinks = ?monitor.sink_names(), "alert sinks");
            monitor.run(cancel).await;
            show_history(monitor.history());
        }
        Commands::Lines { source, count } => {
            let lines = monitor.recent_lines(&source, count)?;
            if lines.is_empty() {
                println!("{}", "No lines.".yellow());
            }
            for line in &lines {
                println!("{} {}", format!("{:>6}", line.line_number).dimmed(), line.text);
            }
        }
        Commands::Analyze { source, lines, json } => {
            let report = monitor.analyze(source.as_deref(), lines).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.alerts)?);
            } else {
                show_alerts(&report.alerts);
                print_summary(&report);
            }
        }
        Commands::Sources => show_sources(config),
    }

    Ok(ExitCode::SUCCESS)
}

// cancel on Ctrl-C or SIGTERM
async fn shutdown_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!(signal = "SIGINT", "shutdown requested"),
                    _ = sigterm.recv() => info!(signal = "SIGTERM", "shutdown requested"),
                }
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler, only Ctrl-C will stop monitoring");
                let _ = tokio::signal::ctrl_c().await;
                info!(signal = "SIGINT", "shutdown requested");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!(signal = "ctrl-c", "shutdown requested");
    }

    cancel.cancel();
}

fn show_sources(config: &AppConfig) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Name", "Type", "Path", "Enabled", "Exists"]);

    for source in &config.log_sources {
        let enabled = if source.enabled {
            "yes".green().to_string()
        } else {
            "no".dimmed().to_string()
        };
        let exists = if source.path.exists() {
            "yes".green().to_string()
        } else {
            "missing".red().to_string()
        };
        table.add_row(vec![
            source.name.clone(),
            source.source_type.clone(),
            source.path.display().to_string(),
            enabled,
            exists,
        ]);
    }

    println!("{table}");
    println!(
        "{} {}/{}",
        "Enabled:".dimmed(),
        config.enabled_sources().count().to_string().green(),
        config.log_sources.len()
    );
}

fn show_alerts(alerts: &[Alert]) {
    if alerts.is_empty() {
        println!("{}", "No alerts.".green());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Severity", "Source", "Summary", "Recommendation"]);

    for alert in alerts {
        table.add_row(vec![
            colored_severity(alert.severity),
            format!("{} ({})", alert.source_name, alert.source_type),
            alert.summary.clone(),
            alert.recommendation.clone(),
        ]);
    }

    println!("{table}");
}

// session recap printed when watch mode stops
fn show_history(history: &AlertHistory) {
    if history.is_empty() {
        println!("{}", "No alerts this session.".green());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Time (UTC)", "Severity", "Source", "Summary"]);

    for entry in history.latest(HISTORY_RECAP) {
        table.add_row(vec![
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            colored_severity(entry.alert.severity),
            entry.alert.source_name.clone(),
            entry.alert.summary.clone(),
        ]);
    }

    println!("\n{}", "Recent alerts (newest first)".cyan().bold());
    println!("{table}");
    println!("{} {}", "Kept in history:".dimmed(), history.len().to_string().yellow());
}

fn colored_severity(severity: Severity) -> String {
    let tag = severity.as_str().to_uppercase();
    match severity {
        Severity::Critical => tag.red().bold().to_string(),
        Severity::Error => tag.red().to_string(),
        Severity::Warning => tag.yellow().to_string(),
        Severity::Info => tag.cyan().to_string(),
    }
}

fn print_summary(report: &CycleReport) {
    let failed: Vec<&str> = report.dispatches.iter().flat_map(|d| d.failed()).collect();
    eprintln!(
        "{} {} | {} {} | {} {}",
        "Lines:".dimmed(),
        report.lines.to_string().yellow(),
        "Alerts:".dimmed(),
        report.alerts.len().to_string().yellow(),
        "Failed sinks:".dimmed(),
        if failed.is_empty() {
            "none".green().to_string()
        } else {
            failed.join(", ").red().to_string()
        }
    );
}
