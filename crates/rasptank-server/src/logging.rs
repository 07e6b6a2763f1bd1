//! Logging configuration and initialization.
//!
//! Presets chosen by CLI flags, per-target overrides with `--log`,
//! text or JSON output, and `RUST_LOG` as an escape hatch.

use std::collections::HashMap;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const TARGET_PREFIX: &str = "rasptank::";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Connections, authentication and startup only
    #[default]
    Production,
    /// Adds command dispatch and actuator activity
    Verbose,
    /// Every decision the router and servo workers make
    Debug,
    /// Everything, including per-step servo writes
    Trace,
    /// Warnings and errors only
    Quiet,
}

/// Logging configuration built from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    /// Per-target level overrides (e.g. "rasptank::servo" -> TRACE)
    pub overrides: HashMap<String, Level>,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn from_cli(
        verbose: bool,
        debug: bool,
        trace: bool,
        quiet: bool,
        log_overrides: Vec<String>,
        format: LogFormat,
    ) -> Self {
        let preset = if quiet {
            LogPreset::Quiet
        } else if trace {
            LogPreset::Trace
        } else if debug {
            LogPreset::Debug
        } else if verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        };

        // "servo=trace" or "router=debug,session=info"
        let mut overrides = HashMap::new();
        for override_str in log_overrides {
            for part in override_str.split(',') {
                let Some((target, level_str)) = part.split_once('=') else {
                    continue;
                };
                let target = target.trim();
                let full_target = if target.starts_with(TARGET_PREFIX) || target == "tower_http" {
                    target.to_string()
                } else {
                    format!("{}{}", TARGET_PREFIX, target)
                };
                if let Some(level) = parse_level(level_str.trim()) {
                    overrides.insert(full_target, level);
                }
            }
        }

        Self {
            preset,
            overrides,
            format,
        }
    }

    /// Filter directives for this configuration, overrides last.
    pub fn directives(&self) -> Vec<String> {
        let mut directives: Vec<String> = match self.preset {
            LogPreset::Production => vec![
                "rasptank::startup=info".into(),
                "rasptank::ws=info".into(),
                "rasptank::session=info".into(),
                "rasptank::router=warn".into(),
                "rasptank::servo=warn".into(),
                "rasptank::motor=warn".into(),
                "rasptank::led=warn".into(),
                "rasptank::telemetry=warn".into(),
                "tower_http=warn".into(),
            ],
            LogPreset::Verbose => vec![
                "rasptank=info".into(),
                "tower_http=info".into(),
            ],
            LogPreset::Debug => vec![
                "rasptank=debug".into(),
                "tower_http=debug".into(),
            ],
            LogPreset::Trace => vec![
                "rasptank=trace".into(),
                "tower_http=trace".into(),
            ],
            LogPreset::Quiet => vec![
                "rasptank=warn".into(),
                "tower_http=error".into(),
            ],
        };

        for (target, level) in &self.overrides {
            directives.push(format!("{}={}", target, level_to_str(*level)));
        }
        directives
    }

    /// Build an EnvFilter; `RUST_LOG` wins when set.
    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }
        let filter_str = self.directives().join(",");
        EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Initialize the global tracing subscriber.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_names(true)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}
