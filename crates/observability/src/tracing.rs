//! Tracing/logging initialization.

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line (default).
    #[default]
    Json,
    /// Human-readable multi-line output for local runs.
    Pretty,
}

impl core::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => bail!("unknown log format {other:?} (expected json or pretty)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `"info"` or `"stockledger_infra=debug"`.
    pub filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub const FORMAT_VAR: &'static str = "STOCKLEDGER_LOG_FORMAT";
    pub const FILTER_VAR: &'static str = "RUST_LOG";

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(Self::FORMAT_VAR) {
            config.format = raw
                .parse()
                .with_context(|| format!("reading {}", Self::FORMAT_VAR))?;
        }
        if let Some(filter) = lookup(Self::FILTER_VAR) {
            EnvFilter::try_new(&filter).with_context(|| format!("reading {}", Self::FILTER_VAR))?;
            config.filter = filter;
        }
        Ok(config)
    }
}

/// Install the global subscriber. Subsequent calls are no-ops.
pub fn init_with(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
