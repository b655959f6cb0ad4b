use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

/// Crates whose events follow `--log-level`. Everything else stops at warn.
const OSCWIRE_TARGETS: [&str; 5] = [
    "oscwire",
    "oscwire_frame",
    "oscwire_transport",
    "oscwire_args",
    "oscwire_feedback",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    fn shows_targets(self) -> bool {
        matches!(self, LogLevel::Debug | LogLevel::Trace)
    }
}

/// Per-crate filter for `level`.
pub fn targets(level: LogLevel) -> Targets {
    let level = level.as_filter();
    OSCWIRE_TARGETS.iter().fold(
        Targets::new().with_default(level.min(LevelFilter::WARN)),
        |filter, target| filter.with_target(*target, level),
    )
}

/// Install the stderr subscriber. Stdout is reserved for received messages.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::TRACE)
        .with_ansi(false)
        .with_target(level.shows_targets());
    let filter = targets(level);

    let _ = match format {
        LogFormat::Text => builder.finish().with(filter).try_init(),
        LogFormat::Json => builder.json().finish().with(filter).try_init(),
    };
}
