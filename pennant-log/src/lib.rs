//! Pennant Logging
//!
//! Structured logging for the pennant crates, controlled through the
//! `PENNANT_DEBUG` family of environment variables.
//!
//! The macros check the active level before formatting anything, so a
//! disabled `debug!` in the evaluation hot path costs one atomic load.
//! Records emitted by third-party crates through the `log` facade can be
//! routed through the same sink with [`init_log_bridge`].
//!
//! # Usage
//!
//! ```rust
//! use pennant_log::{debug, info, warn, error, trace};
//!
//! debug!("Resolving flag {}", "new-checkout");
//! info!("Client ready");
//! warn!("Adapter evaluation failed, serving fallback");
//! error!("Adapter close failed");
//!
//! let flag = "theme";
//! trace!(target: "pennant::engine", "rule scan for {}", flag);
//! ```
//!
//! # Environment Variables
//!
//! - `PENNANT_DEBUG=1` - Enable debug logging
//! - `PENNANT_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `PENNANT_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `PENNANT_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `PENNANT_LOG_MODULE=1|0` - Include the emitting module path

use once_cell::sync::Lazy;
use std::env;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub use log::{Level, LevelFilter};

// ============================================================================
// Configuration
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human readable, one record per line with a full timestamp
    Pretty,
    /// Short single-letter level and time of day
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Parse a level name. Accepts the `log` crate names plus `warning` and `none`.
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" | "none" => Some(LevelFilter::Off),
        _ => None,
    }
}

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static MAX_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Info as usize);
static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `PENNANT_DEBUG` was set
    pub debug: bool,
    /// Most verbose level that is emitted
    pub level: LevelFilter,
    /// Output format
    pub format: Format,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the emitting module path
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: LevelFilter::Info,
            format: Format::Json,
            timestamps: true,
            module_path: true,
        }
    }
}

impl LogConfig {
    /// Read configuration from `PENNANT_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let debug = env_flag("PENNANT_DEBUG").unwrap_or(false);

        let level = env::var("PENNANT_LOG_LEVEL")
            .ok()
            .and_then(|s| parse_level(&s))
            .unwrap_or(if debug {
                LevelFilter::Debug
            } else {
                defaults.level
            });

        let config = Self {
            debug,
            level,
            format: env::var("PENNANT_LOG_FORMAT")
                .ok()
                .and_then(|s| Format::parse(&s))
                .unwrap_or(defaults.format),
            timestamps: env_flag("PENNANT_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps),
            module_path: env_flag("PENNANT_LOG_MODULE").unwrap_or(defaults.module_path),
        };

        DEBUG_ENABLED.store(config.debug, Ordering::SeqCst);
        MAX_LEVEL.store(config.level as usize, Ordering::SeqCst);
        config
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn filter_from_usize(raw: usize) -> LevelFilter {
    match raw {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Read the environment configuration eagerly.
///
/// Happens implicitly on the first log call otherwise.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// The configuration read from the environment.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

/// Whether `PENNANT_DEBUG` (or [`set_debug`]) is active.
#[inline]
pub fn is_debug_enabled() -> bool {
    init();
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Whether a record at `level` would be emitted.
#[inline]
pub fn is_enabled(level: Level) -> bool {
    level <= max_level()
}

/// Current maximum level.
pub fn max_level() -> LevelFilter {
    init();
    filter_from_usize(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Change the maximum level at runtime.
pub fn set_level(level: LevelFilter) {
    init();
    MAX_LEVEL.store(level as usize, Ordering::SeqCst);
    log::set_max_level(level);
}

/// Toggle debug mode at runtime. Enabling it raises the level to at least `Debug`.
pub fn set_debug(enabled: bool) {
    init();
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && max_level() < LevelFilter::Debug {
        set_level(LevelFilter::Debug);
    }
}

// ============================================================================
// Output
// ============================================================================

/// Emit one record. Used by the macros; prefer those.
#[doc(hidden)]
pub fn emit(level: Level, target: &str, args: fmt::Arguments<'_>) {
    if !is_enabled(level) {
        return;
    }

    let line = render(config(), level, target, args);
    let mut stderr = std::io::stderr().lock();
    let _ = stderr.write_all(line.as_bytes());
}

fn render(config: &LogConfig, level: Level, target: &str, args: fmt::Arguments<'_>) -> String {
    let target = if config.module_path { target } else { "" };

    match config.format {
        Format::Pretty => {
            let mut line = String::new();
            if config.timestamps {
                line.push_str(&format!(
                    "{} ",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
                ));
            }
            line.push_str(&format!("{:5} ", level));
            if !target.is_empty() {
                line.push_str(&format!("[{}] ", target));
            }
            line.push_str(&format!("{}\n", args));
            line
        }
        Format::Compact => {
            let mut line = String::new();
            if config.timestamps {
                line.push_str(&format!("{} ", chrono::Local::now().format("%H:%M:%S")));
            }
            line.push(level.as_str().chars().next().unwrap_or('?'));
            line.push(' ');
            if !target.is_empty() {
                line.push_str(&format!("{}: ", target));
            }
            line.push_str(&format!("{}\n", args));
            line
        }
        Format::Json => render_json(config, level, target, &args.to_string()),
    }
}

#[cfg(feature = "json")]
fn render_json(config: &LogConfig, level: Level, target: &str, message: &str) -> String {
    use serde::Serialize;

    #[derive(Serialize)]
    struct Entry<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
        level: &'a str,
        #[serde(skip_serializing_if = "str::is_empty")]
        target: &'a str,
        message: &'a str,
    }

    let entry = Entry {
        timestamp: config.timestamps.then(|| chrono::Utc::now().to_rfc3339()),
        level: level.as_str(),
        target,
        message,
    };

    match serde_json::to_string(&entry) {
        Ok(json) => json + "\n",
        Err(_) => format!("{} {}\n", level, message),
    }
}

#[cfg(not(feature = "json"))]
fn render_json(config: &LogConfig, level: Level, target: &str, message: &str) -> String {
    let mut line = String::from("{");
    if config.timestamps {
        line.push_str(&format!(r#""timestamp":"{}","#, chrono::Utc::now().to_rfc3339()));
    }
    line.push_str(&format!(r#""level":"{}","#, level.as_str()));
    if !target.is_empty() {
        line.push_str(&format!(r#""target":"{}","#, escape_json(target)));
    }
    line.push_str(&format!(r#""message":"{}"}}"#, escape_json(message)));
    line.push('\n');
    line
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

// ============================================================================
// `log` facade bridge
// ============================================================================

struct Bridge;

impl log::Log for Bridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        is_enabled(metadata.level())
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            emit(record.level(), record.target(), *record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static BRIDGE: Bridge = Bridge;

/// Install pennant's sink as the global `log` logger.
///
/// Fails if another logger was installed first.
pub fn init_log_bridge() -> Result<(), log::SetLoggerError> {
    init();
    log::set_logger(&BRIDGE)?;
    log::set_max_level(max_level());
    Ok(())
}

// ============================================================================
// Macros
// ============================================================================

/// Log a trace message.
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_enabled($crate::Level::Trace) {
            $crate::emit($crate::Level::Trace, $target, format_args!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::trace!(target: module_path!(), $($arg)+)
    };
}

/// Log a debug message.
///
/// Emitted when `PENNANT_DEBUG=1` or `PENNANT_LOG_LEVEL=debug`.
///
/// # Example
///
/// ```rust
/// use pennant_log::debug;
///
/// let flag = "new-checkout";
/// debug!("flag {} resolved by static value", flag);
/// debug!(target: "pennant::client", "initialize coalesced");
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_enabled($crate::Level::Debug) {
            $crate::emit($crate::Level::Debug, $target, format_args!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::debug!(target: module_path!(), $($arg)+)
    };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_enabled($crate::Level::Info) {
            $crate::emit($crate::Level::Info, $target, format_args!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::info!(target: module_path!(), $($arg)+)
    };
}

/// Log a warning message.
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_enabled($crate::Level::Warn) {
            $crate::emit($crate::Level::Warn, $target, format_args!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::warn!(target: module_path!(), $($arg)+)
    };
}

/// Log an error message.
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_enabled($crate::Level::Error) {
            $crate::emit($crate::Level::Error, $target, format_args!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::error!(target: module_path!(), $($arg)+)
    };
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Builds a `tracing` subscriber from the same `PENNANT_*` configuration.

    use super::*;

    /// Subscriber honouring `RUST_LOG` first and `PENNANT_LOG_LEVEL` otherwise.
    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let level = config().level.to_string().to_ascii_lowercase();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false))
    }
}

// ============================================================================
// Tests
// ============================================================================
