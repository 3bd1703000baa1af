//! Logging setup.
//!
//! All engine code logs through [tracing], with each subsystem using its own target:
//!  * [TARGET_MAIN] for the driver and plugin lifecycle.
//!  * [TARGET_RENDER] for the render backend.
//!  * [TARGET_ASSETS] for asset sources.
//!  * [TARGET_FONT] for font and grapheme handling.
//!
//! Per-system verbosity is configured with a [LogConfig], and [init_logging()] installs a global
//! subscriber that prints records in the engine's compact format, e.g.
//! `12:04:55 W render: Shader compiled with warnings log="..."`.

use chrono::{DateTime, Local};
use smallvec::SmallVec;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter, Write};
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::NonExhaustive;

pub const TARGET_MAIN: &str = "calendon::main";
pub const TARGET_RENDER: &str = "calendon::render";
pub const TARGET_ASSETS: &str = "calendon::assets";
pub const TARGET_FONT: &str = "calendon::font";

/// Most systems a [LogConfig] can carry overrides for.
pub const MAX_LOG_SYSTEMS: usize = 128;

/// Longest allowed system name, in bytes.
pub const MAX_LOG_SYSTEM_NAME_LEN: usize = 31;

/// How much a system logs, from least to most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    Fatal,
    Error,
    Warn,
    Trace,
}

impl Verbosity {
    /// Single character shorthand for this verbosity.
    #[inline]
    pub fn as_char(self) -> char {
        match self {
            Self::Fatal => 'F',
            Self::Error => 'E',
            Self::Warn => 'W',
            Self::Trace => 'T',
        }
    }

    /// Parse the single character shorthand, case insensitive.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'F' => Some(Self::Fatal),
            'E' => Some(Self::Error),
            'W' => Some(Self::Warn),
            'T' => Some(Self::Trace),
            _ => None,
        }
    }

    /// Parse either the single character shorthand or the full name.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => match s.to_ascii_lowercase().as_str() {
                "fatal" => Some(Self::Fatal),
                "error" => Some(Self::Error),
                "warn" => Some(Self::Warn),
                "trace" => Some(Self::Trace),
                _ => None,
            },
        }
    }

    /// The [LevelFilter] that lets this verbosity through.
    ///
    /// [tracing] has no level above errors, so [Fatal](Verbosity::Fatal) also maps to
    /// [ERROR](LevelFilter::ERROR).
    #[inline]
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Self::Fatal | Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    fn for_level(level: &Level) -> Self {
        match *level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            _ => Self::Trace,
        }
    }
}

/// Error produced while building a [LogConfig] or installing logging.
#[derive(Debug)]
pub enum LogConfigError {
    /// A directive wasn't of the form `system=verbosity`.
    InvalidDirective(String),

    /// A system name was longer than [MAX_LOG_SYSTEM_NAME_LEN].
    SystemNameTooLong(String),

    /// More than [MAX_LOG_SYSTEMS] systems were configured.
    TooManySystems,

    /// The generated filter could not be parsed.
    Filter(String),

    /// A global subscriber was already installed.
    AlreadyInitialized(Box<dyn Error + Send + Sync>),
}

impl Display for LogConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDirective(d) => write!(f, "Invalid log directive: '{d}'"),
            Self::SystemNameTooLong(name) =>
                write!(f, "Log system name too long (max {MAX_LOG_SYSTEM_NAME_LEN}): '{name}'"),
            Self::TooManySystems => write!(f, "Too many log systems (max {MAX_LOG_SYSTEMS})"),
            Self::Filter(msg) => write!(f, "Invalid log filter: {msg}"),
            Self::AlreadyInitialized(err) => write!(f, "Logging already initialized: {err}"),
        }
    }
}

impl Error for LogConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AlreadyInitialized(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Logging configuration.
///
/// # Examples
/// ```
/// use calendon::log::{LogConfig, Verbosity};
///
/// let mut config = LogConfig::default();
/// config.directive("render=T").unwrap();
/// config.directive("assets=error").unwrap();
/// assert_eq!(config.verbosity_for("render"), Verbosity::Trace);
/// assert_eq!(config.verbosity_for("main"), Verbosity::Warn);
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// When false, nothing is logged at all.
    pub enabled: bool,

    /// Verbosity of every system without an override.
    pub default_verbosity: Verbosity,

    /// Per-system overrides, keyed by the last component of the system's target.
    pub systems: SmallVec<[(String, Verbosity); 8]>,

    pub _ne: NonExhaustive,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_verbosity: Verbosity::Warn,
            systems: SmallVec::new(),
            _ne: NonExhaustive(()),
        }
    }
}

impl LogConfig {
    /// Set the verbosity of a single system, replacing any previous override.
    pub fn set_verbosity(
        &mut self,
        system: impl Into<String>,
        verbosity: Verbosity,
    ) -> Result<(), LogConfigError> {
        let system = system.into();
        if system.len() > MAX_LOG_SYSTEM_NAME_LEN {
            return Err(LogConfigError::SystemNameTooLong(system))
        }
        if let Some(entry) = self.systems.iter_mut().find(|(name, _)| name == &system) {
            entry.1 = verbosity;
            return Ok(())
        }
        if self.systems.len() >= MAX_LOG_SYSTEMS {
            return Err(LogConfigError::TooManySystems)
        }
        self.systems.push((system, verbosity));
        Ok(())
    }

    /// Apply a `system=verbosity` directive.
    ///
    /// The verbosity may be the single character form (`W`) or the full name (`warn`).
    pub fn directive(&mut self, directive: &str) -> Result<(), LogConfigError> {
        let invalid = || LogConfigError::InvalidDirective(directive.to_owned());
        let (system, verbosity) = directive.split_once('=').ok_or_else(invalid)?;
        let system = system.trim();
        if system.is_empty() {
            return Err(invalid())
        }
        let verbosity = Verbosity::parse(verbosity.trim()).ok_or_else(invalid)?;
        self.set_verbosity(system, verbosity)
    }

    /// Effective verbosity for a system.
    pub fn verbosity_for(&self, system: &str) -> Verbosity {
        self.systems.iter()
            .find(|(name, _)| name == system)
            .map(|(_, v)| *v)
            .unwrap_or(self.default_verbosity)
    }

    /// Build the [EnvFilter] that implements this configuration.
    pub fn env_filter(&self) -> Result<EnvFilter, LogConfigError> {
        if !self.enabled {
            return Ok(EnvFilter::new("off"))
        }
        let mut directives = self.default_verbosity.level_filter().to_string();
        for (system, verbosity) in &self.systems {
            write!(&mut directives, ",calendon::{system}={}", verbosity.level_filter())
                .map_err(|err| LogConfigError::Filter(err.to_string()))?;
        }
        EnvFilter::builder()
            .parse(&directives)
            .map_err(|err| LogConfigError::Filter(err.to_string()))
    }
}

/// One formatted log line.
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub date_time: DateTime<Local>,
    pub verbosity: Verbosity,
    pub system: String,
    pub message: String,
    pub _ne: NonExhaustive,
}

impl Display for LogRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}: {}",
            self.date_time.format("%H:%M:%S"),
            self.verbosity.as_char(),
            self.system,
            self.message,
        )
    }
}

impl LogRecord {
    /// Create a record stamped with the current local time.
    pub fn new(verbosity: Verbosity, system: impl Into<String>, message: String) -> Self {
        Self {
            date_time: Local::now(),
            verbosity,
            system: system.into(),
            message,
            _ne: NonExhaustive(()),
        }
    }

    /// Build a record from a [tracing] event.
    ///
    /// The system is the last `::` component of the event's target. Fields other than `message`
    /// are appended as `key=value`.
    pub fn for_event(event: &Event<'_>) -> Self {
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        let system = metadata.target().rsplit("::").next().unwrap_or_default();
        let mut message = visitor.message.unwrap_or_default();
        message += &visitor.fields;
        Self::new(Verbosity::for_level(metadata.level()), system, message)
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: Option<String>,
    fields: String,
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_owned()),
            name => {
                let _ = write!(&mut self.fields, " {name}={value:?}");
            },
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{value:?}")),
            name => {
                let _ = write!(&mut self.fields, " {name}={value:?}");
            },
        }
    }
}

/// [FormatEvent] that renders events as [LogRecords](LogRecord).
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordFormat;

impl<S, N> FormatEvent<S, N> for RecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        writeln!(writer, "{}", LogRecord::for_event(event))
    }
}

/// Install the global logging subscriber.
///
/// Fails if the configuration is invalid or a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LogConfigError> {
    let filter = config.env_filter()?;
    tracing_subscriber::fmt()
        .event_format(RecordFormat)
        .with_env_filter(filter)
        .try_init()
        .map_err(LogConfigError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use rstest::rstest;
    use std::sync::Arc;
    use tracing::warn;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[rstest]
    #[case::fatal("F", Some(Verbosity::Fatal))]
    #[case::lower("w", Some(Verbosity::Warn))]
    #[case::name("trace", Some(Verbosity::Trace))]
    #[case::name_upper("ERROR", Some(Verbosity::Error))]
    #[case::unknown("x", None)]
    #[case::unknown_name("loud", None)]
    fn test_verbosity_parse(#[case] s: &str, #[case] expected: Option<Verbosity>) {
        assert_eq!(Verbosity::parse(s), expected);
    }

    #[test]
    fn test_verbosity_order() {
        assert!(Verbosity::Fatal < Verbosity::Error);
        assert!(Verbosity::Error < Verbosity::Warn);
        assert!(Verbosity::Warn < Verbosity::Trace);
    }

    #[test]
    fn test_directives() {
        let mut config = LogConfig::default();
        config.directive("render=T").unwrap();
        config.directive("render = E").unwrap();
        assert_eq!(config.systems.len(), 1);
        assert_eq!(config.verbosity_for("render"), Verbosity::Error);

        assert_matches!(config.directive("render"), Err(LogConfigError::InvalidDirective(_)));
        assert_matches!(config.directive("=W"), Err(LogConfigError::InvalidDirective(_)));
        assert_matches!(config.directive("render=Q"), Err(LogConfigError::InvalidDirective(_)));
    }

    #[test]
    fn test_system_limits() {
        let mut config = LogConfig::default();
        let long_name = "x".repeat(MAX_LOG_SYSTEM_NAME_LEN + 1);
        assert_matches!(
            config.set_verbosity(long_name, Verbosity::Warn),
            Err(LogConfigError::SystemNameTooLong(_))
        );

        for idx in 0..MAX_LOG_SYSTEMS {
            config.set_verbosity(format!("system{idx}"), Verbosity::Trace).unwrap();
        }
        assert_matches!(
            config.set_verbosity("one_more", Verbosity::Trace),
            Err(LogConfigError::TooManySystems)
        );
        // Updating an existing system is still fine
        config.set_verbosity("system0", Verbosity::Fatal).unwrap();
    }

    #[test]
    fn test_env_filter_builds() {
        let mut config = LogConfig::default();
        config.directive("render=T").unwrap();
        config.directive("font=F").unwrap();
        config.env_filter().unwrap();

        config.enabled = false;
        config.env_filter().unwrap();
    }

    #[test]
    fn test_record_display() {
        let record = LogRecord::new(Verbosity::Warn, "render", "Hello".to_owned());
        let formatted = record.to_string();
        assert!(formatted.ends_with(" W render: Hello"), "{formatted}");
    }

    struct CollectLayer(Arc<Mutex<Vec<LogRecord>>>);

    impl<S: Subscriber> Layer<S> for CollectLayer {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().push(LogRecord::for_event(event));
        }
    }

    #[test]
    fn test_record_for_event() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry()
            .with(CollectLayer(records.clone()));
        tracing::subscriber::with_default(subscriber, || {
            warn!(target: TARGET_RENDER, count = 3, "Too many sprites");
        });

        let records = records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verbosity, Verbosity::Warn);
        assert_eq!(records[0].system, "render");
        assert_eq!(records[0].message, "Too many sprites count=3");
    }
}
