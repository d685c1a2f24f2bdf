//! The context-aware logger.

use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::process;

use chrono::Utc;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

use crate::args::{normalize, render_template, Arg};
use crate::config::{ConfigError, LoggerConfig, Output};
use crate::context::{extract, Context, ContextKey};
use crate::fields::{merge_fields, Field, Fields};
use crate::format::{Entry, Formatter};

/// Logger that enriches every entry with fields taken from a [`Context`].
///
/// Build one at startup and share it by reference or behind an `Arc`.
/// Reconfiguring through [`Logger::init`] needs exclusive access, so it
/// cannot overlap with logging through shared references.
pub struct Logger {
    formatter: Formatter,
    level: LevelFilter,
    context_keys: Vec<ContextKey>,
    writer: BoxMakeWriter,
}

impl Logger {
    /// Create a logger writing to standard error.
    ///
    /// # Arguments
    /// * `formatter` - Output style
    /// * `level` - Minimum severity written
    /// * `context_keys` - Context keys copied into every entry, in order
    pub fn new<I, K>(formatter: Formatter, level: LevelFilter, context_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ContextKey>,
    {
        Self {
            formatter,
            level,
            context_keys: context_keys.into_iter().map(Into::into).collect(),
            writer: Output::default().make_writer(),
        }
    }

    /// Create a logger from declarative configuration.
    pub fn from_config(config: &LoggerConfig) -> Result<Self, ConfigError> {
        let level = config.level_filter()?;
        Ok(Self::new(config.formatter, level, config.context_keys.iter().cloned())
            .with_output(config.output))
    }

    /// Write to one of the standard streams.
    pub fn with_output(self, output: Output) -> Self {
        Self {
            writer: output.make_writer(),
            ..self
        }
    }

    /// Write to any `MakeWriter`. Each entry is written with a single
    /// `write_all` on a fresh writer.
    pub fn with_writer<W>(self, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        Self {
            writer: BoxMakeWriter::new(writer),
            ..self
        }
    }

    /// Replace the formatter, level and registered context keys.
    ///
    /// Previously registered keys are dropped, not extended.
    pub fn init<I, K>(&mut self, formatter: Formatter, level: LevelFilter, context_keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<ContextKey>,
    {
        self.formatter = formatter;
        self.level = level;
        self.context_keys = context_keys.into_iter().map(Into::into).collect();
    }

    pub fn formatter(&self) -> Formatter {
        self.formatter
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn context_keys(&self) -> &[ContextKey] {
        &self.context_keys
    }

    /// Whether an entry at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    /// Fields extracted from `ctx` for the registered keys.
    pub fn context_fields(&self, ctx: &Context) -> Fields {
        extract(ctx, &self.context_keys)
    }

    pub fn debug(&self, ctx: &Context, message: impl fmt::Display, fields: &[Field]) {
        self.log(Level::DEBUG, ctx, message, fields);
    }

    pub fn debugf(&self, ctx: &Context, template: &str, args: &[Arg<'_>]) {
        self.logf(Level::DEBUG, ctx, template, args);
    }

    pub fn info(&self, ctx: &Context, message: impl fmt::Display, fields: &[Field]) {
        self.log(Level::INFO, ctx, message, fields);
    }

    pub fn infof(&self, ctx: &Context, template: &str, args: &[Arg<'_>]) {
        self.logf(Level::INFO, ctx, template, args);
    }

    pub fn warn(&self, ctx: &Context, message: impl fmt::Display, fields: &[Field]) {
        self.log(Level::WARN, ctx, message, fields);
    }

    pub fn warnf(&self, ctx: &Context, template: &str, args: &[Arg<'_>]) {
        self.logf(Level::WARN, ctx, template, args);
    }

    pub fn error(&self, ctx: &Context, message: impl fmt::Display, fields: &[Field]) {
        self.log(Level::ERROR, ctx, message, fields);
    }

    pub fn errorf(&self, ctx: &Context, template: &str, args: &[Arg<'_>]) {
        self.logf(Level::ERROR, ctx, template, args);
    }

    /// Log `err` and exit the process with status 1.
    ///
    /// The entry is written unless the level is `OFF`; the exit happens
    /// regardless.
    pub fn fatal(&self, ctx: &Context, err: &dyn Error) -> ! {
        if self.enabled(Level::ERROR) {
            self.write(Level::ERROR, true, &err.to_string(), &self.context_fields(ctx));
        }
        self.exit()
    }

    /// Formatted variant of [`Logger::fatal`].
    pub fn fatalf(&self, ctx: &Context, template: &str, args: &[Arg<'_>]) -> ! {
        if self.enabled(Level::ERROR) {
            let message = render_template(template, &normalize(args));
            self.write(Level::ERROR, true, &message, &self.context_fields(ctx));
        }
        self.exit()
    }

    /// Flush the configured writer and the standard streams.
    pub fn sync(&self) {
        let _ = self.writer.make_writer().flush();
        sync();
    }

    fn log(&self, level: Level, ctx: &Context, message: impl fmt::Display, fields: &[Field]) {
        if !self.enabled(level) {
            return;
        }
        let fields = merge_fields(self.context_fields(ctx), fields);
        self.write(level, false, &message.to_string(), &fields);
    }

    fn logf(&self, level: Level, ctx: &Context, template: &str, args: &[Arg<'_>]) {
        if !self.enabled(level) {
            return;
        }
        let message = render_template(template, &normalize(args));
        self.write(level, false, &message, &self.context_fields(ctx));
    }

    fn write(&self, level: Level, fatal: bool, message: &str, fields: &Fields) {
        let entry = Entry {
            time: Utc::now(),
            level,
            fatal,
            message,
            fields,
        };
        let line = self.formatter.format(&entry);
        let mut writer = self.writer.make_writer();
        let _ = writer.write_all(line.as_bytes());
    }

    fn exit(&self) -> ! {
        self.sync();
        process::exit(1)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("formatter", &self.formatter)
            .field("level", &self.level)
            .field("context_keys", &self.context_keys)
            .finish_non_exhaustive()
    }
}

/// Flush standard output and standard error, ignoring failures.
pub fn sync() {
    let _ = io::stderr().flush();
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn request_context() -> Context {
        Context::background()
            .with_value("requestId", "request-id")
            .with_value("userId", "user-id")
    }

    fn simple_logger(level: LevelFilter, capture: &Capture) -> Logger {
        Logger::new(Formatter::Simple, level, ["requestId", "userId"]).with_writer(capture.clone())
    }

    #[test]
    fn test_plain_call_attaches_context_and_fields() {
        let capture = Capture::default();
        let logger = simple_logger(LevelFilter::DEBUG, &capture);

        logger.info(
            &request_context(),
            "Informational Message 2",
            &[Field::new("field1", "value1")],
        );

        assert_eq!(
            capture.contents(),
            "Informational Message 2 | requestId=request-id | userId=user-id | field1=value1\n"
        );
    }

    #[test]
    fn test_formatted_call_normalizes_arguments() {
        let capture = Capture::default();
        let logger = simple_logger(LevelFilter::DEBUG, &capture);
        let payload = serde_json::json!({"b": 2, "a": 1});

        logger.warnf(&request_context(), "Warning Message {} {}", &[Arg::from(2), Arg::json(&payload)]);

        assert_eq!(
            capture.contents(),
            "Warning Message 2 {\"a\":1,\"b\":2} | requestId=request-id | userId=user-id\n"
        );
    }

    #[test]
    fn test_message_is_not_normalized() {
        let capture = Capture::default();
        let logger = simple_logger(LevelFilter::DEBUG, &capture);

        logger.error(&Context::background(), "{} stays literal", &[]);

        assert_eq!(capture.contents(), "{} stays literal\n");
    }

    #[test]
    fn test_level_below_threshold_is_dropped() {
        let capture = Capture::default();
        let logger = simple_logger(LevelFilter::INFO, &capture);
        let ctx = request_context();

        logger.debug(&ctx, "Debug Message 1", &[]);
        logger.debugf(&ctx, "Debug Message {}", &[Arg::from(2)]);
        assert!(capture.contents().is_empty());

        logger.info(&ctx, "Informational Message 1", &[]);
        assert_eq!(capture.contents().lines().count(), 1);
    }

    #[test]
    fn test_init_replaces_configuration() {
        let capture = Capture::default();
        let mut logger = simple_logger(LevelFilter::DEBUG, &capture);

        logger.init(Formatter::Simple, LevelFilter::WARN, ["userId"]);
        assert_eq!(logger.context_keys(), &[ContextKey::from_static("userId")]);
        assert!(!logger.enabled(Level::INFO));

        let ctx = request_context();
        logger.info(&ctx, "dropped", &[]);
        logger.warn(&ctx, "kept", &[]);
        assert_eq!(capture.contents(), "kept | userId=user-id\n");
    }

    #[test]
    fn test_off_disables_everything() {
        let capture = Capture::default();
        let logger = simple_logger(LevelFilter::OFF, &capture);

        logger.error(&request_context(), "Error Message 1", &[]);
        assert!(!logger.enabled(Level::ERROR));
        assert!(capture.contents().is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = LoggerConfig {
            formatter: Formatter::Text,
            level: "warn".to_string(),
            context_keys: vec!["requestId".to_string()],
            output: Output::Stdout,
        };
        let logger = Logger::from_config(&config).unwrap();
        assert_eq!(logger.formatter(), Formatter::Text);
        assert_eq!(logger.level(), LevelFilter::WARN);
        assert_eq!(logger.context_keys(), &[ContextKey::from_static("requestId")]);
    }
}
