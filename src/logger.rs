use std::sync::Arc;

use chrono::Local;

use crate::handler::Handler;
use crate::level::Level;
use crate::record::{Record, Source};
use crate::value::Attr;

/// Key of the attribute carrying a `log` record's target.
pub const TARGET_KEY: &str = "target";

/// Front end for a [`Handler`].
///
/// Each call checks [`Handler::enabled`] first, so a disabled record costs no
/// formatting. Records are stamped with the current local time and the
/// location of the logging call.
///
/// A failure of the sink is not returned from the convenience calls; it is
/// reported through `tracing` and the record is lost. Use
/// [`Handler::handle`] directly to observe errors.
///
/// # Examples
///
/// ```
/// use text_logger::{Attr, Logger, TextHandler};
///
/// let logger = Logger::new(TextHandler::new(std::io::stderr()))
///     .with([Attr::string("service", "billing")])
///     .with_group("req");
/// logger.info("request done", [Attr::int("status", 200)]);
/// ```
pub struct Logger<H> {
    handler: Arc<H>,
}

impl<H> Clone for Logger<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H: Handler> Logger<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns a logger whose records all carry `attrs`.
    ///
    /// The attributes are formatted once, here, rather than on every call.
    pub fn with(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        let attrs: Vec<Attr> = attrs.into_iter().collect();
        if attrs.is_empty() {
            return self.clone();
        }
        Self::new(self.handler.with_attrs(attrs))
    }

    /// Returns a logger that nests every later attribute under group `name`.
    pub fn with_group(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }
        Self::new(self.handler.with_group(name))
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    /// Logs `msg` at `level` with the given attributes.
    ///
    /// # Arguments
    ///
    /// * `level` - Severity of the record
    /// * `msg` - The message, written as the `msg` field
    /// * `attrs` - Attributes written after the message, in order
    #[track_caller]
    pub fn log(&self, level: Level, msg: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        if !self.enabled(level) {
            return;
        }
        let mut record = Record::now(level, msg);
        record.add_attrs(attrs);
        self.dispatch(&record);
    }

    #[track_caller]
    pub fn debug(&self, msg: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        self.log(Level::DEBUG, msg, attrs);
    }

    #[track_caller]
    pub fn info(&self, msg: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        self.log(Level::INFO, msg, attrs);
    }

    #[track_caller]
    pub fn warn(&self, msg: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        self.log(Level::WARN, msg, attrs);
    }

    #[track_caller]
    pub fn error(&self, msg: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        self.log(Level::ERROR, msg, attrs);
    }

    fn dispatch(&self, record: &Record) {
        if let Err(err) = self.handler.handle(record) {
            tracing::warn!(error = %err, level = %record.level, "failed to write log record");
        }
    }
}

impl<H: Handler + 'static> Logger<H> {
    /// Registers this logger as the `log` crate's global logger.
    ///
    /// Fails if a global logger is already set.
    pub fn install(self, max_level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        tracing::debug!(%max_level, "installed text logger as log backend");
        Ok(())
    }
}

impl<H: Handler> log::Log for Logger<H> {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        Logger::enabled(self, metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        let level = Level::from(record.level());
        if !Logger::enabled(self, level) {
            return;
        }

        let source = match (record.file_static(), record.file()) {
            (Some(file), _) => Some(Source::new(file, record.line().unwrap_or(0))),
            (None, Some(file)) => Some(Source::new(file.to_owned(), record.line().unwrap_or(0))),
            (None, None) => None,
        };
        let mut out = Record::new(Some(Local::now().fixed_offset()), level, record.args().to_string())
            .with_source(source);
        out.add_attrs([Attr::string(TARGET_KEY, record.target())]);
        self.dispatch(&out);
    }

    fn flush(&self) {
        if let Err(err) = self.handler.flush() {
            tracing::warn!(error = %err, "failed to flush log output");
        }
    }
}
