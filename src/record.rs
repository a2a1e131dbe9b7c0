use std::borrow::Cow;
use std::fmt;
use std::panic::Location;

use chrono::{DateTime, FixedOffset, Local};

use crate::level::Level;
use crate::value::Attr;

/// The file and line a log call came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub file: Cow<'static, str>,
    pub line: u32,
}

impl Source {
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The location of the outermost `#[track_caller]` frame that led here.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One log event.
///
/// A record with no `time` is written without a `time` field. The handler
/// only reads the record, so one record may be handed to many handlers.
///
/// # Examples
///
/// ```
/// use text_logger::{Attr, Level, Record};
///
/// let mut record = Record::new(None, Level::WARN, "disk almost full");
/// record.add_attrs([Attr::uint64("free_mb", 312)]);
/// assert_eq!(record.attrs().len(), 1);
/// assert!(record.source.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    pub time: Option<DateTime<FixedOffset>>,
    pub level: Level,
    pub message: String,
    pub source: Option<Source>,
    attrs: Vec<Attr>,
}

impl Record {
    /// Creates a record with no attributes, capturing the caller's location
    /// as its source.
    #[track_caller]
    pub fn new(time: Option<DateTime<FixedOffset>>, level: Level, message: impl Into<String>) -> Self {
        Self {
            time,
            level,
            message: message.into(),
            source: Some(Source::caller()),
            attrs: Vec::new(),
        }
    }

    /// Like [`Record::new`], stamped with the current local time.
    #[track_caller]
    pub fn now(level: Level, message: impl Into<String>) -> Self {
        Self::new(Some(Local::now().fixed_offset()), level, message)
    }

    pub fn with_source(mut self, source: Option<Source>) -> Self {
        self.source = source;
        self
    }

    /// Appends attributes. Empty groups are skipped, they would not be
    /// written anyway.
    pub fn add_attrs(&mut self, attrs: impl IntoIterator<Item = Attr>) {
        self.attrs.extend(
            attrs
                .into_iter()
                .filter(|a| !matches!(a.value.as_group(), Some(members) if members.is_empty())),
        );
    }

    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }
}
