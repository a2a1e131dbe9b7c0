use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::{MarshalError, TextMarshaler};

/// Severity of a log record.
///
/// Levels are plain integers so that applications can define their own in
/// between the named ones. The named levels are spaced four apart:
///
/// | Level   | Value |
/// |---------|-------|
/// | `DEBUG` | -4    |
/// | `INFO`  | 0     |
/// | `WARN`  | 4     |
/// | `ERROR` | 8     |
///
/// The zero value is `INFO`. A level between two named ones is printed
/// relative to the one below it, e.g. `Level(2)` is `INFO+2` and `Level(-5)`
/// is `DEBUG-1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);

    /// Splits the level into the name of the nearest named level at or
    /// below it and the offset from that level.
    pub fn base(self) -> (&'static str, i32) {
        let Level(l) = self;
        if l < Self::INFO.0 {
            ("DEBUG", l - Self::DEBUG.0)
        } else if l < Self::WARN.0 {
            ("INFO", l - Self::INFO.0)
        } else if l < Self::ERROR.0 {
            ("WARN", l - Self::WARN.0)
        } else {
            ("ERROR", l - Self::ERROR.0)
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, offset) = self.base();
        if offset == 0 {
            f.write_str(name)
        } else {
            write!(f, "{name}{offset:+}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid level {input:?}")]
pub struct ParseLevelError {
    input: String,
}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses `DEBUG`, `INFO`, `WARN` or `ERROR` (any case), optionally
    /// followed by a signed offset such as `+2` or `-1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLevelError { input: s.to_owned() };
        let (name, offset) = match s.find(|c: char| c == '+' || c == '-') {
            Some(i) => {
                let offset: i32 = s[i..].parse().map_err(|_| err())?;
                (&s[..i], offset)
            }
            None => (s, 0),
        };
        let base = match name.to_ascii_uppercase().as_str() {
            "DEBUG" => Level::DEBUG,
            "INFO" => Level::INFO,
            "WARN" => Level::WARN,
            "ERROR" => Level::ERROR,
            _ => return Err(err()),
        };
        base.0.checked_add(offset).map(Level).ok_or_else(err)
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.to_string()
    }
}

impl TryFrom<String> for Level {
    type Error = ParseLevelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TextMarshaler for Level {
    fn marshal_text(&self) -> Result<String, MarshalError> {
        Ok(self.to_string())
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::ERROR,
            log::Level::Warn => Level::WARN,
            log::Level::Info => Level::INFO,
            log::Level::Debug => Level::DEBUG,
            log::Level::Trace => Level(Level::DEBUG.0 - 4),
        }
    }
}

/// Source of a handler's minimum level.
pub trait Leveler: Send + Sync {
    fn level(&self) -> Level;
}

impl Leveler for Level {
    fn level(&self) -> Level {
        *self
    }
}

/// A minimum level that can be changed while handlers are using it.
///
/// Share one behind an `Arc` between handlers to adjust verbosity at runtime.
#[derive(Debug, Default)]
pub struct LevelVar {
    val: AtomicI32,
}

impl LevelVar {
    pub fn new(level: Level) -> Self {
        Self {
            val: AtomicI32::new(level.0),
        }
    }

    pub fn set(&self, level: Level) {
        self.val.store(level.0, Ordering::Relaxed);
    }
}

impl Leveler for LevelVar {
    fn level(&self) -> Level {
        Level(self.val.load(Ordering::Relaxed))
    }
}

impl fmt::Display for LevelVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LevelVar({})", self.level())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        for (level, want) in [
            (Level::DEBUG, "DEBUG"),
            (Level::INFO, "INFO"),
            (Level::WARN, "WARN"),
            (Level::ERROR, "ERROR"),
            (Level(2), "INFO+2"),
            (Level(-5), "DEBUG-1"),
            (Level(-8), "DEBUG-4"),
            (Level(10), "ERROR+2"),
            (Level::default(), "INFO"),
        ] {
            assert_eq!(level.to_string(), want);
        }
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("warn".parse::<Level>(), Ok(Level::WARN));
        assert_eq!("Info+3".parse::<Level>(), Ok(Level(3)));
        assert_eq!("DEBUG-1".parse::<Level>(), Ok(Level(-5)));
        assert!("verbose".parse::<Level>().is_err());
        assert!("INFO+".parse::<Level>().is_err());
        assert!("".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_round_trips_through_text() {
        for l in -10..12 {
            let level = Level(l);
            assert_eq!(level.to_string().parse::<Level>(), Ok(level));
        }
    }

    #[test]
    fn test_level_serde() {
        let json = serde_json::to_string(&Level::WARN).unwrap();
        assert_eq!(json, "\"WARN\"");
        let back: Level = serde_json::from_str("\"error+1\"").unwrap();
        assert_eq!(back, Level(9));
        assert!(serde_json::from_str::<Level>("\"loud\"").is_err());
    }

    #[test]
    fn test_level_var() {
        let var = LevelVar::new(Level::WARN);
        assert_eq!(var.level(), Level::WARN);
        var.set(Level::DEBUG);
        assert_eq!(var.level(), Level::DEBUG);
        assert_eq!(var.to_string(), "LevelVar(DEBUG)");
        assert_eq!(LevelVar::default().level(), Level::INFO);
    }

    #[test]
    fn test_from_log_level() {
        assert_eq!(Level::from(log::Level::Warn), Level::WARN);
        assert_eq!(Level::from(log::Level::Trace).to_string(), "DEBUG-4");
    }
}
