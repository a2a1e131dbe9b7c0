//! # Text Logger
//!
//! A structured logging handler that writes each record as one line of
//! `key=value` pairs:
//!
//! ```text
//! time=2023-11-07T10:04:05.123-05:00 level=INFO msg="user signed in" user.id=42 user.name=ada
//! ```
//!
//! ## Key Features
//!
//! * Minimal quoting: keys and values are quoted only when needed to keep the
//!   line parseable, with Go-style escapes
//! * Nested groups rendered as dot-qualified keys
//! * Attributes added with `with_attrs` are formatted once and reused
//! * A replace hook to rename, rewrite or drop any field, built-ins included
//! * One `write_all` per record, so concurrent lines never interleave
//! * Pooled scratch buffers, so steady-state logging does not allocate lines
//!
//! ## Main Components
//!
//! * [`Handler`]: the record-processing interface
//! * [`TextHandler`]: the `key=value` implementation
//! * [`Record`], [`Attr`], [`Value`]: the data being logged
//! * [`Logger`]: a convenience front end, also usable as a `log` backend
//! * [`quoting`] and [`fast_time`]: the low-level formatting helpers
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use text_logger::{Attr, Handler, HandlerOptions, Level, Record, TextHandler};
//!
//! #[derive(Clone, Default)]
//! struct Shared(Arc<Mutex<Vec<u8>>>);
//!
//! impl std::io::Write for Shared {
//!     fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
//!         self.0.lock().extend_from_slice(buf);
//!         Ok(buf.len())
//!     }
//!     fn flush(&mut self) -> std::io::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let out = Shared::default();
//! let handler = TextHandler::with_options(out.clone(), HandlerOptions::new().level(Level::DEBUG))
//!     .with_attrs(vec![Attr::string("app", "demo")])
//!     .with_group("req");
//!
//! let mut record = Record::new(None, Level::INFO, "hello world");
//! record.add_attrs([Attr::string("method", "GET"), Attr::int("status", 200)]);
//! handler.handle(&record).unwrap();
//!
//! assert_eq!(
//!     String::from_utf8(out.0.lock().clone()).unwrap(),
//!     "level=INFO msg=\"hello world\" app=demo req.method=GET req.status=200\n",
//! );
//! ```

pub mod encoder;
pub mod fast_time;
pub mod handler;
pub mod level;
pub mod logger;
pub mod quoting;
pub mod record;
pub mod scratch_pool;
pub mod text_handler;
pub mod value;

pub use encoder::EncodeError;
pub use handler::Handler;
pub use level::{Level, LevelVar, Leveler, ParseLevelError};
pub use logger::{Logger, TARGET_KEY};
pub use record::{Record, Source};
pub use scratch_pool::ScratchPool;
pub use text_handler::{
    HandlerOptions, ReplaceAttr, TextHandler, LEVEL_KEY, MESSAGE_KEY, SOURCE_KEY, TIME_KEY,
};
pub use value::{Attr, JsonMarshaler, Kind, LogValuer, MarshalError, TextMarshaler, Value};
