use std::io;

use crate::level::Level;
use crate::record::Record;
use crate::value::Attr;

/// Processes log records.
///
/// A handler may print records, write them to a file or socket, or augment
/// them and pass them on. All methods may be called concurrently, so
/// implementations manage their own synchronization.
///
/// When producing output, a handler follows these rules:
///
/// * A record without a time gets no time field.
/// * A record without a source gets no source field.
/// * An attribute with an empty key and a non-group value is ignored.
/// * A group with an empty key has its members written inline.
/// * A group with no members is ignored, whatever its key.
pub trait Handler: Send + Sync {
    /// Reports whether records at `level` would be handled. Callers check
    /// this before building a record to save the work when they would not.
    fn enabled(&self, level: Level) -> bool;

    /// Handles one record. The only error is a failure of the underlying
    /// sink; it is returned unchanged and never retried.
    fn handle(&self, record: &Record) -> io::Result<()>;

    /// Flushes any output buffered below the handler.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Returns a new handler whose output includes `attrs` on every record,
    /// in addition to the receiver's own attributes.
    fn with_attrs(&self, attrs: Vec<Attr>) -> Self
    where
        Self: Sized;

    /// Returns a new handler that qualifies all later attribute keys, whether
    /// added with [`Handler::with_attrs`] or carried by a record, with the
    /// group `name`. An empty name returns an equivalent handler.
    ///
    /// `handler.with_group("s").handle(r)` with attributes `a` and `b` writes
    /// the same fields as handling `r` with a single group `s` holding `a` and
    /// `b`.
    fn with_group(&self, name: &str) -> Self
    where
        Self: Sized;
}
