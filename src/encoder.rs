//! Rendering of a single [`Value`] into the line buffer.

use std::fmt::{self, Write as _};
use std::time::Duration;

use thiserror::Error;

use crate::fast_time::append_rfc3339_millis;
use crate::level::Level;
use crate::quoting::{append_quoted_bytes, append_string};
use crate::value::{MarshalError, Value};

/// Why a value could not be rendered.
///
/// The message becomes the inline `!ERROR:` marker written in place of the
/// value, so `Display` forwards the underlying error unchanged.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{0}")]
    Marshal(MarshalError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Fmt(#[from] fmt::Error),
}

/// Appends the text form of `value`.
///
/// On error nothing of the value has been written, and the caller is expected
/// to write an error marker instead with [`append_error`].
///
/// # Panics
///
/// Groups are laid out by the handler as prefixed keys and never reach the
/// scalar encoder; passing one is a bug in the caller.
pub(crate) fn append_value(buf: &mut Vec<u8>, value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::String(s) => append_string(buf, s),
        Value::Int64(v) => append_int(buf, *v),
        Value::Uint64(v) => append_uint(buf, *v),
        Value::Float64(v) => append_float(buf, *v)?,
        Value::Bool(v) => buf.extend_from_slice(if *v { b"true" } else { b"false" }),
        Value::Duration(d) => append_duration(buf, *d),
        Value::Time(t) => append_rfc3339_millis(buf, t),
        Value::Text(marshaler) => {
            let text = marshaler.marshal_text().map_err(EncodeError::Marshal)?;
            append_string(buf, &text);
        }
        Value::Bytes(bytes) => append_quoted_bytes(buf, bytes),
        Value::Json(marshaler) => {
            let start = buf.len();
            if let Err(err) = marshaler.marshal_json(buf) {
                buf.truncate(start);
                return Err(err.into());
            }
        }
        Value::LogValuer(_) => return append_value(buf, &value.clone().resolve()),
        Value::Group(_) => unreachable!("group values are expanded into prefixed keys, not encoded"),
    }
    Ok(())
}

/// Appends the `!ERROR:<message>` marker used in place of a failed value.
pub(crate) fn append_error(buf: &mut Vec<u8>, err: &EncodeError) {
    append_string(buf, &format!("!ERROR:{err}"));
}

/// Appends a level's canonical name, e.g. `INFO` or `WARN+1`.
pub(crate) fn append_level(buf: &mut Vec<u8>, level: Level) {
    let (name, offset) = level.base();
    buf.extend_from_slice(name.as_bytes());
    if offset != 0 {
        buf.push(if offset < 0 { b'-' } else { b'+' });
        append_uint(buf, offset.unsigned_abs().into());
    }
}

pub(crate) fn append_uint(buf: &mut Vec<u8>, v: u64) {
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    let mut v = v;
    loop {
        i -= 1;
        digits[i] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    buf.extend_from_slice(&digits[i..]);
}

pub(crate) fn append_int(buf: &mut Vec<u8>, v: i64) {
    if v < 0 {
        buf.push(b'-');
    }
    append_uint(buf, v.unsigned_abs());
}

/// `fmt::Write` over the line buffer, so `write!` can target it directly.
struct LineWriter<'a>(&'a mut Vec<u8>);

impl fmt::Write for LineWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// Fixed-capacity scratch for formatting a float's scientific form.
struct StackStr {
    bytes: [u8; 40],
    len: usize,
}

impl StackStr {
    fn new() -> Self {
        Self {
            bytes: [0; 40],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }
}

impl fmt::Write for StackStr {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.bytes.len() {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Appends the shortest decimal that round-trips to `v`.
///
/// Plain notation is used for decimal exponents from -4 up to 5, as `%g`
/// does; outside that range the value is written as `d.ddde±XX` with at
/// least two exponent digits. Non-finite values are `NaN`, `+Inf` and `-Inf`.
pub(crate) fn append_float(buf: &mut Vec<u8>, v: f64) -> fmt::Result {
    if v.is_nan() {
        buf.extend_from_slice(b"NaN");
        return Ok(());
    }
    if v.is_infinite() {
        buf.extend_from_slice(if v > 0.0 { b"+Inf" } else { b"-Inf" });
        return Ok(());
    }

    let mut sci = StackStr::new();
    write!(sci, "{v:e}")?;
    let (mantissa, exp) = sci.as_str().split_once('e').ok_or(fmt::Error)?;
    let exp: i32 = exp.parse().map_err(|_| fmt::Error)?;

    if (-4..6).contains(&exp) {
        return write!(LineWriter(buf), "{v}");
    }
    buf.extend_from_slice(mantissa.as_bytes());
    buf.push(b'e');
    buf.push(if exp < 0 { b'-' } else { b'+' });
    let exp = exp.unsigned_abs();
    if exp < 10 {
        buf.push(b'0');
    }
    append_uint(buf, exp.into());
    Ok(())
}

/// Appends `d` in compact unit notation: `0s`, `750ns`, `1.5µs`, `20ms`,
/// `1m0s`, `2h45m30.5s`.
///
/// Durations under a second use the largest sub-second unit that keeps the
/// integer part non-zero. Longer durations are split into hours, minutes and
/// seconds, omitting leading zero units; trailing zeros of the fraction are
/// dropped.
pub(crate) fn append_duration(buf: &mut Vec<u8>, d: Duration) {
    // Built right to left, like the digits of an integer.
    let mut out = [0u8; 64];
    let mut w = out.len();
    let mut u = d.as_nanos();

    if u < 1_000_000_000 {
        if u == 0 {
            buf.extend_from_slice(b"0s");
            return;
        }
        let (unit, prec): (&[u8], usize) = if u < 1_000 {
            (&b"ns"[..], 0)
        } else if u < 1_000_000 {
            ("µs".as_bytes(), 3)
        } else {
            (&b"ms"[..], 6)
        };
        w -= unit.len();
        out[w..w + unit.len()].copy_from_slice(unit);
        let (nw, nu) = fmt_frac(&mut out[..w], u, prec);
        w = fmt_int(&mut out[..nw], nu);
    } else {
        w -= 1;
        out[w] = b's';
        let (nw, nu) = fmt_frac(&mut out[..w], u, 9);
        w = fmt_int(&mut out[..nw], nu % 60);
        u = nu / 60;
        if u > 0 {
            w -= 1;
            out[w] = b'm';
            w = fmt_int(&mut out[..w], u % 60);
            u /= 60;
            if u > 0 {
                w -= 1;
                out[w] = b'h';
                w = fmt_int(&mut out[..w], u);
            }
        }
    }
    buf.extend_from_slice(&out[w..]);
}

/// Writes the low `prec` decimal digits of `v` as a fraction ending at the
/// end of `out`, omitting trailing zeros (and the point if all are zero).
/// Returns the new write index and `v` with those digits removed.
fn fmt_frac(out: &mut [u8], v: u128, prec: usize) -> (usize, u128) {
    let mut w = out.len();
    let mut v = v;
    let mut print = false;
    for _ in 0..prec {
        let digit = (v % 10) as u8;
        print = print || digit != 0;
        if print {
            w -= 1;
            out[w] = b'0' + digit;
        }
        v /= 10;
    }
    if print {
        w -= 1;
        out[w] = b'.';
    }
    (w, v)
}

/// Writes `v` in decimal ending at the end of `out`; returns the start index.
fn fmt_int(out: &mut [u8], v: u128) -> usize {
    let mut w = out.len();
    let mut v = v;
    loop {
        w -= 1;
        out[w] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    w
}
