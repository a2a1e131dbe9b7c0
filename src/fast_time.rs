use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat, Timelike};

/// Fixed-profile timestamp rendering.
///
/// Timestamps are written as RFC 3339 with millisecond precision:
/// `YYYY-MM-DDTHH:MM:SS.mmm` followed by `Z` for a zero offset or `±HH:MM`.
/// Sub-millisecond digits are truncated. The digits are pushed straight into
/// the line buffer, skipping format-string parsing entirely; the output is
/// byte-for-byte what `to_rfc3339_opts(SecondsFormat::Millis, true)` produces.
///
/// # Examples
///
/// ```
/// # use chrono::{TimeZone, Utc};
/// # use text_logger::fast_time::append_rfc3339_millis;
/// let t = Utc.with_ymd_and_hms(2000, 1, 2, 3, 4, 5).unwrap().fixed_offset();
/// let mut buf = Vec::new();
/// append_rfc3339_millis(&mut buf, &t);
/// assert_eq!(buf, b"2000-01-02T03:04:05.000Z");
/// ```
pub fn append_rfc3339_millis(buf: &mut Vec<u8>, t: &DateTime<FixedOffset>) {
    let year = t.year();
    let offset_seconds = t.offset().local_minus_utc();
    if !(0..=9999).contains(&year) || offset_seconds % 60 != 0 {
        // Outside the four-digit profile, or an offset that chrono rounds to
        // the nearest minute; let chrono handle it.
        buf.extend_from_slice(t.to_rfc3339_opts(SecondsFormat::Millis, true).as_bytes());
        return;
    }

    append_padded(buf, year as u32, 4);
    buf.push(b'-');
    append_padded(buf, t.month(), 2);
    buf.push(b'-');
    append_padded(buf, t.day(), 2);
    buf.push(b'T');
    append_padded(buf, t.hour(), 2);
    buf.push(b':');
    append_padded(buf, t.minute(), 2);
    buf.push(b':');

    // A leap second is carried in the nanosecond field.
    let mut second = t.second();
    let mut nanos = t.nanosecond();
    if nanos >= 1_000_000_000 {
        second += 1;
        nanos -= 1_000_000_000;
    }
    append_padded(buf, second, 2);
    buf.push(b'.');
    append_padded(buf, nanos / 1_000_000, 3);

    if offset_seconds == 0 {
        buf.push(b'Z');
        return;
    }
    let mut offset_minutes = offset_seconds / 60;
    if offset_minutes < 0 {
        buf.push(b'-');
        offset_minutes = -offset_minutes;
    } else {
        buf.push(b'+');
    }
    append_padded(buf, (offset_minutes / 60) as u32, 2);
    buf.push(b':');
    append_padded(buf, (offset_minutes % 60) as u32, 2);
}

/// Appends `value` in decimal, left-padded with zeros to `width` digits.
pub(crate) fn append_padded(buf: &mut Vec<u8>, value: u32, width: usize) {
    let mut digits = [b'0'; 10];
    let mut i = digits.len();
    let mut v = value;
    loop {
        i -= 1;
        digits[i] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    let len = digits.len() - i;
    for _ in len..width {
        buf.push(b'0');
    }
    buf.extend_from_slice(&digits[i..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn render(t: &DateTime<FixedOffset>) -> String {
        let mut buf = Vec::new();
        append_rfc3339_millis(&mut buf, t);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_padded() {
        let mut buf = Vec::new();
        append_padded(&mut buf, 7, 3);
        append_padded(&mut buf, 12345, 2);
        append_padded(&mut buf, 0, 1);
        assert_eq!(buf, b"007123450");
    }

    #[test]
    fn test_utc() {
        let t = Utc.with_ymd_and_hms(2000, 1, 2, 3, 4, 5).unwrap().fixed_offset();
        assert_eq!(render(&t), "2000-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_millis_truncate() {
        let t = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap()
            .and_utc()
            .fixed_offset();
        assert_eq!(render(&t), "2023-12-31T23:59:59.999Z");
    }

    #[test]
    fn test_offsets() {
        let east = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let t = east.with_ymd_and_hms(2021, 6, 7, 8, 9, 10).unwrap();
        assert_eq!(render(&t), "2021-06-07T08:09:10.000+05:30");

        let west = FixedOffset::west_opt(3 * 3600 + 45 * 60).unwrap();
        let t = west.with_ymd_and_hms(2021, 6, 7, 8, 9, 10).unwrap();
        assert_eq!(render(&t), "2021-06-07T08:09:10.000-03:45");
    }

    #[test]
    fn test_sub_minute_offsets_match_chrono() {
        for secs in [30, -30, 3659, -3690, 59, -1] {
            let offset = FixedOffset::east_opt(secs).unwrap();
            let t = offset.with_ymd_and_hms(2021, 6, 7, 8, 9, 10).unwrap();
            assert_eq!(render(&t), t.to_rfc3339_opts(SecondsFormat::Millis, true), "offset {secs}s");
        }
    }

    #[test]
    fn test_matches_chrono_outside_profile() {
        let t = Utc.with_ymd_and_hms(12345, 1, 1, 0, 0, 0).unwrap().fixed_offset();
        assert_eq!(render(&t), t.to_rfc3339_opts(SecondsFormat::Millis, true));
    }
}
