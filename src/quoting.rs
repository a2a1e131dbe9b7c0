//! Quoting and escaping of keys and string values.
//!
//! Keys and string values are written bare whenever that is unambiguous. A
//! string is quoted when it contains a space, `=`, `"`, an ASCII control byte,
//! or a non-ASCII character that is a Unicode space or is not printable.
//! Quoted strings use the familiar double-quoted literal syntax: `\"`, `\\`,
//! `\n`-style escapes, `\xNN` for other control bytes and invalid UTF-8, and
//! `\uNNNN` / `\UNNNNNNNN` for non-printable characters.
//!
//! A backslash on its own does not force quoting, so Windows paths stay bare.

use unicode_general_category::{get_general_category, GeneralCategory};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Reports whether `s` must be quoted before it can be written as a key or
/// value.
///
/// # Examples
///
/// ```
/// use text_logger::quoting::needs_quoting;
///
/// assert!(!needs_quoting("plain"));
/// assert!(!needs_quoting("µåπ"));
/// assert!(!needs_quoting(r"C:\temp"));
/// assert!(needs_quoting("a b"));
/// assert!(needs_quoting("a=b"));
/// assert!(needs_quoting("tab\there"));
/// ```
pub fn needs_quoting(s: &str) -> bool {
    for c in s.chars() {
        if c.is_ascii() {
            let b = c as u8;
            if b == b' ' || b == b'=' || b == b'"' || b.is_ascii_control() {
                return true;
            }
        } else if c == char::REPLACEMENT_CHARACTER || c.is_whitespace() || !is_print(c) {
            return true;
        }
    }
    false
}

/// Reports whether `c` is a printable character: a letter, mark, number,
/// punctuation, symbol or the ASCII space.
///
/// Separators other than U+0020, control and format characters, surrogates,
/// private-use and unassigned code points are not printable.
pub fn is_print(c: char) -> bool {
    if c.is_ascii() {
        return (0x20..0x7f).contains(&(c as u8));
    }
    !matches!(
        get_general_category(c),
        GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
            | GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
    )
}

/// Appends `s`, quoted only if [`needs_quoting`] says so.
pub fn append_string(buf: &mut Vec<u8>, s: &str) {
    if needs_quoting(s) {
        append_quoted(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Appends `prefix` immediately followed by `s` as one token, quoting the
/// whole if either part needs it. Saves building the joined key.
pub fn append_joined(buf: &mut Vec<u8>, prefix: &str, s: &str) {
    if needs_quoting(prefix) || needs_quoting(s) {
        buf.push(b'"');
        append_escaped(buf, prefix);
        append_escaped(buf, s);
        buf.push(b'"');
    } else {
        buf.extend_from_slice(prefix.as_bytes());
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Appends `s` as a double-quoted, escaped literal.
pub fn append_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.reserve(s.len() + 2);
    buf.push(b'"');
    append_escaped(buf, s);
    buf.push(b'"');
}

/// Appends arbitrary bytes as a double-quoted literal. Valid UTF-8 runs are
/// escaped like strings; each invalid byte becomes `\xNN`.
pub fn append_quoted_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.reserve(bytes.len() + 2);
    buf.push(b'"');
    for chunk in bytes.utf8_chunks() {
        append_escaped(buf, chunk.valid());
        for &b in chunk.invalid() {
            append_hex_escape(buf, b'x', b.into(), 2);
        }
    }
    buf.push(b'"');
}

fn append_escaped(buf: &mut Vec<u8>, s: &str) {
    for c in s.chars() {
        append_escaped_char(buf, c);
    }
}

fn append_escaped_char(buf: &mut Vec<u8>, c: char) {
    match c {
        '"' => buf.extend_from_slice(b"\\\""),
        '\\' => buf.extend_from_slice(b"\\\\"),
        c if is_print(c) => {
            let mut utf8 = [0u8; 4];
            buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
        }
        '\x07' => buf.extend_from_slice(b"\\a"),
        '\x08' => buf.extend_from_slice(b"\\b"),
        '\x0c' => buf.extend_from_slice(b"\\f"),
        '\n' => buf.extend_from_slice(b"\\n"),
        '\r' => buf.extend_from_slice(b"\\r"),
        '\t' => buf.extend_from_slice(b"\\t"),
        '\x0b' => buf.extend_from_slice(b"\\v"),
        c if c.is_ascii() => append_hex_escape(buf, b'x', c as u32, 2),
        c if (c as u32) < 0x10000 => append_hex_escape(buf, b'u', c as u32, 4),
        c => append_hex_escape(buf, b'U', c as u32, 8),
    }
}

fn append_hex_escape(buf: &mut Vec<u8>, tag: u8, value: u32, width: u32) {
    buf.push(b'\\');
    buf.push(tag);
    for shift in (0..width).rev() {
        buf.push(HEX[((value >> (shift * 4)) & 0xf) as usize]);
    }
}

/// Reverses [`append_quoted`]: takes a double-quoted literal and returns the
/// string it denotes, or `None` if `s` is not a well-formed literal.
///
/// # Examples
///
/// ```
/// use text_logger::quoting::unquote;
///
/// assert_eq!(unquote(r#""a \"b\"\n""#).as_deref(), Some("a \"b\"\n"));
/// assert_eq!(unquote("bare"), None);
/// ```
pub fn unquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return None,
            '\\' => {
                let escaped = match chars.next()? {
                    'a' => '\x07',
                    'b' => '\x08',
                    'f' => '\x0c',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'v' => '\x0b',
                    '\\' => '\\',
                    '"' => '"',
                    'x' => {
                        out.push(parse_hex(&mut chars, 2)? as u8);
                        continue;
                    }
                    'u' => char::from_u32(parse_hex(&mut chars, 4)?)?,
                    'U' => char::from_u32(parse_hex(&mut chars, 8)?)?,
                    _ => return None,
                };
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(escaped.encode_utf8(&mut utf8).as_bytes());
            }
            c => {
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    String::from_utf8(out).ok()
}

fn parse_hex(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..digits {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(s: &str) -> String {
        let mut buf = Vec::new();
        append_string(&mut buf, s);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_needs_quoting() {
        for (input, want) in [
            ("", false),
            ("ab", false),
            ("a=b", true),
            ("\"ab\"", true),
            ("\x07\x08", true),
            ("a\tb", true),
            ("µåπ", false),
            ("a\\b", false),
            ("del\x7f", true),
            ("nbsp\u{a0}", true),
            ("zero\u{200b}width", true),
            ("bad\u{fffd}", true),
            ("日本語", false),
            ("a\u{0378}b", true),
            ("a\u{0890}b", true),
            ("a\u{13430}b", true),
            ("a\u{1bca0}b", true),
            ("a\u{1d173}b", true),
            ("a\u{e0080}b", true),
            ("a\u{e000}b", true),
            ("a\u{2028}b", true),
        ] {
            assert_eq!(needs_quoting(input), want, "{input:?}");
        }
    }

    #[test]
    fn test_escapes() {
        assert_eq!(quoted("plain"), "plain");
        assert_eq!(quoted("qu\"o"), r#""qu\"o""#);
        assert_eq!(quoted("x\t\n\0y"), r#""x\t\n\x00y""#);
        assert_eq!(quoted("a b\\"), r#""a b\\""#);
        assert_eq!(quoted("\x07\x08\x0b\x0c\r"), r#""\a\b\v\f\r""#);
        assert_eq!(quoted("\u{a0}"), r#""\u00a0""#);
        assert_eq!(quoted("x\u{e0001}"), r#""x\U000e0001""#);
        assert_eq!(quoted("µ b"), "\"µ b\"");
        assert_eq!(quoted("x\u{0378}"), r#""x\u0378""#);
        assert_eq!(quoted("x\u{1d173}"), r#""x\U0001d173""#);
    }

    #[test]
    fn test_joined_key() {
        let mut buf = Vec::new();
        append_joined(&mut buf, "g.h.", "c");
        assert_eq!(buf, b"g.h.c");

        buf.clear();
        append_joined(&mut buf, " b.", "d=e");
        assert_eq!(buf, br#"" b.d=e""#);
    }

    #[test]
    fn test_quoted_bytes() {
        let mut buf = Vec::new();
        append_quoted_bytes(&mut buf, &[1, 2, 3, 4]);
        assert_eq!(buf, br#""\x01\x02\x03\x04""#);

        buf.clear();
        append_quoted_bytes(&mut buf, b"1234");
        assert_eq!(buf, br#""1234""#);

        buf.clear();
        append_quoted_bytes(&mut buf, b"ok\xffok");
        assert_eq!(buf, br#""ok\xffok""#);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""x\t\n\x00y""#).as_deref(), Some("x\t\n\0y"));
        assert_eq!(unquote(r#""\u00a0\U000e0001""#).as_deref(), Some("\u{a0}\u{e0001}"));
        assert_eq!(unquote(r#""unterminated"#), None);
        assert_eq!(unquote(r#""bad \q escape""#), None);
        assert_eq!(unquote(r#""inner " quote""#), None);
    }
}
