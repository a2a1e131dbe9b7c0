use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;

use crate::encoder::{self, append_error, append_level, append_uint};
use crate::fast_time::append_rfc3339_millis;
use crate::handler::Handler;
use crate::level::{Level, Leveler};
use crate::quoting::{append_joined, append_string, needs_quoting};
use crate::record::{Record, Source};
use crate::scratch_pool::{Pooled, ScratchPool};
use crate::value::{Attr, Value};

/// Key of the built-in time field.
pub const TIME_KEY: &str = "time";
/// Key of the built-in level field.
pub const LEVEL_KEY: &str = "level";
/// Key of the built-in source field.
pub const SOURCE_KEY: &str = "source";
/// Key of the built-in message field.
pub const MESSAGE_KEY: &str = "msg";

/// Separator between group names and keys.
const KEY_COMPONENT_SEP: char = '.';

/// Hook that may rewrite or drop each attribute before it is written.
///
/// It receives the names of the groups the attribute is nested in (outermost
/// first) and the attribute itself. Returning an attribute with an empty key
/// and a non-group value drops it.
pub type ReplaceAttr = Arc<dyn Fn(&[String], Attr) -> Attr + Send + Sync>;

/// Configuration for a [`TextHandler`].
///
/// # Examples
///
/// ```
/// use text_logger::{Attr, HandlerOptions, Level, TextHandler};
///
/// let opts = HandlerOptions::new()
///     .level(Level::DEBUG)
///     .add_source(true)
///     .replace_attr(|_groups, a: Attr| if a.key == "password" { Attr::string("password", "***") } else { a });
/// let handler = TextHandler::with_options(std::io::sink(), opts);
/// ```
#[derive(Clone, Default)]
pub struct HandlerOptions {
    /// Minimum level to handle. `None` means [`Level::INFO`].
    pub level: Option<Arc<dyn Leveler>>,
    /// Write a `source=FILE:LINE` field for records that carry a source.
    pub add_source: bool,
    /// Called on every non-group attribute, built-in fields included.
    ///
    /// The built-in `time`, `level`, `source` and `msg` fields are passed with
    /// an empty group list regardless of any groups opened on the handler.
    /// The level is passed as an opaque value rendering as its name and the
    /// source as a `FILE:LINE` string.
    pub replace_attr: Option<ReplaceAttr>,
    /// Scratch pool for per-record buffers. `None` means the process-wide
    /// [`ScratchPool::shared`] pool.
    pub pool: Option<Arc<ScratchPool>>,
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: impl Leveler + 'static) -> Self {
        self.level = Some(Arc::new(level));
        self
    }

    /// Uses a shared, possibly dynamic, minimum level such as a
    /// [`LevelVar`](crate::LevelVar).
    pub fn shared_level(mut self, level: Arc<dyn Leveler>) -> Self {
        self.level = Some(level);
        self
    }

    pub fn add_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    pub fn replace_attr<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String], Attr) -> Attr + Send + Sync + 'static,
    {
        self.replace_attr = Some(Arc::new(f));
        self
    }

    pub fn pool(mut self, pool: Arc<ScratchPool>) -> Self {
        self.pool = Some(pool);
        self
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("level", &self.level.as_ref().map(|l| l.level()))
            .field("add_source", &self.add_source)
            .field("replace_attr", &self.replace_attr.is_some())
            .finish_non_exhaustive()
    }
}

/// A [`Handler`] that writes each record as one line of space-separated
/// `key=value` pairs.
///
/// # Output
///
/// ```text
/// time=2000-01-02T03:04:05.000Z level=INFO msg="a message" req.method=GET status=200
/// ```
///
/// * `time` is omitted when the record has no time; otherwise it is RFC 3339
///   with millisecond precision.
/// * `level` is always written, as the level's name.
/// * `source` is written as `FILE:LINE` when [`HandlerOptions::add_source`]
///   is set and the record has a source.
/// * `msg` is always written.
///
/// Built-in fields are never qualified by groups. Use
/// [`HandlerOptions::replace_attr`] to rename or remove any of them.
///
/// Keys and string values are quoted only when they contain spaces, `=`, `"`,
/// control characters or non-printable characters. Numbers, booleans,
/// durations (`1m0s`) and times are written bare. Values implementing
/// [`TextMarshaler`](crate::TextMarshaler) are written as their text, byte
/// sequences as quoted strings, and any other serializable value as JSON, so
/// structured values keep their shape.
///
/// Keys inside groups are the group names and the key joined by dots. Dots
/// inside names are not escaped, so `a.b.c` may come from groups `a` and `b`
/// with key `c`, from group `a.b` with key `c`, or from group `a` with key
/// `b.c`. Where that matters, encode the structure into keys with
/// [`HandlerOptions::replace_attr`].
///
/// # Concurrency
///
/// Formatting happens in a scratch buffer private to the call; only the final
/// write to the sink holds the lock, and each record is written with a single
/// `write_all`, so lines from concurrent calls never interleave.
///
/// [`Handler::with_attrs`] and [`Handler::with_group`] return new handlers
/// that share the sink and lock but copy everything else, so they never
/// disturb records being handled by the handler they came from.
pub struct TextHandler<W> {
    opts: HandlerOptions,
    pool: Arc<ScratchPool>,
    /// Attributes from `with_attrs`, already rendered.
    preformatted_attrs: Vec<u8>,
    /// Key prefix of the groups opened while preformatting.
    group_prefix: String,
    /// Every group started with `with_group`.
    groups: Vec<String>,
    /// How many of `groups` are already part of `group_prefix`.
    n_open_groups: usize,
    sink: Arc<Mutex<W>>,
}

impl<W> Clone for TextHandler<W> {
    fn clone(&self) -> Self {
        Self {
            opts: self.opts.clone(),
            pool: Arc::clone(&self.pool),
            preformatted_attrs: self.preformatted_attrs.clone(),
            group_prefix: self.group_prefix.clone(),
            groups: self.groups.clone(),
            n_open_groups: self.n_open_groups,
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<W: Write + Send> TextHandler<W> {
    /// Creates a handler writing to `sink` with default options.
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, HandlerOptions::default())
    }

    pub fn with_options(sink: W, opts: HandlerOptions) -> Self {
        let pool = opts.pool.clone().unwrap_or_else(ScratchPool::shared);
        Self {
            opts,
            pool,
            preformatted_attrs: Vec::new(),
            group_prefix: String::new(),
            groups: Vec::new(),
            n_open_groups: 0,
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.opts
    }

    /// Appends `record` to `buf` as one line, terminating newline included.
    /// Anything already in `buf` is left untouched.
    pub fn format_record(&self, record: &Record, buf: &mut Vec<u8>) {
        let mut state = self.new_handle_state(buf);

        // Built-in fields are not in any group, and the hook sees no groups
        // for them.
        let groups = state.groups.take();
        let replacing = self.opts.replace_attr.is_some();

        if let Some(time) = record.time {
            if replacing {
                state.append_attr(&Attr::new(TIME_KEY, Value::Time(time)));
            } else {
                state.append_key(TIME_KEY);
                state.append_time(&time);
            }
        }

        if replacing {
            state.append_attr(&Attr::new(LEVEL_KEY, Value::text(record.level)));
        } else {
            state.append_key(LEVEL_KEY);
            append_level(state.buf, record.level);
        }

        if self.opts.add_source {
            if let Some(source) = record.source.as_ref().filter(|s| !s.file.is_empty()) {
                if replacing {
                    state.append_attr(&Attr::string(SOURCE_KEY, source.to_string()));
                } else {
                    state.append_key(SOURCE_KEY);
                    state.append_source(source);
                }
            }
        }

        if replacing {
            state.append_attr(&Attr::string(MESSAGE_KEY, record.message.as_str()));
        } else {
            state.append_key(MESSAGE_KEY);
            state.append_string(&record.message);
        }

        state.groups = groups;
        state.append_non_builtins(self, record.attrs());
        state.buf.push(b'\n');
    }

    fn new_handle_state<'a>(&'a self, buf: &'a mut Vec<u8>) -> HandleState<'a> {
        let groups = self.opts.replace_attr.as_ref().map(|_| {
            let mut groups = self.pool.group_list();
            groups.extend_from_slice(&self.groups[..self.n_open_groups]);
            groups
        });
        HandleState {
            replace_attr: self.opts.replace_attr.as_ref(),
            pending_groups: &self.groups[self.n_open_groups..],
            line_start: buf.len(),
            buf,
            prefix: self.pool.prefix(),
            groups,
        }
    }

    fn min_level(&self) -> Level {
        self.opts.level.as_ref().map_or(Level::INFO, |l| l.level())
    }
}

impl<W: Write + Send> Handler for TextHandler<W> {
    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level()
    }

    fn handle(&self, record: &Record) -> io::Result<()> {
        let mut buf = self.pool.buffer();
        self.format_record(record, &mut buf);

        let mut sink = self.sink.lock();
        sink.write_all(&buf)
    }

    fn flush(&self) -> io::Result<()> {
        self.sink.lock().flush()
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        let mut h2 = self.clone();
        let mut state = self.new_handle_state(&mut h2.preformatted_attrs);
        // New attributes continue the run already cached.
        state.line_start = 0;
        state.prefix.push_str(&self.group_prefix);
        state.open_groups();
        for attr in &attrs {
            state.append_attr(attr);
        }
        // Later keys continue under the groups opened here, and those groups
        // are not opened again when a record is handled.
        h2.group_prefix = state.prefix.as_str().to_owned();
        drop(state);
        h2.n_open_groups = h2.groups.len();
        h2
    }

    fn with_group(&self, name: &str) -> Self {
        let mut h2 = self.clone();
        if !name.is_empty() {
            h2.groups.push(name.to_owned());
        }
        h2
    }
}

/// State for one formatting pass: a single `handle` call, or the rendering of
/// attributes in `with_attrs`.
struct HandleState<'a> {
    replace_attr: Option<&'a ReplaceAttr>,
    /// Groups from `with_group` that are not yet part of the key prefix.
    pending_groups: &'a [String],
    /// Where this pass started writing in `buf`.
    line_start: usize,
    buf: &'a mut Vec<u8>,
    /// Current key prefix: open group names, each followed by the separator.
    prefix: Pooled<'a, String>,
    /// Open group names as shown to the replace hook. Only present when a
    /// hook is configured.
    groups: Option<Pooled<'a, Vec<String>>>,
}

impl HandleState<'_> {
    fn append_non_builtins<W>(&mut self, h: &TextHandler<W>, attrs: &[Attr]) {
        if !h.preformatted_attrs.is_empty() {
            self.append_separator();
            self.buf.extend_from_slice(&h.preformatted_attrs);
        }
        // Unlike the built-ins, record attributes are inside the groups
        // started with `with_group`.
        self.prefix.push_str(&h.group_prefix);
        self.open_groups();
        for attr in attrs {
            self.append_attr(attr);
        }
    }

    fn open_groups(&mut self) {
        let pending = self.pending_groups;
        for name in pending {
            self.open_group(name);
        }
    }

    fn open_group(&mut self, name: &str) {
        self.prefix.push_str(name);
        self.prefix.push(KEY_COMPONENT_SEP);
        if let Some(groups) = self.groups.as_mut() {
            groups.push(name.to_owned());
        }
    }

    /// Closes the innermost group, which must be `name`.
    fn close_group(&mut self, name: &str) {
        let len = self.prefix.len() - name.len() - KEY_COMPONENT_SEP.len_utf8();
        self.prefix.truncate(len);
        if let Some(groups) = self.groups.as_mut() {
            groups.pop();
        }
    }

    fn group_names(&self) -> &[String] {
        match &self.groups {
            Some(groups) => groups.as_slice(),
            None => &[],
        }
    }

    fn append_attr(&mut self, attr: &Attr) {
        let mut attr = Cow::Borrowed(attr);
        if matches!(attr.value, Value::LogValuer(_)) {
            let Attr { key, value } = attr.into_owned();
            attr = Cow::Owned(Attr::new(key, value.resolve()));
        }

        // Elide a non-group with an empty key.
        if attr.key.is_empty() && !attr.value.is_group() {
            return;
        }

        if let Some(replace) = self.replace_attr {
            if !attr.value.is_group() {
                let Attr { key, value } = replace(self.group_names(), attr.into_owned());
                if key.is_empty() && !value.is_group() {
                    return;
                }
                // The hook's result comes from user code and may be lazy.
                attr = Cow::Owned(Attr::new(key, value.resolve()));
            }
        }

        match &attr.value {
            Value::Group(members) => {
                // Output only non-empty groups; inline one with an empty key.
                if members.is_empty() {
                    return;
                }
                let named = !attr.key.is_empty();
                if named {
                    self.open_group(&attr.key);
                }
                for member in members {
                    self.append_attr(member);
                }
                if named {
                    self.close_group(&attr.key);
                }
            }
            value => {
                self.append_key(&attr.key);
                self.append_value(value);
            }
        }
    }

    fn append_separator(&mut self) {
        if self.buf.len() > self.line_start {
            self.buf.push(b' ');
        }
    }

    fn append_key(&mut self, key: &str) {
        self.append_separator();
        if self.prefix.is_empty() {
            append_string(self.buf, key);
        } else {
            append_joined(self.buf, &self.prefix, key);
        }
        self.buf.push(b'=');
    }

    fn append_value(&mut self, value: &Value) {
        if let Err(err) = encoder::append_value(self.buf, value) {
            append_error(self.buf, &err);
        }
    }

    fn append_string(&mut self, s: &str) {
        append_string(self.buf, s);
    }

    fn append_time(&mut self, t: &DateTime<FixedOffset>) {
        append_rfc3339_millis(self.buf, t);
    }

    fn append_source(&mut self, source: &Source) {
        if needs_quoting(&source.file) {
            append_string(self.buf, &source.to_string());
        } else {
            // Common case: no quoting needed.
            self.buf.extend_from_slice(source.file.as_bytes());
            self.buf.push(b':');
            append_uint(self.buf, source.line.into());
        }
    }
}
