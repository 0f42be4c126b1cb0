//! Logical Stream
//!
//! A `LogicalStream` is what a script sees: a named stream with separate
//! read and write cursors, each addressable by character (1-based byte
//! offset) or by line, on top of one [`RawStream`].
//!
//! ```text
//!   Unknown ──open / first use──▶ Ready ──I/O failure──▶ NotReady | Eof
//!      ▲                            │                        │
//!      └──────────close─────────────┴────────close───────────┘
//!                                   (explicit open also recovers)
//! ```
//!
//! A stream that is NotReady, at Eof, or in the Error state re-raises on
//! every data operation until it is closed or explicitly reopened.
//! Informational queries (state, description, size, name) never raise.
//!
//! Conditions go to the host's [`ConditionSink`](crate::host::ConditionSink)
//! and then come back to the caller as a [`StreamError`] carrying the
//! operation's residual result.
//!
//! # Example
//!
//! ```rust,no_run
//! use seq_stream::LogicalStream;
//!
//! let mut log = LogicalStream::new("app.log");
//! log.lineout(Some(b"started".as_slice()), None)?;
//! assert_eq!(log.command("QUERY STREAMTYPE")?, "PERSISTENT");
//! log.close()?;
//! # Ok::<(), seq_stream::StreamError>(())
//! ```

pub mod options;
mod position;
mod transfer;

use crate::command::{TokenStream, abbreviates};
use crate::config::StreamConfig;
use crate::error::{IoError, ParseError, Residual, StreamError, os_message};
use crate::host::Host;
use crate::raw::{Access, OpenFlags, RawStream, Whence};
use crate::sys;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub use options::{Direction, OpenOptions, PositionQuery, PositionRequest, Target, Unit};
use position::LineMark;

const READY: &str = "READY:";

/// How bytes are grouped into lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// Lines end at a line feed and vary in length
    VariableLine,
    /// Every line is a record of exactly this many bytes
    FixedRecord(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn readable(self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn writeable(self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }

    fn raw(self) -> Access {
        match self {
            AccessMode::ReadOnly => Access::Read,
            AccessMode::WriteOnly => Access::Write,
            AccessMode::ReadWrite => Access::ReadWrite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Unknown,
    Ready,
    NotReady,
    Eof,
    Error,
}

/// The process's standard handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardHandle {
    Input,
    Output,
    Error,
}

impl StandardHandle {
    /// `STDIN`, `STDOUT`, `STDERR`, any case, optionally with a trailing colon
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_suffix(':').unwrap_or(name);
        if name.eq_ignore_ascii_case("STDIN") {
            Some(StandardHandle::Input)
        } else if name.eq_ignore_ascii_case("STDOUT") {
            Some(StandardHandle::Output)
        } else if name.eq_ignore_ascii_case("STDERR") {
            Some(StandardHandle::Error)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StandardHandle::Input => "STDIN",
            StandardHandle::Output => "STDOUT",
            StandardHandle::Error => "STDERR",
        }
    }

    pub fn fd(self) -> RawFd {
        match self {
            StandardHandle::Input => libc::STDIN_FILENO,
            StandardHandle::Output => libc::STDOUT_FILENO,
            StandardHandle::Error => libc::STDERR_FILENO,
        }
    }

    fn access(self) -> AccessMode {
        match self {
            StandardHandle::Input => AccessMode::ReadOnly,
            _ => AccessMode::WriteOnly,
        }
    }
}

/// What the operation that triggered an implicit open wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Path,
    Standard(StandardHandle),
    Handle(RawFd),
}

/// A named stream with independent read and write cursors
#[derive(Debug)]
pub struct LogicalStream {
    name: String,
    qualified: Option<PathBuf>,
    source: Source,
    host: Host,
    config: StreamConfig,
    raw: RawStream,
    discipline: Discipline,
    state: StreamState,
    error_code: i32,
    access: Option<AccessMode>,
    append: bool,
    no_buffer: bool,
    /// 1-based
    char_read: u64,
    char_write: u64,
    /// Line holding the cursor and where it starts; `None` = must be recomputed
    read_mark: Option<LineMark>,
    write_mark: Option<LineMark>,
    /// A displaced mark that is still true, used as a scan starting point
    scan_hint: Option<LineMark>,
    /// Total lines, variable-line discipline only
    line_count: Option<u64>,
    /// Handed to the condition sink when the current operation fails
    default_result: Residual,
    line_buffer: Vec<u8>,
}

impl LogicalStream {
    /// Unopened stream using the default host and the process-wide config
    pub fn new(name: impl Into<String>) -> Self {
        LogicalStream::with_host(name, Host::default(), StreamConfig::global().clone())
    }

    pub fn with_config(name: impl Into<String>, config: StreamConfig) -> Self {
        LogicalStream::with_host(name, Host::default(), config)
    }

    pub fn with_host(name: impl Into<String>, host: Host, config: StreamConfig) -> Self {
        let name = name.into();
        let source = match StandardHandle::from_name(&name) {
            Some(kind) => Source::Standard(kind),
            None => Source::Path,
        };
        LogicalStream {
            name,
            qualified: None,
            source,
            host,
            config,
            raw: RawStream::new(),
            discipline: Discipline::VariableLine,
            state: StreamState::Unknown,
            error_code: 0,
            access: None,
            append: false,
            no_buffer: false,
            char_read: 1,
            char_write: 1,
            read_mark: Some(LineMark::FIRST),
            write_mark: Some(LineMark::FIRST),
            scan_hint: None,
            line_count: None,
            default_result: Residual::None,
            line_buffer: Vec::new(),
        }
    }

    /// Stream bound to a standard handle right away
    ///
    /// If the handle cannot be adopted the stream comes back NotReady.
    pub fn for_standard_handle(kind: StandardHandle) -> Self {
        let mut stream = LogicalStream::new(kind.name());
        if let Err(err) = stream.bind_standard(kind) {
            stream.state = StreamState::NotReady;
            stream.error_code = err.code();
        }
        stream
    }

    /// Stream over a descriptor owned by someone else; it is never closed here
    pub fn from_handle(name: impl Into<String>, fd: RawFd) -> Self {
        let mut stream = LogicalStream::new(name);
        stream.source = Source::Handle(fd);
        if let Err(err) = stream.bind_handle(fd) {
            stream.state = StreamState::NotReady;
            stream.error_code = err.code();
        }
        stream
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified path, or the name itself for standard/handle streams
    pub fn qualified_name(&self) -> String {
        match self.source {
            Source::Path => self.qualified_path().display().to_string(),
            Source::Standard(kind) => kind.name().to_string(),
            Source::Handle(_) => self.name.clone(),
        }
    }

    fn qualified_path(&self) -> PathBuf {
        match &self.qualified {
            Some(path) => path.clone(),
            None => self.host.paths.qualify(&self.name),
        }
    }

    pub fn stream_state(&self) -> StreamState {
        self.state
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// `None` while the stream is not open
    pub fn access_mode(&self) -> Option<AccessMode> {
        self.access
    }

    pub fn is_append(&self) -> bool {
        self.append
    }

    pub fn is_no_buffer(&self) -> bool {
        self.no_buffer
    }

    pub fn is_standard_stream(&self) -> bool {
        matches!(self.source, Source::Standard(_))
    }

    pub fn is_handle_bound(&self) -> bool {
        matches!(self.source, Source::Handle(_))
    }

    pub fn is_transient(&self) -> bool {
        self.raw.is_open() && self.raw.is_transient()
    }

    /// Underlying raw stream, for diagnostics
    pub fn raw(&self) -> &RawStream {
        &self.raw
    }

    /// Residual handed out with the most recent condition
    pub fn default_result(&self) -> &Residual {
        &self.default_result
    }

    /// Character read cursor (1-based)
    pub fn read_position(&self) -> u64 {
        self.char_read
    }

    /// Character write cursor (1-based)
    pub fn write_position(&self) -> u64 {
        self.char_write
    }

    // ------------------------------------------------------------------
    // Open and close
    // ------------------------------------------------------------------

    /// Explicit open; `options` is an OPEN option string
    ///
    /// Option errors are reported before the stream is touched. A failed
    /// open leaves the stream NotReady with `ERROR:<code>` as the residual.
    pub fn open(&mut self, options: &str) -> Result<String, StreamError> {
        let opts = OpenOptions::parse(options, self.config.default_share)?;

        if self.raw.is_open()
            && let Err(err) = self.raw.close()
        {
            tracing::warn!(stream = %self.name, %err, "flush failed while reopening");
        }
        self.reset();

        let result = match self.source {
            Source::Path => self.open_path(&opts),
            Source::Standard(kind) => self.bind_standard(kind),
            Source::Handle(fd) => self.bind_handle(fd),
        };
        match result {
            Ok(()) => {
                self.discipline = opts.discipline;
                Ok(READY.to_string())
            }
            Err(err) => {
                self.abandon();
                self.default_result = Residual::Text(format!("ERROR:{}", err.code()));
                Err(self.raise(err))
            }
        }
    }

    fn open_path(&mut self, opts: &OpenOptions) -> Result<(), IoError> {
        let path = self.qualified_path();
        self.qualified = Some(path.clone());
        let flags = OpenFlags::new(opts.access.raw()).truncate(opts.replace);

        let access = match self.raw.open(&path, flags, opts.share) {
            Ok(()) => opts.access,
            Err(err) if opts.access == AccessMode::ReadWrite && is_device(&path) => {
                tracing::debug!(stream = %self.name, %err, "device refused read-write, retrying write-only");
                let fallback = OpenFlags::new(Access::Write).create(false);
                self.raw.open(&path, fallback, opts.share)?;
                AccessMode::WriteOnly
            }
            Err(err) => return Err(err),
        };

        self.access = Some(access);
        self.append = opts.append && access.writeable();
        self.no_buffer = opts.no_buffer;
        self.discipline = opts.discipline;
        self.finish_open()
    }

    /// Open on first use: read-write first, then the intent's own mode
    fn attach(&mut self, intent: Intent) -> Result<(), IoError> {
        let path = match self.source {
            Source::Standard(kind) => return self.bind_standard(kind),
            Source::Handle(fd) => return self.bind_handle(fd),
            Source::Path => self.qualified_path(),
        };
        self.qualified = Some(path.clone());
        let share = self.config.default_share;

        let first = OpenFlags::new(Access::ReadWrite).create(intent == Intent::Write);
        let access = match self.raw.open(&path, first, share) {
            Ok(()) => AccessMode::ReadWrite,
            Err(err) => {
                let fallback = match intent {
                    Intent::Write => AccessMode::WriteOnly,
                    Intent::Read => AccessMode::ReadOnly,
                };
                tracing::debug!(stream = %self.name, %err, ?fallback, "implicit read-write open failed, retrying");
                self.raw.open(&path, OpenFlags::new(fallback.raw()), share)?;
                fallback
            }
        };

        self.access = Some(access);
        self.append = access.writeable();
        self.no_buffer = false;
        self.discipline = Discipline::VariableLine;
        self.finish_open()
    }

    fn bind_standard(&mut self, kind: StandardHandle) -> Result<(), IoError> {
        self.raw.open_from_handle(kind.fd())?;
        self.access = Some(kind.access());
        self.append = false;
        self.no_buffer = true;
        self.discipline = Discipline::VariableLine;
        self.finish_open()
    }

    fn bind_handle(&mut self, fd: RawFd) -> Result<(), IoError> {
        self.raw.open_from_handle(fd)?;
        let class = self.raw.classification();
        let access = match (class.readable, class.writeable) {
            (true, false) => AccessMode::ReadOnly,
            (false, true) => AccessMode::WriteOnly,
            _ => AccessMode::ReadWrite,
        };
        self.access = Some(access);
        self.append = false;
        self.no_buffer = false;
        self.discipline = Discipline::VariableLine;
        self.finish_open()?;

        // cursors start wherever the owner left the descriptor
        let at = self.raw.tell() + 1;
        if at > 1 {
            self.char_read = at;
            self.char_write = at;
            self.read_mark = None;
            self.write_mark = None;
        }
        Ok(())
    }

    fn finish_open(&mut self) -> Result<(), IoError> {
        let buffered = !self.no_buffer && !self.raw.is_transient();
        self.raw.set_buffering(buffered, self.config.buffer_size)?;
        self.raw.set_scan_chunk(self.config.scan_chunk);
        self.reset_positions();

        if self.append && !self.raw.is_transient() {
            self.position_for_append()?;
        }
        self.state = StreamState::Ready;
        self.error_code = 0;
        tracing::debug!(
            stream = %self.name,
            access = ?self.access,
            append = self.append,
            buffered,
            transient = self.raw.is_transient(),
            "stream ready"
        );
        Ok(())
    }

    /// Put the write cursor after existing data, on top of a trailing sentinel
    fn position_for_append(&mut self) -> Result<(), IoError> {
        let size = self.raw.size()?;
        if size == 0 {
            return Ok(());
        }
        let mut end = size + 1;
        if let Some(sentinel) = self.config.sentinel
            && self.last_byte(size)? == Some(sentinel)
        {
            end = size;
        }
        self.char_write = end;
        self.write_mark = None;
        Ok(())
    }

    /// Final byte of a non-empty stream; a write-only stream is read
    /// through a short-lived read descriptor
    fn last_byte(&mut self, size: u64) -> Result<Option<u8>, IoError> {
        let mut last = [0u8; 1];
        if self.raw.classification().readable {
            self.raw.seek(size as i64 - 1, Whence::Start)?;
            return Ok((self.raw.read(&mut last)? == 1).then_some(last[0]));
        }
        let fd = match sys::open(&self.qualified_path(), libc::O_RDONLY) {
            Ok(fd) => fd,
            Err(err) => {
                tracing::debug!(stream = %self.name, %err, "cannot read back the last byte");
                return Ok(None);
            }
        };
        let got = sys::seek_to(fd, size - 1).and_then(|_| sys::read(fd, &mut last));
        if let Err(err) = sys::close(fd) {
            tracing::debug!(stream = %self.name, %err, "closing the read-back descriptor failed");
        }
        Ok((got? == 1).then_some(last[0]))
    }

    fn reset_positions(&mut self) {
        self.char_read = 1;
        self.char_write = 1;
        self.read_mark = Some(LineMark::FIRST);
        self.write_mark = Some(LineMark::FIRST);
        self.scan_hint = None;
        self.line_count = None;
    }

    fn reset(&mut self) {
        self.state = StreamState::Unknown;
        self.error_code = 0;
        self.access = None;
        self.append = false;
        self.no_buffer = false;
        self.discipline = Discipline::VariableLine;
        self.default_result = Residual::None;
        self.line_buffer = Vec::new();
        self.reset_positions();
    }

    /// Drop a half-finished open
    fn abandon(&mut self) {
        let _ = self.raw.close();
        self.access = None;
    }

    /// Flush, release the handle (unless borrowed), forget all positions
    ///
    /// The handle is released even if the flush fails; the failure is then
    /// raised as NOTREADY.
    pub fn close(&mut self) -> Result<String, StreamError> {
        let result = self.raw.close();
        self.reset();
        tracing::debug!(stream = %self.name, "stream closed");
        match result {
            Ok(()) => Ok(READY.to_string()),
            Err(err) => {
                let err = self.raise(err);
                self.state = StreamState::Unknown;
                Err(err)
            }
        }
    }

    /// Push pending writes to the OS; answers with the description
    pub fn flush(&mut self) -> Result<String, StreamError> {
        if self.state == StreamState::Ready {
            self.default_result = Residual::None;
            self.raw.flush().map_err(|e| self.raise(e))?;
        }
        Ok(self.description())
    }

    // ------------------------------------------------------------------
    // Readiness and conditions
    // ------------------------------------------------------------------

    fn ensure_ready(&mut self, intent: Intent) -> Result<(), StreamError> {
        match self.state {
            StreamState::Ready => Ok(()),
            StreamState::Unknown => self.attach(intent).map_err(|e| {
                self.abandon();
                self.default_result = Residual::Text(format!("ERROR:{}", e.code()));
                self.raise(e)
            }),
            _ => Err(self.reraise()),
        }
    }

    /// Open on first use without raising; false if the stream is unusable
    fn ready_quietly(&mut self, intent: Intent) -> bool {
        match self.state {
            StreamState::Ready => true,
            StreamState::Unknown => match self.attach(intent) {
                Ok(()) => true,
                Err(err) => {
                    tracing::debug!(stream = %self.name, %err, "quiet implicit open failed");
                    self.abandon();
                    self.reset();
                    false
                }
            },
            _ => false,
        }
    }

    fn require_read(&mut self) -> Result<(), StreamError> {
        match self.access {
            Some(access) if access.readable() => Ok(()),
            _ => Err(self.raise_not_ready(libc::EBADF)),
        }
    }

    fn require_write(&mut self) -> Result<(), StreamError> {
        match self.access {
            Some(access) if access.writeable() => Ok(()),
            _ => Err(self.raise_not_ready(libc::EBADF)),
        }
    }

    /// Classify a failed primitive and raise the matching condition
    fn raise(&mut self, err: IoError) -> StreamError {
        match err {
            IoError::Eof => self.raise_eof(),
            IoError::Os(code) => self.raise_not_ready(code),
        }
    }

    fn raise_not_ready(&mut self, code: i32) -> StreamError {
        self.state = StreamState::NotReady;
        self.error_code = code;
        let residual = std::mem::take(&mut self.default_result);
        self.host.conditions.raise_not_ready(&self.name, &residual);
        StreamError::NotReady {
            stream: self.name.clone(),
            code,
            residual,
        }
    }

    fn raise_eof(&mut self) -> StreamError {
        self.state = StreamState::Eof;
        let residual = std::mem::take(&mut self.default_result);
        self.host.conditions.raise_eof(&self.name);
        StreamError::Eof {
            stream: self.name.clone(),
            residual,
        }
    }

    /// Enter the Error state; only a reopen or close leaves it
    fn internal_failure(&mut self, code: i32, detail: String) -> StreamError {
        tracing::warn!(stream = %self.name, %detail, "stream entered error state");
        self.state = StreamState::Error;
        self.error_code = code;
        let residual = std::mem::take(&mut self.default_result);
        self.host.conditions.raise_not_ready(&self.name, &residual);
        StreamError::Internal {
            stream: self.name.clone(),
            detail,
        }
    }

    /// A stream that is already not ready fails again the same way
    fn reraise(&mut self) -> StreamError {
        match self.state {
            StreamState::Eof => self.raise_eof(),
            StreamState::Error => {
                self.internal_failure(self.error_code, "stream is in the error state".into())
            }
            _ => self.raise_not_ready(self.error_code),
        }
    }

    // ------------------------------------------------------------------
    // Informational queries
    // ------------------------------------------------------------------

    /// `READY`, `NOTREADY`, `ERROR` or `UNKNOWN`
    pub fn state(&self) -> &'static str {
        match self.state {
            StreamState::Ready => "READY",
            StreamState::NotReady | StreamState::Eof => "NOTREADY",
            StreamState::Error => "ERROR",
            StreamState::Unknown => "UNKNOWN",
        }
    }

    /// State plus detail, e.g. `NOTREADY:EOF` or `NOTREADY:2 No such file or directory`
    pub fn description(&self) -> String {
        match self.state {
            StreamState::Ready => READY.to_string(),
            StreamState::Eof => "NOTREADY:EOF".to_string(),
            StreamState::NotReady => {
                format!("NOTREADY:{} {}", self.error_code, os_message(self.error_code))
            }
            StreamState::Error => format!("ERROR:{}", self.error_code),
            StreamState::Unknown => "UNKNOWN:".to_string(),
        }
    }

    /// `PERSISTENT`, `TRANSIENT` or `UNKNOWN`
    pub fn stream_type(&self) -> &'static str {
        if self.raw.is_open() {
            if self.raw.is_transient() {
                "TRANSIENT"
            } else {
                "PERSISTENT"
            }
        } else if self.is_standard_stream() {
            "TRANSIENT"
        } else {
            "UNKNOWN"
        }
    }

    pub fn handle(&self) -> Option<RawFd> {
        self.raw.handle()
    }

    /// Size in bytes of a persistent stream, open or not
    pub fn size(&mut self) -> Option<u64> {
        if self.raw.is_open() {
            if self.raw.is_transient() {
                return None;
            }
            return self.raw.size().ok();
        }
        match self.source {
            Source::Path => self.host.metadata.size(&self.qualified_path()),
            _ => None,
        }
    }

    /// Qualified name if the stream exists, else an empty string
    pub fn exists(&self) -> String {
        match self.source {
            Source::Path => {
                let path = self.qualified_path();
                if self.raw.is_open() || self.host.metadata.exists(&path) {
                    path.display().to_string()
                } else {
                    String::new()
                }
            }
            _ => self.qualified_name(),
        }
    }

    fn modified(&mut self) -> Option<SystemTime> {
        if self.raw.is_open() {
            return self.raw.timestamp().ok().flatten();
        }
        match self.source {
            Source::Path => self.host.metadata.modified(&self.qualified_path()),
            _ => None,
        }
    }

    /// Last modification as `MM-DD-YY HH:MM:SS` local time, or empty
    pub fn datetime(&mut self) -> String {
        match self.modified().and_then(local_time) {
            Some(t) => format!(
                "{:02}-{:02}-{:02} {:02}:{:02}:{:02}",
                t.month,
                t.day,
                t.year.rem_euclid(100),
                t.hour,
                t.minute,
                t.second
            ),
            None => String::new(),
        }
    }

    /// Last modification as `YYYY-MM-DD HH:MM:SS` local time, or empty
    pub fn timestamp(&mut self) -> String {
        match self.modified().and_then(local_time) {
            Some(t) => format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                t.year, t.month, t.day, t.hour, t.minute, t.second
            ),
            None => String::new(),
        }
    }

    // ------------------------------------------------------------------
    // Stream commands
    // ------------------------------------------------------------------

    /// Run a stream command: `OPEN`, `CLOSE`, `FLUSH`, `SEEK`/`POSITION`, `QUERY`
    pub fn command(&mut self, text: &str) -> Result<String, StreamError> {
        let mut tokens = TokenStream::new(text);
        let Some(token) = tokens.next_token() else {
            return Err(ParseError::MissingValue("command".into()).into());
        };
        let word = tokens.text(token);
        let rest = tokens.remainder();

        if abbreviates("OPEN", 1, word) {
            self.open(rest)
        } else if abbreviates("CLOSE", 1, word) {
            self.close()
        } else if abbreviates("FLUSH", 1, word) {
            self.flush()
        } else if abbreviates("SEEK", 2, word) || abbreviates("POSITION", 1, word) {
            self.seek(rest).map(|pos| pos.to_string())
        } else if abbreviates("QUERY", 1, word) {
            self.query(rest)
        } else {
            Err(ParseError::Unrecognized(word.to_string()).into())
        }
    }

    fn query(&mut self, text: &str) -> Result<String, StreamError> {
        let mut tokens = TokenStream::new(text);
        let Some(token) = tokens.next_token() else {
            return Err(ParseError::MissingValue("QUERY".into()).into());
        };
        let word = tokens.text(token);
        let rest = tokens.remainder();

        let answer = if abbreviates("EXISTS", 1, word) {
            self.exists()
        } else if abbreviates("SIZE", 2, word) {
            self.size().map(|s| s.to_string()).unwrap_or_default()
        } else if abbreviates("HANDLE", 1, word) {
            self.handle().map(|fd| fd.to_string()).unwrap_or_default()
        } else if abbreviates("STREAMTYPE", 2, word) {
            self.stream_type().to_string()
        } else if abbreviates("DATETIME", 1, word) {
            self.datetime()
        } else if abbreviates("TIMESTAMP", 1, word) {
            self.timestamp()
        } else if abbreviates("SEEK", 2, word) || abbreviates("POSITION", 1, word) {
            self.query_position(rest)?
        } else {
            return Err(ParseError::Unrecognized(word.to_string()).into());
        };
        Ok(answer)
    }
}

fn is_device(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;
    std::fs::metadata(path)
        .map(|m| m.file_type().is_char_device() || m.file_type().is_block_device())
        .unwrap_or(false)
}

fn local_time(t: SystemTime) -> Option<sys::LocalTime> {
    let secs = t.duration_since(UNIX_EPOCH).ok()?.as_secs();
    sys::local_time(secs as i64)
}
