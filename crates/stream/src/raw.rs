//! Raw Stream: one descriptor, one buffer
//!
//! A `RawStream` performs the platform I/O for a logical stream. It owns a
//! single buffer that is used either for read-ahead or for pending writes,
//! never both at once:
//!
//! ```text
//!   Empty ──read──▶ ReadAhead { fill, cursor }
//!     ▲                 │
//!     │               write: seek OS to logical position, drop window
//!     │                 ▼
//!     └──flush──── WritePending { len }
//! ```
//!
//! `file_pointer` is where the OS descriptor sits. The logical position
//! (what `tell` reports) is derived from it and the window:
//!
//! - `Empty`: `file_pointer`
//! - `ReadAhead`: `file_pointer - fill + cursor`
//! - `WritePending`: `file_pointer + len`
//!
//! minus one while a pushback byte is held.
//!
//! Every primitive returns `Result<_, IoError>`; the most recent OS error
//! code is also kept and available through [`RawStream::last_error`].
//! Nothing retries, except that writes keep issuing OS writes until the
//! whole span is out or the OS reports an error.

use crate::config::ShareMode;
use crate::error::IoError;
use crate::sys::{self, FileKind};
use std::os::unix::io::RawFd;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const LINE_FEED: u8 = b'\n';
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Platform line terminator appended by `put_line`
pub const LINE_END: &[u8] = b"\n";

/// Chunk size used by `seek_forward_lines` unless configured otherwise
const DEFAULT_SCAN_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    pub fn writeable(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

/// How to open a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub access: Access,
    pub create: bool,
    pub truncate: bool,
    pub append: bool,
}

impl OpenFlags {
    /// Writers create missing files; readers do not
    pub fn new(access: Access) -> Self {
        OpenFlags {
            access,
            create: access.writeable(),
            truncate: false,
            append: false,
        }
    }

    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    fn to_libc(self) -> libc::c_int {
        let mut flags = match self.access {
            Access::Read => libc::O_RDONLY,
            Access::Write => libc::O_WRONLY,
            Access::ReadWrite => libc::O_RDWR,
        };
        if self.create {
            flags |= libc::O_CREAT;
        }
        if self.truncate {
            flags |= libc::O_TRUNC;
        }
        // append is positional, not O_APPEND: the stream tracks its own
        // write cursor and O_APPEND would make file_pointer lie
        flags
    }
}

/// Origin for `seek`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

/// Facts captured once when a handle is opened or adopted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    /// Not seekable: pipe, socket, terminal, other character device
    pub transient: bool,
    pub device: bool,
    pub tty: bool,
    pub readable: bool,
    pub writeable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Empty,
    ReadAhead { fill: usize, cursor: usize },
    WritePending { len: usize },
}

/// Buffered platform stream over a single descriptor
#[derive(Debug)]
pub struct RawStream {
    fd: Option<RawFd>,
    /// Close the descriptor when done (false for adopted handles)
    owned: bool,
    /// Empty when unbuffered
    buffer: Vec<u8>,
    window: Window,
    file_pointer: u64,
    pushback: Option<u8>,
    at_eof: bool,
    last_error: i32,
    class: Classification,
    share: ShareMode,
    scan_chunk: usize,
    line_scans: u64,
    /// Bytes of the last `write` taken before it returned
    accepted: usize,
}

impl Default for RawStream {
    fn default() -> Self {
        RawStream::new()
    }
}

impl RawStream {
    /// A closed, unbuffered stream
    pub fn new() -> Self {
        RawStream {
            fd: None,
            owned: false,
            buffer: Vec::new(),
            window: Window::Empty,
            file_pointer: 0,
            pushback: None,
            at_eof: false,
            last_error: 0,
            class: Classification::default(),
            share: ShareMode::default(),
            scan_chunk: DEFAULT_SCAN_CHUNK,
            line_scans: 0,
            accepted: 0,
        }
    }

    /// Open `path`; the descriptor is not inherited by child processes
    pub fn open(&mut self, path: &Path, flags: OpenFlags, share: ShareMode) -> Result<(), IoError> {
        if self.is_open() {
            let _ = self.close();
        }
        let fd = sys::open(path, flags.to_libc()).map_err(|e| self.record(e))?;
        self.adopt(fd, true, flags.access.readable(), flags.access.writeable());
        self.share = share;
        tracing::debug!(path = %path.display(), fd, ?flags, ?share, "raw stream opened");

        if flags.append && !self.class.transient {
            self.seek(0, Whence::End)?;
        }
        Ok(())
    }

    /// Adopt a descriptor opened elsewhere; it is never closed by this stream
    pub fn open_from_handle(&mut self, fd: RawFd) -> Result<(), IoError> {
        if self.is_open() {
            let _ = self.close();
        }
        let (readable, writeable) = sys::access_mode(fd).map_err(|e| self.record(e))?;
        self.adopt(fd, false, readable, writeable);
        tracing::debug!(fd, readable, writeable, "raw stream adopted handle");
        Ok(())
    }

    fn adopt(&mut self, fd: RawFd, owned: bool, readable: bool, writeable: bool) {
        let kind = sys::fstat(fd).map(|st| st.kind).unwrap_or(FileKind::Other);
        self.class = Classification {
            transient: !matches!(kind, FileKind::Regular | FileKind::BlockDevice),
            device: matches!(kind, FileKind::CharDevice | FileKind::BlockDevice),
            tty: sys::isatty(fd),
            readable,
            writeable,
        };
        self.fd = Some(fd);
        self.owned = owned;
        self.window = Window::Empty;
        self.pushback = None;
        self.at_eof = false;
        self.last_error = 0;
        self.file_pointer = if self.class.transient {
            0
        } else {
            sys::current_offset(fd).unwrap_or(0)
        };
    }

    /// (Re)allocate the buffer, or drop it; cursors always reset
    ///
    /// Pending writes are flushed and the OS position is moved to the
    /// logical position first, so no data or position is lost.
    pub fn set_buffering(&mut self, enabled: bool, size: usize) -> Result<(), IoError> {
        if self.is_open() {
            self.flush()?;
            self.drop_read_ahead()?;
        }
        self.buffer = if enabled && size > 0 {
            vec![0u8; size]
        } else {
            Vec::new()
        };
        self.window = Window::Empty;
        Ok(())
    }

    pub fn set_scan_chunk(&mut self, size: usize) {
        self.scan_chunk = size.max(1);
    }

    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    pub fn handle(&self) -> Option<RawFd> {
        self.fd
    }

    pub fn is_buffered(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn classification(&self) -> Classification {
        self.class
    }

    pub fn is_transient(&self) -> bool {
        self.class.transient
    }

    pub fn is_device(&self) -> bool {
        self.class.device
    }

    pub fn is_tty(&self) -> bool {
        self.class.tty
    }

    pub fn share_mode(&self) -> ShareMode {
        self.share
    }

    /// Most recent OS error code, 0 if none
    pub fn last_error(&self) -> i32 {
        self.last_error
    }

    /// Set once a read hits end of file; cleared by seek and write
    pub fn at_eof(&self) -> bool {
        self.at_eof
    }

    /// Where the OS descriptor is positioned (0-based)
    pub fn file_pointer(&self) -> u64 {
        self.file_pointer
    }

    /// Number of forward line scans performed
    pub fn line_scans(&self) -> u64 {
        self.line_scans
    }

    fn record(&mut self, err: IoError) -> IoError {
        if let IoError::Os(code) = err {
            self.last_error = code;
        }
        err
    }

    fn fd(&mut self) -> Result<RawFd, IoError> {
        match self.fd {
            Some(fd) => Ok(fd),
            None => Err(self.record(IoError::Os(libc::EBADF))),
        }
    }

    /// Logical 0-based position, accounting for the buffer and pushback
    pub fn tell(&self) -> u64 {
        let base = match self.window {
            Window::Empty => self.file_pointer,
            Window::ReadAhead { fill, cursor } => self.file_pointer - fill as u64 + cursor as u64,
            Window::WritePending { len } => self.file_pointer + len as u64,
        };
        base.saturating_sub(self.pushback.is_some() as u64)
    }

    /// Live OS offset of the descriptor
    pub fn os_position(&mut self) -> Result<u64, IoError> {
        let fd = self.fd()?;
        sys::current_offset(fd).map_err(|e| self.record(e))
    }

    /// Discard read-ahead (and pushback), leaving the OS at the logical position
    fn drop_read_ahead(&mut self) -> Result<(), IoError> {
        let holds_input =
            matches!(self.window, Window::ReadAhead { .. }) || self.pushback.is_some();
        if !holds_input {
            return Ok(());
        }
        let logical = self.tell();
        if !self.class.transient && logical != self.file_pointer {
            let fd = self.fd()?;
            self.file_pointer = sys::seek_to(fd, logical).map_err(|e| self.record(e))?;
        }
        if matches!(self.window, Window::ReadAhead { .. }) {
            self.window = Window::Empty;
        }
        self.pushback = None;
        tracing::trace!(position = logical, "read-ahead discarded");
        Ok(())
    }

    /// Read up to `buf.len()` bytes
    ///
    /// A zero-byte OS read sets the EOF flag and ends the call with what
    /// was copied so far, possibly nothing. Never returns more than asked.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let fd = self.fd()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let mut copied = 0;
        if let Some(byte) = self.pushback.take() {
            buf[0] = byte;
            copied = 1;
        }

        if self.buffer.is_empty() {
            while copied < buf.len() {
                let n = sys::read(fd, &mut buf[copied..]).map_err(|e| self.record(e))?;
                if n == 0 {
                    self.at_eof = true;
                    break;
                }
                self.file_pointer += n as u64;
                copied += n;
            }
            return Ok(copied);
        }

        if matches!(self.window, Window::WritePending { .. }) {
            self.flush()?;
        }

        while copied < buf.len() {
            match self.window {
                Window::ReadAhead { fill, cursor } if cursor < fill => {
                    let take = (fill - cursor).min(buf.len() - copied);
                    buf[copied..copied + take].copy_from_slice(&self.buffer[cursor..cursor + take]);
                    self.window = Window::ReadAhead {
                        fill,
                        cursor: cursor + take,
                    };
                    copied += take;
                }
                _ => {
                    let n = sys::read(fd, &mut self.buffer).map_err(|e| self.record(e))?;
                    if n == 0 {
                        self.at_eof = true;
                        self.window = Window::Empty;
                        break;
                    }
                    self.file_pointer += n as u64;
                    self.window = Window::ReadAhead { fill: n, cursor: 0 };
                }
            }
        }
        Ok(copied)
    }

    /// Look at the next byte without consuming it
    pub fn peek(&mut self) -> Result<Option<u8>, IoError> {
        let mut byte = [0u8; 1];
        if self.read(&mut byte)? == 0 {
            return Ok(None);
        }
        self.pushback = Some(byte[0]);
        Ok(Some(byte[0]))
    }

    /// Return one byte to be delivered before anything else
    pub fn unread(&mut self, byte: u8) {
        self.pushback = Some(byte);
    }

    /// Write all of `data`
    ///
    /// Leaving read-ahead mode first puts the OS descriptor at the logical
    /// position so the bytes land where the reader left off. Spans larger
    /// than the buffer go straight to the OS after a flush. After a failure
    /// [`accepted`](Self::accepted) tells how much of `data` was taken.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, IoError> {
        self.accepted = 0;
        let fd = self.fd()?;
        if data.is_empty() {
            return Ok(0);
        }
        self.drop_read_ahead()?;
        self.at_eof = false;

        if self.buffer.is_empty() || data.len() > self.buffer.len() {
            self.flush()?;
            let result = write_all(fd, data);
            let landed = match result {
                Ok(()) => data.len(),
                Err((landed, _)) => landed,
            };
            self.file_pointer += landed as u64;
            self.accepted = landed;
            result.map_err(|(_, e)| self.record(e))?;
            return Ok(data.len());
        }

        while self.accepted < data.len() {
            let len = match self.window {
                Window::WritePending { len } => len,
                _ => 0,
            };
            let written = self.accepted;
            let take = (self.buffer.len() - len).min(data.len() - written);
            self.buffer[len..len + take].copy_from_slice(&data[written..written + take]);
            self.window = Window::WritePending { len: len + take };
            self.accepted += take;
            if len + take == self.buffer.len() {
                self.flush()?;
            }
        }
        Ok(self.accepted)
    }

    /// How much of the last `write` was taken: all of it on success, the
    /// bytes that reached the OS or the buffer on failure
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Write `data` followed by the platform line terminator
    pub fn put_line(&mut self, data: &[u8]) -> Result<(), IoError> {
        self.write(data)?;
        self.write(LINE_END)?;
        Ok(())
    }

    /// Push pending write data to the OS; nothing pending is a no-op
    pub fn flush(&mut self) -> Result<(), IoError> {
        let Window::WritePending { len } = self.window else {
            return Ok(());
        };
        if len > 0 {
            let fd = self.fd()?;
            if let Err((landed, err)) = write_all(fd, &self.buffer[..len]) {
                // keep the unwritten tail pending so tell() stays exact
                self.file_pointer += landed as u64;
                self.buffer.copy_within(landed..len, 0);
                self.window = Window::WritePending { len: len - landed };
                return Err(self.record(err));
            }
            self.file_pointer += len as u64;
        }
        self.window = Window::Empty;
        Ok(())
    }

    /// Reposition; returns the new 0-based offset
    ///
    /// `Current` is relative to the logical position, not the OS one.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, IoError> {
        let fd = self.fd()?;
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => {
                self.flush()?;
                self.tell() as i128
            }
            Whence::End => self.size()? as i128,
        };
        self.flush()?;

        let target = base + offset as i128;
        if target < 0 {
            return Err(self.record(IoError::Os(libc::EINVAL)));
        }
        let new = sys::seek_to(fd, target as u64).map_err(|e| self.record(e))?;
        self.file_pointer = new;
        self.window = Window::Empty;
        self.pushback = None;
        self.at_eof = false;
        Ok(new)
    }

    /// Read one line, byte by byte, into `buf`
    ///
    /// Stops after a line feed (which is stored) or when `buf` is full. A
    /// carriage return immediately before the line feed is folded into it.
    /// `Err(Eof)` only when nothing at all could be read.
    pub fn get_line(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let mut count = 0;
        let mut byte = [0u8; 1];
        while count < buf.len() {
            if self.read(&mut byte)? == 0 {
                break;
            }
            if byte[0] == LINE_FEED {
                if count > 0 && buf[count - 1] == CARRIAGE_RETURN {
                    buf[count - 1] = LINE_FEED;
                } else {
                    buf[count] = LINE_FEED;
                    count += 1;
                }
                return Ok(count);
            }
            buf[count] = byte[0];
            count += 1;
        }
        if count == 0 && !buf.is_empty() {
            return Err(IoError::Eof);
        }
        Ok(count)
    }

    /// Scan forward from `from` crossing up to `*lines` line feeds
    ///
    /// Each line feed crossed decrements `*lines`. Returns the offset just
    /// past the last one crossed. Running out of data is not an error: the
    /// residual stays positive and the returned offset is the stream length.
    pub fn seek_forward_lines(&mut self, from: u64, lines: &mut u64) -> Result<u64, IoError> {
        self.line_scans += 1;
        if *lines == 0 {
            return Ok(from);
        }
        self.seek(from as i64, Whence::Start)?;

        let mut chunk = vec![0u8; self.scan_chunk];
        let mut offset = from;
        loop {
            let n = self.read(&mut chunk)?;
            if n == 0 {
                tracing::trace!(from, end = offset, residual = *lines, "line scan hit end");
                return Ok(offset);
            }
            for (i, &b) in chunk[..n].iter().enumerate() {
                if b == LINE_FEED {
                    *lines -= 1;
                    if *lines == 0 {
                        let end = offset + i as u64 + 1;
                        self.seek(end as i64, Whence::Start)?;
                        return Ok(end);
                    }
                }
            }
            offset += n as u64;
        }
    }

    /// Count line feeds in `[from, to)`
    ///
    /// Also returns the offset just past the last one counted, or `from`
    /// when there was none. Stops early at end of file.
    pub fn count_lines(&mut self, from: u64, to: u64) -> Result<(u64, u64), IoError> {
        self.line_scans += 1;
        if to <= from {
            return Ok((0, from));
        }
        self.seek(from as i64, Whence::Start)?;

        let mut chunk = vec![0u8; self.scan_chunk];
        let mut offset = from;
        let mut count = 0;
        let mut line_start = from;
        while offset < to {
            let want = (to - offset).min(chunk.len() as u64) as usize;
            let n = self.read(&mut chunk[..want])?;
            if n == 0 {
                break;
            }
            for (i, &b) in chunk[..n].iter().enumerate() {
                if b == LINE_FEED {
                    count += 1;
                    line_start = offset + i as u64 + 1;
                }
            }
            offset += n as u64;
        }
        Ok((count, line_start))
    }

    /// Size in bytes, including pending writes; 0 for non-regular files
    pub fn size(&mut self) -> Result<u64, IoError> {
        let fd = self.fd()?;
        self.flush()?;
        let st = sys::fstat(fd).map_err(|e| self.record(e))?;
        Ok(match st.kind {
            FileKind::Regular => st.size,
            _ => 0,
        })
    }

    /// Last modification time; `None` for non-regular files
    pub fn timestamp(&mut self) -> Result<Option<SystemTime>, IoError> {
        let fd = self.fd()?;
        self.flush()?;
        let st = sys::fstat(fd).map_err(|e| self.record(e))?;
        if st.kind != FileKind::Regular || st.modified < 0 {
            return Ok(None);
        }
        Ok(Some(UNIX_EPOCH + Duration::from_secs(st.modified as u64)))
    }

    /// Flush, release the descriptor if owned, free the buffer
    ///
    /// The descriptor is released even when the flush fails; the first
    /// failure is returned.
    pub fn close(&mut self) -> Result<(), IoError> {
        let Some(fd) = self.fd else {
            return Ok(());
        };
        let flushed = self.flush();
        let closed = if self.owned { sys::close(fd) } else { Ok(()) };
        tracing::debug!(fd, owned = self.owned, "raw stream closed");

        self.fd = None;
        self.owned = false;
        self.buffer = Vec::new();
        self.window = Window::Empty;
        self.pushback = None;
        self.at_eof = false;
        self.file_pointer = 0;
        self.class = Classification::default();

        flushed.and(closed).map_err(|e| self.record(e))
    }
}

impl Drop for RawStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Keep writing until the span is out or the OS fails; a failure carries
/// the bytes that did land
fn write_all(fd: RawFd, data: &[u8]) -> Result<(), (usize, IoError)> {
    let mut landed = 0;
    while landed < data.len() {
        match sys::write(fd, &data[landed..]) {
            Ok(0) => return Err((landed, IoError::Os(libc::EIO))),
            Ok(n) => landed += n,
            Err(err) => return Err((landed, err)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &[u8]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn open_rw(path: &Path, buffer: usize) -> RawStream {
        let mut raw = RawStream::new();
        raw.open(path, OpenFlags::new(Access::ReadWrite), ShareMode::ReadWrite)
            .unwrap();
        raw.set_buffering(buffer > 0, buffer).unwrap();
        raw
    }

    #[derive(Clone, Copy)]
    enum Op {
        Read(usize),
        Write(&'static [u8]),
        Seek(i64, Whence),
        Flush,
    }

    fn replay(path: &Path, buffer: usize, ops: &[Op]) -> (Vec<Vec<u8>>, Vec<u64>) {
        let mut raw = open_rw(path, buffer);
        let mut reads = Vec::new();
        let mut positions = Vec::new();
        for op in ops {
            match *op {
                Op::Read(n) => {
                    let mut buf = vec![0u8; n];
                    let got = raw.read(&mut buf).unwrap();
                    buf.truncate(got);
                    reads.push(buf);
                }
                Op::Write(data) => {
                    raw.write(data).unwrap();
                }
                Op::Seek(offset, whence) => {
                    raw.seek(offset, whence).unwrap();
                }
                Op::Flush => raw.flush().unwrap(),
            }
            positions.push(raw.tell());
        }
        raw.close().unwrap();
        (reads, positions)
    }

    #[test]
    fn test_buffered_matches_unbuffered() {
        let ops = [
            Op::Read(3),
            Op::Write(b"XY"),
            Op::Read(4),
            Op::Seek(-2, Whence::Current),
            Op::Write(b"0123456789abcdef"),
            Op::Read(2),
            Op::Seek(0, Whence::Start),
            Op::Read(12),
            Op::Seek(-3, Whence::End),
            Op::Write(b"!"),
            Op::Flush,
            Op::Read(10),
        ];
        let original = b"abcdefghijklmnopqrstuvwxyz";

        let reference = file_with(original);
        let (ref_reads, ref_pos) = replay(reference.path(), 0, &ops);

        for buffer in [1usize, 4, 8, 64] {
            let candidate = file_with(original);
            let (reads, pos) = replay(candidate.path(), buffer, &ops);
            assert_eq!(reads, ref_reads, "reads differ with buffer {}", buffer);
            assert_eq!(pos, ref_pos, "positions differ with buffer {}", buffer);
            assert_eq!(
                std::fs::read(candidate.path()).unwrap(),
                std::fs::read(reference.path()).unwrap(),
                "contents differ with buffer {}",
                buffer
            );
        }
    }

    #[test]
    fn test_read_after_write_same_offset() {
        let temp_file = file_with(b"0000000000");
        let mut raw = open_rw(temp_file.path(), 8);

        let mut buf = [0u8; 2];
        raw.read(&mut buf).unwrap();
        raw.write(b"abc").unwrap();
        raw.seek(2, Whence::Start).unwrap();
        let mut back = [0u8; 3];
        assert_eq!(raw.read(&mut back).unwrap(), 3);
        assert_eq!(&back, b"abc");
    }

    #[test]
    fn test_flush_is_idempotent() {
        let temp_file = file_with(b"");
        let mut raw = open_rw(temp_file.path(), 16);
        raw.write(b"hello").unwrap();
        assert_eq!(raw.file_pointer(), 0);

        raw.flush().unwrap();
        let after_first = raw.file_pointer();
        assert_eq!(after_first, 5);
        raw.flush().unwrap();
        assert_eq!(raw.file_pointer(), after_first);
        assert_eq!(std::fs::read(temp_file.path()).unwrap(), b"hello");
    }

    #[test]
    fn test_large_write_bypasses_buffer() {
        let temp_file = file_with(b"");
        let mut raw = open_rw(temp_file.path(), 4);
        raw.write(b"ab").unwrap();
        raw.write(b"0123456789").unwrap();
        // both the pending bytes and the large span are on disk
        assert_eq!(raw.file_pointer(), 12);
        assert_eq!(std::fs::read(temp_file.path()).unwrap(), b"ab0123456789");
    }

    #[test]
    fn test_read_reports_eof_with_partial_data() {
        let temp_file = file_with(b"abc");
        let mut raw = open_rw(temp_file.path(), 2);
        let mut buf = [0u8; 8];
        assert_eq!(raw.read(&mut buf).unwrap(), 3);
        assert!(raw.at_eof());
        assert_eq!(raw.read(&mut buf).unwrap(), 0);
        raw.seek(0, Whence::Start).unwrap();
        assert!(!raw.at_eof());
    }

    #[test]
    fn test_pushback_served_first() {
        let temp_file = file_with(b"bc");
        let mut raw = open_rw(temp_file.path(), 0);
        assert_eq!(raw.peek().unwrap(), Some(b'b'));
        assert_eq!(raw.tell(), 0);
        raw.unread(b'a');
        let mut buf = [0u8; 3];
        assert_eq!(raw.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ac");
    }

    #[test]
    fn test_get_line_normalizes_crlf() {
        let temp_file = file_with(b"one\r\ntwo\nlast");
        let mut raw = open_rw(temp_file.path(), 8);
        let mut buf = [0u8; 32];

        let n = raw.get_line(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"one\n");
        let n = raw.get_line(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"two\n");
        let n = raw.get_line(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"last");
        assert_eq!(raw.get_line(&mut buf), Err(IoError::Eof));
    }

    #[test]
    fn test_get_line_stops_at_capacity() {
        let temp_file = file_with(b"abcdefgh\n");
        let mut raw = open_rw(temp_file.path(), 0);
        let mut buf = [0u8; 4];
        assert_eq!(raw.get_line(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(raw.tell(), 4);
    }

    #[test]
    fn test_put_line_round_trip() {
        let temp_file = file_with(b"");
        let mut raw = open_rw(temp_file.path(), 16);
        raw.put_line(b"plain ascii text").unwrap();
        raw.seek(0, Whence::Start).unwrap();

        let mut buf = [0u8; 64];
        let n = raw.get_line(&mut buf).unwrap();
        assert_eq!(&buf[..n - LINE_END.len()], b"plain ascii text");
    }

    #[test]
    fn test_seek_forward_lines_found() {
        let temp_file = file_with(b"a\nbb\nccc\ndddd\n");
        let mut raw = open_rw(temp_file.path(), 4);
        raw.set_scan_chunk(3);

        let mut lines = 2;
        let end = raw.seek_forward_lines(0, &mut lines).unwrap();
        assert_eq!(lines, 0);
        assert_eq!(end, 5);

        let mut lines = 1;
        let end = raw.seek_forward_lines(end, &mut lines).unwrap();
        assert_eq!(lines, 0);
        assert_eq!(end, 9);
        assert_eq!(raw.line_scans(), 2);
    }

    #[test]
    fn test_seek_forward_lines_runs_out() {
        let contents = b"a\nbb\nccc";
        let temp_file = file_with(contents);
        let mut raw = open_rw(temp_file.path(), 0);

        let mut lines = 5;
        let end = raw.seek_forward_lines(0, &mut lines).unwrap();
        assert_eq!(lines, 3);
        assert_eq!(end, contents.len() as u64);
    }

    #[test]
    fn test_count_lines_in_range() {
        let temp_file = file_with(b"a\nbb\nccc\ndd");
        let mut raw = open_rw(temp_file.path(), 4);
        raw.set_scan_chunk(2);

        assert_eq!(raw.count_lines(0, 11).unwrap(), (3, 9));
        assert_eq!(raw.count_lines(2, 5).unwrap(), (1, 5));
        assert_eq!(raw.count_lines(5, 8).unwrap(), (0, 5));
        // past the end just stops
        assert_eq!(raw.count_lines(9, 100).unwrap(), (0, 9));
    }

    #[test]
    fn test_open_append_positions_at_end() {
        let temp_file = file_with(b"0123456789");
        let mut raw = RawStream::new();
        raw.open(
            temp_file.path(),
            OpenFlags::new(Access::Write).append(true),
            ShareMode::ReadWrite,
        )
        .unwrap();
        assert_eq!(raw.tell(), 10);
        raw.write(b"!").unwrap();
        raw.close().unwrap();
        assert_eq!(std::fs::read(temp_file.path()).unwrap(), b"0123456789!");
    }

    #[test]
    fn test_open_failure_sets_last_error() {
        let mut raw = RawStream::new();
        let err = raw
            .open(
                Path::new("/nonexistent/dir/file.txt"),
                OpenFlags::new(Access::Read),
                ShareMode::ReadWrite,
            )
            .unwrap_err();
        assert_eq!(err, IoError::Os(libc::ENOENT));
        assert_eq!(raw.last_error(), libc::ENOENT);
        assert!(!raw.is_open());
    }

    #[test]
    fn test_classification_of_regular_file() {
        let temp_file = file_with(b"x");
        let raw = open_rw(temp_file.path(), 0);
        let class = raw.classification();
        assert!(!class.transient);
        assert!(!class.device);
        assert!(!class.tty);
        assert!(class.readable && class.writeable);
    }

    #[test]
    fn test_adopted_pipe_is_transient_and_not_closed() {
        let mut fds = [0 as libc::c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);

        let mut writer = RawStream::new();
        writer.open_from_handle(fds[1]).unwrap();
        assert!(writer.is_transient());
        assert_eq!(writer.size().unwrap(), 0);
        assert_eq!(writer.timestamp().unwrap(), None);
        writer.write(b"ping").unwrap();
        writer.close().unwrap();

        // still open: we can write through the original descriptor
        assert_eq!(sys::write(fds[1], b"!").unwrap(), 1);
        sys::close(fds[1]).unwrap();

        let mut reader = RawStream::new();
        reader.open_from_handle(fds[0]).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"ping!");
        reader.close().unwrap();
        sys::close(fds[0]).unwrap();
    }

    fn nonblocking_pipe() -> [libc::c_int; 2] {
        let mut fds = [0 as libc::c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let flags = unsafe { libc::fcntl(fds[1], libc::F_GETFL) };
        assert_eq!(unsafe { libc::fcntl(fds[1], libc::F_SETFL, flags | libc::O_NONBLOCK) }, 0);
        fds
    }

    fn drain(fd: libc::c_int) -> usize {
        let mut total = 0;
        let mut buf = [0u8; 8192];
        loop {
            let n = sys::read(fd, &mut buf).unwrap();
            if n == 0 {
                return total;
            }
            total += n;
        }
    }

    #[test]
    fn test_short_write_counts_landed_bytes() {
        let fds = nonblocking_pipe();
        let data = vec![b'w'; 1 << 20];

        let mut writer = RawStream::new();
        writer.open_from_handle(fds[1]).unwrap();
        assert_eq!(writer.write(&data), Err(IoError::Os(libc::EAGAIN)));
        let landed = writer.accepted();
        assert!(landed > 0 && landed < data.len());
        assert_eq!(writer.tell(), landed as u64);
        assert_eq!(writer.last_error(), libc::EAGAIN);
        writer.close().unwrap();
        sys::close(fds[1]).unwrap();

        assert_eq!(drain(fds[0]), landed);
        sys::close(fds[0]).unwrap();
    }

    #[test]
    fn test_failed_flush_keeps_unwritten_tail_pending() {
        let fds = nonblocking_pipe();
        let data = vec![b'f'; 1 << 20];

        let mut writer = RawStream::new();
        writer.open_from_handle(fds[1]).unwrap();
        writer.set_buffering(true, data.len() + 1).unwrap();
        assert_eq!(writer.write(&data).unwrap(), data.len());
        assert_eq!(writer.flush(), Err(IoError::Os(libc::EAGAIN)));
        assert_eq!(writer.tell(), data.len() as u64);

        let reader = std::thread::spawn(move || {
            let total = drain(fds[0]);
            sys::close(fds[0]).unwrap();
            total
        });
        loop {
            match writer.flush() {
                Ok(()) => break,
                Err(IoError::Os(code)) if code == libc::EAGAIN => std::thread::yield_now(),
                Err(err) => panic!("flush failed: {}", err),
            }
        }
        assert_eq!(writer.tell(), data.len() as u64);
        writer.close().unwrap();
        sys::close(fds[1]).unwrap();
        assert_eq!(reader.join().unwrap(), data.len());
    }

    #[test]
    fn test_operations_on_closed_stream_fail() {
        let mut raw = RawStream::new();
        let mut buf = [0u8; 1];
        assert_eq!(raw.read(&mut buf), Err(IoError::Os(libc::EBADF)));
        assert_eq!(raw.write(b"x"), Err(IoError::Os(libc::EBADF)));
        assert!(raw.close().is_ok());
    }
}
