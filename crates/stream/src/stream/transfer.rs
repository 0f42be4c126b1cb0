//! Character and line transfer
//!
//! `charin`/`charout` move raw bytes at the character cursors. `linein` and
//! `lineout` move one line: a line-feed terminated run for variable-line
//! streams, one record for fixed-record streams. Records are written blank
//! padded (or truncated) to the space left in the current record.
//!
//! Every write keeps the write cursor's line mark current by counting the
//! line feeds it wrote, and drops read-side line facts it may have changed.

use super::position::{Cursor, LineMark};
use super::{Discipline, Intent, LogicalStream};
use crate::error::{IoError, Residual, StreamError};
use crate::raw::{CARRIAGE_RETURN, LINE_END, LINE_FEED};

/// Mark after `data` was transferred starting at character `start`
fn advance_mark(mark: Option<LineMark>, start: u64, data: &[u8]) -> Option<LineMark> {
    let mut mark = mark?;
    for (i, &b) in data.iter().enumerate() {
        if b == LINE_FEED {
            mark.line += 1;
            mark.start = start + i as u64 + 1;
        }
    }
    Some(mark)
}

fn count_line_feeds(data: &[u8]) -> u64 {
    data.iter().filter(|&&b| b == LINE_FEED).count() as u64
}

impl LogicalStream {
    /// Read `count` bytes, optionally from character `position`
    ///
    /// Fewer bytes than asked raises end-of-stream with the bytes that
    /// were read as the residual.
    pub fn charin(&mut self, position: Option<u64>, count: u64) -> Result<Vec<u8>, StreamError> {
        self.default_result = Residual::Data(Vec::new());
        self.ensure_ready(Intent::Read)?;
        self.require_read()?;
        if let Some(pos) = position {
            self.move_char(Cursor::Read, pos)?;
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let data = self.read_chars(count)?;
        if (data.len() as u64) < count {
            self.default_result = Residual::Data(data);
            return Err(self.raise_eof());
        }
        Ok(data)
    }

    /// Write `data`, optionally at character `position`
    ///
    /// Returns the number of bytes not written (0). With neither data nor
    /// position the stream is closed.
    pub fn charout(&mut self, data: Option<&[u8]>, position: Option<u64>) -> Result<u64, StreamError> {
        if data.is_none() && position.is_none() {
            self.close()?;
            return Ok(0);
        }
        self.default_result = Residual::Count(data.map_or(0, |d| d.len() as u64));
        self.ensure_ready(Intent::Write)?;
        self.require_write()?;
        if let Some(pos) = position {
            self.move_char(Cursor::Write, pos)?;
        }
        let Some(data) = data else {
            return Ok(0);
        };

        self.line_count = None;
        if data.is_empty() {
            return Ok(0);
        }
        let start = self.char_write;
        self.seek_raw(start)?;
        if let Err((taken, err)) = self.put_at(start, data) {
            self.default_result = Residual::Count((data.len() - taken) as u64);
            return Err(self.raise(err));
        }
        Ok(0)
    }

    /// Read one line (`count` 1) or just position (`count` 0)
    ///
    /// The terminator is not returned. A final line without a terminator
    /// is returned as is; reading past it raises end-of-stream.
    pub fn linein(&mut self, position: Option<u64>, count: u64) -> Result<Vec<u8>, StreamError> {
        if count > 1 {
            return Err(StreamError::InvalidPosition(
                "line count must be 0 or 1".into(),
            ));
        }
        self.default_result = Residual::Data(Vec::new());
        self.ensure_ready(Intent::Read)?;
        self.require_read()?;
        if let Some(line) = position {
            self.move_line(Cursor::Read, line)?;
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        match self.discipline {
            Discipline::FixedRecord(n) => {
                let rest = n - (self.char_read - 1) % n;
                let record = self.read_chars(rest)?;
                if record.is_empty() {
                    return Err(self.raise_eof());
                }
                Ok(record)
            }
            Discipline::VariableLine => self.read_line(),
        }
    }

    /// Write one line, optionally starting at line `position`
    ///
    /// Returns 0 once written. With neither data nor position the stream
    /// is closed.
    pub fn lineout(&mut self, data: Option<&[u8]>, position: Option<u64>) -> Result<u64, StreamError> {
        if data.is_none() && position.is_none() {
            self.close()?;
            return Ok(0);
        }
        self.default_result = Residual::Count(1);
        self.ensure_ready(Intent::Write)?;
        self.require_write()?;
        if let Some(line) = position {
            self.move_line(Cursor::Write, line)?;
        }
        let Some(data) = data else {
            return Ok(0);
        };

        match self.discipline {
            Discipline::FixedRecord(n) => self.write_record(data, n)?,
            Discipline::VariableLine => self.write_line(data)?,
        }
        Ok(0)
    }

    /// Up to `count` bytes from the read cursor; short only at end of stream
    fn read_chars(&mut self, count: u64) -> Result<Vec<u8>, StreamError> {
        let start = self.char_read;
        let want = if self.raw.is_transient() {
            count
        } else {
            let size = self.stream_size()?;
            count.min((size + 1).saturating_sub(start))
        };
        self.seek_raw(start)?;

        let mut data = Vec::new();
        if data.try_reserve_exact(want as usize).is_err() {
            return Err(self.internal_failure(
                libc::ENOMEM,
                format!("cannot allocate {} bytes for a read", want),
            ));
        }
        if want > 0 {
            data.resize(want as usize, 0);
            let got = self.raw.read(&mut data).map_err(|e| self.raise(e))?;
            data.truncate(got);
        }
        let got = data.len();

        self.char_read = start + got as u64;
        self.read_mark = advance_mark(self.read_mark, start, &data);
        Ok(data)
    }

    /// Assemble one variable-length line in `line_chunk` pieces
    fn read_line(&mut self) -> Result<Vec<u8>, StreamError> {
        let start = self.char_read;
        self.seek_raw(start)?;

        let chunk = self.config.line_chunk.max(2);
        let mut line = std::mem::take(&mut self.line_buffer);
        line.clear();
        let mut terminated = false;
        loop {
            let at = line.len();
            if line.try_reserve(chunk).is_err() {
                return Err(self.internal_failure(
                    libc::ENOMEM,
                    format!("cannot grow line buffer past {} bytes", at),
                ));
            }
            line.resize(at + chunk, 0);
            match self.raw.get_line(&mut line[at..]) {
                Ok(n) => {
                    line.truncate(at + n);
                    if n > 0 && line[at + n - 1] == LINE_FEED {
                        line.pop();
                        // carriage return left at the end of the previous piece
                        if n == 1 && line.last() == Some(&CARRIAGE_RETURN) {
                            line.pop();
                        }
                        terminated = true;
                        break;
                    }
                    if n < chunk {
                        break;
                    }
                }
                Err(IoError::Eof) => {
                    line.truncate(at);
                    break;
                }
                Err(err) => {
                    line.truncate(at);
                    self.line_buffer = line;
                    return Err(self.raise(err));
                }
            }
        }

        if line.is_empty() && !terminated {
            self.line_buffer = line;
            return Err(self.raise_eof());
        }

        let end = self.raw.tell() + 1;
        self.char_read = end;
        if terminated {
            self.read_mark = self.read_mark.map(|m| LineMark {
                line: m.line + 1,
                start: end,
            });
        }
        let result = line.to_vec();
        self.line_buffer = line;
        Ok(result)
    }

    /// Write at the write cursor and bring cursor and line facts up to date
    fn write_at_cursor(&mut self, data: &[u8]) -> Result<(), StreamError> {
        if data.is_empty() {
            return Ok(());
        }
        let start = self.char_write;
        self.seek_raw(start)?;
        self.put_at(start, data).map_err(|(_, e)| self.raise(e))
    }

    /// Raw write at `start` plus cursor bookkeeping for whatever was taken;
    /// a failure carries that amount
    fn put_at(&mut self, start: u64, data: &[u8]) -> Result<(), (usize, IoError)> {
        let mut result = self.raw.write(data).map(|_| ());
        if result.is_ok() && self.no_buffer {
            result = self.raw.flush();
        }
        let taken = match result {
            Ok(()) => data.len(),
            Err(_) => self.raw.accepted().min(data.len()),
        };
        self.after_write(start, &data[..taken]);
        result.map_err(|e| (taken, e))
    }

    fn after_write(&mut self, start: u64, data: &[u8]) {
        self.invalidate_lines_from(start);
        self.char_write = start + data.len() as u64;
        self.write_mark = advance_mark(self.write_mark, start, data);
    }

    /// One record: the rest of the current record, blank padded or truncated
    fn write_record(&mut self, data: &[u8], record_length: u64) -> Result<(), StreamError> {
        let room = record_length - (self.char_write - 1) % record_length;
        let mut record = Vec::new();
        if record.try_reserve_exact(room as usize).is_err() {
            return Err(self.internal_failure(
                libc::ENOMEM,
                format!("cannot allocate a {} byte record", room),
            ));
        }
        let take = data.len().min(room as usize);
        record.extend_from_slice(&data[..take]);
        record.resize(room as usize, b' ');
        self.write_at_cursor(&record)
    }

    /// Data plus terminator; keeps a known line count current when appending
    fn write_line(&mut self, data: &[u8]) -> Result<(), StreamError> {
        let start = self.char_write;
        let known = match self.line_count {
            Some(total) if !self.raw.is_transient() => {
                if start > self.stream_size()? {
                    Some((total, self.line_starts_at(start)?))
                } else {
                    None
                }
            }
            _ => None,
        };

        self.seek_raw(start)?;
        self.raw.put_line(data).map_err(|e| self.raise(e))?;
        if self.no_buffer {
            self.raw.flush().map_err(|e| self.raise(e))?;
        }
        self.after_write(start, data);
        self.after_write(start + data.len() as u64, LINE_END);

        let added = count_line_feeds(data) + count_line_feeds(LINE_END);
        self.line_count = match known {
            Some((total, true)) => Some(total + added),
            // the first terminator finishes a partial last line
            Some((total, false)) => Some(total + added - 1),
            None => None,
        };
        Ok(())
    }

    /// Whether the write cursor at `pos` begins a line
    fn line_starts_at(&mut self, pos: u64) -> Result<bool, StreamError> {
        if let Some(mark) = self.write_mark {
            return Ok(mark.start == pos);
        }
        if pos == 1 {
            return Ok(true);
        }
        self.seek_raw(pos - 1)?;
        let mut before = [0u8; 1];
        let n = self.raw.read(&mut before).map_err(|e| self.raise(e))?;
        Ok(n == 1 && before[0] == LINE_FEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::host::{ConditionKind, ConditionLog, Host};
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    fn file_with(contents: &[u8]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn stream_with(path: &Path, log: &ConditionLog, config: StreamConfig) -> LogicalStream {
        LogicalStream::with_host(
            path.display().to_string(),
            Host::with_conditions(log.clone()),
            config,
        )
    }

    fn stream_on(path: &Path, log: &ConditionLog) -> LogicalStream {
        stream_with(path, log, StreamConfig::default())
    }

    #[test]
    fn test_advance_mark() {
        let mark = advance_mark(Some(LineMark::FIRST), 1, b"ab\ncd\ne");
        assert_eq!(mark, Some(LineMark { line: 3, start: 7 }));
        assert_eq!(advance_mark(None, 1, b"\n"), None);
        assert_eq!(
            advance_mark(Some(LineMark { line: 4, start: 9 }), 12, b"xyz"),
            Some(LineMark { line: 4, start: 9 })
        );
    }

    #[test]
    fn test_charin_implicit_open() {
        let temp_file = file_with(b"hello world");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);

        assert_eq!(stream.charin(None, 5).unwrap(), b"hello");
        assert_eq!(stream.state(), "READY");
        assert_eq!(stream.charin(Some(7), 5).unwrap(), b"world");
        assert_eq!(stream.charin(None, 0).unwrap(), b"");
    }

    #[test]
    fn test_charin_short_read_raises_eof() {
        let temp_file = file_with(b"abc");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);

        let err = stream.charin(None, 10).unwrap_err();
        assert!(matches!(err, StreamError::Eof { .. }));
        assert_eq!(err.residual(), &Residual::Data(b"abc".to_vec()));
        assert_eq!(stream.description(), "NOTREADY:EOF");
        assert_eq!(log.last().map(|c| c.kind), Some(ConditionKind::Eof));

        // sticky until closed
        assert!(matches!(stream.charin(Some(1), 1), Err(StreamError::Eof { .. })));
        assert_eq!(stream.seek("= 1").unwrap(), 1);
        assert_eq!(stream.description(), "NOTREADY:EOF");
        stream.close().unwrap();
        assert_eq!(stream.charin(Some(1), 1).unwrap(), b"a");
    }

    #[test]
    fn test_charout_then_charin_same_offset() {
        let temp_file = file_with(b"0123456789");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);
        stream.open("BOTH").unwrap();

        assert_eq!(stream.charin(None, 3).unwrap(), b"012");
        assert_eq!(stream.charout(Some(b"abc".as_slice()), Some(4)).unwrap(), 0);
        assert_eq!(stream.charin(None, 3).unwrap(), b"abc");
        assert_eq!(stream.write_position(), 7);
        stream.close().unwrap();
        assert_eq!(std::fs::read(temp_file.path()).unwrap(), b"012abc6789");
    }

    #[test]
    fn test_charout_implicit_open_creates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        let log = ConditionLog::new();
        let mut stream = stream_on(&path, &log);

        stream.charout(Some(b"abc".as_slice()), None).unwrap();
        stream.charout(Some(b"def".as_slice()), None).unwrap();
        // no data, no position: close
        stream.charout(None, None).unwrap();
        assert_eq!(stream.state(), "UNKNOWN");
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[test]
    fn test_charout_invalidates_line_facts() {
        let temp_file = file_with(b"a\nb\nc\n");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);
        stream.open("BOTH").unwrap();

        assert_eq!(stream.lines(false).unwrap(), 3);
        stream.seek("= 3 LINE READ").unwrap();
        stream.charout(Some(b"\n\n".as_slice()), Some(1)).unwrap();
        // rewritten before the read cursor: line is recounted
        assert_eq!(stream.line_read().unwrap(), 4);
        assert_eq!(stream.lines(false).unwrap(), 1);
        assert_eq!(stream.linein(None, 1).unwrap(), b"c");
    }

    #[test]
    fn test_write_to_read_only_raises_not_ready() {
        let temp_file = file_with(b"data");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);
        stream.open("READ").unwrap();

        let err = stream.charout(Some(b"xy".as_slice()), None).unwrap_err();
        assert_eq!(
            err,
            StreamError::NotReady {
                stream: stream.name().to_string(),
                code: libc::EBADF,
                residual: Residual::Count(2),
            }
        );
        assert_eq!(stream.state(), "NOTREADY");
    }

    #[test]
    fn test_charout_to_full_device_reports_unwritten_count() {
        let log = ConditionLog::new();
        let mut stream = stream_on(Path::new("/dev/full"), &log);
        stream.open("WRITE NOBUFFER").unwrap();

        let err = stream.charout(Some(b"abc".as_slice()), None).unwrap_err();
        assert!(matches!(err, StreamError::NotReady { code, .. } if code == libc::ENOSPC));
        assert_eq!(err.residual(), &Residual::Count(3));
        assert_eq!(
            stream.description(),
            format!("NOTREADY:{} {}", libc::ENOSPC, crate::error::os_message(libc::ENOSPC))
        );
        let drained = log.take();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].kind, ConditionKind::NotReady);
        assert_eq!(drained[0].residual, Residual::Count(3));
    }

    #[test]
    fn test_partial_charout_counts_only_unwritten_bytes() {
        let mut fds = [0 as libc::c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let flags = unsafe { libc::fcntl(fds[1], libc::F_GETFL) };
        assert_eq!(unsafe { libc::fcntl(fds[1], libc::F_SETFL, flags | libc::O_NONBLOCK) }, 0);
        let data = vec![b'p'; 1 << 20];

        let mut stream = LogicalStream::from_handle("pipe", fds[1]);
        let err = stream.charout(Some(data.as_slice()), None).unwrap_err();
        let Residual::Count(unwritten) = *err.residual() else {
            panic!("expected a count residual, got {:?}", err.residual());
        };
        assert!(unwritten > 0 && unwritten < data.len() as u64);
        assert_eq!(stream.write_position(), data.len() as u64 - unwritten + 1);
        assert_eq!(stream.state(), "NOTREADY");

        drop(stream);
        crate::sys::close(fds[1]).unwrap();
        let mut landed = 0u64;
        let mut buf = [0u8; 8192];
        loop {
            let n = crate::sys::read(fds[0], &mut buf).unwrap();
            if n == 0 {
                break;
            }
            landed += n as u64;
        }
        crate::sys::close(fds[0]).unwrap();
        assert_eq!(landed + unwritten, data.len() as u64);
    }

    #[test]
    fn test_implicit_read_of_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = ConditionLog::new();
        let mut stream = stream_on(&dir.path().join("absent.txt"), &log);

        let err = stream.linein(None, 1).unwrap_err();
        assert!(matches!(err, StreamError::NotReady { code, .. } if code == libc::ENOENT));
        assert_eq!(err.residual(), &Residual::Text(format!("ERROR:{}", libc::ENOENT)));
        assert_eq!(log.take().len(), 1);
        assert!(!dir.path().join("absent.txt").exists());

        let err = stream.charin(None, 1).unwrap_err();
        assert!(err.is_not_ready());
        assert_eq!(stream.state(), "NOTREADY");
    }

    #[test]
    fn test_implicit_open_failure_replaces_data_residual() {
        let dir = tempfile::tempdir().unwrap();
        let log = ConditionLog::new();
        let mut stream = stream_on(&dir.path().join("absent.txt"), &log);

        let err = stream.charin(None, 1).unwrap_err();
        assert_eq!(err.residual(), &Residual::Text(format!("ERROR:{}", libc::ENOENT)));
        assert_eq!(log.take().len(), 1);
    }

    #[test]
    fn test_linein_sequence() {
        let temp_file = file_with(b"first\r\nsecond\n\nlast");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);

        assert_eq!(stream.linein(None, 1).unwrap(), b"first");
        assert_eq!(stream.linein(None, 1).unwrap(), b"second");
        assert_eq!(stream.linein(None, 1).unwrap(), b"");
        assert_eq!(stream.line_read().unwrap(), 4);
        assert_eq!(stream.linein(None, 1).unwrap(), b"last");
        assert!(matches!(stream.linein(None, 1), Err(StreamError::Eof { .. })));
    }

    #[test]
    fn test_linein_small_chunks() {
        let temp_file = file_with(b"abc\r\na much longer line\n");
        let log = ConditionLog::new();
        let mut stream = stream_with(
            temp_file.path(),
            &log,
            StreamConfig::default().with_line_chunk(4),
        );

        assert_eq!(stream.linein(None, 1).unwrap(), b"abc");
        assert_eq!(stream.linein(None, 1).unwrap(), b"a much longer line");
        assert_eq!(stream.lines(false).unwrap(), 0);
    }

    #[test]
    fn test_linein_with_zero_line_chunk() {
        let temp_file = file_with(b"xy\nz\n");
        let log = ConditionLog::new();
        let config = StreamConfig {
            line_chunk: 0,
            ..StreamConfig::default()
        };
        let mut stream = stream_with(temp_file.path(), &log, config);

        assert_eq!(stream.linein(None, 1).unwrap(), b"xy");
        assert_eq!(stream.linein(None, 1).unwrap(), b"z");
    }

    #[test]
    fn test_linein_by_position() {
        let temp_file = file_with(b"one\ntwo\nthree\n");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);

        assert_eq!(stream.linein(Some(3), 1).unwrap(), b"three");
        assert_eq!(stream.linein(Some(1), 0).unwrap(), b"");
        assert_eq!(stream.linein(None, 1).unwrap(), b"one");
        assert!(matches!(
            stream.linein(None, 2),
            Err(StreamError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_lineout_appends_and_counts() {
        let temp_file = file_with(b"one\ntwo\n");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);
        stream.open("BOTH").unwrap();

        assert_eq!(stream.lines(false).unwrap(), 2);
        let scans = stream.raw().line_scans();
        stream.lineout(Some(b"three".as_slice()), None).unwrap();
        assert_eq!(stream.lines(false).unwrap(), 3);
        assert_eq!(stream.raw().line_scans(), scans);
        stream.close().unwrap();

        assert_eq!(std::fs::read(temp_file.path()).unwrap(), b"one\ntwo\nthree\n");
    }

    #[test]
    fn test_lineout_completes_partial_line() {
        let temp_file = file_with(b"one\ntw");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);
        stream.open("BOTH").unwrap();

        assert_eq!(stream.lines(false).unwrap(), 2);
        assert_eq!(stream.write_position(), 7);
        stream.lineout(Some(b"o".as_slice()), None).unwrap();
        assert_eq!(stream.lines(false).unwrap(), 2);
        stream.close().unwrap();
        assert_eq!(std::fs::read(temp_file.path()).unwrap(), b"one\ntwo\n");
    }

    #[test]
    fn test_lineout_replaces_line_in_place() {
        let temp_file = file_with(b"aaa\nbbb\nccc\n");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);

        stream.lineout(Some(b"BBB".as_slice()), Some(2)).unwrap();
        assert_eq!(stream.line_write().unwrap(), 3);
        stream.close().unwrap();
        assert_eq!(std::fs::read(temp_file.path()).unwrap(), b"aaa\nBBB\nccc\n");
    }

    #[test]
    fn test_fixed_records_padded_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.dat");
        let log = ConditionLog::new();
        let mut stream = stream_on(&path, &log);
        stream.open("WRITE REPLACE BINARY RECLENGTH 6").unwrap();

        stream.lineout(Some(b"ab".as_slice()), None).unwrap();
        stream.lineout(Some(b"abcdefgh".as_slice()), None).unwrap();
        stream.charout(Some(b"xy".as_slice()), None).unwrap();
        stream.lineout(Some(b"1234".as_slice()), None).unwrap();
        stream.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"ab    abcdefxy1234");
    }

    #[test]
    fn test_fixed_record_linein() {
        let temp_file = file_with(b"rec1rec2re");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);
        stream.open("READ BINARY RECLENGTH 4").unwrap();

        assert_eq!(stream.linein(None, 1).unwrap(), b"rec1");
        assert_eq!(stream.linein(Some(2), 1).unwrap(), b"rec2");
        assert_eq!(stream.linein(None, 1).unwrap(), b"re");
        assert!(matches!(stream.linein(None, 1), Err(StreamError::Eof { .. })));
    }

    #[test]
    fn test_nobuffer_writes_reach_disk() {
        let temp_file = file_with(b"");
        let log = ConditionLog::new();
        let mut stream = stream_on(temp_file.path(), &log);
        stream.open("WRITE NOBUFFER").unwrap();
        assert!(!stream.raw().is_buffered());

        stream.lineout(Some(b"now".as_slice()), None).unwrap();
        assert_eq!(std::fs::read(temp_file.path()).unwrap(), b"now\n");
    }
}
