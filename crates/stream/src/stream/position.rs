//! Dual-coordinate positioning
//!
//! Character positions are the source of truth. Line positions are derived
//! on demand and cached as [`LineMark`]s: "line L starts at character A".
//! A mark stays true until something writes at or before A, so marks that
//! a cursor leaves behind are kept as scan starting points.
//!
//! For fixed-record streams a line is a record and every conversion is
//! arithmetic. For variable-line streams, moving to a line scans forward
//! from the best known mark at or before it, and converting a character
//! position to a line counts line feeds from the best mark before it,
//! which is the start of the stream only when nothing better is known.

use super::options::{Direction, PositionQuery, PositionRequest, Target, Unit};
use super::{Discipline, Intent, LogicalStream, StreamState};
use crate::error::{Residual, StreamError};
use crate::raw::Whence;

/// Line `line` starts at 1-based character `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LineMark {
    pub line: u64,
    pub start: u64,
}

impl LineMark {
    pub const FIRST: LineMark = LineMark { line: 1, start: 1 };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Cursor {
    Read,
    Write,
}

impl LogicalStream {
    fn char_of(&self, cursor: Cursor) -> u64 {
        match cursor {
            Cursor::Read => self.char_read,
            Cursor::Write => self.char_write,
        }
    }

    fn mark_of(&self, cursor: Cursor) -> Option<LineMark> {
        match cursor {
            Cursor::Read => self.read_mark,
            Cursor::Write => self.write_mark,
        }
    }

    /// Move a cursor, keeping the mark it leaves behind as a scan hint
    fn place(&mut self, cursor: Cursor, pos: u64, mark: Option<LineMark>) {
        if let Some(old) = self.mark_of(cursor)
            && mark != Some(old)
        {
            self.scan_hint = Some(old);
        }
        match cursor {
            Cursor::Read => {
                self.char_read = pos;
                self.read_mark = mark;
            }
            Cursor::Write => {
                self.char_write = pos;
                self.write_mark = mark;
            }
        }
    }

    /// Latest known mark satisfying `fits`, else the start of the stream
    fn best_mark(&self, fits: impl Fn(&LineMark) -> bool) -> LineMark {
        [self.read_mark, self.write_mark, self.scan_hint]
            .into_iter()
            .flatten()
            .filter(|m| fits(m))
            .max_by_key(|m| m.start)
            .unwrap_or(LineMark::FIRST)
    }

    /// Drop line facts a write starting at `start` may have changed
    pub(super) fn invalidate_lines_from(&mut self, start: u64) {
        if let Some(hint) = self.scan_hint
            && hint.start > start
        {
            self.scan_hint = None;
        }
        if start < self.char_read
            && let Some(mark) = self.read_mark.take()
            && mark.start <= start
        {
            self.scan_hint = Some(mark);
        }
    }

    pub(super) fn stream_size(&mut self) -> Result<u64, StreamError> {
        self.raw.size().map_err(|e| self.raise(e))
    }

    /// Put the raw stream at a 1-based character position
    pub(super) fn seek_raw(&mut self, pos: u64) -> Result<(), StreamError> {
        if self.raw.is_transient() {
            return Ok(());
        }
        let offset = pos - 1;
        if self.raw.tell() != offset {
            self.raw
                .seek(offset as i64, Whence::Start)
                .map_err(|e| self.raise(e))?;
        }
        Ok(())
    }

    /// The line holding character `pos`, counted from the best mark before it
    fn mark_for_char(&mut self, pos: u64) -> Result<LineMark, StreamError> {
        let from = self.best_mark(|m| m.start <= pos);
        if from.start == pos {
            return Ok(from);
        }
        let (crossed, line_start) = self
            .raw
            .count_lines(from.start - 1, pos - 1)
            .map_err(|e| self.raise(e))?;
        tracing::debug!(stream = %self.name, from = from.start, to = pos, crossed, "counted lines");
        if crossed == 0 {
            return Ok(from);
        }
        Ok(LineMark {
            line: from.line + crossed,
            start: line_start + 1,
        })
    }

    /// Character position where `line` starts, scanning forward once
    ///
    /// Returns the position, the line actually reached, and a mark when the
    /// line was found. Running out of data lands on end-of-stream + 1.
    fn char_for_line(&mut self, line: u64) -> Result<(u64, u64, Option<LineMark>), StreamError> {
        let from = self.best_mark(|m| m.line <= line);
        if from.line == line {
            return Ok((from.start, line, Some(from)));
        }
        let wanted = line - from.line;
        let mut remaining = wanted;
        let end = self
            .raw
            .seek_forward_lines(from.start - 1, &mut remaining)
            .map_err(|e| self.raise(e))?;
        tracing::debug!(stream = %self.name, from = from.line, line, remaining, "scanned forward for line");

        let pos = end + 1;
        if remaining == 0 {
            let mark = LineMark { line, start: pos };
            Ok((pos, line, Some(mark)))
        } else {
            Ok((pos, from.line + (wanted - remaining), None))
        }
    }

    /// Line number of a cursor, computing and caching it if unknown
    fn line_of(&mut self, cursor: Cursor) -> Result<u64, StreamError> {
        let pos = self.char_of(cursor);
        if let Discipline::FixedRecord(n) = self.discipline {
            return Ok(record_of(pos, n));
        }
        if let Some(mark) = self.mark_of(cursor) {
            return Ok(mark.line);
        }
        if self.raw.is_transient() {
            return Ok(0);
        }
        let mark = self.mark_for_char(pos)?;
        match cursor {
            Cursor::Read => self.read_mark = Some(mark),
            Cursor::Write => self.write_mark = Some(mark),
        }
        Ok(mark.line)
    }

    /// Total lines in a variable-line stream, memoized
    fn total_lines(&mut self) -> Result<u64, StreamError> {
        if let Some(total) = self.line_count {
            return Ok(total);
        }
        let size = self.stream_size()?;
        let from = self.best_mark(|m| m.start <= size + 1);
        let (crossed, last_start) = self
            .raw
            .count_lines(from.start - 1, size)
            .map_err(|e| self.raise(e))?;
        // bytes after the last line feed form one more line
        let partial = (last_start < size) as u64;
        let total = from.line - 1 + crossed + partial;
        self.line_count = Some(total);
        Ok(total)
    }

    pub(super) fn move_char(&mut self, cursor: Cursor, pos: u64) -> Result<u64, StreamError> {
        if pos < 1 {
            return Err(StreamError::InvalidPosition(
                "character position must be at least 1".into(),
            ));
        }
        if self.raw.is_transient() {
            return Err(StreamError::InvalidPosition(
                "a transient stream cannot be positioned".into(),
            ));
        }
        let size = self.stream_size()?;
        let pos = pos.min(size + 1);
        let mark = (pos == 1).then_some(LineMark::FIRST);
        self.place(cursor, pos, mark);
        Ok(pos)
    }

    /// Move a cursor to the start of `line`; returns the line reached
    pub(super) fn move_line(&mut self, cursor: Cursor, line: u64) -> Result<u64, StreamError> {
        if line < 1 {
            return Err(StreamError::InvalidPosition(
                "line position must be at least 1".into(),
            ));
        }
        if self.raw.is_transient() {
            return Err(StreamError::InvalidPosition(
                "a transient stream cannot be positioned".into(),
            ));
        }
        if !self.access.is_some_and(|a| a.readable()) {
            return Err(StreamError::InvalidPosition(
                "line positioning needs a readable stream".into(),
            ));
        }
        match self.discipline {
            Discipline::FixedRecord(n) => {
                let size = self.stream_size()?;
                let pos = (line - 1).saturating_mul(n).saturating_add(1).min(size + 1);
                self.place(cursor, pos, None);
                Ok(record_of(pos, n))
            }
            Discipline::VariableLine => {
                let (pos, reached, mark) = self.char_for_line(line)?;
                self.place(cursor, pos, mark);
                Ok(reached)
            }
        }
    }

    /// SEEK/POSITION command; returns the new position in the unit asked for
    pub fn seek(&mut self, options: &str) -> Result<u64, StreamError> {
        let request = PositionRequest::parse(options)?;
        let intent = match request.target {
            Target::Write => Intent::Write,
            _ => Intent::Read,
        };
        self.default_result = Residual::None;
        match self.state {
            StreamState::Unknown => self.ensure_ready(intent)?,
            // a sticky condition does not block positioning an open stream
            _ if self.raw.is_open() => {}
            _ => return Err(self.reraise()),
        }
        self.set_position(request)
    }

    /// Apply a decoded position request to an open stream
    pub fn set_position(&mut self, request: PositionRequest) -> Result<u64, StreamError> {
        let Some(access) = self.access else {
            return Err(StreamError::InvalidPosition("stream is not open".into()));
        };
        let (read, write) = match request.target {
            Target::Read => (true, false),
            Target::Write => (false, true),
            Target::Both | Target::System => (access.readable(), access.writeable()),
        };
        if (read && !access.readable()) || (write && !access.writeable()) {
            return Err(StreamError::InvalidPosition(
                "cursor not available in this access mode".into(),
            ));
        }
        let primary = if read { Cursor::Read } else { Cursor::Write };
        let offset = request.offset;

        let result = match request.unit {
            Unit::Char => {
                let current = self.char_of(primary);
                let target = match request.direction {
                    Direction::FromStart => Some(offset),
                    Direction::FromEnd => {
                        let size = self.stream_size()?;
                        (size + 1).checked_sub(offset)
                    }
                    Direction::Forward => Some(current.saturating_add(offset)),
                    Direction::Backward => current.checked_sub(offset),
                };
                let target = target.ok_or_else(|| {
                    StreamError::InvalidPosition("position before start of stream".into())
                })?;
                self.move_char(primary, target)?
            }
            Unit::Line => {
                let target = match request.direction {
                    Direction::FromStart => Some(offset),
                    Direction::FromEnd => {
                        let total = match self.discipline {
                            Discipline::FixedRecord(n) => self.stream_size()?.div_ceil(n),
                            Discipline::VariableLine => self.total_lines()?,
                        };
                        (total + 1).checked_sub(offset)
                    }
                    Direction::Forward => Some(self.line_of(primary)?.saturating_add(offset)),
                    Direction::Backward => self.line_of(primary)?.checked_sub(offset),
                };
                let target = target.ok_or_else(|| {
                    StreamError::InvalidPosition("line before start of stream".into())
                })?;
                self.move_line(primary, target)?
            }
        };

        if read && write {
            let (pos, mark) = (self.char_read, self.read_mark);
            self.place(Cursor::Write, pos, mark);
        }
        Ok(result)
    }

    /// QUERY SEEK/POSITION; empty while the stream is not open
    pub fn query_position(&mut self, options: &str) -> Result<String, StreamError> {
        let query = PositionQuery::parse(options)?;
        if !self.raw.is_open() {
            return Ok(String::new());
        }
        let value = match (query.target, query.unit) {
            (Target::System, _) => match self.raw.os_position() {
                Ok(offset) => offset + 1,
                Err(_) => return Ok(String::new()),
            },
            (Target::Write, Unit::Char) => self.char_write,
            (Target::Write, Unit::Line) => self.line_of(Cursor::Write)?,
            (_, Unit::Char) => self.char_read,
            (_, Unit::Line) => self.line_of(Cursor::Read)?,
        };
        Ok(value.to_string())
    }

    /// Current read line, 0 while the stream is not open
    pub fn line_read(&mut self) -> Result<u64, StreamError> {
        if !self.raw.is_open() {
            return Ok(0);
        }
        self.line_of(Cursor::Read)
    }

    /// Current write line, 0 while the stream is not open
    pub fn line_write(&mut self) -> Result<u64, StreamError> {
        if !self.raw.is_open() {
            return Ok(0);
        }
        self.line_of(Cursor::Write)
    }

    // ------------------------------------------------------------------
    // Counting
    // ------------------------------------------------------------------

    /// Bytes left to read; 0 or 1 for transient streams
    ///
    /// Opens on first use but never raises for a failed open.
    pub fn chars(&mut self) -> Result<u64, StreamError> {
        if !self.ready_quietly(Intent::Read) || !self.access.is_some_and(|a| a.readable()) {
            return Ok(0);
        }
        if self.raw.is_transient() {
            return self.transient_pending();
        }
        self.default_result = Residual::None;
        let size = self.stream_size()?;
        Ok((size + 1).saturating_sub(self.char_read))
    }

    /// Lines left to read
    ///
    /// `quick` only asks whether any are left and answers 0 or 1 without
    /// counting. A trailing fragment without a line feed counts as a line.
    pub fn lines(&mut self, quick: bool) -> Result<u64, StreamError> {
        if !self.ready_quietly(Intent::Read) || !self.access.is_some_and(|a| a.readable()) {
            return Ok(0);
        }
        if self.raw.is_transient() {
            return self.transient_pending();
        }
        self.default_result = Residual::None;
        let size = self.stream_size()?;
        if self.char_read > size {
            return Ok(0);
        }
        match self.discipline {
            Discipline::FixedRecord(n) => {
                let records = (size + 1 - self.char_read).div_ceil(n);
                Ok(if quick { records.min(1) } else { records })
            }
            Discipline::VariableLine => {
                if quick {
                    return Ok(1);
                }
                let current = self.line_of(Cursor::Read)?;
                let total = self.total_lines()?;
                Ok((total + 1).saturating_sub(current))
            }
        }
    }

    fn transient_pending(&mut self) -> Result<u64, StreamError> {
        if self.raw.at_eof() {
            return Ok(0);
        }
        if self.raw.is_tty() {
            return Ok(1);
        }
        self.default_result = Residual::None;
        match self.raw.peek() {
            Ok(Some(_)) => Ok(1),
            Ok(None) => Ok(0),
            Err(err) => Err(self.raise(err)),
        }
    }
}

/// Record (line) number holding 1-based character `pos`
fn record_of(pos: u64, record_length: u64) -> u64 {
    (pos - 1) / record_length + 1
}
