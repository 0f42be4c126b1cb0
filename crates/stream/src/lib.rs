//! Seq Stream: stream I/O for the Seq runtime
//!
//! Key design principles:
//! - RawStream: one OS descriptor, one buffer used for read-ahead or for
//!   pending writes, never both
//! - LogicalStream: named stream with separate read and write cursors,
//!   addressable by character or by line, opened lazily on first use
//! - Command parser: keyword tables with minimum abbreviations, shared by
//!   OPEN options, SEEK/POSITION requests and QUERY
//! - Conditions (NOTREADY, end of stream) go to a host-supplied sink and
//!   come back to the caller as a `StreamError` with the residual result

pub mod command;
pub mod config;
pub mod error;
pub mod host;
pub mod raw;
pub mod stream;
mod sys;

pub use config::{ShareMode, StreamConfig};
pub use error::{IoError, ParseError, Residual, StreamError};
pub use host::{
    Condition, ConditionKind, ConditionLog, ConditionSink, FileMetadata, Host, HostFs,
    PathQualifier, TracingConditions,
};
pub use raw::{Access, Classification, OpenFlags, RawStream, Whence};
pub use stream::{
    AccessMode, Direction, Discipline, LogicalStream, OpenOptions, PositionQuery,
    PositionRequest, StandardHandle, StreamState, Target, Unit,
};
