//! Stream Error Types
//!
//! Three layers, three error types:
//!
//! - [`IoError`] comes out of the raw stream. It keeps "the OS said no"
//!   apart from "there is no more data".
//! - [`ParseError`] comes out of the command parser when an option string
//!   is rejected. Nothing has been touched when one of these is returned.
//! - [`StreamError`] is what a logical stream operation returns. The
//!   `NotReady` and `Eof` variants correspond to the conditions raised
//!   through the host's [`ConditionSink`](crate::host::ConditionSink) and
//!   carry the residual result the caller should see.

use std::fmt;

/// Failure reported by a raw stream primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// The OS call failed with this error code
    Os(i32),
    /// End of stream reached with nothing obtained
    Eof,
}

impl IoError {
    /// Capture the calling thread's current OS error code
    pub fn last_os_error() -> Self {
        IoError::Os(std::io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }

    /// The OS error code, or 0 for end of stream
    pub fn code(&self) -> i32 {
        match self {
            IoError::Os(code) => *code,
            IoError::Eof => 0,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Os(code) => write!(f, "{} (os error {})", os_message(*code), code),
            IoError::Eof => write!(f, "end of stream"),
        }
    }
}

impl std::error::Error for IoError {}

/// Rejection of an option string by the command parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Token is a prefix of a keyword but shorter than its minimum abbreviation
    Ambiguous(String),
    /// Token matched no keyword and no handler accepted it
    Unrecognized(String),
    /// A keyword's action refused it (conflicting or repeated option)
    Rejected(String),
    /// A keyword that needs a following value had none, or an invalid one
    MissingValue(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Ambiguous(token) => write!(f, "ambiguous option '{}'", token),
            ParseError::Unrecognized(token) => write!(f, "unrecognized option '{}'", token),
            ParseError::Rejected(token) => write!(f, "conflicting option '{}'", token),
            ParseError::MissingValue(keyword) => {
                write!(f, "option '{}' requires a valid value", keyword)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Default result handed back when an operation raises a condition
///
/// Only meaningful for operations that can partially succeed: a short
/// `charin` carries the bytes it did get, a failed `charout` carries the
/// count of bytes it did not write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Residual {
    #[default]
    None,
    Count(u64),
    Data(Vec<u8>),
    Text(String),
}

/// Failure of a logical stream operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Option string rejected before any I/O
    Options(ParseError),
    /// Position or count argument is not acceptable for this stream
    InvalidPosition(String),
    /// I/O failed; the not-ready condition was raised
    NotReady {
        stream: String,
        code: i32,
        residual: Residual,
    },
    /// End of stream; the end-of-stream condition was raised
    Eof { stream: String, residual: Residual },
    /// Internal consistency failure; the stream is in the error state
    Internal { stream: String, detail: String },
}

impl StreamError {
    /// The partial/default result to hand to the caller, if any
    pub fn residual(&self) -> &Residual {
        match self {
            StreamError::NotReady { residual, .. } | StreamError::Eof { residual, .. } => residual,
            _ => &Residual::None,
        }
    }

    /// True for both not-ready flavours (hard failure or end of stream)
    pub fn is_not_ready(&self) -> bool {
        matches!(self, StreamError::NotReady { .. } | StreamError::Eof { .. })
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Options(e) => write!(f, "invalid stream options: {}", e),
            StreamError::InvalidPosition(reason) => write!(f, "invalid position: {}", reason),
            StreamError::NotReady { stream, code, .. } => {
                write!(f, "stream '{}' not ready: {}", stream, os_message(*code))
            }
            StreamError::Eof { stream, .. } => write!(f, "stream '{}' at end of stream", stream),
            StreamError::Internal { stream, detail } => {
                write!(f, "stream '{}' error: {}", stream, detail)
            }
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Options(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for StreamError {
    fn from(e: ParseError) -> Self {
        StreamError::Options(e)
    }
}

/// OS error text without the "(os error N)" suffix std appends
pub fn os_message(code: i32) -> String {
    let text = std::io::Error::from_raw_os_error(code).to_string();
    match text.find(" (os error") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}
