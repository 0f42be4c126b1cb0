//! Stream configuration
//!
//! Defaults suit ordinary text files. Embedders can build a config
//! explicitly, or let the runtime pick it up from the environment:
//!
//! - `SEQ_STREAM_BUFFER=<bytes>` → raw stream buffer size (`0` = unbuffered)
//! - `SEQ_STREAM_SCAN_CHUNK=<bytes>` → chunk size for forward line scans
//! - `SEQ_STREAM_SENTINEL=off|<byte>` → legacy end-of-text marker, decimal
//!   or `0x`-prefixed hex
//!
//! # Example
//!
//! ```rust
//! use seq_stream::StreamConfig;
//!
//! let config = StreamConfig::new()
//!     .with_buffer_size(16 * 1024)
//!     .with_sentinel(None);
//! assert_eq!(config.buffer_size, 16 * 1024);
//! ```

use std::sync::OnceLock;

/// Default raw stream buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default chunk size for forward line scans
pub const DEFAULT_SCAN_CHUNK: usize = 4096;

/// Default chunk size for assembling one line
pub const DEFAULT_LINE_CHUNK: usize = 256;

/// Ctrl-Z, the historical end-of-text marker
pub const LEGACY_SENTINEL: u8 = 0x1A;

/// Sharing requested at open time
///
/// Unix has no mandatory share modes; the value is recorded and reported
/// but does not restrict other openers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareMode {
    Exclusive,
    Read,
    Write,
    #[default]
    ReadWrite,
}

/// Tunables for logical and raw streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Raw stream buffer size in bytes; 0 disables buffering
    pub buffer_size: usize,
    /// Chunk size used by forward line scans
    pub scan_chunk: usize,
    /// Chunk size used while assembling a single line
    pub line_chunk: usize,
    /// End-of-text marker skipped when appending, if any
    pub sentinel: Option<u8>,
    /// Sharing used by explicit opens that name none
    pub default_share: ShareMode,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
            scan_chunk: DEFAULT_SCAN_CHUNK,
            line_chunk: DEFAULT_LINE_CHUNK,
            sentinel: Some(LEGACY_SENTINEL),
            default_share: ShareMode::default(),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        StreamConfig::default()
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_scan_chunk(mut self, size: usize) -> Self {
        self.scan_chunk = size.max(1);
        self
    }

    pub fn with_line_chunk(mut self, size: usize) -> Self {
        self.line_chunk = size.max(2);
        self
    }

    pub fn with_sentinel(mut self, sentinel: Option<u8>) -> Self {
        self.sentinel = sentinel;
        self
    }

    pub fn with_default_share(mut self, share: ShareMode) -> Self {
        self.default_share = share;
        self
    }

    /// Defaults overridden by `SEQ_STREAM_*` environment variables
    pub fn from_env() -> Self {
        let mut config = StreamConfig::default();

        if let Some(size) = env_usize("SEQ_STREAM_BUFFER") {
            config.buffer_size = size;
        }
        if let Some(size) = env_usize("SEQ_STREAM_SCAN_CHUNK") {
            config = config.with_scan_chunk(size);
        }
        if let Ok(val) = std::env::var("SEQ_STREAM_SENTINEL") {
            match parse_sentinel(&val) {
                Some(sentinel) => config.sentinel = sentinel,
                None => {
                    tracing::warn!(value = %val, "SEQ_STREAM_SENTINEL not recognized, ignoring")
                }
            }
        }
        config
    }

    /// Process-wide config, read from the environment once
    pub fn global() -> &'static StreamConfig {
        static GLOBAL: OnceLock<StreamConfig> = OnceLock::new();
        GLOBAL.get_or_init(StreamConfig::from_env)
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let val = std::env::var(key).ok()?;
    match val.trim().parse::<usize>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %val, "expected a byte count, ignoring");
            None
        }
    }
}

/// `off`/`none` → no sentinel; otherwise a decimal or `0x` hex byte
fn parse_sentinel(val: &str) -> Option<Option<u8>> {
    let val = val.trim();
    if val.eq_ignore_ascii_case("off") || val.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    let parsed = match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => val.parse::<u8>().ok(),
    };
    parsed.map(Some)
}
