//! Host collaborators
//!
//! The stream layer does not resolve names, stat paths, or dispatch
//! conditions itself. It asks the embedding runtime through three small
//! traits, bundled in a [`Host`]:
//!
//! - [`PathQualifier`] turns a stream name into a fully qualified path
//! - [`FileMetadata`] answers existence/size/timestamp questions for
//!   streams that are not open
//! - [`ConditionSink`] receives the NOTREADY and end-of-stream conditions
//!
//! The defaults ([`HostFs`] and [`TracingConditions`]) go to the local
//! filesystem and the log. [`ConditionLog`] records conditions so an
//! embedder (or a test) can inspect them after the fact.

use crate::error::Residual;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Resolves a stream name to a fully qualified path
pub trait PathQualifier: Send + Sync {
    fn qualify(&self, name: &str) -> PathBuf;
}

/// Metadata lookups by path
pub trait FileMetadata: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn size(&self, path: &Path) -> Option<u64>;
    fn modified(&self, path: &Path) -> Option<SystemTime>;
}

/// Where stream conditions go
///
/// Raising is a notification; the stream operation still returns its
/// error to the caller afterwards.
pub trait ConditionSink: Send + Sync {
    fn raise_not_ready(&self, stream: &str, residual: &Residual);
    fn raise_eof(&self, stream: &str);
}

/// Local filesystem qualifier and metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl PathQualifier for HostFs {
    /// Absolute path with `.` and `..` folded away; symlinks are kept
    fn qualify(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path.to_path_buf(),
            }
        };
        normalize(&joined)
    }
}

impl FileMetadata for HostFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn size(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).ok()?.modified().ok()
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Logs conditions at warn level and does nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConditions;

impl ConditionSink for TracingConditions {
    fn raise_not_ready(&self, stream: &str, residual: &Residual) {
        tracing::warn!(stream, ?residual, "NOTREADY raised");
    }

    fn raise_eof(&self, stream: &str) {
        tracing::debug!(stream, "end of stream raised");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    NotReady,
    Eof,
}

/// One raised condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub stream: String,
    pub residual: Residual,
}

/// Recording sink; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct ConditionLog {
    entries: Arc<Mutex<Vec<Condition>>>,
}

impl ConditionLog {
    pub fn new() -> Self {
        ConditionLog::default()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<Condition> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<Condition> {
        self.entries.lock().ok()?.last().cloned()
    }

    fn record(&self, condition: Condition) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(condition);
        }
    }
}

impl ConditionSink for ConditionLog {
    fn raise_not_ready(&self, stream: &str, residual: &Residual) {
        self.record(Condition {
            kind: ConditionKind::NotReady,
            stream: stream.to_string(),
            residual: residual.clone(),
        });
    }

    fn raise_eof(&self, stream: &str) {
        self.record(Condition {
            kind: ConditionKind::Eof,
            stream: stream.to_string(),
            residual: Residual::None,
        });
    }
}

/// The three collaborators a logical stream talks to
#[derive(Clone)]
pub struct Host {
    pub paths: Arc<dyn PathQualifier>,
    pub metadata: Arc<dyn FileMetadata>,
    pub conditions: Arc<dyn ConditionSink>,
}

impl Default for Host {
    fn default() -> Self {
        Host {
            paths: Arc::new(HostFs),
            metadata: Arc::new(HostFs),
            conditions: Arc::new(TracingConditions),
        }
    }
}

impl Host {
    /// Local filesystem, conditions delivered to `sink`
    pub fn with_conditions(sink: impl ConditionSink + 'static) -> Self {
        Host {
            conditions: Arc::new(sink),
            ..Host::default()
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
