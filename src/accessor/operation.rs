//! Operation model - one filesystem transaction as a single value.
//!
//! An Operation is built by a caller, moves through the rendezvous channel
//! to the worker, is mutated in place, and moves back. Rust ownership
//! enforces the handshake invariant: the value is never visible to both
//! sides at once, and no Operation outlives its round trip.

use std::path::PathBuf;
use tokio::io::AsyncWrite;

/// Writable network stream handle for streamed-to-socket reads.
///
/// Opaque to the accessor beyond `write`; dropping it closes the
/// connection, which is the only termination the hand-assembled
/// `Connection: close` responses need.
pub type ByteSink = Box<dyn AsyncWrite + Send + Unpin>;

/// What the worker should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

/// Shape of the payload. Writes always use `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationFormat {
    /// Whole content into a UTF-8 string.
    Text,
    /// Whole content into a byte buffer.
    Binary,
    /// Streamed to the sink as an HTTP/1.1 response, chunk by chunk.
    HttpStream,
}

/// Outcome marker. Set to `Pending` at submission; the worker moves it
/// exactly once to a terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Success,
    Failure,
}

/// One filesystem transaction: request fields going in, outcome fields
/// coming back.
pub struct Operation {
    pub kind: OperationKind,
    pub format: OperationFormat,
    pub status: OperationStatus,

    /// Target file, non-empty.
    pub path: PathBuf,

    /// Write request body, or the result of a `Text` read.
    pub text: String,

    /// Result of a `Binary` read.
    pub binary: Vec<u8>,

    /// Present only for `HttpStream` reads. Consumed by the worker; the
    /// stream is dropped (closed) once the transfer ends either way.
    pub sink: Option<ByteSink>,

    /// Failure detail filled in by the worker, mapped to a
    /// [`StorageError`](crate::error::StorageError) by the public API.
    pub failure: Option<std::io::Error>,
}

impl Operation {
    /// A text read request for `path`.
    pub fn read_text(path: impl Into<PathBuf>) -> Self {
        Self::new(OperationKind::Read, OperationFormat::Text, path)
    }

    /// A binary read request for `path`.
    pub fn read_binary(path: impl Into<PathBuf>) -> Self {
        Self::new(OperationKind::Read, OperationFormat::Binary, path)
    }

    /// A streamed read request for `path`, writing into `sink`.
    pub fn read_to_sink(path: impl Into<PathBuf>, sink: ByteSink) -> Self {
        let mut op = Self::new(OperationKind::Read, OperationFormat::HttpStream, path);
        op.sink = Some(sink);
        op
    }

    /// A write request replacing `path` with `body`.
    pub fn write(path: impl Into<PathBuf>, body: impl Into<String>) -> Self {
        let mut op = Self::new(OperationKind::Write, OperationFormat::Text, path);
        op.text = body.into();
        op
    }

    fn new(kind: OperationKind, format: OperationFormat, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            format,
            status: OperationStatus::Pending,
            path: path.into(),
            text: String::new(),
            binary: Vec::new(),
            sink: None,
            failure: None,
        }
    }

    /// Mark the operation failed, recording the underlying error.
    pub(crate) fn fail(&mut self, err: std::io::Error) {
        self.status = OperationStatus::Failure;
        self.failure = Some(err);
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("status", &self.status)
            .field("path", &self.path)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
