//! Serialized storage accessor.
//!
//! One long-lived worker task owns all filesystem access; callers hand it
//! complete [`Operation`] values over a bounded channel and suspend until
//! their own operation completes. This single-threads disk I/O behind a
//! fixed memory budget: whole-file reads for text/binary, and a reused
//! fixed-size chunk buffer for streamed HTTP responses.
//!
//! ```text
//! callers                worker
//! +--------+  submit   +----------+  open/read/write
//! | read_* | --------> | dispatch | ----------------> filesystem
//! | write  | <-------- |   loop   | ----------------> sink (HTTP body)
//! +--------+  outcome  +----------+
//! ```

pub mod content;
pub mod operation;
pub mod rendezvous;
pub mod stream;
pub mod worker;

use std::path::{Path, PathBuf};

use tokio::io::AsyncWrite;

use crate::error::{StorageError, StorageResult};

pub use operation::{ByteSink, Operation, OperationFormat, OperationKind, OperationStatus};
pub use stream::HTTP_CHUNK_SIZE;
pub use worker::WorkerConfig;

/// Handle to the storage worker. Cheap to clone; every clone talks to the
/// same worker task, and the worker exits once the last clone drops.
#[derive(Clone)]
pub struct StorageAccessor {
    submitter: rendezvous::Submitter,
}

impl StorageAccessor {
    /// Spawn the worker task and return a handle to it.
    pub fn new(config: WorkerConfig) -> Self {
        let (submitter, requests) = rendezvous::channel();
        tokio::spawn(worker::run(config, requests));
        Self { submitter }
    }

    /// Read `path` as UTF-8 text, falling back to `path + ".gz"`.
    ///
    /// The fallback returns the stored bytes as-is; nothing is
    /// decompressed.
    pub async fn read_file(&self, path: impl AsRef<Path>) -> StorageResult<String> {
        let path = path.as_ref();
        let op = self.submit(Operation::read_text(path)).await?;
        match op.status {
            OperationStatus::Success => Ok(op.text),
            _ => Err(failure_error(path, op)),
        }
    }

    /// Read `path` as raw bytes, with the same fallback semantics as
    /// [`read_file`](Self::read_file).
    pub async fn read_file_binary(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        let path = path.as_ref();
        let op = self.submit(Operation::read_binary(path)).await?;
        match op.status {
            OperationStatus::Success => Ok(op.binary),
            _ => Err(failure_error(path, op)),
        }
    }

    /// Replace the contents of `path` with `body`, creating the file if
    /// absent.
    pub async fn write_file(
        &self,
        path: impl AsRef<Path>,
        body: impl Into<String>,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        let op = self.submit(Operation::write(path, body)).await?;
        match op.status {
            OperationStatus::Success => Ok(()),
            _ => Err(failure_error(path, op)),
        }
    }

    /// Stream `path` to `sink` as one complete HTTP/1.1 response.
    ///
    /// Consumes the sink; the response ends with `Connection: close`
    /// semantics and the stream is dropped when the transfer finishes
    /// either way. An error after the head has been written means the
    /// response on the wire is truncated - there is no rollback.
    pub async fn read_file_to_socket<W>(
        &self,
        path: impl AsRef<Path>,
        sink: W,
    ) -> StorageResult<()>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let path = path.as_ref();
        let op = self
            .submit(Operation::read_to_sink(path, Box::new(sink)))
            .await?;
        match op.status {
            OperationStatus::Success => Ok(()),
            _ => Err(failure_error(path, op)),
        }
    }

    /// List the entries of `dir` exactly as the host filesystem yields
    /// them (no ordering guarantee; `.`/`..` never appear on Rust hosts).
    ///
    /// Listing is a thin pass-through on the caller's task; it does not go
    /// through the worker.
    pub async fn list_files(&self, dir: impl AsRef<Path>) -> StorageResult<Vec<String>> {
        let dir = dir.as_ref();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(dir))
            }
            Err(e) => return Err(StorageError::io(dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(dir, e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn submit(&self, op: Operation) -> StorageResult<Operation> {
        let path = op.path.clone();
        self.submitter.submit(op).await.ok_or_else(|| {
            // Only reachable if the worker task itself is gone.
            StorageError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "storage worker unavailable"),
            )
        })
    }
}

impl Default for StorageAccessor {
    fn default() -> Self {
        Self::new(WorkerConfig::default())
    }
}

/// Map a failed operation to the public error taxonomy.
///
/// A read that found nothing carries no I/O detail and is NotFound; every
/// failure with an underlying error is an IoError.
fn failure_error(requested: &Path, op: Operation) -> StorageError {
    match op.failure {
        Some(source) => StorageError::io(PathBuf::from(requested), source),
        None => StorageError::not_found(requested),
    }
}
