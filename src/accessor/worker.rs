//! Worker loop - the single task that owns filesystem access.
//!
//! Idle -> Processing -> Idle, forever. A failed operation marks itself
//! Failure and the loop returns to Idle; nothing short of every accessor
//! handle dropping terminates it.

use std::io;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::accessor::content::{
    deduce_mime_type, is_gzip_path, resolve_with_gzip_fallback, strip_gzip_suffix,
};
use crate::accessor::operation::{Operation, OperationFormat, OperationKind, OperationStatus};
use crate::accessor::rendezvous::Requests;
use crate::accessor::stream::{copy_chunks, response_head};
use crate::error::StorageError;

/// Worker configuration.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Body chunk size for streamed reads.
    pub chunk_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::accessor::stream::HTTP_CHUNK_SIZE,
        }
    }
}

/// Run the dispatch loop until every submitter is gone.
pub(crate) async fn run(config: WorkerConfig, mut requests: Requests) {
    while let Some((mut op, done)) = requests.next().await {
        op.status = OperationStatus::Pending;
        dispatch(&config, &mut op).await;
        done.complete(op);
    }
    tracing::debug!("storage worker shutting down");
}

async fn dispatch(config: &WorkerConfig, op: &mut Operation) {
    match op.kind {
        OperationKind::Read => dispatch_read(config, op).await,
        OperationKind::Write => dispatch_write(op).await,
    }
}

async fn dispatch_read(config: &WorkerConfig, op: &mut Operation) {
    let resolved = match resolve_with_gzip_fallback(&op.path).await {
        Ok(resolved) => resolved,
        Err(StorageError::NotFound { .. }) => {
            op.status = OperationStatus::Failure;
            return;
        }
        Err(StorageError::Io { source, .. }) => {
            op.fail(source);
            return;
        }
    };

    match op.format {
        OperationFormat::Text => {
            let mut file = resolved.file;
            let mut buf = Vec::with_capacity(resolved.size as usize);
            if let Err(e) = file.read_to_end(&mut buf).await {
                op.fail(e);
                return;
            }
            match String::from_utf8(buf) {
                Ok(text) => {
                    op.text = text;
                    op.status = OperationStatus::Success;
                }
                Err(e) => op.fail(io::Error::new(io::ErrorKind::InvalidData, e)),
            }
        }
        OperationFormat::Binary => {
            let mut file = resolved.file;
            let mut buf = Vec::with_capacity(resolved.size as usize);
            match file.read_to_end(&mut buf).await {
                Ok(_) => {
                    op.binary = buf;
                    op.status = OperationStatus::Success;
                }
                Err(e) => op.fail(e),
            }
        }
        OperationFormat::HttpStream => {
            stream_to_sink(config, op, resolved.file, resolved.path, resolved.size).await;
        }
    }
}

/// Stream one file as a complete HTTP/1.1 response.
///
/// The status goes Success before the first byte leaves: the head is
/// transmitted immediately, so a later body failure leaves a truncated
/// response on the wire. That downgrade to Failure is the one documented
/// irrecoverable case.
async fn stream_to_sink(
    config: &WorkerConfig,
    op: &mut Operation,
    mut file: File,
    resolved_path: std::path::PathBuf,
    size: u64,
) {
    let Some(mut sink) = op.sink.take() else {
        op.fail(io::Error::new(
            io::ErrorKind::InvalidInput,
            "http stream read without a sink",
        ));
        return;
    };

    op.status = OperationStatus::Success;

    // Gzip is a path convention: mark the encoding and deduce the MIME
    // type from the underlying name. The bytes go out as stored.
    let (encoding, mime_path) = if is_gzip_path(&resolved_path) {
        (Some("gzip"), strip_gzip_suffix(&resolved_path))
    } else {
        (None, resolved_path)
    };
    let content_type = deduce_mime_type(&mime_path);

    let head = response_head(content_type, encoding, size);
    if let Err(e) = sink.write_all(&head).await {
        op.fail(e);
        return;
    }

    if let Err(e) = copy_chunks(&mut file, &mut *sink, size, config.chunk_size).await {
        tracing::warn!(
            path = %mime_path.display(),
            error = %e,
            "body transfer aborted after header; response left truncated"
        );
        op.fail(e);
    }
}

async fn dispatch_write(op: &mut Operation) {
    let mut file = match File::create(&op.path).await {
        Ok(file) => file,
        Err(e) => {
            op.fail(e);
            return;
        }
    };

    match write_all_and_sync(&mut file, op.text.as_bytes()).await {
        Ok(()) => op.status = OperationStatus::Success,
        Err(e) => op.fail(e),
    }
}

async fn write_all_and_sync(file: &mut File, body: &[u8]) -> io::Result<()> {
    file.write_all(body).await?;
    file.flush().await?;
    Ok(())
}
