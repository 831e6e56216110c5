//! Minimal HTTP file server built on the storage accessor.
//!
//! One request per connection, `Connection: close`, no keep-alive and no
//! chunked transfer-encoding. The interesting work - gzip fallback, MIME
//! deduction, bounded-memory body streaming - happens inside the accessor;
//! this layer only parses a GET line and maps URLs onto the served root.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::accessor::StorageAccessor;
use crate::config::ServeConfig;

const NOT_FOUND_RESPONSE: &[u8] =
    b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
const BAD_REQUEST_RESPONSE: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Serve `config.root` until the listener is torn down.
pub async fn run(config: ServeConfig, accessor: StorageAccessor) -> Result<()> {
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    serve_on(listener, config, accessor).await
}

/// Accept loop over an already-bound listener (tests bind port 0).
pub async fn serve_on(
    listener: TcpListener,
    config: ServeConfig,
    accessor: StorageAccessor,
) -> Result<()> {
    tracing::info!(bind = %config.bind, root = %config.root.display(), "serving");

    loop {
        let (socket, peer) = listener.accept().await.context("accept failed")?;
        let accessor = accessor.clone();
        let root = config.root.clone();
        let index = config.index.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, &root, &index, accessor).await {
                tracing::debug!(%peer, error = %e, "connection ended with error");
            }
        });
    }
}

/// Read one request line, stream the mapped file, close.
async fn handle_connection(
    socket: TcpStream,
    root: &Path,
    index: &str,
    accessor: StorageAccessor,
) -> Result<()> {
    let mut reader = BufReader::new(socket);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain the header block; nothing in it changes our answer.
    let mut header = String::new();
    loop {
        header.clear();
        let n = reader.read_line(&mut header).await?;
        if n == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    let mut socket = reader.into_inner();

    let Some(target) = parse_get_target(&request_line) else {
        socket.write_all(BAD_REQUEST_RESPONSE).await?;
        return Ok(());
    };

    let Some(file_path) = map_url_path(root, index, &target) else {
        socket.write_all(NOT_FOUND_RESPONSE).await?;
        return Ok(());
    };

    // A missing file has to answer 404 on this same socket, so existence
    // is probed up front; the streamed read still does its own fallback.
    if !crate::accessor::content::exists_with_gzip_fallback(&file_path).await {
        tracing::debug!(path = %file_path.display(), "not found");
        socket.write_all(NOT_FOUND_RESPONSE).await?;
        return Ok(());
    }

    accessor
        .read_file_to_socket(&file_path, socket)
        .await
        .map_err(Into::into)
}

/// Extract the path of a `GET <path> HTTP/x.y` request line.
fn parse_get_target(line: &str) -> Option<String> {
    let mut parts = line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    // Query strings are not part of the file path.
    let path = target.split('?').next().unwrap_or(target);
    Some(path.to_string())
}

/// Map a URL path onto the served root, rejecting traversal.
fn map_url_path(root: &Path, index: &str, url_path: &str) -> Option<PathBuf> {
    let trimmed = url_path.trim_start_matches('/');
    let relative = if trimmed.is_empty() { index } else { trimmed };

    let candidate = Path::new(relative);
    for component in candidate.components() {
        match component {
            Component::Normal(_) => {}
            // Anything that walks upward or re-roots is refused.
            _ => return None,
        }
    }
    Some(root.join(candidate))
}
