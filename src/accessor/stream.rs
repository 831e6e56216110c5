//! Chunked socket writer for hand-assembled HTTP/1.1 responses.
//!
//! The body is transferred through one fixed-size buffer reused across
//! chunks, so memory stays bounded regardless of file size. No chunked
//! transfer-encoding and no keep-alive: one response, `Connection: close`,
//! done.

use std::io;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default body chunk size in bytes.
pub const HTTP_CHUNK_SIZE: usize = 4096;

/// Assemble a complete `200 OK` response head.
///
/// `content_encoding` adds a `Content-Encoding` header between the type and
/// length lines, matching the gzip path convention.
pub fn response_head(
    content_type: &str,
    content_encoding: Option<&str>,
    content_length: u64,
) -> BytesMut {
    let mut head = BytesMut::with_capacity(128);
    head.put_slice(b"HTTP/1.1 200 OK\r\n");
    head.put_slice(b"Content-Type: ");
    head.put_slice(content_type.as_bytes());
    head.put_slice(b"\r\n");
    if let Some(encoding) = content_encoding {
        head.put_slice(b"Content-Encoding: ");
        head.put_slice(encoding.as_bytes());
        head.put_slice(b"\r\n");
    }
    head.put_slice(b"Content-Length: ");
    head.put_slice(content_length.to_string().as_bytes());
    head.put_slice(b"\r\nConnection: close\r\n\r\n");
    head
}

/// Copy exactly `size` bytes from `reader` to `sink` in `chunk_size` pieces.
///
/// Issues `ceil(size / chunk_size)` sink writes: each of `chunk_size` bytes
/// except the last, which carries the remainder. A sink that stops
/// accepting bytes aborts the remaining transfer immediately - the
/// response head is already on the wire, so there is nothing to roll back.
pub async fn copy_chunks<R, W>(
    reader: &mut R,
    sink: &mut W,
    size: u64,
    chunk_size: usize,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    debug_assert!(chunk_size > 0);
    let mut buf = vec![0u8; chunk_size];
    let mut bytes_left = size;

    while bytes_left > 0 {
        let to_read = bytes_left.min(chunk_size as u64) as usize;
        reader.read_exact(&mut buf[..to_read]).await?;
        sink.write_all(&buf[..to_read]).await?;
        bytes_left -= to_read as u64;
    }

    sink.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    /// Sink that records the size of every write it accepts.
    struct RecordingSink {
        writes: Arc<Mutex<Vec<usize>>>,
        data: Vec<u8>,
    }

    impl RecordingSink {
        fn new() -> (Self, Arc<Mutex<Vec<usize>>>) {
            let writes = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    writes: writes.clone(),
                    data: Vec::new(),
                },
                writes,
            )
        }
    }

    impl AsyncWrite for RecordingSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.writes.lock().unwrap().push(buf.len());
            self.data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Sink that fails every write after the first `allow` succeed.
    struct FailingSink {
        allow: usize,
    }

    impl AsyncWrite for FailingSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.allow == 0 {
                return Poll::Ready(Err(io::Error::other("peer went away")));
            }
            self.allow -= 1;
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn test_response_head_layout() {
        let head = response_head("text/html", None, 42);
        assert_eq!(
            &head[..],
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 42\r\nConnection: close\r\n\r\n"
                .as_slice()
        );
    }

    #[test]
    fn test_response_head_with_encoding() {
        let head = response_head("application/javascript", Some("gzip"), 7);
        let text = std::str::from_utf8(&head).unwrap();
        assert!(text.contains("Content-Encoding: gzip\r\n"));
        assert!(text.contains("Content-Length: 7\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_chunk_count_and_sizes() {
        // 10_000 bytes at 4096 per chunk: 4096, 4096, 1808.
        let data = vec![7u8; 10_000];
        let (mut sink, writes) = RecordingSink::new();
        let mut reader = std::io::Cursor::new(data.clone());

        copy_chunks(&mut reader, &mut sink, 10_000, HTTP_CHUNK_SIZE)
            .await
            .unwrap();

        assert_eq!(*writes.lock().unwrap(), vec![4096, 4096, 1808]);
        assert_eq!(sink.data, data);
    }

    #[tokio::test]
    async fn test_exact_multiple_uses_full_final_chunk() {
        let data = vec![1u8; 8192];
        let (mut sink, writes) = RecordingSink::new();
        let mut reader = std::io::Cursor::new(data);

        copy_chunks(&mut reader, &mut sink, 8192, HTTP_CHUNK_SIZE)
            .await
            .unwrap();

        assert_eq!(*writes.lock().unwrap(), vec![4096, 4096]);
    }

    #[tokio::test]
    async fn test_zero_bytes_issues_no_writes() {
        let (mut sink, writes) = RecordingSink::new();
        let mut reader = std::io::Cursor::new(Vec::<u8>::new());

        copy_chunks(&mut reader, &mut sink, 0, HTTP_CHUNK_SIZE)
            .await
            .unwrap();

        assert!(writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_aborts_transfer() {
        let data = vec![2u8; 20_000];
        let mut sink = FailingSink { allow: 1 };
        let mut reader = std::io::Cursor::new(data);

        let err = copy_chunks(&mut reader, &mut sink, 20_000, HTTP_CHUNK_SIZE)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "peer went away");
    }
}
