//! Handling of a single raw connection
//!
//! The connection is peeked to tell `help` apart from an upload, then either
//! answered with the help text or forwarded as a streaming `PUT`. Nothing
//! here closes the connection; the accept loop does that after writing any
//! error line.

use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Duration;

use http::{HeaderName, HeaderValue, Method, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::stream::{classify, peek, Classification, TimeoutReader};
use super::upstream::{Upstream, UpstreamRequest};
use crate::protocol::constants::{BODY_PIPE_CAPACITY, BRIDGE_BUFFER_SIZE, HEADER_NO_REDIRECT, HELP_PATH};
use crate::{Error, Result};

/// Serve one raw connection against `upstream`.
pub async fn handle_conn<S>(
    stream: &mut S,
    remote_addr: Option<SocketAddr>,
    upstream: &dyn Upstream,
    read_timeout: Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let reader = TimeoutReader::new(read_half, read_timeout);

    let peeked = peek(reader, BRIDGE_BUFFER_SIZE)
        .await
        .map_err(|e| Error::Bridge(format!("cannot peek: {e}")))?;

    match classify(peeked.peeked_bytes()) {
        Classification::Help => handle_help(&mut write_half, remote_addr, upstream).await,
        Classification::Forward { path, offset } => {
            let (peeked, reader) = peeked.into_parts();
            let mut payload = Cursor::new(peeked);
            payload.set_position(offset as u64);
            forward(payload.chain(reader), &path, &mut write_half, remote_addr, upstream).await
        }
    }
}

fn no_redirect_header() -> (HeaderName, HeaderValue) {
    (HeaderName::from_static(HEADER_NO_REDIRECT), HeaderValue::from_static("1"))
}

async fn handle_help<W>(writer: &mut W, remote_addr: Option<SocketAddr>, upstream: &dyn Upstream) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let (name, value) = no_redirect_header();
    let request = UpstreamRequest::new(Method::GET, HELP_PATH)
        .with_header(name, value)
        .with_remote_addr(remote_addr);

    let response = upstream.invoke(request).await?;
    if response.status != StatusCode::OK {
        return Err(Error::Status(response.status.to_string()));
    }

    writer.write_all(&response.body).await?;
    writer.flush().await?;
    Ok(())
}

async fn forward<R, W>(
    mut payload: R,
    path: &str,
    writer: &mut W,
    remote_addr: Option<SocketAddr>,
    upstream: &dyn Upstream,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // The handler reads the body from one end of the pipe while the payload
    // is still arriving on the other; shutting down the write end ends the body.
    let (mut body_writer, body_reader) = tokio::io::duplex(BODY_PIPE_CAPACITY);
    let (name, value) = no_redirect_header();
    let request = UpstreamRequest::new(Method::PUT, format!("/{path}"))
        .with_header(name, value)
        .with_remote_addr(remote_addr)
        .with_body(body_reader);

    let copy_body = async move {
        let copied = tokio::io::copy(&mut payload, &mut body_writer).await?;
        body_writer.shutdown().await?;
        Ok::<u64, std::io::Error>(copied)
    };
    let (copied, response) = tokio::join!(copy_body, upstream.invoke(request));

    let response = response?;
    if response.status != StatusCode::CREATED && response.status != StatusCode::PARTIAL_CONTENT {
        return Err(Error::Status(response.status.to_string()));
    }
    let copied = copied.map_err(|e| Error::Bridge(format!("cannot forward request body: {e}")))?;
    tracing::debug!("forwarded {} bytes to /{} ({})", copied, path, response.status);

    writer.write_all(&response.body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::upstream::UpstreamResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, PartialEq)]
    struct Seen {
        method: Method,
        path: String,
        no_redirect: bool,
        body: Vec<u8>,
    }

    struct Recorder {
        status: StatusCode,
        reply: &'static str,
        seen: Mutex<Vec<Seen>>,
    }

    impl Recorder {
        fn new(status: StatusCode, reply: &'static str) -> Self {
            Self {
                status,
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for Recorder {
        async fn invoke(&self, mut request: UpstreamRequest) -> Result<UpstreamResponse> {
            let mut body = Vec::new();
            request.body.read_to_end(&mut body).await?;
            self.seen.lock().unwrap().push(Seen {
                method: request.method,
                path: request.path,
                no_redirect: request.headers.get(HEADER_NO_REDIRECT).is_some_and(|v| v == "1"),
                body,
            });
            Ok(UpstreamResponse::new(self.status, Bytes::from_static(self.reply.as_bytes())))
        }
    }

    async fn run(upstream: &dyn Upstream, input: &[u8]) -> (Result<()>, Vec<u8>) {
        let (mut client, mut server) = tokio::io::duplex(1 << 20);
        client.write_all(input).await.unwrap();
        client.shutdown().await.unwrap();

        let result = handle_conn(&mut server, None, upstream, Duration::from_secs(3)).await;
        drop(server);

        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        (result, output)
    }

    #[test]
    fn test_no_redirect_header_uses_shared_name() {
        let (name, value) = no_redirect_header();
        assert_eq!(name.as_str(), HEADER_NO_REDIRECT);
        assert_eq!(value, "1");
    }

    #[tokio::test]
    async fn test_forward_with_path() {
        let upstream = Recorder::new(StatusCode::CREATED, "https://clip.example.com/notes.txt\n");
        let (result, output) = run(&upstream, b"pcopy:notes.txt\nhello\nworld").await;

        result.unwrap();
        assert_eq!(output, b"https://clip.example.com/notes.txt\n");
        assert_eq!(
            upstream.seen(),
            vec![Seen {
                method: Method::PUT,
                path: "/notes.txt".to_string(),
                no_redirect: true,
                body: b"hello\nworld".to_vec(),
            }]
        );
    }

    #[tokio::test]
    async fn test_forward_without_prefix_sends_everything() {
        let upstream = Recorder::new(StatusCode::CREATED, "ok\n");
        let (result, _) = run(&upstream, b"no prefix here\nsecond line").await;

        result.unwrap();
        let seen = upstream.seen();
        assert_eq!(seen[0].path, "/");
        assert_eq!(seen[0].body, b"no prefix here\nsecond line");
    }

    #[tokio::test]
    async fn test_forward_payload_larger_than_peek_buffer() {
        let mut input = b"pcopy:big.bin\n".to_vec();
        let payload: Vec<u8> = (0..BRIDGE_BUFFER_SIZE * 3).map(|i| (i % 251) as u8).collect();
        input.extend_from_slice(&payload);

        let upstream = Recorder::new(StatusCode::PARTIAL_CONTENT, "partial\n");
        let (result, output) = run(&upstream, &input).await;

        result.unwrap();
        assert_eq!(output, b"partial\n");
        assert_eq!(upstream.seen()[0].body, payload);
    }

    #[tokio::test]
    async fn test_help_is_never_forwarded() {
        let upstream = Recorder::new(StatusCode::OK, "usage: ...\n");
        let (result, output) = run(&upstream, b"  help \n").await;

        result.unwrap();
        assert_eq!(output, b"usage: ...\n");
        let seen = upstream.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::GET);
        assert_eq!(seen[0].path, "/nc");
        assert!(seen[0].no_redirect);
        assert!(seen[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_help_requires_ok() {
        let upstream = Recorder::new(StatusCode::NOT_FOUND, "nope");
        let (result, output) = run(&upstream, b"help").await;

        assert_eq!(result.unwrap_err().to_string(), "404 Not Found");
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_upload_leaks_no_body() {
        let upstream = Recorder::new(StatusCode::PAYLOAD_TOO_LARGE, "secret body");
        let (result, output) = run(&upstream, b"pcopy:x\ndata").await;

        assert_eq!(result.unwrap_err().to_string(), "413 Payload Too Large");
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_handler_dropping_body_early_does_not_hang() {
        struct Impatient;

        #[async_trait]
        impl Upstream for Impatient {
            async fn invoke(&self, _request: UpstreamRequest) -> Result<UpstreamResponse> {
                Ok(UpstreamResponse::new(StatusCode::FORBIDDEN, "denied"))
            }
        }

        let input = vec![b'a'; BRIDGE_BUFFER_SIZE + BODY_PIPE_CAPACITY * 2];
        let (result, output) = run(&Impatient, &input).await;
        assert_eq!(result.unwrap_err().to_string(), "403 Forbidden");
        assert!(output.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_client_ends_body_after_timeout() {
        let upstream = Arc::new(Recorder::new(StatusCode::CREATED, "stored\n"));
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(b"pcopy:idle\nstill open").await.unwrap();

        let start = tokio::time::Instant::now();
        let result = handle_conn(&mut server, None, upstream.as_ref(), Duration::from_secs(3)).await;
        result.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(6));
        assert_eq!(upstream.seen()[0].body, b"still open");
        drop(client);
    }

    #[tokio::test]
    async fn test_handler_sees_body_before_upload_finishes() {
        struct FirstChunk {
            tx: Mutex<Option<oneshot::Sender<Vec<u8>>>>,
        }

        #[async_trait]
        impl Upstream for FirstChunk {
            async fn invoke(&self, mut request: UpstreamRequest) -> Result<UpstreamResponse> {
                let mut chunk = vec![0u8; 4];
                request.body.read_exact(&mut chunk).await?;
                if let Some(tx) = self.tx.lock().unwrap().take() {
                    let _ = tx.send(chunk);
                }
                let mut rest = Vec::new();
                request.body.read_to_end(&mut rest).await?;
                Ok(UpstreamResponse::new(StatusCode::CREATED, format!("{} more\n", rest.len())))
            }
        }

        let (tx, rx) = oneshot::channel();
        let upstream = Arc::new(FirstChunk { tx: Mutex::new(Some(tx)) });
        let (mut client, mut server) = tokio::io::duplex(BRIDGE_BUFFER_SIZE * 4);

        let handler = upstream.clone();
        let task = tokio::spawn(async move {
            handle_conn(&mut server, None, handler.as_ref(), Duration::from_secs(3)).await
        });

        // Fill the peek buffer so classification happens while the upload is still open
        let mut first = b"pcopy:s\nabcd".to_vec();
        first.resize(BRIDGE_BUFFER_SIZE, b'x');
        client.write_all(&first).await.unwrap();

        assert_eq!(rx.await.unwrap(), b"abcd");
        client.write_all(b"tail").await.unwrap();
        client.shutdown().await.unwrap();

        task.await.unwrap().unwrap();
        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        let expected = format!("{} more\n", BRIDGE_BUFFER_SIZE - 12 + 4);
        assert_eq!(output, expected.as_bytes());
    }
}
