//! Stream utilities for classifying raw connections
//!
//! - [`TimeoutReader`] turns a quiet connection into end-of-stream
//! - [`peek`] reads ahead without losing the bytes it read
//! - [`classify`] decides between help output and forwarding

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::time::Sleep;

use crate::protocol::constants::{HELP_COMMAND, LINE_PREFIX};

/// Reader that reports end-of-stream once a single read has waited longer than `timeout`.
///
/// Raw clients piping a file (`cat file | nc host 9999`) usually never close
/// their write side, so silence for one timeout window is treated as the end
/// of the payload. A client that pauses longer than that while still sending
/// is cut off the same way. Once end-of-stream was seen, further reads
/// return immediately.
#[derive(Debug)]
pub struct TimeoutReader<R> {
    inner: R,
    timeout: Duration,
    deadline: Option<Pin<Box<Sleep>>>,
    eof: bool,
}

impl<R> TimeoutReader<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            deadline: None,
            eof: false,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TimeoutReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if this.eof || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let timeout = this.timeout;
        let deadline = this
            .deadline
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));

        let filled = buf.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.deadline = None;
                if result.is_ok() && buf.filled().len() == filled {
                    this.eof = true;
                }
                Poll::Ready(result)
            }
            Poll::Pending => match deadline.as_mut().poll(cx) {
                Poll::Ready(()) => {
                    this.deadline = None;
                    this.eof = true;
                    Poll::Ready(Ok(()))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

/// A stream with a bounded prefix already read into memory.
///
/// Reading from it yields the peeked bytes first, then the rest of the stream.
#[derive(Debug)]
pub struct Peeked<R> {
    peeked: Vec<u8>,
    pos: usize,
    inner: R,
}

impl<R> Peeked<R> {
    pub fn peeked_bytes(&self) -> &[u8] {
        &self.peeked
    }

    /// Split into the peeked bytes and the untouched remainder of the stream
    pub fn into_parts(self) -> (Vec<u8>, R) {
        (self.peeked, self.inner)
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Peeked<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if this.pos < this.peeked.len() {
            let n = buf.remaining().min(this.peeked.len() - this.pos);
            buf.put_slice(&this.peeked[this.pos..this.pos + n]);
            this.pos += n;
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

/// Read up to `limit` bytes, stopping early at end-of-stream.
pub async fn peek<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> io::Result<Peeked<R>> {
    let mut peeked = vec![0u8; limit];
    let mut read = 0;
    while read < limit {
        match reader.read(&mut peeked[read..]).await? {
            0 => break,
            n => read += n,
        }
    }
    peeked.truncate(read);

    Ok(Peeked {
        peeked,
        pos: 0,
        inner: reader,
    })
}

/// What a raw connection asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Help,
    /// Store the payload at `path`; payload starts at `offset` in the peeked bytes
    Forward { path: String, offset: usize },
}

pub fn classify(peeked: &[u8]) -> Classification {
    if std::str::from_utf8(peeked).is_ok_and(|text| text.trim() == HELP_COMMAND) {
        return Classification::Help;
    }
    let (path, offset) = extract_path(peeked);
    Classification::Forward { path, offset }
}

/// Parse an optional `pcopy:<path>\n` first line.
///
/// Returns the path and the offset right after that line, or `("", 0)` if the
/// first line is incomplete or lacks the prefix.
pub fn extract_path(peeked: &[u8]) -> (String, usize) {
    let Some(newline) = peeked.iter().position(|&b| b == b'\n') else {
        return (String::new(), 0);
    };
    match peeked[..newline].strip_prefix(LINE_PREFIX.as_bytes()) {
        Some(path) => (String::from_utf8_lossy(path).into_owned(), newline + 1),
        None => (String::new(), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_extract_path_with_prefix() {
        let input = b"pcopy:notes.txt\nhello\nworld";
        let (path, offset) = extract_path(input);
        assert_eq!(path, "notes.txt");
        assert_eq!(&input[offset..], b"hello\nworld");
    }

    #[test]
    fn test_extract_path_without_prefix() {
        assert_eq!(extract_path(b"just some text\nmore"), (String::new(), 0));
        assert_eq!(extract_path(b"pcopy:no-newline-yet"), (String::new(), 0));
        assert_eq!(extract_path(b""), (String::new(), 0));
    }

    #[test]
    fn test_extract_path_empty_path() {
        assert_eq!(extract_path(b"pcopy:\ndata"), (String::new(), 7));
    }

    #[test]
    fn test_classify_help() {
        assert_eq!(classify(b"help"), Classification::Help);
        assert_eq!(classify(b"  help\n"), Classification::Help);
        assert_eq!(classify(b"\thelp\r\n"), Classification::Help);
    }

    #[test]
    fn test_classify_forward() {
        assert_eq!(
            classify(b"help me"),
            Classification::Forward { path: String::new(), offset: 0 }
        );
        assert_eq!(
            classify(b"pcopy:help\nbody"),
            Classification::Forward { path: "help".to_string(), offset: 11 }
        );
        assert_eq!(classify(b""), Classification::Forward { path: String::new(), offset: 0 });
    }

    #[tokio::test]
    async fn test_peek_short_stream_is_non_destructive() {
        let reader: &[u8] = b"short content";
        let mut peeked = peek(reader, 1024).await.unwrap();
        assert_eq!(peeked.peeked_bytes(), b"short content");

        let mut all = Vec::new();
        peeked.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, b"short content");
    }

    #[tokio::test]
    async fn test_peek_is_bounded_and_continues_stream() {
        let reader: &[u8] = b"0123456789abcdef";
        let mut peeked = peek(reader, 10).await.unwrap();
        assert_eq!(peeked.peeked_bytes(), b"0123456789");

        let mut all = Vec::new();
        peeked.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, b"0123456789abcdef");
    }

    #[tokio::test]
    async fn test_peek_collects_across_reads() {
        let reader = tokio_test::io::Builder::new()
            .read(b"pcopy:")
            .read(b"a.txt\n")
            .read(b"payload")
            .build();
        let peeked = peek(reader, 64).await.unwrap();
        assert_eq!(peeked.peeked_bytes(), b"pcopy:a.txt\npayload");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reader_turns_silence_into_eof() {
        let (client, server) = tokio::io::duplex(64);
        let mut reader = TimeoutReader::new(server, Duration::from_secs(3));

        let start = tokio::time::Instant::now();
        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        assert!(start.elapsed() >= Duration::from_secs(3));

        // No second wait once end-of-stream was seen
        let again = tokio::time::Instant::now();
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
        assert_eq!(again.elapsed(), Duration::ZERO);
        drop(client);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reader_rearms_per_read() {
        let mock = tokio_test::io::Builder::new()
            .read(b"one")
            .wait(Duration::from_secs(2))
            .read(b"two")
            .wait(Duration::from_secs(2))
            .read(b"three")
            .build();
        let mut reader = TimeoutReader::new(mock, Duration::from_secs(3));

        let mut all = Vec::new();
        reader.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, b"onetwothree");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reader_cuts_off_long_pause() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = TimeoutReader::new(server, Duration::from_secs(3));

        client.write_all(b"first").await.unwrap();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            let _ = client.write_all(b"late").await;
            client
        });

        let mut all = Vec::new();
        reader.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, b"first");
        drop(writer);
    }

    #[tokio::test]
    async fn test_timeout_reader_passes_real_eof() {
        let mut reader = TimeoutReader::new(&b"done"[..], Duration::from_secs(3));
        let mut all = Vec::new();
        reader.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, b"done");
        assert_eq!(reader.read(&mut [0u8; 4]).await.unwrap(), 0);
    }
}
