// Connection IO module
// Adds the isolation headers to responses hyper writes on its own

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Header lines added to a response head that lacks them
const ISOLATION_LINES: &[u8] =
    b"Cross-Origin-Embedder-Policy: require-corp\r\nCross-Origin-Opener-Policy: same-origin\r\n";

/// Marker identifying heads that already went through the service layer
const MARKER: &str = "cross-origin-embedder-policy:";

/// Heads larger than this are passed through untouched
const MAX_HEAD_LEN: usize = 64 * 1024;

/// For each response the service produced, in order: was it for a HEAD request
///
/// HEAD responses carry a `Content-Length` but no body, which cannot be told
/// from the bytes on the wire.
pub type HeadRequests = Arc<Mutex<VecDeque<bool>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    /// Collecting a response head
    Head,
    /// Passing through this many body bytes
    Body(u64),
    /// Body length unknown, pass everything through
    Raw,
}

/// Stream wrapper that tracks response framing on the write side
///
/// Responses from the service already carry the isolation headers. Responses
/// hyper produces itself (`400` for an unparsable request, `431` for an
/// oversized head) do not, and get them added here. Reads pass straight
/// through.
pub struct IsolatedIo<T> {
    inner: T,
    state: WriteState,
    head: Vec<u8>,
    pending: Vec<u8>,
    flushed: usize,
    head_requests: HeadRequests,
}

impl<T> IsolatedIo<T> {
    pub fn new(inner: T, head_requests: HeadRequests) -> Self {
        Self {
            inner,
            state: WriteState::Head,
            head: Vec::new(),
            pending: Vec::new(),
            flushed: 0,
            head_requests,
        }
    }

    /// Take up to `buf.len()` bytes, returning how many were consumed
    fn absorb(&mut self, buf: &[u8]) -> usize {
        let mut consumed = 0;
        while consumed < buf.len() {
            let rest = &buf[consumed..];
            match self.state {
                WriteState::Raw => {
                    self.pending.extend_from_slice(rest);
                    consumed = buf.len();
                }
                WriteState::Body(0) => self.state = WriteState::Head,
                WriteState::Body(remaining) => {
                    let limit = usize::try_from(remaining).unwrap_or(usize::MAX);
                    let take = limit.min(rest.len());
                    self.pending.extend_from_slice(&rest[..take]);
                    self.state = WriteState::Body(remaining - take as u64);
                    consumed += take;
                }
                WriteState::Head => {
                    let before = self.head.len();
                    // Terminator may straddle two writes
                    let search_from = before.saturating_sub(3);
                    self.head.extend_from_slice(rest);

                    match find_head_end(&self.head[search_from..]) {
                        Some(pos) => {
                            let end = search_from + pos;
                            self.head.truncate(end);
                            consumed += end - before;
                            self.finish_head();
                        }
                        None => {
                            consumed = buf.len();
                            if self.head.len() > MAX_HEAD_LEN {
                                self.pending.append(&mut self.head);
                                self.state = WriteState::Raw;
                            }
                        }
                    }
                }
            }
        }
        consumed
    }

    /// Move a complete head into `pending` and work out the body framing
    fn finish_head(&mut self) {
        let head = std::mem::take(&mut self.head);
        let text = String::from_utf8_lossy(&head);
        let mut lines = text.split("\r\n");
        let status = lines
            .next()
            .and_then(|line| line.split(' ').nth(1))
            .and_then(|code| code.parse::<u16>().ok())
            .unwrap_or(0);

        let mut from_service = false;
        let mut content_length = None;
        let mut chunked = false;
        for line in lines {
            let lower = line.to_ascii_lowercase();
            if lower.starts_with(MARKER) {
                from_service = true;
            } else if let Some(value) = lower.strip_prefix("content-length:") {
                content_length = value.trim().parse::<u64>().ok();
            } else if let Some(value) = lower.strip_prefix("transfer-encoding:") {
                chunked = value.contains("chunked");
            }
        }

        let head_request = from_service
            && self
                .head_requests
                .lock()
                .ok()
                .and_then(|mut queue| queue.pop_front())
                .unwrap_or(false);

        if from_service {
            self.pending.extend_from_slice(&head);
        } else {
            // Keep the blank line that ends the head last
            self.pending.extend_from_slice(&head[..head.len() - 2]);
            self.pending.extend_from_slice(ISOLATION_LINES);
            self.pending.extend_from_slice(b"\r\n");
        }

        let bodyless = head_request
            || (100..200).contains(&status)
            || status == 204
            || status == 304;
        self.state = if bodyless {
            WriteState::Body(0)
        } else if chunked {
            WriteState::Raw
        } else {
            match content_length {
                Some(len) => WriteState::Body(len),
                None => WriteState::Raw,
            }
        };
    }
}

impl<T: AsyncWrite + Unpin> IsolatedIo<T> {
    /// Write out everything in `pending`
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.flushed < self.pending.len() {
            let unsent = &self.pending[self.flushed..];
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, unsent))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.flushed += n;
        }
        self.pending.clear();
        self.flushed = 0;
        Poll::Ready(Ok(()))
    }
}

/// Index just past the `\r\n\r\n` that ends a head
fn find_head_end(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

impl<T: AsyncRead + Unpin> AsyncRead for IsolatedIo<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for IsolatedIo<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Poll::Ready(Ok(this.absorb(buf)))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    const SERVICE_HEAD: &str = "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\
        Cross-Origin-Embedder-Policy: require-corp\r\n\
        Cross-Origin-Opener-Policy: same-origin\r\n\r\n";
    const HYPER_400: &str =
        "HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
    const COOP_LAST: &str = "Cross-Origin-Opener-Policy: same-origin\r\n\r\n";

    fn wrap() -> (IsolatedIo<Vec<u8>>, HeadRequests) {
        let head_requests = HeadRequests::default();
        let io = IsolatedIo::new(Vec::new(), Arc::clone(&head_requests));
        (io, head_requests)
    }

    fn written(io: &IsolatedIo<Vec<u8>>) -> String {
        String::from_utf8(io.inner.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_bare_error_head_gets_headers() {
        let (mut io, _) = wrap();
        io.write_all(HYPER_400.as_bytes()).await.unwrap();
        io.flush().await.unwrap();

        assert_eq!(
            written(&io),
            "HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\
             Cross-Origin-Embedder-Policy: require-corp\r\n\
             Cross-Origin-Opener-Policy: same-origin\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_service_response_untouched_then_error_patched() {
        let (mut io, head_requests) = wrap();
        head_requests.lock().unwrap().push_back(false);

        // Body looks like a head on purpose: it must be skipped by length
        let mut stream = format!("{SERVICE_HEAD}HTTP/");
        stream.push_str(HYPER_400);
        // One byte at a time so the terminator straddles writes
        for byte in stream.as_bytes() {
            io.write_all(&[*byte]).await.unwrap();
        }
        io.flush().await.unwrap();

        let out = written(&io);
        assert!(out.starts_with(&format!("{SERVICE_HEAD}HTTP/HTTP/1.1 400")));
        assert_eq!(out.matches("Cross-Origin-Embedder-Policy").count(), 2);
        assert_eq!(out.matches("Cross-Origin-Opener-Policy").count(), 2);
    }

    #[tokio::test]
    async fn test_head_response_has_no_body() {
        let (mut io, head_requests) = wrap();
        head_requests.lock().unwrap().push_back(true);

        let stream = format!("{SERVICE_HEAD}{HYPER_400}");
        io.write_all(stream.as_bytes()).await.unwrap();
        io.flush().await.unwrap();

        let out = written(&io);
        assert!(out.starts_with(SERVICE_HEAD));
        assert!(out.ends_with(COOP_LAST));
        assert_eq!(out.matches("Cross-Origin-Embedder-Policy").count(), 2);
        assert!(head_requests.lock().unwrap().is_empty());
    }
}
