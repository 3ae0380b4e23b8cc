//! Pull-based stream of assistant text deltas.
//!
//! [`DeltaStream`] wraps any chunked byte source, decodes it with
//! [`LineDecoder`] and yields the non-empty deltas in arrival order. It is
//! single pass. Dropping it drops the underlying body, which is how a
//! consumer cancels a reply.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};

use crate::decoder::LineDecoder;
use crate::error::{BoxError, ClientError};
use crate::frame::StreamFrame;

type ByteSource = BoxStream<'static, Result<Bytes, BoxError>>;

pub struct DeltaStream {
    /// `None` once the body closed, failed, or the sentinel was seen.
    source: Option<ByteSource>,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    saw_sentinel: bool,
}

impl DeltaStream {
    pub fn new<S, E>(source: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            source: Some(source.map_err(Into::<BoxError>::into).boxed()),
            decoder: LineDecoder::new(),
            ready: VecDeque::new(),
            saw_sentinel: false,
        }
    }

    /// Read the body of a successful gateway response.
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    /// Whether the producer ended the stream with `[DONE]` rather than just
    /// closing the connection.
    pub fn saw_sentinel(&self) -> bool {
        self.saw_sentinel
    }

    fn accept(&mut self, lines: Vec<String>) {
        for line in lines {
            match StreamFrame::parse(&line) {
                Some(StreamFrame::Done) => {
                    // Stop reading; the rest of the body is never polled.
                    self.saw_sentinel = true;
                    self.source = None;
                    return;
                }
                Some(StreamFrame::Delta(Some(delta))) => self.ready.push_back(delta),
                Some(StreamFrame::Delta(None)) | None => {}
            }
        }
    }
}

impl Stream for DeltaStream {
    type Item = Result<String, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(delta) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(delta)));
            }
            let Some(source) = this.source.as_mut() else {
                return Poll::Ready(None);
            };
            match ready!(source.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    let lines = this.decoder.push(&chunk);
                    this.accept(lines);
                }
                Some(Err(e)) => {
                    this.source = None;
                    return Poll::Ready(Some(Err(ClientError::Read(e))));
                }
                None => {
                    this.source = None;
                    if let Some(line) = this.decoder.finish() {
                        this.accept(vec![line]);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for DeltaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaStream")
            .field("open", &self.source.is_some())
            .field("buffered", &self.ready.len())
            .field("saw_sentinel", &self.saw_sentinel)
            .finish()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
