//! Byte-ceiling enforcement for streamed HTTP bodies.
//!
//! A response body is produced after the handler has already returned its
//! status, so a copy failure cannot become an error status any more. Yielding
//! an error from the stream makes hyper abort the connection instead, and the
//! `on_finish` observer lets the broker tell the other participant.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::Bytes;
use futures_util::{Stream, StreamExt};

use super::{Budget, CopyError};

type FinishObserver = Box<dyn FnOnce(&Result<u64, CopyError>) + Send>;

/// Stream adapter that fails once more than `limit` bytes pass through.
pub struct BoundedStream<S> {
    inner: S,
    budget: Budget,
    on_finish: Option<FinishObserver>,
    finished: bool,
}

impl<S> BoundedStream<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        Self {
            inner,
            budget: Budget::new(limit),
            on_finish: None,
            finished: false,
        }
    }

    /// Register a callback that runs exactly once with the transfer outcome.
    ///
    /// Dropping the stream before end-of-stream reports `CopyError::Aborted`.
    pub fn on_finish<F>(mut self, observer: F) -> Self
    where
        F: FnOnce(&Result<u64, CopyError>) + Send + 'static,
    {
        self.on_finish = Some(Box::new(observer));
        self
    }

    fn finish(&mut self, outcome: &Result<u64, CopyError>) {
        self.finished = true;
        if let Some(observer) = self.on_finish.take() {
            observer(outcome);
        }
    }
}

impl<S, E> Stream for BoundedStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<Bytes, CopyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match ready!(this.inner.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => match this.budget.consume(chunk.len() as u64) {
                Ok(()) => Poll::Ready(Some(Ok(chunk))),
                Err(err) => {
                    this.finish(&Err(CopyError::Exceeded {
                        limit: this.budget.limit(),
                    }));
                    Poll::Ready(Some(Err(err)))
                }
            },
            Some(Err(err)) => {
                let message = err.to_string();
                this.finish(&Err(CopyError::Source(message.clone())));
                Poll::Ready(Some(Err(CopyError::Source(message))))
            }
            None => {
                let used = this.budget.used();
                this.finish(&Ok(used));
                Poll::Ready(None)
            }
        }
    }
}

impl<S> Drop for BoundedStream<S> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(&Err(CopyError::Aborted));
        }
    }
}

/// Buffer a whole stream in memory, enforcing the same ceiling.
pub async fn collect_max<S, E>(stream: S, limit: u64) -> Result<Bytes, CopyError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut bounded = BoundedStream::new(stream, limit);
    let mut buf = Vec::new();
    while let Some(chunk) = bounded.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(Bytes::from(buf))
}
