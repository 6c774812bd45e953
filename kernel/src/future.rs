//! Single-shot futures over the reply channel (§4.6 `SendSync`/`SendFuture`).
//!
//! Wraps `tokio::sync::oneshot::Receiver` rather than introducing a new
//! channel primitive: the teacher reaches for plain `tokio::sync::oneshot`
//! wherever it needs an "answer arrives once" handle (see its `ask`-style
//! helpers), and `Message::resp` is already a `oneshot::Sender` (§3), so
//! this module is a thin, named wrapper rather than new machinery.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout as tokio_timeout;

use crate::error::KernelError;
use crate::message::{Message, RespReceiver};

/// A handle to a reply that has not arrived yet (§4.6). Consumed by
/// `await`ing [`Future::recv`] or [`Future::recv_timeout`]; there is no way
/// to poll twice, matching the "consumed by the first read" rule on
/// `Message::resp`.
pub struct Future {
    inner: RespReceiver,
}

impl Future {
    pub(crate) fn new(inner: RespReceiver) -> Self {
        Self { inner }
    }

    /// Wait indefinitely for the reply.
    pub async fn recv(self) -> Result<Message, KernelError> {
        self.inner.await.map_err(|_| KernelError::Deadline)
    }

    /// Wait up to `timeout_dur`. On timeout the sender side's `reply()`
    /// becomes a no-op landing on a now-dropped channel (§4.6: "abandoning
    /// the future after a timeout ... a late reply is silently discarded").
    pub async fn recv_timeout(self, timeout_dur: Duration) -> Result<Message, KernelError> {
        match tokio_timeout(timeout_dur, self.inner).await {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(_canceled)) => Err(KernelError::Deadline),
            Err(_elapsed) => Err(KernelError::Deadline),
        }
    }

    /// True if the reply has already arrived or the sender has already
    /// dropped, without consuming the future.
    pub fn is_done(&mut self) -> bool {
        match self.inner.try_recv() {
            Err(oneshot::error::TryRecvError::Empty) => false,
            _ => true,
        }
    }

    /// Transform the eventual reply without blocking now.
    pub async fn map<T>(self, f: impl FnOnce(Message) -> T) -> Result<T, KernelError> {
        self.recv().await.map(f)
    }

    /// Chain a second async step onto the eventual reply.
    pub async fn then<T, Fut>(self, f: impl FnOnce(Message) -> Fut) -> Result<T, KernelError>
    where
        Fut: std::future::Future<Output = Result<T, KernelError>>,
    {
        let msg = self.recv().await?;
        f(msg).await
    }

    /// Await every future in order, failing fast on the first error
    /// (§4.6: composable combinators). Order-preserving: index `i` of the
    /// output corresponds to index `i` of the input.
    pub async fn all(futures: Vec<Future>) -> Result<Vec<Message>, KernelError> {
        let mut out = Vec::with_capacity(futures.len());
        for fut in futures {
            out.push(fut.recv().await?);
        }
        Ok(out)
    }

    /// Resolve with whichever future completes first; the rest are
    /// dropped (and any eventual reply to them silently discarded).
    pub async fn first(futures: Vec<Future>) -> Result<Message, KernelError> {
        if futures.is_empty() {
            return Err(KernelError::Deadline);
        }
        let receivers = futures.into_iter().map(|f| Box::pin(f.inner));
        let (result, _index, _remaining) = futures::future::select_all(receivers).await;
        result.map_err(|_canceled| KernelError::Deadline)
    }
}
