//! Bounded FIFO mailbox with timeout-based back-pressure (§4.1).
//!
//! Built directly on `tokio::sync::mpsc`, the same primitive the teacher's
//! `BoundedMailbox` (`mailbox/bounded.rs`) wraps; this module skips the
//! teacher's pluggable `MetricsRecorder`/`BackpressureStrategy` machinery
//! because the kernel has exactly one back-pressure policy (§4.1: block up
//! to `T_full`, then `Busy`) and exposes `Len`/`Capacity` straight off
//! `tokio::sync::mpsc::Sender`'s own permit accounting instead of a
//! separate atomic counter.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::error::KernelError;
use crate::id::ActorId;
use crate::message::Message;

/// The sending half of a mailbox. Cheap to clone (wraps an `mpsc::Sender`);
/// every holder of a `MailboxSender` can enqueue into the same queue.
#[derive(Clone)]
pub struct MailboxSender {
    target: ActorId,
    inner: mpsc::Sender<Message>,
}

/// The receiving half of a mailbox. Owned exclusively by the target
/// actor's dispatcher task — never cloned, mirroring the teacher's
/// `MailboxReceiver` ownership rule.
pub struct MailboxReceiver {
    target: ActorId,
    inner: mpsc::Receiver<Message>,
}

/// Create a bounded mailbox with the given capacity (§4.1, default 64 via
/// [`crate::config::DEFAULT_MAILBOX_CAPACITY`]).
pub fn bounded(target: ActorId, capacity: usize) -> (MailboxSender, MailboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        MailboxSender { target, inner: tx },
        MailboxReceiver { target, inner: rx },
    )
}

impl MailboxSender {
    /// Enqueue a message, blocking up to `timeout_dur` (`T_full`) if the
    /// mailbox is full. Returns `Busy` on timeout, `Closed`/`NoSuchActor`
    /// if the receiver has already been dropped or explicitly closed.
    pub async fn enqueue(&self, msg: Message, timeout_dur: Duration) -> Result<(), KernelError> {
        match timeout(timeout_dur, self.inner.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_send_error)) => Err(KernelError::Closed(self.target)),
            Err(_elapsed) => Err(KernelError::Busy(self.target)),
        }
    }

    /// Current number of messages queued, approximated from the channel's
    /// remaining permit count (§4.1 `Len`).
    pub fn len(&self) -> usize {
        self.max_capacity().saturating_sub(self.inner.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured maximum capacity (§4.1 `Capacity`).
    pub fn max_capacity(&self) -> usize {
        self.inner.max_capacity()
    }

    pub fn target(&self) -> ActorId {
        self.target
    }
}

impl MailboxReceiver {
    /// Dequeue the next message, or `None` once the mailbox is closed and
    /// drained (§4.1 `Dequeue`).
    pub async fn dequeue(&mut self) -> Option<Message> {
        self.inner.recv().await
    }

    /// Idempotently close the mailbox: unblocks any pending `Dequeue`
    /// (once drained) and makes subsequent `Enqueue` calls fail fast
    /// rather than wait out `T_full` (§4.1 `Close`).
    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn target(&self) -> ActorId {
        self.target
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use proptest::prelude::*;

    use super::*;

    fn actor(n: u64) -> ActorId {
        ActorId::from_raw(n)
    }

    #[tokio::test]
    async fn enqueue_then_dequeue_preserves_order() {
        let (tx, mut rx) = bounded(actor(1), 4);
        tx.enqueue(Message::new(actor(2), actor(1), 1u32), Duration::from_millis(100))
            .await
            .unwrap();
        tx.enqueue(Message::new(actor(2), actor(1), 2u32), Duration::from_millis(100))
            .await
            .unwrap();

        let first = rx.dequeue().await.unwrap();
        let second = rx.dequeue().await.unwrap();
        assert_eq!(first.downcast::<u32>().unwrap(), 1);
        assert_eq!(second.downcast::<u32>().unwrap(), 2);
    }

    #[tokio::test]
    async fn full_mailbox_returns_busy_after_timeout() {
        let (tx, _rx) = bounded(actor(1), 1);
        tx.enqueue(Message::new(actor(2), actor(1), 1u32), Duration::from_millis(50))
            .await
            .unwrap();

        let err = tx
            .enqueue(Message::new(actor(2), actor(1), 2u32), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::Busy(_)));
    }

    #[tokio::test]
    async fn closed_mailbox_rejects_enqueue() {
        let (tx, mut rx) = bounded(actor(1), 4);
        rx.close();
        let err = tx
            .enqueue(Message::new(actor(2), actor(1), 1u32), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::Closed(_)));
    }

    #[tokio::test]
    async fn dequeue_returns_none_once_closed_and_drained() {
        let (tx, mut rx) = bounded(actor(1), 4);
        tx.enqueue(Message::new(actor(2), actor(1), 1u32), Duration::from_millis(50))
            .await
            .unwrap();
        rx.close();

        assert!(rx.dequeue().await.is_some());
        assert!(rx.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn len_and_capacity_are_observable() {
        let (tx, _rx) = bounded(actor(1), 4);
        assert_eq!(tx.max_capacity(), 4);
        assert_eq!(tx.len(), 0);
        tx.enqueue(Message::new(actor(2), actor(1), 1u32), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(tx.len(), 1);
    }

    proptest! {
        /// FIFO ordering (§4.1) holds for an arbitrary sequence of enqueues,
        /// not just the fixed two-element example above.
        #[test]
        fn dequeue_order_matches_enqueue_order(values in prop::collection::vec(any::<u32>(), 1..64)) {
            futures::executor::block_on(async {
                let (tx, mut rx) = bounded(actor(1), values.len());
                for v in &values {
                    tx.enqueue(Message::new(actor(2), actor(1), *v), Duration::from_millis(100))
                        .await
                        .unwrap();
                }
                for expected in &values {
                    let msg = rx.dequeue().await.unwrap();
                    prop_assert_eq!(msg.downcast::<u32>().unwrap(), *expected);
                }
                Ok(())
            })?
        }
    }
}
