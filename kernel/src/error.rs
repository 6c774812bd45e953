//! Kernel error types.
//!
//! Mirrors the teacher's `SystemError`/`MailboxError` split (structured
//! `thiserror` enums, one per concern) collapsed into a single enum because
//! every variant here is returned straight to a caller of the public API
//! (§7), never routed through a second error layer the way the teacher
//! separates `SystemError` from `BrokerError`/`MailboxError`.

use thiserror::Error;

use crate::id::ActorId;

/// Errors surfaced by the kernel's public API (§7).
#[derive(Debug, Error)]
pub enum KernelError {
    /// Target actor unknown, or its mailbox has already closed.
    #[error("no such actor: {0}")]
    NoSuchActor(ActorId),

    /// Missing capability, or an unrecognized operation without a
    /// parent-override path.
    #[error("policy denied: {from} -> {to}")]
    PolicyDenied { from: ActorId, to: ActorId },

    /// Enqueue timed out waiting for mailbox capacity (`T_full`).
    #[error("mailbox busy: {0}")]
    Busy(ActorId),

    /// `AwaitTimeout`/`SendSync` expired before a reply arrived.
    #[error("deadline exceeded")]
    Deadline,

    /// Send attempted after the target's cleanup sequence began.
    #[error("mailbox closed: {0}")]
    Closed(ActorId),

    /// `ReceiveFromPassive` called on a non-passive actor, or by a caller
    /// that is not the passive actor's parent.
    #[error("invalid passive receive on {0}")]
    InvalidPassive(ActorId),
}

impl KernelError {
    /// True for errors that represent normal backpressure/timeout
    /// conditions a caller might retry, as opposed to a policy rejection.
    pub fn is_transient(&self) -> bool {
        matches!(self, KernelError::Busy(_) | KernelError::Deadline)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn display_includes_actor_id() {
        let err = KernelError::NoSuchActor(ActorId::from_raw(7));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn policy_denied_display() {
        let err = KernelError::PolicyDenied {
            from: ActorId::from_raw(1),
            to: ActorId::from_raw(2),
        };
        let msg = err.to_string();
        assert!(msg.contains('1'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn transient_classification() {
        assert!(KernelError::Busy(ActorId::from_raw(1)).is_transient());
        assert!(KernelError::Deadline.is_transient());
        assert!(!KernelError::NoSuchActor(ActorId::from_raw(1)).is_transient());
    }
}
