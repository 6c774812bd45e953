//! REPL front-end: a passive actor. Nothing drains its mailbox
//! automatically — a caller (typically whatever owns the terminal) drives
//! it explicitly via [`slug_kernel::Kernel::dequeue`], one line at a time,
//! the same "pull, don't push" shape file descriptors and interactive
//! shells need.

use std::time::Duration;

use slug_kernel::prelude::*;

#[derive(Debug, Clone)]
pub struct ReplLine {
    pub text: String,
}

/// Spawn the REPL's passive inbox under `parent`. `parent` is the only
/// actor allowed to call `dequeue` against it.
pub fn spawn(kernel: &Kernel, parent: ActorId) -> Result<ActorId, KernelError> {
    let op_map = OperationMap::new().require::<ReplLine>(Rights::WRITE);
    kernel.spawn_passive(parent, Some("repl".into()), op_map)
}

/// Pull the next submitted line, if any, blocking the caller up to
/// `timeout_dur` for one to arrive. Returns `Ok(None)` both on timeout and
/// once the mailbox has closed and drained.
pub async fn next_line(
    kernel: &Kernel,
    caller: ActorId,
    repl: ActorId,
    timeout_dur: Duration,
) -> Result<Option<String>, KernelError> {
    let msg = kernel.dequeue(caller, repl, timeout_dur).await?;
    Ok(msg.and_then(|m| m.downcast::<ReplLine>().ok()).map(|l| l.text))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use slug_kernel::KernelConfig;

    const TEST_TIMEOUT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn drains_lines_in_submission_order() {
        let kernel = Kernel::new(KernelConfig::default());
        let repl = spawn(&kernel, ActorId::KERNEL).unwrap();

        kernel
            .send(
                ActorId::KERNEL,
                repl,
                ReplLine {
                    text: "let x = 1".into(),
                },
            )
            .await
            .unwrap();
        kernel
            .send(
                ActorId::KERNEL,
                repl,
                ReplLine {
                    text: "print(x)".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            next_line(&kernel, ActorId::KERNEL, repl, TEST_TIMEOUT)
                .await
                .unwrap(),
            Some("let x = 1".into())
        );
        assert_eq!(
            next_line(&kernel, ActorId::KERNEL, repl, TEST_TIMEOUT)
                .await
                .unwrap(),
            Some("print(x)".into())
        );
    }

    #[tokio::test]
    async fn non_parent_caller_is_rejected() {
        let kernel = Kernel::new(KernelConfig::default());
        let repl = spawn(&kernel, ActorId::KERNEL).unwrap();
        let stranger = ActorId::from_raw(9999);

        let err = next_line(&kernel, stranger, repl, TEST_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidPassive(_)));
    }

    #[tokio::test]
    async fn times_out_when_nothing_is_submitted() {
        let kernel = Kernel::new(KernelConfig::default());
        let repl = spawn(&kernel, ActorId::KERNEL).unwrap();

        let line = next_line(&kernel, ActorId::KERNEL, repl, Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(line, None);
    }
}
