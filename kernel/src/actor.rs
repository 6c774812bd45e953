//! The `Handler` trait, supervision control signals, actor records, and the
//! context a running handler sees.
//!
//! The teacher's `Actor` trait (`actor/traits.rs`) is generic over an
//! associated `Message` type so the compiler can monomorphize dispatch
//! (§6.2 zero-cost abstractions). This kernel cannot take that path: any
//! actor may receive any payload type from any other actor, checked
//! dynamically against its `OperationMap` (§9), so `Handler` is an
//! object-safe `async_trait` operating on the type-erased [`Message`] and
//! stored behind `Box<dyn Handler>`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::capability::CapabilitySet;
use crate::id::ActorId;
use crate::mailbox::{MailboxReceiver, MailboxSender};
use crate::message::Message;
use crate::policy::OperationMap;
use crate::Kernel;

/// The context a handler sees on every invocation (§4.2): its own
/// identity, a handle back to the kernel for further `Send`/`Spawn`/
/// `GrantCap` calls, and a cancellation signal tied to its lifetime
/// (§5 "Cancellation").
pub struct ActorContext {
    self_id: ActorId,
    kernel: Kernel,
    cancel: watch::Receiver<bool>,
}

impl ActorContext {
    pub(crate) fn new(self_id: ActorId, kernel: Kernel, cancel: watch::Receiver<bool>) -> Self {
        Self {
            self_id,
            kernel,
            cancel,
        }
    }

    pub fn id(&self) -> ActorId {
        self.self_id
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// True once this actor's cancellation signal has tripped
    /// (`Terminate`/cascade `Exit` in progress).
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Suspend until cancellation trips. A handler performing its own
    /// blocking I/O can race this against the I/O future to abort
    /// promptly (§5).
    pub async fn cancelled(&mut self) {
        // `changed()` only resolves on an actual transition; if the signal
        // was already tripped before we started watching, return
        // immediately instead of waiting for a transition that already
        // happened.
        if self.is_cancelled() {
            return;
        }
        let _ = self.cancel.changed().await;
    }
}

/// Supervision decision returned by a handler (§4.2).
#[derive(Debug)]
pub enum ControlSignal {
    /// Dequeue the next message.
    Continue,
    /// Run cleanup, cascade-terminate children, exit.
    Terminate { reason: String },
    /// Cleanup, then recreate the actor from its original handler factory,
    /// same name/parent/op-map, with a fresh (empty) capability set (§9).
    Restart { reason: String },
    /// Observational: logged, then `Continue` (§4.2, §7 — handlers that
    /// want to fail loudly return `Terminate`/`Restart` instead).
    Error(String),
}

impl ControlSignal {
    pub fn terminate(reason: impl Into<String>) -> Self {
        ControlSignal::Terminate {
            reason: reason.into(),
        }
    }

    pub fn restart(reason: impl Into<String>) -> Self {
        ControlSignal::Restart {
            reason: reason.into(),
        }
    }
}

/// An actor's message-handling logic. Object-safe so the dispatcher can
/// hold actors of differing concrete type behind one `Box<dyn Handler>`
/// (§9).
#[async_trait]
pub trait Handler: Send + 'static {
    async fn handle(&mut self, msg: Message, ctx: &mut ActorContext) -> ControlSignal;
}

/// Produces a fresh `Handler` instance. Spawn takes a factory (not a bare
/// handler) so `Restart` (§4.2) can recreate the actor's logic from
/// scratch rather than resume a handler that may hold bad state — the same
/// role the teacher's `ChildSpec::factory: Fn() -> C` plays
/// (`supervisor/types.rs`).
pub trait HandlerFactory: Fn() -> Box<dyn Handler> + Send + Sync + 'static {}
impl<F: Fn() -> Box<dyn Handler> + Send + Sync + 'static> HandlerFactory for F {}

/// Advisory, non-enforced resource counters (§3, Non-goals: "sandboxed
/// memory budgets ... counters are advisory only").
#[derive(Debug, Default)]
pub struct Counters {
    pub cpu_micros: AtomicU64,
    pub ipc_in: AtomicU64,
    pub ipc_out: AtomicU64,
}

impl Counters {
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.cpu_micros.load(Ordering::Relaxed),
            self.ipc_in.load(Ordering::Relaxed),
            self.ipc_out.load(Ordering::Relaxed),
        )
    }
}

/// Lifecycle state of an actor record, used to gate passive-mailbox
/// receives and to answer "has cleanup begun" without consulting the
/// mailbox directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    Running,
    Terminating,
    Terminated,
}

/// Everything the kernel tracks about one actor (§3 `Actor`). Exactly one
/// owner per field per the data model: the kernel mutates `children`/
/// `caps`/`state`; the actor's own runloop is the only writer of its
/// `counters`.
pub struct ActorRecord {
    pub id: ActorId,
    pub name: RwLock<Option<String>>,
    pub parent: ActorId,
    pub children: RwLock<HashSet<ActorId>>,
    pub sender: MailboxSender,
    pub op_map: RwLock<OperationMap>,
    pub caps: RwLock<CapabilitySet>,
    pub cleanup: RwLock<Vec<Message>>,
    pub counters: Counters,
    pub passive: bool,
    pub state: RwLock<ActorState>,
    pub(crate) cancel_tx: watch::Sender<bool>,
    /// Holds the receiving half for a passive actor (§4.1: "passive
    /// mailboxes are drained explicitly rather than by a dispatcher
    /// loop"). `None` once an active actor's dispatcher task has taken
    /// ownership of its receiver, and always `None` again once a passive
    /// actor's receiver has been handed out via `Kernel::dequeue`.
    pub(crate) receiver: Mutex<Option<MailboxReceiver>>,
}

impl ActorRecord {
    pub fn is_running(&self) -> bool {
        *self.state.read() == ActorState::Running
    }

    pub(crate) fn begin_terminating(&self) {
        *self.state.write() = ActorState::Terminating;
        let _ = self.cancel_tx.send(true);
    }

    pub(crate) fn mark_terminated(&self) {
        *self.state.write() = ActorState::Terminated;
    }
}
