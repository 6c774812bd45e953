//! The kernel: the single shared table of actors, names, and id
//! generators, plus the public API every actor and external collaborator
//! goes through (§4).
//!
//! Mirrors the shape of the teacher's `ActorSystem`/`ActorSystemInner`
//! split (`system/core.rs`): a thin `Kernel` handle wrapping an `Arc` to
//! the shared state, cheap to clone and hand to every spawned actor's
//! context.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::actor::{ActorContext, ActorRecord, ActorState, Counters, Handler, HandlerFactory};
use crate::capability::{Capability, CapabilityIdGenerator, Scope};
use crate::config::KernelConfig;
use crate::error::KernelError;
use crate::future::Future;
use crate::id::{ActorId, IdGenerator};
use crate::mailbox::{self, MailboxReceiver};
use crate::message::{Message, Payload};
use crate::policy::{self, OperationMap, PolicyDecision};
use crate::registry::Registry;
use crate::rights::Rights;

struct KernelInner {
    actors: RwLock<HashMap<ActorId, Arc<ActorRecord>>>,
    names: Registry,
    ids: IdGenerator,
    cap_ids: CapabilityIdGenerator,
    config: KernelConfig,
}

/// A cheap, cloneable handle to the kernel. Every `ActorContext` carries
/// one so a running handler can spawn children, send messages, and grant
/// capabilities without threading a separate reference through every call
/// site.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Kernel {
    /// Build a fresh kernel and bootstrap the reserved kernel actor
    /// (`ActorId::KERNEL`, §3: "actor 0, the kernel itself, is always
    /// present and is the ultimate parent-override root").
    pub fn new(config: KernelConfig) -> Self {
        let kernel = Self {
            inner: Arc::new(KernelInner {
                actors: RwLock::new(HashMap::new()),
                names: Registry::new(),
                ids: IdGenerator::new(),
                cap_ids: CapabilityIdGenerator::default(),
                config,
            }),
        };

        let (sender, receiver) = mailbox::bounded(
            ActorId::KERNEL,
            kernel.inner.config.default_mailbox_capacity,
        );
        let (cancel_tx, _cancel_rx) = watch::channel(false);
        let bootstrap = Arc::new(ActorRecord {
            id: ActorId::KERNEL,
            name: RwLock::new(Some("kernel".to_string())),
            parent: ActorId::KERNEL,
            children: RwLock::new(Default::default()),
            sender,
            op_map: RwLock::new(OperationMap::new()),
            caps: RwLock::new(crate::capability::CapabilitySet::new()),
            cleanup: RwLock::new(Vec::new()),
            counters: Counters::default(),
            passive: true,
            state: RwLock::new(ActorState::Running),
            cancel_tx,
            receiver: parking_lot::Mutex::new(Some(receiver)),
        });
        kernel.inner.actors.write().insert(ActorId::KERNEL, bootstrap);
        kernel.inner.names.register("kernel", ActorId::KERNEL);

        info!("kernel bootstrapped");
        kernel
    }

    fn record(&self, id: ActorId) -> Result<Arc<ActorRecord>, KernelError> {
        self.inner
            .actors
            .read()
            .get(&id)
            .cloned()
            .ok_or(KernelError::NoSuchActor(id))
    }

    // ---------------------------------------------------------------
    // Spawn
    // ---------------------------------------------------------------

    /// Spawn an active child actor: its own dispatcher task drains its
    /// mailbox in a loop (§4.2). Capabilities are inherited by full
    /// duplication from the parent's current set at spawn time (§9 open
    /// question 2: least-authority is a concern left to a production
    /// fork, not enforced here).
    pub fn spawn(
        &self,
        parent: ActorId,
        name: Option<String>,
        op_map: OperationMap,
        factory: Arc<dyn HandlerFactory>,
    ) -> Result<ActorId, KernelError> {
        self.spawn_inner(parent, name, op_map, Some(factory), false)
    }

    /// Spawn a passive actor: no dispatcher task. Messages accumulate in
    /// its mailbox until some other actor calls [`Kernel::dequeue`] on its
    /// behalf (§4.1, used by synchronous collaborators like a REPL driving
    /// its own read loop).
    pub fn spawn_passive(
        &self,
        parent: ActorId,
        name: Option<String>,
        op_map: OperationMap,
    ) -> Result<ActorId, KernelError> {
        self.spawn_inner(parent, name, op_map, None, true)
    }

    fn spawn_inner(
        &self,
        parent: ActorId,
        name: Option<String>,
        op_map: OperationMap,
        factory: Option<Arc<dyn HandlerFactory>>,
        passive: bool,
    ) -> Result<ActorId, KernelError> {
        let parent_record = self.record(parent)?;
        let id = self.inner.ids.next_id();

        let (sender, receiver) =
            mailbox::bounded(id, self.inner.config.default_mailbox_capacity);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        // Seed capabilities (§4.4): the child gets rwx on itself and on its
        // parent, the parent gets rwx on the child, and every capability the
        // parent currently holds is duplicated into the child — except caps
        // targeting one of the parent's *other* existing children, which are
        // exactly the per-spawn cross-grants below and would otherwise leak
        // sibling access transitively into every later-spawned actor.
        let existing_siblings = parent_record.children.read().clone();
        let mut caps = crate::capability::CapabilitySet::new();
        caps.insert(Capability::new(self.inner.cap_ids.next(), id, Rights::RWX, None));
        caps.insert(Capability::new(self.inner.cap_ids.next(), parent, Rights::RWX, None));
        for parent_cap in parent_record.caps.read().iter() {
            if !parent_cap.is_revoked() && !existing_siblings.contains(&parent_cap.target) {
                caps.insert(Capability::new(
                    self.inner.cap_ids.next(),
                    parent_cap.target,
                    parent_cap.rights,
                    parent_cap.scope.clone(),
                ));
            }
        }

        let record = Arc::new(ActorRecord {
            id,
            name: RwLock::new(name.clone()),
            parent,
            children: RwLock::new(Default::default()),
            sender,
            op_map: RwLock::new(op_map),
            caps: RwLock::new(caps),
            cleanup: RwLock::new(Vec::new()),
            counters: Counters::default(),
            passive,
            state: RwLock::new(ActorState::Running),
            cancel_tx,
            receiver: parking_lot::Mutex::new(Some(receiver)),
        });

        self.inner.actors.write().insert(id, record.clone());
        parent_record.children.write().insert(id);
        parent_record.caps.write().insert(Capability::new(
            self.inner.cap_ids.next(),
            id,
            Rights::RWX,
            None,
        ));
        if let Some(name) = name {
            self.inner.names.register(name, id);
        }

        debug!(actor_id = %id, %parent, passive, "actor spawned");

        if let Some(factory) = factory {
            if let Some(receiver) = record.receiver.lock().take() {
                self.spawn_dispatcher(record, receiver, factory, cancel_rx);
            }
        }

        Ok(id)
    }

    fn spawn_dispatcher(
        &self,
        record: Arc<ActorRecord>,
        mut receiver: MailboxReceiver,
        factory: Arc<dyn HandlerFactory>,
        mut cancel_rx: watch::Receiver<bool>,
    ) {
        let kernel = self.clone();
        let id = record.id;
        tokio::spawn(async move {
            let mut handler: Box<dyn Handler> = factory();
            loop {
                if *cancel_rx.borrow() {
                    break;
                }
                let msg = tokio::select! {
                    _ = cancel_rx.changed() => continue,
                    msg = receiver.dequeue() => msg,
                };
                let Some(msg) = msg else {
                    break;
                };
                record.counters.ipc_in.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

                let mut ctx = ActorContext::new(id, kernel.clone(), cancel_rx.clone());
                let signal = match std::panic::AssertUnwindSafe(handler.handle(msg, &mut ctx))
                    .catch_unwind()
                    .await
                {
                    Ok(signal) => signal,
                    Err(_) => {
                        warn!(actor_id = %id, "actor handler panicked");
                        crate::actor::ControlSignal::Error("handler panicked".to_string())
                    }
                };

                match signal {
                    crate::actor::ControlSignal::Continue => {}
                    crate::actor::ControlSignal::Terminate { reason } => {
                        info!(actor_id = %id, reason, "actor terminating");
                        kernel.terminate(id).await;
                        break;
                    }
                    crate::actor::ControlSignal::Restart { reason } => {
                        warn!(actor_id = %id, reason, "actor restarting");
                        kernel.reset_for_restart(id);
                        handler = factory();
                    }
                    crate::actor::ControlSignal::Error(reason) => {
                        warn!(actor_id = %id, reason, "actor handler reported an error");
                    }
                }
            }
            receiver.close();
        });
    }

    /// Reset an actor's capability set and cleanup queue as part of
    /// `Restart` (§4.2, §9: "restart re-seeds capabilities like a fresh
    /// spawn, zero carried caps"). Name, parent, and op-map survive.
    fn reset_for_restart(&self, id: ActorId) {
        if let Ok(record) = self.record(id) {
            record.caps.write().revoke_all();
            *record.caps.write() = crate::capability::CapabilitySet::new();
            record.cleanup.write().clear();
        }
    }

    // ---------------------------------------------------------------
    // Send / policy
    // ---------------------------------------------------------------

    /// Deliver `payload` from `from` to `to`, subject to the policy check
    /// (§4.3): hit the target's `OperationMap` and check capabilities, or
    /// fall through to parent override.
    pub async fn send(
        &self,
        from: ActorId,
        to: ActorId,
        payload: impl Payload,
    ) -> Result<(), KernelError> {
        self.send_inner(Message::new(from, to, payload)).await
    }

    /// Like [`Kernel::send`], but names a `reply_to` the recipient may
    /// route a reply to (§4.5 "ReplyTo implicit write-capability
    /// delegation"). The delegation grant itself happens uniformly for
    /// every send in [`Kernel::send_inner`], so this is a thin wrapper and
    /// `forward` benefits from the same logic by construction.
    pub async fn send_with_reply_to(
        &self,
        from: ActorId,
        to: ActorId,
        reply_to: ActorId,
        payload: impl Payload,
    ) -> Result<(), KernelError> {
        self.send_inner(Message::new(from, to, payload).with_reply_to(reply_to))
            .await
    }

    async fn send_inner(&self, msg: Message) -> Result<(), KernelError> {
        let to_record = self.record(msg.to)?;
        self.check_policy(&to_record, msg.from, msg.payload_type_id())?;
        self.delegate_reply_to(&msg, &to_record);
        let to = msg.to;
        let result = to_record
            .sender
            .enqueue(msg, self.inner.config.enqueue_timeout)
            .await;
        if let Err(KernelError::Busy(_)) = &result {
            warn!(%to, "mailbox full, enqueue timed out");
        }
        result
    }

    /// Grant the recipient a narrow, one-shot `Write` capability on
    /// `msg.reply_to` (§4.5): only when `reply_to` names a passive actor
    /// whose parent is `msg.from` — otherwise any sender could hand a
    /// recipient authority over an arbitrary third actor just by naming it
    /// as `reply_to`. Applies uniformly to direct sends and to forwards
    /// that preserve their original `from`/`reply_to`, since both funnel
    /// through here.
    fn delegate_reply_to(&self, msg: &Message, to_record: &ActorRecord) {
        if msg.reply_to == ActorId::KERNEL {
            return;
        }
        let Ok(reply_record) = self.record(msg.reply_to) else {
            return;
        };
        if !reply_record.passive || reply_record.parent != msg.from {
            return;
        }
        let mut caps = to_record.caps.write();
        if !caps.has_exact(msg.reply_to, Rights::WRITE) {
            caps.insert(Capability::new(
                self.inner.cap_ids.next(),
                msg.reply_to,
                Rights::WRITE,
                None,
            ));
        }
    }

    fn check_policy(
        &self,
        to_record: &ActorRecord,
        from: ActorId,
        payload_type: std::any::TypeId,
    ) -> Result<(), KernelError> {
        let from_record = self.record(from)?;
        let decision = policy::check(
            &to_record.op_map.read(),
            &from_record.caps.read(),
            from,
            to_record.id,
            to_record.parent,
            payload_type,
        );
        match decision {
            PolicyDecision::Allowed => {
                from_record
                    .counters
                    .ipc_out
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Ok(())
            }
            PolicyDecision::Denied => {
                warn!(from = %from, to = %to_record.id, "policy denied delivery");
                Err(KernelError::PolicyDenied {
                    from,
                    to: to_record.id,
                })
            }
        }
    }

    /// Re-address an already-built message to a new target and re-check
    /// policy using its original `from` (§4.3 forwarding keeps the
    /// original sender's identity for the policy check).
    pub async fn forward(&self, mut msg: Message, to: ActorId) -> Result<(), KernelError> {
        msg.to = to;
        self.send_inner(msg).await
    }

    /// Send and block for a reply up to `timeout_dur` (§4.6 `SendSync`).
    pub async fn send_sync(
        &self,
        from: ActorId,
        to: ActorId,
        payload: impl Payload,
        timeout_dur: Duration,
    ) -> Result<Message, KernelError> {
        let (tx, rx) = oneshot::channel();
        let msg = Message::new(from, to, payload).with_resp(tx);
        self.send_inner(msg).await?;
        Future::new(rx).recv_timeout(timeout_dur).await
    }

    /// Send and return a handle to the eventual reply (§4.6 `SendFuture`).
    pub async fn send_future(
        &self,
        from: ActorId,
        to: ActorId,
        payload: impl Payload,
    ) -> Result<Future, KernelError> {
        let (tx, rx) = oneshot::channel();
        let msg = Message::new(from, to, payload).with_resp(tx);
        self.send_inner(msg).await?;
        Ok(Future::new(rx))
    }

    /// Explicitly dequeue one message on behalf of a passive actor (§4.4
    /// `ReceiveFromPassive`). Only the passive actor's parent may drive its
    /// mailbox this way. Blocks at most `timeout_dur`; returns `Ok(None)`
    /// both when the wait times out and when the mailbox is closed and
    /// drained, matching `ok=false` either way at the call site.
    pub async fn dequeue(
        &self,
        caller: ActorId,
        id: ActorId,
        timeout_dur: Duration,
    ) -> Result<Option<Message>, KernelError> {
        let record = self.record(id)?;
        if !record.passive || record.parent != caller {
            return Err(KernelError::InvalidPassive(id));
        }
        let mut guard = record.receiver.lock();
        let receiver = guard.as_mut().ok_or(KernelError::InvalidPassive(id))?;
        match tokio::time::timeout(timeout_dur, receiver.dequeue()).await {
            Ok(msg) => Ok(msg),
            Err(_elapsed) => Ok(None),
        }
    }

    // ---------------------------------------------------------------
    // Capabilities
    // ---------------------------------------------------------------

    /// Grant `holder` a capability on `target`. Authority is
    /// non-amplifying (§6): `granter` must already hold a non-revoked
    /// capability on `target` covering at least `rights`, or be `target`
    /// itself (an actor may always grant away rights over itself, e.g. the
    /// kernel bootstrap or a fresh spawn's self-seed).
    pub fn grant_cap(
        &self,
        granter: ActorId,
        holder: ActorId,
        target: ActorId,
        rights: Rights,
        scope: Option<Scope>,
    ) -> Result<(), KernelError> {
        self.record(target)?;
        let holder_record = self.record(holder)?;
        if granter != target {
            let granter_record = self.record(granter)?;
            if !granter_record.caps.read().is_permitted(target, rights) {
                return Err(KernelError::PolicyDenied {
                    from: granter,
                    to: target,
                });
            }
        }
        holder_record.caps.write().insert(Capability::new(
            self.inner.cap_ids.next(),
            target,
            rights,
            scope,
        ));
        debug!(%holder, %target, ?rights, "capability granted");
        Ok(())
    }

    /// Revoke every capability `holder` has on `target`.
    pub fn revoke_cap(&self, holder: ActorId, target: ActorId) -> Result<(), KernelError> {
        let holder_record = self.record(holder)?;
        let mut caps = holder_record.caps.write();
        let remaining: Vec<Capability> = caps
            .iter()
            .map(|c| {
                let mut c = c.clone();
                if c.target == target {
                    c.revoke();
                }
                c
            })
            .collect();
        *caps = remaining.into_iter().fold(
            crate::capability::CapabilitySet::new(),
            |mut set, cap| {
                set.insert(cap);
                set
            },
        );
        debug!(%holder, %target, "capability revoked");
        Ok(())
    }

    /// Queue a best-effort cleanup message to be delivered when `owner`
    /// terminates. Cleanup messages run in LIFO order relative to
    /// registration, like a stack of deferred actions (§4.4).
    pub fn register_cleanup(&self, owner: ActorId, msg: Message) -> Result<(), KernelError> {
        let record = self.record(owner)?;
        record.cleanup.write().push(msg);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Registry / introspection
    // ---------------------------------------------------------------

    pub fn register(&self, name: impl Into<String>, id: ActorId) {
        self.inner.names.register(name, id);
    }

    pub fn unregister(&self, name: &str) {
        self.inner.names.unregister(name);
    }

    pub fn lookup(&self, name: &str) -> Option<ActorId> {
        self.inner.names.lookup(name)
    }

    pub fn registered(&self) -> Vec<(String, ActorId)> {
        self.inner.names.registered()
    }

    /// The name `id` is currently registered under, if any.
    pub fn name_of(&self, id: ActorId) -> Option<String> {
        self.record(id).ok()?.name.read().clone()
    }

    pub fn mailbox_len(&self, id: ActorId) -> Result<usize, KernelError> {
        Ok(self.record(id)?.sender.len())
    }

    pub fn mailbox_capacity(&self, id: ActorId) -> Result<usize, KernelError> {
        Ok(self.record(id)?.sender.max_capacity())
    }

    pub fn is_running(&self, id: ActorId) -> bool {
        self.record(id).map(|r| r.is_running()).unwrap_or(false)
    }

    pub fn counters(&self, id: ActorId) -> Result<(u64, u64, u64), KernelError> {
        Ok(self.record(id)?.counters.snapshot())
    }

    /// Every actor id currently tracked by the kernel. Iteration order is
    /// unspecified.
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.inner.actors.read().keys().copied().collect()
    }

    // ---------------------------------------------------------------
    // Broadcast
    // ---------------------------------------------------------------

    /// Send the same payload to every actor but the kernel and the sender
    /// (§4.7), not just the ones with a registered name. Best-effort: a
    /// `Busy`/`Closed`/policy-denied delivery to one recipient does not
    /// stop delivery to the others. Iteration order over recipients is
    /// unspecified (§9 open question 4).
    pub async fn broadcast(&self, from: ActorId, payload: impl Payload + Clone) {
        for id in self.actor_ids() {
            if id == from || id == ActorId::KERNEL {
                continue;
            }
            if let Err(err) = self.send(from, id, payload.clone()).await {
                debug!(%id, error = %err, "broadcast delivery skipped");
            }
        }
    }

    // ---------------------------------------------------------------
    // Termination
    // ---------------------------------------------------------------

    /// Terminate `id` and cascade to its entire subtree (§4.4). Children
    /// finish their own cleanup before their parent is removed from the
    /// table.
    pub async fn terminate(&self, id: ActorId) {
        let order = self.subtree_post_order(id);
        if order.len() > 1 {
            info!(actor_id = %id, subtree_size = order.len(), "cascade termination started");
        }
        for actor_id in order {
            self.finalize_actor(actor_id).await;
        }
    }

    fn subtree_post_order(&self, root: ActorId) -> Vec<ActorId> {
        let mut result = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                result.push(id);
                continue;
            }
            stack.push((id, true));
            if let Ok(record) = self.record(id) {
                for child in record.children.read().iter() {
                    stack.push((*child, false));
                }
            }
        }
        result
    }

    async fn finalize_actor(&self, id: ActorId) {
        let Ok(record) = self.record(id) else {
            return;
        };
        record.begin_terminating();

        let cleanup_msgs: Vec<Message> = std::mem::take(&mut *record.cleanup.write());
        for msg in cleanup_msgs.into_iter().rev() {
            if let Ok(target) = self.record(msg.to) {
                let _ = target
                    .sender
                    .enqueue(msg, self.inner.config.enqueue_timeout)
                    .await;
            }
        }

        record.caps.write().revoke_all();
        self.inner.names.unregister_actor(id);
        if let Ok(parent_record) = self.record(record.parent) {
            parent_record.children.write().remove(&id);
        }
        record.mark_terminated();
        self.inner.actors.write().remove(&id);
        info!(actor_id = %id, "actor terminated");
    }

    /// Gracefully terminate every actor but the kernel itself, waiting up
    /// to `shutdown_grace` (§6.2 `KernelConfig`) — used by the
    /// control-plane binary on shutdown.
    pub async fn request_shutdown(&self) {
        let grace = self.inner.config.shutdown_grace;
        let roots: Vec<ActorId> = {
            let actors = self.inner.actors.read();
            actors
                .values()
                .filter(|r| r.parent == ActorId::KERNEL && r.id != ActorId::KERNEL)
                .map(|r| r.id)
                .collect()
        };
        let shutdown = async {
            for root in roots {
                self.terminate(root).await;
            }
        };
        if tokio::time::timeout(grace, shutdown).await.is_err() {
            warn!("shutdown grace period elapsed before all actors terminated");
        }
    }
}
