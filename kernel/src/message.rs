//! The `Message` envelope and the payload type-identity used by the policy
//! engine (§3, §9: "dynamic dispatch on payloads").
//!
//! Unlike the teacher's `MessageEnvelope<M>` (generic over one concrete
//! message type `M` per actor system), this kernel routes arbitrary payload
//! types between arbitrary actors, so the payload is type-erased behind
//! `Box<dyn Any + Send>` and policy keys off `TypeId` rather than the
//! teacher's compile-time `Message::MESSAGE_TYPE` constant.

use std::any::{Any, TypeId};
use std::fmt;

use tokio::sync::oneshot;

use crate::id::ActorId;

/// Anything that can ride as a message payload. Blanket-implemented for
/// every `Send + 'static` type; callers never implement this by hand.
pub trait Payload: Any + Send {}
impl<T: Any + Send> Payload for T {}

/// The single-use reply channel referenced by `Message::resp` (§3, §4.6).
/// Backed by `tokio::sync::oneshot`, which already enforces "fulfilled at
/// most once, consumed by the first read" at the type level — no extra
/// guard is needed to satisfy the "subsequent writes are dropped"
/// invariant.
pub type RespSender = oneshot::Sender<Message>;
pub type RespReceiver = oneshot::Receiver<Message>;

/// A message in flight between two actors.
pub struct Message {
    pub from: ActorId,
    pub to: ActorId,
    /// `0` (`ActorId::KERNEL`) means "no reply-to" (§3). Using the reserved
    /// kernel ID as the sentinel avoids adding an `Option` that every call
    /// site would have to thread through just to special-case "none".
    pub reply_to: ActorId,
    pub payload: Box<dyn Any + Send>,
    pub resp: Option<RespSender>,
}

impl Message {
    /// Build a fire-and-forget message with no reply-to and no response
    /// channel.
    pub fn new(from: ActorId, to: ActorId, payload: impl Payload) -> Self {
        Self {
            from,
            to,
            reply_to: ActorId::KERNEL,
            payload: Box::new(payload),
            resp: None,
        }
    }

    pub fn with_reply_to(mut self, reply_to: ActorId) -> Self {
        self.reply_to = reply_to;
        self
    }

    pub fn with_resp(mut self, resp: RespSender) -> Self {
        self.resp = Some(resp);
        self
    }

    /// The `TypeId` of the concrete payload type, used by the policy
    /// engine to look up required rights (§4.3). Never inspects payload
    /// *contents*.
    pub fn payload_type_id(&self) -> TypeId {
        (*self.payload).type_id()
    }

    /// Attempt to downcast the payload to a concrete type, consuming the
    /// message on success. On failure the original message is returned
    /// unchanged so the caller can try another type or forward it as-is.
    pub fn downcast<T: Any>(self) -> Result<T, Message> {
        match self.payload.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(payload) => Err(Message {
                from: self.from,
                to: self.to,
                reply_to: self.reply_to,
                payload,
                resp: self.resp,
            }),
        }
    }

    /// Borrow the payload as a concrete type, if it matches.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Fulfil this message's reply channel, if any, with a freshly built
    /// reply `Message` addressed back to the original sender. Bypasses
    /// policy entirely (§4.3: "Reply ... bypasses policy because the
    /// channel is already a one-shot capability"). A second call is a
    /// no-op because `resp` was already taken by the first.
    pub fn reply(&mut self, from: ActorId, payload: impl Payload) {
        if let Some(resp) = self.resp.take() {
            let reply = Message::new(from, self.from, payload);
            // The receiver may already be gone (caller abandoned the
            // future after a timeout, §4.6); a late reply is silently
            // discarded, exactly as specified.
            let _ = resp.send(reply);
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("reply_to", &self.reply_to)
            .field("has_resp", &self.resp.is_some())
            .finish_non_exhaustive()
    }
}
