//! The policy engine (§4.3): `OperationMap` lookup by payload type
//! identity, capability check, and the parent-override fallback.

use std::any::TypeId;
use std::collections::HashMap;

use crate::capability::CapabilitySet;
use crate::id::ActorId;
use crate::rights::Rights;

/// For one target actor: a map from payload-type-identity to the rights a
/// sender must hold to deliver that payload type (§3, §4.3).
#[derive(Debug, Default, Clone)]
pub struct OperationMap {
    required: HashMap<TypeId, Rights>,
}

impl OperationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register that payload type `T` requires `rights` to send to this
    /// actor.
    pub fn require<T: 'static>(mut self, rights: Rights) -> Self {
        self.required.insert(TypeId::of::<T>(), rights);
        self
    }

    pub fn rights_for(&self, payload_type: TypeId) -> Option<Rights> {
        self.required.get(&payload_type).copied()
    }
}

/// The decision returned by [`check`] — deliberately a closed enum rather
/// than a boolean so dispatch on the result reads like the spec's own
/// "Hit: check caps / Miss: parent override" branching (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed,
    Denied,
}

/// Evaluate whether `from` may send a payload of `payload_type` to `to`
/// (§4.3):
///
/// 1. Look up `payload_type` in `to`'s `OperationMap`.
/// 2. **Hit**: `from` needs a non-revoked capability on `to` covering the
///    required rights.
/// 3. **Miss**: allowed iff `to`'s parent is `from` (parent override).
pub fn check(
    op_map: &OperationMap,
    sender_caps: &CapabilitySet,
    from: ActorId,
    to: ActorId,
    to_parent: ActorId,
    payload_type: TypeId,
) -> PolicyDecision {
    match op_map.rights_for(payload_type) {
        Some(required) => {
            if sender_caps.is_permitted(to, required) {
                PolicyDecision::Allowed
            } else {
                PolicyDecision::Denied
            }
        }
        None => {
            if to_parent == from {
                PolicyDecision::Allowed
            } else {
                PolicyDecision::Denied
            }
        }
    }
}
