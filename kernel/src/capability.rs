//! Capabilities: unforgeable, revocable tokens authorizing rights on a
//! target actor (§3).

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::id::ActorId;
use crate::rights::Rights;

/// Opaque identifier for a single capability grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId(u64);

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub(crate) struct CapabilityIdGenerator(AtomicU64);

impl CapabilityIdGenerator {
    pub(crate) fn next(&self) -> CapabilityId {
        CapabilityId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// An opaque, attribute-narrowing value attached to a capability. The
/// policy engine never interprets this (§9 open question: "reserved for
/// attribute-based narrowing"); it is carried verbatim for a future policy
/// revision or for an external collaborator to inspect out of band.
pub type Scope = HashMap<String, String>;

/// A capability: `{id, target, rights, scope, revoked}` (§3). Capabilities
/// are owned by the holder actor; the kernel is the only party that can
/// flip `revoked`.
#[derive(Debug, Clone)]
pub struct Capability {
    pub id: CapabilityId,
    pub target: ActorId,
    pub rights: Rights,
    pub scope: Option<Scope>,
    revoked: bool,
}

impl Capability {
    pub(crate) fn new(id: CapabilityId, target: ActorId, rights: Rights, scope: Option<Scope>) -> Self {
        Self {
            id,
            target,
            rights,
            scope,
            revoked: false,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// One-way revocation flag (§3: "Revocation is a one-way flag").
    pub(crate) fn revoke(&mut self) {
        self.revoked = true;
    }
}

/// A holder's full set of capabilities. Multiple capabilities to the same
/// target may coexist; a rights check takes their union (§3).
#[derive(Debug, Default)]
pub struct CapabilitySet {
    caps: Vec<Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self { caps: Vec::new() }
    }

    pub(crate) fn insert(&mut self, cap: Capability) {
        self.caps.push(cap);
    }

    /// The union of non-revoked rights this holder has on `target`.
    pub fn rights_on(&self, target: ActorId) -> Rights {
        self.caps
            .iter()
            .filter(|c| !c.is_revoked() && c.target == target)
            .fold(Rights::NONE, |acc, c| acc | c.rights)
    }

    /// True iff this holder has a non-revoked capability on `target`
    /// covering at least `required`.
    pub fn is_permitted(&self, target: ActorId, required: Rights) -> bool {
        self.rights_on(target).contains(required)
    }

    /// Whether a non-revoked, write-only, deduped capability on `target`
    /// already exists — used to keep ReplyTo delegation idempotent (§4.5).
    pub fn has_exact(&self, target: ActorId, rights: Rights) -> bool {
        self.caps
            .iter()
            .any(|c| !c.is_revoked() && c.target == target && c.rights == rights)
    }

    pub(crate) fn revoke_all(&mut self) {
        for cap in &mut self.caps {
            cap.revoke();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.caps.iter()
    }
}
