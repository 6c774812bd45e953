//! Name registry (§4.7): a flat namespace mapping human-readable names to
//! `ActorId`s, so actors can be addressed without passing `ActorId` values
//! out of band.
//!
//! Backed by `DashMap` rather than a `RwLock<HashMap<_>>`, the same choice
//! the teacher makes for its broker registry (`broker/registry.rs`) because
//! registration/lookup is on the hot path of every named `Send`.

use dashmap::DashMap;

use crate::id::ActorId;

/// A collision on `register` silently overwrites the previous owner (§4.7:
/// "last writer wins, no error").
#[derive(Debug, Default)]
pub struct Registry {
    names: DashMap<String, ActorId>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            names: DashMap::new(),
        }
    }

    pub fn register(&self, name: impl Into<String>, id: ActorId) {
        self.names.insert(name.into(), id);
    }

    /// Remove a name mapping. No-op if the name was never registered or
    /// was already removed.
    pub fn unregister(&self, name: &str) {
        self.names.remove(name);
    }

    pub fn lookup(&self, name: &str) -> Option<ActorId> {
        self.names.get(name).map(|entry| *entry.value())
    }

    /// Snapshot of every currently registered `(name, id)` pair. Iteration
    /// order is unspecified (§9 open question on ordering).
    pub fn registered(&self) -> Vec<(String, ActorId)> {
        self.names
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Remove every name currently mapped to `id`, used during cascade
    /// termination so a dead actor's names don't linger (§4.4).
    pub fn unregister_actor(&self, id: ActorId) {
        self.names.retain(|_, v| *v != id);
    }
}
