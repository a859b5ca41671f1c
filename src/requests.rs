//! Short-lived bookkeeping handed to the transport layer: pending autorun
//! questions and per-requester serialization.
//!
//! Both stores are process-lifetime only. The transport owns them and
//! passes them into handlers by reference; the core never reaches into
//! process-wide state.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use uuid::Uuid;

use crate::resolver::link::EpisodeDescriptor;

/// Token length in hex characters; collisions are negligible over a
/// process lifetime.
const TOKEN_LEN: usize = 16;

/// Token-keyed store for "continue automatically?" questions.
///
/// A token is consumed at most once: the first `take` returns the stored
/// descriptor, any later `take` on the same token reports expiry as `None`.
#[derive(Debug, Default)]
pub struct PendingAutorun {
    entries: Mutex<HashMap<String, EpisodeDescriptor>>,
}

impl PendingAutorun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a descriptor and returns its freshly minted token.
    pub fn insert(&self, descriptor: EpisodeDescriptor) -> String {
        let token = Uuid::new_v4().simple().to_string()[..TOKEN_LEN].to_string();
        self.entries
            .lock()
            .expect("pending store lock poisoned")
            .insert(token.clone(), descriptor);
        token
    }

    /// Consumes the token. `None` means unknown or already consumed.
    pub fn take(&self, token: &str) -> Option<EpisodeDescriptor> {
        self.entries
            .lock()
            .expect("pending store lock poisoned")
            .remove(token)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("pending store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serializes processing per requester: while one request is in flight, a
/// second one from the same requester is rejected instead of interleaving
/// its output with the first.
#[derive(Debug, Default)]
pub struct RequesterGate {
    active: Mutex<HashSet<i64>>,
}

impl RequesterGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the requester's slot; `None` while a run is already in
    /// flight. The slot frees itself on drop, including on cancellation.
    pub fn try_acquire(&self, requester: i64) -> Option<RequesterSlot<'_>> {
        let mut active = self.active.lock().expect("requester gate lock poisoned");
        if !active.insert(requester) {
            return None;
        }
        Some(RequesterSlot {
            gate: self,
            requester,
        })
    }
}

/// RAII claim on a requester's processing slot.
#[derive(Debug)]
pub struct RequesterSlot<'a> {
    gate: &'a RequesterGate,
    requester: i64,
}

impl Drop for RequesterSlot<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.gate.active.lock() {
            active.remove(&self.requester);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> EpisodeDescriptor {
        EpisodeDescriptor::parse("https://example.site/مسلسل-اختبار-الحلقة-3.html").unwrap()
    }

    #[test]
    fn test_token_shape() {
        let pending = PendingAutorun::new();
        let token = pending.insert(descriptor());
        assert_eq!(token.len(), 16);
        assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));

        let other = pending.insert(descriptor());
        assert_ne!(token, other);
    }

    #[test]
    fn test_take_once_semantics() {
        let pending = PendingAutorun::new();
        let token = pending.insert(descriptor());
        assert_eq!(pending.len(), 1);

        assert_eq!(pending.take(&token), Some(descriptor()));
        // Second consumption reports expiry.
        assert_eq!(pending.take(&token), None);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_unknown_token_is_expired() {
        let pending = PendingAutorun::new();
        assert_eq!(pending.take("deadbeefdeadbeef"), None);
    }

    #[test]
    fn test_gate_serializes_per_requester() {
        let gate = RequesterGate::new();

        let slot = gate.try_acquire(7).expect("first acquire succeeds");
        assert!(gate.try_acquire(7).is_none(), "same requester is rejected");
        assert!(gate.try_acquire(8).is_some(), "other requesters unaffected");

        drop(slot);
        assert!(gate.try_acquire(7).is_some(), "slot frees on drop");
    }
}
