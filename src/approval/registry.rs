//! Registry of approval requests awaiting a decision

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::ApprovalRequest;
use crate::core::{GateError, GateResult};

#[derive(Debug, Default)]
struct Entries {
    /// Insertion sequence number, used to keep `list()` in insertion order
    next_seq: u64,
    requests: HashMap<String, (u64, ApprovalRequest)>,
}

/// Tracks in-flight approval requests keyed by request id
///
/// Safe to share between concurrently running gating operations.
#[derive(Debug, Default)]
pub struct PendingRequestRegistry {
    entries: Mutex<Entries>,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a pending request
    ///
    /// Fails with [`GateError::DuplicateRequestId`] rather than overwriting an
    /// existing entry.
    pub fn insert(&self, request: ApprovalRequest) -> GateResult<()> {
        let mut entries = self.entries();
        if entries.requests.contains_key(&request.request_id) {
            return Err(GateError::DuplicateRequestId(request.request_id));
        }
        let seq = entries.next_seq;
        entries.next_seq += 1;
        tracing::debug!(request_id = %request.request_id, "Pending approval registered");
        entries
            .requests
            .insert(request.request_id.clone(), (seq, request));
        Ok(())
    }

    /// Remove a request; no-op if it is not present
    pub fn remove(&self, request_id: &str) -> Option<ApprovalRequest> {
        let removed = self.entries().requests.remove(request_id).map(|(_, r)| r);
        if removed.is_some() {
            tracing::debug!(request_id, "Pending approval removed");
        }
        removed
    }

    pub fn get(&self, request_id: &str) -> Option<ApprovalRequest> {
        self.entries()
            .requests
            .get(request_id)
            .map(|(_, r)| r.clone())
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.entries().requests.contains_key(request_id)
    }

    /// Snapshot of all pending requests in insertion order
    pub fn list(&self) -> Vec<ApprovalRequest> {
        let entries = self.entries();
        let mut pending: Vec<_> = entries.requests.values().collect();
        pending.sort_by_key(|(seq, _)| *seq);
        pending.into_iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes a request from the registry when dropped
///
/// Held by the coordinator for the whole approval wait so that every exit
/// path, including the caller dropping the future, deregisters the request.
pub(crate) struct PendingGuard<'a> {
    registry: &'a PendingRequestRegistry,
    request_id: String,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn register(
        registry: &'a PendingRequestRegistry,
        request: ApprovalRequest,
    ) -> GateResult<Self> {
        let request_id = request.request_id.clone();
        registry.insert(request)?;
        Ok(Self {
            registry,
            request_id,
        })
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(id: &str) -> ApprovalRequest {
        ApprovalRequest::new(id, "write_file", json!({}), "agent", "session", "")
    }

    #[test]
    fn test_insert_and_remove() {
        let registry = PendingRequestRegistry::new();
        registry.insert(request("a")).unwrap();
        assert!(registry.contains("a"));
        assert_eq!(registry.get("a").map(|r| r.request_id), Some("a".to_string()));

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let registry = PendingRequestRegistry::new();
        registry.insert(request("a")).unwrap();

        let err = registry.insert(request("a")).unwrap_err();
        assert!(matches!(err, GateError::DuplicateRequestId(ref id) if id == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let registry = PendingRequestRegistry::new();
        for id in ["c", "a", "b"] {
            registry.insert(request(id)).unwrap();
        }
        registry.remove("a");
        registry.insert(request("d")).unwrap();

        let ids: Vec<_> = registry.list().into_iter().map(|r| r.request_id).collect();
        assert_eq!(ids, vec!["c", "b", "d"]);
    }

    #[test]
    fn test_guard_removes_on_drop() {
        let registry = PendingRequestRegistry::new();
        {
            let _guard = PendingGuard::register(&registry, request("a")).unwrap();
            assert!(registry.contains("a"));
        }
        assert!(!registry.contains("a"));
    }

    #[test]
    fn test_guard_fails_on_duplicate() {
        let registry = PendingRequestRegistry::new();
        registry.insert(request("a")).unwrap();
        assert!(PendingGuard::register(&registry, request("a")).is_err());
        // The failed registration must not remove the existing entry
        assert!(registry.contains("a"));
    }
}
