//! Per-session gating state

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::policy::Policy;

/// Mutable state for one session: its id, action counter and policy
///
/// The counter only ever grows, and only through [`try_record_action`],
/// which checks the budget and increments in one atomic step.
///
/// [`try_record_action`]: SessionContext::try_record_action
#[derive(Debug)]
pub struct SessionContext {
    session_id: String,
    action_count: AtomicU64,
    policy: Arc<Policy>,
}

impl SessionContext {
    /// Create a session with a fresh counter
    pub fn new(session_id: impl Into<String>, policy: impl Into<Arc<Policy>>) -> Self {
        Self {
            session_id: session_id.into(),
            action_count: AtomicU64::new(0),
            policy: policy.into(),
        }
    }

    /// Create a session that has already used `action_count` actions
    pub fn with_action_count(mut self, action_count: u64) -> Self {
        self.action_count = AtomicU64::new(action_count);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current number of executed actions
    pub fn action_count(&self) -> u64 {
        self.action_count.load(Ordering::SeqCst)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Actions left before the rate limit is hit
    pub fn remaining_actions(&self) -> u64 {
        self.policy
            .max_actions_per_session
            .saturating_sub(self.action_count())
    }

    /// Atomically check the budget and count one action
    ///
    /// Returns the new count, or `None` if the budget is already spent.
    pub(crate) fn try_record_action(&self) -> Option<u64> {
        let max = self.policy.max_actions_per_session;
        self.action_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                (count < max).then_some(count + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_action_respects_budget() {
        let session = SessionContext::new("s1", Policy::new().with_max_actions(2));

        assert_eq!(session.try_record_action(), Some(1));
        assert_eq!(session.try_record_action(), Some(2));
        assert_eq!(session.try_record_action(), None);
        assert_eq!(session.action_count(), 2);
        assert_eq!(session.remaining_actions(), 0);
    }

    #[test]
    fn test_with_action_count() {
        let session =
            SessionContext::new("s1", Policy::new().with_max_actions(5)).with_action_count(4);
        assert_eq!(session.remaining_actions(), 1);
        assert_eq!(session.try_record_action(), Some(5));
        assert_eq!(session.try_record_action(), None);
    }

    #[test]
    fn test_concurrent_records_never_exceed_budget() {
        let session = Arc::new(SessionContext::new("s1", Policy::new().with_max_actions(10)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    (0..10).filter(|_| session.try_record_action().is_some()).count()
                })
            })
            .collect();

        let recorded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(recorded, 10);
        assert_eq!(session.action_count(), 10);
    }
}
