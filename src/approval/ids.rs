//! Approval request id generation

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of unique approval request ids
pub trait RequestIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Default generator: `req-{unix_millis}-{random hex}`
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampIdGenerator;

impl RequestIdGenerator for TimestampIdGenerator {
    fn next_id(&self) -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!("req-{}-{}", Utc::now().timestamp_millis(), &random[..12])
    }
}

/// Deterministic generator: `{prefix}-{n}` with a monotonically increasing `n`
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl RequestIdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}
