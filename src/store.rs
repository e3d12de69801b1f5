use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::models::OtpRecord;

/// Result of [`OtpStore::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
    NotFound,
    /// Past its deadline; the record has been removed.
    Expired,
    /// Wrong or missing code; the record is untouched.
    Mismatch,
    /// Matched and removed. Only one caller can ever see this for a given record.
    Accepted,
}

#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Replace whatever is stored for `email` with a fresh record.
    async fn put(&self, email: &str, code: u32, ttl: Duration);
    /// Returns the record even when it is past its deadline; callers decide.
    async fn get(&self, email: &str) -> Option<OtpRecord>;
    async fn delete(&self, email: &str);
    /// Check `code` and remove the record in one step.
    async fn consume(&self, email: &str, code: Option<u32>) -> Consumed;
}

/// Process-local store (pod local, lost on restart).
#[derive(Clone, Default)]
pub struct InMemoryOtpStore {
    records: Arc<DashMap<String, OtpRecord>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, email: &str, code: u32, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.records.insert(email.to_string(), OtpRecord { code, expires_at });
    }

    async fn get(&self, email: &str) -> Option<OtpRecord> {
        self.records.get(email).map(|r| *r)
    }

    async fn delete(&self, email: &str) {
        self.records.remove(email);
    }

    async fn consume(&self, email: &str, code: Option<u32>) -> Consumed {
        // the entry guard holds the shard write lock until we return
        match self.records.entry(email.to_string()) {
            Entry::Vacant(_) => Consumed::NotFound,
            Entry::Occupied(entry) => {
                let record = *entry.get();
                if record.is_expired() {
                    entry.remove();
                    Consumed::Expired
                } else if code == Some(record.code) {
                    entry.remove();
                    Consumed::Accepted
                } else {
                    Consumed::Mismatch
                }
            }
        }
    }
}
