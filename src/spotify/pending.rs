use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error as ThisError;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum PendingInsertError {
    #[error("state is already pending")]
    InUse,

    #[error("too many pending authorizations")]
    Full,
}

/// What the authorize request asked for, recalled when the matching callback arrives.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub redirect_to: Option<Url>,
    pub user_id: Option<String>,
    created_at: Instant,
}

impl PendingAuthorization {
    pub fn new(redirect_to: Option<Url>, user_id: Option<String>) -> Self {
        Self {
            redirect_to,
            user_id,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Outstanding `state` values issued by the authorize endpoint.
///
/// Each state is single use: [`PendingAuthorizations::take`] removes it whether or not
/// it is still fresh. At most `capacity` states are held at once.
pub struct PendingAuthorizations {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, PendingAuthorization>>,
}

impl PendingAuthorizations {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a state. A live entry with the same value is never replaced; an expired
    /// one is. Expired entries are pruned only once the store is full.
    pub fn insert(
        &self,
        state: String,
        pending: PendingAuthorization,
    ) -> Result<(), PendingInsertError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity && !entries.contains_key(&state) {
            entries.retain(|_, p| !p.is_expired(self.ttl));
            if entries.len() >= self.capacity {
                return Err(PendingInsertError::Full);
            }
        }
        match entries.entry(state) {
            Entry::Occupied(mut slot) => {
                if !slot.get().is_expired(self.ttl) {
                    return Err(PendingInsertError::InUse);
                }
                slot.insert(pending);
            }
            Entry::Vacant(slot) => {
                slot.insert(pending);
            }
        }
        Ok(())
    }

    /// Consume a state. Returns `None` for unknown, already used or expired states.
    pub fn take(&self, state: &str) -> Option<PendingAuthorization> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .remove(state)
            .filter(|pending| !pending.is_expired(self.ttl))
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(user_id: &str) -> PendingAuthorization {
        PendingAuthorization::new(None, Some(user_id.to_string()))
    }

    #[test]
    fn state_is_consumed_once() {
        let store = PendingAuthorizations::new(Duration::from_secs(60), 16);
        store
            .insert("abc123".to_string(), pending("user-1"))
            .unwrap();

        let pending = store.take("abc123").unwrap();
        assert_eq!(pending.user_id.as_deref(), Some("user-1"));
        assert!(store.take("abc123").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_state_is_rejected() {
        let store = PendingAuthorizations::new(Duration::from_secs(60), 16);
        store
            .insert("abc123".to_string(), PendingAuthorization::new(None, None))
            .unwrap();
        assert!(store.take("abc124").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expired_state_is_rejected_and_replaceable() {
        let store = PendingAuthorizations::new(Duration::ZERO, 16);
        store.insert("old".to_string(), pending("user-1")).unwrap();
        assert!(store.take("old").is_none());

        store.insert("a".to_string(), pending("user-1")).unwrap();
        store.insert("a".to_string(), pending("user-2")).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn live_state_is_not_taken_over() {
        let store = PendingAuthorizations::new(Duration::from_secs(60), 16);
        store.insert("shared".to_string(), pending("first")).unwrap();

        let err = store
            .insert("shared".to_string(), pending("second"))
            .unwrap_err();
        assert_eq!(err, PendingInsertError::InUse);
        assert_eq!(
            store.take("shared").unwrap().user_id.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn full_store_refuses_new_states() {
        let store = PendingAuthorizations::new(Duration::from_secs(60), 2);
        store.insert("a".to_string(), pending("user-a")).unwrap();
        store.insert("b".to_string(), pending("user-b")).unwrap();

        let err = store.insert("c".to_string(), pending("user-c")).unwrap_err();
        assert_eq!(err, PendingInsertError::Full);
        assert_eq!(store.len(), 2);

        store.take("a").unwrap();
        store.insert("c".to_string(), pending("user-c")).unwrap();
    }

    #[test]
    fn full_store_prunes_expired_states() {
        let store = PendingAuthorizations::new(Duration::ZERO, 2);
        store.insert("a".to_string(), pending("user-a")).unwrap();
        store.insert("b".to_string(), pending("user-b")).unwrap();
        assert_eq!(store.len(), 2);

        store.insert("c".to_string(), pending("user-c")).unwrap();
        assert_eq!(store.len(), 1);
    }
}
