//! In-memory conversation session store
//!
//! Each session owns one `ConversationMemory`. The store is bounded by an
//! LRU and sessions idle longer than the configured TTL are discarded on
//! access.

use answerforge_common::config::SessionConfig;
use answerforge_common::resolution::ConversationMemory;
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Memory handle shared between the store and an in-flight request
pub type SharedMemory = Arc<Mutex<ConversationMemory>>;

struct SessionSlot {
    memory: SharedMemory,
    last_active_at: DateTime<Utc>,
}

/// Newly created session
#[derive(Debug, Clone, Copy)]
pub struct SessionHandle {
    pub id: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    slots: Mutex<LruCache<Uuid, SessionSlot>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let idle_ttl = Duration::from_std(config.idle_ttl()).unwrap_or(Duration::MAX);

        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            idle_ttl,
        }
    }

    pub async fn create(&self) -> SessionHandle {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let evicted = self.slots.lock().await.push(
            id,
            SessionSlot {
                memory: Arc::new(Mutex::new(ConversationMemory::new())),
                last_active_at: now,
            },
        );
        if let Some((evicted_id, _)) = evicted {
            tracing::debug!(session_id = %evicted_id, "Session evicted at capacity");
        }

        SessionHandle {
            id,
            expires_at: now
                .checked_add_signed(self.idle_ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Look up a live session and mark it active
    pub async fn get(&self, id: &Uuid) -> Option<SharedMemory> {
        let now = Utc::now();
        let mut slots = self.slots.lock().await;

        let expired = match slots.get_mut(id) {
            None => return None,
            Some(slot) if now - slot.last_active_at > self.idle_ttl => true,
            Some(slot) => {
                slot.last_active_at = now;
                return Some(Arc::clone(&slot.memory));
            }
        };

        if expired {
            slots.pop(id);
            tracing::debug!(session_id = %id, "Session expired");
        }
        None
    }

    /// Remove a session; false when it did not exist
    pub async fn remove(&self, id: &Uuid) -> bool {
        self.slots.lock().await.pop(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}
