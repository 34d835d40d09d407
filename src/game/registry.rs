//! Session Registry
//!
//! Concurrent map of live matches. The outer lock only guards membership;
//! each session has its own mutex so shots on different matches never
//! contend. Lock order is always `sessions` then `owners`, and no session
//! mutex is ever awaited while either is held.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::game::state::MatchSession;
use crate::proof::commitment::PlayerId;

/// Unique session identifier.
pub type SessionId = uuid::Uuid;

/// Handle to one session. Hold the lock only for the duration of a mutation.
pub type SessionHandle = Arc<Mutex<MatchSession>>;

/// Membership record. The owner never changes, so it lives outside the
/// session mutex.
struct SessionEntry {
    owner_id: PlayerId,
    handle: SessionHandle,
}

/// Registry of match sessions keyed by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<BTreeMap<SessionId, SessionEntry>>,
    owners: RwLock<BTreeMap<PlayerId, BTreeSet<SessionId>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a fully built session. Returns false if the id is taken.
    pub async fn insert(&self, session: MatchSession) -> bool {
        let id = session.id;
        let owner = session.owner_id.clone();

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return false;
        }
        sessions.insert(
            id,
            SessionEntry {
                owner_id: owner.clone(),
                handle: Arc::new(Mutex::new(session)),
            },
        );

        let mut owners = self.owners.write().await;
        owners.entry(owner).or_default().insert(id);
        true
    }

    /// Get a session by id.
    pub async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(id).map(|entry| entry.handle.clone())
    }

    /// Owner of a session, without touching its lock.
    pub async fn owner_of(&self, id: &SessionId) -> Option<PlayerId> {
        let sessions = self.sessions.read().await;
        sessions.get(id).map(|entry| entry.owner_id.clone())
    }

    /// Remove a session. Only one of several concurrent callers gets `Some`.
    pub async fn remove(&self, id: &SessionId) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let SessionEntry { owner_id, handle } = sessions.remove(id)?;

        let mut owners = self.owners.write().await;
        if let Some(ids) = owners.get_mut(&owner_id) {
            ids.remove(id);
            if ids.is_empty() {
                owners.remove(&owner_id);
            }
        }
        Some(handle)
    }

    /// Number of sessions held.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Sessions owned by a player, in id order.
    pub async fn sessions_for(&self, player_id: &PlayerId) -> Vec<SessionId> {
        let owners = self.owners.read().await;
        owners
            .get(player_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::game::weapon::WeaponProfile;
    use std::time::Duration;
    use tokio::time::timeout;
    use uuid::Uuid;

    fn session(owner: &str) -> MatchSession {
        MatchSession::with_seed(
            Uuid::new_v4(),
            PlayerId::new(owner),
            "seed".into(),
            1,
            WeaponProfile::pistol(),
            &EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = SessionRegistry::new();
        let s = session("alice");
        let id = s.id;

        assert!(registry.insert(s).await);
        assert_eq!(registry.session_count().await, 1);
        assert!(registry.get(&id).await.is_some());
        assert_eq!(registry.owner_of(&id).await, Some(PlayerId::new("alice")));
        assert_eq!(registry.sessions_for(&PlayerId::new("alice")).await, vec![id]);

        assert!(registry.remove(&id).await.is_some());
        assert!(registry.remove(&id).await.is_none());
        assert_eq!(registry.session_count().await, 0);
        assert!(registry.sessions_for(&PlayerId::new("alice")).await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let registry = SessionRegistry::new();
        let s = session("alice");
        let mut dup = session("bob");
        dup.id = s.id;

        assert!(registry.insert(s).await);
        assert!(!registry.insert(dup).await);
        assert!(registry.sessions_for(&PlayerId::new("bob")).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_remove_single_winner() {
        let registry = Arc::new(SessionRegistry::new());
        let s = session("alice");
        let id = s.id;
        registry.insert(s).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.remove(&id).await.is_some() })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_busy_session_does_not_block_other_lookups() {
        let registry = Arc::new(SessionRegistry::new());
        let a = session("alice");
        let b = session("bob");
        let (a_id, b_id) = (a.id, b.id);
        registry.insert(a).await;
        registry.insert(b).await;

        // An in-flight mutation on A holds its lock throughout.
        let a_handle = registry.get(&a_id).await.unwrap();
        let busy = a_handle.lock().await;

        let remover = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.remove(&a_id).await.is_some() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let lookup = timeout(Duration::from_millis(200), registry.get(&b_id)).await;
        assert!(matches!(lookup, Ok(Some(_))));
        assert!(timeout(Duration::from_millis(200), remover).await.unwrap().unwrap());
        assert_eq!(busy.owner_id, PlayerId::new("alice"));
        drop(busy);

        assert!(registry.get(&a_id).await.is_none());
        assert_eq!(registry.owner_of(&b_id).await, Some(PlayerId::new("bob")));
    }
}
