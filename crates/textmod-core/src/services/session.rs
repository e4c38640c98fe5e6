use async_trait::async_trait;
use dashmap::DashMap;

use crate::shared::AppliedChange;

/// Session state owned by the caller: a key-value cache plus the log of
/// applied changes.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Option<String>;
    async fn set(&self, session_id: &str, key: &str, value: String);
    async fn clear_session(&self, session_id: &str);
    async fn append_change(&self, session_id: &str, change: AppliedChange);
    async fn changes(&self, session_id: &str) -> Vec<AppliedChange>;
}

pub fn snapshot_key(path: &str) -> String {
    format!("snapshot:{}", path)
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    values: DashMap<(String, String), String>,
    log: DashMap<String, Vec<AppliedChange>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Option<String> {
        self.values
            .get(&(session_id.to_string(), key.to_string()))
            .map(|v| v.value().clone())
    }

    async fn set(&self, session_id: &str, key: &str, value: String) {
        self.values
            .insert((session_id.to_string(), key.to_string()), value);
    }

    async fn clear_session(&self, session_id: &str) {
        self.values.retain(|(session, _), _| session != session_id);
        self.log.remove(session_id);
    }

    async fn append_change(&self, session_id: &str, change: AppliedChange) {
        self.log
            .entry(session_id.to_string())
            .or_default()
            .push(change);
    }

    async fn changes(&self, session_id: &str) -> Vec<AppliedChange> {
        self.log
            .get(session_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn change(path: &str) -> AppliedChange {
        AppliedChange {
            path: path.to_string(),
            strategy: "exact-snippet".to_string(),
            replacement_count: 1,
            diff: String::new(),
            applied_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        store.set("a", &snapshot_key("src/App.tsx"), "old".to_string()).await;
        store.append_change("a", change("src/App.tsx")).await;
        store.append_change("b", change("src/Nav.tsx")).await;

        assert_eq!(
            store.get("a", "snapshot:src/App.tsx").await.as_deref(),
            Some("old")
        );
        assert_eq!(store.get("b", "snapshot:src/App.tsx").await, None);
        assert_eq!(store.changes("a").await.len(), 1);

        store.clear_session("a").await;
        assert_eq!(store.get("a", "snapshot:src/App.tsx").await, None);
        assert!(store.changes("a").await.is_empty());
        assert_eq!(store.changes("b").await.len(), 1);
    }
}
