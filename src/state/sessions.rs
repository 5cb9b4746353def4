use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

/// Bookkeeping for one transcription session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub source_system: Option<String>,
    /// Caller-supplied references such as `case_ref` or `person_ref`.
    pub external_references: BTreeMap<String, String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// In-memory registry of sessions seen by this process.
///
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionMetadata>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or merge metadata for `session_id`.
    ///
    /// Provided values override stored ones, references merge key by key,
    /// `last_seen` is refreshed and `created_at` is kept.
    pub fn upsert(
        &self,
        session_id: &str,
        source_system: Option<String>,
        external_references: BTreeMap<String, String>,
        user_id: Option<String>,
    ) -> SessionMetadata {
        let now = Utc::now();
        let mut sessions = self.sessions.write();

        let metadata = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionMetadata {
                session_id: session_id.to_string(),
                source_system: None,
                external_references: BTreeMap::new(),
                user_id: None,
                created_at: now,
                last_seen: now,
            });

        if source_system.is_some() {
            metadata.source_system = source_system;
        }
        if user_id.is_some() {
            metadata.user_id = user_id;
        }
        metadata.external_references.extend(external_references);
        metadata.last_seen = now;

        debug!(session_id = %session_id, "Session metadata upserted");
        metadata.clone()
    }

    pub fn get(&self, session_id: &str) -> Option<SessionMetadata> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Snapshot of every known session, ordered by id.
    pub fn all(&self) -> BTreeMap<String, SessionMetadata> {
        self.sessions
            .read()
            .iter()
            .map(|(id, metadata)| (id.clone(), metadata.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn refs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_upsert_creates_session() {
        let registry = SessionRegistry::new();
        let metadata = registry.upsert(
            "abc",
            Some("crm".to_string()),
            refs(&[("case_ref", "C-1")]),
            Some("user-7".to_string()),
        );

        assert_eq!(metadata.session_id, "abc");
        assert_eq!(metadata.source_system.as_deref(), Some("crm"));
        assert_eq!(metadata.external_references["case_ref"], "C-1");
        assert_eq!(metadata.created_at, metadata.last_seen);
        assert_eq!(registry.get("abc"), Some(metadata));
    }

    #[test]
    fn test_upsert_with_nothing_only_refreshes_last_seen() {
        let registry = SessionRegistry::new();
        let first = registry.upsert(
            "abc",
            Some("crm".to_string()),
            refs(&[("case_ref", "C-1")]),
            Some("user-7".to_string()),
        );

        let second = registry.upsert("abc", None, BTreeMap::new(), None);

        assert_eq!(second.source_system, first.source_system);
        assert_eq!(second.external_references, first.external_references);
        assert_eq!(second.user_id, first.user_id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.last_seen >= first.last_seen);
    }

    #[test]
    fn test_upsert_merges_references_key_wise() {
        let registry = SessionRegistry::new();
        registry.upsert("abc", None, refs(&[("case_ref", "C-1")]), None);
        let merged = registry.upsert(
            "abc",
            Some("portal".to_string()),
            refs(&[("person_ref", "P-9"), ("case_ref", "C-2")]),
            None,
        );

        assert_eq!(
            merged.external_references,
            refs(&[("case_ref", "C-2"), ("person_ref", "P-9")])
        );
        assert_eq!(merged.source_system.as_deref(), Some("portal"));
    }

    #[test]
    fn test_get_unknown_session() {
        let registry = SessionRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_upserts() {
        let registry = Arc::new(SessionRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for j in 0..50 {
                        let n = j.to_string();
                        let id = format!("session-{i}");
                        registry.upsert(&id, None, refs(&[("n", n.as_str())]), None);
                        registry.get("session-0");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 8);
        let all = registry.all();
        assert_eq!(all["session-3"].external_references["n"], "49");
    }
}
