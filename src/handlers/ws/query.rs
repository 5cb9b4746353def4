use std::collections::BTreeMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::config::utils::non_empty;

/// Query parameters accepted on the transcription WebSocket
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
    pub source_system: Option<String>,
    pub case_ref: Option<String>,
    pub person_ref: Option<String>,
    pub user_id: Option<String>,
}

impl SessionQuery {
    /// Client supplied id, or a fresh one when missing or blank
    pub fn resolve_session_id(&self) -> String {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Source system, ignoring an empty `source_system=`
    pub fn source_system(&self) -> Option<String> {
        non_empty(self.source_system.clone())
    }

    /// User id, ignoring an empty `user_id=`
    pub fn user_id(&self) -> Option<String> {
        non_empty(self.user_id.clone())
    }

    /// References to records in the caller's own systems
    pub fn external_references(&self) -> BTreeMap<String, String> {
        [("case_ref", &self.case_ref), ("person_ref", &self.person_ref)]
            .into_iter()
            .filter_map(|(key, value)| non_empty(value.clone()).map(|v| (key.to_string(), v)))
            .collect()
    }
}
