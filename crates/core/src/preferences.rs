//! Local persistence for user preferences.

use std::sync::Arc;

use clockwork_domain::constants::PREFERENCES_KEY;
use clockwork_domain::UserPreferences;
use tracing::warn;

use crate::storage::{write_best_effort, KeyValueStore};

pub struct PreferencesStore {
    store: Arc<dyn KeyValueStore>,
}

impl PreferencesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load preferences, falling back to defaults on missing or corrupt
    /// data.
    pub fn load(&self) -> UserPreferences {
        let Some(raw) = self.store.get(PREFERENCES_KEY) else {
            return UserPreferences::default();
        };
        match serde_json::from_str(&raw) {
            Ok(prefs) => prefs,
            Err(err) => {
                warn!(error = %err, "corrupt preferences; using defaults");
                UserPreferences::default()
            }
        }
    }

    pub fn save(&self, prefs: &UserPreferences) {
        match serde_json::to_string(prefs) {
            Ok(json) => write_best_effort(self.store.as_ref(), PREFERENCES_KEY, &json),
            Err(err) => warn!(error = %err, "failed to serialize preferences"),
        }
    }
}
