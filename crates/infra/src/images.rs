//! Per-lap image storage.
//!
//! Base64 image payloads are kept under one key per lap. Implements the
//! engine's `LapImageSource` port.

use std::sync::Arc;

use clockwork_core::storage::{remove_best_effort, write_best_effort, KeyValueStore};
use clockwork_core::sync::ports::LapImageSource;
use clockwork_domain::constants::IMAGE_KEY_PREFIX;
use tracing::warn;
use uuid::Uuid;

pub struct ImageStore {
    store: Arc<dyn KeyValueStore>,
}

impl ImageStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(lap_id: &Uuid) -> String {
        format!("{IMAGE_KEY_PREFIX}{lap_id}")
    }

    /// All stored payloads for a lap; empty when none or corrupt.
    pub fn list(&self, lap_id: &Uuid) -> Vec<String> {
        let Some(raw) = self.store.get(&Self::key(lap_id)) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(images) => images,
            Err(err) => {
                warn!(lap_id = %lap_id, error = %err, "corrupt image data; ignoring");
                Vec::new()
            }
        }
    }

    /// Replace the lap's stored payloads.
    pub fn save(&self, lap_id: &Uuid, images: &[String]) {
        match serde_json::to_string(images) {
            Ok(json) => write_best_effort(self.store.as_ref(), &Self::key(lap_id), &json),
            Err(err) => warn!(lap_id = %lap_id, error = %err, "failed to serialize images"),
        }
    }

    /// Append one payload.
    pub fn add(&self, lap_id: &Uuid, payload: String) {
        let mut images = self.list(lap_id);
        images.push(payload);
        self.save(lap_id, &images);
    }

    /// Remove one payload by index; out-of-range indices are ignored.
    pub fn remove_at(&self, lap_id: &Uuid, index: usize) {
        let mut images = self.list(lap_id);
        if index < images.len() {
            images.remove(index);
            self.save(lap_id, &images);
        }
    }

    /// Drop all payloads for a lap.
    pub fn delete_for_lap(&self, lap_id: &Uuid) {
        remove_best_effort(self.store.as_ref(), &Self::key(lap_id));
    }
}

impl LapImageSource for ImageStore {
    fn images_for(&self, lap_id: &Uuid) -> Vec<String> {
        self.list(lap_id)
    }
}

#[cfg(test)]
mod tests {
    use clockwork_core::storage::MemoryStore;

    use super::*;

    fn store() -> ImageStore {
        ImageStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn add_and_list_round_trips() {
        let images = store();
        let lap = Uuid::new_v4();

        images.add(&lap, "aGVsbG8=".into());
        images.add(&lap, "d29ybGQ=".into());
        assert_eq!(images.list(&lap), vec!["aGVsbG8=".to_string(), "d29ybGQ=".to_string()]);
    }

    #[test]
    fn remove_at_drops_only_that_index() {
        let images = store();
        let lap = Uuid::new_v4();
        images.save(&lap, &["a".into(), "b".into(), "c".into()]);

        images.remove_at(&lap, 1);
        assert_eq!(images.list(&lap), vec!["a".to_string(), "c".to_string()]);

        // out of range is a no-op
        images.remove_at(&lap, 10);
        assert_eq!(images.list(&lap).len(), 2);
    }

    #[test]
    fn delete_clears_the_lap() {
        let images = store();
        let lap = Uuid::new_v4();
        images.add(&lap, "a".into());
        images.delete_for_lap(&lap);
        assert!(images.list(&lap).is_empty());
    }

    #[test]
    fn laps_are_isolated() {
        let images = store();
        let lap_a = Uuid::new_v4();
        let lap_b = Uuid::new_v4();
        images.add(&lap_a, "a".into());
        assert!(images.list(&lap_b).is_empty());
        assert!(images.images_for(&lap_a).len() == 1);
    }
}
