//! Favorite tracks

use mume_core::Track;
use mume_storage::{PersistHandle, PlayerStorage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Insertion-ordered set of favorite tracks, keyed by id
///
/// Every toggle persists the whole list through the background writer.
#[derive(Clone)]
pub struct FavoritesStore {
    items: Arc<Mutex<Vec<Track>>>,
    storage: PlayerStorage,
    persist: PersistHandle,
}

impl std::fmt::Debug for FavoritesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesStore")
            .field("len", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl FavoritesStore {
    pub fn new(storage: PlayerStorage, persist: PersistHandle) -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            storage,
            persist,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Track>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add the track if absent, remove it if present
    ///
    /// Returns whether the track is a favorite afterwards.
    pub fn toggle(&self, track: Track) -> bool {
        let id = track.id.clone();
        let mut items = self.lock();
        let now_favorite = match items.iter().position(|t| t.id == track.id) {
            Some(index) => {
                items.remove(index);
                false
            }
            None => {
                items.push(track);
                true
            }
        };
        // Submitted under the lock so writes reach storage in toggle order
        self.persist.persist_favorites(items.clone());
        drop(items);

        debug!(track_id = %id, favorite = now_favorite, "Favorite toggled");
        now_favorite
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.lock().iter().any(|t| t.id == id)
    }

    pub fn items(&self) -> Vec<Track> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Replace the in-memory list with the persisted one
    pub async fn hydrate(&self) {
        let favorites = self.storage.read_favorites().await;
        let len = favorites.len();
        *self.lock() = favorites;
        info!(favorites = len, "Favorites hydrated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_track(id: &str) -> Track {
        Track::new(id, format!("Track {id}"), format!("https://cdn/{id}.mp4"))
    }

    #[test]
    fn toggle_adds_then_removes() {
        let favorites = FavoritesStore::new(PlayerStorage::in_memory(), PersistHandle::disconnected());

        assert!(favorites.toggle(create_test_track("a")));
        assert!(favorites.toggle(create_test_track("b")));
        assert!(favorites.is_favorite("a"));

        assert!(!favorites.toggle(create_test_track("a")));
        assert!(!favorites.is_favorite("a"));
        assert_eq!(favorites.items().len(), 1);
    }

    #[tokio::test]
    async fn toggles_survive_hydrate() {
        let storage = PlayerStorage::in_memory();
        let (writer, _task) = PersistHandle::spawn(storage.clone());

        let favorites = FavoritesStore::new(storage.clone(), writer.clone());
        favorites.toggle(create_test_track("a"));
        favorites.toggle(create_test_track("b"));
        favorites.toggle(create_test_track("c"));
        favorites.toggle(create_test_track("b"));
        writer.flush().await;

        let restored = FavoritesStore::new(storage, writer);
        restored.hydrate().await;

        let ids: Vec<String> = restored.items().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_toggles_persist_the_final_list() {
        let storage = PlayerStorage::in_memory();
        let (writer, _task) = PersistHandle::spawn(storage.clone());
        let favorites = FavoritesStore::new(storage.clone(), writer.clone());

        std::thread::scope(|scope| {
            for prefix in ["x", "y"] {
                let favorites = &favorites;
                scope.spawn(move || {
                    for round in 0..301 {
                        favorites.toggle(create_test_track(&format!("{prefix}{}", round % 3)));
                    }
                });
            }
        });
        writer.flush().await;

        let persisted: Vec<String> = storage
            .read_favorites()
            .await
            .into_iter()
            .map(|t| t.id)
            .collect();
        let current: Vec<String> = favorites.items().into_iter().map(|t| t.id).collect();
        assert_eq!(persisted, current);
    }
}
