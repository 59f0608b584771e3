//! Cancellable texture downloads keyed by object key
//!
//! Each key has at most one fetch in flight: scheduling a new fetch for
//! a key aborts the previous one, and removing an object cancels its
//! fetch, so a late result can never clobber a reused key's texture.

use pointsync_core::{ObjectKey, SceneEvent, SceneRegistry};
use pointsync_remote::TextureStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Pool of in-flight texture fetch tasks
pub struct FetchPool<S: TextureStore> {
    store: Arc<S>,
    registry: Arc<RwLock<SceneRegistry>>,
    events: broadcast::Sender<SceneEvent>,
    inflight: Mutex<HashMap<ObjectKey, JoinHandle<()>>>,
}

impl<S: TextureStore> FetchPool<S> {
    pub fn new(
        store: S,
        registry: Arc<RwLock<SceneRegistry>>,
        events: broadcast::Sender<SceneEvent>,
    ) -> Self {
        Self {
            store: Arc::new(store),
            registry,
            events,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Schedule a texture fetch for an object, aborting any fetch
    /// already in flight for the same key.
    ///
    /// Completion applies the bytes to the object through the shared
    /// registry; if the object vanished mid-flight the bytes are
    /// discarded. Failures are logged and dropped.
    pub async fn schedule(&self, image_id: &str, key: ObjectKey) {
        let url = self.store.resolve_url(image_id);
        let store = self.store.clone();
        let registry = self.registry.clone();
        let events = self.events.clone();
        let task_key = key.clone();

        // Abort the previous fetch before its replacement exists, so a
        // stale result cannot land after the new one
        let mut inflight = self.inflight.lock().await;
        if let Some(previous) = inflight.remove(&key) {
            previous.abort();
        }

        let handle = tokio::spawn(async move {
            match store.fetch(&url).await {
                Ok(bytes) => {
                    let mut scene = registry.write().await;
                    match scene.get_mut(&task_key) {
                        Some(object) => {
                            object.texture = Some(bytes);
                            object.touch();
                            debug!(key = %task_key, "Applied texture");
                            let _ = events.send(SceneEvent::TextureApplied(task_key.clone()));
                        }
                        None => {
                            debug!(key = %task_key, "Object gone before texture arrived, discarding");
                        }
                    }
                }
                Err(e) => {
                    warn!(key = %task_key, error = %e, "Texture fetch failed");
                }
            }
        });

        inflight.insert(key, handle);
    }

    /// Abort the in-flight fetch for a key, if any
    pub async fn cancel(&self, key: &ObjectKey) -> bool {
        match self.inflight.lock().await.remove(key) {
            Some(handle) => {
                handle.abort();
                debug!(key = %key, "Cancelled in-flight texture fetch");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointsync_core::{Color, VisualObject};
    use pointsync_remote::StorageError;
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Drops set the flag unless the fetch ran to completion, so tests
    /// can observe task aborts
    struct AbortGuard {
        armed: bool,
        flag: Arc<AtomicBool>,
    }

    impl Drop for AbortGuard {
        fn drop(&mut self) {
            if self.armed {
                self.flag.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Store whose first fetch optionally parks on a gate and returns
    /// its own bytes; later fetches return immediately
    struct MockStore {
        first_bytes: Vec<u8>,
        bytes: Vec<u8>,
        gate_first: Option<Arc<Notify>>,
        calls: AtomicUsize,
        first_aborted: Arc<AtomicBool>,
    }

    impl MockStore {
        fn immediate(bytes: Vec<u8>) -> Self {
            Self {
                first_bytes: bytes.clone(),
                bytes,
                gate_first: None,
                calls: AtomicUsize::new(0),
                first_aborted: Arc::new(AtomicBool::new(false)),
            }
        }

        fn gated_first(first_bytes: Vec<u8>, bytes: Vec<u8>, gate: Arc<Notify>) -> Self {
            Self {
                first_bytes,
                bytes,
                gate_first: Some(gate),
                calls: AtomicUsize::new(0),
                first_aborted: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl TextureStore for MockStore {
        fn resolve_url(&self, image_id: &str) -> String {
            format!("mock://{image_id}")
        }

        fn fetch(&self, _url: &str) -> impl Future<Output = Result<Vec<u8>, StorageError>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = if call == 0 { self.gate_first.clone() } else { None };
            let bytes = if call == 0 {
                self.first_bytes.clone()
            } else {
                self.bytes.clone()
            };
            let flag = self.first_aborted.clone();
            async move {
                if let Some(gate) = gate {
                    let mut guard = AbortGuard { armed: true, flag };
                    gate.notified().await;
                    guard.armed = false;
                }
                Ok(bytes)
            }
        }
    }

    fn seeded_registry(key: &ObjectKey) -> Arc<RwLock<SceneRegistry>> {
        let mut scene = SceneRegistry::new();
        scene.insert(VisualObject::cube(
            key.clone(),
            [0.0; 3],
            0.01,
            Color::BLUE,
            "InteractionCube",
        ));
        Arc::new(RwLock::new(scene))
    }

    async fn join_inflight(pool: &FetchPool<MockStore>, key: &ObjectKey) {
        let handle = pool.inflight.lock().await.remove(key).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_completion_applies_texture() {
        let key = ObjectKey::from_image_id("a.png");
        let registry = seeded_registry(&key);
        let (events, mut rx) = broadcast::channel(16);
        let pool = FetchPool::new(MockStore::immediate(vec![1, 2, 3]), registry.clone(), events);

        pool.schedule("a.png", key.clone()).await;
        join_inflight(&pool, &key).await;

        let scene = registry.read().await;
        assert_eq!(scene.get(&key).unwrap().texture, Some(vec![1, 2, 3]));
        assert!(matches!(rx.try_recv(), Ok(SceneEvent::TextureApplied(k)) if k == key));
    }

    #[tokio::test]
    async fn test_completion_after_removal_discards() {
        let key = ObjectKey::from_image_id("a.png");
        let registry = seeded_registry(&key);
        let gate = Arc::new(Notify::new());
        let (events, mut rx) = broadcast::channel(16);
        let pool = FetchPool::new(
            MockStore::gated_first(vec![1, 2, 3], vec![1, 2, 3], gate.clone()),
            registry.clone(),
            events,
        );

        pool.schedule("a.png", key.clone()).await;
        registry.write().await.remove(&key);
        gate.notify_one();
        join_inflight(&pool, &key).await;

        assert!(registry.read().await.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reschedule_aborts_previous() {
        let key = ObjectKey::from_image_id("a.png");
        let registry = seeded_registry(&key);
        let gate = Arc::new(Notify::new());
        let (events, _rx) = broadcast::channel(16);
        let store = MockStore::gated_first(vec![9, 9, 9], vec![1, 2, 3], gate.clone());
        let aborted = store.first_aborted.clone();
        let pool = FetchPool::new(store, registry.clone(), events);

        // First fetch parks on the gate; the second replaces and aborts it
        pool.schedule("a.png", key.clone()).await;
        tokio::task::yield_now().await;
        pool.schedule("a.png", key.clone()).await;
        join_inflight(&pool, &key).await;

        assert_eq!(
            registry.read().await.get(&key).unwrap().texture,
            Some(vec![1, 2, 3])
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(aborted.load(Ordering::SeqCst));

        // Even if the stale fetch were somehow released now, its bytes
        // must never land over the replacement's
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            registry.read().await.get(&key).unwrap().texture,
            Some(vec![1, 2, 3])
        );
    }

    #[tokio::test]
    async fn test_cancel_aborts() {
        let key = ObjectKey::from_image_id("a.png");
        let registry = seeded_registry(&key);
        let gate = Arc::new(Notify::new());
        let (events, _rx) = broadcast::channel(16);
        let store = MockStore::gated_first(vec![1, 2, 3], vec![1, 2, 3], gate.clone());
        let aborted = store.first_aborted.clone();
        let pool = FetchPool::new(store, registry.clone(), events);

        pool.schedule("a.png", key.clone()).await;
        tokio::task::yield_now().await;
        assert!(pool.cancel(&key).await);
        assert!(!pool.cancel(&key).await);

        // Releasing the gate after the abort must not apply anything
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(aborted.load(Ordering::SeqCst));
        assert!(registry.read().await.get(&key).unwrap().texture.is_none());
    }
}
