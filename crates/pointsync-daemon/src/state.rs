//! Application state and the change-notification event loop

use anyhow::Result;
use pointsync_core::{ObjectKey, Reconciler, SceneEvent, SceneRegistry};
use pointsync_remote::{ChangeFeed, ChangeKind, ChangeNotification, TextureStore};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::fetch::FetchPool;

/// Shared application state
pub struct AppState<S: TextureStore> {
    /// Live scene registry, shared with fetch tasks and engine bindings
    pub registry: Arc<RwLock<SceneRegistry>>,
    /// Reconciler applying decoded records
    pub reconciler: Reconciler,
    /// In-flight texture downloads
    pub fetcher: FetchPool<S>,
    /// Change feed the database bridge publishes into
    pub feed: ChangeFeed,
    /// Scene event broadcast for engine bindings
    pub events: broadcast::Sender<SceneEvent>,
    /// Configuration
    pub config: Config,
}

impl<S: TextureStore> AppState<S> {
    /// Create new application state around a texture store
    pub fn new(config: Config, store: S) -> Arc<Self> {
        let registry = Arc::new(RwLock::new(SceneRegistry::new()));
        let (events, _) = broadcast::channel(100);
        let reconciler = Reconciler::new(config.to_reconciler_config());
        let fetcher = FetchPool::new(store, registry.clone(), events.clone());

        Arc::new(Self {
            registry,
            reconciler,
            fetcher,
            feed: ChangeFeed::default(),
            events,
            config,
        })
    }

    /// Subscribe to scene events
    pub fn subscribe(&self) -> broadcast::Receiver<SceneEvent> {
        self.events.subscribe()
    }

    /// Spawn the reconciler loop.
    ///
    /// The feed receiver is registered before the task is spawned, so
    /// notifications published as soon as this returns are delivered;
    /// a receiver created inside the task would miss anything published
    /// before its first poll.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let rx = self.feed.subscribe();
        let state = self.clone();
        tokio::spawn(state.run(rx))
    }

    /// Consume the change feed until it closes.
    ///
    /// Lagging behind the feed skips the missed notifications and keeps
    /// going; only channel closure ends the loop.
    pub async fn run(
        self: Arc<Self>,
        mut rx: broadcast::Receiver<ChangeNotification>,
    ) -> Result<()> {
        info!(collection = %self.config.remote.collection, "Reconciler started");

        loop {
            match rx.recv().await {
                Ok(notification) => self.handle(notification).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Change feed lagged, notifications dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("Change feed closed, reconciler stopping");
        Ok(())
    }

    /// Process one change notification
    pub async fn handle(&self, notification: ChangeNotification) {
        if let Some(delivery_error) = &notification.error {
            // Delivery errors drop the event; no retry, no mutation
            error!(
                kind = ?notification.kind,
                code = ?delivery_error.code,
                error = %delivery_error,
                "Change delivery failed"
            );
            return;
        }

        let Some(snapshot) = notification.snapshot else {
            warn!(kind = ?notification.kind, "Notification without snapshot, dropping");
            return;
        };

        match notification.kind {
            ChangeKind::Removed => {
                let key = ObjectKey::from_image_id(&snapshot.id);
                let removed = {
                    let mut scene = self.registry.write().await;
                    self.reconciler.remove(&mut scene, &key)
                };
                match removed {
                    Some(event) => {
                        self.fetcher.cancel(&key).await;
                        let _ = self.events.send(event);
                    }
                    None => debug!(key = %key, "Removal for unknown key, ignoring"),
                }
            }
            ChangeKind::Added if !self.reconciler.config().handle_child_added => {
                debug!(id = %snapshot.id, "Added handling disabled, skipping");
            }
            ChangeKind::Added | ChangeKind::Changed => {
                let record = match snapshot.to_record() {
                    Ok(record) => record,
                    Err(e) => {
                        // Fatal to this event only
                        warn!(id = %snapshot.id, error = %e, "Undecodable notification, dropping");
                        return;
                    }
                };

                let event = {
                    let mut scene = self.registry.write().await;
                    self.reconciler.apply(&mut scene, &record)
                };
                let _ = self.events.send(event);

                if self.config.reconcile.fetch_textures {
                    self.fetcher.schedule(&record.id, record.key()).await;
                }
            }
        }
    }
}

/// Parse one bridge line and publish it into the feed.
///
/// Returns whether a notification was published. Blank and malformed
/// lines are skipped (logged, not fatal) so one bad line never ends the
/// stream.
pub fn publish_bridge_line(feed: &ChangeFeed, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    match serde_json::from_str::<ChangeNotification>(line) {
        Ok(notification) => {
            feed.publish(notification);
            true
        }
        Err(e) => {
            warn!(error = %e, "Skipping malformed notification line");
            false
        }
    }
}
