//! SettingsManager: layered resolution, validated writes, deferred sync.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use properties_client::{PropertiesApi, Scope};
use serde::Serialize;
use settings_schema::{SettingKey, SettingValue, is_server_safe, validate};
use settings_store::LocalStore;
use tokio::sync::Notify;

use crate::layers::{LayerSnapshot, load_local_layer, typed_layer};
use crate::sync::{MAX_PENDING_SYNC, PendingSync, SyncOp, SyncQueue};
use crate::{EffectiveValue, SetOutcome, SettingsError, embed};

/// Merges the four settings layers and owns every write to them.
///
/// Cheap to clone; all clones share the same snapshot, store handle, and
/// sync queue. Reads and writes are synchronous; only the remote layer
/// fetches and the queue flush touch the network.
#[derive(Clone)]
pub struct SettingsManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    store: LocalStore,
    remote: Arc<dyn PropertiesApi>,
    layers: Mutex<LayerSnapshot>,
    queue: Mutex<SyncQueue>,
    sync_notify: Notify,
    online: AtomicBool,
    user_fetch_seq: AtomicU64,
    site_fetch_seq: AtomicU64,
}

/// Full diagnostic snapshot: the four raw layers plus the computed
/// effective map, for answering "why is setting X this value".
#[derive(Debug, Serialize)]
pub struct ConfigExport {
    pub embed: BTreeMap<String, SettingValue>,
    pub user: BTreeMap<String, SettingValue>,
    pub site: BTreeMap<String, SettingValue>,
    pub local: BTreeMap<String, SettingValue>,
    pub effective: BTreeMap<String, EffectiveValue>,
    pub logged_in: bool,
    pub online: bool,
    pub pending_sync: Vec<PendingSyncExport>,
}

/// One queued remote write, as shown to operators.
#[derive(Debug, Serialize)]
pub struct PendingSyncExport {
    pub path: String,
    pub op: &'static str,
    pub attempted_at: i64,
}

impl SettingsManager {
    /// Build a manager over the given store and remote client.
    ///
    /// Synchronous: the embed blob is parsed and the local cache loaded here
    /// so the first `get()` can already resolve a value. Call
    /// [`initialize`](Self::initialize) afterwards to enrich with the remote
    /// layers.
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn PropertiesApi>,
        embed_json: Option<&str>,
    ) -> Self {
        let embed = embed_json.map(embed::parse_embed_config).unwrap_or_default();
        if !embed.is_empty() {
            tracing::info!("Embed config locks {} settings", embed.len());
        }
        let local = load_local_layer(&store);
        let layers = LayerSnapshot {
            embed,
            local,
            ..Default::default()
        };
        Self {
            inner: Arc::new(ManagerInner {
                store,
                remote,
                layers: Mutex::new(layers),
                queue: Mutex::new(SyncQueue::new(MAX_PENDING_SYNC)),
                sync_notify: Notify::new(),
                online: AtomicBool::new(true),
                user_fetch_seq: AtomicU64::new(0),
                site_fetch_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Fetch the remote layers: site unconditionally, user when a session
    /// is active.
    pub async fn initialize(&self) {
        self.refresh_site_layer().await;
        let logged_in = self.layers().logged_in;
        if logged_in {
            self.refresh_user_layer().await;
        }
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve the effective value for a setting. Never absent: the schema
    /// default backstops every known key.
    pub fn get(&self, key: SettingKey) -> SettingValue {
        self.effective(key).value
    }

    /// Resolve a setting together with its provenance and lock status.
    pub fn effective(&self, key: SettingKey) -> EffectiveValue {
        self.layers().resolve(key)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Change a setting.
    ///
    /// The local cache is the durability floor: it is updated synchronously
    /// and the call succeeds even when the store write fails soft or the
    /// remote store is unreachable. Server-safe settings additionally queue
    /// a remote write when a session is active. Embed-locked settings are a
    /// flagged no-op; invalid values are the one loud failure.
    pub fn set(
        &self,
        key: SettingKey,
        value: impl Into<SettingValue>,
    ) -> Result<SetOutcome, SettingsError> {
        let value = value.into();
        {
            let layers = self.layers();
            if layers.embed.contains_key(&key) {
                tracing::warn!("Ignoring write to embed-locked setting {key}");
                return Ok(SetOutcome::Locked(layers.resolve(key)));
            }
        }
        validate(key, &value)?;

        let sync_eligible;
        {
            let mut layers = self.layers();
            layers.local.insert(key, value.clone());
            sync_eligible = layers.logged_in && is_server_safe(key);
            if sync_eligible {
                // The user layer outranks the local one, so it must reflect
                // the edit immediately rather than after the next fetch.
                layers.user.insert(key, value.clone());
            }
        }

        if !self.inner.store.write(key.path(), &value.to_json()) {
            tracing::warn!("Setting {key} kept in memory only; local persistence rejected it");
        }

        if sync_eligible && self.sync_allowed() {
            self.enqueue(key, SyncOp::Set(value));
        }

        Ok(SetOutcome::Applied(self.effective(key)))
    }

    /// Remove the user and local entries for a setting so resolution falls
    /// through to the site default or the schema default. Locked settings
    /// are a flagged no-op.
    pub fn reset(&self, key: SettingKey) -> SetOutcome {
        let removed;
        let sync_eligible;
        {
            let mut layers = self.layers();
            if layers.embed.contains_key(&key) {
                tracing::warn!("Ignoring reset of embed-locked setting {key}");
                return SetOutcome::Locked(layers.resolve(key));
            }
            let had_local = layers.local.remove(&key).is_some();
            let had_user = layers.user.remove(&key).is_some();
            removed = had_local || had_user;
            sync_eligible = layers.logged_in && is_server_safe(key);
        }

        self.inner.store.remove(key.path());

        if removed && sync_eligible && self.sync_allowed() {
            self.enqueue(key, SyncOp::Remove);
        }

        SetOutcome::Applied(self.effective(key))
    }

    /// Write a site-wide default directly (admin operation).
    ///
    /// Unlike `set()`, this is loud: it awaits the remote write and
    /// surfaces `Unauthorized` to the caller instead of queueing.
    pub async fn set_site_default(
        &self,
        key: SettingKey,
        value: impl Into<SettingValue>,
    ) -> Result<(), SettingsError> {
        let value = value.into();
        validate(key, &value)?;
        self.inner
            .remote
            .write_key(Scope::Site, key.path(), &value.to_json())
            .await?;
        self.layers().site.insert(key, value);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // String-path surface (operator/debug tooling)
    // -----------------------------------------------------------------------

    /// `get` addressed by dotted path. Unknown paths resolve to `None` with
    /// a warning; UI code probes optional paths freely.
    pub fn get_path(&self, path: &str) -> Option<SettingValue> {
        Some(self.get(known_key(path)?))
    }

    /// `effective` addressed by dotted path.
    pub fn effective_path(&self, path: &str) -> Option<EffectiveValue> {
        Some(self.effective(known_key(path)?))
    }

    /// `set` addressed by dotted path. `None` means the path is unknown.
    pub fn set_path(
        &self,
        path: &str,
        value: SettingValue,
    ) -> Option<Result<SetOutcome, SettingsError>> {
        Some(self.set(known_key(path)?, value))
    }

    /// `reset` addressed by dotted path. `None` means the path is unknown.
    pub fn reset_path(&self, path: &str) -> Option<SetOutcome> {
        Some(self.reset(known_key(path)?))
    }

    // -----------------------------------------------------------------------
    // Session transitions
    // -----------------------------------------------------------------------

    /// Mark the session active and fetch the user layer. A failed fetch
    /// leaves the session logged in with an empty user layer; resolution
    /// falls through until the next successful fetch.
    pub async fn login(&self) {
        self.layers().logged_in = true;
        tracing::info!("Session active; fetching user settings");
        self.refresh_user_layer().await;
    }

    /// Clear the user layer; the local cache becomes the personalization
    /// layer again. Pending sync entries are dropped; they belong to the
    /// departed session.
    pub fn logout(&self) {
        {
            let mut layers = self.layers();
            layers.logged_in = false;
            layers.user.clear();
        }
        let dropped = self.queue().clear();
        if dropped > 0 {
            tracing::warn!("Dropped {dropped} pending sync entries on logout");
        }
    }

    /// Network regained: flush the pending queue in FIFO order.
    pub async fn reconnect(&self) {
        self.inner.online.store(true, Ordering::SeqCst);
        let flushed = self.flush_pending().await;
        if flushed > 0 {
            tracing::info!("Flushed {flushed} pending writes after reconnect");
        }
    }

    // -----------------------------------------------------------------------
    // Remote layer fetches
    // -----------------------------------------------------------------------

    /// Re-fetch the user properties layer. Responses superseded by a newer
    /// fetch are discarded: last issued wins, not last completed.
    pub async fn refresh_user_layer(&self) {
        let seq = self.inner.user_fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        match self.inner.remote.read_namespace(Scope::User).await {
            Ok(map) => {
                self.inner.online.store(true, Ordering::SeqCst);
                let layer = typed_layer(map, "user");
                let mut layers = self.layers();
                if self.inner.user_fetch_seq.load(Ordering::SeqCst) != seq {
                    tracing::debug!("Discarding superseded user settings fetch");
                    return;
                }
                if !layers.logged_in {
                    tracing::debug!("Discarding user settings fetch after logout");
                    return;
                }
                layers.user = layer;
            }
            Err(e) => {
                if e.is_retryable() {
                    self.inner.online.store(false, Ordering::SeqCst);
                }
                tracing::warn!("User settings fetch failed; resolution falls through: {e}");
            }
        }
    }

    /// Re-fetch the site properties layer.
    pub async fn refresh_site_layer(&self) {
        let seq = self.inner.site_fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        match self.inner.remote.read_namespace(Scope::Site).await {
            Ok(map) => {
                self.inner.online.store(true, Ordering::SeqCst);
                let layer = typed_layer(map, "site");
                let mut layers = self.layers();
                if self.inner.site_fetch_seq.load(Ordering::SeqCst) != seq {
                    tracing::debug!("Discarding superseded site settings fetch");
                    return;
                }
                layers.site = layer;
            }
            Err(e) => {
                if e.is_retryable() {
                    self.inner.online.store(false, Ordering::SeqCst);
                }
                tracing::warn!("Site settings fetch failed; resolution falls through: {e}");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Deferred sync
    // -----------------------------------------------------------------------

    /// Drain the pending queue in FIFO order, one entry at a time. Stops on
    /// the first retryable failure and requeues that entry at the head.
    /// Unauthorized entries are dropped, never retried. Returns how many
    /// entries flushed.
    pub async fn flush_pending(&self) -> usize {
        let mut flushed = 0;
        loop {
            let Some(mut entry) = self.queue().pop_front() else {
                break;
            };
            entry.attempted_at = Utc::now().timestamp();
            let result = match &entry.op {
                SyncOp::Set(value) => {
                    self.inner
                        .remote
                        .write_key(Scope::User, entry.key.path(), &value.to_json())
                        .await
                }
                SyncOp::Remove => {
                    self.inner.remote.delete_key(Scope::User, entry.key.path()).await
                }
            };
            match result {
                Ok(()) => {
                    self.inner.online.store(true, Ordering::SeqCst);
                    flushed += 1;
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!("Remote sync failed for {}; will retry: {e}", entry.key);
                    self.inner.online.store(false, Ordering::SeqCst);
                    self.queue().requeue_front(entry);
                    break;
                }
                Err(e) => {
                    tracing::warn!("Dropping pending sync for {}: {e}", entry.key);
                }
            }
        }
        flushed
    }

    /// Number of queued remote writes awaiting retry.
    pub fn pending_count(&self) -> usize {
        self.queue().len()
    }

    /// Whether the last remote call succeeded.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    pub fn is_logged_in(&self) -> bool {
        self.layers().logged_in
    }

    /// Resolves once the queue is non-empty. Used by the flush worker.
    pub(crate) async fn wait_for_sync_work(&self) {
        loop {
            if self.pending_count() > 0 {
                return;
            }
            self.inner.sync_notify.notified().await;
        }
    }

    fn enqueue(&self, key: SettingKey, op: SyncOp) {
        self.queue().push(PendingSync {
            key,
            op,
            attempted_at: Utc::now().timestamp(),
        });
        self.inner.sync_notify.notify_one();
    }

    fn sync_allowed(&self) -> bool {
        self.get(SettingKey::SyncEnabled).as_bool().unwrap_or(true)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Structured snapshot of all four raw layers plus the effective map.
    pub fn export(&self) -> ConfigExport {
        let layers = self.layers();
        let mut effective = BTreeMap::new();
        for key in SettingKey::ALL {
            effective.insert(key.path().to_string(), layers.resolve(*key));
        }
        let pending_sync = self
            .queue()
            .iter()
            .map(|entry| PendingSyncExport {
                path: entry.key.path().to_string(),
                op: match entry.op {
                    SyncOp::Set(_) => "set",
                    SyncOp::Remove => "remove",
                },
                attempted_at: entry.attempted_at,
            })
            .collect();
        ConfigExport {
            embed: by_path(&layers.embed),
            user: by_path(&layers.user),
            site: by_path(&layers.site),
            local: by_path(&layers.local),
            effective,
            logged_in: layers.logged_in,
            online: self.is_online(),
            pending_sync,
        }
    }

    fn layers(&self) -> MutexGuard<'_, LayerSnapshot> {
        self.inner
            .layers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn queue(&self) -> MutexGuard<'_, SyncQueue> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn by_path(layer: &HashMap<SettingKey, SettingValue>) -> BTreeMap<String, SettingValue> {
    layer
        .iter()
        .map(|(key, value)| (key.path().to_string(), value.clone()))
        .collect()
}

fn known_key(path: &str) -> Option<SettingKey> {
    let key = SettingKey::from_path(path);
    if key.is_none() {
        tracing::warn!("Unknown setting path: {path}");
    }
    key
}
