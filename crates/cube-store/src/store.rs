//! `CubeStore`: admission, contest resolution, and the public read API
//! (spec §4.3).

use crate::backend::Backend;
use crate::config::StoreConfig;
use crate::contest::{self, Winner};
use crate::error::Result;
use crate::index;
use cube_core::cube::parse_core;
use cube_core::{CancelToken, Cube, CubeKey, CubeType, Field, FieldType, CUBE_SIZE};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub enum CubeInput {
    Binary(Box<[u8; CUBE_SIZE]>),
    Cube(Cube),
}

impl From<[u8; CUBE_SIZE]> for CubeInput {
    fn from(binary: [u8; CUBE_SIZE]) -> Self {
        CubeInput::Binary(Box::new(binary))
    }
}

impl From<Cube> for CubeInput {
    fn from(cube: Cube) -> Self {
        CubeInput::Cube(cube)
    }
}

/// Lightweight admission summary: the heavy binary/TLV payload is fetched
/// lazily via `binary()`/`cube()` against the owning store.
#[derive(Clone)]
pub struct CubeInfo {
    pub key: CubeKey,
    pub cube_type: CubeType,
    pub date: u64,
    pub difficulty: u32,
    pub update_count: Option<u32>,
    backend: Arc<Backend>,
}

impl CubeInfo {
    pub fn binary(&self) -> Result<Option<[u8; CUBE_SIZE]>> {
        match self.backend.cubes.get(self.key.as_bytes())? {
            Some(bytes) => match <[u8; CUBE_SIZE]>::try_from(bytes.as_ref()) {
                Ok(arr) => Ok(Some(arr)),
                Err(_) => Ok(None),
            },
            None => Ok(None),
        }
    }

    pub fn cube(&self, required_difficulty: u32) -> Result<Option<Cube>> {
        match self.binary()? {
            Some(binary) => Ok(Some(Cube::from_binary(binary, required_difficulty)?)),
            None => Ok(None),
        }
    }
}

#[derive(Clone)]
pub struct CubeAddedEvent {
    pub info: CubeInfo,
}

#[derive(Clone)]
pub struct NotificationAddedEvent {
    pub recipient: [u8; 32],
    pub info: CubeInfo,
}

/// Owned snapshot of the replaced record's positional fields, taken before
/// its backing binary goes out of scope (spec §4.3 step 7-8: the old
/// index entries must be located and removed on replacement).
struct PrevSummary {
    cube_type: CubeType,
    date: u64,
    difficulty: u32,
    update_count: Option<u32>,
    notify: Option<[u8; 32]>,
}

pub struct CubeStore {
    config: StoreConfig,
    backend: Arc<Backend>,
    cube_added_tx: broadcast::Sender<CubeAddedEvent>,
    notification_added_tx: broadcast::Sender<NotificationAddedEvent>,
    eviction_cancel: CancelToken,
    eviction_handle: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl CubeStore {
    /// Open the backend and, if configured, start the eviction task.
    /// `readyPromise` in the spec resolves immediately after this returns,
    /// since the backend opens synchronously.
    pub fn open(config: StoreConfig) -> Result<Arc<Self>> {
        let backend = Arc::new(Backend::open(&config)?);
        let (cube_added_tx, _) = broadcast::channel(1024);
        let (notification_added_tx, _) = broadcast::channel(1024);
        let store = Arc::new(Self {
            config,
            backend,
            cube_added_tx,
            notification_added_tx,
            eviction_cancel: CancelToken::new(),
            eviction_handle: parking_lot::Mutex::new(None),
        });
        if store.config.enable_cube_retention_policy {
            let handle = crate::eviction::spawn(store.clone());
            *store.eviction_handle.lock() = Some(handle);
        }
        Ok(store)
    }

    pub async fn ready(&self) -> Result<()> {
        Ok(())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    pub fn subscribe_cube_added(&self) -> broadcast::Receiver<CubeAddedEvent> {
        self.cube_added_tx.subscribe()
    }

    pub fn subscribe_notification_added(&self) -> broadcast::Receiver<NotificationAddedEvent> {
        self.notification_added_tx.subscribe()
    }

    /// Admit a Cube (spec §4.3 `addCube`). Returns `Ok(None)` for every
    /// ordinary rejection (failed validation, difficulty floor, lost
    /// contest); `Err` only for a same-key type conflict or a backend
    /// failure.
    pub async fn add_cube(&self, input: impl Into<CubeInput>) -> Result<Option<CubeInfo>> {
        let (mut binary, auto_increment_pmuc) = match input.into() {
            CubeInput::Binary(binary) => (*binary, false),
            CubeInput::Cube(mut cube) => {
                if !cube.is_compiled() {
                    cube.compile(CancelToken::new()).await?;
                }
                let is_pmuc = cube.cube_type().lifecycle() == cube_core::Lifecycle::Pmuc;
                let current = cube.get_update_count().unwrap_or(0);
                let auto = is_pmuc && current == 0;
                let binary = *cube.binary().expect("just compiled");
                (binary, auto)
            }
        };

        let incoming_view = match parse_core(&binary) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "rejecting cube: failed to parse core");
                return Ok(None);
            }
        };
        let candidate = Cube::from_binary(binary, self.config.required_difficulty)?;
        if !candidate.validate() {
            debug!("rejecting cube: failed validation (hashcash, signature, or notify layout)");
            return Ok(None);
        }
        let key = candidate.get_key()?;

        let existing_bytes = self.backend.cubes.get(key.as_bytes())?;
        let previous = match &existing_bytes {
            Some(bytes) => match <[u8; CUBE_SIZE]>::try_from(bytes.as_ref()) {
                Ok(existing_arr) => {
                    let local_view = parse_core(&existing_arr)?;
                    let winner = contest::resolve(key, &local_view, &existing_arr, &incoming_view, &binary)?;
                    if winner == Winner::Local {
                        return Ok(None);
                    }
                    Some(PrevSummary {
                        cube_type: local_view.cube_type,
                        date: local_view.date,
                        difficulty: contest::achieved_difficulty(&existing_arr),
                        update_count: local_view.update_count,
                        notify: local_view.notify.copied(),
                    })
                }
                Err(_) => {
                    warn!("corrupt existing cube entry at key; treating incoming as sole writer");
                    None
                }
            },
            None => None,
        };

        if auto_increment_pmuc {
            let previous_count = previous.as_ref().and_then(|p| p.update_count).unwrap_or(0);
            let next_count = previous_count.max(incoming_view.update_count.unwrap_or(0)) + 1;
            let mut cube = Cube::from_binary(binary, self.config.required_difficulty)?;
            cube.begin_edit()?;
            cube.set_field(
                Field::new(FieldType::PmucUpdateCount, next_count.to_be_bytes().to_vec())
                    .map_err(cube_core::Error::Field)?,
            );
            binary = *cube.compile(CancelToken::new()).await?;
        }

        self.finish_admission(key, binary, previous).await
    }

    async fn finish_admission(
        &self,
        key: CubeKey,
        binary: [u8; CUBE_SIZE],
        previous: Option<PrevSummary>,
    ) -> Result<Option<CubeInfo>> {
        let view = parse_core(&binary)?;
        let difficulty = contest::achieved_difficulty(&binary);

        if let Some(prev) = &previous {
            self.backend.index_date.remove(index::date_key(prev.date, &key))?;
            self.backend.index_diff.remove(index::diff_key(prev.difficulty, &key))?;
            if prev.cube_type.is_notify() {
                if let Some(recipient) = prev.notify {
                    self.backend
                        .index_notify_date
                        .remove(index::notify_date_key(&recipient, prev.date, &key))?;
                    self.backend
                        .index_notify_diff
                        .remove(index::notify_diff_key(&recipient, prev.difficulty, &key))?;
                }
            }
        }

        self.backend.cubes.insert(key.as_bytes(), binary.to_vec())?;
        self.backend.index_date.insert(index::date_key(view.date, &key), &[])?;
        self.backend.index_diff.insert(index::diff_key(difficulty, &key), &[])?;

        let mut notification_recipient = None;
        if view.cube_type.is_notify() {
            if let Some(recipient) = view.notify {
                self.backend
                    .index_notify_date
                    .insert(index::notify_date_key(recipient, view.date, &key), &[])?;
                self.backend
                    .index_notify_diff
                    .insert(index::notify_diff_key(recipient, difficulty, &key), &[])?;
                notification_recipient = Some(*recipient);
            }
        }

        let info = CubeInfo {
            key,
            cube_type: view.cube_type,
            date: view.date,
            difficulty,
            update_count: view.update_count,
            backend: self.backend.clone(),
        };

        let _ = self.cube_added_tx.send(CubeAddedEvent { info: info.clone() });
        if let Some(recipient) = notification_recipient {
            let _ = self
                .notification_added_tx
                .send(NotificationAddedEvent { recipient, info: info.clone() });
        }

        Ok(Some(info))
    }

    pub fn get_cube(&self, key: &CubeKey) -> Result<Option<Cube>> {
        match self.backend.cubes.get(key.as_bytes())? {
            Some(bytes) => match <[u8; CUBE_SIZE]>::try_from(bytes.as_ref()) {
                Ok(binary) => Ok(Some(Cube::from_binary(binary, self.config.required_difficulty)?)),
                Err(_) => {
                    warn!("corrupt cube binary at key; reporting as absent");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn get_cube_info(&self, key: &CubeKey) -> Result<Option<CubeInfo>> {
        match self.backend.cubes.get(key.as_bytes())? {
            Some(bytes) => match <[u8; CUBE_SIZE]>::try_from(bytes.as_ref()) {
                Ok(binary) => match parse_core(&binary) {
                    Ok(view) => Ok(Some(CubeInfo {
                        key: *key,
                        cube_type: view.cube_type,
                        date: view.date,
                        difficulty: contest::achieved_difficulty(&binary),
                        update_count: view.update_count,
                        backend: self.backend.clone(),
                    })),
                    Err(_) => Ok(None),
                },
                Err(_) => Ok(None),
            },
            None => Ok(None),
        }
    }

    pub fn get_key_range(&self, opts: crate::range::RangeOpts) -> Result<Vec<crate::range::YieldedKey>> {
        crate::range::key_range(&self.backend, opts)
    }

    pub fn get_cube_info_range(&self, opts: crate::range::RangeOpts) -> Result<Vec<CubeInfo>> {
        use crate::range::YieldedKey;
        let keys = crate::range::key_range(&self.backend, opts)?;
        let mut out = Vec::with_capacity(keys.len());
        for yk in keys {
            let bytes = match yk {
                YieldedKey::Raw(b) => b,
                YieldedKey::Hex(h) => hex::decode(h).unwrap_or_default(),
            };
            if bytes.len() != 32 {
                continue;
            }
            let mut arr = [0u8; 32];
            arr.copy_from_slice(&bytes);
            if let Some(info) = self.get_cube_info(&CubeKey(arr))? {
                out.push(info);
            }
        }
        Ok(out)
    }

    /// Walk the notification-date index for `recipient`, skipping stale
    /// entries whose Cube no longer exists (spec §4.3).
    pub fn get_notification_cube_infos(&self, recipient: &[u8; 32]) -> Result<Vec<CubeInfo>> {
        let lower = index::notify_prefix_lower(recipient);
        let upper = index::notify_prefix_upper(recipient);
        let mut out = Vec::new();
        for entry in self.backend.index_notify_date.range(lower..upper) {
            let (k, _) = entry?;
            let Some(cube_key) = index::key_suffix(&k) else { continue };
            if let Some(info) = self.get_cube_info(&cube_key)? {
                out.push(info);
            }
        }
        Ok(out)
    }

    pub fn get_notifications(&self, recipient: &[u8; 32]) -> Result<Vec<Cube>> {
        let infos = self.get_notification_cube_infos(recipient)?;
        let mut out = Vec::with_capacity(infos.len());
        for info in infos {
            if let Some(cube) = self.get_cube(&info.key)? {
                out.push(cube);
            }
        }
        Ok(out)
    }

    /// Close the backend and stop the eviction task. Pending event
    /// receivers simply stop seeing new events; sled flushes on drop too,
    /// but we flush explicitly for a clean shutdown signal in logs.
    pub async fn shutdown(&self) -> Result<()> {
        self.eviction_cancel.cancel();
        let handle = self.eviction_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.backend.flush()?;
        Ok(())
    }

    pub(crate) fn eviction_cancel(&self) -> CancelToken {
        self.eviction_cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{RangeOpts, Sublevel};
    use cube_core::{CubeKeys, CubeType, Layout};
    use ed25519_dalek::SigningKey;

    fn test_store() -> Arc<CubeStore> {
        let config = StoreConfig {
            required_difficulty: 0,
            ..StoreConfig::default()
        };
        CubeStore::open(config).unwrap()
    }

    async fn frozen_cube(payload: &[u8]) -> Cube {
        let fields = vec![Field::payload(payload.to_vec()).unwrap()];
        let mut cube = Cube::create(CubeType::Frozen, fields, CubeKeys::default(), 0).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();
        cube
    }

    #[tokio::test]
    async fn add_and_get_frozen_cube() {
        let store = test_store();
        let cube = frozen_cube(b"hello cube store").await;
        let key = cube.get_key().unwrap();
        let info = store.add_cube(cube).await.unwrap().expect("admitted");
        assert_eq!(info.key, key);

        let fetched = store.get_cube(&key).unwrap().expect("present");
        assert!(fetched.validate());
    }

    #[tokio::test]
    async fn duplicate_frozen_payload_resolves_by_tiebreak() {
        let store = test_store();
        let cube_a = frozen_cube(b"same payload").await;
        let key = cube_a.get_key().unwrap();
        let binary_a = *cube_a.binary().unwrap();

        let first = store.add_cube(binary_a).await.unwrap();
        assert!(first.is_some());
        // identical binary at the same key: resolves by contest tie-break
        // (keep local), still reachable afterward.
        let second = store.add_cube(binary_a).await.unwrap();
        assert!(second.is_none() || second.unwrap().key == key);
        assert!(store.get_cube(&key).unwrap().is_some());
    }

    #[tokio::test]
    async fn muc_newer_date_replaces_older() {
        let store = test_store();
        let signing_key = SigningKey::from_bytes(&[11u8; 32]);

        let fields_a = vec![Field::payload(b"v1".to_vec()).unwrap()];
        let mut cube_a = Cube::create(CubeType::Muc, fields_a, CubeKeys::signed(signing_key.clone()), 0).unwrap();
        cube_a.set_date(1_000);
        cube_a.compile(CancelToken::new()).await.unwrap();
        let key = cube_a.get_key().unwrap();
        store.add_cube(*cube_a.binary().unwrap()).await.unwrap().expect("admitted v1");

        let fields_b = vec![Field::payload(b"v2".to_vec()).unwrap()];
        let mut cube_b = Cube::create(CubeType::Muc, fields_b, CubeKeys::signed(signing_key), 0).unwrap();
        cube_b.set_date(2_000);
        cube_b.compile(CancelToken::new()).await.unwrap();
        assert_eq!(cube_b.get_key().unwrap(), key);
        let info = store.add_cube(*cube_b.binary().unwrap()).await.unwrap().expect("admitted v2");
        assert_eq!(info.key, key);

        let stored = store.get_cube(&key).unwrap().unwrap();
        let payload = stored.first_of_type(FieldType::Payload).unwrap().unwrap();
        assert_eq!(payload.value, b"v2".to_vec());
    }

    #[tokio::test]
    async fn muc_older_date_is_rejected() {
        let store = test_store();
        let signing_key = SigningKey::from_bytes(&[22u8; 32]);

        let fields_a = vec![Field::payload(b"v1".to_vec()).unwrap()];
        let mut cube_a = Cube::create(CubeType::Muc, fields_a, CubeKeys::signed(signing_key.clone()), 0).unwrap();
        cube_a.set_date(2_000);
        cube_a.compile(CancelToken::new()).await.unwrap();
        let key = cube_a.get_key().unwrap();
        store.add_cube(*cube_a.binary().unwrap()).await.unwrap().expect("admitted v1");

        let fields_b = vec![Field::payload(b"older".to_vec()).unwrap()];
        let mut cube_b = Cube::create(CubeType::Muc, fields_b, CubeKeys::signed(signing_key), 0).unwrap();
        cube_b.set_date(1_000);
        cube_b.compile(CancelToken::new()).await.unwrap();
        let rejected = store.add_cube(*cube_b.binary().unwrap()).await.unwrap();
        assert!(rejected.is_none());

        let stored = store.get_cube(&key).unwrap().unwrap();
        let payload = stored.first_of_type(FieldType::Payload).unwrap().unwrap();
        assert_eq!(payload.value, b"v1".to_vec());
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let store = test_store();
        let signing_key = SigningKey::from_bytes(&[44u8; 32]);
        let fields = vec![Field::payload(b"forge me".to_vec()).unwrap()];
        let mut cube = Cube::create(CubeType::Muc, fields, CubeKeys::signed(signing_key), 0).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();

        let mut binary = *cube.binary().unwrap();
        let layout = Layout::for_type(CubeType::Muc);
        let sig_offset = layout.signature_offset.unwrap();
        binary[sig_offset] ^= 0xFF;

        let rejected = store.add_cube(binary).await.unwrap();
        assert!(rejected.is_none());
    }

    #[tokio::test]
    async fn pmuc_auto_increment_on_cube_input() {
        let store = test_store();
        let signing_key = SigningKey::from_bytes(&[33u8; 32]);
        let fields = vec![Field::payload(b"pmuc v1".to_vec()).unwrap()];
        let cube = Cube::create(CubeType::Pmuc, fields, CubeKeys::signed(signing_key), 0).unwrap();
        let info = store.add_cube(cube).await.unwrap().expect("admitted");
        assert_eq!(info.update_count, Some(1));
    }

    #[tokio::test]
    async fn notification_index_roundtrip() {
        let store = test_store();
        let recipient = [0x77u8; 32];
        let fields = vec![Field::payload(b"you have mail".to_vec()).unwrap()];
        let keys = CubeKeys::default().with_notify(recipient);
        let mut cube = Cube::create(CubeType::FrozenNotify, fields, keys, 0).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();
        let key = cube.get_key().unwrap();
        store.add_cube(cube).await.unwrap().expect("admitted");

        let notifications = store.get_notification_cube_infos(&recipient).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].key, key);
    }

    #[tokio::test]
    async fn get_key_range_respects_limit() {
        let store = test_store();
        for i in 0..5u8 {
            let cube = frozen_cube(&[i; 8]).await;
            store.add_cube(cube).await.unwrap();
        }
        let keys = store
            .get_key_range(RangeOpts::new().sublevel(Sublevel::Cubes).limit(3))
            .unwrap();
        assert_eq!(keys.len(), 3);
    }

    #[tokio::test]
    async fn conflicting_type_at_same_key_is_an_error() {
        // A signer reusing the same Ed25519 key for both a MUC and a PMUC
        // collides at the same key byte-for-byte; admission must reject
        // the second with a hard error rather than silently overwriting.
        let store = test_store();
        let signing_key = SigningKey::from_bytes(&[44u8; 32]);

        let fields_a = vec![Field::payload(b"as muc".to_vec()).unwrap()];
        let mut cube_a = Cube::create(CubeType::Muc, fields_a, CubeKeys::signed(signing_key.clone()), 0).unwrap();
        cube_a.compile(CancelToken::new()).await.unwrap();
        store.add_cube(*cube_a.binary().unwrap()).await.unwrap().expect("admitted muc");

        let fields_b = vec![Field::payload(b"as pmuc".to_vec()).unwrap()];
        let mut cube_b = Cube::create(CubeType::Pmuc, fields_b, CubeKeys::signed(signing_key), 0).unwrap();
        cube_b.compile(CancelToken::new()).await.unwrap();
        let result = store.add_cube(*cube_b.binary().unwrap()).await;
        assert!(matches!(result, Err(crate::error::Error::ConflictingTypes(_))));
    }
}
