//! `Identity`: a signed self-record with chained extension Cubes, a post
//! set, and a subscription set (spec §4.5).

use crate::error::{Error, Result};
use crate::keys;
use crate::registry::IdentityStore;
use crate::set::KeySet;
use cube_core::cube::Layout;
use cube_core::relationship::{Relationship, RelationshipType};
use cube_core::{CancelToken, Cube, CubeKey, CubeKeys, CubeType, Field, FieldType, Lifecycle, CUBE_SIZE};
use cube_store::CubeStore;
use ed25519_dalek::SigningKey;
use retriever::{Retriever, VeritumRetrievalInterface};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret as X25519Secret};

/// Encoded size of one RELATES_TO entry (2-byte header + 33-byte value),
/// the same reservation `veritum::CONTINUED_IN_LEN` makes for its own
/// chaining field.
const RELATES_TO_ENTRY_LEN: usize = 35;
const APPLICATION_ID: &[u8] = b"ID";

pub struct IdentityOptions {
    pub required_difficulty: u32,
    /// Root lifecycle: PMUC (reconciled by update count) when `true`,
    /// plain MUC (reconciled by date) otherwise.
    pub pmuc: bool,
    pub notify_recipient: Option<[u8; 32]>,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            required_difficulty: 0,
            pmuc: true,
            notify_recipient: None,
        }
    }
}

/// A single yielded post (spec §4.5 `getPosts`).
pub enum Post {
    Cube(Cube),
    Veritum(veritum::Veritum),
}

pub enum PostFormat {
    FirstChunk,
    Veritum,
}

/// A cached, already-compiled extension Cube plus the field list it was
/// built from, so an unchanged extension can be reused verbatim on the
/// next `store()` instead of being re-signed and re-mined (spec §4.5
/// "only the tail extension and the root are re-signed").
struct ExtensionSlot {
    fields: Vec<Field>,
    cube: Cube,
}

pub struct Identity {
    key: CubeKey,
    cube_store: Arc<CubeStore>,
    master_key: Option<[u8; 32]>,
    signing_key: Option<SigningKey>,
    encryption_secret: Option<X25519Secret>,
    encryption_public: Option<X25519Public>,
    root_type: CubeType,
    notify_recipient: Option<[u8; 32]>,
    required_difficulty: u32,
    username: parking_lot::RwLock<String>,
    avatar: parking_lot::RwLock<Option<[u8; 7]>>,
    illustration: parking_lot::RwLock<Option<[u8; 32]>>,
    posts: parking_lot::RwLock<KeySet>,
    subscriptions: parking_lot::RwLock<KeySet>,
    extensions: parking_lot::RwLock<Vec<ExtensionSlot>>,
    min_rebuild_delay: Duration,
    last_commit: parking_lot::Mutex<Option<Instant>>,
    pending_commit: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Identity {
    /// Derive a fresh master key/signing/encryption keypair, instantiate
    /// an empty root Cube, and commit it (spec §4.5 `Create`).
    pub async fn create(
        cube_store: Arc<CubeStore>,
        registry: &IdentityStore,
        username: &str,
        passphrase: &str,
        opts: IdentityOptions,
    ) -> Result<Arc<Identity>> {
        let config = cube_store.config().clone();
        let master_key = keys::derive_master_key(
            username,
            passphrase,
            config.argon_cpu_hardness,
            config.argon_memory_hardness,
        )?;
        let signing_key = keys::derive_signing_key(&master_key);
        let (encryption_secret, encryption_public) = cube_core::crypto::derive_x25519_keypair(&signing_key);
        let avatar_seed = keys::derive_avatar_seed(&master_key);
        let key = CubeKey(signing_key.verifying_key().to_bytes());

        let registry_key = registry_key_for(&cube_store, &key);
        if let Some(existing) = registry.get(&registry_key) {
            return Ok(existing);
        }

        let root_type = root_cube_type(opts.pmuc, opts.notify_recipient.is_some());
        let identity = Arc::new(Identity {
            key,
            cube_store,
            master_key: Some(master_key),
            signing_key: Some(signing_key),
            encryption_secret: Some(encryption_secret),
            encryption_public: Some(encryption_public),
            root_type,
            notify_recipient: opts.notify_recipient,
            required_difficulty: opts.required_difficulty,
            username: parking_lot::RwLock::new(username.to_string()),
            avatar: parking_lot::RwLock::new(Some(avatar_with_default_scheme(avatar_seed))),
            illustration: parking_lot::RwLock::new(None),
            posts: parking_lot::RwLock::new(KeySet::new()),
            subscriptions: parking_lot::RwLock::new(KeySet::new()),
            extensions: parking_lot::RwLock::new(Vec::new()),
            min_rebuild_delay: config.min_muc_rebuild_delay,
            last_commit: parking_lot::Mutex::new(None),
            pending_commit: parking_lot::Mutex::new(None),
        });
        let identity = registry.get_or_register(registry_key, identity);
        identity.store().await?;
        Ok(identity)
    }

    /// Parse an already-fetched root Cube and walk its relationships
    /// (spec §4.5 `Construct`). The returned Identity has no signing
    /// capability — it is a read-only view of someone else's record.
    pub fn construct(cube_store: Arc<CubeStore>, registry: &IdentityStore, root: Cube) -> Result<Arc<Identity>> {
        Self::from_root(cube_store, registry, root, None)
    }

    /// Derive the key from credentials, fetch the root via `source`, and
    /// `Construct` from it (spec §4.5 `Load`). `Ok(None)` if the root is
    /// unavailable.
    pub async fn load(
        source: &dyn VeritumRetrievalInterface,
        cube_store: Arc<CubeStore>,
        registry: &IdentityStore,
        username: &str,
        passphrase: &str,
    ) -> Result<Option<Arc<Identity>>> {
        let config = cube_store.config().clone();
        let master_key = keys::derive_master_key(
            username,
            passphrase,
            config.argon_cpu_hardness,
            config.argon_memory_hardness,
        )?;
        let signing_key = keys::derive_signing_key(&master_key);
        let key = CubeKey(signing_key.verifying_key().to_bytes());
        let Some(root) = source.get_cube(key).await else {
            return Ok(None);
        };
        Ok(Some(Self::from_root(cube_store, registry, root, Some(master_key))?))
    }

    fn from_root(
        cube_store: Arc<CubeStore>,
        registry: &IdentityStore,
        root: Cube,
        master_key: Option<[u8; 32]>,
    ) -> Result<Arc<Identity>> {
        let root_type = root.cube_type();
        let key = root.get_key()?;
        if !matches!(root_type.lifecycle(), Lifecycle::Muc | Lifecycle::Pmuc) {
            return Err(Error::NotAnIdentityRoot(key));
        }

        let registry_key = registry_key_for(&cube_store, &key);
        if let Some(existing) = registry.get(&registry_key) {
            return Ok(existing);
        }

        let fields = root.fields()?;
        let username = fields
            .iter()
            .find(|f| f.field_type == FieldType::Username)
            .and_then(|f| f.as_str())
            .unwrap_or_default()
            .to_string();
        let avatar = fields
            .iter()
            .find(|f| f.field_type == FieldType::Avatar)
            .and_then(|f| <[u8; 7]>::try_from(f.value.as_slice()).ok());
        let illustration = fields
            .iter()
            .filter_map(Relationship::from_field)
            .find(|rel| rel.rel_type == RelationshipType::Illustration)
            .map(|rel| rel.target);

        let notify_recipient = if root_type.is_notify() {
            root.binary()
                .and_then(|b| cube_core::cube::parse_core(b).ok())
                .and_then(|v| v.notify.copied())
        } else {
            None
        };

        let mut posts = KeySet::new();
        let mut subscriptions = KeySet::new();
        let mut visited = HashSet::new();
        visited.insert(key.0);
        walk_relationships(&cube_store, &fields, &mut posts, &mut subscriptions, &mut visited)?;

        let (signing_key, encryption_secret, encryption_public) = match &master_key {
            Some(mk) => {
                let sk = keys::derive_signing_key(mk);
                let (esec, epub) = cube_core::crypto::derive_x25519_keypair(&sk);
                (Some(sk), Some(esec), Some(epub))
            }
            None => (None, None, None),
        };

        let config = cube_store.config().clone();
        let identity = Arc::new(Identity {
            key,
            cube_store,
            master_key,
            signing_key,
            encryption_secret,
            encryption_public,
            root_type,
            notify_recipient,
            required_difficulty: config.required_difficulty,
            username: parking_lot::RwLock::new(username),
            avatar: parking_lot::RwLock::new(avatar),
            illustration: parking_lot::RwLock::new(illustration),
            posts: parking_lot::RwLock::new(posts),
            subscriptions: parking_lot::RwLock::new(subscriptions),
            extensions: parking_lot::RwLock::new(Vec::new()),
            min_rebuild_delay: config.min_muc_rebuild_delay,
            last_commit: parking_lot::Mutex::new(Some(Instant::now())),
            pending_commit: parking_lot::Mutex::new(None),
        });
        Ok(registry.get_or_register(registry_key, identity))
    }

    pub fn key(&self) -> CubeKey {
        self.key
    }

    pub fn username(&self) -> String {
        self.username.read().clone()
    }

    pub fn set_username(&self, username: impl Into<String>) {
        *self.username.write() = username.into();
    }

    pub fn avatar(&self) -> Option<[u8; 7]> {
        *self.avatar.read()
    }

    pub fn set_illustration(&self, key: CubeKey) {
        *self.illustration.write() = Some(key.0);
    }

    pub fn illustration(&self) -> Option<CubeKey> {
        self.illustration.read().map(CubeKey)
    }

    pub fn encryption_public_key(&self) -> Option<X25519Public> {
        self.encryption_public
    }

    /// Idempotent: a key already present leaves `get_post_count`
    /// unchanged (spec §8 "Idempotent sets").
    pub fn add_post(&self, key: CubeKey) -> bool {
        self.posts.write().insert(key.0)
    }

    pub fn has_post(&self, key: &CubeKey) -> bool {
        self.posts.read().contains(&key.0)
    }

    pub fn get_post_count(&self) -> usize {
        self.posts.read().len()
    }

    pub fn get_post_keys(&self) -> Vec<CubeKey> {
        self.posts.read().keys().into_iter().map(CubeKey).collect()
    }

    pub fn add_public_subscription(&self, key: CubeKey) -> bool {
        self.subscriptions.write().insert(key.0)
    }

    pub fn has_public_subscription(&self, key: &CubeKey) -> bool {
        self.subscriptions.read().contains(&key.0)
    }

    pub fn get_public_subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn get_public_subscription_keys(&self) -> Vec<CubeKey> {
        self.subscriptions.read().keys().into_iter().map(CubeKey).collect()
    }

    /// Union of subscriptions reachable within `depth` indirect hops
    /// beyond the direct set; cycles do not inflate the result (spec
    /// §4.5 `recursiveWebOfSubscriptions`).
    pub async fn recursive_web_of_subscriptions(
        &self,
        depth: u32,
        source: &dyn VeritumRetrievalInterface,
    ) -> Result<HashSet<[u8; 32]>> {
        let mut visited_identities: HashSet<[u8; 32]> = HashSet::new();
        visited_identities.insert(self.key.0);

        let mut result: HashSet<[u8; 32]> = HashSet::new();
        let mut frontier = self.subscriptions.read().keys();
        for k in &frontier {
            result.insert(*k);
            visited_identities.insert(*k);
        }

        for _ in 0..depth {
            let mut next_frontier = Vec::new();
            for id_key in &frontier {
                let Some(root) = source.get_cube(CubeKey(*id_key)).await else {
                    continue;
                };
                if !matches!(root.cube_type().lifecycle(), Lifecycle::Muc | Lifecycle::Pmuc) {
                    continue;
                }
                let Ok(fields) = root.fields() else { continue };
                for rel in fields.iter().filter_map(Relationship::from_field) {
                    if rel.rel_type != RelationshipType::SubscriptionRecommendation {
                        continue;
                    }
                    if result.insert(rel.target) && visited_identities.insert(rel.target) {
                        next_frontier.push(rel.target);
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }
        Ok(result)
    }

    /// Yield each post as a first Cube chunk or a reassembled Veritum,
    /// decrypting automatically when this Identity holds the matching
    /// private key (spec §4.5 `getPosts`).
    pub async fn get_posts(&self, format: PostFormat, retriever: &Retriever) -> Result<Vec<Post>> {
        let mut out = Vec::new();
        let keys = self.posts.read().keys();
        for key in keys {
            match format {
                PostFormat::FirstChunk => {
                    if let Some(cube) = self.cube_store.get_cube(&CubeKey(key))? {
                        out.push(Post::Cube(cube));
                    }
                }
                PostFormat::Veritum => {
                    let decode_opts = veritum::DecodeOptions {
                        recipient_private_key: self.encryption_secret.clone(),
                    };
                    if let Some(v) = retriever.get_veritum(CubeKey(key), decode_opts).await? {
                        out.push(Post::Veritum(v));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Recompute the root (and, if needed, extension) Cubes from current
    /// in-memory state, commit them (subject to the rebuild-delay
    /// debounce), and return the freshly compiled root (spec §4.5
    /// `store`).
    pub async fn store(self: &Arc<Self>) -> Result<Cube> {
        let (root, extensions) = self.rebuild().await?;
        let root_binary = *root.binary().expect("just compiled");
        let ext_binaries: Vec<[u8; CUBE_SIZE]> = extensions
            .iter()
            .map(|c| *c.binary().expect("just compiled"))
            .collect();

        let last = *self.last_commit.lock();
        let due_now = last.map(|t| t.elapsed() >= self.min_rebuild_delay).unwrap_or(true);
        if due_now {
            self.commit_now(root_binary, ext_binaries).await?;
        } else {
            self.schedule_debounced_commit(root_binary, ext_binaries);
        }
        Ok(root)
    }

    async fn commit_now(&self, root_binary: [u8; CUBE_SIZE], ext_binaries: Vec<[u8; CUBE_SIZE]>) -> Result<()> {
        for binary in ext_binaries {
            self.cube_store.add_cube(binary).await?;
        }
        self.cube_store.add_cube(root_binary).await?;
        *self.last_commit.lock() = Some(Instant::now());
        Ok(())
    }

    fn schedule_debounced_commit(self: &Arc<Self>, root_binary: [u8; CUBE_SIZE], ext_binaries: Vec<[u8; CUBE_SIZE]>) {
        let last = *self.last_commit.lock();
        let elapsed = last.map(|t| t.elapsed()).unwrap_or(self.min_rebuild_delay);
        let delay = self.min_rebuild_delay.saturating_sub(elapsed);

        let identity = self.clone();
        let mut pending = self.pending_commit.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = identity.commit_now(root_binary, ext_binaries).await {
                warn!(error = %e, "debounced identity commit failed");
            }
            *identity.pending_commit.lock() = None;
        }));
    }

    async fn rebuild(&self) -> Result<(Cube, Vec<Cube>)> {
        let signing_key = self.signing_key.clone().ok_or(Error::NoSigningCapability)?;
        let master_key = self.master_key.expect("signing_key implies master_key is set");

        let mut header_fields = Vec::new();
        header_fields.push(Field::new(FieldType::Application, APPLICATION_ID.to_vec())?);
        header_fields.push(Field::new(FieldType::Username, self.username.read().clone().into_bytes())?);
        if let Some(avatar) = *self.avatar.read() {
            header_fields.push(Field::new(FieldType::Avatar, avatar.to_vec())?);
        }
        if let Some(illustration) = *self.illustration.read() {
            header_fields.push(Relationship::new(RelationshipType::Illustration, illustration).to_field());
        }
        let header_len: usize = header_fields.iter().map(|f| f.encoded_len()).sum();

        let mut entries = Vec::new();
        for key in self.posts.read().keys() {
            entries.push(Relationship::new(RelationshipType::MyPost, key).to_field());
        }
        for key in self.subscriptions.read().keys() {
            entries.push(Relationship::new(RelationshipType::SubscriptionRecommendation, key).to_field());
        }

        let chunks = pack_relates_to(&entries, header_len, self.root_type)?;
        let ext_chunks = &chunks[1..];

        let mut built: Vec<Cube> = Vec::with_capacity(ext_chunks.len());
        let mut next_index_field: Option<Field> = None;
        for (index, chunk_entries) in ext_chunks.iter().enumerate().rev() {
            let mut fields = chunk_entries.clone();
            if let Some(idx_field) = next_index_field.take() {
                fields.push(idx_field);
            }
            let ext_signing_key = keys::derive_extension_signing_key(&master_key, index as u8);
            let cube = self.build_or_reuse_extension(index, fields, ext_signing_key).await?;
            next_index_field = Some(Relationship::new(RelationshipType::SubscriptionRecommendationIndex, cube.get_key()?.0).to_field());
            built.push(cube);
        }
        built.reverse();
        self.extensions.write().truncate(ext_chunks.len());

        let mut root_fields = header_fields;
        root_fields.extend(chunks[0].clone());
        if let Some(idx_field) = next_index_field {
            root_fields.push(idx_field);
        }

        let mut root_keys = CubeKeys::signed(signing_key);
        if let Some(recipient) = self.notify_recipient {
            root_keys = root_keys.with_notify(recipient);
        }
        let mut root_cube = Cube::create(self.root_type, root_fields, root_keys, self.required_difficulty)?;
        root_cube.compile(CancelToken::new()).await?;

        Ok((root_cube, built))
    }

    async fn build_or_reuse_extension(&self, index: usize, fields: Vec<Field>, signing_key: SigningKey) -> Result<Cube> {
        {
            let cache = self.extensions.read();
            if let Some(slot) = cache.get(index) {
                if slot.fields == fields {
                    let binary = *slot.cube.binary().expect("cached extension is always compiled");
                    return Ok(Cube::from_binary(binary, self.required_difficulty)?);
                }
            }
        }

        let mut cube = Cube::create(CubeType::Muc, fields.clone(), CubeKeys::signed(signing_key), self.required_difficulty)?;
        cube.compile(CancelToken::new()).await?;
        let binary = *cube.binary().expect("just compiled");

        let mut cache = self.extensions.write();
        while cache.len() <= index {
            let placeholder = Cube::from_binary([0u8; CUBE_SIZE], 0)?;
            cache.push(ExtensionSlot {
                fields: Vec::new(),
                cube: placeholder,
            });
        }
        cache[index] = ExtensionSlot {
            fields,
            cube: Cube::from_binary(binary, self.required_difficulty)?,
        };
        Ok(Cube::from_binary(binary, self.required_difficulty)?)
    }

    /// Cancels any pending debounced commit and unregisters this Identity
    /// from `registry` (spec §4.5 `shutdown`).
    pub fn shutdown(&self, registry: &IdentityStore) {
        if let Some(handle) = self.pending_commit.lock().take() {
            handle.abort();
        }
        registry.unregister(&registry_key_for(&self.cube_store, &self.key));
    }
}

/// Greedily bin-pack RELATES_TO entries across a root chunk (with
/// `header_len` bytes already spoken for) and as many Muc extension
/// chunks as needed, each non-tail chunk reserving room for one
/// SUBSCRIPTION_RECOMMENDATION_INDEX entry (spec §4.5 "Extension-Cube
/// discipline").
fn pack_relates_to(entries: &[Field], header_len: usize, root_type: CubeType) -> Result<Vec<Vec<Field>>> {
    let root_cap = Layout::for_type(root_type).body_end - Layout::for_type(root_type).body_start;
    let ext_cap = Layout::for_type(CubeType::Muc).body_end - Layout::for_type(CubeType::Muc).body_start;

    let root_capacity_for = |reserve: bool| {
        let cap = root_cap.saturating_sub(header_len);
        if reserve {
            cap.saturating_sub(RELATES_TO_ENTRY_LEN)
        } else {
            cap
        }
    };
    let ext_capacity_for = |reserve: bool| {
        if reserve {
            ext_cap.saturating_sub(RELATES_TO_ENTRY_LEN)
        } else {
            ext_cap
        }
    };

    if entries.is_empty() {
        return Ok(vec![Vec::new()]);
    }

    let mut chunks: Vec<Vec<Field>> = vec![Vec::new()];
    let mut on_root = true;
    let mut used = 0usize;
    let mut capacity = root_capacity_for(true);

    for field in entries {
        let len = field.encoded_len();
        let hard_cap = if on_root { root_capacity_for(false) } else { ext_capacity_for(false) };
        if len > hard_cap {
            return Err(Error::Cube(cube_core::Error::FieldSize {
                needed: len,
                available: hard_cap,
            }));
        }
        if used + len > capacity {
            chunks.push(Vec::new());
            on_root = false;
            capacity = ext_capacity_for(true);
            used = 0;
        }
        chunks.last_mut().unwrap().push(field.clone());
        used += len;
    }
    Ok(chunks)
}

/// Walk MYPOST / SUBSCRIPTION_RECOMMENDATION entries in `fields`, then
/// follow the SUBSCRIPTION_RECOMMENDATION_INDEX chain through
/// `cube_store`, terminating on a cycle via `visited` (spec §4.5
/// `Construct`, §8 "Cycle tolerance").
fn walk_relationships(
    cube_store: &CubeStore,
    fields: &[Field],
    posts: &mut KeySet,
    subscriptions: &mut KeySet,
    visited: &mut HashSet<[u8; 32]>,
) -> Result<()> {
    let mut next_index = collect_relates_to(fields, posts, subscriptions);
    while let Some(index_key) = next_index.take() {
        if !visited.insert(index_key) {
            break;
        }
        let Some(ext_cube) = cube_store.get_cube(&CubeKey(index_key))? else {
            break;
        };
        let ext_fields = ext_cube.fields()?;
        next_index = collect_relates_to(&ext_fields, posts, subscriptions);
    }
    Ok(())
}

fn collect_relates_to(fields: &[Field], posts: &mut KeySet, subscriptions: &mut KeySet) -> Option<[u8; 32]> {
    let mut next_index = None;
    for rel in fields.iter().filter_map(Relationship::from_field) {
        match rel.rel_type {
            RelationshipType::MyPost => {
                posts.insert(rel.target);
            }
            RelationshipType::SubscriptionRecommendation => {
                subscriptions.insert(rel.target);
            }
            RelationshipType::SubscriptionRecommendationIndex => {
                next_index = Some(rel.target);
            }
            _ => {}
        }
    }
    next_index
}

fn root_cube_type(pmuc: bool, notify: bool) -> CubeType {
    match (pmuc, notify) {
        (false, false) => CubeType::Muc,
        (false, true) => CubeType::MucNotify,
        (true, false) => CubeType::Pmuc,
        (true, true) => CubeType::PmucNotify,
    }
}

fn avatar_with_default_scheme(seed: [u8; 5]) -> [u8; 7] {
    let mut buf = [0u8; 7];
    buf[2..].copy_from_slice(&seed);
    buf
}

fn registry_key_for(cube_store: &Arc<CubeStore>, key: &CubeKey) -> String {
    format!("{:p}:{}", Arc::as_ptr(cube_store), key.to_hex())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use cube_store::StoreConfig;

    pub fn bare_identity_for_tests() -> Arc<Identity> {
        let cube_store = CubeStore::open(StoreConfig {
            required_difficulty: 0,
            ..StoreConfig::default()
        })
        .unwrap();
        let signing_key = SigningKey::from_bytes(&[1u8; 32]);
        let key = CubeKey(signing_key.verifying_key().to_bytes());
        Arc::new(Identity {
            key,
            cube_store,
            master_key: None,
            signing_key: None,
            encryption_secret: None,
            encryption_public: None,
            root_type: CubeType::Muc,
            notify_recipient: None,
            required_difficulty: 0,
            username: parking_lot::RwLock::new(String::new()),
            avatar: parking_lot::RwLock::new(None),
            illustration: parking_lot::RwLock::new(None),
            posts: parking_lot::RwLock::new(KeySet::new()),
            subscriptions: parking_lot::RwLock::new(KeySet::new()),
            extensions: parking_lot::RwLock::new(Vec::new()),
            min_rebuild_delay: Duration::from_secs(5),
            last_commit: parking_lot::Mutex::new(None),
            pending_commit: parking_lot::Mutex::new(None),
        })
    }
}
