//! Subcommand implementations: thin glue between the CLI and the engine
//! crates. Kept free of business logic — every decision here is a direct
//! call into `cube-core`/`cube-store`/`identity`.

use crate::config::Command;
use anyhow::{Context, Result};
use cube_core::{CancelToken, Cube, CubeKey, CubeKeys, CubeType, Field};
use cube_store::{CubeStore, RangeOpts, Sublevel};
use identity::{IdentityOptions, IdentityStore};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub async fn run(command: Command, store: Arc<CubeStore>) -> Result<()> {
    match command {
        Command::Sculpt { payload } => sculpt(store, payload).await,
        Command::Get { key } => get(store, key).await,
        Command::Range { limit, wraparound } => range(store, limit, wraparound).await,
        Command::Notifications { recipient } => notifications(store, recipient).await,
        Command::IdentityCreate { username, passphrase, muc } => {
            identity_create(store, username, passphrase, muc).await
        }
        Command::IdentityShow { username, passphrase } => identity_show(store, username, passphrase).await,
    }
}

fn parse_key(hex_key: &str) -> Result<CubeKey> {
    let bytes = hex::decode(hex_key).context("key must be hex-encoded")?;
    let arr: [u8; 32] = bytes.try_into().map_err(|_| anyhow::anyhow!("key must decode to exactly 32 bytes"))?;
    Ok(CubeKey(arr))
}

async fn sculpt(store: Arc<CubeStore>, payload: String) -> Result<()> {
    let fields = vec![Field::payload(payload.clone().into_bytes())?];
    let mut cube = Cube::create(CubeType::Frozen, fields, CubeKeys::default(), store.config().required_difficulty)?;
    cube.compile(CancelToken::new()).await?;
    let key = cube.get_key()?;
    let info = store.add_cube(cube).await?.context("cube was rejected by admission")?;
    info!(key = %key.to_hex(), difficulty = info.difficulty, "sculpted and admitted cube");
    println!("{}", json!({ "key": key.to_hex(), "difficulty": info.difficulty }));
    Ok(())
}

async fn get(store: Arc<CubeStore>, hex_key: String) -> Result<()> {
    let key = parse_key(&hex_key)?;
    let Some(cube) = store.get_cube(&key)? else {
        println!("{}", json!({ "found": false }));
        return Ok(());
    };
    let fields: Vec<_> = cube
        .fields()?
        .into_iter()
        .map(|f| json!({ "type": format!("{:?}", f.field_type), "value_hex": hex::encode(&f.value) }))
        .collect();
    println!(
        "{}",
        json!({
            "found": true,
            "key": key.to_hex(),
            "cube_type": format!("{:?}", cube.cube_type()),
            "date": cube.get_date(),
            "valid": cube.validate(),
            "fields": fields,
        })
    );
    Ok(())
}

async fn range(store: Arc<CubeStore>, limit: usize, wraparound: bool) -> Result<()> {
    let opts = RangeOpts::new().sublevel(Sublevel::Cubes).limit(limit).wraparound(wraparound).as_string(true);
    let keys = store.get_key_range(opts)?;
    let hex_keys: Vec<String> = keys
        .into_iter()
        .map(|k| match k {
            cube_store::YieldedKey::Hex(h) => h,
            cube_store::YieldedKey::Raw(b) => hex::encode(b),
        })
        .collect();
    println!("{}", json!({ "keys": hex_keys }));
    Ok(())
}

async fn notifications(store: Arc<CubeStore>, hex_recipient: String) -> Result<()> {
    let recipient = parse_key(&hex_recipient)?;
    let infos = store.get_notification_cube_infos(recipient.as_bytes())?;
    let keys: Vec<String> = infos.into_iter().map(|i| i.key.to_hex()).collect();
    println!("{}", json!({ "recipient": recipient.to_hex(), "notifications": keys }));
    Ok(())
}

async fn identity_create(store: Arc<CubeStore>, username: String, passphrase: String, muc: bool) -> Result<()> {
    let registry = IdentityStore::new();
    let opts = IdentityOptions {
        required_difficulty: store.config().required_difficulty,
        pmuc: !muc,
        notify_recipient: None,
    };
    let identity = identity::Identity::create(store, &registry, &username, &passphrase, opts).await?;
    println!("{}", json!({ "key": identity.key().to_hex(), "username": identity.username() }));
    Ok(())
}

async fn identity_show(store: Arc<CubeStore>, username: String, passphrase: String) -> Result<()> {
    let registry = IdentityStore::new();
    let source = retriever::LocalRetriever::new(store.clone());
    let Some(identity) = identity::Identity::load(&source, store, &registry, &username, &passphrase).await? else {
        println!("{}", json!({ "found": false }));
        return Ok(());
    };
    println!(
        "{}",
        json!({
            "found": true,
            "key": identity.key().to_hex(),
            "username": identity.username(),
            "post_count": identity.get_post_count(),
            "subscription_count": identity.get_public_subscription_count(),
        })
    );
    Ok(())
}
