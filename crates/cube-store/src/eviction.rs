//! Background retention-score eviction task (spec §4.3 "Eviction policy").

use crate::contest::retention_score;
use crate::index;
use crate::store::CubeStore;
use cube_core::cube::parse_core;
use cube_core::CUBE_SIZE;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Below this score a FROZEN/PIC Cube is considered to have outlived its
/// retention value. MUC/PMUC always score `i64::MAX` and are never swept.
const SHOULD_RETAIN_THRESHOLD: i64 = 0;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub fn spawn(store: Arc<CubeStore>) -> tokio::task::JoinHandle<()> {
    let cancel = store.eviction_cancel();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = sweep(&store) {
                        warn!(error = %e, "eviction sweep failed");
                    }
                }
                _ = wait_cancelled(&cancel) => {
                    debug!("eviction task stopping");
                    break;
                }
            }
        }
    })
}

async fn wait_cancelled(cancel: &cube_core::CancelToken) {
    while !cancel.is_cancelled() {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

fn sweep(store: &CubeStore) -> crate::error::Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let backend = store.backend();

    let mut condemned = Vec::new();
    for entry in backend.index_diff.iter() {
        let (k, _) = entry?;
        let Some(key) = index::key_suffix(&k) else { continue };
        let Some(bytes) = backend.cubes.get(key.as_bytes())? else { continue };
        let Ok(binary) = <[u8; CUBE_SIZE]>::try_from(bytes.as_ref()) else { continue };
        let Ok(view) = parse_core(&binary) else { continue };
        let difficulty = crate::contest::achieved_difficulty(&binary);
        let score = retention_score(view.cube_type, view.date, difficulty, now);
        if score < SHOULD_RETAIN_THRESHOLD {
            condemned.push((key, view.date, difficulty, view.cube_type, view.notify.copied()));
        }
    }

    for (key, date, difficulty, cube_type, notify) in condemned {
        backend.cubes.remove(key.as_bytes())?;
        backend.index_date.remove(index::date_key(date, &key))?;
        backend.index_diff.remove(index::diff_key(difficulty, &key))?;
        if cube_type.is_notify() {
            if let Some(recipient) = notify {
                backend.index_notify_date.remove(index::notify_date_key(&recipient, date, &key))?;
                backend.index_notify_diff.remove(index::notify_diff_key(&recipient, difficulty, &key))?;
            }
        }
        debug!(?key, "evicted cube below retention threshold");
    }

    Ok(())
}
