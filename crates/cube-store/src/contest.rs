//! Write-once-wins contest resolution between a stored record and an
//! incoming candidate at the same key (spec §4.3 "Contest rule").

use crate::error::{Error, Result};
use cube_core::cube::CoreView;
use cube_core::{crypto, CubeKey, CubeType, Lifecycle, CUBE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Local,
    Incoming,
}

/// Difficulty actually achieved by a compiled binary (trailing zero bits of
/// its SHA3-256 hash), independent of the floor configured on the store.
pub fn achieved_difficulty(binary: &[u8; CUBE_SIZE]) -> u32 {
    crypto::trailing_zero_bits(&crypto::sha3_256(binary))
}

/// A monotone stand-in for "time until this immutable Cube's lease
/// expires": later dates and higher proof-of-work both push it out.
/// Mutable variants don't expire and never call this.
fn expiration_estimate(date: u64, difficulty: u32) -> u64 {
    const SECONDS_PER_DIFFICULTY_BIT: u64 = 3600;
    date.saturating_add(difficulty as u64 * SECONDS_PER_DIFFICULTY_BIT)
}

/// Resolve a same-key contest between `local` (the stored record) and
/// `incoming` (the candidate being admitted). Both views must report the
/// same `cube_type`, or this is a `CubeError`-level admission bug upstream
/// impossible to reach for FROZEN/PIC and only reachable for a signer
/// switching variants under their own key.
pub fn resolve(
    key: CubeKey,
    local: &CoreView<'_>,
    local_binary: &[u8; CUBE_SIZE],
    incoming: &CoreView<'_>,
    incoming_binary: &[u8; CUBE_SIZE],
) -> Result<Winner> {
    if local.cube_type != incoming.cube_type {
        return Err(Error::ConflictingTypes(key));
    }

    Ok(match local.cube_type.lifecycle() {
        Lifecycle::Frozen | Lifecycle::Pic => {
            let local_diff = achieved_difficulty(local_binary);
            let incoming_diff = achieved_difficulty(incoming_binary);
            let local_exp = expiration_estimate(local.date, local_diff);
            let incoming_exp = expiration_estimate(incoming.date, incoming_diff);
            if incoming_exp > local_exp {
                Winner::Incoming
            } else if incoming_exp < local_exp {
                Winner::Local
            } else if incoming_diff > local_diff {
                Winner::Incoming
            } else if incoming_diff < local_diff {
                Winner::Local
            } else if incoming.date > local.date {
                Winner::Incoming
            } else {
                Winner::Local
            }
        }
        Lifecycle::Muc => {
            if incoming.date > local.date {
                Winner::Incoming
            } else {
                Winner::Local
            }
        }
        Lifecycle::Pmuc => {
            let local_count = local.update_count.unwrap_or(0);
            let incoming_count = incoming.update_count.unwrap_or(0);
            if incoming_count > local_count {
                Winner::Incoming
            } else if incoming_count < local_count {
                Winner::Local
            } else if incoming.date > local.date {
                Winner::Incoming
            } else {
                Winner::Local
            }
        }
    })
}

/// Retention score used by the eviction task: higher survives longer.
/// Shares the same expiration model as the contest rule so an evicted
/// Cube is always one that would also have lost a contest to a fresher
/// arrival.
pub fn retention_score(cube_type: CubeType, date: u64, difficulty: u32, now: u64) -> i64 {
    match cube_type.lifecycle() {
        Lifecycle::Frozen | Lifecycle::Pic => {
            let expiration = expiration_estimate(date, difficulty);
            expiration as i64 - now as i64
        }
        Lifecycle::Muc | Lifecycle::Pmuc => i64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_core::cube::CoreView;

    fn view(cube_type: CubeType, date: u64, update_count: Option<u32>) -> CoreView<'static> {
        static NONCE: [u8; 4] = [0; 4];
        CoreView {
            cube_type,
            public_key: None,
            notify: None,
            date,
            signature: None,
            update_count,
            nonce: &NONCE,
        }
    }

    #[test]
    fn muc_newer_date_wins() {
        let local = view(CubeType::Muc, 100, None);
        let incoming = view(CubeType::Muc, 200, None);
        let key = CubeKey([0; 32]);
        let lb = [0u8; CUBE_SIZE];
        let ib = [0u8; CUBE_SIZE];
        assert_eq!(resolve(key, &local, &lb, &incoming, &ib).unwrap(), Winner::Incoming);
    }

    #[test]
    fn muc_tie_keeps_local() {
        let local = view(CubeType::Muc, 100, None);
        let incoming = view(CubeType::Muc, 100, None);
        let key = CubeKey([0; 32]);
        let lb = [0u8; CUBE_SIZE];
        let ib = [0u8; CUBE_SIZE];
        assert_eq!(resolve(key, &local, &lb, &incoming, &ib).unwrap(), Winner::Local);
    }

    #[test]
    fn pmuc_higher_update_count_wins() {
        let local = view(CubeType::Pmuc, 100, Some(3));
        let incoming = view(CubeType::Pmuc, 50, Some(4));
        let key = CubeKey([0; 32]);
        let lb = [0u8; CUBE_SIZE];
        let ib = [0u8; CUBE_SIZE];
        assert_eq!(resolve(key, &local, &lb, &incoming, &ib).unwrap(), Winner::Incoming);
    }

    #[test]
    fn conflicting_types_is_an_error() {
        let local = view(CubeType::Muc, 100, None);
        let incoming = view(CubeType::Frozen, 100, None);
        let key = CubeKey([0; 32]);
        let lb = [0u8; CUBE_SIZE];
        let ib = [0u8; CUBE_SIZE];
        assert!(matches!(
            resolve(key, &local, &lb, &incoming, &ib),
            Err(Error::ConflictingTypes(_))
        ));
    }
}
