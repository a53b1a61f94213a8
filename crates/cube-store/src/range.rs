//! Range iteration over the store's sublevels (spec §4.3 "Range iteration").

use crate::backend::Backend;
use crate::error::Result;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sublevel {
    Cubes,
    IndexDate,
    IndexDiff,
    IndexNotifyDate,
    IndexNotifyDiff,
}

impl Default for Sublevel {
    fn default() -> Self {
        Sublevel::Cubes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Inclusive,
    Exclusive,
}

/// Range iteration options (spec §4.3). `gt`/`gte` and `lt`/`lte` are
/// mutually exclusive per side; the later setter wins if both are called.
#[derive(Debug, Clone, Default)]
pub struct RangeOpts {
    lower: Option<(Vec<u8>, Bound)>,
    upper: Option<(Vec<u8>, Bound)>,
    limit: Option<usize>,
    wraparound: bool,
    as_string: bool,
    sublevel: Sublevel,
    get_raw_sublevel_keys: bool,
}

impl RangeOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gt(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.lower = Some((key.into(), Bound::Exclusive));
        self
    }

    pub fn gte(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.lower = Some((key.into(), Bound::Inclusive));
        self
    }

    pub fn lt(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.upper = Some((key.into(), Bound::Exclusive));
        self
    }

    pub fn lte(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.upper = Some((key.into(), Bound::Inclusive));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn wraparound(mut self, wraparound: bool) -> Self {
        self.wraparound = wraparound;
        self
    }

    pub fn as_string(mut self, as_string: bool) -> Self {
        self.as_string = as_string;
        self
    }

    pub fn sublevel(mut self, sublevel: Sublevel) -> Self {
        self.sublevel = sublevel;
        self
    }

    pub fn get_raw_sublevel_keys(mut self, raw: bool) -> Self {
        self.get_raw_sublevel_keys = raw;
        self
    }
}

fn bounded_range(tree: &sled::Tree, opts: &RangeOpts) -> sled::Iter {
    use std::ops::Bound as RBound;
    let lower = match &opts.lower {
        Some((k, Bound::Inclusive)) => RBound::Included(k.clone()),
        Some((k, Bound::Exclusive)) => RBound::Excluded(k.clone()),
        None => RBound::Unbounded,
    };
    let upper = match &opts.upper {
        Some((k, Bound::Inclusive)) => RBound::Included(k.clone()),
        Some((k, Bound::Exclusive)) => RBound::Excluded(k.clone()),
        None => RBound::Unbounded,
    };
    tree.range((lower, upper))
}

fn wraparound_range(tree: &sled::Tree, opts: &RangeOpts) -> sled::Iter {
    use std::ops::Bound as RBound;
    let upper = match &opts.lower {
        Some((k, Bound::Inclusive)) => RBound::Excluded(k.clone()),
        Some((k, Bound::Exclusive)) => RBound::Included(k.clone()),
        None => RBound::Unbounded,
    };
    tree.range((RBound::Unbounded, upper))
}

/// One raw composite key yielded by `key_range`: either the full sublevel
/// key or, for non-`CUBES` sublevels, just its trailing 32-byte Cube key.
pub enum YieldedKey {
    Raw(Vec<u8>),
    Hex(String),
}

/// Walk `opts.sublevel` yielding keys (or raw sublevel keys), honoring
/// `limit` and `wraparound`. Restartable by calling again; not resumable
/// mid-iteration (spec §4.3).
pub fn key_range(backend: &Arc<Backend>, opts: RangeOpts) -> Result<Vec<YieldedKey>> {
    let tree = backend.tree(opts.sublevel);
    let mut out = Vec::new();
    let mut seen: std::collections::HashSet<Vec<u8>> = std::collections::HashSet::new();
    let limit = opts.limit.unwrap_or(usize::MAX);
    if limit == 0 {
        return Ok(out);
    }

    for entry in bounded_range(tree, &opts) {
        if out.len() >= limit {
            break;
        }
        let (k, _) = entry?;
        seen.insert(k.to_vec());
        out.push(project_key(&k, &opts));
    }

    if opts.wraparound && out.len() < limit {
        for entry in wraparound_range(tree, &opts) {
            if out.len() >= limit {
                break;
            }
            let (k, _) = entry?;
            if seen.contains(k.as_ref()) {
                continue;
            }
            out.push(project_key(&k, &opts));
        }
    }

    Ok(out)
}

fn project_key(raw: &sled::IVec, opts: &RangeOpts) -> YieldedKey {
    use crate::index::key_suffix;
    let bytes: Vec<u8> = if opts.get_raw_sublevel_keys || opts.sublevel == Sublevel::Cubes {
        raw.to_vec()
    } else {
        key_suffix(raw).map(|k| k.as_bytes().to_vec()).unwrap_or_else(|| raw.to_vec())
    };
    if opts.as_string {
        YieldedKey::Hex(hex::encode(&bytes))
    } else {
        YieldedKey::Raw(bytes)
    }
}
