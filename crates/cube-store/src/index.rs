//! Composite secondary-index key schemas (spec §4.3).

use cube_core::CubeKey;

/// `INDEX_DATE` (global eviction index): 5-byte BE date || 32-byte key.
pub fn date_key(date: u64, key: &CubeKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + 32);
    out.extend_from_slice(&date.to_be_bytes()[3..8]);
    out.extend_from_slice(key.as_bytes());
    out
}

/// `INDEX_DIFF` (global eviction index): 1-byte difficulty || 32-byte key.
/// Difficulty is clamped to `u8::MAX`; the configured floors in practice sit
/// far below 255 trailing zero bits.
pub fn diff_key(difficulty: u32, key: &CubeKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 32);
    out.push(difficulty.min(u8::MAX as u32) as u8);
    out.extend_from_slice(key.as_bytes());
    out
}

/// `INDEX_NOTIFY_DATE`: 32-byte recipient || 5-byte BE date || 32-byte key.
pub fn notify_date_key(recipient: &[u8; 32], date: u64, key: &CubeKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + 5 + 32);
    out.extend_from_slice(recipient);
    out.extend_from_slice(&date.to_be_bytes()[3..8]);
    out.extend_from_slice(key.as_bytes());
    out
}

/// `INDEX_NOTIFY_DIFF`: 32-byte recipient || 1-byte difficulty || 32-byte key.
pub fn notify_diff_key(recipient: &[u8; 32], difficulty: u32, key: &CubeKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + 1 + 32);
    out.extend_from_slice(recipient);
    out.push(difficulty.min(u8::MAX as u32) as u8);
    out.extend_from_slice(key.as_bytes());
    out
}

/// Lower bound for "all entries for `recipient`" range scans over a
/// notify-prefixed sublevel.
pub fn notify_prefix_lower(recipient: &[u8; 32]) -> Vec<u8> {
    recipient.to_vec()
}

/// Exclusive upper bound for "all entries for `recipient`": the recipient
/// prefix followed by an all-0xFF suffix, which sorts after every possible
/// entry for that recipient but before the next recipient's entries.
pub fn notify_prefix_upper(recipient: &[u8; 32]) -> Vec<u8> {
    let mut out = recipient.to_vec();
    out.extend(std::iter::repeat(0xFFu8).take(37));
    out
}

/// Trailing 32 bytes of a composite index key: the Cube key it points at.
pub fn key_suffix(composite: &[u8]) -> Option<CubeKey> {
    if composite.len() < 32 {
        return None;
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&composite[composite.len() - 32..]);
    Some(CubeKey(bytes))
}
