//! Store configuration (spec §4.3, §6 config subset).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Persisted/runtime configuration for a `CubeStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Minimum hashcash difficulty accepted on admission.
    pub required_difficulty: u32,
    /// Open an ephemeral in-memory backend instead of a persistent one.
    pub in_memory: bool,
    /// Reserved for a future binary/Cube object cache; currently advisory.
    pub cube_cache_enabled: bool,
    /// Run the background eviction task.
    pub enable_cube_retention_policy: bool,
    /// Directory for the persistent backend, when not `in_memory`.
    pub db_name: String,
    pub db_version: u32,
    /// Logical family/namespace tag, carried through for multi-store setups.
    pub family: String,
    pub argon_cpu_hardness: u32,
    pub argon_memory_hardness: u32,
    /// Minimum spacing between successive root MUC/PMUC rebuilds.
    #[serde(with = "duration_secs")]
    pub min_muc_rebuild_delay: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            required_difficulty: 0,
            in_memory: true,
            cube_cache_enabled: true,
            enable_cube_retention_policy: false,
            db_name: "cube_store".to_string(),
            db_version: 1,
            family: "default".to_string(),
            argon_cpu_hardness: 3,
            argon_memory_hardness: 1 << 16,
            min_muc_rebuild_delay: Duration::from_secs(5),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
