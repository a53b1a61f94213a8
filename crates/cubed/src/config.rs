//! CLI/environment configuration for the `cubed` binary.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cubed - local operational shell for a Cube object store.
///
/// Wires a `CubeStore` behind a CLI for sculpting, inspecting, and
/// serving Cubes against a local backend. Does not speak the gossip
/// network protocol; see spec §1 ("out of scope").
#[derive(Parser, Debug, Clone)]
#[command(name = "cubed")]
#[command(about = "Local Cube object store: sculpt, inspect, and serve Cubes against a local backend")]
pub struct Config {
    /// Data directory for the persistent sled backend.
    #[arg(long, env = "CUBED_DATA_DIR", default_value = "./data/cubed")]
    pub data_dir: PathBuf,

    /// Use an ephemeral in-memory backend instead of `data_dir`.
    #[arg(long, env = "CUBED_IN_MEMORY")]
    pub in_memory: bool,

    /// Minimum hashcash difficulty (trailing zero bits) accepted on admission.
    #[arg(long, env = "CUBED_REQUIRED_DIFFICULTY", default_value_t = 0)]
    pub required_difficulty: u32,

    /// Run the background retention/eviction sweep.
    #[arg(long, env = "CUBED_ENABLE_RETENTION")]
    pub enable_retention: bool,

    /// Argon2id CPU hardness (iterations) for Identity key derivation.
    #[arg(long, env = "CUBED_ARGON_CPU_HARDNESS", default_value_t = 3)]
    pub argon_cpu_hardness: u32,

    /// Argon2id memory hardness (KiB) for Identity key derivation.
    #[arg(long, env = "CUBED_ARGON_MEMORY_HARDNESS", default_value_t = 1 << 16)]
    pub argon_memory_hardness: u32,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sculpt a FROZEN Cube from a UTF-8 payload string, mine it, and admit it.
    Sculpt {
        /// Payload text to store.
        payload: String,
    },
    /// Fetch a Cube by its 64-character hex key and print its fields as JSON.
    Get {
        /// Hex-encoded 32-byte Cube key.
        key: String,
    },
    /// List keys in a sublevel within an optional bound range.
    Range {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        wraparound: bool,
    },
    /// List notification Cubes for a hex-encoded recipient key.
    Notifications {
        /// Hex-encoded 32-byte recipient key.
        recipient: String,
    },
    /// Create a new Identity and store its root Cube.
    IdentityCreate {
        username: String,
        passphrase: String,
        /// Root lifecycle is PMUC (reconciled by update count) unless this is set, in which case it's a plain MUC.
        #[arg(long)]
        muc: bool,
    },
    /// Load an existing Identity by credentials and print its profile as JSON.
    IdentityShow { username: String, passphrase: String },
}

impl Config {
    /// Validate configuration (anyhow at the binary edge, per the ambient
    /// stack's error-handling split).
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.in_memory && self.data_dir.as_os_str().is_empty() {
            anyhow::bail!("data_dir must be set unless --in-memory is given");
        }
        if self.argon_memory_hardness == 0 {
            anyhow::bail!("argon_memory_hardness must be nonzero");
        }
        Ok(())
    }

    pub fn store_config(&self) -> cube_store::StoreConfig {
        cube_store::StoreConfig {
            required_difficulty: self.required_difficulty,
            in_memory: self.in_memory,
            enable_cube_retention_policy: self.enable_retention,
            db_name: self.data_dir.to_string_lossy().into_owned(),
            argon_cpu_hardness: self.argon_cpu_hardness,
            argon_memory_hardness: self.argon_memory_hardness,
            ..cube_store::StoreConfig::default()
        }
    }
}
