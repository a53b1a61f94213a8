//! Cube engine core: the field codec and the 1024-byte Cube binary format.
//!
//! # Modules
//!
//! - [`field`]: TLV field codec (spec §4.1)
//! - [`cube`]: Cube binary format, compile/validate/key derivation (spec §4.2)
//! - [`relationship`]: RELATES_TO tag space (spec §3)
//! - [`crypto`]: SHA3-256, Ed25519, Ed25519→X25519 conversion (spec §6)
//! - [`error`]: error taxonomy (spec §7)

pub mod cube;
pub mod crypto;
pub mod error;
pub mod field;
pub mod relationship;

pub use cube::{CancelToken, Cube, CubeKey, CubeKeys, CubeType, Layout, Lifecycle, NotificationKey, CUBE_SIZE};
pub use error::{Error, FieldError, Result};
pub use field::{Field, FieldType};
pub use relationship::{Relationship, RelationshipType};
