//! Error taxonomy for the Veritum layer (spec §4.4, §7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cube engine error: {0}")]
    Cube(#[from] cube_core::Error),

    #[error("a Veritum must split into at least one chunk")]
    Empty,

    #[error("encryption requires at least one recipient and a sender signing key")]
    MissingEncryptionMaterial,

    #[error("envelope is malformed or truncated")]
    MalformedEnvelope,

    #[error("content could not be decrypted under the supplied recipient key")]
    DecryptionFailed,

    #[error("chunk chain is truncated; cannot decrypt an incomplete Veritum")]
    TruncatedChain,
}
