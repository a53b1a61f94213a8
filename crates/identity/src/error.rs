//! Error taxonomy for the Identity layer (spec §4.5, §7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cube engine error: {0}")]
    Cube(#[from] cube_core::Error),

    #[error("field error: {0}")]
    Field(#[from] cube_core::FieldError),

    #[error("store error: {0}")]
    Store(#[from] cube_store::Error),

    #[error("veritum error: {0}")]
    Veritum(#[from] veritum::Error),

    #[error("retriever error: {0}")]
    Retriever(#[from] retriever::Error),

    #[error("master key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("root cube at {0:?} is not a MUC or PMUC")]
    NotAnIdentityRoot(cube_core::CubeKey),

    #[error("identity root not found for the given key")]
    RootNotFound,

    #[error("identity was built without its owner's master key; cannot sign")]
    NoSigningCapability,
}
