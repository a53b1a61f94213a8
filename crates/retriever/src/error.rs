//! Error taxonomy for the Retriever (spec §4.6, §7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cube engine error: {0}")]
    Cube(#[from] cube_core::Error),

    #[error("store error: {0}")]
    Store(#[from] cube_store::Error),

    #[error("veritum error: {0}")]
    Veritum(#[from] veritum::Error),

    #[error("retrieval of {0:?} timed out after {1} attempt(s)")]
    Timeout(cube_core::CubeKey, u32),
}
