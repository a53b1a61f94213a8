//! Error taxonomy for the store (spec §4.3, §7).

use cube_core::CubeKey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("cube engine error: {0}")]
    Cube(#[from] cube_core::Error),

    #[error("conflicting cube types at key {0:?}")]
    ConflictingTypes(CubeKey),

    #[error("required difficulty {got} below configured floor {floor}")]
    DifficultyTooLow { floor: u32, got: u32 },
}
