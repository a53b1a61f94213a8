//! Error taxonomy for the Cube engine (spec §7)

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or validating a single Cube.
///
/// Admission-time failures (malformed binary, insufficient hashcash,
/// bad signature) are reported through these variants but MUST NOT
/// panic; callers on the admission path turn them into `None` rather
/// than propagating the error (see `cube-store::CubeStore::add_cube`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    #[error("field set does not fit into 1024 bytes (needed {needed}, have {available})")]
    FieldSize { needed: usize, available: usize },

    #[error("cube binary is {0} bytes, expected exactly 1024")]
    WrongLength(usize),

    #[error("two different cube types share key {0}")]
    ConflictingTypes(String),

    #[error("insufficient hashcash: needed {needed} trailing zero bits, got {got}")]
    InsufficientHashcash { needed: u32, got: u32 },

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("missing or malformed PMUC_UPDATE_COUNT")]
    BadUpdateCount,

    #[error("a NOTIFY variant must carry exactly one 32-byte NOTIFY field")]
    BadNotify,

    #[error("cube is not compiled yet")]
    NotCompiled,

    #[error("unknown cube type byte {0:#04x}")]
    UnknownType(u8),

    #[error("attempted to demarshal field of type {0:?} as an incompatible shape")]
    WrongFieldType(crate::field::FieldType),

    #[error("mining was cancelled")]
    Cancelled,
}

/// Errors raised by the field codec (spec §4.1, §7 `FieldError`/`FieldSizeError`)
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("field type {field_type:?} requires exactly {expected} bytes, got {actual}")]
    WrongLength {
        field_type: crate::field::FieldType,
        expected: usize,
        actual: usize,
    },

    #[error("variable field value of {0} bytes exceeds the 10-bit length limit (1023)")]
    Oversized(usize),

    #[error("unrecognized field type code {0}")]
    UnknownFieldType(u8),

    #[error("truncated field header at offset {0}")]
    TruncatedHeader(usize),

    #[error("truncated field value at offset {0}, needed {1} bytes")]
    TruncatedValue(usize, usize),
}
