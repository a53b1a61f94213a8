//! Retrieval of Veritum chains from a pluggable Cube source, local or
//! remote (spec §4.6).

pub mod error;
pub mod source;
mod retriever;

pub use error::{Error, Result};
pub use retriever::Retriever;
pub use source::{LocalRetriever, VeritumRetrievalInterface, WithRetry};
