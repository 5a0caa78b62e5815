//! Gateway-registered workers.
//!
//! Two long-running worker processes register a callback object with a
//! host-side gateway and answer its calls:
//!
//! - the **harvest worker** answers `getPapers(yearFrom, yearTo)` with
//!   `{"papers": [...]}`, canonical records pulled from a bibliographic
//!   corpus;
//! - the **embedding worker** answers `getVector(text)` with
//!   `{"vector": [...]}` from a sentence-embedding model.
//!
//! ## Modules
//!
//! - [`bridge`]: registration, call dispatch and the host-side proxy
//! - [`harvest`]: venue classification, field normalization and the pipeline
//! - [`embedding`]: the embedding model seam
//! - [`config`]: TOML configuration

pub mod bridge;
pub mod config;
pub mod embedding;
pub mod error;
pub mod harvest;

pub use error::{Error, Result};
