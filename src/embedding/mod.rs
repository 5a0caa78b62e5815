//! Text embedding for the vector worker.
//!
//! The model is an opaque `text -> vector` function loaded once at startup:
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────┐
//! │  getVector   │────▶│    Embedder    │────▶│  [f32; 384]  │
//! │ (text input) │     │  (FastEmbed)   │     │   "vector"   │
//! └──────────────┘     └────────────────┘     └──────────────┘
//! ```

#[cfg(feature = "local-embeddings")]
mod local;
mod method;

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;
pub use method::GetVector;

use crate::error::Result;

/// Default embedding model (all-MiniLM-L6-v2 - 384 dimensions)
pub const DEFAULT_MODEL: &str = "all-minilm-l6-v2";

/// Embedding dimension for the default model
pub const EMBEDDING_DIM: usize = 384;

/// A loaded embedding model.
pub trait Embedder: Send + Sync {
    /// Length of every vector this model returns.
    fn dimension(&self) -> usize;

    /// Encode one text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
