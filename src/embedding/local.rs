//! FastEmbed (ONNX) backed embedder.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Local ONNX model, downloaded on first use and cached on disk.
pub struct FastEmbedder {
    model: TextEmbedding,
    dimension: usize,
}

impl FastEmbedder {
    /// Load the configured model. Blocking; call before serving.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_kind, dimension) = model_for(&config.model)?;
        info!(
            "Loading embedding model {} ({} dims)...",
            config.model, dimension
        );

        let mut options =
            InitOptions::new(model_kind).with_show_download_progress(config.show_download_progress);
        if let Some(dir) = &config.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }

        let model = TextEmbedding::try_new(options)
            .map_err(|e| Error::Embedding(format!("failed to load {}: {}", config.model, e)))?;
        info!("Embedding model loaded");

        Ok(Self { model, dimension })
    }
}

fn model_for(name: &str) -> Result<(EmbeddingModel, usize)> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        other => Err(Error::Config(format!(
            "unknown embedding model '{}'; supported: all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
            other
        ))),
    }
}

impl Embedder for FastEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self
            .model
            .embed(vec![text], None)
            .map_err(|e| Error::Embedding(e.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("model returned no vector".to_string()))
    }
}
