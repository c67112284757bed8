//! Embeddings - turn text into vectors for insert and search
//!
//! The driver itself only moves vectors around; this module is the optional
//! bridge to an embedding service so callers (and the CLI) can search by text.

mod ollama;

pub use ollama::OllamaEmbedder;

use anyhow::Result;

use crate::config::EmbeddingsConfig;

/// Trait for embedding generation engines
pub trait EmbeddingEngine {
    /// Generate embedding for a single text
    fn embed(&mut self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn model_name(&self) -> &str;
}

/// Create the configured embedder
pub fn create_embedder(config: &EmbeddingsConfig) -> Result<Box<dyn EmbeddingEngine>> {
    Ok(Box::new(OllamaEmbedder::new(&config.url, &config.model)?))
}
