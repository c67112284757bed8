//! Ollama embedding client (`POST /api/embed`)

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingEngine;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    /// Client for the service at `address` (host:port or full URL)
    pub fn new(address: &str, model: &str) -> Result<Self> {
        if model.trim().is_empty() {
            anyhow::bail!("Embedding model name is empty");
        }
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address.trim_end_matches('/'))
        };

        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            model: model.to_string(),
            http,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url)
    }

    fn request(&self, input: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        let expected = input.len();
        let url = self.endpoint();
        let response = self
            .http
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input,
            })
            .send()
            .with_context(|| format!("Failed to reach embedding service at {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            anyhow::bail!("Embedding request failed ({}): {}", status, body);
        }

        let body: EmbedResponse = response
            .json()
            .context("Failed to parse embedding response")?;
        check_embeddings(body.embeddings, expected)
    }
}

fn check_embeddings(embeddings: Vec<Vec<f32>>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if embeddings.is_empty() {
        anyhow::bail!("Embedding service returned no embeddings");
    }
    if embeddings.len() != expected {
        anyhow::bail!(
            "Embedding service returned {} embeddings for {} inputs",
            embeddings.len(),
            expected
        );
    }
    Ok(embeddings)
}

impl EmbeddingEngine for OllamaEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            anyhow::bail!("Cannot embed an empty prompt");
        }
        let mut embeddings = self.request(vec![text])?;
        Ok(embeddings.swap_remove(0))
    }

    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.is_empty()) {
            anyhow::bail!("Cannot embed an empty prompt");
        }
        self.request(texts.iter().map(String::as_str).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
