use anyhow::Result;
use pardus::embeddings::create_embedder;
use serde_json::json;

use super::load_config;
use crate::GlobalArgs;

pub fn execute(global: &GlobalArgs, text: &str) -> Result<()> {
    let config = load_config(global)?;
    let mut embedder = create_embedder(&config.embeddings)?;
    let vector = embedder.embed(text)?;

    if global.json {
        println!(
            "{}",
            json!({ "model": embedder.model_name(), "dimension": vector.len(), "embedding": vector })
        );
    } else {
        let rendered: Vec<String> = vector.iter().map(|x| format!("{:?}", x)).collect();
        println!("{}", rendered.join(","));
    }
    Ok(())
}
