use anyhow::Result;
use pardus::embeddings::create_embedder;

use super::{connect, load_config, parse_vector, print_results};
use crate::GlobalArgs;

pub fn execute(
    global: &GlobalArgs,
    table: &str,
    vector: Option<&str>,
    text: Option<&str>,
    k: usize,
) -> Result<()> {
    let query = match (vector, text) {
        (Some(vector), _) => parse_vector(vector)?,
        (None, Some(text)) => {
            let config = load_config(global)?;
            let mut embedder = create_embedder(&config.embeddings)?;
            tracing::debug!(model = embedder.model_name(), "embedding search text");
            embedder.embed(text)?
        }
        (None, None) => anyhow::bail!("Provide --vector or --text"),
    };

    let mut client = connect(global)?;
    let results = client.search(&query, k, Some(table))?;
    client.close()?;
    print_results(&results, global.json)
}
