pub mod embed;
pub mod raw;
pub mod rows;
pub mod search;
pub mod tables;

use anyhow::{Context, Result};
use pardus::{Client, ClientBuilder, Config, Metadata, QueryResult, Value};

use crate::GlobalArgs;

/// Configuration with command-line flags applied last
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(binary) = &global.binary {
        config.binary = Some(binary.clone());
    }
    if let Some(db) = &global.db {
        config.database = Some(db.clone());
    }
    if let Some(secs) = global.timeout {
        config.timeout_secs = secs;
    }
    Ok(config)
}

pub fn connect(global: &GlobalArgs) -> Result<Client> {
    let config = load_config(global)?;
    ClientBuilder::from_config(&config)
        .build()
        .context("Failed to start the engine")
}

/// Parse "0.1,0.2" or "[0.1, 0.2]" into a vector
pub fn parse_vector(input: &str) -> Result<Vec<f32>> {
    let inner = input.trim().trim_start_matches('[').trim_end_matches(']');
    if inner.trim().is_empty() {
        anyhow::bail!("Vector is empty");
    }
    inner
        .split(',')
        .map(|x| {
            x.trim()
                .parse::<f32>()
                .with_context(|| format!("Invalid vector component: {:?}", x.trim()))
        })
        .collect()
}

/// Parse repeated key=value arguments, inferring value types
pub fn parse_assignments(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Expected key=value, got: {}", pair))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Empty column name in: {}", pair);
        }
        metadata.set(key, Value::infer(value));
    }
    Ok(metadata)
}

/// Parse name:type column declarations (type defaults to str)
pub fn parse_columns(columns: &[String]) -> Vec<(String, String)> {
    columns
        .iter()
        .filter(|c| !c.trim().is_empty())
        .map(|c| match c.split_once(':') {
            Some((name, ty)) => (name.trim().to_string(), ty.trim().to_string()),
            None => (c.trim().to_string(), "str".to_string()),
        })
        .collect()
}

pub fn print_results(results: &[QueryResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    println!("Found {} rows:", results.len());
    for result in results {
        print_result(result);
    }
    Ok(())
}

pub fn print_result(result: &QueryResult) {
    let mut line = format!("  id={}", result.id);
    if let Some(distance) = result.distance {
        line.push_str(&format!(", distance={:.4}", distance));
    }
    for (column, value) in result.values.iter() {
        line.push_str(&format!(", {}={}", column, display_value(value)));
    }
    println!("{}", line);
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Vector(v) if v.len() > 4 => format!("[{} dims]", v.len()),
        Value::Vector(v) => format!("{:?}", v),
        Value::Text(s) => format!("{:?}", s),
        Value::Integer(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Raw(raw) => raw.clone(),
    }
}
