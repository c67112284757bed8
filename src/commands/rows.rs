use anyhow::Result;
use serde_json::json;

use super::{connect, parse_assignments, parse_vector, print_result};
use crate::GlobalArgs;

pub fn insert(global: &GlobalArgs, table: &str, vector: &str, set: &[String]) -> Result<()> {
    let vector = parse_vector(vector)?;
    let metadata = parse_assignments(set)?;

    let mut client = connect(global)?;
    let id = client.insert(&vector, &metadata, Some(table))?;
    client.close()?;

    if global.json {
        println!("{}", json!({ "id": id }));
    } else {
        println!("Inserted row with id={}", id);
    }
    Ok(())
}

pub fn get(global: &GlobalArgs, table: &str, id: u64) -> Result<()> {
    let mut client = connect(global)?;
    let row = client.get(id, Some(table))?;
    client.close()?;

    match (row, global.json) {
        (Some(row), true) => println!("{}", serde_json::to_string_pretty(&row)?),
        (Some(row), false) => print_result(&row),
        (None, true) => println!("null"),
        (None, false) => anyhow::bail!("No row with id={} in {}", id, table),
    }
    Ok(())
}

pub fn update(global: &GlobalArgs, table: &str, id: u64, set: &[String]) -> Result<()> {
    let metadata = parse_assignments(set)?;

    let mut client = connect(global)?;
    let updated = client.update(id, &metadata, Some(table))?;
    client.close()?;
    report(global.json, "updated", usize::from(updated));
    Ok(())
}

pub fn delete(global: &GlobalArgs, table: &str, id: Option<u64>, all: bool) -> Result<()> {
    let mut client = connect(global)?;
    let count = match id {
        Some(id) if !all => usize::from(client.delete(id, Some(table))?),
        _ => client.delete_all(Some(table))?,
    };
    client.close()?;
    report(global.json, "deleted", count);
    Ok(())
}

fn report(json: bool, action: &str, count: usize) {
    if json {
        println!("{}", json!({ action: count }));
    } else {
        println!("{} {} rows", capitalize(action), count);
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
