use anyhow::Result;

use super::{connect, parse_columns};
use crate::GlobalArgs;

pub fn list(global: &GlobalArgs) -> Result<()> {
    let mut client = connect(global)?;
    let tables = client.list_tables()?;

    if global.json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
    } else {
        println!("Tables ({}):", tables.len());
        for table in &tables {
            println!("  {} ({} rows, dim={})", table.name, table.rows, table.dimension);
        }
    }
    client.close()?;
    Ok(())
}

pub fn create(
    global: &GlobalArgs,
    name: &str,
    dim: usize,
    columns: &[String],
    if_not_exists: bool,
) -> Result<()> {
    let declared = parse_columns(columns);
    let declared: Vec<(&str, &str)> = declared
        .iter()
        .map(|(n, t)| (n.as_str(), t.as_str()))
        .collect();

    let mut client = connect(global)?;
    client.create_table(name, dim, &declared, if_not_exists)?;
    client.close()?;
    println!("Created table {} (dim={})", name, dim);
    Ok(())
}

pub fn drop(global: &GlobalArgs, name: &str, if_exists: bool) -> Result<()> {
    let mut client = connect(global)?;
    client.drop_table(name, if_exists)?;
    client.close()?;
    println!("Dropped table {}", name);
    Ok(())
}
