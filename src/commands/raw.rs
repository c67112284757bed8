use anyhow::Result;
use serde_json::json;

use super::connect;
use crate::GlobalArgs;

pub fn execute(global: &GlobalArgs, command: &str) -> Result<()> {
    let client = connect(global)?;
    let output = client.raw(command)?;
    client.close()?;

    if global.json {
        println!("{}", json!({ "output": output }));
    } else {
        print!("{}", output);
    }
    Ok(())
}
