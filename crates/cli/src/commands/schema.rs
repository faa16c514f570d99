//! `cypherchat schema`: print the schema the agent sees.

use cypherchat_tools::{Neo4jHttpStore, fetch_schema};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let store = Neo4jHttpStore::from_config(&config.graph)?;

    match fetch_schema(&store).await {
        Ok(Some(schema)) => println!("{schema}"),
        Ok(None) => println!("The database returned no schema."),
        Err(e) => {
            eprintln!("  [Error] {e}");
            return Err(e.into());
        }
    }

    Ok(())
}
