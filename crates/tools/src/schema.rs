//! Schema retrieval: fetched once at startup for the system prompt and
//! exposed as a tool so the agent can re-read it mid-conversation.

use std::sync::Arc;

use async_trait::async_trait;
use cypherchat_core::error::{GraphError, ToolError};
use cypherchat_core::graph::GraphStore;
use cypherchat_core::tool::{Tool, ToolContext};
use serde_json::{Map, Value};

/// Node labels with their properties and outgoing relationships, from APOC.
pub const SCHEMA_QUERY: &str = "\
CALL apoc.meta.data() YIELD label, property, type, other, unique, index, elementType
WHERE elementType = 'node' AND NOT label STARTS WITH '_'
WITH label,
    collect(CASE WHEN type <> 'RELATIONSHIP' THEN [property, type + CASE WHEN unique THEN ' unique' ELSE '' END + CASE WHEN index THEN ' indexed' ELSE '' END] END) AS attributes,
    collect(CASE WHEN type = 'RELATIONSHIP' THEN [property, head(other)] END) AS relationships
RETURN label, apoc.map.fromPairs(attributes) AS attributes, apoc.map.fromPairs(relationships) AS relationships";

/// Fetch the schema as pretty-printed JSON keyed by label.
///
/// `Ok(None)` means the database answered but has no labelled nodes.
pub async fn fetch_schema(store: &dyn GraphStore) -> Result<Option<String>, GraphError> {
    let records = store.run_read(SCHEMA_QUERY, Map::new()).await?;
    if records.is_empty() {
        return Ok(None);
    }

    let mut schema = Map::new();
    for mut record in records {
        let Some(Value::String(label)) = record.remove("label") else {
            continue;
        };
        schema.insert(label, Value::Object(record));
    }

    serde_json::to_string_pretty(&schema)
        .map(Some)
        .map_err(|e| GraphError::Protocol(e.to_string()))
}

pub struct GetSchemaTool {
    store: Arc<dyn GraphStore>,
}

impl GetSchemaTool {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetSchemaTool {
    fn name(&self) -> &str {
        "get_neo4j_schema"
    }

    fn description(&self) -> &str {
        "List all node labels, their attributes and their relationships to other node labels \
         in the Neo4j database."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value, _context: &ToolContext) -> Result<String, ToolError> {
        let schema = fetch_schema(self.store.as_ref()).await?;
        Ok(schema.unwrap_or_else(|| "{}".to_string()))
    }
}
