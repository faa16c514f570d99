//! Read-only Cypher execution.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use cypherchat_core::error::ToolError;
use cypherchat_core::graph::GraphStore;
use cypherchat_core::tool::{Tool, ToolContext};
use regex_lite::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

static WRITE_CLAUSE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(CREATE|MERGE|SET|DELETE|REMOVE|DROP|DETACH)\b").ok()
});

/// Whether a query contains a clause that mutates the graph.
/// Fails closed if the pattern could not be compiled.
pub fn is_write_query(query: &str) -> bool {
    WRITE_CLAUSE
        .as_ref()
        .is_none_or(|pattern| pattern.is_match(query))
}

#[derive(Debug, Deserialize)]
struct ReadCypherArgs {
    query: String,
    #[serde(default)]
    params: Option<Map<String, Value>>,
}

pub struct ReadCypherTool {
    store: Arc<dyn GraphStore>,
}

impl ReadCypherTool {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadCypherTool {
    fn name(&self) -> &str {
        "read_neo4j_cypher"
    }

    fn description(&self) -> &str {
        "Execute a read Cypher query on the Neo4j database and return the records as JSON."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The Cypher query to execute"
                },
                "params": {
                    "type": "object",
                    "description": "Parameters to pass to the Cypher query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value, _context: &ToolContext) -> Result<String, ToolError> {
        let args: ReadCypherArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        if is_write_query(&args.query) {
            warn!(query = %args.query, "Rejected write query");
            return Err(ToolError::InvalidArguments(
                "Only MATCH queries are allowed for read-query".into(),
            ));
        }

        let records = self
            .store
            .run_read(&args.query, args.params.unwrap_or_default())
            .await?;

        serde_json::to_string(&records).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().to_string(),
            reason: e.to_string(),
        })
    }
}
