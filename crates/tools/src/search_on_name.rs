//! Full-text lookup of nodes by name.

use std::sync::Arc;

use async_trait::async_trait;
use cypherchat_core::error::ToolError;
use cypherchat_core::graph::GraphStore;
use cypherchat_core::tool::{Tool, ToolContext};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::content_blocks::render_tool_output;

const NAME_QUERY: &str = "\
CALL db.index.fulltext.queryNodes($index, $name) YIELD node, score
RETURN labels(node) AS labels, node.name AS name
LIMIT $limit";

pub(crate) fn default_limit() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
struct NameSearchArgs {
    name: String,
    #[serde(default = "default_limit")]
    limit: u64,
}

pub struct NameSearchTool {
    store: Arc<dyn GraphStore>,
    index: String,
}

impl NameSearchTool {
    pub fn new(store: Arc<dyn GraphStore>, index: impl Into<String>) -> Self {
        Self {
            store,
            index: index.into(),
        }
    }
}

#[async_trait]
impl Tool for NameSearchTool {
    fn name(&self) -> &str {
        "search_on_name"
    }

    fn description(&self) -> &str {
        "Search the database using a full text index on names"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The name to look for in the database"
                },
                "limit": {
                    "type": "integer",
                    "description": "The maximum number of nodes to return.",
                    "default": 10,
                    "minimum": 1
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<String, ToolError> {
        let args: NameSearchArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        if args.limit < 1 {
            return Err(ToolError::InvalidArguments("limit must be at least 1".into()));
        }

        let mut params = Map::new();
        params.insert("index".into(), json!(self.index));
        params.insert("name".into(), json!(args.name));
        params.insert("limit".into(), json!(args.limit));

        let records = self.store.run_read(NAME_QUERY, params).await?;
        debug!(name = %args.name, matches = records.len(), "Name search complete");

        render_tool_output(
            records,
            &format!("Name matches for \"{}\"", args.name),
            context.render_mode,
        )
    }
}
