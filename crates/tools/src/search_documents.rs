//! Vector-similarity search over document chunks.

use std::sync::Arc;

use async_trait::async_trait;
use cypherchat_core::error::{ProviderError, ToolError};
use cypherchat_core::graph::GraphStore;
use cypherchat_core::provider::{EmbeddingRequest, Provider};
use cypherchat_core::tool::{Tool, ToolContext};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::content_blocks::render_tool_output;
use crate::search_on_name::default_limit;

const SIMILARITY_QUERY: &str = "\
CALL db.index.vector.queryNodes($index, $nn, $message_vector) YIELD node, score
WITH node AS chunk, score ORDER BY score DESC
MATCH (d:Document)<-[:PART_OF]-(chunk)
RETURN score, d.name AS doc_name, d.url AS doc_url, chunk.id AS chunk_id, chunk.page AS page, chunk.text AS text";

#[derive(Debug, Deserialize)]
struct DocumentSearchArgs {
    message: String,
    #[serde(default = "default_limit")]
    limit: u64,
}

pub struct DocumentSearchTool {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn Provider>,
    embeddings_model: String,
    index: String,
}

impl DocumentSearchTool {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn Provider>,
        embeddings_model: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            embeddings_model: embeddings_model.into(),
            index: index.into(),
        }
    }

    async fn embed_query(&self, message: &str) -> Result<Vec<f32>, ToolError> {
        let response = self
            .embedder
            .embed(EmbeddingRequest {
                model: self.embeddings_model.clone(),
                inputs: vec![message.to_string()],
            })
            .await?;
        response.embeddings.into_iter().next().ok_or_else(|| {
            ToolError::Provider(ProviderError::ApiError {
                status_code: 200,
                message: "Embedding response contained no vectors".into(),
            })
        })
    }
}

#[async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Search the database on using a vector index on document chunks."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The search message to look for in the database"
                },
                "limit": {
                    "type": "integer",
                    "description": "The maximum number of nodes to return.",
                    "default": 10,
                    "minimum": 1
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<String, ToolError> {
        let args: DocumentSearchArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        if args.limit < 1 {
            return Err(ToolError::InvalidArguments("limit must be at least 1".into()));
        }

        let vector = self.embed_query(&args.message).await?;

        let mut params = Map::new();
        params.insert("index".into(), json!(self.index));
        params.insert("nn".into(), json!(args.limit));
        params.insert("message_vector".into(), json!(vector));

        let records = self.store.run_read(SIMILARITY_QUERY, params).await?;
        debug!(dimensions = vector.len(), chunks = records.len(), "Document search complete");

        render_tool_output(records, "Matching document passages", context.render_mode)
    }
}
