//! Graph tool implementations for cypherchat.
//!
//! Tools give the agent read access to the knowledge graph: the schema,
//! arbitrary read-only Cypher, full-text search on names and vector search
//! over document chunks. Search tools attach a renderable content block
//! shaped by the request's render mode.

pub mod content_blocks;
pub mod neo4j;
pub mod read_cypher;
pub mod schema;
pub mod search_documents;
pub mod search_on_name;

use std::sync::Arc;

use cypherchat_config::AppConfig;
use cypherchat_core::graph::GraphStore;
use cypherchat_core::provider::Provider;
use cypherchat_core::tool::ToolRegistry;

pub use content_blocks::{TableOptions, html_table, tabular_content};
pub use neo4j::Neo4jHttpStore;
pub use schema::fetch_schema;

/// Create the registry of graph tools the agent may call.
pub fn default_registry(
    store: Arc<dyn GraphStore>,
    provider: Arc<dyn Provider>,
    config: &AppConfig,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(schema::GetSchemaTool::new(store.clone())));
    registry.register(Box::new(read_cypher::ReadCypherTool::new(store.clone())));
    registry.register(Box::new(search_on_name::NameSearchTool::new(
        store.clone(),
        &config.graph.name_index,
    )));
    registry.register(Box::new(search_documents::DocumentSearchTool::new(
        store,
        provider,
        &config.embeddings_model,
        &config.graph.vector_index,
    )));
    registry
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use cypherchat_core::error::{GraphError, ProviderError};
    use cypherchat_core::graph::{GraphStore, Record};
    use cypherchat_core::provider::*;
    use serde_json::{Map, Value};

    /// Returns canned records and remembers every query it was asked.
    pub struct RecordingStore {
        result: Result<Vec<Record>, GraphError>,
        queries: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    impl RecordingStore {
        pub fn returning(records: Vec<Value>) -> Self {
            let records = records
                .into_iter()
                .map(|r| match r {
                    Value::Object(map) => map,
                    other => panic!("test records must be objects, got {other}"),
                })
                .collect();
            Self {
                result: Ok(records),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: GraphError) -> Self {
            Self {
                result: Err(error),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn queries(&self) -> Vec<(String, Map<String, Value>)> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphStore for RecordingStore {
        async fn run_read(
            &self,
            query: &str,
            params: Map<String, Value>,
        ) -> Result<Vec<Record>, GraphError> {
            self.queries
                .lock()
                .unwrap()
                .push((query.to_string(), params));
            self.result.clone()
        }
    }

    /// Embeds every input as the same vector.
    pub struct FixedEmbedder {
        vector: Vec<f32>,
        inputs: Mutex<Vec<String>>,
    }

    impl FixedEmbedder {
        pub fn new(vector: Vec<f32>) -> Self {
            Self {
                vector,
                inputs: Mutex::new(Vec::new()),
            }
        }

        pub fn inputs(&self) -> Vec<String> {
            self.inputs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("embedding only".into()))
        }

        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, ProviderError> {
            self.inputs.lock().unwrap().extend(request.inputs.iter().cloned());
            Ok(EmbeddingResponse {
                embeddings: request.inputs.iter().map(|_| self.vector.clone()).collect(),
                model: request.model,
                usage: None,
            })
        }
    }
}
