//! GraphStore trait: read access to the knowledge graph.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::GraphError;

/// One result row, keyed by column name in column order.
pub type Record = Map<String, Value>;

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run a read-only Cypher query with named parameters.
    async fn run_read(
        &self,
        query: &str,
        params: Map<String, Value>,
    ) -> std::result::Result<Vec<Record>, GraphError>;
}
