//! Startup wiring: fetch the schema once and build the agent around it.

use std::sync::Arc;

use cypherchat_config::AppConfig;
use cypherchat_core::error::GraphError;
use cypherchat_core::graph::GraphStore;
use cypherchat_core::provider::Provider;
use cypherchat_tools::{default_registry, fetch_schema};
use tracing::{info, warn};

use crate::prompt::build_system_prompt;
use crate::react::ReactAgent;

/// Everything produced while building the agent.
pub struct AgentInitialization {
    pub agent: Arc<ReactAgent>,
    pub schema_text: Option<String>,
    /// Why the schema could not be read. Serving continues without it.
    pub schema_error: Option<GraphError>,
}

impl AgentInitialization {
    pub fn schema_loaded(&self) -> bool {
        self.schema_error.is_none()
    }
}

/// Build the agent, embedding the database schema in its system prompt
/// when it can be retrieved.
pub async fn initialize_agent(
    provider: Arc<dyn Provider>,
    store: Arc<dyn GraphStore>,
    config: &AppConfig,
) -> AgentInitialization {
    let (schema_text, schema_error) = match fetch_schema(store.as_ref()).await {
        Ok(Some(schema)) => {
            info!(bytes = schema.len(), "Loaded graph schema into the system prompt");
            (Some(schema), None)
        }
        Ok(None) => {
            info!("Schema request returned no data");
            (None, None)
        }
        Err(e) => {
            warn!(error = %e, "Unable to retrieve the graph schema at startup");
            (None, Some(e))
        }
    };

    let tools = Arc::new(default_registry(store, provider.clone(), config));
    let agent = ReactAgent::new(
        provider,
        config.default_model.clone(),
        tools,
        build_system_prompt(schema_text.as_deref()),
    )
    .configured(config);

    AgentInitialization {
        agent: Arc::new(agent),
        schema_text,
        schema_error,
    }
}
