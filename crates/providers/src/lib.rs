//! LLM Provider implementations for cypherchat.
//!
//! All providers implement the `cypherchat_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;

use cypherchat_core::error::ProviderError;
use cypherchat_core::provider::Provider;

/// Build the chat/embeddings provider from configuration.
///
/// Fails with [`ProviderError::NotConfigured`] when no API key is available,
/// so the CLI can report it before binding a port.
pub fn build_from_config(
    config: &cypherchat_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "no API key; set CYPHERCHAT_API_KEY or OPENAI_API_KEY".into(),
        )
    })?;

    let name = if config.api_url.contains("api.openai.com") {
        "openai"
    } else {
        "openai-compatible"
    };

    tracing::debug!(provider = name, url = %config.api_url, "Building provider");
    let provider = OpenAiCompatProvider::new(name, &config.api_url, api_key)?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_api_key() {
        let config = cypherchat_config::AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn build_from_configured_key() {
        let config = cypherchat_config::AppConfig {
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");

        let config = cypherchat_config::AppConfig {
            api_key: Some("sk-test".into()),
            api_url: "http://localhost:11434/v1".into(),
            ..Default::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "openai-compatible");
    }
}
