//! Model backend implementations for warmloop.
//!
//! All providers implement the `warmloop_core::Provider` trait. Only the
//! Anthropic Messages API is wired up; it is the backend whose prefix
//! cache the agent loop is built around.

pub mod anthropic;

use std::sync::Arc;

use warmloop_config::AppConfig;
use warmloop_core::error::ProviderError;
use warmloop_core::provider::Provider;

pub use anthropic::AnthropicProvider;

/// Build the default provider from configuration.
///
/// A `[providers.<name>]` section overrides the top-level key and URL.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let section = config.providers.get(name);

    let api_key = config.resolved_api_key().ok_or_else(|| {
        ProviderError::NotConfigured(format!(
            "no API key for '{name}' (set WARMLOOP_API_KEY or ANTHROPIC_API_KEY, or run `warmloop onboard`)"
        ))
    })?;
    let base_url = section
        .and_then(|p| p.api_url.clone())
        .or_else(|| config.api_url.clone());

    match name {
        "anthropic" => {
            let mut provider = AnthropicProvider::new(api_key);
            if let Some(url) = base_url {
                provider = provider.with_base_url(url);
            }
            Ok(Arc::new(provider))
        }
        other => Err(ProviderError::NotConfigured(format!(
            "unsupported provider '{other}'"
        ))),
    }
}

/// The model to request: the provider section's default wins.
pub fn resolve_model(config: &AppConfig) -> String {
    config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone())
}
