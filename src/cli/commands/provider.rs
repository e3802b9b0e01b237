use clap::Args;

use crate::models::ProviderRequest;

/// Per-call embedding provider settings.
///
/// A provider set in the configuration file or environment takes
/// precedence over these flags.
#[derive(Debug, Clone, Default, Args)]
pub struct ProviderArgs {
    #[arg(long, help = "Embedding provider: ollama, openai, cohere or onnx")]
    pub provider: Option<String>,

    #[arg(long, help = "Embedding model name")]
    pub model: Option<String>,

    #[arg(long, help = "Provider endpoint URL")]
    pub endpoint: Option<String>,

    #[arg(
        long,
        env = "RAGSTORE_PROVIDER_API_KEY",
        hide_env_values = true,
        help = "API key for a hosted provider"
    )]
    pub api_key: Option<String>,

    #[arg(long, help = "Override the model's vector size")]
    pub dimension: Option<usize>,
}

impl ProviderArgs {
    /// `None` when no flag was given.
    pub fn to_request(&self) -> Option<ProviderRequest> {
        let request = ProviderRequest {
            provider: self.provider.clone(),
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            dimension: self.dimension,
        };

        let empty = request.provider.is_none()
            && request.api_key.is_none()
            && request.endpoint.is_none()
            && request.model.is_none()
            && request.dimension.is_none();
        (!empty).then_some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_args_produce_no_request() {
        assert!(ProviderArgs::default().to_request().is_none());
    }

    #[test]
    fn test_args_map_to_request() {
        let args = ProviderArgs {
            provider: Some("openai".to_string()),
            dimension: Some(256),
            ..Default::default()
        };
        let request = args.to_request().unwrap();
        assert_eq!(request.provider.as_deref(), Some("openai"));
        assert_eq!(request.dimension, Some(256));
    }
}
