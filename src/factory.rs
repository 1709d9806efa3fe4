//! Provider selection: build exactly one backend adapter from configuration.

use serde::Deserialize;

use crate::providers::{AzureProvider, MistralProvider, OllamaProvider, OpenAiProvider};
use crate::{AiProvider, Error};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiSettings {
    pub model: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistralSettings {
    pub model: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaSettings {
    pub host: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment_name: String,
    #[serde(default)]
    pub allow_insecure_connections: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Llama2Settings {
    pub model_path: String,
}

/// The `aiProvider` section of the service configuration: a closed set of
/// mutually exclusive backend keys, exactly one of which should be present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiProviderConfig {
    pub openai: Option<OpenAiSettings>,
    pub mistral: Option<MistralSettings>,
    pub ollama: Option<OllamaSettings>,
    pub azure: Option<AzureSettings>,
    pub llama2: Option<Llama2Settings>,
}

/// Factory for backend adapters.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Construct the adapter matching the single configured backend.
    ///
    /// Fails with [`Error::UnknownProvider`] when no backend key is present;
    /// this is a startup error, not a per-request one.
    pub fn create(config: &AiProviderConfig) -> Result<Box<dyn AiProvider>, Error> {
        if let Some(settings) = &config.openai {
            Ok(Box::new(OpenAiProvider::new(
                &settings.model,
                &settings.api_key,
            )?))
        } else if let Some(settings) = &config.mistral {
            Ok(Box::new(MistralProvider::new(
                &settings.model,
                &settings.api_key,
            )?))
        } else if let Some(settings) = &config.ollama {
            Ok(Box::new(OllamaProvider::new(
                &settings.host,
                &settings.model,
            )?))
        } else if let Some(settings) = &config.azure {
            Ok(Box::new(AzureProvider::new(
                &settings.endpoint,
                &settings.api_key,
                &settings.deployment_name,
                settings.allow_insecure_connections,
            )))
        } else if let Some(settings) = &config.llama2 {
            build_local(settings)
        } else {
            Err(Error::UnknownProvider)
        }
    }
}

#[cfg(feature = "llama")]
fn build_local(settings: &Llama2Settings) -> Result<Box<dyn AiProvider>, Error> {
    use crate::providers::LocalProvider;
    Ok(Box::new(LocalProvider::from_model_file(
        &settings.model_path,
    )?))
}

#[cfg(not(feature = "llama"))]
fn build_local(_settings: &Llama2Settings) -> Result<Box<dyn AiProvider>, Error> {
    Err(Error::config(
        "llama2 provider requires the `llama` cargo feature",
    ))
}
