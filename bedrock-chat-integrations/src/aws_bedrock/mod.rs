//! An integration with the AWS Bedrock service.
//!
//! Supports the Anthropic, Titan, Meta Llama and Mistral model families for chat, and lists the
//! foundation models of the configured region.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{Client, error::SdkError, primitives::Blob};
use bedrock_chat_core::errors::ChatError;
use derive_builder::Builder;
use tokio::runtime::Handle;

#[cfg(test)]
use mockall::automock;

mod catalog;
mod language_model;
mod models;

pub use catalog::{AwsBedrockCatalog, AwsBedrockCatalogBuilder};
pub use models::{ModelFamily, build_request, parse_response};

/// An integration with the AWS Bedrock runtime.
///
/// Can be used as a `LanguageModel`.
///
/// To use Bedrock, you need a model id and access to the model in your account. By default, the
/// aws sdk is configured from the environment. If the aws cli is configured with a region, it
/// should work out of the box. Otherwise, pass a client built from your own `SdkConfig`.
///
/// The model family is inferred from the model id and decides the wire format.
#[derive(Debug, Clone, Builder)]
#[builder(setter(strip_option), build_fn(error = anyhow::Error))]
pub struct AwsBedrock {
    #[builder(setter(into))]
    /// The model id, inference profile id or arn of the model to use
    model_id: String,

    #[builder(default = self.default_client(), setter(custom))]
    /// The bedrock runtime client
    client: Arc<dyn BedrockPrompt>,

    #[builder(default = self.infer_model_family()?)]
    /// The model family to use. In bedrock, families share their api.
    model_family: ModelFamily,
}

#[cfg_attr(test, automock)]
#[async_trait]
trait BedrockPrompt: std::fmt::Debug + Send + Sync {
    async fn prompt_u8(&self, model_id: &str, blob: Blob) -> Result<Vec<u8>>;
}

#[async_trait]
impl BedrockPrompt for Client {
    async fn prompt_u8(&self, model_id: &str, blob: Blob) -> Result<Vec<u8>> {
        let response = self
            .invoke_model()
            .body(blob)
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .send()
            .await
            .map_err(SdkError::into_service_error)?;

        Ok(response.body.into_inner())
    }
}

impl AwsBedrock {
    pub fn builder() -> AwsBedrockBuilder {
        AwsBedrockBuilder::default()
    }

    /// Build a new `AwsBedrock` for the given model, configured from the environment
    ///
    /// # Errors
    ///
    /// Errors if the model id does not belong to a supported family
    pub fn from_model_id(model_id: impl Into<String>) -> Result<Self> {
        Self::builder().model_id(model_id).build()
    }

    pub fn model_family(&self) -> ModelFamily {
        self.model_family
    }
}

impl AwsBedrockBuilder {
    #[allow(clippy::unused_self)]
    fn default_config(&self) -> aws_config::SdkConfig {
        tokio::task::block_in_place(|| {
            Handle::current().block_on(async { aws_config::from_env().load().await })
        })
    }

    fn default_client(&self) -> Arc<Client> {
        Arc::new(Client::new(&self.default_config()))
    }

    fn infer_model_family(&self) -> Result<ModelFamily, ChatError> {
        ModelFamily::from_model_id(self.model_id.as_deref().unwrap_or_default())
    }

    /// Set the aws bedrock runtime client
    pub fn client(&mut self, client: Client) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Build the runtime client from an existing sdk config
    pub fn sdk_config(&mut self, config: &aws_config::SdkConfig) -> &mut Self {
        self.client(Client::new(config))
    }

    #[cfg(test)]
    #[allow(private_bounds)]
    pub fn test_client(&mut self, client: impl BedrockPrompt + 'static) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }
}
