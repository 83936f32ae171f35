use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use aws_sdk_bedrock::{Client, error::SdkError, types::FoundationModelSummary};
use bedrock_chat_core::{ModelCatalog, errors::ChatError, model::ModelDescriptor};
use derive_builder::Builder;
use tokio::runtime::Handle;

#[cfg(test)]
use mockall::automock;

use super::models::ModelFamily;

/// Lists the foundation models of a region through the Bedrock control plane
///
/// Every call goes upstream; nothing is cached.
#[derive(Debug, Clone, Builder)]
#[builder(setter(strip_option), build_fn(error = anyhow::Error))]
pub struct AwsBedrockCatalog {
    #[builder(default = self.default_client(), setter(custom))]
    client: Arc<dyn FoundationModels>,
}

#[cfg_attr(test, automock)]
#[async_trait]
trait FoundationModels: std::fmt::Debug + Send + Sync {
    async fn foundation_models(&self) -> Result<Vec<FoundationModelSummary>>;
}

#[async_trait]
impl FoundationModels for Client {
    async fn foundation_models(&self) -> Result<Vec<FoundationModelSummary>> {
        let response = self
            .list_foundation_models()
            .send()
            .await
            .map_err(SdkError::into_service_error)
            .context("Failed to list foundation models")?;

        Ok(response.model_summaries().to_vec())
    }
}

impl AwsBedrockCatalog {
    pub fn builder() -> AwsBedrockCatalogBuilder {
        AwsBedrockCatalogBuilder::default()
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Arc::new(Client::new(config)),
        }
    }
}

impl AwsBedrockCatalogBuilder {
    #[allow(clippy::unused_self)]
    fn default_client(&self) -> Arc<Client> {
        let config = tokio::task::block_in_place(|| {
            Handle::current().block_on(async { aws_config::from_env().load().await })
        });
        Arc::new(Client::new(&config))
    }

    /// Set the aws bedrock control plane client
    pub fn client(&mut self, client: Client) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }

    #[cfg(test)]
    #[allow(private_bounds)]
    pub fn test_client(&mut self, client: impl FoundationModels + 'static) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }
}

fn descriptor_from_summary(summary: &FoundationModelSummary) -> ModelDescriptor {
    let family = ModelFamily::from_model_id(summary.model_id()).ok();

    ModelDescriptor {
        model_id: summary.model_id().to_string(),
        model_arn: Some(summary.model_arn().to_string()),
        provider: summary.provider_name().map(ToString::to_string),
        display_name: summary.model_name().map(ToString::to_string),
        family: family.map(|family| family.to_string()),
        context_window: family.map(ModelFamily::context_window),
        input_modalities: summary
            .input_modalities()
            .iter()
            .map(|modality| modality.as_str().to_string())
            .collect(),
        output_modalities: summary
            .output_modalities()
            .iter()
            .map(|modality| modality.as_str().to_string())
            .collect(),
        streaming_supported: summary.response_streaming_supported(),
        lifecycle_status: summary
            .model_lifecycle()
            .map(|lifecycle| lifecycle.status().as_str().to_string()),
    }
}

#[async_trait]
impl ModelCatalog for AwsBedrockCatalog {
    #[tracing::instrument(skip_all, err)]
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ChatError> {
        let summaries = self
            .client
            .foundation_models()
            .await
            .map_err(ChatError::upstream)?;

        tracing::debug!(count = summaries.len(), "Listed foundation models");

        Ok(summaries.iter().map(descriptor_from_summary).collect())
    }
}
