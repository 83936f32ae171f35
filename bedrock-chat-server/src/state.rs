use std::sync::Arc;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region, timeout::TimeoutConfig};
use bedrock_chat_agents::ChatInvoker;
use bedrock_chat_core::{DataCatalog, ModelCatalog, session::SessionStore};
use bedrock_chat_integrations::{
    aws_bedrock::{AwsBedrock, AwsBedrockCatalog},
    aws_glue::AwsGlue,
};
use derive_builder::Builder;

use crate::config::ServerConfig;

const DEFAULT_REGION: &str = "us-east-1";

/// Everything the handlers share
///
/// Conversations live in `sessions`; everything else is read only after startup.
#[derive(Clone, Debug, Builder)]
#[builder(setter(into), build_fn(error = anyhow::Error))]
pub struct AppState {
    pub(crate) invoker: ChatInvoker,

    #[builder(setter(custom))]
    pub(crate) models: Arc<dyn ModelCatalog>,

    #[builder(default)]
    pub(crate) sessions: SessionStore,

    #[builder(default = DEFAULT_REGION.to_string())]
    pub(crate) region: String,
}

impl AppStateBuilder {
    pub fn models(&mut self, models: impl ModelCatalog + 'static) -> &mut Self {
        self.models = Some(Arc::new(models));
        self
    }
}

impl AppState {
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// Wires up the AWS clients for `config`
    ///
    /// # Errors
    ///
    /// Errors if the model id is not supported
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        let family = config.validate()?;
        let timeout = config.request_timeout();

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            .load()
            .await;

        let llm = AwsBedrock::builder()
            .model_id(&config.model_id)
            .model_family(family)
            .sdk_config(&sdk_config)
            .build()?;

        let mut invoker = ChatInvoker::builder();
        invoker
            .llm(llm)
            .limits(config.limits())
            .timeout(timeout);

        if config.disable_catalog {
            tracing::info!("Data catalog disabled");
        } else {
            invoker.catalog(Arc::new(AwsGlue::from_sdk_config(&sdk_config)));
        }

        tracing::info!(
            model_id = %config.model_id,
            %family,
            region = %config.region,
            "Bedrock client configured"
        );

        AppState::builder()
            .invoker(invoker.build()?)
            .models(AwsBedrockCatalog::from_sdk_config(&sdk_config))
            .sessions(config.sessions())
            .region(config.region.clone())
            .build()
    }

    pub fn invoker(&self) -> &ChatInvoker {
        &self.invoker
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub(crate) fn catalog(&self) -> Option<&Arc<dyn DataCatalog>> {
        self.invoker.catalog()
    }
}
