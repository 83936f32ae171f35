use std::sync::Arc;

use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::{
    errors::ChatError,
    generation::{Generation, GenerationRequest},
    model::ModelDescriptor,
};

#[cfg(feature = "test-utils")]
use mockall::automock;

/// A model that can complete a prompt with conversation history
///
/// Implementations own the model id and the wire format; callers only deal in turns and
/// parameters.
#[async_trait]
pub trait LanguageModel: Send + Sync + DynClone + std::fmt::Debug {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ChatError>;

    /// The model id or arn requests are sent to
    fn model_id(&self) -> &str;
}

dyn_clone::clone_trait_object!(LanguageModel);

#[async_trait]
impl LanguageModel for Box<dyn LanguageModel> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ChatError> {
        (**self).generate(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl LanguageModel for Arc<dyn LanguageModel> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ChatError> {
        (**self).generate(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Lists the foundation models available to the configured account and region
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait]
pub trait ModelCatalog: Send + Sync + std::fmt::Debug {
    /// Models in the order upstream returned them. Never retries.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ChatError>;
}

#[async_trait]
impl<T: ModelCatalog + ?Sized> ModelCatalog for Arc<T> {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ChatError> {
        (**self).list_models().await
    }
}
