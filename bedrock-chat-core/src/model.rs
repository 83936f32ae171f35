use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Normalized metadata for one invocable foundation model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), build_fn(error = anyhow::Error))]
pub struct ModelDescriptor {
    pub model_id: String,
    #[builder(default)]
    pub model_arn: Option<String>,
    #[builder(default)]
    pub provider: Option<String>,
    #[builder(default)]
    pub display_name: Option<String>,
    /// Name of the prompt format family, `None` if the model cannot be invoked by this service
    #[builder(default)]
    pub family: Option<String>,
    #[builder(default)]
    pub context_window: Option<u32>,
    #[builder(default)]
    pub input_modalities: Vec<String>,
    #[builder(default)]
    pub output_modalities: Vec<String>,
    #[builder(default)]
    pub streaming_supported: Option<bool>,
    #[builder(default)]
    pub lifecycle_status: Option<String>,
}

impl ModelDescriptor {
    pub fn builder() -> ModelDescriptorBuilder {
        ModelDescriptorBuilder::default()
    }

    pub fn is_supported(&self) -> bool {
        self.family.is_some()
    }

    /// Case insensitive match on the provider name
    pub fn is_from_provider(&self, provider: &str) -> bool {
        self.provider
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case(provider))
    }
}
