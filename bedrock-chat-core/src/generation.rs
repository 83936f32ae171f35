use std::time::Duration;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::Turn;

/// Sampling parameters after clamping
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Defaults and limits used to turn caller supplied parameters into [`GenerationParams`]
///
/// Out of range input is clamped, never rejected.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationLimits {
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub max_tokens_ceiling: u32,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            default_temperature: 0.7,
            default_max_tokens: 1000,
            max_tokens_ceiling: 4000,
        }
    }
}

impl GenerationLimits {
    pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 1.0);

    /// Caller input arrives as `f64` so that any JSON number can be clamped
    pub fn resolve(&self, temperature: Option<f64>, max_tokens: Option<f64>) -> GenerationParams {
        GenerationParams {
            temperature: temperature
                .map_or_else(|| self.default_temperature(), |t| self.clamp_temperature(t)),
            max_tokens: self
                .clamp_max_tokens(max_tokens.unwrap_or(f64::from(self.default_max_tokens))),
        }
    }

    fn default_temperature(&self) -> f32 {
        let (min, max) = Self::TEMPERATURE_RANGE;
        if self.default_temperature.is_nan() {
            min
        } else {
            self.default_temperature.clamp(min, max)
        }
    }

    /// Clamps into `[0.0, 1.0]`; infinities go to the nearest bound, NaN falls back to the
    /// default
    #[allow(clippy::cast_possible_truncation)]
    pub fn clamp_temperature(&self, temperature: f64) -> f32 {
        let (min, max) = Self::TEMPERATURE_RANGE;
        if temperature.is_nan() {
            self.default_temperature()
        } else {
            temperature.clamp(f64::from(min), f64::from(max)) as f32
        }
    }

    /// Saturates into `[1, max_tokens_ceiling]`, dropping any fraction; NaN falls back to the
    /// default
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamp_max_tokens(&self, max_tokens: f64) -> u32 {
        let ceiling = self.max_tokens_ceiling.max(1);
        let max_tokens = if max_tokens.is_nan() {
            f64::from(self.default_max_tokens)
        } else {
            max_tokens
        };
        // In range and non-negative after the clamp, so the cast is exact
        max_tokens.trunc().clamp(1.0, f64::from(ceiling)) as u32
    }
}

/// Everything a [`crate::LanguageModel`] needs to produce one completion
#[derive(Clone, Debug, PartialEq, Builder)]
#[builder(setter(into, strip_option), build_fn(error = anyhow::Error))]
pub struct GenerationRequest {
    #[builder(default)]
    pub system: Option<String>,
    /// Prior turns, oldest first
    #[builder(default)]
    pub history: Vec<Turn>,
    pub prompt: String,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Parsed model output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub usage: Option<TokenUsage>,
    pub stop_reason: Option<String>,
}

impl Generation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
            stop_reason: None,
        }
    }

    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    #[must_use]
    pub fn with_stop_reason(mut self, stop_reason: impl Into<String>) -> Self {
        self.stop_reason = Some(stop_reason.into());
        self
    }
}

/// A user's chat message as received by the service
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Any JSON number is accepted and saturated into range
    #[serde(default)]
    pub max_tokens: Option<f64>,
    /// Adds data catalog metadata as system context when a catalog is configured
    #[serde(default)]
    pub include_catalog: bool,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: impl Into<f64>) -> Self {
        self.max_tokens = Some(max_tokens.into());
        self
    }

    #[must_use]
    pub fn with_catalog(mut self) -> Self {
        self.include_catalog = true;
        self
    }
}

/// Outcome of one successful invocation
#[derive(Clone, Debug, Serialize)]
pub struct InvocationResult {
    pub text: String,
    pub model_id: String,
    pub session_id: Uuid,
    #[serde(rename = "processing_time_ms", serialize_with = "serialize_millis")]
    pub processing_time: Duration,
    pub usage: Option<TokenUsage>,
    /// Whether prior turns were sent along with the prompt
    pub has_context: bool,
    pub has_catalog_context: bool,
    /// Number of turns in the conversation after this invocation was recorded
    pub conversation_length: usize,
    pub params: GenerationParams,
    pub completed_at: DateTime<Utc>,
}

impl InvocationResult {
    pub fn processing_time_ms(&self) -> u64 {
        u64::try_from(self.processing_time.as_millis()).unwrap_or(u64::MAX)
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
