//! The chat invocation facade
//!
//! An invocation validates the prompt, resolves the generation parameters, optionally renders the
//! data catalog as system prompt, reads the context from the conversation, calls the model under a
//! timeout and, only if all of that succeeded, records the exchange.
//!
//! The catalog is read before the conversation is locked, under the same timeout as the model
//! call. From then on the lock is held until the invocation is done. Requests for the same
//! conversation are therefore answered strictly one after the other, and each sees the turns of
//! the previous one.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::anyhow;
use bedrock_chat_core::{
    DataCatalog, LanguageModel,
    conversation::{Conversation, Turn},
    errors::ChatError,
    generation::{ChatRequest, GenerationLimits, GenerationRequest, InvocationResult},
};
use chrono::Utc;
use derive_builder::Builder;
use tokio::sync::Mutex;

use crate::catalog_context::CatalogContext;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prompts are only ever logged this far
const LOGGED_PROMPT_CHARS: usize = 50;

#[derive(Clone, Debug, Builder)]
#[builder(setter(into, strip_option), build_fn(error = anyhow::Error))]
pub struct ChatInvoker {
    /// The model every invocation is sent to
    #[builder(setter(custom))]
    llm: Box<dyn LanguageModel>,

    /// Data catalog used when a request asks for catalog context
    #[builder(default, setter(custom))]
    catalog: Option<CatalogContext>,

    #[builder(default)]
    limits: GenerationLimits,

    /// Upper bound on the model call and, separately, on reading the catalog
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,
}

impl ChatInvokerBuilder {
    pub fn llm(&mut self, llm: impl LanguageModel + 'static) -> &mut Self {
        self.llm = Some(Box::new(llm));
        self
    }

    pub fn catalog(&mut self, catalog: Arc<dyn DataCatalog>) -> &mut Self {
        self.catalog = Some(Some(CatalogContext::new(catalog)));
        self
    }

    pub fn catalog_context(&mut self, context: CatalogContext) -> &mut Self {
        self.catalog = Some(Some(context));
        self
    }
}

impl ChatInvoker {
    pub fn builder() -> ChatInvokerBuilder {
        ChatInvokerBuilder::default()
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    pub fn limits(&self) -> GenerationLimits {
        self.limits
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn catalog(&self) -> Option<&Arc<dyn DataCatalog>> {
        self.catalog.as_ref().map(CatalogContext::catalog)
    }

    /// Runs one invocation against `conversation`
    ///
    /// On success both the prompt and the answer are appended to the conversation. On failure the
    /// conversation is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the prompt is blank
    /// - `UpstreamUnavailable` if the model call fails or times out
    /// - `MalformedResponse` if the model answered with something unusable, including blank text
    /// - `UnsupportedModel` if the model cannot be formatted for
    #[tracing::instrument(
        skip_all,
        fields(prompt = %truncate(&request.prompt, LOGGED_PROMPT_CHARS), model_id = %self.llm.model_id())
    )]
    pub async fn invoke(
        &self,
        conversation: &Mutex<Conversation>,
        request: ChatRequest,
    ) -> Result<InvocationResult, ChatError> {
        let started = Instant::now();

        if request.prompt.trim().is_empty() {
            return Err(ChatError::invalid_input("prompt is required"));
        }

        let params = self.limits.resolve(request.temperature, request.max_tokens);

        let system = if request.include_catalog {
            self.catalog_prompt().await
        } else {
            None
        };

        let mut conversation = conversation.lock().await;
        let history = conversation.context().to_vec();

        let generation_request = GenerationRequest {
            system,
            history,
            prompt: request.prompt,
            params,
        };

        tracing::debug!(
            session_id = %conversation.session_id(),
            context_turns = generation_request.history.len(),
            has_system = generation_request.system.is_some(),
            ?params,
            "Invoking model"
        );

        let generation = tokio::time::timeout(self.timeout, self.llm.generate(&generation_request))
            .await
            .map_err(|_| {
                ChatError::upstream(anyhow!(
                    "model did not respond within {}s",
                    self.timeout.as_secs_f32()
                ))
            })??;

        if generation.text.trim().is_empty() {
            return Err(ChatError::malformed(anyhow!("model returned an empty response")));
        }

        let GenerationRequest {
            system,
            history,
            prompt,
            params,
        } = generation_request;

        conversation.append_exchange(Turn::user(prompt), Turn::assistant(generation.text.clone()));

        let result = InvocationResult {
            text: generation.text,
            model_id: self.llm.model_id().to_string(),
            session_id: conversation.session_id(),
            processing_time: started.elapsed(),
            usage: generation.usage,
            has_context: !history.is_empty(),
            has_catalog_context: system.is_some(),
            conversation_length: conversation.len(),
            params,
            completed_at: Utc::now(),
        };

        tracing::info!(
            elapsed_ms = result.processing_time_ms(),
            input_tokens = result.usage.map(|u| u.input_tokens),
            output_tokens = result.usage.map(|u| u.output_tokens),
            conversation_length = result.conversation_length,
            "Invocation completed"
        );

        Ok(result)
    }

    /// The catalog system prompt, `None` if there is no catalog, it failed or it took longer than
    /// the timeout
    async fn catalog_prompt(&self) -> Option<String> {
        let Some(catalog) = &self.catalog else {
            tracing::debug!("Catalog context requested, but no catalog is configured");
            return None;
        };

        match tokio::time::timeout(self.timeout, catalog.system_prompt()).await {
            Ok(Ok(prompt)) => Some(prompt),
            Ok(Err(error)) => {
                tracing::warn!(%error, "Continuing without catalog context");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs_f32(),
                    "Catalog did not respond in time, continuing without catalog context"
                );
                None
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
