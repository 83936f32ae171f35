use bedrock_chat_core::{
    conversation::Role,
    generation::{Generation, GenerationRequest, TokenUsage},
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TitanRequest {
    pub(crate) input_text: String,
    pub(crate) text_generation_config: TitanTextGenerationConfig,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TitanTextGenerationConfig {
    pub(crate) temperature: f32,
    pub(crate) top_p: f32,
    pub(crate) max_token_count: u32,
    pub(crate) stop_sequences: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TitanResponse {
    pub(crate) input_text_token_count: u32,
    pub(crate) results: Vec<TitanTextResult>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TitanTextResult {
    pub(crate) token_count: u32,
    pub(crate) output_text: String,
    pub(crate) completion_reason: Option<String>,
}

impl TitanRequest {
    /// Titan has no message list; the history is rendered as a `User:`/`Bot:` transcript
    pub(crate) fn from_request(request: &GenerationRequest) -> Self {
        let mut input_text = String::new();

        if let Some(system) = &request.system {
            input_text.push_str(system);
            input_text.push_str("\n\n");
        }

        for turn in &request.history {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Bot",
            };
            input_text.push_str(&format!("{speaker}: {}\n", turn.content));
        }

        input_text.push_str(&format!("User: {}\nBot:", request.prompt));

        TitanRequest {
            input_text,
            text_generation_config: TitanTextGenerationConfig {
                temperature: request.params.temperature,
                top_p: 1.0,
                max_token_count: request.params.max_tokens,
                // Keeps the model from writing the user's next line
                stop_sequences: vec!["User:".to_string()],
            },
        }
    }
}

impl TitanResponse {
    pub(crate) fn into_generation(mut self) -> Option<Generation> {
        if self.results.is_empty() {
            return None;
        }

        let result = self.results.swap_remove(0);

        Some(Generation {
            text: result.output_text.trim().to_string(),
            usage: Some(TokenUsage {
                input_tokens: self.input_text_token_count,
                output_tokens: result.token_count,
            }),
            stop_reason: result.completion_reason,
        })
    }
}
