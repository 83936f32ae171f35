use bedrock_chat_core::generation::{Generation, GenerationRequest, TokenUsage};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub(crate) struct LlamaRequest {
    pub(crate) prompt: String,
    pub(crate) max_gen_len: u32,
    pub(crate) temperature: f32,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct LlamaResponse {
    pub(crate) generation: String,
    #[serde(default)]
    pub(crate) prompt_token_count: Option<u32>,
    #[serde(default)]
    pub(crate) generation_token_count: Option<u32>,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
}

fn push_header(prompt: &mut String, role: &str) {
    prompt.push_str("<|start_header_id|>");
    prompt.push_str(role);
    prompt.push_str("<|end_header_id|>\n\n");
}

impl LlamaRequest {
    /// Renders the Llama 3 chat template, ending on an open assistant header
    pub(crate) fn from_request(request: &GenerationRequest) -> Self {
        let mut prompt = String::from("<|begin_of_text|>");

        if let Some(system) = &request.system {
            push_header(&mut prompt, "system");
            prompt.push_str(system);
            prompt.push_str("<|eot_id|>");
        }

        for turn in &request.history {
            push_header(&mut prompt, turn.role.as_ref());
            prompt.push_str(&turn.content);
            prompt.push_str("<|eot_id|>");
        }

        push_header(&mut prompt, "user");
        prompt.push_str(&request.prompt);
        prompt.push_str("<|eot_id|>");
        push_header(&mut prompt, "assistant");

        LlamaRequest {
            prompt,
            max_gen_len: request.params.max_tokens,
            temperature: request.params.temperature,
        }
    }
}

impl LlamaResponse {
    pub(crate) fn into_generation(self) -> Generation {
        let usage = match (self.prompt_token_count, self.generation_token_count) {
            (Some(input_tokens), Some(output_tokens)) => Some(TokenUsage {
                input_tokens,
                output_tokens,
            }),
            _ => None,
        };

        Generation {
            text: self.generation.trim().to_string(),
            usage,
            stop_reason: self.stop_reason,
        }
    }
}
