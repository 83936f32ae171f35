use bedrock_chat_core::{
    conversation::Role,
    generation::{Generation, GenerationRequest},
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub(crate) struct MistralRequest {
    pub(crate) prompt: String,
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f32,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct MistralResponse {
    pub(crate) outputs: Vec<MistralOutput>,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct MistralOutput {
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
}

impl MistralRequest {
    /// Renders the `[INST]` instruction template
    ///
    /// Mistral has no system role, the system prompt is folded into the first instruction. Leading
    /// assistant turns left over from context truncation are skipped, so the prompt always opens
    /// with an instruction.
    pub(crate) fn from_request(request: &GenerationRequest) -> Self {
        let mut prompt = String::from("<s>");
        let mut system = request.system.as_deref();
        let mut open_instruction = false;

        let turns = request
            .history
            .iter()
            .skip_while(|turn| turn.role.is_assistant())
            .map(|turn| (turn.role, turn.content.as_str()))
            .chain(std::iter::once((Role::User, request.prompt.as_str())));

        for (role, text) in turns {
            match role {
                Role::User => {
                    if open_instruction {
                        prompt.push_str("\n\n");
                    } else {
                        prompt.push_str("[INST] ");
                        if let Some(system) = system.take() {
                            prompt.push_str(system);
                            prompt.push_str("\n\n");
                        }
                    }
                    prompt.push_str(text);
                    open_instruction = true;
                }
                Role::Assistant => {
                    if open_instruction {
                        prompt.push_str(" [/INST]");
                        open_instruction = false;
                    }
                    prompt.push(' ');
                    prompt.push_str(text);
                    prompt.push_str("</s>");
                }
            }
        }

        prompt.push_str(" [/INST]");

        MistralRequest {
            prompt,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
        }
    }
}

impl MistralResponse {
    pub(crate) fn into_generation(mut self) -> Option<Generation> {
        if self.outputs.is_empty() {
            return None;
        }

        let output = self.outputs.swap_remove(0);

        Some(Generation {
            text: output.text.trim().to_string(),
            // Mistral reports token counts only in response headers
            usage: None,
            stop_reason: output.stop_reason,
        })
    }
}
