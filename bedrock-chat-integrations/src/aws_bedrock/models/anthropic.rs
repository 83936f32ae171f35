use bedrock_chat_core::{
    conversation::Role,
    generation::{Generation, GenerationRequest, TokenUsage},
};
use serde::{Deserialize, Serialize};

pub(crate) const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

#[derive(Serialize, Debug)]
pub(crate) struct AnthropicRequest<'a> {
    pub(crate) anthropic_version: &'static str,
    pub(crate) max_tokens: u32,
    pub(crate) messages: Vec<AnthropicMessage<'a>>,

    // Optional fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
}

#[derive(Serialize, Debug)]
pub(crate) struct AnthropicMessage<'a> {
    pub(crate) role: Role,
    pub(crate) content: Vec<AnthropicMessageContent<'a>>,
}

#[derive(Serialize, Debug)]
pub(crate) struct AnthropicMessageContent<'a> {
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
    pub(crate) text: &'a str,
}

impl<'a> AnthropicMessageContent<'a> {
    fn text(text: &'a str) -> Self {
        Self { kind: "text", text }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct AnthropicResponse {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) model: Option<String>,
    pub(crate) content: Vec<AnthropicResponseContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) usage: Option<AnthropicUsage>,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct AnthropicResponseContent {
    #[serde(rename = "type")]
    pub(crate) kind: String, // 'text', 'tool_use', ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct AnthropicUsage {
    pub(crate) input_tokens: u32,
    pub(crate) output_tokens: u32,
}

impl<'a> AnthropicRequest<'a> {
    /// Messages must start with the user and alternate; leading assistant turns left over from
    /// context truncation are skipped and consecutive turns of one role share a message.
    pub(crate) fn from_request(request: &'a GenerationRequest) -> Self {
        let mut messages: Vec<AnthropicMessage<'a>> = Vec::with_capacity(request.history.len() + 1);

        let turns = request
            .history
            .iter()
            .skip_while(|turn| turn.role.is_assistant())
            .map(|turn| (turn.role, turn.content.as_str()))
            .chain(std::iter::once((Role::User, request.prompt.as_str())));

        for (role, text) in turns {
            match messages.last_mut() {
                Some(last) if last.role == role => {
                    last.content.push(AnthropicMessageContent::text(text));
                }
                _ => messages.push(AnthropicMessage {
                    role,
                    content: vec![AnthropicMessageContent::text(text)],
                }),
            }
        }

        AnthropicRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: request.params.max_tokens,
            messages,
            system: request.system.as_deref(),
            temperature: Some(request.params.temperature),
        }
    }
}

impl AnthropicResponse {
    /// `None` if there is no text block at all
    pub(crate) fn into_generation(self) -> Option<Generation> {
        let texts = self
            .content
            .into_iter()
            .filter(|content| content.kind == "text")
            .filter_map(|content| content.text)
            .collect::<Vec<_>>();

        if texts.is_empty() {
            return None;
        }

        Some(Generation {
            text: texts.join("\n"),
            usage: self.usage.map(|usage| TokenUsage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
            }),
            stop_reason: self.stop_reason,
        })
    }
}
