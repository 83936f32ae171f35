use anyhow::Context as _;
use bedrock_chat_core::{
    errors::ChatError,
    generation::{Generation, GenerationRequest},
};
use serde::{Serialize, de::DeserializeOwned};

mod anthropic;
mod meta;
mod mistral;
mod titan;

pub(crate) use anthropic::*;
pub(crate) use meta::*;
pub(crate) use mistral::*;
pub(crate) use titan::*;

/// Cross-region inference profile prefixes, e.g. `us.anthropic.claude-3-5-sonnet-...`
const INFERENCE_PROFILE_PREFIXES: &[&str] =
    &["us", "eu", "apac", "us-gov", "ca", "jp", "au", "global"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display, strum_macros::AsRefStr)]
#[strum(serialize_all = "snake_case")]
/// The model family to use for bedrock
///
/// In bedrock, models of a family share their request and response format.
pub enum ModelFamily {
    /// The anthropic model family, only the newer messaging API is supported
    Anthropic,
    /// The titan text model family
    Titan,
    /// Meta llama 3 and newer
    MetaLlama,
    /// Mistral instruct models
    Mistral,
}

impl ModelFamily {
    /// Infers the family from a model id, inference profile id or arn
    ///
    /// # Errors
    ///
    /// Errors with `UnsupportedModel` if the id does not belong to a known family
    pub fn from_model_id(model_id: &str) -> Result<Self, ChatError> {
        let base = model_id
            .rsplit('/')
            .next()
            .unwrap_or(model_id)
            .to_ascii_lowercase();

        let base = match base.split_once('.') {
            Some((prefix, rest)) if INFERENCE_PROFILE_PREFIXES.contains(&prefix) => rest,
            _ => base.as_str(),
        };

        if base.starts_with("anthropic.") {
            Ok(ModelFamily::Anthropic)
        } else if base.starts_with("amazon.titan-text") || base.starts_with("amazon.titan-tg1") {
            Ok(ModelFamily::Titan)
        } else if base.starts_with("meta.llama") {
            Ok(ModelFamily::MetaLlama)
        } else if base.starts_with("mistral.") {
            Ok(ModelFamily::Mistral)
        } else {
            Err(ChatError::unsupported_model(model_id))
        }
    }

    /// Advertised context window of the family, in tokens
    pub fn context_window(self) -> u32 {
        match self {
            ModelFamily::Anthropic => 200_000,
            ModelFamily::Titan => 8_192,
            ModelFamily::MetaLlama => 128_000,
            ModelFamily::Mistral => 32_000,
        }
    }

    #[tracing::instrument(skip_all, fields(family = %self))]
    pub(crate) fn build_request_to_bytes(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<u8>, ChatError> {
        match self {
            ModelFamily::Anthropic => to_bytes(&AnthropicRequest::from_request(request)),
            ModelFamily::Titan => to_bytes(&TitanRequest::from_request(request)),
            ModelFamily::MetaLlama => to_bytes(&LlamaRequest::from_request(request)),
            ModelFamily::Mistral => to_bytes(&MistralRequest::from_request(request)),
        }
    }

    #[tracing::instrument(skip_all, fields(family = %self))]
    pub(crate) fn output_from_bytes(&self, response_bytes: &[u8]) -> Result<Generation, ChatError> {
        let generation = match self {
            ModelFamily::Anthropic => {
                from_bytes::<AnthropicResponse>(response_bytes)?.into_generation()
            }
            ModelFamily::Titan => from_bytes::<TitanResponse>(response_bytes)?.into_generation(),
            ModelFamily::MetaLlama => {
                Some(from_bytes::<LlamaResponse>(response_bytes)?.into_generation())
            }
            ModelFamily::Mistral => {
                from_bytes::<MistralResponse>(response_bytes)?.into_generation()
            }
        };

        generation.ok_or_else(|| ChatError::malformed(anyhow::anyhow!("No results returned")))
    }
}

fn to_bytes(request: &impl Serialize) -> Result<Vec<u8>, ChatError> {
    serde_json::to_vec(request)
        .context("Failed to serialize request")
        .map_err(|err| ChatError::invalid_input(format!("{err:#}")))
}

fn from_bytes<T: DeserializeOwned>(response_bytes: &[u8]) -> Result<T, ChatError> {
    serde_json::from_slice(response_bytes)
        .context("Failed to parse response")
        .map_err(ChatError::malformed)
}

/// Builds the `InvokeModel` body for `model_id`
///
/// # Errors
///
/// Errors with `UnsupportedModel` if the model family is unknown
pub fn build_request(model_id: &str, request: &GenerationRequest) -> Result<Vec<u8>, ChatError> {
    ModelFamily::from_model_id(model_id)?.build_request_to_bytes(request)
}

/// Parses an `InvokeModel` response body produced by `model_id`
///
/// # Errors
///
/// Errors with `UnsupportedModel` if the model family is unknown, and with `MalformedResponse` if
/// the body does not have the shape of that family
pub fn parse_response(model_id: &str, response_bytes: &[u8]) -> Result<Generation, ChatError> {
    ModelFamily::from_model_id(model_id)?.output_from_bytes(response_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedrock_chat_core::{
        conversation::Turn,
        generation::{GenerationParams, TokenUsage},
    };
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use test_case::test_case;

    fn request(history: Vec<Turn>, system: Option<&str>) -> GenerationRequest {
        let mut builder = GenerationRequest::builder();
        builder
            .history(history)
            .prompt("What is AWS Bedrock?")
            .params(GenerationParams {
                temperature: 0.5,
                max_tokens: 256,
            });
        if let Some(system) = system {
            builder.system(system);
        }
        builder.build().unwrap()
    }

    fn as_json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test_case("anthropic.claude-3-sonnet-20240229-v1:0", ModelFamily::Anthropic ; "anthropic")]
    #[test_case("us.anthropic.claude-3-5-sonnet-20241022-v2:0", ModelFamily::Anthropic ; "anthropic inference profile")]
    #[test_case("arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-v2", ModelFamily::Anthropic ; "anthropic arn")]
    #[test_case("amazon.titan-text-express-v1", ModelFamily::Titan ; "titan express")]
    #[test_case("amazon.titan-tg1-large", ModelFamily::Titan ; "titan legacy")]
    #[test_case("meta.llama3-8b-instruct-v1:0", ModelFamily::MetaLlama ; "llama")]
    #[test_case("eu.meta.llama3-2-3b-instruct-v1:0", ModelFamily::MetaLlama ; "llama profile")]
    #[test_case("mistral.mistral-7b-instruct-v0:2", ModelFamily::Mistral ; "mistral")]
    fn test_family_from_model_id(model_id: &str, expected: ModelFamily) {
        assert_eq!(ModelFamily::from_model_id(model_id).unwrap(), expected);
    }

    #[test_case("amazon.titan-embed-text-v2:0" ; "embedding model")]
    #[test_case("cohere.command-r-v1:0" ; "unknown provider")]
    #[test_case("" ; "empty")]
    #[test_case("us.unknown.model" ; "unknown behind profile")]
    fn test_unsupported_model_ids(model_id: &str) {
        let err = ModelFamily::from_model_id(model_id).unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedModel(ref id) if id == model_id));
    }

    #[test]
    fn test_anthropic_request_with_history() {
        let history = vec![
            Turn::assistant("orphaned by truncation"),
            Turn::user("Hi"),
            Turn::assistant("Hello! How can I help?"),
        ];

        let bytes = ModelFamily::Anthropic
            .build_request_to_bytes(&request(history, Some("Be brief")))
            .unwrap();

        assert_eq!(
            as_json(&bytes),
            json!({
                "anthropic_version": "bedrock-2023-05-31",
                "max_tokens": 256,
                "system": "Be brief",
                "temperature": 0.5,
                "messages": [
                    {"role": "user", "content": [{"type": "text", "text": "Hi"}]},
                    {"role": "assistant", "content": [{"type": "text", "text": "Hello! How can I help?"}]},
                    {"role": "user", "content": [{"type": "text", "text": "What is AWS Bedrock?"}]},
                ]
            })
        );
    }

    #[test]
    fn test_anthropic_merges_consecutive_roles() {
        let bytes = ModelFamily::Anthropic
            .build_request_to_bytes(&request(vec![Turn::user("First")], None))
            .unwrap();

        let json = as_json(&bytes);
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(
            json["messages"][0]["content"],
            json!([
                {"type": "text", "text": "First"},
                {"type": "text", "text": "What is AWS Bedrock?"}
            ])
        );
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_titan_request_renders_transcript() {
        let history = vec![Turn::user("Hi"), Turn::assistant("Hello")];

        let bytes = ModelFamily::Titan
            .build_request_to_bytes(&request(history, None))
            .unwrap();

        assert_eq!(
            as_json(&bytes),
            json!({
                "inputText": "User: Hi\nBot: Hello\nUser: What is AWS Bedrock?\nBot:",
                "textGenerationConfig": {
                    "temperature": 0.5,
                    "topP": 1.0,
                    "maxTokenCount": 256,
                    "stopSequences": ["User:"]
                }
            })
        );
    }

    #[test]
    fn test_llama_request_renders_chat_template() {
        let bytes = ModelFamily::MetaLlama
            .build_request_to_bytes(&request(vec![], Some("Be brief")))
            .unwrap();

        assert_eq!(
            as_json(&bytes),
            json!({
                "prompt": "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\nBe brief<|eot_id|><|start_header_id|>user<|end_header_id|>\n\nWhat is AWS Bedrock?<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n",
                "max_gen_len": 256,
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn test_mistral_request_renders_instructions() {
        let history = vec![Turn::user("Hi"), Turn::assistant("Hello")];

        let bytes = ModelFamily::Mistral
            .build_request_to_bytes(&request(history, Some("Be brief")))
            .unwrap();

        assert_eq!(
            as_json(&bytes)["prompt"],
            "<s>[INST] Be brief\n\nHi [/INST] Hello</s>[INST] What is AWS Bedrock? [/INST]"
        );
    }

    #[test]
    fn test_mistral_request_opens_with_an_instruction() {
        // Context truncation cut off the question this answer belonged to
        let history = vec![
            Turn::assistant("Orphaned answer"),
            Turn::user("Hi"),
            Turn::assistant("Hello"),
        ];

        let bytes = ModelFamily::Mistral
            .build_request_to_bytes(&request(history, None))
            .unwrap();

        assert_eq!(
            as_json(&bytes)["prompt"],
            "<s>[INST] Hi [/INST] Hello</s>[INST] What is AWS Bedrock? [/INST]"
        );
    }

    #[test]
    fn test_parse_anthropic_response() {
        let body = json!({
            "id": "msg_01",
            "model": "claude-3-sonnet",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Bedrock is a managed service."},
                {"type": "tool_use", "id": "toolu_01", "name": "noop", "input": {}}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        });

        let generation = parse_response(
            "anthropic.claude-3-sonnet-20240229-v1:0",
            &serde_json::to_vec(&body).unwrap(),
        )
        .unwrap();

        assert_eq!(
            generation,
            Generation::new("Bedrock is a managed service.")
                .with_usage(TokenUsage {
                    input_tokens: 12,
                    output_tokens: 7
                })
                .with_stop_reason("end_turn")
        );
    }

    #[test]
    fn test_parse_titan_response() {
        let body = json!({
            "inputTextTokenCount": 5,
            "results": [{"tokenCount": 3, "outputText": " Hello there", "completionReason": "FINISH"}]
        });

        let generation = parse_response(
            "amazon.titan-text-express-v1",
            &serde_json::to_vec(&body).unwrap(),
        )
        .unwrap();

        assert_eq!(generation.text, "Hello there");
        assert_eq!(
            generation.usage,
            Some(TokenUsage {
                input_tokens: 5,
                output_tokens: 3
            })
        );
    }

    #[test]
    fn test_parse_llama_and_mistral_responses() {
        let llama = json!({
            "generation": "Hi!",
            "prompt_token_count": 10,
            "generation_token_count": 2,
            "stop_reason": "stop"
        });
        let generation = parse_response(
            "meta.llama3-8b-instruct-v1:0",
            &serde_json::to_vec(&llama).unwrap(),
        )
        .unwrap();
        assert_eq!(generation.text, "Hi!");
        assert_eq!(generation.usage.unwrap().total_tokens(), 12);

        let mistral = json!({"outputs": [{"text": " Bonjour", "stop_reason": "stop"}]});
        let generation = parse_response(
            "mistral.mistral-7b-instruct-v0:2",
            &serde_json::to_vec(&mistral).unwrap(),
        )
        .unwrap();
        assert_eq!(generation.text, "Bonjour");
        assert_eq!(generation.usage, None);
    }

    #[test_case(ModelFamily::Anthropic, json!({"completion": "legacy"}) ; "anthropic missing content")]
    #[test_case(ModelFamily::Anthropic, json!({"content": [{"type": "tool_use"}]}) ; "anthropic without text")]
    #[test_case(ModelFamily::Titan, json!({"inputTextTokenCount": 1, "results": []}) ; "titan no results")]
    #[test_case(ModelFamily::MetaLlama, json!({"outputs": []}) ; "llama wrong shape")]
    #[test_case(ModelFamily::Mistral, json!({"outputs": []}) ; "mistral no outputs")]
    fn test_malformed_responses(family: ModelFamily, body: Value) {
        let err = family
            .output_from_bytes(&serde_json::to_vec(&body).unwrap())
            .unwrap_err();

        assert!(matches!(err, ChatError::MalformedResponse(_)), "{err}");
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = ModelFamily::Titan.output_from_bytes(b"<html>").unwrap_err();
        assert!(err.to_string().starts_with("malformed response: Failed to parse response"));
    }

    #[test]
    fn test_build_request_rejects_unknown_family() {
        let err = build_request("ai21.j2-ultra-v1", &request(vec![], None)).unwrap_err();
        assert_eq!(err.kind(), "unsupported_model");
    }
}
