use async_trait::async_trait;
use aws_sdk_bedrockruntime::primitives::Blob;
use bedrock_chat_core::{
    LanguageModel,
    errors::ChatError,
    generation::{Generation, GenerationRequest},
};

use super::AwsBedrock;

#[async_trait]
impl LanguageModel for AwsBedrock {
    #[tracing::instrument(skip_all, err, fields(model_id = %self.model_id, family = %self.model_family))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ChatError> {
        let body = self.model_family.build_request_to_bytes(request)?;

        tracing::debug!(
            body = %String::from_utf8_lossy(&body),
            "Invoking model"
        );

        let response_bytes = self
            .client
            .prompt_u8(&self.model_id, Blob::new(body))
            .await
            .map_err(ChatError::upstream)?;

        tracing::debug!(
            "Received response: {}",
            String::from_utf8_lossy(&response_bytes)
        );

        self.model_family.output_from_bytes(&response_bytes)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use crate::aws_bedrock::MockBedrockPrompt;
    use crate::aws_bedrock::models::ModelFamily;

    use super::*;
    use bedrock_chat_core::{conversation::Turn, generation::GenerationParams};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn request() -> GenerationRequest {
        GenerationRequest::builder()
            .history(vec![Turn::user("Hi"), Turn::assistant("Hello")])
            .prompt("How are you?")
            .params(GenerationParams {
                temperature: 0.3,
                max_tokens: 100,
            })
            .build()
            .unwrap()
    }

    fn bedrock(model_id: &str, mock: MockBedrockPrompt) -> AwsBedrock {
        AwsBedrock::builder()
            .model_id(model_id)
            .test_client(mock)
            .build()
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_generate_with_anthropic() {
        let mut bedrock_mock = MockBedrockPrompt::new();
        bedrock_mock
            .expect_prompt_u8()
            .withf(|model_id, _| model_id.to_string() == "anthropic.claude-3-haiku-20240307-v1:0")
            .once()
            .returning(|_, blob| {
                let sent: Value = serde_json::from_slice(blob.as_ref()).unwrap();
                assert_eq!(sent["messages"].as_array().unwrap().len(), 3);
                assert_eq!(sent["max_tokens"], 100);

                Ok(serde_json::to_vec(&json!({
                    "content": [{"type": "text", "text": "Doing well!"}],
                    "stop_reason": "end_turn",
                    "usage": {"input_tokens": 20, "output_tokens": 4}
                }))?)
            });

        let generation = bedrock("anthropic.claude-3-haiku-20240307-v1:0", bedrock_mock)
            .generate(&request())
            .await
            .unwrap();

        assert_eq!(generation.text, "Doing well!");
        assert_eq!(generation.usage.unwrap().output_tokens, 4);
    }

    #[test_log::test(tokio::test)]
    async fn test_generate_with_titan() {
        let mut bedrock_mock = MockBedrockPrompt::new();
        bedrock_mock.expect_prompt_u8().once().returning(|_, blob| {
            let sent: Value = serde_json::from_slice(blob.as_ref()).unwrap();
            assert_eq!(
                sent["inputText"],
                "User: Hi\nBot: Hello\nUser: How are you?\nBot:"
            );

            Ok(serde_json::to_vec(&json!({
                "inputTextTokenCount": 12,
                "results": [{"tokenCount": 3, "outputText": "Doing well!", "completionReason": "FINISH"}]
            }))?)
        });

        let bedrock = bedrock("amazon.titan-text-express-v1", bedrock_mock);
        assert_eq!(bedrock.model_family(), ModelFamily::Titan);

        let generation = bedrock.generate(&request()).await.unwrap();
        assert_eq!(generation.text, "Doing well!");
    }

    #[test_log::test(tokio::test)]
    async fn test_upstream_failure_is_unavailable() {
        let mut bedrock_mock = MockBedrockPrompt::new();
        bedrock_mock
            .expect_prompt_u8()
            .once()
            .returning(|_, _| Err(anyhow::anyhow!("ThrottlingException: slow down")));

        let err = bedrock("mistral.mistral-7b-instruct-v0:2", bedrock_mock)
            .generate(&request())
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::UpstreamUnavailable(_)));
        assert!(err.to_string().contains("slow down"));
    }

    #[test_log::test(tokio::test)]
    async fn test_unexpected_body_is_malformed() {
        let mut bedrock_mock = MockBedrockPrompt::new();
        bedrock_mock
            .expect_prompt_u8()
            .once()
            .returning(|_, _| Ok(br#"{"message": "not what we expected"}"#.to_vec()));

        let err = bedrock("meta.llama3-8b-instruct-v1:0", bedrock_mock)
            .generate(&request())
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::MalformedResponse(_)));
    }
}
