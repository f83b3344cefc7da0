//! OpenAI-compatible chat completion and embedding clients
//!
//! Works against any server exposing `/v1/chat/completions` and
//! `/v1/embeddings` (OpenAI, Ollama, vLLM, llama.cpp server, ...).

use crate::client::{CompletionRequest, CompletionResponse, LanguageOracle};
use crate::embedding::{Embedding, EmbeddingOracle};
use crate::error::{LlmError, LlmResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default base URL (local Ollama)
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionReply {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingReply {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Shared HTTP plumbing for both clients
#[derive(Clone)]
struct Endpoint {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl Endpoint {
    fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http: reqwest::Client::new(),
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> LlmResult<R> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse {path} reply: {e}")))
    }
}

/// Chat completion client
pub struct OpenAiClient {
    endpoint: Endpoint,
    model: String,
}

impl OpenAiClient {
    /// Create a client for `model`; `base_url` defaults to [`DEFAULT_BASE_URL`]
    pub fn new(
        base_url: Option<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            endpoint: Endpoint::new(base_url, api_key),
            model: model.into(),
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.endpoint.base_url
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatCompletionBody<'a> {
        ChatCompletionBody {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl LanguageOracle for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        debug!(
            model = %self.model,
            operation = request.label_or_default(),
            message_count = request.messages.len(),
            "Sending chat completion"
        );

        let reply: ChatCompletionReply = self
            .endpoint
            .post("/v1/chat/completions", &self.build_body(&request))
            .await?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in completion reply".into()))?;

        Ok(CompletionResponse {
            content,
            model: reply.model.unwrap_or_else(|| self.model.clone()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Embedding client
pub struct OpenAiEmbeddings {
    endpoint: Endpoint,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddings {
    /// Create a client for `model` producing `dimensions`-long vectors
    pub fn new(
        base_url: Option<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            endpoint: Endpoint::new(base_url, api_key),
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingOracle for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> LlmResult<Embedding> {
        let reply: EmbeddingReply = self
            .endpoint
            .post(
                "/v1/embeddings",
                &EmbeddingBody {
                    model: &self.model,
                    input: text,
                },
            )
            .await?;

        let vector = reply
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::InvalidResponse("no data in embedding reply".into()))?;

        if self.dimensions != 0 && vector.len() != self.dimensions {
            return Err(LlmError::InvalidResponse(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                vector.len()
            )));
        }

        Ok(Embedding::new(vector, self.model.clone()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatMessage;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn request_body_matches_openai_format() {
        let client = OpenAiClient::new(None, "gpt-4o-mini", Some("sk-test".to_string()));
        let request = CompletionRequest::from_messages(vec![
            ChatMessage::system("Be terse."),
            ChatMessage::user("Hello"),
        ])
        .with_temperature(0.0)
        .with_label("episode_identification");

        let json = serde_json::to_value(client.build_body(&request)).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["temperature"], 0.0);
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("label").is_none());

        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "Hello");
    }

    #[test]
    fn default_base_url_is_ollama() {
        let client = OpenAiClient::new(None, "llama3", None);
        assert_eq!(client.base_url(), "http://localhost:11434");

        let client = OpenAiClient::new(Some("http://example.com/".into()), "llama3", None);
        assert_eq!(client.base_url(), "http://example.com");
    }

    #[tokio::test]
    async fn completes_against_compatible_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "llama3" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3",
                "choices": [
                    { "message": { "role": "assistant", "content": "ai, chat, greeting" } }
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(Some(server.uri()), "llama3", Some("sk-test".into()));
        let response = client
            .complete(CompletionRequest::prompt("Hi!"))
            .await
            .unwrap();

        assert_eq!(response.content, "ai, chat, greeting");
        assert_eq!(response.model, "llama3");
    }

    #[tokio::test]
    async fn server_errors_are_reported_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(Some(server.uri()), "llama3", None);
        let err = client
            .complete(CompletionRequest::prompt("Hi!"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 503, ref body } if body == "overloaded"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn embeds_against_compatible_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(json!({ "input": "ai,chat,greeting" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [ { "embedding": [0.5, 0.25, -0.25] } ]
            })))
            .mount(&server)
            .await;

        let embeddings = OpenAiEmbeddings::new(Some(server.uri()), "all-minilm", None, 3);
        let embedding = embeddings.embed("ai,chat,greeting").await.unwrap();

        assert_eq!(embedding.vector, vec![0.5, 0.25, -0.25]);
        assert_eq!(embedding.dimensions, 3);
        assert_eq!(embedding.model, "all-minilm");
    }

    #[tokio::test]
    async fn embedding_dimension_mismatch_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [ { "embedding": [0.5, 0.25] } ]
            })))
            .mount(&server)
            .await;

        let embeddings = OpenAiEmbeddings::new(Some(server.uri()), "all-minilm", None, 384);
        let err = embeddings.embed("anything").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
