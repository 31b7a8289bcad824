//! OpenAI-compatible provider implementation.
//!
//! Works with Ollama, OpenRouter, OpenAI, vLLM and any endpoint exposing
//! `POST <base_url>/chat/completions`.
//!
//! One exchange is at most two HTTP attempts: a 429 or 5xx answer earns a
//! single retry after a short pause. Transport failures are not retried.

use async_trait::async_trait;
use neo_core::error::ProviderError;
use neo_core::message::Message;
use neo_core::provider::{GenerationParams, ProviderRequest, ProviderResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Whole-request timeout, connect through body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Pause before the single retry.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// How much of an error body goes into the log.
const ERROR_BODY_LOG_BYTES: usize = 512;

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    retry_delay: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    ///
    /// An empty `api_key` is treated as absent: no Authorization header is sent.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            retry_delay: RETRY_DELAY,
            client,
        })
    }

    /// Create from the `[model]` config section.
    pub fn from_config(model: &neo_config::ModelConfig) -> Result<Self, ProviderError> {
        Self::new(&model.provider, &model.base_url, model.api_key.clone())
    }

    /// Override the pause before the retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the JSON body. Parameters are normalized here, so every
    /// request on the wire is within the upstream's accepted ranges.
    fn request_body<'a>(model: &'a str, messages: &'a [Message], params: GenerationParams) -> ApiRequest<'a> {
        let params = params.normalized();
        ApiRequest {
            model,
            messages: messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }

    /// One HTTP attempt. Returns the raw body of a 2xx response.
    async fn send_once(&self, url: &str, body: &ApiRequest<'_>) -> Result<Vec<u8>, ProviderError> {
        let mut builder = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let snippet = error_snippet(&bytes);
            warn!(
                provider = %self.name,
                status = status.as_u16(),
                body = %snippet,
                "Provider returned error"
            );
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: snippet,
            });
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl neo_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = self.endpoint();
        let body = Self::request_body(&request.model, &request.messages, request.params);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = body.max_tokens,
            temperature = body.temperature,
            "Sending completion request"
        );

        let raw = match self.send_once(&url, &body).await {
            Err(ProviderError::ApiError { status_code, .. })
                if ProviderError::is_retryable_status(status_code) =>
            {
                warn!(
                    provider = %self.name,
                    status = status_code,
                    delay_ms = self.retry_delay.as_millis() as u64,
                    "Transient upstream failure, retrying once"
                );
                tokio::time::sleep(self.retry_delay).await;
                self.send_once(&url, &body).await?
            }
            other => other?,
        };

        let text = extract_reply(&raw)?;
        debug!(provider = %self.name, chars = text.chars().count(), "Completion received");
        Ok(ProviderResponse { text })
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// The first bytes of an error body, lossily decoded.
fn error_snippet(bytes: &[u8]) -> String {
    let end = bytes.len().min(ERROR_BODY_LOG_BYTES);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Pull the reply text out of a successful response body.
///
/// The standard shape is `choices[0].message.content`. Failing that, the
/// first string-valued `content` field anywhere in the document is used.
fn extract_reply(raw: &[u8]) -> Result<String, ProviderError> {
    if let Ok(parsed) = serde_json::from_slice::<ApiResponse>(raw)
        && let Some(content) = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
    {
        return Ok(content);
    }

    let value: serde_json::Value = serde_json::from_slice(raw)
        .map_err(|e| ProviderError::Extraction(format!("response is not JSON: {e}")))?;

    find_content(&value)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Extraction("no content field in response".into()))
}

/// Depth-first search for the first `"content": "<string>"` pair.
fn find_content(value: &serde_json::Value) -> Option<&str> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                if key == "content"
                    && let Some(s) = child.as_str()
                {
                    return Some(s);
                }
                if let Some(found) = find_content(child) {
                    return Some(found);
                }
            }
            None
        }
        serde_json::Value::Array(items) => items.iter().find_map(find_content),
        _ => None,
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: i64,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_core::Provider;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer, api_key: Option<&str>) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("test", format!("{}/v1/", server.uri()), api_key.map(String::from))
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    fn request(params: GenerationParams) -> ProviderRequest {
        ProviderRequest {
            model: "qwen3:8b".into(),
            messages: vec![Message::system("You are helpful"), Message::user("hello")],
            params,
        }
    }

    fn reply_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        })
    }

    #[tokio::test]
    async fn success_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider_for(&server, None)
            .complete(request(GenerationParams::default()))
            .await
            .unwrap();
        assert_eq!(response.text, "hi there");
    }

    #[tokio::test]
    async fn body_carries_normalized_params_and_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen3:8b",
                "max_tokens": 16384,
                "temperature": 0.7,
                "messages": [
                    {"role": "system", "content": "You are helpful"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider_for(&server, None)
            .complete(request(GenerationParams::new(999_999, 3.5)))
            .await
            .unwrap();
        assert_eq!(response.text, "ok");
    }

    #[tokio::test]
    async fn bearer_header_sent_when_key_present() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("authed")))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider_for(&server, Some("sk-test"))
            .complete(request(GenerationParams::default()))
            .await
            .unwrap();
        assert_eq!(response.text, "authed");
    }

    #[tokio::test]
    async fn no_auth_header_without_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("anon")))
            .mount(&server)
            .await;

        provider_for(&server, Some(""))
            .complete(request(GenerationParams::default()))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(!received[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn retries_once_after_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("recovered")))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider_for(&server, None)
            .complete(request(GenerationParams::default()))
            .await
            .unwrap();
        assert_eq!(response.text, "recovered");
    }

    #[tokio::test]
    async fn retries_once_after_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("after wait")))
            .mount(&server)
            .await;

        let response = provider_for(&server, None)
            .complete(request(GenerationParams::default()))
            .await
            .unwrap();
        assert_eq!(response.text, "after wait");
    }

    #[tokio::test]
    async fn never_makes_a_third_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(2)
            .mount(&server)
            .await;

        let err = provider_for(&server, None)
            .complete(request(GenerationParams::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(502));
    }

    #[tokio::test]
    async fn client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider_for(&server, Some("sk-bad"))
            .complete(request(GenerationParams::default()))
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError { status_code, message } => {
                assert_eq!(status_code, 401);
                assert_eq!(message, "invalid key");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_content_is_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = provider_for(&server, None)
            .complete(request(GenerationParams::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Extraction(_)));
    }

    #[tokio::test]
    async fn non_json_success_is_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("this is not json {{{"))
            .mount(&server)
            .await;

        let err = provider_for(&server, None)
            .complete(request(GenerationParams::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Extraction(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let provider = OpenAiCompatProvider::new("test", "http://127.0.0.1:1/v1", None).unwrap();
        let err = provider
            .complete(request(GenerationParams::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_) | ProviderError::Timeout(_)));
    }

    #[test]
    fn extract_falls_back_to_nested_content() {
        let raw = br#"{"message":{"role":"assistant","content":"from ollama native"}}"#;
        assert_eq!(extract_reply(raw).unwrap(), "from ollama native");
    }

    #[test]
    fn extract_skips_non_string_content() {
        let raw = br#"{"data":{"content":42,"inner":[{"content":"found"}]}}"#;
        assert_eq!(extract_reply(raw).unwrap(), "found");
    }

    #[test]
    fn error_snippet_is_bounded() {
        let body = "x".repeat(2000);
        assert_eq!(error_snippet(body.as_bytes()).len(), 512);
        assert_eq!(error_snippet(b"short"), "short");
    }

    #[test]
    fn trailing_slash_trimmed_from_base_url() {
        let provider = OpenAiCompatProvider::new("ollama", "http://localhost:11434/v1/", None).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/chat/completions");
    }
}
