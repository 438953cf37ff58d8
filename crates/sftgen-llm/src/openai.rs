//! OpenAI-compatible Client Implementation
//!
//! Talks to any endpoint exposing `POST {base_url}/chat/completions`.
//!
//! # Features
//!
//! - Bearer-token auth baked into the connection handle's default headers
//! - Fixed per-request timeout (timeouts are not retried)
//! - Exponential backoff on HTTP 429
//! - Text and image (`image_url`) message content
//!
//! # Examples
//!
//! ```no_run
//! use sftgen_domain::ModelEndpointConfig;
//! use sftgen_llm::{ClientConfig, OpenAiClient};
//!
//! let endpoint = ModelEndpointConfig::parse("https://api.openai.com/v1", "sk-...secret", "gpt-4o")
//!     .unwrap();
//! let client = OpenAiClient::new(endpoint, ClientConfig::default()).unwrap();
//! ```

use crate::config::ClientConfig;
use crate::retry::retry_on_rate_limit;
use crate::{LlmClient, LlmError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sftgen_domain::ModelEndpointConfig;
use tracing::debug;

/// Client for OpenAI-compatible chat completion endpoints
pub struct OpenAiClient {
    endpoint: ModelEndpointConfig,
    config: ClientConfig,
    http: Option<reqwest::Client>,
}

/// Request body for the chat completions API
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

/// Response from the chat completions API
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Validate the endpoint and open a connection handle.
    ///
    /// No request is sent; a bad key or model surfaces on the first call.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if the endpoint fails validation or the
    /// HTTP client cannot be built.
    pub fn new(endpoint: ModelEndpointConfig, config: ClientConfig) -> Result<Self, LlmError> {
        endpoint
            .validate()
            .map_err(|e| LlmError::Config(e.to_string()))?;
        config.validate().map_err(LlmError::Config)?;

        let mut client = Self {
            endpoint,
            config,
            http: None,
        };
        client.open()?;
        Ok(client)
    }

    /// Endpoint this client is bound to
    pub fn endpoint(&self) -> &ModelEndpointConfig {
        &self.endpoint
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.base_url_trimmed())
    }

    fn build_http(&self) -> Result<reqwest::Client, LlmError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.endpoint.api_key))
            .map_err(|e| LlmError::Config(format!("Invalid API key header: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);

        reqwest::Client::builder()
            .timeout(self.config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))
    }

    async fn chat(&self, messages: Vec<ChatMessage<'_>>) -> Result<String, LlmError> {
        let http = self.http.as_ref().ok_or(LlmError::Closed)?;
        let url = self.completions_url();
        let request_body = ChatRequest {
            model: &self.endpoint.model_name,
            messages,
        };

        retry_on_rate_limit(&self.config.retry_policy(), || {
            self.send_once(http, &url, &request_body)
        })
        .await
    }

    async fn send_once(
        &self,
        http: &reqwest::Client,
        url: &str,
        request_body: &ChatRequest<'_>,
    ) -> Result<String, LlmError> {
        let response = http
            .post(url)
            .json(request_body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Too many requests".to_string());
            return Err(LlmError::RateLimited(error_text));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.endpoint.model_name.clone()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(e.to_string())
                } else {
                    LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                }
            })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Response contained no message content".to_string()))?;

        debug!("LLM response length: {} chars", content.chars().count());
        Ok(content)
    }
}

fn map_transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(e.to_string())
    } else {
        LlmError::Communication(format!("Request failed: {}", e))
    }
}

impl LlmClient for OpenAiClient {
    async fn complete(&self, system_prompt: &str, content: &str) -> Result<String, LlmError> {
        debug!(
            "Chat completion: system prompt {} chars, content {} chars",
            system_prompt.chars().count(),
            content.chars().count()
        );
        self.chat(vec![
            ChatMessage { role: "system", content: MessageContent::Text(system_prompt) },
            ChatMessage { role: "user", content: MessageContent::Text(content) },
        ])
        .await
    }

    async fn describe_image(&self, system_prompt: &str, image_url: &str) -> Result<String, LlmError> {
        self.chat(vec![
            ChatMessage { role: "system", content: MessageContent::Text(system_prompt) },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url },
                }]),
            },
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.endpoint.model_name
    }

    fn is_open(&self) -> bool {
        self.http.is_some()
    }

    fn open(&mut self) -> Result<(), LlmError> {
        if self.http.is_none() {
            self.http = Some(self.build_http()?);
            debug!("Opened connection to {}", self.endpoint.base_url);
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.http.take().is_some() {
            debug!("Closed connection to {}", self.endpoint.base_url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base_url: &str) -> ModelEndpointConfig {
        ModelEndpointConfig::new(base_url, "sk-test-12345678", "gpt-4o-mini")
    }

    #[test]
    fn test_openai_client_creation() {
        let client = OpenAiClient::new(endpoint("https://api.example.com/v1/"), ClientConfig::default())
            .unwrap();
        assert!(client.is_open());
        assert_eq!(client.model_name(), "gpt-4o-mini");
        assert_eq!(client.completions_url(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = OpenAiClient::new(endpoint("localhost:8000"), ClientConfig::default());
        assert!(matches!(result, Err(LlmError::Config(_))));
    }

    #[test]
    fn test_close_then_open() {
        let mut client = OpenAiClient::new(endpoint("http://localhost:8000"), ClientConfig::default())
            .unwrap();
        client.close();
        assert!(!client.is_open());
        client.open().unwrap();
        assert!(client.is_open());
    }

    #[tokio::test]
    async fn test_closed_client_refuses_calls() {
        let mut client = OpenAiClient::new(endpoint("http://localhost:8000"), ClientConfig::default())
            .unwrap();
        client.close();
        let result = client.complete("system", "hello").await;
        assert_eq!(result.unwrap_err(), LlmError::Closed);
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "m",
            messages: vec![
                ChatMessage { role: "system", content: MessageContent::Text("sys") },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![ContentPart::ImageUrl {
                        image_url: ImageUrl { url: "https://img" },
                    }]),
                },
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"], "sys");
        assert_eq!(json["messages"][1]["content"][0]["type"], "image_url");
        assert_eq!(json["messages"][1]["content"][0]["image_url"]["url"], "https://img");
    }

    #[tokio::test]
    async fn test_openai_error_handling() {
        // Nothing listens on port 1
        let client = OpenAiClient::new(endpoint("http://127.0.0.1:1"), ClientConfig::default())
            .unwrap();

        let result = client.complete("system", "test").await;
        match result {
            Err(LlmError::Communication(_)) | Err(LlmError::Timeout(_)) => {}
            other => panic!("Expected Communication error, got {:?}", other),
        }
    }

    fn fast_config(max_retries: u32) -> ClientConfig {
        ClientConfig {
            timeout_secs: 5,
            max_retries,
            retry_base_delay_secs: 0,
        }
    }

    #[tokio::test]
    async fn test_http_429_maps_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .expect(1)
            .create_async()
            .await;

        let client = OpenAiClient::new(endpoint(&server.url()), fast_config(0)).unwrap();
        let http = client.http.as_ref().unwrap();
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage { role: "user", content: MessageContent::Text("hi") }],
        };

        let result = client.send_once(http, &client.completions_url(), &request).await;
        assert_eq!(result.unwrap_err(), LlmError::RateLimited("slow down".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_persistent_429_exhausts_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = OpenAiClient::new(endpoint(&server.url()), fast_config(2)).unwrap();
        let result = client.complete("system", "hello").await;

        assert!(matches!(result, Err(LlmError::RateLimitExceeded { attempts: 3, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("POST", "/missing/chat/completions")
            .with_status(404)
            .create_async()
            .await;
        let _broken = server
            .mock("POST", "/broken/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let missing = OpenAiClient::new(endpoint(&format!("{}/missing", server.url())), fast_config(3)).unwrap();
        assert_eq!(
            missing.complete("s", "c").await.unwrap_err(),
            LlmError::ModelNotAvailable("gpt-4o-mini".to_string())
        );

        let broken = OpenAiClient::new(endpoint(&format!("{}/broken", server.url())), fast_config(3)).unwrap();
        assert_eq!(
            broken.complete("s", "c").await.unwrap_err(),
            LlmError::Api { status: 500, message: "boom".to_string() }
        );
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test-12345678")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"你好"}}]}"#)
            .create_async()
            .await;

        let client = OpenAiClient::new(endpoint(&server.url()), fast_config(0)).unwrap();
        assert_eq!(client.complete("s", "c").await.unwrap(), "你好");
    }

    #[tokio::test]
    async fn test_silent_endpoint_times_out_without_retry() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = accepted.clone();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                held.push(socket);
            }
        });

        let config = ClientConfig {
            timeout_secs: 1,
            max_retries: 3,
            retry_base_delay_secs: 0,
        };
        let client = OpenAiClient::new(endpoint(&format!("http://{}", addr)), config).unwrap();
        let result = client.complete("system", "hello").await;

        assert!(matches!(result, Err(LlmError::Timeout(_))), "got {:?}", result);
        assert_eq!(accepted.load(std::sync::atomic::Ordering::SeqCst), 1);
        server.abort();
    }

    // Integration tests (requires a reachable endpoint)
    #[tokio::test]
    #[ignore]
    async fn test_openai_complete_integration() {
        let base_url = std::env::var("SFTGEN_BASE_URL").unwrap_or_default();
        let api_key = std::env::var("SFTGEN_API_KEY").unwrap_or_default();
        let model = std::env::var("SFTGEN_MODEL").unwrap_or_default();
        let endpoint = ModelEndpointConfig::new(base_url, api_key, model);
        let client = OpenAiClient::new(endpoint, ClientConfig::default()).unwrap();

        let response = client.complete("Reply with one word.", "Say hello").await.unwrap();
        assert!(!response.is_empty());
    }
}
