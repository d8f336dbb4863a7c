//! Client for the external reasoning service.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// A service that answers a prompt with free text.
///
/// One call is one outbound attempt; implementations must not retry.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, messages: Vec<Message>) -> Result<String, AnalysisError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct HttpReasoningClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl HttpReasoningClient {
    /// Build a client from configuration, reading the credential from the
    /// environment. A missing credential is allowed.
    pub fn from_config(config: &AnalysisConfig) -> anyhow::Result<Self> {
        Self::new(config, config.api_key())
    }

    /// Fails only if the HTTP client itself cannot be set up, e.g. when the
    /// TLS backend does not initialise.
    pub fn new(config: &AnalysisConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client for the reasoning service")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningClient {
    async fn complete(&self, messages: Vec<Message>) -> Result<String, AnalysisError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AnalysisError::MissingCredential)?;

        debug!(endpoint = %self.endpoint, model = %self.model, "Sending analysis request");

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AnalysisError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one HTTP exchange with a canned response.
    ///
    /// Returns the base URL to point the client at and a handle yielding the
    /// raw request the server received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (base_url, handle)
    }

    /// Read headers and a `Content-Length` body
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client_for(base_url: String) -> HttpReasoningClient {
        let config = AnalysisConfig {
            base_url,
            model: "test-model".to_string(),
            ..AnalysisConfig::default()
        };
        HttpReasoningClient::new(&config, Some("test-key".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_returns_first_choice_content() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"summary\":\"ok\"}"}}]}"#,
        )
        .await;

        let reply = client_for(base_url)
            .complete(vec![Message::system("s"), Message::user("u")])
            .await
            .unwrap();
        assert_eq!(reply, r#"{"summary":"ok"}"#);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /chat/completions "));
        assert!(request
            .lines()
            .any(|line| line.eq_ignore_ascii_case("authorization: Bearer test-key")));
        assert!(request.contains(r#""model":"test-model""#));
        assert!(request.contains(r#""type":"json_object""#));
    }

    #[tokio::test]
    async fn test_error_status_is_a_failure() {
        let (base_url, server) = serve_once("503 Service Unavailable", "busy").await;

        let err = client_for(base_url)
            .complete(vec![Message::user("u")])
            .await
            .unwrap_err();
        server.await.unwrap();

        match err {
            AnalysisError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_null_content_is_empty() {
        let (base_url, server) =
            serve_once("200 OK", r#"{"choices":[{"message":{"content":null}}]}"#).await;

        let err = client_for(base_url)
            .complete(vec![Message::user("u")])
            .await
            .unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, AnalysisError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_no_choices_is_empty() {
        let (base_url, server) = serve_once("200 OK", r#"{"choices":[]}"#).await;

        let err = client_for(base_url)
            .complete(vec![Message::user("u")])
            .await
            .unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, AnalysisError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let (base_url, server) = serve_once("200 OK", "<html>gateway</html>").await;

        let err = client_for(base_url)
            .complete(vec![Message::user("u")])
            .await
            .unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_failure() {
        // Bind then drop, so nothing listens on the port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client_for(base_url)
            .complete(vec![Message::user("u")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = AnalysisConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..AnalysisConfig::default()
        };
        let client = HttpReasoningClient::new(&config, None).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
        assert!(!client.has_credential());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_network() {
        let config = AnalysisConfig {
            // Unroutable; must never be contacted
            base_url: "http://192.0.2.1:9".to_string(),
            ..AnalysisConfig::default()
        };
        let client = HttpReasoningClient::new(&config, None).unwrap();

        let err = client
            .complete(vec![Message::user("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingCredential));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![Message::system("s"), Message::user("u")],
            temperature: 0.2,
            max_tokens: 10,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][1]["role"], "user");
    }
}
