use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use snaptext_config::{ApiKey, Config};

use crate::response::{extract_text, snippet};
use crate::{EncodedImage, OcrError};

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatRequest {
    /// One user message: the image first, then the instruction
    pub fn for_image(model: &str, image: &EncodedImage, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    RequestPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_uri(),
                        },
                    },
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        }
    }
}

/// Delivers a chat request and returns the raw response body
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, api_key: &ApiKey, request: &ChatRequest) -> Result<String, OcrError>;
}

/// OpenAI-compatible `/chat/completions` over HTTPS
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, api_key: &ApiKey, request: &ChatRequest) -> Result<String, OcrError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OcrError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(body)
    }
}

/// `error.message` when the provider sent one, otherwise the start of the body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| snippet(body))
}

/// Text recognition through a vision chat model
pub struct OcrClient<T = HttpTransport> {
    transport: T,
    api_key: Option<ApiKey>,
    model: String,
    prompt: String,
}

impl OcrClient<HttpTransport> {
    pub fn from_config(config: &Config) -> Result<Self, OcrError> {
        let transport = HttpTransport::new(
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
        )?;
        tracing::info!(
            "OCR endpoint {} with model {}",
            transport.endpoint(),
            config.api.model
        );

        Ok(Self::new(
            transport,
            config.credential.clone(),
            config.api.model.clone(),
            config.api.prompt.clone(),
        ))
    }
}

impl<T: ChatTransport> OcrClient<T> {
    pub fn new(transport: T, api_key: Option<ApiKey>, model: String, prompt: String) -> Self {
        Self {
            transport,
            api_key,
            model,
            prompt,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Single attempt, no retries. Without a key nothing is sent.
    pub async fn recognize(&self, image: &EncodedImage) -> Result<String, OcrError> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!("API key not set, skipping OCR request");
            return Err(OcrError::MissingCredential);
        };

        let request = ChatRequest::for_image(&self.model, image, &self.prompt);
        tracing::info!(
            "Sending OCR request ({} base64 bytes) to model {}",
            image.base64.len(),
            self.model
        );

        let body = self.transport.send(api_key, &request).await?;
        tracing::debug!("OCR response: {}", snippet(&body));

        match extract_text(&body) {
            Ok(text) => {
                tracing::info!("Recognized {} chars", text.chars().count());
                Ok(text)
            }
            Err(e) => {
                if let OcrError::MalformedResponse { snippet } = &e {
                    tracing::error!("Could not find text in OCR response: {}", snippet);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    struct StubTransport {
        body: Result<String, (u16, String)>,
        calls: AtomicUsize,
        seen_keys: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn replying(body: &str) -> Self {
            Self {
                body: Ok(body.to_string()),
                calls: AtomicUsize::new(0),
                seen_keys: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16, message: &str) -> Self {
            Self {
                body: Err((status, message.to_string())),
                calls: AtomicUsize::new(0),
                seen_keys: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for StubTransport {
        async fn send(&self, api_key: &ApiKey, _request: &ChatRequest) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_keys
                .lock()
                .unwrap()
                .push(api_key.expose().to_string());
            match &self.body {
                Ok(body) => Ok(body.clone()),
                Err((status, message)) => Err(OcrError::Api {
                    status: *status,
                    message: message.clone(),
                }),
            }
        }
    }

    fn image() -> EncodedImage {
        EncodedImage {
            base64: "AAAA".to_string(),
            mime: "image/jpeg",
        }
    }

    fn client(transport: StubTransport, key: Option<&str>) -> OcrClient<StubTransport> {
        OcrClient::new(
            transport,
            key.and_then(ApiKey::parse),
            "qwen3-vl-plus".to_string(),
            "read it".to_string(),
        )
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest::for_image("qwen3-vl-plus", &image(), "read it");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "model": "qwen3-vl-plus",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AAAA"}},
                        {"type": "text", "text": "read it"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let transport = HttpTransport::new("https://example.com/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.endpoint(), "https://example.com/v1/chat/completions");
    }

    #[test]
    fn test_api_error_message() {
        assert_eq!(
            api_error_message(r#"{"error": {"message": "Invalid API key"}}"#),
            "Invalid API key"
        );
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_recognize_returns_text() {
        let ocr = client(
            StubTransport::replying(r#"{"choices": [{"message": {"content": "hello"}}]}"#),
            Some("sk-test"),
        );

        assert_eq!(ocr.recognize(&image()).await.unwrap(), "hello");
        assert_eq!(ocr.transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*ocr.transport.seen_keys.lock().unwrap(), vec!["sk-test"]);
    }

    #[tokio::test]
    async fn test_missing_credential_skips_network() {
        let ocr = client(StubTransport::replying("{}"), None);

        assert!(matches!(
            ocr.recognize(&image()).await,
            Err(OcrError::MissingCredential)
        ));
        assert_eq!(ocr.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_api_failure_is_single_attempt() {
        let ocr = client(StubTransport::failing(401, "Invalid API key"), Some("sk-test"));

        let err = ocr.recognize(&image()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(err, OcrError::Api { status: 401, .. }));
        assert_eq!(ocr.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let ocr = client(StubTransport::replying(r#"{"object": "list"}"#), Some("sk-test"));

        assert!(matches!(
            ocr.recognize(&image()).await,
            Err(OcrError::MalformedResponse { .. })
        ));
    }
}
