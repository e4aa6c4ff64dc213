use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ChatBackend, ChatRequest, ImageRequest, ProviderError};

/// How an image is placed in an `image_url` content part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// `data:<mime>;base64,<payload>`, as OpenAI expects.
    DataUrl,
    /// Bare base64 payload (Zhipu GLM vision models).
    RawBase64,
}

/// Sampling used for image description requests.
const VISION_TEMPERATURE: f32 = 0.95;
const VISION_TOP_P: f32 = 0.70;

/// Any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiCompatBackend {
    id: String,
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
    top_p: Option<f32>,
    vision_model: Option<String>,
    image_encoding: ImageEncoding,
}

impl OpenAiCompatBackend {
    /// `base_url` and `chat_path` are joined verbatim.
    pub fn new(
        id: impl Into<String>,
        api_key: impl Into<String>,
        base_url: &str,
        chat_path: &str,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), chat_path),
            model: model.into(),
            temperature: None,
            top_p: None,
            vision_model: None,
            image_encoding: ImageEncoding::DataUrl,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = Some(temperature);
        self.top_p = Some(top_p);
        self
    }

    pub fn with_vision(mut self, model: impl Into<String>, encoding: ImageEncoding) -> Self {
        self.vision_model = Some(model.into());
        self.image_encoding = encoding;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: &serde_json::Value) -> Result<String, ProviderError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000)
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(provider = %self.id, status, body = %text, "chat completion API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_response(api_resp)
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.id
    }

    async fn complete(&self, req: &ChatRequest) -> Result<String, ProviderError> {
        let model = req.model.as_deref().unwrap_or(&self.model);
        let body = build_request_body(req, model, self.temperature, self.top_p);
        debug!(provider = %self.id, model = %model, "sending chat completion");
        self.post(&body).await
    }

    async fn describe_image(&self, req: &ImageRequest) -> Result<String, ProviderError> {
        let Some(model) = self.vision_model.as_deref() else {
            return Err(ProviderError::Unsupported(format!(
                "{} has no vision model configured",
                self.id
            )));
        };
        let body = build_image_body(req, model, self.image_encoding);
        debug!(provider = %self.id, model = %model, bytes = req.image.len(), "sending image description");
        self.post(&body).await
    }
}

fn build_request_body(
    req: &ChatRequest,
    model: &str,
    temperature: Option<f32>,
    top_p: Option<f32>,
) -> serde_json::Value {
    let mut messages = vec![serde_json::json!({
        "role": "system",
        "content": req.system,
    })];

    for m in &req.messages {
        messages.push(serde_json::json!({
            "role": m.role,
            "content": m.content,
        }));
    }

    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
    });
    if let Some(t) = temperature {
        body["temperature"] = serde_json::json!(t);
    }
    if let Some(p) = top_p {
        body["top_p"] = serde_json::json!(p);
    }
    body
}

fn build_image_body(req: &ImageRequest, model: &str, encoding: ImageEncoding) -> serde_json::Value {
    let encoded = base64::engine::general_purpose::STANDARD.encode(&req.image);
    let url = match encoding {
        ImageEncoding::RawBase64 => encoded,
        ImageEncoding::DataUrl => format!("data:{};base64,{}", sniff_mime(&req.image), encoded),
    };

    serde_json::json!({
        "model": model,
        "temperature": VISION_TEMPERATURE,
        "top_p": VISION_TOP_P,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "image_url", "image_url": { "url": url } },
                { "type": "text", "text": req.prompt },
            ],
        }],
    })
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}

fn parse_response(resp: ApiResponse) -> Result<String, ProviderError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response has no choices".to_string()))?;
    if let Some(reasoning) = choice.message.reasoning_content.as_deref() {
        debug!(len = reasoning.len(), "response carried reasoning content");
    }
    Ok(choice.message.content.unwrap_or_default())
}

// API response types (private, deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    /// Reasoning models return their chain of thought here instead of inline.
    reasoning_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_body_has_system_then_user() {
        let req = ChatRequest::single_turn("be brief", "甲: 好的");
        let body = build_request_body(&req, "deepseek-chat", Some(0.8), Some(0.95));
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "甲: 好的");
        assert!((body["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn sampling_is_omitted_when_unset() {
        let req = ChatRequest::single_turn("s", "u");
        let body = build_request_body(&req, "m", None, None);
        assert!(body.get("temperature").is_none());
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn image_body_encodings() {
        let req = ImageRequest {
            prompt: "describe".into(),
            image: vec![0x89, b'P', b'N', b'G', 0, 1],
        };
        let raw = build_image_body(&req, "glm-4v-flash", ImageEncoding::RawBase64);
        let part = &raw["messages"][0]["content"][0];
        assert_eq!(part["type"], "image_url");
        assert_eq!(part["image_url"]["url"], "iVBORwAB");
        assert_eq!(raw["messages"][0]["content"][1]["text"], "describe");

        let data = build_image_body(&req, "gpt-4o", ImageEncoding::DataUrl);
        assert_eq!(
            data["messages"][0]["content"][0]["image_url"]["url"],
            "data:image/png;base64,iVBORwAB"
        );
    }

    #[test]
    fn parses_first_choice() {
        let resp: ApiResponse = serde_json::from_str(
            r#"{"model":"m","choices":[{"message":{"role":"assistant","content":"你好","reasoning_content":"..."},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(parse_response(resp).unwrap(), "你好");
    }

    #[test]
    fn empty_choices_is_parse_error() {
        let resp: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(parse_response(resp), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        let backend = OpenAiCompatBackend::new(
            "deepseek",
            "sk",
            "https://api.deepseek.com/",
            "/v1/chat/completions",
            "deepseek-chat",
        );
        assert_eq!(backend.endpoint(), "https://api.deepseek.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn describe_without_vision_model_is_unsupported() {
        let backend = OpenAiCompatBackend::new("x", "k", "http://127.0.0.1:9", "/c", "m");
        let req = ImageRequest {
            prompt: "p".into(),
            image: vec![1, 2, 3],
        };
        assert!(matches!(
            backend.describe_image(&req).await,
            Err(ProviderError::Unsupported(_))
        ));
    }
}
