//! Gemini (Google) image editing provider.

use crate::error::{parse_retry_after, sanitize_error_message, EffectError, Result};
use crate::image::provider::ImageModel;
use crate::image::types::{EffectRequest, EffectResponse, ResponsePart};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Public Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini image model variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
    /// Any other model id, passed through verbatim.
    Custom(String),
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
            Self::Custom(id) => id,
        }
    }
}

impl FromStr for GeminiModel {
    type Err = EffectError;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim().trim_start_matches("models/");
        match id {
            "" => Err(EffectError::Configuration("model id is empty".into())),
            "gemini-2.5-flash-image" | "nano-banana" => Ok(Self::NanoBanana),
            "gemini-3-pro-image-preview" | "nano-banana-pro" => Ok(Self::NanoBananaPro),
            other => Ok(Self::Custom(other.to_string())),
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone)]
pub struct GeminiProviderBuilder {
    model: GeminiModel,
    base_url: String,
    timeout: Option<Duration>,
}

impl Default for GeminiProviderBuilder {
    fn default() -> Self {
        Self {
            model: GeminiModel::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets a timeout for the whole request. No timeout by default.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> Result<GeminiProvider> {
        let mut client = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }

        Ok(GeminiProvider {
            client: client.build()?,
            model: self.model,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            timeout: self.timeout,
        })
    }
}

/// Gemini image editing provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    model: GeminiModel,
    base_url: String,
    timeout: Option<Duration>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Builds a provider from the model, endpoint and timeout in `config`.
    pub fn from_config(config: &crate::EffectConfig) -> Result<Self> {
        Self::builder()
            .model(config.model.clone())
            .base_url(config.base_url.clone())
            .timeout(config.timeout)
            .build()
    }

    /// Returns the configured model.
    pub fn model(&self) -> &GeminiModel {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        )
    }

    async fn generate_impl(
        &self,
        api_key: &str,
        request: &EffectRequest,
    ) -> Result<EffectResponse> {
        let start = Instant::now();
        let url = self.endpoint();
        let body = GeminiRequest::from_effect_request(request);

        tracing::debug!(
            model = self.model.as_str(),
            image_bytes = request.image.len(),
            mime_type = %request.mime_type,
            "sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let raw = response.bytes().await.map_err(|e| self.map_transport(e))?;
        let gemini_response: GeminiResponse = serde_json::from_slice(&raw)?;

        let mut result = gemini_response.into_effect_response()?;
        let duration_ms = start.elapsed().as_millis() as u64;
        result.duration_ms = Some(duration_ms);

        tracing::debug!(
            parts = result.parts.len(),
            duration_ms,
            "Gemini response received"
        );

        Ok(result)
    }

    fn map_transport(&self, err: reqwest::Error) -> EffectError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => EffectError::Timeout(timeout),
            _ => EffectError::Network(err),
        }
    }
}

#[async_trait]
impl ImageModel for GeminiProvider {
    async fn generate(&self, api_key: &str, request: &EffectRequest) -> Result<EffectResponse> {
        self.generate_impl(api_key, request).await
    }

    fn name(&self) -> &str {
        self.model.as_str()
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> EffectError {
    let text = sanitize_error_message(text);
    if status == 404 {
        let mut message = String::from("Model not found. Verify the model name is correct.");
        if !text.is_empty() {
            message.push(' ');
            message.push_str(&text);
        }
        return EffectError::Api { status, message };
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return EffectError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return EffectError::Auth(text);
    }
    // Gemini reports a bad key as 400 INVALID_ARGUMENT
    if status == 400 && text.to_lowercase().contains("api key") {
        return EffectError::Auth(text);
    }
    EffectError::Api {
        status,
        message: text,
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_effect_request(req: &EffectRequest) -> Self {
        // Image first, then the instruction
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: req.mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&req.image),
                },
            },
            GeminiRequestPart::Text {
                text: req.prompt.clone(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GeminiResponse {
    fn into_effect_response(self) -> Result<EffectResponse> {
        // Blocks on the prompt come back as HTTP 200
        if let Some(ref feedback) = self.prompt_feedback {
            if let Some(ref reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .clone()
                    .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
                return Err(EffectError::ContentBlocked(msg));
            }
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(EffectResponse::default());
        };

        if let Some(ref finish_reason) = candidate.finish_reason {
            match finish_reason.as_str() {
                "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "IMAGE_RECITATION"
                | "RECITATION"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST" => {
                    return Err(EffectError::ContentBlocked(format!(
                        "Content blocked by Gemini safety filter: {}",
                        finish_reason
                    )));
                }
                _ => {} // STOP, MAX_TOKENS, NO_IMAGE etc. surface through the parts
            }
        }

        let mut parts = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            // Intermediate "thinking" drafts are not the answer
            if part.thought {
                continue;
            }
            if let Some(inline) = part.inline_data {
                let data = base64::engine::general_purpose::STANDARD
                    .decode(&inline.data)
                    .map_err(|e| EffectError::Decode(e.to_string()))?;
                parts.push(ResponsePart::Image {
                    mime_type: inline.mime_type,
                    data,
                });
            } else if let Some(text) = part.text {
                parts.push(ResponsePart::Text(text));
            }
        }

        Ok(EffectResponse::new(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<EffectResponse> {
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        resp.into_effect_response()
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(GeminiModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiModel::NanoBananaPro.as_str(),
            "gemini-3-pro-image-preview"
        );
        assert_eq!(GeminiModel::Custom("my-model".into()).as_str(), "my-model");
    }

    #[test]
    fn test_gemini_model_default() {
        assert_eq!(GeminiModel::default(), GeminiModel::NanoBanana);
    }

    #[test]
    fn test_gemini_model_from_str() {
        assert_eq!(
            "gemini-2.5-flash-image".parse::<GeminiModel>().unwrap(),
            GeminiModel::NanoBanana
        );
        assert_eq!(
            "models/gemini-3-pro-image-preview"
                .parse::<GeminiModel>()
                .unwrap(),
            GeminiModel::NanoBananaPro
        );
        assert_eq!(
            "gemini-2.5-flash-image-preview"
                .parse::<GeminiModel>()
                .unwrap(),
            GeminiModel::Custom("gemini-2.5-flash-image-preview".into())
        );
        assert!(matches!(
            "  ".parse::<GeminiModel>(),
            Err(EffectError::Configuration(_))
        ));
    }

    #[test]
    fn test_builder_endpoint() {
        let provider = GeminiProviderBuilder::new()
            .model(GeminiModel::NanoBanana)
            .base_url("http://localhost:9000/")
            .timeout(Some(Duration::from_secs(5)))
            .build()
            .unwrap();
        assert_eq!(
            provider.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        assert_eq!(provider.name(), "gemini-2.5-flash-image");
    }

    #[test]
    fn test_from_config() {
        let config = crate::EffectConfig::new("k")
            .with_model(GeminiModel::NanoBananaPro)
            .with_timeout(Duration::from_secs(30));
        let provider = GeminiProvider::from_config(&config).unwrap();
        assert_eq!(provider.model(), &GeminiModel::NanoBananaPro);
        assert_eq!(provider.timeout, Some(Duration::from_secs(30)));
        assert!(provider.endpoint().starts_with(DEFAULT_BASE_URL));
    }

    #[test]
    fn test_request_image_before_prompt() {
        let req = EffectRequest::new("Age this", vec![1, 2, 3], "image/png");
        let gemini_req = GeminiRequest::from_effect_request(&req);
        let json = serde_json::to_value(&gemini_req).unwrap();

        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "AQID");
        assert_eq!(parts[1]["text"], "Age this");
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let req = EffectRequest::new("Age this", vec![0], "image/png");
        let json = serde_json::to_value(GeminiRequest::from_effect_request(&req)).unwrap();

        assert!(json.get("generationConfig").is_some());
        assert!(json.get("generation_config").is_none());
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
    }

    #[test]
    fn test_response_parts_in_order() {
        let resp = parse(
            r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your photocopy."},
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "/9j/"}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#,
        )
        .unwrap();

        assert_eq!(resp.parts.len(), 3);
        assert_eq!(
            resp.parts[0],
            ResponsePart::Text("Here is your photocopy.".into())
        );
        let (mime, data) = resp.first_image().unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A][..]);
    }

    #[test]
    fn test_response_skips_thought_parts() {
        let resp = parse(
            r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "AA=="}, "thought": true},
                        {"inlineData": {"mimeType": "image/png", "data": "AQ=="}}
                    ]
                }
            }]
        }"#,
        )
        .unwrap();
        assert_eq!(resp.parts.len(), 1);
        assert_eq!(resp.first_image().unwrap().1, &[1u8][..]);
    }

    #[test]
    fn test_response_text_only() {
        let resp = parse(
            r#"{
            "candidates": [{
                "content": {"parts": [{"text": "I can't edit this image."}]},
                "finishReason": "STOP"
            }]
        }"#,
        )
        .unwrap();
        assert!(resp.first_image().is_none());
        assert_eq!(resp.text().as_deref(), Some("I can't edit this image."));
    }

    #[test]
    fn test_response_no_candidates() {
        let resp = parse(r#"{"candidates": []}"#).unwrap();
        assert!(resp.parts.is_empty());

        let resp = parse(r#"{}"#).unwrap();
        assert!(resp.parts.is_empty());
    }

    #[test]
    fn test_response_with_prompt_feedback_block() {
        let err = parse(
            r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#,
        )
        .unwrap_err();
        match err {
            EffectError::ContentBlocked(msg) => {
                assert_eq!(msg, "Prompt was blocked due to safety")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_response_safety_finish_reason() {
        let err = parse(r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#).unwrap_err();
        assert!(matches!(err, EffectError::ContentBlocked(_)));
    }

    #[test]
    fn test_response_bad_base64() {
        let err = parse(
            r#"{"candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "not base64!!"}}
            ]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EffectError::Decode(_)));
    }

    #[test]
    fn test_parse_error_mapping() {
        let headers = reqwest::header::HeaderMap::new();

        assert!(matches!(
            parse_error(403, "forbidden", &headers),
            EffectError::Auth(_)
        ));
        assert!(matches!(
            parse_error(
                400,
                r#"{"error":{"message":"API key not valid. Please pass a valid API key."}}"#,
                &headers
            ),
            EffectError::Auth(_)
        ));
        assert!(matches!(
            parse_error(429, "", &headers),
            EffectError::RateLimited { retry_after: None }
        ));
        match parse_error(500, r#"{"error":{"message":"Internal error"}}"#, &headers) {
            EffectError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(parse_error(404, "", &headers).is_transport());
    }

    #[test]
    fn test_not_found_keeps_upstream_detail() {
        let headers = reqwest::header::HeaderMap::new();
        let body = r#"{"error":{"message":"models/gemini-typo is not found for API version v1beta"}}"#;
        match parse_error(404, body, &headers) {
            EffectError::Api { status, message } => {
                assert_eq!(status, 404);
                assert!(message.starts_with("Model not found."));
                assert!(message.contains("models/gemini-typo is not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    mod http {
        use super::*;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::task::JoinHandle;

        /// Reads one HTTP request (headers plus Content-Length body).
        async fn read_request(socket: &mut TcpStream) -> String {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            String::from_utf8_lossy(&buf).into_owned()
        }

        /// Serves `response` to a single connection and hands back the request.
        async fn serve_once(response: String) -> (String, JoinHandle<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let handle = tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
                request
            });
            (format!("http://{addr}"), handle)
        }

        fn http_response(status: &str, body: &str) -> String {
            format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
        }

        fn provider(base_url: &str, timeout: Option<Duration>) -> GeminiProvider {
            GeminiProvider::builder()
                .base_url(base_url)
                .timeout(timeout)
                .build()
                .unwrap()
        }

        fn request() -> EffectRequest {
            EffectRequest::new("Age this", vec![1, 2, 3], "image/png")
        }

        #[tokio::test]
        async fn test_generate_success() {
            let body = r#"{"candidates":[{"content":{"parts":[
                {"text":"Done."},
                {"inlineData":{"mimeType":"image/png","data":"AQID"}}
            ]},"finishReason":"STOP"}]}"#;
            let (url, server) = serve_once(http_response("200 OK", body)).await;

            let resp = provider(&url, None)
                .generate("secret-key", &request())
                .await
                .unwrap();

            assert_eq!(resp.first_image(), Some(("image/png", &[1u8, 2, 3][..])));
            assert_eq!(resp.text().as_deref(), Some("Done."));
            assert!(resp.duration_ms.is_some());

            let raw = server.await.unwrap();
            assert!(raw.starts_with(
                "POST /v1beta/models/gemini-2.5-flash-image:generateContent HTTP/1.1"
            ));
            assert!(raw.to_lowercase().contains("x-goog-api-key: secret-key"));
            assert!(raw.contains(r#""inlineData""#));
        }

        #[tokio::test]
        async fn test_generate_error_status() {
            let body = r#"{"error":{"code":500,"message":"Internal error encountered."}}"#;
            let (url, _server) =
                serve_once(http_response("500 Internal Server Error", body)).await;

            let err = provider(&url, None)
                .generate("k", &request())
                .await
                .unwrap_err();

            match err {
                EffectError::Api { status, message } => {
                    assert_eq!(status, 500);
                    assert_eq!(message, "Internal error encountered.");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_generate_rate_limited() {
            let response = "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 7\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
            let (url, _server) = serve_once(response.to_string()).await;

            let err = provider(&url, None)
                .generate("k", &request())
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                EffectError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(7)
            ));
        }

        #[tokio::test]
        async fn test_generate_truncated_body() {
            let response = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\nConnection: close\r\n\r\n{\"candidates\"";
            let (url, _server) = serve_once(response.to_string()).await;

            let err = provider(&url, Some(Duration::from_secs(10)))
                .generate("k", &request())
                .await
                .unwrap_err();

            assert!(matches!(err, EffectError::Network(_)), "{err:?}");
            assert!(err.is_transport());
        }

        #[tokio::test]
        async fn test_generate_malformed_json() {
            let (url, _server) = serve_once(http_response("200 OK", "<html>oops</html>")).await;

            let err = provider(&url, None)
                .generate("k", &request())
                .await
                .unwrap_err();

            assert!(matches!(err, EffectError::Json(_)));
        }

        #[tokio::test]
        async fn test_generate_timeout() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let _server = tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                // Hold the connection open without answering
                tokio::time::sleep(Duration::from_secs(30)).await;
            });

            let timeout = Duration::from_millis(200);
            let err = provider(&url, Some(timeout))
                .generate("k", &request())
                .await
                .unwrap_err();

            match err {
                EffectError::Timeout(d) => assert_eq!(d, timeout),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
