/// OpenAI-compatible provider
///
/// Serves both capabilities against one API root:
/// 1. Outfit selection: POST /chat/completions → `choices[0].message.content`
/// 2. Try-on composition: POST /images/edits (multipart) → `data[0].b64_json`
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{multipart, Client as HttpClient};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::providers::{
    build_http_client, classify_status, classify_transport, CallFailure, CallResult, ChatProvider,
    ChatRequest, FailureKind, ImageProvider,
};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiProvider {
    chat_client: HttpClient,
    image_client: HttpClient,
    api_key: String,
    api_url: String,
    image_model: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        api_url: String,
        image_model: String,
        chat_timeout: Duration,
        image_timeout: Duration,
    ) -> Self {
        Self {
            chat_client: build_http_client(chat_timeout),
            image_client: build_http_client(image_timeout),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            image_model,
        }
    }

    async fn image_part(path: &Path) -> CallResult<multipart::Part> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            CallFailure::new(
                FailureKind::BadResponse,
                format!("failed to read image {}: {}", path.display(), e),
            )
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());

        let mime = mime_for(&bytes, path);
        multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| CallFailure::new(FailureKind::BadResponse, e.to_string()))
    }
}

/// Content type of an upload: sniffed from the bytes, else from the extension
fn mime_for(bytes: &[u8], path: &Path) -> &'static str {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type();
    }

    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Reads a non-2xx body into a failure, keeping the provider's message
async fn status_failure(response: reqwest::Response) -> CallFailure {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    CallFailure::new(
        classify_status(status),
        format!("API returned status {}: {}", status, body),
    )
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, request: &ChatRequest) -> CallResult<String> {
        let url = format!("{}/chat/completions", self.api_url);

        let response = self
            .chat_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CallFailure::new(classify_transport(&e), e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_failure(response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CallFailure::new(classify_transport(&e), e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                CallFailure::new(FailureKind::BadResponse, "response has no message content")
            })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait::async_trait]
impl ImageProvider for OpenAiProvider {
    async fn compose(
        &self,
        base: &Path,
        garments: &[PathBuf],
        instruction: &str,
    ) -> CallResult<Vec<u8>> {
        let url = format!("{}/images/edits", self.api_url);

        let mut form = multipart::Form::new()
            .text("model", self.image_model.clone())
            .text("prompt", instruction.to_string())
            .part("image[]", Self::image_part(base).await?);
        for garment in garments {
            form = form.part("image[]", Self::image_part(garment).await?);
        }

        let response = self
            .image_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CallFailure::new(classify_transport(&e), e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_failure(response).await);
        }

        let body: ImageResponse = response
            .json()
            .await
            .map_err(|e| CallFailure::new(classify_transport(&e), e.to_string()))?;

        let encoded = body
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| CallFailure::new(FailureKind::BadResponse, "response has no image"))?;

        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| CallFailure::new(FailureKind::BadResponse, format!("invalid base64: {}", e)))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
