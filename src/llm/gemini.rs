use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::llm::media::InlineImage;
use crate::llm::{ContentRequest, GenerativeBackend, ImageGenerationRequest};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("Gemini API key is not configured")]
    Unconfigured,
    #[error("Gemini request failed: {0}")]
    Transport(String),
    #[error("Gemini request failed with status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("Gemini response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    #[allow(dead_code)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Option<Vec<Prediction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: Option<String>,
    base_url: Url,
    image_model: String,
    text_model: String,
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_gemini_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let mut summarized_contents = Vec::new();
        for content in contents {
            let role = content
                .get("role")
                .and_then(|value| value.as_str())
                .unwrap_or("user");
            let parts = content
                .get("parts")
                .and_then(|value| value.as_array())
                .map(|parts| summarize_gemini_parts(parts))
                .unwrap_or_default();
            summarized_contents.push(json!({ "role": role, "parts": parts }));
        }
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(instances) = payload.get("instances").and_then(|value| value.as_array()) {
        let prompts: Vec<Value> = instances
            .iter()
            .filter_map(|instance| instance.get("prompt").and_then(|value| value.as_str()))
            .map(|prompt| json!(truncate_for_log(prompt, 200)))
            .collect();
        summary.insert("prompts".to_string(), Value::Array(prompts));
    }

    for key in ["generationConfig", "parameters"] {
        if let Some(config) = payload.get(key) {
            summary.insert(key.to_string(), config.clone());
        }
    }

    Value::Object(summary)
}

fn summarize_gemini_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
    let mut text_preview = None;

    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    for candidate in candidates {
        let Some(parts) = candidate
            .content
            .as_ref()
            .and_then(|content| content.parts.as_ref())
        else {
            continue;
        };
        for part in parts {
            match part {
                GeminiPart::Text { text } => {
                    text_parts += 1;
                    if text_preview.is_none() && !text.trim().is_empty() {
                        text_preview = Some(truncate_for_log(text, 200));
                    }
                }
                GeminiPart::InlineData { inline_data } => {
                    if inline_data.mime_type.starts_with("image/") {
                        image_parts += 1;
                    }
                }
                GeminiPart::Other(_) => {}
            }
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts,
        "textPreview": text_preview
    })
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn build_content_payload(request: &ContentRequest) -> Value {
    let mut parts = Vec::new();
    if let Some(image) = &request.image {
        parts.push(json!({
            "inlineData": {
                "mimeType": image.mime_type,
                "data": image.data
            }
        }));
    }
    parts.push(json!({ "text": request.prompt }));

    let mut payload = json!({
        "contents": [{ "role": "user", "parts": parts }],
    });
    if let Some(schema) = &request.response_schema {
        if let Some(object) = payload.as_object_mut() {
            object.insert(
                "generationConfig".to_string(),
                json!({
                    "responseMimeType": "application/json",
                    "responseSchema": schema
                }),
            );
        }
    }
    payload
}

fn build_predict_payload(request: &ImageGenerationRequest) -> Value {
    json!({
        "instances": [{ "prompt": request.prompt }],
        "parameters": {
            "sampleCount": request.number_of_images,
            "aspectRatio": request.aspect_ratio,
            "outputOptions": { "mimeType": request.output_mime_type }
        }
    })
}

fn extract_text_from_response(response: GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    for candidate in response.candidates.unwrap_or_default() {
        let Some(parts) = candidate.content.and_then(|content| content.parts) else {
            continue;
        };
        for part in parts {
            if let GeminiPart::Text { text } = part {
                if !text.trim().is_empty() {
                    text_parts.push(text);
                }
            }
        }
    }
    text_parts.join("\n")
}

fn extract_images_from_predictions(response: PredictResponse, fallback_mime: &str) -> Vec<InlineImage> {
    response
        .predictions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|prediction| {
            let data = prediction.bytes_base64_encoded?;
            if data.is_empty() {
                return None;
            }
            let mime_type = prediction
                .mime_type
                .unwrap_or_else(|| fallback_mime.to_string());
            Some(InlineImage::new(mime_type, data))
        })
        .collect()
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.clone(),
            image_model: config.gemini_image_model.clone(),
            text_model: config.gemini_text_model.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, GeminiError> {
        self.api_key.as_deref().ok_or(GeminiError::Unconfigured)
    }

    fn redact_api_key(&self, text: &str) -> String {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => text.replace(key, "[redacted]"),
            _ => text.to_string(),
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.as_str().trim_end_matches('/'),
            model,
            method
        )
    }

    async fn call_gemini_api<T>(&self, model: &str, method: &str, payload: &Value) -> Result<T, GeminiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let api_key = self.api_key()?;
        let url = self.model_url(model, method);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload_summary = summarize_gemini_payload(payload);
            debug!(target: "llm.gemini", model = model, method = method, payload = %payload_summary);
        }

        let response = get_http_client()
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                let err_text = self.redact_api_key(&err.to_string());
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={}, status={:?})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect(),
                    err.status()
                );
                GeminiError::Transport(err_text)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            return Err(GeminiError::Status {
                status: status.as_u16(),
                detail: self.redact_api_key(&message.unwrap_or(body_summary)),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| GeminiError::Decode(self.redact_api_key(&err.to_string())))
    }
}

impl GenerativeBackend for GeminiClient {
    async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<InlineImage>, GeminiError> {
        self.api_key()?;
        let payload = &build_predict_payload(request);
        let model = self.image_model.as_str();
        log_llm_timing("gemini", model, "generate_images", None, move || async move {
            let response: PredictResponse = self.call_gemini_api(model, "predict", payload).await?;
            let images = extract_images_from_predictions(response, &request.output_mime_type);
            debug!(target: "llm.gemini", model = model, images = images.len());
            Ok(images)
        })
        .await
    }

    async fn generate_content(&self, request: &ContentRequest) -> Result<String, GeminiError> {
        self.api_key()?;
        let payload = &build_content_payload(request);
        let model = self.text_model.as_str();
        let metadata = json!({
            "withImage": request.image.is_some(),
            "structured": request.response_schema.is_some()
        });
        log_llm_timing("gemini", model, request.operation, Some(metadata), move || async move {
            let response: GeminiResponse = self
                .call_gemini_api(model, "generateContent", payload)
                .await?;
            if tracing::enabled!(tracing::Level::DEBUG) {
                let response_summary = summarize_gemini_response(&response);
                debug!(target: "llm.gemini", model = model, response = %response_summary);
            }
            Ok(extract_text_from_response(response))
        })
        .await
    }
}
