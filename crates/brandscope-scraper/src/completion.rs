//! Structured-completion service boundary.
//!
//! The pipeline treats every completion as untrusted text: responses are
//! fence-stripped and parsed through [`parse_completion_json`] at each call
//! site, regardless of whether a schema was requested.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::ScrapeError;

/// An image attached to a completion prompt.
#[derive(Debug, Clone)]
pub struct PromptImage {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// A prompt plus the optional images and JSON schema it should be answered with.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub prompt: String,
    pub images: Vec<PromptImage>,
    /// `(schema_name, json_schema)`; the service is asked to conform but
    /// callers still validate.
    pub schema: Option<(String, Value)>,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.schema = Some((name.into(), schema));
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: PromptImage) -> Self {
        self.images.push(image);
        self
    }
}

/// Raw completion output.
///
/// `success == false` means the call returned at the transport level but the
/// service reported its own failure; `text` then holds the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub success: bool,
    pub text: String,
}

impl CompletionResponse {
    #[must_use]
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            text: reason.into(),
        }
    }

    /// Returns the text of a successful completion.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Completion`] when the service flagged failure.
    pub fn into_text(self) -> Result<String, ScrapeError> {
        if self.success {
            Ok(self.text)
        } else {
            Err(ScrapeError::Completion(self.text))
        }
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ScrapeError>;
}

/// Removes a surrounding Markdown code fence (` ```json ... ``` `) if present.
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // drop the info string ("json", "JSON", ...), which may share the line
    // with the payload
    let body = if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        rest.find(|c: char| c.is_whitespace() || c == '{' || c == '[')
            .map_or(rest, |end| &rest[end..])
    } else {
        rest
    };
    body.trim()
}

/// Fence-strips and deserializes a completion payload.
///
/// # Errors
///
/// Returns [`ScrapeError::MalformedCompletion`] carrying the raw text when the
/// payload is not valid JSON of the expected shape.
pub fn parse_completion_json<T: DeserializeOwned>(
    raw: &str,
    context: &str,
) -> Result<T, ScrapeError> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|e| ScrapeError::MalformedCompletion {
        context: context.to_owned(),
        reason: e.to_string(),
        raw: raw.to_owned(),
    })
}

/// Property name used when a non-object schema is wrapped for the API.
const WRAPPED_SCHEMA_KEY: &str = "items";

/// OpenAI-compatible chat-completions client.
///
/// The API only accepts object schemas, so array (or scalar) schemas are sent
/// wrapped in `{"items": ...}` and unwrapped again before the text is returned.
pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletionClient {
    /// Builds a client bounded by `timeout_secs` per request.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut content = vec![json!({ "type": "text", "text": request.prompt })];
        for image in &request.images {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:{};base64,{encoded}", image.media_type) }
            }));
        }

        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "temperature": 0.2,
        });

        if let Some((name, schema)) = &request.schema {
            let schema = if is_object_schema(schema) {
                schema.clone()
            } else {
                json!({
                    "type": "object",
                    "properties": { WRAPPED_SCHEMA_KEY: schema },
                    "required": [WRAPPED_SCHEMA_KEY],
                    "additionalProperties": false
                })
            };
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": { "name": name, "schema": schema, "strict": true }
            });
        }

        body
    }
}

fn is_object_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("object")
}

/// Undoes the `{"items": ...}` wrapping applied to non-object schemas.
/// Text that does not have the wrapped shape is returned untouched.
fn unwrap_schema_payload(text: &str) -> String {
    let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(strip_code_fences(text)) else {
        return text.to_owned();
    };
    if map.len() != 1 {
        return text.to_owned();
    }
    match map.remove(WRAPPED_SCHEMA_KEY) {
        Some(inner) => inner.to_string(),
        None => text.to_owned(),
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletionClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ScrapeError> {
        let payload = self.request_body(&request);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScrapeError::RateLimited {
                service: "completion".to_owned(),
                retry_after_secs,
            });
        }
        if !status.is_success() {
            return Err(ScrapeError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let wrapped = request
            .schema
            .as_ref()
            .is_some_and(|(_, schema)| !is_object_schema(schema));

        let body: Value = response.json().await?;
        let choice = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first());

        let Some(choice) = choice else {
            return Ok(CompletionResponse::failed("completion returned no choices"));
        };

        if let Some(refusal) = choice
            .pointer("/message/refusal")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
        {
            return Ok(CompletionResponse::failed(format!("model refused: {refusal}")));
        }

        match choice.pointer("/message/content").and_then(Value::as_str) {
            Some(text) if wrapped => Ok(CompletionResponse::ok(unwrap_schema_payload(text))),
            Some(text) => Ok(CompletionResponse::ok(text)),
            None => Ok(CompletionResponse::failed("completion had no text content")),
        }
    }
}

#[cfg(test)]
#[path = "completion_fake.rs"]
pub(crate) mod fake;
