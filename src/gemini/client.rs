//! HTTP client for the hosted generative-model service: schema-constrained
//! JSON generation and server-sent-event chat streaming.

use crate::config::GeminiConfig;
use crate::error::AppError;
use crate::gemini::schema::Schema;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One turn of chat history, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<Value>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Built once at startup and shared through application state.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, AppError> {
        let api_key = config.api_key()?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Ask for a schema-constrained JSON reply. An empty reply is `Null`
    /// ("no results"); unparseable or schema-violating text is a
    /// `SchemaViolation`, never silently accepted.
    pub async fn generate_json(&self, prompt: &str, schema: &Schema) -> Result<Value, AppError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: Some("user".to_string()),
                parts: vec![TextPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: None,
            generation_config: Some(serde_json::json!({
                "responseMimeType": "application/json",
                "responseSchema": schema.to_value(),
            })),
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailure(format!("model request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AppError::ConnectionFailure(format!(
                "model request failed with status {}",
                response.status()
            )));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::ConnectionFailure(format!("unreadable model reply: {e}")))?;

        let text = reply.text();
        let text = text.trim();
        if text.is_empty() {
            return Ok(Value::Null);
        }

        let value: Value = serde_json::from_str(text).map_err(|e| {
            AppError::SchemaViolation(format!("model reply is not valid JSON: {e}"))
        })?;
        schema
            .validate(&value)
            .map_err(|e| AppError::SchemaViolation(format!("model reply violates schema: {e}")))?;

        debug!("structured reply accepted ({} bytes)", text.len());
        Ok(value)
    }

    /// Stream a chat reply as it is generated. Yields text chunks in order;
    /// the receiver closes when the reply is finished or the stream fails.
    pub async fn stream_chat(
        &self,
        history: &[ChatTurn],
        system_instruction: &str,
    ) -> Result<mpsc::Receiver<Result<String, AppError>>, AppError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        );
        let request = GenerateRequest {
            contents: history
                .iter()
                .map(|turn| RequestContent {
                    role: Some(
                        match turn.role {
                            ChatRole::User => "user",
                            ChatRole::Model => "model",
                        }
                        .to_string(),
                    ),
                    parts: vec![TextPart {
                        text: turn.content.clone(),
                    }],
                })
                .collect(),
            system_instruction: Some(RequestContent {
                role: None,
                parts: vec![TextPart {
                    text: system_instruction.to_string(),
                }],
            }),
            generation_config: None,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailure(format!("model request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AppError::ConnectionFailure(format!(
                "model request failed with status {}",
                response.status()
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx
                            .send(Err(AppError::ConnectionFailure(format!(
                                "chat stream failed: {e}"
                            ))))
                            .await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Complete lines only; the partial tail stays buffered.
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].to_string();
                    buffer.drain(..=newline);

                    let Some(payload) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if payload.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<GenerateResponse>(payload) {
                        Ok(event) => {
                            let text = event.text();
                            if !text.is_empty() && tx.send(Ok(text)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("skipping unparseable stream event: {e}"),
                    }
                }
            }
        });

        Ok(rx)
    }
}
