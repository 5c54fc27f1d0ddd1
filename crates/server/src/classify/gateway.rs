//! Chat-completions gateway client.
//!
//! Posts the analysis prompt to an OpenAI-compatible chat endpoint. A
//! strict system instruction demands JSON-only output; the reply is
//! still treated as untrusted and schema-checked downstream.
//!
//! Model selection: the higher-capability model is used when an audio
//! payload is attached, the cheaper one otherwise. No client-side
//! timeout is set — the upstream service bounds the call, and the
//! caller guards against unbounded latency.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use phishguard_core::prompt::AnalysisPrompt;

use super::provider::{ClassificationError, ClassificationProvider};

/// System instruction sent with every classification request.
const SYSTEM_PROMPT: &str = "You are an expert cybersecurity analyst specializing in detecting \
     scams, phishing, and fraudulent communications. Always respond with valid JSON only.";

/// Gateway connection settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Chat-completions endpoint URL.
    pub url: String,
    /// Bearer key for the gateway.
    pub api_key: String,
    pub text_model: String,
    pub audio_model: String,
}

/// `ClassificationProvider` backed by an HTTPS chat-completions gateway.
pub struct GatewayClassifier {
    config: GatewayConfig,
}

impl GatewayClassifier {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

/// Plain text, or multi-part text + audio.
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentPart {
    Text { text: String },
    Audio { audio: String },
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn build_request(
    config: &GatewayConfig,
    prompt: &AnalysisPrompt,
    audio_data: Option<&str>,
) -> ChatRequest {
    let (model, content) = match audio_data {
        Some(audio) if prompt.attach_audio => (
            config.audio_model.clone(),
            MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.text.clone(),
                },
                ContentPart::Audio {
                    audio: audio.to_string(),
                },
            ]),
        ),
        _ => (
            config.text_model.clone(),
            MessageContent::Text(prompt.text.clone()),
        ),
    };
    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(SYSTEM_PROMPT.to_string()),
            },
            ChatMessage {
                role: "user",
                content,
            },
        ],
    }
}

/// Make the synchronous gateway call and extract the first choice's text.
fn call_gateway(config: &GatewayConfig, body: &ChatRequest) -> Result<String, ClassificationError> {
    let agent = ureq::Agent::new_with_defaults();
    let response = agent
        .post(&config.url)
        .header("authorization", &format!("Bearer {}", config.api_key))
        .header("content-type", "application/json")
        .send_json(body)
        .map_err(|e| match e {
            ureq::Error::StatusCode(429) => ClassificationError::RateLimited,
            ureq::Error::StatusCode(402) => ClassificationError::QuotaExhausted,
            ureq::Error::StatusCode(code) => {
                ClassificationError::Upstream(format!("gateway returned HTTP {code}"))
            }
            other => ClassificationError::Upstream(format!("gateway request failed: {other}")),
        })?;

    let envelope: ChatResponse = response
        .into_body()
        .read_json()
        .map_err(|e| ClassificationError::Upstream(format!("malformed gateway envelope: {e}")))?;

    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ClassificationError::Upstream("no content in model reply".to_string()))
}

#[async_trait]
impl ClassificationProvider for GatewayClassifier {
    async fn classify(
        &self,
        prompt: &AnalysisPrompt,
        audio_data: Option<&str>,
    ) -> Result<String, ClassificationError> {
        let body = build_request(&self.config, prompt, audio_data);
        let config = self.config.clone();

        log::debug!(
            "classification request: model={} audio={}",
            body.model,
            prompt.attach_audio
        );

        // ureq is synchronous, so wrap in spawn_blocking.
        tokio::task::spawn_blocking(move || call_gateway(&config, &body))
            .await
            .map_err(|e| ClassificationError::Internal(format!("task join error: {e}")))?
    }
}
