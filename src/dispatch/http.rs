use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::dispatch::{ChatClient, CompletionRequest};
use crate::error::PromptPairError;

pub const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024; // 2MB

const PROVIDER: &str = "openai";

pub struct HttpDispatch {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl std::fmt::Debug for HttpDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDispatch")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl HttpDispatch {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PromptPairError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| PromptPairError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query_model(&self, req: &CompletionRequest) -> Result<String, PromptPairError> {
        let start = Instant::now();

        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(PromptPairError::MissingApiKey)?;

        let body = ChatBody {
            model: &req.params.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &req.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &req.user_prompt,
                },
            ],
            temperature: req.params.temperature,
            max_tokens: req.params.max_tokens,
            top_p: req.params.top_p,
            frequency_penalty: req.params.frequency_penalty,
            presence_penalty: req.params.presence_penalty,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = read_capped(response)
                .await
                .map(|b| String::from_utf8_lossy(b.as_ref()).into_owned())
                .unwrap_or_default();
            return Err(status_error(status, &detail));
        }

        let bytes = read_capped(response).await?;
        let completion: ChatCompletion = serde_json::from_slice(bytes.as_ref())
            .map_err(|e| PromptPairError::SchemaParse(format!("failed to parse response: {e}")))?;
        let text = first_choice_text(completion)?;

        tracing::debug!(
            model = %req.params.model,
            latency_ms = start.elapsed().as_millis() as u64,
            "completion received"
        );

        Ok(text)
    }
}

/// Map a non-2xx status onto the error the form will show.
fn status_error(status: StatusCode, detail: &str) -> PromptPairError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => PromptPairError::RateLimited {
            provider: PROVIDER.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PromptPairError::AuthFailed {
            provider: PROVIDER.to_string(),
            message: status.to_string(),
        },
        _ => PromptPairError::Upstream {
            provider: PROVIDER.to_string(),
            message: format!("{status}: {detail}"),
            status: Some(status.as_u16()),
        },
    }
}

/// Read the body, refusing anything over `MAX_RESPONSE_BYTES` whether the
/// server announced the length up front or not.
async fn read_capped(response: Response) -> Result<impl AsRef<[u8]>, PromptPairError> {
    let announced = response.content_length().map(|len| len as usize);
    let bytes = match announced {
        Some(len) if len > MAX_RESPONSE_BYTES => None,
        _ => Some(response.bytes().await?),
    };
    match bytes {
        Some(bytes) if bytes.len() <= MAX_RESPONSE_BYTES => Ok(bytes),
        other => {
            let len = other.map_or(announced.unwrap_or_default(), |b| b.len());
            Err(PromptPairError::Upstream {
                provider: PROVIDER.to_string(),
                message: format!("response too large: {len} bytes (max {MAX_RESPONSE_BYTES})"),
                status: None,
            })
        }
    }
}

fn first_choice_text(completion: ChatCompletion) -> Result<String, PromptPairError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| PromptPairError::Upstream {
            provider: PROVIDER.to_string(),
            message: "empty choices or null content".to_string(),
            status: None,
        })
}

impl ChatClient for HttpDispatch {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, PromptPairError> {
        self.query_model(req).await
    }
}
