use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptPairError {
    #[error("timed out")]
    Timeout,

    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("auth failed for {provider}: {message}")]
    AuthFailed { provider: String, message: String },

    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("upstream error from {provider}: {message}")]
    Upstream {
        provider: String,
        message: String,
        status: Option<u16>,
    },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("request error: {0}")]
    Request(reqwest::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("template error: {0}")]
    Template(String),
}

impl From<reqwest::Error> for PromptPairError {
    /// Timeouts get their own variant so the rendered message stays stable
    /// regardless of how reqwest phrases them.
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(e)
        }
    }
}

impl From<handlebars::RenderError> for PromptPairError {
    fn from(e: handlebars::RenderError) -> Self {
        Self::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for PromptPairError {
    fn from(e: handlebars::TemplateError) -> Self {
        Self::Template(e.to_string())
    }
}

impl PromptPairError {
    /// HTTP status reported by the upstream API, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            Self::RateLimited { .. } => Some(429),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true for failures caused by the credential (missing or rejected).
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthFailed { .. } | Self::MissingApiKey)
    }
}
