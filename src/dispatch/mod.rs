pub mod http;

use std::future::Future;

use crate::error::PromptPairError;
use crate::params::GenerationParameters;

/// System instruction sent ahead of every prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// One chat completion call: a system turn, a user turn and the sampling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub params: GenerationParameters,
}

impl CompletionRequest {
    pub fn new(user_prompt: impl Into<String>, params: GenerationParameters) -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: user_prompt.into(),
            params,
        }
    }
}

/// Anything that can turn a completion request into model text.
/// `HttpDispatch` talks to the real API; tests plug in fakes.
pub trait ChatClient: Send + Sync {
    fn complete(
        &self,
        req: &CompletionRequest,
    ) -> impl Future<Output = Result<String, PromptPairError>> + Send;
}
