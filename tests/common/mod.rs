#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use promptpair::dispatch::{ChatClient, CompletionRequest};
use promptpair::error::PromptPairError;

/// Scripted `ChatClient`: replays queued replies in call order and records
/// every request it receives.
#[derive(Default)]
pub struct FakeClient {
    replies: Mutex<VecDeque<Result<String, PromptPairError>>>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl FakeClient {
    pub fn new(replies: Vec<Result<String, PromptPairError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with the user prompt echoed back.
    pub fn echo() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn sent_prompts(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.user_prompt).collect()
    }
}

impl ChatClient for FakeClient {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, PromptPairError> {
        self.seen.lock().unwrap().push(req.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("echo: {}", req.user_prompt)))
    }
}
