//! Bulk prompt evaluation: one completion per prompt, strictly in order,
//! with failures confined to their own slot.

use std::fmt;
use std::time::Instant;

use crate::dispatch::{ChatClient, CompletionRequest};
use crate::params::GenerationParameters;

pub const ERROR_PREFIX: &str = "An error occurred: ";
pub const EMPTY_PROMPTS_MESSAGE: &str = "Please enter at least one prompt.";

/// True when every prompt is empty or whitespace-only (vacuously for none).
pub fn all_blank(prompts: &[String]) -> bool {
    prompts.iter().all(|p| p.trim().is_empty())
}

/// Ordered prompts plus the optional suffix shared by all of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptSet {
    pub prompts: Vec<String>,
    pub suffix: Option<String>,
}

impl PromptSet {
    pub fn new(prompts: Vec<String>, suffix: Option<String>) -> Self {
        Self { prompts, suffix }
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// True when no prompt has any non-whitespace content.
    pub fn all_blank(&self) -> bool {
        all_blank(&self.prompts)
    }

    /// Text actually sent for the prompt at `index`: the prompt, then a single
    /// space and the suffix when one is set. No trimming on either side.
    pub fn effective_text(&self, index: usize) -> Option<String> {
        let prompt = self.prompts.get(index)?;
        Some(match self.suffix.as_deref() {
            Some(suffix) if !suffix.is_empty() => format!("{prompt} {suffix}"),
            _ => prompt.clone(),
        })
    }
}

/// Result for one prompt slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
    /// Every prompt was blank, nothing was sent.
    Skipped,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Text shown in the output box.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(text) => f.write_str(text),
            Self::Failure(message) => write!(f, "{ERROR_PREFIX}{message}"),
            Self::Skipped => f.write_str(EMPTY_PROMPTS_MESSAGE),
        }
    }
}

/// Outcomes positionally aligned with the `PromptSet` they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSet(pub Vec<Outcome>);

impl ResponseSet {
    pub fn skipped(n: usize) -> Self {
        Self(vec![Outcome::Skipped; n])
    }

    /// The same failure message in every slot.
    pub fn uniform_failure(n: usize, message: &str) -> Self {
        Self(vec![Outcome::Failure(message.to_string()); n])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.0
    }

    pub fn rendered(&self) -> Vec<String> {
        self.0.iter().map(Outcome::render).collect()
    }
}

/// Run every prompt through `client`, one call at a time.
///
/// When all prompts are blank no call is made and every slot is `Skipped`.
/// Otherwise each prompt, blank or not, gets exactly one call; an error in
/// one call becomes `Failure` for that slot and the loop moves on.
pub async fn evaluate<C: ChatClient>(
    client: &C,
    prompts: &PromptSet,
    params: &GenerationParameters,
) -> ResponseSet {
    let n = prompts.len();
    if prompts.all_blank() {
        tracing::info!(n, "all prompts blank, skipping dispatch");
        return ResponseSet::skipped(n);
    }

    let mut outcomes = Vec::with_capacity(n);
    for index in 0..n {
        let text = prompts.effective_text(index).unwrap_or_default();
        let req = CompletionRequest::new(text, params.clone());
        let start = Instant::now();

        let outcome = match client.complete(&req).await {
            Ok(text) => {
                tracing::info!(
                    index,
                    model = %params.model,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "prompt evaluated"
                );
                Outcome::Success(text)
            }
            Err(e) => {
                if e.is_auth() {
                    tracing::error!(index, "credential rejected or missing: {e}");
                } else {
                    tracing::warn!(
                        index,
                        model = %params.model,
                        status = ?e.status(),
                        "prompt failed: {e}"
                    );
                }
                Outcome::Failure(e.to_string())
            }
        };
        outcomes.push(outcome);
    }

    ResponseSet(outcomes)
}
