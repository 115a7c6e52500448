//! The single web page: form parsing, rendering and the axum router.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use handlebars::Handlebars;
use serde::Serialize;

use crate::dispatch::ChatClient;
use crate::error::PromptPairError;
use crate::evaluate::{self, PromptSet, ResponseSet};
use crate::params::{
    GenerationParameters, MAX_TOKENS_RANGE, PENALTY_RANGE, TEMPERATURE_RANGE, TOP_P_RANGE,
};

pub const PAGE_TITLE: &str = "OpenAI Chat Bulk Evaluator";

const PAGE_TEMPLATE: &str = include_str!("../templates/page.hbs");

/// Raw field values exactly as submitted (or as first shown).
/// Kept as text so an invalid submission re-renders with what the user typed.
#[derive(Debug, Clone, PartialEq)]
pub struct FormFields {
    pub prompts: Vec<String>,
    pub suffix: String,
    pub model: String,
    pub temperature: String,
    pub max_tokens: String,
    pub top_p: String,
    pub frequency_penalty: String,
    pub presence_penalty: String,
}

/// A submission parsed into typed values, ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct FormRequest {
    pub prompts: PromptSet,
    pub params: GenerationParameters,
}

impl FormFields {
    /// Fields for a fresh page: empty prompts, declared defaults.
    pub fn initial(num_pairs: usize, defaults: &GenerationParameters) -> Self {
        Self {
            prompts: vec![String::new(); num_pairs],
            suffix: String::new(),
            model: defaults.model.clone(),
            temperature: defaults.temperature.to_string(),
            max_tokens: defaults.max_tokens.to_string(),
            top_p: defaults.top_p.to_string(),
            frequency_penalty: defaults.frequency_penalty.to_string(),
            presence_penalty: defaults.presence_penalty.to_string(),
        }
    }

    /// Collect posted `name=value` pairs. Prompts are `prompt_1..=prompt_N`;
    /// anything missing keeps its initial value and unknown names are ignored.
    pub fn from_pairs(
        pairs: &[(String, String)],
        num_pairs: usize,
        defaults: &GenerationParameters,
    ) -> Self {
        let mut fields = Self::initial(num_pairs, defaults);
        let values: HashMap<&str, &str> = pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        for (i, slot) in fields.prompts.iter_mut().enumerate() {
            if let Some(v) = values.get(prompt_field(i).as_str()) {
                *slot = (*v).to_string();
            }
        }

        let named = [
            ("suffix", &mut fields.suffix),
            ("model", &mut fields.model),
            ("temperature", &mut fields.temperature),
            ("max_tokens", &mut fields.max_tokens),
            ("top_p", &mut fields.top_p),
            ("frequency_penalty", &mut fields.frequency_penalty),
            ("presence_penalty", &mut fields.presence_penalty),
        ];
        for (name, slot) in named {
            if let Some(v) = values.get(name) {
                *slot = (*v).to_string();
            }
        }

        fields
    }

    /// Parse into typed values and check them against the control ranges.
    pub fn to_request(&self) -> Result<FormRequest, String> {
        let params = GenerationParameters {
            model: self.model.clone(),
            temperature: parse_field("temperature", &self.temperature)?,
            max_tokens: parse_field("max_tokens", &self.max_tokens)?,
            top_p: parse_field("top_p", &self.top_p)?,
            frequency_penalty: parse_field("frequency_penalty", &self.frequency_penalty)?,
            presence_penalty: parse_field("presence_penalty", &self.presence_penalty)?,
        };
        params.validate()?;

        let suffix = Some(self.suffix.clone()).filter(|s| !s.is_empty());
        Ok(FormRequest {
            prompts: PromptSet::new(self.prompts.clone(), suffix),
            params,
        })
    }
}

fn prompt_field(index: usize) -> String {
    format!("prompt_{}", index + 1)
}

fn parse_field<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("invalid {name} {raw:?}: {e}"))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PageView<'a> {
    title: &'static str,
    model: &'a str,
    suffix: &'a str,
    sliders: Vec<SliderView<'a>>,
    prompts: Vec<BoxView>,
    responses: Vec<BoxView>,
}

#[derive(Serialize)]
struct SliderView<'a> {
    name: &'static str,
    label: &'static str,
    value: &'a str,
    min: String,
    max: String,
    step: &'static str,
}

#[derive(Serialize)]
struct BoxView {
    name: String,
    label: String,
    placeholder: String,
    value: String,
}

pub struct PageRenderer {
    hb: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, PromptPairError> {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(true);
        hb.register_template_string("page", PAGE_TEMPLATE)?;
        Ok(Self { hb })
    }

    /// Render the page. `responses` fills the output boxes; `None` leaves them empty.
    pub fn render(
        &self,
        fields: &FormFields,
        responses: Option<&[String]>,
    ) -> Result<String, PromptPairError> {
        let sliders = vec![
            SliderView {
                name: "temperature",
                label: "Temperature",
                value: &fields.temperature,
                min: format!("{:.1}", TEMPERATURE_RANGE.start()),
                max: format!("{:.1}", TEMPERATURE_RANGE.end()),
                step: "0.1",
            },
            SliderView {
                name: "max_tokens",
                label: "Max Tokens",
                value: &fields.max_tokens,
                min: MAX_TOKENS_RANGE.start().to_string(),
                max: MAX_TOKENS_RANGE.end().to_string(),
                step: "1",
            },
            SliderView {
                name: "top_p",
                label: "Top-p",
                value: &fields.top_p,
                min: format!("{:.1}", TOP_P_RANGE.start()),
                max: format!("{:.1}", TOP_P_RANGE.end()),
                step: "0.1",
            },
            SliderView {
                name: "frequency_penalty",
                label: "Frequency Penalty",
                value: &fields.frequency_penalty,
                min: format!("{:.1}", PENALTY_RANGE.start()),
                max: format!("{:.1}", PENALTY_RANGE.end()),
                step: "0.1",
            },
            SliderView {
                name: "presence_penalty",
                label: "Presence Penalty",
                value: &fields.presence_penalty,
                min: format!("{:.1}", PENALTY_RANGE.start()),
                max: format!("{:.1}", PENALTY_RANGE.end()),
                step: "0.1",
            },
        ];

        let prompts = fields
            .prompts
            .iter()
            .enumerate()
            .map(|(i, value)| BoxView {
                name: prompt_field(i),
                label: format!("Prompt {}", i + 1),
                placeholder: format!("Enter prompt {}", i + 1),
                value: value.clone(),
            })
            .collect();

        let responses = (0..fields.prompts.len())
            .map(|i| BoxView {
                name: format!("response_{}", i + 1),
                label: format!("Response {}", i + 1),
                placeholder: String::new(),
                value: responses
                    .and_then(|r| r.get(i))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        let view = PageView {
            title: PAGE_TITLE,
            model: &fields.model,
            suffix: &fields.suffix,
            sliders,
            prompts,
            responses,
        };

        Ok(self.hb.render("page", &view)?)
    }
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

pub struct AppState<C> {
    pub client: Arc<C>,
    pub pages: PageRenderer,
    pub num_pairs: usize,
    pub defaults: GenerationParameters,
}

impl<C: ChatClient> AppState<C> {
    pub fn new(
        client: Arc<C>,
        num_pairs: usize,
        defaults: GenerationParameters,
    ) -> Result<Self, PromptPairError> {
        Ok(Self {
            client,
            pages: PageRenderer::new()?,
            num_pairs,
            defaults,
        })
    }

    /// Validate, evaluate and render one submission. All-blank prompts win
    /// over parameter errors: nothing is parsed or sent in that case.
    pub async fn submit(&self, fields: &FormFields) -> Result<String, PromptPairError> {
        let n = fields.prompts.len();
        if evaluate::all_blank(&fields.prompts) {
            tracing::info!(n, "all prompts blank, skipping dispatch");
            let responses = ResponseSet::skipped(n);
            return self.pages.render(fields, Some(responses.rendered().as_slice()));
        }

        let responses = match fields.to_request() {
            Ok(req) => {
                let start = Instant::now();
                let responses = evaluate::evaluate(&*self.client, &req.prompts, &req.params).await;
                tracing::info!(
                    n,
                    successes = responses.outcomes().iter().filter(|o| o.is_success()).count(),
                    failures = responses.outcomes().iter().filter(|o| o.is_failure()).count(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "submission evaluated"
                );
                responses
            }
            Err(msg) => {
                tracing::warn!("rejected submission: {msg}");
                ResponseSet::uniform_failure(n, &msg)
            }
        };

        self.pages.render(fields, Some(responses.rendered().as_slice()))
    }
}

pub fn router<C: ChatClient + 'static>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/", get(index::<C>).post(submit::<C>))
        .with_state(state)
}

async fn index<C: ChatClient + 'static>(State(state): State<Arc<AppState<C>>>) -> Response {
    let fields = FormFields::initial(state.num_pairs, &state.defaults);
    page_response(state.pages.render(&fields, None))
}

async fn submit<C: ChatClient + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let fields = FormFields::from_pairs(&pairs, state.num_pairs, &state.defaults);
    page_response(state.submit(&fields).await)
}

fn page_response(page: Result<String, PromptPairError>) -> Response {
    match page {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("page render failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn initial_fields_show_defaults() {
        let fields = FormFields::initial(2, &GenerationParameters::default());
        assert_eq!(fields.prompts, vec!["", ""]);
        assert_eq!(fields.model, "gpt-4o-mini");
        assert_eq!(fields.temperature, "0.7");
        assert_eq!(fields.max_tokens, "150");
        assert_eq!(fields.top_p, "1");
    }

    #[test]
    fn indexed_prompts_land_in_their_slots() {
        let fields = FormFields::from_pairs(
            &pairs(&[("prompt_2", "second"), ("prompt_1", "first"), ("prompt_9", "x")]),
            2,
            &GenerationParameters::default(),
        );
        assert_eq!(fields.prompts, vec!["first", "second"]);
    }

    #[test]
    fn parse_error_names_the_field() {
        let mut fields = FormFields::initial(2, &GenerationParameters::default());
        fields.max_tokens = "lots".to_string();
        let err = fields.to_request().unwrap_err();
        assert!(err.contains("max_tokens"), "{err}");
    }

    #[test]
    fn empty_suffix_becomes_none() {
        let fields = FormFields::initial(1, &GenerationParameters::default());
        let req = fields.to_request().unwrap();
        assert_eq!(req.prompts.suffix, None);
    }
}
