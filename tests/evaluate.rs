//! Bulk evaluation behavior against a scripted client.

mod common;

use common::FakeClient;
use pretty_assertions::assert_eq;
use promptpair::dispatch::SYSTEM_PROMPT;
use promptpair::error::PromptPairError;
use promptpair::evaluate::{Outcome, PromptSet, ResponseSet, evaluate};
use promptpair::params::GenerationParameters;

fn prompts(items: &[&str], suffix: Option<&str>) -> PromptSet {
    PromptSet::new(
        items.iter().map(|s| s.to_string()).collect(),
        suffix.map(str::to_string),
    )
}

// ---------------------------------------------------------------------------
// Blank guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_blank_prompts_make_no_calls() {
    let client = FakeClient::echo();
    let result = evaluate(&client, &prompts(&["", ""], None), &GenerationParameters::default()).await;

    assert_eq!(result, ResponseSet(vec![Outcome::Skipped, Outcome::Skipped]));
    assert_eq!(
        result.rendered(),
        vec![
            "Please enter at least one prompt.",
            "Please enter at least one prompt."
        ]
    );
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn whitespace_only_prompts_count_as_blank() {
    let client = FakeClient::echo();
    let set = prompts(&["  ", "\n", "\t "], Some("suffix text"));
    let result = evaluate(&client, &set, &GenerationParameters::default()).await;

    assert_eq!(result.len(), 3);
    assert!(result.outcomes().iter().all(|o| *o == Outcome::Skipped));
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn one_filled_prompt_still_sends_the_blank_one() {
    let client = FakeClient::echo();
    let set = prompts(&["Summarize: cats are great", ""], Some(""));
    let result = evaluate(&client, &set, &GenerationParameters::default()).await;

    assert_eq!(result.len(), 2);
    assert_eq!(client.sent_prompts(), vec!["Summarize: cats are great", ""]);
    assert_eq!(result.outcomes()[1], Outcome::Success("echo: ".to_string()));
}

// ---------------------------------------------------------------------------
// Request shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn suffix_is_appended_with_one_space() {
    let client = FakeClient::echo();
    let set = prompts(&["Be brief.", "Be thorough."], Some("Explain TCP."));
    evaluate(&client, &set, &GenerationParameters::default()).await;

    assert_eq!(
        client.sent_prompts(),
        vec!["Be brief. Explain TCP.", "Be thorough. Explain TCP."]
    );
}

#[tokio::test]
async fn suffix_concatenation_is_literal() {
    let client = FakeClient::echo();
    let set = prompts(&["trailing "], Some(" leading"));
    evaluate(&client, &set, &GenerationParameters::default()).await;

    assert_eq!(client.sent_prompts(), vec!["trailing   leading"]);
}

#[tokio::test]
async fn every_call_carries_system_prompt_and_params() {
    let client = FakeClient::echo();
    let params = GenerationParameters {
        model: "gpt-4o".to_string(),
        temperature: 0.3,
        max_tokens: 42,
        top_p: 0.9,
        frequency_penalty: -1.5,
        presence_penalty: 1.2,
    };
    evaluate(&client, &prompts(&["a", "b"], None), &params).await;

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    for req in requests {
        assert_eq!(req.system_prompt, SYSTEM_PROMPT);
        assert_eq!(req.system_prompt, "You are a helpful assistant.");
        assert_eq!(req.params, params);
    }
}

// ---------------------------------------------------------------------------
// Results and isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_text_is_returned_verbatim() {
    let text = "  line one\n\nline two with trailing space ".to_string();
    let client = FakeClient::new(vec![Ok(text.clone())]);
    let result = evaluate(&client, &prompts(&["q"], None), &GenerationParameters::default()).await;

    assert_eq!(result.outcomes(), &[Outcome::Success(text.clone())]);
    assert_eq!(result.rendered(), vec![text]);
}

#[tokio::test]
async fn timeout_renders_with_error_prefix() {
    let client = FakeClient::new(vec![Err(PromptPairError::Timeout)]);
    let result = evaluate(&client, &prompts(&["q"], None), &GenerationParameters::default()).await;

    assert_eq!(result.rendered(), vec!["An error occurred: timed out"]);
}

#[tokio::test]
async fn failure_is_isolated_to_its_slot() {
    let client = FakeClient::new(vec![
        Ok("first".to_string()),
        Err(PromptPairError::RateLimited {
            provider: "openai".to_string(),
        }),
        Ok("third".to_string()),
    ]);
    let result = evaluate(
        &client,
        &prompts(&["a", "b", "c"], None),
        &GenerationParameters::default(),
    )
    .await;

    assert_eq!(client.requests().len(), 3);
    assert_eq!(result.outcomes()[0], Outcome::Success("first".to_string()));
    assert!(result.outcomes()[1].is_failure());
    assert!(result.rendered()[1].starts_with("An error occurred: "));
    assert_eq!(result.outcomes()[2], Outcome::Success("third".to_string()));
}

#[tokio::test]
async fn every_call_failing_still_yields_n_results() {
    let client = FakeClient::new(vec![
        Err(PromptPairError::MissingApiKey),
        Err(PromptPairError::MissingApiKey),
    ]);
    let result = evaluate(&client, &prompts(&["a", "b"], None), &GenerationParameters::default()).await;

    assert_eq!(result.len(), 2);
    for line in result.rendered() {
        assert!(line.starts_with("An error occurred: "), "{line}");
    }
}

#[tokio::test]
async fn model_text_that_looks_like_an_error_is_still_success() {
    let client = FakeClient::new(vec![Ok("An error occurred: just kidding".to_string())]);
    let result = evaluate(&client, &prompts(&["q"], None), &GenerationParameters::default()).await;

    assert!(result.outcomes()[0].is_success());
}

#[tokio::test]
async fn length_matches_for_many_sizes() {
    for n in 1..=6 {
        let items: Vec<String> = (0..n).map(|i| format!("prompt {i}")).collect();
        let refs: Vec<&str> = items.iter().map(String::as_str).collect();
        let client = FakeClient::echo();
        let result = evaluate(&client, &prompts(&refs, None), &GenerationParameters::default()).await;

        assert_eq!(result.len(), n);
        assert_eq!(
            result.rendered(),
            items.iter().map(|p| format!("echo: {p}")).collect::<Vec<_>>()
        );
    }
}
