use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_TOP_P: f64 = 1.0;
pub const DEFAULT_FREQUENCY_PENALTY: f64 = 0.0;
pub const DEFAULT_PRESENCE_PENALTY: f64 = 0.0;

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 1..=4096;
pub const TOP_P_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const PENALTY_RANGE: RangeInclusive<f64> = -2.0..=2.0;

/// Sampling settings forwarded verbatim to the chat completion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
            frequency_penalty: DEFAULT_FREQUENCY_PENALTY,
            presence_penalty: DEFAULT_PRESENCE_PENALTY,
        }
    }
}

impl GenerationParameters {
    /// Check every numeric value against the range its form control declares.
    /// The model name is not checked; the API decides what it accepts.
    /// The evaluation routine itself never calls this; only the form layer does.
    pub fn validate(&self) -> Result<(), String> {
        check_float("temperature", self.temperature, &TEMPERATURE_RANGE)?;
        if !MAX_TOKENS_RANGE.contains(&self.max_tokens) {
            return Err(format!(
                "max_tokens must be between {} and {}, got {}",
                MAX_TOKENS_RANGE.start(),
                MAX_TOKENS_RANGE.end(),
                self.max_tokens
            ));
        }
        check_float("top_p", self.top_p, &TOP_P_RANGE)?;
        check_float("frequency_penalty", self.frequency_penalty, &PENALTY_RANGE)?;
        check_float("presence_penalty", self.presence_penalty, &PENALTY_RANGE)?;
        Ok(())
    }
}

fn check_float(name: &str, value: f64, range: &RangeInclusive<f64>) -> Result<(), String> {
    if value.is_nan() || value.is_infinite() || !range.contains(&value) {
        return Err(format!(
            "{name} must be between {:.1} and {:.1}, got {value}",
            range.start(),
            range.end()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_form_declarations() {
        let p = GenerationParameters::default();
        assert_eq!(p.model, "gpt-4o-mini");
        assert_eq!(p.temperature, 0.7);
        assert_eq!(p.max_tokens, 150);
        assert_eq!(p.top_p, 1.0);
        assert_eq!(p.frequency_penalty, 0.0);
        assert_eq!(p.presence_penalty, 0.0);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn range_edges_are_inclusive() {
        let p = GenerationParameters {
            temperature: 1.0,
            max_tokens: 4096,
            top_p: 0.0,
            frequency_penalty: -2.0,
            presence_penalty: 2.0,
            ..Default::default()
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let hot = GenerationParameters {
            temperature: 1.5,
            ..Default::default()
        };
        assert!(hot.validate().unwrap_err().contains("temperature"));

        let zero = GenerationParameters {
            max_tokens: 0,
            ..Default::default()
        };
        assert!(zero.validate().unwrap_err().contains("max_tokens"));

        let nan = GenerationParameters {
            presence_penalty: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().unwrap_err().contains("presence_penalty"));

        let blank_model = GenerationParameters {
            model: String::new(),
            ..Default::default()
        };
        assert!(blank_model.validate().is_ok());
    }
}
