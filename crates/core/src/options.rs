//! Sampling parameters for a provider call.

use serde::{Deserialize, Serialize};

/// Generation options. Every field is optional; an unset field means
/// "use whatever the provider defaults to".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GenerationOptions {
    /// A balanced preset used when nothing else is configured.
    pub fn standard() -> Self {
        Self {
            temperature: Some(0.7),
            top_p: Some(0.9),
            max_tokens: Some(2000),
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.stop_sequences = Some(stop);
        self
    }

    /// Merge `other` on top of `self`: each field set in `other` wins,
    /// fields `other` leaves unset keep their current value.
    pub fn override_with(&self, other: &GenerationOptions) -> GenerationOptions {
        GenerationOptions {
            temperature: other.temperature.or(self.temperature),
            top_p: other.top_p.or(self.top_p),
            top_k: other.top_k.or(self.top_k),
            presence_penalty: other.presence_penalty.or(self.presence_penalty),
            frequency_penalty: other.frequency_penalty.or(self.frequency_penalty),
            max_tokens: other.max_tokens.or(self.max_tokens),
            stop_sequences: other
                .stop_sequences
                .clone()
                .or_else(|| self.stop_sequences.clone()),
            seed: other.seed.or(self.seed),
        }
    }

    /// Check every set field against its allowed range.
    ///
    /// Returns the list of problems; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            errors.push(format!("temperature must be between 0 and 2 (got {t})"));
        }
        if let Some(p) = self.top_p
            && !(0.0..=1.0).contains(&p)
        {
            errors.push(format!("top_p must be between 0 and 1 (got {p})"));
        }
        if let Some(p) = self.presence_penalty
            && !(-2.0..=2.0).contains(&p)
        {
            errors.push(format!("presence_penalty must be between -2 and 2 (got {p})"));
        }
        if let Some(p) = self.frequency_penalty
            && !(-2.0..=2.0).contains(&p)
        {
            errors.push(format!("frequency_penalty must be between -2 and 2 (got {p})"));
        }
        if self.max_tokens == Some(0) {
            errors.push("max_tokens must be greater than 0".into());
        }

        errors
    }
}
