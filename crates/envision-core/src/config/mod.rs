//! Typed engine configuration.
//!
//! Every field has a default. Hosts override a subset by passing a JSON object, which is
//! deep-merged onto the serialized defaults before deserializing back into
//! [`EnvisionConfig`].

use crate::model::LayerType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvisionConfig {
    pub quotas: QuotaConfig,
    pub layout: LayoutConfig,
    pub animation: AnimationConfig,
    pub generation: GenerationConfig,
}

/// Selection caps applied by the response parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub use_case_per_category: usize,
    pub direct_stakeholders: usize,
    pub indirect_stakeholders: usize,
    pub very_severe_harms: usize,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            use_case_per_category: 2,
            direct_stakeholders: 3,
            indirect_stakeholders: 2,
            very_severe_harms: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub rect_width: f64,
    /// Box width of harm nodes.
    pub rect_long_width: f64,
    /// Height assumed for nodes that have not been measured yet.
    pub rect_height: f64,
    pub h_gap: f64,
    pub v_gap: f64,
    /// Gap between two harm siblings under the same stakeholder.
    pub short_v_gap: f64,
    pub link_head_offset: f64,
    pub label_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rect_width: 200.0,
            rect_long_width: 300.0,
            rect_height: 60.0,
            h_gap: 100.0,
            v_gap: 20.0,
            short_v_gap: 8.0,
            link_head_offset: 3.0,
            label_padding: 10.0,
        }
    }
}

impl LayoutConfig {
    pub fn box_width(&self, layer: LayerType) -> f64 {
        match layer {
            LayerType::Harm => self.rect_long_width,
            _ => self.rect_width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub duration_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self { duration_ms: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub prompt: String,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

impl PromptTemplate {
    fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            stop_sequences: Vec::new(),
        }
    }

    fn with_stop(mut self, stop: &str) -> Self {
        self.stop_sequences.push(stop.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Prefix of every request id.
    pub namespace: String,
    pub temperature: f64,
    /// Synthetic latency applied when a response is replayed from the cache.
    pub cache_replay_delay_ms: u64,
    pub summary_prompt: PromptTemplate,
    pub use_case_prompt: PromptTemplate,
    pub stakeholder_prompt: PromptTemplate,
    pub harm_prompt: PromptTemplate,
}

const SUMMARY_PROMPT: &str = "Summarize the functionality of the following AI product prompt in one short sentence.\n\nPrompt: {{userPrompt}}\n\nFunctionality:";

const USE_CASE_PROMPT: &str = "Given the functionality of an AI product, list its intended, high-stakes and misuse use cases. Write each use case inside its own tag: <intended>...</intended>, <highstakes>...</highstakes> or <misuse>...</misuse>.\n\nFunctionality: {{functionality}}\n\nUse cases:";

const STAKEHOLDER_PROMPT: &str = "Given an AI functionality and one of its use cases, list the stakeholders affected by it. Write each stakeholder as <stakeholder type=\"direct|indirect\" relevance=\"relevant|very relevant\">name</stakeholder>.\n\nFunctionality: {{functionality}}\nUse case: {{usecase}}\n\nStakeholders:";

const HARM_PROMPT: &str = "Given an AI functionality, a use case and a stakeholder, list the harms the stakeholder may suffer. Write each harm as <harm><type>harm type</type><severity>not severe|severe|very severe</severity><explain>explanation</explain></harm>.\n\nFunctionality: {{functionality}}\nUse case: {{usecase}}\nStakeholder: {{stakeholder}}\n\nHarms:";

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            namespace: "envision".to_string(),
            temperature: 0.0,
            cache_replay_delay_ms: 500,
            summary_prompt: PromptTemplate::new(SUMMARY_PROMPT).with_stop("\n"),
            use_case_prompt: PromptTemplate::new(USE_CASE_PROMPT),
            stakeholder_prompt: PromptTemplate::new(STAKEHOLDER_PROMPT).with_stop("\n\n"),
            harm_prompt: PromptTemplate::new(HARM_PROMPT).with_stop("\n\n"),
        }
    }
}

impl GenerationConfig {
    /// Template that produces the children of a `layer` node.
    pub fn template_for_children_of(&self, layer: LayerType) -> Option<&PromptTemplate> {
        match layer {
            LayerType::Summary => Some(&self.use_case_prompt),
            LayerType::UseCase => Some(&self.stakeholder_prompt),
            LayerType::Stakeholder => Some(&self.harm_prompt),
            LayerType::Harm => None,
        }
    }
}

impl EnvisionConfig {
    /// Builds a config from defaults plus a JSON override object.
    pub fn from_override(overrides: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(Self::default())?;
        deep_merge_value(&mut base, overrides);
        let config: Self = serde_json::from_value(base)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let overrides: Value = serde_json::from_str(text)?;
        if !overrides.is_object() {
            return Err(Error::InvalidConfig {
                message: "config override must be a JSON object".to_string(),
            });
        }
        Self::from_override(&overrides)
    }

    pub fn validate(&self) -> Result<()> {
        let l = &self.layout;
        let sizes = [
            ("layout.rect_width", l.rect_width),
            ("layout.rect_long_width", l.rect_long_width),
            ("layout.rect_height", l.rect_height),
        ];
        for (name, value) in sizes {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must be a positive number, got {value}"),
                });
            }
        }
        let gaps = [
            ("layout.h_gap", l.h_gap),
            ("layout.v_gap", l.v_gap),
            ("layout.short_v_gap", l.short_v_gap),
        ];
        for (name, value) in gaps {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must be non-negative, got {value}"),
                });
            }
        }
        if self.generation.namespace.is_empty() {
            return Err(Error::InvalidConfig {
                message: "generation.namespace must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn override_merges_into_nested_sections() {
        let cfg = EnvisionConfig::from_override(&json!({
            "quotas": { "direct_stakeholders": 5 },
            "layout": { "v_gap": 30.0 }
        }))
        .unwrap();
        assert_eq!(cfg.quotas.direct_stakeholders, 5);
        assert_eq!(cfg.quotas.indirect_stakeholders, 2);
        assert_eq!(cfg.layout.v_gap, 30.0);
        assert_eq!(cfg.layout.short_v_gap, 8.0);
        assert_eq!(cfg.generation.namespace, "envision");
    }

    #[test]
    fn rejects_non_positive_box_sizes() {
        let err = EnvisionConfig::from_override(&json!({ "layout": { "rect_width": 0.0 } }))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_non_object_override_text() {
        assert!(matches!(
            EnvisionConfig::from_json_str("[1, 2]"),
            Err(Error::InvalidConfig { .. })
        ));
    }
}
