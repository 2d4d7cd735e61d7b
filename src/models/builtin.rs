use rust_decimal_macros::dec;

use super::version::ModelVersion;
use crate::config::{ModelEntry, RegistryData};
use crate::constraints::{
    EnumConstraint, FixedParameterSet, NumericConstraint, ObjectConstraint, ParameterReference,
};
use crate::pricing::PricingInfo;

pub const TEMPERATURE: &str = "numeric_constraints.temperature";
pub const TOP_P: &str = "numeric_constraints.top_p";
pub const FREQUENCY_PENALTY: &str = "numeric_constraints.frequency_penalty";
pub const PRESENCE_PENALTY: &str = "numeric_constraints.presence_penalty";
pub const MAX_COMPLETION_TOKENS: &str = "numeric_constraints.max_completion_tokens";
pub const REASONING_EFFORT: &str = "enum_constraints.reasoning_effort";
pub const RESPONSE_FORMAT: &str = "object_constraints.response_format";
pub const REASONING_SET: &str = "reasoning";

/// Minimal data set used when no registry document is available.
pub fn registry_data() -> RegistryData {
    RegistryData::new()
        .constraint(
            TEMPERATURE,
            NumericConstraint::new(0.0, Some(2.0))
                .description("Controls randomness: lower is more deterministic"),
        )
        .constraint(
            TOP_P,
            NumericConstraint::new(0.0, Some(1.0)).description("Nucleus sampling threshold"),
        )
        .constraint(
            FREQUENCY_PENALTY,
            NumericConstraint::new(-2.0, Some(2.0)).description("Penalty for token frequency"),
        )
        .constraint(
            PRESENCE_PENALTY,
            NumericConstraint::new(-2.0, Some(2.0)).description("Penalty for token presence"),
        )
        .constraint(
            MAX_COMPLETION_TOKENS,
            NumericConstraint::new(1.0, None)
                .integers_only()
                .description("Upper bound on generated tokens"),
        )
        .constraint(
            REASONING_EFFORT,
            EnumConstraint::new(["low", "medium", "high"])
                .description("Effort spent on reasoning before answering"),
        )
        .constraint(
            RESPONSE_FORMAT,
            ObjectConstraint::new()
                .require(["type"])
                .allow(["type", "json_schema"])
                .description("Output format selector"),
        )
        .fixed_set(
            REASONING_SET,
            FixedParameterSet::new()
                .value("temperature", 1.0)
                .value("top_p", 1.0)
                .description("Sampling is fixed for reasoning models"),
        )
        .model("gpt-4o-2024-08-06", gpt_4o())
        .alias("gpt-4o", "gpt-4o-2024-08-06")
        .model("gpt-4o-mini-2024-07-18", gpt_4o_mini())
        .alias("gpt-4o-mini", "gpt-4o-mini-2024-07-18")
        .model("o1-2024-12-17", o1())
        .alias("o1", "o1-2024-12-17")
}

fn sampling_params() -> Vec<ParameterReference> {
    vec![
        ParameterReference::new(TEMPERATURE),
        ParameterReference::new(TOP_P),
        ParameterReference::new(FREQUENCY_PENALTY),
        ParameterReference::new(PRESENCE_PENALTY),
        ParameterReference::new(MAX_COMPLETION_TOKENS),
        ParameterReference::new(RESPONSE_FORMAT),
    ]
}

fn gpt_4o() -> ModelEntry {
    ModelEntry {
        context_window: 128_000,
        max_output_tokens: 16_384,
        supports_vision: true,
        supports_functions: true,
        supports_json_mode: true,
        input_modalities: vec!["text".into(), "image".into()],
        output_modalities: vec!["text".into()],
        supported_parameters: sampling_params(),
        min_version: Some(ModelVersion::ymd(2024, 8, 6)),
        description: "Flagship multimodal model with structured output".into(),
        pricing: Some(PricingInfo::per_million_tokens(dec!(2.50), dec!(10.00))),
        ..Default::default()
    }
}

fn gpt_4o_mini() -> ModelEntry {
    ModelEntry {
        context_window: 128_000,
        max_output_tokens: 16_384,
        supports_vision: true,
        supports_functions: true,
        supports_json_mode: true,
        input_modalities: vec!["text".into(), "image".into()],
        output_modalities: vec!["text".into()],
        supported_parameters: sampling_params(),
        min_version: Some(ModelVersion::ymd(2024, 7, 18)),
        description: "Small, fast multimodal model".into(),
        pricing: Some(PricingInfo::per_million_tokens(dec!(0.15), dec!(0.60))),
        ..Default::default()
    }
}

fn o1() -> ModelEntry {
    let fixed = |param: &str| {
        ParameterReference::new(format!("fixed_parameter_sets.{}.{}", REASONING_SET, param))
    };

    ModelEntry {
        context_window: 200_000,
        max_output_tokens: 100_000,
        supports_streaming: false,
        supports_vision: true,
        supports_functions: true,
        input_modalities: vec!["text".into(), "image".into()],
        output_modalities: vec!["text".into()],
        supported_parameters: vec![
            ParameterReference::new(REASONING_EFFORT),
            ParameterReference::new(MAX_COMPLETION_TOKENS),
            ParameterReference::new(RESPONSE_FORMAT),
            fixed("temperature"),
            fixed("top_p"),
        ],
        min_version: Some(ModelVersion::ymd(2024, 12, 17)),
        description: "Reasoning model".into(),
        pricing: Some(PricingInfo::per_million_tokens(dec!(15), dec!(60))),
        ..Default::default()
    }
}
