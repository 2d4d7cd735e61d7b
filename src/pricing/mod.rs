//! Model pricing metadata.
//!
//! Costs are kept as [`Decimal`] so that per-unit prices such as `0.15`
//! survive round trips through configuration without float drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TOKENS_PER_UNIT: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingScheme {
    PerToken,
    PerMinute,
    PerImage,
    PerRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingUnit {
    MillionTokens,
    Minute,
    Image,
    Request,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct PricingInfo {
    pub scheme: PricingScheme,
    pub unit: PricingUnit,
    pub input_cost_per_unit: Decimal,
    pub output_cost_per_unit: Decimal,
    pub currency: String,
}

#[derive(Deserialize)]
struct UnifiedPricing {
    scheme: PricingScheme,
    unit: PricingUnit,
    #[serde(default)]
    input_cost_per_unit: Decimal,
    #[serde(default)]
    output_cost_per_unit: Decimal,
    #[serde(default = "default_currency")]
    currency: String,
}

/// Per-million-token keys used before `scheme`/`unit` existed.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LegacyPricing {
    #[serde(default)]
    input_cost_per_million_tokens: Decimal,
    #[serde(default)]
    output_cost_per_million_tokens: Decimal,
    #[serde(default = "default_currency")]
    currency: String,
}

/// A block naming `scheme` or `unit` is the unified form and must parse as
/// such; anything else is read as the legacy form.
impl TryFrom<Map<String, Value>> for PricingInfo {
    type Error = String;

    fn try_from(block: Map<String, Value>) -> Result<Self, Self::Error> {
        let unified = block.contains_key("scheme") || block.contains_key("unit");
        let block = Value::Object(block);

        let info = if unified {
            let p: UnifiedPricing = serde_json::from_value(block).map_err(|e| e.to_string())?;
            Self {
                scheme: p.scheme,
                unit: p.unit,
                input_cost_per_unit: p.input_cost_per_unit,
                output_cost_per_unit: p.output_cost_per_unit,
                currency: p.currency,
            }
        } else {
            let p: LegacyPricing = serde_json::from_value(block).map_err(|e| e.to_string())?;
            Self {
                scheme: PricingScheme::PerToken,
                unit: PricingUnit::MillionTokens,
                input_cost_per_unit: p.input_cost_per_million_tokens,
                output_cost_per_unit: p.output_cost_per_million_tokens,
                currency: p.currency,
            }
        };
        info.check()?;
        Ok(info)
    }
}

impl PricingInfo {
    pub fn per_million_tokens(input: Decimal, output: Decimal) -> Self {
        Self {
            scheme: PricingScheme::PerToken,
            unit: PricingUnit::MillionTokens,
            input_cost_per_unit: input,
            output_cost_per_unit: output,
            currency: default_currency(),
        }
    }

    pub fn check(&self) -> Result<(), String> {
        if self.input_cost_per_unit.is_sign_negative() {
            return Err("Input cost must be non-negative".into());
        }
        if self.output_cost_per_unit.is_sign_negative() {
            return Err("Output cost must be non-negative".into());
        }
        Ok(())
    }

    /// Cost for the given number of billed units on each side.
    pub fn cost(&self, input_units: Decimal, output_units: Decimal) -> Decimal {
        input_units * self.input_cost_per_unit + output_units * self.output_cost_per_unit
    }

    /// Cost of a request measured in tokens. `None` for non-token schemes.
    pub fn token_cost(&self, input_tokens: u64, output_tokens: u64) -> Option<Decimal> {
        if self.scheme != PricingScheme::PerToken {
            return None;
        }
        let per_unit = Decimal::from(TOKENS_PER_UNIT);
        let input = Decimal::from(input_tokens) / per_unit;
        let output = Decimal::from(output_tokens) / per_unit;
        Some(self.cost(input, output))
    }
}

/// How the content tokens fetched by a web search are charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTokenPolicy {
    IncludedInCallFee,
    BilledAtModelRate,
}

/// Web search charges, billed per thousand calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchBilling {
    #[serde(default)]
    pub call_fee_per_1000: Decimal,
    pub content_token_policy: ContentTokenPolicy,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WebSearchBilling {
    pub fn check(&self) -> Result<(), String> {
        if self.call_fee_per_1000.is_sign_negative() {
            return Err("call_fee_per_1000 must be non-negative".into());
        }
        Ok(())
    }

    pub fn call_cost(&self, calls: u64) -> Decimal {
        Decimal::from(calls) * self.call_fee_per_1000 / Decimal::from(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_token_cost() {
        let pricing = PricingInfo::per_million_tokens(dec!(2.5), dec!(10));
        // input: 0.1 * 2.5 = 0.25, output: 0.05 * 10 = 0.5
        assert_eq!(pricing.token_cost(100_000, 50_000), Some(dec!(0.75)));
    }

    #[test]
    fn test_non_token_scheme_has_no_token_cost() {
        let pricing = PricingInfo {
            scheme: PricingScheme::PerImage,
            unit: PricingUnit::Image,
            input_cost_per_unit: dec!(0),
            output_cost_per_unit: dec!(0.04),
            currency: "USD".into(),
        };
        assert_eq!(pricing.token_cost(1, 1), None);
        assert_eq!(pricing.cost(dec!(0), dec!(3)), dec!(0.12));
    }

    #[test]
    fn test_unified_and_legacy_forms() {
        let unified: PricingInfo = serde_json::from_value(json!({
            "scheme": "per_token",
            "unit": "million_tokens",
            "input_cost_per_unit": 0.15,
            "output_cost_per_unit": 0.6
        }))
        .unwrap();
        assert_eq!(unified.input_cost_per_unit, dec!(0.15));
        assert_eq!(unified.currency, "USD");

        let legacy: PricingInfo = serde_json::from_value(json!({
            "input_cost_per_million_tokens": 5,
            "output_cost_per_million_tokens": 15,
            "currency": "EUR"
        }))
        .unwrap();
        assert_eq!(legacy.scheme, PricingScheme::PerToken);
        assert_eq!(legacy.output_cost_per_unit, dec!(15));
        assert_eq!(legacy.currency, "EUR");
    }

    #[test]
    fn test_negative_cost_rejected() {
        let result = serde_json::from_value::<PricingInfo>(json!({
            "scheme": "per_request",
            "unit": "request",
            "input_cost_per_unit": -1,
            "output_cost_per_unit": 0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unified_block_with_bad_unit_is_rejected() {
        let result = serde_json::from_value::<PricingInfo>(json!({
            "scheme": "per_token",
            "unit": "tokens",
            "input_cost_per_unit": 2.5,
            "output_cost_per_unit": 10.0
        }));
        assert!(result.is_err());

        let scheme_only = serde_json::from_value::<PricingInfo>(json!({
            "scheme": "per_tokn",
            "input_cost_per_million_tokens": 2.5
        }));
        assert!(scheme_only.is_err());
    }

    #[test]
    fn test_legacy_block_rejects_unknown_keys() {
        let result = serde_json::from_value::<PricingInfo>(json!({
            "input_cost_per_milion_tokens": 2.5,
            "output_cost_per_million_tokens": 10
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_web_search_billing() {
        let billing: WebSearchBilling = serde_json::from_value(json!({
            "call_fee_per_1000": 10,
            "content_token_policy": "included_in_call_fee"
        }))
        .unwrap();
        assert_eq!(billing.currency, "USD");
        assert_eq!(billing.content_token_policy, ContentTokenPolicy::IncludedInCallFee);
        assert_eq!(billing.call_cost(250), dec!(2.5));
        assert!(billing.check().is_ok());

        let negative = WebSearchBilling {
            call_fee_per_1000: dec!(-1),
            ..billing
        };
        assert!(negative.check().is_err());

        let bad_policy = serde_json::from_value::<WebSearchBilling>(json!({
            "call_fee_per_1000": 10,
            "content_token_policy": "free"
        }));
        assert!(bad_policy.is_err());
    }
}
