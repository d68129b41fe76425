//! Cost estimation from token usage
//!
//! Costs are estimated by multiplying per-model token counts (in millions)
//! by API rates. Model ids are normalized before pricing lookup so dated
//! releases of the same model (`claude-sonnet-4-20250514`) share one rate.
//! Unknown models price at a conservative fallback rather than silently
//! costing zero.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::settings::{default_pricing, ModelPricing, Settings};
use crate::types::TokenUsage;

/// Rate applied when a model id has no pricing entry.
pub const FALLBACK_MODEL_ID: &str = "claude-sonnet-4";

/// Strip a trailing `-YYYYMMDD` date suffix from a model id.
///
/// Only a suffix of exactly a dash followed by eight ASCII digits is
/// removed; `claude-opus-4-1` and other short numeric suffixes pass
/// through unchanged.
pub fn normalize_model_id(model_id: &str) -> &str {
    let bytes = model_id.as_bytes();
    if bytes.len() > 9 {
        let (head, tail) = bytes.split_at(bytes.len() - 9);
        if tail[0] == b'-' && tail[1..].iter().all(|b| b.is_ascii_digit()) {
            // split index is on an ASCII boundary
            return &model_id[..head.len()];
        }
    }
    model_id
}

/// Effective rate card: defaults with user overrides applied. An override
/// replaces all four rates for its model as a unit.
pub fn merged_pricing(settings: &Settings) -> HashMap<String, ModelPricing> {
    let mut pricing: HashMap<String, ModelPricing> = default_pricing()
        .into_iter()
        .map(|p| (p.model_id.clone(), p))
        .collect();

    for (model_id, over) in &settings.pricing_overrides {
        let display_name = pricing
            .get(model_id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| model_id.clone());
        pricing.insert(
            model_id.clone(),
            ModelPricing {
                model_id: model_id.clone(),
                display_name,
                input_per_m_tok: over.input_per_m_tok,
                output_per_m_tok: over.output_per_m_tok,
                cache_read_per_m_tok: over.cache_read_per_m_tok,
                cache_write_per_m_tok: over.cache_write_per_m_tok,
            },
        );
    }

    pricing
}

/// Cost split by token category, in USD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCosts {
    pub input: f64,
    pub output: f64,
    pub cache_read: f64,
    pub cache_write: f64,
}

/// Cost attributed to one normalized model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCostBreakdown {
    pub display_name: String,
    pub tokens: TokenUsage,
    pub cost_usd: f64,
    /// True when this model priced at the fallback rate.
    pub used_fallback_pricing: bool,
}

/// Estimated cost of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    #[serde(rename = "totalUSD")]
    pub total_usd: f64,
    pub by_model: HashMap<String, ModelCostBreakdown>,
    pub by_category: CategoryCosts,
}

fn usage_cost(tokens: &TokenUsage, rates: &ModelPricing) -> CategoryCosts {
    CategoryCosts {
        input: tokens.input_tokens as f64 / 1e6 * rates.input_per_m_tok,
        output: tokens.output_tokens as f64 / 1e6 * rates.output_per_m_tok,
        cache_read: tokens.cache_read_input_tokens as f64 / 1e6 * rates.cache_read_per_m_tok,
        cache_write: tokens.cache_creation_input_tokens as f64 / 1e6 * rates.cache_write_per_m_tok,
    }
}

/// Estimate cost from per-model token totals against an effective rate
/// card (see [`merged_pricing`]). Model ids that normalize to the same id
/// have their usage merged before pricing. Taking the rate card directly
/// lets a caller pricing many sessions merge the overrides once.
pub fn calculate_session_cost(
    tokens_by_model: &HashMap<String, TokenUsage>,
    pricing: &HashMap<String, ModelPricing>,
) -> CostBreakdown {
    let mut merged: HashMap<String, TokenUsage> = HashMap::new();
    for (model_id, usage) in tokens_by_model {
        merged
            .entry(normalize_model_id(model_id).to_string())
            .or_default()
            .accumulate(usage);
    }

    let mut by_model = HashMap::new();
    let mut by_category = CategoryCosts::default();
    let mut total_usd = 0.0;

    for (model_id, usage) in merged {
        let (rates, used_fallback) = match pricing.get(&model_id) {
            Some(rates) => (rates, false),
            None => match pricing.get(FALLBACK_MODEL_ID) {
                Some(rates) => (rates, true),
                None => continue,
            },
        };

        let costs = usage_cost(&usage, rates);
        let model_total = costs.input + costs.output + costs.cache_read + costs.cache_write;

        by_category.input += costs.input;
        by_category.output += costs.output;
        by_category.cache_read += costs.cache_read;
        by_category.cache_write += costs.cache_write;
        total_usd += model_total;

        by_model.insert(
            model_id,
            ModelCostBreakdown {
                display_name: rates.display_name.clone(),
                tokens: usage,
                cost_usd: model_total,
                used_fallback_pricing: used_fallback,
            },
        );
    }

    CostBreakdown {
        total_usd,
        by_model,
        by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ModelPricingOverride;

    fn usage(input: u64, output: u64, cache_read: u64, cache_write: u64) -> TokenUsage {
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
            cache_read_input_tokens: cache_read,
            cache_creation_input_tokens: cache_write,
        }
    }

    #[test]
    fn test_normalize_model_id() {
        assert_eq!(
            normalize_model_id("claude-sonnet-4-20250514"),
            "claude-sonnet-4"
        );
        assert_eq!(
            normalize_model_id("claude-opus-4-1-20250805"),
            "claude-opus-4-1"
        );
        // short numeric suffixes are version components, not dates
        assert_eq!(normalize_model_id("claude-opus-4-1"), "claude-opus-4-1");
        assert_eq!(normalize_model_id("claude-sonnet-4"), "claude-sonnet-4");
        // nine digits or letters in the suffix do not match
        assert_eq!(
            normalize_model_id("claude-sonnet-4-2025051a"),
            "claude-sonnet-4-2025051a"
        );
        assert_eq!(normalize_model_id(""), "");
    }

    #[test]
    fn test_dated_releases_merge_before_pricing() {
        let mut tokens = HashMap::new();
        tokens.insert(
            "claude-sonnet-4-20250514".to_string(),
            usage(1_000_000, 500_000, 0, 0),
        );
        tokens.insert(
            "claude-sonnet-4-20250601".to_string(),
            usage(500_000, 250_000, 0, 0),
        );

        let breakdown = calculate_session_cost(&tokens, &merged_pricing(&Settings::default()));

        assert_eq!(breakdown.by_model.len(), 1);
        let sonnet = &breakdown.by_model["claude-sonnet-4"];
        assert_eq!(sonnet.tokens.input_tokens, 1_500_000);
        assert_eq!(sonnet.tokens.output_tokens, 750_000);
        // 1.5M input at $3 + 0.75M output at $15
        assert!((breakdown.total_usd - 15.75).abs() < 1e-9);
        assert!(!sonnet.used_fallback_pricing);
    }

    #[test]
    fn test_unknown_model_uses_fallback() {
        let mut tokens = HashMap::new();
        tokens.insert("experimental-model-x".to_string(), usage(1_000_000, 0, 0, 0));

        let breakdown = calculate_session_cost(&tokens, &merged_pricing(&Settings::default()));
        let entry = &breakdown.by_model["experimental-model-x"];
        assert!(entry.used_fallback_pricing);
        // priced at claude-sonnet-4 input rate
        assert!((entry.cost_usd - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_override_replaces_all_rates() {
        let mut settings = Settings::default();
        settings.pricing_overrides.insert(
            "claude-sonnet-4".to_string(),
            ModelPricingOverride {
                input_per_m_tok: 1.0,
                output_per_m_tok: 1.0,
                cache_read_per_m_tok: 1.0,
                cache_write_per_m_tok: 1.0,
            },
        );

        let mut tokens = HashMap::new();
        tokens.insert(
            "claude-sonnet-4".to_string(),
            usage(1_000_000, 1_000_000, 1_000_000, 1_000_000),
        );

        let breakdown = calculate_session_cost(&tokens, &merged_pricing(&settings));
        assert!((breakdown.total_usd - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_category_totals_sum_to_total() {
        let mut tokens = HashMap::new();
        tokens.insert(
            "claude-opus-4-6".to_string(),
            usage(500_000, 100_000, 2_000_000, 300_000),
        );
        tokens.insert(
            "claude-haiku-3-5".to_string(),
            usage(10_000, 5_000, 0, 0),
        );

        let breakdown = calculate_session_cost(&tokens, &merged_pricing(&Settings::default()));
        let by_cat = &breakdown.by_category;
        let cat_sum = by_cat.input + by_cat.output + by_cat.cache_read + by_cat.cache_write;
        assert!((cat_sum - breakdown.total_usd).abs() < 1e-9);

        let model_sum: f64 = breakdown.by_model.values().map(|m| m.cost_usd).sum();
        assert!((model_sum - breakdown.total_usd).abs() < 1e-9);
    }

    #[test]
    fn test_empty_usage_costs_zero() {
        let breakdown = calculate_session_cost(&HashMap::new(), &merged_pricing(&Settings::default()));
        assert_eq!(breakdown.total_usd, 0.0);
        assert!(breakdown.by_model.is_empty());
    }
}
