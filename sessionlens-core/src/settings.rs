//! Dashboard settings persistence
//!
//! Settings live in a single JSON file under the dashboard data directory.
//! Reads are forgiving (missing or corrupt files fall back to defaults with
//! a warning); writes are validated and atomic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;

use crate::error::{Error, Result};

pub const SETTINGS_VERSION: u32 = 1;

/// Subscription plan the user is on. Informational only; cost estimates
/// always use API rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionTier {
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "pro")]
    Pro,
    #[serde(rename = "max-5x")]
    Max5x,
    #[serde(rename = "max-20x")]
    Max20x,
    #[serde(rename = "teams")]
    Teams,
    #[serde(rename = "enterprise")]
    Enterprise,
    #[serde(rename = "api")]
    Api,
}

impl SubscriptionTier {
    pub fn label(self) -> &'static str {
        match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::Pro => "Pro",
            SubscriptionTier::Max5x => "Max 5x",
            SubscriptionTier::Max20x => "Max 20x",
            SubscriptionTier::Teams => "Teams",
            SubscriptionTier::Enterprise => "Enterprise",
            SubscriptionTier::Api => "API (pay per use)",
        }
    }
}

/// All supported tiers, in display order.
pub fn subscription_tiers() -> [SubscriptionTier; 7] {
    [
        SubscriptionTier::Free,
        SubscriptionTier::Pro,
        SubscriptionTier::Max5x,
        SubscriptionTier::Max20x,
        SubscriptionTier::Teams,
        SubscriptionTier::Enterprise,
        SubscriptionTier::Api,
    ]
}

/// User-supplied per-model pricing. An override replaces all four rates for
/// its model; there is no per-rate merging with the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPricingOverride {
    pub input_per_m_tok: f64,
    pub output_per_m_tok: f64,
    pub cache_read_per_m_tok: f64,
    pub cache_write_per_m_tok: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub version: u32,
    #[serde(default = "default_tier")]
    pub subscription_tier: SubscriptionTier,
    /// Keyed by normalized model id.
    #[serde(default)]
    pub pricing_overrides: HashMap<String, ModelPricingOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_tier() -> SubscriptionTier {
    SubscriptionTier::Pro
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            subscription_tier: default_tier(),
            pricing_overrides: HashMap::new(),
            updated_at: None,
        }
    }
}

impl Settings {
    /// Reject settings that could not have been produced by a current
    /// version of the dashboard.
    pub fn validate(&self) -> Result<()> {
        if self.version != SETTINGS_VERSION {
            return Err(Error::Config(format!(
                "unsupported settings version {}",
                self.version
            )));
        }
        for (model, pricing) in &self.pricing_overrides {
            let rates = [
                pricing.input_per_m_tok,
                pricing.output_per_m_tok,
                pricing.cache_read_per_m_tok,
                pricing.cache_write_per_m_tok,
            ];
            if rates.iter().any(|r| !r.is_finite() || *r < 0.0) {
                return Err(Error::Config(format!(
                    "invalid pricing override for {model}: rates must be non-negative"
                )));
            }
        }
        Ok(())
    }
}

/// Load settings from `path`. Missing, unreadable, corrupt, or invalid
/// files all fall back to defaults so a bad settings file can never take
/// the dashboard down.
pub fn load_settings(path: &Path) -> Settings {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Settings::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read settings, using defaults");
            return Settings::default();
        }
    };

    let settings: Settings = match serde_json::from_str(&raw) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt settings file, using defaults");
            return Settings::default();
        }
    };

    if let Err(e) = settings.validate() {
        warn!(path = %path.display(), error = %e, "invalid settings file, using defaults");
        return Settings::default();
    }

    settings
}

/// Validate and persist settings, stamping `updated_at`. Returns the
/// stamped settings as written. The write is atomic (temp file + rename).
pub fn save_settings(path: &Path, settings: &Settings) -> Result<Settings> {
    settings.validate()?;

    let mut stamped = settings.clone();
    stamped.updated_at = Some(chrono::Utc::now().to_rfc3339());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&stamped)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    Ok(stamped)
}

/// Default API pricing for a model, in USD per million tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPricing {
    pub model_id: String,
    pub display_name: String,
    pub input_per_m_tok: f64,
    pub output_per_m_tok: f64,
    pub cache_read_per_m_tok: f64,
    pub cache_write_per_m_tok: f64,
}

impl ModelPricing {
    fn new(
        model_id: &str,
        display_name: &str,
        input: f64,
        output: f64,
        cache_read: f64,
        cache_write: f64,
    ) -> Self {
        Self {
            model_id: model_id.to_string(),
            display_name: display_name.to_string(),
            input_per_m_tok: input,
            output_per_m_tok: output,
            cache_read_per_m_tok: cache_read,
            cache_write_per_m_tok: cache_write,
        }
    }
}

/// Built-in API rate card, keyed by normalized model id.
pub fn default_pricing() -> Vec<ModelPricing> {
    vec![
        ModelPricing::new("claude-opus-4-6", "Claude Opus 4.6", 5.0, 25.0, 0.5, 6.25),
        ModelPricing::new("claude-opus-4-5", "Claude Opus 4.5", 5.0, 25.0, 0.5, 6.25),
        ModelPricing::new("claude-opus-4-1", "Claude Opus 4.1", 15.0, 75.0, 1.5, 18.75),
        ModelPricing::new("claude-opus-4", "Claude Opus 4", 15.0, 75.0, 1.5, 18.75),
        ModelPricing::new("claude-sonnet-4-5", "Claude Sonnet 4.5", 3.0, 15.0, 0.3, 3.75),
        ModelPricing::new("claude-sonnet-4", "Claude Sonnet 4", 3.0, 15.0, 0.3, 3.75),
        ModelPricing::new("claude-haiku-4-5", "Claude Haiku 4.5", 1.0, 5.0, 0.1, 1.25),
        ModelPricing::new("claude-haiku-3-5", "Claude Haiku 3.5", 0.8, 4.0, 0.08, 1.0),
        ModelPricing::new("claude-haiku-3", "Claude Haiku 3", 0.25, 1.25, 0.03, 0.3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.subscription_tier, SubscriptionTier::Pro);
        assert!(settings.pricing_overrides.is_empty());
        assert!(settings.updated_at.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_corrupt_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{broken").unwrap();
        assert_eq!(load_settings(&path), Settings::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.subscription_tier = SubscriptionTier::Max20x;
        settings.pricing_overrides.insert(
            "claude-sonnet-4".to_string(),
            ModelPricingOverride {
                input_per_m_tok: 1.0,
                output_per_m_tok: 2.0,
                cache_read_per_m_tok: 0.1,
                cache_write_per_m_tok: 0.5,
            },
        );

        let saved = save_settings(&path, &settings).unwrap();
        assert!(saved.updated_at.is_some());

        let loaded = load_settings(&path);
        assert_eq!(loaded, saved);
        assert_eq!(loaded.subscription_tier, SubscriptionTier::Max20x);
    }

    #[test]
    fn test_save_rejects_negative_rates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.pricing_overrides.insert(
            "claude-sonnet-4".to_string(),
            ModelPricingOverride {
                input_per_m_tok: -1.0,
                output_per_m_tok: 2.0,
                cache_read_per_m_tok: 0.1,
                cache_write_per_m_tok: 0.5,
            },
        );

        assert!(save_settings(&path, &settings).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_wrong_version_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"version":7,"subscriptionTier":"pro"}"#).unwrap();
        assert_eq!(load_settings(&path), Settings::default());
    }

    #[test]
    fn test_tier_serde_names() {
        let json = serde_json::to_string(&SubscriptionTier::Max5x).unwrap();
        assert_eq!(json, r#""max-5x""#);
        let tier: SubscriptionTier = serde_json::from_str(r#""max-20x""#).unwrap();
        assert_eq!(tier, SubscriptionTier::Max20x);
    }

    #[test]
    fn test_default_pricing_table() {
        let pricing = default_pricing();
        assert_eq!(pricing.len(), 9);
        let sonnet = pricing
            .iter()
            .find(|p| p.model_id == "claude-sonnet-4")
            .unwrap();
        assert_eq!(sonnet.input_per_m_tok, 3.0);
        assert_eq!(sonnet.output_per_m_tok, 15.0);
    }
}
