// ⚙️ Analytics configuration
// Weights and thresholds as data: tune them in a JSON file, not in the algorithms.
//
// Every field has a default, so an empty object `{}` is a valid config.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub weights: HealthWeights,
    #[serde(default)]
    pub anomaly: AnomalyThresholds,
    #[serde(default)]
    pub recommendation: RecommendationThresholds,
}

/// Weights of the composite health score. Defaults sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthWeights {
    #[serde(default = "default_eqi_weight")]
    pub eqi: f64,
    #[serde(default = "default_friction_weight")]
    pub friction: f64,
    #[serde(default = "default_child_weight")]
    pub child_enrolment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    /// Bio update rate above this is flagged
    #[serde(default = "default_bio_rate_warning")]
    pub bio_update_rate_warning: f64,
    /// ...and escalated to Critical above this
    #[serde(default = "default_bio_rate_critical")]
    pub bio_update_rate_critical: f64,
    #[serde(default = "default_low_friction")]
    pub low_friction: f64,
    #[serde(default = "default_high_volume")]
    pub high_volume_enrolments: u64,
    #[serde(default = "default_low_eqi")]
    pub low_eqi: f64,
    #[serde(default = "default_max_anomalies")]
    pub max_anomalies: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationThresholds {
    /// Health scores strictly below this get a Critical recommendation
    #[serde(default = "default_critical_below")]
    pub critical_below: f64,
    /// Health scores strictly below this (and not Critical) get a High one
    #[serde(default = "default_high_below")]
    pub high_below: f64,
}

fn default_eqi_weight() -> f64 {
    0.4
}

fn default_friction_weight() -> f64 {
    0.4
}

fn default_child_weight() -> f64 {
    0.2
}

fn default_bio_rate_warning() -> f64 {
    5.0
}

fn default_bio_rate_critical() -> f64 {
    20.0
}

fn default_low_friction() -> f64 {
    0.1
}

fn default_high_volume() -> u64 {
    50_000
}

fn default_low_eqi() -> f64 {
    0.5
}

fn default_max_anomalies() -> usize {
    15
}

fn default_critical_below() -> f64 {
    45.0
}

fn default_high_below() -> f64 {
    60.0
}

impl Default for HealthWeights {
    fn default() -> Self {
        HealthWeights {
            eqi: default_eqi_weight(),
            friction: default_friction_weight(),
            child_enrolment: default_child_weight(),
        }
    }
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        AnomalyThresholds {
            bio_update_rate_warning: default_bio_rate_warning(),
            bio_update_rate_critical: default_bio_rate_critical(),
            low_friction: default_low_friction(),
            high_volume_enrolments: default_high_volume(),
            low_eqi: default_low_eqi(),
            max_anomalies: default_max_anomalies(),
        }
    }
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        RecommendationThresholds {
            critical_below: default_critical_below(),
            high_below: default_high_below(),
        }
    }
}

impl AnalyticsConfig {
    /// Load config from a JSON file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config = Self::from_json(&content)?;
        tracing::info!(path = ?path.as_ref(), "Loaded analytics config");
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: AnalyticsConfig =
            serde_json::from_str(content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        for (name, value) in [
            ("eqi", w.eqi),
            ("friction", w.friction),
            ("child_enrolment", w.child_enrolment),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("Weight '{}' must be a non-negative number, got {}", name, value);
            }
        }

        let a = &self.anomaly;
        if a.bio_update_rate_critical < a.bio_update_rate_warning {
            bail!(
                "bio_update_rate_critical ({}) is below bio_update_rate_warning ({})",
                a.bio_update_rate_critical,
                a.bio_update_rate_warning
            );
        }

        let r = &self.recommendation;
        if r.high_below < r.critical_below {
            bail!(
                "high_below ({}) is below critical_below ({})",
                r.high_below,
                r.critical_below
            );
        }

        Ok(())
    }
}
