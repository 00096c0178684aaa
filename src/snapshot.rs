// 📸 Analytics Snapshot - one computed view shared by every report
//
// Reports never re-run detection: compute a snapshot once, then hand the same
// value to each CSV and text renderer so they all describe one state of the data.

use crate::anomaly::{Anomaly, AnomalyDetector};
use crate::config::HealthWeights;
use crate::metrics::{AggregateStats, MetricsRepository, StateMetrics};
use crate::recommendations::{Recommendation, RecommendationEngine};
use crate::report::{state_rankings_csv, ExportError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub generated_at: DateTime<Utc>,
    /// Best health score first
    pub metrics: Vec<StateMetrics>,
    pub stats: AggregateStats,
    pub anomalies: Vec<Anomaly>,
    pub recommendations: Vec<Recommendation>,
    pub weights: HealthWeights,
}

impl AnalyticsSnapshot {
    pub fn capture(repo: &MetricsRepository) -> Self {
        Self::capture_at(repo, Utc::now())
    }

    pub fn capture_at(repo: &MetricsRepository, generated_at: DateTime<Utc>) -> Self {
        let config = repo.config();
        let metrics = repo.list_state_metrics();

        let anomalies = AnomalyDetector::with_thresholds(config.anomaly.clone()).detect(metrics);
        let recommendations =
            RecommendationEngine::with_thresholds(config.recommendation.clone()).generate(metrics);

        AnalyticsSnapshot {
            generated_at,
            metrics: metrics.to_vec(),
            stats: repo.aggregate_stats(),
            anomalies,
            recommendations,
            weights: config.weights,
        }
    }

    pub fn top_performers(&self, count: usize) -> &[StateMetrics] {
        &self.metrics[..count.min(self.metrics.len())]
    }

    /// Lowest scorers, worst first
    pub fn bottom_performers(&self, count: usize) -> Vec<&StateMetrics> {
        let start = self.metrics.len().saturating_sub(count);
        self.metrics[start..].iter().rev().collect()
    }

    /// SHA-256 of the state rankings CSV. Identical inputs give identical fingerprints.
    pub fn fingerprint(&self) -> Result<String, ExportError> {
        let csv = state_rankings_csv(&self.metrics)?;
        let mut hasher = Sha256::new();
        hasher.update(csv.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}
