// 📊 Metrics Repository - ranked state metrics and month series
//
// Built once from a record set; everything it hands out is derived at
// construction and never mutated afterwards.

use crate::aggregator::{aggregate_by_month, aggregate_by_state, MonthPoint, StateAccumulator};
use crate::config::{AnalyticsConfig, HealthWeights};
use crate::indices::{child_enrolment_ratio, eqi, friction_index, weighted_health_score};
use crate::records::{month_order, Period, RawRecord};
use serde::{Deserialize, Serialize};

/// States scoring below this are counted as critical in the headline stats.
pub const CRITICAL_HEALTH_SCORE: f64 = 45.0;

/// Headline anomaly estimate: floor(states below 50 * 2.5).
/// A dashboard heuristic, not the length of the detector's anomaly list.
pub const ANOMALY_ESTIMATE_HEALTH_SCORE: f64 = 50.0;
pub const ANOMALY_ESTIMATE_FACTOR: f64 = 2.5;

// ============================================================================
// STATE METRICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMetrics {
    pub state: String,
    pub total_enrolments: u64,
    /// 0-100
    pub health_score: f64,
    /// 0-1, higher is better
    pub eqi: f64,
    /// 0-1, lower is better
    pub friction_index: f64,
    /// Published rate of the reference record; unbounded
    pub bio_update_rate: f64,
    /// Demographic updates per enrolment; unbounded
    pub demo_update_rate: f64,
    /// 0-1
    pub child_enrolment_ratio: f64,
    /// Earliest (year, month) contributing to this state
    pub period: Period,
}

impl StateMetrics {
    pub fn from_accumulator(acc: &StateAccumulator, weights: &HealthWeights) -> Self {
        let eqi = eqi(acc.total_bio_updates, acc.total_enrolments);
        let friction = friction_index(acc.bio_updates_per_enrolment());
        let cer = child_enrolment_ratio(acc.total_child_enrolments, acc.total_enrolments);
        let reference = acc.reference_record();

        StateMetrics {
            state: acc.state.clone(),
            total_enrolments: acc.total_enrolments,
            health_score: weighted_health_score(eqi, friction, cer, weights),
            eqi,
            friction_index: friction,
            bio_update_rate: reference.map(|r| r.bio_update_rate).unwrap_or(0.0),
            demo_update_rate: acc.demo_updates_per_enrolment(),
            child_enrolment_ratio: cer,
            period: reference.map(|r| r.period()).unwrap_or_default(),
        }
    }
}

// ============================================================================
// AGGREGATE STATS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub state_count: usize,
    pub total_enrolments: u64,
    /// Rounded to one decimal
    pub average_health_score: f64,
    pub critical_state_count: usize,
    /// Heuristic headline figure; see ANOMALY_ESTIMATE_FACTOR
    pub anomaly_count_estimate: usize,
}

impl AggregateStats {
    pub fn from_metrics(metrics: &[StateMetrics]) -> Self {
        let state_count = metrics.len();
        let total_enrolments = metrics
            .iter()
            .fold(0u64, |acc, m| acc.saturating_add(m.total_enrolments));

        let average_health_score = if state_count == 0 {
            0.0
        } else {
            let mean = metrics.iter().map(|m| m.health_score).sum::<f64>() / state_count as f64;
            (mean * 10.0).round() / 10.0
        };

        let critical_state_count = metrics
            .iter()
            .filter(|m| m.health_score < CRITICAL_HEALTH_SCORE)
            .count();

        let struggling = metrics
            .iter()
            .filter(|m| m.health_score < ANOMALY_ESTIMATE_HEALTH_SCORE)
            .count();

        AggregateStats {
            state_count,
            total_enrolments,
            average_health_score,
            critical_state_count,
            anomaly_count_estimate: (struggling as f64 * ANOMALY_ESTIMATE_FACTOR).floor() as usize,
        }
    }
}

// ============================================================================
// REPOSITORY
// ============================================================================

pub struct MetricsRepository {
    records: Vec<RawRecord>,
    /// Sorted by health score, best first
    metrics: Vec<StateMetrics>,
    config: AnalyticsConfig,
}

impl MetricsRepository {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self::with_config(records, AnalyticsConfig::default())
    }

    pub fn with_config(records: Vec<RawRecord>, config: AnalyticsConfig) -> Self {
        let mut metrics: Vec<StateMetrics> = aggregate_by_state(&records)
            .values()
            .map(|acc| StateMetrics::from_accumulator(acc, &config.weights))
            .collect();

        // Stable: equal scores keep the alphabetical order of the accumulator map
        metrics.sort_by(|a, b| b.health_score.total_cmp(&a.health_score));

        tracing::info!(
            records = records.len(),
            states = metrics.len(),
            "Computed state metrics"
        );

        MetricsRepository {
            records,
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// All states, best health score first.
    pub fn list_state_metrics(&self) -> &[StateMetrics] {
        &self.metrics
    }

    pub fn find_state(&self, state: &str) -> Option<&StateMetrics> {
        let state = state.trim();
        self.metrics.iter().find(|m| m.state == state)
    }

    pub fn top_performers(&self, count: usize) -> Vec<StateMetrics> {
        self.metrics.iter().take(count).cloned().collect()
    }

    /// The `count` lowest scorers, worst first.
    pub fn bottom_performers(&self, count: usize) -> Vec<StateMetrics> {
        let start = self.metrics.len().saturating_sub(count);
        self.metrics[start..].iter().rev().cloned().collect()
    }

    /// Month series for one state in calendar order. Unknown states yield an empty series.
    pub fn time_series(&self, state: &str) -> Vec<MonthPoint> {
        let mut months: Vec<(u32, MonthPoint)> = aggregate_by_month(&self.records, state)
            .iter()
            .map(|(month, totals)| (*month, MonthPoint::new(*month, totals)))
            .collect();

        months.sort_by_key(|(month, _)| month_order(*month));
        months.into_iter().map(|(_, point)| point).collect()
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        AggregateStats::from_metrics(&self.metrics)
    }
}

// ============================================================================
// TESTS
// ============================================================================
