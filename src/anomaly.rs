// 🚨 Anomaly Detector
//
// Three independent rules per state (a state can raise 0-3 anomalies):
//   1. bio update rate above the warning threshold (Critical above the critical one)
//   2. near-zero friction on a high-volume state (Warning)
//   3. low enrolment quality (Critical)
// The list keeps the first `max_anomalies` generated, then Critical entries
// move ahead of Warnings with order preserved inside each group.

use crate::config::AnomalyThresholds;
use crate::metrics::StateMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Share of a state's enrolments estimated as affected, per rule.
const BIO_RATE_AFFECTED_SHARE: f64 = 0.10;
const LOW_FRICTION_AFFECTED_SHARE: f64 = 0.05;
const LOW_EQI_AFFECTED_SHARE: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Warning => "Warning",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule raised the anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyKind {
    HighBioUpdateRate,
    LowFrictionHighVolume,
    LowEnrolmentQuality,
}

impl AnomalyKind {
    pub fn label(&self) -> &'static str {
        match self {
            AnomalyKind::HighBioUpdateRate => "High Biometric Update Rate",
            AnomalyKind::LowFrictionHighVolume => "Low Friction High Volume",
            AnomalyKind::LowEnrolmentQuality => "Low Enrolment Quality",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Sequential from 1 in generation order
    pub id: usize,
    pub state: String,
    pub year: i32,
    pub month: String,
    pub update_rate_percent: f64,
    pub severity: Severity,
    /// Estimate, not a measured count
    pub affected_enrolments: u64,
    pub kind: AnomalyKind,
    pub health_score: f64,
    pub friction_index: f64,
}

pub struct AnomalyDetector {
    thresholds: AnomalyThresholds,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::with_thresholds(AnomalyThresholds::default())
    }

    pub fn with_thresholds(thresholds: AnomalyThresholds) -> Self {
        AnomalyDetector { thresholds }
    }

    pub fn detect(&self, metrics: &[StateMetrics]) -> Vec<Anomaly> {
        let t = &self.thresholds;
        let mut anomalies = Vec::new();

        for m in metrics {
            if m.bio_update_rate > t.bio_update_rate_warning {
                let severity = if m.bio_update_rate > t.bio_update_rate_critical {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                anomalies.push(self.raise(
                    anomalies.len() + 1,
                    m,
                    AnomalyKind::HighBioUpdateRate,
                    severity,
                    m.bio_update_rate,
                    BIO_RATE_AFFECTED_SHARE,
                ));
            }

            if m.friction_index < t.low_friction && m.total_enrolments > t.high_volume_enrolments {
                anomalies.push(self.raise(
                    anomalies.len() + 1,
                    m,
                    AnomalyKind::LowFrictionHighVolume,
                    Severity::Warning,
                    m.friction_index * 100.0,
                    LOW_FRICTION_AFFECTED_SHARE,
                ));
            }

            if m.eqi < t.low_eqi {
                anomalies.push(self.raise(
                    anomalies.len() + 1,
                    m,
                    AnomalyKind::LowEnrolmentQuality,
                    Severity::Critical,
                    (1.0 - m.eqi) * 100.0,
                    LOW_EQI_AFFECTED_SHARE,
                ));
            }
        }

        let generated = anomalies.len();
        anomalies.truncate(t.max_anomalies);
        // sort_by_key is stable
        anomalies.sort_by_key(|a| a.severity.rank());

        tracing::info!(
            generated,
            kept = anomalies.len(),
            critical = anomalies.iter().filter(|a| a.severity == Severity::Critical).count(),
            "Detected anomalies"
        );

        anomalies
    }

    fn raise(
        &self,
        id: usize,
        m: &StateMetrics,
        kind: AnomalyKind,
        severity: Severity,
        update_rate_percent: f64,
        affected_share: f64,
    ) -> Anomaly {
        Anomaly {
            id,
            state: m.state.clone(),
            year: m.period.year,
            month: m.period.month_name(),
            update_rate_percent,
            severity,
            affected_enrolments: (m.total_enrolments as f64 * affected_share).floor() as u64,
            kind,
            health_score: m.health_score,
            friction_index: m.friction_index,
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Period;

    fn metrics(state: &str, bio_rate: f64, eqi: f64, friction: f64, total: u64) -> StateMetrics {
        StateMetrics {
            state: state.to_string(),
            total_enrolments: total,
            health_score: 50.0,
            eqi,
            friction_index: friction,
            bio_update_rate: bio_rate,
            demo_update_rate: 0.0,
            child_enrolment_ratio: 0.2,
            period: Period { year: 2025, month: 3 },
        }
    }

    #[test]
    fn test_single_critical_bio_rate_anomaly() {
        let detector = AnomalyDetector::new();

        let anomalies = detector.detect(&[metrics("Testland", 25.0, 0.9, 0.5, 100)]);

        assert_eq!(anomalies.len(), 1);
        let a = &anomalies[0];
        assert_eq!(a.severity, Severity::Critical);
        assert_eq!(a.kind, AnomalyKind::HighBioUpdateRate);
        assert_eq!(a.affected_enrolments, 10);
        assert_eq!(a.update_rate_percent, 25.0);
        assert_eq!(a.id, 1);
    }

    #[test]
    fn test_moderate_bio_rate_is_warning() {
        let anomalies = AnomalyDetector::new().detect(&[metrics("Testland", 12.0, 0.9, 0.5, 100)]);

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, Severity::Warning);
    }

    #[test]
    fn test_thresholds_are_strict() {
        // Exactly 5 raises nothing; exactly 20 stays a Warning
        let none = AnomalyDetector::new().detect(&[metrics("A", 5.0, 0.9, 0.5, 100)]);
        assert!(none.is_empty());

        let warning = AnomalyDetector::new().detect(&[metrics("A", 20.0, 0.9, 0.5, 100)]);
        assert_eq!(warning[0].severity, Severity::Warning);

        let eqi_edge = AnomalyDetector::new().detect(&[metrics("A", 0.0, 0.5, 0.5, 100)]);
        assert!(eqi_edge.is_empty());
    }

    #[test]
    fn test_low_friction_high_volume() {
        let anomalies = AnomalyDetector::new().detect(&[metrics("Bigland", 1.0, 0.9, 0.05, 100_000)]);

        assert_eq!(anomalies.len(), 1);
        let a = &anomalies[0];
        assert_eq!(a.kind, AnomalyKind::LowFrictionHighVolume);
        assert_eq!(a.severity, Severity::Warning);
        assert!((a.update_rate_percent - 5.0).abs() < 1e-9);
        assert_eq!(a.affected_enrolments, 5_000);

        // 50000 exactly is not "high volume"
        let edge = AnomalyDetector::new().detect(&[metrics("Bigland", 1.0, 0.9, 0.05, 50_000)]);
        assert!(edge.is_empty());
    }

    #[test]
    fn test_low_eqi() {
        let anomalies = AnomalyDetector::new().detect(&[metrics("Poorland", 0.0, 0.2, 0.5, 1_000)]);

        assert_eq!(anomalies.len(), 1);
        let a = &anomalies[0];
        assert_eq!(a.kind, AnomalyKind::LowEnrolmentQuality);
        assert_eq!(a.severity, Severity::Critical);
        assert!((a.update_rate_percent - 80.0).abs() < 1e-9);
        assert_eq!(a.affected_enrolments, 150);
    }

    #[test]
    fn test_state_can_raise_all_three() {
        let anomalies = AnomalyDetector::new().detect(&[metrics("Everyland", 8.0, 0.1, 0.01, 60_000)]);

        assert_eq!(anomalies.len(), 3);
        // Critical (EQI, id 3) moves ahead of the two Warnings
        assert_eq!(anomalies[0].id, 3);
        assert_eq!(anomalies[1].id, 1);
        assert_eq!(anomalies[2].id, 2);
    }

    #[test]
    fn test_month_label_comes_from_reference_period() {
        let mut m = metrics("Testland", 25.0, 0.9, 0.5, 100);
        m.period = Period { year: 2024, month: 11 };

        let first = AnomalyDetector::new().detect(&[m.clone()]);
        let second = AnomalyDetector::new().detect(&[m]);

        assert_eq!(first[0].month, "November");
        assert_eq!(first[0].year, 2024);
        assert_eq!(first, second);
    }

    #[test]
    fn test_truncates_in_generation_order_then_partitions() {
        // 10 states each raising Warning (bio rate) then Critical (eqi): 20 generated
        let states: Vec<StateMetrics> = (0..10)
            .map(|i| metrics(&format!("State{:02}", i), 10.0, 0.1, 0.5, 100))
            .collect();

        let anomalies = AnomalyDetector::new().detect(&states);

        assert_eq!(anomalies.len(), 15);
        // First 15 generated are ids 1..=15
        let mut ids: Vec<usize> = anomalies.iter().map(|a| a.id).collect();
        ids.sort();
        assert_eq!(ids, (1..=15).collect::<Vec<_>>());

        let first_warning = anomalies
            .iter()
            .position(|a| a.severity == Severity::Warning)
            .unwrap();
        assert!(anomalies[..first_warning].iter().all(|a| a.severity == Severity::Critical));
        assert!(anomalies[first_warning..].iter().all(|a| a.severity == Severity::Warning));

        // Relative order kept inside each group
        for pair in anomalies[..first_warning].windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
        for pair in anomalies[first_warning..].windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn test_custom_cap() {
        let thresholds = AnomalyThresholds {
            max_anomalies: 2,
            ..AnomalyThresholds::default()
        };
        let states: Vec<StateMetrics> = (0..5).map(|i| metrics(&format!("S{}", i), 30.0, 0.9, 0.5, 100)).collect();

        let anomalies = AnomalyDetector::with_thresholds(thresholds).detect(&states);

        assert_eq!(anomalies.len(), 2);
    }

    #[test]
    fn test_healthy_states_raise_nothing() {
        let anomalies = AnomalyDetector::new().detect(&[metrics("Fineland", 1.0, 0.95, 0.5, 1_000)]);
        assert!(anomalies.is_empty());
    }
}
