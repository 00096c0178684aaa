// Enrolment Health Analytics - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod records;         // Record Source: CSV loading
pub mod aggregator;      // Per-state / per-month accumulators
pub mod indices;         // EQI, friction, CER, health score
pub mod config;          // Weights and thresholds
pub mod metrics;         // Ranked state metrics and month series
pub mod anomaly;         // Rule-based anomaly detection
pub mod recommendations; // Rule-based remediation plan
pub mod snapshot;        // One computed view for all reports
pub mod report;          // CSV and text serialization

// Re-export commonly used types
pub use records::{load_csv, read_records, month_name, Period, RawRecord, MONTH_NAMES};
pub use aggregator::{aggregate_by_month, aggregate_by_state, MonthPoint, MonthTotals, StateAccumulator};
pub use indices::{
    child_enrolment_ratio, eqi, friction_index, health_score, weighted_health_score,
    FRICTION_NORMALIZER,
};
pub use config::{AnalyticsConfig, AnomalyThresholds, HealthWeights, RecommendationThresholds};
pub use metrics::{AggregateStats, MetricsRepository, StateMetrics};
pub use anomaly::{Anomaly, AnomalyDetector, AnomalyKind, Severity};
pub use recommendations::{ActionTemplate, Priority, Recommendation, RecommendationEngine};
pub use snapshot::AnalyticsSnapshot;
pub use report::{
    anomalies_csv, executive_summary, full_analysis, recommendations_csv, state_rankings_csv,
    ExportError, HealthBand, ReportKind,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
