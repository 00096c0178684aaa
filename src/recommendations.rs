// 🎯 Recommendation Generator - remediation actions as data
//
// One recommendation per state at most, from the first matching band:
//   health < critical_below            -> Critical, cycled over CRITICAL_ACTIONS
//   critical_below <= health < high_below -> High, cycled over HIGH_ACTIONS
//   otherwise                          -> nothing
// The cycle position is the number of same-priority recommendations already
// produced in this run, so two runs over the same metrics agree exactly.

use crate::config::RecommendationThresholds;
use crate::metrics::StateMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    /// Part of the taxonomy but no band produces it yet
    Medium,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ACTION CATALOG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionTemplate {
    pub category: &'static str,
    pub action: &'static str,
    pub impact: &'static str,
    /// Investment in lakhs of rupees
    pub cost_lakhs: f64,
    pub timeline: &'static str,
}

pub const CRITICAL_ACTIONS: [ActionTemplate; 3] = [
    ActionTemplate {
        category: "Enrolment Quality",
        action: "Deploy mobile biometric camps",
        impact: "15% improvement in enrolment quality",
        cost_lakhs: 45.0,
        timeline: "0-3 months",
    },
    ActionTemplate {
        category: "Training",
        action: "Run operator training programmes",
        impact: "20% fewer biometric update requests",
        cost_lakhs: 28.0,
        timeline: "0-3 months",
    },
    ActionTemplate {
        category: "Infrastructure",
        action: "Upgrade biometric capture devices",
        impact: "35% reduction in friction",
        cost_lakhs: 78.0,
        timeline: "3-6 months",
    },
];

pub const HIGH_ACTIONS: [ActionTemplate; 2] = [
    ActionTemplate {
        category: "Process",
        action: "Streamline update workflows",
        impact: "25% faster update processing",
        cost_lakhs: 35.0,
        timeline: "3-6 months",
    },
    ActionTemplate {
        category: "Data Quality",
        action: "Introduce enhanced validation at enrolment",
        impact: "12% improvement in data quality",
        cost_lakhs: 42.0,
        timeline: "3-6 months",
    },
];

// ============================================================================
// RECOMMENDATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: usize,
    pub state: String,
    pub priority: Priority,
    pub category: String,
    pub action: String,
    pub impact: String,
    pub cost_lakhs: f64,
    pub timeline: String,
    /// Health score at the time of generation
    pub health_score: f64,
}

impl Recommendation {
    fn from_template(id: usize, m: &StateMetrics, priority: Priority, template: &ActionTemplate) -> Self {
        Recommendation {
            id,
            state: m.state.clone(),
            priority,
            category: template.category.to_string(),
            action: template.action.to_string(),
            impact: template.impact.to_string(),
            cost_lakhs: template.cost_lakhs,
            timeline: template.timeline.to_string(),
            health_score: m.health_score,
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct RecommendationEngine {
    thresholds: RecommendationThresholds,
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self::with_thresholds(RecommendationThresholds::default())
    }

    pub fn with_thresholds(thresholds: RecommendationThresholds) -> Self {
        RecommendationEngine { thresholds }
    }

    /// Band for a health score, if it needs a recommendation at all.
    pub fn classify(&self, health_score: f64) -> Option<Priority> {
        if health_score < self.thresholds.critical_below {
            Some(Priority::Critical)
        } else if health_score < self.thresholds.high_below {
            Some(Priority::High)
        } else {
            None
        }
    }

    pub fn generate(&self, metrics: &[StateMetrics]) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();
        let mut critical_issued = 0;
        let mut high_issued = 0;

        for m in metrics {
            let (priority, template) = match self.classify(m.health_score) {
                Some(Priority::Critical) => {
                    let t = CRITICAL_ACTIONS[critical_issued % CRITICAL_ACTIONS.len()];
                    critical_issued += 1;
                    (Priority::Critical, t)
                }
                Some(Priority::High) => {
                    let t = HIGH_ACTIONS[high_issued % HIGH_ACTIONS.len()];
                    high_issued += 1;
                    (Priority::High, t)
                }
                Some(Priority::Medium) | None => continue,
            };

            recommendations.push(Recommendation::from_template(
                recommendations.len() + 1,
                m,
                priority,
                &template,
            ));
        }

        recommendations.sort_by_key(|r| r.priority.rank());

        tracing::info!(
            count = recommendations.len(),
            critical = critical_issued,
            high = high_issued,
            "Generated recommendations"
        );

        recommendations
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
