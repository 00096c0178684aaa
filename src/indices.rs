// 📐 Index Calculator
//
// EQI      = 1 - bio_updates / total_enrolments          (1 when nothing enrolled)
// Friction = (bio_updates / max(1, total_enrolments)) / 1000
// CER      = child_enrolments / total_enrolments         (0 when nothing enrolled)
// Health   = 100 * (w_eqi * EQI + w_friction * (1 - Friction) + w_child * CER)
//
// Every function is total: bounded outputs are clamped, zero denominators have
// a defined value, nothing here can fail.

use crate::config::HealthWeights;

/// Fixed normalization constant for the friction index.
pub const FRICTION_NORMALIZER: f64 = 1000.0;

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Enrolment Quality Index
pub fn eqi(bio_updates: u64, total_enrolments: u64) -> f64 {
    if total_enrolments == 0 {
        return 1.0;
    }
    clamp_unit(1.0 - bio_updates as f64 / total_enrolments as f64)
}

/// Friction index from biometric updates per enrolment.
pub fn friction_index(bio_updates_per_enrolment: f64) -> f64 {
    clamp_unit(bio_updates_per_enrolment / FRICTION_NORMALIZER)
}

/// Child Enrolment Ratio
pub fn child_enrolment_ratio(child_enrolments: u64, total_enrolments: u64) -> f64 {
    if total_enrolments == 0 {
        return 0.0;
    }
    (child_enrolments as f64 / total_enrolments as f64).min(1.0)
}

/// Composite health score with the default weights.
pub fn health_score(eqi: f64, friction_index: f64, cer: f64) -> f64 {
    weighted_health_score(eqi, friction_index, cer, &HealthWeights::default())
}

pub fn weighted_health_score(eqi: f64, friction_index: f64, cer: f64, weights: &HealthWeights) -> f64 {
    let score = 100.0
        * (weights.eqi * eqi + weights.friction * (1.0 - friction_index) + weights.child_enrolment * cer);

    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}
