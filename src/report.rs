// 📄 Report Serializer - CSV exports and plain-text reports
//
// Pure formatting over one AnalyticsSnapshot. Nothing here recomputes metrics,
// reads the clock or touches the filesystem: writing the output somewhere is
// the caller's job, and any failure comes back as an ExportError.

use crate::anomaly::{Anomaly, Severity};
use crate::indices::FRICTION_NORMALIZER;
use crate::metrics::StateMetrics;
use crate::recommendations::{Priority, Recommendation};
use crate::snapshot::AnalyticsSnapshot;
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

pub const STATE_RANKINGS_HEADER: [&str; 7] = [
    "Rank",
    "State",
    "Health Score",
    "Total Enrolments",
    "EQI",
    "Friction Index",
    "Children Ratio",
];

pub const ANOMALIES_HEADER: [&str; 5] = ["State", "Health Score", "Friction Index", "Issue Type", "Severity"];

pub const RECOMMENDATIONS_HEADER: [&str; 6] = [
    "State",
    "Health Score",
    "Priority",
    "Recommended Action",
    "Investment (Lakhs)",
    "Expected Impact",
];

/// States listed in the summary's top/bottom sections
const SUMMARY_PERFORMERS: usize = 5;

const RULE: &str = "================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV output: {0}")]
    Flush(String),

    #[error("report output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("failed to format report: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("unknown report: {0}")]
    UnknownReport(String),
}

// ============================================================================
// REPORT KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    StateRankings,
    Anomalies,
    Recommendations,
    ExecutiveSummary,
    FullAnalysis,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::StateRankings,
        ReportKind::Anomalies,
        ReportKind::Recommendations,
        ReportKind::ExecutiveSummary,
        ReportKind::FullAnalysis,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ReportKind::StateRankings => "State_Rankings.csv",
            ReportKind::Anomalies => "Anomalies_Report.csv",
            ReportKind::Recommendations => "Recommendations.csv",
            ReportKind::ExecutiveSummary => "Executive_Summary.txt",
            ReportKind::FullAnalysis => "Full_Analysis.txt",
        }
    }

    /// URL-friendly name
    pub fn slug(&self) -> &'static str {
        match self {
            ReportKind::StateRankings => "state-rankings",
            ReportKind::Anomalies => "anomalies",
            ReportKind::Recommendations => "recommendations",
            ReportKind::ExecutiveSummary => "executive-summary",
            ReportKind::FullAnalysis => "full-analysis",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportKind::StateRankings | ReportKind::Anomalies | ReportKind::Recommendations => {
                "text/csv; charset=utf-8"
            }
            ReportKind::ExecutiveSummary | ReportKind::FullAnalysis => "text/plain; charset=utf-8",
        }
    }

    pub fn render(&self, snapshot: &AnalyticsSnapshot) -> Result<String, ExportError> {
        match self {
            ReportKind::StateRankings => state_rankings_csv(&snapshot.metrics),
            ReportKind::Anomalies => anomalies_csv(&snapshot.anomalies),
            ReportKind::Recommendations => recommendations_csv(&snapshot.recommendations),
            ReportKind::ExecutiveSummary => executive_summary(snapshot),
            ReportKind::FullAnalysis => full_analysis(snapshot),
        }
    }
}

impl FromStr for ReportKind {
    type Err = ExportError;

    /// Accepts the slug or the file name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|k| k.slug() == s || k.file_name() == s)
            .ok_or_else(|| ExportError::UnknownReport(s.to_string()))
    }
}

// ============================================================================
// CSV EXPORTS
// ============================================================================

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

fn fixed(value: f64) -> String {
    format!("{:.2}", value)
}

/// `Rank,State,Health Score,Total Enrolments,EQI,Friction Index,Children Ratio`
pub fn state_rankings_csv(metrics: &[StateMetrics]) -> Result<String, ExportError> {
    let mut header = csv::Writer::from_writer(Vec::new());
    header.write_record(STATE_RANKINGS_HEADER)?;
    let buf = header.into_inner().map_err(|e| ExportError::Flush(e.to_string()))?;

    // Rows quote every non-numeric field, so the State column is always quoted
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(buf);

    for (index, m) in metrics.iter().enumerate() {
        wtr.write_record([
            (index + 1).to_string(),
            m.state.clone(),
            fixed(m.health_score),
            m.total_enrolments.to_string(),
            fixed(m.eqi),
            fixed(m.friction_index),
            fixed(m.child_enrolment_ratio),
        ])?;
    }

    finish(wtr)
}

/// `State,Health Score,Friction Index,Issue Type,Severity`
pub fn anomalies_csv(anomalies: &[Anomaly]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(ANOMALIES_HEADER)?;

    for a in anomalies {
        wtr.write_record([
            a.state.clone(),
            fixed(a.health_score),
            fixed(a.friction_index),
            a.kind.label().to_string(),
            a.severity.as_str().to_string(),
        ])?;
    }

    finish(wtr)
}

/// `State,Health Score,Priority,Recommended Action,Investment (Lakhs),Expected Impact`
pub fn recommendations_csv(recommendations: &[Recommendation]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(RECOMMENDATIONS_HEADER)?;

    for r in recommendations {
        wtr.write_record([
            r.state.clone(),
            fixed(r.health_score),
            r.priority.as_str().to_string(),
            r.action.clone(),
            fixed(r.cost_lakhs),
            r.impact.clone(),
        ])?;
    }

    finish(wtr)
}

// ============================================================================
// TEXT REPORTS
// ============================================================================

/// Health score bands used in the distribution section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBand {
    Excellent,
    Good,
    Average,
    Poor,
}

impl HealthBand {
    pub fn of(score: f64) -> Self {
        if score >= 80.0 {
            HealthBand::Excellent
        } else if score >= 60.0 {
            HealthBand::Good
        } else if score >= 40.0 {
            HealthBand::Average
        } else {
            HealthBand::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthBand::Excellent => "Excellent (80-100)",
            HealthBand::Good => "Good (60-79)",
            HealthBand::Average => "Average (40-59)",
            HealthBand::Poor => "Poor (<40)",
        }
    }
}

/// Count of states per band, in band order
pub fn health_distribution(metrics: &[StateMetrics]) -> [(HealthBand, usize); 4] {
    [HealthBand::Excellent, HealthBand::Good, HealthBand::Average, HealthBand::Poor]
        .map(|band| (band, metrics.iter().filter(|m| HealthBand::of(m.health_score) == band).count()))
}

/// Unweighted mean over states; 0 when there are none
fn national_average(metrics: &[StateMetrics], field: impl Fn(&StateMetrics) -> f64) -> f64 {
    if metrics.is_empty() {
        return 0.0;
    }
    metrics.iter().map(field).sum::<f64>() / metrics.len() as f64
}

fn write_header(out: &mut String, title: &str, snapshot: &AnalyticsSnapshot) -> Result<(), ExportError> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Generated: {}", snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out, "Snapshot:  {}", snapshot.fingerprint()?)?;
    Ok(())
}

fn write_section(out: &mut String, title: &str) -> Result<(), ExportError> {
    writeln!(out)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", THIN_RULE)?;
    Ok(())
}

fn write_footer(out: &mut String) -> Result<(), ExportError> {
    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "END OF REPORT")?;
    writeln!(out, "{}", RULE)?;
    Ok(())
}

pub fn executive_summary(snapshot: &AnalyticsSnapshot) -> Result<String, ExportError> {
    let mut out = String::new();
    let stats = &snapshot.stats;
    let metrics = &snapshot.metrics;

    write_header(&mut out, "AADHAAR ENROLMENT HEALTH - EXECUTIVE SUMMARY", snapshot)?;

    let critical_anomalies = snapshot
        .anomalies
        .iter()
        .filter(|a| a.severity == Severity::Critical)
        .count();
    let critical_recs = snapshot
        .recommendations
        .iter()
        .filter(|r| r.priority == Priority::Critical)
        .count();

    write_section(&mut out, "KEY METRICS")?;
    writeln!(out, "{:<28}{}", "States Analyzed:", stats.state_count)?;
    writeln!(out, "{:<28}{}", "Total Enrolments:", stats.total_enrolments)?;
    writeln!(out, "{:<28}{:.1}", "Average Health Score:", stats.average_health_score)?;
    writeln!(out, "{:<28}{}", "Critical States (<45):", stats.critical_state_count)?;
    writeln!(out, "{:<28}{}", "Anomaly Estimate:", stats.anomaly_count_estimate)?;
    writeln!(
        out,
        "{:<28}{} ({} critical, {} warning)",
        "Anomalies Flagged:",
        snapshot.anomalies.len(),
        critical_anomalies,
        snapshot.anomalies.len() - critical_anomalies
    )?;
    writeln!(
        out,
        "{:<28}{} ({} critical, {} high)",
        "Recommendations:",
        snapshot.recommendations.len(),
        critical_recs,
        snapshot.recommendations.len() - critical_recs
    )?;

    write_section(&mut out, "HEALTH DISTRIBUTION")?;
    for (band, count) in health_distribution(metrics) {
        writeln!(out, "{:<28}{}", format!("{}:", band.label()), count)?;
    }

    write_section(&mut out, "NATIONAL AVERAGES")?;
    writeln!(out, "{:<28}{:.2}", "Health Score:", national_average(metrics, |m| m.health_score))?;
    writeln!(out, "{:<28}{:.2}", "EQI:", national_average(metrics, |m| m.eqi))?;
    writeln!(out, "{:<28}{:.2}", "Friction Index:", national_average(metrics, |m| m.friction_index))?;
    writeln!(
        out,
        "{:<28}{:.2}",
        "Child Enrolment Ratio:",
        national_average(metrics, |m| m.child_enrolment_ratio)
    )?;

    write_section(&mut out, "TOP PERFORMERS")?;
    for (index, m) in snapshot.top_performers(SUMMARY_PERFORMERS).iter().enumerate() {
        writeln!(out, "{}. {} ({:.2})", index + 1, m.state, m.health_score)?;
    }

    write_section(&mut out, "BOTTOM PERFORMERS")?;
    for (index, m) in snapshot.bottom_performers(SUMMARY_PERFORMERS).iter().enumerate() {
        writeln!(out, "{}. {} ({:.2})", index + 1, m.state, m.health_score)?;
    }

    write_section(&mut out, "PRIORITY ACTIONS")?;
    if snapshot.recommendations.is_empty() {
        writeln!(out, "No remediation required.")?;
    }
    for r in &snapshot.recommendations {
        writeln!(
            out,
            "[{}] {}: {} (Rs {:.2} Lakhs, {})",
            r.priority, r.state, r.action, r.cost_lakhs, r.timeline
        )?;
    }

    write_footer(&mut out)?;
    Ok(out)
}

pub fn full_analysis(snapshot: &AnalyticsSnapshot) -> Result<String, ExportError> {
    let mut out = String::new();

    write_header(&mut out, "AADHAAR ENROLMENT HEALTH - FULL ANALYSIS", snapshot)?;

    write_section(&mut out, "1. STATE RANKINGS")?;
    writeln!(
        out,
        "{:>4}  {:<30}{:>8}{:>7}{:>10}{:>7}{:>12}",
        "Rank", "State", "Health", "EQI", "Friction", "CER", "Enrolments"
    )?;
    for (index, m) in snapshot.metrics.iter().enumerate() {
        writeln!(
            out,
            "{:>4}  {:<30}{:>8.2}{:>7.2}{:>10.2}{:>7.2}{:>12}",
            index + 1,
            m.state,
            m.health_score,
            m.eqi,
            m.friction_index,
            m.child_enrolment_ratio,
            m.total_enrolments
        )?;
    }

    write_section(&mut out, "2. ANOMALY REGISTER")?;
    if snapshot.anomalies.is_empty() {
        writeln!(out, "No anomalies detected.")?;
    }
    for a in &snapshot.anomalies {
        writeln!(
            out,
            "#{} [{}] {} - {} ({} {}): {:.2}%, ~{} enrolments affected",
            a.id, a.severity, a.state, a.kind, a.month, a.year, a.update_rate_percent, a.affected_enrolments
        )?;
    }

    write_section(&mut out, "3. RECOMMENDATIONS")?;
    if snapshot.recommendations.is_empty() {
        writeln!(out, "No remediation required.")?;
    }
    for r in &snapshot.recommendations {
        writeln!(out, "[{}] {} (health {:.2})", r.priority, r.state, r.health_score)?;
        writeln!(out, "    Action:    {} ({})", r.action, r.category)?;
        writeln!(out, "    Impact:    {}", r.impact)?;
        writeln!(out, "    Cost:      Rs {:.2} Lakhs", r.cost_lakhs)?;
        writeln!(out, "    Timeline:  {}", r.timeline)?;
    }

    let w = &snapshot.weights;
    write_section(&mut out, "4. METHODOLOGY")?;
    writeln!(out, "EQI            = 1 - (Bio Updates / Total Enrolments)")?;
    writeln!(
        out,
        "Friction Index = (Bio Updates / Total Enrolments) / {}",
        FRICTION_NORMALIZER
    )?;
    writeln!(out, "CER            = Child Enrolments / Total Enrolments")?;
    writeln!(
        out,
        "Health Score   = ({:.2} x EQI + {:.2} x (1 - Friction) + {:.2} x CER) x 100",
        w.eqi, w.friction, w.child_enrolment
    )?;

    write_footer(&mut out)?;
    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================
