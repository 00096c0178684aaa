// 📥 Record Source - monthly enrolment records
// Loads per-state, per-month enrolment rows from CSV into immutable RawRecords.
//
// The dataset writes every numeric column as a float ("2025.0", "289.0"),
// and older extracts leave cells empty. Both are accepted: empty or missing
// cells count as zero, as do negative and non-finite values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Canonical English month names, January first.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Name for a 1-based month number; anything outside 1..=12 becomes "Month N".
pub fn month_name(month: u32) -> String {
    match month {
        1..=12 => MONTH_NAMES[(month - 1) as usize].to_string(),
        other => format!("Month {}", other),
    }
}

/// Calendar position used for ordering. Unknown months sort before January.
pub fn month_order(month: u32) -> u32 {
    if (1..=12).contains(&month) {
        month
    } else {
        0
    }
}

// ============================================================================
// RAW RECORD
// ============================================================================

/// One state's enrolment activity for one month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub state: String,
    pub year: i32,
    /// Rounded month number, 1-12 for well-formed rows
    pub month: u32,
    pub enrol_0_5: u64,
    pub enrol_5_17: u64,
    pub enrol_18_plus: u64,
    pub demo_updates: u64,
    pub bio_updates: u64,
    pub total_enrolment: u64,
    /// Biometric update rate as published with the row (not recomputed)
    pub bio_update_rate: f64,
}

impl RawRecord {
    /// Enrolments in the 0-5 and 5-17 age bands.
    pub fn child_enrolments(&self) -> u64 {
        self.enrol_0_5.saturating_add(self.enrol_5_17)
    }

    /// Trimmed state name used as the aggregation key.
    pub fn state_key(&self) -> &str {
        self.state.trim()
    }

    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            month: self.month,
        }
    }
}

/// A (year, month) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn month_name(&self) -> String {
        month_name(self.month)
    }
}

// ============================================================================
// CSV ROW (wire shape of the dataset)
// ============================================================================

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "state", default)]
    state: String,

    #[serde(rename = "Year", default)]
    year: Option<f64>,

    #[serde(rename = "Month", default)]
    month: Option<f64>,

    #[serde(rename = "Enrol_0_5", default)]
    enrol_0_5: Option<f64>,

    #[serde(rename = "Enrol_5_17", default)]
    enrol_5_17: Option<f64>,

    #[serde(rename = "Enrol_18_plus", default)]
    enrol_18_plus: Option<f64>,

    #[serde(rename = "Demo_Updates", default)]
    demo_updates: Option<f64>,

    #[serde(rename = "Bio_Updates", default)]
    bio_updates: Option<f64>,

    #[serde(rename = "Total_Enrolment", default)]
    total_enrolment: Option<f64>,

    #[serde(rename = "Biometric_Update_Rate", default)]
    bio_update_rate: Option<f64>,
}

fn count(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

fn ratio(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

impl From<CsvRow> for RawRecord {
    fn from(row: CsvRow) -> Self {
        let year = row
            .year
            .filter(|y| y.is_finite())
            .map(|y| y.round() as i32)
            .unwrap_or(0);

        RawRecord {
            state: row.state,
            year,
            // Out-of-range months land in the unknown bucket rather than wrapping
            month: u32::try_from(count(row.month)).unwrap_or(0),
            enrol_0_5: count(row.enrol_0_5),
            enrol_5_17: count(row.enrol_5_17),
            enrol_18_plus: count(row.enrol_18_plus),
            demo_updates: count(row.demo_updates),
            bio_updates: count(row.bio_updates),
            total_enrolment: count(row.total_enrolment),
            bio_update_rate: ratio(row.bio_update_rate),
        }
    }
}

// ============================================================================
// LOADERS
// ============================================================================

/// Read records from any CSV source with a header row.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();

    for (index, result) in rdr.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let row = result.with_context(|| format!("Failed to deserialize record on line {}", index + 2))?;
        let record = RawRecord::from(row);

        if record.state_key().is_empty() {
            tracing::warn!(line = index + 2, "Record has an empty state name");
        }
        if !(1..=12).contains(&record.month) {
            tracing::warn!(line = index + 2, month = record.month, "Record month outside 1-12");
        }

        records.push(record);
    }

    tracing::debug!(count = records.len(), "Read enrolment records");
    Ok(records)
}

/// Load records from a CSV file on disk.
pub fn load_csv(csv_path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    read_records(file).with_context(|| format!("Failed to load records from {:?}", csv_path))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "state,Year,Month,Enrol_0_5,Enrol_5_17,Enrol_18_plus,Demo_Updates,Bio_Updates,Total_Enrolment,Biometric_Update_Rate";

    #[test]
    fn test_reads_float_encoded_columns() {
        let data = format!(
            "{}\nAndaman and Nicobar Islands,2025.0,9.0,39,4,0,64.0,289.0,43,6.72093023255814\n",
            HEADER
        );

        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.state, "Andaman and Nicobar Islands");
        assert_eq!(r.year, 2025);
        assert_eq!(r.month, 9);
        assert_eq!(r.child_enrolments(), 43);
        assert_eq!(r.bio_updates, 289);
        assert_eq!(r.demo_updates, 64);
        assert_eq!(r.total_enrolment, 43);
        assert!((r.bio_update_rate - 6.7209).abs() < 1e-3);
    }

    #[test]
    fn test_empty_cells_count_as_zero() {
        let data = format!("{}\nAssam,2025,3,,,,,,,\n", HEADER);

        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records[0].total_enrolment, 0);
        assert_eq!(records[0].bio_updates, 0);
        assert_eq!(records[0].bio_update_rate, 0.0);
    }

    #[test]
    fn test_missing_columns_default_to_zero() {
        let data = "state,Year,Month,Total_Enrolment\nBihar,2025,3,2352\n";

        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records[0].total_enrolment, 2352);
        assert_eq!(records[0].bio_updates, 0);
        assert_eq!(records[0].enrol_0_5, 0);
    }

    #[test]
    fn test_month_is_rounded() {
        let data = format!("{}\nDelhi,2025,2.6,1,1,1,0,0,3,0\n", HEADER);

        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records[0].month, 3);
        assert_eq!(records[0].period().month_name(), "March");
    }

    #[test]
    fn test_month_beyond_u32_is_unknown() {
        let data = format!("{}\nDelhi,2025,4294967299,1,1,1,0,0,3,0\n", HEADER);

        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records[0].month, 0);
        assert_eq!(records[0].period().month_name(), "Month 0");
    }

    #[test]
    fn test_child_enrolments_saturate() {
        let data = format!("{}\nBigland,2025,3,1e20,1e20,0,0,0,1e20,0\n", HEADER);

        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records[0].enrol_0_5, u64::MAX);
        assert_eq!(records[0].child_enrolments(), u64::MAX);
    }

    #[test]
    fn test_negative_values_are_zeroed() {
        let data = format!("{}\nGoa,2025,1,-5,2,0,0,-10,2,-1.5\n", HEADER);

        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records[0].enrol_0_5, 0);
        assert_eq!(records[0].bio_updates, 0);
        assert_eq!(records[0].bio_update_rate, 0.0);
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let data = format!("{}\nGoa,2025,1,abc,2,0,0,0,2,0\n", HEADER);

        let err = read_records(data.as_bytes()).unwrap_err();

        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "Bihar,2025.0,3.0,516,1392,444,409929.0,763509.0,2352,324.62").unwrap();
        writeln!(file, "Delhi,2025.0,3.0,181,102,85,133052.0,164368.0,368,446.65").unwrap();

        let records = load_csv(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].state, "Delhi");
    }

    #[test]
    fn test_load_csv_missing_file() {
        let result = load_csv(Path::new("/nonexistent/enrolments.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(13), "Month 13");
        assert_eq!(month_order(0), 0);
        assert_eq!(month_order(13), 0);
        assert_eq!(month_order(7), 7);
    }
}
