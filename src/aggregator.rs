// ➕ Aggregator - per-state and per-month running totals
//
// Both reductions are plain folds into an ordered map, so sums never depend on
// the order records arrive in and the resulting map iterates alphabetically.

use crate::records::{month_name, Period, RawRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// STATE ACCUMULATOR
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StateAccumulator {
    pub state: String,
    pub total_enrolments: u64,
    pub total_bio_updates: u64,
    pub total_demo_updates: u64,
    pub total_child_enrolments: u64,
    /// Records in the order they were absorbed
    pub records: Vec<RawRecord>,
}

impl StateAccumulator {
    pub fn new(state: &str) -> Self {
        StateAccumulator {
            state: state.to_string(),
            total_enrolments: 0,
            total_bio_updates: 0,
            total_demo_updates: 0,
            total_child_enrolments: 0,
            records: Vec::new(),
        }
    }

    pub fn absorb(&mut self, record: &RawRecord) {
        // Counts saturate at u64::MAX instead of wrapping
        self.total_enrolments = self.total_enrolments.saturating_add(record.total_enrolment);
        self.total_bio_updates = self.total_bio_updates.saturating_add(record.bio_updates);
        self.total_demo_updates = self.total_demo_updates.saturating_add(record.demo_updates);
        self.total_child_enrolments = self.total_child_enrolments.saturating_add(record.child_enrolments());
        self.records.push(record.clone());
    }

    /// Earliest contributing record by (year, month). Records sharing that
    /// period are ordered by content (highest rate, then largest volume), so
    /// the choice does not depend on input order.
    pub fn reference_record(&self) -> Option<&RawRecord> {
        self.records.iter().min_by(|a, b| {
            a.period()
                .cmp(&b.period())
                .then_with(|| b.bio_update_rate.total_cmp(&a.bio_update_rate))
                .then_with(|| b.total_enrolment.cmp(&a.total_enrolment))
                .then_with(|| b.bio_updates.cmp(&a.bio_updates))
        })
    }

    pub fn reference_period(&self) -> Option<Period> {
        self.reference_record().map(|r| r.period())
    }

    /// Biometric updates per enrolment, guarding against empty states.
    pub fn bio_updates_per_enrolment(&self) -> f64 {
        self.total_bio_updates as f64 / self.total_enrolments.max(1) as f64
    }

    pub fn demo_updates_per_enrolment(&self) -> f64 {
        self.total_demo_updates as f64 / self.total_enrolments.max(1) as f64
    }
}

/// Reduce records into one accumulator per trimmed state name.
pub fn aggregate_by_state(records: &[RawRecord]) -> BTreeMap<String, StateAccumulator> {
    let accumulators = records.iter().fold(BTreeMap::new(), |mut map, record| {
        let key = record.state_key();
        map.entry(key.to_string())
            .or_insert_with(|| StateAccumulator::new(key))
            .absorb(record);
        map
    });

    tracing::debug!(
        records = records.len(),
        states = accumulators.len(),
        "Aggregated records by state"
    );

    accumulators
}

// ============================================================================
// MONTH ACCUMULATOR
// ============================================================================

/// Totals for one calendar month of one state, summed across years.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthTotals {
    pub total_enrolments: u64,
    pub bio_updates: u64,
    pub demo_updates: u64,
}

impl MonthTotals {
    fn absorb(&mut self, record: &RawRecord) {
        self.total_enrolments = self.total_enrolments.saturating_add(record.total_enrolment);
        self.bio_updates = self.bio_updates.saturating_add(record.bio_updates);
        self.demo_updates = self.demo_updates.saturating_add(record.demo_updates);
    }
}

/// One point of a state's month series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthPoint {
    pub month: String,
    pub total_enrolments: u64,
    pub bio_updates: u64,
    pub demo_updates: u64,
}

impl MonthPoint {
    pub fn new(month: u32, totals: &MonthTotals) -> Self {
        MonthPoint {
            month: month_name(month),
            total_enrolments: totals.total_enrolments,
            bio_updates: totals.bio_updates,
            demo_updates: totals.demo_updates,
        }
    }
}

/// Reduce the records of one state (exact match on the trimmed name) by month number.
pub fn aggregate_by_month(records: &[RawRecord], state: &str) -> BTreeMap<u32, MonthTotals> {
    let state = state.trim();
    records
        .iter()
        .filter(|r| r.state_key() == state)
        .fold(BTreeMap::new(), |mut map, record| {
            map.entry(record.month)
                .or_insert_with(MonthTotals::default)
                .absorb(record);
            map
        })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::read_records;

    fn record(state: &str, month: u32, total: u64, bio: u64, demo: u64, children: u64) -> RawRecord {
        RawRecord {
            state: state.to_string(),
            year: 2025,
            month,
            enrol_0_5: children,
            enrol_5_17: 0,
            enrol_18_plus: total.saturating_sub(children),
            demo_updates: demo,
            bio_updates: bio,
            total_enrolment: total,
            bio_update_rate: bio as f64 / total.max(1) as f64,
        }
    }

    fn sample() -> Vec<RawRecord> {
        vec![
            record("Testland", 1, 100, 50, 10, 30),
            record("Otherland", 2, 40, 4, 1, 10),
            record("Testland", 2, 200, 100, 20, 50),
            record("Otherland", 2, 60, 6, 2, 20),
            record(" Testland ", 3, 10, 1, 1, 5),
        ]
    }

    fn sums(map: &BTreeMap<String, StateAccumulator>) -> Vec<(String, u64, u64, u64, u64)> {
        map.values()
            .map(|a| {
                (
                    a.state.clone(),
                    a.total_enrolments,
                    a.total_bio_updates,
                    a.total_demo_updates,
                    a.total_child_enrolments,
                )
            })
            .collect()
    }

    #[test]
    fn test_worked_example_totals() {
        let records = vec![
            record("Testland", 1, 100, 50, 10, 30),
            record("Testland", 2, 200, 100, 20, 50),
        ];

        let map = aggregate_by_state(&records);
        let acc = &map["Testland"];

        assert_eq!(acc.total_enrolments, 300);
        assert_eq!(acc.total_bio_updates, 150);
        assert_eq!(acc.total_demo_updates, 30);
        assert_eq!(acc.total_child_enrolments, 80);
        assert_eq!(acc.records.len(), 2);
    }

    #[test]
    fn test_state_names_are_trimmed() {
        let map = aggregate_by_state(&sample());

        assert_eq!(map.len(), 2);
        assert_eq!(map["Testland"].records.len(), 3);
        assert_eq!(map["Testland"].total_enrolments, 310);
    }

    #[test]
    fn test_aggregation_is_permutation_invariant() {
        let forward = sample();
        let mut reversed = sample();
        reversed.reverse();
        let mut rotated = sample();
        rotated.rotate_left(2);

        let expected = sums(&aggregate_by_state(&forward));

        assert_eq!(sums(&aggregate_by_state(&reversed)), expected);
        assert_eq!(sums(&aggregate_by_state(&rotated)), expected);
    }

    #[test]
    fn test_reference_record_is_earliest_period() {
        let mut records = sample();
        records.reverse();

        let map = aggregate_by_state(&records);

        assert_eq!(
            map["Testland"].reference_period(),
            Some(Period { year: 2025, month: 1 })
        );
    }

    #[test]
    fn test_reference_record_ties_are_order_independent() {
        let calm = record("Tieland", 3, 100, 1, 0, 10);
        let busy = record("Tieland", 3, 100, 900, 0, 10);
        let later = record("Tieland", 4, 100, 5_000, 0, 10);

        let forward = aggregate_by_state(&[calm.clone(), busy.clone(), later.clone()]);
        let backward = aggregate_by_state(&[later, busy.clone(), calm]);

        assert_eq!(forward["Tieland"].reference_record(), Some(&busy));
        assert_eq!(backward["Tieland"].reference_record(), Some(&busy));
    }

    #[test]
    fn test_huge_counts_do_not_overflow() {
        let data = "state,Year,Month,Enrol_0_5,Enrol_5_17,Enrol_18_plus,Demo_Updates,Bio_Updates,Total_Enrolment,Biometric_Update_Rate\n\
                    Bigland,2025,3,1e20,1e20,0,1e20,1e20,1e20,0\n\
                    Bigland,2025,3,1e20,1e20,0,1e20,1e20,1e20,0\n";
        let records = read_records(data.as_bytes()).unwrap();

        let map = aggregate_by_state(&records);
        let acc = &map["Bigland"];
        assert_eq!(acc.total_enrolments, u64::MAX);
        assert_eq!(acc.total_bio_updates, u64::MAX);
        assert_eq!(acc.total_demo_updates, u64::MAX);
        assert_eq!(acc.total_child_enrolments, u64::MAX);

        let months = aggregate_by_month(&records, "Bigland");
        assert_eq!(months[&3].total_enrolments, u64::MAX);
        assert_eq!(months[&3].bio_updates, u64::MAX);
    }

    #[test]
    fn test_unknown_state_gets_its_own_accumulator() {
        let records = vec![record("Atlantis", 5, 0, 0, 0, 0)];

        let map = aggregate_by_state(&records);

        assert_eq!(map["Atlantis"].total_enrolments, 0);
        assert_eq!(map["Atlantis"].bio_updates_per_enrolment(), 0.0);
    }

    #[test]
    fn test_month_aggregation_merges_years() {
        let mut records = sample();
        let mut later = record("Otherland", 2, 100, 10, 5, 0);
        later.year = 2026;
        records.push(later);

        let months = aggregate_by_month(&records, "Otherland");

        assert_eq!(months.len(), 1);
        assert_eq!(months[&2].total_enrolments, 200);
        assert_eq!(months[&2].bio_updates, 20);
        assert_eq!(months[&2].demo_updates, 8);
    }

    #[test]
    fn test_month_aggregation_unknown_state_is_empty() {
        assert!(aggregate_by_month(&sample(), "Nowhere").is_empty());
    }
}
