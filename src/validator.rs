use crate::constants::{BLOOD_PRESSURE_BOUNDS, HEART_RATE_BOUNDS, TEMPERATURE_BOUNDS};
use crate::domain::{FlaggedRecord, VitalSignRecord};

/// The two disjoint halves of a validated batch. Their union is exactly the
/// input batch: no record is duplicated or dropped.
#[derive(Debug, Default)]
pub struct ValidationSplit {
    pub valid: Vec<FlaggedRecord>,
    pub invalid: Vec<FlaggedRecord>,
}

fn within_i64(value: Option<i64>, bounds: (i64, i64)) -> bool {
    matches!(value, Some(v) if bounds.0 < v && v < bounds.1)
}

fn within_f64(value: Option<f64>, bounds: (f64, f64)) -> bool {
    matches!(value, Some(v) if bounds.0 < v && v < bounds.1)
}

/// A reading is plausible iff all three vitals fall strictly inside their
/// bounds. A missing vital collapses the comparison to false, so any record
/// with a null vital is implausible.
pub fn is_plausible(record: &VitalSignRecord) -> bool {
    within_i64(record.heart_rate, HEART_RATE_BOUNDS)
        && within_i64(record.blood_pressure, BLOOD_PRESSURE_BOUNDS)
        && within_f64(record.temperature, TEMPERATURE_BOUNDS)
}

/// Classify every record independently and split the batch. Total over any
/// well-typed input; ordering within each half follows the input order.
pub fn split(records: Vec<VitalSignRecord>) -> ValidationSplit {
    let mut result = ValidationSplit::default();
    for record in records {
        let is_valid = is_plausible(&record);
        let flagged = FlaggedRecord { record, is_valid };
        if is_valid {
            result.valid.push(flagged);
        } else {
            result.invalid.push(flagged);
        }
    }
    result
}
