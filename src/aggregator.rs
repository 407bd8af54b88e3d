//! Per-patient aggregation over the valid readings: mean and sample standard
//! deviation of each vital, an inner join of the two groupings, and the risk
//! classification applied to the joined row.
//!
//! All functions here are pure and insensitive to row order within a patient
//! group; output ordering is by patient key so identical inputs always yield
//! identical output bytes downstream.

use crate::domain::{FlaggedRecord, PatientAggregate, RiskCategory};
use std::collections::BTreeMap;

/// Patients are keyed by their coerced id; readings whose id was missing
/// group together under the null key.
pub type PatientKey = Option<String>;

/// Mean of each vital within one patient group, rounded to 2 decimal places.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalMeans {
    pub avg_heart_rate: Option<f64>,
    pub avg_blood_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
}

/// Sample standard deviation of each vital within one patient group.
/// `None` when the group holds fewer than 2 readings of that vital.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalStddevs {
    pub stddev_heart_rate: Option<f64>,
    pub stddev_blood_pressure: Option<f64>,
    pub stddev_temperature: Option<f64>,
}

#[derive(Debug, Default)]
struct VitalSeries {
    heart_rate: Vec<f64>,
    blood_pressure: Vec<f64>,
    temperature: Vec<f64>,
}

fn series_by_patient(records: &[FlaggedRecord]) -> BTreeMap<PatientKey, VitalSeries> {
    let mut groups: BTreeMap<PatientKey, VitalSeries> = BTreeMap::new();
    for flagged in records {
        let series = groups
            .entry(flagged.record.patient_id.clone())
            .or_default();
        if let Some(hr) = flagged.record.heart_rate {
            series.heart_rate.push(hr as f64);
        }
        if let Some(bp) = flagged.record.blood_pressure {
            series.blood_pressure.push(bp as f64);
        }
        if let Some(temp) = flagged.record.temperature {
            series.temperature.push(temp);
        }
    }
    groups
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); undefined below 2 samples.
fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Group the valid readings by patient and compute rounded vital means.
pub fn means_by_patient(records: &[FlaggedRecord]) -> BTreeMap<PatientKey, VitalMeans> {
    series_by_patient(records)
        .into_iter()
        .map(|(key, series)| {
            let means = VitalMeans {
                avg_heart_rate: mean(&series.heart_rate).map(round2),
                avg_blood_pressure: mean(&series.blood_pressure).map(round2),
                avg_temperature: mean(&series.temperature).map(round2),
            };
            (key, means)
        })
        .collect()
}

/// Group the valid readings by patient and compute vital standard deviations.
pub fn stddevs_by_patient(records: &[FlaggedRecord]) -> BTreeMap<PatientKey, VitalStddevs> {
    series_by_patient(records)
        .into_iter()
        .map(|(key, series)| {
            let stddevs = VitalStddevs {
                stddev_heart_rate: sample_stddev(&series.heart_rate),
                stddev_blood_pressure: sample_stddev(&series.blood_pressure),
                stddev_temperature: sample_stddev(&series.temperature),
            };
            (key, stddevs)
        })
        .collect()
}

/// Comparison with a missing operand evaluates to false, never to missing.
fn exceeds(value: Option<f64>, threshold: f64) -> bool {
    matches!(value, Some(v) if v > threshold)
}

/// First-match-wins risk rules; the order of the first two rules matters.
/// A null stddev falls through to Low Risk.
pub fn classify(avg_heart_rate: Option<f64>, stddev_heart_rate: Option<f64>) -> RiskCategory {
    if exceeds(avg_heart_rate, 100.0) {
        RiskCategory::High
    } else if exceeds(stddev_heart_rate, 15.0) {
        RiskCategory::Moderate
    } else {
        RiskCategory::Low
    }
}

/// Full aggregation pass: both groupings, inner join on the patient key,
/// then classification. Both groupings derive from the same input, so the
/// key sets match and the join is lossless; a key somehow absent from either
/// side is dropped, per inner-join semantics.
pub fn aggregate(valid: &[FlaggedRecord]) -> Vec<PatientAggregate> {
    let means = means_by_patient(valid);
    let stddevs = stddevs_by_patient(valid);

    let mut aggregates = Vec::with_capacity(means.len());
    for (key, m) in means {
        let Some(s) = stddevs.get(&key) else {
            continue;
        };
        let risk_category = classify(m.avg_heart_rate, s.stddev_heart_rate);
        aggregates.push(PatientAggregate {
            patient_id: key,
            avg_heart_rate: m.avg_heart_rate,
            avg_blood_pressure: m.avg_blood_pressure,
            avg_temperature: m.avg_temperature,
            stddev_heart_rate: s.stddev_heart_rate,
            stddev_blood_pressure: s.stddev_blood_pressure,
            stddev_temperature: s.stddev_temperature,
            risk_category,
        });
    }
    aggregates
}
