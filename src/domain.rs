use serde::{Deserialize, Serialize};
use std::fmt;

/// A single vital-sign reading as coerced from the raw source.
///
/// Every field is nullable at this boundary: a field that is absent or
/// type-mismatched in the source arrives as `None` rather than failing the
/// read. A patient may contribute any number of readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSignRecord {
    pub patient_id: Option<String>,
    pub heart_rate: Option<i64>,
    pub blood_pressure: Option<i64>,
    pub temperature: Option<f64>,
    /// Source timestamp, carried through unparsed
    pub timestamp: Option<String>,
}

/// A reading stamped with its plausibility flag.
///
/// The flag is total: every input record maps to exactly one flag value, and
/// the valid/invalid subsets partition the input. Rejected records keep the
/// flag when they land in the audit sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedRecord {
    #[serde(flatten)]
    pub record: VitalSignRecord,
    pub is_valid: bool,
}

/// Heuristic risk label derived from a patient's aggregate, never from raw
/// rows directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "Low Risk")]
    Low,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::High => "High Risk",
            RiskCategory::Moderate => "Moderate Risk",
            RiskCategory::Low => "Low Risk",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-patient summary computed from that patient's valid readings only.
///
/// Averages are rounded to 2 decimal places. Sample standard deviation over
/// fewer than 2 readings is undefined and stays `None`; that is a defined
/// edge case, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientAggregate {
    pub patient_id: Option<String>,
    pub avg_heart_rate: Option<f64>,
    pub avg_blood_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub stddev_heart_rate: Option<f64>,
    pub stddev_blood_pressure: Option<f64>,
    pub stddev_temperature: Option<f64>,
    pub risk_category: RiskCategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_category_serializes_as_display_string() {
        let json = serde_json::to_string(&RiskCategory::Moderate).unwrap();
        assert_eq!(json, "\"Moderate Risk\"");
        assert_eq!(RiskCategory::Moderate.to_string(), "Moderate Risk");
    }

    #[test]
    fn flagged_record_flattens_reading_fields() {
        let flagged = FlaggedRecord {
            record: VitalSignRecord {
                patient_id: Some("P1".to_string()),
                heart_rate: Some(72),
                blood_pressure: Some(80),
                temperature: Some(36.5),
                timestamp: Some("2024-01-01T00:00:00Z".to_string()),
            },
            is_valid: true,
        };

        let value: serde_json::Value = serde_json::to_value(&flagged).unwrap();
        assert_eq!(value["patient_id"], "P1");
        assert_eq!(value["heart_rate"], 72);
        assert_eq!(value["is_valid"], true);
    }
}
