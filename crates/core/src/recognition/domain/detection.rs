use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::shared::region::FaceRegion;

/// One face found during one detection cycle.
///
/// `student_id` is `None` when no enrolled face scored above the display
/// threshold. Detections are replaced wholesale every cycle; they carry no
/// identity between cycles.
#[derive(Clone, Debug)]
pub struct Detection {
    pub student_id: Option<i64>,
    pub display_name: String,
    pub confidence: f64,
    pub region: FaceRegion,
    pub timestamp: DateTime<Local>,
}

impl Detection {
    pub fn is_match(&self) -> bool {
        self.student_id.is_some()
    }

    pub fn to_record(&self) -> DetectionRecord {
        DetectionRecord {
            student_id: self.student_id,
            name: self.display_name.clone(),
            confidence: (self.confidence * 100.0).round() / 100.0,
            location: self.region.as_array(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Wire shape of a detection for the query boundary: confidence rounded to
/// two decimals, integer box, ISO-8601 timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub student_id: Option<i64>,
    pub name: String,
    pub confidence: f64,
    pub location: [i32; 4],
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn detection(student_id: Option<i64>, confidence: f64) -> Detection {
        Detection {
            student_id,
            display_name: "Dana Cruz".into(),
            confidence,
            region: FaceRegion::new(12, 34, 56, 78),
            timestamp: Local.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_is_match() {
        assert!(detection(Some(7), 0.8).is_match());
        assert!(!detection(None, 0.0).is_match());
    }

    #[test]
    fn test_record_rounds_confidence_to_two_decimals() {
        let record = detection(Some(7), 0.87654).to_record();
        assert_relative_eq!(record.confidence, 0.88);
    }

    #[test]
    fn test_record_carries_integer_location_and_iso_timestamp() {
        let record = detection(Some(7), 0.5).to_record();
        assert_eq!(record.location, [12, 34, 56, 78]);
        assert!(record.timestamp.starts_with("2024-03-05T09:30:00"));
    }

    #[test]
    fn test_record_serializes_unknown_as_null_id() {
        let json = serde_json::to_value(detection(None, 0.0).to_record()).unwrap();
        assert!(json["student_id"].is_null());
    }
}
