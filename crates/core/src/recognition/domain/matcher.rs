//! Correlation-based face matching.
//!
//! Scores a live encoding against every enrolled encoding with the Pearson
//! correlation coefficient and keeps the strict maximum above a threshold.
//! This is the placeholder matcher the rest of the pipeline is contracted
//! to: the selection and tie-break behavior matter, the recognition quality
//! does not.

use crate::recognition::domain::encoder::Encoding;
use crate::recognition::domain::enrolled_face::EnrolledFace;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// Result of matching one live encoding against the enrollment snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchOutcome {
    pub student_id: Option<i64>,
    pub display_name: String,
    pub confidence: f64,
}

impl MatchOutcome {
    fn unknown() -> Self {
        Self {
            student_id: None,
            display_name: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
        }
    }
}

/// Pearson correlation coefficient of two encodings' values.
///
/// `NaN` when the lengths differ (different encoding schemes) or either side
/// has zero variance; callers treat `NaN` as "not a candidate".
pub fn pearson(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return f64::NAN;
    }

    let n = a.len() as f64;
    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_a = 0.0;
    let mut variance_b = 0.0;
    for (&va, &vb) in a.iter().zip(b) {
        let da = va as f64 - mean_a;
        let db = vb as f64 - mean_b;
        covariance += da * db;
        variance_a += da * da;
        variance_b += db * db;
    }

    covariance / (variance_a.sqrt() * variance_b.sqrt())
}

/// Best enrolled candidate for a live encoding.
///
/// A candidate must score strictly above `min_confidence`; among candidates
/// the strictly highest score wins, so equal scores keep the earlier entry.
/// No candidate at all yields the unknown outcome with confidence 0.
pub fn best_match(
    live: &Encoding,
    enrolled: &[EnrolledFace],
    min_confidence: f64,
) -> MatchOutcome {
    let mut best: Option<(&EnrolledFace, f64)> = None;

    for candidate in enrolled {
        let score = pearson(live.values(), candidate.encoding.values());
        if score.is_nan() || score <= min_confidence {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    match best {
        Some((face, score)) => MatchOutcome {
            student_id: Some(face.student_id),
            display_name: face.display_name.clone(),
            confidence: score,
        },
        None => MatchOutcome::unknown(),
    }
}
