//! Attendance marking flows: single check-then-insert marks and the batch
//! auto-mark driven by live detections.

use chrono::NaiveDateTime;

use crate::attendance::domain::store::{
    AttendanceRecord, AttendanceStatus, AttendanceStore, StoreError,
};
use crate::recognition::domain::detection::Detection;
use crate::shared::constants::DEFAULT_AUTO_MARK_THRESHOLD;

/// Outcome of marking one student present.
///
/// A same-day repeat is an informational no-op, not an error; callers relay
/// the message and move on.
#[derive(Clone, Debug, PartialEq)]
pub enum MarkOutcome {
    Marked(AttendanceRecord),
    AlreadyMarked { student_id: i64 },
}

/// Marks a student present for the calendar day of `now`.
///
/// Check-then-insert; a concurrent marker that wins the race trips the
/// store's uniqueness constraint, which folds into the same already-marked
/// outcome the check produces.
pub fn mark_present(
    store: &mut dyn AttendanceStore,
    student_id: i64,
    now: NaiveDateTime,
    confidence: f64,
) -> Result<MarkOutcome, StoreError> {
    let date = now.date();
    if store.find_record(student_id, date).is_some() {
        return Ok(MarkOutcome::AlreadyMarked { student_id });
    }

    match store.create_record(student_id, date, now, AttendanceStatus::Present, confidence) {
        Ok(record) => {
            log::info!("attendance marked: student {student_id} at {}", record.time_in);
            Ok(MarkOutcome::Marked(record))
        }
        Err(StoreError::Duplicate { .. }) => Ok(MarkOutcome::AlreadyMarked { student_id }),
        Err(other) => Err(other),
    }
}

/// Batch auto-marking from a detection snapshot.
pub struct AutoMarker {
    threshold: f64,
}

impl AutoMarker {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// One pass over the detections: unmatched faces, scores at or below
    /// the threshold, and students already marked today are skipped; every
    /// remaining student gets a Present record stamped `now`.
    pub fn mark(
        &self,
        store: &mut dyn AttendanceStore,
        detections: &[Detection],
        now: NaiveDateTime,
    ) -> Vec<AttendanceRecord> {
        let mut marked = Vec::new();
        for detection in detections {
            let Some(student_id) = detection.student_id else {
                continue;
            };
            if detection.confidence <= self.threshold {
                continue;
            }
            match mark_present(store, student_id, now, detection.confidence) {
                Ok(MarkOutcome::Marked(record)) => marked.push(record),
                Ok(MarkOutcome::AlreadyMarked { .. }) => {}
                Err(e) => {
                    log::error!("auto-mark failed for student {student_id}: {e}");
                }
            }
        }
        if !marked.is_empty() {
            log::info!("auto-marked attendance for {} students", marked.len());
        }
        marked
    }
}

impl Default for AutoMarker {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_MARK_THRESHOLD)
    }
}
