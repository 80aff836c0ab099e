use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed status enumeration; records never hold anything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Excused => "Excused",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            "Late" => Ok(AttendanceStatus::Late),
            "Excused" => Ok(AttendanceStatus::Excused),
            other => Err(format!(
                "invalid status '{other}'; must be one of: Present, Absent, Late, Excused"
            )),
        }
    }
}

/// One day's attendance for one student. At most one record exists per
/// `(student_id, date)`; the store enforces it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: u64,
    pub student_id: i64,
    pub date: NaiveDate,
    pub time_in: NaiveDateTime,
    pub time_out: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    /// Recognition confidence at marking time; 1.0 for manual entries.
    pub confidence: f64,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("attendance already recorded for student {student_id} on {date}")]
    Duplicate { student_id: i64, date: NaiveDate },
    #[error("attendance record {0} not found")]
    NotFound(u64),
    #[error("time out already marked for record {0}")]
    TimeOutAlreadySet(u64),
}

/// The attendance persistence collaborator.
///
/// The pipeline only needs these four operations; everything else about the
/// backing store (reports, exports, schema) is someone else's concern.
pub trait AttendanceStore: Send {
    fn find_record(&self, student_id: i64, date: NaiveDate) -> Option<AttendanceRecord>;

    fn create_record(
        &mut self,
        student_id: i64,
        date: NaiveDate,
        time_in: NaiveDateTime,
        status: AttendanceStatus,
        confidence: f64,
    ) -> Result<AttendanceRecord, StoreError>;

    fn update_status(&mut self, record_id: u64, status: AttendanceStatus)
        -> Result<(), StoreError>;

    fn mark_time_out(&mut self, record_id: u64, time: NaiveDateTime) -> Result<(), StoreError>;
}
