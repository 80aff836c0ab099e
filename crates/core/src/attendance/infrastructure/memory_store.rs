use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::attendance::domain::store::{
    AttendanceRecord, AttendanceStatus, AttendanceStore, StoreError,
};

/// In-memory attendance store.
///
/// Enforces the `(student_id, date)` uniqueness constraint itself, so a
/// caller that loses a check-then-insert race still cannot produce a second
/// record for the same day.
#[derive(Default)]
pub struct MemoryAttendanceStore {
    records: BTreeMap<u64, AttendanceRecord>,
    by_student_and_date: HashMap<(i64, NaiveDate), u64>,
    next_id: u64,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order, for summaries.
    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.records.values().cloned().collect()
    }
}

impl AttendanceStore for MemoryAttendanceStore {
    fn find_record(&self, student_id: i64, date: NaiveDate) -> Option<AttendanceRecord> {
        self.by_student_and_date
            .get(&(student_id, date))
            .and_then(|id| self.records.get(id))
            .cloned()
    }

    fn create_record(
        &mut self,
        student_id: i64,
        date: NaiveDate,
        time_in: NaiveDateTime,
        status: AttendanceStatus,
        confidence: f64,
    ) -> Result<AttendanceRecord, StoreError> {
        if self.by_student_and_date.contains_key(&(student_id, date)) {
            return Err(StoreError::Duplicate { student_id, date });
        }

        self.next_id += 1;
        let record = AttendanceRecord {
            id: self.next_id,
            student_id,
            date,
            time_in,
            time_out: None,
            status,
            confidence,
        };
        self.by_student_and_date.insert((student_id, date), record.id);
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn update_status(
        &mut self,
        record_id: u64,
        status: AttendanceStatus,
    ) -> Result<(), StoreError> {
        let record = self
            .records
            .get_mut(&record_id)
            .ok_or(StoreError::NotFound(record_id))?;
        record.status = status;
        Ok(())
    }

    fn mark_time_out(&mut self, record_id: u64, time: NaiveDateTime) -> Result<(), StoreError> {
        let record = self
            .records
            .get_mut(&record_id)
            .ok_or(StoreError::NotFound(record_id))?;
        if record.time_out.is_some() {
            return Err(StoreError::TimeOutAlreadySet(record_id));
        }
        record.time_out = Some(time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_create_and_find() {
        let mut store = MemoryAttendanceStore::new();
        let record = store
            .create_record(7, day(5), at(5, 9), AttendanceStatus::Present, 0.82)
            .unwrap();
        assert_eq!(record.student_id, 7);
        assert_eq!(record.time_out, None);

        let found = store.find_record(7, day(5)).unwrap();
        assert_eq!(found, record);
        assert!(store.find_record(7, day(6)).is_none());
        assert!(store.find_record(8, day(5)).is_none());
    }

    #[test]
    fn test_duplicate_day_is_rejected() {
        let mut store = MemoryAttendanceStore::new();
        store
            .create_record(7, day(5), at(5, 9), AttendanceStatus::Present, 1.0)
            .unwrap();
        let second = store.create_record(7, day(5), at(5, 10), AttendanceStatus::Present, 1.0);
        assert!(matches!(second, Err(StoreError::Duplicate { .. })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_same_student_different_days() {
        let mut store = MemoryAttendanceStore::new();
        store
            .create_record(7, day(5), at(5, 9), AttendanceStatus::Present, 1.0)
            .unwrap();
        store
            .create_record(7, day(6), at(6, 9), AttendanceStatus::Late, 1.0)
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update_status() {
        let mut store = MemoryAttendanceStore::new();
        let record = store
            .create_record(7, day(5), at(5, 9), AttendanceStatus::Present, 1.0)
            .unwrap();
        store
            .update_status(record.id, AttendanceStatus::Excused)
            .unwrap();
        assert_eq!(
            store.find_record(7, day(5)).unwrap().status,
            AttendanceStatus::Excused
        );
    }

    #[test]
    fn test_update_status_unknown_record() {
        let mut store = MemoryAttendanceStore::new();
        let result = store.update_status(99, AttendanceStatus::Late);
        assert!(matches!(result, Err(StoreError::NotFound(99))));
    }

    #[test]
    fn test_mark_time_out_once() {
        let mut store = MemoryAttendanceStore::new();
        let record = store
            .create_record(7, day(5), at(5, 9), AttendanceStatus::Present, 1.0)
            .unwrap();

        store.mark_time_out(record.id, at(5, 17)).unwrap();
        assert_eq!(
            store.find_record(7, day(5)).unwrap().time_out,
            Some(at(5, 17))
        );

        let again = store.mark_time_out(record.id, at(5, 18));
        assert!(matches!(again, Err(StoreError::TimeOutAlreadySet(_))));
    }
}
