use serde::{Deserialize, Serialize};

use crate::recognition::domain::encoder::Encoding;

/// One enrolled student with a usable reference encoding.
///
/// A detection session takes a `Vec<EnrolledFace>` snapshot at start and
/// never re-reads the roster mid-session; enrollment changes apply on the
/// next start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrolledFace {
    pub student_id: i64,
    pub display_name: String,
    pub encoding: Encoding,
}

impl EnrolledFace {
    pub fn new(student_id: i64, display_name: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            student_id,
            display_name: display_name.into(),
            encoding,
        }
    }
}
