//! Canonical examination result records
//!
//! Every string field of a [`ResultRecord`] is always present. Fields the
//! upstream did not supply carry the [`NOT_AVAILABLE`] sentinel so consumers
//! see a stable shape.

use serde::{Deserialize, Serialize};

/// Sentinel for a field the upstream did not supply
pub const NOT_AVAILABLE: &str = "N/A";

/// Status assumed when the upstream omits an overall result
pub const DEFAULT_STATUS: &str = "PASSED";

/// Roll number that short-circuits to the demo record
pub const DEMO_ROLL: &str = "123456";

/// Registration number that short-circuits to the demo record
pub const DEMO_REGISTRATION: &str = "1234567890";

/// One row of the subject table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub marks: String,
    pub grade: String,
    pub gpa: String,
}

impl Subject {
    pub fn new(name: &str, marks: &str, grade: &str, gpa: &str) -> Self {
        Self {
            name: name.to_string(),
            marks: marks.to_string(),
            grade: grade.to_string(),
            gpa: gpa.to_string(),
        }
    }
}

/// A parsed examination result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub student_name: String,
    pub father_name: String,
    pub mother_name: String,
    pub roll: String,
    pub registration: String,
    pub institution: String,
    pub group: String,
    pub session: String,
    /// Kept as the upstream formatted it, e.g. "4.83"
    pub gpa: String,
    pub grade: String,
    /// Overall pass/fail status
    pub result: String,
    /// Never empty; see [`placeholder_subjects`]
    pub subjects: Vec<Subject>,
}

impl Default for ResultRecord {
    fn default() -> Self {
        Self {
            student_name: NOT_AVAILABLE.to_string(),
            father_name: NOT_AVAILABLE.to_string(),
            mother_name: NOT_AVAILABLE.to_string(),
            roll: NOT_AVAILABLE.to_string(),
            registration: NOT_AVAILABLE.to_string(),
            institution: NOT_AVAILABLE.to_string(),
            group: NOT_AVAILABLE.to_string(),
            session: NOT_AVAILABLE.to_string(),
            gpa: NOT_AVAILABLE.to_string(),
            grade: NOT_AVAILABLE.to_string(),
            result: DEFAULT_STATUS.to_string(),
            subjects: placeholder_subjects(),
        }
    }
}

/// Subjects shown when the subject table could not be read
///
/// Keeps the record renderable; the values are not real marks.
pub fn placeholder_subjects() -> Vec<Subject> {
    ["Bangla", "English", "Mathematics"]
        .into_iter()
        .map(|name| Subject::new(name, NOT_AVAILABLE, NOT_AVAILABLE, NOT_AVAILABLE))
        .collect()
}

/// Whether a roll/registration pair is the fixed demo identity
pub fn is_demo_identity(roll: &str, registration: &str) -> bool {
    roll == DEMO_ROLL && registration == DEMO_REGISTRATION
}

/// Canned record served for the demo identity
pub fn demo_record(roll: &str, registration: &str) -> ResultRecord {
    ResultRecord {
        student_name: "MD. DEMO STUDENT".to_string(),
        father_name: "MD. DEMO FATHER".to_string(),
        mother_name: "MST. DEMO MOTHER".to_string(),
        roll: roll.to_string(),
        registration: registration.to_string(),
        institution: "DEMO HIGH SCHOOL".to_string(),
        group: "Science".to_string(),
        session: "2024".to_string(),
        gpa: "4.83".to_string(),
        grade: "A+".to_string(),
        result: DEFAULT_STATUS.to_string(),
        subjects: vec![
            Subject::new("Bangla", "82", "A+", "5.00"),
            Subject::new("English", "78", "A", "4.00"),
            Subject::new("Mathematics", "85", "A+", "5.00"),
            Subject::new("Physics", "80", "A+", "5.00"),
            Subject::new("Chemistry", "79", "A", "4.00"),
            Subject::new("Biology", "83", "A+", "5.00"),
            Subject::new("ICT", "88", "A+", "5.00"),
        ],
    }
}
