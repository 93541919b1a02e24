//! JSON result normalizer
//!
//! Alternate and fallback endpoints answer with JSON whose field names vary
//! between deployments. Each canonical field lists the spellings it accepts.

use crate::fetcher::parser::UNRECOGNIZED_MESSAGE;
use crate::query::ResultQuery;
use crate::record::{placeholder_subjects, ResultRecord, Subject, DEFAULT_STATUS, NOT_AVAILABLE};
use crate::RelayError;
use serde_json::{Map, Value};

const NAME_KEYS: &[&str] = &["student_name", "studentName", "name"];
const FATHER_KEYS: &[&str] = &["father_name", "fatherName", "father"];
const MOTHER_KEYS: &[&str] = &["mother_name", "motherName", "mother"];
const ROLL_KEYS: &[&str] = &["roll", "roll_no", "rollNo"];
const REGISTRATION_KEYS: &[&str] = &["registration", "reg", "reg_no", "registrationNo"];
const INSTITUTION_KEYS: &[&str] = &["institution", "institute", "school", "institute_name"];
const GROUP_KEYS: &[&str] = &["group", "study_group"];
const SESSION_KEYS: &[&str] = &["session", "academic_session"];
const GPA_KEYS: &[&str] = &["gpa", "cgpa", "point"];
const GRADE_KEYS: &[&str] = &["grade", "letter_grade", "letterGrade"];
const STATUS_KEYS: &[&str] = &["result", "status"];
const SUBJECT_LIST_KEYS: &[&str] = &["subjects", "subject_results", "marks"];

const SUBJECT_NAME_KEYS: &[&str] = &["name", "subject", "subject_name"];
const SUBJECT_MARKS_KEYS: &[&str] = &["marks", "mark", "score"];
const SUBJECT_GRADE_KEYS: &[&str] = &["grade", "letter_grade"];
const SUBJECT_GPA_KEYS: &[&str] = &["gpa", "point", "grade_point"];

const DEFAULT_FAILURE_MESSAGE: &str = "Result not found";

/// Maps a JSON result payload onto a [`ResultRecord`]
///
/// The payload is expected to look like `{"success": true, "result": {...}}`;
/// `data` is accepted in place of `result`. A payload with `success: false`,
/// or without a result object, fails with the upstream's own `message`. A
/// result carrying none of name, roll or registration is unrecognizable.
pub fn parse_result_json(payload: &Value, query: &ResultQuery) -> Result<ResultRecord, RelayError> {
    let success = payload.get("success").and_then(Value::as_bool);
    let result = payload
        .get("result")
        .or_else(|| payload.get("data"))
        .and_then(Value::as_object);

    let result = match (success, result) {
        (Some(false), _) | (_, None) => {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_FAILURE_MESSAGE);
            return Err(RelayError::Upstream(message.to_string()));
        }
        (_, Some(result)) => result,
    };

    let student_name = lookup(result, NAME_KEYS);
    let roll = lookup(result, ROLL_KEYS);
    let registration = lookup(result, REGISTRATION_KEYS);
    if student_name.is_none() && roll.is_none() && registration.is_none() {
        return Err(RelayError::Parse(UNRECOGNIZED_MESSAGE.to_string()));
    }

    let field = |keys: &[&str]| lookup(result, keys).unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let subjects = SUBJECT_LIST_KEYS
        .iter()
        .find_map(|key| result.get(*key).and_then(Value::as_array))
        .map(|items| items.iter().filter_map(parse_subject).collect::<Vec<_>>())
        .filter(|subjects| !subjects.is_empty())
        .unwrap_or_else(placeholder_subjects);

    Ok(ResultRecord {
        student_name: student_name.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        father_name: field(FATHER_KEYS),
        mother_name: field(MOTHER_KEYS),
        roll: roll.unwrap_or_else(|| query.roll().to_string()),
        registration: registration.unwrap_or_else(|| query.registration().to_string()),
        institution: field(INSTITUTION_KEYS),
        group: field(GROUP_KEYS),
        session: field(SESSION_KEYS),
        gpa: field(GPA_KEYS),
        grade: field(GRADE_KEYS),
        result: lookup(result, STATUS_KEYS).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        subjects,
    })
}

fn parse_subject(item: &Value) -> Option<Subject> {
    let item = item.as_object()?;
    let name = lookup(item, SUBJECT_NAME_KEYS)?;
    let or_sentinel =
        |keys: &[&str]| lookup(item, keys).unwrap_or_else(|| NOT_AVAILABLE.to_string());

    Some(Subject {
        name,
        marks: or_sentinel(SUBJECT_MARKS_KEYS),
        grade: or_sentinel(SUBJECT_GRADE_KEYS),
        gpa: or_sentinel(SUBJECT_GPA_KEYS),
    })
}

/// First non-empty scalar under any of `keys`, rendered as text
fn lookup(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        // Number keeps the upstream formatting, e.g. 4.83
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
