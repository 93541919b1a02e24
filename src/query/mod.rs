//! Result lookup queries
//!
//! A [`ResultQuery`] identifies one student's result. It is validated once at
//! construction and never mutated afterwards.

mod board;

pub use board::{Board, Exam};

use crate::QueryError;
use serde::Serialize;

/// Separator between fields of a cache key
const KEY_SEPARATOR: &str = "-";

/// Identifies a single result lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResultQuery {
    board: Board,
    exam: Exam,
    roll: String,
    registration: String,
    eiin: Option<String>,
}

impl ResultQuery {
    /// Builds a validated query
    ///
    /// Roll and registration must be non-empty strings of ASCII digits. An
    /// EIIN, when given, must also be digits; a blank EIIN is treated as absent.
    ///
    /// # Example
    ///
    /// ```
    /// use result_relay::query::{Board, Exam, ResultQuery};
    ///
    /// let query = ResultQuery::new(Board::Dhaka, Exam::Ssc, "123456", "1234567890", None).unwrap();
    /// assert_eq!(query.cache_key(), "dhaka-ssc-123456-1234567890-");
    /// ```
    pub fn new(
        board: Board,
        exam: Exam,
        roll: &str,
        registration: &str,
        eiin: Option<&str>,
    ) -> Result<Self, QueryError> {
        let roll = require_digits("Roll", roll)?;
        let registration = require_digits("Registration", registration)?;
        let eiin = match eiin.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Some(require_digits("EIIN", value)?),
            None => None,
        };

        Ok(Self {
            board,
            exam,
            roll,
            registration,
            eiin,
        })
    }

    pub fn board(&self) -> Board {
        self.board
    }

    pub fn exam(&self) -> Exam {
        self.exam
    }

    pub fn roll(&self) -> &str {
        &self.roll
    }

    pub fn registration(&self) -> &str {
        &self.registration
    }

    pub fn eiin(&self) -> Option<&str> {
        self.eiin.as_deref()
    }

    /// Key identifying this query in the result cache
    ///
    /// All fields joined with `-`; an absent EIIN contributes an empty segment.
    pub fn cache_key(&self) -> String {
        [
            self.board.as_str(),
            self.exam.as_str(),
            self.roll.as_str(),
            self.registration.as_str(),
            self.eiin.as_deref().unwrap_or(""),
        ]
        .join(KEY_SEPARATOR)
    }

    /// Form fields in the upstream's vocabulary
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("board", self.board.upstream_label().to_string()),
            ("exam", self.exam.upstream_label().to_string()),
            ("roll", self.roll.clone()),
            ("reg", self.registration.clone()),
            ("eiin", self.eiin.clone().unwrap_or_default()),
        ]
    }
}

fn require_digits(field: &'static str, value: &str) -> Result<String, QueryError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(QueryError::Missing { field });
    }
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(QueryError::NotDigits {
            field,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}
