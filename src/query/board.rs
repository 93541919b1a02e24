//! Education boards and examination types
//!
//! Both enums use lowercase identifiers locally and translate to the
//! upstream site's own human-readable vocabulary when a form is composed.

use crate::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A regional or category education authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    Dhaka,
    Chittagong,
    Rajshahi,
    Sylhet,
    Barisal,
    Dinajpur,
    Comilla,
    Jessore,
    Mymensingh,
    Madrasah,
    Technical,
}

impl Board {
    pub const ALL: [Board; 11] = [
        Board::Dhaka,
        Board::Chittagong,
        Board::Rajshahi,
        Board::Sylhet,
        Board::Barisal,
        Board::Dinajpur,
        Board::Comilla,
        Board::Jessore,
        Board::Mymensingh,
        Board::Madrasah,
        Board::Technical,
    ];

    /// Local identifier, also used in cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dhaka => "dhaka",
            Self::Chittagong => "chittagong",
            Self::Rajshahi => "rajshahi",
            Self::Sylhet => "sylhet",
            Self::Barisal => "barisal",
            Self::Dinajpur => "dinajpur",
            Self::Comilla => "comilla",
            Self::Jessore => "jessore",
            Self::Mymensingh => "mymensingh",
            Self::Madrasah => "madrasah",
            Self::Technical => "technical",
        }
    }

    /// The value the upstream form expects for this board
    pub fn upstream_label(&self) -> &'static str {
        match self {
            Self::Dhaka => "Dhaka",
            Self::Chittagong => "Chittagong",
            Self::Rajshahi => "Rajshahi",
            Self::Sylhet => "Sylhet",
            Self::Barisal => "Barisal",
            Self::Dinajpur => "Dinajpur",
            Self::Comilla => "Comilla",
            Self::Jessore => "Jessore",
            Self::Mymensingh => "Mymensingh",
            Self::Madrasah => "Madrasah",
            Self::Technical => "Technical",
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Board {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|board| board.as_str() == needle)
            .ok_or_else(|| QueryError::UnknownBoard(s.to_string()))
    }
}

/// Examination type or level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exam {
    /// Secondary (SSC/Dakhil/SSC Vocational)
    Ssc,
    /// Higher secondary (HSC/Alim/HSC Vocational)
    Hsc,
    /// Junior secondary (JSC/JDC)
    Jsc,
}

impl Exam {
    pub const ALL: [Exam; 3] = [Exam::Ssc, Exam::Hsc, Exam::Jsc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssc => "ssc",
            Self::Hsc => "hsc",
            Self::Jsc => "jsc",
        }
    }

    /// The value the upstream form expects for this examination
    pub fn upstream_label(&self) -> &'static str {
        match self {
            Self::Ssc => "SSC/Dakhil/Equivalent",
            Self::Hsc => "HSC/Alim/Equivalent",
            Self::Jsc => "JSC/JDC",
        }
    }
}

impl fmt::Display for Exam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exam {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|exam| exam.as_str() == needle)
            .ok_or_else(|| QueryError::UnknownExam(s.to_string()))
    }
}
