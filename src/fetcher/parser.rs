//! HTML result normalizer
//!
//! The upstream markup is neither versioned nor stable, so every field is
//! located by an ordered list of extraction rules. The first rule yielding
//! non-empty text wins and a typed default applies when none does.
//!
//! # Parse Order
//!
//! 1. Explicit error indicators (`.alert-danger`, `.error-message`, ...)
//! 2. Negative-result phrases anywhere in the document text
//! 3. Presence of the result-display region
//! 4. Scalar fields via [`FIELD_RULES`]
//! 5. The subject table
//! 6. Final check that name, roll and registration are not all missing

use crate::query::ResultQuery;
use crate::record::{placeholder_subjects, ResultRecord, Subject, NOT_AVAILABLE};
use crate::RelayError;
use scraper::{ElementRef, Html, Selector};

/// Regions the upstream uses to report its own errors
const ERROR_SELECTORS: &[&str] = &[
    ".alert-danger",
    ".error-message",
    ".alert-error",
    "#error-message",
];

/// Lowercase phrases meaning the upstream has no such result
const NO_RESULT_PHRASES: &[&str] = &[
    "no record found",
    "result not found",
    "invalid information",
    "record is not available",
];

/// Candidate containers of the rendered result
const RESULT_REGION_SELECTORS: &[&str] = &[
    "#result-display",
    ".result-display",
    "#result-container",
    ".result-container",
    ".result-table",
];

/// Header tokens that mark a table as the subject table
const SUBJECT_HEADER_TOKENS: &[&str] = &["subject", "code", "marks"];

pub(crate) const NO_RESULT_MESSAGE: &str =
    "No result found for the provided information. Please check your roll and registration numbers.";

pub(crate) const NOT_PUBLISHED_MESSAGE: &str =
    "Result not published yet or the information provided is incorrect.";

pub(crate) const UNRECOGNIZED_MESSAGE: &str = "Result not found or invalid response format";

/// One way of finding a field's text
#[derive(Debug, Clone, Copy)]
enum Extractor {
    /// Text of the first element matching a CSS selector
    Css(&'static str),
    /// Text of the cell following a label cell in a key/value table
    Label(&'static str),
}

/// Scalar fields of a [`ResultRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    StudentName,
    FatherName,
    MotherName,
    Roll,
    Registration,
    Institution,
    Group,
    Session,
    Gpa,
    Grade,
    Status,
}

impl Field {
    fn slot<'a>(&self, record: &'a mut ResultRecord) -> &'a mut String {
        match self {
            Self::StudentName => &mut record.student_name,
            Self::FatherName => &mut record.father_name,
            Self::MotherName => &mut record.mother_name,
            Self::Roll => &mut record.roll,
            Self::Registration => &mut record.registration,
            Self::Institution => &mut record.institution,
            Self::Group => &mut record.group,
            Self::Session => &mut record.session,
            Self::Gpa => &mut record.gpa,
            Self::Grade => &mut record.grade,
            Self::Status => &mut record.result,
        }
    }
}

use Extractor::{Css, Label};

/// Extraction rules per field, tried in order
const FIELD_RULES: &[(Field, &[Extractor])] = &[
    (
        Field::StudentName,
        &[
            Css("#student-name"),
            Css(".student-name"),
            Css("[data-label=\"name\"]"),
            Label("name"),
            Label("student's name"),
            Label("student name"),
        ],
    ),
    (
        Field::FatherName,
        &[
            Css("#father-name"),
            Css(".father-name"),
            Css("[data-label=\"father\"]"),
            Label("father's name"),
            Label("father name"),
        ],
    ),
    (
        Field::MotherName,
        &[
            Css("#mother-name"),
            Css(".mother-name"),
            Css("[data-label=\"mother\"]"),
            Label("mother's name"),
            Label("mother name"),
        ],
    ),
    (
        Field::Roll,
        &[
            Css("#roll"),
            Css(".roll"),
            Css("[data-label=\"roll\"]"),
            Label("roll no"),
            Label("roll"),
        ],
    ),
    (
        Field::Registration,
        &[
            Css("#registration"),
            Css(".registration"),
            Css("[data-label=\"reg\"]"),
            Label("registration no"),
            Label("reg no"),
            Label("registration"),
        ],
    ),
    (
        Field::Institution,
        &[
            Css("#institution"),
            Css(".institution"),
            Css("[data-label=\"institute\"]"),
            Label("institute"),
            Label("institution"),
        ],
    ),
    (
        Field::Group,
        &[Css("#group"), Css(".group"), Css("[data-label=\"group\"]"), Label("group")],
    ),
    (
        Field::Session,
        &[
            Css("#session"),
            Css(".session"),
            Css("[data-label=\"session\"]"),
            Label("session"),
        ],
    ),
    (
        Field::Gpa,
        &[Css("#gpa"), Css(".gpa"), Css("[data-label=\"gpa\"]"), Label("gpa")],
    ),
    (
        Field::Grade,
        &[
            Css("#grade"),
            Css(".grade"),
            Css("[data-label=\"grade\"]"),
            Label("letter grade"),
            Label("grade"),
        ],
    ),
    (
        Field::Status,
        &[
            Css("#result"),
            Css(".result"),
            Css("[data-label=\"result\"]"),
            Label("result"),
            Label("status"),
        ],
    ),
];

/// Parses an upstream HTML result page into a [`ResultRecord`]
///
/// # Returns
///
/// * `Ok(ResultRecord)` - Fields that could not be found hold `"N/A"`; a
///   missing roll or registration falls back to the query's value
/// * `Err(RelayError::Upstream)` - The page carried an explicit error message
/// * `Err(RelayError::Parse)` - The page declared no result, or nothing
///   recognizable was on it
///
/// # Example
///
/// ```
/// use result_relay::fetcher::parse_result_html;
/// use result_relay::query::{Board, Exam, ResultQuery};
///
/// let query = ResultQuery::new(Board::Dhaka, Exam::Ssc, "100200", "2000300040", None).unwrap();
/// let html = r#"<html><body><div id="result-display">
///     <span id="student-name">RAHIM UDDIN</span><span id="gpa">4.50</span>
/// </div></body></html>"#;
/// let record = parse_result_html(html, &query).unwrap();
/// assert_eq!(record.student_name, "RAHIM UDDIN");
/// assert_eq!(record.roll, "100200");
/// ```
pub fn parse_result_html(html: &str, query: &ResultQuery) -> Result<ResultRecord, RelayError> {
    let document = Html::parse_document(html);

    if let Some(message) = find_error_indicator(&document) {
        if contains_no_result_phrase(&message) {
            return Err(RelayError::Parse(NO_RESULT_MESSAGE.to_string()));
        }
        return Err(RelayError::Upstream(message));
    }

    let full_text = collapse(&document.root_element().text().collect::<String>());
    if contains_no_result_phrase(&full_text) {
        return Err(RelayError::Parse(NO_RESULT_MESSAGE.to_string()));
    }

    if !has_result_region(&document) {
        return Err(RelayError::Parse(NOT_PUBLISHED_MESSAGE.to_string()));
    }

    let info_rows = info_table_rows(&document);
    let mut record = ResultRecord::default();
    let mut found_identity = false;

    for (field, extractors) in FIELD_RULES {
        let value = extractors
            .iter()
            .find_map(|extractor| apply_extractor(&document, &info_rows, *extractor));

        if let Some(value) = value {
            if matches!(field, Field::StudentName | Field::Roll | Field::Registration) {
                found_identity = true;
            }
            *field.slot(&mut record) = value;
        }
    }

    if !found_identity {
        return Err(RelayError::Parse(UNRECOGNIZED_MESSAGE.to_string()));
    }

    if record.roll == NOT_AVAILABLE {
        record.roll = query.roll().to_string();
    }
    if record.registration == NOT_AVAILABLE {
        record.registration = query.registration().to_string();
    }

    record.subjects = extract_subjects(&document);

    Ok(record)
}

/// Whitespace-collapsed text of an element
fn element_text(element: ElementRef<'_>) -> String {
    collapse(&element.text().collect::<String>())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_no_result_phrase(text: &str) -> bool {
    let lower = text.to_lowercase();
    NO_RESULT_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Returns the first non-empty upstream error message
fn find_error_indicator(document: &Html) -> Option<String> {
    ERROR_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn has_result_region(document: &Html) -> bool {
    RESULT_REGION_SELECTORS.iter().any(|css| {
        Selector::parse(css)
            .map(|selector| {
                document
                    .select(&selector)
                    .any(|region| !element_text(region).is_empty())
            })
            .unwrap_or(false)
    })
}

fn apply_extractor(
    document: &Html,
    info_rows: &[Vec<String>],
    extractor: Extractor,
) -> Option<String> {
    match extractor {
        Css(css) => {
            let selector = Selector::parse(css).ok()?;
            document
                .select(&selector)
                .map(element_text)
                .find(|text| !text.is_empty())
        }
        Label(label) => info_rows.iter().find_map(|cells| labelled_value(cells, label)),
    }
}

/// Value cell following `label` in a key/value row
///
/// Rows may hold several pairs, e.g. `Roll No | 123 | Name | X`.
fn labelled_value(cells: &[String], label: &str) -> Option<String> {
    cells
        .windows(2)
        .find(|pair| normalize_label(&pair[0]) == label && !pair[1].is_empty())
        .map(|pair| pair[1].clone())
}

fn normalize_label(text: &str) -> String {
    text.trim()
        .trim_end_matches(':')
        .trim()
        .replace('\u{2019}', "'")
        .to_lowercase()
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Rows belonging to `table` itself, not to tables nested in its cells
fn own_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|row| row.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

/// Direct `td`/`th` children of a row, or only `td` when `data_only`
fn own_cells(row: ElementRef<'_>, data_only: bool) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| match cell.value().name() {
            "td" => true,
            "th" => !data_only,
            _ => false,
        })
        .collect()
}

fn contains_table(cell: ElementRef<'_>) -> bool {
    cell.descendants()
        .skip(1)
        .any(|node| node.value().as_element().is_some_and(|e| e.name() == "table"))
}

/// Cell texts of every row outside the subject table
fn info_table_rows(document: &Html) -> Vec<Vec<String>> {
    let Some(table_sel) = selector("table") else {
        return Vec::new();
    };

    document
        .select(&table_sel)
        .filter(|table| !is_subject_table(*table))
        .flat_map(own_rows)
        .map(|row| own_cells(row, false).into_iter().map(element_text).collect())
        .collect()
}

/// Whether the table's header row names subject columns
///
/// Layout cells wrapping a nested table are ignored, so an outer page table
/// is never taken for the subject table.
fn is_subject_table(table: ElementRef<'_>) -> bool {
    own_rows(table)
        .first()
        .map(|header| {
            own_cells(*header, false)
                .into_iter()
                .filter(|cell| !contains_table(*cell))
                .any(|cell| {
                    let text = element_text(cell).to_lowercase();
                    SUBJECT_HEADER_TOKENS.iter().any(|token| text.contains(token))
                })
        })
        .unwrap_or(false)
}

/// Subjects from the first subject table with usable rows
///
/// Columns are read in fixed order: name, marks, grade, GPA. Falls back to
/// [`placeholder_subjects`] when no table yields a row.
fn extract_subjects(document: &Html) -> Vec<Subject> {
    let Some(table_sel) = selector("table") else {
        return placeholder_subjects();
    };

    for table in document.select(&table_sel) {
        if !is_subject_table(table) {
            continue;
        }

        let subjects: Vec<Subject> = own_rows(table)
            .into_iter()
            .skip(1)
            .filter_map(|row| {
                let cells: Vec<String> =
                    own_cells(row, true).into_iter().map(element_text).collect();
                let filled = cells.iter().filter(|c| !c.is_empty()).count();
                if filled < 4 {
                    return None;
                }
                Some(Subject::new(
                    or_sentinel(&cells[0]),
                    or_sentinel(&cells[1]),
                    or_sentinel(&cells[2]),
                    or_sentinel(&cells[3]),
                ))
            })
            .collect();

        if !subjects.is_empty() {
            return subjects;
        }
    }

    tracing::debug!("No subject table found, using placeholder subjects");
    placeholder_subjects()
}

fn or_sentinel(text: &str) -> &str {
    if text.is_empty() {
        NOT_AVAILABLE
    } else {
        text
    }
}
