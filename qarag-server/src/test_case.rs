//! Structured test case records and their recovery from model output

use qarag_context::extract_json_span;
use serde::{Deserialize, Serialize};

/// One generated test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    pub scenario: String,
    pub steps: Vec<String>,
    pub expected: String,
    /// Document the case was derived from
    pub based_on: String,
}

/// Why model output did not yield test cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestCaseParseError {
    /// Valid JSON, but not a non-empty array
    EmptyOrInvalid,
    /// Not JSON, or an array whose records break the schema
    Malformed(String),
}

/// Extracts and parses a non-empty array of test cases from raw model output.
pub fn parse_test_cases(raw: &str) -> Result<Vec<TestCase>, TestCaseParseError> {
    let span = extract_json_span(raw);
    let value: serde_json::Value =
        serde_json::from_str(span).map_err(|e| TestCaseParseError::Malformed(e.to_string()))?;

    match &value {
        serde_json::Value::Array(items) if !items.is_empty() => {}
        _ => return Err(TestCaseParseError::EmptyOrInvalid),
    }

    serde_json::from_value(value).map_err(|e| TestCaseParseError::Malformed(e.to_string()))
}
