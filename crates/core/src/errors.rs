use thiserror::Error;

/// Parameter extraction failures.
///
/// Recovered locally by the router and reported to the user with the expected
/// directive syntax; never fatal.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("marker `{marker}` not found in message")]
    MissingMarker { marker: String },
    #[error("field `{field}` is empty")]
    EmptyField { field: String },
}

/// Dropdown validation failures: a value outside the catalog.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("`{value}` is not a valid {field}")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub allowed: Vec<String>,
}

impl ValidationError {
    pub fn new(field: &'static str, value: impl Into<String>, allowed: &[String]) -> Self {
        Self { field, value: value.into(), allowed: allowed.to_vec() }
    }
}
