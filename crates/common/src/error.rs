use thiserror::Error;

/// Malformed input detected before processing begins. Always fatal for the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("{table}.{field} is required but missing (row {row_id})")]
    MissingField {
        table: &'static str,
        field: &'static str,
        row_id: i64,
    },
    #[error("invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
    #[error("{table} row {row_id}: timestamp {value} is out of range")]
    InvalidTimestamp {
        table: &'static str,
        row_id: i64,
        value: i64,
    },
}

/// Unwrap a nullable column that the schema requires.
pub fn required<T>(
    value: Option<T>,
    table: &'static str,
    field: &'static str,
    row_id: i64,
) -> Result<T, InputError> {
    value.ok_or(InputError::MissingField {
        table,
        field,
        row_id,
    })
}

/// Like [`required`], but also rejects empty or whitespace-only text.
pub fn required_text(
    value: Option<String>,
    table: &'static str,
    field: &'static str,
    row_id: i64,
) -> Result<String, InputError> {
    required(value.filter(|s| !s.trim().is_empty()), table, field, row_id)
}
