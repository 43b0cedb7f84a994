//! Boundary checks applied before any storage call is issued.

use uuid::Uuid;

/// Canonical hyphenated UUID text is exactly 36 characters: 8-4-4-4-12 hex digits.
const CANONICAL_UUID_LEN: usize = 36;

/// Rejected input, carrying the offending field and the raw value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} must be a canonical UUID (got '{value}')")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
}

impl ValidationError {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Parse an identifier in the canonical `8-4-4-4-12` form, case-insensitive.
///
/// Braced, URN and unhyphenated spellings are rejected even though `Uuid` itself
/// would accept them.
pub fn parse_canonical_uuid(field: &'static str, raw: &str) -> Result<Uuid, ValidationError> {
    if raw.len() != CANONICAL_UUID_LEN {
        return Err(ValidationError::new(field, raw));
    }

    Uuid::try_parse(raw).map_err(|_| ValidationError::new(field, raw))
}
