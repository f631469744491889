//! Parsing of raw form and spreadsheet cells.
//!
//! Web forms and imported rows hand us strings. They are turned into numbers
//! here, before any pricing rule runs, so that a malformed cell rejects the
//! whole submission with a message naming the offending field.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericError {
    #[error("{field} must be a number (got {value:?})")]
    InvalidNumber { field: String, value: String },

    #[error("{field} must be a non-negative whole number (got {value:?})")]
    InvalidCount { field: String, value: String },
}

/// Parses a decimal cell. Plain and scientific notation are accepted.
pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, NumericError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| NumericError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// Blank or absent cells yield `None`.
pub fn parse_optional_decimal(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, NumericError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_decimal(field, value).map(Some),
    }
}

/// Blank or absent cells yield zero.
pub fn parse_decimal_or_zero(field: &str, raw: Option<&str>) -> Result<Decimal, NumericError> {
    Ok(parse_optional_decimal(field, raw)?.unwrap_or(Decimal::ZERO))
}

/// Parses a banknote count. Spreadsheet exports often write integers as
/// `12.0`, which is accepted; fractional or negative counts are not.
pub fn parse_count(field: &str, raw: &str) -> Result<u32, NumericError> {
    let trimmed = raw.trim();
    let invalid = || NumericError::InvalidCount {
        field: field.to_string(),
        value: raw.to_string(),
    };

    if trimmed.is_empty() {
        return Ok(0);
    }
    if let Ok(count) = trimmed.parse::<u32>() {
        return Ok(count);
    }

    let value = Decimal::from_str(trimmed).map_err(|_| invalid())?;
    if value.is_sign_negative() || !value.fract().is_zero() {
        return Err(invalid());
    }
    value.to_u32().ok_or_else(invalid)
}

/// A cell as it arrives from a form or a spreadsheet row.
///
/// JSON strings and numbers are both kept as text so that they go through the
/// same parsing; `null` and a missing key are blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawCell(Option<String>);

impl RawCell {
    pub fn new(value: impl Into<String>) -> Self {
        RawCell(Some(value.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().map_or(true, |v| v.trim().is_empty())
    }

    /// Trimmed text, `None` when blank.
    pub fn text(&self) -> Option<String> {
        self.as_str()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn optional_decimal(&self, field: &str) -> Result<Option<Decimal>, NumericError> {
        parse_optional_decimal(field, self.as_str())
    }

    pub fn decimal_or_zero(&self, field: &str) -> Result<Decimal, NumericError> {
        parse_decimal_or_zero(field, self.as_str())
    }

    pub fn count(&self, field: &str) -> Result<u32, NumericError> {
        parse_count(field, self.as_str().unwrap_or_default())
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::new(value)
    }
}

impl<'de> Deserialize<'de> for RawCell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(RawCell(None)),
            serde_json::Value::String(text) => Ok(RawCell(Some(text))),
            serde_json::Value::Number(number) => Ok(RawCell(Some(number.to_string()))),
            other => Err(de::Error::custom(format!(
                "expected a string or a number, got {other}"
            ))),
        }
    }
}
