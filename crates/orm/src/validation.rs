//! Validation error types and record validation helpers
//!
//! A validation pass produces a fresh [`ValidationErrors`] accumulator. Every
//! rule appends to it instead of failing fast, so a rejected record (or a
//! rejected batch) reports all of its messages at once.

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::attributes::AttributeBag;
use crate::backends::DatabaseValue;

/// Individual validation error for a specific field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: "validation_failed".to_string(),
        }
    }

    /// Create a validation error with a specific code
    pub fn with_code(field: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Ordered collection of validation errors gathered during one validation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single validation error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add a simple validation error with field and message
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.add(ValidationError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Messages in the order they were recorded
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    /// Check if a specific field has errors (case-insensitive)
    pub fn has_field_errors(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field.eq_ignore_ascii_case(field))
    }

    /// Merge another ValidationErrors into this one, keeping order
    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// Record an error unless the field is present and non-blank
    pub fn validates_presence_of(&mut self, record: &AttributeBag, field: &str, message: &str) {
        let present = match record.get(field) {
            None | Some(DatabaseValue::Null) => false,
            Some(DatabaseValue::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            self.add(ValidationError::with_code(field, message, "required"));
        }
    }

    /// Record an error unless the field holds a number or a numeric string
    pub fn validates_numericality_of(&mut self, record: &AttributeBag, field: &str, message: &str) {
        let numeric = match record.get(field) {
            Some(DatabaseValue::Int32(_))
            | Some(DatabaseValue::Int64(_))
            | Some(DatabaseValue::Float32(_))
            | Some(DatabaseValue::Float64(_)) => true,
            Some(DatabaseValue::String(s)) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        };
        if !numeric {
            self.add(ValidationError::with_code(field, message, "numeric"));
        }
    }

    /// Record an error unless the field reads as a money amount ("$1,250.00", "12.5")
    pub fn validates_currency_of(&mut self, record: &AttributeBag, field: &str, message: &str) {
        let currency = match record.get(field) {
            Some(DatabaseValue::Int32(_))
            | Some(DatabaseValue::Int64(_))
            | Some(DatabaseValue::Float32(_))
            | Some(DatabaseValue::Float64(_)) => true,
            Some(DatabaseValue::String(s)) => parse_currency(s).is_some(),
            _ => false,
        };
        if !currency {
            self.add(ValidationError::with_code(field, message, "currency"));
        }
    }
}

fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "No validation errors")
        } else {
            write!(f, "Validation failed with {} error(s):", self.errors.len())?;
            for error in &self.errors {
                write!(f, "\n  {}", error)?;
            }
            Ok(())
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self { errors: vec![error] }
    }
}
