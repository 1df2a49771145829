use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{AppError, FieldError};

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{1,18}[0-9]$").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Which write a body is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Turns a loosely typed body into checked values or one 400 listing every bad field.
pub trait Validate {
    type Output;

    fn validate(self, op: Operation) -> Result<Self::Output, AppError>;
}

/// Collects field errors so one response reports all of them.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Trimmed, non-empty text of at most `max` characters.
    pub fn text(&mut self, field: &'static str, value: Option<String>, max: usize) -> Option<String> {
        match value.map(|v| v.trim().to_string()) {
            None => {
                self.fail(field, "is required");
                None
            }
            Some(v) if v.is_empty() => {
                self.fail(field, "must not be empty");
                None
            }
            Some(v) if v.chars().count() > max => {
                self.fail(field, format!("must be at most {max} characters"));
                None
            }
            Some(v) => Some(v),
        }
    }

    /// Optional free text: blank becomes `None`.
    pub fn optional_text(
        &mut self,
        field: &'static str,
        value: Option<String>,
        max: usize,
    ) -> Option<String> {
        let v = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;
        if v.chars().count() > max {
            self.fail(field, format!("must be at most {max} characters"));
            return None;
        }
        Some(v)
    }

    pub fn phone(&mut self, field: &'static str, value: Option<String>) -> Option<String> {
        let v = self.text(field, value, 20)?;
        if !PHONE_RE.is_match(&v) {
            self.fail(field, "must be a phone number (digits, optional leading +)");
            return None;
        }
        Some(v)
    }

    pub fn email(&mut self, field: &'static str, value: Option<String>) -> Option<String> {
        let v = self.text(field, value, 254)?;
        if !EMAIL_RE.is_match(&v) {
            self.fail(field, "must be an email address");
            return None;
        }
        Some(v.to_lowercase())
    }

    pub fn positive_id(&mut self, field: &'static str, value: Option<i64>) -> Option<i64> {
        match value {
            None => {
                self.fail(field, "is required");
                None
            }
            Some(id) if id <= 0 => {
                self.fail(field, "must be a positive id");
                None
            }
            Some(id) => Some(id),
        }
    }

    /// RFC 3339 timestamp, normalised to UTC.
    pub fn timestamp(&mut self, field: &'static str, value: Option<String>) -> Option<DateTime<Utc>> {
        let v = self.text(field, value, 64)?;
        match DateTime::parse_from_rfc3339(&v) {
            Ok(t) => Some(t.with_timezone(&Utc)),
            Err(_) => {
                self.fail(field, "must be an RFC 3339 timestamp");
                None
            }
        }
    }

    /// Parses an optional enumerated value, falling back to `default` when absent or blank.
    pub fn choice<T>(&mut self, field: &'static str, value: Option<String>, default: T) -> Option<T>
    where
        T: std::str::FromStr<Err = String>,
    {
        match value.filter(|v| !v.trim().is_empty()) {
            None => Some(default),
            Some(v) => match v.parse() {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    self.fail(field, e);
                    None
                }
            },
        }
    }

    /// Ends validation: `Ok(build())` only when no field failed.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, AppError> {
        if !self.errors.is_empty() {
            return Err(AppError::Validation(self.errors));
        }
        build().ok_or_else(|| AppError::Internal("validated input incomplete".to_string()))
    }
}
