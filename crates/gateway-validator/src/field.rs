//! Validation errors that point at a field of the object under review.
//!
//! The textual rendering follows the one of Kubernetes' `field.Error`, so the
//! messages returned to `kubectl` look like the ones produced by the API
//! server itself.

use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Dotted path to a field, e.g. `spec.listeners[0].hostname`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(root: &str) -> Self {
        FieldPath(root.to_owned())
    }

    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            return FieldPath::new(name);
        }
        FieldPath(format!("{}.{}", self.0, name))
    }

    pub fn index(&self, index: usize) -> Self {
        FieldPath(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldErrorType {
    Invalid,
    Required,
    Forbidden,
    Duplicate,
    NotSupported,
}

impl FieldErrorType {
    fn as_str(&self) -> &'static str {
        match self {
            FieldErrorType::Invalid => "Invalid value",
            FieldErrorType::Required => "Required value",
            FieldErrorType::Forbidden => "Forbidden",
            FieldErrorType::Duplicate => "Duplicate value",
            FieldErrorType::NotSupported => "Unsupported value",
        }
    }

    fn shows_value(&self) -> bool {
        !matches!(self, FieldErrorType::Required | FieldErrorType::Forbidden)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub error_type: FieldErrorType,
    pub path: FieldPath,
    pub value: Option<Value>,
    pub message: String,
}

pub type FieldErrors = Vec<FieldError>;

impl FieldError {
    pub fn invalid(path: FieldPath, value: impl Serialize, message: impl Into<String>) -> Self {
        FieldError {
            error_type: FieldErrorType::Invalid,
            path,
            value: Some(bad_value(value)),
            message: message.into(),
        }
    }

    pub fn required(path: FieldPath, message: impl Into<String>) -> Self {
        FieldError {
            error_type: FieldErrorType::Required,
            path,
            value: None,
            message: message.into(),
        }
    }

    pub fn forbidden(path: FieldPath, message: impl Into<String>) -> Self {
        FieldError {
            error_type: FieldErrorType::Forbidden,
            path,
            value: None,
            message: message.into(),
        }
    }

    pub fn duplicate(path: FieldPath, value: impl Serialize) -> Self {
        FieldError {
            error_type: FieldErrorType::Duplicate,
            path,
            value: Some(bad_value(value)),
            message: String::new(),
        }
    }

    pub fn not_supported(path: FieldPath, value: impl Serialize, supported: &[&str]) -> Self {
        let message = if supported.is_empty() {
            String::new()
        } else {
            format!(
                "supported values: {}",
                supported.iter().map(|v| format!("{v:?}")).join(", ")
            )
        };
        FieldError {
            error_type: FieldErrorType::NotSupported,
            path,
            value: Some(bad_value(value)),
            message,
        }
    }
}

fn bad_value(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.error_type.as_str())?;
        if self.error_type.shows_value() {
            let value = self.value.as_ref().unwrap_or(&Value::Null);
            write!(f, ": {value}")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Joins the rendered errors, one per line, in the order they were produced
pub fn aggregate(errors: &[FieldError]) -> String {
    errors.iter().map(ToString::to_string).join("\n")
}
