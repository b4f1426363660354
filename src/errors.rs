//! Typed errors for the action handlers.
//!
//! Every failed submission ends as an `ActionError`: a kind from the error
//! taxonomy, the form field it belongs to (if any), and the message shown to
//! the user. It serializes so it can be returned as-is in API responses.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Bad input; no model call was made.
    Validation,
    /// The model call failed or returned something unreadable.
    External,
    /// The call succeeded but produced nothing usable.
    EmptyResult,
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct ActionError {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub message: String,
}

impl ActionError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::External,
            field: None,
            message: message.into(),
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::EmptyResult,
            field: None,
            message: message.into(),
        }
    }
}
