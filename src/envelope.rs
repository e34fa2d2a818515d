//! Uniform `{success, message, data?}` result wrapper for front ends.

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    /// Failure class, set only when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            kind: None,
            data: Some(data),
        }
    }

    pub fn err(error: &Error) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            kind: Some(error.kind().to_string()),
            data: None,
        }
    }

    /// Wrap a result, describing the success value with `describe`.
    pub fn from_result(result: Result<T, Error>, describe: impl FnOnce(&T) -> String) -> Self {
        match result {
            Ok(data) => {
                let message = describe(&data);
                Self::ok(message, data)
            }
            Err(e) => Self::err(&e),
        }
    }
}

impl Envelope<()> {
    /// Success with nothing to carry.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            kind: None,
            data: None,
        }
    }
}
