// Procedure error taxonomy
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Per-field validation messages, keyed by the field's wire name
pub type FieldErrors = BTreeMap<String, String>;

/// Machine-readable condition carried by every failed procedure call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // 400 - input failed schema decoding or validation
    BadInput,

    // 401 - protected procedure called without a session
    Unauthorized,

    // 404 - unknown procedure path or missing record
    NotFound,

    // 405 - query sent as POST or mutation sent as GET
    MethodNotSupported,

    // 500 - anything else
    Internal,
}

impl ErrorCode {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::BadInput => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::MethodNotSupported => 405,
            ErrorCode::Internal => 500,
        }
    }

    /// Get error code for client handling
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadInput => "BAD_INPUT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// A failed procedure call.
///
/// `message` is always safe to show to clients. `cause` holds server-side
/// detail and only leaves the process when error detail exposure is enabled.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {message}", code.as_str())]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
    pub cause: Option<String>,
    pub field_errors: Option<FieldErrors>,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            field_errors: None,
        }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadInput, message)
    }

    pub fn validation(field_errors: FieldErrors) -> Self {
        Self {
            field_errors: Some(field_errors),
            ..Self::bad_input("Input validation failed")
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn method_not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotSupported, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn with_cause(mut self, cause: impl ToString) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    /// Convert to the client error shape.
    ///
    /// ```json
    /// { "code": "NOT_FOUND", "message": "...", "data": { "httpStatus": 404, "path": "investor.getById" } }
    /// ```
    pub fn to_json(&self, path: Option<&str>, expose_detail: bool) -> Value {
        let mut data = json!({ "httpStatus": self.status_code() });

        if let Some(path) = path {
            data["path"] = json!(path);
        }
        if let Some(field_errors) = &self.field_errors {
            data["fieldErrors"] = json!(field_errors);
        }
        if expose_detail {
            if let Some(cause) = &self.cause {
                data["cause"] = json!(cause);
            }
        }

        json!({
            "code": self.code.as_str(),
            "message": self.message,
            "data": data,
        })
    }
}

impl From<crate::database::manager::DatabaseError> for RpcError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        // Don't expose internal SQL errors to clients
        RpcError::internal("An error occurred while processing your request").with_cause(err)
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::internal("Failed to format response").with_cause(err)
    }
}
