//! Error types for the Forge control plane

use thiserror::Error;

use crate::violation::Violation;

/// Forge error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForgeError {
    /// Unknown policy, team, resource or instance type
    #[error("not found: {0}")]
    NotFound(String),

    /// Request rejected, optionally with the full list of limit violations
    #[error("{message}")]
    InvalidRequest {
        /// Machine readable code
        code: String,
        /// Human readable message
        message: String,
        /// Structured violations (empty for malformed bodies)
        errors: Vec<Violation>,
    },

    /// A creation-time limit or billing precondition failed
    #[error("{message}")]
    ResourceLimitExceeded {
        /// `billing_required` or a limit specific code
        code: String,
        /// Human readable message
        message: String,
    },

    /// Trial or subscription has lapsed
    #[error("payment required: {0}")]
    PaymentRequired(String),

    /// Storage layer rejected a write
    #[error("{0}")]
    Persistence(String),
}

impl ForgeError {
    /// Shorthand for [`ForgeError::NotFound`]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Malformed request without structured violations
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            code: "invalid_request".into(),
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Creation blocked because the team has no usable subscription or trial
    pub fn billing_required(message: impl Into<String>) -> Self {
        Self::ResourceLimitExceeded {
            code: "billing_required".into(),
            message: message.into(),
        }
    }

    /// Creation blocked by a policy limit
    pub fn limit_reached(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResourceLimitExceeded {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Persistence failure built from underlying validation messages.
    ///
    /// Messages are joined with `,`; when there are none the raw error text
    /// is used instead.
    pub fn persistence<S: AsRef<str>>(messages: &[S], raw: impl Into<String>) -> Self {
        if messages.is_empty() {
            Self::Persistence(raw.into())
        } else {
            let joined = messages.iter().map(|m| m.as_ref()).collect::<Vec<_>>().join(",");
            Self::Persistence(joined)
        }
    }

    /// HTTP status code the error surfaces as
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidRequest { .. } => 400,
            Self::ResourceLimitExceeded { .. } => 400,
            Self::PaymentRequired(_) => 402,
            Self::Persistence(_) => 400,
        }
    }

    /// Machine readable error code
    pub fn code(&self) -> &str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidRequest { code, .. } => code,
            Self::ResourceLimitExceeded { code, .. } => code,
            Self::PaymentRequired(_) => "payment_required",
            Self::Persistence(_) => "unexpected_error",
        }
    }

    /// Structured violations carried by the error, if any
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::InvalidRequest { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Result type for the Forge control plane
pub type ForgeResult<T> = Result<T, ForgeError>;
