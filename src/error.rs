//! Closed error taxonomy for the translator, with stable `[mdb][E<n>]` codes.
//!
//! Codes are part of the contract: callers match on [`ErrorCode`] (or on the
//! substring embedded in the message) rather than on error variant names.

use thiserror::Error;

/// The five error kinds the translator can raise. Stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Unsupported statement shape at parse time (e.g. `MERGE`).
    E1,
    /// Unsupported feature at validation time (non-equi join, `FULL OUTER
    /// JOIN`, `UNION` without `ALL`, correlated subquery, unsupported
    /// window usage).
    E2,
    /// Semantic guard violation (`DELETE`/`UPDATE` without `WHERE`).
    E3,
    /// Parameter arity/key mismatch.
    E4,
    /// Execution error surfaced from the store.
    E5,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E1 => "E1",
            ErrorCode::E2 => "E2",
            ErrorCode::E3 => "E3",
            ErrorCode::E4 => "E4",
            ErrorCode::E5 => "E5",
        }
    }
}

#[derive(Error, Debug)]
#[error("[mdb][{}] {message}", code.as_str())]
pub struct MdbError {
    pub code: ErrorCode,
    pub message: String,
}

impl MdbError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unsupported_statement(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::E1, message)
    }

    pub fn unsupported_feature(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::E2, message)
    }

    pub fn guard_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::E3, message)
    }

    pub fn param_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::E4, message)
    }

    pub fn store_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::E5, message)
    }
}

impl From<mongodb::error::Error> for MdbError {
    fn from(err: mongodb::error::Error) -> Self {
        MdbError::store_error(err.to_string())
    }
}

pub type MdbResult<T> = std::result::Result<T, MdbError>;
