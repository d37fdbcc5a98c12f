use thiserror::Error;

use super::history::Page;

/// Failure reported by the environment for a request the controller issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("http status {code}: {message}")]
    Status { code: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    NotFound,
    Unauthorized,
    Transient,
}

impl FetchError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    pub fn classify(&self) -> FailureClass {
        match self {
            Self::Status { code: 404, .. } => FailureClass::NotFound,
            Self::Status { code: 401, .. } => FailureClass::Unauthorized,
            _ => FailureClass::Transient,
        }
    }
}

/// A message sequence that a correctly driven environment can never produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("history page reported a next page (until build {}) but no job is known", .next.until)]
    PaginationWithoutJob { next: Page },
}
