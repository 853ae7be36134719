use crate::options::ValidationError;
use crate::result::{
    AccessControlFailure, PolicyViolation, PreflightFailure, RedirectDenyReason,
    UntrustedRequestError,
};
use thiserror::Error;
use url::Url;

/// Transport-level failure categories reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    NameNotResolved,
    Connection,
    Tls,
    Protocol,
    Aborted,
    Other,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PolicyDenied,
    PreflightFailure,
    AccessControlCheckFailure,
    RedirectCheckFailure,
    Network(NetworkErrorKind),
    Cancelled,
    TimedOut,
}

/// The error handed to a client when a load ends without finishing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct LoadError {
    pub kind: ErrorKind,
    /// The URL being loaded; `None` when the load never started.
    pub url: Option<Url>,
    pub message: String,
}

impl LoadError {
    pub fn new(kind: ErrorKind, url: impl Into<Option<Url>>, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(url: impl Into<Option<Url>>) -> Self {
        Self::new(ErrorKind::Cancelled, url, "Load cancelled.")
    }

    pub fn timed_out(url: impl Into<Option<Url>>) -> Self {
        Self::new(ErrorKind::TimedOut, url, "Load timed out.")
    }

    pub fn network(url: impl Into<Option<Url>>, error: &NetworkError) -> Self {
        Self::new(ErrorKind::Network(error.kind), url, error.message.clone())
    }

    /// The loader on the other thread no longer exists.
    pub fn loader_gone(url: impl Into<Option<Url>>) -> Self {
        Self::new(
            ErrorKind::Network(NetworkErrorKind::Aborted),
            url,
            "The loader thread is gone.",
        )
    }

    pub(crate) fn policy(url: Option<Url>, violation: &PolicyViolation) -> Self {
        let kind = match violation {
            PolicyViolation::CrossOriginDenied => ErrorKind::PolicyDenied,
            PolicyViolation::UnsupportedScheme => ErrorKind::AccessControlCheckFailure,
        };
        Self::new(kind, url, violation.to_string())
    }

    pub(crate) fn untrusted(url: Option<Url>, reason: &UntrustedRequestError) -> Self {
        Self::new(ErrorKind::PolicyDenied, url, reason.to_string())
    }

    pub(crate) fn access_control(url: Option<Url>, failure: &AccessControlFailure) -> Self {
        Self::new(ErrorKind::AccessControlCheckFailure, url, failure.to_string())
    }

    pub(crate) fn preflight(url: Option<Url>, failure: &PreflightFailure) -> Self {
        Self::new(ErrorKind::PreflightFailure, url, failure.to_string())
    }

    pub(crate) fn redirect(url: Option<Url>, reason: &RedirectDenyReason) -> Self {
        Self::new(ErrorKind::RedirectCheckFailure, url, reason.to_string())
    }

    /// True for cancellations, whether caller-initiated or by timeout.
    pub fn is_cancellation(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled | ErrorKind::TimedOut)
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::TimedOut
    }

    pub fn is_access_control_failure(&self) -> bool {
        self.kind == ErrorKind::AccessControlCheckFailure
    }
}

/// Failures of the cross-thread plumbing itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("the loader thread is gone")]
    LoaderThreadGone,
    #[error("the bridge and the loader must live on different threads")]
    SameThread,
    #[error(transparent)]
    InvalidOptions(#[from] ValidationError),
}

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;
