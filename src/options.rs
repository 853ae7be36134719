use crate::constants::limits;
use std::time::Duration;
use thiserror::Error;

/// How a load may reach resources outside the fixed origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CrossOriginRequestPolicy {
    /// Cross-origin requests fail synchronously.
    Deny,
    /// Cross-origin requests are subject to CORS checks.
    #[default]
    UseAccessControl,
    /// Cross-origin requests are loaded without checks.
    Allow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PreflightPolicy {
    /// Preflight when the method or headers are not simple.
    #[default]
    Consider,
    /// Always preflight cross-origin CORS requests.
    Force,
    /// Never preflight.
    Prevent,
}

/// Per-load configuration, fixed once the loader is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub cross_origin_request_policy: CrossOriginRequestPolicy,
    pub preflight_policy: PreflightPolicy,
    pub allow_credentials: bool,
    /// Cross-origin redirects that may still be followed.
    pub cors_redirect_limit: u32,
    /// Inactivity timeout; re-armed by every backend event.
    pub timeout: Option<Duration>,
    /// Deliver cross-origin response headers unfiltered.
    pub expose_all_response_headers: bool,
    /// Check the method and header fields against the forbidden lists before loading.
    pub untrusted_http: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            cross_origin_request_policy: CrossOriginRequestPolicy::UseAccessControl,
            preflight_policy: PreflightPolicy::Consider,
            allow_credentials: false,
            cors_redirect_limit: limits::MAX_CORS_REDIRECTS,
            timeout: None,
            expose_all_response_headers: false,
            untrusted_http: false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("CORS redirect limit {limit} exceeds the maximum of {max}")]
    RedirectLimitTooLarge { limit: u32, max: u32 },
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

impl RequestOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cors_redirect_limit > limits::MAX_CORS_REDIRECTS {
            return Err(ValidationError::RedirectLimitTooLarge {
                limit: self.cors_redirect_limit,
                max: limits::MAX_CORS_REDIRECTS,
            });
        }

        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ValidationError::ZeroTimeout);
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "options_test.rs"]
mod options_test;
