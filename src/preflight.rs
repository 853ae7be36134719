use crate::allowed_headers::AllowedHeaders;
use crate::allowed_methods::AllowedMethods;
use crate::constants::{header, method};
use crate::origin::SecurityOrigin;
use crate::policy::non_simple_header_names;
use crate::request::Request;
use std::time::Duration;

/// What a successful preflight response granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightGrant {
    pub methods: AllowedMethods,
    pub headers: AllowedHeaders,
    pub max_age: Duration,
}

impl PreflightGrant {
    /// Whether this grant covers `request` without another preflight.
    pub fn covers(&self, request: &Request, credentials: bool) -> bool {
        if !self.methods.allows_method(request.method(), credentials) {
            return false;
        }

        let names = non_simple_header_names(request.headers());
        self.headers
            .first_disallowed(names.iter().map(String::as_str), credentials)
            .is_none()
    }
}

/// Builds the `OPTIONS` request sent ahead of `request`.
///
/// Preflights never carry credentials or the caller's headers; the
/// non-simple header names travel, sorted and lowercased, in
/// `Access-Control-Request-Headers`.
pub fn build_preflight_request(request: &Request, origin: &SecurityOrigin) -> Request {
    let mut preflight = Request::new(request.url().clone())
        .with_method(method::OPTIONS)
        .with_context(request.context())
        .with_credentials(false)
        .with_header(header::ORIGIN, origin.serialize())
        .with_header(header::ACCESS_CONTROL_REQUEST_METHOD, request.method());

    let names = non_simple_header_names(request.headers());
    if !names.is_empty() {
        preflight = preflight.with_header(header::ACCESS_CONTROL_REQUEST_HEADERS, names.join(","));
    }

    preflight
}

#[cfg(test)]
#[path = "preflight_test.rs"]
mod preflight_test;
