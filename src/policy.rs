//! Cross-origin policy decisions.
//!
//! Every function here is pure: the same inputs always produce the same
//! decision, and nothing is recorded between calls.

use crate::allowed_headers::AllowedHeaders;
use crate::allowed_methods::{AllowedMethods, is_simple_method};
use crate::constants::{header, limits, method};
use crate::headers::HeaderList;
use crate::options::{CrossOriginRequestPolicy, PreflightPolicy, RequestOptions};
use crate::origin::{SecurityOrigin, is_cors_enabled_scheme};
use crate::preflight::PreflightGrant;
use crate::request::Request;
use crate::response::ResponseHeaders;
use crate::result::{
    AccessControlFailure, InitialCheck, PolicyViolation, PreflightFailure, RedirectDenyReason,
    RedirectTarget, UntrustedRequestError,
};
use crate::util::{is_http_token, is_valid_header_value, normalize_lower};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

static FORBIDDEN_REQUEST_HEADERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "accept-charset",
        "accept-encoding",
        "access-control-request-headers",
        "access-control-request-method",
        "connection",
        "content-length",
        "cookie",
        "cookie2",
        "date",
        "dnt",
        "expect",
        "host",
        "keep-alive",
        "origin",
        "referer",
        "te",
        "trailer",
        "transfer-encoding",
        "upgrade",
        "user-agent",
        "via",
    ]
    .into_iter()
    .collect()
});

const FORBIDDEN_REQUEST_HEADER_PREFIXES: [&str; 2] = ["proxy-", "sec-"];

const FORBIDDEN_METHODS: [&str; 3] = [method::CONNECT, method::TRACE, method::TRACK];

const SIMPLE_CONTENT_TYPES: [&str; 3] = [
    "application/x-www-form-urlencoded",
    "multipart/form-data",
    "text/plain",
];

/// Evaluates a request against the fixed origin before anything is sent.
pub fn check_initial(
    origin: &SecurityOrigin,
    request: &Request,
    options: &RequestOptions,
) -> InitialCheck {
    if origin.is_same_origin(request.url()) {
        return InitialCheck::Allow { cors: false };
    }

    match options.cross_origin_request_policy {
        CrossOriginRequestPolicy::Deny => InitialCheck::Deny(PolicyViolation::CrossOriginDenied),
        CrossOriginRequestPolicy::Allow => InitialCheck::Allow { cors: false },
        CrossOriginRequestPolicy::UseAccessControl => {
            if !is_cors_enabled_scheme(request.url()) {
                InitialCheck::Deny(PolicyViolation::UnsupportedScheme)
            } else if requires_preflight(
                request.method(),
                request.headers(),
                options.preflight_policy,
            ) {
                InitialCheck::RequiresPreflight
            } else {
                InitialCheck::Allow { cors: true }
            }
        }
    }
}

/// `Force` and a non-simple method or header each suffice; `Prevent` wins over both.
pub fn requires_preflight(method: &str, headers: &HeaderList, policy: PreflightPolicy) -> bool {
    match policy {
        PreflightPolicy::Prevent => false,
        PreflightPolicy::Force => true,
        PreflightPolicy::Consider => !is_simple_method(method) || !non_simple_header_names(headers).is_empty(),
    }
}

/// Whether a request header may be sent cross-origin without a preflight.
pub fn is_simple_header(name: &str, value: &str) -> bool {
    let name = normalize_lower(name);
    match name.as_str() {
        "accept" | "accept-language" | "content-language" => true,
        "content-type" => {
            let essence = value.split(';').next().unwrap_or_default().trim();
            SIMPLE_CONTENT_TYPES
                .iter()
                .any(|simple| simple.eq_ignore_ascii_case(essence))
        }
        _ => false,
    }
}

/// Lowercased, sorted, deduplicated names of the headers that need a preflight.
pub fn non_simple_header_names(headers: &HeaderList) -> Vec<String> {
    let mut names: Vec<String> = headers
        .iter()
        .filter(|(name, value)| !is_simple_header(name, value))
        .map(|(name, _)| normalize_lower(name))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Checks `Access-Control-Allow-Origin` (and, with credentials,
/// `Access-Control-Allow-Credentials`) of a cross-origin response.
pub fn check_access_control(
    response: &ResponseHeaders,
    origin: &SecurityOrigin,
    allow_credentials: bool,
) -> Result<(), AccessControlFailure> {
    let origin = origin.serialize();

    if response.status() == 0 {
        return Err(AccessControlFailure::InvalidResponse { origin });
    }

    let values = response.headers().get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN);
    let value = match values {
        [] => return Err(AccessControlFailure::MissingAllowOrigin { origin }),
        [single] => single.trim(),
        _ => {
            return Err(AccessControlFailure::MultipleAllowOriginValues {
                value: values.join(", "),
                origin,
            });
        }
    };

    if value == "*" {
        if allow_credentials {
            return Err(AccessControlFailure::WildcardWithCredentials { origin });
        }
        return Ok(());
    }

    if value.contains(',') {
        return Err(AccessControlFailure::MultipleAllowOriginValues {
            value: value.to_string(),
            origin,
        });
    }

    if value != origin {
        return Err(AccessControlFailure::AllowOriginMismatch {
            value: value.to_string(),
            origin,
        });
    }

    if allow_credentials {
        let credentials = response
            .header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap_or_default();
        if credentials != "true" {
            return Err(AccessControlFailure::CredentialsNotAllowed {
                value: credentials.to_string(),
                origin,
            });
        }
    }

    Ok(())
}

/// Validates a preflight response for the request it was sent for.
pub fn check_preflight_response(
    response: &ResponseHeaders,
    origin: &SecurityOrigin,
    allow_credentials: bool,
    request_method: &str,
    request_headers: &HeaderList,
) -> Result<PreflightGrant, PreflightFailure> {
    check_access_control(response, origin, allow_credentials)
        .map_err(PreflightFailure::AccessControl)?;

    if !response.is_ok_status() {
        return Err(PreflightFailure::InvalidStatus {
            status: response.status(),
        });
    }

    let methods = match response
        .headers()
        .get_combined(header::ACCESS_CONTROL_ALLOW_METHODS)
    {
        Some(value) => AllowedMethods::parse(&value).ok_or(PreflightFailure::InvalidAllowMethods)?,
        None => AllowedMethods::default(),
    };

    let headers = match response
        .headers()
        .get_combined(header::ACCESS_CONTROL_ALLOW_HEADERS)
    {
        Some(value) => AllowedHeaders::parse(&value).ok_or(PreflightFailure::InvalidAllowHeaders)?,
        None => AllowedHeaders::default(),
    };

    if !methods.allows_method(request_method, allow_credentials) {
        return Err(PreflightFailure::MethodNotAllowed {
            method: request_method.to_string(),
        });
    }

    let names = non_simple_header_names(request_headers);
    if let Some(name) = headers.first_disallowed(names.iter().map(String::as_str), allow_credentials)
    {
        return Err(PreflightFailure::HeaderNotAllowed {
            header: name.to_string(),
        });
    }

    Ok(PreflightGrant {
        methods,
        headers,
        max_age: parse_max_age(response.header(header::ACCESS_CONTROL_MAX_AGE)),
    })
}

/// `Access-Control-Max-Age`, defaulting when absent or malformed and capped.
pub fn parse_max_age(value: Option<&str>) -> Duration {
    let seconds = value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(limits::DEFAULT_PREFLIGHT_MAX_AGE_SECS)
        .min(limits::MAX_PREFLIGHT_MAX_AGE_SECS);
    Duration::from_secs(seconds)
}

/// Decides whether a redirect to `new_url` may be followed.
///
/// Same-origin targets are always allowed. Cross-origin targets need a
/// permitting policy and a remaining budget; CORS loads additionally refuse
/// non-HTTP(S) targets and URLs carrying credentials.
pub fn is_allowed_redirect_target(
    new_url: &Url,
    fixed_origin: &SecurityOrigin,
    options: &RequestOptions,
    remaining_redirects: u32,
) -> Result<RedirectTarget, RedirectDenyReason> {
    if fixed_origin.is_same_origin(new_url) {
        return Ok(RedirectTarget::SameOrigin);
    }

    match options.cross_origin_request_policy {
        CrossOriginRequestPolicy::Deny => return Err(RedirectDenyReason::CrossOriginDenied),
        CrossOriginRequestPolicy::Allow => {}
        CrossOriginRequestPolicy::UseAccessControl => {
            if !is_cors_enabled_scheme(new_url) {
                return Err(RedirectDenyReason::UnsupportedScheme);
            }
            if !new_url.username().is_empty() || new_url.password().is_some() {
                return Err(RedirectDenyReason::CredentialsInUrl);
            }
        }
    }

    if remaining_redirects == 0 {
        return Err(RedirectDenyReason::LimitExceeded);
    }

    Ok(RedirectTarget::CrossOrigin)
}

/// Rejects forbidden or malformed methods and header fields from untrusted callers.
pub fn validate_untrusted_request(request: &Request) -> Result<(), UntrustedRequestError> {
    let method = request.method();
    if !is_http_token(method) {
        return Err(UntrustedRequestError::InvalidMethod(method.to_string()));
    }
    if FORBIDDEN_METHODS
        .iter()
        .any(|forbidden| forbidden.eq_ignore_ascii_case(method))
    {
        return Err(UntrustedRequestError::ForbiddenMethod(method.to_string()));
    }

    for (name, value) in request.headers().iter() {
        if !is_http_token(name) {
            return Err(UntrustedRequestError::InvalidHeaderName(name.to_string()));
        }
        if is_forbidden_request_header(name) {
            return Err(UntrustedRequestError::ForbiddenHeader(name.to_string()));
        }
        if !is_valid_header_value(value) {
            return Err(UntrustedRequestError::InvalidHeaderValue(name.to_string()));
        }
    }

    Ok(())
}

pub fn is_forbidden_request_header(name: &str) -> bool {
    let name = normalize_lower(name);
    FORBIDDEN_REQUEST_HEADERS.contains(name.as_str())
        || FORBIDDEN_REQUEST_HEADER_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

/// The view of a cross-origin response a caller is allowed to see.
pub fn filter_response_headers(response: &ResponseHeaders, allow_credentials: bool) -> ResponseHeaders {
    response.filtered_for_cross_origin(allow_credentials)
}

#[cfg(test)]
#[path = "policy_test.rs"]
mod policy_test;
