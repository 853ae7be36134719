use thiserror::Error;

/// Outcome of evaluating a request against the fixed origin before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialCheck {
    /// Dispatch the request. With `cors`, the response must pass the
    /// access-control check.
    Allow { cors: bool },
    /// A CORS request that needs a preflight first.
    RequiresPreflight,
    Deny(PolicyViolation),
}

/// Where an allowed redirect leads, relative to the fixed origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    SameOrigin,
    /// Consumes one unit of the CORS redirect budget.
    CrossOrigin,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("Cross origin requests are not supported.")]
    CrossOriginDenied,
    #[error("Cross origin requests are only supported for protocol schemes: http, https.")]
    UnsupportedScheme,
}

/// Why a response failed the access-control check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessControlFailure {
    #[error(
        "No 'Access-Control-Allow-Origin' header is present on the requested resource. Origin '{origin}' is therefore not allowed access."
    )]
    MissingAllowOrigin { origin: String },
    #[error(
        "A wildcard '*' cannot be used in the 'Access-Control-Allow-Origin' header when the credentials flag is true. Origin '{origin}' is therefore not allowed access."
    )]
    WildcardWithCredentials { origin: String },
    #[error(
        "The 'Access-Control-Allow-Origin' header has a value '{value}' that is not equal to the supplied origin. Origin '{origin}' is therefore not allowed access."
    )]
    AllowOriginMismatch { value: String, origin: String },
    #[error(
        "The 'Access-Control-Allow-Origin' header contains multiple values '{value}', but only one is allowed. Origin '{origin}' is therefore not allowed access."
    )]
    MultipleAllowOriginValues { value: String, origin: String },
    #[error(
        "Credentials flag is 'true', but the 'Access-Control-Allow-Credentials' header is '{value}'. It must be 'true' to allow credentials. Origin '{origin}' is therefore not allowed access."
    )]
    CredentialsNotAllowed { value: String, origin: String },
    #[error("Invalid response. Origin '{origin}' is therefore not allowed access.")]
    InvalidResponse { origin: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreflightFailure {
    #[error("Response for preflight has invalid HTTP status code {status}")]
    InvalidStatus { status: u16 },
    #[error("Response for preflight is invalid (redirect)")]
    Redirect,
    #[error("Response to preflight request doesn't pass access control check: {0}")]
    AccessControl(#[source] AccessControlFailure),
    #[error("Cannot parse Access-Control-Allow-Methods response header field in preflight response.")]
    InvalidAllowMethods,
    #[error("Cannot parse Access-Control-Allow-Headers response header field in preflight response.")]
    InvalidAllowHeaders,
    #[error("Method {method} is not allowed by Access-Control-Allow-Methods in preflight response.")]
    MethodNotAllowed { method: String },
    #[error(
        "Request header field {header} is not allowed by Access-Control-Allow-Headers in preflight response."
    )]
    HeaderNotAllowed { header: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RedirectDenyReason {
    #[error("Redirect to cross-origin resource is not allowed.")]
    CrossOriginDenied,
    #[error("Cross-origin redirect limit exceeded.")]
    LimitExceeded,
    #[error("Redirect loop detected.")]
    Loop,
    #[error("Redirect location has a disallowed scheme.")]
    UnsupportedScheme,
    #[error("Redirect location contains userinfo, which is disallowed for cross-origin requests.")]
    CredentialsInUrl,
}

/// Rejections of caller-supplied request fields for untrusted loads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UntrustedRequestError {
    #[error("'{0}' is not a valid HTTP method.")]
    InvalidMethod(String),
    #[error("'{0}' HTTP method is unsupported.")]
    ForbiddenMethod(String),
    #[error("'{0}' is not a valid HTTP header field name.")]
    InvalidHeaderName(String),
    #[error("Refused to set unsafe header \"{0}\"")]
    ForbiddenHeader(String),
    #[error("Value of header '{0}' is not a valid HTTP header field value.")]
    InvalidHeaderValue(String),
}
