use crate::constants::method;
use crate::util::{is_http_token, split_header_list};

/// Parsed `Access-Control-Allow-Methods` value of a preflight response.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AllowedMethods {
    /// The wildcard `*`; grants any method when credentials are not used.
    Any,
    /// Explicit method names. Matched case-sensitively.
    List(Vec<String>),
}

impl AllowedMethods {
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    pub fn any() -> Self {
        Self::Any
    }

    /// Parses the combined header value. `None` when an entry is not a method token.
    pub fn parse(value: &str) -> Option<Self> {
        let mut methods = Vec::new();
        for entry in split_header_list(value) {
            if entry == "*" {
                return Some(Self::Any);
            }
            if !is_http_token(entry) {
                return None;
            }
            methods.push(entry.to_string());
        }

        Some(Self::List(methods))
    }

    /// Simple methods are always allowed; the wildcard only without credentials.
    pub fn allows_method(&self, requested: &str, credentials: bool) -> bool {
        if is_simple_method(requested) {
            return true;
        }

        match self {
            AllowedMethods::Any => !credentials,
            AllowedMethods::List(values) => values.iter().any(|value| value == requested),
        }
    }
}

impl Default for AllowedMethods {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// `GET`, `HEAD` and `POST` never need a preflight on their own.
pub fn is_simple_method(value: &str) -> bool {
    matches!(value, method::GET | method::HEAD | method::POST)
}

#[cfg(test)]
#[path = "allowed_methods_test.rs"]
mod allowed_methods_test;
