use crate::constants::header;
use crate::util::{equals_ignore_case, is_http_token, split_header_list};
use std::collections::HashSet;

/// Parsed `Access-Control-Allow-Headers` value of a preflight response.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AllowedHeaders {
    List(Vec<String>),
    /// Wildcard: grants every name except `Authorization` when credentials are not used.
    Any,
}

impl Default for AllowedHeaders {
    fn default() -> Self {
        AllowedHeaders::List(Vec::new())
    }
}

impl AllowedHeaders {
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut deduped: Vec<String> = Vec::new();
        for value in values.into_iter() {
            let trimmed = value.into().trim().to_string();
            let key = trimmed.to_ascii_lowercase();
            if seen.insert(key) {
                deduped.push(trimmed);
            }
        }

        Self::List(deduped)
    }

    pub fn any() -> Self {
        Self::Any
    }

    /// Parses the combined header value. `None` when an entry is not a header-name token.
    pub fn parse(value: &str) -> Option<Self> {
        let mut names = Vec::new();
        for entry in split_header_list(value) {
            if entry == "*" {
                return Some(Self::Any);
            }
            if !is_http_token(entry) {
                return None;
            }
            names.push(entry);
        }

        Some(Self::list(names))
    }

    pub fn allows_header(&self, name: &str, credentials: bool) -> bool {
        match self {
            Self::Any => !credentials && !equals_ignore_case(name, header::AUTHORIZATION),
            Self::List(allowed) => allowed
                .iter()
                .any(|allowed_header| equals_ignore_case(allowed_header, name)),
        }
    }

    /// The first of `names` that this value does not grant.
    pub fn first_disallowed<'a, I>(&self, names: I, credentials: bool) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .find(|name| !self.allows_header(name, credentials))
    }
}

#[cfg(test)]
#[path = "allowed_headers_test.rs"]
mod allowed_headers_test;
