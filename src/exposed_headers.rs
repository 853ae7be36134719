use crate::util::{equals_ignore_case, normalize_lower, split_header_list};
use std::collections::HashSet;

/// Parsed `Access-Control-Expose-Headers` value of a cross-origin response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExposedHeaders {
    List(Vec<String>),
    Any,
}

impl Default for ExposedHeaders {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ExposedHeaders {
    /// Builds an allow-list from the provided iterator, automatically trimming
    /// whitespace and removing duplicates.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut deduped: Vec<String> = Vec::new();

        for value in values.into_iter() {
            let trimmed = value.into().trim().to_string();
            if trimmed.is_empty() {
                continue;
            }

            if seen.insert(normalize_lower(&trimmed)) {
                deduped.push(trimmed);
            }
        }

        if deduped.len() == 1 && deduped[0] == "*" {
            return Self::Any;
        }

        Self::List(deduped)
    }

    /// Parses every value of the header, joined or repeated.
    pub fn parse<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::list(values.into_iter().flat_map(split_header_list))
    }

    /// Whether `name` may be shown to the caller. A `*` entry exposes every
    /// name unless the request carried credentials, where it is a literal name.
    pub fn exposes(&self, name: &str, credentials: bool) -> bool {
        match self {
            Self::Any => !credentials,
            Self::List(values) => values.iter().any(|value| {
                (value == "*" && !credentials) || equals_ignore_case(value, name)
            }),
        }
    }
}

#[cfg(test)]
#[path = "exposed_headers_test.rs"]
mod exposed_headers_test;
