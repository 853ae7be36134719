use crate::constants::header;
use crate::exposed_headers::ExposedHeaders;
use crate::headers::HeaderList;
use crate::util::normalize_lower;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use url::Url;

static SAFELISTED_RESPONSE_HEADERS: Lazy<HashSet<String>> = Lazy::new(|| {
    [
        header::CACHE_CONTROL,
        header::CONTENT_LANGUAGE,
        header::CONTENT_TYPE,
        header::EXPIRES,
        header::LAST_MODIFIED,
        header::PRAGMA,
    ]
    .into_iter()
    .map(normalize_lower)
    .collect()
});

/// Status line, headers and final URL of a response or redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    url: Url,
    status: u16,
    status_text: String,
    headers: HeaderList,
}

impl ResponseHeaders {
    pub fn new(url: Url, status: u16) -> Self {
        Self {
            url,
            status,
            status_text: String::new(),
            headers: HeaderList::new(),
        }
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderList) -> Self {
        self.headers = headers;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn is_ok_status(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Keeps the safelisted headers plus those named by
    /// `Access-Control-Expose-Headers`. Cookies are always removed.
    pub(crate) fn filtered_for_cross_origin(&self, credentials: bool) -> Self {
        let exposed = ExposedHeaders::parse(
            self.headers
                .get_all(header::ACCESS_CONTROL_EXPOSE_HEADERS)
                .iter()
                .map(String::as_str),
        );

        let mut headers = self.headers.clone();
        headers.retain_names(|name| {
            if is_forbidden_response_header(name) {
                return false;
            }
            is_safelisted_response_header(name) || exposed.exposes(name, credentials)
        });

        Self {
            url: self.url.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            headers,
        }
    }
}

pub fn is_safelisted_response_header(name: &str) -> bool {
    SAFELISTED_RESPONSE_HEADERS.contains(&normalize_lower(name))
}

/// `Set-Cookie` and `Set-Cookie2` never reach script.
pub fn is_forbidden_response_header(name: &str) -> bool {
    name.eq_ignore_ascii_case(header::SET_COOKIE) || name.eq_ignore_ascii_case(header::SET_COOKIE2)
}

#[cfg(test)]
#[path = "response_test.rs"]
mod response_test;
