use crate::constants::{header, method};
use crate::context::RequestContext;
use crate::headers::HeaderList;
use url::Url;

/// A single network request.
///
/// Requests are immutable once handed to a loader: following a redirect
/// derives a new request instead of editing the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    url: Url,
    method: String,
    headers: HeaderList,
    body: Option<Vec<u8>>,
    context: RequestContext,
    include_credentials: bool,
}

impl Request {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            method: method::GET.to_string(),
            headers: HeaderList::new(),
            body: None,
            context: RequestContext::default(),
            include_credentials: true,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(url).with_method(method::POST)
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
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

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub(crate) fn with_credentials(mut self, include: bool) -> Self {
        self.include_credentials = include;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderList {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn context(&self) -> RequestContext {
        self.context
    }

    /// Whether cookies and HTTP authentication travel with this request.
    pub fn include_credentials(&self) -> bool {
        self.include_credentials
    }

    /// The request handed to the backend: fills in `Accept` from the context
    /// when the caller did not set one.
    pub(crate) fn prepared(mut self) -> Self {
        if !self.headers.contains(header::ACCEPT) {
            self.headers
                .set(header::ACCEPT, self.context.default_accept());
        }
        self
    }

    /// Derives the request that follows a redirect to `url`.
    ///
    /// `headers` is the caller's header set as it stood for the previous hop;
    /// a 303, or a 301/302 answering a POST, turns the request into a
    /// body-less GET.
    pub(crate) fn redirected(&self, url: Url, status: u16, headers: HeaderList) -> Self {
        let rewrite_to_get = status == 303
            || (matches!(status, 301 | 302) && self.method.eq_ignore_ascii_case(method::POST));

        let mut next = Self {
            url,
            method: self.method.clone(),
            headers,
            body: self.body.clone(),
            context: self.context,
            include_credentials: self.include_credentials,
        };

        if rewrite_to_get && !next.method.eq_ignore_ascii_case(method::HEAD) {
            next.method = method::GET.to_string();
            next.body = None;
            next.headers.remove(header::CONTENT_TYPE);
        }

        next
    }
}

#[cfg(test)]
#[path = "request_test.rs"]
mod request_test;
