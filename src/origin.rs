use crate::constants::scheme;
use std::fmt;
use url::Url;

/// The origin of the context that initiates a load.
///
/// Captured once when a loader is created and used unchanged for every
/// cross-origin decision of that load, redirects included.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecurityOrigin(url::Origin);

impl SecurityOrigin {
    pub fn from_url(url: &Url) -> Self {
        Self(url.origin())
    }

    /// Parses `value` as a URL and takes its origin.
    pub fn parse(value: &str) -> Result<Self, url::ParseError> {
        Url::parse(value).map(|url| Self::from_url(&url))
    }

    /// A fresh opaque origin, as owned by sandboxed or `data:` documents.
    pub fn opaque() -> Self {
        Self(url::Origin::new_opaque())
    }

    pub fn is_opaque(&self) -> bool {
        !self.0.is_tuple()
    }

    /// The ASCII serialization sent in `Origin` headers; `null` when opaque.
    pub fn serialize(&self) -> String {
        self.0.ascii_serialization()
    }

    /// Whether `url` shares this origin. Opaque origins match nothing.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        self.0.is_tuple() && self.0 == url.origin()
    }
}

impl From<url::Origin> for SecurityOrigin {
    fn from(value: url::Origin) -> Self {
        Self(value)
    }
}

impl fmt::Debug for SecurityOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecurityOrigin")
            .field(&self.serialize())
            .finish()
    }
}

impl fmt::Display for SecurityOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Schemes for which cross-origin access can be granted through CORS.
pub(crate) fn is_cors_enabled_scheme(url: &Url) -> bool {
    matches!(url.scheme(), scheme::HTTP | scheme::HTTPS)
}

/// Two URLs are same-origin when their tuple origins are equal.
pub(crate) fn urls_same_origin(a: &Url, b: &Url) -> bool {
    let origin = a.origin();
    origin.is_tuple() && origin == b.origin()
}

#[cfg(test)]
#[path = "origin_test.rs"]
mod origin_test;
