/// Why a load was initiated. Only consulted when computing request headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RequestContext {
    #[default]
    Unspecified,
    Fetch,
    XmlHttpRequest,
    EventSource,
    Script,
    Object,
    Internal,
}

impl RequestContext {
    /// `Accept` value used when the caller did not provide one.
    pub fn default_accept(self) -> &'static str {
        match self {
            RequestContext::EventSource => "text/event-stream",
            _ => "*/*",
        }
    }
}
