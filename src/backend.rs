use crate::error::NetworkError;
use crate::request::Request;
use crate::response::ResponseHeaders;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;
use url::Url;

/// Identifies one dispatched request within a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestHandle(u64);

impl RequestHandle {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

/// The transport that actually performs requests.
///
/// Callbacks are delivered on the thread that dispatched the request. A
/// redirect offer ends the work on its handle: following it means
/// dispatching the redirected request, refusing it means doing nothing.
pub trait NetworkBackend {
    fn dispatch(&self, request: Request, client: Rc<dyn NetworkBackendClient>) -> RequestHandle;

    /// Abandons the request. No callback for `handle` follows.
    fn cancel(&self, handle: RequestHandle);
}

pub trait NetworkBackendClient {
    /// Offers a redirect to `new_url` and ends the work on `handle`; the
    /// backend must not follow it itself. The receiver answers "continue" by
    /// dispatching the redirected request as a new handle and "abort" by
    /// dispatching nothing, so there is no return value.
    fn on_redirect(&self, handle: RequestHandle, new_url: Url, redirect_response: ResponseHeaders);
    fn on_response(&self, handle: RequestHandle, response: ResponseHeaders);
    fn on_data(&self, handle: RequestHandle, data: &[u8]);
    fn on_finish(&self, handle: RequestHandle, finish_time: Instant);
    fn on_fail(&self, handle: RequestHandle, error: NetworkError);

    fn on_send_data(&self, handle: RequestHandle, sent: u64, total: u64) {
        let _ = (handle, sent, total);
    }
}
