use crate::error::LoadError;
use crate::request::Request;
use crate::response::ResponseHeaders;
use std::time::Instant;
use url::Url;

/// Timing record reported right before a load finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTiming {
    /// The URL the load started with.
    pub name: Url,
    pub start_time: Instant,
    pub response_end: Instant,
    pub redirect_count: u32,
    /// Whether detailed timing may be shown to the loading origin.
    pub timing_allow_passed: bool,
}

/// Receives the outcome of a load.
///
/// At most one of `did_finish_loading`, `did_fail`,
/// `did_fail_access_control_check` and `did_fail_redirect_check` is called,
/// and nothing follows it. Callbacks may call back into the loader,
/// including `cancel`.
pub trait ThreadableLoaderClient {
    /// Return false to stop the load; it then ends as a cancellation.
    fn will_follow_redirect(&self, new_request: &Request, redirect_response: &ResponseHeaders) -> bool {
        let _ = (new_request, redirect_response);
        true
    }

    fn did_send_data(&self, bytes_sent: u64, total_bytes: u64) {
        let _ = (bytes_sent, total_bytes);
    }

    fn did_receive_response(&self, response: &ResponseHeaders);

    fn did_receive_data(&self, data: &[u8]);

    fn did_receive_resource_timing(&self, timing: &ResourceTiming) {
        let _ = timing;
    }

    fn did_finish_loading(&self, finish_time: Instant);

    fn did_fail(&self, error: &LoadError);

    fn did_fail_access_control_check(&self, error: &LoadError);

    fn did_fail_redirect_check(&self);
}
