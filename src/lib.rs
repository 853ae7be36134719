pub mod constants;
mod allowed_headers;
mod allowed_methods;
mod backend;
mod bridge;
mod client;
mod clock;
mod context;
mod error;
mod exposed_headers;
mod headers;
mod loader;
mod memory_backend;
mod options;
mod origin;
mod policy;
mod preflight;
mod preflight_cache;
mod request;
mod response;
mod result;
mod scope;
mod task_runner;
mod timing_allow_origin;
mod util;

pub use allowed_headers::AllowedHeaders;
pub use allowed_methods::{AllowedMethods, is_simple_method};
pub use backend::{NetworkBackend, NetworkBackendClient, RequestHandle};
pub use bridge::{LoaderThread, WorkerThreadBridge};
pub use client::{ResourceTiming, ThreadableLoaderClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::RequestContext;
pub use error::{BridgeError, ErrorKind, LoadError, NetworkError, NetworkErrorKind};
pub use exposed_headers::ExposedHeaders;
pub use headers::HeaderList;
pub use loader::{LoadState, Loader, LoadingContext, ThreadableLoader};
pub use memory_backend::{Fixture, InMemoryBackend};
pub use options::{CrossOriginRequestPolicy, PreflightPolicy, RequestOptions, ValidationError};
pub use origin::SecurityOrigin;
pub use policy::{
    check_access_control, check_initial, check_preflight_response, filter_response_headers,
    is_allowed_redirect_target, is_forbidden_request_header, is_simple_header,
    non_simple_header_names, parse_max_age, requires_preflight, validate_untrusted_request,
};
pub use preflight::{PreflightGrant, build_preflight_request};
pub use preflight_cache::PreflightCache;
pub use request::Request;
pub use response::{ResponseHeaders, is_forbidden_response_header, is_safelisted_response_header};
pub use result::{
    AccessControlFailure, InitialCheck, PolicyViolation, PreflightFailure, RedirectDenyReason,
    RedirectTarget, UntrustedRequestError,
};
pub use scope::{ObjectId, ThreadScope};
pub use task_runner::{RemoteRunner, RemoteTask, TaskRunner, TimerHandle};
pub use timing_allow_origin::TimingAllowOrigin;
#[doc(hidden)]
pub use util::{equals_ignore_case, normalize_lower};
