//! The threadable loader state machine.
//!
//! A [`ThreadableLoader`] lives on one thread, owns every request it issues
//! and forwards validated backend events to its client. Once a terminal
//! callback has been delivered, or `cancel` has been called, the client is
//! released and nothing reaches it again.

use crate::backend::{NetworkBackend, NetworkBackendClient, RequestHandle};
use crate::client::{ResourceTiming, ThreadableLoaderClient};
use crate::constants::header;
use crate::error::{ErrorKind, LoadError, NetworkError, NetworkErrorKind};
use crate::headers::HeaderList;
use crate::options::{PreflightPolicy, RequestOptions, ValidationError};
use crate::origin::{SecurityOrigin, urls_same_origin};
use crate::policy::{
    check_access_control, check_initial, check_preflight_response, filter_response_headers,
    is_allowed_redirect_target, validate_untrusted_request,
};
use crate::preflight::build_preflight_request;
use crate::preflight_cache::PreflightCache;
use crate::request::Request;
use crate::response::ResponseHeaders;
use crate::result::{
    AccessControlFailure, InitialCheck, PolicyViolation, PreflightFailure, RedirectDenyReason,
    RedirectTarget,
};
use crate::scope::ObjectId;
use crate::task_runner::{TaskRunner, TimerHandle};
use crate::timing_allow_origin::TimingAllowOrigin;
use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Operations shared by loaders living on this thread and bridged ones.
pub trait Loader {
    fn start(&self, request: Request);
    fn cancel(&self);
    fn set_defers_loading(&self, defers: bool);
    /// Replaces the inactivity timeout, measured from now. A zero timeout is
    /// rejected like [`ValidationError::ZeroTimeout`] and leaves the current
    /// one in place.
    fn override_timeout(&self, timeout: Duration);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    Idle,
    AwaitingInitialDispatch,
    SendingPreflight,
    AwaitingPreflightResponse,
    SendingActualRequest,
    ReceivingResponse,
    ReceivingBody,
    Finished,
    Failed,
    Cancelled,
}

impl LoadState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoadState::Finished | LoadState::Failed | LoadState::Cancelled
        )
    }
}

/// Everything a loader needs from the thread it runs on.
#[derive(Clone)]
pub struct LoadingContext {
    origin: SecurityOrigin,
    backend: Rc<dyn NetworkBackend>,
    runner: Rc<TaskRunner>,
    preflight_cache: Rc<PreflightCache>,
}

impl LoadingContext {
    pub fn new(origin: SecurityOrigin, backend: Rc<dyn NetworkBackend>, runner: Rc<TaskRunner>) -> Self {
        let preflight_cache = Rc::new(PreflightCache::new(Arc::clone(runner.clock())));
        Self {
            origin,
            backend,
            runner,
            preflight_cache,
        }
    }

    pub fn with_preflight_cache(mut self, cache: Rc<PreflightCache>) -> Self {
        self.preflight_cache = cache;
        self
    }

    pub fn origin(&self) -> &SecurityOrigin {
        &self.origin
    }

    pub fn backend(&self) -> &Rc<dyn NetworkBackend> {
        &self.backend
    }

    pub fn runner(&self) -> &Rc<TaskRunner> {
        &self.runner
    }

    pub fn preflight_cache(&self) -> &Rc<PreflightCache> {
        &self.preflight_cache
    }
}

impl fmt::Debug for LoadingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingContext")
            .field("origin", &self.origin)
            .field("preflight_cache", &self.preflight_cache)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Preflight,
    Actual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DispatchTag {
    id: u64,
    phase: Phase,
}

enum BackendEvent {
    Redirect(Url, ResponseHeaders),
    Response(ResponseHeaders),
    Data(Vec<u8>),
    Finish(Instant),
    Fail(NetworkError),
    SendData(u64, u64),
}

impl BackendEvent {
    fn name(&self) -> &'static str {
        match self {
            BackendEvent::Redirect(..) => "redirect",
            BackendEvent::Response(_) => "response",
            BackendEvent::Data(_) => "data",
            BackendEvent::Finish(_) => "finish",
            BackendEvent::Fail(_) => "fail",
            BackendEvent::SendData(..) => "send-data",
        }
    }
}

enum Failure {
    Fail(LoadError),
    AccessControl(LoadError),
    Redirect(LoadError),
}

struct LoaderInner {
    id: ObjectId,
    context: LoadingContext,
    origin: SecurityOrigin,
    options: RequestOptions,
    client: RefCell<Option<Rc<dyn ThreadableLoaderClient>>>,
    state: Cell<LoadState>,
    started: Cell<bool>,
    request: RefCell<Option<Request>>,
    /// Caller-supplied headers as they stand for the next hop.
    caller_headers: RefCell<HeaderList>,
    initial_url: RefCell<Option<Url>>,
    cors: Cell<bool>,
    handle: Cell<Option<RequestHandle>>,
    dispatch: Cell<Option<DispatchTag>>,
    next_dispatch_id: Cell<u64>,
    visited: RefCell<HashSet<Url>>,
    redirect_count: Cell<u32>,
    cors_redirects_remaining: Cell<u32>,
    crossed_origins: Cell<bool>,
    deferred: Cell<bool>,
    draining: Cell<bool>,
    queue: RefCell<VecDeque<(DispatchTag, BackendEvent)>>,
    timeout: Cell<Option<Duration>>,
    timer: Cell<Option<TimerHandle>>,
    start_time: Cell<Option<Instant>>,
    final_response: RefCell<Option<ResponseHeaders>>,
}

/// Loads one request for a client living on the same thread.
#[derive(Clone)]
pub struct ThreadableLoader {
    inner: Rc<LoaderInner>,
}

impl ThreadableLoader {
    pub fn new(
        context: &LoadingContext,
        client: Rc<dyn ThreadableLoaderClient>,
        options: RequestOptions,
    ) -> Result<Self, ValidationError> {
        options.validate()?;

        let inner = LoaderInner {
            id: ObjectId::next(),
            context: context.clone(),
            origin: context.origin.clone(),
            cors_redirects_remaining: Cell::new(options.cors_redirect_limit),
            timeout: Cell::new(options.timeout),
            options,
            client: RefCell::new(Some(client)),
            state: Cell::new(LoadState::Idle),
            started: Cell::new(false),
            request: RefCell::new(None),
            caller_headers: RefCell::new(HeaderList::new()),
            initial_url: RefCell::new(None),
            cors: Cell::new(false),
            handle: Cell::new(None),
            dispatch: Cell::new(None),
            next_dispatch_id: Cell::new(1),
            visited: RefCell::new(HashSet::new()),
            redirect_count: Cell::new(0),
            crossed_origins: Cell::new(false),
            deferred: Cell::new(false),
            draining: Cell::new(false),
            queue: RefCell::new(VecDeque::new()),
            timer: Cell::new(None),
            start_time: Cell::new(None),
            final_response: RefCell::new(None),
        };

        Ok(Self {
            inner: Rc::new(inner),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    pub fn state(&self) -> LoadState {
        self.inner.state.get()
    }

    pub fn options(&self) -> &RequestOptions {
        &self.inner.options
    }

    /// The fixed origin every cross-origin decision of this load uses.
    pub fn origin(&self) -> &SecurityOrigin {
        &self.inner.origin
    }

    /// Redirects followed so far.
    pub fn redirect_count(&self) -> u32 {
        self.inner.redirect_count.get()
    }

    /// The request currently being loaded, after redirects.
    pub fn current_request(&self) -> Option<Request> {
        self.inner.request.borrow().clone()
    }
}

impl Loader for ThreadableLoader {
    fn start(&self, request: Request) {
        self.inner.start(request);
    }

    fn cancel(&self) {
        self.inner.cancel();
    }

    fn set_defers_loading(&self, defers: bool) {
        self.inner.set_defers_loading(defers);
    }

    fn override_timeout(&self, timeout: Duration) {
        self.inner.override_timeout(timeout);
    }
}

impl fmt::Debug for ThreadableLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadableLoader")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state.get())
            .finish()
    }
}

impl LoaderInner {
    fn is_terminal(&self) -> bool {
        self.state.get().is_terminal()
    }

    fn set_state(&self, state: LoadState) {
        let previous = self.state.replace(state);
        if previous != state {
            tracing::debug!(loader = %self.id, from = ?previous, to = ?state, "state");
        }
    }

    fn current_url(&self) -> Option<Url> {
        let request = self.request.borrow();
        match request.as_ref() {
            Some(request) => Some(request.url().clone()),
            None => self.initial_url.borrow().clone(),
        }
    }

    fn client(&self) -> Option<Rc<dyn ThreadableLoaderClient>> {
        self.client.borrow().clone()
    }

    fn start(self: &Rc<Self>, request: Request) {
        if self.started.replace(true) {
            debug_assert!(false, "ThreadableLoader::start called twice");
            tracing::warn!(loader = %self.id, "start called twice; ignored");
            return;
        }

        if self.is_terminal() {
            tracing::trace!(loader = %self.id, "start after cancel; ignored");
            return;
        }

        tracing::debug!(
            loader = %self.id,
            method = request.method(),
            url = %request.url(),
            origin = %self.origin,
            "start"
        );

        self.start_time.set(Some(self.context.runner.now()));
        *self.initial_url.borrow_mut() = Some(request.url().clone());
        *self.caller_headers.borrow_mut() = request.headers().clone();
        self.visited.borrow_mut().insert(request.url().clone());

        if self.options.untrusted_http
            && let Err(reason) = validate_untrusted_request(&request)
        {
            self.set_state(LoadState::AwaitingInitialDispatch);
            *self.request.borrow_mut() = Some(request);
            let error = LoadError::untrusted(self.current_url(), &reason);
            let weak = Rc::downgrade(self);
            self.context.runner.post(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fail(Failure::Fail(error));
                }
            });
            return;
        }

        self.begin(request);
    }

    /// Evaluates `request` against the fixed origin and sends it, or its
    /// preflight. Used for the initial request and after every redirect.
    fn begin(self: &Rc<Self>, request: Request) {
        self.set_state(LoadState::AwaitingInitialDispatch);
        let decision = check_initial(&self.origin, &request, &self.options);
        *self.request.borrow_mut() = Some(request);

        match decision {
            InitialCheck::Deny(violation) => {
                let error = LoadError::policy(self.current_url(), &violation);
                match violation {
                    PolicyViolation::CrossOriginDenied => self.fail(Failure::Fail(error)),
                    PolicyViolation::UnsupportedScheme => {
                        self.fail(Failure::AccessControl(error))
                    }
                }
            }
            InitialCheck::Allow { cors } => {
                self.cors.set(cors);
                self.dispatch_actual();
            }
            InitialCheck::RequiresPreflight => {
                self.cors.set(true);
                let cached = self.options.preflight_policy != PreflightPolicy::Force
                    && self.request.borrow().as_ref().is_some_and(|request| {
                        self.context.preflight_cache.covers(
                            &self.origin,
                            request,
                            self.options.allow_credentials,
                        )
                    });
                if cached {
                    tracing::debug!(loader = %self.id, "preflight cache hit");
                    self.dispatch_actual();
                } else {
                    self.dispatch_preflight();
                }
            }
        }
    }

    fn dispatch_preflight(self: &Rc<Self>) {
        let preflight = {
            let request = self.request.borrow();
            request
                .as_ref()
                .map(|request| build_preflight_request(request, &self.origin))
        };
        let Some(preflight) = preflight else {
            return;
        };

        self.set_state(LoadState::SendingPreflight);
        self.dispatch(preflight.prepared(), Phase::Preflight);
        if self.state.get() == LoadState::SendingPreflight {
            self.set_state(LoadState::AwaitingPreflightResponse);
        }
    }

    fn dispatch_actual(self: &Rc<Self>) {
        let request = self.request.borrow().clone();
        let Some(request) = request else {
            return;
        };

        let credentials =
            self.origin.is_same_origin(request.url()) || self.options.allow_credentials;
        let mut request = request.with_credentials(credentials);
        if self.cors.get() {
            request
                .headers_mut()
                .set(header::ORIGIN, self.origin.serialize());
        }
        let request = request.prepared();
        *self.request.borrow_mut() = Some(request.clone());

        self.set_state(LoadState::SendingActualRequest);
        self.dispatch(request, Phase::Actual);
    }

    fn dispatch(self: &Rc<Self>, request: Request, phase: Phase) {
        let id = self.next_dispatch_id.get();
        self.next_dispatch_id.set(id + 1);
        let tag = DispatchTag { id, phase };
        self.dispatch.set(Some(tag));

        let sink: Rc<dyn NetworkBackendClient> = Rc::new(LoaderSink {
            loader: Rc::downgrade(self),
            tag,
        });
        let handle = self.context.backend.dispatch(request, sink);
        if self.dispatch.get() == Some(tag) {
            self.handle.set(Some(handle));
        }
        self.arm_timeout();
    }

    fn receive(self: &Rc<Self>, tag: DispatchTag, event: BackendEvent) {
        if self.is_terminal() || self.dispatch.get() != Some(tag) {
            tracing::trace!(loader = %self.id, event = event.name(), "stale event dropped");
            return;
        }

        self.arm_timeout();

        if self.deferred.get() || !self.queue.borrow().is_empty() {
            tracing::trace!(loader = %self.id, event = event.name(), "event deferred");
            self.queue.borrow_mut().push_back((tag, event));
            return;
        }

        self.process(tag.phase, event);
    }

    fn process(self: &Rc<Self>, phase: Phase, event: BackendEvent) {
        match phase {
            Phase::Preflight => self.process_preflight(event),
            Phase::Actual => self.process_actual(event),
        }
    }

    fn process_preflight(self: &Rc<Self>, event: BackendEvent) {
        match event {
            BackendEvent::Redirect(..) => {
                self.handle.set(None);
                let error = LoadError::preflight(self.current_url(), &PreflightFailure::Redirect);
                self.fail(Failure::Fail(error));
            }
            BackendEvent::Response(response) => {
                self.cancel_backend_request();
                let outcome = {
                    let request = self.request.borrow();
                    request.as_ref().map(|request| {
                        check_preflight_response(
                            &response,
                            &self.origin,
                            self.options.allow_credentials,
                            request.method(),
                            request.headers(),
                        )
                    })
                };

                match outcome {
                    Some(Ok(grant)) => {
                        tracing::debug!(loader = %self.id, "preflight granted");
                        if let Some(url) = self.current_url() {
                            self.context.preflight_cache.insert(
                                &self.origin,
                                &url,
                                self.options.allow_credentials,
                                grant,
                            );
                        }
                        self.dispatch_actual();
                    }
                    Some(Err(failure)) => {
                        let error = LoadError::preflight(self.current_url(), &failure);
                        self.fail(Failure::Fail(error));
                    }
                    None => {}
                }
            }
            BackendEvent::Fail(error) => {
                self.handle.set(None);
                let error = LoadError::network(self.current_url(), &error);
                self.fail(Failure::Fail(error));
            }
            BackendEvent::Data(_) | BackendEvent::Finish(_) | BackendEvent::SendData(..) => {
                tracing::trace!(loader = %self.id, "preflight body ignored");
            }
        }
    }

    fn process_actual(self: &Rc<Self>, event: BackendEvent) {
        match event {
            BackendEvent::SendData(sent, total) => {
                if let Some(client) = self.client() {
                    client.did_send_data(sent, total);
                }
            }
            BackendEvent::Redirect(new_url, response) => {
                self.handle.set(None);
                self.handle_redirect(new_url, response);
            }
            BackendEvent::Response(response) => self.handle_response(response),
            BackendEvent::Data(data) => {
                if self.state.get() != LoadState::ReceivingBody {
                    tracing::warn!(loader = %self.id, "data before response dropped");
                    return;
                }
                if let Some(client) = self.client() {
                    client.did_receive_data(&data);
                }
            }
            BackendEvent::Finish(finish_time) => {
                self.handle.set(None);
                if self.state.get() != LoadState::ReceivingBody {
                    let error = NetworkError::new(
                        NetworkErrorKind::Protocol,
                        "The load finished without a response.",
                    );
                    tracing::warn!(loader = %self.id, "finish before response");
                    self.fail(Failure::Fail(LoadError::network(self.current_url(), &error)));
                    return;
                }
                self.finish(finish_time);
            }
            BackendEvent::Fail(error) => {
                self.handle.set(None);
                tracing::debug!(loader = %self.id, kind = ?error.kind, "network failure");
                let error = LoadError::network(self.current_url(), &error);
                self.fail(Failure::Fail(error));
            }
        }
    }

    fn handle_response(self: &Rc<Self>, response: ResponseHeaders) {
        self.set_state(LoadState::ReceivingResponse);

        if self.cors.get()
            && let Err(failure) =
                check_access_control(&response, &self.origin, self.options.allow_credentials)
        {
            self.fail_access_control(&failure);
            return;
        }

        let delivered = if self.cors.get() && !self.options.expose_all_response_headers {
            filter_response_headers(&response, self.options.allow_credentials)
        } else {
            response.clone()
        };
        *self.final_response.borrow_mut() = Some(response);

        self.set_state(LoadState::ReceivingBody);
        if let Some(client) = self.client() {
            client.did_receive_response(&delivered);
        }
    }

    fn handle_redirect(self: &Rc<Self>, new_url: Url, response: ResponseHeaders) {
        let Some(current) = self.request.borrow().clone() else {
            return;
        };
        tracing::debug!(
            loader = %self.id,
            status = response.status(),
            from = %current.url(),
            to = %new_url,
            "redirect"
        );

        if self.visited.borrow().contains(&new_url) {
            self.fail_redirect(RedirectDenyReason::Loop);
            return;
        }

        if self.cors.get()
            && let Err(failure) =
                check_access_control(&response, &self.origin, self.options.allow_credentials)
        {
            self.fail_access_control(&failure);
            return;
        }

        let target = match is_allowed_redirect_target(
            &new_url,
            &self.origin,
            &self.options,
            self.cors_redirects_remaining.get(),
        ) {
            Ok(target) => target,
            Err(reason) => {
                self.fail_redirect(reason);
                return;
            }
        };

        if !urls_same_origin(current.url(), &new_url) {
            self.crossed_origins.set(true);
        }

        let mut headers = self.caller_headers.borrow().clone();
        if self.crossed_origins.get() {
            headers.remove(header::AUTHORIZATION);
        }
        let next = current.redirected(new_url.clone(), response.status(), headers);

        if let Some(client) = self.client()
            && !client.will_follow_redirect(&next, &response)
        {
            if !self.is_terminal() {
                tracing::debug!(loader = %self.id, "client refused redirect");
                self.abandon();
                self.set_state(LoadState::Cancelled);
                self.deliver_terminal(Failure::Fail(LoadError::cancelled(Some(new_url))));
            }
            return;
        }
        if self.is_terminal() {
            return;
        }

        if target == RedirectTarget::CrossOrigin {
            self.cors_redirects_remaining
                .set(self.cors_redirects_remaining.get().saturating_sub(1));
        }
        self.redirect_count.set(self.redirect_count.get() + 1);
        self.visited.borrow_mut().insert(new_url);
        *self.caller_headers.borrow_mut() = next.headers().clone();

        self.begin(next);
    }

    fn finish(self: &Rc<Self>, finish_time: Instant) {
        let timing = self.resource_timing();
        self.abandon();
        self.set_state(LoadState::Finished);

        let client = self.client.borrow_mut().take();
        tracing::debug!(loader = %self.id, "finished");
        if let Some(client) = client {
            if let Some(timing) = timing {
                client.did_receive_resource_timing(&timing);
            }
            client.did_finish_loading(finish_time);
        }
    }

    fn resource_timing(&self) -> Option<ResourceTiming> {
        let name = self.initial_url.borrow().clone()?;
        let start_time = self.start_time.get()?;
        let response = self.final_response.borrow();
        let timing_allow_passed = match response.as_ref() {
            Some(response) if !self.origin.is_same_origin(response.url()) => TimingAllowOrigin::parse(
                response
                    .headers()
                    .get_all(header::TIMING_ALLOW_ORIGIN)
                    .iter()
                    .map(String::as_str),
            )
            .allows(&self.origin),
            _ => true,
        };

        Some(ResourceTiming {
            name,
            start_time,
            response_end: self.context.runner.now(),
            redirect_count: self.redirect_count.get(),
            timing_allow_passed,
        })
    }

    fn fail_access_control(self: &Rc<Self>, failure: &AccessControlFailure) {
        let error = LoadError::access_control(self.current_url(), failure);
        self.fail(Failure::AccessControl(error));
    }

    fn fail_redirect(self: &Rc<Self>, reason: RedirectDenyReason) {
        tracing::debug!(loader = %self.id, %reason, "redirect refused");
        let error = LoadError::redirect(self.current_url(), &reason);
        self.fail(Failure::Redirect(error));
    }

    fn fail(&self, failure: Failure) {
        if self.is_terminal() {
            return;
        }
        self.abandon();
        self.set_state(LoadState::Failed);
        self.deliver_terminal(failure);
    }

    fn deliver_terminal(&self, failure: Failure) {
        let client = self.client.borrow_mut().take();
        let Some(client) = client else {
            return;
        };

        match failure {
            Failure::Fail(error) => {
                tracing::debug!(loader = %self.id, kind = ?error.kind, %error, "failed");
                client.did_fail(&error);
            }
            Failure::AccessControl(error) => {
                tracing::debug!(loader = %self.id, %error, "access control check failed");
                client.did_fail_access_control_check(&error);
            }
            Failure::Redirect(error) => {
                tracing::debug!(loader = %self.id, %error, "redirect check failed");
                client.did_fail_redirect_check();
            }
        }
    }

    fn cancel(&self) {
        self.cancel_with(ErrorKind::Cancelled);
    }

    fn cancel_with(&self, kind: ErrorKind) {
        if self.is_terminal() {
            return;
        }
        tracing::debug!(loader = %self.id, ?kind, "cancel");
        self.abandon();
        self.set_state(LoadState::Cancelled);

        let url = self.current_url();
        let error = match kind {
            ErrorKind::TimedOut => LoadError::timed_out(url),
            _ => LoadError::cancelled(url),
        };
        self.deliver_terminal(Failure::Fail(error));
    }

    /// Drops in-flight backend work, pending events and the timer.
    fn abandon(&self) {
        self.cancel_backend_request();
        self.dispatch.set(None);
        self.disarm_timeout();
        let queued = std::mem::take(&mut *self.queue.borrow_mut());
        if !queued.is_empty() {
            tracing::trace!(loader = %self.id, dropped = queued.len(), "queued events dropped");
        }
    }

    fn cancel_backend_request(&self) {
        if let Some(handle) = self.handle.take() {
            self.context.backend.cancel(handle);
        }
    }

    fn set_defers_loading(self: &Rc<Self>, defers: bool) {
        self.deferred.set(defers);
        if defers || self.draining.get() {
            return;
        }

        self.draining.set(true);
        loop {
            if self.deferred.get() || self.is_terminal() {
                break;
            }
            let next = self.queue.borrow_mut().pop_front();
            let Some((tag, event)) = next else {
                break;
            };
            if self.dispatch.get() != Some(tag) {
                continue;
            }
            self.process(tag.phase, event);
        }
        self.draining.set(false);
    }

    fn override_timeout(self: &Rc<Self>, timeout: Duration) {
        if timeout.is_zero() {
            tracing::warn!(loader = %self.id, "zero timeout override ignored");
            return;
        }
        self.timeout.set(Some(timeout));
        if self.started.get() && !self.is_terminal() {
            self.arm_timeout();
        }
    }

    fn arm_timeout(self: &Rc<Self>) {
        self.disarm_timeout();
        let Some(timeout) = self.timeout.get() else {
            return;
        };

        let weak = Rc::downgrade(self);
        let handle = self.context.runner.post_delayed(timeout, move || {
            if let Some(inner) = weak.upgrade() {
                inner.timer.set(None);
                tracing::debug!(loader = %inner.id, "timed out");
                inner.cancel_with(ErrorKind::TimedOut);
            }
        });
        self.timer.set(Some(handle));
    }

    fn disarm_timeout(&self) {
        if let Some(handle) = self.timer.take() {
            self.context.runner.cancel_timer(handle);
        }
    }
}

impl Drop for LoaderInner {
    fn drop(&mut self) {
        if !self.is_terminal() && self.started.get() {
            tracing::trace!(loader = %self.id, "dropped while loading");
        }
        self.cancel_backend_request();
        self.disarm_timeout();
    }
}

/// Backend-facing side of a loader. Events from superseded dispatches, or
/// arriving after the loader is gone, are dropped.
struct LoaderSink {
    loader: Weak<LoaderInner>,
    tag: DispatchTag,
}

impl LoaderSink {
    fn forward(&self, handle: RequestHandle, event: BackendEvent) {
        match self.loader.upgrade() {
            Some(loader) => loader.receive(self.tag, event),
            None => tracing::trace!(%handle, event = event.name(), "event for dropped loader"),
        }
    }
}

impl NetworkBackendClient for LoaderSink {
    fn on_redirect(&self, handle: RequestHandle, new_url: Url, redirect_response: ResponseHeaders) {
        self.forward(handle, BackendEvent::Redirect(new_url, redirect_response));
    }

    fn on_response(&self, handle: RequestHandle, response: ResponseHeaders) {
        self.forward(handle, BackendEvent::Response(response));
    }

    fn on_data(&self, handle: RequestHandle, data: &[u8]) {
        self.forward(handle, BackendEvent::Data(data.to_vec()));
    }

    fn on_finish(&self, handle: RequestHandle, finish_time: Instant) {
        self.forward(handle, BackendEvent::Finish(finish_time));
    }

    fn on_fail(&self, handle: RequestHandle, error: NetworkError) {
        self.forward(handle, BackendEvent::Fail(error));
    }

    fn on_send_data(&self, handle: RequestHandle, sent: u64, total: u64) {
        self.forward(handle, BackendEvent::SendData(sent, total));
    }
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;
