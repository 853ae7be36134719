use crate::backend::{NetworkBackend, NetworkBackendClient, RequestHandle};
use crate::constants::header;
use crate::error::{NetworkError, NetworkErrorKind};
use crate::headers::HeaderList;
use crate::request::Request;
use crate::response::ResponseHeaders;
use crate::task_runner::TaskRunner;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Response {
        status: u16,
        status_text: String,
        headers: HeaderList,
        chunks: Vec<Vec<u8>>,
        then_fail: Option<NetworkError>,
    },
    Redirect {
        status: u16,
        location: String,
        headers: HeaderList,
    },
    Fail(NetworkError),
    Hang,
}

/// A canned answer served by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    reply: Reply,
    latency: Duration,
}

impl Fixture {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body: Vec<u8> = body.into();
        Self::status(200, "OK").with_chunks([body])
    }

    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        Self::from_reply(Reply::Response {
            status,
            status_text: status_text.into(),
            headers: HeaderList::new(),
            chunks: Vec::new(),
            then_fail: None,
        })
    }

    /// Redirect to `location`, resolved against the request URL.
    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self::from_reply(Reply::Redirect {
            status,
            location: location.into(),
            headers: HeaderList::new(),
        })
    }

    pub fn network_error(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::from_reply(Reply::Fail(NetworkError::new(kind, message)))
    }

    /// Never answers.
    pub fn hang() -> Self {
        Self::from_reply(Reply::Hang)
    }

    fn from_reply(reply: Reply) -> Self {
        Self {
            reply,
            latency: Duration::ZERO,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self.reply {
            Reply::Response { headers, .. } | Reply::Redirect { headers, .. } => {
                headers.append(name, value);
            }
            Reply::Fail(_) | Reply::Hang => {}
        }
        self
    }

    /// Replaces the body with `chunks`, each delivered as its own event.
    pub fn with_chunks<I, C>(mut self, new_chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        if let Reply::Response { chunks, .. } = &mut self.reply {
            *chunks = new_chunks.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Fails with `error` after the response and body instead of finishing.
    pub fn then_fail(mut self, kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        if let Reply::Response { then_fail, .. } = &mut self.reply {
            *then_fail = Some(NetworkError::new(kind, message));
        }
        self
    }

    /// Delay before each event, measured by the runner's clock.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

enum Event {
    SendData(u64, u64),
    Redirect(Url, ResponseHeaders),
    Response(ResponseHeaders),
    Data(Vec<u8>),
    Finish,
    Fail(NetworkError),
}

struct InFlight {
    handle: RequestHandle,
    client: Rc<dyn NetworkBackendClient>,
    cancelled: Cell<bool>,
    latency: Duration,
    events: RefCell<VecDeque<Event>>,
    registry: Weak<Registry>,
}

impl InFlight {
    /// Stops further events and forgets the request.
    fn finish(&self) {
        self.cancelled.set(true);
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(&self.handle);
        }
    }
}

/// Backend that serves registered fixtures through a [`TaskRunner`], one
/// event per task.
pub struct InMemoryBackend {
    runner: Weak<TaskRunner>,
    fixtures: RefCell<HashMap<Url, Fixture>>,
    method_fixtures: RefCell<HashMap<(String, Url), Fixture>>,
    dispatched: RefCell<Vec<Request>>,
    in_flight: Rc<Registry>,
    next_handle: Cell<u64>,
}

impl InMemoryBackend {
    pub fn new(runner: &Rc<TaskRunner>) -> Self {
        Self {
            runner: Rc::downgrade(runner),
            fixtures: RefCell::new(HashMap::new()),
            method_fixtures: RefCell::new(HashMap::new()),
            dispatched: RefCell::new(Vec::new()),
            in_flight: Rc::new(RefCell::new(HashMap::new())),
            next_handle: Cell::new(1),
        }
    }

    /// Serves `fixture` for every method requesting `url`.
    pub fn register(&self, url: Url, fixture: Fixture) {
        self.fixtures.borrow_mut().insert(strip_fragment(url), fixture);
    }

    /// Serves `fixture` only for `method`; takes precedence over [`Self::register`].
    pub fn register_for_method(&self, method: &str, url: Url, fixture: Fixture) {
        self.method_fixtures
            .borrow_mut()
            .insert((method.to_ascii_uppercase(), strip_fragment(url)), fixture);
    }

    /// Every request dispatched so far, in order.
    pub fn dispatched(&self) -> Vec<Request> {
        self.dispatched.borrow().clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched.borrow().len()
    }

    /// Requests still producing events.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.borrow().len()
    }

    fn fixture_for(&self, request: &Request) -> Option<Fixture> {
        let url = strip_fragment(request.url().clone());
        let by_method = self
            .method_fixtures
            .borrow()
            .get(&(request.method().to_ascii_uppercase(), url.clone()))
            .cloned();
        by_method.or_else(|| self.fixtures.borrow().get(&url).cloned())
    }

    fn events_for(request: &Request, fixture: Option<Fixture>) -> VecDeque<Event> {
        let mut events = VecDeque::new();
        if let Some(body) = request.body() {
            let total = body.len() as u64;
            events.push_back(Event::SendData(total, total));
        }

        let Some(fixture) = fixture else {
            events.push_back(Event::Fail(NetworkError::new(
                NetworkErrorKind::NameNotResolved,
                format!("net::ERR_NAME_NOT_RESOLVED {}", request.url()),
            )));
            return events;
        };

        match fixture.reply {
            Reply::Response {
                status,
                status_text,
                headers,
                chunks,
                then_fail,
            } => {
                let response = ResponseHeaders::new(request.url().clone(), status)
                    .with_status_text(status_text)
                    .with_headers(headers);
                events.push_back(Event::Response(response));
                events.extend(chunks.into_iter().map(Event::Data));
                events.push_back(match then_fail {
                    Some(error) => Event::Fail(error),
                    None => Event::Finish,
                });
            }
            Reply::Redirect {
                status,
                location,
                mut headers,
            } => match request.url().join(&location) {
                Ok(new_url) => {
                    headers.set(header::LOCATION, location);
                    let response = ResponseHeaders::new(request.url().clone(), status)
                        .with_headers(headers);
                    events.push_back(Event::Redirect(new_url, response));
                }
                Err(error) => {
                    events.push_back(Event::Fail(NetworkError::new(
                        NetworkErrorKind::Protocol,
                        format!("invalid redirect location {location:?}: {error}"),
                    )));
                }
            },
            Reply::Fail(error) => events.push_back(Event::Fail(error)),
            Reply::Hang => {}
        }

        events
    }
}

type Registry = RefCell<HashMap<RequestHandle, Rc<InFlight>>>;

fn schedule(runner: &Rc<TaskRunner>, flight: Rc<InFlight>) {
    let latency = flight.latency;
    let weak = Rc::downgrade(runner);
    let task = move || deliver(&weak, flight);
    if latency.is_zero() {
        runner.post(task);
    } else {
        runner.post_delayed(latency, task);
    }
}

fn deliver(runner: &Weak<TaskRunner>, flight: Rc<InFlight>) {
    if flight.cancelled.get() {
        return;
    }

    let event = flight.events.borrow_mut().pop_front();
    let Some(event) = event else {
        return;
    };

    let handle = flight.handle;
    let terminal = matches!(event, Event::Redirect(..) | Event::Finish | Event::Fail(_));
    if terminal {
        flight.finish();
    }

    match event {
        Event::SendData(sent, total) => flight.client.on_send_data(handle, sent, total),
        Event::Redirect(new_url, response) => flight.client.on_redirect(handle, new_url, response),
        Event::Response(response) => flight.client.on_response(handle, response),
        Event::Data(data) => flight.client.on_data(handle, &data),
        Event::Finish => {
            let finish_time = match runner.upgrade() {
                Some(runner) => runner.now(),
                None => Instant::now(),
            };
            flight.client.on_finish(handle, finish_time);
        }
        Event::Fail(error) => flight.client.on_fail(handle, error),
    }

    if terminal || flight.cancelled.get() {
        return;
    }

    if let Some(runner) = runner.upgrade() {
        schedule(&runner, flight);
    }
}

impl NetworkBackend for InMemoryBackend {
    fn dispatch(&self, request: Request, client: Rc<dyn NetworkBackendClient>) -> RequestHandle {
        let handle = RequestHandle::new(self.next_handle.get());
        self.next_handle.set(handle.value() + 1);

        let fixture = self.fixture_for(&request);
        tracing::debug!(%handle, method = request.method(), url = %request.url(), "dispatch");
        let latency = fixture
            .as_ref()
            .map_or(Duration::ZERO, |fixture| fixture.latency);
        let events = Self::events_for(&request, fixture);
        self.dispatched.borrow_mut().push(request);

        let flight = Rc::new(InFlight {
            handle,
            client,
            cancelled: Cell::new(false),
            latency,
            events: RefCell::new(events),
            registry: Rc::downgrade(&self.in_flight),
        });
        self.in_flight
            .borrow_mut()
            .insert(handle, Rc::clone(&flight));

        match self.runner.upgrade() {
            Some(runner) => schedule(&runner, flight),
            None => tracing::warn!(%handle, "dispatch after the task runner was dropped"),
        }
        handle
    }

    fn cancel(&self, handle: RequestHandle) {
        let removed = self.in_flight.borrow_mut().remove(&handle);
        if let Some(flight) = removed {
            tracing::trace!(%handle, "cancel");
            flight.finish();
        }
    }
}

fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

#[cfg(test)]
#[path = "memory_backend_test.rs"]
mod memory_backend_test;
