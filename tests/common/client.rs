#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;
use threadable_loader::{
    ErrorKind, LoadError, Loader, Request, ResourceTiming, ResponseHeaders,
    ThreadableLoaderClient,
};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    WillFollowRedirect(Url),
    SendData(u64, u64),
    Response(u16),
    Data(Vec<u8>),
    Timing { allowed: bool, redirects: u32 },
    Finish,
    Fail(ErrorKind, String),
    AccessControlFail(String),
    RedirectCheckFail,
}

impl ClientEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClientEvent::Finish
                | ClientEvent::Fail(..)
                | ClientEvent::AccessControlFail(_)
                | ClientEvent::RedirectCheckFail
        )
    }

    /// Compact form used by order-sensitive assertions and snapshots.
    pub fn label(&self) -> String {
        match self {
            ClientEvent::WillFollowRedirect(url) => format!("redirect to {}", url.path()),
            ClientEvent::SendData(sent, total) => format!("sent {sent} of {total}"),
            ClientEvent::Response(status) => format!("response {status}"),
            ClientEvent::Data(data) => format!("data {}", String::from_utf8_lossy(data)),
            ClientEvent::Timing { allowed, redirects } => {
                format!("timing allowed {allowed} after {redirects} redirects")
            }
            ClientEvent::Finish => "finish".to_string(),
            ClientEvent::Fail(kind, _) => format!("fail {kind:?}"),
            ClientEvent::AccessControlFail(_) => "access control failure".to_string(),
            ClientEvent::RedirectCheckFail => "redirect check failure".to_string(),
        }
    }
}

/// When the recording client calls back into its loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    CancelOnResponse,
    CancelOnData,
    CancelOnTerminal,
    DeferOnResponse,
    RefuseRedirects,
}

#[derive(Default)]
pub struct RecordingClient {
    events: RefCell<Vec<ClientEvent>>,
    responses: RefCell<Vec<ResponseHeaders>>,
    reactions: RefCell<Vec<Reaction>>,
    loader: RefCell<Option<Rc<dyn Loader>>>,
    callbacks_after_terminal: Cell<usize>,
}

impl RecordingClient {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_reaction(reaction: Reaction) -> Rc<Self> {
        let client = Self::new();
        client.reactions.borrow_mut().push(reaction);
        client
    }

    /// Lets reactions reach the loader. Forms a cycle that ends once a
    /// terminal callback releases the client.
    pub fn attach(&self, loader: Rc<dyn Loader>) {
        *self.loader.borrow_mut() = Some(loader);
    }

    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.borrow().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.borrow().iter().map(ClientEvent::label).collect()
    }

    /// Response headers exactly as delivered to the client.
    pub fn last_response(&self) -> Option<ResponseHeaders> {
        self.responses.borrow().last().cloned()
    }

    pub fn take(&self) -> Vec<ClientEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn is_done(&self) -> bool {
        self.events.borrow().iter().any(ClientEvent::is_terminal)
    }

    pub fn has_events(&self) -> bool {
        !self.events.borrow().is_empty()
    }

    pub fn terminal_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.is_terminal())
            .count()
    }

    pub fn callbacks_after_terminal(&self) -> usize {
        self.callbacks_after_terminal.get()
    }

    pub fn body(&self) -> Vec<u8> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ClientEvent::Data(data) => Some(data.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    fn reacts(&self, reaction: Reaction) -> bool {
        self.reactions.borrow().contains(&reaction)
    }

    fn loader(&self) -> Option<Rc<dyn Loader>> {
        self.loader.borrow().clone()
    }

    fn record(&self, event: ClientEvent) {
        if self.is_done() {
            self.callbacks_after_terminal
                .set(self.callbacks_after_terminal.get() + 1);
        }
        self.events.borrow_mut().push(event);
    }

    fn cancel_if(&self, reaction: Reaction) {
        if self.reacts(reaction)
            && let Some(loader) = self.loader()
        {
            loader.cancel();
        }
    }
}

impl ThreadableLoaderClient for RecordingClient {
    fn will_follow_redirect(&self, new_request: &Request, _: &ResponseHeaders) -> bool {
        self.record(ClientEvent::WillFollowRedirect(new_request.url().clone()));
        !self.reacts(Reaction::RefuseRedirects)
    }

    fn did_send_data(&self, bytes_sent: u64, total_bytes: u64) {
        self.record(ClientEvent::SendData(bytes_sent, total_bytes));
    }

    fn did_receive_response(&self, response: &ResponseHeaders) {
        self.record(ClientEvent::Response(response.status()));
        self.responses.borrow_mut().push(response.clone());
        if self.reacts(Reaction::DeferOnResponse)
            && let Some(loader) = self.loader()
        {
            loader.set_defers_loading(true);
        }
        self.cancel_if(Reaction::CancelOnResponse);
    }

    fn did_receive_data(&self, data: &[u8]) {
        self.record(ClientEvent::Data(data.to_vec()));
        self.cancel_if(Reaction::CancelOnData);
    }

    fn did_receive_resource_timing(&self, timing: &ResourceTiming) {
        self.record(ClientEvent::Timing {
            allowed: timing.timing_allow_passed,
            redirects: timing.redirect_count,
        });
    }

    fn did_finish_loading(&self, _: Instant) {
        self.record(ClientEvent::Finish);
        self.cancel_if(Reaction::CancelOnTerminal);
    }

    fn did_fail(&self, error: &LoadError) {
        self.record(ClientEvent::Fail(error.kind, error.message.clone()));
        self.cancel_if(Reaction::CancelOnTerminal);
    }

    fn did_fail_access_control_check(&self, error: &LoadError) {
        self.record(ClientEvent::AccessControlFail(error.message.clone()));
        self.cancel_if(Reaction::CancelOnTerminal);
    }

    fn did_fail_redirect_check(&self) {
        self.record(ClientEvent::RedirectCheckFail);
        self.cancel_if(Reaction::CancelOnTerminal);
    }
}
