#![allow(dead_code)]

use super::client::RecordingClient;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use threadable_loader::{
    CrossOriginRequestPolicy, Fixture, InMemoryBackend, Loader, LoaderThread, LoadingContext,
    ManualClock, NetworkBackend, PreflightPolicy, Request, RequestOptions, SecurityOrigin,
    SystemClock, TaskRunner, ThreadableLoader, WorkerThreadBridge,
};
use tracing_subscriber::EnvFilter;
use url::Url;

pub const DOCUMENT_ORIGIN: &str = "http://document.test";

/// Routes loader logs to the test output; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn url(value: &str) -> Url {
    Url::parse(value).expect("valid test url")
}

pub fn origin(value: &str) -> SecurityOrigin {
    SecurityOrigin::parse(value).expect("valid test origin")
}

#[derive(Default)]
pub struct OptionsBuilder {
    options: RequestOptions,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_cross_origin(mut self) -> Self {
        self.options.cross_origin_request_policy = CrossOriginRequestPolicy::Deny;
        self
    }

    pub fn allow_cross_origin(mut self) -> Self {
        self.options.cross_origin_request_policy = CrossOriginRequestPolicy::Allow;
        self
    }

    pub fn preflight(mut self, policy: PreflightPolicy) -> Self {
        self.options.preflight_policy = policy;
        self
    }

    pub fn credentials(mut self, enabled: bool) -> Self {
        self.options.allow_credentials = enabled;
        self
    }

    pub fn cors_redirect_limit(mut self, limit: u32) -> Self {
        self.options.cors_redirect_limit = limit;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn expose_all_headers(mut self, enabled: bool) -> Self {
        self.options.expose_all_response_headers = enabled;
        self
    }

    pub fn untrusted(mut self, enabled: bool) -> Self {
        self.options.untrusted_http = enabled;
        self
    }

    pub fn build(self) -> RequestOptions {
        self.options
    }
}

pub fn options() -> OptionsBuilder {
    OptionsBuilder::new()
}

/// A document thread: runner on a manual clock, in-memory backend and a
/// loading context for one origin.
pub struct DocumentHarness {
    pub clock: Arc<ManualClock>,
    pub runner: Rc<TaskRunner>,
    pub backend: Rc<InMemoryBackend>,
    pub context: LoadingContext,
}

impl DocumentHarness {
    pub fn new(origin: SecurityOrigin) -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new());
        let runner = Rc::new(TaskRunner::new(clock.clone()));
        let backend = Rc::new(InMemoryBackend::new(&runner));
        let context = LoadingContext::new(origin, backend.clone(), runner.clone());
        Self {
            clock,
            runner,
            backend,
            context,
        }
    }

    pub fn for_origin(value: &str) -> Self {
        Self::new(origin(value))
    }

    pub fn opaque() -> Self {
        Self::new(SecurityOrigin::opaque())
    }

    pub fn register(&self, target: &str, fixture: Fixture) -> &Self {
        self.backend.register(url(target), fixture);
        self
    }

    pub fn register_for_method(&self, method: &str, target: &str, fixture: Fixture) -> &Self {
        self.backend.register_for_method(method, url(target), fixture);
        self
    }

    pub fn loader(&self, options: RequestOptions) -> (ThreadableLoader, Rc<RecordingClient>) {
        self.loader_with(RecordingClient::new(), options)
    }

    /// Builds a loader the client can reach from its callbacks.
    pub fn loader_with(
        &self,
        client: Rc<RecordingClient>,
        options: RequestOptions,
    ) -> (ThreadableLoader, Rc<RecordingClient>) {
        let loader = ThreadableLoader::new(&self.context, client.clone(), options)
            .expect("valid request options");
        client.attach(Rc::new(loader.clone()));
        (loader, client)
    }

    pub fn run(&self) -> usize {
        self.runner.run_until_idle()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
        self.runner.run_until_idle();
    }

    /// Starts `request`, runs to idle and returns the recorded client.
    pub fn load(&self, request: Request, options: RequestOptions) -> Rc<RecordingClient> {
        let (loader, client) = self.loader(options);
        loader.start(request);
        self.run();
        client
    }
}

pub type FixtureSet = Vec<(&'static str, Option<&'static str>, Fixture)>;

/// Spawns a loader thread whose backend serves `fixtures`. Each entry is
/// `(url, method, fixture)`; `None` serves every method.
pub fn spawn_loader_thread(origin_value: &str, fixtures: FixtureSet) -> LoaderThread {
    LoaderThread::spawn("document", origin(origin_value), move |runner| {
        let backend = InMemoryBackend::new(runner);
        for (target, method, fixture) in fixtures {
            match method {
                Some(method) => backend.register_for_method(method, url(target), fixture),
                None => backend.register(url(target), fixture),
            }
        }
        let backend: Rc<dyn NetworkBackend> = Rc::new(backend);
        backend
    })
    .expect("loader thread starts")
}

/// The worker side of a bridged load.
pub struct WorkerHarness {
    pub runner: Rc<TaskRunner>,
    pub thread: LoaderThread,
}

impl WorkerHarness {
    pub const WAIT: Duration = Duration::from_secs(5);

    pub fn new(origin_value: &str, fixtures: FixtureSet) -> Self {
        init_tracing();
        Self {
            runner: Rc::new(TaskRunner::new(Arc::new(SystemClock))),
            thread: spawn_loader_thread(origin_value, fixtures),
        }
    }

    pub fn bridge(&self, options: RequestOptions) -> (Rc<WorkerThreadBridge>, Rc<RecordingClient>) {
        self.bridge_with(RecordingClient::new(), options)
    }

    pub fn bridge_with(
        &self,
        client: Rc<RecordingClient>,
        options: RequestOptions,
    ) -> (Rc<WorkerThreadBridge>, Rc<RecordingClient>) {
        let bridge = WorkerThreadBridge::create(
            &self.runner,
            self.thread.remote(),
            client.clone(),
            options,
        )
        .expect("bridge created");
        let bridge = Rc::new(bridge);
        client.attach(bridge.clone());
        (bridge, client)
    }

    /// Runs the worker until `client` has seen a terminal callback.
    pub fn run_until_done(&self, client: &RecordingClient) -> bool {
        self.runner.run_until(Self::WAIT, || client.is_done())
    }

    /// Keeps the worker running for `duration` to flush stray events.
    pub fn settle(&self, duration: Duration) {
        self.runner.run_until(duration, || false);
    }

    /// Loaders still registered on the loader thread.
    pub fn remote_loader_count(&self) -> usize {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.thread
            .remote()
            .post(move |runner| {
                let _ = tx.send(runner.scope().len());
            })
            .expect("loader thread running");
        rx.recv_timeout(Self::WAIT).expect("loader thread answers")
    }
}
