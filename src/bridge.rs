//! Driving a loader that lives on another thread.
//!
//! A [`LoaderThread`] owns the document-side runner, backend and
//! [`LoadingContext`]. A [`WorkerThreadBridge`] lives on a worker thread and
//! fronts one [`ThreadableLoader`] on that loader thread: construction,
//! `start`, `cancel` and `clear_loader` block until the loader thread has
//! acted, and client callbacks are posted back to the worker in the order
//! the loader produced them.
//!
//! Neither side holds a pointer into the other. Each side registers its half
//! in its own [`ThreadScope`](crate::ThreadScope) under the bridge's
//! [`ObjectId`]; a task whose id is no longer registered is dropped.

use crate::backend::NetworkBackend;
use crate::client::{ResourceTiming, ThreadableLoaderClient};
use crate::clock::SystemClock;
use crate::error::{BridgeError, LoadError};
use crate::loader::{Loader, LoadingContext, ThreadableLoader};
use crate::options::RequestOptions;
use crate::origin::SecurityOrigin;
use crate::request::Request;
use crate::response::ResponseHeaders;
use crate::scope::ObjectId;
use crate::task_runner::{RemoteRunner, TaskRunner};
use crossbeam_channel::bounded;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use url::Url;

/// A dedicated thread running loaders for one origin.
pub struct LoaderThread {
    remote: RemoteRunner,
    join: Option<JoinHandle<()>>,
}

impl LoaderThread {
    /// Spawns the thread and waits until its runner accepts tasks.
    ///
    /// `make_backend` runs on the new thread, so the backend itself need not
    /// be `Send`.
    pub fn spawn<F>(
        name: impl Into<String>,
        origin: SecurityOrigin,
        make_backend: F,
    ) -> Result<Self, BridgeError>
    where
        F: FnOnce(&Rc<TaskRunner>) -> Rc<dyn NetworkBackend> + Send + 'static,
    {
        let name = name.into();
        let (ready_tx, ready_rx) = bounded(1);

        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let runner = Rc::new(TaskRunner::new(Arc::new(SystemClock)));
                let backend = make_backend(&runner);
                let context = LoadingContext::new(origin, backend, Rc::clone(&runner));
                runner.scope().set_global(Rc::new(context));

                if ready_tx.send(runner.remote()).is_err() {
                    runner.shutdown();
                    return;
                }

                runner.run();
                runner.shutdown();
            })
            .map_err(|error| {
                tracing::error!(thread = %name, %error, "failed to spawn loader thread");
                BridgeError::LoaderThreadGone
            })?;

        let remote = ready_rx.recv().map_err(|_| BridgeError::LoaderThreadGone)?;
        tracing::debug!(thread = %name, "loader thread started");

        Ok(Self {
            remote,
            join: Some(join),
        })
    }

    pub fn remote(&self) -> &RemoteRunner {
        &self.remote
    }

    /// Stops the runner and waits for the thread. Pending tasks are dropped,
    /// which releases any caller blocked on them.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        self.remote.quit();
        if join.join().is_err() {
            tracing::error!("loader thread panicked");
        }
    }
}

impl Drop for LoaderThread {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for LoaderThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderThread")
            .field("remote", &self.remote)
            .field("running", &self.join.is_some())
            .finish()
    }
}

/// A client callback carried from the loader thread to the worker.
enum RelayedEvent {
    SendData(u64, u64),
    Response(ResponseHeaders),
    Data(Vec<u8>),
    ResourceTiming(ResourceTiming),
    Finish(Instant),
    Fail(LoadError),
    AccessControlFail(LoadError),
    RedirectCheckFail,
    /// The loader was dropped on its thread before reaching a terminal event.
    LoaderGone,
}

impl RelayedEvent {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            RelayedEvent::Finish(_)
                | RelayedEvent::Fail(_)
                | RelayedEvent::AccessControlFail(_)
                | RelayedEvent::RedirectCheckFail
                | RelayedEvent::LoaderGone
        )
    }
}

/// Worker-side half: the real client, reachable only on the worker thread.
struct BridgeState {
    id: ObjectId,
    client: RefCell<Option<Rc<dyn ThreadableLoaderClient>>>,
    url: RefCell<Option<Url>>,
}

impl BridgeState {
    fn deliver(&self, event: RelayedEvent) {
        let client = if event.is_terminal() {
            self.client.borrow_mut().take()
        } else {
            self.client.borrow().clone()
        };
        let Some(client) = client else {
            tracing::trace!(bridge = %self.id, "event after teardown dropped");
            return;
        };

        match event {
            RelayedEvent::SendData(sent, total) => client.did_send_data(sent, total),
            RelayedEvent::Response(response) => client.did_receive_response(&response),
            RelayedEvent::Data(data) => client.did_receive_data(&data),
            RelayedEvent::ResourceTiming(timing) => client.did_receive_resource_timing(&timing),
            RelayedEvent::Finish(finish_time) => client.did_finish_loading(finish_time),
            RelayedEvent::Fail(error) => client.did_fail(&error),
            RelayedEvent::AccessControlFail(error) => client.did_fail_access_control_check(&error),
            RelayedEvent::RedirectCheckFail => client.did_fail_redirect_check(),
            RelayedEvent::LoaderGone => client.did_fail(&LoadError::loader_gone(self.current_url())),
        }
    }

    fn current_url(&self) -> Option<Url> {
        self.url.borrow().clone()
    }
}

fn deliver_on_worker(runner: &TaskRunner, id: ObjectId, event: RelayedEvent) {
    let Some(state) = runner.scope().get::<BridgeState>(id) else {
        tracing::trace!(bridge = %id, "event for released bridge dropped");
        return;
    };
    let terminal = event.is_terminal();
    state.deliver(event);
    if terminal {
        runner.scope().remove(id);
    }
}

/// Loader-thread half: the client handed to the real loader. Every callback
/// is posted to the worker unless the bridge has been torn down.
///
/// Dropped without having relayed a terminal event (the loader thread shut
/// down mid-load), it reports [`LoadError::loader_gone`] to the worker.
struct WorkerClientProxy {
    id: ObjectId,
    worker: RemoteRunner,
    loader_runner: Weak<TaskRunner>,
    detached: Arc<AtomicBool>,
    terminated: Cell<bool>,
}

impl WorkerClientProxy {
    fn relay(&self, event: RelayedEvent) {
        let terminal = event.is_terminal();
        if terminal {
            self.terminated.set(true);
            self.release_loader();
        }

        if self.detached.load(Ordering::Acquire) {
            tracing::trace!(bridge = %self.id, "bridge detached; event not relayed");
            return;
        }

        self.post_to_worker(event);
    }

    fn post_to_worker(&self, event: RelayedEvent) {
        let id = self.id;
        if self
            .worker
            .post(move |runner| deliver_on_worker(runner, id, event))
            .is_err()
        {
            tracing::debug!(bridge = %self.id, "worker thread gone; event not relayed");
        }
    }

    /// Forgets the finished loader on the loader thread.
    fn release_loader(&self) {
        if let Some(runner) = self.loader_runner.upgrade() {
            runner.scope().remove(self.id);
        }
    }
}

impl Drop for WorkerClientProxy {
    fn drop(&mut self) {
        if self.terminated.get() || self.detached.load(Ordering::Acquire) {
            return;
        }
        tracing::debug!(bridge = %self.id, "loader dropped before finishing");
        self.post_to_worker(RelayedEvent::LoaderGone);
    }
}

impl ThreadableLoaderClient for WorkerClientProxy {
    fn did_send_data(&self, bytes_sent: u64, total_bytes: u64) {
        self.relay(RelayedEvent::SendData(bytes_sent, total_bytes));
    }

    fn did_receive_response(&self, response: &ResponseHeaders) {
        self.relay(RelayedEvent::Response(response.clone()));
    }

    fn did_receive_data(&self, data: &[u8]) {
        self.relay(RelayedEvent::Data(data.to_vec()));
    }

    fn did_receive_resource_timing(&self, timing: &ResourceTiming) {
        self.relay(RelayedEvent::ResourceTiming(timing.clone()));
    }

    fn did_finish_loading(&self, finish_time: Instant) {
        self.relay(RelayedEvent::Finish(finish_time));
    }

    fn did_fail(&self, error: &LoadError) {
        self.relay(RelayedEvent::Fail(error.clone()));
    }

    fn did_fail_access_control_check(&self, error: &LoadError) {
        self.relay(RelayedEvent::AccessControlFail(error.clone()));
    }

    fn did_fail_redirect_check(&self) {
        self.relay(RelayedEvent::RedirectCheckFail);
    }
}

/// Fronts a [`ThreadableLoader`] on a [`LoaderThread`] for a client living
/// on the worker thread that created the bridge.
///
/// Redirects are followed without consulting the worker client; its
/// `will_follow_redirect` is never called.
pub struct WorkerThreadBridge {
    id: ObjectId,
    worker: Rc<TaskRunner>,
    loader_thread: RemoteRunner,
    state: Rc<BridgeState>,
    detached: Arc<AtomicBool>,
}

impl WorkerThreadBridge {
    /// Creates the loader on the loader thread and waits until it exists.
    pub fn create(
        worker: &Rc<TaskRunner>,
        loader_thread: &RemoteRunner,
        client: Rc<dyn ThreadableLoaderClient>,
        options: RequestOptions,
    ) -> Result<Self, BridgeError> {
        if loader_thread.is_current_thread() {
            return Err(BridgeError::SameThread);
        }
        debug_assert!(worker.is_current_thread(), "bridge created off its worker thread");
        options.validate()?;

        let id = ObjectId::next();
        let detached = Arc::new(AtomicBool::new(false));
        let proxy_detached = Arc::clone(&detached);
        let worker_remote = worker.remote();
        let (ack_tx, ack_rx) = bounded(1);

        loader_thread.post(move |runner| {
            let created = match runner.scope().global::<LoadingContext>() {
                Some(context) => {
                    let proxy = WorkerClientProxy {
                        id,
                        worker: worker_remote,
                        loader_runner: Rc::downgrade(context.runner()),
                        detached: proxy_detached,
                        terminated: Cell::new(false),
                    };
                    ThreadableLoader::new(&context, Rc::new(proxy), options)
                        .map(|loader| runner.scope().insert(id, Rc::new(loader)))
                        .map_err(BridgeError::from)
                }
                None => Err(BridgeError::LoaderThreadGone),
            };
            let _ = ack_tx.send(created);
        })?;

        ack_rx.recv().map_err(|_| BridgeError::LoaderThreadGone)??;

        let state = Rc::new(BridgeState {
            id,
            client: RefCell::new(Some(client)),
            url: RefCell::new(None),
        });
        worker.scope().insert(id, Rc::clone(&state));
        tracing::debug!(bridge = %id, "bridge created");

        Ok(Self {
            id,
            worker: Rc::clone(worker),
            loader_thread: loader_thread.clone(),
            state,
            detached,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Whether the client can still receive callbacks.
    pub fn is_active(&self) -> bool {
        self.state.client.borrow().is_some()
    }

    /// Runs `task` against the remote loader and blocks until it returns.
    fn call_blocking<F>(&self, task: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&TaskRunner, Option<Rc<ThreadableLoader>>) + Send + 'static,
    {
        let id = self.id;
        let (ack_tx, ack_rx) = bounded(1);
        self.loader_thread.post(move |runner| {
            let loader = runner.scope().get::<ThreadableLoader>(id);
            task(runner, loader);
            let _ = ack_tx.send(());
        })?;
        ack_rx.recv().map_err(|_| BridgeError::LoaderThreadGone)
    }

    fn post_to_loader<F>(&self, task: F)
    where
        F: FnOnce(&ThreadableLoader) + Send + 'static,
    {
        let id = self.id;
        let posted = self.loader_thread.post(move |runner| {
            if let Some(loader) = runner.scope().get::<ThreadableLoader>(id) {
                task(&loader);
            }
        });
        if posted.is_err() {
            tracing::debug!(bridge = %self.id, "loader thread gone");
        }
    }

    /// Tears down the remote loader and waits for it. The client receives
    /// nothing further.
    fn teardown_blocking(&self, cancel: bool) {
        self.detached.store(true, Ordering::Release);
        let id = self.id;
        let result = self.call_blocking(move |runner, loader| {
            if cancel && let Some(loader) = loader {
                loader.cancel();
            }
            runner.scope().remove(id);
        });
        if let Err(error) = result {
            tracing::debug!(bridge = %self.id, %error, "teardown without loader thread");
        }
        self.worker.scope().remove(self.id);
    }

    /// Detaches the client without a callback and drops the remote loader.
    pub fn clear_loader(&self) {
        let client = self.state.client.borrow_mut().take();
        if client.is_none() {
            return;
        }
        tracing::debug!(bridge = %self.id, "clear loader");
        self.teardown_blocking(false);
    }
}

impl Loader for WorkerThreadBridge {
    /// Blocks until the loader thread has started the load. If that thread
    /// is gone the client fails with [`LoadError::loader_gone`].
    fn start(&self, request: Request) {
        if !self.is_active() {
            return;
        }
        *self.state.url.borrow_mut() = Some(request.url().clone());

        let result = self.call_blocking(move |_, loader| {
            if let Some(loader) = loader {
                loader.start(request);
            }
        });

        if let Err(error) = result {
            tracing::warn!(bridge = %self.id, %error, "start failed");
            self.detached.store(true, Ordering::Release);
            self.worker.scope().remove(self.id);
            let client = self.state.client.borrow_mut().take();
            if let Some(client) = client {
                client.did_fail(&LoadError::loader_gone(self.state.current_url()));
            }
        }
    }

    /// Blocks until the loader thread has cancelled the load, then reports
    /// the cancellation. Events still in flight are dropped.
    fn cancel(&self) {
        let client = self.state.client.borrow_mut().take();
        let Some(client) = client else {
            return;
        };
        tracing::debug!(bridge = %self.id, "cancel");
        self.teardown_blocking(true);
        client.did_fail(&LoadError::cancelled(self.state.current_url()));
    }

    fn set_defers_loading(&self, defers: bool) {
        self.post_to_loader(move |loader| loader.set_defers_loading(defers));
    }

    fn override_timeout(&self, timeout: Duration) {
        self.post_to_loader(move |loader| loader.override_timeout(timeout));
    }
}

impl Drop for WorkerThreadBridge {
    fn drop(&mut self) {
        self.detached.store(true, Ordering::Release);
        self.worker.scope().remove(self.id);
        self.state.client.borrow_mut().take();

        let id = self.id;
        let _ = self.loader_thread.post(move |runner| {
            runner.scope().remove(id);
        });
    }
}

impl fmt::Debug for WorkerThreadBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerThreadBridge")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod bridge_test;
