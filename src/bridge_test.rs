use super::*;
use crate::backend::NetworkBackend;
use crate::memory_backend::{Fixture, InMemoryBackend};
use crate::options::CrossOriginRequestPolicy;
use crate::options::ValidationError;
use std::cell::Cell;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<String>>,
    finished: Cell<bool>,
}

impl Recorder {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    fn has_events(&self) -> bool {
        !self.events.borrow().is_empty()
    }

    fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }

    fn terminal(&self, event: String) {
        self.push(event);
        self.finished.set(true);
    }
}

impl ThreadableLoaderClient for Recorder {
    fn will_follow_redirect(&self, _: &Request, _: &ResponseHeaders) -> bool {
        self.push("will-follow-redirect".to_string());
        true
    }

    fn did_receive_response(&self, response: &ResponseHeaders) {
        self.push(format!("response {}", response.status()));
    }

    fn did_receive_data(&self, data: &[u8]) {
        self.push(format!("data {}", String::from_utf8_lossy(data)));
    }

    fn did_finish_loading(&self, _: Instant) {
        self.terminal("finish".to_string());
    }

    fn did_fail(&self, error: &LoadError) {
        self.terminal(format!("fail {:?}: {}", error.kind, error.message));
    }

    fn did_fail_access_control_check(&self, error: &LoadError) {
        self.terminal(format!("access-control: {}", error.message));
    }

    fn did_fail_redirect_check(&self) {
        self.terminal("redirect-check".to_string());
    }
}

fn url(value: &str) -> Url {
    Url::parse(value).expect("valid test url")
}

fn spawn_loader_thread(fixtures: Vec<(&'static str, Fixture)>) -> LoaderThread {
    let origin = SecurityOrigin::parse("http://a.test").expect("valid test origin");
    LoaderThread::spawn("loader", origin, move |runner| {
        let backend = InMemoryBackend::new(runner);
        for (target, fixture) in fixtures {
            backend.register(url(target), fixture);
        }
        let backend: Rc<dyn NetworkBackend> = Rc::new(backend);
        backend
    })
    .expect("loader thread starts")
}

fn worker_runner() -> Rc<TaskRunner> {
    Rc::new(TaskRunner::new(Arc::new(SystemClock)))
}

fn bridge(
    worker: &Rc<TaskRunner>,
    thread: &LoaderThread,
    options: RequestOptions,
) -> (WorkerThreadBridge, Rc<Recorder>) {
    let client = Rc::new(Recorder::default());
    let bridge = WorkerThreadBridge::create(worker, thread.remote(), client.clone(), options)
        .expect("bridge created");
    (bridge, client)
}

mod create {
    use super::*;

    #[test]
    fn should_fail_given_loader_on_same_thread() {
        let worker = worker_runner();

        let result = WorkerThreadBridge::create(
            &worker,
            &worker.remote(),
            Rc::new(Recorder::default()),
            RequestOptions::default(),
        );

        assert_eq!(result.err(), Some(BridgeError::SameThread));
    }

    #[test]
    fn should_reject_invalid_options() {
        let worker = worker_runner();
        let thread = spawn_loader_thread(Vec::new());
        let options = RequestOptions {
            timeout: Some(Duration::ZERO),
            ..RequestOptions::default()
        };

        let result = WorkerThreadBridge::create(
            &worker,
            thread.remote(),
            Rc::new(Recorder::default()),
            options,
        );

        assert_eq!(
            result.err(),
            Some(BridgeError::InvalidOptions(ValidationError::ZeroTimeout))
        );
    }

    #[test]
    fn should_fail_given_loader_thread_gone() {
        let worker = worker_runner();
        let thread = spawn_loader_thread(Vec::new());
        let remote = thread.remote().clone();
        thread.shutdown();

        let result = WorkerThreadBridge::create(
            &worker,
            &remote,
            Rc::new(Recorder::default()),
            RequestOptions::default(),
        );

        assert_eq!(result.err(), Some(BridgeError::LoaderThreadGone));
    }
}

mod start {
    use super::*;

    #[test]
    fn should_relay_events_in_order() {
        // Arrange
        let worker = worker_runner();
        let thread = spawn_loader_thread(vec![(
            "http://a.test/ok",
            Fixture::status(200, "OK").with_chunks(["a", "b", "c"]),
        )]);
        let (bridge, client) = bridge(&worker, &thread, RequestOptions::default());

        // Act
        bridge.start(Request::get(url("http://a.test/ok")));
        let done = worker.run_until(WAIT, || client.finished.get());

        // Assert
        assert!(done);
        assert_eq!(
            client.take(),
            vec!["response 200", "data a", "data b", "data c", "finish"]
        );
        assert!(!bridge.is_active());
    }

    #[test]
    fn should_follow_redirects_without_asking_worker_client() {
        let worker = worker_runner();
        let thread = spawn_loader_thread(vec![
            ("http://a.test/from", Fixture::redirect(302, "/to")),
            ("http://a.test/to", Fixture::ok("fox")),
        ]);
        let (bridge, client) = bridge(&worker, &thread, RequestOptions::default());

        bridge.start(Request::get(url("http://a.test/from")));
        worker.run_until(WAIT, || client.finished.get());

        assert_eq!(client.take(), vec!["response 200", "data fox", "finish"]);
    }

    #[test]
    fn should_deliver_policy_failure_through_worker_queue() {
        let worker = worker_runner();
        let thread = spawn_loader_thread(Vec::new());
        let options = RequestOptions {
            cross_origin_request_policy: CrossOriginRequestPolicy::Deny,
            ..RequestOptions::default()
        };
        let (bridge, client) = bridge(&worker, &thread, options);

        bridge.start(Request::get(url("http://b.test/")));
        let before_running = client.take();
        worker.run_until(WAIT, || client.finished.get());

        assert!(before_running.is_empty());
        assert_eq!(
            client.take(),
            vec!["fail PolicyDenied: Cross origin requests are not supported."]
        );
    }

    #[test]
    fn should_fail_with_loader_gone_given_thread_stopped() {
        let worker = worker_runner();
        let thread = spawn_loader_thread(Vec::new());
        let (bridge, client) = bridge(&worker, &thread, RequestOptions::default());
        thread.shutdown();

        bridge.start(Request::get(url("http://a.test/ok")));

        assert_eq!(
            client.take(),
            vec!["fail Network(Aborted): The loader thread is gone."]
        );
        assert!(!bridge.is_active());
    }
}

mod cancel {
    use super::*;

    #[test]
    fn should_report_cancellation_after_loader_teardown() {
        let worker = worker_runner();
        let thread = spawn_loader_thread(vec![("http://a.test/hang", Fixture::hang())]);
        let (bridge, client) = bridge(&worker, &thread, RequestOptions::default());
        bridge.start(Request::get(url("http://a.test/hang")));

        bridge.cancel();
        worker.run_until_idle();
        bridge.cancel();

        assert_eq!(client.take(), vec!["fail Cancelled: Load cancelled."]);
        assert!(!bridge.is_active());
    }

    #[test]
    fn should_drop_relayed_events_queued_before_cancel() {
        // Arrange
        let worker = worker_runner();
        let thread = spawn_loader_thread(vec![(
            "http://a.test/ok",
            Fixture::status(200, "OK").with_chunks(["a", "b", "c"]),
        )]);
        let (bridge, client) = bridge(&worker, &thread, RequestOptions::default());
        bridge.start(Request::get(url("http://a.test/ok")));
        assert!(worker.run_until(WAIT, || client.has_events()));

        // Act
        bridge.cancel();
        worker.run_until(Duration::from_millis(50), || false);

        // Assert
        assert_eq!(
            client.take(),
            vec!["response 200", "fail Cancelled: Load cancelled."]
        );
    }

    #[test]
    fn should_detach_silently_given_clear_loader() {
        let worker = worker_runner();
        let thread = spawn_loader_thread(vec![("http://a.test/hang", Fixture::hang())]);
        let (bridge, client) = bridge(&worker, &thread, RequestOptions::default());
        bridge.start(Request::get(url("http://a.test/hang")));

        bridge.clear_loader();
        bridge.cancel();
        worker.run_until_idle();

        assert!(client.take().is_empty());
        assert!(!bridge.is_active());
    }
}

mod set_defers_loading {
    use super::*;

    #[test]
    fn should_hold_events_on_loader_thread_until_resumed() {
        let worker = worker_runner();
        let thread = spawn_loader_thread(vec![("http://a.test/ok", Fixture::ok("fox"))]);
        let (bridge, client) = bridge(&worker, &thread, RequestOptions::default());

        bridge.set_defers_loading(true);
        bridge.start(Request::get(url("http://a.test/ok")));
        worker.run_until(Duration::from_millis(50), || false);
        let while_deferred = client.take();
        bridge.set_defers_loading(false);
        worker.run_until(WAIT, || client.finished.get());

        assert!(while_deferred.is_empty());
        assert_eq!(client.take(), vec!["response 200", "data fox", "finish"]);
    }
}

mod override_timeout {
    use super::*;

    #[test]
    fn should_time_out_on_loader_thread() {
        let worker = worker_runner();
        let thread = spawn_loader_thread(vec![("http://a.test/hang", Fixture::hang())]);
        let (bridge, client) = bridge(&worker, &thread, RequestOptions::default());
        bridge.start(Request::get(url("http://a.test/hang")));

        bridge.override_timeout(Duration::from_millis(20));
        worker.run_until(WAIT, || client.finished.get());

        assert_eq!(client.take(), vec!["fail TimedOut: Load timed out."]);
    }
}
