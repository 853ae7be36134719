use crate::clock::Clock;
use crate::error::BridgeError;
use crate::scope::ThreadScope;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

type LocalTask = Box<dyn FnOnce()>;

/// A task posted from another thread. It receives the runner it executes on.
pub type RemoteTask = Box<dyn FnOnce(&TaskRunner) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Single-threaded task queue owned by one thread.
///
/// Local tasks run in FIFO order; delayed tasks run once the clock reaches
/// their deadline, ties broken by scheduling order. Other threads reach the
/// runner through a [`RemoteRunner`].
pub struct TaskRunner {
    thread: ThreadId,
    clock: Arc<dyn Clock>,
    tasks: RefCell<VecDeque<LocalTask>>,
    timers: RefCell<BTreeMap<(Instant, TimerHandle), LocalTask>>,
    next_timer_handle: Cell<u64>,
    inbox: Receiver<RemoteTask>,
    sender: Sender<RemoteTask>,
    quit: Arc<AtomicBool>,
    scope: ThreadScope,
}

impl TaskRunner {
    /// Creates a runner bound to the calling thread.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (sender, inbox) = unbounded();
        Self {
            thread: thread::current().id(),
            clock,
            tasks: RefCell::new(VecDeque::new()),
            timers: RefCell::new(BTreeMap::new()),
            next_timer_handle: Cell::new(1),
            inbox,
            sender,
            quit: Arc::new(AtomicBool::new(false)),
            scope: ThreadScope::new(),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn scope(&self) -> &ThreadScope {
        &self.scope
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    pub fn is_current_thread(&self) -> bool {
        thread::current().id() == self.thread
    }

    pub fn post(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn post_delayed(&self, delay: Duration, task: impl FnOnce() + 'static) -> TimerHandle {
        let handle = TimerHandle(self.next_timer_handle.get());
        self.next_timer_handle.set(handle.0 + 1);

        let deadline = self.clock.now() + delay;
        self.timers
            .borrow_mut()
            .insert((deadline, handle), Box::new(task));
        handle
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel_timer(&self, handle: TimerHandle) -> bool {
        let mut timers = self.timers.borrow_mut();
        let key = timers.keys().find(|(_, candidate)| *candidate == handle).copied();
        match key {
            Some(key) => timers.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn remote(&self) -> RemoteRunner {
        RemoteRunner {
            sender: self.sender.clone(),
            thread: self.thread,
            quit: Arc::clone(&self.quit),
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.borrow().len() + self.inbox.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.borrow().keys().next().map(|(deadline, _)| *deadline)
    }

    /// Runs a single ready task: a remote one first, then a local one, then
    /// the earliest due timer. Returns false when nothing was ready.
    pub fn run_one(&self) -> bool {
        match self.inbox.try_recv() {
            Ok(task) => {
                task(self);
                return true;
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
        }

        let local = self.tasks.borrow_mut().pop_front();
        if let Some(task) = local {
            task();
            return true;
        }

        let due = self.pop_due_timer();
        if let Some(task) = due {
            task();
            return true;
        }

        false
    }

    /// Runs tasks until none is ready. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }

    /// Runs tasks, waiting for remote ones, until `done` holds or `timeout`
    /// elapses in real time. Returns whether `done` held.
    pub fn run_until<F>(&self, timeout: Duration, mut done: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let give_up = Instant::now() + timeout;
        loop {
            if done() {
                return true;
            }
            if self.run_one() {
                continue;
            }

            let now = Instant::now();
            if now >= give_up {
                return false;
            }
            let wait = self.wait_duration().map_or(give_up - now, |wait| wait.min(give_up - now));
            if !self.wait_for_remote(wait) {
                return done();
            }
        }
    }

    /// Runs until [`RemoteRunner::quit`] is called, sleeping while idle.
    pub fn run(&self) {
        while !self.quit.load(Ordering::Acquire) {
            if self.run_one() {
                continue;
            }

            let received = match self.wait_duration() {
                Some(wait) => match self.inbox.recv_timeout(wait) {
                    Ok(task) => Some(task),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match self.inbox.recv() {
                    Ok(task) => Some(task),
                    Err(_) => break,
                },
            };

            if let Some(task) = received {
                task(self);
            }
        }
        tracing::debug!(thread = ?self.thread, "task runner stopped");
    }

    /// Discards every pending task and timer and clears the scope.
    pub fn shutdown(&self) {
        self.quit.store(true, Ordering::Release);
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        let timers = std::mem::take(&mut *self.timers.borrow_mut());
        let remote: Vec<RemoteTask> = self.inbox.try_iter().collect();
        drop(tasks);
        drop(timers);
        drop(remote);
        self.scope.clear();
    }

    fn pop_due_timer(&self) -> Option<LocalTask> {
        let now = self.clock.now();
        let mut timers = self.timers.borrow_mut();
        let key = timers.keys().next().copied()?;
        if key.0 > now {
            return None;
        }
        timers.remove(&key)
    }

    fn wait_duration(&self) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(self.clock.now()))
    }

    fn wait_for_remote(&self, wait: Duration) -> bool {
        match self.inbox.recv_timeout(wait) {
            Ok(task) => {
                task(self);
                true
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("thread", &self.thread)
            .field("tasks", &self.tasks.borrow().len())
            .field("timers", &self.timers.borrow().len())
            .finish()
    }
}

/// Sendable handle used to post work onto a [`TaskRunner`] from any thread.
#[derive(Clone)]
pub struct RemoteRunner {
    sender: Sender<RemoteTask>,
    thread: ThreadId,
    quit: Arc<AtomicBool>,
}

impl RemoteRunner {
    /// Fails with [`BridgeError::LoaderThreadGone`] once the runner is dropped.
    pub fn post(&self, task: impl FnOnce(&TaskRunner) + Send + 'static) -> Result<(), BridgeError> {
        self.sender
            .send(Box::new(task))
            .map_err(|_| BridgeError::LoaderThreadGone)
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    pub fn is_current_thread(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Asks [`TaskRunner::run`] to return after its current task.
    pub fn quit(&self) {
        self.quit.store(true, Ordering::Release);
        let _ = self.sender.send(Box::new(|_| {}));
    }
}

impl fmt::Debug for RemoteRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteRunner")
            .field("thread", &self.thread)
            .finish()
    }
}

#[cfg(test)]
#[path = "task_runner_test.rs"]
mod task_runner_test;
