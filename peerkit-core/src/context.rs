//! Execution contexts
//!
//! An [`ExecutionContext`] is a dedicated, named OS thread with its own run
//! loop. Work is submitted as closures through a [`ContextHandle`], either
//! fire-and-forget ([`ContextHandle::post`]) or synchronously
//! ([`ContextHandle::blocking_call`]), in which case the caller is suspended
//! until the context has run the closure.
//!
//! Every context drives a single-threaded tokio runtime. Contexts started
//! with [`ContextKind::SocketServer`] also enable the I/O driver, so socket
//! work can be spawned onto them through [`SocketServer`].

use crate::error::{PeerKitError, PeerKitResult};
use futures::channel::oneshot;
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tokio::runtime::{Builder, Handle};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Quit,
}

/// Process-unique identity of a started execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Capabilities of an execution context's run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Task queue only
    Plain,
    /// Task queue plus an I/O reactor for sockets
    SocketServer,
}

#[derive(Debug)]
struct ContextState {
    running: AtomicBool,
    accepting: AtomicBool,
}

impl ContextState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            accepting: AtomicBool::new(true),
        }
    }
}

/// Non-owning handle used to submit work to an execution context
#[derive(Clone)]
pub struct ContextHandle {
    id: ContextId,
    name: Arc<str>,
    kind: ContextKind,
    thread_id: ThreadId,
    sender: mpsc::UnboundedSender<Message>,
    runtime: Handle,
    state: Arc<ContextState>,
}

impl ContextHandle {
    /// Identity of the context
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Thread name of the context
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capabilities of the context
    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Whether the context's run loop is still alive
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Whether the calling thread is this context's thread
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Queue a task behind all previously submitted work
    pub fn post<F>(&self, task: F) -> PeerKitResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.state.accepting.load(Ordering::SeqCst) {
            return Err(self.stopped());
        }

        self.sender
            .send(Message::Run(Box::new(task)))
            .map_err(|_| self.stopped())
    }

    /// Run `task` on the context and wait for its result
    ///
    /// Called from the context's own thread the task runs inline, so a
    /// context can never deadlock on itself.
    pub fn blocking_call<F, R>(&self, task: F) -> PeerKitResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Ok(task());
        }

        let (done_tx, done_rx) = oneshot::channel();
        self.post(move || {
            let _ = done_tx.send(task());
        })?;

        futures::executor::block_on(done_rx).map_err(|_| PeerKitError::TaskAborted {
            context: self.name.to_string(),
        })
    }

    /// Socket-serving capability, present only on [`ContextKind::SocketServer`] contexts
    pub fn socket_server(&self) -> Option<SocketServer> {
        match self.kind {
            ContextKind::SocketServer => Some(SocketServer {
                context: Arc::clone(&self.name),
                runtime: self.runtime.clone(),
            }),
            ContextKind::Plain => None,
        }
    }

    fn stopped(&self) -> PeerKitError {
        PeerKitError::ContextStopped {
            context: self.name.to_string(),
        }
    }
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Spawns async socket work onto a network context's reactor
#[derive(Debug, Clone)]
pub struct SocketServer {
    context: Arc<str>,
    runtime: Handle,
}

impl SocketServer {
    /// Name of the owning context
    pub fn context_name(&self) -> &str {
        &self.context
    }

    /// Spawn a future onto the context's reactor
    pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// The underlying runtime handle
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

/// An owned, running execution context
///
/// Dropping the context stops it.
pub struct ExecutionContext {
    handle: ContextHandle,
    thread: Option<JoinHandle<()>>,
}

impl ExecutionContext {
    /// Spawn the context's thread and wait until its run loop is ready
    pub fn start(name: &str, kind: ContextKind) -> PeerKitResult<Self> {
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(ContextState::new());
        let (ready_tx, ready_rx) = oneshot::channel();

        let loop_name = name.to_string();
        let loop_state = Arc::clone(&state);
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_loop(loop_name, kind, receiver, loop_state, ready_tx))
            .map_err(|e| PeerKitError::ContextStart {
                context: name.to_string(),
                reason: e.to_string(),
            })?;

        let runtime = match futures::executor::block_on(ready_rx) {
            Ok(Ok(runtime)) => runtime,
            Ok(Err(reason)) => {
                let _ = thread.join();
                return Err(PeerKitError::ContextStart {
                    context: name.to_string(),
                    reason,
                });
            }
            Err(_) => {
                let _ = thread.join();
                return Err(PeerKitError::ContextStart {
                    context: name.to_string(),
                    reason: "thread exited during startup".to_string(),
                });
            }
        };

        debug!(context = %name, id = %id, ?kind, "Started execution context");

        Ok(Self {
            handle: ContextHandle {
                id,
                name: Arc::from(name),
                kind,
                thread_id: thread.thread().id(),
                sender,
                runtime,
                state,
            },
            thread: Some(thread),
        })
    }

    /// A non-owning handle to this context
    pub fn handle(&self) -> ContextHandle {
        self.handle.clone()
    }

    /// Stop the run loop after all previously queued work and join the thread
    ///
    /// Idempotent. Tasks posted after this call are rejected.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.handle.state.accepting.store(false, Ordering::SeqCst);
        let _ = self.handle.sender.send(Message::Quit);

        if self.handle.is_current() {
            // joining ourselves would never return
            warn!(
                context = %self.handle.name,
                "Execution context stopped from its own thread, detaching"
            );
            return;
        }

        if thread.join().is_err() {
            error!(context = %self.handle.name, "Execution context thread panicked");
        }
        debug!(context = %self.handle.name, id = %self.handle.id, "Stopped execution context");
    }
}

impl Deref for ExecutionContext {
    type Target = ContextHandle;

    fn deref(&self) -> &ContextHandle {
        &self.handle
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("handle", &self.handle)
            .field("joined", &self.thread.is_none())
            .finish()
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    name: String,
    kind: ContextKind,
    mut receiver: mpsc::UnboundedReceiver<Message>,
    state: Arc<ContextState>,
    ready: oneshot::Sender<Result<Handle, String>>,
) {
    let mut builder = Builder::new_current_thread();
    builder.enable_time();
    if kind == ContextKind::SocketServer {
        builder.enable_io();
    }

    let runtime = match builder.build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(format!("failed to build run loop: {}", e)));
            return;
        }
    };

    state.running.store(true, Ordering::SeqCst);
    if ready.send(Ok(runtime.handle().clone())).is_err() {
        state.running.store(false, Ordering::SeqCst);
        return;
    }

    runtime.block_on(async {
        while let Some(message) = receiver.recv().await {
            match message {
                Message::Run(task) => {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        error!(context = %name, "Task panicked on execution context");
                    }
                }
                Message::Quit => break,
            }
        }
    });

    drop(runtime);
    state.running.store(false, Ordering::SeqCst);
    trace!(context = %name, "Run loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_post_runs_on_named_thread() {
        let context = assert_ok!(ExecutionContext::start("test_worker", ContextKind::Plain));

        let name = context
            .blocking_call(|| thread::current().name().map(str::to_string))
            .unwrap();

        assert_eq!(name.as_deref(), Some("test_worker"));
        assert!(context.is_running());
        assert!(!context.is_current());
    }

    #[test]
    fn test_stop_drains_queued_tasks() {
        let mut context = assert_ok!(ExecutionContext::start("test_drain", ContextKind::Plain));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            context
                .post(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        context.stop();

        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert!(!context.is_running());
    }

    #[test]
    fn test_post_after_stop_is_rejected() {
        let mut context = assert_ok!(ExecutionContext::start("test_stopped", ContextKind::Plain));
        let handle = context.handle();
        context.stop();

        let err = handle.post(|| {}).unwrap_err();
        assert_eq!(err.error_code(), "CONTEXT_STOPPED");
        assert_err!(handle.blocking_call(|| 1));
    }

    #[test]
    fn test_nested_blocking_call_runs_inline() {
        let context = assert_ok!(ExecutionContext::start("test_nested", ContextKind::Plain));
        let handle = context.handle();

        let value = context
            .blocking_call(move || handle.blocking_call(|| 7).unwrap() * 6)
            .unwrap();

        assert_eq!(value, 42);
    }

    #[test]
    fn test_panicking_task_does_not_kill_context() {
        let context = assert_ok!(ExecutionContext::start("test_panic", ContextKind::Plain));

        let result: PeerKitResult<()> = context.blocking_call(|| panic!("boom"));
        assert_eq!(result.unwrap_err().error_code(), "TASK_ABORTED");

        assert!(context.is_running());
        assert_eq!(context.blocking_call(|| "alive").unwrap(), "alive");
    }

    #[test]
    fn test_context_ids_are_unique() {
        let first = assert_ok!(ExecutionContext::start("test_id_a", ContextKind::Plain));
        let second = assert_ok!(ExecutionContext::start("test_id_a", ContextKind::Plain));

        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_only_socket_server_contexts_serve_sockets() {
        let plain = assert_ok!(ExecutionContext::start("test_plain", ContextKind::Plain));
        let network = assert_ok!(ExecutionContext::start(
            "test_network",
            ContextKind::SocketServer
        ));

        assert!(plain.socket_server().is_none());
        let server = network.socket_server().unwrap();
        assert_eq!(server.context_name(), "test_network");
    }

    #[tokio::test]
    async fn test_socket_server_binds_udp_socket() {
        let network = assert_ok!(ExecutionContext::start("test_udp", ContextKind::SocketServer));
        let server = network.socket_server().unwrap();

        let local_addr = server
            .spawn(async {
                let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await?;
                socket.local_addr()
            })
            .await
            .unwrap()
            .unwrap();

        assert!(local_addr.ip().is_loopback());
        assert_ne!(local_addr.port(), 0);
    }
}
