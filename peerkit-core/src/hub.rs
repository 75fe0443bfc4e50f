//! Reference-counted shared engine runtime
//!
//! An [`EngineHub`] owns at most one running engine: the worker, signaling
//! and network execution contexts, the audio device module and the engine's
//! session factory. The first acquire builds it, the last release tears it
//! down, and both transitions run under the hub lock so no acquirer ever
//! sees a half-built runtime.
//!
//! Startup faults are not recoverable: a runtime with some contexts running
//! and others missing cannot be used safely, so they are logged and raised as
//! panics (release builds abort on panic).

use crate::config::EngineConfig;
use crate::context::{ContextHandle, ContextKind, ExecutionContext};
use crate::engine::{AudioDeviceModule, FactoryDependencies, MediaEngine};
use crate::error::{PeerKitError, PeerKitResult};
use crate::task_queue::TaskQueueFactory;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Non-owning handles to the three engine execution contexts
#[derive(Debug, Clone)]
pub struct EngineContexts {
    /// Worker context
    pub worker: ContextHandle,
    /// Signaling context
    pub signaling: ContextHandle,
    /// Network context
    pub network: ContextHandle,
}

struct EngineRuntime<E: MediaEngine> {
    worker: ExecutionContext,
    signaling: ExecutionContext,
    network: ExecutionContext,
    task_queue_factory: Option<TaskQueueFactory>,
    audio_device_module: Option<Arc<dyn AudioDeviceModule>>,
    factory: Option<Arc<E::Factory>>,
}

impl<E: MediaEngine> EngineRuntime<E> {
    fn start(engine: &Arc<E>, config: &EngineConfig) -> PeerKitResult<Self> {
        let worker = ExecutionContext::start(&config.worker_thread_name, ContextKind::Plain)?;
        let signaling = ExecutionContext::start(&config.signaling_thread_name, ContextKind::Plain)?;
        let network =
            ExecutionContext::start(&config.network_thread_name, ContextKind::SocketServer)?;

        let mut runtime = Self {
            worker,
            signaling,
            network,
            task_queue_factory: None,
            audio_device_module: None,
            factory: None,
        };

        if runtime.audio_device_module.is_none() {
            let task_queue_factory = TaskQueueFactory::new();
            let queues = task_queue_factory.clone();
            let audio_engine = Arc::clone(engine);
            let layer = config.audio_layer;

            let module = runtime
                .worker
                .blocking_call(move || audio_engine.create_audio_device_module(layer, &queues))??;
            debug!(layer = ?module.audio_layer(), "Built audio device module on worker context");

            runtime.task_queue_factory = Some(task_queue_factory);
            runtime.audio_device_module = Some(module);
        }

        if runtime.factory.is_none() {
            let audio_device_module = runtime.audio_device_module.clone().ok_or_else(|| {
                PeerKitError::AudioDevice {
                    reason: "no audio device module to build the engine factory with".to_string(),
                }
            })?;

            let codecs = engine.builtin_codec_factories().with_hardware(
                engine.hardware_video_encoder_factory(),
                engine.hardware_video_decoder_factory(),
            );

            let dependencies = FactoryDependencies {
                network: runtime.network.handle(),
                worker: runtime.worker.handle(),
                signaling: runtime.signaling.handle(),
                audio_device_module,
                codecs,
            };

            let factory =
                engine
                    .create_factory(dependencies)
                    .ok_or_else(|| PeerKitError::FactoryCreation {
                        reason: "media engine returned no session factory".to_string(),
                    })?;
            runtime.factory = Some(factory);
        }

        Ok(runtime)
    }

    fn contexts(&self) -> EngineContexts {
        EngineContexts {
            worker: self.worker.handle(),
            signaling: self.signaling.handle(),
            network: self.network.handle(),
        }
    }
}

impl<E: MediaEngine> Drop for EngineRuntime<E> {
    fn drop(&mut self) {
        self.factory = None;

        if let Some(module) = self.audio_device_module.take() {
            if let Err(e) = self.worker.blocking_call(move || drop(module)) {
                warn!(error = %e, "Audio device module was not destroyed on the worker context");
            } else {
                debug!("Destroyed audio device module on worker context");
            }
        }

        self.worker.stop();
        self.signaling.stop();
        self.network.stop();
        self.task_queue_factory = None;
    }
}

struct HubState<E: MediaEngine> {
    references: usize,
    runtime: Option<EngineRuntime<E>>,
}

struct HubInner<E: MediaEngine> {
    engine: Arc<E>,
    config: EngineConfig,
    state: Mutex<HubState<E>>,
}

/// Owner of one lazily built, reference-counted engine runtime
pub struct EngineHub<E: MediaEngine> {
    inner: Arc<HubInner<E>>,
}

impl<E: MediaEngine> Clone for EngineHub<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: MediaEngine> EngineHub<E> {
    /// Create an idle hub; nothing starts until the first acquire
    pub fn new(engine: E, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                engine: Arc::new(engine),
                config,
                state: Mutex::new(HubState {
                    references: 0,
                    runtime: None,
                }),
            }),
        }
    }

    /// The media engine this hub builds runtimes with
    pub fn engine(&self) -> &E {
        &self.inner.engine
    }

    /// The runtime configuration
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Take a scoped reference to the shared engine, building it if needed
    ///
    /// # Panics
    ///
    /// Panics on a startup fault (a context failing to start, audio module
    /// or factory construction failing, crypto initialization failing).
    pub fn acquire(&self) -> SharedEngine<E> {
        let factory = self.retain();
        SharedEngine {
            hub: self.clone(),
            factory: Some(factory),
        }
    }

    /// Manual acquire; every call must be paired with [`EngineHub::release`]
    ///
    /// # Panics
    ///
    /// Panics on a startup fault, like [`EngineHub::acquire`].
    pub fn retain(&self) -> Arc<E::Factory> {
        let mut state = self.inner.state.lock();

        if state.references == 0 {
            info!(
                worker = %self.inner.config.worker_thread_name,
                signaling = %self.inner.config.signaling_thread_name,
                network = %self.inner.config.network_thread_name,
                "Building shared engine runtime"
            );

            let runtime = EngineRuntime::start(&self.inner.engine, &self.inner.config)
                .unwrap_or_else(|err| startup_fault(err));
            if let Err(err) = self.inner.engine.initialize_crypto() {
                startup_fault(err);
            }
            state.runtime = Some(runtime);
        }

        state.references += 1;
        trace!(references = state.references, "Shared engine acquired");
        factory_of(&*state)
    }

    /// Manual release; tears the runtime down when the last reference goes
    ///
    /// # Panics
    ///
    /// Panics when called more often than [`EngineHub::retain`].
    pub fn release(&self) {
        let mut state = self.inner.state.lock();
        assert!(
            state.references > 0,
            "EngineHub::release called without a matching acquire"
        );

        state.references -= 1;
        trace!(references = state.references, "Shared engine released");

        if state.references == 0 {
            info!("Tearing down shared engine runtime");
            drop(state.runtime.take());
            self.inner.engine.cleanup_crypto();
        }
    }

    /// The engine's session factory
    ///
    /// # Panics
    ///
    /// Panics when the hub holds no references.
    pub fn engine_factory(&self) -> Arc<E::Factory> {
        let state = self.inner.state.lock();
        factory_of(&*state)
    }

    /// The engine's session factory, if the hub is referenced
    pub fn try_engine_factory(&self) -> Option<Arc<E::Factory>> {
        let state = self.inner.state.lock();
        state
            .runtime
            .as_ref()
            .and_then(|runtime| runtime.factory.clone())
    }

    /// Current reference count
    pub fn references(&self) -> usize {
        self.inner.state.lock().references
    }

    /// Handles to the running contexts, if the hub is referenced
    pub fn contexts(&self) -> Option<EngineContexts> {
        self.inner
            .state
            .lock()
            .runtime
            .as_ref()
            .map(EngineRuntime::contexts)
    }

    /// The running audio device module, if the hub is referenced
    pub fn audio_device_module(&self) -> Option<Arc<dyn AudioDeviceModule>> {
        self.inner
            .state
            .lock()
            .runtime
            .as_ref()
            .and_then(|runtime| runtime.audio_device_module.clone())
    }
}

impl<E: MediaEngine> fmt::Debug for EngineHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHub")
            .field("config", &self.inner.config)
            .field("references", &self.references())
            .finish()
    }
}

/// A counted reference to the shared engine; releases on drop
///
/// Factory handles obtained from [`SharedEngine::engine_factory`] keep the
/// factory object alive on their own; drop them before the last reference
/// so the audio device module is destroyed on the worker context.
pub struct SharedEngine<E: MediaEngine> {
    hub: EngineHub<E>,
    // only empty while dropping
    factory: Option<Arc<E::Factory>>,
}

impl<E: MediaEngine> SharedEngine<E> {
    /// The engine's session factory
    pub fn engine_factory(&self) -> Arc<E::Factory> {
        Arc::clone(self.held_factory())
    }

    /// Borrow the engine's session factory
    pub fn factory(&self) -> &E::Factory {
        self.held_factory()
    }

    fn held_factory(&self) -> &Arc<E::Factory> {
        match &self.factory {
            Some(factory) => factory,
            None => unreachable!("shared engine reference used during drop"),
        }
    }

    /// Handles to the three engine contexts
    pub fn contexts(&self) -> EngineContexts {
        match self.hub.contexts() {
            Some(contexts) => contexts,
            None => panic!("shared engine reference outlived its runtime"),
        }
    }

    /// The hub this reference belongs to
    pub fn hub(&self) -> &EngineHub<E> {
        &self.hub
    }

    /// Release this reference explicitly
    pub fn release(self) {
        drop(self);
    }
}

impl<E: MediaEngine> Clone for SharedEngine<E> {
    fn clone(&self) -> Self {
        self.hub.acquire()
    }
}

impl<E: MediaEngine> Drop for SharedEngine<E> {
    fn drop(&mut self) {
        // our own factory handle must not outlive the runtime teardown
        self.factory = None;
        self.hub.release();
    }
}

impl<E: MediaEngine> fmt::Debug for SharedEngine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedEngine").field("hub", &self.hub).finish()
    }
}

fn factory_of<E: MediaEngine>(state: &HubState<E>) -> Arc<E::Factory> {
    match state
        .runtime
        .as_ref()
        .and_then(|runtime| runtime.factory.as_ref())
    {
        Some(factory) => Arc::clone(factory),
        None => panic!("engine factory requested while the shared engine is unreferenced"),
    }
}

fn startup_fault(err: PeerKitError) -> ! {
    error!(error = %err, code = %err.error_code(), "Fatal shared engine startup fault");
    panic!("fatal shared engine startup fault: {}", err);
}
