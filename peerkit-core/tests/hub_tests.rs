//! Lifecycle tests for the shared engine hub
//!
//! A recording engine stands in for the media engine so construction,
//! destruction and the threads they run on can be observed.

use parking_lot::Mutex;
use peerkit_core::*;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Debug, Default)]
struct Counters {
    audio_built: AtomicUsize,
    audio_dropped: AtomicUsize,
    factories_built: AtomicUsize,
    crypto_initialized: AtomicUsize,
    crypto_cleaned: AtomicUsize,
    audio_build_threads: Mutex<Vec<String>>,
    audio_drop_threads: Mutex<Vec<String>>,
    teardown_events: Mutex<Vec<&'static str>>,
}

impl Counters {
    fn record(&self, event: &'static str) {
        self.teardown_events.lock().push(event);
    }
}

fn current_thread_name() -> String {
    thread::current().name().unwrap_or("<unnamed>").to_string()
}

#[derive(Debug)]
struct RecordingAudio {
    layer: AudioLayer,
    counters: Arc<Counters>,
    _buffer_queue: TaskQueue,
}

impl AudioDeviceModule for RecordingAudio {
    fn audio_layer(&self) -> AudioLayer {
        self.layer
    }

    fn playout_devices(&self) -> Vec<String> {
        vec!["test speaker".to_string()]
    }

    fn recording_devices(&self) -> Vec<String> {
        vec!["test microphone".to_string()]
    }
}

impl Drop for RecordingAudio {
    fn drop(&mut self) {
        self.counters.audio_dropped.fetch_add(1, Ordering::SeqCst);
        self.counters
            .audio_drop_threads
            .lock()
            .push(current_thread_name());
        self.counters.record("audio destroyed");
    }
}

#[derive(Debug)]
struct NamedCodecs {
    kind: MediaKind,
    direction: CodecDirection,
    names: Vec<&'static str>,
}

impl CodecFactory for NamedCodecs {
    fn media_kind(&self) -> MediaKind {
        self.kind
    }

    fn direction(&self) -> CodecDirection {
        self.direction
    }

    fn codec_names(&self) -> Vec<String> {
        self.names.iter().map(|name| name.to_string()).collect()
    }
}

fn codecs(
    kind: MediaKind,
    direction: CodecDirection,
    names: &[&'static str],
) -> Arc<dyn CodecFactory> {
    Arc::new(NamedCodecs {
        kind,
        direction,
        names: names.to_vec(),
    })
}

#[derive(Debug)]
struct RecordingFactory {
    dependencies: FactoryDependencies,
    counters: Arc<Counters>,
}

impl Drop for RecordingFactory {
    fn drop(&mut self) {
        self.counters.record("factory dropped");
    }
}

#[derive(Debug, Default)]
struct RecordingEngine {
    counters: Arc<Counters>,
    refuse_factory: bool,
    hardware_encoder: bool,
    process_crypto: bool,
}

impl MediaEngine for RecordingEngine {
    type Factory = RecordingFactory;

    fn create_audio_device_module(
        &self,
        layer: AudioLayer,
        task_queue_factory: &TaskQueueFactory,
    ) -> PeerKitResult<Arc<dyn AudioDeviceModule>> {
        self.counters.audio_built.fetch_add(1, Ordering::SeqCst);
        self.counters
            .audio_build_threads
            .lock()
            .push(current_thread_name());

        let buffer_queue = task_queue_factory.create_task_queue("AudioDeviceBuffer")?;
        Ok(Arc::new(RecordingAudio {
            layer,
            counters: Arc::clone(&self.counters),
            _buffer_queue: buffer_queue,
        }))
    }

    fn builtin_codec_factories(&self) -> CodecFactories {
        CodecFactories::builtin(
            codecs(MediaKind::Audio, CodecDirection::Encode, &["opus"]),
            codecs(MediaKind::Audio, CodecDirection::Decode, &["opus"]),
            codecs(MediaKind::Video, CodecDirection::Encode, &["VP8", "H264"]),
            codecs(MediaKind::Video, CodecDirection::Decode, &["VP8", "H264"]),
        )
    }

    fn hardware_video_encoder_factory(&self) -> Option<Arc<dyn CodecFactory>> {
        if self.hardware_encoder {
            Some(codecs(MediaKind::Video, CodecDirection::Encode, &["H264"]))
        } else {
            None
        }
    }

    fn create_factory(&self, dependencies: FactoryDependencies) -> Option<Arc<RecordingFactory>> {
        if self.refuse_factory {
            return None;
        }
        self.counters.factories_built.fetch_add(1, Ordering::SeqCst);
        Some(Arc::new(RecordingFactory {
            dependencies,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn initialize_crypto(&self) -> PeerKitResult<()> {
        self.counters.crypto_initialized.fetch_add(1, Ordering::SeqCst);
        if self.process_crypto {
            crypto::initialize()?;
        }
        Ok(())
    }

    fn cleanup_crypto(&self) {
        self.counters.crypto_cleaned.fetch_add(1, Ordering::SeqCst);
        if self.process_crypto {
            crypto::cleanup();
        }
        self.counters.record("crypto cleaned up");
    }
}

// Records an event when the owning context thread exits
struct ExitMarker {
    event: &'static str,
    counters: Arc<Counters>,
}

impl Drop for ExitMarker {
    fn drop(&mut self) {
        self.counters.record(self.event);
    }
}

thread_local! {
    static EXIT_MARKER: RefCell<Option<ExitMarker>> = const { RefCell::new(None) };
}

fn mark_exit(context: &ContextHandle, event: &'static str, counters: &Arc<Counters>) {
    let marker = ExitMarker {
        event,
        counters: Arc::clone(counters),
    };
    context
        .blocking_call(move || EXIT_MARKER.with(|slot| *slot.borrow_mut() = Some(marker)))
        .unwrap();
}

fn test_hub(prefix: &str) -> (EngineHub<RecordingEngine>, Arc<Counters>) {
    let engine = RecordingEngine::default();
    let counters = Arc::clone(&engine.counters);
    let config = EngineConfig::headless().with_thread_prefix(prefix);
    (EngineHub::new(engine, config), counters)
}

#[test]
fn test_idle_hub_has_nothing_running() {
    let (hub, counters) = test_hub("idle-");

    assert_eq!(hub.references(), 0);
    assert!(hub.try_engine_factory().is_none());
    assert!(hub.contexts().is_none());
    assert!(hub.audio_device_module().is_none());
    assert_eq!(counters.factories_built.load(Ordering::SeqCst), 0);
}

#[test]
fn test_first_acquire_builds_runtime() {
    let (hub, counters) = test_hub("first-");

    let shared = hub.acquire();
    let contexts = shared.contexts();

    assert_eq!(hub.references(), 1);
    assert_eq!(counters.audio_built.load(Ordering::SeqCst), 1);
    assert_eq!(counters.factories_built.load(Ordering::SeqCst), 1);
    assert_eq!(counters.crypto_initialized.load(Ordering::SeqCst), 1);

    assert_eq!(contexts.worker.name(), "first-worker_thread");
    assert_eq!(contexts.signaling.name(), "first-signaling_thread");
    assert_eq!(contexts.network.name(), "first-network_thread");
    assert!(contexts.worker.is_running());
    assert!(contexts.signaling.is_running());
    assert!(contexts.network.is_running());

    assert!(contexts.network.socket_server().is_some());
    assert!(contexts.worker.socket_server().is_none());
    assert!(contexts.signaling.socket_server().is_none());

    assert_eq!(
        counters.audio_build_threads.lock().as_slice(),
        ["first-worker_thread".to_string()]
    );
}

#[test]
fn test_second_acquire_reuses_runtime() {
    let (hub, counters) = test_hub("reuse-");

    let first = hub.acquire();
    let second = hub.acquire();

    assert_eq!(hub.references(), 2);
    assert!(Arc::ptr_eq(&first.engine_factory(), &second.engine_factory()));
    assert_eq!(first.contexts().worker.id(), second.contexts().worker.id());
    assert_eq!(first.contexts().signaling.id(), second.contexts().signaling.id());
    assert_eq!(first.contexts().network.id(), second.contexts().network.id());

    assert_eq!(counters.audio_built.load(Ordering::SeqCst), 1);
    assert_eq!(counters.factories_built.load(Ordering::SeqCst), 1);
    assert_eq!(counters.crypto_initialized.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cloned_reference_counts_as_acquire() {
    let (hub, _counters) = test_hub("clone-");

    let shared = hub.acquire();
    let cloned = shared.clone();
    assert_eq!(hub.references(), 2);

    cloned.release();
    assert_eq!(hub.references(), 1);
    assert!(shared.contexts().worker.is_running());
}

#[test]
fn test_final_release_tears_down_runtime() {
    let (hub, counters) = test_hub("teardown-");

    let first = hub.acquire();
    let second = hub.acquire();
    let contexts = first.contexts();

    drop(first);
    assert_eq!(hub.references(), 1);
    assert!(contexts.worker.is_running());
    assert_eq!(counters.audio_dropped.load(Ordering::SeqCst), 0);
    assert_eq!(counters.crypto_cleaned.load(Ordering::SeqCst), 0);

    second.release();
    assert_eq!(hub.references(), 0);
    assert!(!contexts.worker.is_running());
    assert!(!contexts.signaling.is_running());
    assert!(!contexts.network.is_running());
    assert!(hub.try_engine_factory().is_none());
    assert!(hub.audio_device_module().is_none());

    assert_eq!(counters.audio_dropped.load(Ordering::SeqCst), 1);
    assert_eq!(counters.crypto_cleaned.load(Ordering::SeqCst), 1);
    assert_eq!(
        counters.audio_drop_threads.lock().as_slice(),
        ["teardown-worker_thread".to_string()]
    );
}

#[test]
fn test_reacquire_builds_fresh_runtime() {
    let (hub, counters) = test_hub("fresh-");

    let first = hub.acquire();
    let old_contexts = first.contexts();
    let old_factory = first.engine_factory();
    drop(first);

    let second = hub.acquire();
    let new_contexts = second.contexts();

    assert_ne!(old_contexts.worker.id(), new_contexts.worker.id());
    assert_ne!(old_contexts.signaling.id(), new_contexts.signaling.id());
    assert_ne!(old_contexts.network.id(), new_contexts.network.id());
    assert!(!Arc::ptr_eq(&old_factory, &second.engine_factory()));
    assert!(new_contexts.worker.is_running());

    assert_eq!(counters.factories_built.load(Ordering::SeqCst), 2);
    assert_eq!(counters.crypto_initialized.load(Ordering::SeqCst), 2);
    assert_eq!(counters.crypto_cleaned.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_acquire_constructs_once() {
    const THREADS: usize = 8;
    let (hub, counters) = test_hub("conc-");
    let all_acquired = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let hub = hub.clone();
            let all_acquired = Arc::clone(&all_acquired);
            thread::spawn(move || {
                let shared = hub.acquire();
                assert!(shared.contexts().worker.is_running());
                all_acquired.wait();
                assert!(hub.try_engine_factory().is_some());
                shared.release();
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(hub.references(), 0);
    assert_eq!(counters.factories_built.load(Ordering::SeqCst), 1);
    assert_eq!(counters.audio_built.load(Ordering::SeqCst), 1);
    assert_eq!(counters.audio_dropped.load(Ordering::SeqCst), 1);
    assert_eq!(counters.crypto_initialized.load(Ordering::SeqCst), 1);
    assert_eq!(counters.crypto_cleaned.load(Ordering::SeqCst), 1);
}

#[test]
fn test_manual_retain_and_release() {
    let (hub, counters) = test_hub("manual-");

    let factory = hub.retain();
    let again = hub.retain();
    assert!(Arc::ptr_eq(&factory, &again));
    assert!(Arc::ptr_eq(&factory, &hub.engine_factory()));
    drop((factory, again));

    hub.release();
    assert_eq!(hub.references(), 1);
    hub.release();
    assert_eq!(hub.references(), 0);
    assert_eq!(counters.crypto_cleaned.load(Ordering::SeqCst), 1);
}

#[test]
#[should_panic(expected = "without a matching acquire")]
fn test_release_underflow_panics() {
    let (hub, _counters) = test_hub("underflow-");
    hub.release();
}

#[test]
#[should_panic(expected = "unreferenced")]
fn test_engine_factory_while_unreferenced_panics() {
    let (hub, _counters) = test_hub("unref-");
    let _ = hub.engine_factory();
}

#[test]
#[should_panic(expected = "fatal shared engine startup fault")]
fn test_missing_factory_is_fatal() {
    let engine = RecordingEngine {
        refuse_factory: true,
        ..RecordingEngine::default()
    };
    let hub = EngineHub::new(engine, EngineConfig::headless().with_thread_prefix("nofactory-"));
    let _shared = hub.acquire();
}

#[test]
fn test_factory_receives_runtime_dependencies() {
    let (hub, _counters) = test_hub("deps-");

    let shared = hub.acquire();
    let contexts = shared.contexts();
    let dependencies = &shared.factory().dependencies;

    assert_eq!(dependencies.worker.id(), contexts.worker.id());
    assert_eq!(dependencies.signaling.id(), contexts.signaling.id());
    assert_eq!(dependencies.network.id(), contexts.network.id());
    assert_eq!(dependencies.audio_device_module.audio_layer(), AudioLayer::Dummy);

    let module = hub.audio_device_module().unwrap();
    assert!(Arc::ptr_eq(&module, &dependencies.audio_device_module));

    assert_eq!(dependencies.codecs.audio_encoder.codec_names(), vec!["opus"]);
    assert_eq!(dependencies.codecs.video_decoder.direction(), CodecDirection::Decode);
    assert!(dependencies.codecs.hardware_video_encoder.is_none());
    assert!(dependencies.codecs.hardware_video_decoder.is_none());
}

#[test]
fn test_hardware_extension_slot_is_injected() {
    let engine = RecordingEngine {
        hardware_encoder: true,
        ..RecordingEngine::default()
    };
    let hub = EngineHub::new(engine, EngineConfig::headless().with_thread_prefix("hw-"));

    let shared = hub.acquire();
    let codecs = &shared.factory().dependencies.codecs;

    let hardware = codecs.hardware_video_encoder.as_ref().unwrap();
    assert_eq!(hardware.codec_names(), vec!["H264"]);
    assert!(codecs.hardware_video_decoder.is_none());
}

#[test]
fn test_signaling_can_block_on_worker() {
    let (hub, _counters) = test_hub("cross-");

    let shared = hub.acquire();
    let contexts = shared.contexts();
    let worker = contexts.worker.clone();

    let ran_on = contexts
        .signaling
        .blocking_call(move || worker.blocking_call(current_thread_name))
        .unwrap()
        .unwrap();

    assert_eq!(ran_on, "cross-worker_thread");
}

#[test]
fn test_teardown_order() {
    let (hub, counters) = test_hub("order-");

    let shared = hub.acquire();
    let contexts = shared.contexts();
    mark_exit(&contexts.worker, "worker stopped", &counters);
    mark_exit(&contexts.signaling, "signaling stopped", &counters);
    mark_exit(&contexts.network, "network stopped", &counters);
    assert!(counters.teardown_events.lock().is_empty());

    shared.release();

    assert_eq!(
        counters.teardown_events.lock().as_slice(),
        [
            "factory dropped",
            "audio destroyed",
            "worker stopped",
            "signaling stopped",
            "network stopped",
            "crypto cleaned up",
        ]
    );
}

// the only test in this file touching the process-wide crypto counters
#[test]
fn test_crypto_stays_active_while_any_hub_is_referenced() {
    let first = EngineHub::new(
        RecordingEngine {
            process_crypto: true,
            ..RecordingEngine::default()
        },
        EngineConfig::headless().with_thread_prefix("crypto-a-"),
    );
    let second = EngineHub::new(
        RecordingEngine {
            process_crypto: true,
            ..RecordingEngine::default()
        },
        EngineConfig::headless().with_thread_prefix("crypto-b-"),
    );

    let a = first.acquire();
    let b = second.acquire();
    assert_eq!(crypto::active_initializations(), 2);

    a.release();
    assert_eq!(first.references(), 0);
    assert_eq!(second.references(), 1);
    assert!(crypto::is_active());

    b.release();
    assert!(!crypto::is_active());
}
