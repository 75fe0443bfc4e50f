//! Audio device modules
//!
//! Built on the engine's worker context. The platform module snapshots the
//! default cpal host's devices at construction; hosts without audio hardware
//! yield empty device lists rather than failing engine startup.

use cpal::traits::{DeviceTrait, HostTrait};
use peerkit_core::{AudioDeviceModule, AudioLayer, PeerKitResult, TaskQueue, TaskQueueFactory};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the task queue audio modules run device buffer work on
pub const AUDIO_DEVICE_BUFFER_QUEUE: &str = "AudioDeviceBuffer";

/// Audio device module over the platform's default cpal host
#[derive(Debug)]
pub struct PlatformAudioDevice {
    host: String,
    playout_devices: Vec<String>,
    recording_devices: Vec<String>,
    buffer_queue: TaskQueue,
}

impl PlatformAudioDevice {
    /// Open the default host and enumerate its devices
    pub fn new(task_queue_factory: &TaskQueueFactory) -> PeerKitResult<Self> {
        let buffer_queue = task_queue_factory.create_task_queue(AUDIO_DEVICE_BUFFER_QUEUE)?;
        let host = cpal::default_host();

        let playout_devices = match host.output_devices() {
            Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to enumerate playout devices");
                Vec::new()
            }
        };
        let recording_devices = match host.input_devices() {
            Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to enumerate recording devices");
                Vec::new()
            }
        };

        info!(
            host = host.id().name(),
            playout = playout_devices.len(),
            recording = recording_devices.len(),
            "Opened platform audio device module"
        );

        Ok(Self {
            host: host.id().name().to_string(),
            playout_devices,
            recording_devices,
            buffer_queue,
        })
    }

    /// Name of the cpal host in use
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The device buffer task queue
    pub fn buffer_queue(&self) -> &TaskQueue {
        &self.buffer_queue
    }
}

impl AudioDeviceModule for PlatformAudioDevice {
    fn audio_layer(&self) -> AudioLayer {
        AudioLayer::PlatformDefault
    }

    fn playout_devices(&self) -> Vec<String> {
        self.playout_devices.clone()
    }

    fn recording_devices(&self) -> Vec<String> {
        self.recording_devices.clone()
    }
}

/// Device-less audio module
#[derive(Debug)]
pub struct DummyAudioDevice {
    buffer_queue: TaskQueue,
}

impl DummyAudioDevice {
    /// Create a dummy module with its device buffer queue
    pub fn new(task_queue_factory: &TaskQueueFactory) -> PeerKitResult<Self> {
        let buffer_queue = task_queue_factory.create_task_queue(AUDIO_DEVICE_BUFFER_QUEUE)?;
        debug!("Opened dummy audio device module");
        Ok(Self { buffer_queue })
    }

    /// The device buffer task queue
    pub fn buffer_queue(&self) -> &TaskQueue {
        &self.buffer_queue
    }
}

impl AudioDeviceModule for DummyAudioDevice {
    fn audio_layer(&self) -> AudioLayer {
        AudioLayer::Dummy
    }

    fn playout_devices(&self) -> Vec<String> {
        Vec::new()
    }

    fn recording_devices(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Build the audio device module for `layer`
pub fn create_audio_device_module(
    layer: AudioLayer,
    task_queue_factory: &TaskQueueFactory,
) -> PeerKitResult<Arc<dyn AudioDeviceModule>> {
    let module: Arc<dyn AudioDeviceModule> = match layer {
        AudioLayer::PlatformDefault => Arc::new(PlatformAudioDevice::new(task_queue_factory)?),
        AudioLayer::Dummy => Arc::new(DummyAudioDevice::new(task_queue_factory)?),
    };
    Ok(module)
}
