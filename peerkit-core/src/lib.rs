//! # peerkit core
//!
//! Execution contexts and the reference-counted shared media-engine runtime.
//! This crate starts and stops the worker, signaling and network threads a
//! media engine needs, builds the engine's audio device module on the worker
//! thread, and shares one engine session factory across every caller.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod hub;
pub mod task_queue;

// Re-export main types
pub use config::{AudioLayer, EngineConfig};
pub use context::{ContextHandle, ContextId, ContextKind, ExecutionContext, SocketServer};
pub use crypto::CryptoStats;
pub use engine::{
    AudioDeviceModule, CodecDirection, CodecFactories, CodecFactory, FactoryDependencies,
    MediaEngine, MediaKind,
};
pub use error::{PeerKitError, PeerKitResult};
pub use hub::{EngineContexts, EngineHub, SharedEngine};
pub use task_queue::{TaskQueue, TaskQueueFactory};
