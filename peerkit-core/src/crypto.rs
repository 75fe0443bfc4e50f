//! Process-wide TLS crypto subsystem
//!
//! DTLS/TLS users in the process share one rustls crypto provider. The
//! provider is installed on the first [`initialize`] and, since rustls cannot
//! uninstall a process default, [`cleanup`] only releases one initialization.
//! Every engine hub calls these on its own 0→1 and 1→0 transitions, so the
//! subsystem stays active while any hub holds one.

use crate::error::{PeerKitError, PeerKitResult};
use rustls::crypto::{aws_lc_rs, CryptoProvider};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

static ACTIVE: AtomicUsize = AtomicUsize::new(0);
static INITIALIZATIONS: AtomicU64 = AtomicU64::new(0);
static CLEANUPS: AtomicU64 = AtomicU64::new(0);

/// Lifetime counters of the crypto subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoStats {
    /// Completed initializations
    pub initializations: u64,
    /// Completed cleanups
    pub cleanups: u64,
}

/// Install the default provider if needed and take one active initialization
pub fn initialize() -> PeerKitResult<()> {
    if CryptoProvider::get_default().is_none() {
        // losing an install race to another thread is fine
        let _ = aws_lc_rs::default_provider().install_default();
        debug!("Installed aws-lc-rs as the process crypto provider");
    }

    if CryptoProvider::get_default().is_none() {
        return Err(PeerKitError::Crypto {
            reason: "no process-default crypto provider after install".to_string(),
        });
    }

    let active = ACTIVE.fetch_add(1, Ordering::SeqCst) + 1;
    INITIALIZATIONS.fetch_add(1, Ordering::SeqCst);
    info!(active, "Crypto subsystem initialized");
    Ok(())
}

/// Release one initialization
///
/// # Panics
///
/// Panics when called more often than [`initialize`] succeeded.
pub fn cleanup() {
    let previous = ACTIVE.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
        active.checked_sub(1)
    });
    let Ok(previous) = previous else {
        panic!("crypto::cleanup called without a matching initialize");
    };

    CLEANUPS.fetch_add(1, Ordering::SeqCst);
    info!(active = previous - 1, "Crypto subsystem cleaned up");
}

/// Whether any initialization is currently in effect
pub fn is_active() -> bool {
    active_initializations() > 0
}

/// Number of initializations not yet cleaned up
pub fn active_initializations() -> usize {
    ACTIVE.load(Ordering::SeqCst)
}

/// The installed provider, if any
pub fn provider() -> Option<Arc<CryptoProvider>> {
    CryptoProvider::get_default().cloned()
}

/// Lifetime counters
pub fn stats() -> CryptoStats {
    CryptoStats {
        initializations: INITIALIZATIONS.load(Ordering::SeqCst),
        cleanups: CLEANUPS.load(Ordering::SeqCst),
    }
}
