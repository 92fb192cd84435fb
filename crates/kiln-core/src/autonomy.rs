//! Curator mode
//!
//! Curator mode auto-approves the context gate. It never approves a
//! proposal: application always waits for an explicit approval.

use std::sync::atomic::{AtomicBool, Ordering};

/// External autonomy flag
pub trait AutonomySource: Send + Sync {
    /// Whether curator mode is running
    fn is_running(&self) -> bool;
}

/// Autonomy source that is never running
#[derive(Debug, Clone, Copy, Default)]
pub struct Manual;

impl AutonomySource for Manual {
    fn is_running(&self) -> bool {
        false
    }
}

/// Toggleable curator-mode flag
#[derive(Debug, Default)]
pub struct CuratorFlag {
    running: AtomicBool,
}

impl CuratorFlag {
    /// Create a stopped flag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag in the given state
    #[must_use]
    pub fn with_state(running: bool) -> Self {
        Self {
            running: AtomicBool::new(running),
        }
    }

    /// Start curator mode
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("curator mode started");
    }

    /// Stop curator mode
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("curator mode stopped");
    }
}

impl AutonomySource for CuratorFlag {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
