//! Queue-backed bind arbiter.
//!
//! Owns the pend/fail/rewrite mechanics the classification core delegates:
//! suspended binds sit in a capacity-bounded queue until the owning driver
//! replays them with a fresh verdict, failed binds are forced to a terminal
//! blocked disposition, and rewritten binds are recorded as off-tunnel
//! redirects and finalized with an explicit permit.

use fsplit_core::arbiter::BindArbiter;
use fsplit_core::error::{EngineError, Result};
use fsplit_core::event::{ClassifyHandle, ClassifyOut, FilterAction, FilterId, FixedValues, MetaValues};
use fsplit_core::layer::AddressFamily;
use fsplit_core::verdict::ProcessId;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// A bind whose classification is suspended until its process resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendedBind {
    /// Process awaiting classification
    pub pid: ProcessId,
    /// Opaque per-call token from the original event
    pub handle: ClassifyHandle,
    /// Filter that triggered the original event
    pub filter: FilterId,
    /// Address family of the original bind
    pub family: AddressFamily,
}

/// A bind that was redirected off the tunnel interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectedBind {
    /// Process whose bind was redirected
    pub pid: Option<ProcessId>,
    /// Filter that triggered the redirect
    pub filter: FilterId,
    /// Address family of the bind
    pub family: AddressFamily,
}

#[derive(Default)]
struct QueueState {
    pending: Vec<PendedBind>,
    redirects: Vec<RedirectedBind>,
    failed: Vec<PendedBind>,
}

/// Capacity-bounded pend queue implementing [`BindArbiter`]
pub struct QueueArbiter {
    capacity: usize,
    state: Mutex<QueueState>,
}

impl QueueArbiter {
    /// Default number of binds that may be suspended at once
    pub const DEFAULT_CAPACITY: usize = 512;

    /// Arbiter with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Arbiter holding at most `capacity` suspended binds
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Number of binds currently suspended
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Remove and return every suspended bind belonging to a process
    ///
    /// The caller replays each entry as a fresh bind event so the verdict is
    /// re-queried; no decision is carried over from pend time.
    pub fn take_pending(&self, pid: ProcessId) -> Vec<PendedBind> {
        let mut state = self.state.lock();
        let (resolved, rest): (Vec<_>, Vec<_>) = state.pending.drain(..).partition(|p| p.pid == pid);
        state.pending = rest;
        resolved
    }

    /// Binds redirected off the tunnel so far
    pub fn redirects(&self) -> Vec<RedirectedBind> {
        self.state.lock().redirects.clone()
    }

    /// Binds forced to fail closed so far
    pub fn failed(&self) -> Vec<PendedBind> {
        self.state.lock().failed.clone()
    }
}

impl Default for QueueArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl BindArbiter for QueueArbiter {
    fn pend(
        &self,
        pid: ProcessId,
        handle: ClassifyHandle,
        filter: FilterId,
        _out: &mut ClassifyOut,
        family: AddressFamily,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.pending.len() >= self.capacity {
            return Err(EngineError::PendExhausted { pid });
        }

        debug!(%pid, %filter, "pending bind until process is classified");
        state.pending.push(PendedBind {
            pid,
            handle,
            filter,
            family,
        });
        Ok(())
    }

    fn fail(
        &self,
        pid: ProcessId,
        handle: ClassifyHandle,
        filter: FilterId,
        out: &mut ClassifyOut,
        family: AddressFamily,
    ) {
        warn!(%pid, %filter, "failing bind closed");

        out.action = FilterAction::Block;
        out.revoke_write();

        self.state.lock().failed.push(PendedBind {
            pid,
            handle,
            filter,
            family,
        });
    }

    fn rewrite(
        &self,
        fixed: &FixedValues,
        meta: &MetaValues,
        filter: FilterId,
        _handle: ClassifyHandle,
        out: &mut ClassifyOut,
    ) {
        debug!(pid = ?meta.process_id, %filter, "redirecting bind off the tunnel interface");

        out.action = FilterAction::Permit;
        out.revoke_write();

        self.state.lock().redirects.push(RedirectedBind {
            pid: meta.process_id,
            filter,
            family: fixed.family(),
        });
    }
}
