//! Pending-classification interface.
//!
//! The arbiter owns the mechanics this core deliberately stays out of:
//! rewriting a bind off the tunnel interface, suspending a bind until the
//! process's verdict resolves, and forcing a bind to fail closed. How a
//! pended bind is later completed is the arbiter's own contract; this core
//! only enters the suspension and, on suspension failure, the fail-closed
//! safety net.

use crate::error::Result;
use crate::event::{ClassifyHandle, ClassifyOut, FilterId, FixedValues, MetaValues};
use crate::layer::AddressFamily;
use crate::verdict::ProcessId;

/// External bind arbitration interface
///
/// All methods are invoked synchronously from classification context and must
/// not block; `pend` suspends the bind logically and returns immediately.
pub trait BindArbiter: Send + Sync {
    /// Suspend finalization of a bind until the process's verdict is known
    ///
    /// On error the caller falls back to [`BindArbiter::fail`].
    fn pend(
        &self,
        pid: ProcessId,
        handle: ClassifyHandle,
        filter: FilterId,
        out: &mut ClassifyOut,
        family: AddressFamily,
    ) -> Result<()>;

    /// Force a bind to a safe blocked disposition
    ///
    /// Used as the fail-closed safety net when pending is impossible; must
    /// leave the bind terminally resolved, never silently unresolved.
    fn fail(
        &self,
        pid: ProcessId,
        handle: ClassifyHandle,
        filter: FilterId,
        out: &mut ClassifyOut,
        family: AddressFamily,
    );

    /// Redirect a bind off the tunnel interface
    fn rewrite(
        &self,
        fixed: &FixedValues,
        meta: &MetaValues,
        filter: FilterId,
        handle: ClassifyHandle,
        out: &mut ClassifyOut,
    );
}
