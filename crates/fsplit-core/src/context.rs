//! Process-wide classification context.

use crate::arbiter::BindArbiter;
use crate::verdict::{ProcessClassifier, ProcessId, SplitVerdict};
use std::sync::Arc;

/// Shared state for every classification function.
///
/// Constructed once at driver initialization and read-only afterwards; each
/// registered callout receives a shared reference at registration time.
/// Classification functions never mutate it, which is what makes the hot
/// path reentrant without locks.
pub struct ClassifyContext {
    classifier: Arc<dyn ProcessClassifier>,
    arbiter: Arc<dyn BindArbiter>,
}

impl ClassifyContext {
    /// Bind a verdict source and an arbiter into a context
    pub fn new(classifier: Arc<dyn ProcessClassifier>, arbiter: Arc<dyn BindArbiter>) -> Self {
        Self {
            classifier,
            arbiter,
        }
    }

    /// Query the split verdict for a process
    pub fn query(&self, pid: ProcessId) -> SplitVerdict {
        self.classifier.query(pid)
    }

    /// The bind arbitration interface
    pub fn arbiter(&self) -> &dyn BindArbiter {
        self.arbiter.as_ref()
    }
}

impl std::fmt::Debug for ClassifyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifyContext").finish_non_exhaustive()
    }
}
