//! Split verdict model and the process classification interface.

use std::fmt;

/// Per-process split verdict, computed fresh for every event.
///
/// The core never caches a verdict; connect and accept events re-query even
/// when a bind-time query already happened for the same process, because the
/// `Unknown` -> resolved transition may race with later events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitVerdict {
    /// The process's traffic is routed outside the tunnel
    Split,
    /// The process's traffic stays inside the tunnel
    NotSplit,
    /// The process has not been classified yet
    Unknown,
}

/// Process identifier as reported by event metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verdict query interface
///
/// Implementations are invoked synchronously from classification context and
/// must not block. Repeated queries for the same process return the same
/// verdict until that process's classification changes.
pub trait ProcessClassifier: Send + Sync {
    /// Look up the split verdict for a process
    fn query(&self, pid: ProcessId) -> SplitVerdict;
}

impl<F> ProcessClassifier for F
where
    F: Fn(ProcessId) -> SplitVerdict + Send + Sync,
{
    fn query(&self, pid: ProcessId) -> SplitVerdict {
        self(pid)
    }
}
