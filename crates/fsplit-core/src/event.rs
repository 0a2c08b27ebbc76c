//! Per-event classification data.
//!
//! One [`ClassifyEvent`] exists per bind/connect/accept call. It is created
//! by the invoking engine, exclusively owned by that call, and never retained
//! by the core beyond the call's return.

use crate::layer::{AddressFamily, Layer};
use crate::verdict::ProcessId;
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Rights a classification function still holds over the verdict output
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClassifyRights: u32 {
        /// The final action may still be written
        const ACTION_WRITE = 0x0001;
    }
}

bitflags! {
    /// Condition flags carried in an event's fixed values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConditionFlags: u32 {
        /// The event re-evaluates an already-authorized flow
        const IS_REAUTHORIZE = 0x0001;
    }
}

/// Final disposition recorded in a [`ClassifyOut`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    /// No disposition yet
    None,
    /// Defer the final decision to later filters and layers
    Continue,
    /// Explicitly allow; revokes write rights when set by this core
    Permit,
    /// Explicitly deny; revokes write rights when set by this core
    Block,
}

/// Mutable verdict output of a classification call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOut {
    /// Action recorded so far
    pub action: FilterAction,
    /// Rights still held over this record
    pub rights: ClassifyRights,
}

impl ClassifyOut {
    /// Fresh output record with write rights held
    pub fn new() -> Self {
        Self {
            action: FilterAction::None,
            rights: ClassifyRights::ACTION_WRITE,
        }
    }

    /// Output record whose verdict was already hard-set elsewhere
    pub fn without_write_right() -> Self {
        Self {
            action: FilterAction::None,
            rights: ClassifyRights::empty(),
        }
    }

    /// Whether the action may still be written
    pub fn can_write(&self) -> bool {
        self.rights.contains(ClassifyRights::ACTION_WRITE)
    }

    /// Revoke the write right so no later filter overrides the action
    pub fn revoke_write(&mut self) {
        self.rights.remove(ClassifyRights::ACTION_WRITE);
    }
}

impl Default for ClassifyOut {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable fixed values of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedValues {
    /// Layer this event was raised at
    pub layer: Layer,
    /// Condition flags supplied by the platform
    pub flags: ConditionFlags,
}

impl FixedValues {
    /// Fixed values for a fresh (non-reauthorize) event at `layer`
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            flags: ConditionFlags::empty(),
        }
    }

    /// Address family of the event
    pub fn family(&self) -> AddressFamily {
        self.layer.family()
    }

    /// Whether this event re-authorizes an existing flow
    ///
    /// Only connection-auth layers carry the flag; bind layers never report
    /// reauthorization.
    pub fn is_reauthorize(&self) -> bool {
        self.layer.is_connection_auth() && self.flags.contains(ConditionFlags::IS_REAUTHORIZE)
    }
}

/// Event metadata supplied by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetaValues {
    /// Process that triggered the event, when the platform could attribute it
    pub process_id: Option<ProcessId>,
}

impl MetaValues {
    /// Metadata with a known process id
    pub fn with_process(pid: ProcessId) -> Self {
        Self {
            process_id: Some(pid),
        }
    }
}

/// Opaque per-call token threaded through pend/fail/rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassifyHandle(pub u64);

/// Identifier of the filter that triggered a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(pub u64);

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag of a provider context blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// General-purpose provider data
    General,
    /// Anything else the platform may attach
    Other,
}

/// Platform provider blob attached to a filter, reduced to a type/size tag
///
/// The classification context itself is injected at registration time; the
/// blob survives only as a shape check performed at each boundary call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderBlob {
    /// Blob type tag
    pub kind: BlobKind,
    /// Payload size in bytes
    pub len: usize,
}

impl ProviderBlob {
    /// The tag a filter installed by this core carries: a general blob sized
    /// to hold exactly one context reference.
    pub fn context_tag() -> Self {
        Self {
            kind: BlobKind::General,
            len: std::mem::size_of::<usize>(),
        }
    }

    /// Whether this blob has the expected context-reference shape
    pub fn is_context_tag(&self) -> bool {
        *self == Self::context_tag()
    }
}

/// Filter that triggered the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterRef {
    /// Filter identity
    pub id: FilterId,
    /// Provider blob attached to the filter, if any
    pub provider: Option<ProviderBlob>,
}

impl FilterRef {
    /// Filter reference as installed by this core
    pub fn with_context_tag(id: FilterId) -> Self {
        Self {
            id,
            provider: Some(ProviderBlob::context_tag()),
        }
    }
}

/// One classification event, exclusively owned by the invoking call
#[derive(Debug)]
pub struct ClassifyEvent {
    /// Immutable fixed values
    pub fixed: FixedValues,
    /// Event metadata
    pub meta: MetaValues,
    /// Triggering filter
    pub filter: FilterRef,
    /// Opaque per-call token
    pub handle: ClassifyHandle,
    /// Mutable verdict output
    pub out: ClassifyOut,
}

impl ClassifyEvent {
    /// Build an event with a fresh output record
    pub fn new(fixed: FixedValues, meta: MetaValues, filter: FilterRef, handle: ClassifyHandle) -> Self {
        Self {
            fixed,
            meta,
            filter,
            handle,
            out: ClassifyOut::new(),
        }
    }
}
