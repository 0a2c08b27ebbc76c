//! Classification functions.
//!
//! A closed set of three callouts implements the splitting policy:
//!
//! - [`Callout::BindRedirect`] moves binds of split processes off the tunnel
//!   interface (or pends them while the verdict is unknown).
//! - [`Callout::PermitSplit`] approves connections of split processes whose
//!   bind was already redirected.
//! - [`Callout::BlockSplit`] closes out connections a process established
//!   inside the tunnel before it became split, so the process never has
//!   active flows on both sides of the tunnel at once.

mod bind;
mod gatekeeper;

use crate::context::ClassifyContext;
use crate::event::{ClassifyEvent, FilterAction};
use crate::layer::Layer;
use crate::verdict::ProcessId;
use std::fmt;
use tracing::debug;

/// One of the registered classification functions
///
/// Doubles as the purpose identity of its registration set: the callout and
/// the (layer, family) combinations it is installed at form one purpose-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callout {
    /// Bind classifier at the bind-redirect layers
    BindRedirect,
    /// Gatekeeper permit path at the connect/accept layers
    PermitSplit,
    /// Gatekeeper block path at the connect/accept layers
    BlockSplit,
}

impl Callout {
    /// All three purposes in registration order
    pub const ALL: [Callout; 3] = [Callout::BindRedirect, Callout::PermitSplit, Callout::BlockSplit];

    /// Layers this callout is installed at
    pub fn layers(&self) -> &'static [Layer] {
        match self {
            Self::BindRedirect => &[Layer::BindRedirectV4, Layer::BindRedirectV6],
            Self::PermitSplit | Self::BlockSplit => &[
                Layer::AuthConnectV4,
                Layer::AuthRecvAcceptV4,
                Layer::AuthConnectV6,
                Layer::AuthRecvAcceptV6,
            ],
        }
    }

    /// Whether `layer` belongs to this callout's set
    pub fn covers(&self, layer: Layer) -> bool {
        self.layers().contains(&layer)
    }

    /// Stable label used in keys and log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::BindRedirect => "bind-redirect",
            Self::PermitSplit => "permit-split",
            Self::BlockSplit => "block-split",
        }
    }

    /// Human-readable role, used in display names
    pub fn role(&self) -> &'static str {
        match self {
            Self::BindRedirect => "Bind Redirect",
            Self::PermitSplit => "Permitting",
            Self::BlockSplit => "Blocking",
        }
    }

    /// Render a verdict for one event
    ///
    /// Exactly one decision path executes per event; the event is not touched
    /// at all when another filter already holds the final say.
    pub fn classify(&self, ctx: &ClassifyContext, event: &mut ClassifyEvent) {
        match self {
            Self::BindRedirect => bind::classify(ctx, event),
            Self::PermitSplit => gatekeeper::classify_permit(ctx, event),
            Self::BlockSplit => gatekeeper::classify_block(ctx, event),
        }
    }
}

impl fmt::Display for Callout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared entry guards for every classification function.
///
/// Layer and provider-blob mismatches are trusted platform invariants, not
/// recoverable errors: they assert in debug builds and return without acting
/// in release builds, keeping a live traffic path from crashing.
///
/// Returns the process id when classification may proceed. On the way it
/// applies the baseline: an unset action becomes `Continue` so later layers
/// still decide when this core has nothing to say.
fn prologue(event: &mut ClassifyEvent, layer_ok: bool) -> Option<ProcessId> {
    debug_assert!(layer_ok, "callout dispatched at wrong layer: {}", event.fixed.layer);

    let blob_ok = event
        .filter
        .provider
        .as_ref()
        .is_some_and(|blob| blob.is_context_tag());
    debug_assert!(blob_ok, "filter {} carries no valid provider context", event.filter.id);

    if !layer_ok || !blob_ok {
        return None;
    }

    if !event.out.can_write() {
        debug!(
            layer = %event.fixed.layer,
            "aborting classification, hard permit/block already applied"
        );
        return None;
    }

    if event.out.action == FilterAction::None {
        event.out.action = FilterAction::Continue;
    }

    let Some(pid) = event.meta.process_id else {
        debug!(
            layer = %event.fixed.layer,
            "cannot classify event, process id not provided"
        );
        return None;
    };

    Some(pid)
}
