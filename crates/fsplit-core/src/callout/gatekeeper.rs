//! Connection gatekeeper.
//!
//! Both paths run at the connect and accept authorization layers and check
//! the identical verdict, but answer different temporal questions:
//!
//! - the permit path finalizes approval of a new connection whose bind was
//!   already moved off the tunnel interface;
//! - the block path tears down connections a process established inside the
//!   tunnel before it was marked split.
//!
//! The verdict is re-queried here even though a bind-time query already
//! happened: the unknown-to-resolved transition for a process may race with
//! its later connect/accept events, so no decision is ever carried over.

use super::prologue;
use crate::context::ClassifyContext;
use crate::event::{ClassifyEvent, FilterAction};
use crate::verdict::SplitVerdict;
use tracing::debug;

pub(super) fn classify_permit(ctx: &ClassifyContext, event: &mut ClassifyEvent) {
    let layer_ok = event.fixed.layer.is_connection_auth();
    let Some(pid) = prologue(event, layer_ok) else {
        return;
    };

    if ctx.query(pid) == SplitVerdict::Split {
        debug!(%pid, layer = %event.fixed.layer, "approving connection outside the tunnel");

        event.out.action = FilterAction::Permit;
        event.out.revoke_write();
    } else if cfg!(debug_assertions) && event.fixed.is_reauthorize() {
        debug!(
            %pid,
            "reauthorized connection is not explicitly approved by callout"
        );
    }
}

pub(super) fn classify_block(ctx: &ClassifyContext, event: &mut ClassifyEvent) {
    let layer_ok = event.fixed.layer.is_connection_auth();
    let Some(pid) = prologue(event, layer_ok) else {
        return;
    };

    if ctx.query(pid) == SplitVerdict::Split {
        debug!(%pid, layer = %event.fixed.layer, "blocking in-tunnel connection of split process");

        event.out.action = FilterAction::Block;
        event.out.revoke_write();
    } else if cfg!(debug_assertions) && event.fixed.is_reauthorize() {
        debug!(
            %pid,
            "reauthorized connection is not explicitly blocked by callout"
        );
    }
}
