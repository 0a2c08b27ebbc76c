//! Bind classifier.
//!
//! Entry point for splitting traffic: invoked for every outbound socket bind
//! attempt at the bind-redirect layers, it checks whether the binding process
//! is marked for having its traffic split and redirects, pends, or leaves the
//! bind alone accordingly.

use super::prologue;
use crate::context::ClassifyContext;
use crate::event::ClassifyEvent;
use crate::verdict::{ProcessId, SplitVerdict};
use tracing::warn;

pub(super) fn classify(ctx: &ClassifyContext, event: &mut ClassifyEvent) {
    let layer_ok = event.fixed.layer.is_bind_redirect();
    let Some(pid) = prologue(event, layer_ok) else {
        return;
    };

    match ctx.query(pid) {
        SplitVerdict::Split => {
            ctx.arbiter()
                .rewrite(&event.fixed, &event.meta, event.filter.id, event.handle, &mut event.out);
        }
        SplitVerdict::Unknown => classify_unknown(ctx, pid, event),
        SplitVerdict::NotSplit => {
            // Baseline `Continue` stands; other layers decide final routing.
        }
    }
}

/// Pend the bind until the process becomes known and classified.
///
/// If the arbiter cannot take another pended bind, the bind is failed closed
/// rather than left unresolved.
fn classify_unknown(ctx: &ClassifyContext, pid: ProcessId, event: &mut ClassifyEvent) {
    let family = event.fixed.family();

    if let Err(err) = ctx
        .arbiter()
        .pend(pid, event.handle, event.filter.id, &mut event.out, family)
    {
        warn!(%pid, error = %err, "could not pend bind request, blocking instead");

        ctx.arbiter()
            .fail(pid, event.handle, event.filter.id, &mut event.out, family);
    }
}
