//! Integration tests for the classification functions
//!
//! Drives the bind classifier and both gatekeeper paths through hand-written
//! verdict sources and a recording arbiter.

use fsplit_core::arbiter::BindArbiter;
use fsplit_core::callout::Callout;
use fsplit_core::context::ClassifyContext;
use fsplit_core::error::{EngineError, Result};
use fsplit_core::event::{
    ClassifyEvent, ClassifyHandle, ClassifyOut, ConditionFlags, FilterAction, FilterId, FilterRef,
    FixedValues, MetaValues,
};
use fsplit_core::layer::{AddressFamily, Layer};
use fsplit_core::verdict::{ProcessId, SplitVerdict};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

mod test_helpers {
    use super::*;

    /// What the arbiter was asked to do
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ArbiterCall {
        Pend(ProcessId, AddressFamily),
        Fail(ProcessId, AddressFamily),
        Rewrite(FilterId),
    }

    /// Arbiter that records calls; optionally refuses to pend
    #[derive(Default)]
    pub struct RecordingArbiter {
        pub calls: Mutex<Vec<ArbiterCall>>,
        pub refuse_pend: bool,
    }

    impl RecordingArbiter {
        pub fn refusing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                refuse_pend: true,
            }
        }

        pub fn calls(&self) -> Vec<ArbiterCall> {
            self.calls.lock().clone()
        }
    }

    impl BindArbiter for RecordingArbiter {
        fn pend(
            &self,
            pid: ProcessId,
            _handle: ClassifyHandle,
            _filter: FilterId,
            _out: &mut ClassifyOut,
            family: AddressFamily,
        ) -> Result<()> {
            if self.refuse_pend {
                return Err(EngineError::PendExhausted { pid });
            }
            self.calls.lock().push(ArbiterCall::Pend(pid, family));
            Ok(())
        }

        fn fail(
            &self,
            pid: ProcessId,
            _handle: ClassifyHandle,
            _filter: FilterId,
            out: &mut ClassifyOut,
            family: AddressFamily,
        ) {
            self.calls.lock().push(ArbiterCall::Fail(pid, family));
            out.action = FilterAction::Block;
            out.revoke_write();
        }

        fn rewrite(
            &self,
            _fixed: &FixedValues,
            _meta: &MetaValues,
            filter: FilterId,
            _handle: ClassifyHandle,
            out: &mut ClassifyOut,
        ) {
            self.calls.lock().push(ArbiterCall::Rewrite(filter));
            out.action = FilterAction::Permit;
            out.revoke_write();
        }
    }

    /// Context whose verdicts come from a fixed table; unlisted pids are NotSplit
    pub fn context_with(
        verdicts: &[(u32, SplitVerdict)],
        arbiter: Arc<RecordingArbiter>,
    ) -> ClassifyContext {
        let table: HashMap<ProcessId, SplitVerdict> = verdicts
            .iter()
            .map(|(pid, verdict)| (ProcessId(*pid), *verdict))
            .collect();
        let classifier = move |pid: ProcessId| table.get(&pid).copied().unwrap_or(SplitVerdict::NotSplit);
        ClassifyContext::new(Arc::new(classifier), arbiter)
    }

    pub fn event_at(layer: Layer, pid: Option<u32>) -> ClassifyEvent {
        ClassifyEvent::new(
            FixedValues::new(layer),
            MetaValues {
                process_id: pid.map(ProcessId),
            },
            FilterRef::with_context_tag(FilterId(42)),
            ClassifyHandle(7),
        )
    }
}

use test_helpers::*;

// ============ Bind Classifier Tests ============

#[test]
fn test_split_bind_is_rewritten() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(100, SplitVerdict::Split)], arbiter.clone());

    let mut event = event_at(Layer::BindRedirectV4, Some(100));
    Callout::BindRedirect.classify(&ctx, &mut event);

    assert_eq!(arbiter.calls(), vec![ArbiterCall::Rewrite(FilterId(42))]);
    assert_eq!(event.out.action, FilterAction::Permit);
    assert!(!event.out.can_write());
}

#[test]
fn test_not_split_bind_continues() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(100, SplitVerdict::NotSplit)], arbiter.clone());

    let mut event = event_at(Layer::BindRedirectV4, Some(100));
    Callout::BindRedirect.classify(&ctx, &mut event);

    assert!(arbiter.calls().is_empty());
    assert_eq!(event.out.action, FilterAction::Continue);
    assert!(event.out.can_write());
}

#[test]
fn test_unknown_bind_is_pended() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(100, SplitVerdict::Unknown)], arbiter.clone());

    let mut event = event_at(Layer::BindRedirectV6, Some(100));
    Callout::BindRedirect.classify(&ctx, &mut event);

    assert_eq!(
        arbiter.calls(),
        vec![ArbiterCall::Pend(ProcessId(100), AddressFamily::V6)]
    );
    // Finalization is suspended externally; the output record is untouched
    // beyond the baseline.
    assert_eq!(event.out.action, FilterAction::Continue);
}

#[test]
fn test_pend_failure_fails_closed() {
    let arbiter = Arc::new(RecordingArbiter::refusing());
    let ctx = context_with(&[(100, SplitVerdict::Unknown)], arbiter.clone());

    let mut event = event_at(Layer::BindRedirectV4, Some(100));
    Callout::BindRedirect.classify(&ctx, &mut event);

    // Never silently unresolved: the fallback forces a terminal blocked
    // disposition.
    assert_eq!(
        arbiter.calls(),
        vec![ArbiterCall::Fail(ProcessId(100), AddressFamily::V4)]
    );
    assert_eq!(event.out.action, FilterAction::Block);
    assert!(!event.out.can_write());
}

#[test]
fn test_bind_without_write_right_is_untouched() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(100, SplitVerdict::Split)], arbiter.clone());

    let mut event = event_at(Layer::BindRedirectV4, Some(100));
    event.out = ClassifyOut::without_write_right();
    let before = event.out;

    Callout::BindRedirect.classify(&ctx, &mut event);

    assert!(arbiter.calls().is_empty());
    assert_eq!(event.out, before);
}

#[test]
fn test_bind_without_process_id_fails_open() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(100, SplitVerdict::Split)], arbiter.clone());

    let mut event = event_at(Layer::BindRedirectV4, None);
    Callout::BindRedirect.classify(&ctx, &mut event);

    // No verdict path runs and no external call is made, but the baseline
    // still lets later layers decide.
    assert!(arbiter.calls().is_empty());
    assert_eq!(event.out.action, FilterAction::Continue);
    assert!(event.out.can_write());
}

#[test]
#[should_panic]
fn test_bind_callout_asserts_on_auth_layer() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[], arbiter);

    let mut event = event_at(Layer::AuthConnectV4, Some(100));
    Callout::BindRedirect.classify(&ctx, &mut event);
}

#[test]
#[should_panic]
fn test_missing_provider_blob_asserts() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[], arbiter);

    let mut event = event_at(Layer::BindRedirectV4, Some(100));
    event.filter = FilterRef {
        id: FilterId(42),
        provider: None,
    };
    Callout::BindRedirect.classify(&ctx, &mut event);
}

// ============ Gatekeeper Tests ============

#[test]
fn test_permit_path_approves_split_connection() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(200, SplitVerdict::Split)], arbiter.clone());

    for layer in [
        Layer::AuthConnectV4,
        Layer::AuthConnectV6,
        Layer::AuthRecvAcceptV4,
        Layer::AuthRecvAcceptV6,
    ] {
        let mut event = event_at(layer, Some(200));
        Callout::PermitSplit.classify(&ctx, &mut event);

        assert_eq!(event.out.action, FilterAction::Permit, "layer {layer}");
        assert!(!event.out.can_write(), "layer {layer}");
    }

    assert!(arbiter.calls().is_empty());
}

#[test]
fn test_permit_path_leaves_not_split_alone() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(200, SplitVerdict::NotSplit)], arbiter);

    let mut event = event_at(Layer::AuthConnectV4, Some(200));
    Callout::PermitSplit.classify(&ctx, &mut event);

    assert_eq!(event.out.action, FilterAction::Continue);
    assert!(event.out.can_write());
}

#[test]
fn test_block_path_blocks_split_connection() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(200, SplitVerdict::Split)], arbiter);

    let mut event = event_at(Layer::AuthRecvAcceptV4, Some(200));
    Callout::BlockSplit.classify(&ctx, &mut event);

    assert_eq!(event.out.action, FilterAction::Block);
    assert!(!event.out.can_write());
}

#[test]
fn test_permit_and_block_paths_are_independent() {
    // Both paths check the identical verdict but answer different temporal
    // questions; each applies its own disposition to its own event.
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(200, SplitVerdict::Split)], arbiter);

    let mut permit_event = event_at(Layer::AuthConnectV4, Some(200));
    Callout::PermitSplit.classify(&ctx, &mut permit_event);
    assert_eq!(permit_event.out.action, FilterAction::Permit);

    let mut block_event = event_at(Layer::AuthConnectV4, Some(200));
    Callout::BlockSplit.classify(&ctx, &mut block_event);
    assert_eq!(block_event.out.action, FilterAction::Block);
}

#[test]
fn test_gatekeeper_respects_prior_hard_disposition() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(200, SplitVerdict::Split)], arbiter);

    let mut event = event_at(Layer::AuthConnectV4, Some(200));
    event.out = ClassifyOut::without_write_right();
    let before = event.out;

    Callout::PermitSplit.classify(&ctx, &mut event);
    assert_eq!(event.out, before);

    Callout::BlockSplit.classify(&ctx, &mut event);
    assert_eq!(event.out, before);
}

#[test]
fn test_reauthorized_not_split_connection_gets_no_action() {
    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = context_with(&[(200, SplitVerdict::NotSplit)], arbiter);

    let mut event = event_at(Layer::AuthConnectV4, Some(200));
    event.fixed.flags = ConditionFlags::IS_REAUTHORIZE;

    Callout::PermitSplit.classify(&ctx, &mut event);
    assert_eq!(event.out.action, FilterAction::Continue);
    assert!(event.out.can_write());
}

// ============ Verdict Resolution Race Tests ============

#[test]
fn test_connect_requeries_after_unknown_resolves() {
    // A process queried as Unknown at bind time later resolves to Split; the
    // connect event must query fresh instead of trusting any earlier answer.
    let verdicts: Arc<Mutex<HashMap<ProcessId, SplitVerdict>>> = Arc::new(Mutex::new(
        [(ProcessId(300), SplitVerdict::Unknown)].into_iter().collect(),
    ));

    let table = verdicts.clone();
    let classifier = move |pid: ProcessId| table.lock().get(&pid).copied().unwrap_or(SplitVerdict::NotSplit);

    let arbiter = Arc::new(RecordingArbiter::default());
    let ctx = ClassifyContext::new(Arc::new(classifier), arbiter.clone());

    let mut bind_event = event_at(Layer::BindRedirectV4, Some(300));
    Callout::BindRedirect.classify(&ctx, &mut bind_event);
    assert_eq!(
        arbiter.calls(),
        vec![ArbiterCall::Pend(ProcessId(300), AddressFamily::V4)]
    );

    verdicts.lock().insert(ProcessId(300), SplitVerdict::Split);

    let mut connect_event = event_at(Layer::AuthConnectV4, Some(300));
    Callout::PermitSplit.classify(&ctx, &mut connect_event);
    assert_eq!(connect_event.out.action, FilterAction::Permit);
    assert!(!connect_event.out.can_write());
}

// ============ Property Tests ============

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn verdict_strategy() -> impl Strategy<Value = SplitVerdict> {
        prop_oneof![
            Just(SplitVerdict::Split),
            Just(SplitVerdict::NotSplit),
            Just(SplitVerdict::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn bind_classification_takes_exactly_one_path(pid in 1u32..u32::MAX, verdict in verdict_strategy()) {
            let arbiter = Arc::new(RecordingArbiter::default());
            let ctx = context_with(&[(pid, verdict)], arbiter.clone());

            let mut event = event_at(Layer::BindRedirectV4, Some(pid));
            Callout::BindRedirect.classify(&ctx, &mut event);

            let calls = arbiter.calls();
            match verdict {
                SplitVerdict::Split => {
                    prop_assert_eq!(calls, vec![ArbiterCall::Rewrite(FilterId(42))]);
                }
                SplitVerdict::Unknown => {
                    prop_assert_eq!(calls, vec![ArbiterCall::Pend(ProcessId(pid), AddressFamily::V4)]);
                }
                SplitVerdict::NotSplit => {
                    prop_assert!(calls.is_empty());
                    prop_assert_eq!(event.out.action, FilterAction::Continue);
                }
            }
        }
    }
}
