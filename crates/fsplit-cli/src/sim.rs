//! Simulation run.
//!
//! Registers the callout purpose-sets against the in-memory engine, replays a
//! synthetic bind/connect/accept sequence for every process named on the
//! command line, and reports each verdict.

use anyhow::{Context, Result};
use fsplit_core::config::Config;
use fsplit_core::context::ClassifyContext;
use fsplit_core::event::{ClassifyEvent, ClassifyHandle, FilterAction, FilterId, FilterRef, FixedValues, MetaValues};
use fsplit_core::layer::{AddressFamily, Layer};
use fsplit_core::registry::CalloutRegistry;
use fsplit_core::verdict::{ProcessId, SplitVerdict};
use fsplit_engine::{EngineSession, QueueArbiter};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::args::Args;

type VerdictMap = Arc<Mutex<HashMap<ProcessId, SplitVerdict>>>;

struct Simulation {
    session: Arc<EngineSession>,
    arbiter: Arc<QueueArbiter>,
    verdicts: VerdictMap,
    config: Config,
    next_handle: Mutex<u64>,
}

/// Execute the simulation described by the CLI arguments
pub fn execute(args: &Args, config: Config) -> Result<()> {
    let sim = Simulation::start(args, config)?;
    sim.replay_all(args);

    if args.resolve {
        sim.resolve_unknown(args);
    }

    sim.finish()
}

impl Simulation {
    fn start(args: &Args, config: Config) -> Result<Self> {
        let verdicts: VerdictMap = Arc::new(Mutex::new(verdict_table(args)));
        let arbiter = Arc::new(QueueArbiter::with_capacity(args.pend_capacity));
        let session = Arc::new(EngineSession::new());

        let map = verdicts.clone();
        let classifier = move |pid: ProcessId| {
            map.lock().get(&pid).copied().unwrap_or(SplitVerdict::NotSplit)
        };
        let context = Arc::new(ClassifyContext::new(Arc::new(classifier), arbiter.clone()));

        let registry = CalloutRegistry::new(session.clone(), context, config.clone());
        registry.register_all().context("Callout registration failed")?;
        info!(callouts = session.callout_count(), "registered callout purpose-sets");

        Ok(Self {
            session,
            arbiter,
            verdicts,
            config,
            next_handle: Mutex::new(1),
        })
    }

    fn replay_all(&self, args: &Args) {
        let pids = args
            .split
            .iter()
            .chain(&args.unknown)
            .chain(&args.other)
            .copied();

        for pid in pids {
            for family in self.families() {
                self.replay_sequence(ProcessId(pid), family);
            }
        }
    }

    /// One connection lifecycle: bind, then outbound connect, then an inbound
    /// accept on the same process.
    fn replay_sequence(&self, pid: ProcessId, family: AddressFamily) {
        let layers = match family {
            AddressFamily::V4 => [Layer::BindRedirectV4, Layer::AuthConnectV4, Layer::AuthRecvAcceptV4],
            AddressFamily::V6 => [Layer::BindRedirectV6, Layer::AuthConnectV6, Layer::AuthRecvAcceptV6],
        };

        for layer in layers {
            let mut event = self.event(layer, pid);
            self.session.dispatch(&mut event);
            info!(%pid, %layer, verdict = disposition(&event), "classified");
        }
    }

    /// Mark every initially-unknown process as split and replay its suspended
    /// binds as fresh events.
    fn resolve_unknown(&self, args: &Args) {
        for pid in args.unknown.iter().copied().map(ProcessId) {
            self.verdicts.lock().insert(pid, SplitVerdict::Split);

            for pended in self.arbiter.take_pending(pid) {
                let layer = match pended.family {
                    AddressFamily::V4 => Layer::BindRedirectV4,
                    AddressFamily::V6 => Layer::BindRedirectV6,
                };
                let mut event = self.event(layer, pended.pid);
                self.session.dispatch(&mut event);
                info!(%pid, %layer, verdict = disposition(&event), "replayed suspended bind");
            }
        }
    }

    fn finish(self) -> Result<()> {
        let remaining = self.arbiter.pending_count();
        if remaining > 0 {
            warn!(remaining, "binds still suspended at shutdown");
        }

        info!(
            redirected = self.arbiter.redirects().len(),
            failed = self.arbiter.failed().len(),
            "simulation complete"
        );

        self.session.close();
        Ok(())
    }

    fn families(&self) -> Vec<AddressFamily> {
        [AddressFamily::V4, AddressFamily::V6]
            .into_iter()
            .filter(|family| self.config.families.enabled(*family))
            .collect()
    }

    fn event(&self, layer: Layer, pid: ProcessId) -> ClassifyEvent {
        let mut next = self.next_handle.lock();
        let handle = ClassifyHandle(*next);
        *next += 1;

        ClassifyEvent::new(
            FixedValues::new(layer),
            MetaValues::with_process(pid),
            FilterRef::with_context_tag(FilterId(1)),
            handle,
        )
    }
}

fn verdict_table(args: &Args) -> HashMap<ProcessId, SplitVerdict> {
    let mut table = HashMap::new();
    for pid in &args.split {
        table.insert(ProcessId(*pid), SplitVerdict::Split);
    }
    for pid in &args.unknown {
        table.insert(ProcessId(*pid), SplitVerdict::Unknown);
    }
    for pid in &args.other {
        table.insert(ProcessId(*pid), SplitVerdict::NotSplit);
    }
    table
}

fn disposition(event: &ClassifyEvent) -> &'static str {
    match event.out.action {
        FilterAction::Permit if event.fixed.layer.is_bind_redirect() => "redirected",
        FilterAction::Permit => "permitted",
        FilterAction::Block => "blocked",
        FilterAction::Continue => "deferred",
        FilterAction::None => "untouched",
    }
}
