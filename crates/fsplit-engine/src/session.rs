//! In-memory filter engine session.

use fsplit_core::error::{EngineError, Result};
use fsplit_core::event::{ClassifyEvent, FilterId};
use fsplit_core::layer::Layer;
use fsplit_core::registry::{BoundCallout, CalloutDescriptor, CalloutKey, FilterChange, FilterEngine};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Default)]
struct SessionState {
    policy: HashMap<CalloutKey, CalloutDescriptor>,
    runtime: Vec<BoundCallout>,
    closed: bool,
}

impl SessionState {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        Ok(())
    }
}

/// In-memory filter engine.
///
/// Enforces the same registration contract as the host engine: callout keys
/// are unique while registered, and unregistering an absent key reports
/// [`EngineError::CalloutNotFound`].
///
/// # Example
///
/// ```rust,ignore
/// let session = Arc::new(EngineSession::new());
/// let registry = CalloutRegistry::new(session.clone(), context, Config::default());
///
/// registry.register_all()?;
/// session.dispatch(&mut event);
/// ```
pub struct EngineSession {
    state: RwLock<SessionState>,
}

impl EngineSession {
    /// Open a new session with empty policy store and runtime
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Close the session; later engine calls fail with `SessionClosed`
    pub fn close(&self) {
        let mut state = self.state.write();
        if !state.closed {
            state.closed = true;
            info!("closed filter engine session");
        }
    }

    /// Whether a callout is currently runtime-registered
    pub fn is_registered(&self, key: CalloutKey) -> bool {
        self.state.read().runtime.iter().any(|c| c.key() == key)
    }

    /// Number of runtime-registered callouts
    pub fn callout_count(&self) -> usize {
        self.state.read().runtime.len()
    }

    /// Display name recorded in the policy store for a callout, if added
    pub fn descriptor_name(&self, key: CalloutKey) -> Option<String> {
        self.state.read().policy.get(&key).map(|d| d.name.clone())
    }

    /// Notify every callout registered at the filter's layer of an attach
    ///
    /// Plays the engine's role of announcing filters that reference a
    /// callout.
    pub fn attach_filter(&self, layer: Layer, filter: FilterId) -> Result<()> {
        for callout in self.callouts_at(layer) {
            callout.notify(FilterChange::Attached, filter)?;
        }
        Ok(())
    }

    /// Dispatch one event to every callout registered at its layer
    ///
    /// Callouts run in registration order, each seeing the output record the
    /// previous one left behind, exactly like chained filters at one layer.
    /// Returns the number of callouts invoked.
    pub fn dispatch(&self, event: &mut ClassifyEvent) -> usize {
        let callouts = self.callouts_at(event.fixed.layer);

        // Invoked outside the lock: classification must never run under an
        // engine lock.
        for callout in &callouts {
            callout.classify(event);
        }

        debug!(
            layer = %event.fixed.layer,
            invoked = callouts.len(),
            action = ?event.out.action,
            "dispatched event"
        );

        callouts.len()
    }

    fn callouts_at(&self, layer: Layer) -> Vec<BoundCallout> {
        self.state
            .read()
            .runtime
            .iter()
            .filter(|c| c.key().layer == layer)
            .cloned()
            .collect()
    }
}

impl Default for EngineSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterEngine for EngineSession {
    fn add_callout(&self, descriptor: &CalloutDescriptor) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;

        if state.policy.contains_key(&descriptor.key) {
            return Err(EngineError::DuplicateCallout {
                key: descriptor.key,
            });
        }

        debug!(key = %descriptor.key, name = %descriptor.name, "added callout to policy store");
        state.policy.insert(descriptor.key, descriptor.clone());
        Ok(())
    }

    fn remove_callout(&self, key: CalloutKey) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;

        match state.policy.remove(&key) {
            Some(_) => {
                debug!(%key, "removed callout from policy store");
                Ok(())
            }
            None => Err(EngineError::CalloutNotFound { key }),
        }
    }

    fn register(&self, callout: BoundCallout) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;

        let key = callout.key();
        if state.runtime.iter().any(|c| c.key() == key) {
            return Err(EngineError::DuplicateCallout { key });
        }

        debug!(%key, "registered classification function");
        state.runtime.push(callout);
        Ok(())
    }

    fn unregister(&self, key: CalloutKey) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;

        match state.runtime.iter().position(|c| c.key() == key) {
            Some(index) => {
                state.runtime.remove(index);
                debug!(%key, "unregistered classification function");
                Ok(())
            }
            None => Err(EngineError::CalloutNotFound { key }),
        }
    }
}
