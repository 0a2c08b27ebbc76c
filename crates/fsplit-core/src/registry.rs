//! Callout registration management.
//!
//! Installs the classification functions into a filter engine, one
//! purpose-set at a time. A purpose-set (all (layer, family) members of one
//! callout) is all-or-nothing: a half-registered set is never observable
//! after a registration call returns.

use crate::callout::Callout;
use crate::config::Config;
use crate::context::ClassifyContext;
use crate::error::{EngineError, Result};
use crate::event::{ClassifyEvent, FilterId};
use crate::layer::Layer;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Stable identity of one registered callout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalloutKey {
    /// Purpose the callout serves
    pub purpose: Callout,
    /// Layer it is installed at
    pub layer: Layer,
}

impl CalloutKey {
    /// Key for a (purpose, layer) combination
    pub fn new(purpose: Callout, layer: Layer) -> Self {
        Self { purpose, layer }
    }
}

impl fmt::Display for CalloutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.purpose, self.layer)
    }
}

/// Descriptor added to the engine's policy store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalloutDescriptor {
    /// Callout identity
    pub key: CalloutKey,
    /// Layer the callout applies to
    pub layer: Layer,
    /// Display name
    pub name: String,
    /// Display description
    pub description: String,
}

/// Filter attach/detach notification delivered to a registered callout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    /// A filter referencing the callout was added
    Attached,
    /// A filter referencing the callout was removed
    Detached,
}

/// Notification function registered alongside each classification function
pub type NotifyFn = fn(FilterChange, FilterId) -> Result<()>;

/// Default notification handler: filters attaching or detaching require no
/// bookkeeping in this core.
pub fn notify_filter_change(_change: FilterChange, _filter: FilterId) -> Result<()> {
    Ok(())
}

/// A callout bound to its classification context, registered by value
#[derive(Clone)]
pub struct BoundCallout {
    key: CalloutKey,
    context: Arc<ClassifyContext>,
    notify: NotifyFn,
}

impl BoundCallout {
    /// Bind a callout to the shared context
    pub fn new(key: CalloutKey, context: Arc<ClassifyContext>) -> Self {
        Self {
            key,
            context,
            notify: notify_filter_change,
        }
    }

    /// Replace the notification handler
    pub fn with_notify(mut self, notify: NotifyFn) -> Self {
        self.notify = notify;
        self
    }

    /// Identity of this registration
    pub fn key(&self) -> CalloutKey {
        self.key
    }

    /// Invoke the classification function for one event
    pub fn classify(&self, event: &mut ClassifyEvent) {
        self.key.purpose.classify(&self.context, event);
    }

    /// Deliver a filter attach/detach notification
    pub fn notify(&self, change: FilterChange, filter: FilterId) -> Result<()> {
        (self.notify)(change, filter)
    }
}

impl fmt::Debug for BoundCallout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCallout").field("key", &self.key).finish_non_exhaustive()
    }
}

/// Host filter-engine registration surface
///
/// Fixed contract: a registration is rejected while a prior registration with
/// the same key has not been removed, and unregistering an absent key reports
/// [`EngineError::CalloutNotFound`].
pub trait FilterEngine {
    /// Add a callout descriptor to the policy store
    fn add_callout(&self, descriptor: &CalloutDescriptor) -> Result<()>;

    /// Remove a callout descriptor from the policy store
    fn remove_callout(&self, key: CalloutKey) -> Result<()>;

    /// Register a classification function with the runtime
    fn register(&self, callout: BoundCallout) -> Result<()>;

    /// Unregister a classification function by key
    fn unregister(&self, key: CalloutKey) -> Result<()>;
}

impl<E: FilterEngine + ?Sized> FilterEngine for &E {
    fn add_callout(&self, descriptor: &CalloutDescriptor) -> Result<()> {
        (**self).add_callout(descriptor)
    }

    fn remove_callout(&self, key: CalloutKey) -> Result<()> {
        (**self).remove_callout(key)
    }

    fn register(&self, callout: BoundCallout) -> Result<()> {
        (**self).register(callout)
    }

    fn unregister(&self, key: CalloutKey) -> Result<()> {
        (**self).unregister(key)
    }
}

impl<E: FilterEngine + ?Sized> FilterEngine for Arc<E> {
    fn add_callout(&self, descriptor: &CalloutDescriptor) -> Result<()> {
        (**self).add_callout(descriptor)
    }

    fn remove_callout(&self, key: CalloutKey) -> Result<()> {
        (**self).remove_callout(key)
    }

    fn register(&self, callout: BoundCallout) -> Result<()> {
        (**self).register(callout)
    }

    fn unregister(&self, key: CalloutKey) -> Result<()> {
        (**self).unregister(key)
    }
}

/// Registration manager for the three callout purpose-sets
pub struct CalloutRegistry<E: FilterEngine> {
    engine: E,
    context: Arc<ClassifyContext>,
    config: Config,
}

impl<E: FilterEngine> CalloutRegistry<E> {
    /// Create a registry over an engine and a shared classification context
    pub fn new(engine: E, context: Arc<ClassifyContext>, config: Config) -> Self {
        Self {
            engine,
            context,
            config,
        }
    }

    /// Access the underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Register all three purpose-sets
    ///
    /// On failure, purpose-sets registered earlier in the same call are
    /// unregistered before the error is returned.
    pub fn register_all(&self) -> Result<()> {
        for (index, purpose) in Callout::ALL.into_iter().enumerate() {
            if let Err(err) = self.register_set(purpose) {
                for registered in &Callout::ALL[..index] {
                    if let Err(cleanup_err) = self.unregister_set(*registered) {
                        warn!(purpose = %registered, error = %cleanup_err, "cleanup unregistration failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Unregister all three purpose-sets, idempotently
    pub fn unregister_all(&self) -> Result<()> {
        let mut first_err = None;
        for purpose in Callout::ALL {
            if let Err(err) = self.unregister_set(purpose) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Register every (layer, family) member of one purpose-set
    ///
    /// On the first failing member, every member already registered for this
    /// purpose is unregistered before the original failure is returned.
    pub fn register_set(&self, purpose: Callout) -> Result<()> {
        for layer in self.layers_for(purpose) {
            if let Err(err) = self.register_one(purpose, layer) {
                warn!(purpose = %purpose, layer = %layer, error = %err, "registration failed, rolling back purpose-set");

                // Unregistration tolerates members that never made it in.
                if let Err(cleanup_err) = self.unregister_set(purpose) {
                    warn!(purpose = %purpose, error = %cleanup_err, "rollback unregistration failed");
                }
                return Err(err);
            }
        }

        debug!(purpose = %purpose, "purpose-set registered");
        Ok(())
    }

    /// Unregister every member of one purpose-set
    ///
    /// Removes both the runtime registration and the policy-store descriptor
    /// of each member. Idempotent: absent members count as already
    /// unregistered, since this also runs as the cleanup step after a partial
    /// registration. Every member is attempted; the first real failure is
    /// returned afterwards.
    pub fn unregister_set(&self, purpose: Callout) -> Result<()> {
        let mut first_err = None;

        for layer in self.layers_for(purpose) {
            let key = CalloutKey::new(purpose, layer);

            // Runtime first, then the policy store, reversing registration
            // order.
            for result in [self.engine.unregister(key), self.engine.remove_callout(key)] {
                match result {
                    Ok(()) => {}
                    Err(err) if err.is_not_found() => {}
                    Err(err) => {
                        first_err.get_or_insert(err);
                    }
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Layers a purpose registers at, honoring per-family configuration
    fn layers_for(&self, purpose: Callout) -> Vec<Layer> {
        purpose
            .layers()
            .iter()
            .copied()
            .filter(|layer| self.config.families.enabled(layer.family()))
            .collect()
    }

    fn register_one(&self, purpose: Callout, layer: Layer) -> Result<()> {
        let key = CalloutKey::new(purpose, layer);

        // Logically the runtime registration should come first, but adding
        // the descriptor first reads cleaner. The window is safe: filters
        // referencing an added-but-unregistered callout are treated as block
        // filters by the engine.
        self.engine.add_callout(&self.descriptor(key))?;
        self.engine.register(BoundCallout::new(key, self.context.clone()))
    }

    fn descriptor(&self, key: CalloutKey) -> CalloutDescriptor {
        CalloutDescriptor {
            key,
            layer: key.layer,
            name: format!(
                "{} {} Callout ({})",
                self.config.provider.name,
                key.purpose.role(),
                key.layer.family().label()
            ),
            description: self.config.provider.description_for(key.purpose),
        }
    }
}
