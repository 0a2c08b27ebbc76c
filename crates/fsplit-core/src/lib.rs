//! # Flowsplit Core
//!
//! Platform-independent classification core for split tunneling: decides,
//! per socket bind/connect/accept event, whether traffic of a designated
//! ("split") process is redirected off the VPN tunnel, permitted, blocked,
//! or deferred until the process's classification resolves.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Event model** - Fixed values, metadata, and the verdict output record
//! - **Classification functions** - Bind classifier and connection gatekeeper
//! - **Registration management** - All-or-nothing purpose-set registration
//! - **External seams** - Verdict query, bind arbitration, filter engine
//!
//! ## Example
//!
//! ```rust,no_run
//! use fsplit_core::{CalloutRegistry, ClassifyContext, Config};
//! use std::sync::Arc;
//!
//! # fn demo(engine: impl fsplit_core::FilterEngine,
//! #         classifier: Arc<dyn fsplit_core::ProcessClassifier>,
//! #         arbiter: Arc<dyn fsplit_core::BindArbiter>) -> fsplit_core::Result<()> {
//! let context = Arc::new(ClassifyContext::new(classifier, arbiter));
//! let registry = CalloutRegistry::new(engine, context, Config::default());
//!
//! registry.register_all()?;
//! # Ok(())
//! # }
//! ```
//!
//! All classification runs synchronously on the caller's thread. The core
//! holds no locks, caches no verdicts, and treats every event as independent.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arbiter;
pub mod callout;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod layer;
pub mod registry;
pub mod verdict;

// Re-exports for convenience
pub use arbiter::BindArbiter;
pub use callout::Callout;
pub use config::Config;
pub use context::ClassifyContext;
pub use error::{EngineError, Result};
pub use event::{ClassifyEvent, ClassifyHandle, ClassifyOut, FilterAction, FilterId, FilterRef, FixedValues, MetaValues};
pub use layer::{AddressFamily, Layer};
pub use registry::{BoundCallout, CalloutDescriptor, CalloutKey, CalloutRegistry, FilterEngine};
pub use verdict::{ProcessClassifier, ProcessId, SplitVerdict};
