//! # Flowsplit Engine Harness
//!
//! User-mode stand-in for the OS filtering engine: an in-memory policy store
//! and callout runtime implementing the core's [`FilterEngine`] trait, an
//! event dispatcher that invokes registered callouts the way the platform
//! would, and a queue-backed bind arbiter.
//!
//! The harness exists so the classification core can be driven end to end in
//! user mode, with the same registration and write-rights contracts the real
//! engine enforces.
//!
//! [`FilterEngine`]: fsplit_core::FilterEngine

#![warn(missing_docs)]
#![warn(clippy::all)]

mod queue;
mod session;

pub use queue::{PendedBind, QueueArbiter, RedirectedBind};
pub use session::EngineSession;
