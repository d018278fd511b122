//! Core modules - engine seam, events, recovery, transport state
//!
//! These modules form the control layer, independent of any hosting UI.

pub mod engine;
pub mod event_bus;
pub mod recovery;
pub mod scripted;
pub mod transport;

// Re-exports for convenience
pub use engine::{EngineEvent, EngineEventSender, PlaybackEngine};
pub use event_bus::EventBus;
pub use recovery::{RetryTimer, StallRecoveryController};
pub use scripted::ScriptedEngine;
pub use transport::TransportState;
