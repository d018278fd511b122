//! PLAYHEAD - Stall-recovery transport controller library
//!
//! Re-exports all modules for use by binary targets.

// Core (engine seam, event bus, recovery, transport state)
pub mod core;

// App modules
pub mod audio;
pub mod cli;
pub mod config;
pub mod events;
pub mod screen;
pub mod utils;

// Re-export commonly used types from core
pub use core::engine::{EngineEvent, EngineEventSender, PlaybackEngine};
pub use core::event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter, SubscriptionHandle};
pub use core::recovery::{RecoveryStatus, RetrySession, StallRecoveryController};
pub use core::scripted::{ScriptedEngine, StallScript};
pub use core::transport::{ToggleGlyph, TransportState};

// Re-export the screen
pub use screen::PlayerScreen;
