//! Playback engine abstraction and its notification vocabulary.
//!
//! **Architecture**: the crate never decodes, demuxes, or renders. Everything
//! media-related arrives through the [`PlaybackEngine`] trait plus a stream of
//! [`EngineEvent`]s, so the same control layer runs against a platform player,
//! a remote stream, or the scripted engine used in tests.
//!
//! **Used by**: screen (wiring), recovery controller (decisions), scripted
//! engine (test/demo implementation).
//!
//! # Threading
//!
//! Engines may produce events from their own internal threads. Events travel
//! through an [`EngineEventSender`] (crossbeam channel) and are drained on the
//! control thread, so controller code never needs locks.

use crossbeam_channel::Sender;
use log::trace;

/// Periodic progress interval used by engines, in updates per second of
/// media time. Matches a 1/30 s observer cadence.
pub const TIME_UPDATE_HZ: f64 = 30.0;

/// Transport seam between the control layer and whatever actually plays media.
///
/// Implementations maintain their own playhead and buffering state. Methods
/// are deliberately infallible: a platform player does not fail `play()`, it
/// reports trouble later through events (see [`EngineEvent`]).
pub trait PlaybackEngine {
    /// Current playback offset in seconds.
    fn current_position(&self) -> f64;

    /// Total media duration in seconds. May be 0.0 before the asset is ready.
    fn duration(&self) -> f64;

    /// Buffering health hint: enough data ahead to keep playing.
    fn is_likely_to_keep_up(&self) -> bool;

    /// Begin/resume playback. Idempotent.
    fn play(&mut self);

    /// Halt playback. Idempotent.
    fn pause(&mut self);

    /// Whether the engine is currently advancing the playhead.
    fn is_playing(&self) -> bool;

    /// Best-effort seek; no tolerance guarantees.
    fn seek(&mut self, to: f64);
}

/// Asynchronous notifications from the engine, delivered on the control
/// thread via channel drain.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Asset resolved and playable; duration is known from here on.
    ReadyToPlay,

    /// Asset could not be resolved/decoded. No alternate source exists, so
    /// there is no automatic recovery for this one.
    LoadFailed { reason: String },

    /// Periodic progress report.
    TimeUpdate { position: f64 },

    /// Engine cannot supply the next frame without interruption.
    Stalled { position: f64 },

    /// Playhead reached the end of the media.
    PlayedToEnd,

    /// Nonfatal engine-reported item error. Logged only.
    ItemError { detail: String },
}

/// Event sender wrapper for playback engines.
///
/// Engines hold this sender to publish notifications; the control loop owns
/// the receiving end.
#[derive(Clone, Debug)]
pub struct EngineEventSender {
    sender: Option<Sender<EngineEvent>>,
}

impl EngineEventSender {
    /// Create event sender (connected to channel)
    pub fn new(sender: Sender<EngineEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Create dummy sender (for tests or when events not needed)
    pub fn dummy() -> Self {
        Self { sender: None }
    }

    /// Emit event (silent if no receiver)
    pub fn emit(&self, event: EngineEvent) {
        trace!("engine event: {:?}", event);
        if let Some(ref tx) = self.sender {
            let _ = tx.send(event); // Ignore send errors (receiver might be dropped)
        }
    }
}

impl Default for EngineEventSender {
    fn default() -> Self {
        Self::dummy()
    }
}

/// True when `position` has reached the end of a known duration.
///
/// Durations are unknown (0.0) before the asset is ready; nothing counts as
/// "at end" until then.
#[inline]
pub fn at_end(position: f64, duration: f64) -> bool {
    duration > 0.0 && position >= duration
}
