//! User-intent events posted by the hosting UI.
//!
//! The host renders [`crate::core::transport::TransportState`] and translates
//! taps and slider touches into these events; the screen drains them in
//! arrival order on the control thread.

// === Transport ===

#[derive(Clone, Debug)]
pub struct TogglePlayPauseEvent;

#[derive(Clone, Debug)]
pub struct ReplayEvent;

// === Scrubbing ===

#[derive(Clone, Debug)]
pub struct ScrubBeganEvent;

/// Slider moved to a new 0..=1 fraction of the duration.
#[derive(Clone, Debug)]
pub struct ScrubMovedEvent(pub f32);

#[derive(Clone, Debug)]
pub struct ScrubEndedEvent;

// === Host lifecycle ===

/// The hosting app is resigning active; playback must not keep running.
#[derive(Clone, Debug)]
pub struct BackgroundedEvent;
