//! Transport surface state - what the hosting UI renders.
//!
//! **Why**: layout, styling and assets belong to the host. The control layer
//! only decides *which* affordances are visible (spinner, play/pause toggle,
//! replay) and what the slider/labels show; the host draws them.
//!
//! **Used by**: screen (mutation), recovery controller (buffering feedback).
//!
//! # Affordance rules
//!
//! The play/pause toggle and the replay affordance are mutually exclusive.
//! Both stay hidden until the asset is ready. The buffering spinner animates
//! from construction (nothing is ready yet) and whenever a stall is being
//! probed; while it spins, the transport controls are disabled.

use log::trace;

use crate::core::engine::at_end;
use crate::utils::format_time;

/// Glyph shown on the transport toggle button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleGlyph {
    Play,
    Pause,
}

/// User-visible transport state. Pure data; no drawing.
#[derive(Debug, Clone)]
pub struct TransportState {
    /// Buffering indicator. Animating until the asset is ready.
    pub spinner_visible: bool,
    /// Whether the controls container accepts user interaction.
    pub controls_enabled: bool,
    /// Play vs Pause glyph on the transport toggle.
    pub toggle_glyph: ToggleGlyph,
    /// Transport toggle button visibility.
    pub toggle_visible: bool,
    /// Replay affordance visibility (end-of-media or terminal give-up path).
    pub replay_visible: bool,
    /// Scrub control enablement; off until the asset is ready.
    pub slider_enabled: bool,
    /// Scrub position as a 0..=1 fraction of duration.
    pub slider_fraction: f32,
    /// Formatted current position, "m:ss".
    pub position_label: String,
    /// Formatted media duration, "m:ss".
    pub duration_label: String,
    /// User finger is on the slider; progress updates must not fight it.
    pub scrubbing: bool,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            spinner_visible: true,
            controls_enabled: true,
            toggle_glyph: ToggleGlyph::Pause,
            toggle_visible: false,
            replay_visible: false,
            slider_enabled: false,
            slider_fraction: 0.0,
            position_label: "0:00".to_string(),
            duration_label: "0:00".to_string(),
            scrubbing: false,
        }
    }
}

impl TransportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stall is being probed: spinner on, controls locked, toggle hidden.
    pub fn show_buffering(&mut self) {
        self.controls_enabled = false;
        self.spinner_visible = true;
        self.toggle_visible = false;
        trace!("transport: buffering indicator shown, controls disabled");
    }

    /// Asset is ready: spinner off, scrubbing allowed, duration known.
    /// Playback auto-starts at ready, so the toggle shows Pause.
    pub fn media_ready(&mut self, duration: f64) {
        self.spinner_visible = false;
        self.slider_enabled = true;
        self.duration_label = format_time(duration);
        self.toggle_glyph = ToggleGlyph::Pause;
        self.toggle_visible = true;
        trace!("transport: media ready, duration {}", self.duration_label);
    }

    /// Recovery succeeded: spinner off, controls usable again, Pause glyph.
    pub fn resume_feedback(&mut self) {
        self.spinner_visible = false;
        self.controls_enabled = true;
        self.toggle_glyph = ToggleGlyph::Pause;
        self.toggle_visible = true;
        self.replay_visible = false;
        trace!("transport: resumed, controls re-enabled");
    }

    /// End-of-media or terminal give-up: swap the toggle for replay.
    pub fn show_replay(&mut self) {
        self.spinner_visible = false;
        self.toggle_visible = false;
        self.replay_visible = true;
        trace!("transport: replay affordance shown");
    }

    /// Inverse of show_replay().
    pub fn hide_replay_show_toggle(&mut self) {
        self.replay_visible = false;
        self.toggle_visible = true;
    }

    pub fn set_glyph(&mut self, glyph: ToggleGlyph) {
        self.toggle_glyph = glyph;
    }

    /// Periodic progress update. Skipped while the user holds the slider.
    pub fn set_progress(&mut self, position: f64, duration: f64) {
        if self.scrubbing {
            return;
        }
        if !position.is_finite() || duration <= 0.0 {
            return;
        }
        self.position_label = format_time(position);
        self.slider_fraction = (position / duration).clamp(0.0, 1.0) as f32;
    }

    /// Decide which affordance a scrub should leave behind.
    ///
    /// Scrubbing to (or past) the end lands on the replay affordance; anywhere
    /// else shows the toggle with a Play glyph, since scrubbing pauses the
    /// engine.
    pub fn reconcile_scrub_affordance(&mut self, position: f64, duration: f64) {
        let target = self.slider_fraction as f64 * duration;
        if at_end(position, duration) || at_end(target, duration) || self.slider_fraction >= 1.0 {
            self.show_replay();
        } else {
            self.toggle_glyph = ToggleGlyph::Play;
            self.hide_replay_show_toggle();
        }
    }
}
