//! Scripted playback engine - deterministic timing double for demo and tests.
//!
//! **Why**: the crate's Non-goals exclude real decoding. This engine fabricates
//! only what the control layer observes: a media clock, a keep-up hint, and
//! the notification stream. Stalls are scripted as (position, starvation
//! time) pairs, so scenarios replay identically every run.
//!
//! **Used by**: the demo binary and the screen integration tests.
//!
//! # Model
//!
//! advance(dt) moves the media clock while playing. Crossing a scripted stall
//! position freezes the clock, flips the keep-up hint off and emits
//! [`EngineEvent::Stalled`]; the hint heals after the scripted starvation
//! time has elapsed in advance() calls. Reaching the duration clamps, stops
//! and emits [`EngineEvent::PlayedToEnd`] once.

use log::debug;

use crate::core::engine::{EngineEvent, EngineEventSender, PlaybackEngine};

/// One scripted stall: starve the buffer when the playhead crosses `at`.
#[derive(Debug, Clone, Copy)]
pub struct StallScript {
    /// Media position (seconds) that triggers the stall.
    pub at: f64,
    /// How long the keep-up hint stays false, in advance() time.
    pub starve_for: f64,
}

#[derive(Debug, Clone, Copy)]
struct ActiveStall {
    remaining: f64,
}

/// Deterministic [`PlaybackEngine`] with scripted stalls.
pub struct ScriptedEngine {
    position: f64,
    duration: f64,
    playing: bool,
    ready: bool,
    ended: bool,
    keep_up: bool,
    scripts: Vec<StallScript>,
    stalled: Option<ActiveStall>,
    events: EngineEventSender,
}

impl ScriptedEngine {
    pub fn new(duration: f64, events: EngineEventSender) -> Self {
        Self {
            position: 0.0,
            duration,
            playing: false,
            ready: false,
            ended: false,
            keep_up: true,
            scripts: Vec::new(),
            stalled: None,
            events,
        }
    }

    /// Attach scripted stalls (builder style).
    pub fn with_stalls(mut self, mut scripts: Vec<StallScript>) -> Self {
        scripts.sort_by(|a, b| a.at.total_cmp(&b.at));
        self.scripts = scripts;
        self
    }

    /// Asset "loaded": duration becomes observable, ReadyToPlay goes out.
    pub fn announce_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        self.events.emit(EngineEvent::ReadyToPlay);
    }

    /// Whether a scripted stall is currently starving the buffer.
    pub fn is_stalled(&self) -> bool {
        self.stalled.is_some()
    }

    /// Advance the media clock by `dt` seconds.
    ///
    /// While starved the clock is frozen; `dt` counts against the scripted
    /// starvation time instead, and progress reports keep flowing with the
    /// frozen position (the platform's periodic observer does the same).
    pub fn advance(&mut self, dt: f64) {
        if !self.ready || self.ended {
            return;
        }

        if let Some(active) = &mut self.stalled {
            active.remaining -= dt;
            if active.remaining <= 0.0 {
                self.stalled = None;
                self.keep_up = true;
                debug!("scripted engine: buffer healed at {:.2}s", self.position);
            }
            self.events.emit(EngineEvent::TimeUpdate { position: self.position });
            return;
        }

        if !self.playing {
            return;
        }

        let new_pos = self.position + dt;

        // Scripted stall crossed this step?
        if let Some(idx) = self
            .scripts
            .iter()
            .position(|s| s.at > self.position && s.at <= new_pos)
        {
            let script = self.scripts.remove(idx);
            self.position = script.at;
            self.keep_up = false;
            self.stalled = Some(ActiveStall { remaining: script.starve_for });
            debug!(
                "scripted engine: stalling at {:.2}s for {:.2}s",
                script.at, script.starve_for
            );
            self.events.emit(EngineEvent::TimeUpdate { position: self.position });
            self.events.emit(EngineEvent::Stalled { position: self.position });
            return;
        }

        if new_pos >= self.duration {
            self.position = self.duration;
            self.playing = false;
            self.ended = true;
            self.events.emit(EngineEvent::TimeUpdate { position: self.position });
            self.events.emit(EngineEvent::PlayedToEnd);
            return;
        }

        self.position = new_pos;
        self.events.emit(EngineEvent::TimeUpdate { position: self.position });
    }
}

impl PlaybackEngine for ScriptedEngine {
    fn current_position(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        if self.ready { self.duration } else { 0.0 }
    }

    fn is_likely_to_keep_up(&self) -> bool {
        self.keep_up
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn seek(&mut self, to: f64) {
        self.position = to.clamp(0.0, self.duration);
        if self.position < self.duration {
            self.ended = false;
        }
        // Seeking lands on freshly buffered data: any active starvation ends
        if self.stalled.take().is_some() {
            self.keep_up = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn drain(rx: &crossbeam_channel::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        rx.try_iter().collect()
    }

    fn stalled_events(events: &[EngineEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, EngineEvent::Stalled { .. }))
            .count()
    }

    #[test]
    fn test_not_ready_reports_zero_duration() {
        let engine = ScriptedEngine::new(30.0, EngineEventSender::dummy());
        assert_eq!(engine.duration(), 0.0);
    }

    #[test]
    fn test_advance_emits_progress() {
        let (tx, rx) = unbounded();
        let mut engine = ScriptedEngine::new(30.0, EngineEventSender::new(tx));
        engine.announce_ready();
        engine.play();
        engine.advance(1.0);
        engine.advance(1.0);

        assert_eq!(engine.current_position(), 2.0);
        let events = drain(&rx);
        // ReadyToPlay + two TimeUpdates
        assert!(matches!(events[0], EngineEvent::ReadyToPlay));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_scripted_stall_freezes_clock_and_heals() {
        let (tx, rx) = unbounded();
        let mut engine = ScriptedEngine::new(30.0, EngineEventSender::new(tx))
            .with_stalls(vec![StallScript { at: 10.0, starve_for: 2.0 }]);
        engine.announce_ready();
        engine.play();

        engine.advance(10.5); // crosses the stall position
        assert_eq!(engine.current_position(), 10.0);
        assert!(engine.is_stalled());
        assert!(!engine.is_likely_to_keep_up());

        // Frozen while starved
        engine.advance(1.0);
        assert_eq!(engine.current_position(), 10.0);
        assert!(engine.is_stalled());

        // Healed after starve_for total
        engine.advance(1.5);
        assert!(!engine.is_stalled());
        assert!(engine.is_likely_to_keep_up());

        // Clock moves again
        engine.advance(1.0);
        assert_eq!(engine.current_position(), 11.0);

        assert_eq!(stalled_events(&drain(&rx)), 1);
    }

    #[test]
    fn test_end_of_media_emits_once_and_stops() {
        let (tx, rx) = unbounded();
        let mut engine = ScriptedEngine::new(3.0, EngineEventSender::new(tx));
        engine.announce_ready();
        engine.play();
        engine.advance(5.0);

        assert_eq!(engine.current_position(), 3.0);
        assert!(!engine.is_playing());

        engine.advance(1.0); // past the end: inert
        let events = drain(&rx);
        let ends = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::PlayedToEnd))
            .count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn test_seek_clears_stall_and_end_state() {
        let mut engine = ScriptedEngine::new(30.0, EngineEventSender::dummy())
            .with_stalls(vec![StallScript { at: 10.0, starve_for: 60.0 }]);
        engine.announce_ready();
        engine.play();
        engine.advance(10.5);
        assert!(engine.is_stalled());

        engine.seek(20.0);
        assert!(!engine.is_stalled());
        assert!(engine.is_likely_to_keep_up());
        assert_eq!(engine.current_position(), 20.0);

        engine.advance(15.0);
        assert_eq!(engine.current_position(), 30.0);

        engine.seek(0.0);
        engine.play();
        engine.advance(1.0);
        assert_eq!(engine.current_position(), 1.0);
    }

    #[test]
    fn test_seek_clamps_to_media_bounds() {
        let mut engine = ScriptedEngine::new(30.0, EngineEventSender::dummy());
        engine.announce_ready();
        engine.seek(-5.0);
        assert_eq!(engine.current_position(), 0.0);
        engine.seek(99.0);
        assert_eq!(engine.current_position(), 30.0);
    }
}
