//! Player screen wiring - the single hosting surface for one video.
//!
//! **Architecture**: `PlayerScreen` owns the engine, the recovery controller,
//! the transport state and the event wiring. The hosting UI renders
//! [`TransportState`] and posts user intents on the bus; the engine posts
//! notifications on its channel. pump() drains both on the control thread and
//! polls the retry timer, so every decision runs single-threaded in arrival
//! order.
//!
//! # Manual control beats pending recovery
//!
//! A pending automatic retry must never fire after the user has taken over.
//! Toggle, scrub-begin and replay intents raise an interrupt flag through an
//! immediate bus subscription; pump() absorbs the flag before anything else,
//! cancelling the pending probe and handing the surface back. The flag makes
//! the cancellation hold even when the intent was emitted between pump
//! passes.
//!
//! # Teardown
//!
//! Dropping the screen pauses the engine, cancels the retry timer and
//! releases every bus subscription through its handle. No callback can fire
//! against a torn-down screen.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};

use crate::audio;
use crate::config::PlayerConfig;
use crate::core::engine::{at_end, EngineEvent, PlaybackEngine};
use crate::core::event_bus::{downcast_event, BoxedEvent, EventBus, SubscriptionHandle};
use crate::core::recovery::{RecoveryStatus, StallRecoveryController};
use crate::core::transport::{ToggleGlyph, TransportState};
use crate::events::*;
use crate::utils::{format_time, media};

/// One video, one screen: engine + recovery + transport state + wiring.
pub struct PlayerScreen<E: PlaybackEngine> {
    engine: E,
    controller: StallRecoveryController,
    transport: TransportState,
    bus: EventBus,
    engine_rx: Receiver<EngineEvent>,
    subscriptions: Vec<SubscriptionHandle>,
    manual_interrupt: Arc<AtomicBool>,
    autoplay: bool,
    ready: bool,
    torn_down: bool,
}

impl<E: PlaybackEngine> PlayerScreen<E> {
    /// Wire a screen around `engine`.
    ///
    /// `media_path` is the bundled asset the host resolved; only its
    /// extension is validated here - resolving and decoding belong to the
    /// engine, which reports trouble through [`EngineEvent::LoadFailed`].
    pub fn new(
        engine: E,
        engine_rx: Receiver<EngineEvent>,
        bus: EventBus,
        media_path: Option<&Path>,
        config: &PlayerConfig,
    ) -> Result<Self> {
        if let Some(path) = media_path {
            if !media::is_video(path) {
                bail!("unsupported media file: {}", path.display());
            }
            info!("player screen for {}", path.display());
        }

        audio::ensure_session();

        let manual_interrupt = Arc::new(AtomicBool::new(false));
        let mut subscriptions = Vec::new();
        {
            let flag = Arc::clone(&manual_interrupt);
            subscriptions.push(bus.subscribe::<TogglePlayPauseEvent, _>(move |_| {
                flag.store(true, Ordering::SeqCst);
            }));
        }
        {
            let flag = Arc::clone(&manual_interrupt);
            subscriptions.push(bus.subscribe::<ScrubBeganEvent, _>(move |_| {
                flag.store(true, Ordering::SeqCst);
            }));
        }
        {
            let flag = Arc::clone(&manual_interrupt);
            subscriptions.push(bus.subscribe::<ReplayEvent, _>(move |_| {
                flag.store(true, Ordering::SeqCst);
            }));
        }

        Ok(Self {
            engine,
            controller: StallRecoveryController::new(
                config.recovery.max_attempts,
                config.recovery.retry_delay_ms,
            ),
            transport: TransportState::new(),
            bus,
            engine_rx,
            subscriptions,
            manual_interrupt,
            autoplay: config.screen.autoplay,
            ready: false,
            torn_down: false,
        })
    }

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn status(&self) -> RecoveryStatus {
        self.controller.status()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// One control-loop pass: interrupt flag, engine notifications, user
    /// intents, retry timer. Call at the host's frame cadence.
    pub fn pump(&mut self) {
        if self.torn_down {
            return;
        }
        self.absorb_manual_interrupt();

        while let Ok(event) = self.engine_rx.try_recv() {
            self.handle_engine_event(event);
        }

        for event in self.bus.poll() {
            self.handle_intent(&event);
        }

        self.controller
            .tick(&mut self.engine, &mut self.transport);
    }

    /// Pause, cancel pending recovery and release all subscriptions.
    /// Idempotent; also runs on Drop.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.engine.pause();
        self.transport.set_glyph(ToggleGlyph::Play);
        self.controller.abandon("screen teardown");
        for handle in self.subscriptions.drain(..) {
            self.bus.unsubscribe(handle);
        }
        debug!("player screen torn down");
    }

    // === Engine notifications ===

    fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ReadyToPlay => {
                self.ready = true;
                let duration = self.engine.duration();
                info!("media ready, duration {}", format_time(duration));
                self.transport.media_ready(duration);
                if self.autoplay {
                    self.engine.play();
                } else {
                    self.transport.set_glyph(ToggleGlyph::Play);
                }
            }
            EngineEvent::LoadFailed { reason } => {
                // No alternate source exists: log and leave the spinner up.
                error!("media failed to load: {}", reason);
            }
            EngineEvent::TimeUpdate { position } => {
                if !self.ready {
                    debug!("progress before ready ignored: {:.2}s", position);
                    return;
                }
                self.transport.set_progress(position, self.engine.duration());
            }
            EngineEvent::Stalled { position } => {
                if !self.ready {
                    return;
                }
                let duration = self.engine.duration();
                if !self.engine.is_likely_to_keep_up()
                    && position > 0.0
                    && !at_end(position, duration)
                {
                    self.controller
                        .on_stall_detected(&mut self.engine, &mut self.transport);
                } else {
                    debug!("stall notification ignored at {:.2}s", position);
                }
            }
            EngineEvent::PlayedToEnd => {
                info!("played to end");
                self.engine.pause();
                self.controller.abandon("played to end");
                self.transport.show_replay();
            }
            EngineEvent::ItemError { detail } => {
                // Nonfatal by contract; playback likely stays paused.
                warn!("engine item error: {}", detail);
            }
        }
    }

    // === User intents ===

    fn handle_intent(&mut self, event: &BoxedEvent) {
        if downcast_event::<TogglePlayPauseEvent>(event).is_some() {
            if self.engine.is_playing() {
                self.engine.pause();
                self.transport.set_glyph(ToggleGlyph::Play);
            } else {
                self.engine.play();
                self.transport.set_glyph(ToggleGlyph::Pause);
            }
            return;
        }
        if downcast_event::<ScrubBeganEvent>(event).is_some() {
            self.transport.scrubbing = true;
            self.engine.pause();
            return;
        }
        if let Some(ScrubMovedEvent(fraction)) = downcast_event::<ScrubMovedEvent>(event) {
            self.handle_scrub_moved(*fraction);
            return;
        }
        if downcast_event::<ScrubEndedEvent>(event).is_some() {
            self.transport.scrubbing = false;
            let duration = self.engine.duration();
            self.transport
                .reconcile_scrub_affordance(self.engine.current_position(), duration);
            return;
        }
        if downcast_event::<ReplayEvent>(event).is_some() {
            self.handle_replay();
            return;
        }
        if downcast_event::<BackgroundedEvent>(event).is_some() {
            self.engine.pause();
            self.transport.set_glyph(ToggleGlyph::Play);
        }
    }

    fn handle_scrub_moved(&mut self, fraction: f32) {
        if !self.transport.slider_enabled {
            return;
        }
        let duration = self.engine.duration();
        let fraction = fraction.clamp(0.0, 1.0);
        let target = fraction as f64 * duration;

        self.transport.slider_fraction = fraction;
        self.transport.position_label = format_time(target);
        self.engine.seek(target);
        self.transport
            .reconcile_scrub_affordance(self.engine.current_position(), duration);
    }

    fn handle_replay(&mut self) {
        self.engine.seek(0.0);

        if self.transport.replay_visible {
            self.transport.hide_replay_show_toggle();
            self.transport.set_glyph(ToggleGlyph::Pause);
            self.transport.spinner_visible = false;
            self.transport.controls_enabled = true;
            self.engine.play();
            return;
        }

        if !self.engine.is_playing() {
            self.transport.hide_replay_show_toggle();
            self.transport.set_glyph(ToggleGlyph::Play);
        }
    }

    /// Manual control cancels any in-flight automatic recovery and hands the
    /// surface back to the user.
    fn absorb_manual_interrupt(&mut self) {
        if !self.manual_interrupt.swap(false, Ordering::SeqCst) {
            return;
        }
        if self.controller.status() != RecoveryStatus::Idle || self.controller.has_pending_retry() {
            self.controller.abandon("manual control");
            self.transport.spinner_visible = false;
            self.transport.controls_enabled = true;
        }
    }
}

impl<E: PlaybackEngine> Drop for PlayerScreen<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::EngineEventSender;
    use crate::core::scripted::{ScriptedEngine, StallScript};
    use crossbeam_channel::{unbounded, Sender};
    use std::time::Duration;

    const TICK: f64 = 1.0 / 30.0;

    fn test_config() -> PlayerConfig {
        let mut config = PlayerConfig::default();
        config.recovery.retry_delay_ms = 10;
        config
    }

    fn make_screen(
        duration: f64,
        stalls: Vec<StallScript>,
    ) -> (PlayerScreen<ScriptedEngine>, EventBus, Sender<EngineEvent>) {
        let (tx, rx) = unbounded();
        let engine =
            ScriptedEngine::new(duration, EngineEventSender::new(tx.clone())).with_stalls(stalls);
        let bus = EventBus::new();
        let screen = PlayerScreen::new(engine, rx, bus.clone(), None, &test_config()).unwrap();
        (screen, bus, tx)
    }

    /// Advance + pump until `done` or the iteration cap trips.
    fn run_until<F>(screen: &mut PlayerScreen<ScriptedEngine>, max_iters: usize, mut done: F)
    where
        F: FnMut(&PlayerScreen<ScriptedEngine>) -> bool,
    {
        for _ in 0..max_iters {
            screen.engine_mut().advance(TICK);
            screen.pump();
            if done(screen) {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("scenario did not settle within {} iterations", max_iters);
    }

    #[test]
    fn test_rejects_non_video_path() {
        let (tx, rx) = unbounded();
        let engine = ScriptedEngine::new(30.0, EngineEventSender::new(tx));
        let bus = EventBus::new();
        let result = PlayerScreen::new(
            engine,
            rx,
            bus,
            Some(Path::new("poster.png")),
            &test_config(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ready_autoplays_and_clears_spinner() {
        let (mut screen, _bus, _tx) = make_screen(30.0, vec![]);
        assert!(screen.transport().spinner_visible);

        screen.engine_mut().announce_ready();
        screen.pump();

        assert!(screen.is_ready());
        assert!(!screen.transport().spinner_visible);
        assert!(screen.transport().toggle_visible);
        assert_eq!(screen.transport().toggle_glyph, ToggleGlyph::Pause);
        assert_eq!(screen.transport().duration_label, "0:30");
        assert!(screen.engine().is_playing());
    }

    #[test]
    fn test_progress_updates_labels_and_slider() {
        let (mut screen, _bus, _tx) = make_screen(30.0, vec![]);
        screen.engine_mut().announce_ready();
        screen.pump();

        run_until(&mut screen, 600, |s| s.engine().current_position() >= 15.0);
        assert_eq!(screen.transport().position_label, "0:15");
        assert!((screen.transport().slider_fraction - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_stall_recovery_end_to_end() {
        let (mut screen, _bus, _tx) = make_screen(
            30.0,
            vec![StallScript { at: 10.0, starve_for: 0.2 }],
        );
        screen.engine_mut().announce_ready();
        screen.pump();

        // Reach the stall: spinner comes up, controls lock
        run_until(&mut screen, 400, |s| s.transport().spinner_visible);
        assert_eq!(screen.status(), RecoveryStatus::Probing);
        assert!(!screen.transport().controls_enabled);

        // Starvation heals after 0.2s of engine time; the next probe resumes
        run_until(&mut screen, 400, |s| s.status() == RecoveryStatus::Recovering);
        assert!(!screen.transport().spinner_visible);
        assert!(screen.transport().controls_enabled);
        assert!(screen.engine().is_playing());

        // Playback continues past the stall point
        run_until(&mut screen, 400, |s| s.engine().current_position() > 11.0);
    }

    #[test]
    fn test_scrub_cancels_pending_retry_and_reconciles() {
        // Starvation long enough that recovery would keep probing forever
        let (mut screen, bus, _tx) = make_screen(
            30.0,
            vec![StallScript { at: 10.0, starve_for: 600.0 }],
        );
        screen.engine_mut().announce_ready();
        screen.pump();

        run_until(&mut screen, 400, |s| s.transport().spinner_visible);
        assert!(screen.controller.has_pending_retry());

        // User grabs the slider and drags to 29.9s of 30s
        let emitter = bus.emitter();
        emitter.emit(ScrubBeganEvent);
        emitter.emit(ScrubMovedEvent(29.9 / 30.0));
        emitter.emit(ScrubEndedEvent);
        screen.pump();

        assert!(!screen.controller.has_pending_retry());
        assert_eq!(screen.status(), RecoveryStatus::Idle);
        assert!(!screen.transport().spinner_visible);
        assert!(screen.transport().controls_enabled);
        // 29.9s is not the end: toggle with a Play glyph, no replay
        assert!(screen.transport().toggle_visible);
        assert!(!screen.transport().replay_visible);
        assert_eq!(screen.transport().toggle_glyph, ToggleGlyph::Play);
        assert_eq!(screen.transport().position_label, "0:29");
        assert!((screen.engine().current_position() - 29.9).abs() < 1e-6);

        // The cancelled probe never fires
        std::thread::sleep(Duration::from_millis(20));
        screen.pump();
        assert_eq!(screen.status(), RecoveryStatus::Idle);
    }

    #[test]
    fn test_scrub_to_very_end_shows_replay() {
        let (mut screen, bus, _tx) = make_screen(30.0, vec![]);
        screen.engine_mut().announce_ready();
        screen.pump();

        let emitter = bus.emitter();
        emitter.emit(ScrubBeganEvent);
        emitter.emit(ScrubMovedEvent(1.0));
        emitter.emit(ScrubEndedEvent);
        screen.pump();

        assert!(screen.transport().replay_visible);
        assert!(!screen.transport().toggle_visible);
    }

    #[test]
    fn test_played_to_end_then_replay() {
        let (mut screen, bus, _tx) = make_screen(2.0, vec![]);
        screen.engine_mut().announce_ready();
        screen.pump();

        run_until(&mut screen, 400, |s| s.transport().replay_visible);
        assert!(!screen.transport().toggle_visible);
        assert!(!screen.engine().is_playing());
        assert_eq!(screen.status(), RecoveryStatus::Idle);

        bus.emitter().emit(ReplayEvent);
        screen.pump();

        assert_eq!(screen.engine().current_position(), 0.0);
        assert!(screen.engine().is_playing());
        assert!(!screen.transport().replay_visible);
        assert!(screen.transport().toggle_visible);
        assert_eq!(screen.transport().toggle_glyph, ToggleGlyph::Pause);
    }

    #[test]
    fn test_toggle_play_pause_flips_glyph() {
        let (mut screen, bus, _tx) = make_screen(30.0, vec![]);
        screen.engine_mut().announce_ready();
        screen.pump();
        assert!(screen.engine().is_playing());

        bus.emitter().emit(TogglePlayPauseEvent);
        screen.pump();
        assert!(!screen.engine().is_playing());
        assert_eq!(screen.transport().toggle_glyph, ToggleGlyph::Play);

        bus.emitter().emit(TogglePlayPauseEvent);
        screen.pump();
        assert!(screen.engine().is_playing());
        assert_eq!(screen.transport().toggle_glyph, ToggleGlyph::Pause);
    }

    #[test]
    fn test_backgrounded_pauses() {
        let (mut screen, bus, _tx) = make_screen(30.0, vec![]);
        screen.engine_mut().announce_ready();
        screen.pump();

        bus.emitter().emit(BackgroundedEvent);
        screen.pump();

        assert!(!screen.engine().is_playing());
        assert_eq!(screen.transport().toggle_glyph, ToggleGlyph::Play);
    }

    #[test]
    fn test_load_failure_logged_spinner_stays() {
        let (mut screen, _bus, tx) = make_screen(30.0, vec![]);
        tx.send(EngineEvent::LoadFailed { reason: "no such asset".into() })
            .unwrap();
        screen.pump();

        assert!(!screen.is_ready());
        assert!(screen.transport().spinner_visible);
    }

    #[test]
    fn test_stall_at_start_and_end_ignored() {
        let (mut screen, _bus, tx) = make_screen(30.0, vec![]);
        screen.engine_mut().announce_ready();
        screen.pump();

        // Stall "exactly at start" and "exactly at end" are non-recoverable
        // states for the controller; both are filtered out.
        tx.send(EngineEvent::Stalled { position: 0.0 }).unwrap();
        screen.pump();
        assert_eq!(screen.status(), RecoveryStatus::Idle);

        screen.engine_mut().seek(30.0);
        tx.send(EngineEvent::Stalled { position: 30.0 }).unwrap();
        screen.pump();
        assert_eq!(screen.status(), RecoveryStatus::Idle);
    }

    #[test]
    fn test_teardown_releases_subscriptions_and_pauses() {
        let (mut screen, bus, _tx) = make_screen(30.0, vec![]);
        screen.engine_mut().announce_ready();
        screen.pump();
        assert!(bus.has_subscribers::<TogglePlayPauseEvent>());
        assert!(bus.has_subscribers::<ScrubBeganEvent>());
        assert!(bus.has_subscribers::<ReplayEvent>());

        screen.teardown();
        assert!(!bus.has_subscribers::<TogglePlayPauseEvent>());
        assert!(!bus.has_subscribers::<ScrubBeganEvent>());
        assert!(!bus.has_subscribers::<ReplayEvent>());
        assert!(!screen.engine().is_playing());

        // Drop after explicit teardown stays quiet
        drop(screen);
        assert!(!bus.has_subscribers::<TogglePlayPauseEvent>());
    }

    #[test]
    fn test_item_error_is_nonfatal() {
        let (mut screen, _bus, tx) = make_screen(30.0, vec![]);
        screen.engine_mut().announce_ready();
        screen.pump();

        tx.send(EngineEvent::ItemError { detail: "decode hiccup".into() })
            .unwrap();
        screen.pump();

        // Logged only; playback state untouched
        assert!(screen.engine().is_playing());
        assert_eq!(screen.status(), RecoveryStatus::Idle);
    }
}
