//! Stall recovery - bounded retry state machine for playback stalls.
//!
//! **Architecture**: the controller does NOT own the engine or the transport
//! state. It receives both when a decision has to run, mutates the session,
//! and leaves everything else to the screen. One controller instance lives as
//! long as the screen does; sessions are cheap and recreated per stall
//! episode.
//!
//! **Why**: a stall is usually transient. Tearing the UI down on the first
//! hiccup flickers the spinner on single-sample buffering dips; waiting
//! forever hangs the screen. The policy here bounds the wait:
//! - first retry is immediate (absorbs one-sample dips without visible churn)
//! - further retries wait a fixed delay between probes
//! - at budget exhaustion, one forced resume is attempted, then nothing
//!
//! With the default budget of 20 attempts and 500 ms delay the total
//! automatic wait is bounded at ~10 s before the controller gives up.
//!
//! **Used by**: screen (stall events, timer ticks, manual-control abandons).
//!
//! # Decision routine
//!
//! `evaluate_recovery()` is a five-way tie-break, re-entered until terminal:
//! finished → replay affordance; over budget → give up (spinner stays);
//! first attempt → immediate re-probe; engine likely to keep up → resume;
//! otherwise → wait one delay and probe again.
//!
//! # Ordering
//!
//! All entry points run on the control thread, in notification arrival order.
//! The delayed re-probe is a cancellable one-shot timer polled by tick();
//! manual transport actions cancel it through abandon(), so a stale retry can
//! never fire after the user has taken over.

use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use uuid::Uuid;

use crate::core::engine::{at_end, PlaybackEngine};
use crate::core::transport::TransportState;

/// Default retry budget: automatic recovery attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Default delay between delayed re-probes.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Where a recovery session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStatus {
    /// No stall being handled.
    Idle,
    /// A stall was observed; probes are running.
    Probing,
    /// Probe succeeded, playback resumed. Terminal (success).
    Recovering,
    /// Budget exhausted. Terminal; only external intervention helps.
    GivingUp,
    /// Playhead turned out to be at end-of-media. Terminal (finished).
    Succeeded,
}

/// One stall episode: attempt counter plus status.
///
/// `attempt_count` starts at 0 (the "not started" sentinel) and is bumped by
/// the decision routine only. It never exceeds `max_attempts + 1`.
#[derive(Debug, Clone)]
pub struct RetrySession {
    /// Log-correlation id for this episode.
    pub id: Uuid,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub status: RecoveryStatus,
}

impl RetrySession {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt_count: 0,
            max_attempts,
            status: RecoveryStatus::Idle,
        }
    }

    /// Terminal states schedule no further attempts.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            RecoveryStatus::Recovering | RecoveryStatus::GivingUp | RecoveryStatus::Succeeded
        )
    }

    pub fn within_budget(&self) -> bool {
        self.attempt_count <= self.max_attempts
    }
}

/// Cancellable one-shot retry timer.
///
/// Polled from the control loop via tick(); nothing fires between loop
/// passes, which is what keeps the whole state machine single-threaded.
/// schedule() resets any pending deadline (last schedule wins).
#[derive(Debug, Clone)]
pub struct RetryTimer {
    delay: Duration,
    pending: Option<Instant>,
}

impl RetryTimer {
    /// Create with custom delay
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            pending: None,
        }
    }

    /// Get current delay in milliseconds
    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }

    /// Arm the timer one delay from now.
    pub fn schedule(&mut self) {
        let trigger_at = Instant::now() + self.delay;
        self.pending = Some(trigger_at);
        trace!("RetryTimer: armed, fires in {}ms", self.delay.as_millis());
    }

    /// Arm the timer to fire on the next tick (the fast first retry).
    pub fn schedule_immediate(&mut self) {
        self.pending = Some(Instant::now());
        trace!("RetryTimer: armed for immediate fire");
    }

    /// Disarm any pending fire.
    pub fn cancel(&mut self) {
        if self.pending.is_some() {
            trace!("RetryTimer: cancelled pending fire");
        }
        self.pending = None;
    }

    /// Check whether the deadline has passed. Clears the pending state when
    /// it fires.
    pub fn tick(&mut self) -> bool {
        let Some(trigger_at) = self.pending else {
            return false;
        };

        if Instant::now() >= trigger_at {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Converts a sequence of stall signals into a bounded sequence of recovery
/// attempts, with user-visible feedback at each stage.
pub struct StallRecoveryController {
    session: RetrySession,
    timer: RetryTimer,
    max_attempts: u32,
    /// The one best-effort resume at budget exhaustion. Never repeated.
    forced_resume_done: bool,
}

impl StallRecoveryController {
    pub fn new(max_attempts: u32, retry_delay_ms: u64) -> Self {
        Self {
            session: RetrySession::new(max_attempts),
            timer: RetryTimer::new(retry_delay_ms),
            max_attempts,
            forced_resume_done: false,
        }
    }

    pub fn session(&self) -> &RetrySession {
        &self.session
    }

    pub fn status(&self) -> RecoveryStatus {
        self.session.status
    }

    pub fn has_pending_retry(&self) -> bool {
        self.timer.is_pending()
    }

    /// A stall notification passed the screen's filter (position strictly
    /// between zero and duration, keep-up hint false).
    ///
    /// Within budget: bump the counter, mark the session probing, lock the
    /// transport surface behind the spinner and evaluate. Over budget: no-op,
    /// the terminal state is already on screen.
    pub fn on_stall_detected(
        &mut self,
        engine: &mut dyn PlaybackEngine,
        transport: &mut TransportState,
    ) {
        if !self.session.within_budget() {
            debug!(
                "stall ignored, retry budget exhausted (session {}, {} attempts)",
                self.session.id, self.session.attempt_count
            );
            return;
        }

        if self.session.is_terminal() {
            // Fresh episode after a successful recovery or a finished video.
            self.session = RetrySession::new(self.max_attempts);
            self.forced_resume_done = false;
        }

        self.session.attempt_count += 1;
        self.session.status = RecoveryStatus::Probing;
        if self.session.attempt_count == 1 {
            info!(
                "stall at {:.2}s, starting recovery session {}",
                engine.current_position(),
                self.session.id
            );
        }
        transport.show_buffering();
        self.evaluate_recovery(engine, transport);
    }

    /// The five-way tie-break. Re-entered (via the timer) until terminal.
    pub fn evaluate_recovery(
        &mut self,
        engine: &mut dyn PlaybackEngine,
        transport: &mut TransportState,
    ) {
        let position = engine.current_position();
        let duration = engine.duration();

        // 1. Playhead reached the end while we were probing: not a stall,
        //    the video finished. Replay affordance takes over.
        if at_end(position, duration) {
            info!("recovery session {}: playhead at end, finishing", self.session.id);
            self.session.status = RecoveryStatus::Succeeded;
            self.timer.cancel();
            engine.pause();
            transport.show_replay();
            return;
        }

        // 2. Budget exhausted: spinner stays up indefinitely.
        if !self.session.within_budget() {
            self.give_up(engine);
            return;
        }

        // 3. Fast first retry: re-probe on the next tick without touching the
        //    visible state. Absorbs single-sample buffering dips.
        if self.session.attempt_count == 1 {
            trace!("recovery session {}: fast first retry", self.session.id);
            self.session.attempt_count += 1;
            self.timer.schedule_immediate();
            return;
        }

        // 4. Engine says it can keep up again: resume and hand the surface back.
        if engine.is_likely_to_keep_up() {
            info!(
                "recovery session {}: engine likely to keep up after {} attempts, resuming",
                self.session.id, self.session.attempt_count
            );
            self.session.status = RecoveryStatus::Recovering;
            self.timer.cancel();
            transport.resume_feedback();
            if !engine.is_playing() {
                engine.play();
            }
            return;
        }

        // 5. Still starved: wait one delay and probe again. The tick handler
        //    decides between another evaluation and the forced resume.
        self.session.attempt_count += 1;
        trace!(
            "recovery session {}: attempt {}/{}, waiting {}ms",
            self.session.id,
            self.session.attempt_count,
            self.session.max_attempts,
            self.timer.delay_ms()
        );
        self.timer.schedule();
    }

    /// Poll the retry timer. Call once per control-loop pass.
    pub fn tick(&mut self, engine: &mut dyn PlaybackEngine, transport: &mut TransportState) {
        if !self.timer.tick() {
            return;
        }

        // Session abandoned (manual control) between arming and firing.
        if self.session.attempt_count == 0 {
            return;
        }

        if self.session.within_budget() {
            self.evaluate_recovery(engine, transport);
        } else {
            self.give_up(engine);
        }
    }

    /// Budget exhausted: terminal give-up plus the single best-effort resume.
    /// The spinner stays; "maybe-choppy playback" beats "stuck forever", but
    /// the session is over either way.
    fn give_up(&mut self, engine: &mut dyn PlaybackEngine) {
        self.timer.cancel();
        if self.session.status != RecoveryStatus::GivingUp {
            warn!(
                "recovery session {}: giving up after {} attempts",
                self.session.id, self.session.attempt_count
            );
            self.session.status = RecoveryStatus::GivingUp;
        }
        if !self.forced_resume_done {
            self.forced_resume_done = true;
            info!("recovery session {}: forced resume attempt", self.session.id);
            engine.play();
        }
    }

    /// User took manual control (pause, scrub, replay) or the screen is being
    /// torn down: cancel any pending probe and discard the session.
    pub fn abandon(&mut self, why: &str) {
        if self.timer.is_pending() || self.session.attempt_count > 0 {
            debug!("recovery session {} abandoned: {}", self.session.id, why);
        }
        self.timer.cancel();
        self.session = RetrySession::new(self.max_attempts);
        self.forced_resume_done = false;
    }
}
