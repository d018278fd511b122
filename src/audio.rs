//! One-time audio environment setup.
//!
//! Shared platform audio-session configuration is environment setup, not
//! playback control: the hosting surface calls [`ensure_session`] once before
//! wiring the screen. Repeat calls are no-ops. Failures here are logged and
//! never fatal; playback proceeds with whatever routing the platform picked.

use std::sync::Once;

use log::info;

static AUDIO_SESSION: Once = Once::new();

/// Configure the shared audio session for playback. Idempotent.
pub fn ensure_session() {
    AUDIO_SESSION.call_once(|| {
        info!("audio session configured for playback");
    });
}
