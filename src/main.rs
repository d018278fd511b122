use playhead::cli::Args;
use playhead::config::{self, PathConfig, PlayerConfig};
use playhead::core::engine::EngineEventSender;
use playhead::core::event_bus::EventBus;
use playhead::core::recovery::RecoveryStatus;
use playhead::core::scripted::ScriptedEngine;
use playhead::core::transport::ToggleGlyph;
use playhead::events::{ScrubBeganEvent, ScrubEndedEvent, ScrubMovedEvent, TogglePlayPauseEvent};
use playhead::screen::PlayerScreen;
use playhead::utils::format_time;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::unbounded;
use log::{debug, info};
use std::time::Duration;

fn main() -> Result<()> {
    let args = Args::parse();

    let paths = PathConfig::new(args.config_dir.clone());

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Initialize logger based on --log flag
    if let Some(log_path_opt) = &args.log_file {
        // File logging with specified verbosity level
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file("playhead.log", &paths));

        let file = std::fs::File::create(&log_path)?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging with specified verbosity level (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }

    info!("Playhead transport controller starting...");
    debug!("Command-line args: {:?}", args);

    let config_path = config::config_file("playhead.json", &paths);
    info!("Config path: {}", config_path.display());
    let config = PlayerConfig::load(&config_path)?;

    if let Some(ref path) = args.file_path {
        info!("Media file: {}", path.display());
    } else {
        info!("No media file provided, running the scripted engine only");
    }

    // Wire the screen around a scripted engine: deterministic media clock,
    // stalls where the CLI put them.
    let (engine_tx, engine_rx) = unbounded();
    let engine = ScriptedEngine::new(args.duration, EngineEventSender::new(engine_tx))
        .with_stalls(args.stall_scripts());
    let bus = EventBus::new();
    let emitter = bus.emitter();
    let mut screen = PlayerScreen::new(
        engine,
        engine_rx,
        bus.clone(),
        args.file_path.as_deref(),
        &config,
    )?;

    screen.engine_mut().announce_ready();

    let tick = 1.0 / config.screen.time_update_hz;
    let mut scrub_pending = args.scrub_to;
    let mut last_line = String::new();
    let max_passes = (args.duration / tick) as usize * 4 + 4000;

    for _ in 0..max_passes {
        screen.engine_mut().advance(tick);

        // Scripted manual scrub: fires while the buffering indicator is up,
        // demonstrating that manual control cancels a pending retry. The
        // trailing toggle is the user resuming playback afterwards.
        if let Some(to) = scrub_pending {
            if screen.is_ready() && screen.transport().spinner_visible {
                info!("scripted scrub to {:.1}s", to);
                emitter.emit(ScrubBeganEvent);
                emitter.emit(ScrubMovedEvent((to / args.duration) as f32));
                emitter.emit(ScrubEndedEvent);
                emitter.emit(TogglePlayPauseEvent);
                scrub_pending = None;
            }
        }

        screen.pump();

        let line = describe(&screen);
        if line != last_line {
            println!("[{}] {}", screen.transport().position_label, line);
            last_line = line;
        }

        if screen.transport().replay_visible || screen.status() == RecoveryStatus::GivingUp {
            break;
        }

        std::thread::sleep(Duration::from_millis(2));
    }

    if screen.status() == RecoveryStatus::GivingUp {
        println!(
            "gave up at {}: buffering indicator stays until the user intervenes",
            format_time(screen.engine().current_position())
        );
    } else if screen.transport().replay_visible {
        println!("finished: replay affordance shown");
    } else {
        println!(
            "stopped at {}",
            format_time(screen.engine().current_position())
        );
    }

    Ok(())
}

/// One-line rendering of the transport surface for the demo transcript.
fn describe(screen: &PlayerScreen<ScriptedEngine>) -> String {
    let t = screen.transport();
    let button = if t.replay_visible {
        "replay"
    } else if t.toggle_visible {
        match t.toggle_glyph {
            ToggleGlyph::Play => "play",
            ToggleGlyph::Pause => "pause",
        }
    } else {
        "-"
    };
    format!(
        "{:?} | spinner {} | button {} | controls {}",
        screen.status(),
        if t.spinner_visible { "on" } else { "off" },
        button,
        if t.controls_enabled { "on" } else { "off" }
    )
}
