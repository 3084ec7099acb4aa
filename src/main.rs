//! Arcade Loop entry point
//!
//! Headless driver: runs one game through a scripted key sequence at a
//! steady 60 fps and logs snapshots as it goes.
//!
//! Usage: `arcade-loop [game] [seconds]`

use arcade_loop::Settings;
use arcade_loop::games::{Asteroids, Breakout, Flappy, Frogger, GameKind, Invaders, Pong, Snake, Tetris};
use arcade_loop::persistence::ScoreSink;
use arcade_loop::platform::command_for_key;
use arcade_loop::sim::{Command, Game, GamePhase, Session};

/// Display refresh the driver pretends to run at
const FRAME_MS: f64 = 1000.0 / 60.0;
/// Frames between scripted key changes
const KEY_EVERY: u64 = 30;
/// Frames between logged snapshots
const SNAPSHOT_EVERY: u64 = 60;
const DEFAULT_SECONDS: u32 = 30;

/// Keys the script cycles through; each is held until the next one
const SCRIPT: [&str; 8] = [
    "ArrowLeft", " ", "ArrowUp", "x", "ArrowRight", " ", "ArrowDown", "w",
];

fn run<G: Game>(game: G, kind: GameKind, settings: &Settings, sink: Box<dyn ScoreSink>, seconds: u32) {
    let mut session = Session::new(game, settings, sink);
    let frames = (seconds as f64 * 1000.0 / FRAME_MS).ceil() as u64;
    log::info!("{}: running {} frames", kind.as_str(), frames);

    session.push(Command::Start);
    let mut held: Option<&str> = None;
    for frame in 0..frames {
        if frame % KEY_EVERY == 0 {
            if let Some(command) = held.take().and_then(|key| command_for_key(key, false, kind)) {
                session.push(command);
            }
            let key = SCRIPT[(frame / KEY_EVERY) as usize % SCRIPT.len()];
            if let Some(command) = command_for_key(key, true, kind) {
                session.push(command);
            }
            held = Some(key);
        }

        session.frame(FRAME_MS);

        if frame % SNAPSHOT_EVERY == 0 {
            let snapshot = session.snapshot();
            log::info!(
                "frame {:>5} tick {:>6} {:?} score {} level {} lives {}",
                frame,
                snapshot.tick,
                snapshot.phase,
                snapshot.round.score,
                snapshot.round.level,
                snapshot.round.lives
            );
            match serde_json::to_string(&snapshot) {
                Ok(json) => log::debug!("{}", json),
                Err(err) => log::warn!("snapshot not serializable: {}", err),
            }
        }

        if session.phase() == GamePhase::GameOver {
            break;
        }
    }

    let round = session.round();
    log::info!(
        "{}: finished {:?} with score {} (best {}) at level {}",
        kind.as_str(),
        session.phase(),
        round.score,
        round.high_score,
        round.level
    );
}

fn launch(kind: GameKind, settings: &Settings, sink: Box<dyn ScoreSink>, seconds: u32) {
    match kind {
        GameKind::Asteroids => run(Asteroids::new(), kind, settings, sink, seconds),
        GameKind::Breakout => run(Breakout::new(), kind, settings, sink, seconds),
        GameKind::Flappy => run(Flappy::new(), kind, settings, sink, seconds),
        GameKind::Frogger => run(Frogger::new(), kind, settings, sink, seconds),
        GameKind::Invaders => run(Invaders::new(), kind, settings, sink, seconds),
        GameKind::Pong => run(Pong::new(), kind, settings, sink, seconds),
        GameKind::Snake => run(Snake::new(), kind, settings, sink, seconds),
        GameKind::Tetris => run(Tetris::new(), kind, settings, sink, seconds),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::Path;

    use arcade_loop::persistence::JsonFileSink;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Arcade Loop (native) starting...");

    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| GameKind::Asteroids.as_str().to_string());
    let Some(kind) = GameKind::from_name(&name) else {
        let known: Vec<_> = GameKind::ALL.iter().map(|k| k.as_str()).collect();
        log::error!("Unknown game '{}'; expected one of: {}", name, known.join(", "));
        std::process::exit(2);
    };
    let seconds = match args.next().map(|s| s.parse::<u32>()) {
        None => DEFAULT_SECONDS,
        Some(Ok(seconds)) => seconds,
        Some(Err(err)) => {
            log::error!("Bad duration: {}", err);
            std::process::exit(2);
        }
    };

    let settings = Settings::load_or_default(Path::new("arcade-loop.json"));
    let sink = JsonFileSink::open_or_empty("arcade-loop-scores.json");
    launch(kind, &settings, Box::new(sink), seconds);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    use arcade_loop::persistence::LocalStorageSink;

    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::error_1(&format!("logger init failed: {}", err).into());
    }
    log::info!("Arcade Loop starting...");

    let settings = Settings::load();
    launch(
        GameKind::Asteroids,
        &settings,
        Box::new(LocalStorageSink::load()),
        DEFAULT_SECONDS,
    );
}
