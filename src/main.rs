//! Tactics Board Demo
//!
//! Authors a short pick-and-roll, replays it twice on a fixed frame cadence
//! and checks both replays land on the same board state.

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tactics_board::{
    board::annotation::{Anchor, AnnotationDraft},
    core::clock::ManualClock,
    replay::ReplayEvent,
    BoardState, PlayerIndex, Position, SessionConfig, TacticsSession, TokenKey, PLAYER_COUNT,
    VERSION,
};

/// Frame interval of the simulated display (60 Hz).
const FRAME_MS: f64 = 1000.0 / 60.0;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Tactics Board v{}", VERSION);
    info!("Players: {}", PLAYER_COUNT);

    demo_play()
}

fn player(index: usize) -> Result<PlayerIndex> {
    PlayerIndex::new(index).with_context(|| format!("no player {}", index))
}

/// Drag a token through `points`, one sample every 40ms.
fn drag(session: &mut TacticsSession, key: TokenKey, points: &[(f64, f64)], start_ms: u64) -> Result<()> {
    session.begin_drag(key)?;
    for (i, (x, y)) in points.iter().enumerate() {
        session.drag_sample(key, Position::new(*x, *y), start_ms + 40 * i as u64)?;
    }
    session.end_drag(key)?;
    Ok(())
}

/// Play the current system to the end. Returns the final board hash.
fn replay(session: &mut TacticsSession) -> Result<[u8; 32]> {
    session.start_replay()?;
    let mut now = 0.0;
    let mut frames = 0u32;

    loop {
        let result = session.tick(now);
        for event in &result.events {
            match event {
                ReplayEvent::StepCompleted { index } => {
                    if let Some(progress) = session.progress() {
                        info!("Step {} reached ({})", index, progress);
                    }
                }
                ReplayEvent::PossessionChanged { from, to } => {
                    info!("Possession {:?} -> {:?}", from, to);
                }
                ReplayEvent::Finished { last_index } => {
                    info!("Replay finished on step {} after {} frames", last_index, frames);
                }
                _ => {}
            }
        }
        if result.finished {
            break;
        }
        frames += 1;
        if frames > 100_000 {
            bail!("replay did not finish");
        }
        now += FRAME_MS;
    }

    Ok(session.board().compute_hash())
}

/// Demo function to exercise authoring and replay.
fn demo_play() -> Result<()> {
    info!("=== Authoring Demo Play ===");

    let clock = ManualClock::new(1_700_000_000_000);
    let mut session = TacticsSession::with_clock(SessionConfig::default(), clock.clone());

    let pg = player(0)?;
    let big = player(1)?;

    // Step 0: point guard brings the ball up.
    drag(&mut session, TokenKey::Player(pg), &[(200.0, 120.0), (350.0, 220.0), (480.0, 300.0)], 0)?;
    drag(&mut session, TokenKey::Ball, &[(490.0, 305.0)], 200)?;
    session.set_comment("Bring it up")?;
    session.commit_step()?;
    clock.advance(1_000);

    // Step 1: big sets the screen.
    drag(&mut session, TokenKey::Player(big), &[(250.0, 150.0), (400.0, 260.0), (455.0, 320.0)], 1_000)?;
    session.add_annotation(AnnotationDraft::Comment {
        position: Position::ZERO,
        text: "Screen".to_string(),
        anchor: Some(Anchor::Player(big)),
    })?;
    session.mark_player_orientation(big, 90.0)?;
    session.commit_step()?;
    clock.advance(1_000);

    // Step 2: guard comes off the screen, big rolls, pocket pass.
    drag(&mut session, TokenKey::Player(pg), &[(520.0, 340.0), (560.0, 380.0)], 2_000)?;
    drag(&mut session, TokenKey::Player(big), &[(470.0, 380.0), (500.0, 440.0)], 2_200)?;
    drag(&mut session, TokenKey::Ball, &[(530.0, 400.0), (505.0, 445.0)], 2_400)?;
    session.set_comment("Pocket pass to the roller")?;
    session.commit_step()?;

    info!(
        "Authored {} steps, ball holder: {:?}",
        session.step_count(),
        session.board().possessor()
    );

    info!("=== Replaying ===");
    session.set_pass_delay(300.0);
    let first = replay(&mut session)?;
    info!("Final State Hash: {}", hex::encode(first));

    info!("=== Verifying Replay Determinism ===");
    let second = replay(&mut session)?;
    info!("Replay State Hash: {}", hex::encode(second));

    let mut expected = BoardState::initial();
    if let Some(last) = session.timeline().current_system()?.steps.last() {
        last.apply_to(&mut expected);
    }

    debug!("Final view: {}", session.view().to_json().context("failed to encode view")?);

    if first == second && first == expected.compute_hash() {
        info!("DETERMINISM VERIFIED: Hashes match!");
        Ok(())
    } else {
        bail!("replay hashes differ");
    }
}
