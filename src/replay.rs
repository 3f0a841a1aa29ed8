//! Driving a live game one tick at a time, and checking stored paths
//! against it.
//!
//! Each tick applies exactly one input, consumes exactly one snapshot and
//! runs exactly one oracle check before the path grows.

use crate::error::{GameError, ReplayError};
use crate::game::{GameControl, GameLauncher};
use crate::input::InputFrame;
use crate::oracle::{History, Oracle};
use crate::path::{GamePath, ScoreModel};
use serde::Serialize;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Alive,
    Died,
}

/// A game instance, its oracle, and the path recorded so far.
pub struct Session<'o, G, O: ?Sized> {
    game: G,
    oracle: &'o O,
    history: History,
    model: ScoreModel,
    path: GamePath,
}

impl<'o, G: GameControl, O: Oracle + ?Sized> Session<'o, G, O> {
    pub fn new(game: G, oracle: &'o O, model: ScoreModel, lookback: usize) -> Self {
        Self {
            game,
            oracle,
            history: History::new(lookback),
            model,
            path: GamePath::new(),
        }
    }

    pub fn path(&self) -> &GamePath {
        &self.path
    }

    pub fn into_path(self) -> GamePath {
        self.path
    }

    /// Applies `input` for one tick. A violating frame is not recorded.
    pub fn advance(&mut self, input: InputFrame) -> Result<Step, ReplayError> {
        self.game.set_input(input);
        let snapshot = self.game.step()?;
        self.oracle.check(&self.history.with_next(&snapshot))?;
        self.path.append(input, &snapshot, &self.model);
        let dead = snapshot.player_dead();
        self.history.push(snapshot);
        Ok(if dead { Step::Died } else { Step::Alive })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixOutcome {
    /// Every requested entry reproduced.
    Completed,
    /// The player died at `index` while replaying.
    Died { index: usize },
}

/// Replays `stored[1..len]` through `session`, which must be fresh. Every
/// recomputed score must equal the recorded one; the first difference is a
/// fatal [`ReplayError::ScoreMismatch`].
pub fn replay_prefix<G: GameControl, O: Oracle + ?Sized>(
    session: &mut Session<'_, G, O>,
    stored: &GamePath,
    len: usize,
) -> Result<PrefixOutcome, ReplayError> {
    let end = len.min(stored.len());
    for index in 1..end {
        let step = session.advance(stored.inputs()[index])?;
        let expected = stored.scores()[index];
        let actual = session.path().scores()[index];
        if expected != actual {
            return Err(ReplayError::ScoreMismatch {
                index,
                expected,
                actual,
            });
        }
        if step == Step::Died {
            debug!(index, "player died during replay");
            return Ok(PrefixOutcome::Died { index });
        }
    }
    Ok(PrefixOutcome::Completed)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub frames: usize,
    pub final_score: i64,
    pub final_tick: u64,
    pub died: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplaySetup {
    pub fps: u32,
    pub start_level: u32,
    pub lookback: usize,
    pub model: ScoreModel,
}

/// Replays a whole stored path against a freshly started game.
pub fn replay_path<L: GameLauncher, O: Oracle + ?Sized>(
    launcher: &L,
    oracle: &O,
    setup: &ReplaySetup,
    stored: &GamePath,
) -> Result<ReplayReport, ReplayError> {
    let game = launcher.start(setup.fps, setup.start_level)?;
    let mut session = Session::new(game, oracle, setup.model, setup.lookback);
    let outcome = replay_prefix(&mut session, stored, stored.len())?;
    let replayed = session.into_path();
    Ok(ReplayReport {
        frames: replayed.len(),
        final_score: replayed.final_score(),
        final_tick: replayed.final_tick(),
        died: matches!(outcome, PrefixOutcome::Died { .. }),
    })
}

/// True when a game error only means the run is over.
pub fn is_finished(err: &ReplayError) -> bool {
    matches!(err, ReplayError::Game(GameError::Finished { .. }))
}
