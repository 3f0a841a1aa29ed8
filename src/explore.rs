//! Corpus-guided exploration.
//!
//! Each try starts a fresh game, replays a seed path (checking every score
//! against the recording), then extends it with generated moves until the
//! interval runs out, the player dies, or the oracle objects. The result is
//! offered to the corpus, which is cleaned and checkpointed after every
//! iteration.

use crate::config::ExplorationConfig;
use crate::corpus::{backtrack, AddOutcome, Corpus};
use crate::error::ReplayError;
use crate::game::GameLauncher;
use crate::moves::MovePolicy;
use crate::oracle::Oracle;
use crate::path::GamePath;
use crate::replay::{is_finished, replay_prefix, PrefixOutcome, Session, Step};
use crate::store;
use anyhow::{Context, Result};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExplorationReport {
    pub iterations: u32,
    pub playouts: u32,
    pub deaths: u32,
    pub violations: u32,
    pub seeds_deleted: u32,
    /// Fresh seeds drawn mid-iteration after a lost seed or a violation.
    pub reseeds: u32,
    pub paths_inserted: u32,
    pub splits_inserted: u32,
    pub duplicates: u32,
    pub cleaned: usize,
    pub corpus_size: usize,
    pub best_score: i64,
    pub best_frames: usize,
}

enum Playout {
    /// The seed died (or broke the oracle) while being replayed.
    SeedLost,
    Finished {
        died: bool,
        violated: bool,
        added: AddOutcome,
    },
}

pub struct Explorer<'a, L, O: ?Sized> {
    config: &'a ExplorationConfig,
    launcher: &'a L,
    oracle: &'a O,
    moves: MovePolicy,
}

impl<'a, L: GameLauncher, O: Oracle + ?Sized> Explorer<'a, L, O> {
    pub fn new(config: &'a ExplorationConfig, launcher: &'a L, oracle: &'a O) -> Result<Self> {
        config.validate().context("invalid exploration config")?;
        Ok(Self {
            config,
            launcher,
            oracle,
            moves: config.move_policy()?,
        })
    }

    /// Loads (or creates) the corpus named by the config, explores, and
    /// returns the final corpus alongside a summary.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Corpus, ExplorationReport)> {
        let settings = self.config.corpus_settings();
        let mut corpus = if self.config.load_paths {
            store::load(&self.config.corpus_file, settings).with_context(|| {
                format!("loading corpus {}", self.config.corpus_file.display())
            })?
        } else {
            Corpus::new(settings)
        };
        let report = self.explore(&mut corpus, rng)?;
        Ok((corpus, report))
    }

    pub fn explore<R: Rng + ?Sized>(
        &self,
        corpus: &mut Corpus,
        rng: &mut R,
    ) -> Result<ExplorationReport> {
        let mut report = ExplorationReport::default();
        corpus.ensure_seeded();
        let mut seed = self.next_seed(corpus, rng);

        for iteration in 0..self.config.iterations() {
            for attempt in 0..self.config.tries {
                report.playouts += 1;
                match self.playout(corpus, &seed, rng)? {
                    Playout::SeedLost => {
                        report.seeds_deleted += 1;
                        report.reseeds += 1;
                        corpus.delete(&seed);
                        seed = self.next_seed(corpus, rng);
                    }
                    Playout::Finished {
                        died,
                        violated,
                        added,
                    } => {
                        report.deaths += u32::from(died);
                        report.violations += u32::from(violated);
                        report.paths_inserted += u32::from(added.path_inserted);
                        report.splits_inserted += u32::from(added.split_inserted);
                        report.duplicates += u32::from(added.duplicate);
                        if violated {
                            report.reseeds += 1;
                            seed = self.next_seed(corpus, rng);
                        }
                    }
                }
                debug!(iteration, attempt, corpus = corpus.len(), "playout done");
            }

            report.cleaned += corpus.clean(self.config.clean_threshold);
            corpus.sort();
            seed = self.next_seed(corpus, rng);
            report.iterations += 1;

            if let Some(best) = corpus.best() {
                info!(
                    iteration,
                    corpus = corpus.len(),
                    best_score = best.final_score(),
                    seed_score = seed.final_score(),
                    "iteration complete"
                );
            }

            if self.config.save_paths {
                store::save(&self.config.corpus_file, corpus).with_context(|| {
                    format!("saving corpus {}", self.config.corpus_file.display())
                })?;
            }
        }

        report.corpus_size = corpus.len();
        if let Some(best) = corpus.best() {
            report.best_score = best.final_score();
            report.best_frames = best.len();
        }
        Ok(report)
    }

    fn next_seed<R: Rng + ?Sized>(&self, corpus: &mut Corpus, rng: &mut R) -> GamePath {
        corpus.ensure_seeded();
        corpus
            .select(rng, self.config.always_best_path)
            .cloned()
            .unwrap_or_default()
    }

    fn playout<R: Rng + ?Sized>(
        &self,
        corpus: &mut Corpus,
        seed: &GamePath,
        rng: &mut R,
    ) -> Result<Playout> {
        let game = self
            .launcher
            .start(self.config.fps, self.config.start_level)
            .context("starting game")?;
        let mut session = Session::new(
            game,
            self.oracle,
            self.config.score_model(),
            self.config.oracle_lookback,
        );

        let resume_len = if self.config.replay_full_path {
            seed.len()
        } else {
            backtrack(seed, self.config.backtrack_frames)
                .map(|trimmed| trimmed.len())
                .unwrap_or(seed.len())
        };

        match replay_prefix(&mut session, seed, resume_len) {
            Ok(PrefixOutcome::Completed) => {}
            Ok(PrefixOutcome::Died { index }) => {
                warn!(index, score = seed.final_score(), "seed path dies on replay, deleting");
                return Ok(Playout::SeedLost);
            }
            Err(ReplayError::Violation(violation)) => {
                warn!(
                    rule = %violation.rule,
                    tick = violation.tick,
                    "seed path breaks the oracle on replay, deleting"
                );
                return Ok(Playout::SeedLost);
            }
            Err(err) if is_finished(&err) => {}
            Err(err) => {
                return Err(err).context("replaying seed path");
            }
        }

        let start = session.path().last_input();
        let inputs = self.moves.generate(start, self.config.frames_per_try(), rng);
        let mut died = false;
        let mut violated = false;
        for input in inputs {
            match session.advance(input) {
                Ok(Step::Alive) => {}
                Ok(Step::Died) => {
                    died = true;
                    break;
                }
                Err(ReplayError::Violation(violation)) => {
                    warn!(
                        rule = %violation.rule,
                        tick = violation.tick,
                        detail = %violation.detail,
                        "oracle violation, abandoning path"
                    );
                    violated = true;
                    break;
                }
                Err(err) if is_finished(&err) => break,
                Err(err) => return Err(err).context("driving playout"),
            }
        }

        let mut path = session.into_path();
        if violated {
            path = path.into_abandoned();
        }
        let added = corpus.add(path);
        debug!(?added, died, violated, "offered path to corpus");
        Ok(Playout::Finished {
            died,
            violated,
            added,
        })
    }
}

/// Convenience wrapper: build an [`Explorer`] and run it.
pub fn explore<L: GameLauncher, O: Oracle + ?Sized, R: Rng + ?Sized>(
    config: &ExplorationConfig,
    launcher: &L,
    oracle: &O,
    rng: &mut R,
) -> Result<(Corpus, ExplorationReport)> {
    Explorer::new(config, launcher, oracle)?.run(rng)
}
