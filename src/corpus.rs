//! The corpus: discovered paths keyed by terminal hash.
//!
//! Stored paths are never edited. `backtrack` and `split` hand back new
//! paths cut from a prefix, and the only mutations of the collection are
//! `add`, `delete` and `clean`.

use crate::error::ConfigError;
use crate::path::GamePath;
use crate::selection::{choose, exponential_weights, DEFAULT_SCALING_FACTOR};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_BACKTRACK_FRAMES: usize = 60;
pub const DEFAULT_SPLIT_FRAMES: usize = 120;
pub const DEFAULT_CLEAN_THRESHOLD: u64 = 1_000;
pub const DEFAULT_BEST_PROBABILITY: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorpusSettings {
    pub backtrack_frames: usize,
    pub split_frames: usize,
    pub clean_threshold: u64,
    pub scaling_factor: f64,
    pub best_probability: f64,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            backtrack_frames: DEFAULT_BACKTRACK_FRAMES,
            split_frames: DEFAULT_SPLIT_FRAMES,
            clean_threshold: DEFAULT_CLEAN_THRESHOLD,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            best_probability: DEFAULT_BEST_PROBABILITY,
        }
    }
}

impl CorpusSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.best_probability) {
            return Err(ConfigError::OutOfRange {
                field: "best_probability",
                reason: format!("{} is not within [0, 1]", self.best_probability),
            });
        }
        if !self.scaling_factor.is_finite() || self.scaling_factor < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "scaling_factor",
                reason: format!("{} must be finite and >= 0", self.scaling_factor),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddOutcome {
    pub duplicate: bool,
    pub split_inserted: bool,
    pub path_inserted: bool,
}

/// `path` without its last `frames + 1` entries. `None` when nothing of the
/// path would remain.
pub fn backtrack(path: &GamePath, frames: usize) -> Option<GamePath> {
    let cut = frames.checked_add(1)?;
    if path.len() <= cut {
        return None;
    }
    path.prefix(path.len() - cut)
}

#[derive(Clone, Debug, Default)]
pub struct Corpus {
    paths: Vec<GamePath>,
    settings: CorpusSettings,
}

impl Corpus {
    pub fn new(settings: CorpusSettings) -> Self {
        Self {
            paths: Vec::new(),
            settings,
        }
    }

    /// A corpus holding only the idle sentinel path.
    pub fn seeded(settings: CorpusSettings) -> Self {
        let mut corpus = Self::new(settings);
        corpus.ensure_seeded();
        corpus
    }

    /// Builds a corpus from already-validated paths, dropping repeated
    /// terminal hashes.
    pub fn from_paths(settings: CorpusSettings, paths: Vec<GamePath>) -> Self {
        let mut corpus = Self::new(settings);
        for path in paths {
            if !corpus.contains(&path) {
                corpus.paths.push(path);
            }
        }
        corpus
    }

    /// Selection needs at least one path; the sentinel is always viable.
    pub fn ensure_seeded(&mut self) {
        if self.paths.is_empty() {
            self.paths.push(GamePath::new());
        }
    }

    pub fn settings(&self) -> &CorpusSettings {
        &self.settings
    }

    pub fn paths(&self) -> &[GamePath] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &GamePath) -> bool {
        let hash = path.terminal_hash();
        self.paths.iter().any(|stored| stored.terminal_hash() == hash)
    }

    pub fn best(&self) -> Option<&GamePath> {
        self.paths.iter().max_by_key(|path| path.final_score())
    }

    /// Highest terminal score first.
    pub fn sort(&mut self) {
        self.paths
            .sort_by(|a, b| b.final_score().cmp(&a.final_score()));
    }

    /// Backtracks by the split window, then cuts the remainder at its peak
    /// score so a mid-path high-water mark becomes its own candidate.
    pub fn split(&self, path: &GamePath) -> Option<GamePath> {
        let trimmed = backtrack(path, self.settings.split_frames)?;
        let peak = trimmed.peak_index();
        if trimmed.scores()[peak] >= trimmed.final_score() {
            trimmed.prefix(peak + 1)
        } else {
            None
        }
    }

    /// Offers a finished playout to the corpus. A path ending in death is
    /// never stored itself; its non-dying split derivative may be.
    pub fn add(&mut self, path: GamePath) -> AddOutcome {
        if self.contains(&path) {
            debug!(hash = path.terminal_hash(), "path already in corpus");
            return AddOutcome {
                duplicate: true,
                ..AddOutcome::default()
            };
        }

        let mut outcome = AddOutcome::default();
        if let Some(split) = self.split(&path) {
            if !split.died() && !self.contains(&split) {
                info!(
                    score = split.final_score(),
                    frames = split.len(),
                    "adding split path"
                );
                self.paths.push(split);
                outcome.split_inserted = true;
            }
        }

        if !path.died() {
            info!(
                score = path.final_score(),
                frames = path.len(),
                "adding path"
            );
            self.paths.push(path);
            outcome.path_inserted = true;
        }
        outcome
    }

    /// Removes the stored path with the same terminal hash.
    pub fn delete(&mut self, path: &GamePath) -> bool {
        let hash = path.terminal_hash();
        let before = self.paths.len();
        self.paths.retain(|stored| stored.terminal_hash() != hash);
        let removed = self.paths.len() != before;
        if removed {
            info!(score = path.final_score(), hash, "deleted path");
        }
        removed
    }

    /// Keeps one representative per cluster of near-equal scores: walking
    /// from the best down, a path survives only if every survivor so far
    /// differs from it by more than `threshold`. Returns the number removed.
    pub fn clean(&mut self, threshold: u64) -> usize {
        self.sort();
        let before = self.paths.len();
        let mut kept: Vec<GamePath> = Vec::with_capacity(before);
        for path in self.paths.drain(..) {
            let score = path.final_score();
            if kept
                .iter()
                .all(|survivor| survivor.final_score().abs_diff(score) > threshold)
            {
                kept.push(path);
            }
        }
        self.paths = kept;
        let removed = before - self.paths.len();
        if removed > 0 {
            info!(removed, remaining = self.paths.len(), threshold, "cleaned corpus");
        }
        removed
    }

    /// Picks the next seed. With probability `best_probability`, or always
    /// when `force_best` is set, the top path; otherwise an exponentially
    /// weighted draw over terminal scores.
    pub fn select<R: Rng + ?Sized>(&mut self, rng: &mut R, force_best: bool) -> Option<&GamePath> {
        if self.paths.is_empty() {
            return None;
        }
        self.sort();

        if force_best || rng.gen_bool(self.settings.best_probability) {
            debug!(score = self.paths[0].final_score(), "selected best path");
            return self.paths.first();
        }

        let scores: Vec<i64> = self.paths.iter().map(GamePath::final_score).collect();
        let weights = exponential_weights(&scores, self.settings.scaling_factor);
        let index = choose(&weights, rng).unwrap_or(0);
        debug!(
            index,
            score = scores[index],
            best = scores[0],
            candidates = scores.len(),
            "selected weighted path"
        );
        self.paths.get(index)
    }
}
