//! Scored, hashed, replayable input sequences.
//!
//! A path is five parallel sequences that always share one length. Entry 0 is
//! the idle sentinel; every later entry records the input applied on that
//! tick plus what was observed after applying it. Paths are values: trimming
//! one produces a fresh path, the source is never touched.

use crate::input::InputFrame;
use crate::snapshot::FrameSnapshot;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

pub const PREFIX_HASH_SEED: u64 = 0xCBF2_9CE4_8422_2325;
const PREFIX_HASH_PRIME: u64 = 0x0000_0100_0000_01B3;

pub const DEFAULT_LEVEL_MULTIPLIER: i64 = 1_000_000_000;
pub const DEFAULT_POSITION_MULTIPLIER: i64 = 1_000;
pub const DEFAULT_TIME_CEILING_SECONDS: i64 = 999;

/// Folds one more input into a prefix hash (FNV-1a over the packed buttons).
#[inline]
pub fn fold_prefix_hash(prev: u64, input: InputFrame) -> u64 {
    (prev ^ u64::from(input.to_bits())).wrapping_mul(PREFIX_HASH_PRIME)
}

pub fn prefix_hash(inputs: &[InputFrame]) -> u64 {
    inputs
        .iter()
        .fold(PREFIX_HASH_SEED, |hash, input| fold_prefix_hash(hash, *input))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreModel {
    pub fps: u32,
    pub level_multiplier: i64,
    pub position_multiplier: i64,
    pub time_ceiling_seconds: i64,
}

impl Default for ScoreModel {
    fn default() -> Self {
        Self::with_fps(60)
    }
}

impl ScoreModel {
    pub fn with_fps(fps: u32) -> Self {
        Self {
            fps,
            level_multiplier: DEFAULT_LEVEL_MULTIPLIER,
            position_multiplier: DEFAULT_POSITION_MULTIPLIER,
            time_ceiling_seconds: DEFAULT_TIME_CEILING_SECONDS,
        }
    }

    /// Fitness after `frame_index` applied frames. Level dominates, then
    /// horizontal position, then less elapsed time. Transition screens
    /// without a player score zero.
    pub fn score(&self, snapshot: &FrameSnapshot, frame_index: usize) -> i64 {
        let Some(player) = snapshot.player else {
            return 0;
        };
        let level = i64::from(snapshot.level_number());
        let x = i64::from(player.pixel_x());
        let elapsed_seconds = frame_index as i64 / i64::from(self.fps.max(1));
        let time_term = (self.time_ceiling_seconds - elapsed_seconds).max(0);
        level * self.level_multiplier + x * self.position_multiplier + time_term
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GamePath {
    inputs: Vec<InputFrame>,
    scores: Vec<i64>,
    hashes: Vec<u64>,
    deaths: Vec<bool>,
    ticks: Vec<u64>,
}

impl Default for GamePath {
    fn default() -> Self {
        Self::new()
    }
}

impl GamePath {
    /// A path holding only the idle sentinel entry.
    pub fn new() -> Self {
        Self {
            inputs: vec![InputFrame::IDLE],
            scores: vec![0],
            hashes: vec![fold_prefix_hash(PREFIX_HASH_SEED, InputFrame::IDLE)],
            deaths: vec![false],
            ticks: vec![0],
        }
    }

    /// Records `input` and what was observed after applying it.
    pub fn append(&mut self, input: InputFrame, snapshot: &FrameSnapshot, model: &ScoreModel) {
        let index = self.inputs.len();
        let hash = fold_prefix_hash(self.terminal_hash(), input);
        self.inputs.push(input);
        self.scores.push(model.score(snapshot, index));
        self.hashes.push(hash);
        self.deaths.push(snapshot.player_dead());
        self.ticks.push(snapshot.tick);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Never true for a well-formed path; the sentinel is always present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[InputFrame] {
        &self.inputs
    }

    pub fn scores(&self) -> &[i64] {
        &self.scores
    }

    pub fn hashes(&self) -> &[u64] {
        &self.hashes
    }

    pub fn deaths(&self) -> &[bool] {
        &self.deaths
    }

    pub fn ticks(&self) -> &[u64] {
        &self.ticks
    }

    pub fn terminal_hash(&self) -> u64 {
        self.hashes.last().copied().unwrap_or(PREFIX_HASH_SEED)
    }

    pub fn final_score(&self) -> i64 {
        self.scores.last().copied().unwrap_or(0)
    }

    pub fn died(&self) -> bool {
        self.deaths.last().copied().unwrap_or(false)
    }

    pub fn final_tick(&self) -> u64 {
        self.ticks.last().copied().unwrap_or(0)
    }

    pub fn last_input(&self) -> InputFrame {
        self.inputs.last().copied().unwrap_or(InputFrame::IDLE)
    }

    /// Index of the first occurrence of the highest score.
    pub fn peak_index(&self) -> usize {
        let mut best = 0;
        for (index, score) in self.scores.iter().enumerate() {
            if *score > self.scores[best] {
                best = index;
            }
        }
        best
    }

    /// A new path holding the first `len` entries, or `None` when `len` is
    /// zero or exceeds this path's length.
    pub fn prefix(&self, len: usize) -> Option<GamePath> {
        if len == 0 || len > self.len() {
            return None;
        }
        Some(Self {
            inputs: self.inputs[..len].to_vec(),
            scores: self.scores[..len].to_vec(),
            hashes: self.hashes[..len].to_vec(),
            deaths: self.deaths[..len].to_vec(),
            ticks: self.ticks[..len].to_vec(),
        })
    }

    /// Same path with its terminal entry flagged as a death. Used when a
    /// playout is abandoned on an oracle violation.
    pub fn into_abandoned(mut self) -> GamePath {
        if let Some(last) = self.deaths.last_mut() {
            *last = true;
        }
        self
    }

    /// Structural checks for paths that did not come from `append`.
    pub fn check_integrity(&self) -> Result<(), String> {
        let n = self.inputs.len();
        if n == 0 {
            return Err("path has no entries".to_string());
        }
        if self.scores.len() != n
            || self.hashes.len() != n
            || self.deaths.len() != n
            || self.ticks.len() != n
        {
            return Err(format!(
                "sequence lengths differ: inputs={} scores={} hashes={} deaths={} ticks={}",
                n,
                self.scores.len(),
                self.hashes.len(),
                self.deaths.len(),
                self.ticks.len()
            ));
        }
        let mut hash = PREFIX_HASH_SEED;
        for (index, input) in self.inputs.iter().enumerate() {
            hash = fold_prefix_hash(hash, *input);
            if self.hashes[index] != hash {
                return Err(format!(
                    "prefix hash mismatch at index {index}: stored={:#018x} computed={hash:#018x}",
                    self.hashes[index]
                ));
            }
        }
        if self.ticks.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err("ticks decrease".to_string());
        }
        Ok(())
    }
}

/// Terminal-state identity: two paths are the same corpus entry when their
/// full input prefixes hash alike.
impl PartialEq for GamePath {
    fn eq(&self, other: &Self) -> bool {
        self.terminal_hash() == other.terminal_hash()
    }
}

impl Eq for GamePath {}

impl Hash for GamePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.terminal_hash().hash(state);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::input::{BUTTON_JUMP, BUTTON_RIGHT};
    use crate::snapshot::{CollisionAdjust, LevelInfo, PlayerSnapshot, PlayerState};
    use std::collections::BTreeMap;

    pub(crate) fn snapshot_at(level: u32, pixel_x: i32, tick: u64, dead: bool) -> FrameSnapshot {
        FrameSnapshot {
            tick,
            keys: InputFrame::IDLE,
            boxes: BTreeMap::new(),
            player: Some(PlayerSnapshot {
                x: pixel_x * 16,
                y: 0,
                x_vel: 0,
                y_vel: 0,
                w: 16,
                h: 16,
                state: if dead {
                    PlayerState::Dead
                } else {
                    PlayerState::Standing
                },
                big: false,
                dead,
                adjusted: CollisionAdjust::default(),
            }),
            level: Some(LevelInfo {
                number: level,
                start_x: 0,
                end_x: 10_000,
            }),
        }
    }

    /// Builds a path with hand-picked scores (entry 0 is the sentinel).
    /// `salt` varies the inputs so equal-length paths hash apart.
    pub(crate) fn synthetic_path(salt: u8, scores: &[i64], dead_at_end: bool) -> GamePath {
        let mut path = GamePath::new();
        path.scores[0] = scores[0];
        for (i, score) in scores.iter().enumerate().skip(1) {
            let input = InputFrame::from_bits(((usize::from(salt) + i) % 64) as u8);
            let hash = fold_prefix_hash(path.terminal_hash(), input);
            path.inputs.push(input);
            path.scores.push(*score);
            path.hashes.push(hash);
            path.deaths.push(false);
            path.ticks.push(i as u64 * 16);
        }
        if dead_at_end {
            path = path.into_abandoned();
        }
        path
    }

    /// Builds a path whose entry `i + 1` observes pixel x `xs[i]`.
    pub(crate) fn path_through(inputs: &[InputFrame], xs: &[i32]) -> GamePath {
        let model = ScoreModel::default();
        let mut path = GamePath::new();
        for (i, (input, x)) in inputs.iter().zip(xs).enumerate() {
            path.append(*input, &snapshot_at(1, *x, (i as u64 + 1) * 16, false), &model);
        }
        path
    }

    #[test]
    fn sentinel_path_has_one_entry_in_every_sequence() {
        let path = GamePath::new();
        assert_eq!(path.len(), 1);
        assert_eq!(path.scores(), &[0]);
        assert_eq!(path.deaths(), &[false]);
        assert_eq!(path.ticks(), &[0]);
        assert_eq!(path.terminal_hash(), prefix_hash(&[InputFrame::IDLE]));
        path.check_integrity().unwrap();
    }

    #[test]
    fn append_keeps_sequences_in_lockstep() {
        let model = ScoreModel::default();
        let mut path = GamePath::new();
        for i in 0..25u64 {
            let input = InputFrame::from_bits((i % 7) as u8);
            path.append(input, &snapshot_at(1, i as i32, i * 16, i == 24), &model);
            assert_eq!(path.inputs().len(), path.scores().len());
            assert_eq!(path.inputs().len(), path.hashes().len());
            assert_eq!(path.inputs().len(), path.deaths().len());
            assert_eq!(path.inputs().len(), path.ticks().len());
        }
        assert_eq!(path.len(), 26);
        assert!(path.died());
        path.check_integrity().unwrap();
    }

    #[test]
    fn shared_prefixes_share_hashes() {
        let right = InputFrame::from_bits(BUTTON_RIGHT);
        let jump = InputFrame::from_bits(BUTTON_JUMP);
        let a = path_through(&[right, right, jump, right], &[1, 2, 3, 4]);
        let b = path_through(&[right, right, jump, jump], &[5, 6, 7, 8]);
        // Hashes depend on inputs only, not on what was observed.
        assert_eq!(a.hashes()[..4], b.hashes()[..4]);
        assert_ne!(a.terminal_hash(), b.terminal_hash());
        assert_eq!(a.hashes()[3], prefix_hash(&a.inputs()[..4]));
    }

    #[test]
    fn equality_is_terminal_hash_identity() {
        let right = InputFrame::from_bits(BUTTON_RIGHT);
        let a = path_through(&[right, right], &[1, 2]);
        let b = path_through(&[right, right], &[40, 90]);
        assert_eq!(a, b);
        assert_ne!(a.final_score(), b.final_score());
    }

    #[test]
    fn score_orders_level_then_position_then_time() {
        let model = ScoreModel::with_fps(60);
        let level2_start = model.score(&snapshot_at(2, 0, 0, false), 0);
        let level1_far = model.score(&snapshot_at(1, 3_000, 0, false), 0);
        assert!(level2_start > level1_far);

        let fast = model.score(&snapshot_at(1, 500, 0, false), 60);
        let slow = model.score(&snapshot_at(1, 500, 0, false), 600);
        let further = model.score(&snapshot_at(1, 501, 0, false), 6_000);
        assert!(fast > slow);
        assert!(further > fast);
        assert_eq!(fast, 1_000_000_000 + 500_000 + 998);
    }

    #[test]
    fn score_is_zero_without_player_and_death_keeps_score() {
        let model = ScoreModel::default();
        let mut transition = snapshot_at(1, 100, 0, false);
        transition.player = None;
        assert_eq!(model.score(&transition, 10), 0);

        let alive = model.score(&snapshot_at(1, 100, 0, false), 10);
        let dead = model.score(&snapshot_at(1, 100, 0, true), 10);
        assert_eq!(alive, dead);
    }

    #[test]
    fn prefix_copies_without_touching_source() {
        let right = InputFrame::from_bits(BUTTON_RIGHT);
        let path = path_through(&[right; 10], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let before = path.clone();
        let short = path.prefix(4).unwrap();
        assert_eq!(short.len(), 4);
        assert_eq!(short.final_score(), path.scores()[3]);
        assert_eq!(path.len(), before.len());
        assert_eq!(path.scores(), before.scores());
        assert!(path.prefix(0).is_none());
        assert!(path.prefix(12).is_none());
    }

    #[test]
    fn integrity_check_rejects_tampered_hashes() {
        let right = InputFrame::from_bits(BUTTON_RIGHT);
        let mut path = path_through(&[right; 3], &[1, 2, 3]);
        path.hashes[2] ^= 1;
        assert!(path.check_integrity().is_err());
    }

    #[test]
    fn peak_index_prefers_first_maximum() {
        let right = InputFrame::from_bits(BUTTON_RIGHT);
        let path = path_through(&[right; 5], &[10, 30, 30, 20, 5]);
        assert_eq!(path.peak_index(), 2);
    }
}
