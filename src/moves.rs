//! Move catalogue used to extend a path.
//!
//! Scripted moves hold one button combination for a fixed number of ticks.
//! `Fuzzy` is a biased random walk over button states: starting from the
//! last held frame, every button flips independently with probability `p`
//! each tick, so held buttons (running) tend to stay held.

use crate::error::ConfigError;
use crate::input::{InputFrame, ALL_BUTTONS};
use crate::selection::choose;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

pub const DEFAULT_FLIP_PROBABILITY: f64 = 0.10;
pub const FUZZY_LENGTH: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Fuzzy,
    StayStillLong,
    StayStillShort,
    WalkRightLong,
    WalkLeftLong,
    RunRightLong,
    RunLeftLong,
    JumpUpHigh,
    JumpUpRightHigh,
    JumpUpLeftHigh,
    JumpUpRightHighAction,
    JumpUpLeftHighAction,
    Down,
}

impl MoveKind {
    pub const ALL: [MoveKind; 13] = [
        MoveKind::Fuzzy,
        MoveKind::StayStillLong,
        MoveKind::StayStillShort,
        MoveKind::WalkRightLong,
        MoveKind::WalkLeftLong,
        MoveKind::RunRightLong,
        MoveKind::RunLeftLong,
        MoveKind::JumpUpHigh,
        MoveKind::JumpUpRightHigh,
        MoveKind::JumpUpLeftHigh,
        MoveKind::JumpUpRightHighAction,
        MoveKind::JumpUpLeftHighAction,
        MoveKind::Down,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Fuzzy => "fuzzy",
            Self::StayStillLong => "stay_still_long",
            Self::StayStillShort => "stay_still_short",
            Self::WalkRightLong => "walk_right_long",
            Self::WalkLeftLong => "walk_left_long",
            Self::RunRightLong => "run_right_long",
            Self::RunLeftLong => "run_left_long",
            Self::JumpUpHigh => "jump_up_high",
            Self::JumpUpRightHigh => "jump_up_right_high",
            Self::JumpUpLeftHigh => "jump_up_left_high",
            Self::JumpUpRightHighAction => "jump_up_right_high_action",
            Self::JumpUpLeftHighAction => "jump_up_left_high_action",
            Self::Down => "down",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Ticks emitted per draw.
    pub fn default_length(self) -> usize {
        match self {
            Self::Fuzzy => FUZZY_LENGTH,
            Self::StayStillShort | Self::Down => 5,
            Self::StayStillLong
            | Self::WalkRightLong
            | Self::WalkLeftLong
            | Self::RunRightLong
            | Self::RunLeftLong => 30,
            Self::JumpUpHigh
            | Self::JumpUpRightHigh
            | Self::JumpUpLeftHigh
            | Self::JumpUpRightHighAction
            | Self::JumpUpLeftHighAction => 60,
        }
    }

    /// Rightward progress is what scores, so right-facing moves dominate.
    pub fn default_weight(self) -> f64 {
        match self {
            Self::Fuzzy => 4.0,
            Self::RunRightLong => 4.0,
            Self::WalkRightLong => 3.0,
            Self::JumpUpRightHighAction => 3.0,
            Self::JumpUpRightHigh => 2.0,
            Self::JumpUpHigh => 1.0,
            Self::StayStillShort => 1.0,
            Self::StayStillLong => 0.5,
            Self::WalkLeftLong => 0.5,
            Self::RunLeftLong => 0.5,
            Self::JumpUpLeftHigh => 0.5,
            Self::JumpUpLeftHighAction => 0.5,
            Self::Down => 0.25,
        }
    }

    /// The frame a scripted move holds; `None` for `Fuzzy`.
    pub fn held_frame(self) -> Option<InputFrame> {
        let frame = |right, left, jump, action, down| InputFrame {
            right,
            left,
            jump,
            action,
            down,
            enter: false,
        };
        Some(match self {
            Self::Fuzzy => return None,
            Self::StayStillLong | Self::StayStillShort => InputFrame::IDLE,
            Self::WalkRightLong => frame(true, false, false, false, false),
            Self::WalkLeftLong => frame(false, true, false, false, false),
            Self::RunRightLong => frame(true, false, false, true, false),
            Self::RunLeftLong => frame(false, true, false, true, false),
            Self::JumpUpHigh => frame(false, false, true, false, false),
            Self::JumpUpRightHigh => frame(true, false, true, false, false),
            Self::JumpUpLeftHigh => frame(false, true, true, false, false),
            Self::JumpUpRightHighAction => frame(true, false, true, true, false),
            Self::JumpUpLeftHighAction => frame(false, true, true, true, false),
            Self::Down => frame(false, false, false, false, true),
        })
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `length` frames of a random walk starting from `start`.
pub fn fuzzy<R: Rng + ?Sized>(
    start: InputFrame,
    flip_probability: f64,
    length: usize,
    rng: &mut R,
) -> Vec<InputFrame> {
    let mut current = start;
    let mut frames = Vec::with_capacity(length);
    for _ in 0..length {
        for button in ALL_BUTTONS {
            if rng.gen_bool(flip_probability) {
                current = current.toggled(button);
            }
        }
        frames.push(current);
    }
    frames
}

#[derive(Clone, Debug, PartialEq)]
pub struct MovePolicy {
    weights: Vec<(MoveKind, f64)>,
    flip_probability: f64,
}

impl Default for MovePolicy {
    fn default() -> Self {
        Self {
            weights: MoveKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.default_weight()))
                .collect(),
            flip_probability: DEFAULT_FLIP_PROBABILITY,
        }
    }
}

impl MovePolicy {
    /// Default catalogue with per-name weight overrides.
    pub fn new(
        flip_probability: f64,
        overrides: &BTreeMap<String, f64>,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&flip_probability) {
            return Err(ConfigError::OutOfRange {
                field: "flip_probability",
                reason: format!("{flip_probability} is not within [0, 1]"),
            });
        }

        let mut policy = Self {
            flip_probability,
            ..Self::default()
        };
        for (name, weight) in overrides {
            let kind = MoveKind::from_name(name)
                .ok_or_else(|| ConfigError::UnknownMove { name: name.clone() })?;
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::OutOfRange {
                    field: "move_weights",
                    reason: format!("{name} has weight {weight}"),
                });
            }
            if let Some(entry) = policy.weights.iter_mut().find(|(k, _)| *k == kind) {
                entry.1 = *weight;
            }
        }

        if policy.weights.iter().all(|(_, weight)| *weight == 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "move_weights",
                reason: "every move weight is zero".to_string(),
            });
        }
        Ok(policy)
    }

    pub fn flip_probability(&self) -> f64 {
        self.flip_probability
    }

    pub fn weights(&self) -> &[(MoveKind, f64)] {
        &self.weights
    }

    pub fn weight(&self, kind: MoveKind) -> f64 {
        self.weights
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, weight)| *weight)
            .unwrap_or(0.0)
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> MoveKind {
        let weights: Vec<f64> = self.weights.iter().map(|(_, weight)| *weight).collect();
        choose(&weights, rng)
            .map(|index| self.weights[index].0)
            .unwrap_or(MoveKind::Fuzzy)
    }

    pub fn frames<R: Rng + ?Sized>(
        &self,
        kind: MoveKind,
        start: InputFrame,
        rng: &mut R,
    ) -> Vec<InputFrame> {
        match kind.held_frame() {
            Some(frame) => vec![frame; kind.default_length()],
            None => fuzzy(start, self.flip_probability, kind.default_length(), rng),
        }
    }

    /// Concatenates drawn moves until `total_frames` are covered. Each fuzzy
    /// move continues from the last frame emitted so far.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        start: InputFrame,
        total_frames: usize,
        rng: &mut R,
    ) -> Vec<InputFrame> {
        let mut frames = Vec::with_capacity(total_frames);
        let mut last = start;
        while frames.len() < total_frames {
            let kind = self.draw(rng);
            let chunk = self.frames(kind, last, rng);
            debug!(kind = kind.name(), frames = chunk.len(), "drew move");
            if let Some(frame) = chunk.last() {
                last = *frame;
            }
            frames.extend(chunk);
        }
        frames.truncate(total_frames);
        frames
    }
}
