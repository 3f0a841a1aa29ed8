//! Per-tick observation handed out by game control.
//!
//! Player kinematics use Q12.4 fixed point (1/16 px) so that frame-to-frame
//! reasoning in the oracle is exact; element boxes are whole pixels.

use crate::input::InputFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SUBPIXELS_PER_PIXEL: i32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementBox {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl ElementBox {
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Standing,
    Walking,
    Jumping,
    Falling,
    Dead,
}

impl PlayerState {
    pub fn is_airborne(self) -> bool {
        matches!(self, Self::Jumping | Self::Falling)
    }
}

/// Set when the engine moved the player somewhere other than its velocity
/// implies (wall push-out, boundary clamp, landing snap).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionAdjust {
    pub horizontal: bool,
    pub vertical: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: i32,
    pub y: i32,
    pub x_vel: i32,
    pub y_vel: i32,
    pub w: i32,
    pub h: i32,
    pub state: PlayerState,
    pub big: bool,
    pub dead: bool,
    pub adjusted: CollisionAdjust,
}

impl PlayerSnapshot {
    #[inline]
    pub fn pixel_x(&self) -> i32 {
        self.x.div_euclid(SUBPIXELS_PER_PIXEL)
    }

    #[inline]
    pub fn pixel_y(&self) -> i32 {
        self.y.div_euclid(SUBPIXELS_PER_PIXEL)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub number: u32,
    pub start_x: i32,
    pub end_x: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub keys: InputFrame,
    pub boxes: BTreeMap<String, Vec<ElementBox>>,
    pub player: Option<PlayerSnapshot>,
    pub level: Option<LevelInfo>,
}

impl FrameSnapshot {
    pub fn player_dead(&self) -> bool {
        self.player.is_some_and(|player| player.dead)
    }

    pub fn level_number(&self) -> u32 {
        self.level.map(|level| level.number).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_edges_are_exclusive() {
        let pipe = ElementBox {
            id: 100,
            x: 896,
            y: 176,
            w: 32,
            h: 32,
        };
        assert_eq!(pipe.right(), 928);
        assert_eq!(pipe.bottom(), 208);
    }

    #[test]
    fn pixel_coordinates_floor_negative_subpixels() {
        let player = PlayerSnapshot {
            x: -1,
            y: 33,
            x_vel: 0,
            y_vel: 0,
            w: 16,
            h: 16,
            state: PlayerState::Standing,
            big: false,
            dead: false,
            adjusted: CollisionAdjust::default(),
        };
        assert_eq!(player.pixel_x(), -1);
        assert_eq!(player.pixel_y(), 2);
    }

    #[test]
    fn empty_snapshot_has_no_player_and_defaults_to_level_one() {
        let snapshot = FrameSnapshot {
            tick: 0,
            keys: InputFrame::IDLE,
            boxes: BTreeMap::new(),
            player: None,
            level: None,
        };
        assert!(!snapshot.player_dead());
        assert_eq!(snapshot.level_number(), 1);
    }
}
