//! Behaviour-model contract and a minimal movement model.
//!
//! An oracle sees the snapshot history each tick and only reasons about the
//! newest transition plus a bounded lookback. It never mutates anything; its
//! only output is a verdict.

use crate::error::{RuleCode, Violation};
use crate::snapshot::{FrameSnapshot, PlayerSnapshot};

pub const DEFAULT_LOOKBACK: usize = 8;
/// 2.5 px per frame in Q12.4.
pub const DEFAULT_MAX_SPEED: i32 = 40;

pub trait Oracle {
    fn check(&self, history: &[FrameSnapshot]) -> Result<(), Violation>;
}

/// Frame-to-frame kinematics rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovementModel {
    pub max_speed: i32,
}

impl Default for MovementModel {
    fn default() -> Self {
        Self {
            max_speed: DEFAULT_MAX_SPEED,
        }
    }
}

fn violation(tick: u64, rule: RuleCode, detail: String) -> Result<(), Violation> {
    Err(Violation { tick, rule, detail })
}

impl MovementModel {
    fn check_bounds(&self, current: &FrameSnapshot, player: &PlayerSnapshot) -> Result<(), Violation> {
        if player.x_vel.abs() > self.max_speed {
            return violation(
                current.tick,
                RuleCode::HorizontalSpeedLimit,
                format!("x_vel={} max={}", player.x_vel, self.max_speed),
            );
        }
        let Some(level) = current.level else {
            return Ok(());
        };
        if player.pixel_x() < level.start_x {
            return violation(
                current.tick,
                RuleCode::PlayerPastLeftBoundary,
                format!("x={} start={}", player.pixel_x(), level.start_x),
            );
        }
        if player.pixel_x() + player.w > level.end_x {
            return violation(
                current.tick,
                RuleCode::PlayerPastRightBoundary,
                format!("right={} end={}", player.pixel_x() + player.w, level.end_x),
            );
        }
        Ok(())
    }

    fn check_transition(
        &self,
        tick: u64,
        prev: &PlayerSnapshot,
        cur: &PlayerSnapshot,
    ) -> Result<(), Violation> {
        if prev.dead && !cur.dead {
            return violation(tick, RuleCode::DeadPlayerRevived, String::new());
        }
        if cur.dead {
            return Ok(());
        }

        let dx = cur.x - prev.x;
        if !cur.adjusted.horizontal && dx != cur.x_vel {
            return violation(
                tick,
                RuleCode::HorizontalVelocityConsistency,
                format!("moved {dx} with x_vel={}", cur.x_vel),
            );
        }

        // Airborne vertical speed only grows downward; an upward kick needs
        // ground under the previous frame.
        if prev.state.is_airborne() && cur.state.is_airborne() && cur.y_vel < prev.y_vel {
            return violation(
                tick,
                RuleCode::MidairJumpImpulse,
                format!("y_vel {} -> {}", prev.y_vel, cur.y_vel),
            );
        }
        Ok(())
    }
}

impl Oracle for MovementModel {
    fn check(&self, history: &[FrameSnapshot]) -> Result<(), Violation> {
        let Some((current, earlier)) = history.split_last() else {
            return Ok(());
        };
        let previous = earlier.last();

        if let Some(previous) = previous {
            if current.tick <= previous.tick {
                return violation(
                    current.tick,
                    RuleCode::TickMonotonic,
                    format!("{} after {}", current.tick, previous.tick),
                );
            }
        }

        let Some(player) = current.player else {
            return Ok(());
        };
        self.check_bounds(current, &player)?;

        let Some(previous) = previous else {
            return Ok(());
        };
        let Some(prev_player) = previous.player else {
            return Ok(());
        };
        if previous.level_number() != current.level_number() {
            return Ok(());
        }
        self.check_transition(current.tick, &prev_player, &player)
    }
}

/// Fixed-capacity window of the most recent snapshots.
#[derive(Clone, Debug)]
pub struct History {
    frames: Vec<FrameSnapshot>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            frames: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: FrameSnapshot) {
        self.frames.push(snapshot);
        if self.frames.len() > self.capacity {
            let excess = self.frames.len() - self.capacity;
            self.frames.drain(..excess);
        }
    }

    pub fn frames(&self) -> &[FrameSnapshot] {
        &self.frames
    }

    /// The window as it would look with `next` appended.
    pub fn with_next(&self, next: &FrameSnapshot) -> Vec<FrameSnapshot> {
        let skip = (self.frames.len() + 1).saturating_sub(self.capacity);
        self.frames[skip..]
            .iter()
            .cloned()
            .chain(std::iter::once(next.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameControl, GameLauncher};
    use crate::input::InputFrame;
    use crate::sim::SimLauncher;
    use crate::snapshot::{CollisionAdjust, LevelInfo, PlayerState};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    fn frame(tick: u64, x: i32, x_vel: i32) -> FrameSnapshot {
        FrameSnapshot {
            tick,
            keys: InputFrame::IDLE,
            boxes: BTreeMap::new(),
            player: Some(PlayerSnapshot {
                x,
                y: 0,
                x_vel,
                y_vel: 0,
                w: 16,
                h: 16,
                state: PlayerState::Walking,
                big: false,
                dead: false,
                adjusted: CollisionAdjust::default(),
            }),
            level: Some(LevelInfo {
                number: 1,
                start_x: 0,
                end_x: 1_000,
            }),
        }
    }

    fn rule_of(result: Result<(), Violation>) -> Option<RuleCode> {
        result.err().map(|violation| violation.rule)
    }

    #[test]
    fn consistent_motion_passes() {
        let model = MovementModel::default();
        let history = [frame(16, 512, 8), frame(33, 520, 8)];
        assert!(model.check(&history).is_ok());
        assert!(model.check(&history[..1]).is_ok());
        assert!(model.check(&[]).is_ok());
    }

    #[test]
    fn flags_each_rule() {
        let model = MovementModel::default();
        assert_eq!(
            rule_of(model.check(&[frame(16, 0, 0), frame(16, 0, 0)])),
            Some(RuleCode::TickMonotonic)
        );
        assert_eq!(
            rule_of(model.check(&[frame(16, 512, 8), frame(33, 530, 8)])),
            Some(RuleCode::HorizontalVelocityConsistency)
        );
        assert_eq!(
            rule_of(model.check(&[frame(16, 512, 80)])),
            Some(RuleCode::HorizontalSpeedLimit)
        );
        assert_eq!(
            rule_of(model.check(&[frame(16, -32, 0)])),
            Some(RuleCode::PlayerPastLeftBoundary)
        );
        assert_eq!(
            rule_of(model.check(&[frame(16, 990 * 16, 0)])),
            Some(RuleCode::PlayerPastRightBoundary)
        );

        let mut dead = frame(16, 512, 0);
        if let Some(player) = dead.player.as_mut() {
            player.dead = true;
            player.state = PlayerState::Dead;
        }
        assert_eq!(
            rule_of(model.check(&[dead, frame(33, 512, 0)])),
            Some(RuleCode::DeadPlayerRevived)
        );

        let mut falling = frame(16, 512, 0);
        let mut kicked = frame(33, 512, 0);
        if let (Some(a), Some(b)) = (falling.player.as_mut(), kicked.player.as_mut()) {
            a.state = PlayerState::Falling;
            a.y_vel = 30;
            b.state = PlayerState::Jumping;
            b.y_vel = -70;
        }
        assert_eq!(
            rule_of(model.check(&[falling, kicked])),
            Some(RuleCode::MidairJumpImpulse)
        );
    }

    #[test]
    fn collision_adjustment_excuses_position_jumps() {
        let model = MovementModel::default();
        let mut pushed = frame(33, 500, 0);
        if let Some(player) = pushed.player.as_mut() {
            player.adjusted.horizontal = true;
        }
        assert!(model.check(&[frame(16, 512, 8), pushed]).is_ok());
    }

    #[test]
    fn level_changes_and_transition_screens_are_skipped() {
        let model = MovementModel::default();
        let mut blank = frame(33, 0, 0);
        blank.player = None;
        assert!(model.check(&[frame(16, 900, 8), blank.clone()]).is_ok());
        assert!(model.check(&[blank, frame(50, 32, 0)]).is_ok());

        let mut next_level = frame(50, 32, 0);
        next_level.level = next_level.level.map(|info| LevelInfo { number: 2, ..info });
        assert!(model.check(&[frame(16, 900, 8), next_level]).is_ok());
    }

    #[test]
    fn history_keeps_a_bounded_window() {
        let mut history = History::new(3);
        for tick in 1..=5 {
            history.push(frame(tick, 0, 0));
        }
        let ticks: Vec<u64> = history.frames().iter().map(|f| f.tick).collect();
        assert_eq!(ticks, vec![3, 4, 5]);
        let next: Vec<u64> = history.with_next(&frame(6, 0, 0)).iter().map(|f| f.tick).collect();
        assert_eq!(next, vec![4, 5, 6]);
    }

    #[test]
    fn reference_game_satisfies_the_model_under_random_input() {
        let model = MovementModel::default();
        let mut rng = StdRng::seed_from_u64(0xB0B);
        for level in 1..=2 {
            let mut game = SimLauncher.start(60, level).unwrap();
            let mut history = History::new(DEFAULT_LOOKBACK);
            let mut input = InputFrame::IDLE;
            for _ in 0..1_500 {
                if rng.gen_bool(0.1) {
                    input = InputFrame::from_bits(rng.gen_range(0..0x40));
                }
                game.set_input(input);
                let Ok(snapshot) = game.step() else {
                    break;
                };
                history.push(snapshot);
                model.check(history.frames()).unwrap();
            }
        }
    }
}
