//! Deterministic headless side-scroller.
//!
//! Positions and velocities are Q12.4 fixed point (1/16 px); velocities are
//! subpixels per frame. Ticks are milliseconds derived from the frame
//! counter, so identical input always yields identical snapshots.

use crate::error::GameError;
use crate::game::{GameControl, GameLauncher};
use crate::input::InputFrame;
use crate::snapshot::{
    CollisionAdjust, ElementBox, FrameSnapshot, PlayerSnapshot, PlayerState, SUBPIXELS_PER_PIXEL,
};
use std::collections::BTreeMap;

mod level;

use level::Level;

pub const MAX_FPS: u32 = 240;
pub const LEVEL_COUNT: u32 = level::LEVELS.len() as u32;

pub const SCREEN_HEIGHT_PX: i32 = 240;
pub const GROUND_TOP_PX: i32 = 208;
pub const PIPE_WIDTH_PX: i32 = 32;
pub const PLAYER_WIDTH_PX: i32 = 16;
pub const PLAYER_HEIGHT_PX: i32 = 16;
pub const START_X_PX: i32 = 32;

pub const WALK_SPEED: i32 = 24;
pub const RUN_SPEED: i32 = 40;
pub const ACCELERATION: i32 = 2;
pub const FRICTION: i32 = 2;
pub const JUMP_IMPULSE: i32 = -72;
pub const GRAVITY: i32 = 6;
/// Gravity while rising with jump held, which is what makes jumps variable.
pub const GRAVITY_HELD: i32 = 2;
pub const MAX_FALL_SPEED: i32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Playing,
    Transition { remaining: u32 },
    Finished,
}

#[derive(Clone, Copy, Debug)]
struct Player {
    x: i32,
    y: i32,
    vx: i32,
    vy: i32,
    grounded: bool,
    dead: bool,
    jump_latch: bool,
    adjusted: CollisionAdjust,
}

impl Player {
    fn spawn() -> Self {
        Self {
            x: START_X_PX * SUBPIXELS_PER_PIXEL,
            y: (GROUND_TOP_PX - PLAYER_HEIGHT_PX) * SUBPIXELS_PER_PIXEL,
            vx: 0,
            vy: 0,
            grounded: true,
            dead: false,
            jump_latch: false,
            adjusted: CollisionAdjust::default(),
        }
    }

    fn overlaps(&self, solid: &ElementBox) -> bool {
        let w = PLAYER_WIDTH_PX * SUBPIXELS_PER_PIXEL;
        let h = PLAYER_HEIGHT_PX * SUBPIXELS_PER_PIXEL;
        self.x < solid.right() * SUBPIXELS_PER_PIXEL
            && solid.x * SUBPIXELS_PER_PIXEL < self.x + w
            && self.y < solid.bottom() * SUBPIXELS_PER_PIXEL
            && solid.y * SUBPIXELS_PER_PIXEL < self.y + h
    }

    fn state(&self) -> PlayerState {
        if self.dead {
            PlayerState::Dead
        } else if !self.grounded {
            if self.vy < 0 {
                PlayerState::Jumping
            } else {
                PlayerState::Falling
            }
        } else if self.vx != 0 {
            PlayerState::Walking
        } else {
            PlayerState::Standing
        }
    }
}

/// Moves `value` toward `target` by at most `rate`.
#[inline]
fn approach(value: i32, target: i32, rate: i32) -> i32 {
    if value < target {
        (value + rate).min(target)
    } else {
        (value - rate).max(target)
    }
}

pub struct Platformer {
    fps: u32,
    frame_count: u64,
    level: &'static Level,
    solids: Vec<ElementBox>,
    mode: Mode,
    player: Player,
    input: InputFrame,
}

impl Platformer {
    pub fn new(fps: u32, start_level: u32) -> Result<Self, GameError> {
        if fps == 0 || fps > MAX_FPS {
            return Err(GameError::InvalidFps { fps });
        }
        let level =
            level::find(start_level).ok_or(GameError::UnknownLevel { level: start_level })?;
        Ok(Self {
            fps,
            frame_count: 0,
            level,
            solids: level.solids(),
            mode: Mode::Playing,
            player: Player::spawn(),
            input: InputFrame::IDLE,
        })
    }

    pub fn level_number(&self) -> u32 {
        self.level.number
    }

    fn enter_level(&mut self, level: &'static Level) {
        self.level = level;
        self.solids = level.solids();
        self.player = Player::spawn();
        self.mode = Mode::Playing;
    }

    fn update_player(&mut self) {
        let input = self.input;
        let solids = &self.solids;
        let p = &mut self.player;
        p.adjusted = CollisionAdjust::default();

        if p.dead {
            p.vx = 0;
            p.vy = 0;
            return;
        }

        let top_speed = if input.action { RUN_SPEED } else { WALK_SPEED };
        p.vx = match input.direction() {
            0 => approach(p.vx, 0, FRICTION),
            dir => approach(p.vx, dir * top_speed, ACCELERATION),
        };

        if p.grounded && input.jump && !p.jump_latch {
            p.vy = JUMP_IMPULSE;
            p.grounded = false;
        }
        p.jump_latch = input.jump;
        let gravity = if p.vy < 0 && input.jump {
            GRAVITY_HELD
        } else {
            GRAVITY
        };
        p.vy = (p.vy + gravity).min(MAX_FALL_SPEED);

        let dx = p.vx;
        p.x += dx;
        for solid in solids {
            if p.overlaps(solid) {
                if dx > 0 {
                    p.x = (solid.x - PLAYER_WIDTH_PX) * SUBPIXELS_PER_PIXEL;
                } else if dx < 0 {
                    p.x = solid.right() * SUBPIXELS_PER_PIXEL;
                }
                p.vx = 0;
                p.adjusted.horizontal = true;
            }
        }

        let left_limit = 0;
        let right_limit = (self.level.width - PLAYER_WIDTH_PX) * SUBPIXELS_PER_PIXEL;
        if p.x < left_limit || p.x > right_limit {
            p.x = p.x.clamp(left_limit, right_limit);
            p.vx = 0;
            p.adjusted.horizontal = true;
        }

        let dy = p.vy;
        p.y += dy;
        p.grounded = false;
        for solid in solids {
            if p.overlaps(solid) {
                if dy > 0 {
                    p.y = (solid.y - PLAYER_HEIGHT_PX) * SUBPIXELS_PER_PIXEL;
                    p.grounded = true;
                } else if dy < 0 {
                    p.y = solid.bottom() * SUBPIXELS_PER_PIXEL;
                }
                p.vy = 0;
                p.adjusted.vertical = true;
            }
        }

        if p.y.div_euclid(SUBPIXELS_PER_PIXEL) > SCREEN_HEIGHT_PX {
            p.dead = true;
            return;
        }

        let right_px = (p.x + PLAYER_WIDTH_PX * SUBPIXELS_PER_PIXEL).div_euclid(SUBPIXELS_PER_PIXEL);
        if right_px >= self.level.flag_x {
            self.mode = Mode::Transition {
                remaining: self.fps,
            };
        }
    }

    fn advance_transition(&mut self, remaining: u32) {
        if remaining > 1 {
            self.mode = Mode::Transition {
                remaining: remaining - 1,
            };
            return;
        }
        match level::find(self.level.number + 1) {
            Some(next) => self.enter_level(next),
            None => self.mode = Mode::Finished,
        }
    }

    fn player_snapshot(&self) -> PlayerSnapshot {
        let p = &self.player;
        PlayerSnapshot {
            x: p.x,
            y: p.y,
            x_vel: p.vx,
            y_vel: p.vy,
            w: PLAYER_WIDTH_PX,
            h: PLAYER_HEIGHT_PX,
            state: p.state(),
            big: false,
            dead: p.dead,
            adjusted: p.adjusted,
        }
    }

    fn snapshot(&self) -> FrameSnapshot {
        let playing = self.mode == Mode::Playing;
        FrameSnapshot {
            tick: self.current_tick(),
            keys: self.input,
            boxes: if playing {
                self.level.boxes()
            } else {
                BTreeMap::new()
            },
            player: playing.then(|| self.player_snapshot()),
            level: playing.then(|| self.level.info()),
        }
    }
}

impl GameControl for Platformer {
    fn fps(&self) -> u32 {
        self.fps
    }

    fn set_input(&mut self, input: InputFrame) {
        self.input = input;
    }

    fn step(&mut self) -> Result<FrameSnapshot, GameError> {
        match self.mode {
            Mode::Finished => {
                return Err(GameError::Finished {
                    tick: self.current_tick(),
                })
            }
            Mode::Transition { remaining } => self.advance_transition(remaining),
            Mode::Playing => self.update_player(),
        }
        self.frame_count += 1;
        Ok(self.snapshot())
    }

    fn current_tick(&self) -> u64 {
        self.frame_count * 1_000 / u64::from(self.fps)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SimLauncher;

impl GameLauncher for SimLauncher {
    type Game = Platformer;

    fn start(&self, fps: u32, start_level: u32) -> Result<Platformer, GameError> {
        Platformer::new(fps, start_level)
    }
}
