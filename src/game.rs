//! Boundary to the game under test.
//!
//! A game advances exactly one tick per `step`, applying whatever input was
//! last handed to `set_input`, and returns what it observed after that tick.

use crate::error::GameError;
use crate::input::InputFrame;
use crate::snapshot::FrameSnapshot;

pub trait GameControl {
    fn fps(&self) -> u32;

    /// Buttons held from the next `step` on.
    fn set_input(&mut self, input: InputFrame);

    fn step(&mut self) -> Result<FrameSnapshot, GameError>;

    fn current_tick(&self) -> u64;
}

/// Starts fresh, independent game instances.
pub trait GameLauncher {
    type Game: GameControl;

    fn start(&self, fps: u32, start_level: u32) -> Result<Self::Game, GameError>;
}
