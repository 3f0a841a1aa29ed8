use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleCode {
    TickMonotonic,
    PlayerPastLeftBoundary,
    PlayerPastRightBoundary,
    HorizontalSpeedLimit,
    HorizontalVelocityConsistency,
    DeadPlayerRevived,
    MidairJumpImpulse,
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TickMonotonic => write!(f, "TICK_MONOTONIC"),
            Self::PlayerPastLeftBoundary => write!(f, "PLAYER_PAST_LEFT_BOUNDARY"),
            Self::PlayerPastRightBoundary => write!(f, "PLAYER_PAST_RIGHT_BOUNDARY"),
            Self::HorizontalSpeedLimit => write!(f, "HORIZONTAL_SPEED_LIMIT"),
            Self::HorizontalVelocityConsistency => write!(f, "HORIZONTAL_VELOCITY_CONSISTENCY"),
            Self::DeadPlayerRevived => write!(f, "DEAD_PLAYER_REVIVED"),
            Self::MidairJumpImpulse => write!(f, "MIDAIR_JUMP_IMPULSE"),
        }
    }
}

/// An oracle verdict: the most recent transition is physically inconsistent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub tick: u64,
    pub rule: RuleCode,
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule violation at tick {}: {} ({})", self.tick, self.rule, self.detail)
    }
}

impl std::error::Error for Violation {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameError {
    InvalidFps { fps: u32 },
    UnknownLevel { level: u32 },
    Finished { tick: u64 },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFps { fps } => write!(f, "fps must be in 1..=240, got {fps}"),
            Self::UnknownLevel { level } => write!(f, "unknown level: {level}"),
            Self::Finished { tick } => write!(f, "game already finished at tick {tick}"),
        }
    }
}

impl std::error::Error for GameError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplayError {
    /// The live game no longer reproduces the recorded score. Fatal: the
    /// corpus cannot be trusted once this happens.
    ScoreMismatch {
        index: usize,
        expected: i64,
        actual: i64,
    },
    Violation(Violation),
    Game(GameError),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScoreMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "replay score mismatch at index {index}: recorded={expected}, computed={actual}"
            ),
            Self::Violation(violation) => write!(f, "replay aborted: {violation}"),
            Self::Game(err) => write!(f, "replay aborted: {err}"),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<GameError> for ReplayError {
    fn from(err: GameError) -> Self {
        Self::Game(err)
    }
}

impl From<Violation> for ReplayError {
    fn from(violation: Violation) -> Self {
        Self::Violation(violation)
    }
}

#[derive(Debug)]
pub enum StoreError {
    Parse(serde_json::Error),
    UnsupportedVersion { found: u32 },
    Corrupt { index: usize, reason: String },
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "malformed corpus file: {err}"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported corpus file version: {found}")
            }
            Self::Corrupt { index, reason } => write!(f, "corrupt path #{index}: {reason}"),
            Self::Io(err) => write!(f, "corpus file i/o failed: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    OutOfRange { field: &'static str, reason: String },
    UnknownMove { name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::UnknownMove { name } => write!(f, "unknown move in weights: {name}"),
        }
    }
}

impl std::error::Error for ConfigError {}
