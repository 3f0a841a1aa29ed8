pub mod config;
pub mod corpus;
pub mod error;
pub mod explore;
pub mod game;
pub mod input;
pub mod moves;
pub mod oracle;
pub mod path;
pub mod replay;
pub mod selection;
pub mod sim;
pub mod snapshot;
pub mod store;
pub mod util;
pub mod verify;

pub use config::ExplorationConfig;
pub use corpus::{backtrack, Corpus, CorpusSettings};
pub use error::{ConfigError, GameError, ReplayError, RuleCode, StoreError, Violation};
pub use explore::{explore, ExplorationReport, Explorer};
pub use input::InputFrame;
pub use path::{GamePath, ScoreModel};
pub use replay::{replay_path, ReplaySetup};
pub use snapshot::FrameSnapshot;
