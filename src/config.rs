use crate::corpus::{
    CorpusSettings, DEFAULT_BACKTRACK_FRAMES, DEFAULT_BEST_PROBABILITY, DEFAULT_CLEAN_THRESHOLD,
    DEFAULT_SPLIT_FRAMES,
};
use crate::error::ConfigError;
use crate::moves::{MovePolicy, DEFAULT_FLIP_PROBABILITY};
use crate::oracle::DEFAULT_LOOKBACK;
use crate::path::{
    ScoreModel, DEFAULT_LEVEL_MULTIPLIER, DEFAULT_POSITION_MULTIPLIER,
    DEFAULT_TIME_CEILING_SECONDS,
};
use crate::replay::ReplaySetup;
use crate::selection::DEFAULT_SCALING_FACTOR;
use crate::sim::MAX_FPS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SEED: u64 = 0x5EED_CAFE;

/// Everything one exploration run needs. Missing JSON fields take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub fps: u32,
    pub start_level: u32,
    pub play_seconds: u32,
    pub interval_seconds: u32,
    pub tries: u32,
    pub corpus_file: PathBuf,
    pub load_paths: bool,
    pub save_paths: bool,
    pub backtrack_frames: usize,
    pub split_frames: usize,
    pub clean_threshold: u64,
    pub replay_full_path: bool,
    pub always_best_path: bool,
    pub best_path_probability: f64,
    pub scaling_factor: f64,
    pub seed: u64,
    pub level_multiplier: i64,
    pub position_multiplier: i64,
    pub time_ceiling_seconds: i64,
    /// Per-move weight overrides keyed by move name.
    pub move_weights: BTreeMap<String, f64>,
    pub flip_probability: f64,
    pub oracle_lookback: usize,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            start_level: 1,
            play_seconds: 60,
            interval_seconds: 1,
            tries: 5,
            corpus_file: PathBuf::from("paths.json"),
            load_paths: true,
            save_paths: true,
            backtrack_frames: DEFAULT_BACKTRACK_FRAMES,
            split_frames: DEFAULT_SPLIT_FRAMES,
            clean_threshold: DEFAULT_CLEAN_THRESHOLD,
            replay_full_path: false,
            always_best_path: false,
            best_path_probability: DEFAULT_BEST_PROBABILITY,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            seed: DEFAULT_SEED,
            level_multiplier: DEFAULT_LEVEL_MULTIPLIER,
            position_multiplier: DEFAULT_POSITION_MULTIPLIER,
            time_ceiling_seconds: DEFAULT_TIME_CEILING_SECONDS,
            move_weights: BTreeMap::new(),
            flip_probability: DEFAULT_FLIP_PROBABILITY,
            oracle_lookback: DEFAULT_LOOKBACK,
        }
    }
}

fn out_of_range(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        reason: reason.into(),
    }
}

impl ExplorationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let cfg: ExplorationConfig = serde_json::from_slice(&data)
            .with_context(|| format!("invalid exploration config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(out_of_range("fps", format!("{} not in 1..={MAX_FPS}", self.fps)));
        }
        if self.start_level == 0 {
            return Err(out_of_range("start_level", "levels are numbered from 1"));
        }
        if self.interval_seconds == 0 {
            return Err(out_of_range("interval_seconds", "must be at least 1"));
        }
        if self.play_seconds < self.interval_seconds {
            return Err(out_of_range(
                "play_seconds",
                format!(
                    "{} is shorter than one interval of {}s",
                    self.play_seconds, self.interval_seconds
                ),
            ));
        }
        if self.tries == 0 {
            return Err(out_of_range("tries", "must be at least 1"));
        }
        if self.oracle_lookback < 2 {
            return Err(out_of_range("oracle_lookback", "needs at least 2 snapshots"));
        }
        if self.level_multiplier <= 0 || self.position_multiplier <= 0 {
            return Err(out_of_range("score multipliers", "must be positive"));
        }
        if self.time_ceiling_seconds < 0 {
            return Err(out_of_range("time_ceiling_seconds", "must be >= 0"));
        }
        self.corpus_settings().validate()?;
        self.move_policy()?;
        Ok(())
    }

    /// Number of exploration iterations (`play_seconds / interval_seconds`).
    pub fn iterations(&self) -> u32 {
        self.play_seconds / self.interval_seconds.max(1)
    }

    pub fn frames_per_try(&self) -> usize {
        self.interval_seconds as usize * self.fps as usize
    }

    pub fn corpus_settings(&self) -> CorpusSettings {
        CorpusSettings {
            backtrack_frames: self.backtrack_frames,
            split_frames: self.split_frames,
            clean_threshold: self.clean_threshold,
            scaling_factor: self.scaling_factor,
            best_probability: self.best_path_probability,
        }
    }

    pub fn score_model(&self) -> ScoreModel {
        ScoreModel {
            fps: self.fps,
            level_multiplier: self.level_multiplier,
            position_multiplier: self.position_multiplier,
            time_ceiling_seconds: self.time_ceiling_seconds,
        }
    }

    pub fn move_policy(&self) -> Result<MovePolicy, ConfigError> {
        MovePolicy::new(self.flip_probability, &self.move_weights)
    }

    pub fn replay_setup(&self) -> ReplaySetup {
        ReplaySetup {
            fps: self.fps,
            start_level: self.start_level,
            lookback: self.oracle_lookback,
            model: self.score_model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ExplorationConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.iterations(), 60);
        assert_eq!(cfg.frames_per_try(), 60);
        assert_eq!(cfg.score_model(), ScoreModel::with_fps(60));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: ExplorationConfig =
            serde_json::from_str(r#"{"fps": 30, "move_weights": {"down": 0.0}}"#).unwrap();
        assert_eq!(cfg.fps, 30);
        assert_eq!(cfg.tries, 5);
        assert_eq!(cfg.move_policy().unwrap().weight(crate::moves::MoveKind::Down), 0.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_fps = ExplorationConfig {
            fps: 0,
            ..ExplorationConfig::default()
        };
        assert!(bad_fps.validate().is_err());

        let bad_move = ExplorationConfig {
            move_weights: BTreeMap::from([("warp_pipe".to_string(), 1.0)]),
            ..ExplorationConfig::default()
        };
        assert_eq!(
            bad_move.validate(),
            Err(ConfigError::UnknownMove {
                name: "warp_pipe".to_string()
            })
        );

        let bad_probability = ExplorationConfig {
            best_path_probability: -0.5,
            ..ExplorationConfig::default()
        };
        assert!(bad_probability.validate().is_err());
    }

    #[test]
    fn play_time_must_cover_one_interval() {
        let short = ExplorationConfig {
            play_seconds: 1,
            interval_seconds: 2,
            ..ExplorationConfig::default()
        };
        assert!(matches!(
            short.validate(),
            Err(ConfigError::OutOfRange {
                field: "play_seconds",
                ..
            })
        ));

        let exact = ExplorationConfig {
            play_seconds: 2,
            interval_seconds: 2,
            ..ExplorationConfig::default()
        };
        exact.validate().unwrap();
        assert_eq!(exact.iterations(), 1);
    }

    #[test]
    fn from_file_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("explore.json");
        fs::write(&file, "{ not json").unwrap();
        let err = ExplorationConfig::from_file(&file).unwrap_err();
        assert!(format!("{err:#}").contains("explore.json"));
    }
}
