use crate::error::ReplayError;
use crate::game::GameLauncher;
use crate::oracle::Oracle;
use crate::path::GamePath;
use crate::replay::{replay_path, ReplaySetup};
use crate::util::hash_to_hex;
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Reproduced,
    /// The replay ended in death although the stored path does not.
    Died { frames: usize },
    Mismatch {
        index: usize,
        expected: i64,
        actual: i64,
    },
    Failed { reason: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct PathVerdict {
    pub position: usize,
    pub terminal_hash: String,
    pub recorded_score: i64,
    pub frames: usize,
    pub verdict: Verdict,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub reproduced: usize,
    pub jobs: Option<usize>,
    pub verdicts: Vec<PathVerdict>,
}

impl VerifyReport {
    pub fn failures(&self) -> impl Iterator<Item = &PathVerdict> {
        self.verdicts
            .iter()
            .filter(|entry| entry.verdict != Verdict::Reproduced)
    }

    pub fn is_clean(&self) -> bool {
        self.reproduced == self.checked
    }
}

fn judge<L: GameLauncher, O: Oracle + ?Sized>(
    launcher: &L,
    oracle: &O,
    setup: &ReplaySetup,
    path: &GamePath,
) -> Verdict {
    match replay_path(launcher, oracle, setup, path) {
        Ok(report) if report.died && !path.died() => Verdict::Died {
            frames: report.frames,
        },
        Ok(_) => Verdict::Reproduced,
        Err(ReplayError::ScoreMismatch {
            index,
            expected,
            actual,
        }) => Verdict::Mismatch {
            index,
            expected,
            actual,
        },
        Err(err) => Verdict::Failed {
            reason: err.to_string(),
        },
    }
}

/// Replays every path against its own fresh game, in parallel.
pub fn verify_corpus<L, O>(
    launcher: &L,
    oracle: &O,
    setup: &ReplaySetup,
    paths: &[GamePath],
    jobs: Option<usize>,
) -> Result<VerifyReport>
where
    L: GameLauncher + Sync,
    O: Oracle + Sync + ?Sized,
{
    if let Some(jobs) = jobs {
        if jobs == 0 {
            return Err(anyhow!("verify-corpus --jobs must be >= 1 when provided"));
        }
    }

    let verify_one = |(position, path): (usize, &GamePath)| PathVerdict {
        position,
        terminal_hash: hash_to_hex(path.terminal_hash()),
        recorded_score: path.final_score(),
        frames: path.len(),
        verdict: judge(launcher, oracle, setup, path),
    };

    let verdicts: Vec<PathVerdict> = if let Some(jobs) = jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| paths.par_iter().enumerate().map(verify_one).collect())
    } else {
        paths.par_iter().enumerate().map(verify_one).collect()
    };

    let reproduced = verdicts
        .iter()
        .filter(|entry| entry.verdict == Verdict::Reproduced)
        .count();
    Ok(VerifyReport {
        checked: verdicts.len(),
        reproduced,
        jobs,
        verdicts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputFrame, BUTTON_ACTION, BUTTON_RIGHT};
    use crate::oracle::{MovementModel, DEFAULT_LOOKBACK};
    use crate::path::ScoreModel;
    use crate::replay::{Session, Step};
    use crate::sim::SimLauncher;
    use serde_json::{json, Value};

    fn setup() -> ReplaySetup {
        ReplaySetup {
            fps: 60,
            start_level: 1,
            lookback: DEFAULT_LOOKBACK,
            model: ScoreModel::with_fps(60),
        }
    }

    /// Runs right for up to `frames` ticks, stopping at death.
    fn run_right(frames: usize) -> GamePath {
        let oracle = MovementModel::default();
        let game = SimLauncher.start(60, 1).unwrap();
        let mut session = Session::new(game, &oracle, ScoreModel::with_fps(60), DEFAULT_LOOKBACK);
        let run = InputFrame::from_bits(BUTTON_RIGHT | BUTTON_ACTION);
        for _ in 0..frames {
            if session.advance(run).unwrap() == Step::Died {
                break;
            }
        }
        session.into_path()
    }

    fn edited(path: &GamePath, edit: impl FnOnce(&mut Value)) -> GamePath {
        let mut value = serde_json::to_value(path).unwrap();
        edit(&mut value);
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn reports_mismatches_and_unexpected_deaths() {
        let clean = run_right(40);
        let recorded = clean.scores()[20];
        let corrupted = edited(&clean, |value| value["scores"][20] = json!(recorded + 1));

        let dying = run_right(400);
        assert!(dying.died());
        let last = dying.len() - 1;
        let hides_death = edited(&dying, |value| value["deaths"][last] = json!(false));

        let paths = vec![clean, corrupted, dying.clone(), hides_death];
        let report = verify_corpus(
            &SimLauncher,
            &MovementModel::default(),
            &setup(),
            &paths,
            Some(2),
        )
        .unwrap();

        assert_eq!(report.checked, 4);
        assert_eq!(report.reproduced, 2);
        assert!(!report.is_clean());
        let verdicts: Vec<&Verdict> = report.verdicts.iter().map(|entry| &entry.verdict).collect();
        assert_eq!(verdicts[0], &Verdict::Reproduced);
        assert_eq!(
            verdicts[1],
            &Verdict::Mismatch {
                index: 20,
                expected: recorded + 1,
                actual: recorded,
            }
        );
        // A stored death that replays as a death is a faithful reproduction.
        assert_eq!(verdicts[2], &Verdict::Reproduced);
        assert_eq!(verdicts[3], &Verdict::Died { frames: dying.len() });

        let failed: Vec<usize> = report.failures().map(|entry| entry.position).collect();
        assert_eq!(failed, vec![1, 3]);
    }

    #[test]
    fn game_errors_become_failed_verdicts() {
        let paths = vec![run_right(10)];
        let unknown_level = ReplaySetup {
            start_level: 9,
            ..setup()
        };
        let report = verify_corpus(
            &SimLauncher,
            &MovementModel::default(),
            &unknown_level,
            &paths,
            None,
        )
        .unwrap();
        assert_eq!(report.checked, 1);
        assert!(matches!(
            &report.verdicts[0].verdict,
            Verdict::Failed { reason } if !reason.is_empty()
        ));
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let paths = vec![run_right(5)];
        let oracle = MovementModel::default();
        assert!(verify_corpus(&SimLauncher, &oracle, &setup(), &paths, Some(0)).is_err());

        let report = verify_corpus(&SimLauncher, &oracle, &setup(), &[], None).unwrap();
        assert_eq!(report.checked, 0);
        assert!(report.is_clean());
    }
}
