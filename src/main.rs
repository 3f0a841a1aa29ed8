use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use platformer_autopilot::config::ExplorationConfig;
use platformer_autopilot::corpus::Corpus;
use platformer_autopilot::explore::Explorer;
use platformer_autopilot::moves::MoveKind;
use platformer_autopilot::oracle::MovementModel;
use platformer_autopilot::replay::replay_path;
use platformer_autopilot::sim::SimLauncher;
use platformer_autopilot::store;
use platformer_autopilot::util::{hash_to_hex, parse_seed, seed_to_hex};
use platformer_autopilot::verify::verify_corpus;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "platformer-autopilot")]
#[command(about = "Corpus-guided exploration and replay checking for a side-scrolling platformer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every subcommand that touches a game or a corpus.
#[derive(Args, Debug)]
struct Common {
    /// JSON exploration config; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    corpus_file: Option<PathBuf>,
    #[arg(long)]
    fps: Option<u32>,
    #[arg(long)]
    start_level: Option<u32>,
}

impl Common {
    fn resolve(&self) -> Result<ExplorationConfig> {
        let mut cfg = match &self.config {
            Some(path) => ExplorationConfig::from_file(path)?,
            None => ExplorationConfig::default(),
        };
        if let Some(path) = &self.corpus_file {
            cfg.corpus_file = path.clone();
        }
        if let Some(fps) = self.fps {
            cfg.fps = fps;
        }
        if let Some(level) = self.start_level {
            cfg.start_level = level;
        }
        Ok(cfg)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Grow the corpus by exploring from its best paths
    Explore {
        #[command(flatten)]
        common: Common,
        /// Total play time in seconds
        #[arg(long)]
        play_seconds: Option<u32>,
        /// Seconds of new input per try
        #[arg(long)]
        interval: Option<u32>,
        #[arg(long)]
        tries: Option<u32>,
        /// Start from an empty corpus instead of the corpus file
        #[arg(long)]
        no_load: bool,
        #[arg(long)]
        no_save: bool,
        #[arg(long)]
        backtrack: Option<usize>,
        #[arg(long)]
        clean_threshold: Option<u64>,
        /// Replay the whole seed path instead of its backtracked prefix
        #[arg(long)]
        replay_full_path: bool,
        /// Always continue from the best path
        #[arg(long)]
        best_path: bool,
        #[arg(long)]
        seed: Option<String>,
    },
    /// Replay one stored path and check every score
    Replay {
        #[command(flatten)]
        common: Common,
        /// Rank of the path by score (0 = best)
        #[arg(long, default_value_t = 0)]
        rank: usize,
    },
    /// Replay every stored path in parallel
    VerifyCorpus {
        #[command(flatten)]
        common: Common,
        #[arg(long)]
        jobs: Option<usize>,
        /// Write the full per-path report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Collapse near-duplicate scores in the corpus file
    Clean {
        #[command(flatten)]
        common: Common,
        #[arg(long)]
        threshold: Option<u64>,
    },
    /// Summarise the corpus file
    Inspect {
        #[command(flatten)]
        common: Common,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// List the move catalogue with effective weights
    ListMoves {
        #[command(flatten)]
        common: Common,
    },
}

fn load_sorted(cfg: &ExplorationConfig) -> Result<Corpus> {
    let mut corpus = store::load(&cfg.corpus_file, cfg.corpus_settings())
        .with_context(|| format!("loading corpus {}", cfg.corpus_file.display()))?;
    corpus.sort();
    Ok(corpus)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let Cli { command } = Cli::parse();

    match command {
        Commands::Explore {
            common,
            play_seconds,
            interval,
            tries,
            no_load,
            no_save,
            backtrack,
            clean_threshold,
            replay_full_path,
            best_path,
            seed,
        } => {
            let mut cfg = common.resolve()?;
            if let Some(value) = play_seconds {
                cfg.play_seconds = value;
            }
            if let Some(value) = interval {
                cfg.interval_seconds = value;
            }
            if let Some(value) = tries {
                cfg.tries = value;
            }
            if let Some(value) = backtrack {
                cfg.backtrack_frames = value;
            }
            if let Some(value) = clean_threshold {
                cfg.clean_threshold = value;
            }
            if let Some(seed) = seed {
                cfg.seed = parse_seed(&seed)?;
            }
            cfg.load_paths &= !no_load;
            cfg.save_paths &= !no_save;
            cfg.replay_full_path |= replay_full_path;
            cfg.always_best_path |= best_path;

            let oracle = MovementModel::default();
            let explorer = Explorer::new(&cfg, &SimLauncher, &oracle)?;
            let mut rng = StdRng::seed_from_u64(cfg.seed);
            let (_, report) = explorer.run(&mut rng)?;

            println!("seed={}", seed_to_hex(cfg.seed));
            println!("iterations={}", report.iterations);
            println!("playouts={}", report.playouts);
            println!("deaths={}", report.deaths);
            println!("violations={}", report.violations);
            println!("seeds_deleted={}", report.seeds_deleted);
            println!("reseeds={}", report.reseeds);
            println!("paths_inserted={}", report.paths_inserted);
            println!("splits_inserted={}", report.splits_inserted);
            println!("duplicates={}", report.duplicates);
            println!("cleaned={}", report.cleaned);
            println!("corpus_size={}", report.corpus_size);
            println!("best_score={}", report.best_score);
            println!("best_frames={}", report.best_frames);
            if cfg.save_paths {
                println!("corpus_file={}", cfg.corpus_file.display());
            }
        }
        Commands::Replay { common, rank } => {
            let cfg = common.resolve()?;
            cfg.validate()?;
            let corpus = load_sorted(&cfg)?;
            let path = corpus.paths().get(rank).ok_or_else(|| {
                anyhow!(
                    "corpus {} has {} paths, no rank {rank}",
                    cfg.corpus_file.display(),
                    corpus.len()
                )
            })?;
            let report = replay_path(
                &SimLauncher,
                &MovementModel::default(),
                &cfg.replay_setup(),
                path,
            )
            .with_context(|| format!("replaying path rank {rank}"))?;

            println!("rank={rank}");
            println!("hash={}", hash_to_hex(path.terminal_hash()));
            println!("frames={}", report.frames);
            println!("recorded_score={}", path.final_score());
            println!("final_score={}", report.final_score);
            println!("final_tick={}", report.final_tick);
            println!("died={}", report.died);
        }
        Commands::VerifyCorpus {
            common,
            jobs,
            output,
        } => {
            let cfg = common.resolve()?;
            cfg.validate()?;
            let corpus = load_sorted(&cfg)?;
            let report = verify_corpus(
                &SimLauncher,
                &MovementModel::default(),
                &cfg.replay_setup(),
                corpus.paths(),
                jobs,
            )?;

            println!("checked={}", report.checked);
            println!("reproduced={}", report.reproduced);
            println!(
                "jobs={}",
                report
                    .jobs
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "auto".to_string())
            );
            for entry in report.failures() {
                println!(
                    "  #{:03} {} score={} frames={} verdict={:?}",
                    entry.position,
                    entry.terminal_hash,
                    entry.recorded_score,
                    entry.frames,
                    entry.verdict,
                );
            }
            if let Some(path) = output {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, serde_json::to_vec_pretty(&report)?)?;
                println!("output={}", path.display());
            }
            if !report.is_clean() {
                return Err(anyhow!(
                    "{} of {} paths did not reproduce",
                    report.checked - report.reproduced,
                    report.checked
                ));
            }
        }
        Commands::Clean { common, threshold } => {
            let cfg = common.resolve()?;
            let mut corpus = load_sorted(&cfg)?;
            let before = corpus.len();
            let threshold = threshold.unwrap_or(cfg.clean_threshold);
            let removed = corpus.clean(threshold);
            store::save(&cfg.corpus_file, &corpus)
                .with_context(|| format!("saving corpus {}", cfg.corpus_file.display()))?;

            println!("threshold={threshold}");
            println!("before={before}");
            println!("removed={removed}");
            println!("after={}", corpus.len());
        }
        Commands::Inspect { common, top } => {
            let cfg = common.resolve()?;
            let corpus = load_sorted(&cfg)?;
            println!("corpus_file={}", cfg.corpus_file.display());
            println!("paths={}", corpus.len());
            for (rank, path) in corpus.paths().iter().take(top).enumerate() {
                println!(
                    "  {rank:>3}. score={} frames={} level={} hash={} last_tick={}",
                    path.final_score(),
                    path.len(),
                    path.final_score() / cfg.level_multiplier.max(1),
                    hash_to_hex(path.terminal_hash()),
                    path.final_tick(),
                );
            }
        }
        Commands::ListMoves { common } => {
            let cfg = common.resolve()?;
            let policy = cfg.move_policy()?;
            println!("flip_probability={}", policy.flip_probability());
            for kind in MoveKind::ALL {
                println!(
                    "{:28} frames={:3} weight={:.2}",
                    kind.name(),
                    kind.default_length(),
                    policy.weight(kind)
                );
            }
        }
    }

    Ok(())
}
