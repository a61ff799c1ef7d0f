//! Stage 4: sequential hyperparameter search over the boosted regressor,
//! recording every trial with the experiment tracker.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use forecast_demand::error::Result;
use forecast_demand::tracking::ExperimentTracker;
use forecast_demand::tuning::{run_search, SearchSpace, TuningConfig, TuningData};
use forecast_demand::{FileExperimentTracker, RandomSuggester};

#[derive(Parser)]
#[command(name = "tune_model", about = "Tune the demand forecaster against the split artifacts")]
struct Cli {
    /// Directory holding x_train/y_train/x_val/y_val
    #[arg(long, default_value = "./data/processed/2018-05-01")]
    source_dir: PathBuf,

    /// Number of parameter configurations for the optimizer to explore
    #[arg(long, default_value_t = 15)]
    num_trials: usize,

    /// Root directory of the experiment tracker
    #[arg(long, default_value = "./runs")]
    tracking_dir: PathBuf,

    /// Experiment name runs are recorded under
    #[arg(long, default_value = "ecommerce_forecast")]
    experiment: String,

    /// Seed of the parameter suggester
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn run(cli: &Cli) -> Result<()> {
    info!("loading split artifacts from {}", cli.source_dir.display());
    let data = TuningData::load(&cli.source_dir)?;

    let mut tracker = FileExperimentTracker::new(&cli.tracking_dir, &cli.experiment)?;
    let mut suggester = RandomSuggester::new(cli.seed);
    let space = SearchSpace::default();
    let config = TuningConfig::new(cli.num_trials, cli.tracking_dir.join("artifacts"));

    let trials = run_search(&data, &space, &mut suggester, &mut tracker, &config)?;
    let completed = trials.iter().filter(|t| !t.failed).count();
    info!("{completed}/{} trials completed", trials.len());

    if let Some(best) = tracker.list_runs_by_metric("rmse")?.first() {
        info!("best run {}: rmse {:.3}", best.run_id, best.metrics["rmse"]);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("tune_model failed: {err}");
            ExitCode::FAILURE
        }
    }
}
