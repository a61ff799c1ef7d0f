//! Stage 5: score two validation windows with a saved model and check the
//! feature/prediction distributions for drift.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};
use polars::prelude::*;

use forecast_demand::error::Result;
use forecast_demand::model::GbdtRegressor;
use forecast_demand::report::generate_drift_report;
use forecast_demand::schema::WEEK_COL;
use forecast_demand::tables;

#[derive(Parser)]
#[command(name = "drift_report", about = "Compare a current data window against a reference")]
struct Cli {
    /// Split-artifact directory of the reference window
    #[arg(long)]
    reference_dir: PathBuf,

    /// Split-artifact directory of the current window
    #[arg(long)]
    current_dir: PathBuf,

    /// Saved model artifact used to attach predictions
    #[arg(long)]
    model: PathBuf,

    /// Where the JSON report is written
    #[arg(long, default_value = "./reports/drift_report.json")]
    output: PathBuf,
}

/// Load a window's x_val/y_val and attach prediction and target columns.
fn load_window(dir: &PathBuf, model: &GbdtRegressor) -> Result<DataFrame> {
    let mut x_val = tables::read_table(dir.join("x_val.csv"))?;
    tables::ensure_date_column(&mut x_val, WEEK_COL)?;
    let y_val = tables::read_table(dir.join("y_val.csv"))?;
    let target_col = y_val.get_column_names()[0].to_string();

    let predictions = model.predict(&x_val)?;
    x_val.with_column(Series::new("prediction", predictions))?;
    let mut target = y_val.column(&target_col)?.clone();
    target.rename("target");
    x_val.with_column(target)?;
    Ok(x_val)
}

fn run(cli: &Cli) -> Result<()> {
    info!("loading model {}", cli.model.display());
    let model = GbdtRegressor::load(&cli.model)?;

    let reference = load_window(&cli.reference_dir, &model)?;
    let current = load_window(&cli.current_dir, &model)?;

    let report = generate_drift_report(&reference, &current)?;
    if report.dataset_drift_detected {
        warn!(
            "dataset drift detected: {:.0}% of {} columns drifted",
            report.share_of_drifted_columns * 100.0,
            report.columns_checked
        );
    } else {
        info!(
            "no dataset drift ({:.0}% of {} columns)",
            report.share_of_drifted_columns * 100.0,
            report.columns_checked
        );
    }

    if let Some(parent) = cli.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&cli.output, serde_json::to_string_pretty(&report)?)?;
    info!("report written to {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("drift_report failed: {err}");
            ExitCode::FAILURE
        }
    }
}
