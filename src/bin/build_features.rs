//! Stage 2: join the national rollup onto the segment panel and add the
//! per-segment trend features.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use forecast_demand::error::Result;
use forecast_demand::features::{add_trend_features, join_national};
use forecast_demand::schema::{default_feature_columns, CATEGORY_COL, CITY_COL, WEEK_COL};
use forecast_demand::tables;

#[derive(Parser)]
#[command(name = "build_features", about = "Derive trend features on the weekly panel")]
struct Cli {
    /// Weekly segment panel
    #[arg(long, default_value = "./data/processed/orders_by_week.csv")]
    input: PathBuf,

    /// Weekly national rollup
    #[arg(long, default_value = "./data/processed/national_orders_by_week.csv")]
    national: PathBuf,

    /// Output feature panel
    #[arg(long, default_value = "./data/processed/model_data.csv")]
    output: PathBuf,
}

fn run(cli: &Cli) -> Result<()> {
    info!("reading panels");
    let mut panel = tables::read_table(&cli.input)?;
    let mut national = tables::read_table(&cli.national)?;
    tables::ensure_date_column(&mut panel, WEEK_COL)?;
    tables::ensure_date_column(&mut national, WEEK_COL)?;

    info!("adding trend features");
    let joined = join_national(&panel, &national)?;
    let mut features = add_trend_features(
        &joined,
        &default_feature_columns(),
        &[CATEGORY_COL, CITY_COL],
        WEEK_COL,
    )?;

    tables::write_table(&mut features, &cli.output)?;
    info!("feature panel written to {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("build_features failed: {err}");
            ExitCode::FAILURE
        }
    }
}
