//! Stage 3: shift the target metric by the forecast horizon and split the
//! feature panel into train/validation artifacts on a calendar date.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;
use log::{error, info};

use forecast_demand::error::Result;
use forecast_demand::schema::{CATEGORY_COL, CITY_COL, WEEK_COL};
use forecast_demand::split;
use forecast_demand::tables;

#[derive(Parser)]
#[command(name = "split_dataset", about = "Add the forecast target and split train/validation")]
struct Cli {
    /// Feature panel
    #[arg(long, default_value = "./data/processed/model_data.csv")]
    input: PathBuf,

    /// Column used as the future target
    #[arg(long, default_value = "sales_amount_sum")]
    target_source: String,

    /// Number of weeks ahead the target represents
    #[arg(long, default_value_t = 1)]
    horizon: u32,

    /// Split date: train ends before it, validation starts a week after it
    #[arg(long, default_value = "2018-05-01")]
    split_date: NaiveDate,

    /// Directory the split artifacts are written to (one subdirectory per
    /// split date)
    #[arg(long, default_value = "./data/processed")]
    output_dir: PathBuf,
}

fn run(cli: &Cli) -> Result<()> {
    info!("reading feature panel");
    let mut panel = tables::read_table(&cli.input)?;
    tables::ensure_date_column(&mut panel, WEEK_COL)?;

    let with_target = split::add_target(
        &panel,
        &cli.target_source,
        cli.horizon,
        &[CATEGORY_COL, CITY_COL],
        WEEK_COL,
    )?;
    let panels = split::split_by_date(&with_target, WEEK_COL, cli.split_date)?;

    let out_dir = cli.output_dir.join(cli.split_date.to_string());
    split::write_split_artifacts(&panels, cli.horizon, &out_dir)?;
    info!("split artifacts written to {}", out_dir.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("split_dataset failed: {err}");
            ExitCode::FAILURE
        }
    }
}
