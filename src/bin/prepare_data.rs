//! Stage 1: join the raw order tables, derive flags, and write the weekly
//! segment panel and the national per-category rollup.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;
use log::{error, info};

use forecast_demand::error::Result;
use forecast_demand::gapfill::{fill_date_gaps, Granularity};
use forecast_demand::holidays::BrazilHolidays;
use forecast_demand::prepare;
use forecast_demand::schema::{CATEGORY_COL, SEGMENT_KEY_COLS, WEEK_COL};
use forecast_demand::tables;

#[derive(Parser)]
#[command(name = "prepare_data", about = "Build the weekly demand panels from raw order tables")]
struct Cli {
    /// Directory holding the raw Olist-style CSVs
    #[arg(long, default_value = "./data/raw")]
    raw_dir: PathBuf,

    /// Directory the processed panels are written to
    #[arg(long, default_value = "./data/processed")]
    output_dir: PathBuf,

    /// First purchase month kept (inclusive)
    #[arg(long, default_value = "2017-01-01")]
    from_month: NaiveDate,

    /// Last purchase month kept (inclusive)
    #[arg(long, default_value = "2018-08-01")]
    to_month: NaiveDate,

    /// Product categories kept in the segment panel
    #[arg(long, value_delimiter = ',', default_values_t = default_categories())]
    categories: Vec<String>,

    /// Customer cities kept in the segment panel
    #[arg(long, value_delimiter = ',', default_values_t = vec!["sao paulo".to_string()])]
    cities: Vec<String>,
}

fn default_categories() -> Vec<String> {
    [
        "cama_mesa_banho",
        "beleza_saude",
        "esporte_lazer",
        "informatica_acessorios",
        "moveis_decoracao",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn run(cli: &Cli) -> Result<()> {
    info!("reading raw tables from {}", cli.raw_dir.display());
    let raw = prepare::RawTables::load(&cli.raw_dir)?;
    let items = prepare::summarize_order_items(&raw.order_items)?;

    info!("joining order lines");
    let joined = prepare::join_order_lines(&raw, &items)?;
    let joined = prepare::add_date_columns(&joined)?;
    let joined = prepare::filter_window(&joined, cli.from_month, cli.to_month)?;

    info!("deriving flags");
    let joined = prepare::add_approved_flag(&joined)?;
    let joined = prepare::add_holiday_flag(&joined, &BrazilHolidays)?;
    let joined = prepare::add_new_client_flag(
        &joined,
        &["customer_id", CATEGORY_COL, "customer_state", "customer_city"],
    )?;

    info!("aggregating weekly");
    let mut national = prepare::aggregate_weekly(&joined, &[WEEK_COL, CATEGORY_COL])?;

    let selected = prepare::filter_segments(&joined, &cli.categories, &cli.cities)?;
    let mut segment_keys = vec![WEEK_COL];
    segment_keys.extend(SEGMENT_KEY_COLS);
    let panel = prepare::aggregate_weekly(&selected, &segment_keys)?;
    let mut panel = fill_date_gaps(&panel, WEEK_COL, &SEGMENT_KEY_COLS, Granularity::Weekly)?;

    tables::write_table(&mut national, cli.output_dir.join("national_orders_by_week.csv"))?;
    tables::write_table(&mut panel, cli.output_dir.join("orders_by_week.csv"))?;
    info!("panels written to {}", cli.output_dir.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("prepare_data failed: {err}");
            ExitCode::FAILURE
        }
    }
}
