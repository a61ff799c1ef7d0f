//! # Forecast Demand
//!
//! A Rust library for turning raw per-order e-commerce transactions into
//! weekly per-(category, city) demand panels and tuning a gradient-boosted
//! forecaster against naive baselines.
//!
//! ## Pipeline
//!
//! 1. **Calendar aggregation** ([`prepare`]): join the raw order tables,
//!    derive calendar/holiday/approval flags, and aggregate to a weekly panel
//!    (plus a national per-category rollup).
//! 2. **Gap filling** ([`gapfill`]): densify the panel so every segment has
//!    one row per week of the observed range, zero-filling flow metrics.
//! 3. **Trend features** ([`features`]): per-segment lags and expanding
//!    historical mean/diff columns.
//! 4. **Target & split** ([`split`]): shift the forecast metric by the
//!    horizon and split train/validation on a calendar date with a one-week
//!    buffer.
//! 5. **Tuning** ([`tuning`]): a sequential black-box search over the boosted
//!    regressor ([`model`]), scoring each trial in aggregate and per segment
//!    ([`metrics`]) against two naive baselines ([`baselines`]), with every
//!    trial recorded through the experiment tracker ([`tracking`]).
//!
//! Drift between two validation windows is checked by [`report`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forecast_demand::gapfill::{fill_date_gaps, Granularity};
//! use forecast_demand::features::add_trend_features;
//! use forecast_demand::schema::{default_feature_columns, SEGMENT_KEY_COLS, WEEK_COL};
//! use forecast_demand::tables::read_table;
//!
//! # fn main() -> forecast_demand::error::Result<()> {
//! let panel = read_table("orders_by_week.csv")?;
//! let keys: Vec<&str> = SEGMENT_KEY_COLS.to_vec();
//! let dense = fill_date_gaps(&panel, WEEK_COL, &keys, Granularity::Weekly)?;
//! let _features = add_trend_features(&dense, &default_feature_columns(), &keys, WEEK_COL)?;
//! # Ok(())
//! # }
//! ```

pub mod baselines;
pub mod error;
pub mod features;
pub mod gapfill;
pub mod holidays;
pub mod metrics;
pub mod model;
pub mod prepare;
pub mod report;
pub mod schema;
pub mod split;
pub mod tables;
pub mod tracking;
pub mod tuning;

// Re-export commonly used types
pub use crate::error::ForecastError;
pub use crate::metrics::ForecastMetrics;
pub use crate::model::{GbdtParams, GbdtRegressor};
pub use crate::tracking::{ExperimentTracker, FileExperimentTracker};
pub use crate::tuning::{RandomSuggester, SearchSpace, TrialResult, TuningConfig, TuningData};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
