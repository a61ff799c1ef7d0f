//! Hyperparameter search: a sequential black-box loop over the boosted
//! regressor, with aggregate and per-segment validation metrics per trial and
//! the baseline comparison table recorded alongside each run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::baselines::{
    assemble_forecast_rows, latest_value_forecast, moving_average_forecast, MODEL_METHOD,
};
use crate::error::{ForecastError, Result};
use crate::metrics::{self, ForecastMetrics};
use crate::model::{GbdtParams, GbdtRegressor};
use crate::schema::{self, CATEGORY_COL, CITY_COL, WEEK_COL};
use crate::tables;
use crate::tracking::ExperimentTracker;

/// Inclusive hyperparameter ranges explored by the search.
#[derive(Debug, Clone)]
pub struct SearchSpace {
    pub depth: (usize, usize),
    pub iterations: (usize, usize),
    pub min_data_in_leaf: (usize, usize),
    pub random_state: u64,
}

impl Default for SearchSpace {
    fn default() -> Self {
        SearchSpace {
            depth: (1, 20),
            iterations: (10, 50),
            min_data_in_leaf: (1, 4),
            random_state: 42,
        }
    }
}

/// Chooses the next configuration to evaluate. The loop hands over the full
/// trial history so implementations may model it; the provided
/// [`RandomSuggester`] ignores it and samples uniformly.
pub trait Suggester {
    fn suggest(&mut self, space: &SearchSpace, history: &[TrialResult]) -> GbdtParams;
}

/// Seeded uniform sampling over the search space.
#[derive(Debug)]
pub struct RandomSuggester {
    rng: StdRng,
}

impl RandomSuggester {
    pub fn new(seed: u64) -> Self {
        RandomSuggester { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Suggester for RandomSuggester {
    fn suggest(&mut self, space: &SearchSpace, _history: &[TrialResult]) -> GbdtParams {
        GbdtParams {
            depth: self.rng.gen_range(space.depth.0..=space.depth.1),
            iterations: self.rng.gen_range(space.iterations.0..=space.iterations.1),
            min_data_in_leaf: self
                .rng
                .gen_range(space.min_data_in_leaf.0..=space.min_data_in_leaf.1),
            random_state: space.random_state,
            ..GbdtParams::default()
        }
    }
}

/// Outcome of one trial. Failed trials keep their parameters and run id but
/// carry no metrics.
#[derive(Debug, Clone)]
pub struct TrialResult {
    pub run_id: String,
    pub params: GbdtParams,
    pub metrics: Option<ForecastMetrics>,
    pub segment_metrics: BTreeMap<String, ForecastMetrics>,
    pub failed: bool,
}

impl TrialResult {
    /// Scalar loss reported to the optimizer (aggregate RMSE).
    pub fn loss(&self) -> f64 {
        self.metrics.map_or(f64::INFINITY, |m| m.rmse)
    }
}

/// The four split artifacts plus the validation dates carried for row-identity
/// alignment of predictions.
#[derive(Debug)]
pub struct TuningData {
    pub x_train: DataFrame,
    pub y_train: Vec<f64>,
    pub x_val: DataFrame,
    pub y_val: Vec<f64>,
}

impl TuningData {
    /// Load `x_train/y_train/x_val/y_val` from a split-artifact directory.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut x_train = tables::read_table(dir.join("x_train.csv"))?;
        let y_train = tables::read_table(dir.join("y_train.csv"))?;
        let mut x_val = tables::read_table(dir.join("x_val.csv"))?;
        let y_val = tables::read_table(dir.join("y_val.csv"))?;

        tables::ensure_date_column(&mut x_train, WEEK_COL)?;
        tables::ensure_date_column(&mut x_val, WEEK_COL)?;
        let y_train = single_column(&y_train)?;
        let y_val = single_column(&y_val)?;

        if x_train.height() != y_train.len() || x_val.height() != y_val.len() {
            return Err(ForecastError::Alignment(format!(
                "x/y row counts disagree: train {}/{}, validation {}/{}",
                x_train.height(),
                y_train.len(),
                x_val.height(),
                y_val.len()
            )));
        }
        Ok(TuningData { x_train, y_train, x_val, y_val })
    }
}

fn single_column(df: &DataFrame) -> Result<Vec<f64>> {
    let name = df
        .get_column_names()
        .first()
        .map(|s| s.to_string())
        .ok_or_else(|| ForecastError::Schema("target file has no columns".to_string()))?;
    tables::float_values(df, &name)
}

/// Fixed wiring of one search: budget, segmentation and baseline settings.
#[derive(Debug, Clone)]
pub struct TuningConfig {
    pub num_trials: usize,
    /// Column whose distinct values get their own metric pair per trial.
    pub segment_col: String,
    /// Group keys identifying one series for the baseline forecasters.
    pub key_cols: Vec<String>,
    pub days_to_predict: i64,
    pub ma_window: usize,
    /// Where per-run model and comparison artifacts are written.
    pub artifact_dir: PathBuf,
}

impl TuningConfig {
    pub fn new(num_trials: usize, artifact_dir: PathBuf) -> Self {
        TuningConfig {
            num_trials,
            segment_col: CATEGORY_COL.to_string(),
            key_cols: vec![CATEGORY_COL.to_string(), CITY_COL.to_string()],
            days_to_predict: 7,
            ma_window: 3,
            artifact_dir,
        }
    }
}

/// Run the sequential search: suggest, train, evaluate, record — one trial at
/// a time, each one reported to the tracker. A failing trial is recorded as
/// failed and does not abort the remaining budget.
pub fn run_search(
    data: &TuningData,
    space: &SearchSpace,
    suggester: &mut dyn Suggester,
    tracker: &mut dyn ExperimentTracker,
    config: &TuningConfig,
) -> Result<Vec<TrialResult>> {
    let mut history: Vec<TrialResult> = Vec::new();
    for trial in 0..config.num_trials {
        let params = suggester.suggest(space, &history);
        let run_id = tracker.start_run(&format!("gbdt_tuning_{trial}"))?;
        tracker.log_params(&run_id, &params.as_map())?;
        info!(
            "trial {trial}: depth={} iterations={} min_data_in_leaf={}",
            params.depth, params.iterations, params.min_data_in_leaf
        );

        let result = match run_trial(data, &params, &run_id, tracker, config) {
            Ok((metrics, segment_metrics)) => TrialResult {
                run_id: run_id.clone(),
                params,
                metrics: Some(metrics),
                segment_metrics,
                failed: false,
            },
            Err(err) => {
                warn!("trial {trial} failed: {err}");
                tracker.log_metrics(&run_id, &BTreeMap::from([("failed".to_string(), 1.0)]))?;
                TrialResult {
                    run_id: run_id.clone(),
                    params,
                    metrics: None,
                    segment_metrics: BTreeMap::new(),
                    failed: true,
                }
            }
        };
        tracker.end_run(&run_id)?;
        info!("trial {trial}: loss {}", result.loss());
        history.push(result);
    }
    Ok(history)
}

type TrialMetrics = (ForecastMetrics, BTreeMap<String, ForecastMetrics>);

fn run_trial(
    data: &TuningData,
    params: &GbdtParams,
    run_id: &str,
    tracker: &mut dyn ExperimentTracker,
    config: &TuningConfig,
) -> Result<TrialMetrics> {
    let model = GbdtRegressor::fit(&data.x_train, &data.y_train, params)?;

    let model_path = config.artifact_dir.join(format!("run_{run_id}_model.json"));
    model.save(&model_path)?;
    tracker.log_artifact(run_id, &model_path)?;

    let predictions: Vec<f64> = model
        .predict(&data.x_val)?
        .into_iter()
        .map(|p| p.round())
        .collect();
    if predictions.len() != data.y_val.len() {
        return Err(ForecastError::Alignment(format!(
            "{} predictions for {} validation targets",
            predictions.len(),
            data.y_val.len()
        )));
    }

    // Assemble an evaluation frame carrying row identity, then drop the rows
    // with a null target. Alignment is structural: actuals and forecasts sit
    // in the same row, so nothing is truncated positionally.
    let eval = {
        let mut columns = vec![data.x_val.column(WEEK_COL)?.clone()];
        for key in &config.key_cols {
            columns.push(data.x_val.column(key)?.clone());
        }
        columns.push(Series::new("actual_value", data.y_val.clone()));
        columns.push(Series::new("forecast", predictions));
        DataFrame::new(columns)?
    };
    let kept: BooleanChunked = data
        .y_val
        .iter()
        .map(|v| Some(v.is_finite()))
        .collect();
    let eval = eval.filter(&kept)?;

    let actual = tables::float_values(&eval, "actual_value")?;
    let forecast = tables::float_values(&eval, "forecast")?;
    let aggregate = metrics::evaluate(&actual, &forecast);

    // Per-segment metrics over every value observed in validation, including
    // those whose rows all lost their target (NaN metrics, skipped when
    // logging).
    let mut segment_metrics =
        metrics::evaluate_by_segment(&eval, &config.segment_col, "actual_value", "forecast")?;
    for segment in distinct_values(&data.x_val, &config.segment_col)? {
        segment_metrics.entry(segment.clone()).or_insert_with(|| {
            warn!("segment '{segment}' has no validation rows with a target");
            ForecastMetrics { rmse: f64::NAN, mape: f64::NAN }
        });
    }

    let mut logged = BTreeMap::from([
        ("rmse".to_string(), aggregate.rmse),
        ("mape".to_string(), aggregate.mape),
    ]);
    for (segment, m) in &segment_metrics {
        logged.insert(format!("rmse_{segment}"), m.rmse);
        logged.insert(format!("mape_{segment}"), m.mape);
    }
    logged.retain(|_, v| v.is_finite());
    tracker.log_metrics(run_id, &logged)?;

    let comparison_path = config.artifact_dir.join(format!("run_{run_id}_comparison.csv"));
    let mut comparison = comparison_table(&eval, config)?;
    tables::write_table(&mut comparison, &comparison_path)?;
    tracker.log_artifact(run_id, &comparison_path)?;

    Ok((aggregate, segment_metrics))
}

/// Forecast rows of the two baselines and the tuned model over the same
/// validation rows, concatenated for per-date, per-segment comparison.
fn comparison_table(eval: &DataFrame, config: &TuningConfig) -> Result<DataFrame> {
    let keys: Vec<&str> = config.key_cols.iter().map(|s| s.as_str()).collect();
    let model_rows = assemble_forecast_rows(
        eval,
        &keys,
        "actual_value",
        WEEK_COL,
        config.days_to_predict,
        eval.column("forecast")?.clone(),
        MODEL_METHOD,
    )?;
    let latest = latest_value_forecast(
        eval,
        &keys,
        "actual_value",
        WEEK_COL,
        config.days_to_predict,
    )?;
    let ma = moving_average_forecast(
        eval,
        &keys,
        "actual_value",
        WEEK_COL,
        config.days_to_predict,
        config.ma_window,
    )?;

    let mut table = latest;
    table.vstack_mut(&ma)?;
    table.vstack_mut(&model_rows)?;
    Ok(table)
}

fn distinct_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    schema::ensure_columns(df, &[column])?;
    let ca = df.column(column)?.utf8()?;
    let mut values: Vec<String> = ca.into_iter().flatten().map(|s| s.to_string()).collect();
    values.sort_unstable();
    values.dedup();
    Ok(values)
}
