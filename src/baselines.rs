//! Naive baseline forecasters. Both are pure functions over a
//! `(date, group keys, actual value)` frame and emit rows shaped like the
//! tuned model's forecast output so the three methods can be concatenated and
//! compared per date and segment.

use chrono::Duration;
use polars::prelude::*;

use crate::error::{ForecastError, Result};
use crate::schema;
use crate::tables;

/// Method label carried by latest-value forecast rows.
pub const LATEST_VALUE_METHOD: &str = "latest_value_forecast";
/// Method label carried by moving-average forecast rows.
pub const MOVING_AVERAGE_METHOD: &str = "ma_forecast";
/// Method label carried by the tuned model's forecast rows.
pub const MODEL_METHOD: &str = "forecast";

/// Carry the last observed value of each group forward by `days_ahead` days.
pub fn latest_value_forecast(
    df: &DataFrame,
    key_cols: &[&str],
    value_col: &str,
    date_col: &str,
    days_ahead: i64,
) -> Result<DataFrame> {
    schema::ensure_columns(df, &[date_col, value_col])?;
    schema::ensure_columns(df, key_cols)?;

    let forecast = df.column(value_col)?.cast(&DataType::Float64)?;
    assemble_forecast_rows(df, key_cols, value_col, date_col, days_ahead, forecast, LATEST_VALUE_METHOD)
}

/// Forecast each group with the trailing moving average of its most recent
/// `window` values (lag 0..window-1), shifted forward by `days_ahead` days.
/// Early rows average over whatever lags exist. With `window == 1` this
/// degenerates to the latest-value forecast.
pub fn moving_average_forecast(
    df: &DataFrame,
    key_cols: &[&str],
    value_col: &str,
    date_col: &str,
    days_ahead: i64,
    window: usize,
) -> Result<DataFrame> {
    schema::ensure_columns(df, &[date_col, value_col])?;
    schema::ensure_columns(df, key_cols)?;
    if window == 0 {
        return Err(ForecastError::InvalidParameter(
            "moving average window must be at least 1".to_string(),
        ));
    }

    let keys: Vec<Expr> = key_cols.iter().map(|c| col(c)).collect();
    let lag_names: Vec<String> = (0..window).map(|i| format!("__ma_lag{i}")).collect();
    let lag_exprs: Vec<Expr> = (0..window)
        .map(|i| {
            col(value_col)
                .cast(DataType::Float64)
                .shift(i as i64)
                .over(keys.clone())
                .alias(&lag_names[i])
        })
        .collect();

    let lagged = df
        .clone()
        .lazy()
        .sort(date_col, SortOptions { descending: false, ..Default::default() })
        .with_columns(lag_exprs)
        .collect()?;

    // Row mean over available lags; a fully-null row stays null.
    let mut sums = vec![0.0f64; lagged.height()];
    let mut counts = vec![0usize; lagged.height()];
    for name in &lag_names {
        let ca = lagged.column(name)?.f64()?;
        for (i, v) in ca.into_iter().enumerate() {
            if let Some(v) = v {
                sums[i] += v;
                counts[i] += 1;
            }
        }
    }
    let means: Vec<Option<f64>> = sums
        .iter()
        .zip(&counts)
        .map(|(s, c)| if *c == 0 { None } else { Some(s / *c as f64) })
        .collect();

    let forecast = Series::new("forecast", means);
    assemble_forecast_rows(
        &lagged.drop_many(&lag_names),
        key_cols,
        value_col,
        date_col,
        days_ahead,
        forecast,
        MOVING_AVERAGE_METHOD,
    )
}

/// Shape a frame of per-row forecasts into the shared comparison layout:
/// `(date + days_ahead, keys.., value_col, forecast, method)`.
pub fn assemble_forecast_rows(
    df: &DataFrame,
    key_cols: &[&str],
    value_col: &str,
    date_col: &str,
    days_ahead: i64,
    forecast: Series,
    method: &str,
) -> Result<DataFrame> {
    if forecast.len() != df.height() {
        return Err(ForecastError::Alignment(format!(
            "{} forecast values for {} rows",
            forecast.len(),
            df.height()
        )));
    }

    let shifted = tables::date_values(df, date_col)?
        .into_iter()
        .map(|opt| opt.map(|d| d + Duration::days(days_ahead)));
    let shifted = DateChunked::from_naive_date_options(date_col, shifted).into_series();

    let mut columns = vec![shifted];
    for key in key_cols {
        columns.push(df.column(key)?.clone());
    }
    columns.push(df.column(value_col)?.clone());
    let mut forecast = forecast.cast(&DataType::Float64)?;
    forecast.rename("forecast");
    columns.push(forecast);
    columns.push(Series::new("method", vec![method; df.height()]));

    Ok(DataFrame::new(columns)?)
}
