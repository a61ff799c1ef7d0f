//! Forecast error metrics, in aggregate and per segment.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema;
use crate::tables;

/// Aggregate error metrics for one set of forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub rmse: f64,
    pub mape: f64,
}

/// Root mean squared error. NaN when the slices are empty.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum::<f64>()
        / actual.len() as f64;
    mse.sqrt()
}

/// Mean absolute percentage error, in percent. A zero actual value makes the
/// term non-finite and propagates; callers mask if they need to.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| ((a - p) / a).abs())
        .sum::<f64>()
        / actual.len() as f64
        * 100.0
}

/// Both metrics over paired slices.
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> ForecastMetrics {
    ForecastMetrics { rmse: rmse(actual, predicted), mape: mape(actual, predicted) }
}

/// Recompute both metrics for every distinct value of `segment_col` in
/// `frame`, masking rows to that value. A segment with no rows yields NaN
/// metrics rather than failing.
pub fn evaluate_by_segment(
    frame: &DataFrame,
    segment_col: &str,
    actual_col: &str,
    predicted_col: &str,
) -> Result<BTreeMap<String, ForecastMetrics>> {
    schema::ensure_columns(frame, &[segment_col, actual_col, predicted_col])?;

    let segments = frame.column(segment_col)?.utf8()?;
    let actual = tables::float_values(frame, actual_col)?;
    let predicted = tables::float_values(frame, predicted_col)?;

    let mut grouped: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for (i, seg) in segments.into_iter().enumerate() {
        let Some(seg) = seg else { continue };
        let entry = grouped.entry(seg.to_string()).or_default();
        entry.0.push(actual[i]);
        entry.1.push(predicted[i]);
    }

    Ok(grouped
        .into_iter()
        .map(|(seg, (a, p))| (seg, evaluate(&a, &p)))
        .collect())
}
