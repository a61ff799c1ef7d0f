//! Drift reporting between a reference and a current data window.
//!
//! Both frames must share a schema (including `prediction` and `target`
//! columns when used for regression monitoring). Each shared numeric column
//! gets a Welch two-sample t-test on its mean; the dataset drifts when at
//! least half of the columns do.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{ForecastError, Result};
use crate::tables;

const DRIFT_P_VALUE: f64 = 0.05;
const DATASET_DRIFT_SHARE: f64 = 0.5;

/// Structured result of a drift check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    pub dataset_drift_detected: bool,
    pub share_of_drifted_columns: f64,
    pub drifted_columns: Vec<String>,
    pub columns_checked: usize,
}

/// Compare every shared numeric column of `reference` and `current`.
pub fn generate_drift_report(reference: &DataFrame, current: &DataFrame) -> Result<DriftReport> {
    let columns = numeric_columns(reference);
    let shared: Vec<String> = columns
        .into_iter()
        .filter(|c| {
            current
                .column(c)
                .map(|s| s.dtype().is_numeric())
                .unwrap_or(false)
        })
        .collect();
    if shared.is_empty() {
        return Err(ForecastError::Schema(
            "reference and current frames share no numeric columns".to_string(),
        ));
    }

    let mut drifted = Vec::new();
    for name in &shared {
        let a = finite(tables::float_values(reference, name)?);
        let b = finite(tables::float_values(current, name)?);
        if welch_p_value(&a, &b) < DRIFT_P_VALUE {
            drifted.push(name.clone());
        }
    }

    let share = drifted.len() as f64 / shared.len() as f64;
    Ok(DriftReport {
        dataset_drift_detected: share >= DATASET_DRIFT_SHARE,
        share_of_drifted_columns: share,
        drifted_columns: drifted,
        columns_checked: shared.len(),
    })
}

fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|s| s.dtype().is_numeric())
        .map(|s| s.name().to_string())
        .collect()
}

fn finite(values: Vec<f64>) -> Vec<f64> {
    values.into_iter().filter(|v| v.is_finite()).collect()
}

/// Two-sided p-value of Welch's t-test. Degenerate inputs (too few rows, zero
/// variance on both sides) are treated as "no evidence of drift".
fn welch_p_value(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 || b.len() < 2 {
        return 1.0;
    }
    let (ma, va) = mean_var(a);
    let (mb, vb) = mean_var(b);
    let sa = va / a.len() as f64;
    let sb = vb / b.len() as f64;
    let denom = (sa + sb).sqrt();
    if denom == 0.0 {
        return 1.0;
    }
    let t = (ma - mb) / denom;
    let dof = (sa + sb) * (sa + sb)
        / (sa * sa / (a.len() as f64 - 1.0) + sb * sb / (b.len() as f64 - 1.0));
    if !dof.is_finite() || dof <= 0.0 {
        return 1.0;
    }
    match StudentsT::new(0.0, 1.0, dof) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
        Err(_) => 1.0,
    }
}

fn mean_var(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    (mean, var)
}
