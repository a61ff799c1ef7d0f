//! Design-matrix construction from a DataFrame: numeric columns become f64
//! with nulls as NaN, string columns are ordinal-encoded against a dictionary
//! learned from the training frame.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Column-major feature matrix.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub feature_names: Vec<String>,
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

impl DesignMatrix {
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn value(&self, row: usize, feature: usize) -> f64 {
        self.columns[feature][row]
    }

    pub fn column(&self, feature: usize) -> &[f64] {
        &self.columns[feature]
    }

    /// Reorder features to a reference layout, failing when one is missing.
    pub fn align_to(self, names: &[String]) -> Result<DesignMatrix> {
        if self.feature_names == names {
            return Ok(self);
        }
        let mut by_name: BTreeMap<String, Vec<f64>> = self
            .feature_names
            .into_iter()
            .zip(self.columns)
            .collect();
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let column = by_name.remove(name).ok_or_else(|| {
                ForecastError::Schema(format!("prediction frame lacks feature '{name}'"))
            })?;
            columns.push(column);
        }
        Ok(DesignMatrix { feature_names: names.to_vec(), columns, n_rows: self.n_rows })
    }
}

/// Names of string-typed columns, treated as categorical features.
pub fn categorical_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|s| s.dtype() == &DataType::Utf8)
        .map(|s| s.name().to_string())
        .collect()
}

/// Per-column ordinal dictionaries for categorical features. Levels unseen at
/// fit time encode as NaN, which the trees treat as a missing value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    levels: BTreeMap<String, BTreeMap<String, f64>>,
}

impl CategoricalEncoder {
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let mut levels = BTreeMap::new();
        for name in columns {
            let ca = df.column(name)?.utf8()?;
            let mut seen: Vec<&str> = ca.into_iter().flatten().collect();
            seen.sort_unstable();
            seen.dedup();
            let map: BTreeMap<String, f64> = seen
                .into_iter()
                .enumerate()
                .map(|(code, level)| (level.to_string(), code as f64))
                .collect();
            levels.insert(name.clone(), map);
        }
        Ok(CategoricalEncoder { levels })
    }

    fn encode(&self, name: &str, ca: &Utf8Chunked) -> Vec<f64> {
        let map = self.levels.get(name);
        ca.into_iter()
            .map(|opt| {
                opt.and_then(|level| map.and_then(|m| m.get(level)))
                    .copied()
                    .unwrap_or(f64::NAN)
            })
            .collect()
    }
}

/// Build the matrix from a frame. Temporal columns are skipped (they identify
/// rows, they are not features); strings go through the encoder; everything
/// else is cast to f64 with nulls as NaN.
pub fn build_matrix(df: &DataFrame, encoder: &CategoricalEncoder) -> Result<DesignMatrix> {
    let mut feature_names = Vec::new();
    let mut columns = Vec::new();
    for series in df.get_columns() {
        match series.dtype() {
            DataType::Date | DataType::Datetime(_, _) | DataType::Time => continue,
            DataType::Utf8 => {
                feature_names.push(series.name().to_string());
                columns.push(encoder.encode(series.name(), series.utf8()?));
            }
            _ => {
                let cast = series.cast(&DataType::Float64)?;
                feature_names.push(series.name().to_string());
                columns.push(
                    cast.f64()?
                        .into_iter()
                        .map(|v| v.unwrap_or(f64::NAN))
                        .collect(),
                );
            }
        }
    }
    if feature_names.is_empty() {
        return Err(ForecastError::Schema(
            "no usable feature columns in frame".to_string(),
        ));
    }
    Ok(DesignMatrix { feature_names, columns, n_rows: df.height() })
}
