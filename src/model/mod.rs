//! Gradient-boosted regression on the split artifacts.
//!
//! Squared-loss boosting over depth-limited regression trees: a mean base
//! score plus `iterations` shrunken trees fitted to residuals. Categorical
//! columns are auto-detected from the frame's schema and ordinal-encoded;
//! missing values flow through both encoding and tree traversal without
//! imputation.

pub mod dataset;
mod tree;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use dataset::{build_matrix, categorical_columns, CategoricalEncoder, DesignMatrix};
use tree::{RegressionTree, TreeConfig};

/// Hyperparameters of the boosted regressor. `depth`, `iterations` and
/// `min_data_in_leaf` span the tuning search space; the learning rate is
/// fixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbdtParams {
    pub depth: usize,
    pub iterations: usize,
    pub min_data_in_leaf: usize,
    pub learning_rate: f64,
    pub random_state: u64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        GbdtParams {
            depth: 6,
            iterations: 30,
            min_data_in_leaf: 1,
            learning_rate: 0.1,
            random_state: 42,
        }
    }
}

impl GbdtParams {
    /// String map shape consumed by the experiment tracker.
    pub fn as_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("depth".to_string(), self.depth.to_string()),
            ("iterations".to_string(), self.iterations.to_string()),
            ("min_data_in_leaf".to_string(), self.min_data_in_leaf.to_string()),
            ("learning_rate".to_string(), self.learning_rate.to_string()),
            ("random_state".to_string(), self.random_state.to_string()),
        ])
    }
}

/// A fitted gradient-boosted regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtRegressor {
    params: GbdtParams,
    base_score: f64,
    trees: Vec<RegressionTree>,
    encoder: CategoricalEncoder,
    feature_names: Vec<String>,
}

impl GbdtRegressor {
    /// Train on a feature frame and a target slice of the same length.
    /// Rows whose target is null/NaN are dropped here, at fit time.
    pub fn fit(x: &DataFrame, y: &[f64], params: &GbdtParams) -> Result<GbdtRegressor> {
        if x.height() != y.len() {
            return Err(ForecastError::Alignment(format!(
                "{} feature rows but {} targets",
                x.height(),
                y.len()
            )));
        }
        if params.iterations == 0 || params.depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "iterations and depth must be positive".to_string(),
            ));
        }

        let cat_cols = categorical_columns(x);
        let encoder = CategoricalEncoder::fit(x, &cat_cols)?;
        let matrix = build_matrix(x, &encoder)?;

        let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i].is_finite()).collect();
        if rows.is_empty() {
            return Err(ForecastError::DataSparsity(
                "no rows with a finite target to train on".to_string(),
            ));
        }

        let base_score = rows.iter().map(|&i| y[i]).sum::<f64>() / rows.len() as f64;
        let mut predictions = vec![base_score; y.len()];
        let mut residuals = vec![0.0; y.len()];
        let config = TreeConfig {
            max_depth: params.depth,
            min_data_in_leaf: params.min_data_in_leaf.max(1),
        };
        let mut rng = StdRng::seed_from_u64(params.random_state);

        let mut trees = Vec::with_capacity(params.iterations);
        for _ in 0..params.iterations {
            for &i in &rows {
                residuals[i] = y[i] - predictions[i];
            }
            let tree = RegressionTree::fit(&matrix, &residuals, &rows, &config, &mut rng);
            for &i in &rows {
                predictions[i] += params.learning_rate * tree.predict_row(&matrix, i);
            }
            trees.push(tree);
        }

        Ok(GbdtRegressor {
            params: *params,
            base_score,
            trees,
            encoder,
            feature_names: matrix.feature_names,
        })
    }

    /// Score every row of a feature frame.
    pub fn predict(&self, x: &DataFrame) -> Result<Vec<f64>> {
        let matrix = build_matrix(x, &self.encoder)?.align_to(&self.feature_names)?;
        let mut scores = vec![self.base_score; matrix.n_rows()];
        for tree in &self.trees {
            for (row, score) in scores.iter_mut().enumerate() {
                *score += self.params.learning_rate * tree.predict_row(&matrix, row);
            }
        }
        Ok(scores)
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    /// Persist the model as JSON (the tracker's model artifact format).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<GbdtRegressor> {
        let file = File::open(path)?;
        let model = serde_json::from_reader(BufReader::new(file))?;
        Ok(model)
    }
}

// Re-exported for matrix construction in scoring utilities.
pub use dataset::categorical_columns as detect_categorical_columns;
