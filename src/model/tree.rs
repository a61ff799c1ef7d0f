//! Depth-limited regression trees used as boosting weak learners.
//!
//! Splits minimize squared error. Missing feature values (NaN) always follow
//! the left branch, so rows with absent lags or unseen categorical levels are
//! still scored.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::dataset::DesignMatrix;

/// Candidate thresholds per feature are capped at this count; beyond it they
/// are subsampled with the seeded RNG.
const MAX_THRESHOLD_CANDIDATES: usize = 64;

const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeConfig {
    pub max_depth: usize,
    pub min_data_in_leaf: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// A fitted regression tree, stored as a flat node arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn fit(
        matrix: &DesignMatrix,
        targets: &[f64],
        rows: &[usize],
        config: &TreeConfig,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        tree.build(matrix, targets, rows, config, rng, 0);
        tree
    }

    fn build(
        &mut self,
        matrix: &DesignMatrix,
        targets: &[f64],
        rows: &[usize],
        config: &TreeConfig,
        rng: &mut StdRng,
        depth: usize,
    ) -> usize {
        let mean = mean(targets, rows);
        if depth >= config.max_depth || rows.len() < 2 * config.min_data_in_leaf.max(1) {
            return self.push(Node::Leaf { value: mean });
        }

        let Some(split) = best_split(matrix, targets, rows, config, rng) else {
            return self.push(Node::Leaf { value: mean });
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| goes_left(matrix.value(r, split.feature), split.threshold));

        let index = self.push(Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: 0,
            right: 0,
        });
        let left = self.build(matrix, targets, &left_rows, config, rng, depth + 1);
        let right = self.build(matrix, targets, &right_rows, config, rng, depth + 1);
        if let Node::Split { left: l, right: r, .. } = &mut self.nodes[index] {
            *l = left;
            *r = right;
        }
        index
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn predict_row(&self, matrix: &DesignMatrix, row: usize) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    index = if goes_left(matrix.value(row, *feature), *threshold) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[inline]
fn goes_left(value: f64, threshold: f64) -> bool {
    value.is_nan() || value <= threshold
}

fn mean(targets: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&r| targets[r]).sum::<f64>() / rows.len() as f64
}

struct Split {
    feature: usize,
    threshold: f64,
}

fn best_split(
    matrix: &DesignMatrix,
    targets: &[f64],
    rows: &[usize],
    config: &TreeConfig,
    rng: &mut StdRng,
) -> Option<Split> {
    let total_sum: f64 = rows.iter().map(|&r| targets[r]).sum();
    let total_sq: f64 = rows.iter().map(|&r| targets[r] * targets[r]).sum();
    let n = rows.len() as f64;
    let parent_sse = total_sq - total_sum * total_sum / n;

    let mut best: Option<(f64, Split)> = None;
    for feature in 0..matrix.n_features() {
        let mut values: Vec<f64> = rows
            .iter()
            .map(|&r| matrix.value(r, feature))
            .filter(|v| v.is_finite())
            .collect();
        values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
        values.dedup();
        if values.len() < 2 {
            continue;
        }
        // Splitting at the maximum sends every row left.
        values.pop();
        let candidates: Vec<f64> = if values.len() > MAX_THRESHOLD_CANDIDATES {
            values
                .choose_multiple(rng, MAX_THRESHOLD_CANDIDATES)
                .copied()
                .collect()
        } else {
            values
        };

        for threshold in candidates {
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            let mut left_n = 0usize;
            for &r in rows {
                if goes_left(matrix.value(r, feature), threshold) {
                    let t = targets[r];
                    left_sum += t;
                    left_sq += t * t;
                    left_n += 1;
                }
            }
            let right_n = rows.len() - left_n;
            if left_n < config.min_data_in_leaf || right_n < config.min_data_in_leaf {
                continue;
            }
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let left_sse = left_sq - left_sum * left_sum / left_n as f64;
            let right_sse = right_sq - right_sum * right_sum / right_n as f64;
            let gain = parent_sse - left_sse - right_sse;
            if gain > MIN_GAIN && best.as_ref().map_or(true, |(g, _)| gain > *g) {
                best = Some((gain, Split { feature, threshold }));
            }
        }
    }
    best.map(|(_, split)| split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dataset::{build_matrix, CategoricalEncoder};
    use polars::prelude::*;
    use rand::SeedableRng;

    fn matrix(df: DataFrame) -> DesignMatrix {
        build_matrix(&df, &CategoricalEncoder::default()).unwrap()
    }

    #[test]
    fn splits_a_step_function_exactly() {
        let m = matrix(df!("x" => [1.0f64, 2.0, 3.0, 10.0, 11.0, 12.0]).unwrap());
        let y = [5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        let rows: Vec<usize> = (0..6).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let tree = RegressionTree::fit(
            &m,
            &y,
            &rows,
            &TreeConfig { max_depth: 2, min_data_in_leaf: 1 },
            &mut rng,
        );
        assert_eq!(tree.predict_row(&m, 0), 5.0);
        assert_eq!(tree.predict_row(&m, 5), 20.0);
    }

    #[test]
    fn nan_rows_follow_the_left_branch() {
        let m = matrix(df!("x" => [Some(1.0f64), Some(2.0), None, Some(10.0), Some(11.0)]).unwrap());
        let y = [5.0, 5.0, 5.0, 20.0, 20.0];
        let rows: Vec<usize> = (0..5).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let tree = RegressionTree::fit(
            &m,
            &y,
            &rows,
            &TreeConfig { max_depth: 2, min_data_in_leaf: 1 },
            &mut rng,
        );
        // The null row carries a low target and lands with the low leaf.
        assert_eq!(tree.predict_row(&m, 2), 5.0);
    }

    #[test]
    fn pure_targets_make_a_single_leaf() {
        let m = matrix(df!("x" => [1.0f64, 2.0, 3.0]).unwrap());
        let y = [7.0, 7.0, 7.0];
        let rows: Vec<usize> = (0..3).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let tree = RegressionTree::fit(
            &m,
            &y,
            &rows,
            &TreeConfig { max_depth: 4, min_data_in_leaf: 1 },
            &mut rng,
        );
        assert_eq!(tree.predict_row(&m, 1), 7.0);
    }
}
