//! Trend feature generation on the gap-filled weekly panel: per-segment lags
//! and expanding historical mean / relative difference.

use polars::prelude::*;

use crate::error::{ForecastError, Result};
use crate::schema::{self, TrendFeature, CATEGORY_COL, LAG_STEPS, WEEK_COL};

/// Join the national rollup onto the segment panel by (week, category).
/// Colliding aggregate columns get the `_national` suffix, as in the panel's
/// downstream feature names.
pub fn join_national(panel: &DataFrame, national: &DataFrame) -> Result<DataFrame> {
    schema::ensure_columns(panel, &[WEEK_COL, CATEGORY_COL])?;
    schema::ensure_columns(national, &[WEEK_COL, CATEGORY_COL])?;
    let mut args = JoinArgs::new(JoinType::Left);
    args.suffix = Some("_national".to_string());
    let joined = panel.join(
        national,
        [WEEK_COL, CATEGORY_COL],
        [WEEK_COL, CATEGORY_COL],
        args,
    )?;
    Ok(joined)
}

/// Add, for every metric in `feature_cols` and every series identified by
/// `key_cols`: lag-{1,2,3,4,12}, the expanding inclusive mean
/// (`_historical_mean`) and the relative difference against it
/// (`_historical_diff`).
///
/// The frame is re-sorted ascending by `date_col` on entry; lag and expanding
/// windows are only meaningful on that order. Ties on date within one segment
/// are not expected and their relative order is unspecified. A zero historical
/// mean makes the diff non-finite; that is "missing feature" semantics for the
/// model, not an error.
pub fn add_trend_features(
    panel: &DataFrame,
    feature_cols: &[String],
    key_cols: &[&str],
    date_col: &str,
) -> Result<DataFrame> {
    schema::ensure_columns(panel, key_cols)?;
    schema::ensure_columns(panel, &[date_col])?;
    let required: Vec<&str> = feature_cols.iter().map(|s| s.as_str()).collect();
    schema::ensure_columns(panel, &required)?;
    if panel.height() == 0 {
        return Err(ForecastError::DataSparsity(
            "cannot derive trend features from an empty panel".to_string(),
        ));
    }

    let keys = || -> Vec<Expr> { key_cols.iter().map(|c| col(c)).collect() };

    let mut lazy = panel
        .clone()
        .lazy()
        .sort(date_col, SortOptions { descending: false, ..Default::default() });

    for metric in feature_cols {
        let mut derived = Vec::new();
        for step in LAG_STEPS {
            derived.push(
                col(metric)
                    .cast(DataType::Float64)
                    .shift(step as i64)
                    .over(keys())
                    .alias(&TrendFeature::Lag(step).column_name(metric)),
            );
        }
        // Expanding inclusive mean: grouped cumulative sum over row count.
        derived.push(
            (col(metric).cast(DataType::Float64).cumsum(false).over(keys())
                / (col(metric).cumcount(false).over(keys()).cast(DataType::Float64) + lit(1.0)))
            .alias(&TrendFeature::HistoricalMean.column_name(metric)),
        );
        lazy = lazy.with_columns(derived);

        let mean_name = TrendFeature::HistoricalMean.column_name(metric);
        lazy = lazy.with_column(
            ((col(metric).cast(DataType::Float64) - col(&mean_name)) / col(&mean_name))
                .alias(&TrendFeature::HistoricalDiff.column_name(metric)),
        );
    }

    Ok(lazy.collect()?)
}
