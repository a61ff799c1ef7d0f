//! Supervised target construction and the walk-forward train/validation split.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use log::info;
use polars::prelude::*;

use crate::error::{ForecastError, Result};
use crate::schema::{self, target_column};
use crate::tables;

/// Both halves of the walk-forward split.
#[derive(Debug)]
pub struct SplitPanels {
    pub train: DataFrame,
    pub validation: DataFrame,
}

/// Append the supervised target: the source metric shifted `horizon` weeks
/// ahead within each series. The trailing `horizon` rows of every series get a
/// null target.
pub fn add_target(
    panel: &DataFrame,
    source_col: &str,
    horizon: u32,
    key_cols: &[&str],
    date_col: &str,
) -> Result<DataFrame> {
    schema::ensure_columns(panel, &[source_col, date_col])?;
    schema::ensure_columns(panel, key_cols)?;
    if horizon == 0 {
        return Err(ForecastError::InvalidParameter(
            "forecast horizon must be at least one week".to_string(),
        ));
    }

    let keys: Vec<Expr> = key_cols.iter().map(|c| col(c)).collect();
    let out = panel
        .clone()
        .lazy()
        .sort(date_col, SortOptions { descending: false, ..Default::default() })
        .with_column(
            col(source_col)
                .cast(DataType::Float64)
                .shift(-(horizon as i64))
                .over(keys)
                .alias(&target_column(horizon)),
        )
        .collect()?;
    Ok(out)
}

/// Deterministic calendar split: train strictly before `split_date`,
/// validation on/after `split_date + 7 days`. The one-week buffer keeps the
/// shifted target of the last visible training weeks out of validation.
pub fn split_by_date(panel: &DataFrame, date_col: &str, split_date: NaiveDate) -> Result<SplitPanels> {
    schema::ensure_columns(panel, &[date_col])?;
    let dates = tables::date_values(panel, date_col)?;
    let validation_start = split_date + Duration::days(7);

    let train_mask: BooleanChunked =
        dates.iter().map(|opt| opt.map(|d| d < split_date)).collect();
    let val_mask: BooleanChunked =
        dates.iter().map(|opt| opt.map(|d| d >= validation_start)).collect();

    let train = panel.filter(&train_mask)?;
    let validation = panel.filter(&val_mask)?;
    if train.height() == 0 || validation.height() == 0 {
        return Err(ForecastError::DataSparsity(format!(
            "split at {split_date} left {} train and {} validation rows",
            train.height(),
            validation.height()
        )));
    }
    info!(
        "split at {}: {} train rows, {} validation rows (validation starts {})",
        split_date,
        train.height(),
        validation.height(),
        validation_start
    );
    Ok(SplitPanels { train, validation })
}

/// Write the four split artifacts. The feature files keep the date column so
/// the tuning stage can align predictions by row identity; the target files
/// hold the single target column.
///
/// `y_train` is written as-is: null targets produced by the shift stay in the
/// file and are dropped at model-fit time, while validation nulls are dropped
/// inside the tuning objective via index-aligned joining.
pub fn write_split_artifacts(
    split: &SplitPanels,
    horizon: u32,
    out_dir: &Path,
) -> Result<()> {
    let target = target_column(horizon);
    schema::ensure_columns(&split.train, &[target.as_str()])?;

    let mut x_train = split.train.drop(&target)?;
    let mut y_train = split.train.select([target.as_str()])?;
    let mut x_val = split.validation.drop(&target)?;
    let mut y_val = split.validation.select([target.as_str()])?;

    tables::write_table(&mut x_train, out_dir.join("x_train.csv"))?;
    tables::write_table(&mut y_train, out_dir.join("y_train.csv"))?;
    tables::write_table(&mut x_val, out_dir.join("x_val.csv"))?;
    tables::write_table(&mut y_val, out_dir.join("y_val.csv"))?;
    Ok(())
}
