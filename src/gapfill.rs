//! Densification of the aggregated panel: one row per (segment, date) over
//! the full observed range, with zero-filled flow metrics on synthesized rows.

use log::info;
use polars::prelude::*;

use crate::error::{ForecastError, Result};
use crate::schema::{self, zero_fill_columns};

/// Step of the dense calendar grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Weekly,
}

impl Granularity {
    fn step_days(&self) -> i32 {
        match self {
            Granularity::Daily => 1,
            Granularity::Weekly => 7,
        }
    }
}

/// Build the full cartesian grid of (date x observed segment keys) and join
/// the panel onto it. Missing flow metrics (the enumerated
/// `sales_amount_*` / `sales_value_*` columns) become zero; every other column
/// stays null on synthesized rows.
pub fn fill_date_gaps(
    panel: &DataFrame,
    date_col: &str,
    key_cols: &[&str],
    granularity: Granularity,
) -> Result<DataFrame> {
    schema::ensure_columns(panel, &[date_col])?;
    schema::ensure_columns(panel, key_cols)?;
    if panel.height() == 0 {
        return Err(ForecastError::DataSparsity(
            "cannot fill date gaps of an empty panel".to_string(),
        ));
    }

    let dates = panel.column(date_col)?.date()?;
    let (min_day, max_day) = match (dates.min(), dates.max()) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => {
            return Err(ForecastError::DataSparsity(format!(
                "column '{date_col}' holds no dates"
            )))
        }
    };

    let step = granularity.step_days();
    let days: Vec<i32> = (min_day..=max_day).step_by(step as usize).collect();
    let grid_dates = DataFrame::new(vec![Series::new(date_col, days.clone())
        .cast(&DataType::Date)?])?;

    let key_names: Vec<String> = key_cols.iter().map(|s| s.to_string()).collect();
    let segments = panel
        .select(key_names.clone())?
        .lazy()
        .unique(None, UniqueKeepStrategy::First)
        .collect()?;

    let grid = grid_dates.cross_join(&segments, None, None)?;
    let mut join_cols = vec![date_col.to_string()];
    join_cols.extend(key_names);

    let joined = grid.join(
        panel,
        join_cols.clone(),
        join_cols,
        JoinArgs::new(JoinType::Left),
    )?;

    let present: Vec<String> = zero_fill_columns()
        .into_iter()
        .filter(|c| joined.get_column_names().contains(&c.as_str()))
        .collect();
    let fills: Vec<Expr> = present
        .iter()
        .map(|c| col(c).cast(DataType::Float64).fill_null(lit(0.0)).alias(c))
        .collect();

    let out = joined
        .lazy()
        .with_columns(fills)
        .sort(date_col, SortOptions { descending: false, ..Default::default() })
        .collect()?;

    info!(
        "gap fill: {} segments x {} dates -> {} rows",
        out.height() / days.len().max(1),
        days.len(),
        out.height()
    );
    Ok(out)
}
