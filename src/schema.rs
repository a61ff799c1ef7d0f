//! Enumerated column schema for the weekly demand panel.
//!
//! Aggregate and feature column names are resolved here once, at configuration
//! time, instead of being re-interpolated ad hoc by every transformation.

use polars::prelude::*;

use crate::error::{ForecastError, Result};

/// Week-start date column (Monday aligned).
pub const WEEK_COL: &str = "order_purchase_date";
/// Calendar-day purchase date column.
pub const ORIGINAL_DATE_COL: &str = "order_purchase_original_date";
/// First-of-month purchase date column.
pub const MONTH_COL: &str = "order_purchase_month";

pub const CATEGORY_COL: &str = "product_category_name";
pub const STATE_COL: &str = "customer_state";
pub const CITY_COL: &str = "customer_city";

/// Key columns identifying one independent time series in the segment panel.
pub const SEGMENT_KEY_COLS: [&str; 3] = [CATEGORY_COL, STATE_COL, CITY_COL];

/// Aggregation reducers applied to base metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
    Median,
    Min,
    Max,
}

impl Reducer {
    pub fn suffix(&self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Median => "median",
            Reducer::Min => "min",
            Reducer::Max => "max",
        }
    }
}

/// One base metric and the reducers it gets during weekly aggregation.
#[derive(Debug, Clone, Copy)]
pub struct AggSpec {
    pub metric: &'static str,
    pub reducers: &'static [Reducer],
}

use Reducer::{Max, Mean, Median, Min, Sum};

const ALL_FIVE: &[Reducer] = &[Sum, Mean, Median, Min, Max];
const SPREAD: &[Reducer] = &[Mean, Median, Min, Max];

/// The fixed metric -> reducers mapping for weekly aggregation.
///
/// Not every metric gets every reducer: calendar fields collapse with min/max,
/// flags with max or mean, flow metrics with the full set.
pub const AGGREGATION_PLAN: &[AggSpec] = &[
    AggSpec { metric: "year", reducers: &[Min] },
    AggSpec { metric: "month", reducers: &[Min] },
    AggSpec { metric: "day_of_month", reducers: &[Max] },
    AggSpec { metric: "flag_holiday", reducers: &[Max] },
    AggSpec { metric: "flag_approved_order", reducers: &[Mean] },
    AggSpec { metric: "flag_new_client", reducers: &[Mean] },
    AggSpec { metric: "daytime_in_minutes", reducers: SPREAD },
    AggSpec { metric: "sales_amount", reducers: ALL_FIVE },
    AggSpec { metric: "sales_value", reducers: ALL_FIVE },
    AggSpec { metric: "freight", reducers: SPREAD },
    AggSpec { metric: "product_weight_g", reducers: &[Mean, Median] },
];

/// Name of an aggregated column: `{metric}_{reducer}`.
pub fn derived_name(metric: &str, reducer: Reducer) -> String {
    format!("{}_{}", metric, reducer.suffix())
}

/// Columns the gap-filler zero-fills on synthesized rows.
///
/// Zero is only correct for "nothing happened this week" flow metrics; filling
/// price-like or ratio-like columns with zero would bias the model, so
/// everything else stays null.
pub fn zero_fill_columns() -> Vec<String> {
    ["sales_amount", "sales_value"]
        .iter()
        .flat_map(|metric| ALL_FIVE.iter().map(move |r| derived_name(metric, *r)))
        .collect()
}

/// Derived trend features computed per base metric and segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendFeature {
    Lag(u32),
    HistoricalMean,
    HistoricalDiff,
}

/// Lags computed for every selected base metric.
pub const LAG_STEPS: [u32; 5] = [1, 2, 3, 4, 12];

impl TrendFeature {
    /// Name of the derived column for a base metric. Lag 1 keeps the bare
    /// `_lag` suffix; deeper lags carry their step.
    pub fn column_name(&self, metric: &str) -> String {
        match self {
            TrendFeature::Lag(1) => format!("{metric}_lag"),
            TrendFeature::Lag(n) => format!("{metric}_lag{n}"),
            TrendFeature::HistoricalMean => format!("{metric}_historical_mean"),
            TrendFeature::HistoricalDiff => format!("{metric}_historical_diff"),
        }
    }
}

/// Base metric columns selected for trend features, including the national
/// rollup variants joined with the `_national` suffix.
pub fn default_feature_columns() -> Vec<String> {
    let local = [
        "flag_approved_order_mean",
        "flag_new_client_mean",
        "daytime_in_minutes_mean",
        "sales_amount_mean",
        "sales_amount_sum",
        "sales_value_sum",
        "freight_mean",
        "product_weight_g_mean",
    ];
    let national = [
        "flag_approved_order_mean_national",
        "flag_new_client_mean_national",
        "daytime_in_minutes_mean_national",
        "sales_amount_mean_national",
        "freight_mean_national",
        "product_weight_g_mean_national",
    ];
    local
        .iter()
        .chain(national.iter())
        .map(|s| s.to_string())
        .collect()
}

/// Name of the supervised target column for a forecast horizon in weeks.
pub fn target_column(horizon: u32) -> String {
    format!("target_{horizon}w")
}

/// Fail with a schema error if any required column is absent.
pub fn ensure_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let present = df.get_column_names();
    let missing: Vec<&str> = required
        .iter()
        .filter(|c| !present.contains(&c.as_ref()))
        .copied()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ForecastError::Schema(format!(
            "missing required columns: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_names_follow_metric_reducer_order() {
        assert_eq!(derived_name("sales_value", Reducer::Sum), "sales_value_sum");
        assert_eq!(derived_name("year", Reducer::Min), "year_min");
    }

    #[test]
    fn lag_one_keeps_bare_suffix() {
        assert_eq!(TrendFeature::Lag(1).column_name("sales_amount_sum"), "sales_amount_sum_lag");
        assert_eq!(TrendFeature::Lag(12).column_name("x"), "x_lag12");
        assert_eq!(TrendFeature::HistoricalDiff.column_name("x"), "x_historical_diff");
    }

    #[test]
    fn zero_fill_covers_both_flow_metrics() {
        let cols = zero_fill_columns();
        assert_eq!(cols.len(), 10);
        assert!(cols.contains(&"sales_amount_sum".to_string()));
        assert!(cols.contains(&"sales_value_max".to_string()));
        assert!(!cols.contains(&"freight_mean".to_string()));
    }

    #[test]
    fn missing_columns_are_reported() {
        let df = polars::df!("a" => [1i32]).unwrap();
        let err = ensure_columns(&df, &["a", "b"]).unwrap_err();
        assert!(err.to_string().contains("b"));
    }
}
