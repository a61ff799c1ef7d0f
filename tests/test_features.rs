use chrono::NaiveDate;
use polars::prelude::*;

use assert_approx_eq::assert_approx_eq;
use forecast_demand::features::{add_trend_features, join_national};
use forecast_demand::gapfill::{fill_date_gaps, Granularity};
use forecast_demand::schema::{CATEGORY_COL, CITY_COL, WEEK_COL};
use forecast_demand::tables;

fn week(i: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap() + chrono::Duration::weeks(i as i64)
}

fn panel(categories: &[&str], weeks: &[u32], sales: &[f64]) -> DataFrame {
    DataFrame::new(vec![
        tables::date_series(WEEK_COL, weeks.iter().map(|&i| week(i))),
        Series::new(CATEGORY_COL, categories),
        Series::new(CITY_COL, vec!["sao paulo"; categories.len()]),
        Series::new("sales_amount_sum", sales),
    ])
    .unwrap()
}

fn row_index(df: &DataFrame, category: &str, w: u32) -> usize {
    let dates = tables::date_values(df, WEEK_COL).unwrap();
    let cats: Vec<Option<&str>> =
        df.column(CATEGORY_COL).unwrap().utf8().unwrap().into_iter().collect();
    dates
        .iter()
        .zip(&cats)
        .position(|(d, c)| *d == Some(week(w)) && *c == Some(category))
        .unwrap()
}

#[test]
fn gap_fill_produces_one_row_per_segment_and_week() {
    // Segment "a" observed on weeks 0 and 3, "b" only on week 0.
    let df = panel(&["a", "a", "b"], &[0, 3, 0], &[5.0, 7.0, 2.0]);
    let filled = fill_date_gaps(&df, WEEK_COL, &[CATEGORY_COL, CITY_COL], Granularity::Weekly).unwrap();

    // 4 weeks x 2 segments.
    assert_eq!(filled.height(), 8);

    let sales = tables::float_values(&filled, "sales_amount_sum").unwrap();
    assert_eq!(sales[row_index(&filled, "a", 0)], 5.0);
    assert_eq!(sales[row_index(&filled, "a", 1)], 0.0);
    assert_eq!(sales[row_index(&filled, "a", 2)], 0.0);
    assert_eq!(sales[row_index(&filled, "a", 3)], 7.0);
    assert_eq!(sales[row_index(&filled, "b", 3)], 0.0);
}

#[test]
fn gap_fill_leaves_non_flow_columns_null() {
    let mut df = panel(&["a", "a"], &[0, 2], &[5.0, 7.0]);
    df.with_column(Series::new("freight_mean", [10.0f64, 20.0].as_slice())).unwrap();
    let filled = fill_date_gaps(&df, WEEK_COL, &[CATEGORY_COL, CITY_COL], Granularity::Weekly).unwrap();

    let freight = tables::float_values(&filled, "freight_mean").unwrap();
    assert_eq!(freight[row_index(&filled, "a", 0)], 10.0);
    // The synthesized week has no observed freight; zero would be a lie.
    assert!(freight[row_index(&filled, "a", 1)].is_nan());
}

#[test]
fn lags_never_cross_segment_boundaries() {
    let df = panel(
        &["a", "b", "a", "b", "a", "b"],
        &[0, 0, 1, 1, 2, 2],
        &[2.0, 10.0, 4.0, 20.0, 6.0, 30.0],
    );
    let cols = vec!["sales_amount_sum".to_string()];
    let out = add_trend_features(&df, &cols, &[CATEGORY_COL, CITY_COL], WEEK_COL).unwrap();

    let lag = tables::float_values(&out, "sales_amount_sum_lag").unwrap();
    assert!(lag[row_index(&out, "a", 0)].is_nan());
    assert_eq!(lag[row_index(&out, "a", 1)], 2.0);
    assert_eq!(lag[row_index(&out, "a", 2)], 4.0);
    // Segment "b" sees its own history, not "a"'s.
    assert!(lag[row_index(&out, "b", 0)].is_nan());
    assert_eq!(lag[row_index(&out, "b", 1)], 10.0);
    assert_eq!(lag[row_index(&out, "b", 2)], 20.0);

    let lag2 = tables::float_values(&out, "sales_amount_sum_lag2").unwrap();
    assert!(lag2[row_index(&out, "b", 1)].is_nan());
    assert_eq!(lag2[row_index(&out, "b", 2)], 10.0);
}

#[test]
fn historical_mean_is_the_expanding_inclusive_mean() {
    let df = panel(&["a", "a", "a"], &[0, 1, 2], &[2.0, 4.0, 6.0]);
    let cols = vec!["sales_amount_sum".to_string()];
    let out = add_trend_features(&df, &cols, &[CATEGORY_COL, CITY_COL], WEEK_COL).unwrap();

    let mean = tables::float_values(&out, "sales_amount_sum_historical_mean").unwrap();
    assert_approx_eq!(mean[0], 2.0, 1e-9);
    assert_approx_eq!(mean[1], 3.0, 1e-9);
    assert_approx_eq!(mean[2], 4.0, 1e-9);

    let diff = tables::float_values(&out, "sales_amount_sum_historical_diff").unwrap();
    assert_approx_eq!(diff[0], 0.0, 1e-9);
    assert_approx_eq!(diff[1], (4.0 - 3.0) / 3.0, 1e-9);
    assert_approx_eq!(diff[2], (6.0 - 4.0) / 4.0, 1e-9);
}

#[test]
fn trend_features_tolerate_unsorted_input() {
    // Same series as above, rows shuffled; the generator re-sorts by date.
    let df = panel(&["a", "a", "a"], &[2, 0, 1], &[6.0, 2.0, 4.0]);
    let cols = vec!["sales_amount_sum".to_string()];
    let out = add_trend_features(&df, &cols, &[CATEGORY_COL, CITY_COL], WEEK_COL).unwrap();

    let lag = tables::float_values(&out, "sales_amount_sum_lag").unwrap();
    assert!(lag[row_index(&out, "a", 0)].is_nan());
    assert_eq!(lag[row_index(&out, "a", 1)], 2.0);
    assert_eq!(lag[row_index(&out, "a", 2)], 4.0);
}

#[test]
fn national_join_suffixes_colliding_columns() {
    let df = panel(&["a", "b"], &[0, 0], &[5.0, 7.0]);
    let national = DataFrame::new(vec![
        tables::date_series(WEEK_COL, vec![week(0), week(0)]),
        Series::new(CATEGORY_COL, ["a", "b"].as_slice()),
        Series::new("sales_amount_sum", [100.0f64, 200.0].as_slice()),
    ])
    .unwrap();

    let joined = join_national(&df, &national).unwrap();
    let local = tables::float_values(&joined, "sales_amount_sum").unwrap();
    let nat = tables::float_values(&joined, "sales_amount_sum_national").unwrap();
    assert_eq!(local[row_index(&joined, "a", 0)], 5.0);
    assert_eq!(nat[row_index(&joined, "a", 0)], 100.0);
    assert_eq!(nat[row_index(&joined, "b", 0)], 200.0);
}
