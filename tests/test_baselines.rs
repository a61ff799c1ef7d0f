use chrono::NaiveDate;
use polars::prelude::*;

use assert_approx_eq::assert_approx_eq;
use forecast_demand::baselines::{
    latest_value_forecast, moving_average_forecast, LATEST_VALUE_METHOD, MOVING_AVERAGE_METHOD,
};
use forecast_demand::metrics;
use forecast_demand::schema::{CATEGORY_COL, CITY_COL, WEEK_COL};
use forecast_demand::tables;
use rstest::rstest;

fn week(i: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap() + chrono::Duration::weeks(i as i64)
}

fn single_segment(values: &[f64]) -> DataFrame {
    DataFrame::new(vec![
        tables::date_series(WEEK_COL, (0..values.len() as u32).map(week)),
        Series::new(CATEGORY_COL, vec!["a"; values.len()]),
        Series::new(CITY_COL, vec!["sao paulo"; values.len()]),
        Series::new("actual_value", values),
    ])
    .unwrap()
}

#[test]
fn latest_value_carries_observations_forward_a_week() {
    let df = single_segment(&[10.0, 12.0, 11.0]);
    let out =
        latest_value_forecast(&df, &[CATEGORY_COL, CITY_COL], "actual_value", WEEK_COL, 7).unwrap();

    assert_eq!(out.height(), 3);
    let forecast = tables::float_values(&out, "forecast").unwrap();
    assert_eq!(forecast, vec![10.0, 12.0, 11.0]);

    // Forecast rows are stamped with the date they predict, not the one they
    // were made on.
    let dates = tables::date_values(&out, WEEK_COL).unwrap();
    assert_eq!(dates[0], Some(week(1)));
    assert_eq!(dates[2], Some(week(3)));

    let method = out.column("method").unwrap().utf8().unwrap();
    assert_eq!(method.get(0), Some(LATEST_VALUE_METHOD));
}

#[test]
fn moving_average_with_unit_window_degenerates_to_latest_value() {
    let df = single_segment(&[10.0, 12.0, 11.0, 14.0]);
    let latest =
        latest_value_forecast(&df, &[CATEGORY_COL, CITY_COL], "actual_value", WEEK_COL, 7).unwrap();
    let ma =
        moving_average_forecast(&df, &[CATEGORY_COL, CITY_COL], "actual_value", WEEK_COL, 7, 1)
            .unwrap();

    let latest_vals = tables::float_values(&latest, "forecast").unwrap();
    let ma_vals = tables::float_values(&ma, "forecast").unwrap();
    assert_eq!(latest_vals, ma_vals);
    let method = ma.column("method").unwrap().utf8().unwrap();
    assert_eq!(method.get(0), Some(MOVING_AVERAGE_METHOD));
}

#[rstest]
#[case(2, vec![10.0, 11.0, 11.5, 12.5])]
#[case(3, vec![10.0, 11.0, 11.0, 37.0 / 3.0])]
fn moving_average_shrinks_its_window_at_the_series_start(
    #[case] window: usize,
    #[case] expected: Vec<f64>,
) {
    let df = single_segment(&[10.0, 12.0, 11.0, 14.0]);
    let out =
        moving_average_forecast(&df, &[CATEGORY_COL, CITY_COL], "actual_value", WEEK_COL, 7, window)
            .unwrap();
    let forecast = tables::float_values(&out, "forecast").unwrap();
    for (got, want) in forecast.iter().zip(&expected) {
        assert_approx_eq!(*got, *want, 1e-9);
    }
}

#[test]
fn moving_average_rejects_an_empty_window() {
    let df = single_segment(&[10.0]);
    let err =
        moving_average_forecast(&df, &[CATEGORY_COL, CITY_COL], "actual_value", WEEK_COL, 7, 0)
            .unwrap_err();
    assert!(matches!(err, forecast_demand::ForecastError::InvalidParameter(_)));
}

#[test]
fn moving_average_windows_stay_inside_their_segment() {
    // Interleaved segments; each should average only its own history.
    let df = DataFrame::new(vec![
        tables::date_series(WEEK_COL, [week(0), week(0), week(1), week(1)]),
        Series::new(CATEGORY_COL, ["a", "b", "a", "b"].as_slice()),
        Series::new(CITY_COL, vec!["sao paulo"; 4]),
        Series::new("actual_value", [10.0f64, 100.0, 20.0, 200.0].as_slice()),
    ])
    .unwrap();
    let out =
        moving_average_forecast(&df, &[CATEGORY_COL, CITY_COL], "actual_value", WEEK_COL, 7, 2)
            .unwrap();

    let cats: Vec<Option<&str>> =
        out.column(CATEGORY_COL).unwrap().utf8().unwrap().into_iter().collect();
    let forecast = tables::float_values(&out, "forecast").unwrap();
    for (cat, f) in cats.iter().zip(&forecast) {
        match cat.unwrap() {
            "a" => assert!(*f == 10.0 || *f == 15.0),
            _ => assert!(*f == 100.0 || *f == 150.0),
        }
    }
}

#[test]
fn segment_metrics_cover_every_observed_segment() {
    let frame = df!(
        "segment" => ["a", "a", "b"],
        "actual" => [10.0, 20.0, 5.0],
        "predicted" => [12.0, 18.0, 5.0]
    )
    .unwrap();
    let by_segment = metrics::evaluate_by_segment(&frame, "segment", "actual", "predicted").unwrap();

    assert_eq!(by_segment.len(), 2);
    assert_approx_eq!(by_segment["a"].rmse, 2.0, 1e-9);
    assert_approx_eq!(by_segment["b"].rmse, 0.0, 1e-9);
    assert_approx_eq!(by_segment["b"].mape, 0.0, 1e-9);
}
