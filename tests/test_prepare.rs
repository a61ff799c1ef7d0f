use chrono::NaiveDate;
use polars::prelude::*;

use assert_approx_eq::assert_approx_eq;
use forecast_demand::prepare;
use forecast_demand::schema::{CATEGORY_COL, ORIGINAL_DATE_COL, WEEK_COL};
use forecast_demand::tables;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn date_columns_align_weeks_to_monday() {
    // 2017-10-05 is a Thursday; its week starts Monday 2017-10-02.
    let df = df!(
        "order_purchase_timestamp" => ["2017-10-05 14:30:00", "2017-10-02 00:10:00"]
    )
    .unwrap();
    let out = prepare::add_date_columns(&df).unwrap();

    let weeks = tables::date_values(&out, WEEK_COL).unwrap();
    assert_eq!(weeks[0], Some(date(2017, 10, 2)));
    assert_eq!(weeks[1], Some(date(2017, 10, 2)));

    let days = tables::date_values(&out, ORIGINAL_DATE_COL).unwrap();
    assert_eq!(days[0], Some(date(2017, 10, 5)));

    let weekday = out.column("weekday").unwrap().utf8().unwrap();
    assert_eq!(weekday.get(0), Some("Thursday"));
    assert_eq!(weekday.get(1), Some("Monday"));

    let daytime = tables::float_values(&out, "daytime_in_minutes").unwrap();
    assert_approx_eq!(daytime[0], (14 * 60 + 30) as f64, 1e-9);
}

#[test]
fn cancelled_statuses_clear_the_approved_flag() {
    let df = df!("order_status" => ["delivered", "canceled", "unavailable", "shipped"]).unwrap();
    let out = prepare::add_approved_flag(&df).unwrap();
    let flags = tables::float_values(&out, "flag_approved_order").unwrap();
    assert_eq!(flags, vec![1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn new_client_flag_marks_first_purchase_only() {
    let df = df!(
        "order_purchase_timestamp" => [
            "2017-03-10 10:00:00", // second purchase of c1
            "2017-01-05 09:00:00", // first purchase of c1
            "2017-02-01 12:00:00", // only purchase of c2
        ],
        "customer_id" => ["c1", "c1", "c2"]
    )
    .unwrap();
    let dated = prepare::add_date_columns(&df).unwrap();
    let out = prepare::add_new_client_flag(&dated, &["customer_id"]).unwrap();

    // Output is sorted chronologically.
    let customers: Vec<Option<&str>> =
        out.column("customer_id").unwrap().utf8().unwrap().into_iter().collect();
    let flags = tables::float_values(&out, "flag_new_client").unwrap();
    assert_eq!(customers, vec![Some("c1"), Some("c2"), Some("c1")]);
    assert_eq!(flags, vec![1.0, 1.0, 0.0]);
}

#[test]
fn weekly_aggregation_applies_the_configured_reducers() {
    // Four order lines in one (week, category) cell.
    let n = 4;
    let week = tables::date_series(WEEK_COL, vec![date(2017, 10, 2); n]);
    let df = DataFrame::new(vec![
        week,
        Series::new(CATEGORY_COL, vec!["beleza_saude"; n]),
        Series::new("year", vec![2017i32; n]),
        Series::new("month", vec![10i32; n]),
        Series::new("day_of_month", [2i32, 3, 4, 5].as_slice()),
        Series::new("flag_holiday", [0i32, 0, 1, 0].as_slice()),
        Series::new("flag_approved_order", [1i32, 1, 0, 1].as_slice()),
        Series::new("flag_new_client", [1i32, 0, 0, 0].as_slice()),
        Series::new("daytime_in_minutes", [600i32, 700, 800, 900].as_slice()),
        Series::new("sales_amount", [1i32, 1, 1, 1].as_slice()),
        Series::new("sales_value", [75.0f64, 150.0, 100.0, 50.0].as_slice()),
        Series::new("freight", [10.0f64, 20.0, 30.0, 40.0].as_slice()),
        Series::new("product_weight_g", [200.0f64, 400.0, 600.0, 800.0].as_slice()),
    ])
    .unwrap();

    let out = prepare::aggregate_weekly(&df, &[WEEK_COL, CATEGORY_COL]).unwrap();
    assert_eq!(out.height(), 1);

    let value = |name: &str| tables::float_values(&out, name).unwrap()[0];
    assert_approx_eq!(value("sales_amount_sum"), 4.0, 1e-9);
    assert_approx_eq!(value("sales_amount_mean"), 1.0, 1e-9);
    assert_approx_eq!(value("sales_value_sum"), 375.0, 1e-9);
    assert_approx_eq!(value("sales_value_mean"), 93.75, 1e-9);
    assert_approx_eq!(value("sales_value_median"), 87.5, 1e-9);
    assert_approx_eq!(value("sales_value_min"), 50.0, 1e-9);
    assert_approx_eq!(value("sales_value_max"), 150.0, 1e-9);
    assert_approx_eq!(value("year_min"), 2017.0, 1e-9);
    assert_approx_eq!(value("flag_holiday_max"), 1.0, 1e-9);
    assert_approx_eq!(value("flag_approved_order_mean"), 0.75, 1e-9);
    assert_approx_eq!(value("daytime_in_minutes_max"), 900.0, 1e-9);
}

#[test]
fn aggregation_of_an_empty_frame_is_a_sparsity_error() {
    let week = tables::date_series(WEEK_COL, Vec::<NaiveDate>::new());
    let mut columns = vec![week, Series::new(CATEGORY_COL, Vec::<&str>::new())];
    for metric in [
        "year",
        "month",
        "day_of_month",
        "flag_holiday",
        "flag_approved_order",
        "flag_new_client",
        "daytime_in_minutes",
        "sales_amount",
        "sales_value",
        "freight",
        "product_weight_g",
    ] {
        columns.push(Series::new(metric, Vec::<f64>::new()));
    }
    let df = DataFrame::new(columns).unwrap();
    let err = prepare::aggregate_weekly(&df, &[WEEK_COL, CATEGORY_COL]).unwrap_err();
    assert!(matches!(err, forecast_demand::ForecastError::DataSparsity(_)));
}
