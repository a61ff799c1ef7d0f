//! Calendar aggregation: joins the raw order tables into a per-order-line
//! frame, derives calendar and holiday flags, and rolls everything up into a
//! weekly panel keyed by the chosen grouping columns.

use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use log::info;
use polars::prelude::*;

use crate::error::{ForecastError, Result};
use crate::holidays::HolidayCalendar;
use crate::schema::{
    self, derived_name, AGGREGATION_PLAN, CATEGORY_COL, CITY_COL, MONTH_COL, ORIGINAL_DATE_COL,
    WEEK_COL,
};
use crate::tables;

const TIMESTAMP_COL: &str = "order_purchase_timestamp";
const CANCELLED_STATUSES: [&str; 2] = ["unavailable", "canceled"];

/// The four raw input tables.
#[derive(Debug)]
pub struct RawTables {
    pub orders: DataFrame,
    pub order_items: DataFrame,
    pub products: DataFrame,
    pub customers: DataFrame,
}

impl RawTables {
    /// Load the raw Olist-style CSVs from a directory.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let orders = tables::read_table(dir.join("olist_orders_dataset.csv"))?;
        let order_items = tables::read_table(dir.join("olist_order_items_dataset.csv"))?;
        let products = tables::read_table(dir.join("olist_products_dataset.csv"))?;
        let customers = tables::read_table(dir.join("olist_customers_dataset.csv"))?;

        schema::ensure_columns(&orders, &["order_id", "customer_id", "order_status", TIMESTAMP_COL])?;
        schema::ensure_columns(&order_items, &["order_id", "product_id", "price", "freight_value"])?;
        schema::ensure_columns(&products, &["product_id", CATEGORY_COL, "product_weight_g"])?;
        schema::ensure_columns(&customers, &["customer_id", CITY_COL, "customer_state"])?;

        Ok(RawTables { orders, order_items, products, customers })
    }
}

/// Collapse order items to one row per (order, product): `sales_amount` is the
/// item count, `sales_value` the price sum, `freight` the freight sum.
pub fn summarize_order_items(order_items: &DataFrame) -> Result<DataFrame> {
    schema::ensure_columns(order_items, &["order_id", "product_id", "price", "freight_value"])?;
    let df = order_items
        .clone()
        .lazy()
        .groupby([col("order_id"), col("product_id")])
        .agg([
            col("price").count().alias("sales_amount"),
            col("price").sum().alias("sales_value"),
            col("freight_value").sum().alias("freight"),
        ])
        .collect()?;
    Ok(df)
}

/// Left-join orders onto item summaries, products and customers. Unmatched
/// rows keep nulls for the joined columns.
pub fn join_order_lines(raw: &RawTables, item_summary: &DataFrame) -> Result<DataFrame> {
    let joined = raw
        .orders
        .join(item_summary, ["order_id"], ["order_id"], JoinArgs::new(JoinType::Left))?
        .join(&raw.products, ["product_id"], ["product_id"], JoinArgs::new(JoinType::Left))?
        .join(&raw.customers, ["customer_id"], ["customer_id"], JoinArgs::new(JoinType::Left))?;
    Ok(joined)
}

/// Derive the date columns from the purchase timestamp: Monday-aligned week
/// start, calendar day, first of month, minutes since midnight, and the plain
/// calendar fields (year, month, day of month, weekday name).
pub fn add_date_columns(df: &DataFrame) -> Result<DataFrame> {
    schema::ensure_columns(df, &[TIMESTAMP_COL])?;
    let stamps = df.column(TIMESTAMP_COL)?;
    let parsed: Vec<Option<NaiveDateTime>> = match stamps.dtype() {
        DataType::Utf8 => stamps
            .utf8()?
            .into_iter()
            .map(|opt| opt.and_then(parse_timestamp))
            .collect(),
        DataType::Datetime(_, _) => stamps.datetime()?.as_datetime_iter().collect(),
        other => {
            return Err(ForecastError::Schema(format!(
                "column '{TIMESTAMP_COL}' has dtype {other:?}, expected Utf8 or Datetime"
            )))
        }
    };

    let week_start = parsed.iter().map(|opt| {
        opt.map(|ts| {
            let day = ts.date();
            day - Duration::days(day.weekday().num_days_from_monday() as i64)
        })
    });
    let original = parsed.iter().map(|opt| opt.map(|ts| ts.date()));
    let month_start = parsed.iter().map(|opt| {
        opt.and_then(|ts| NaiveDate::from_ymd_opt(ts.date().year(), ts.date().month(), 1))
    });
    let daytime: Vec<Option<i32>> = parsed
        .iter()
        .map(|opt| opt.map(|ts| (ts.time().hour() * 60 + ts.time().minute()) as i32))
        .collect();
    let year: Vec<Option<i32>> = parsed.iter().map(|o| o.map(|ts| ts.date().year())).collect();
    let month: Vec<Option<i32>> = parsed.iter().map(|o| o.map(|ts| ts.date().month() as i32)).collect();
    let day_of_month: Vec<Option<i32>> =
        parsed.iter().map(|o| o.map(|ts| ts.date().day() as i32)).collect();
    let weekday: Vec<Option<String>> = parsed
        .iter()
        .map(|o| o.map(|ts| ts.date().format("%A").to_string()))
        .collect();

    let mut out = df.clone();
    out.with_column(DateChunked::from_naive_date_options(WEEK_COL, week_start).into_series())?;
    out.with_column(DateChunked::from_naive_date_options(ORIGINAL_DATE_COL, original).into_series())?;
    out.with_column(DateChunked::from_naive_date_options(MONTH_COL, month_start).into_series())?;
    out.with_column(Series::new("daytime_in_minutes", daytime))?;
    out.with_column(Series::new("year", year))?;
    out.with_column(Series::new("month", month))?;
    out.with_column(Series::new("day_of_month", day_of_month))?;
    out.with_column(Series::new("weekday", weekday))?;
    Ok(out)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// `flag_approved_order` is 1 unless the order status marks it unavailable or
/// canceled.
pub fn add_approved_flag(df: &DataFrame) -> Result<DataFrame> {
    schema::ensure_columns(df, &["order_status"])?;
    let cancelled = Series::new("", CANCELLED_STATUSES.as_slice());
    let out = df
        .clone()
        .lazy()
        .with_column(
            when(col("order_status").is_in(lit(cancelled)))
                .then(lit(0i32))
                .otherwise(lit(1i32))
                .alias("flag_approved_order"),
        )
        .collect()?;
    Ok(out)
}

/// `flag_holiday` is 1 iff the purchase day is a holiday of its year.
pub fn add_holiday_flag(df: &DataFrame, calendar: &dyn HolidayCalendar) -> Result<DataFrame> {
    schema::ensure_columns(df, &[ORIGINAL_DATE_COL])?;
    let dates = tables::date_values(df, ORIGINAL_DATE_COL)?;
    let years: Vec<i32> = {
        let mut ys: Vec<i32> = dates.iter().flatten().map(|d| d.year()).collect();
        ys.sort_unstable();
        ys.dedup();
        ys
    };

    let mut holiday_dates = Vec::new();
    let mut labels = Vec::new();
    for year in years {
        for (date, label) in calendar.holidays(year) {
            holiday_dates.push(date);
            labels.push(label);
        }
    }
    let holidays = DataFrame::new(vec![
        tables::date_series(ORIGINAL_DATE_COL, holiday_dates),
        Series::new("holiday", labels),
    ])?;

    let out = df
        .join(&holidays, [ORIGINAL_DATE_COL], [ORIGINAL_DATE_COL], JoinArgs::new(JoinType::Left))?
        .lazy()
        .with_column(
            when(col("holiday").is_null())
                .then(lit(0i32))
                .otherwise(lit(1i32))
                .alias("flag_holiday"),
        )
        .collect()?;
    Ok(out)
}

/// `flag_new_client` marks the chronologically first row of each customer
/// within the given key grouping.
pub fn add_new_client_flag(df: &DataFrame, key_cols: &[&str]) -> Result<DataFrame> {
    schema::ensure_columns(df, key_cols)?;
    schema::ensure_columns(df, &[ORIGINAL_DATE_COL])?;
    let keys: Vec<Expr> = key_cols.iter().map(|c| col(c)).collect();
    let out = df
        .clone()
        .lazy()
        .sort(
            ORIGINAL_DATE_COL,
            SortOptions { descending: false, ..Default::default() },
        )
        .with_column(
            when(col(key_cols[0]).cumcount(false).over(keys).eq(lit(0u32)))
                .then(lit(1i32))
                .otherwise(lit(0i32))
                .alias("flag_new_client"),
        )
        .collect()?;
    Ok(out)
}

/// Keep rows whose purchase month falls inside `[from, to]` (inclusive).
pub fn filter_window(df: &DataFrame, from: NaiveDate, to: NaiveDate) -> Result<DataFrame> {
    schema::ensure_columns(df, &[MONTH_COL])?;
    let months = tables::date_values(df, MONTH_COL)?;
    let mask: BooleanChunked = months
        .iter()
        .map(|opt| opt.map(|m| m >= from && m <= to))
        .collect();
    Ok(df.filter(&mask)?)
}

/// Keep rows for the selected product categories and customer cities.
pub fn filter_segments(df: &DataFrame, categories: &[String], cities: &[String]) -> Result<DataFrame> {
    schema::ensure_columns(df, &[CATEGORY_COL, CITY_COL])?;
    let cats = Series::new("", categories);
    let cities = Series::new("", cities);
    let out = df
        .clone()
        .lazy()
        .filter(col(CATEGORY_COL).is_in(lit(cats)).and(col(CITY_COL).is_in(lit(cities))))
        .collect()?;
    Ok(out)
}

/// Aggregate the order-line frame to one row per key combination, applying the
/// configured reducers per base metric. Output columns are named
/// `{metric}_{reducer}`.
pub fn aggregate_weekly(df: &DataFrame, key_cols: &[&str]) -> Result<DataFrame> {
    schema::ensure_columns(df, key_cols)?;
    let metrics: Vec<&str> = AGGREGATION_PLAN.iter().map(|s| s.metric).collect();
    schema::ensure_columns(df, &metrics)?;
    if df.height() == 0 {
        return Err(ForecastError::DataSparsity(
            "no rows left to aggregate; check the configured filters".to_string(),
        ));
    }

    let mut aggs = Vec::new();
    for spec in AGGREGATION_PLAN {
        for reducer in spec.reducers {
            let base = col(spec.metric);
            let expr = match reducer {
                schema::Reducer::Sum => base.sum(),
                schema::Reducer::Mean => base.mean(),
                schema::Reducer::Median => base.median(),
                schema::Reducer::Min => base.min(),
                schema::Reducer::Max => base.max(),
            };
            aggs.push(expr.alias(&derived_name(spec.metric, *reducer)));
        }
    }

    let keys: Vec<Expr> = key_cols.iter().map(|c| col(c)).collect();
    let mut lazy = df.clone().lazy().groupby(keys).agg(aggs);
    if key_cols.contains(&WEEK_COL) {
        lazy = lazy.sort(WEEK_COL, SortOptions { descending: false, ..Default::default() });
    }
    let out = lazy.collect()?;
    info!("aggregated {} rows into {} weekly rows", df.height(), out.height());
    Ok(out)
}
