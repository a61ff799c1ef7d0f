//! Reading and writing the pipeline's tabular files.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;

use crate::error::{ForecastError, Result};

/// Read a CSV file with a header row into a DataFrame.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(&path)?;
    let df = CsvReader::new(file)
        .infer_schema(None)
        .has_header(true)
        .finish()?;
    Ok(df)
}

/// Write a DataFrame to a CSV file with a header row.
pub fn write_table<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(&path)?;
    CsvWriter::new(&mut file).has_header(true).finish(df)?;
    Ok(())
}

/// Make sure a column carries the Date dtype, parsing `YYYY-MM-DD` strings if
/// the reader left it as text.
pub fn ensure_date_column(df: &mut DataFrame, column: &str) -> Result<()> {
    let series = df
        .column(column)
        .map_err(|_| ForecastError::Schema(format!("missing date column '{column}'")))?;

    let parsed = match series.dtype() {
        DataType::Date => return Ok(()),
        DataType::Utf8 => {
            let ca = series.utf8()?;
            let dates = ca.into_iter().map(|opt| {
                opt.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            });
            DateChunked::from_naive_date_options(column, dates).into_series()
        }
        other => {
            return Err(ForecastError::Schema(format!(
                "column '{column}' has dtype {other:?}, expected Date or Utf8"
            )))
        }
    };
    df.replace(column, parsed)?;
    Ok(())
}

/// Extract a Date column as chrono dates; nulls stay None.
pub fn date_values(df: &DataFrame, column: &str) -> Result<Vec<Option<NaiveDate>>> {
    let ca = df.column(column)?.date()?;
    Ok(ca.as_date_iter().collect())
}

/// Build a Date series from chrono dates.
pub fn date_series(name: &str, dates: impl IntoIterator<Item = NaiveDate>) -> Series {
    DateChunked::from_naive_date(name, dates).into_series()
}

/// A column's values as f64 with nulls and non-numeric entries as NaN.
pub fn float_values(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    let series = df
        .column(column)
        .map_err(|_| ForecastError::Schema(format!("missing column '{column}'")))?
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_dates_are_parsed_in_place() {
        let mut df = df!("order_purchase_date" => ["2018-01-01", "2018-01-08"]).unwrap();
        ensure_date_column(&mut df, "order_purchase_date").unwrap();
        assert_eq!(df.column("order_purchase_date").unwrap().dtype(), &DataType::Date);
        let dates = date_values(&df, "order_purchase_date").unwrap();
        assert_eq!(dates[1], NaiveDate::from_ymd_opt(2018, 1, 8));
    }

    #[test]
    fn float_values_map_nulls_to_nan() {
        let df = df!("x" => [Some(1.5f64), None, Some(2.0)]).unwrap();
        let vals = float_values(&df, "x").unwrap();
        assert!(vals[1].is_nan());
        assert_eq!(vals[2], 2.0);
    }
}
