//! Holiday calendars used to flag purchase dates.

use chrono::{Duration, NaiveDate};

/// A calendar mapping a year to its set of (date, label) holidays.
pub trait HolidayCalendar {
    fn holidays(&self, year: i32) -> Vec<(NaiveDate, String)>;
}

/// Brazilian national holidays: the fixed dates plus the Easter-derived
/// movable days (Carnival, Good Friday, Corpus Christi).
#[derive(Debug, Default, Clone)]
pub struct BrazilHolidays;

impl HolidayCalendar for BrazilHolidays {
    fn holidays(&self, year: i32) -> Vec<(NaiveDate, String)> {
        let mut days = Vec::new();
        let mut fixed = |month: u32, day: u32, label: &str| {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                days.push((date, label.to_string()));
            }
        };
        fixed(1, 1, "New year");
        fixed(4, 21, "Tiradentes' Day");
        fixed(5, 1, "Labour Day");
        fixed(9, 7, "Independence Day");
        fixed(10, 12, "Our Lady of Aparecida");
        fixed(11, 2, "All Souls' Day");
        fixed(11, 15, "Republic Day");
        fixed(12, 25, "Christmas Day");

        let easter = easter_sunday(year);
        days.push((easter - Duration::days(48), "Carnival Monday".to_string()));
        days.push((easter - Duration::days(47), "Carnival Tuesday".to_string()));
        days.push((easter - Duration::days(2), "Good Friday".to_string()));
        days.push((easter + Duration::days(60), "Corpus Christi".to_string()));

        days.sort();
        days
    }
}

/// Gregorian Easter Sunday (Meeus/Jones/Butcher algorithm).
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 4, 1).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easter_2017_and_2018() {
        assert_eq!(easter_sunday(2017), NaiveDate::from_ymd_opt(2017, 4, 16).unwrap());
        assert_eq!(easter_sunday(2018), NaiveDate::from_ymd_opt(2018, 4, 1).unwrap());
    }

    #[test]
    fn brazil_2018_contains_fixed_and_movable_days() {
        let days = BrazilHolidays.holidays(2018);
        let dates: Vec<NaiveDate> = days.iter().map(|(d, _)| *d).collect();
        // Tiradentes
        assert!(dates.contains(&NaiveDate::from_ymd_opt(2018, 4, 21).unwrap()));
        // Carnival Tuesday: Easter 2018-04-01 minus 47 days
        assert!(dates.contains(&NaiveDate::from_ymd_opt(2018, 2, 13).unwrap()));
        // Corpus Christi: Easter plus 60 days
        assert!(dates.contains(&NaiveDate::from_ymd_opt(2018, 5, 31).unwrap()));
    }
}
