use chrono::{Datelike, Local, NaiveDate, TimeZone};

const YMD_FORMAT: &str = "%Y-%m-%d";

pub fn today_ymd() -> String {
    Local::now().format(YMD_FORMAT).to_string()
}

/// Local calendar date of an epoch-millisecond timestamp.
pub fn ymd_from_ms(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(at) => at.format(YMD_FORMAT).to_string(),
        None => today_ymd(),
    }
}

/// `2024-03-05` becomes `24. 3. 5`. Anything that is not a strict
/// `YYYY-MM-DD` date is returned unchanged.
pub fn format_ymd_short(ymd: &str) -> String {
    if ymd.len() != 10 {
        return ymd.to_string();
    }
    match NaiveDate::parse_from_str(ymd, YMD_FORMAT) {
        Ok(date) => format!("{}. {}. {}", date.year() % 100, date.month(), date.day()),
        Err(_) => ymd.to_string(),
    }
}
