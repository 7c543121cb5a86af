use crate::ipc::error::HandlerErr;
use crate::recurrence::EditScope;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

pub fn object<'a>(params: &'a Value, key: &str) -> Result<&'a Map<String, Value>, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an object", key)))
}

/// Like [`object`], but keeps the `Value` so the keyed helpers below apply to it.
pub fn input<'a>(params: &'a Value, key: &str) -> Result<&'a Value, HandlerErr> {
    params
        .get(key)
        .filter(|v| v.is_object())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an object", key)))
}

pub fn required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn opt_str(params: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) => parse_opt_string(v, key),
    }
}

pub fn parse_opt_string(v: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    if v.is_null() {
        return Ok(None);
    }
    let s = v
        .as_str()
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be string or null", key)))?
        .trim()
        .to_string();
    if s.is_empty() {
        Ok(None)
    } else {
        Ok(Some(s))
    }
}

pub fn parse_nonempty_string(v: &Value, key: &str) -> Result<String, HandlerErr> {
    parse_opt_string(v, key)?
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must not be empty", key)))
}

/// Accepted calendar years. Keeps day arithmetic on parsed dates far from chrono's limits.
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

fn check_year(year: i32, key: &str) -> Result<(), HandlerErr> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(HandlerErr::bad_params(format!(
            "{} year must be between {} and {}",
            key, MIN_YEAR, MAX_YEAR
        )));
    }
    Ok(())
}

pub fn parse_date_str(s: &str, key: &str) -> Result<NaiveDate, HandlerErr> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))?;
    check_year(date.year(), key)?;
    Ok(date)
}

pub fn parse_time_str(s: &str, key: &str) -> Result<NaiveTime, HandlerErr> {
    let t = s.trim();
    NaiveTime::parse_from_str(t, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
        .map_err(|_| HandlerErr::bad_params(format!("{} must be HH:MM", key)))
}

pub fn parse_datetime_str(s: &str, key: &str) -> Result<NaiveDateTime, HandlerErr> {
    let t = s.trim();
    let dt = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(t, fmt).ok())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DDTHH:MM", key)))?;
    check_year(dt.year(), key)?;
    Ok(dt)
}

pub fn parse_date(v: &Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let s = parse_nonempty_string(v, key)?;
    parse_date_str(&s, key)
}

pub fn parse_time(v: &Value, key: &str) -> Result<NaiveTime, HandlerErr> {
    let s = parse_nonempty_string(v, key)?;
    parse_time_str(&s, key)
}

pub fn parse_datetime(v: &Value, key: &str) -> Result<NaiveDateTime, HandlerErr> {
    let s = parse_nonempty_string(v, key)?;
    parse_datetime_str(&s, key)
}

pub fn required_date(params: &Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let s = required_str(params, key)?;
    parse_date_str(&s, key)
}

pub fn required_time(params: &Value, key: &str) -> Result<NaiveTime, HandlerErr> {
    let s = required_str(params, key)?;
    parse_time_str(&s, key)
}

pub fn required_datetime(params: &Value, key: &str) -> Result<NaiveDateTime, HandlerErr> {
    let s = required_str(params, key)?;
    parse_datetime_str(&s, key)
}

pub fn opt_date(params: &Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    match opt_str(params, key)? {
        Some(s) => parse_date_str(&s, key).map(Some),
        None => Ok(None),
    }
}

pub fn opt_datetime(params: &Value, key: &str) -> Result<Option<NaiveDateTime>, HandlerErr> {
    match opt_str(params, key)? {
        Some(s) => parse_datetime_str(&s, key).map(Some),
        None => Ok(None),
    }
}

pub fn parse_bool(v: &Value, key: &str) -> Result<bool, HandlerErr> {
    v.as_bool()
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be boolean", key)))
}

pub fn opt_bool(params: &Value, key: &str, default: bool) -> Result<bool, HandlerErr> {
    match params.get(key) {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => parse_bool(v, key),
    }
}

pub fn parse_f64_range(v: &Value, key: &str, min: f64, max: f64) -> Result<f64, HandlerErr> {
    let n = v
        .as_f64()
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key)))?;
    if !(min..=max).contains(&n) {
        return Err(HandlerErr::bad_params(format!(
            "{} must be in {}..={}",
            key, min, max
        )));
    }
    Ok(n)
}

/// Marks may be absent or null, which means "not yet entered".
pub fn parse_opt_marks(v: &Value, key: &str, max: f64) -> Result<Option<f64>, HandlerErr> {
    if v.is_null() {
        return Ok(None);
    }
    parse_f64_range(v, key, 0.0, max).map(Some)
}

pub fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, HandlerErr> {
    let n = v
        .as_i64()
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be integer", key)))?;
    if !(min..=max).contains(&n) {
        return Err(HandlerErr::bad_params(format!(
            "{} must be in {}..={}",
            key, min, max
        )));
    }
    Ok(n)
}

pub fn opt_u32_range(params: &Value, key: &str, min: i64, max: i64) -> Result<Option<u32>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => parse_i64_range(v, key, min, max).map(|n| Some(n as u32)),
    }
}

pub fn scope_param(params: &Value) -> Result<EditScope, HandlerErr> {
    match opt_str(params, "scope")? {
        None => Ok(EditScope::Single),
        Some(s) => EditScope::parse(&s)
            .ok_or_else(|| HandlerErr::bad_params("scope must be one of: single, future, all")),
    }
}

/// `params.today` lets callers pin the current date; otherwise local time is used.
pub fn today_param(params: &Value) -> Result<NaiveDate, HandlerErr> {
    Ok(opt_date(params, "today")?.unwrap_or_else(|| Local::now().date_naive()))
}

pub fn now_param(params: &Value) -> Result<NaiveDateTime, HandlerErr> {
    Ok(opt_datetime(params, "now")?.unwrap_or_else(|| Local::now().naive_local()))
}

pub fn check_time_window(start: NaiveTime, end: NaiveTime) -> Result<(), HandlerErr> {
    if start >= end {
        return Err(HandlerErr::bad_params("startTime must be before endTime"));
    }
    Ok(())
}

pub fn unknown_field(section: &str, key: &str) -> HandlerErr {
    HandlerErr::bad_params(format!("unknown {} field: {}", section, key))
}
