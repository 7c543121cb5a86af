use crate::attendance::{build_calendar_cells, daily_tallies, overall_attendance, subject_summaries};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::handlers::setup::attendance_setup;
use crate::ipc::helpers::{opt_date, opt_u32_range, parse_f64_range, today_param};
use crate::ipc::types::{AppState, Request};
use chrono::Days;
use serde_json::json;

fn attendance_subjects(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let setup = attendance_setup(state);
    let target = match req.params.get("targetPercent") {
        Some(v) if !v.is_null() => parse_f64_range(v, "targetPercent", 1.0, 100.0)?,
        _ => setup.target_percent,
    };
    let rows = subject_summaries(state.organizer.subjects(), state.organizer.classes(), target);
    let overall = overall_attendance(state.organizer.classes());
    Ok(json!({
        "targetPercent": target,
        "subjects": rows,
        "overall": {
            "attended": overall.attended,
            "total": overall.total,
            "percent": overall.percent()
        }
    }))
}

/// Without `windowStart` the window ends on `today` and spans `setup.attendance.calendarDays`.
fn attendance_calendar(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let setup = attendance_setup(state);
    let today = today_param(&req.params)?;
    let num_days = opt_u32_range(&req.params, "numDays", 1, 366)?.unwrap_or(setup.calendar_days);
    let window_start = match opt_date(&req.params, "windowStart")? {
        Some(d) => d,
        None => today
            .checked_sub_days(Days::new(u64::from(num_days) - 1))
            .ok_or_else(|| HandlerErr::bad_params("calendar window starts before the earliest date"))?,
    };

    let tallies = daily_tallies(state.organizer.classes());
    let cells = build_calendar_cells(&tallies, window_start, num_days, today);
    Ok(json!({
        "windowStart": window_start,
        "numDays": num_days,
        "today": today,
        "cells": cells
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.subjects" => attendance_subjects(state, req),
        "attendance.calendar" => attendance_calendar(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
