use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{parse_bool, parse_i64_range};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Attendance,
    Schedule,
    Grades,
    Dashboard,
}

impl SetupSection {
    const ALL: [SetupSection; 4] = [
        SetupSection::Attendance,
        SetupSection::Schedule,
        SetupSection::Grades,
        SetupSection::Dashboard,
    ];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "attendance" => Some(Self::Attendance),
            "schedule" => Some(Self::Schedule),
            "grades" => Some(Self::Grades),
            "dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::Schedule => "schedule",
            Self::Grades => "grades",
            Self::Dashboard => "dashboard",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Attendance => "setup.attendance",
            Self::Schedule => "setup.schedule",
            Self::Grades => "setup.grades",
            Self::Dashboard => "setup.dashboard",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Attendance => json!({
            "targetPercent": 75,
            "calendarDays": 35
        }),
        SetupSection::Schedule => json!({
            "maxRepeatWeeks": 52,
            "defaultRoom": ""
        }),
        SetupSection::Grades => json!({
            "decimalPlaces": 2
        }),
        SetupSection::Dashboard => json!({
            "upcomingExamDays": 14,
            "pendingAssignmentLimit": 5,
            "showCompletedAssignments": false
        }),
    }
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        let value = match (section, k.as_str()) {
            (SetupSection::Attendance, "targetPercent") => {
                Value::from(parse_i64_range(v, k, 1, 100).map_err(|e| e.message)?)
            }
            (SetupSection::Attendance, "calendarDays") => {
                Value::from(parse_i64_range(v, k, 7, 366).map_err(|e| e.message)?)
            }
            (SetupSection::Schedule, "maxRepeatWeeks") => {
                Value::from(parse_i64_range(v, k, 1, 104).map_err(|e| e.message)?)
            }
            (SetupSection::Schedule, "defaultRoom") => Value::String(parse_string_max(v, k, 40)?),
            (SetupSection::Grades, "decimalPlaces") => {
                Value::from(parse_i64_range(v, k, 0, 4).map_err(|e| e.message)?)
            }
            (SetupSection::Dashboard, "upcomingExamDays") => {
                Value::from(parse_i64_range(v, k, 1, 120).map_err(|e| e.message)?)
            }
            (SetupSection::Dashboard, "pendingAssignmentLimit") => {
                Value::from(parse_i64_range(v, k, 1, 50).map_err(|e| e.message)?)
            }
            (SetupSection::Dashboard, "showCompletedAssignments") => {
                Value::Bool(parse_bool(v, k).map_err(|e| e.message)?)
            }
            _ => return Err(format!("unknown {} field: {}", section.name(), k)),
        };
        obj.insert(k.clone(), value);
    }
    Ok(())
}

fn load_section(conn: Option<&Connection>, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    let Some(conn) = conn else {
        return Ok(current);
    };
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults field by field.
            for (k, v) in saved_obj {
                let mut single = Map::new();
                single.insert(k.clone(), v.clone());
                let _ = merge_section_patch(section, &mut current, &single);
            }
        }
    }
    Ok(current)
}

/// Like `load_section`, but a settings read failure degrades to defaults.
fn section_or_default(state: &AppState, section: SetupSection) -> Value {
    match load_section(state.db.as_deref(), section) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(section = section.key(), error = %format!("{e:#}"), "failed to read settings; using defaults");
            default_section(section)
        }
    }
}

fn field_i64(v: &Value, key: &str, fallback: i64) -> i64 {
    v.get(key).and_then(|x| x.as_i64()).unwrap_or(fallback)
}

#[derive(Debug, Clone)]
pub struct AttendanceSetup {
    pub target_percent: f64,
    pub calendar_days: u32,
}

#[derive(Debug, Clone)]
pub struct ScheduleSetup {
    pub max_repeat_weeks: i64,
    pub default_room: String,
}

#[derive(Debug, Clone)]
pub struct DashboardSetup {
    pub upcoming_exam_days: i64,
    pub pending_assignment_limit: usize,
    pub show_completed_assignments: bool,
}

pub fn attendance_setup(state: &AppState) -> AttendanceSetup {
    let v = section_or_default(state, SetupSection::Attendance);
    AttendanceSetup {
        target_percent: field_i64(&v, "targetPercent", 75) as f64,
        calendar_days: field_i64(&v, "calendarDays", 35) as u32,
    }
}

pub fn schedule_setup(state: &AppState) -> ScheduleSetup {
    let v = section_or_default(state, SetupSection::Schedule);
    ScheduleSetup {
        max_repeat_weeks: field_i64(&v, "maxRepeatWeeks", 52),
        default_room: v
            .get("defaultRoom")
            .and_then(|x| x.as_str())
            .unwrap_or("")
            .to_string(),
    }
}

pub fn grade_decimal_places(state: &AppState) -> u32 {
    let v = section_or_default(state, SetupSection::Grades);
    field_i64(&v, "decimalPlaces", 2) as u32
}

pub fn dashboard_setup(state: &AppState) -> DashboardSetup {
    let v = section_or_default(state, SetupSection::Dashboard);
    DashboardSetup {
        upcoming_exam_days: field_i64(&v, "upcomingExamDays", 14).clamp(1, 120),
        pending_assignment_limit: field_i64(&v, "pendingAssignmentLimit", 5) as usize,
        show_completed_assignments: v
            .get("showCompletedAssignments")
            .and_then(|x| x.as_bool())
            .unwrap_or(false),
    }
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut out = Map::new();
    for section in SetupSection::ALL {
        match load_section(Some(conn), section) {
            Ok(v) => {
                out.insert(section.name().to_string(), v);
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(Some(conn), section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section.key(), "setup section updated");
    ok(
        &req.id,
        json!({ "ok": true, "section": section.name(), "values": current }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
