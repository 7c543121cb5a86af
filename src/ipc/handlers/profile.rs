use crate::grades::{MAX_SEMESTER, MIN_SEMESTER};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{object, parse_i64_range, parse_opt_string, unknown_field};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn parse_opt_int(v: &Value, key: &str, min: i64, max: i64) -> Result<Option<i64>, HandlerErr> {
    if v.is_null() {
        return Ok(None);
    }
    parse_i64_range(v, key, min, max).map(Some)
}

fn parse_email(v: &Value) -> Result<String, HandlerErr> {
    let email = parse_opt_string(v, "patch.email")?.unwrap_or_default();
    if !email.is_empty() && !email.contains('@') {
        return Err(HandlerErr::bad_params("patch.email must be an email address"));
    }
    Ok(email)
}

fn profile_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let patch = object(&req.params, "patch")?;
    let mut profile = state.organizer.profile().clone();
    for (k, v) in patch {
        match k.as_str() {
            "fullName" => profile.full_name = parse_opt_string(v, "patch.fullName")?.unwrap_or_default(),
            "email" => profile.email = parse_email(v)?,
            "institution" => {
                profile.institution = parse_opt_string(v, "patch.institution")?.unwrap_or_default()
            }
            "program" => profile.program = parse_opt_string(v, "patch.program")?.unwrap_or_default(),
            "currentSemester" => {
                profile.current_semester = parse_opt_int(
                    v,
                    "patch.currentSemester",
                    i64::from(MIN_SEMESTER),
                    i64::from(MAX_SEMESTER),
                )?
                .map(|n| n as u8)
            }
            "enrollmentYear" => {
                profile.enrollment_year =
                    parse_opt_int(v, "patch.enrollmentYear", 1900, 2100)?.map(|n| n as i32)
            }
            _ => return Err(unknown_field("patch", k)),
        }
    }
    state.organizer.set_profile(profile);
    Ok(json!({ "ok": true, "profile": state.organizer.profile() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "profile.get" => Ok(json!({ "profile": state.organizer.profile() })),
        "profile.update" => profile_update(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
