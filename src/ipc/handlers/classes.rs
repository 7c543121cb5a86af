use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::handlers::setup::schedule_setup;
use crate::ipc::helpers::{
    check_time_window, input, object, opt_date, opt_str, parse_bool, parse_date,
    parse_nonempty_string, parse_opt_string, parse_time, required_date, required_str,
    required_time, scope_param, unknown_field,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassSession, SessionStatus, SubjectIndex};
use crate::recurrence::{EditScope, SeriesTemplate};
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

fn parse_status(raw: &str) -> Result<SessionStatus, HandlerErr> {
    SessionStatus::parse(raw).ok_or_else(|| {
        HandlerErr::bad_params("status must be one of: attended, missed, holiday, cancelled")
    })
}

pub(super) fn session_json(index: &SubjectIndex<'_>, session: &ClassSession) -> serde_json::Value {
    let mut v = serde_json::to_value(session).unwrap_or_else(|_| json!({}));
    v["subject"] = json!(index.resolve(&session.subject_id));
    v["teacherName"] = json!(index.teacher_for(session));
    v
}

fn classes_list(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let from = opt_date(&req.params, "from")?;
    let to = opt_date(&req.params, "to")?;
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(HandlerErr::bad_params("from must not be after to"));
        }
    }
    let subject_filter = opt_str(&req.params, "subjectId")?;

    let index = SubjectIndex::new(state.organizer.subjects());
    let mut sessions: Vec<&ClassSession> = state
        .organizer
        .classes()
        .iter()
        .filter(|c| from.map_or(true, |f| c.date >= f))
        .filter(|c| to.map_or(true, |t| c.date <= t))
        .filter(|c| subject_filter.as_deref().map_or(true, |id| c.subject_id == id))
        .collect();
    sessions.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));

    let classes: Vec<serde_json::Value> = sessions.into_iter().map(|c| session_json(&index, c)).collect();
    let series: Vec<serde_json::Value> = state
        .organizer
        .recurrence_series()
        .iter()
        .filter(|s| subject_filter.as_deref().map_or(true, |id| s.subject_id == id))
        .map(|s| {
            let mut v = serde_json::to_value(s).unwrap_or_else(|_| json!({}));
            v["subject"] = json!(index.resolve(&s.subject_id));
            v
        })
        .collect();
    Ok(json!({ "classes": classes, "series": series }))
}

fn occurrence_count(start: NaiveDate, until: NaiveDate) -> i64 {
    (until - start).num_days() / 7 + 1
}

fn classes_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let fields = input(&req.params, "input")?;
    let subject_id = required_str(fields, "subjectId")?;
    let date = required_date(fields, "date")?;
    let start_time = required_time(fields, "startTime")?;
    let end_time = required_time(fields, "endTime")?;
    check_time_window(start_time, end_time)?;
    let teacher = opt_str(fields, "teacher")?;
    let schedule = schedule_setup(state);
    let room = opt_str(fields, "room")?.unwrap_or(schedule.default_room);

    if let Some(repeat_until) = opt_date(fields, "repeatUntil")? {
        if repeat_until < date {
            return Err(HandlerErr::bad_params("repeatUntil must not be before date"));
        }
        let count = occurrence_count(date, repeat_until);
        if count > schedule.max_repeat_weeks {
            return Err(HandlerErr::bad_params(format!(
                "series would create {} weekly classes; the limit is {}",
                count, schedule.max_repeat_weeks
            ))
            .with_details(json!({ "maxRepeatWeeks": schedule.max_repeat_weeks })));
        }
        let template = SeriesTemplate {
            subject_id,
            teacher,
            start_time,
            end_time,
            room,
            start_date: date,
            repeat_until,
        };
        let (series, instances) = state.organizer.schedule_series(&template);
        tracing::debug!(series = %series.id, count = instances.len(), "weekly series scheduled");
        let class_ids: Vec<&str> = instances.iter().map(|c| c.id.as_str()).collect();
        return Ok(json!({
            "recurrenceId": series.id,
            "classIds": class_ids,
            "count": instances.len()
        }));
    }

    let status = match opt_str(fields, "status")? {
        Some(s) => parse_status(&s)?,
        None => SessionStatus::Attended,
    };
    let session = ClassSession {
        id: Uuid::new_v4().to_string(),
        subject_id,
        teacher,
        date,
        start_time,
        end_time,
        room,
        status,
        recurrence_id: None,
        repeat_until: None,
    };
    let id = session.id.clone();
    state.organizer.add_class(session);
    Ok(json!({ "classIds": [id], "count": 1 }))
}

fn classes_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(&req.params, "classId")?;
    let scope = scope_param(&req.params)?;
    let patch = object(&req.params, "patch")?;
    let Some(mut edited) = state.organizer.class(&class_id).cloned() else {
        return Ok(json!({ "changed": false }));
    };

    for (k, v) in patch {
        match k.as_str() {
            "subjectId" => edited.subject_id = parse_nonempty_string(v, "patch.subjectId")?,
            "teacher" => edited.teacher = parse_opt_string(v, "patch.teacher")?,
            "date" => edited.date = parse_date(v, "patch.date")?,
            "startTime" => edited.start_time = parse_time(v, "patch.startTime")?,
            "endTime" => edited.end_time = parse_time(v, "patch.endTime")?,
            "room" => edited.room = parse_opt_string(v, "patch.room")?.unwrap_or_default(),
            "status" => edited.status = parse_status(&parse_nonempty_string(v, "patch.status")?)?,
            "detach" => {
                if parse_bool(v, "patch.detach")? {
                    if scope != EditScope::Single {
                        return Err(HandlerErr::bad_params(
                            "patch.detach is only allowed with scope single",
                        ));
                    }
                    edited.recurrence_id = None;
                    edited.repeat_until = None;
                }
            }
            _ => return Err(unknown_field("patch", k)),
        }
    }
    check_time_window(edited.start_time, edited.end_time)?;

    let affected = state.organizer.edit_class(&edited, scope);
    Ok(json!({ "changed": affected > 0, "affected": affected }))
}

fn classes_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(&req.params, "classId")?;
    let scope = scope_param(&req.params)?;
    let removed = state.organizer.delete_class(&class_id, scope);
    Ok(json!({ "changed": removed > 0, "removed": removed }))
}

fn classes_set_status(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(&req.params, "classId")?;
    let status = parse_status(&required_str(&req.params, "status")?)?;
    let changed = state.organizer.set_class_status(&class_id, status);
    Ok(json!({ "changed": changed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "classes.list" => classes_list(state, req),
        "classes.create" => classes_create(state, req),
        "classes.update" => classes_update(state, req),
        "classes.delete" => classes_delete(state, req),
        "classes.setStatus" => classes_set_status(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
