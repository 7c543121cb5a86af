use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    input, object, opt_str, parse_nonempty_string, parse_opt_string, required_str,
    unknown_field,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{SubjectIndex, SubjectRecord};
use serde_json::json;
use uuid::Uuid;

fn parse_color(raw: Option<String>) -> Result<String, HandlerErr> {
    let Some(color) = raw else {
        return Ok(String::new());
    };
    let hex = color.strip_prefix('#').unwrap_or(&color);
    if !matches!(hex.len(), 3 | 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HandlerErr::bad_params("color must be a #rgb or #rrggbb hex value"));
    }
    Ok(format!("#{}", hex.to_ascii_lowercase()))
}

fn subjects_list(state: &AppState) -> serde_json::Value {
    let index = SubjectIndex::new(state.organizer.subjects());
    let subjects: Vec<serde_json::Value> = state
        .organizer
        .subjects()
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "teacher": s.teacher,
                "color": index.resolve(&s.id).color,
                "classCount": state.organizer.classes().iter().filter(|c| c.subject_id == s.id).count()
            })
        })
        .collect();
    json!({ "subjects": subjects })
}

fn subjects_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let fields = input(&req.params, "input")?;
    let subject = SubjectRecord {
        id: Uuid::new_v4().to_string(),
        name: required_str(fields, "name")?,
        teacher: opt_str(fields, "teacher")?.unwrap_or_default(),
        color: parse_color(opt_str(fields, "color")?)?,
    };
    let id = subject.id.clone();
    state.organizer.create_subject(subject);
    Ok(json!({ "subjectId": id }))
}

fn subjects_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = required_str(&req.params, "subjectId")?;
    let patch = object(&req.params, "patch")?;
    let Some(mut subject) = state
        .organizer
        .subjects()
        .iter()
        .find(|s| s.id == subject_id)
        .cloned()
    else {
        return Ok(json!({ "changed": false }));
    };

    for (k, v) in patch {
        match k.as_str() {
            "name" => subject.name = parse_nonempty_string(v, "patch.name")?,
            "teacher" => subject.teacher = parse_opt_string(v, "patch.teacher")?.unwrap_or_default(),
            "color" => subject.color = parse_color(parse_opt_string(v, "patch.color")?)?,
            _ => return Err(unknown_field("patch", k)),
        }
    }
    let changed = state.organizer.update_subject(subject);
    Ok(json!({ "changed": changed }))
}

fn subjects_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = required_str(&req.params, "subjectId")?;
    // Classes, assignments and exams keep the dangling id and render with fallbacks.
    let changed = state.organizer.delete_subject(&subject_id);
    Ok(json!({ "changed": changed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "subjects.list" => Ok(subjects_list(state)),
        "subjects.create" => subjects_create(state, req),
        "subjects.update" => subjects_update(state, req),
        "subjects.delete" => subjects_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
