use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    input, object, opt_bool, opt_str, parse_bool, parse_date, parse_nonempty_string,
    parse_opt_string, required_date, required_str, today_param, unknown_field,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{AssignmentRecord, SubjectIndex};
use serde_json::json;
use uuid::Uuid;

pub(super) fn assignment_json(index: &SubjectIndex<'_>, a: &AssignmentRecord) -> serde_json::Value {
    let mut v = serde_json::to_value(a).unwrap_or_else(|_| json!({}));
    v["subject"] = json!(index.resolve(&a.subject_id));
    v
}

fn assignments_list(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let include_completed = opt_bool(&req.params, "includeCompleted", true)?;
    let subject_filter = opt_str(&req.params, "subjectId")?;
    let today = today_param(&req.params)?;

    let index = SubjectIndex::new(state.organizer.subjects());
    let mut rows: Vec<&AssignmentRecord> = state
        .organizer
        .assignments()
        .iter()
        .filter(|a| include_completed || !a.completed)
        .filter(|a| subject_filter.as_deref().map_or(true, |id| a.subject_id == id))
        .collect();
    rows.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.title.cmp(&b.title)));

    let assignments: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|a| {
            let mut v = assignment_json(&index, a);
            v["overdue"] = json!(!a.completed && a.due_date < today);
            v
        })
        .collect();
    Ok(json!({ "assignments": assignments }))
}

fn assignments_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let fields = input(&req.params, "input")?;
    let assignment = AssignmentRecord {
        id: Uuid::new_v4().to_string(),
        title: required_str(fields, "title")?,
        subject_id: required_str(fields, "subjectId")?,
        due_date: required_date(fields, "dueDate")?,
        description: opt_str(fields, "description")?.unwrap_or_default(),
        completed: opt_bool(fields, "completed", false)?,
    };
    let id = assignment.id.clone();
    state.organizer.create_assignment(assignment);
    Ok(json!({ "assignmentId": id }))
}

fn assignments_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = required_str(&req.params, "assignmentId")?;
    let patch = object(&req.params, "patch")?;
    let Some(mut assignment) = state.organizer.assignment(&assignment_id).cloned() else {
        return Ok(json!({ "changed": false }));
    };

    for (k, v) in patch {
        match k.as_str() {
            "title" => assignment.title = parse_nonempty_string(v, "patch.title")?,
            "subjectId" => assignment.subject_id = parse_nonempty_string(v, "patch.subjectId")?,
            "dueDate" => assignment.due_date = parse_date(v, "patch.dueDate")?,
            "description" => {
                assignment.description = parse_opt_string(v, "patch.description")?.unwrap_or_default()
            }
            "completed" => assignment.completed = parse_bool(v, "patch.completed")?,
            _ => return Err(unknown_field("patch", k)),
        }
    }
    let changed = state.organizer.update_assignment(assignment);
    Ok(json!({ "changed": changed }))
}

fn assignments_toggle(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = required_str(&req.params, "assignmentId")?;
    Ok(match state.organizer.toggle_assignment(&assignment_id) {
        Some(completed) => json!({ "changed": true, "completed": completed }),
        None => json!({ "changed": false }),
    })
}

fn assignments_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = required_str(&req.params, "assignmentId")?;
    let changed = state.organizer.delete_assignment(&assignment_id);
    Ok(json!({ "changed": changed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "assignments.list" => assignments_list(state, req),
        "assignments.create" => assignments_create(state, req),
        "assignments.update" => assignments_update(state, req),
        "assignments.toggle" => assignments_toggle(state, req),
        "assignments.delete" => assignments_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
