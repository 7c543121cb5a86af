use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    input, now_param, object, opt_bool, opt_str, parse_datetime, parse_nonempty_string,
    parse_opt_string, required_datetime, required_str, unknown_field,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ExamRecord, ExamType, SubjectIndex};
use chrono::NaiveDateTime;
use serde_json::json;
use uuid::Uuid;

fn parse_exam_type(raw: &str) -> Result<ExamType, HandlerErr> {
    ExamType::parse(raw)
        .ok_or_else(|| HandlerErr::bad_params("type must be one of: Mid-term, Final, Quiz"))
}

pub(super) fn exam_json(
    index: &SubjectIndex<'_>,
    exam: &ExamRecord,
    now: NaiveDateTime,
) -> serde_json::Value {
    let mut v = serde_json::to_value(exam).unwrap_or_else(|_| json!({}));
    v["subject"] = json!(index.resolve(&exam.subject_id));
    // Whole days from today's date to the exam's date; negative once it has passed.
    v["daysUntil"] = json!((exam.date.date() - now.date()).num_days());
    v
}

fn exams_list(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let upcoming_only = opt_bool(&req.params, "upcomingOnly", false)?;
    let now = now_param(&req.params)?;

    let index = SubjectIndex::new(state.organizer.subjects());
    let mut rows: Vec<&ExamRecord> = state
        .organizer
        .exams()
        .iter()
        .filter(|e| !upcoming_only || e.date >= now)
        .collect();
    rows.sort_by_key(|e| e.date);

    let exams: Vec<serde_json::Value> = rows.into_iter().map(|e| exam_json(&index, e, now)).collect();
    Ok(json!({ "exams": exams }))
}

fn exams_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let fields = input(&req.params, "input")?;
    let exam = ExamRecord {
        id: Uuid::new_v4().to_string(),
        subject_id: required_str(fields, "subjectId")?,
        date: required_datetime(fields, "date")?,
        venue: opt_str(fields, "venue")?.unwrap_or_default(),
        exam_type: parse_exam_type(&required_str(fields, "type")?)?,
    };
    let id = exam.id.clone();
    state.organizer.create_exam(exam);
    Ok(json!({ "examId": id }))
}

fn exams_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let exam_id = required_str(&req.params, "examId")?;
    let patch = object(&req.params, "patch")?;
    let Some(mut exam) = state.organizer.exams().iter().find(|e| e.id == exam_id).cloned() else {
        return Ok(json!({ "changed": false }));
    };

    for (k, v) in patch {
        match k.as_str() {
            "subjectId" => exam.subject_id = parse_nonempty_string(v, "patch.subjectId")?,
            "date" => exam.date = parse_datetime(v, "patch.date")?,
            "venue" => exam.venue = parse_opt_string(v, "patch.venue")?.unwrap_or_default(),
            "type" => exam.exam_type = parse_exam_type(&parse_nonempty_string(v, "patch.type")?)?,
            _ => return Err(unknown_field("patch", k)),
        }
    }
    let changed = state.organizer.update_exam(exam);
    Ok(json!({ "changed": changed }))
}

fn exams_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let exam_id = required_str(&req.params, "examId")?;
    let changed = state.organizer.delete_exam(&exam_id);
    Ok(json!({ "changed": changed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "exams.list" => exams_list(state, req),
        "exams.create" => exams_create(state, req),
        "exams.update" => exams_update(state, req),
        "exams.delete" => exams_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
