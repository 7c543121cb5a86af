use crate::grades::{
    grade_details_of, round_to, transcript_of, END_SEM_MAX, IA_MAX, MAX_SEMESTER, MID_SEM_MAX,
    MIN_SEMESTER,
};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::handlers::setup::grade_decimal_places;
use crate::ipc::helpers::{
    input, object, opt_u32_range, parse_f64_range, parse_i64_range, parse_nonempty_string,
    parse_opt_marks, required_str, unknown_field,
};
use crate::ipc::types::{AppState, Request};
use crate::model::GradeSubjectRecord;
use serde_json::{json, Value};
use uuid::Uuid;

const MAX_CREDITS: f64 = 40.0;

fn parse_semester(v: &Value, key: &str) -> Result<u8, HandlerErr> {
    parse_i64_range(v, key, i64::from(MIN_SEMESTER), i64::from(MAX_SEMESTER)).map(|n| n as u8)
}

fn parse_credits(v: &Value, key: &str) -> Result<f64, HandlerErr> {
    let credits = parse_f64_range(v, key, 0.0, MAX_CREDITS)?;
    if credits <= 0.0 {
        return Err(HandlerErr::bad_params(format!("{} must be > 0", key)));
    }
    Ok(credits)
}

fn marks_field(fields: &Value, key: &str, max: f64) -> Result<Option<f64>, HandlerErr> {
    match fields.get(key) {
        None => Ok(None),
        Some(v) => parse_opt_marks(v, key, max),
    }
}

fn graded_json(record: &GradeSubjectRecord) -> Value {
    let mut v = serde_json::to_value(record).unwrap_or_else(|_| json!({}));
    v["details"] = json!(grade_details_of(record));
    v
}

fn grades_list(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let semester = opt_u32_range(
        &req.params,
        "semester",
        i64::from(MIN_SEMESTER),
        i64::from(MAX_SEMESTER),
    )?;
    let mut rows: Vec<&GradeSubjectRecord> = state
        .organizer
        .grades()
        .iter()
        .filter(|g| semester.map_or(true, |s| u32::from(g.semester) == s))
        .collect();
    rows.sort_by(|a, b| {
        a.semester
            .cmp(&b.semester)
            .then_with(|| a.subject_name.cmp(&b.subject_name))
    });
    let grades: Vec<Value> = rows.into_iter().map(graded_json).collect();
    Ok(json!({ "grades": grades }))
}

fn grades_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let fields = input(&req.params, "input")?;
    let semester = fields
        .get("semester")
        .ok_or_else(|| HandlerErr::bad_params("missing semester"))?;
    let credits = fields
        .get("credits")
        .ok_or_else(|| HandlerErr::bad_params("missing credits"))?;
    let record = GradeSubjectRecord {
        id: Uuid::new_v4().to_string(),
        semester: parse_semester(semester, "semester")?,
        subject_name: required_str(fields, "subjectName")?,
        credits: parse_credits(credits, "credits")?,
        mid_sem_marks: marks_field(fields, "midSemMarks", MID_SEM_MAX)?,
        ia_marks: marks_field(fields, "iaMarks", IA_MAX)?,
        end_sem_marks: marks_field(fields, "endSemMarks", END_SEM_MAX)?,
    };
    let details = grade_details_of(&record);
    let id = record.id.clone();
    state.organizer.create_grade(record);
    Ok(json!({ "gradeId": id, "details": details }))
}

fn grades_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let grade_id = required_str(&req.params, "gradeId")?;
    let patch = object(&req.params, "patch")?;
    let Some(mut record) = state.organizer.grade(&grade_id).cloned() else {
        return Ok(json!({ "changed": false }));
    };

    for (k, v) in patch {
        match k.as_str() {
            "semester" => record.semester = parse_semester(v, "patch.semester")?,
            "subjectName" => record.subject_name = parse_nonempty_string(v, "patch.subjectName")?,
            "credits" => record.credits = parse_credits(v, "patch.credits")?,
            "midSemMarks" => record.mid_sem_marks = parse_opt_marks(v, "patch.midSemMarks", MID_SEM_MAX)?,
            "iaMarks" => record.ia_marks = parse_opt_marks(v, "patch.iaMarks", IA_MAX)?,
            "endSemMarks" => record.end_sem_marks = parse_opt_marks(v, "patch.endSemMarks", END_SEM_MAX)?,
            _ => return Err(unknown_field("patch", k)),
        }
    }
    let details = grade_details_of(&record);
    let changed = state.organizer.update_grade(record);
    Ok(json!({ "changed": changed, "details": details }))
}

fn grades_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let grade_id = required_str(&req.params, "gradeId")?;
    let changed = state.organizer.delete_grade(&grade_id);
    Ok(json!({ "changed": changed }))
}

fn grades_details(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let grade_id = required_str(&req.params, "gradeId")?;
    let Some(record) = state.organizer.grade(&grade_id) else {
        return Err(HandlerErr::new("not_found", "grade not found"));
    };
    Ok(graded_json(record))
}

fn grades_summary(state: &AppState) -> Result<Value, HandlerErr> {
    let places = grade_decimal_places(state);
    let transcript = transcript_of(state.organizer.grades());
    let semesters: Vec<Value> = transcript
        .semesters
        .iter()
        .map(|s| {
            json!({
                "semester": s.semester,
                "subjects": s.subjects,
                "totalCredits": s.total_credits,
                "completedCount": s.completed_count,
                "inProgressCount": s.in_progress_count,
                "sgpa": s.sgpa.map(|x| round_to(x, places)),
            })
        })
        .collect();
    Ok(json!({
        "semesters": semesters,
        "cgpa": round_to(transcript.cgpa, places),
        "earnedCredits": transcript.earned_credits,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "grades.list" => grades_list(state, req),
        "grades.create" => grades_create(state, req),
        "grades.update" => grades_update(state, req),
        "grades.delete" => grades_delete(state, req),
        "grades.details" => grades_details(state, req),
        "grades.summary" => grades_summary(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
