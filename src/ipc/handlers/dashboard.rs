use crate::attendance::{overall_attendance, subject_summaries};
use crate::grades::{round_to, transcript_of};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::handlers::assignments::assignment_json;
use crate::ipc::handlers::classes::session_json;
use crate::ipc::handlers::exams::exam_json;
use crate::ipc::handlers::setup::{attendance_setup, dashboard_setup, grade_decimal_places};
use crate::ipc::helpers::{now_param, opt_date};
use crate::ipc::types::{AppState, Request};
use crate::model::{AssignmentRecord, ClassSession, ExamRecord, SubjectIndex};
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use serde_json::json;

fn dashboard_open(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let now = now_param(&req.params)?;
    let today = opt_date(&req.params, "today")?.unwrap_or_else(|| now.date());
    let dashboard = dashboard_setup(state);
    let target = attendance_setup(state).target_percent;
    let places = grade_decimal_places(state);
    let org = &state.organizer;
    let index = SubjectIndex::new(org.subjects());

    let mut todays: Vec<&ClassSession> = org.classes().iter().filter(|c| c.date == today).collect();
    todays.sort_by_key(|c| c.start_time);
    let todays_classes: Vec<serde_json::Value> =
        todays.into_iter().map(|c| session_json(&index, c)).collect();

    let mut pending: Vec<&AssignmentRecord> = org
        .assignments()
        .iter()
        .filter(|a| dashboard.show_completed_assignments || !a.completed)
        .collect();
    pending.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then_with(|| a.due_date.cmp(&b.due_date))
    });
    let pending_total = org.assignments().iter().filter(|a| !a.completed).count();
    let overdue = org
        .assignments()
        .iter()
        .filter(|a| !a.completed && a.due_date < today)
        .count();
    let assignments: Vec<serde_json::Value> = pending
        .into_iter()
        .take(dashboard.pending_assignment_limit)
        .map(|a| assignment_json(&index, a))
        .collect();

    let horizon = now
        .checked_add_signed(ChronoDuration::days(dashboard.upcoming_exam_days))
        .unwrap_or(NaiveDateTime::MAX);
    let mut upcoming: Vec<&ExamRecord> = org
        .exams()
        .iter()
        .filter(|e| e.date >= now && e.date <= horizon)
        .collect();
    upcoming.sort_by_key(|e| e.date);
    let exams: Vec<serde_json::Value> = upcoming.into_iter().map(|e| exam_json(&index, e, now)).collect();

    let overall = overall_attendance(org.classes());
    let below_target: Vec<_> = subject_summaries(org.subjects(), org.classes(), target)
        .into_iter()
        .filter(|row| row.below_target)
        .collect();

    let transcript = transcript_of(org.grades());
    let profile = org.profile();

    Ok(json!({
        "today": today,
        "profile": {
            "fullName": profile.full_name,
            "currentSemester": profile.current_semester
        },
        "todaysClasses": todays_classes,
        "pendingAssignments": {
            "total": pending_total,
            "overdue": overdue,
            "items": assignments
        },
        "upcomingExams": exams,
        "attendance": {
            "attended": overall.attended,
            "total": overall.total,
            "percent": round_to(overall.percent(), places),
            "targetPercent": target,
            "belowTarget": below_target
        },
        "cgpa": round_to(transcript.cgpa, places),
        "earnedCredits": transcript.earned_credits
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.open" => Some(respond(&req.id, dashboard_open(state, req))),
        _ => None,
    }
}
