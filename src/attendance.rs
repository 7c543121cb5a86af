use crate::model::{ClassSession, SessionStatus, SubjectIndex, SubjectRecord};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Heat-map level for days that have not happened yet.
pub const FUTURE_LEVEL: i8 = -1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTally {
    pub attended: u32,
    pub total: u32,
}

impl AttendanceTally {
    pub fn record(&mut self, status: SessionStatus) {
        match status {
            SessionStatus::Attended => {
                self.attended += 1;
                self.total += 1;
            }
            SessionStatus::Missed => self.total += 1,
            SessionStatus::Holiday | SessionStatus::Cancelled => {}
        }
    }

    /// 0 when no class has been held yet.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * f64::from(self.attended) / f64::from(self.total)
        }
    }
}

pub fn subject_attendance(sessions: &[ClassSession], subject_id: &str) -> AttendanceTally {
    let mut tally = AttendanceTally::default();
    for s in sessions.iter().filter(|s| s.subject_id == subject_id) {
        tally.record(s.status);
    }
    tally
}

pub fn daily_attendance_level(present: u32, total: u32) -> i8 {
    if total == 0 {
        return 0;
    }
    let pct = 100.0 * f64::from(present) / f64::from(total);
    if pct <= 0.0 {
        return 0;
    }
    let mut level = 1;
    if pct >= 25.0 {
        level = 2;
    }
    if pct >= 50.0 {
        level = 3;
    }
    if pct >= 75.0 {
        level = 4;
    }
    if pct >= 100.0 {
        level = 5;
    }
    level
}

/// Per-day present/total over every subject, skipping holiday and cancelled sessions.
pub fn daily_tallies(sessions: &[ClassSession]) -> BTreeMap<NaiveDate, AttendanceTally> {
    let mut out: BTreeMap<NaiveDate, AttendanceTally> = BTreeMap::new();
    for s in sessions {
        if !s.status.counts_toward_attendance() {
            continue;
        }
        out.entry(s.date).or_default().record(s.status);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub present: u32,
    pub total: u32,
    pub level: i8,
}

/// One cell per day from `window_start`. The window is cut short at the last date chrono
/// can represent.
pub fn build_calendar_cells(
    data: &BTreeMap<NaiveDate, AttendanceTally>,
    window_start: NaiveDate,
    num_days: u32,
    today: NaiveDate,
) -> Vec<CalendarCell> {
    (0..num_days)
        .map_while(|offset| window_start.checked_add_days(Days::new(u64::from(offset))))
        .map(|date| {
            let tally = data.get(&date).copied().unwrap_or_default();
            let level = if date > today {
                FUTURE_LEVEL
            } else {
                daily_attendance_level(tally.attended, tally.total)
            };
            CalendarCell {
                date,
                present: tally.attended,
                total: tally.total,
                level,
            }
        })
        .collect()
}

/// Consecutive attended classes needed to reach `target_percent`. `None` when the target
/// is 100% and a class has already been missed.
pub fn classes_needed_for_target(tally: AttendanceTally, target_percent: f64) -> Option<u32> {
    if tally.total > 0 && tally.percent() >= target_percent {
        return Some(0);
    }
    if target_percent >= 100.0 {
        return if tally.attended == tally.total {
            Some(0)
        } else {
            None
        };
    }
    if target_percent <= 0.0 {
        return Some(0);
    }
    // (a + n) / (t + n) >= p/100  =>  n >= (p*t - 100*a) / (100 - p)
    let a = f64::from(tally.attended);
    let t = f64::from(tally.total);
    let n = ((target_percent * t - 100.0 * a) / (100.0 - target_percent))
        .ceil()
        .max(0.0);
    Some(n as u32)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAttendanceRow {
    pub subject_id: String,
    pub name: String,
    pub color: String,
    pub attended: u32,
    pub total: u32,
    pub percent: f64,
    pub below_target: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes_needed: Option<u32>,
}

/// One row per known subject, in subject order. A subject with no held classes is never
/// flagged as below target.
pub fn subject_summaries(
    subjects: &[SubjectRecord],
    sessions: &[ClassSession],
    target_percent: f64,
) -> Vec<SubjectAttendanceRow> {
    let index = SubjectIndex::new(subjects);
    subjects
        .iter()
        .map(|subject| {
            let tally = subject_attendance(sessions, &subject.id);
            let resolved = index.resolve(&subject.id);
            let percent = tally.percent();
            SubjectAttendanceRow {
                subject_id: subject.id.clone(),
                name: resolved.name,
                color: resolved.color,
                attended: tally.attended,
                total: tally.total,
                percent,
                below_target: tally.total > 0 && percent < target_percent,
                classes_needed: classes_needed_for_target(tally, target_percent),
            }
        })
        .collect()
}

pub fn overall_attendance(sessions: &[ClassSession]) -> AttendanceTally {
    let mut tally = AttendanceTally::default();
    for s in sessions {
        tally.record(s.status);
    }
    tally
}
