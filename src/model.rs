use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const FALLBACK_SUBJECT_NAME: &str = "Unknown subject";
pub const FALLBACK_SUBJECT_COLOR: &str = "#9ca3af";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Attended,
    Missed,
    Holiday,
    Cancelled,
}

impl SessionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attended" => Some(Self::Attended),
            "missed" => Some(Self::Missed),
            "holiday" => Some(Self::Holiday),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Holiday and cancelled sessions never happened as far as attendance is concerned.
    pub fn counts_toward_attendance(self) -> bool {
        matches!(self, Self::Attended | Self::Missed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    pub id: String,
    pub subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub room: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub id: String,
    pub title: String,
    pub subject_id: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "Mid-term")]
    MidTerm,
    Final,
    Quiz,
}

impl ExamType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mid-term" | "midterm" | "mid term" => Some(Self::MidTerm),
            "final" => Some(Self::Final),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    pub id: String,
    pub subject_id: String,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub venue: String,
    #[serde(rename = "type")]
    pub exam_type: ExamType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSubjectRecord {
    pub id: String,
    pub semester: u8,
    pub subject_name: String,
    pub credits: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid_sem_marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ia_marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_sem_marks: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub program: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_semester: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_year: Option<i32>,
}

/// Resolved view of a subject reference. Orphaned ids resolve to the fallback values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub subject_id: String,
    pub name: String,
    pub teacher: String,
    pub color: String,
    pub resolved: bool,
}

/// Id -> subject lookup built once per read.
pub struct SubjectIndex<'a> {
    by_id: HashMap<&'a str, &'a SubjectRecord>,
}

impl<'a> SubjectIndex<'a> {
    pub fn new(subjects: &'a [SubjectRecord]) -> Self {
        let by_id = subjects.iter().map(|s| (s.id.as_str(), s)).collect();
        Self { by_id }
    }

    pub fn get(&self, subject_id: &str) -> Option<&'a SubjectRecord> {
        self.by_id.get(subject_id).copied()
    }

    pub fn resolve(&self, subject_id: &str) -> SubjectRef {
        match self.get(subject_id) {
            Some(s) => SubjectRef {
                subject_id: subject_id.to_string(),
                name: s.name.clone(),
                teacher: s.teacher.clone(),
                color: if s.color.trim().is_empty() {
                    FALLBACK_SUBJECT_COLOR.to_string()
                } else {
                    s.color.clone()
                },
                resolved: true,
            },
            None => SubjectRef {
                subject_id: subject_id.to_string(),
                name: FALLBACK_SUBJECT_NAME.to_string(),
                teacher: String::new(),
                color: FALLBACK_SUBJECT_COLOR.to_string(),
                resolved: false,
            },
        }
    }

    /// Session-level teacher overrides the subject's teacher when set.
    pub fn teacher_for(&self, session: &ClassSession) -> String {
        session
            .teacher
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.resolve(&session.subject_id).teacher)
    }
}
