use crate::model::GradeSubjectRecord;
use serde::Serialize;

pub const MIN_SEMESTER: u8 = 1;
pub const MAX_SEMESTER: u8 = 8;
pub const MID_SEM_MAX: f64 = 25.0;
pub const IA_MAX: f64 = 25.0;
pub const END_SEM_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GradeStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    /// Inclusive lower bounds on the 100-point total.
    const BANDS: [(f64, LetterGrade); 6] = [
        (90.0, LetterGrade::APlus),
        (80.0, LetterGrade::A),
        (70.0, LetterGrade::BPlus),
        (60.0, LetterGrade::B),
        (50.0, LetterGrade::C),
        (40.0, LetterGrade::D),
    ];

    pub fn from_total(total: f64) -> Self {
        Self::BANDS
            .iter()
            .find(|(floor, _)| total >= *floor)
            .map(|(_, g)| *g)
            .unwrap_or(LetterGrade::F)
    }

    pub fn grade_point(self) -> u8 {
        match self {
            Self::APlus => 10,
            Self::A => 9,
            Self::BPlus => 8,
            Self::B => 7,
            Self::C => 6,
            Self::D => 5,
            Self::F => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDetails {
    pub status: GradeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<LetterGrade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_point: Option<u8>,
}

impl GradeDetails {
    pub fn in_progress() -> Self {
        Self {
            status: GradeStatus::InProgress,
            total: None,
            grade: None,
            grade_point: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == GradeStatus::Completed
    }
}

/// End-semester marks are halved so the three components sum to at most 100.
pub fn weighted_total(mid_sem: f64, ia: f64, end_sem: f64) -> f64 {
    mid_sem + ia + end_sem / 2.0
}

pub fn grade_details_of(subject: &GradeSubjectRecord) -> GradeDetails {
    let (Some(mid), Some(ia), Some(end)) =
        (subject.mid_sem_marks, subject.ia_marks, subject.end_sem_marks)
    else {
        return GradeDetails::in_progress();
    };
    let total = weighted_total(mid, ia, end);
    let grade = LetterGrade::from_total(total);
    GradeDetails {
        status: GradeStatus::Completed,
        total: Some(total),
        grade: Some(grade),
        grade_point: Some(grade.grade_point()),
    }
}

/// Credit-weighted mean of grade points.
///
/// `None` for an empty list or while any subject still lacks a mark; a complete
/// semester whose credits sum to zero yields `Some(0.0)`.
pub fn sgpa_of(subjects: &[GradeSubjectRecord]) -> Option<f64> {
    if subjects.is_empty() {
        return None;
    }

    let mut weighted_points = 0.0_f64;
    let mut total_credits = 0.0_f64;
    for s in subjects {
        let details = grade_details_of(s);
        let point = details.grade_point?;
        weighted_points += f64::from(point) * s.credits;
        total_credits += s.credits;
    }

    if total_credits == 0.0 {
        return Some(0.0);
    }
    Some(weighted_points / total_credits)
}

/// Simple mean over semesters with a defined SGPA. Undefined semesters are skipped, not
/// counted as zero.
pub fn cgpa_of<I>(sgpas: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0_f64;
    let mut count: usize = 0;
    for sgpa in sgpas.into_iter().flatten() {
        sum += sgpa;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / (count as f64)
    }
}

pub fn round_to(x: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(places as i32);
    (x * factor).round() / factor
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedSubject {
    #[serde(flatten)]
    pub record: GradeSubjectRecord,
    pub details: GradeDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSummary {
    pub semester: u8,
    pub subjects: Vec<GradedSubject>,
    pub total_credits: f64,
    pub completed_count: usize,
    pub in_progress_count: usize,
    pub sgpa: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub semesters: Vec<SemesterSummary>,
    pub cgpa: f64,
    pub earned_credits: f64,
}

/// One summary per semester 1..=8, including semesters with no subjects (sgpa `None`).
pub fn semester_summaries(records: &[GradeSubjectRecord]) -> Vec<SemesterSummary> {
    (MIN_SEMESTER..=MAX_SEMESTER)
        .map(|semester| {
            let in_semester: Vec<GradeSubjectRecord> = records
                .iter()
                .filter(|r| r.semester == semester)
                .cloned()
                .collect();
            let sgpa = sgpa_of(&in_semester);
            let subjects: Vec<GradedSubject> = in_semester
                .into_iter()
                .map(|record| {
                    let details = grade_details_of(&record);
                    GradedSubject { record, details }
                })
                .collect();
            let completed_count = subjects.iter().filter(|s| s.details.is_completed()).count();
            SemesterSummary {
                semester,
                total_credits: subjects.iter().map(|s| s.record.credits).sum(),
                in_progress_count: subjects.len() - completed_count,
                completed_count,
                subjects,
                sgpa,
            }
        })
        .collect()
}

pub fn transcript_of(records: &[GradeSubjectRecord]) -> Transcript {
    let semesters = semester_summaries(records);
    let cgpa = cgpa_of(semesters.iter().map(|s| s.sgpa));
    // Credits only count once a subject is passed.
    let earned_credits = semesters
        .iter()
        .flat_map(|s| s.subjects.iter())
        .filter(|s| s.details.grade_point.map(|p| p > 0).unwrap_or(false))
        .map(|s| s.record.credits)
        .sum();
    Transcript {
        semesters,
        cgpa,
        earned_credits,
    }
}
