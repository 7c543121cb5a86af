use crate::db;
use crate::model::{
    AssignmentRecord, ClassSession, ExamRecord, GradeSubjectRecord, SessionStatus,
    SubjectRecord, UserProfile,
};
use crate::recurrence::{self, EditScope, RecurrenceSeries, SeriesTemplate};
use anyhow::Context;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Subjects,
    Classes,
    Series,
    Assignments,
    Exams,
    Grades,
    Profile,
}

impl RecordKind {
    pub const ALL: [RecordKind; 7] = [
        RecordKind::Subjects,
        RecordKind::Classes,
        RecordKind::Series,
        RecordKind::Assignments,
        RecordKind::Exams,
        RecordKind::Grades,
        RecordKind::Profile,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Subjects => "subjects",
            Self::Classes => "classes",
            Self::Series => "series",
            Self::Assignments => "assignments",
            Self::Exams => "exams",
            Self::Grades => "grades",
            Self::Profile => "profile",
        }
    }
}

/// Whole-collection persistence keyed by record kind.
pub trait RecordStore {
    /// `Ok(None)` when nothing has been saved for `kind` yet.
    fn load(&self, kind: RecordKind) -> anyhow::Result<Option<serde_json::Value>>;
    fn save(&self, kind: RecordKind, payload: &serde_json::Value) -> anyhow::Result<()>;
}

pub struct SqliteStore {
    conn: Rc<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Rc<Connection>) -> Self {
        Self { conn }
    }
}

impl RecordStore for SqliteStore {
    fn load(&self, kind: RecordKind) -> anyhow::Result<Option<serde_json::Value>> {
        db::collection_get(&self.conn, kind.key())
            .with_context(|| format!("failed to load {} collection", kind.key()))
    }

    fn save(&self, kind: RecordKind, payload: &serde_json::Value) -> anyhow::Result<()> {
        db::collection_put(&self.conn, kind.key(), payload)
            .with_context(|| format!("failed to save {} collection", kind.key()))
    }
}

/// In-process store used before a workspace is selected.
#[derive(Default)]
pub struct MemoryStore {
    collections: RefCell<HashMap<RecordKind, serde_json::Value>>,
}

impl RecordStore for MemoryStore {
    fn load(&self, kind: RecordKind) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.collections.borrow().get(&kind).cloned())
    }

    fn save(&self, kind: RecordKind, payload: &serde_json::Value) -> anyhow::Result<()> {
        self.collections.borrow_mut().insert(kind, payload.clone());
        Ok(())
    }
}

pub trait Identified {
    fn id(&self) -> &str;
}

macro_rules! identified {
    ($($t:ty),* $(,)?) => {
        $(impl Identified for $t {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

identified!(
    SubjectRecord,
    ClassSession,
    RecurrenceSeries,
    AssignmentRecord,
    ExamRecord,
    GradeSubjectRecord,
);

fn replace_by_id<T: Identified>(items: &mut [T], record: T) -> bool {
    match items.iter_mut().find(|it| it.id() == record.id()) {
        Some(slot) => {
            *slot = record;
            true
        }
        None => false,
    }
}

fn remove_by_id<T: Identified>(items: &mut Vec<T>, id: &str) -> bool {
    let before = items.len();
    items.retain(|it| it.id() != id);
    items.len() != before
}

fn load_or_seed<T, F>(persistence: &dyn RecordStore, kind: RecordKind, seed: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match persistence.load(kind) {
        Ok(Some(payload)) => match serde_json::from_value(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(kind = kind.key(), error = %e, "stored collection is corrupt; using defaults");
                seed()
            }
        },
        Ok(None) => seed(),
        Err(e) => {
            tracing::warn!(kind = kind.key(), error = %format!("{e:#}"), "failed to load collection; using defaults");
            seed()
        }
    }
}

/// Every record collection of the single local user, backed by an injected store.
pub struct Organizer {
    persistence: Box<dyn RecordStore>,
    subjects: Vec<SubjectRecord>,
    classes: Vec<ClassSession>,
    series: Vec<RecurrenceSeries>,
    assignments: Vec<AssignmentRecord>,
    exams: Vec<ExamRecord>,
    grades: Vec<GradeSubjectRecord>,
    profile: UserProfile,
}

impl Organizer {
    pub fn open(persistence: Box<dyn RecordStore>) -> Self {
        let p = persistence.as_ref();
        let subjects = load_or_seed(p, RecordKind::Subjects, Vec::new);
        let classes = load_or_seed(p, RecordKind::Classes, Vec::new);
        let series = load_or_seed(p, RecordKind::Series, Vec::new);
        let assignments = load_or_seed(p, RecordKind::Assignments, Vec::new);
        let exams = load_or_seed(p, RecordKind::Exams, Vec::new);
        let grades = load_or_seed(p, RecordKind::Grades, Vec::new);
        let profile = load_or_seed(p, RecordKind::Profile, UserProfile::default);
        Self {
            persistence,
            subjects,
            classes,
            series,
            assignments,
            exams,
            grades,
            profile,
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryStore::default()))
    }

    fn persist<T: Serialize + ?Sized>(&self, kind: RecordKind, records: &T) {
        let payload = match serde_json::to_value(records) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(kind = kind.key(), error = %e, "failed to serialize collection");
                return;
            }
        };
        if let Err(e) = self.persistence.save(kind, &payload) {
            tracing::warn!(kind = kind.key(), error = %format!("{e:#}"), "failed to save collection");
        }
    }

    pub fn subjects(&self) -> &[SubjectRecord] {
        &self.subjects
    }

    pub fn classes(&self) -> &[ClassSession] {
        &self.classes
    }

    pub fn recurrence_series(&self) -> &[RecurrenceSeries] {
        &self.series
    }

    pub fn assignments(&self) -> &[AssignmentRecord] {
        &self.assignments
    }

    pub fn exams(&self) -> &[ExamRecord] {
        &self.exams
    }

    pub fn grades(&self) -> &[GradeSubjectRecord] {
        &self.grades
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn class(&self, id: &str) -> Option<&ClassSession> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn assignment(&self, id: &str) -> Option<&AssignmentRecord> {
        self.assignments.iter().find(|a| a.id == id)
    }

    pub fn grade(&self, id: &str) -> Option<&GradeSubjectRecord> {
        self.grades.iter().find(|g| g.id == id)
    }

    // Subjects. Deleting a subject leaves its dependents pointing at a dangling id.

    pub fn create_subject(&mut self, subject: SubjectRecord) {
        self.subjects.push(subject);
        self.persist(RecordKind::Subjects, &self.subjects);
    }

    pub fn update_subject(&mut self, subject: SubjectRecord) -> bool {
        let changed = replace_by_id(&mut self.subjects, subject);
        if changed {
            self.persist(RecordKind::Subjects, &self.subjects);
        }
        changed
    }

    pub fn delete_subject(&mut self, id: &str) -> bool {
        let changed = remove_by_id(&mut self.subjects, id);
        if changed {
            self.persist(RecordKind::Subjects, &self.subjects);
        }
        changed
    }

    // Classes.

    pub fn add_class(&mut self, session: ClassSession) {
        self.classes.push(session);
        self.persist(RecordKind::Classes, &self.classes);
    }

    pub fn schedule_series(&mut self, template: &SeriesTemplate) -> (RecurrenceSeries, Vec<ClassSession>) {
        let (series, instances) = recurrence::expand(template);
        self.classes.extend(instances.iter().cloned());
        self.series.push(series.clone());
        self.persist(RecordKind::Classes, &self.classes);
        self.persist(RecordKind::Series, &self.series);
        (series, instances)
    }

    /// Returns how many instances the edit touched, 0 when `edited.id` is unknown.
    pub fn edit_class(&mut self, edited: &ClassSession, scope: EditScope) -> usize {
        let Some(stored) = self.class(&edited.id) else {
            return 0;
        };
        let cutoff = stored.date;
        let series_id = stored.recurrence_id.clone();
        let affected = match (series_id.as_deref(), scope) {
            (Some(sid), EditScope::Future | EditScope::All) => self
                .classes
                .iter()
                .filter(|c| c.recurrence_id.as_deref() == Some(sid))
                .filter(|c| scope == EditScope::All || c.date >= cutoff || c.id == edited.id)
                .count(),
            _ => 1,
        };

        let classes = std::mem::take(&mut self.classes);
        self.classes = recurrence::apply_scoped_edit(classes, edited, scope);

        if let Some(series_id) = series_id {
            if let Some(pos) = self.series.iter().position(|s| s.id == series_id) {
                match scope {
                    EditScope::Single => {}
                    EditScope::All => self.series[pos].apply_fields(edited),
                    EditScope::Future => {
                        let split = recurrence::split_series(
                            &mut self.series[pos],
                            &mut self.classes,
                            edited,
                            cutoff,
                        );
                        match split {
                            Some(tail) => self.series.push(tail),
                            None => self.series[pos].apply_fields(edited),
                        }
                    }
                }
            }
        }
        self.prune_series();
        self.persist(RecordKind::Classes, &self.classes);
        self.persist(RecordKind::Series, &self.series);
        affected
    }

    /// Returns how many instances were removed.
    pub fn delete_class(&mut self, id: &str, scope: EditScope) -> usize {
        let Some(target) = self.class(id).cloned() else {
            return 0;
        };
        let before = self.classes.len();
        let classes = std::mem::take(&mut self.classes);
        self.classes = recurrence::apply_scoped_delete(classes, &target, scope);
        let removed = before - self.classes.len();

        if let Some(series_id) = target.recurrence_id.as_deref() {
            let last_remaining = self
                .classes
                .iter()
                .filter(|c| c.recurrence_id.as_deref() == Some(series_id))
                .map(|c| c.date)
                .max();
            if let (EditScope::Future, Some(last)) = (scope, last_remaining) {
                if let Some(series) = self.series.iter_mut().find(|s| s.id == series_id) {
                    series.repeat_until = last;
                }
                for c in self
                    .classes
                    .iter_mut()
                    .filter(|c| c.recurrence_id.as_deref() == Some(series_id))
                {
                    c.repeat_until = Some(last);
                }
            }
        }
        self.prune_series();
        self.persist(RecordKind::Classes, &self.classes);
        self.persist(RecordKind::Series, &self.series);
        removed
    }

    pub fn set_class_status(&mut self, id: &str, status: SessionStatus) -> bool {
        let Some(session) = self.classes.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        session.status = status;
        self.persist(RecordKind::Classes, &self.classes);
        true
    }

    /// Drops series aggregates that no instance references any more.
    fn prune_series(&mut self) {
        let live: HashSet<&str> = self
            .classes
            .iter()
            .filter_map(|c| c.recurrence_id.as_deref())
            .collect();
        self.series.retain(|s| live.contains(s.id.as_str()));
    }

    // Assignments.

    pub fn create_assignment(&mut self, assignment: AssignmentRecord) {
        self.assignments.push(assignment);
        self.persist(RecordKind::Assignments, &self.assignments);
    }

    pub fn update_assignment(&mut self, assignment: AssignmentRecord) -> bool {
        let changed = replace_by_id(&mut self.assignments, assignment);
        if changed {
            self.persist(RecordKind::Assignments, &self.assignments);
        }
        changed
    }

    /// Flips completion; returns the new value, or `None` for an unknown id.
    pub fn toggle_assignment(&mut self, id: &str) -> Option<bool> {
        let assignment = self.assignments.iter_mut().find(|a| a.id == id)?;
        assignment.completed = !assignment.completed;
        let completed = assignment.completed;
        self.persist(RecordKind::Assignments, &self.assignments);
        Some(completed)
    }

    pub fn delete_assignment(&mut self, id: &str) -> bool {
        let changed = remove_by_id(&mut self.assignments, id);
        if changed {
            self.persist(RecordKind::Assignments, &self.assignments);
        }
        changed
    }

    // Exams.

    pub fn create_exam(&mut self, exam: ExamRecord) {
        self.exams.push(exam);
        self.persist(RecordKind::Exams, &self.exams);
    }

    pub fn update_exam(&mut self, exam: ExamRecord) -> bool {
        let changed = replace_by_id(&mut self.exams, exam);
        if changed {
            self.persist(RecordKind::Exams, &self.exams);
        }
        changed
    }

    pub fn delete_exam(&mut self, id: &str) -> bool {
        let changed = remove_by_id(&mut self.exams, id);
        if changed {
            self.persist(RecordKind::Exams, &self.exams);
        }
        changed
    }

    // Grades.

    pub fn create_grade(&mut self, grade: GradeSubjectRecord) {
        self.grades.push(grade);
        self.persist(RecordKind::Grades, &self.grades);
    }

    pub fn update_grade(&mut self, grade: GradeSubjectRecord) -> bool {
        let changed = replace_by_id(&mut self.grades, grade);
        if changed {
            self.persist(RecordKind::Grades, &self.grades);
        }
        changed
    }

    pub fn delete_grade(&mut self, id: &str) -> bool {
        let changed = remove_by_id(&mut self.grades, id);
        if changed {
            self.persist(RecordKind::Grades, &self.grades);
        }
        changed
    }

    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = profile;
        self.persist(RecordKind::Profile, &self.profile);
    }
}
