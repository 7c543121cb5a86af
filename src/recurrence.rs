//! Weekly recurring classes.
//!
//! A series is one [`RecurrenceSeries`] aggregate plus the concrete [`ClassSession`]
//! instances that carry its id in `recurrence_id`. Only the simple model is supported:
//! same weekday, same time window, same room, every 7 days up to an inclusive end date.

use crate::model::{ClassSession, SessionStatus};
use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditScope {
    Single,
    Future,
    All,
}

impl EditScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "this" => Some(Self::Single),
            "future" | "this_and_future" | "thisandfuture" => Some(Self::Future),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTemplate {
    pub subject_id: String,
    pub teacher: Option<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: String,
    pub start_date: NaiveDate,
    pub repeat_until: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceSeries {
    pub id: String,
    pub subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub room: String,
    pub starts_on: NaiveDate,
    pub repeat_until: NaiveDate,
}

impl RecurrenceSeries {
    /// Copies the shared fields (subject, teacher, time window, room) from an edited instance.
    pub fn apply_fields(&mut self, edited: &ClassSession) {
        self.subject_id = edited.subject_id.clone();
        self.teacher = edited.teacher.clone();
        self.start_time = edited.start_time;
        self.end_time = edited.end_time;
        self.room = edited.room.clone();
    }

    /// Dates the series covers, ascending and bounded by `repeat_until` and the calendar's end.
    pub fn occurrences(&self) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        let mut next = Some(self.starts_on);
        while let Some(date) = next.filter(|d| *d <= self.repeat_until) {
            out.push(date);
            next = date.checked_add_days(Days::new(7));
        }
        out
    }
}

pub fn expand(template: &SeriesTemplate) -> (RecurrenceSeries, Vec<ClassSession>) {
    let series = RecurrenceSeries {
        id: Uuid::new_v4().to_string(),
        subject_id: template.subject_id.clone(),
        teacher: template.teacher.clone(),
        weekday: template.start_date.weekday(),
        start_time: template.start_time,
        end_time: template.end_time,
        room: template.room.clone(),
        starts_on: template.start_date,
        repeat_until: template.repeat_until,
    };

    // New instances start out as attended until the user records otherwise.
    let instances = series
        .occurrences()
        .into_iter()
        .map(|date| ClassSession {
            id: Uuid::new_v4().to_string(),
            subject_id: series.subject_id.clone(),
            teacher: series.teacher.clone(),
            date,
            start_time: series.start_time,
            end_time: series.end_time,
            room: series.room.clone(),
            status: SessionStatus::Attended,
            recurrence_id: Some(series.id.clone()),
            repeat_until: Some(series.repeat_until),
        })
        .collect();

    (series, instances)
}

fn apply_shared_fields(instance: &mut ClassSession, edited: &ClassSession) {
    instance.subject_id = edited.subject_id.clone();
    instance.teacher = edited.teacher.clone();
    instance.start_time = edited.start_time;
    instance.end_time = edited.end_time;
    instance.room = edited.room.clone();
}

/// Resolves what a scoped mutation targets: the stored instance (by id) and its series id.
fn locate<'a>(
    sessions: &'a [ClassSession],
    target_id: &str,
) -> Option<(&'a ClassSession, Option<&'a str>)> {
    sessions
        .iter()
        .find(|s| s.id == target_id)
        .map(|s| (s, s.recurrence_id.as_deref()))
}

/// Applies an edit made to one instance across `scope`. The stored instance's date is the
/// cutoff for [`EditScope::Future`]. Unknown ids leave the collection unchanged.
pub fn apply_scoped_edit(
    sessions: Vec<ClassSession>,
    edited: &ClassSession,
    scope: EditScope,
) -> Vec<ClassSession> {
    let Some((stored, series_id)) = locate(&sessions, &edited.id) else {
        return sessions;
    };
    let cutoff = stored.date;
    let series_id = series_id.map(str::to_string);
    let scope = if series_id.is_none() {
        EditScope::Single
    } else {
        scope
    };

    sessions
        .into_iter()
        .map(|mut s| {
            if s.id == edited.id {
                return edited.clone();
            }
            let same_series = series_id.is_some() && s.recurrence_id == series_id;
            let in_scope = match scope {
                EditScope::Single => false,
                EditScope::Future => same_series && s.date >= cutoff,
                EditScope::All => same_series,
            };
            if in_scope {
                apply_shared_fields(&mut s, edited);
            }
            s
        })
        .collect()
}

/// Splits `series` at `cutoff` after a [`EditScope::Future`] edit. Instances on or after the
/// cutoff (and the edited one) move to a new series that carries the edited shared fields;
/// the original keeps the earlier instances and ends on the last of them. Returns `None`
/// when no earlier instance exists, in which case the whole series was edited.
pub fn split_series(
    series: &mut RecurrenceSeries,
    sessions: &mut [ClassSession],
    edited: &ClassSession,
    cutoff: NaiveDate,
) -> Option<RecurrenceSeries> {
    let in_tail = |s: &ClassSession| s.id == edited.id || s.date >= cutoff;
    let head_last = sessions
        .iter()
        .filter(|s| s.recurrence_id.as_deref() == Some(series.id.as_str()) && !in_tail(*s))
        .map(|s| s.date)
        .max()?;

    let mut tail = series.clone();
    tail.id = Uuid::new_v4().to_string();
    tail.apply_fields(edited);
    tail.weekday = cutoff.weekday();
    tail.starts_on = cutoff;
    series.repeat_until = head_last;

    for s in sessions
        .iter_mut()
        .filter(|s| s.recurrence_id.as_deref() == Some(series.id.as_str()))
    {
        if in_tail(&*s) {
            s.recurrence_id = Some(tail.id.clone());
            s.repeat_until = Some(tail.repeat_until);
        } else {
            s.repeat_until = Some(head_last);
        }
    }
    Some(tail)
}

pub fn apply_scoped_delete(
    sessions: Vec<ClassSession>,
    target: &ClassSession,
    scope: EditScope,
) -> Vec<ClassSession> {
    let Some((stored, series_id)) = locate(&sessions, &target.id) else {
        return sessions;
    };
    let cutoff = stored.date;
    let series_id = series_id.map(str::to_string);

    sessions
        .into_iter()
        .filter(|s| {
            if s.id == target.id {
                return false;
            }
            let same_series = series_id.is_some() && s.recurrence_id == series_id;
            match scope {
                EditScope::Single => true,
                EditScope::Future => !(same_series && s.date >= cutoff),
                EditScope::All => !same_series,
            }
        })
        .collect()
}
