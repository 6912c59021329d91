//! Subject demand: raw subject rows folded into per-subject weekly hours with a
//! resolved teacher for each subject.

use rand::seq::SliceRandom;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use types::{
    ClassInfo, RawSubjectRow, SubjectHours, TeacherId, TeacherRecord, FILLER_SUBJECT,
    WEEKLY_CAPACITY,
};

use crate::availability::{translate, Availability};
use crate::grid::TimeGrid;

/// Shown as the teacher of a subject when no teacher exists at all.
pub const PLACEHOLDER_TEACHER: &str = "—";

const NAME_KEYS: &[&str] = &[
    "name",
    "subject",
    "subject_name",
    "title",
    "material",
    "course",
    "اسم",
    "اسم_المادة",
    "المادة",
    "الماده",
];
const HOURS_KEYS: &[&str] = &[
    "weekly_hours",
    "hours",
    "hours_per_week",
    "weekly_periods",
    "periods",
    "num_periods",
    "num_hours",
    "sessions",
    "sessions_per_week",
    "per_week",
    "حصص",
    "عددالحصص",
    "عدد_الحصص",
];
const TEACHER_ID_KEYS: &[&str] = &[
    "teacher_user_id",
    "teacher_id",
    "user_id",
    "t_user_id",
    "المعلم_id",
];
const TEACHER_NAME_KEYS: &[&str] = &[
    "teacher_name",
    "teacher",
    "teacher_full_name",
    "t_name",
    "full_name",
    "اسم_المعلم",
    "المعلم",
];

pub fn norm_name(s: &str) -> String {
    s.trim().to_lowercase()
}

/// One subject row after alias resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectRow {
    pub subject: String,
    pub weekly_hours: u32,
    pub teacher_id: Option<TeacherId>,
    pub teacher_name: Option<String>,
}

fn pick<'a>(row: &'a RawSubjectRow, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .find(|v| !v.is_null())
}

fn scalar_text(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Missing, blank, non-numeric or negative hours count as one period.
fn parse_hours(v: Option<&Value>) -> u32 {
    let n = match v {
        None => return 1,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return 1,
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match n {
        Some(h) if h.is_finite() && h >= 0.0 => h.min(u32::MAX as f64) as u32,
        _ => 1,
    }
}

pub fn parse_rows(raw: &[RawSubjectRow]) -> Vec<SubjectRow> {
    raw.iter()
        .filter_map(|r| {
            let subject = pick(r, NAME_KEYS).and_then(scalar_text)?;
            Some(SubjectRow {
                subject,
                weekly_hours: parse_hours(pick(r, HOURS_KEYS)),
                teacher_id: pick(r, TEACHER_ID_KEYS)
                    .and_then(scalar_text)
                    .map(TeacherId),
                teacher_name: pick(r, TEACHER_NAME_KEYS).and_then(scalar_text),
            })
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct TeacherEntry {
    pub id: TeacherId,
    pub name: String,
    pub availability: Availability,
}

/// Numeric ids compare numerically, everything else lexicographically after them.
fn id_order(a: &TeacherId, b: &TeacherId) -> Ordering {
    match (a.0.parse::<u64>(), b.0.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        _ => a.0.cmp(&b.0),
    }
}

/// Teachers with their translated availability, indexed by id and by normalized name.
#[derive(Clone, Debug, Default)]
pub struct TeacherIndex {
    entries: Vec<TeacherEntry>,
    by_id: HashMap<TeacherId, usize>,
    by_name: HashMap<String, usize>,
}

impl TeacherIndex {
    pub fn build(records: &[TeacherRecord], grid: &TimeGrid) -> Self {
        let mut entries: Vec<TeacherEntry> = records
            .iter()
            .map(|r| TeacherEntry {
                id: r.id.clone(),
                name: r
                    .full_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("T{}", r.id)),
                availability: translate(&r.id, r.availability.as_ref(), grid),
            })
            .collect();
        entries.sort_by(|a, b| id_order(&a.id, &b.id));

        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for (i, e) in entries.iter().enumerate() {
            by_id.insert(e.id.clone(), i);
            by_name.entry(norm_name(&e.name)).or_insert(i);
        }
        Self {
            entries,
            by_id,
            by_name,
        }
    }

    pub fn get(&self, id: &TeacherId) -> Option<&TeacherEntry> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&TeacherEntry> {
        self.by_name.get(&norm_name(name)).map(|&i| &self.entries[i])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Id-ordered teachers, one per distinct name.
    pub fn pool(&self) -> Vec<&TeacherEntry> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(norm_name(&e.name)))
            .collect()
    }

    /// Availability of the teacher a subject resolved to. Teachers without an
    /// entry are unconstrained.
    pub fn availability_of(&self, id: Option<&TeacherId>, name: &str) -> Availability {
        id.and_then(|id| self.get(id))
            .or_else(|| (!name.trim().is_empty()).then(|| self.by_name(name)).flatten())
            .map(|e| e.availability.clone())
            .unwrap_or(Availability::Unconstrained)
    }
}

#[derive(Clone, Debug)]
pub struct SubjectDemand {
    pub subject: String,
    pub hours: u32,
    /// Display name carried onto every placed session; empty for the filler subject.
    pub teacher: String,
    pub teacher_id: Option<TeacherId>,
    pub availability: Availability,
}

/// Everything the placement engine needs for one class, already checked for feasibility.
#[derive(Clone, Debug)]
pub struct DemandPlan {
    pub class: ClassInfo,
    pub grid: TimeGrid,
    /// In order of first appearance in the subject rows.
    pub subjects: Vec<SubjectDemand>,
}

impl DemandPlan {
    pub fn total_hours(&self) -> u32 {
        self.subjects
            .iter()
            .fold(0u32, |acc, s| acc.saturating_add(s.hours))
    }

    pub fn by_subject(&self) -> Vec<SubjectHours> {
        self.subjects
            .iter()
            .map(|s| SubjectHours {
                subject: s.subject.clone(),
                weekly_hours: s.hours,
            })
            .collect()
    }
}

/// Merges rows by subject, resolves a teacher per subject, and pads the week
/// with the filler subject up to [`WEEKLY_CAPACITY`].
///
/// Subjects still lacking a teacher after resolution take one from the
/// teacher pool, shuffled with `seed`, in round-robin order.
pub fn aggregate(rows: &[SubjectRow], index: &TeacherIndex, seed: u64) -> Vec<SubjectDemand> {
    let mut subjects: Vec<SubjectDemand> = Vec::new();
    let mut pos: HashMap<String, usize> = HashMap::new();

    for r in rows {
        let key = norm_name(&r.subject);
        if let Some(&i) = pos.get(&key) {
            subjects[i].hours = subjects[i].hours.saturating_add(r.weekly_hours);
            continue;
        }

        let row_name = r.teacher_name.clone().unwrap_or_default();
        let (teacher, teacher_id) = match &r.teacher_id {
            Some(id) => match index.get(id) {
                Some(e) => (e.name.clone(), Some(e.id.clone())),
                None => (row_name, Some(id.clone())),
            },
            None if !row_name.is_empty() => {
                let id = index.by_name(&row_name).map(|e| e.id.clone());
                (row_name, id)
            }
            None => (String::new(), None),
        };

        pos.insert(key, subjects.len());
        subjects.push(SubjectDemand {
            subject: r.subject.clone(),
            hours: r.weekly_hours,
            teacher,
            teacher_id,
            availability: Availability::Unconstrained,
        });
    }

    let mut pool = index.pool();
    pool.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let mut next = 0usize;
    for s in subjects.iter_mut().filter(|s| s.teacher.is_empty()) {
        if pool.is_empty() {
            s.teacher = PLACEHOLDER_TEACHER.to_string();
            s.teacher_id = None;
            continue;
        }
        let e = pool[next % pool.len()];
        s.teacher = e.name.clone();
        s.teacher_id = Some(e.id.clone());
        next += 1;
    }

    for s in subjects.iter_mut() {
        s.availability = index.availability_of(s.teacher_id.as_ref(), &s.teacher);
    }

    let total = subjects
        .iter()
        .fold(0u32, |acc, s| acc.saturating_add(s.hours));
    if total < WEEKLY_CAPACITY {
        let shortfall = WEEKLY_CAPACITY - total;
        let filler = SubjectDemand {
            subject: FILLER_SUBJECT.to_string(),
            hours: shortfall,
            teacher: String::new(),
            teacher_id: None,
            availability: Availability::Unconstrained,
        };
        match pos.get(&norm_name(FILLER_SUBJECT)) {
            Some(&i) => {
                let existing = subjects[i].hours;
                subjects[i] = SubjectDemand {
                    hours: existing + shortfall,
                    ..filler
                };
            }
            None => subjects.push(filler),
        }
    }
    subjects
}
