//! Teacher slots already committed by other classes' schedules.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

use types::{ClassId, TeacherId, Weekday, PERIODS_PER_DAY};

use crate::availability::WeekGrid;
use crate::demand::{norm_name, TeacherIndex};

impl Serialize for WeekGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Weekday::WORKING.len()))?;
        for (i, day) in Weekday::WORKING.iter().enumerate() {
            map.serialize_entry(day, &self.0[i])?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct TeacherLoad {
    /// Keyed by normalized teacher name as written in the schedules.
    pub by_name: BTreeMap<String, WeekGrid>,
    /// Same slots, mirrored onto the teacher id when the name resolves.
    pub by_id: BTreeMap<TeacherId, WeekGrid>,
}

impl TeacherLoad {
    pub fn busy_slots(&self) -> usize {
        self.by_name
            .values()
            .map(|g| g.0.iter().flatten().filter(|b| **b).count())
            .sum()
    }
}

/// Reads stored schedules leniently: anything that is not a day map of
/// session objects is skipped rather than rejected.
pub fn committed_load(
    schedules: &[(ClassId, serde_json::Value)],
    index: &TeacherIndex,
) -> TeacherLoad {
    let mut load = TeacherLoad::default();
    for (_, blob) in schedules {
        let Some(days) = blob.as_object() else {
            continue;
        };
        for day in Weekday::WORKING {
            let Some(row) = days.get(day.as_str()).and_then(|v| v.as_array()) else {
                continue;
            };
            for (p, sess) in row.iter().take(PERIODS_PER_DAY).enumerate() {
                let name = sess
                    .get("teacher")
                    .or_else(|| sess.get("teacherName"))
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .unwrap_or_default();
                if name.is_empty() {
                    continue;
                }
                load.by_name
                    .entry(norm_name(name))
                    .or_default()
                    .set(day, p);
                if let Some(e) = index.by_name(name) {
                    load.by_id.entry(e.id.clone()).or_default().set(day, p);
                }
            }
        }
    }
    load
}
