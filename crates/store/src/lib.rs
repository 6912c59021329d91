use anyhow::Context;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sched_core::{Directory, ScheduleStore};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use types::{ClassId, ClassInfo, RawSubjectRow, TeacherRecord};

/// A subject row tagged with the class it belongs to.
#[derive(Clone, Debug, Deserialize)]
pub struct SubjectSeed {
    pub class_id: ClassId,
    #[serde(flatten)]
    pub row: RawSubjectRow,
}

/// Fixture document used to populate the store at startup.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
    #[serde(default)]
    pub subjects: Vec<SubjectSeed>,
    #[serde(default)]
    pub teachers: Vec<TeacherRecord>,
    #[serde(default)]
    pub schedules: HashMap<ClassId, serde_json::Value>,
}

#[derive(Default)]
struct Tables {
    classes: HashMap<ClassId, ClassInfo>,
    subjects: HashMap<ClassId, Vec<RawSubjectRow>>,
    teachers: Vec<TeacherRecord>,
    schedules: HashMap<ClassId, serde_json::Value>,
}

/// In-memory directory and schedule store. Writes are last-write-wins.
#[derive(Clone, Default)]
pub struct InMemStore {
    inner: Arc<RwLock<Tables>>,
}

impl InMemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let store = Self::new();
        {
            let mut t = store.inner.write();
            for c in seed.classes {
                t.classes.insert(c.id.clone(), c);
            }
            for s in seed.subjects {
                t.subjects.entry(s.class_id).or_default().push(s.row);
            }
            t.teachers = seed.teachers;
            t.schedules = seed.schedules;
        }
        store
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed data from {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&raw)
            .with_context(|| format!("parsing seed data in {}", path.display()))?;
        info!(
            classes = seed.classes.len(),
            subjects = seed.subjects.len(),
            teachers = seed.teachers.len(),
            "loaded seed data"
        );
        Ok(Self::from_seed(seed))
    }
}

#[async_trait]
impl Directory for InMemStore {
    async fn class_info(&self, id: &ClassId) -> anyhow::Result<Option<ClassInfo>> {
        Ok(self.inner.read().classes.get(id).cloned())
    }

    async fn subject_rows(&self, id: &ClassId) -> anyhow::Result<Vec<RawSubjectRow>> {
        Ok(self
            .inner
            .read()
            .subjects
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn teachers(&self) -> anyhow::Result<Vec<TeacherRecord>> {
        Ok(self.inner.read().teachers.clone())
    }
}

#[async_trait]
impl ScheduleStore for InMemStore {
    async fn load(&self, id: &ClassId) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.inner.read().schedules.get(id).cloned())
    }

    async fn upsert(&self, id: &ClassId, schedule: serde_json::Value) -> anyhow::Result<()> {
        debug!(class_id = %id, "upserting schedule");
        self.inner.write().schedules.insert(id.clone(), schedule);
        Ok(())
    }

    async fn list_except(
        &self,
        id: &ClassId,
    ) -> anyhow::Result<Vec<(ClassId, serde_json::Value)>> {
        let mut out: Vec<_> = self
            .inner
            .read()
            .schedules
            .iter()
            .filter(|(k, _)| *k != id)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

/// Advisory one-build-per-class lock.
#[derive(Clone, Default)]
pub struct BuildLocks {
    inner: Arc<Mutex<HashSet<ClassId>>>,
}

impl BuildLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another build for `id` holds its guard.
    pub fn try_acquire(&self, id: &ClassId) -> Option<BuildGuard> {
        if !self.inner.lock().insert(id.clone()) {
            return None;
        }
        Some(BuildGuard {
            locks: self.inner.clone(),
            id: id.clone(),
        })
    }
}

pub struct BuildGuard {
    locks: Arc<Mutex<HashSet<ClassId>>>,
    id: ClassId,
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        self.locks.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cid(s: &str) -> ClassId {
        ClassId(s.into())
    }

    #[tokio::test]
    async fn upsert_replaces_and_list_skips_own_class() {
        let store = InMemStore::new();
        assert!(store.load(&cid("a")).await.unwrap().is_none());

        store.upsert(&cid("a"), json!({ "v": 1 })).await.unwrap();
        store.upsert(&cid("a"), json!({ "v": 2 })).await.unwrap();
        store.upsert(&cid("c"), json!({ "v": 3 })).await.unwrap();
        store.upsert(&cid("b"), json!({ "v": 4 })).await.unwrap();

        assert_eq!(store.load(&cid("a")).await.unwrap(), Some(json!({ "v": 2 })));
        let others = store.list_except(&cid("a")).await.unwrap();
        let ids: Vec<_> = others.iter().map(|(k, _)| k.0.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn seed_document_populates_directory() {
        let seed: Seed = serde_json::from_value(json!({
            "classes": [{ "id": "1", "name": "KG2" }],
            "subjects": [
                { "class_id": "1", "name": "Math", "hours": 4 },
                { "class_id": "1", "subject": "Art", "teacher_id": 9 },
                { "class_id": "2", "name": "PE" }
            ],
            "teachers": [{ "id": "9", "full_name": "Dana", "availability": {} }],
            "schedules": { "2": { "Monday": [] } }
        }))
        .unwrap();
        let store = InMemStore::from_seed(seed);

        let class = store.class_info(&cid("1")).await.unwrap().unwrap();
        assert_eq!(class.name, "KG2");
        assert!(store.class_info(&cid("3")).await.unwrap().is_none());

        let rows = store.subject_rows(&cid("1")).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["teacher_id"], 9);
        assert!(!rows[0].contains_key("class_id"));
        assert!(store.subject_rows(&cid("3")).await.unwrap().is_empty());

        let teachers = store.teachers().await.unwrap();
        assert_eq!(teachers[0].availability, Some(json!({})));
        assert_eq!(store.list_except(&cid("1")).await.unwrap().len(), 1);
    }

    #[test]
    fn one_build_per_class() {
        let locks = BuildLocks::new();
        let g = locks.try_acquire(&cid("a")).unwrap();
        assert!(locks.try_acquire(&cid("a")).is_none());
        let other = locks.try_acquire(&cid("b"));
        assert!(other.is_some());
        drop(g);
        assert!(locks.try_acquire(&cid("a")).is_some());
    }
}
