//! The auto-build pipeline: read → aggregate → check → place → persist.

use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

use types::{
    BuildMeta, BuildRequest, BuiltSchedule, ClassId, ClassInfo, RawSubjectRow, Weekday,
    PERIODS_PER_DAY, WEEKLY_CAPACITY,
};

use crate::demand::{aggregate, parse_rows, DemandPlan, TeacherIndex};
use crate::error::BuildError;
use crate::grid::TimeGrid;
use crate::load::committed_load;
use crate::{feasibility, Directory, Placer, ScheduleStore};

pub fn default_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Builds the feasibility-checked demand plan for one class. `index` must have
/// been built on the class's own time grid.
pub fn prepare(
    class: ClassInfo,
    rows: &[RawSubjectRow],
    index: &TeacherIndex,
    seed: u64,
) -> Result<DemandPlan, BuildError> {
    let grid = TimeGrid::for_class(&class.name);
    let subjects = aggregate(&parse_rows(rows), index, seed);
    let plan = DemandPlan {
        class,
        grid,
        subjects,
    };
    feasibility::check(&plan)?;
    Ok(plan)
}

/// The class record, or a stand-in named `Class <id>` when none exists.
pub async fn class_or_default(dir: &dyn Directory, id: &ClassId) -> anyhow::Result<ClassInfo> {
    Ok(dir.class_info(id).await?.unwrap_or_else(|| ClassInfo {
        id: id.clone(),
        name: format!("Class {id}"),
    }))
}

pub async fn auto_build(
    dir: &dyn Directory,
    store: &dyn ScheduleStore,
    placer: &dyn Placer,
    req: BuildRequest,
) -> Result<BuiltSchedule, BuildError> {
    let seed = req.seed.unwrap_or_else(default_seed);
    let class_id = req.class_id;
    info!(class_id = %class_id, seed, "auto-build started");

    let class = class_or_default(dir, &class_id)
        .await
        .map_err(BuildError::Upstream)?;
    let teachers = dir.teachers().await.map_err(BuildError::Upstream)?;

    // Other classes' schedules are read for visibility only; they do not constrain placement.
    let others = store
        .list_except(&class_id)
        .await
        .map_err(BuildError::Upstream)?;
    let index = TeacherIndex::build(&teachers, &TimeGrid::for_class(&class.name));
    if index.is_empty() {
        warn!(class_id = %class_id, "no teacher records, unassigned subjects get a placeholder");
    }
    let load = committed_load(&others, &index);
    debug!(
        class_id = %class_id,
        teachers = index.len(),
        other_classes = others.len(),
        busy_teacher_slots = load.busy_slots(),
        "committed teacher load"
    );

    let rows = dir
        .subject_rows(&class_id)
        .await
        .map_err(BuildError::Upstream)?;
    let plan = match prepare(class, &rows, &index, seed) {
        Ok(plan) => plan,
        Err(e) => {
            if e.is_infeasible() {
                warn!(class_id = %class_id, error = %e, "demand rejected before placement");
            }
            return Err(e);
        }
    };

    let placed = placer
        .place(&plan, seed)
        .map_err(BuildError::PlacementExhausted)?;

    let built = BuiltSchedule {
        schedule: placed.schedule,
        meta: BuildMeta {
            class_id: class_id.clone(),
            class_name: plan.class.name.clone(),
            days: Weekday::WORKING.len(),
            periods_per_day: PERIODS_PER_DAY,
            weekly_capacity: WEEKLY_CAPACITY,
            seed: placed.seed,
            attempts: placed.attempts,
        },
    };

    let stored = match serde_json::to_value(&built.schedule) {
        Ok(blob) => store.upsert(&class_id, blob).await,
        Err(e) => Err(e.into()),
    };
    if let Err(source) = stored {
        error!(class_id = %class_id, seed, error = %source, "failed to persist schedule");
        return Err(BuildError::Persistence {
            source,
            built: Box::new(built),
        });
    }

    info!(
        class_id = %class_id,
        seed = built.meta.seed,
        attempts = built.meta.attempts,
        "auto-build finished"
    );
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Placement;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use types::{Session, StallReport, TeacherId, TeacherRecord, WeeklySchedule};

    struct Fixture {
        class: Option<ClassInfo>,
        rows: Vec<RawSubjectRow>,
        teachers: Vec<TeacherRecord>,
        fail_reads: bool,
        fail_writes: bool,
        stored: Mutex<HashMap<ClassId, serde_json::Value>>,
    }

    impl Fixture {
        fn new(rows: Vec<serde_json::Value>) -> Self {
            Self {
                class: Some(ClassInfo {
                    id: ClassId("c1".into()),
                    name: "Grade 7".into(),
                }),
                rows: rows
                    .into_iter()
                    .filter_map(|v| v.as_object().cloned())
                    .collect(),
                teachers: vec![TeacherRecord {
                    id: TeacherId("1".into()),
                    full_name: Some("Ali".into()),
                    availability: None,
                }],
                fail_reads: false,
                fail_writes: false,
                stored: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl Directory for Fixture {
        async fn class_info(&self, _id: &ClassId) -> anyhow::Result<Option<ClassInfo>> {
            Ok(self.class.clone())
        }
        async fn subject_rows(&self, _id: &ClassId) -> anyhow::Result<Vec<RawSubjectRow>> {
            if self.fail_reads {
                anyhow::bail!("subjects table unavailable");
            }
            Ok(self.rows.clone())
        }
        async fn teachers(&self) -> anyhow::Result<Vec<TeacherRecord>> {
            Ok(self.teachers.clone())
        }
    }

    #[async_trait]
    impl ScheduleStore for Fixture {
        async fn load(&self, id: &ClassId) -> anyhow::Result<Option<serde_json::Value>> {
            Ok(self.stored.lock().get(id).cloned())
        }
        async fn upsert(&self, id: &ClassId, schedule: serde_json::Value) -> anyhow::Result<()> {
            if self.fail_writes {
                anyhow::bail!("connection reset");
            }
            self.stored.lock().insert(id.clone(), schedule);
            Ok(())
        }
        async fn list_except(
            &self,
            id: &ClassId,
        ) -> anyhow::Result<Vec<(ClassId, serde_json::Value)>> {
            Ok(self
                .stored
                .lock()
                .iter()
                .filter(|(k, _)| *k != id)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }
    }

    /// Fills slots day by day in subject order, ignoring every constraint.
    struct InOrder;

    impl Placer for InOrder {
        fn place(&self, plan: &DemandPlan, seed: u64) -> Result<Placement, StallReport> {
            let mut schedule = WeeklySchedule::blank();
            let mut slots = Weekday::WORKING
                .iter()
                .flat_map(|d| (0..PERIODS_PER_DAY).map(move |p| (*d, p)));
            for s in &plan.subjects {
                for _ in 0..s.hours {
                    let Some((d, p)) = slots.next() else { break };
                    schedule.set(
                        d,
                        p,
                        Session {
                            subject: s.subject.clone(),
                            teacher: s.teacher.clone(),
                            room: String::new(),
                        },
                    );
                }
            }
            Ok(Placement {
                schedule,
                seed,
                attempts: 1,
            })
        }
    }

    struct Stuck;

    impl Placer for Stuck {
        fn place(&self, _plan: &DemandPlan, _seed: u64) -> Result<Placement, StallReport> {
            Err(StallReport {
                day: Weekday::Tuesday,
                slot: 5,
                candidates: vec![],
            })
        }
    }

    fn feasible_rows() -> Vec<serde_json::Value> {
        vec![
            json!({ "name": "Math", "hours": 10, "teacher_id": "1" }),
            json!({ "name": "Art", "hours": 10 }),
        ]
    }

    fn req(seed: Option<u64>) -> BuildRequest {
        BuildRequest {
            class_id: ClassId("c1".into()),
            seed,
        }
    }

    #[tokio::test]
    async fn persists_and_reports_meta() {
        let fx = Fixture::new(feasible_rows());
        let built = auto_build(&fx, &fx, &InOrder, req(Some(77))).await.unwrap();
        assert_eq!(built.meta.class_name, "Grade 7");
        assert_eq!(built.meta.days, 5);
        assert_eq!(built.meta.periods_per_day, 7);
        assert_eq!(built.meta.weekly_capacity, 35);
        assert_eq!(built.meta.seed, 77);
        assert_eq!(built.schedule.filled(), 35);

        let stored = fx.stored.lock().get(&ClassId("c1".into())).cloned().unwrap();
        assert_eq!(stored, serde_json::to_value(&built.schedule).unwrap());
        assert_eq!(stored["Monday"][0]["teacher"], "Ali");
    }

    #[tokio::test]
    async fn missing_class_gets_a_generated_name() {
        let mut fx = Fixture::new(feasible_rows());
        fx.class = None;
        let built = auto_build(&fx, &fx, &InOrder, req(Some(1))).await.unwrap();
        assert_eq!(built.meta.class_name, "Class c1");
        assert_eq!(built.schedule.filled(), 35);
        assert_eq!(built.schedule.get(Weekday::Saturday, 6).unwrap().subject, "Activity");
    }

    #[tokio::test]
    async fn filler_is_held_to_the_daily_cap_too() {
        let fx = Fixture::new(vec![json!({ "name": "Math", "hours": 5 })]);
        let err = auto_build(&fx, &fx, &InOrder, req(Some(1))).await.unwrap_err();
        let BuildError::SubjectInfeasible(s) = err else {
            panic!("unexpected {err:?}");
        };
        assert_eq!(s.subject, "Activity");
        assert_eq!(s.required, 30);
        assert_eq!(s.max_available_with_rule, 15);
    }

    #[tokio::test]
    async fn infeasible_demand_skips_placement_and_storage() {
        let fx = Fixture::new(vec![json!({ "name": "Math", "hours": 16 })]);
        let err = auto_build(&fx, &fx, &Stuck, req(Some(1))).await.unwrap_err();
        assert!(matches!(err, BuildError::SubjectInfeasible(_)), "{err:?}");
        assert!(fx.stored.lock().is_empty());
    }

    #[tokio::test]
    async fn exhausted_placement_is_surfaced() {
        let fx = Fixture::new(feasible_rows());
        let err = auto_build(&fx, &fx, &Stuck, req(Some(1))).await.unwrap_err();
        let BuildError::PlacementExhausted(r) = err else {
            panic!("unexpected {err:?}");
        };
        assert_eq!(r.slot, 5);
        assert!(fx.stored.lock().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_aborts() {
        let mut fx = Fixture::new(vec![]);
        fx.fail_reads = true;
        let err = auto_build(&fx, &fx, &InOrder, req(None)).await.unwrap_err();
        assert!(matches!(err, BuildError::Upstream(_)));
        assert!(err.to_string().contains("subjects table unavailable"));
    }

    #[tokio::test]
    async fn persistence_failure_keeps_the_schedule() {
        let mut fx = Fixture::new(feasible_rows());
        fx.fail_writes = true;
        let err = auto_build(&fx, &fx, &InOrder, req(Some(9))).await.unwrap_err();
        let BuildError::Persistence { built, .. } = err else {
            panic!("unexpected {err:?}");
        };
        assert_eq!(built.schedule.filled(), 35);
        assert_eq!(built.meta.seed, 9);
    }
}
