pub mod audit;
pub mod availability;
pub mod build;
pub mod demand;
pub mod error;
pub mod feasibility;
pub mod grid;
pub mod load;

use async_trait::async_trait;

pub use error::BuildError;
pub use types::{
    BuildMeta, BuildRequest, BuiltSchedule, ClassId, ClassInfo, RawSubjectRow, StallReport,
    TeacherRecord, WeeklySchedule,
};

/// Upstream reads: class, subject and teacher records.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    async fn class_info(&self, id: &ClassId) -> anyhow::Result<Option<ClassInfo>>;
    async fn subject_rows(&self, id: &ClassId) -> anyhow::Result<Vec<RawSubjectRow>>;
    async fn teachers(&self) -> anyhow::Result<Vec<TeacherRecord>>;
}

/// Stored schedules, one opaque JSON document per class.
#[async_trait]
pub trait ScheduleStore: Send + Sync + 'static {
    async fn load(&self, id: &ClassId) -> anyhow::Result<Option<serde_json::Value>>;
    /// Create or replace.
    async fn upsert(&self, id: &ClassId, schedule: serde_json::Value) -> anyhow::Result<()>;
    async fn list_except(&self, id: &ClassId)
        -> anyhow::Result<Vec<(ClassId, serde_json::Value)>>;
}

#[derive(Clone, Debug)]
pub struct Placement {
    pub schedule: WeeklySchedule,
    /// Seed of the attempt that succeeded.
    pub seed: u64,
    pub attempts: u32,
}

pub trait Placer: Send + Sync + 'static {
    fn place(&self, plan: &demand::DemandPlan, seed: u64) -> Result<Placement, StallReport>;
}
