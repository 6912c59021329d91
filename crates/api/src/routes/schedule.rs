use axum::{
    extract::{Query, State},
    Json,
};
use sched_core::audit::audit_schedule;
use sched_core::build::{auto_build, class_or_default};
use sched_core::demand::TeacherIndex;
use sched_core::grid::TimeGrid;
use sched_core::load::{committed_load, TeacherLoad};
use sched_core::{Directory, ScheduleStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use types::{
    BuildRequest, BuiltSchedule, ClassId, StallReport, SubjectInfeasible, Violation, WeeklySchedule,
};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassQuery {
    #[serde(rename = "classId")]
    pub class_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BuildQuery {
    #[serde(rename = "classId")]
    pub class_id: Option<String>,
    /// Non-numeric or zero seeds fall back to the clock.
    pub seed: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct WriteAck {
    pub ok: bool,
}

#[derive(Serialize, ToSchema)]
pub struct AuditReport {
    pub class_id: ClassId,
    pub violations: Vec<Violation>,
}

fn require_class(raw: Option<&str>) -> Result<ClassId, ApiError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ClassId::from)
        .ok_or_else(|| ApiError::BadRequest("classId is required".into()))
}

async fn teacher_index(state: &AppState, class_id: &ClassId) -> anyhow::Result<TeacherIndex> {
    let class = class_or_default(&*state.store, class_id).await?;
    let teachers = state.store.teachers().await?;
    Ok(TeacherIndex::build(&teachers, &TimeGrid::for_class(&class.name)))
}

#[utoipa::path(
    get,
    path = "/v1/schedule",
    params(ClassQuery),
    responses(
        (status = 200, description = "Stored schedule, `{}` when none", body = WeeklySchedule),
        (status = 400, description = "classId missing")
    )
)]
pub async fn get_schedule(
    State(state): State<AppState>,
    Query(q): Query<ClassQuery>,
) -> Result<Json<Value>, ApiError> {
    let class_id = require_class(q.class_id.as_deref())?;
    let stored = state.store.load(&class_id).await?;
    Ok(Json(stored.unwrap_or_else(|| Value::Object(Default::default()))))
}

#[utoipa::path(
    put,
    path = "/v1/schedule",
    params(ClassQuery),
    request_body = WeeklySchedule,
    responses(
        (status = 200, description = "Stored verbatim", body = WriteAck),
        (status = 400, description = "classId missing")
    )
)]
pub async fn put_schedule(
    State(state): State<AppState>,
    Query(q): Query<ClassQuery>,
    Json(body): Json<Value>,
) -> Result<Json<WriteAck>, ApiError> {
    let class_id = require_class(q.class_id.as_deref())?;
    let body = if body.is_null() {
        Value::Object(Default::default())
    } else {
        body
    };
    state.store.upsert(&class_id, body).await?;
    info!(class_id = %class_id, "schedule written manually");
    Ok(Json(WriteAck { ok: true }))
}

#[utoipa::path(
    post,
    path = "/v1/schedule/auto",
    params(BuildQuery),
    responses(
        (status = 200, description = "Built and stored", body = BuiltSchedule),
        (status = 400, description = "classId missing"),
        (
            status = 409,
            description = "No placement found, or a build is already running",
            body = StallReport
        ),
        (
            status = 422,
            description = "A subject exceeds its teacher's reach, or the week is over capacity",
            body = SubjectInfeasible
        ),
        (status = 500, description = "Upstream or persistence failure")
    )
)]
pub async fn auto(
    State(state): State<AppState>,
    Query(q): Query<BuildQuery>,
) -> Result<Json<BuiltSchedule>, ApiError> {
    let class_id = require_class(q.class_id.as_deref())?;
    let seed = q
        .seed
        .as_deref()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|s| *s != 0);

    let _guard = match &state.locks {
        Some(locks) => Some(
            locks
                .try_acquire(&class_id)
                .ok_or_else(|| ApiError::Conflict("build already in progress".into()))?,
        ),
        None => None,
    };

    let built = auto_build(
        &*state.store,
        &*state.store,
        &*state.placer,
        BuildRequest { class_id, seed },
    )
    .await?;
    Ok(Json(built))
}

#[utoipa::path(
    get,
    path = "/v1/schedule/audit",
    params(ClassQuery),
    responses(
        (status = 200, description = "Hard-rule violations", body = AuditReport),
        (status = 400, description = "classId missing"),
        (status = 422, description = "Stored document is not a weekly schedule")
    )
)]
pub async fn audit(
    State(state): State<AppState>,
    Query(q): Query<ClassQuery>,
) -> Result<Json<AuditReport>, ApiError> {
    let class_id = require_class(q.class_id.as_deref())?;
    let schedule: WeeklySchedule = match state.store.load(&class_id).await? {
        Some(blob) => serde_json::from_value(blob).map_err(|e| {
            ApiError::Unprocessable(format!("stored schedule is not a weekly grid: {e}"))
        })?,
        None => WeeklySchedule::default(),
    };
    let index = teacher_index(&state, &class_id).await?;
    let violations = audit_schedule(&schedule, &index);
    Ok(Json(AuditReport {
        class_id,
        violations,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/schedule/load",
    params(ClassQuery),
    responses(
        (status = 200, description = "Teacher slots committed by other classes"),
        (status = 400, description = "classId missing")
    )
)]
pub async fn load(
    State(state): State<AppState>,
    Query(q): Query<ClassQuery>,
) -> Result<Json<TeacherLoad>, ApiError> {
    let class_id = require_class(q.class_id.as_deref())?;
    let index = teacher_index(&state, &class_id).await?;
    let others = state.store.list_except(&class_id).await?;
    Ok(Json(committed_load(&others, &index)))
}
