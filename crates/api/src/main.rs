mod config;
mod error;
mod state;
mod telemetry;
pub mod routes {
    pub mod health;
    pub mod schedule;
}

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Settings;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::schedule::get_schedule,
        routes::schedule::put_schedule,
        routes::schedule::auto,
        routes::schedule::audit,
        routes::schedule::load,
    ),
    components(schemas(
        types::ClassId, types::TeacherId, types::Weekday, types::Session,
        types::WeeklySchedule, types::ClassInfo, types::TeacherRecord,
        types::BuildMeta, types::BuiltSchedule, types::SubjectInfeasible,
        types::SubjectHours, types::CapacityExceeded, types::StallCandidate,
        types::StallReport, types::Violation,
        routes::health::Health,
        routes::schedule::WriteAck,
        routes::schedule::AuditReport,
    )),
    tags(
        (name = "timetable", description = "Weekly class timetable builder")
    )
)]
struct ApiDoc;

fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(routes::health::health))
        .route(
            "/v1/schedule",
            get(routes::schedule::get_schedule).put(routes::schedule::put_schedule),
        )
        .route("/v1/schedule/auto", post(routes::schedule::auto))
        .route("/v1/schedule/audit", get(routes::schedule::audit))
        .route("/v1/schedule/load", get(routes::schedule::load))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(telemetry::stack())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let settings = Settings::from_env()?;
    tracing::info!(?settings, "starting");
    let app = router(AppState::from_settings(&settings)?);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
