use thiserror::Error;

use types::{BuiltSchedule, CapacityExceeded, StallReport, SubjectInfeasible};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "subject \"{}\" needs {} periods but teacher availability allows max {} (<=3 per day rule)",
        .0.subject, .0.required, .0.max_available_with_rule
    )]
    SubjectInfeasible(SubjectInfeasible),

    #[error(
        "total weekly hours ({}) exceed weekly capacity ({})",
        .0.total_hours, .0.capacity
    )]
    CapacityExceeded(CapacityExceeded),

    #[error(
        "couldn't place a subject at {} period {} under teachers' availability and <=3/day rule",
        .0.day, .0.slot
    )]
    PlacementExhausted(StallReport),

    #[error("failed to read scheduling data: {0:#}")]
    Upstream(#[source] anyhow::Error),

    /// The schedule was built but could not be stored; `built` is still returned to the caller.
    #[error("failed to persist schedule: {source:#}")]
    Persistence {
        #[source]
        source: anyhow::Error,
        built: Box<BuiltSchedule>,
    },
}

impl BuildError {
    /// Infeasible demand can never succeed on retry.
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            BuildError::SubjectInfeasible(_) | BuildError::CapacityExceeded(_)
        )
    }
}
