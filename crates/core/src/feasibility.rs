use types::{CapacityExceeded, SubjectInfeasible, Weekday, DAILY_CAP, WEEKLY_CAPACITY};

use crate::availability::Availability;
use crate::demand::DemandPlan;
use crate::error::BuildError;

/// Most periods a subject can take in a week given its teacher and the daily cap.
pub fn weekly_max(av: &Availability) -> u32 {
    Weekday::WORKING
        .iter()
        .map(|d| av.periods_on(*d).min(DAILY_CAP))
        .sum()
}

/// Rejects demand that no placement can satisfy: per subject first, then the week total.
pub fn check(plan: &DemandPlan) -> Result<(), BuildError> {
    for s in &plan.subjects {
        let max = weekly_max(&s.availability);
        if s.hours > max {
            let teacher = if s.teacher.is_empty() {
                "(unknown)".to_string()
            } else {
                s.teacher.clone()
            };
            return Err(BuildError::SubjectInfeasible(SubjectInfeasible {
                subject: s.subject.clone(),
                required: s.hours,
                max_available_with_rule: max,
                teacher,
            }));
        }
    }

    let total = plan.total_hours();
    if total > WEEKLY_CAPACITY {
        return Err(BuildError::CapacityExceeded(CapacityExceeded {
            capacity: WEEKLY_CAPACITY,
            total_hours: total,
            by_subject: plan.by_subject(),
        }));
    }
    Ok(())
}
