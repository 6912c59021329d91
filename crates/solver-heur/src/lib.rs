use rand::seq::SliceRandom;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sched_core::demand::DemandPlan;
use sched_core::{Placement, Placer};
use tracing::{debug, warn};
use types::{
    Session, StallCandidate, StallReport, Weekday, WeeklySchedule, DAILY_CAP, PERIODS_PER_DAY,
};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Added to the attempt seed after every dead end.
const SEED_STEP: u64 = 1_013_904_223;
const DAY_ORDER_SALT: u64 = 0x9E37_79B1;

/// Randomized greedy placement with whole-pass restarts.
pub struct HeurPlacer {
    max_attempts: u32,
}

impl HeurPlacer {
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for HeurPlacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Placer for HeurPlacer {
    fn place(&self, plan: &DemandPlan, seed: u64) -> Result<Placement, StallReport> {
        // One weighted-choice stream for the whole call; only the orderings are reseeded.
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut attempt_seed = seed;
        let mut state = Attempt::new(plan);

        let mut attempt = 1;
        loop {
            match state.run(plan, attempt_seed, &mut rng) {
                Ok(()) => {
                    debug!(attempt, seed = attempt_seed, "placement succeeded");
                    return Ok(Placement {
                        schedule: state.schedule,
                        seed: attempt_seed,
                        attempts: attempt,
                    });
                }
                Err(stall) => {
                    warn!(
                        attempt,
                        seed = attempt_seed,
                        day = %stall.day,
                        slot = stall.period + 1,
                        "placement attempt stalled"
                    );
                    if attempt >= self.max_attempts {
                        return Err(state.report(plan, stall));
                    }
                }
            }
            attempt += 1;
            attempt_seed = attempt_seed.wrapping_add(SEED_STEP);
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Stall {
    day: Weekday,
    day_idx: usize,
    period: usize,
}

/// Working state of one pass; indices follow `plan.subjects`.
struct Attempt {
    schedule: WeeklySchedule,
    remaining: Vec<u32>,
    per_day: Vec<[u32; 5]>,
}

impl Attempt {
    fn new(plan: &DemandPlan) -> Self {
        Self {
            schedule: WeeklySchedule::blank(),
            remaining: plan.subjects.iter().map(|s| s.hours).collect(),
            per_day: vec![[0; 5]; plan.subjects.len()],
        }
    }

    fn reset(&mut self, plan: &DemandPlan) {
        *self = Self::new(plan);
    }

    fn run(
        &mut self,
        plan: &DemandPlan,
        attempt_seed: u64,
        rng: &mut ChaCha8Rng,
    ) -> Result<(), Stall> {
        self.reset(plan);

        let mut days: Vec<(usize, Weekday)> =
            Weekday::WORKING.iter().copied().enumerate().collect();
        days.shuffle(&mut ChaCha8Rng::seed_from_u64(attempt_seed ^ DAY_ORDER_SALT));

        for (day_idx, day) in days {
            let mut periods: Vec<usize> = (0..PERIODS_PER_DAY).collect();
            periods.shuffle(&mut ChaCha8Rng::seed_from_u64(
                attempt_seed ^ day.as_str().len() as u64,
            ));

            for period in periods {
                let eligible: Vec<(usize, u32)> = plan
                    .subjects
                    .iter()
                    .enumerate()
                    .filter(|(i, s)| {
                        self.remaining[*i] > 0
                            && self.per_day[*i][day_idx] < DAILY_CAP
                            && s.availability.is_available(day, period)
                    })
                    .map(|(i, _)| (i, self.remaining[i]))
                    .collect();

                let Ok(&(chosen, _)) = eligible.choose_weighted(rng, |c| c.1) else {
                    return Err(Stall {
                        day,
                        day_idx,
                        period,
                    });
                };

                let subject = &plan.subjects[chosen];
                self.schedule.set(
                    day,
                    period,
                    Session {
                        subject: subject.subject.clone(),
                        teacher: subject.teacher.clone(),
                        room: String::new(),
                    },
                );
                self.remaining[chosen] -= 1;
                self.per_day[chosen][day_idx] += 1;
            }
        }
        Ok(())
    }

    fn report(&self, plan: &DemandPlan, stall: Stall) -> StallReport {
        let candidates = plan
            .subjects
            .iter()
            .enumerate()
            .filter(|(i, _)| self.remaining[*i] > 0)
            .map(|(i, s)| StallCandidate {
                subject: s.subject.clone(),
                remaining: self.remaining[i],
                used_today: self.per_day[i][stall.day_idx],
                teacher: s.teacher.clone(),
                teacher_available: s.availability.is_available(stall.day, stall.period),
            })
            .collect();
        StallReport {
            day: stall.day,
            slot: stall.period + 1,
            candidates,
        }
    }
}
