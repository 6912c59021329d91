//! Teacher availability: raw weekly time windows translated onto the period grid.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use types::{TeacherId, Weekday, PERIODS_PER_DAY};

use crate::grid::{parse_clock, TimeGrid};

/// Per working day, per period availability.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WeekGrid(pub [[bool; PERIODS_PER_DAY]; 5]);

impl WeekGrid {
    pub fn full() -> Self {
        Self([[true; PERIODS_PER_DAY]; 5])
    }

    pub fn get(&self, day: Weekday, period: usize) -> bool {
        match day.working_index() {
            Some(d) => self.0[d].get(period).copied().unwrap_or(false),
            None => false,
        }
    }

    pub fn set(&mut self, day: Weekday, period: usize) {
        if let Some(d) = day.working_index() {
            if period < PERIODS_PER_DAY {
                self.0[d][period] = true;
            }
        }
    }

    pub fn count_on(&self, day: Weekday) -> u32 {
        match day.working_index() {
            Some(d) => self.0[d].iter().filter(|v| **v).count() as u32,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().flatten().all(|v| !*v)
    }
}

/// What the engine knows about when a teacher can teach.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Availability {
    /// No profile exists; the teacher is treated as always available.
    Unconstrained,
    /// A profile exists but yields no usable period (empty, malformed or all disabled).
    NoAvailableSlots,
    Slots(WeekGrid),
}

impl Availability {
    pub fn is_available(&self, day: Weekday, period: usize) -> bool {
        match self {
            Availability::Unconstrained => day.is_working() && period < PERIODS_PER_DAY,
            Availability::NoAvailableSlots => false,
            Availability::Slots(g) => g.get(day, period),
        }
    }

    pub fn periods_on(&self, day: Weekday) -> u32 {
        match self {
            Availability::Unconstrained if day.is_working() => PERIODS_PER_DAY as u32,
            Availability::Unconstrained | Availability::NoAvailableSlots => 0,
            Availability::Slots(g) => g.count_on(day),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDay {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    slots: Vec<RawWindow>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWindow {
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

/// Translates a teacher's raw availability document onto `grid`.
///
/// `None` means the teacher has no profile at all. A profile that cannot be
/// parsed, or that leaves every period closed, becomes [`Availability::NoAvailableSlots`].
pub fn translate(
    teacher: &TeacherId,
    raw: Option<&serde_json::Value>,
    grid: &TimeGrid,
) -> Availability {
    let Some(raw) = raw else {
        return Availability::Unconstrained;
    };
    let raw = match raw {
        serde_json::Value::String(s) => match serde_json::from_str(s) {
            Ok(v) => v,
            Err(e) => {
                warn!(teacher = %teacher, error = %e, "availability is not valid json");
                return Availability::NoAvailableSlots;
            }
        },
        v => v.clone(),
    };
    let days: HashMap<String, serde_json::Value> = match serde_json::from_value(raw) {
        Ok(d) => d,
        Err(e) => {
            warn!(teacher = %teacher, error = %e, "availability is not a day map");
            return Availability::NoAvailableSlots;
        }
    };

    let mut out = WeekGrid::default();
    for (key, value) in days {
        let Some(day) = Weekday::parse_loose(&key) else {
            continue;
        };
        if !day.is_working() {
            continue;
        }
        // one bad day entry does not invalidate the others
        let Ok(raw_day) = serde_json::from_value::<RawDay>(value) else {
            warn!(teacher = %teacher, day = %day, "skipping malformed availability day");
            continue;
        };
        if !raw_day.enabled {
            continue;
        }
        for w in raw_day.slots {
            let from = w.start.as_deref().and_then(parse_clock);
            let to = w.end.as_deref().and_then(parse_clock);
            let (Some(from), Some(to)) = (from, to) else {
                continue;
            };
            if from >= to {
                continue;
            }
            for (p, span) in grid.spans.iter().enumerate() {
                if span.within(from, to) {
                    out.set(day, p);
                }
            }
        }
    }

    if out.is_empty() {
        Availability::NoAvailableSlots
    } else {
        Availability::Slots(out)
    }
}
