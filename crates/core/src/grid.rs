use chrono::{Duration, NaiveTime};

use types::PERIODS_PER_DAY;

pub const PERIOD_MINUTES: i64 = 50;
pub const BREAK_MINUTES: i64 = 25;

pub fn day_start() -> NaiveTime {
    NaiveTime::default() + Duration::hours(8)
}

/// Lenient time-of-day: `HH:MM`, `HH:MM:SS`, `H:M` or a bare hour.
/// `24:00` reads as the last second of the day.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%H:%M", "%H:%M:%S"] {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Some(t);
        }
    }
    let mut parts = s.splitn(3, ':');
    let h: u32 = parts.next()?.trim().parse().ok()?;
    let m: u32 = match parts.next().map(str::trim) {
        Some(m) if !m.is_empty() => m.parse().ok()?,
        _ => 0,
    };
    if (h, m) == (24, 0) {
        return NaiveTime::from_hms_opt(23, 59, 59);
    }
    NaiveTime::from_hms_opt(h, m, 0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodSpan {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PeriodSpan {
    pub fn within(&self, from: NaiveTime, to: NaiveTime) -> bool {
        self.start >= from && self.end <= to
    }
}

/// The daily period layout shared by every working day of a class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeGrid {
    pub break_after: usize,
    pub spans: [PeriodSpan; PERIODS_PER_DAY],
}

impl TimeGrid {
    pub fn new(break_after: usize) -> Self {
        let mut spans = [PeriodSpan {
            start: NaiveTime::default(),
            end: NaiveTime::default(),
        }; PERIODS_PER_DAY];
        let mut cur = day_start();
        for (i, span) in spans.iter_mut().enumerate() {
            let end = cur + Duration::minutes(PERIOD_MINUTES);
            *span = PeriodSpan { start: cur, end };
            cur = end;
            if i + 1 == break_after {
                cur += Duration::minutes(BREAK_MINUTES);
            }
        }
        Self { break_after, spans }
    }

    pub fn for_class(class_name: &str) -> Self {
        Self::new(break_after_for_class(class_name))
    }
}

/// KG and grades 1–3 break after the third period, everyone else after the fourth.
pub fn break_after_for_class(class_name: &str) -> usize {
    let s = class_name.to_lowercase();
    if ["kg1", "kg2", "kg3"].iter().any(|k| s.contains(k)) {
        return 3;
    }
    for (idx, _) in s.match_indices("grade") {
        let rest = s[idx + "grade".len()..].trim_start();
        if ["one", "two", "three"].iter().any(|w| rest.starts_with(w)) {
            return 3;
        }
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if matches!(digits.as_str(), "1" | "2" | "3") {
            return 3;
        }
    }
    4
}
