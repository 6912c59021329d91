use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

pub const PERIODS_PER_DAY: usize = 7;
pub const DAILY_CAP: u32 = 3;
pub const WEEKLY_CAPACITY: u32 = (Weekday::WORKING.len() * PERIODS_PER_DAY) as u32;

/// Subject used to pad an under-subscribed week up to full capacity.
pub const FILLER_SUBJECT: &str = "Activity";

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone,
            Debug,
            Serialize,
            Deserialize,
            ToSchema,
            JsonSchema,
            Eq,
            PartialEq,
            Hash,
            PartialOrd,
            Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}
id_newtype!(ClassId);
id_newtype!(TeacherId);

#[derive(
    Clone,
    Copy,
    Debug,
    Serialize,
    Deserialize,
    ToSchema,
    JsonSchema,
    Eq,
    PartialEq,
    Hash,
    PartialOrd,
    Ord,
)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Days a class is taught on. Friday and Sunday are never scheduled.
    pub const WORKING: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Saturday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    /// Lenient day-key parsing: `mon`, `Monday`, `MONDAYS` all map to Monday.
    pub fn parse_loose(key: &str) -> Option<Weekday> {
        let s = key.trim().to_lowercase();
        let day = match s.get(..3)? {
            "mon" => Weekday::Monday,
            "tue" => Weekday::Tuesday,
            "wed" => Weekday::Wednesday,
            "thu" => Weekday::Thursday,
            "fri" => Weekday::Friday,
            "sat" => Weekday::Saturday,
            "sun" => Weekday::Sunday,
            _ => return None,
        };
        Some(day)
    }

    pub fn is_working(self) -> bool {
        Self::WORKING.contains(&self)
    }

    /// Position in [`Weekday::WORKING`], `None` for Friday and Sunday.
    pub fn working_index(self) -> Option<usize> {
        Self::WORKING.iter().position(|d| *d == self)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
pub struct Session {
    pub subject: String,
    #[serde(default, alias = "teacherName")]
    pub teacher: String,
    #[serde(default)]
    pub room: String,
}

/// Day → seven ordered slots. Empty slots serialize as `null`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(transparent)]
pub struct WeeklySchedule(pub BTreeMap<Weekday, Vec<Option<Session>>>);

impl WeeklySchedule {
    /// All working days present, every slot empty.
    pub fn blank() -> Self {
        Self(
            Weekday::WORKING
                .iter()
                .map(|d| (*d, vec![None; PERIODS_PER_DAY]))
                .collect(),
        )
    }

    pub fn day(&self, day: Weekday) -> &[Option<Session>] {
        self.0.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&mut self, day: Weekday, period: usize, session: Session) {
        let row = self
            .0
            .entry(day)
            .or_insert_with(|| vec![None; PERIODS_PER_DAY]);
        if row.len() <= period {
            row.resize(period + 1, None);
        }
        row[period] = Some(session);
    }

    pub fn get(&self, day: Weekday, period: usize) -> Option<&Session> {
        self.day(day).get(period).and_then(Option::as_ref)
    }

    pub fn filled(&self) -> usize {
        self.sessions().count()
    }

    /// Non-empty slots as `(day, zero-based period, session)`.
    pub fn sessions(&self) -> impl Iterator<Item = (Weekday, usize, &Session)> {
        self.0.iter().flat_map(|(day, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(p, s)| s.as_ref().map(|s| (*day, p, s)))
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ClassInfo {
    pub id: ClassId,
    pub name: String,
}

/// A raw subject row as stored upstream. Key names vary between sources.
pub type RawSubjectRow = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct TeacherRecord {
    pub id: TeacherId,
    #[serde(default)]
    pub full_name: Option<String>,
    /// `None` when the teacher has no profile row at all.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub availability: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct BuildRequest {
    pub class_id: ClassId,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
pub struct BuildMeta {
    pub class_id: ClassId,
    pub class_name: String,
    pub days: usize,
    pub periods_per_day: usize,
    pub weekly_capacity: u32,
    pub seed: u64,
    pub attempts: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct BuiltSchedule {
    pub schedule: WeeklySchedule,
    pub meta: BuildMeta,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
pub struct SubjectInfeasible {
    pub subject: String,
    pub required: u32,
    pub max_available_with_rule: u32,
    pub teacher: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
pub struct SubjectHours {
    pub subject: String,
    pub weekly_hours: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub capacity: u32,
    pub total_hours: u32,
    pub by_subject: Vec<SubjectHours>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
pub struct StallCandidate {
    pub subject: String,
    pub remaining: u32,
    pub used_today: u32,
    pub teacher: String,
    pub teacher_available: bool,
}

/// Where the last placement attempt got stuck. `slot` is 1-based.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
pub struct StallReport {
    pub day: Weekday,
    pub slot: usize,
    pub candidates: Vec<StallCandidate>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Violation {
    pub r#type: String,
    pub weight: i64,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_day_keys() {
        assert_eq!(Weekday::parse_loose("mon"), Some(Weekday::Monday));
        assert_eq!(Weekday::parse_loose(" THURSDAY "), Some(Weekday::Thursday));
        assert_eq!(Weekday::parse_loose("Sat"), Some(Weekday::Saturday));
        assert_eq!(Weekday::parse_loose("fri"), Some(Weekday::Friday));
        assert_eq!(Weekday::parse_loose("mo"), None);
        assert_eq!(Weekday::parse_loose("holiday"), None);
        assert!(!Weekday::Friday.is_working());
        assert!(!Weekday::Sunday.is_working());
        assert_eq!(Weekday::Saturday.working_index(), Some(4));
    }

    #[test]
    fn schedule_serializes_as_day_map_with_null_slots() {
        let mut s = WeeklySchedule::blank();
        s.set(
            Weekday::Tuesday,
            2,
            Session {
                subject: "Math".into(),
                teacher: "Ms. Noor".into(),
                room: String::new(),
            },
        );
        let v = serde_json::to_value(&s).unwrap();
        let obj = v.as_object().unwrap();
        let keys: Vec<_> = obj.keys().cloned().collect();
        assert_eq!(
            keys.len(),
            5,
            "only working days are present in a blank schedule"
        );
        assert!(!obj.contains_key("Friday"));
        assert_eq!(v["Tuesday"][2]["subject"], "Math");
        assert!(v["Tuesday"][0].is_null());
        assert_eq!(v["Monday"].as_array().unwrap().len(), PERIODS_PER_DAY);
        assert_eq!(s.filled(), 1);
    }

    #[test]
    fn session_accepts_teacher_name_alias() {
        let s: Session =
            serde_json::from_value(serde_json::json!({"subject": "Art", "teacherName": "T1"}))
                .unwrap();
        assert_eq!(s.teacher, "T1");
        assert_eq!(s.room, "");
    }

    #[test]
    fn weekly_capacity_is_thirty_five() {
        assert_eq!(WEEKLY_CAPACITY, 35);
    }
}
