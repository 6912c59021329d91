use std::collections::BTreeMap;

use types::{Violation, WeeklySchedule, DAILY_CAP, PERIODS_PER_DAY};

use crate::availability::Availability;
use crate::demand::{norm_name, TeacherIndex};

/// Hard-rule violations in a weekly schedule, built or hand-edited.
///
/// Teachers are resolved by name; sessions whose teacher has no entry in
/// `index` are never reported as unavailable.
pub fn audit_schedule(schedule: &WeeklySchedule, index: &TeacherIndex) -> Vec<Violation> {
    let mut out = Vec::new();

    for (day, row) in &schedule.0 {
        let mut per_subject: BTreeMap<String, (String, u32)> = BTreeMap::new();

        for (p, session) in row.iter().enumerate() {
            let Some(session) = session else { continue };

            if !day.is_working() {
                out.push(Violation {
                    r#type: "non_working_day".into(),
                    weight: 1,
                    details: serde_json::json!({
                        "day": day, "slot": p + 1, "subject": session.subject,
                    }),
                });
                continue;
            }
            if p >= PERIODS_PER_DAY {
                out.push(Violation {
                    r#type: "slot_out_of_range".into(),
                    weight: 1,
                    details: serde_json::json!({
                        "day": day, "slot": p + 1, "subject": session.subject,
                    }),
                });
                continue;
            }

            per_subject
                .entry(norm_name(&session.subject))
                .or_insert_with(|| (session.subject.clone(), 0))
                .1 += 1;

            if session.teacher.trim().is_empty() {
                continue;
            }
            let av = index.availability_of(None, &session.teacher);
            if av != Availability::Unconstrained && !av.is_available(*day, p) {
                out.push(Violation {
                    r#type: "teacher_unavailable".into(),
                    weight: 1,
                    details: serde_json::json!({
                        "day": day,
                        "slot": p + 1,
                        "subject": session.subject,
                        "teacher": session.teacher,
                    }),
                });
            }
        }

        for (subject, count) in per_subject.into_values() {
            if count > DAILY_CAP {
                out.push(Violation {
                    r#type: "daily_cap".into(),
                    weight: (count - DAILY_CAP) as i64,
                    details: serde_json::json!({
                        "day": day, "subject": subject, "count": count, "cap": DAILY_CAP,
                    }),
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TimeGrid;
    use serde_json::json;
    use types::{Session, TeacherId, TeacherRecord, Weekday};

    fn session(subject: &str, teacher: &str) -> Session {
        Session {
            subject: subject.into(),
            teacher: teacher.into(),
            room: String::new(),
        }
    }

    fn index() -> TeacherIndex {
        TeacherIndex::build(
            &[TeacherRecord {
                id: TeacherId("1".into()),
                full_name: Some("Mona".into()),
                availability: Some(json!({
                    "monday": { "enabled": true, "slots": [{ "start": "08:00", "end": "10:30" }] }
                })),
            }],
            &TimeGrid::new(4),
        )
    }

    #[test]
    fn clean_schedule_has_no_violations() {
        let mut s = WeeklySchedule::blank();
        s.set(Weekday::Monday, 0, session("Math", "Mona"));
        s.set(Weekday::Monday, 1, session("Math", "mona"));
        s.set(Weekday::Tuesday, 6, session("Art", "Somebody Else"));
        s.set(Weekday::Saturday, 3, session("Activity", ""));
        assert!(audit_schedule(&s, &index()).is_empty());
    }

    #[test]
    fn reports_each_broken_rule() {
        let mut s = WeeklySchedule::blank();
        for p in 0..3 {
            s.set(Weekday::Monday, p, session("Math", "Mona"));
        }
        s.set(Weekday::Monday, 3, session("math", "Mona"));
        s.set(Weekday::Friday, 0, session("Art", ""));
        s.set(Weekday::Thursday, 8, session("Art", ""));

        let v = audit_schedule(&s, &index());
        let kinds: Vec<_> = v.iter().map(|v| v.r#type.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "teacher_unavailable",
                "daily_cap",
                "slot_out_of_range",
                "non_working_day"
            ]
        );
        assert_eq!(v[0].details["slot"], 4);
        assert_eq!(v[1].weight, 1);
        assert_eq!(v[1].details["count"], 4);
    }

    #[test]
    fn namesakes_resolve_to_the_lowest_id() {
        let index = TeacherIndex::build(
            &[
                TeacherRecord {
                    id: TeacherId("2".into()),
                    full_name: Some("Sam".into()),
                    availability: Some(json!({
                        "monday": {
                            "enabled": true,
                            "slots": [{ "start": "12:00", "end": "14:15" }]
                        }
                    })),
                },
                TeacherRecord {
                    id: TeacherId("1".into()),
                    full_name: Some("Sam".into()),
                    availability: Some(json!({
                        "tuesday": {
                            "enabled": true,
                            "slots": [{ "start": "08:00", "end": "10:30" }]
                        }
                    })),
                },
            ],
            &TimeGrid::new(4),
        );
        let mut s = WeeklySchedule::blank();
        s.set(Weekday::Tuesday, 0, session("Math", "Sam"));
        assert!(audit_schedule(&s, &index).is_empty());

        s.set(Weekday::Monday, 6, session("Math", "Sam"));
        let v = audit_schedule(&s, &index);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].r#type, "teacher_unavailable");
        assert_eq!(v[0].details["day"], "Monday");
    }
}
