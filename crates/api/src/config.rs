use anyhow::Context;
use std::path::PathBuf;

/// Service settings, read from `TIMETABLE__*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    /// JSON fixture with classes, subjects, teachers and schedules.
    pub data_path: Option<PathBuf>,
    pub max_attempts: u32,
    /// Reject a second concurrent build for the same class.
    pub locking: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8080,
            data_path: None,
            max_attempts: solver_heur::DEFAULT_MAX_ATTEMPTS,
            locking: true,
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut s = Self::default();
        if let Some(v) = get("TIMETABLE__SERVER__PORT") {
            s.port = v
                .trim()
                .parse()
                .with_context(|| format!("TIMETABLE__SERVER__PORT: invalid port {v:?}"))?;
        }
        if let Some(v) = get("TIMETABLE__DATA__PATH").filter(|v| !v.trim().is_empty()) {
            s.data_path = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = get("TIMETABLE__BUILD__MAX_ATTEMPTS") {
            s.max_attempts = v
                .trim()
                .parse()
                .with_context(|| format!("TIMETABLE__BUILD__MAX_ATTEMPTS: invalid count {v:?}"))?;
        }
        if let Some(v) = get("TIMETABLE__BUILD__LOCKING") {
            s.locking = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => anyhow::bail!("TIMETABLE__BUILD__LOCKING: expected true/false, got {v:?}"),
            };
        }
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let s = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.port, 8080);
        assert_eq!(s.max_attempts, 6);
        assert!(s.locking);
    }

    #[test]
    fn reads_overrides() {
        let s = Settings::from_lookup(lookup(&[
            ("TIMETABLE__SERVER__PORT", "9000"),
            ("TIMETABLE__DATA__PATH", " ./seed.json "),
            ("TIMETABLE__BUILD__MAX_ATTEMPTS", "12"),
            ("TIMETABLE__BUILD__LOCKING", "off"),
        ]))
        .unwrap();
        assert_eq!(s.port, 9000);
        assert_eq!(s.data_path, Some(PathBuf::from("./seed.json")));
        assert_eq!(s.max_attempts, 12);
        assert!(!s.locking);
    }

    #[test]
    fn rejects_garbage() {
        let err =
            Settings::from_lookup(lookup(&[("TIMETABLE__SERVER__PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("TIMETABLE__SERVER__PORT"));
        assert!(Settings::from_lookup(lookup(&[("TIMETABLE__BUILD__LOCKING", "maybe")])).is_err());
    }
}
