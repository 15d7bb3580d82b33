//! Éléments planifiés et lecture des dates de sortie

use chrono::{
    DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

/// Formats acceptés sans fuseau (ex: champ HTML `datetime-local`), en heure locale
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Un morceau en attente de publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ersserver", derive(utoipa::ToSchema))]
pub struct ScheduledItem {
    /// Nom du fichier dans le répertoire média
    pub file: String,
    /// Date de sortie (ISO-8601)
    #[serde(with = "release_time")]
    #[cfg_attr(feature = "ersserver", schema(value_type = String, example = "2024-06-01T00:00:00.000Z"))]
    pub time: DateTime<Utc>,
}

impl ScheduledItem {
    pub fn new(file: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            file: file.into(),
            time,
        }
    }

    /// Vrai si la date de sortie est atteinte à `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.time <= now
    }
}

/// Demande de planification non validée, telle que reçue de l'opérateur
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ScheduleEntry {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub time: String,
}

impl ScheduleEntry {
    pub fn new(file: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            time: time.into(),
        }
    }

    /// Description utilisée dans les messages d'erreur
    pub fn describe(&self) -> String {
        format!("{} @ {}", self.file, self.time)
    }
}

/// Vue complète de l'état publié/planifié
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "ersserver", derive(utoipa::ToSchema))]
pub struct ReleaseState {
    pub published: Vec<String>,
    pub scheduled: Vec<ScheduledItem>,
}

/// Interprète une date de sortie
///
/// Accepte RFC 3339 (avec `Z` ou décalage), ISO-8601 avec décalage compact,
/// une date-heure sans fuseau (heure locale du serveur) et une date seule
/// (minuit UTC).
pub fn parse_release_time(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Forme persistée : RFC 3339 UTC à la milliseconde
pub fn format_release_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod release_time {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_release_time(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_release_time(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid release time: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339() {
        let t = parse_release_time("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let offset = parse_release_time("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(offset, t);

        let compact = parse_release_time("2024-01-01T02:00:00+0200").unwrap();
        assert_eq!(compact, t);
    }

    #[test]
    fn test_parse_datetime_local_uses_local_time() {
        let parsed = parse_release_time("2024-06-01T10:30").unwrap();
        let expected = Local
            .with_ymd_and_hms(2024, 6, 1, 10, 30, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_date_only_is_utc_midnight() {
        let parsed = parse_release_time("2024-06-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_release_time("").is_none());
        assert!(parse_release_time("tomorrow").is_none());
        assert!(parse_release_time("2024-13-01T00:00:00Z").is_none());
    }

    #[test]
    fn test_item_json_shape() {
        let item = ScheduledItem::new("a.mp3", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"file": "a.mp3", "time": "2024-01-01T00:00:00.000Z"})
        );

        let back: ScheduledItem =
            serde_json::from_value(serde_json::json!({"file": "a.mp3", "time": "2024-01-01T00:00:00Z"}))
                .unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_is_due_includes_exact_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(ScheduledItem::new("a.mp3", now).is_due(now));
        assert!(!ScheduledItem::new("a.mp3", now + chrono::Duration::seconds(1)).is_due(now));
    }
}
