use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Raw-text marker for events the extractor produced without a verbatim
/// source snippet.
pub const INFERRED_RAW_TEXT: &str = "(Inferred from schedule)";

// --- Enums ---

/// Weekday/weekend classification, used to pick default locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Weekday,
    Weekend,
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayType::Weekday => write!(f, "weekday"),
            DayType::Weekend => write!(f, "weekend"),
        }
    }
}

/// Supported calendar export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarFormat {
    Ics,
    Google,
    Outlook,
}

impl CalendarFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            CalendarFormat::Ics => "ics",
            CalendarFormat::Google | CalendarFormat::Outlook => "csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            CalendarFormat::Ics => "text/calendar",
            CalendarFormat::Google | CalendarFormat::Outlook => "text/csv",
        }
    }
}

impl fmt::Display for CalendarFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarFormat::Ics => write!(f, "ics"),
            CalendarFormat::Google => write!(f, "google_calendar"),
            CalendarFormat::Outlook => write!(f, "outlook"),
        }
    }
}

// --- Location ---

/// A physical training location. The registry in [`crate::Config`] maps
/// location name to this value; events reference locations by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub is_default_weekday: bool,
    #[serde(default)]
    pub is_default_weekend: bool,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.address)
    }
}

// --- Event ---

/// A calendar event, either a raw extraction candidate or a final
/// rules-processed entry. Times are local wall-clock with no offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub summary: String,
    /// Resolved copy of the registry entry, if the name mapped to one.
    pub location: Option<Location>,
    /// Raw location name as reported by extraction, before resolution.
    pub location_name: Option<String>,
    pub is_ambiguous: bool,
    /// Verbatim source snippet, or [`INFERRED_RAW_TEXT`] when none existed.
    pub raw_text: Option<String>,
    /// Free-text annotations, populated when events are merged.
    pub notes: Option<String>,
}

impl Event {
    pub fn day_type(&self) -> DayType {
        // Mon..Fri are 0..4
        if self.start_time.weekday().num_days_from_monday() < 5 {
            DayType::Weekday
        } else {
            DayType::Weekend
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

// --- Wire form ---

/// Serialized form of an [`Event`] as persisted inside cache records.
/// `location_name` is resolved against the live registry on read, so a
/// renamed or deleted location degrades to an unresolved reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub summary: String,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    #[serde(default)]
    pub is_ambiguous: bool,
    pub day_type: DayType,
    pub duration_minutes: i64,
}

impl EventRecord {
    pub fn from_event(event: &Event) -> Self {
        Self {
            start_time: event.start_time,
            end_time: event.end_time,
            summary: event.summary.clone(),
            location_name: event
                .location_name
                .clone()
                .or_else(|| event.location.as_ref().map(|loc| loc.name.clone())),
            location_address: event.location.as_ref().map(|loc| loc.address.clone()),
            is_ambiguous: event.is_ambiguous,
            day_type: event.day_type(),
            duration_minutes: event.duration_minutes(),
        }
    }

    pub fn into_event(self, locations: &BTreeMap<String, Location>) -> Event {
        let location = self
            .location_name
            .as_deref()
            .and_then(|name| locations.get(name))
            .cloned();
        Event {
            start_time: self.start_time,
            end_time: self.end_time,
            summary: self.summary,
            location,
            location_name: self.location_name,
            is_ambiguous: self.is_ambiguous,
            raw_text: None,
            notes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn event(start: NaiveDateTime, end: NaiveDateTime) -> Event {
        Event {
            start_time: start,
            end_time: end,
            summary: "Practice".to_string(),
            location: None,
            location_name: None,
            is_ambiguous: false,
            raw_text: None,
            notes: None,
        }
    }

    #[test]
    fn thursday_is_weekday() {
        // 2026-01-29 is a Thursday
        let e = event(at(2026, 1, 29, 18, 0), at(2026, 1, 29, 20, 0));
        assert_eq!(e.day_type(), DayType::Weekday);
    }

    #[test]
    fn saturday_is_weekend() {
        // 2026-01-31 is a Saturday
        let e = event(at(2026, 1, 31, 9, 0), at(2026, 1, 31, 11, 0));
        assert_eq!(e.day_type(), DayType::Weekend);
    }

    #[test]
    fn duration_in_whole_minutes() {
        let e = event(at(2026, 1, 29, 18, 0), at(2026, 1, 29, 20, 30));
        assert_eq!(e.duration_minutes(), 150);
    }

    #[test]
    fn record_prefers_raw_location_name() {
        let mut e = event(at(2026, 1, 29, 18, 0), at(2026, 1, 29, 20, 0));
        e.location_name = Some("Regis".to_string());
        e.location = Some(Location {
            name: "Regis".to_string(),
            address: "235 Wellesley St".to_string(),
            is_default_weekday: false,
            is_default_weekend: false,
        });
        let record = EventRecord::from_event(&e);
        assert_eq!(record.location_name.as_deref(), Some("Regis"));
        assert_eq!(record.location_address.as_deref(), Some("235 Wellesley St"));
        assert_eq!(record.day_type, DayType::Weekday);
        assert_eq!(record.duration_minutes, 120);
    }

    #[test]
    fn record_resolves_against_current_registry() {
        let mut e = event(at(2026, 1, 29, 18, 0), at(2026, 1, 29, 20, 0));
        e.location_name = Some("Regis".to_string());
        let record = EventRecord::from_event(&e);

        let empty = BTreeMap::new();
        let unresolved = record.clone().into_event(&empty);
        assert!(unresolved.location.is_none());
        assert_eq!(unresolved.location_name.as_deref(), Some("Regis"));

        let mut registry = BTreeMap::new();
        registry.insert(
            "Regis".to_string(),
            Location {
                name: "Regis".to_string(),
                address: "235 Wellesley St".to_string(),
                is_default_weekday: true,
                is_default_weekend: false,
            },
        );
        let resolved = record.into_event(&registry);
        assert_eq!(resolved.location.unwrap().address, "235 Wellesley St");
    }

    #[test]
    fn record_serializes_day_type_as_snake_case() {
        let e = event(at(2026, 1, 31, 9, 0), at(2026, 1, 31, 11, 0));
        let record = EventRecord::from_event(&e);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["day_type"], "weekend");
        assert_eq!(json["start_time"], "2026-01-31T09:00:00");
    }
}
