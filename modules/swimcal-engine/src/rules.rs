use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use swimcal_common::{Config, Event, INFERRED_RAW_TEXT};

/// Raw snippets longer than this are summarized as a bare time range in
/// merge notes.
const NOTE_SNIPPET_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One diagnostic from [`RulesEngine::validate`]. Diagnostics never
/// remove or mutate events.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub event_index: usize,
    pub event_summary: String,
    pub message: String,
    pub severity: Severity,
}

/// Deterministic post-processing over extracted events: default-location
/// assignment, overlap merge, dedup, sort. Each stage is a pure
/// list-in/list-out function.
pub struct RulesEngine {
    config: Config,
}

impl RulesEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Full pipeline in fixed stage order.
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        let events = self.assign_default_locations(events);
        let events = merge_overlapping(events);
        let events = deduplicate(events);
        sort_by_start(events)
    }

    /// Fill in the day-type default location for events without a
    /// resolved location. Explicit locations always win.
    pub fn assign_default_locations(&self, mut events: Vec<Event>) -> Vec<Event> {
        for event in &mut events {
            if event.location.is_some() {
                continue;
            }
            if let Some(default) = self.config.default_location_for(event.day_type()) {
                event.location = Some(default.clone());
                if event.location_name.is_none() {
                    event.location_name = Some(default.name.clone());
                }
            }
        }
        events
    }

    /// Scan for problems without mutating anything.
    pub fn validate(&self, events: &[Event]) -> Vec<ValidationIssue> {
        let now = Utc::now().naive_utc();
        let mut issues = Vec::new();

        for (i, event) in events.iter().enumerate() {
            if event.location.is_none() {
                issues.push(issue(i, event, "Missing location", Severity::Warning));
            }
            if event.start_time >= event.end_time {
                issues.push(issue(
                    i,
                    event,
                    "Start time is after or equal to end time",
                    Severity::Error,
                ));
            }
            if event.start_time < now {
                issues.push(issue(i, event, "Event is in the past", Severity::Info));
            }
            if event.is_ambiguous {
                issues.push(issue(
                    i,
                    event,
                    "Event flagged as ambiguous by AI",
                    Severity::Warning,
                ));
            }
        }

        issues
    }
}

fn issue(index: usize, event: &Event, message: &str, severity: Severity) -> ValidationIssue {
    ValidationIssue {
        event_index: index,
        event_summary: event.summary.clone(),
        message: message.to_string(),
        severity,
    }
}

/// Merge overlapping or exactly-adjacent events on the same day at the
/// same location into single calendar blocks. The group's end time
/// extends as members join, so chains of overlaps merge transitively.
pub fn merge_overlapping(events: Vec<Event>) -> Vec<Event> {
    if events.is_empty() {
        return events;
    }

    let mut sorted = events;
    sorted.sort_by(|a, b| {
        let key_a = (a.start_time.date(), location_key(a), a.start_time);
        let key_b = (b.start_time.date(), location_key(b), b.start_time);
        key_a.cmp(&key_b)
    });

    let mut merged = Vec::new();
    let mut i = 0;

    while i < sorted.len() {
        let current = &sorted[i];
        let mut group_end = current.end_time;
        let mut j = i + 1;

        while j < sorted.len() {
            let next = &sorted[j];
            let same_day = current.start_time.date() == next.start_time.date();
            let same_location = match (&current.location, &next.location) {
                (Some(a), Some(b)) => a.name == b.name,
                (None, None) => true,
                _ => false,
            };
            // Touching counts as mergeable, not just strict overlap
            if same_day && same_location && next.start_time <= group_end {
                group_end = group_end.max(next.end_time);
                j += 1;
            } else {
                break;
            }
        }

        if j - i > 1 {
            merged.push(merge_group(&sorted[i..j]));
        } else {
            merged.push(sorted[i].clone());
        }
        i = j;
    }

    merged
}

fn location_key(event: &Event) -> &str {
    event
        .location
        .as_ref()
        .map(|loc| loc.name.as_str())
        .unwrap_or("")
}

/// Collapse a group of overlapping events into one. Summary and location
/// come from the earliest-sorted member; the time span covers the whole
/// group.
fn merge_group(group: &[Event]) -> Event {
    let first = &group[0];

    let merged_start = group.iter().map(|e| e.start_time).min().unwrap_or(first.start_time);
    let merged_end = group.iter().map(|e| e.end_time).max().unwrap_or(first.end_time);

    let snippets: Vec<String> = group
        .iter()
        .filter_map(|e| e.raw_text.as_deref())
        .filter(|raw| *raw != INFERRED_RAW_TEXT)
        .map(|raw| raw.trim().to_string())
        .collect();
    let merged_raw_text = if snippets.is_empty() {
        INFERRED_RAW_TEXT.to_string()
    } else {
        snippets.join(" | ")
    };

    let mut notes_parts = Vec::new();
    for event in group {
        let time_range = format!(
            "{}-{}",
            event.start_time.format("%H:%M"),
            event.end_time.format("%H:%M")
        );
        match event.raw_text.as_deref() {
            Some(raw) if !raw.trim().is_empty() && raw.chars().count() < NOTE_SNIPPET_MAX_CHARS => {
                notes_parts.push(format!("• {}: {}", time_range, raw.trim()));
            }
            _ => notes_parts.push(format!("• Group: {time_range}")),
        }
    }
    let notes = format!("Combined {} groups:\n{}", group.len(), notes_parts.join("\n"));

    Event {
        start_time: merged_start,
        end_time: merged_end,
        summary: first.summary.clone(),
        location: first.location.clone(),
        location_name: first.location_name.clone(),
        is_ambiguous: group.iter().any(|e| e.is_ambiguous),
        raw_text: Some(merged_raw_text),
        notes: Some(notes),
    }
}

/// Drop later events with the same (start, end, normalized summary)
/// signature, keeping first occurrences in order.
pub fn deduplicate(events: Vec<Event>) -> Vec<Event> {
    let mut seen: HashSet<(NaiveDateTime, NaiveDateTime, String)> = HashSet::new();
    events
        .into_iter()
        .filter(|event| {
            seen.insert((
                event.start_time,
                event.end_time,
                event.summary.trim().to_lowercase(),
            ))
        })
        .collect()
}

/// Stable sort by start time.
pub fn sort_by_start(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by_key(|event| event.start_time);
    events
}
