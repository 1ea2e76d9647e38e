use chrono::Local;
use chrono_tz::Tz;
use tracing::warn;
use uuid::Uuid;

use swimcal_common::Event;

/// RFC 5545 lines must stay under 75 octets before folding.
const FOLD_LIMIT: usize = 75;

/// Serialize events as an iCalendar document: CRLF line endings, folded
/// lines, and the calendar-name/timezone headers iOS expects.
pub fn write_ics(events: &[Event], timezone: &str) -> String {
    if timezone.parse::<Tz>().is_err() {
        warn!(timezone, "Timezone is not a recognized IANA identifier");
    }

    let calendar_name = format!("Swimming Schedule {}", Local::now().format("%Y-%m-%d"));
    let dtstamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();

    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//swimcal//Swimming Schedule//EN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{calendar_name}"),
        format!("NAME:{calendar_name}"),
        format!("X-WR-TIMEZONE:{timezone}"),
    ];

    for event in events {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}@swimcal", Uuid::new_v4()));
        lines.push(format!("DTSTAMP:{dtstamp}"));
        lines.push(format!(
            "DTSTART:{}",
            event.start_time.format("%Y%m%dT%H%M%S")
        ));
        lines.push(format!("DTEND:{}", event.end_time.format("%Y%m%dT%H%M%S")));
        lines.push(format!("SUMMARY:{}", escape_text(&event.summary)));

        if let Some(location) = &event.location {
            lines.push(format!("LOCATION:{}", escape_text(&location.address)));
        }

        if let Some(description) = build_description(event) {
            lines.push(format!("DESCRIPTION:{}", escape_text(&description)));
        }

        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());

    let mut content = lines
        .iter()
        .map(|line| fold_line(line))
        .collect::<Vec<_>>()
        .join("\r\n");
    content.push_str("\r\n");
    content
}

/// Description carries the verbatim source snippet plus any merge notes.
fn build_description(event: &Event) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(raw) = &event.raw_text {
        parts.push(format!("Original: {raw}"));
    }
    if let Some(notes) = &event.notes {
        parts.push(format!("\n{notes}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(""))
    }
}

/// TEXT escaping per RFC 5545 §3.3.11.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Fold a content line at 75 octets; continuation lines begin with a
/// space and never split a UTF-8 sequence.
fn fold_line(line: &str) -> String {
    if line.len() <= FOLD_LIMIT {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / FOLD_LIMIT * 3);
    let mut budget = FOLD_LIMIT;
    let mut used = 0;

    for ch in line.chars() {
        let width = ch.len_utf8();
        if used + width > budget {
            folded.push_str("\r\n ");
            used = 0;
            budget = FOLD_LIMIT - 1;
        }
        folded.push(ch);
        used += width;
    }

    folded
}
