use anyhow::{Context, Result};

use swimcal_common::Event;

/// Google Calendar import CSV.
pub fn google_calendar_csv(events: &[Event]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "Subject",
            "Start Date",
            "Start Time",
            "End Date",
            "End Time",
            "All Day Event",
            "Description",
            "Location",
            "Private",
        ])
        .context("write CSV header")?;

    for event in events {
        writer
            .write_record([
                event.summary.as_str(),
                &event.start_time.format("%m/%d/%Y").to_string(),
                &event.start_time.format("%I:%M %p").to_string(),
                &event.end_time.format("%m/%d/%Y").to_string(),
                &event.end_time.format("%I:%M %p").to_string(),
                "False",
                &description(event),
                event
                    .location
                    .as_ref()
                    .map(|loc| loc.address.as_str())
                    .unwrap_or(""),
                "False",
            ])
            .context("write CSV row")?;
    }

    finish(writer)
}

/// Outlook import CSV, with its fixed 22-column header.
pub fn outlook_csv(events: &[Event]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "Subject",
            "Start Date",
            "Start Time",
            "End Date",
            "End Time",
            "All day event",
            "Reminder on/off",
            "Reminder Date",
            "Reminder Time",
            "Meeting Organizer",
            "Required Attendees",
            "Optional Attendees",
            "Meeting Resources",
            "Billing Information",
            "Categories",
            "Description",
            "Location",
            "Mileage",
            "Priority",
            "Private",
            "Sensitivity",
            "Show time as",
        ])
        .context("write CSV header")?;

    for event in events {
        writer
            .write_record([
                event.summary.as_str(),
                &event.start_time.format("%m/%d/%Y").to_string(),
                &event.start_time.format("%I:%M:%S %p").to_string(),
                &event.end_time.format("%m/%d/%Y").to_string(),
                &event.end_time.format("%I:%M:%S %p").to_string(),
                "False",
                "False",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                event.raw_text.as_deref().unwrap_or(""),
                event
                    .location
                    .as_ref()
                    .map(|loc| loc.address.as_str())
                    .unwrap_or(""),
                "",
                "Normal",
                "False",
                "Normal",
                "2",
            ])
            .context("write CSV row")?;
    }

    finish(writer)
}

fn description(event: &Event) -> String {
    let mut parts = Vec::new();
    if let Some(raw) = &event.raw_text {
        parts.push(format!("Original: {raw}"));
    }
    if let Some(notes) = &event.notes {
        parts.push(format!(" | {notes}"));
    }
    parts.join("")
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().context("flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}
