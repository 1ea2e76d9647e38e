//! Export tests: ICS document structure, CSV dispatch, and the zipped
//! ICS round trip.

use chrono::{NaiveDate, NaiveDateTime};

use swimcal_common::{CalendarFormat, Config, Event};
use swimcal_export::CalendarExporter;

fn at(d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn practice() -> Event {
    let config = Config::with_default_locations();
    Event {
        start_time: at(29, 18, 0),
        end_time: at(29, 20, 30),
        summary: "Tyler Swim Practice".to_string(),
        location: config.locations.get("Regis").cloned(),
        location_name: Some("Regis".to_string()),
        is_ambiguous: false,
        raw_text: Some("周四 1/29 下午 6 - 8 下水+陆上 @ Regis".to_string()),
        notes: None,
    }
}

fn exporter() -> CalendarExporter {
    CalendarExporter::new(Config::with_default_locations())
}

#[test]
fn ics_has_calendar_headers_and_event() {
    let ics = exporter().export_ics(&[practice()]);

    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
    assert!(ics.contains("METHOD:PUBLISH\r\n"));
    assert!(ics.contains("X-WR-CALNAME:Swimming Schedule "));
    assert!(ics.contains("X-WR-TIMEZONE:America/New_York\r\n"));
    assert!(ics.contains("BEGIN:VEVENT"));
    assert!(ics.contains("DTSTART:20260129T180000"));
    assert!(ics.contains("DTEND:20260129T203000"));
    assert!(ics.contains("SUMMARY:Tyler Swim Practice"));
    assert!(ics.contains("UID:"));
}

#[test]
fn ics_uses_crlf_throughout() {
    let ics = exporter().export_ics(&[practice()]);
    for line in ics.split("\r\n") {
        assert!(!line.contains('\n'), "stray LF in {line:?}");
    }
}

#[test]
fn ics_escapes_location_commas() {
    let ics = exporter().export_ics(&[practice()]);
    assert!(ics.contains("Regis College Athletic Facility\\,"));
}

#[test]
fn ics_description_carries_raw_text_and_notes() {
    let mut event = practice();
    event.notes = Some("Combined 2 groups:\n• 18:00-19:00: 下水".to_string());
    let ics = exporter().export_ics(&[event]);

    let unfolded = ics.replace("\r\n ", "");
    assert!(unfolded.contains("DESCRIPTION:Original: 周四 1/29 下午 6 - 8 下水+陆上 @ Regis"));
    assert!(unfolded.contains("Combined 2 groups:"));
}

#[test]
fn export_dispatches_by_format() {
    let events = [practice()];
    let exporter = exporter();

    let ics = exporter.export(&events, CalendarFormat::Ics).unwrap();
    assert!(ics.starts_with("BEGIN:VCALENDAR"));

    let google = exporter.export(&events, CalendarFormat::Google).unwrap();
    assert!(google.starts_with("Subject,Start Date,Start Time"));

    let outlook = exporter.export(&events, CalendarFormat::Outlook).unwrap();
    assert!(outlook.contains("Show time as"));
}

#[test]
fn format_metadata_matches_contents() {
    assert_eq!(CalendarFormat::Ics.file_extension(), "ics");
    assert_eq!(CalendarFormat::Ics.mime_type(), "text/calendar");
    assert_eq!(CalendarFormat::Google.file_extension(), "csv");
    assert_eq!(CalendarFormat::Outlook.mime_type(), "text/csv");
}

#[test]
fn ics_zip_contains_the_ics_file() {
    use std::io::Read;

    let bytes = exporter()
        .export_ics_zip(&[practice()], Some("schedule.ics"))
        .unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name("schedule.ics").unwrap();
    let mut raw = Vec::new();
    file.read_to_end(&mut raw).unwrap();

    // Skip the UTF-8 BOM
    let content = std::str::from_utf8(&raw[3..]).unwrap();
    assert!(content.starts_with("BEGIN:VCALENDAR"));
    assert!(content.contains("SUMMARY:Tyler Swim Practice"));
}
