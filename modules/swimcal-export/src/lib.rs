pub mod bundle;
pub mod csv;
pub mod ics;

use anyhow::Result;

use swimcal_common::{CalendarFormat, Config, Event};

pub const DEFAULT_ICS_FILENAME: &str = "swimming_schedule.ics";

/// Serializes a final event list into calendar file formats.
pub struct CalendarExporter {
    config: Config,
}

impl CalendarExporter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn export(&self, events: &[Event], format: CalendarFormat) -> Result<String> {
        match format {
            CalendarFormat::Ics => Ok(self.export_ics(events)),
            CalendarFormat::Google => csv::google_calendar_csv(events),
            CalendarFormat::Outlook => csv::outlook_csv(events),
        }
    }

    pub fn export_ics(&self, events: &[Event]) -> String {
        ics::write_ics(events, &self.config.timezone)
    }

    /// A ZIP holding one deflated ICS file (UTF-8 BOM included, which
    /// keeps iOS and Outlook happy with the mixed-language content).
    pub fn export_ics_zip(&self, events: &[Event], ics_filename: Option<&str>) -> Result<Vec<u8>> {
        let content = self.export_ics(events);
        bundle::ics_zip(&content, ics_filename.unwrap_or(DEFAULT_ICS_FILENAME))
    }
}
