use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// UTF-8 byte-order mark, prepended so calendar apps detect the encoding
/// of mixed-language content.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Package ICS content as a single-file deflated ZIP.
pub fn ics_zip(ics_content: &str, filename: &str) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer
        .start_file(filename, options)
        .context("start ZIP entry")?;
    writer.write_all(UTF8_BOM).context("write BOM")?;
    writer
        .write_all(ics_content.as_bytes())
        .context("write ICS content")?;

    let cursor = writer.finish().context("finalize ZIP")?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn zip_round_trips_ics_content() {
        let ics = "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n";
        let bytes = ics_zip(ics, "schedule.ics").unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);

        let mut file = archive.by_name("schedule.ics").unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();

        assert_eq!(&content[..3], UTF8_BOM);
        assert_eq!(&content[3..], ics.as_bytes());
    }
}
