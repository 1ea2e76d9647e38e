use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use swimcal_common::{CalendarFormat, Config};
use swimcal_engine::cache::ExtractionCache;
use swimcal_engine::extractor::Extractor;
use swimcal_engine::rules::RulesEngine;
use swimcal_export::CalendarExporter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("swimcal=info".parse()?))
        .init();

    info!("swimcal starting...");

    // Load config
    let config_path =
        PathBuf::from(std::env::var("SWIMCAL_CONFIG").unwrap_or_else(|_| "swimcal.toml".into()));
    let config = Config::load_or_default(&config_path);
    info!(
        config = %config_path.display(),
        locations = config.locations.len(),
        model = config.model.as_str(),
        "Loaded config"
    );

    let api_key = std::env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY environment variable is required")?;

    // Schedule text comes from the file argument, or stdin
    let mut args = std::env::args().skip(1);
    let input = args.next();
    let output = PathBuf::from(
        args.next()
            .unwrap_or_else(|| swimcal_export::DEFAULT_ICS_FILENAME.to_string()),
    );

    let raw_text = match input.as_deref() {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schedule text from {path}"))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read schedule text from stdin")?;
            buffer
        }
    };

    // Extract (cache-first), then normalize
    let cache_dir =
        std::env::var("SWIMCAL_CACHE_DIR").unwrap_or_else(|_| "cache".to_string());
    let cache = ExtractionCache::new(cache_dir)?;
    let mut extractor = Extractor::new(&api_key, config.clone(), cache);

    let events = extractor.extract(&raw_text).await?;
    info!(
        count = events.len(),
        cache_hit = extractor.last_cache_hit(),
        "Extraction complete"
    );

    let engine = RulesEngine::new(config.clone());
    let events = engine.apply(events);

    for issue in engine.validate(&events) {
        warn!(
            index = issue.event_index,
            summary = issue.event_summary.as_str(),
            severity = %issue.severity,
            "{}",
            issue.message
        );
    }

    // Export
    let format = resolve_format(&output);
    let exporter = CalendarExporter::new(config);
    let content = exporter.export(&events, format)?;
    std::fs::write(&output, content)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(count = events.len(), output = %output.display(), %format, "Wrote calendar");
    Ok(())
}

/// Format from `SWIMCAL_FORMAT` when set, otherwise inferred from the
/// output extension (`.csv` means Google Calendar CSV).
fn resolve_format(output: &Path) -> CalendarFormat {
    match std::env::var("SWIMCAL_FORMAT").ok().as_deref() {
        Some("ics") => return CalendarFormat::Ics,
        Some("google") | Some("google_calendar") => return CalendarFormat::Google,
        Some("outlook") => return CalendarFormat::Outlook,
        Some(other) => warn!(format = other, "Unknown SWIMCAL_FORMAT, inferring from extension"),
        None => {}
    }
    match output.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => CalendarFormat::Google,
        _ => CalendarFormat::Ics,
    }
}
