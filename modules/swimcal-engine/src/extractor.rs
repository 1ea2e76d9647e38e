use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ai_client::gemini::Gemini;
use swimcal_common::{Config, Event, SwimCalError, INFERRED_RAW_TEXT};

use crate::cache::ExtractionCache;

/// Shortest input worth sending to the extraction service.
const MIN_INPUT_CHARS: usize = 10;

/// What the model returns for each extracted event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CandidateEvent {
    /// ISO 8601 local datetime, e.g. "2026-01-29T18:00:00"
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub summary: Option<String>,
    /// Exact registry name when the text mentions a location explicitly
    pub location_name: Option<String>,
    #[serde(default)]
    pub is_ambiguous: bool,
    /// Verbatim source snippet this event was extracted from
    pub original_text: Option<String>,
}

/// The full extraction response from the model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub events: Vec<CandidateEvent>,
}

/// Extracts structured events from unstructured schedule text via
/// Gemini, consulting the extraction cache before every service call.
pub struct Extractor {
    gemini: Gemini,
    config: Config,
    cache: Option<ExtractionCache>,
    last_cache_hit: bool,
}

impl Extractor {
    pub fn new(api_key: &str, config: Config, cache: ExtractionCache) -> Self {
        let gemini = Gemini::new(api_key, &config.model);
        Self {
            gemini,
            config,
            cache: Some(cache),
            last_cache_hit: false,
        }
    }

    /// Extractor that always calls the service. For tools and tests.
    pub fn without_cache(api_key: &str, config: Config) -> Self {
        let gemini = Gemini::new(api_key, &config.model);
        Self {
            gemini,
            config,
            cache: None,
            last_cache_hit: false,
        }
    }

    /// Whether the most recent `extract` call was served from cache.
    pub fn last_cache_hit(&self) -> bool {
        self.last_cache_hit
    }

    pub fn cache(&self) -> Option<&ExtractionCache> {
        self.cache.as_ref()
    }

    /// Extract events from raw schedule text.
    pub async fn extract(&mut self, raw_text: &str) -> Result<Vec<Event>, SwimCalError> {
        if raw_text.trim().chars().count() < MIN_INPUT_CHARS {
            return Err(SwimCalError::InputTooShort);
        }

        if let Some(cache) = self.cache.as_mut() {
            if let Some(events) = cache.get(raw_text, &self.config) {
                self.last_cache_hit = true;
                info!(count = events.len(), "Served extraction from cache");
                return Ok(events);
            }
            self.last_cache_hit = false;
        }

        let system_prompt = build_system_prompt(&self.config);
        let user_prompt = format!("EXTRACT EVENTS FROM THIS TEXT:\n{raw_text}");

        let response_text = self
            .gemini
            .chat_completion(system_prompt, user_prompt)
            .await
            .map_err(|err| SwimCalError::Extraction(err.to_string()))?;

        let candidates = parse_candidates(&response_text)?;
        if candidates.is_empty() {
            return Err(SwimCalError::NoEventsFound);
        }

        let events = convert_candidates(candidates, &self.config);
        if events.is_empty() {
            return Err(SwimCalError::NoEventsFound);
        }

        if let Some(cache) = self.cache.as_ref() {
            cache.set(raw_text, &self.config, &events);
        }

        info!(count = events.len(), "Extracted events");
        Ok(events)
    }
}

/// Parse the service response into candidate events. Accepts either a
/// bare JSON array or an object with an `events` field; anything else is
/// a malformed response, distinct from "no events found".
pub fn parse_candidates(response_text: &str) -> Result<Vec<CandidateEvent>, SwimCalError> {
    let cleaned = strip_code_fences(response_text);

    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|err| SwimCalError::MalformedResponse(err.to_string()))?;

    if value.is_array() {
        serde_json::from_value(value).map_err(|err| SwimCalError::MalformedResponse(err.to_string()))
    } else if value.is_object() && value.get("events").is_some() {
        let response: ExtractionResponse = serde_json::from_value(value)
            .map_err(|err| SwimCalError::MalformedResponse(err.to_string()))?;
        Ok(response.events)
    } else {
        Err(SwimCalError::MalformedResponse(
            "response must be a list or an object with an events field".to_string(),
        ))
    }
}

/// Turn candidates into domain events. Candidates with missing or
/// unparseable times, or with start >= end, are dropped; the batch never
/// aborts on a bad candidate.
pub fn convert_candidates(candidates: Vec<CandidateEvent>, config: &Config) -> Vec<Event> {
    let mut events = Vec::new();

    for candidate in candidates {
        let (Some(start_raw), Some(end_raw)) = (&candidate.start_time, &candidate.end_time) else {
            warn!("Candidate missing time fields, skipped");
            continue;
        };

        let (Ok(start_time), Ok(end_time)) = (
            start_raw.parse::<NaiveDateTime>(),
            end_raw.parse::<NaiveDateTime>(),
        ) else {
            warn!(start = %start_raw, end = %end_raw, "Candidate has unparseable times, skipped");
            continue;
        };

        if start_time >= end_time {
            warn!(start = %start_time, end = %end_time, "Candidate has inverted time range, skipped");
            continue;
        }

        let raw_text = match candidate.original_text {
            Some(text) if !text.trim().is_empty() => text,
            _ => INFERRED_RAW_TEXT.to_string(),
        };

        let location = candidate
            .location_name
            .as_deref()
            .and_then(|name| config.locations.get(name))
            .cloned();

        events.push(Event {
            start_time,
            end_time,
            summary: candidate
                .summary
                .unwrap_or_else(|| config.default_event_title.clone()),
            location,
            location_name: candidate.location_name,
            is_ambiguous: candidate.is_ambiguous,
            raw_text: Some(raw_text),
            notes: None,
        });
    }

    events
}

/// Strip a surrounding markdown code fence, if the model added one.
pub fn strip_code_fences(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// System prompt for schedule extraction. The combined-session 30-minute
/// dryland extension is deliberately handled here, in the service
/// contract, rather than in the rules engine.
pub fn build_system_prompt(config: &Config) -> String {
    let location_info = config
        .locations
        .values()
        .map(|loc| format!("- {}: {}", loc.name, loc.address))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert at extracting structured swimming practice schedules from unstructured text.

LOCATIONS (use these exact names):
{location_info}

CRITICAL RULES:

1. **COMBINING SESSIONS (MOST IMPORTANT)**:
   - If a line mentions BOTH underwater training (下水) AND dryland training (陆上/陆上拉伸), create ONE SINGLE EVENT
   - NEVER split these into separate events!

   **Case A - Separate times specified**:
   - If times are clearly separated (e.g., "6~7:30pm 下水、7:30~8pm 陆上拉伸")
   - Use the full range: start at underwater start, end at dryland end
   - Example: "6~7:30pm 下水、7:30~8pm 陆上拉伸" → 6:00 PM to 8:00 PM

   **Case B - Combined time without separate dryland time**:
   - If ONLY one time range is given for the combined session (e.g., "5~6:30 下水+陆上拉伸")
   - Automatically ADD 30 MINUTES to the end time for dryland training
   - Example: "5~6:30 下水+陆上拉伸" → 5:00 PM to 7:00 PM (6:30 + 30 min)
   - Example: "下午 6 - 8 下水+陆上" → 6:00 PM to 8:30 PM (8:00 + 30 min)

   **How to tell the difference**:
   - Separate times: Look for comma (、), multiple time ranges, or explicit "X~Y下水...Y~Z陆上" patterns
   - Combined time: Single time range with "下水+陆上" or "下水陆上" together

2. **REST DAYS**:
   - If text says "休息" (rest) or "闭馆" (closed), do NOT create an event
   - Skip rest days entirely

3. **LOCATION DETECTION**:
   - If the text EXPLICITLY mentions a location (e.g., "@ Regis", "@ Wightman", "@ Brandeis"), use that location name
   - If NO location is mentioned, leave location_name as null
   - Be precise - only use location if explicitly stated

4. **AMBIGUITY**:
   - Set is_ambiguous to true if you're uncertain about ANY field
   - Flag events where dates/times are unclear

OUTPUT FORMAT:
Return ONLY valid JSON (no markdown, no explanations) with this structure:
{{
  "events": [
    {{
      "start_time": "2026-01-29T18:00:00",
      "end_time": "2026-01-29T20:00:00",
      "summary": "{default_title}",
      "location_name": "Regis",
      "is_ambiguous": false,
      "original_text": "周四 1/29 下午 6 - 8 下水+陆上 @ Regis"
    }}
  ]
}}

**IMPORTANT**: Include "original_text" field with the EXACT original text snippet from the input that corresponds to this event.
- Use the exact characters from input (don't rephrase)
- If multiple input lines create one event, include all lines separated by " | "
- If event is inferred and has no direct text, set to null

IMPORTANT:
- Use ISO 8601 format for dates/times (YYYY-MM-DDTHH:MM:SS)
- Assume year is 2026 if not specified
- Extract all events except rest days
- Be precise with times and dates
"#,
        location_info = location_info,
        default_title = config.default_event_title,
    )
}
