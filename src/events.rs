use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::fields::{
    EVENT_CATEGORY_KEYS, EVENT_COMPETITION_KEYS, EVENT_ID_KEYS, EVENT_NAME_KEYS, EVENT_START_KEYS,
    as_sequence, has_any_key, pick_string,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    pub start_time: Option<String>,
    pub competition_name: Option<String>,
    pub category_name: Option<String>,
}

impl EventRecord {
    /// Builds a record from a loosely shaped provider object. Never fails:
    /// missing fields fall back to empty/absent values.
    pub fn from_value(value: &Value) -> Self {
        let id = pick_string(value, EVENT_ID_KEYS).unwrap_or_default();
        let name = pick_string(value, EVENT_NAME_KEYS).unwrap_or_else(|| format!("Event {id}"));
        Self {
            name,
            start_time: pick_string(value, EVENT_START_KEYS),
            competition_name: pick_string(value, EVENT_COMPETITION_KEYS),
            category_name: pick_string(value, EVENT_CATEGORY_KEYS),
            id,
        }
    }

    pub fn kickoff(&self) -> Option<DateTime<Utc>> {
        self.start_time.as_deref().and_then(parse_start_time)
    }

    /// Selector label in the local time zone.
    pub fn display_label(&self) -> String {
        self.display_label_in(&Local)
    }

    pub fn display_label_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        match (self.kickoff(), self.start_time.as_deref()) {
            (Some(ts), _) => format!(
                "{} - {}",
                self.name,
                ts.with_timezone(tz).format("%d/%m/%Y %H:%M")
            ),
            (None, Some(raw)) => format!("{} - {}", self.name, raw),
            (None, None) => self.name.clone(),
        }
    }

    pub fn clubs(&self) -> Vec<String> {
        clubs_from_event_name(&self.name)
    }
}

/// Date and time columns of an exported row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventDateTime {
    pub date: String,
    pub time: String,
}

impl EventDateTime {
    pub fn new(date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
        }
    }

    pub fn for_event(event: &EventRecord) -> Self {
        Self::for_event_in(event, &Local)
    }

    pub fn for_event_in<Tz: TimeZone>(event: &EventRecord, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        match (event.kickoff(), event.start_time.as_deref()) {
            (Some(ts), _) => {
                let local = ts.with_timezone(tz);
                Self::new(
                    local.format("%d.%m.%Y").to_string(),
                    local.format("%H:%M").to_string(),
                )
            }
            (None, Some(raw)) => Self::new(raw, ""),
            (None, None) => Self::default(),
        }
    }
}

pub fn parse_events_json(raw: &str) -> Vec<EventRecord> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => extract_events(&value),
        Err(err) => {
            warn!(error = %err, "events response is not valid json");
            Vec::new()
        }
    }
}

/// Normalizes an events listing into flat records, trying each known
/// response shape in turn. Unknown shapes yield an empty list.
pub fn extract_events(raw: &Value) -> Vec<EventRecord> {
    let (shape, items) = locate_event_items(raw);
    let events: Vec<EventRecord> = items
        .into_iter()
        .filter(|item| item.is_object())
        .map(EventRecord::from_value)
        .collect();
    if events.is_empty() {
        warn!("no events found in response");
    } else {
        debug!(shape, count = events.len(), "extracted events");
    }
    events
}

fn locate_event_items(raw: &Value) -> (&'static str, Vec<&Value>) {
    if let Some(modules) = raw.get("modules").and_then(Value::as_array) {
        let items: Vec<&Value> = modules
            .iter()
            .filter_map(|module| module.get("data").and_then(Value::as_array))
            .flatten()
            .collect();
        if !items.is_empty() {
            return ("modules", items);
        }
    }

    for (shape, candidate) in [
        ("events", raw.get("events")),
        ("data", raw.get("data")),
    ] {
        if let Some(items) = candidate.and_then(Value::as_array)
            && !items.is_empty()
        {
            return (shape, items.iter().collect());
        }
    }

    if let Some(content) = raw
        .get("fixture_schedule_content")
        .and_then(|c| c.get("events"))
    {
        let items = as_sequence(content);
        if !items.is_empty() {
            return ("fixture_schedule_content", items);
        }
    }

    if let Some(items) = raw.as_array()
        && !items.is_empty()
    {
        return ("array", items.iter().collect());
    }

    if has_any_key(raw, &["id", "eventId"]) {
        return ("single", vec![raw]);
    }

    if let Some(map) = raw.as_object() {
        for value in map.values() {
            let Some(items) = value.as_array() else {
                continue;
            };
            if items
                .first()
                .is_some_and(|first| has_any_key(first, &["id", "eventId", "name"]))
            {
                return ("scan", items.iter().collect());
            }
        }
    }

    ("none", Vec::new())
}

pub fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    // Epoch milliseconds, as some CMS payloads send.
    trimmed
        .parse::<i64>()
        .ok()
        .filter(|ms| *ms > 100_000_000_000)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// Splits "Home v Away" style event names into the two club names.
pub fn clubs_from_event_name(name: &str) -> Vec<String> {
    let lowered = name.to_ascii_lowercase();
    for separator in [" v ", " vs. ", " vs ", " - ", " @ "] {
        if let Some(idx) = lowered.find(separator) {
            let home = name[..idx].trim();
            let away = name[idx + separator.len()..].trim();
            if !home.is_empty() && !away.is_empty() {
                return vec![home.to_string(), away.to_string()];
            }
        }
    }
    Vec::new()
}
