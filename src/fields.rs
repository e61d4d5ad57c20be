use serde_json::Value;

// Candidate keys per logical field, tried in order. Upstream shape drift is
// fixed here and nowhere else.
pub const EVENT_ID_KEYS: &[&str] = &["id", "eventId", "event_id"];
pub const EVENT_NAME_KEYS: &[&str] = &["name", "title", "event_name"];
pub const EVENT_START_KEYS: &[&str] = &["date", "start_time", "startTime"];
pub const EVENT_COMPETITION_KEYS: &[&str] = &["competitionName", "typeName", "competition", "league"];
pub const EVENT_CATEGORY_KEYS: &[&str] = &["categoryName", "category", "className"];

pub const MARKET_ID_KEYS: &[&str] = &["id", "marketId", "market_id"];
pub const MARKET_NAME_KEYS: &[&str] = &["name", "market_name", "marketName", "type"];
pub const MARKET_OUTCOME_KEYS: &[&str] = &["outcomes", "selections"];

pub const OUTCOME_ID_KEYS: &[&str] = &["id", "outcomeId", "selectionId"];
pub const OUTCOME_NAME_KEYS: &[&str] = &["name", "selection", "runner"];

/// Paths to a decimal price on a loosely shaped outcome object, best first.
/// Prices wrapped in `price_data` or `odds_data` are looked up one level down.
pub const ODDS_PATHS: &[&[&str]] = &[
    &["odds"],
    &["oddsDecimal"],
    &["price"],
    &["price", "priceDec"],
    &["decimal_odds"],
    &["decimalOdds"],
    &["price_data", "odds"],
    &["price_data", "oddsDecimal"],
    &["price_data", "price"],
    &["price_data", "price", "priceDec"],
    &["price_data", "decimal_odds"],
    &["price_data", "decimalOdds"],
    &["odds_data", "odds"],
    &["odds_data", "oddsDecimal"],
    &["odds_data", "price"],
    &["odds_data", "price", "priceDec"],
    &["odds_data", "decimal_odds"],
    &["odds_data", "decimalOdds"],
];

/// First candidate key holding a non-empty string (or a number, rendered as text).
pub fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(as_string)
}

/// First candidate key holding an array.
pub fn pick_array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(Value::as_array)
}

pub fn has_any_key(value: &Value, keys: &[&str]) -> bool {
    value
        .as_object()
        .is_some_and(|map| keys.iter().any(|key| map.contains_key(*key)))
}

/// Follows `path` through nested objects.
pub fn lookup_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(*key))
}

/// Reads a decimal from a JSON number or a numeric string.
pub fn as_decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// First path in `ODDS_PATHS` that resolves to a usable decimal.
pub fn pick_odds(value: &Value) -> Option<f64> {
    ODDS_PATHS
        .iter()
        .filter_map(|path| lookup_path(value, path))
        .find_map(as_decimal)
}

/// Wraps a value as a sequence: arrays as-is, anything else as one element.
pub fn as_sequence(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
