use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::fields::{
    MARKET_ID_KEYS, MARKET_NAME_KEYS, MARKET_OUTCOME_KEYS, OUTCOME_ID_KEYS, OUTCOME_NAME_KEYS,
    as_decimal, as_sequence, has_any_key, pick_array, pick_odds, pick_string,
};
use crate::labels::selection_word;

const PLAYER_MARKET_INCLUDE: &[&str] = &["player", "goalscorer", "scorer", "to score"];
const PLAYER_MARKET_EXCLUDE: &[&str] = &[
    "correct score",
    "both teams",
    "team to score",
    "half time",
    "handicap",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: String,
    pub name: String,
    pub odds_decimal: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub id: String,
    pub name: String,
    pub outcomes: Vec<OutcomeRecord>,
}

pub fn parse_markets_json(raw: &str) -> Vec<MarketRecord> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => extract_markets(&value),
        Err(err) => {
            warn!(error = %err, "odds response is not valid json");
            Vec::new()
        }
    }
}

/// Normalizes an odds response into markets. The OpenBet drilldown tree is
/// tried first; flatter shapes are only consulted when it yields nothing.
pub fn extract_markets(raw: &Value) -> Vec<MarketRecord> {
    let markets = extract_drilldown_markets(raw);
    if !markets.is_empty() {
        debug!(count = markets.len(), "extracted markets from drilldown tree");
        return markets;
    }

    let markets = extract_flat_markets(raw);
    if markets.is_empty() {
        warn!("no markets found in odds response");
    } else {
        debug!(count = markets.len(), "extracted markets from flat response");
    }
    markets
}

// SSResponse.children -> {event} -> children -> {market} -> children ->
// {outcome} -> children -> {price}
fn extract_drilldown_markets(raw: &Value) -> Vec<MarketRecord> {
    let Some(event) = raw
        .get("SSResponse")
        .and_then(|r| r.get("children"))
        .and_then(Value::as_array)
        .and_then(|nodes| nodes.iter().find_map(|node| node.get("event")))
    else {
        return Vec::new();
    };

    child_nodes(event, "market")
        .map(|market| MarketRecord {
            id: pick_string(market, &["id"]).unwrap_or_default(),
            name: pick_string(market, &["name"]).unwrap_or_default(),
            outcomes: child_nodes(market, "outcome")
                .map(drilldown_outcome)
                .collect(),
        })
        .collect()
}

fn drilldown_outcome(outcome: &Value) -> OutcomeRecord {
    let odds_decimal = child_nodes(outcome, "price")
        .next()
        .and_then(|price| price.get("priceDec"))
        .and_then(as_decimal);
    OutcomeRecord {
        id: pick_string(outcome, &["id"]).unwrap_or_default(),
        name: pick_string(outcome, &["name"]).unwrap_or_default(),
        odds_decimal,
    }
}

/// Payloads of `parent.children` nodes that carry `key`, in source order.
fn child_nodes<'a>(parent: &'a Value, key: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    parent
        .get("children")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(move |node| node.get(key))
}

enum FlatShape<'a> {
    Markets(Vec<&'a Value>),
    RootOutcomes,
    Unknown,
}

fn extract_flat_markets(raw: &Value) -> Vec<MarketRecord> {
    match locate_flat_markets(raw) {
        FlatShape::Markets(items) => items
            .into_iter()
            .filter(|item| item.is_object())
            .map(flat_market)
            .collect(),
        FlatShape::RootOutcomes => {
            let mut market = flat_market(raw);
            market.id = "main".to_string();
            market.name = "Main Market".to_string();
            vec![market]
        }
        FlatShape::Unknown => Vec::new(),
    }
}

fn locate_flat_markets(raw: &Value) -> FlatShape<'_> {
    if let Some(items) = raw.get("markets").and_then(Value::as_array)
        && !items.is_empty()
    {
        return FlatShape::Markets(items.iter().collect());
    }

    for holder in ["data", "SSResponse"] {
        if let Some(markets) = raw.get(holder).and_then(|h| h.get("markets")) {
            let items = as_sequence(markets);
            if !items.is_empty() {
                return FlatShape::Markets(items);
            }
        }
    }

    if has_any_key(raw, MARKET_OUTCOME_KEYS) {
        return FlatShape::RootOutcomes;
    }

    if let Some(map) = raw.as_object() {
        for value in map.values() {
            if let Some(markets) = value.get("markets") {
                let items = as_sequence(markets);
                if !items.is_empty() {
                    return FlatShape::Markets(items);
                }
            }
            if let Some(items) = value.as_array()
                && items
                    .first()
                    .is_some_and(|first| has_any_key(first, &["outcomes", "selections", "name"]))
            {
                return FlatShape::Markets(items.iter().collect());
            }
        }
    }

    FlatShape::Unknown
}

fn flat_market(market: &Value) -> MarketRecord {
    let outcomes = pick_array(market, MARKET_OUTCOME_KEYS)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .map(flat_outcome)
                .collect()
        })
        .unwrap_or_default();
    MarketRecord {
        id: pick_string(market, MARKET_ID_KEYS).unwrap_or_default(),
        name: pick_string(market, MARKET_NAME_KEYS).unwrap_or_else(|| "Market".to_string()),
        outcomes,
    }
}

fn flat_outcome(outcome: &Value) -> OutcomeRecord {
    OutcomeRecord {
        id: pick_string(outcome, OUTCOME_ID_KEYS).unwrap_or_default(),
        name: pick_string(outcome, OUTCOME_NAME_KEYS).unwrap_or_else(|| "Selection".to_string()),
        odds_decimal: pick_odds(outcome),
    }
}

pub fn is_player_market(name: &str) -> bool {
    let lowered = name.to_lowercase();
    PLAYER_MARKET_INCLUDE.iter().any(|n| lowered.contains(n))
        && !PLAYER_MARKET_EXCLUDE.iter().any(|n| lowered.contains(n))
}

/// Keeps markets about individual players. A name heuristic: the provider
/// exposes no structured market type.
pub fn filter_player_markets(markets: &[MarketRecord]) -> Vec<MarketRecord> {
    markets
        .iter()
        .filter(|m| is_player_market(&m.name))
        .cloned()
        .collect()
}

/// Yes/No/Over/Under, optionally with a line, rather than a player name.
pub fn is_generic_selection(name: &str) -> bool {
    selection_word(name).is_some()
}

/// Distinct player names offered across `markets`, in first-seen order.
pub fn players_in_markets(markets: &[MarketRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    markets
        .iter()
        .flat_map(|m| m.outcomes.iter())
        .map(|o| o.name.trim())
        .filter(|name| !name.is_empty() && !is_generic_selection(name))
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn market(name: &str) -> MarketRecord {
        MarketRecord {
            id: name.to_lowercase(),
            name: name.to_string(),
            outcomes: Vec::new(),
        }
    }

    #[test]
    fn drilldown_tree_preserves_order_and_parses_prices() {
        let raw = json!({
            "SSResponse": { "children": [
                { "event": { "id": "1", "name": "Inter v Milan", "children": [
                    { "market": { "id": "m1", "name": "Anytime Goalscorer", "children": [
                        { "outcome": { "id": "o1", "name": "Messi", "children": [
                            { "price": { "priceDec": "1.50" } }
                        ] } },
                        { "outcome": { "id": "o2", "name": "Ronaldo", "children": [
                            { "price": { "priceDec": "2.75" } }
                        ] } }
                    ] } },
                    { "market": { "id": "m2", "name": "Correct Score", "children": [] } }
                ] } }
            ] }
        });
        let markets = extract_markets(&raw);
        assert_eq!(markets.len(), 2);
        let odds: Vec<Option<f64>> = markets[0].outcomes.iter().map(|o| o.odds_decimal).collect();
        assert_eq!(odds, vec![Some(1.5), Some(2.75)]);
        assert!(markets[1].outcomes.is_empty());
    }

    #[test]
    fn drilldown_skips_non_event_nodes_and_bad_prices() {
        let raw = json!({
            "SSResponse": { "children": [
                { "responseFooter": { "cost": "12" } },
                { "event": { "children": [
                    { "market": { "id": "m1", "name": "First Goalscorer", "children": [
                        { "outcome": { "id": "o1", "name": "Kane", "children": [
                            { "price": { "priceDec": "SP" } }
                        ] } },
                        { "outcome": { "id": "o2", "name": "Son" } }
                    ] } }
                ] } }
            ] }
        });
        let markets = extract_markets(&raw);
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].outcomes[0].odds_decimal, None);
        assert_eq!(markets[0].outcomes[1].odds_decimal, None);
    }

    #[test]
    fn flat_fallbacks_cover_known_shapes() {
        let top = json!({ "markets": [{ "id": 3, "name": "Player Shots", "selections": [
            { "name": "Over", "price": { "priceDec": 1.9 } }
        ] }] });
        let markets = extract_markets(&top);
        assert_eq!(markets[0].id, "3");
        assert_eq!(markets[0].outcomes[0].odds_decimal, Some(1.9));

        let wrapped = json!({ "data": { "markets": { "market_name": "To Score", "outcomes": [] } } });
        assert_eq!(extract_markets(&wrapped)[0].name, "To Score");

        let root = json!({ "outcomes": [{ "runner": "Home", "odds": 2.1 }] });
        let markets = extract_markets(&root);
        assert_eq!(markets[0].name, "Main Market");
        assert_eq!(markets[0].outcomes[0].name, "Home");
    }

    #[test]
    fn flat_outcomes_read_plain_and_wrapped_prices() {
        let raw = json!({ "markets": [{ "id": "m9", "name": "Anytime Goalscorer", "outcomes": [
            { "name": "Messi", "price": 2.5 },
            { "name": "Kane", "price_data": { "odds": "3.10" } },
            { "name": "Son", "odds_data": { "decimal_odds": 4.2 } }
        ] }] });
        let odds: Vec<Option<f64>> = extract_markets(&raw)[0]
            .outcomes
            .iter()
            .map(|o| o.odds_decimal)
            .collect();
        assert_eq!(odds, vec![Some(2.5), Some(3.1), Some(4.2)]);
    }

    #[test]
    fn ss_response_markets_fallback_wraps_single_object() {
        let single = json!({ "SSResponse": { "markets": {
            "id": "m7", "name": "Player Assists", "outcomes": [{ "name": "Barella", "odds": 3.4 }]
        } } });
        let markets = extract_markets(&single);
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].id, "m7");
        assert_eq!(markets[0].outcomes[0].odds_decimal, Some(3.4));

        let many = json!({ "SSResponse": { "markets": [
            { "name": "Player Assists" },
            { "name": "Player Fouls Committed" }
        ] } });
        let names: Vec<String> = extract_markets(&many).into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Player Assists", "Player Fouls Committed"]);
    }

    #[test]
    fn generic_scan_accepts_market_like_arrays() {
        let raw = json!({ "payload": [
            { "name": "Player Shots", "outcomes": [{ "name": "Over 1.5", "odds": 1.7 }] },
            { "selections": [] }
        ] });
        let markets = extract_markets(&raw);
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].name, "Player Shots");
        assert_eq!(markets[1].name, "Market");

        let not_markets = json!({ "payload": [{ "cost": 3 }] });
        assert!(extract_markets(&not_markets).is_empty());
    }

    #[test]
    fn generic_scan_finds_nested_markets() {
        let raw = json!({ "payload": { "markets": [{ "name": "Player Assists", "outcomes": [] }] } });
        assert_eq!(extract_markets(&raw)[0].name, "Player Assists");
        assert!(extract_markets(&json!({ "ok": true })).is_empty());
        assert!(parse_markets_json("<html>").is_empty());
    }

    #[test]
    fn player_filter_applies_include_then_exclude() {
        let markets = vec![
            market("Anytime Goalscorer"),
            market("Correct Score"),
            market("Player Shots On Target"),
            market("Team To Score First"),
            market("Half Time Player To Score"),
        ];
        let names: Vec<String> = filter_player_markets(&markets)
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Anytime Goalscorer", "Player Shots On Target"]);
    }

    #[test]
    fn players_are_distinct_and_skip_generic_words() {
        let mut a = market("Anytime Goalscorer");
        a.outcomes = ["Messi", "Ronaldo", "No Goalscorer"]
            .iter()
            .map(|n| OutcomeRecord { id: String::new(), name: n.to_string(), odds_decimal: None })
            .collect();
        let mut b = market("Player Shots");
        b.outcomes = ["messi", "Over 1.5", "Under"]
            .iter()
            .map(|n| OutcomeRecord { id: String::new(), name: n.to_string(), odds_decimal: None })
            .collect();
        assert_eq!(
            players_in_markets(&[a, b]),
            vec!["Messi", "Ronaldo", "No Goalscorer"]
        );
    }
}
