use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::events::{EventDateTime, EventRecord};
use crate::fields::pick_odds;
use crate::labels::{map_market_label, map_selection_label, selection_word};
use crate::markets::{
    MarketRecord, OutcomeRecord, extract_markets, filter_player_markets,
    players_in_markets,
};

pub const CSV_MIME: &str = "text/csv; charset=utf-8";

pub const STRUCTURED_HEADER: [&str; 13] = [
    "Datum", "Vreme", "Sifra", "Domacin", "Gost", "1", "X", "2", "GR", "U", "O", "Yes", "No",
];

pub const PLAIN_HEADER: [&str; 7] = ["Event", "Date", "Time", "Player", "Market", "Selection", "Odds"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("select an event first")]
    MissingEvent,

    #[error("select a player first")]
    MissingPlayer,

    #[error("select a club first")]
    MissingClub,

    #[error("no market matching '{0}' for this event")]
    UnknownMarket(String),

    #[error("nothing selected for export")]
    NothingToExport,

    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub date: String,
    pub time: String,
    pub code: String,
    pub market: String,
    pub selection: String,
    pub odds: String,
}

impl CsvRow {
    fn structured_record(&self) -> [&str; 13] {
        [
            self.date.as_str(),
            self.time.as_str(),
            self.code.as_str(),
            self.market.as_str(),
            self.selection.as_str(),
            self.odds.as_str(),
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRows {
    pub player: String,
    pub rows: Vec<CsvRow>,
}

/// Rows chosen for export, grouped per player in the order players were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSet {
    players: Vec<PlayerRows>,
}

impl ExportSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.players.iter().all(|p| p.rows.is_empty())
    }

    pub fn row_count(&self) -> usize {
        self.players.iter().map(|p| p.rows.len()).sum()
    }

    pub fn players(&self) -> &[PlayerRows] {
        &self.players
    }

    pub fn rows_for(&self, player: &str) -> &[CsvRow] {
        self.players
            .iter()
            .find(|p| same_player(&p.player, player))
            .map(|p| p.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }

    /// Adds one row per outcome of `market` that belongs to `player` (or is a
    /// generic yes/no/over/under selection). Rows already present for that
    /// player with the same market and selection labels are skipped.
    /// Returns the number of rows appended.
    pub fn add(&mut self, player: &str, market: &MarketRecord, when: &EventDateTime) -> usize {
        let player = player.trim();
        let needle = player.to_lowercase();
        let market_label = map_market_label(&market.name);

        let candidates: Vec<CsvRow> = market
            .outcomes
            .iter()
            .filter(|o| outcome_belongs_to(o, &needle))
            .map(|o| CsvRow {
                date: when.date.clone(),
                time: when.time.clone(),
                code: String::new(),
                market: market_label.clone(),
                selection: map_selection_label(&market.name, &o.name),
                odds: format_odds(o),
            })
            .collect();
        if candidates.is_empty() {
            return 0;
        }

        let idx = match self.players.iter().position(|p| same_player(&p.player, player)) {
            Some(idx) => idx,
            None => {
                self.players.push(PlayerRows {
                    player: player.to_string(),
                    rows: Vec::new(),
                });
                self.players.len() - 1
            }
        };
        let entry = &mut self.players[idx];

        let mut added = 0;
        for row in candidates {
            let duplicate = entry
                .rows
                .iter()
                .any(|r| r.market == row.market && r.selection == row.selection);
            if !duplicate {
                entry.rows.push(row);
                added += 1;
            }
        }
        added
    }
}

fn same_player(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn outcome_belongs_to(outcome: &OutcomeRecord, player_lowered: &str) -> bool {
    let name = outcome.name.trim().to_lowercase();
    (!player_lowered.is_empty() && name.contains(player_lowered))
        || selection_word(&name).is_some_and(|(_, line)| line.is_empty())
}

pub fn format_odds(outcome: &OutcomeRecord) -> String {
    render_odds(outcome.odds_decimal)
}

/// Formats the price of a loosely shaped outcome object without first
/// normalizing it.
pub fn format_odds_value(outcome: &Value) -> String {
    render_odds(pick_odds(outcome))
}

fn render_odds(odds: Option<f64>) -> String {
    match odds {
        Some(value) => format!("{value:.2}"),
        None => "N/A".to_string(),
    }
}

/// Serializes the betting-shop import layout: fixed header, one
/// `MATCH_NAME` line for the club, then a `LEAGUE_NAME` section per player.
pub fn serialize_structured(set: &ExportSet, club_name: &str) -> Result<String, ExportError> {
    let club_name = club_name.trim();
    if club_name.is_empty() {
        return Err(ExportError::MissingClub);
    }

    let mut writer = csv_writer();
    writer.write_record(STRUCTURED_HEADER)?;
    writer.write_record([format!("MATCH_NAME:{club_name}")])?;
    for section in &set.players {
        if section.rows.is_empty() {
            continue;
        }
        writer.write_record([format!("LEAGUE_NAME:{}", section.player)])?;
        for row in &section.rows {
            writer.write_record(row.structured_record())?;
        }
    }
    finish(writer)
}

/// Serializes a flat one-row-per-selection CSV.
pub fn serialize_plain(set: &ExportSet, event: &EventRecord) -> Result<String, ExportError> {
    let mut writer = csv_writer();
    writer.write_record(PLAIN_HEADER)?;
    for section in &set.players {
        for row in &section.rows {
            writer.write_record([
                event.name.as_str(),
                row.date.as_str(),
                row.time.as_str(),
                section.player.as_str(),
                row.market.as_str(),
                row.selection.as_str(),
                row.odds.as_str(),
            ])?;
        }
    }
    finish(writer)
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .flexible(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Csv(csv::Error::from(err.into_error())))?;
    // Every field written above is a Rust string, so the buffer is UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn export_file_name(club_name: &str) -> String {
    let stem: String = club_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("{stem}_odds.csv")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub mime: &'static str,
    pub contents: String,
}

pub fn write_export(dir: &Path, export: &CsvExport) -> Result<PathBuf, ExportError> {
    let path = dir.join(&export.file_name);
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, export.contents.as_bytes()).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), bytes = export.contents.len(), "wrote export");
    Ok(path)
}

/// One "add to export" action: a player and a market id or name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportAction {
    pub player: String,
    pub market: String,
}

impl ExportAction {
    pub fn new(player: impl Into<String>, market: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            market: market.into(),
        }
    }
}

/// Selection state for one export workflow. Choosing a different event
/// discards everything chosen for the previous one.
#[derive(Debug, Clone, Default)]
pub struct ExportSession {
    event: Option<EventRecord>,
    when: EventDateTime,
    markets: Vec<MarketRecord>,
    player: Option<String>,
    club: Option<String>,
    rows: ExportSet,
}

impl ExportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(&self) -> Option<&EventRecord> {
        self.event.as_ref()
    }

    pub fn markets(&self) -> &[MarketRecord] {
        &self.markets
    }

    pub fn rows(&self) -> &ExportSet {
        &self.rows
    }

    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    pub fn club(&self) -> Option<&str> {
        self.club.as_deref()
    }

    pub fn select_event(&mut self, event: EventRecord) {
        self.select_event_at(EventDateTime::for_event(&event), event);
    }

    /// Like `select_event`, with explicit export date/time columns.
    pub fn select_event_at(&mut self, when: EventDateTime, event: EventRecord) {
        let changed = self.event.as_ref().is_none_or(|current| current.id != event.id);
        if changed {
            debug!(event_id = %event.id, "event changed, clearing export selections");
            self.rows.clear();
            self.markets.clear();
            self.player = None;
            self.club = None;
        }
        self.when = when;
        self.event = Some(event);
    }

    /// Normalizes an odds response and keeps the player markets.
    pub fn load_markets(&mut self, raw: &Value) -> &[MarketRecord] {
        self.markets = filter_player_markets(&extract_markets(raw));
        &self.markets
    }

    pub fn clubs(&self) -> Vec<String> {
        self.event.as_ref().map(EventRecord::clubs).unwrap_or_default()
    }

    pub fn players(&self) -> Vec<String> {
        players_in_markets(&self.markets)
    }

    pub fn select_player(&mut self, player: &str) -> Result<(), ExportError> {
        let player = player.trim();
        if player.is_empty() {
            return Err(ExportError::MissingPlayer);
        }
        self.player = Some(player.to_string());
        Ok(())
    }

    pub fn select_club(&mut self, club: &str) -> Result<(), ExportError> {
        let club = club.trim();
        if club.is_empty() {
            return Err(ExportError::MissingClub);
        }
        self.club = Some(club.to_string());
        Ok(())
    }

    pub fn find_market(&self, market_ref: &str) -> Option<&MarketRecord> {
        let wanted = market_ref.trim();
        self.markets
            .iter()
            .find(|m| !m.id.is_empty() && m.id == wanted)
            .or_else(|| {
                self.markets
                    .iter()
                    .find(|m| m.name.trim().eq_ignore_ascii_case(wanted))
            })
    }

    /// Adds the selected player's outcomes of one market. Returns the number
    /// of new rows.
    pub fn add_to_export(&mut self, market_ref: &str) -> Result<usize, ExportError> {
        if self.event.is_none() {
            return Err(ExportError::MissingEvent);
        }
        let player = self.player.clone().ok_or(ExportError::MissingPlayer)?;
        let market = self
            .find_market(market_ref)
            .cloned()
            .ok_or_else(|| ExportError::UnknownMarket(market_ref.to_string()))?;
        let added = self.rows.add(&player, &market, &self.when);
        debug!(player = %player, market = %market.name, added, "added to export");
        Ok(added)
    }

    /// Replays actions in order, stopping at the first rejected one.
    pub fn apply(&mut self, actions: &[ExportAction]) -> Result<usize, ExportError> {
        let mut added = 0;
        for action in actions {
            self.select_player(&action.player)?;
            added += self.add_to_export(&action.market)?;
        }
        Ok(added)
    }

    pub fn export(&self) -> Result<CsvExport, ExportError> {
        let club = self.club.as_deref().ok_or(ExportError::MissingClub)?;
        if self.rows.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        Ok(CsvExport {
            file_name: export_file_name(club),
            mime: CSV_MIME,
            contents: serialize_structured(&self.rows, club)?,
        })
    }

    pub fn export_plain(&self) -> Result<CsvExport, ExportError> {
        let event = self.event.as_ref().ok_or(ExportError::MissingEvent)?;
        let club = self.club.as_deref().ok_or(ExportError::MissingClub)?;
        if self.rows.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        let stem = export_file_name(club);
        Ok(CsvExport {
            file_name: stem.replace("_odds.csv", "_odds_plain.csv"),
            mime: CSV_MIME,
            contents: serialize_plain(&self.rows, event)?,
        })
    }
}
