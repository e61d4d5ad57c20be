use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use propsheet::config::{LoggingConfig, ProviderConfig};
use propsheet::data_source::{DataSource, source_from_config};
use propsheet::events::{EventRecord, extract_events};
use propsheet::export::{ExportAction, ExportSession, format_odds, write_export};
use propsheet::labels::{classify, map_market_label, map_selection_label};
use propsheet::markets::{MarketRecord, extract_markets, filter_player_markets};

#[derive(Debug, Parser)]
#[command(name = "propsheet", about = "Export player-prop odds to a betting-shop CSV")]
struct Cli {
    /// Read saved provider responses from this directory instead of the network.
    #[arg(long, global = true)]
    snapshot_dir: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List available events.
    Events,
    /// Show the player markets of one event.
    Markets {
        event_id: String,
        /// Only show outcomes for this player.
        #[arg(long)]
        player: Option<String>,
    },
    /// Write the selected player markets of one event to `{club}_odds.csv`.
    Export {
        event_id: String,
        #[arg(long)]
        club: String,
        /// `PLAYER=MARKET`, market by id or name. Repeatable.
        #[arg(long = "pick", required = true)]
        picks: Vec<String>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Write the flat one-row-per-selection layout instead.
        #[arg(long)]
        plain: bool,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    LoggingConfig::from_env().init();
    let cli = Cli::parse();

    let mut cfg = ProviderConfig::from_env();
    if let Some(dir) = cli.snapshot_dir {
        cfg.snapshot_dir = Some(dir);
    }
    if let Some(secs) = cli.timeout_secs {
        cfg = cfg.with_timeout_secs(secs);
    }
    let source = source_from_config(&cfg).context("failed to set up data source")?;

    match cli.command {
        Command::Events => list_events(source.as_ref()),
        Command::Markets { event_id, player } => {
            list_markets(source.as_ref(), &event_id, player.as_deref())
        }
        Command::Export {
            event_id,
            club,
            picks,
            out,
            plain,
        } => export(source.as_ref(), &event_id, &club, &picks, &out, plain),
    }
}

fn load_events(source: &dyn DataSource) -> Result<Vec<EventRecord>> {
    let raw = source.fetch_events().context("error loading events")?;
    let events = extract_events(&raw);
    if events.is_empty() {
        return Err(anyhow!("No events found in the response"));
    }
    Ok(events)
}

fn find_event(source: &dyn DataSource, event_id: &str) -> Result<EventRecord> {
    load_events(source)?
        .into_iter()
        .find(|e| e.id == event_id.trim())
        .with_context(|| format!("event {event_id} not found in events listing"))
}

fn list_events(source: &dyn DataSource) -> Result<()> {
    for event in load_events(source)? {
        println!("{}\t{}", event.id, event.display_label());
    }
    Ok(())
}

fn load_player_markets(source: &dyn DataSource, event_id: &str) -> Result<Vec<MarketRecord>> {
    let raw = source.fetch_odds(event_id).context("error loading odds")?;
    Ok(filter_player_markets(&extract_markets(&raw)))
}

fn list_markets(source: &dyn DataSource, event_id: &str, player: Option<&str>) -> Result<()> {
    let markets = load_player_markets(source, event_id)?;
    if markets.is_empty() {
        println!("No player markets available for this event");
        return Ok(());
    }
    let needle = player.map(|p| p.trim().to_lowercase());
    for market in &markets {
        println!(
            "{}\t{} [{}] -> {}",
            market.id,
            market.name,
            classify(&market.name).label(),
            map_market_label(&market.name)
        );
        for outcome in &market.outcomes {
            if let Some(needle) = needle.as_deref()
                && !outcome.name.to_lowercase().contains(needle)
            {
                continue;
            }
            println!(
                "\t{}\t{}\t{}",
                outcome.name,
                map_selection_label(&market.name, &outcome.name),
                format_odds(outcome)
            );
        }
    }
    Ok(())
}

fn parse_pick(raw: &str) -> Result<ExportAction> {
    let (player, market) = raw
        .split_once('=')
        .with_context(|| format!("pick '{raw}' must look like PLAYER=MARKET"))?;
    Ok(ExportAction::new(player.trim(), market.trim()))
}

fn export(
    source: &dyn DataSource,
    event_id: &str,
    club: &str,
    picks: &[String],
    out: &Path,
    plain: bool,
) -> Result<()> {
    let actions = picks
        .iter()
        .map(|p| parse_pick(p))
        .collect::<Result<Vec<_>>>()?;

    let event = find_event(source, event_id)?;
    let mut session = ExportSession::new();
    session.select_event(event);

    let raw = source.fetch_odds(event_id).context("error loading odds")?;
    if session.load_markets(&raw).is_empty() {
        return Err(anyhow!("No player markets available for this event"));
    }
    session.select_club(club)?;
    let added = session.apply(&actions)?;

    let export = if plain {
        session.export_plain()?
    } else {
        session.export()?
    };
    let path = write_export(out, &export)?;
    println!("Wrote {added} rows to {}", path.display());
    Ok(())
}
