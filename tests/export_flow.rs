use std::env;
use std::fs;
use std::path::PathBuf;

use propsheet::data_source::{DataSource, DirSource};
use propsheet::events::{EventDateTime, extract_events};
use propsheet::export::{CSV_MIME, ExportAction, ExportError, ExportSession, write_export};

fn snapshot_source() -> DirSource {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("snapshot");
    DirSource::new(path)
}

fn session_for_inter_milan() -> ExportSession {
    let source = snapshot_source();
    let events = extract_events(&source.fetch_events().expect("events snapshot"));
    let event = events
        .into_iter()
        .find(|e| e.name == "Inter v Milan")
        .expect("fixture event");

    let mut session = ExportSession::new();
    session.select_event_at(EventDateTime::new("12.05.2024", "20:45"), event);
    let raw = source.fetch_odds("240123").expect("odds snapshot");
    assert_eq!(session.load_markets(&raw).len(), 3);
    session
}

#[test]
fn goalscorer_export_matches_shop_layout() {
    let mut session = session_for_inter_milan();
    assert_eq!(session.clubs(), vec!["Inter", "Milan"]);

    session.select_player("Messi").expect("player");
    assert_eq!(session.add_to_export("Anytime Goalscorer").expect("add"), 1);
    session.select_club("Inter").expect("club");

    let export = session.export().expect("export");
    assert_eq!(export.file_name, "Inter_odds.csv");
    assert_eq!(export.mime, CSV_MIME);

    let lines: Vec<&str> = export.contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Datum,Vreme,Sifra,Domacin,Gost,1,X,2,GR,U,O,Yes,No",
            "MATCH_NAME:Inter",
            "LEAGUE_NAME:Messi",
            "12.05.2024,20:45,,daje gol,DA,2.00,,,,,,,",
        ]
    );
    assert!(lines[3].ends_with(",,daje gol,DA,2.00,,,,,,,"));
}

#[test]
fn adding_the_same_market_twice_keeps_one_row() {
    let mut session = session_for_inter_milan();
    session.select_player("Messi").expect("player");
    session.add_to_export("m-ags").expect("first add");
    assert_eq!(session.add_to_export("anytime goalscorer").expect("second add"), 0);
    assert_eq!(session.rows().row_count(), 1);
}

#[test]
fn actions_for_several_players_keep_insertion_order() {
    let mut session = session_for_inter_milan();
    let added = session
        .apply(&[
            ExportAction::new("Ronaldo", "Anytime Goalscorer"),
            ExportAction::new("Messi", "Player 2 or more Shots On Target"),
            ExportAction::new("Messi", "Player to Score and Team Win"),
        ])
        .expect("apply");
    assert_eq!(added, 3);
    session.select_club("Milan").expect("club");

    let contents = session.export().expect("export").contents;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[1], "MATCH_NAME:Milan");
    assert_eq!(lines[2], "LEAGUE_NAME:Ronaldo");
    assert_eq!(lines[3], "12.05.2024,20:45,,daje gol,DA,1.80,,,,,,,");
    assert_eq!(lines[4], "LEAGUE_NAME:Messi");
    assert_eq!(lines[5], "12.05.2024,20:45,,šutevi u okvir gola,2+,3.25,,,,,,,");
    assert_eq!(lines[6], "12.05.2024,20:45,,daje gol i tim pobeđuje,DA,2.62,,,,,,,");
}

#[test]
fn missing_price_exports_as_na() {
    let mut session = session_for_inter_milan();
    session.select_player("Lautaro").expect("player");
    session.add_to_export("m-sot").expect("add");
    session.select_club("Inter").expect("club");
    let contents = session.export().expect("export").contents;
    assert!(contents.contains("LEAGUE_NAME:Lautaro\n"));
    assert!(contents.contains(",,šutevi u okvir gola,2+,N/A,,,,,,,"));
}

#[test]
fn switching_event_clears_the_export() {
    let mut session = session_for_inter_milan();
    session.select_player("Messi").expect("player");
    session.add_to_export("m-ags").expect("add");

    let source = snapshot_source();
    let other = extract_events(&source.fetch_events().expect("events"))
        .into_iter()
        .find(|e| e.name == "Roma v Lazio")
        .expect("second event");
    session.select_event(other);

    assert!(session.rows().is_empty());
    assert!(session.markets().is_empty());
    assert!(matches!(session.add_to_export("m-ags"), Err(ExportError::MissingPlayer)));
}

#[test]
fn reselecting_the_same_event_keeps_rows() {
    let mut session = session_for_inter_milan();
    session.select_player("Messi").expect("player");
    session.add_to_export("m-ags").expect("add");
    let event = session.event().cloned().expect("event");
    session.select_event_at(EventDateTime::new("12.05.2024", "20:45"), event);
    assert_eq!(session.rows().row_count(), 1);
}

#[test]
fn plain_export_and_file_write() {
    let mut session = session_for_inter_milan();
    session.select_player("Messi").expect("player");
    session.add_to_export("m-ags").expect("add");
    session.select_club("Inter").expect("club");

    let plain = session.export_plain().expect("plain export");
    assert_eq!(plain.file_name, "Inter_odds_plain.csv");
    assert_eq!(
        plain.contents,
        "Event,Date,Time,Player,Market,Selection,Odds\nInter v Milan,12.05.2024,20:45,Messi,daje gol,DA,2.00\n"
    );

    let dir = env::temp_dir().join(format!("propsheet-export-{}", std::process::id()));
    let path = write_export(&dir, &plain).expect("write");
    assert_eq!(fs::read_to_string(&path).expect("read back"), plain.contents);
    fs::remove_dir_all(&dir).ok();
}
