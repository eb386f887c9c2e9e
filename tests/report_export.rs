use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use cs2_inspect::config::AppConfig;
use cs2_inspect::export::{write_json_report, write_workbook};
use cs2_inspect::loader::{MatchData, load_match};
use cs2_inspect::report::analyze;
use cs2_inspect::scout::{RiskTier, ThreatLevel};

fn load_fixture(name: &str) -> MatchData {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    load_match(&path, &AppConfig::default(), |_| {}).expect("fixture should load")
}

#[test]
fn report_covers_rounds_chat_damage_and_roster() {
    let report = analyze(&load_fixture("match_small.json"), true);

    assert_eq!(report.rounds.indices, vec![1, 2]);
    assert_eq!(report.rounds.labels, vec!["1H-01".to_string(), "1H-02".to_string()]);
    assert_eq!(report.round_summary.total_rounds, 2);
    assert_eq!(report.round_summary.team_wins["T"], 1);
    assert_eq!(report.round_summary.team_wins["CT"], 1);
    assert_eq!(report.scoreboard[&1].t_wins, 1);
    assert_eq!(report.scoreboard[&2].ct_wins, 1);

    assert_eq!(report.chat.messages.len(), 2);
    assert_eq!(report.chat.team_lines(), vec!["[340] (TEAM) alpha: nice".to_string()]);
    assert_eq!(report.chat.server_messages()["ALL"][0].1, "Match paused");

    let alpha = report.damage["STEAM_1:1:0"];
    assert_eq!(alpha.damage, 100.0);
    assert_eq!(alpha.kills, 1);
    assert_eq!(report.damage["STEAM_1:0:1"].deaths, 1);
    assert_eq!(report.damage_events.len(), 2);
    assert_eq!(report.damage_events[0].attacker, "alpha_main");
    assert_eq!(report.damage_events[0].victim, "bravo");

    assert_eq!(report.roster.len(), 2);
    assert_eq!(report.roster[1].dropdown_label(), "bravo (STEAM_1:0:1)");
    assert_eq!(report.display_name("STEAM_1:1:0"), "alpha_main");

    let by_round = report.by_round.as_ref().expect("per-round stats requested");
    assert_eq!(by_round.len(), 2);
}

#[test]
fn scout_and_risk_come_from_stats_and_profiles() {
    let report = analyze(&load_fixture("match_small.json"), false);

    assert_eq!(report.scout.players.len(), 2);
    let alpha = report
        .scout
        .players
        .iter()
        .find(|p| p.name == "alpha_main")
        .expect("alpha scouted");
    assert_eq!(alpha.kdr, 1.0);
    assert_eq!(alpha.headshot_rate, 100.0);
    assert_eq!(alpha.threat_level, ThreatLevel::Medium);
    assert_eq!(report.scout.threat_summary.medium, 1);
    assert_eq!(report.scout.threat_summary.low, 1);

    assert_eq!(report.risk.len(), 1);
    let risk = &report.risk[0];
    assert_eq!(risk.player, "STEAM_1:1:0");
    assert_eq!(risk.cheating_comments, 1);
    assert_eq!(risk.score, 5);
    assert_eq!(risk.tier, RiskTier::Medium);
    assert!((risk.likelihood - 0.1).abs() < 1e-12);
}

#[test]
fn json_report_round_trips_through_disk() {
    let report = analyze(&load_fixture("match_small.json"), true);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("report.json");
    write_json_report(&path, &report).expect("json export");

    assert!(!path.with_extension("json.tmp").exists());
    let raw = fs::read_to_string(&path).expect("read back");
    let value: Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value["basic"]["STEAM_1:1:0"]["kills"], 1);
    assert_eq!(value["basic"]["STEAM_1:1:0"]["headshotPct"], 100.0);
    assert_eq!(value["advanced"]["STEAM_1:0:1"]["counterStrafeRating"], 0.5);
    assert_eq!(value["byRound"]["2"]["basic"]["STEAM_1:0:1"]["totalDamage"], 40.0);
    assert_eq!(value["scout"]["threat_summary"]["medium"], 1);
}

#[test]
fn workbook_is_written_with_row_counts() {
    let report = analyze(&load_fixture("match_small.json"), false);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("report.xlsx");
    let summary = write_workbook(&path, &report).expect("workbook export");

    assert!(path.exists());
    assert!(fs::metadata(&path).expect("metadata").len() > 0);
    assert_eq!(summary.basic_rows, 2);
    assert_eq!(summary.damage_rows, 2);
    assert_eq!(summary.round_rows, 2);
    assert_eq!(summary.chat_rows, 2);
    assert_eq!(summary.scout_rows, 2);
}
