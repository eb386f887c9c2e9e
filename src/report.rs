use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::chat::{ChatTranscript, extract_chat};
use crate::damage::{DamageRow, DamageTotals, damage_breakdown, damage_summary};
use crate::loader::{EventFlags, MatchData};
use crate::roster::{PlayerEntry, extract_roster, name_map};
use crate::rounds::{
    RoundMetadata, RoundScore, RoundSummary, build_round_metadata, build_scoreboard,
    summarize_rounds,
};
use crate::scout::{
    RiskRow, ScoutInput, ScoutReport, build_scout_report, risk_rows, scout_profiles,
};
use crate::stats::{
    AdvancedStatsMap, BasicStatsMap, RoundStats, StatsProgress, compute_stats_by_round,
    compute_stats_with_progress,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub flags: EventFlags,
    pub basic: BasicStatsMap,
    pub advanced: AdvancedStatsMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_round: Option<BTreeMap<i64, RoundStats>>,
    pub rounds: RoundMetadata,
    pub round_summary: RoundSummary,
    pub scoreboard: BTreeMap<i64, RoundScore>,
    pub chat: ChatTranscript,
    pub damage: BTreeMap<String, DamageTotals>,
    pub damage_events: Vec<DamageRow>,
    pub roster: Vec<PlayerEntry>,
    /// Canonical player id to display name.
    pub names: BTreeMap<String, String>,
    pub scout: ScoutReport,
    pub risk: Vec<RiskRow>,
}

impl MatchReport {
    pub fn display_name<'a>(&'a self, player: &'a str) -> &'a str {
        self.names.get(player).map(String::as_str).unwrap_or(player)
    }
}

pub fn analyze(data: &MatchData, by_round: bool) -> MatchReport {
    analyze_with_progress(data, by_round, |_| {})
}

pub fn analyze_with_progress(
    data: &MatchData,
    by_round: bool,
    on_progress: impl FnMut(StatsProgress),
) -> MatchReport {
    let events = &data.events;
    let (basic, advanced) = compute_stats_with_progress(events, on_progress);

    let roster = extract_roster(&data.doc, events);
    let profiles = scout_profiles(&data.doc);
    let mut names = name_map(&roster);
    for (player, profile) in &profiles {
        if !profile.persona_name.trim().is_empty() {
            names.insert(player.clone(), profile.persona_name.clone());
        }
    }

    let scout_rows = scout_inputs(&data.doc, &basic, &names);
    let report = MatchReport {
        source: data.source.display().to_string(),
        loaded_at: data.loaded_at,
        generated_at: Utc::now(),
        flags: data.flags,
        by_round: by_round.then(|| compute_stats_by_round(events)),
        rounds: build_round_metadata(events),
        round_summary: summarize_rounds(events),
        scoreboard: build_scoreboard(events),
        chat: extract_chat(events),
        damage: damage_summary(events),
        damage_events: damage_breakdown(events, &names),
        scout: build_scout_report(&scout_rows),
        risk: risk_rows(&profiles),
        basic,
        advanced,
        roster,
        names,
    };
    info!(
        source = %report.source,
        players = report.basic.len(),
        rounds = report.round_summary.total_rounds,
        "analysis complete"
    );
    report
}

/// Scout rows from the document's `playerStats`, or derived from the
/// computed stats when the document has none.
fn scout_inputs(
    doc: &Value,
    basic: &BasicStatsMap,
    names: &BTreeMap<String, String>,
) -> Vec<ScoutInput> {
    if let Some(list) = doc.get("playerStats").and_then(Value::as_array) {
        let rows: Vec<ScoutInput> = list.iter().filter_map(ScoutInput::from_value).collect();
        if !rows.is_empty() {
            return rows;
        }
    }
    basic
        .iter()
        .map(|(player, stats)| ScoutInput {
            name: names.get(player).cloned().unwrap_or_else(|| player.clone()),
            team: "Unknown".to_string(),
            kills: stats.kills,
            deaths: stats.deaths,
            headshots: (stats.headshot_pct * f64::from(stats.kills) / 100.0).round() as u32,
            damage: stats.total_damage,
            ..ScoutInput::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::analyze;
    use crate::loader::MatchData;

    #[test]
    fn derives_scout_rows_from_stats_when_document_has_none() {
        let doc = json!({
            "playerInfo": [{"steamid": "76561197960265729", "name": "alpha"}],
            "events": [
                {"type": "player_death", "attacker": "76561197960265729", "victim": "P2",
                 "details": {"headshot": true}},
                {"type": "player_death", "attacker": "76561197960265729", "victim": "P3"}
            ]
        });
        let report = analyze(&MatchData::from_document("m.json", doc), false);
        assert!(report.by_round.is_none());
        let alpha = report
            .scout
            .players
            .iter()
            .find(|p| p.name == "alpha")
            .unwrap();
        assert_eq!(alpha.kills, 2);
        assert_eq!(alpha.headshots, 1);
        assert_eq!(alpha.headshot_rate, 50.0);
        assert_eq!(report.display_name("STEAM_1:1:0"), "alpha");
        assert_eq!(report.display_name("P2"), "P2");
        assert!(report.risk.is_empty());
    }
}
