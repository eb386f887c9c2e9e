//! Scouting heuristics over per-player numbers and Steam profile data
//! carried in the match document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::event::{as_f64_any, as_i64_any};
use crate::steam_id::canonical_player_key;

pub const CHEAT_KEYWORDS: [&str; 6] = ["cheat", "hack", "wh", "aimbot", "wallhack", "spinbot"];
const MAX_RISK_SCORE: u32 = 10;

/// Steam profile snapshot for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutProfile {
    pub persona_name: String,
    pub vac_banned: bool,
    pub community_banned: bool,
    pub game_bans: u32,
    pub economy_ban: String,
    pub hours_played_cs2: f64,
    pub friends_vac_banned: u32,
    pub comments: Vec<String>,
    pub cheating_comments_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_score(score: u32) -> Self {
        if score >= 8 {
            Self::High
        } else if score >= 4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl ThreatLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }
}

pub fn count_cheating_comments<S: AsRef<str>>(comments: &[S]) -> u32 {
    comments
        .iter()
        .filter(|c| {
            let lower = c.as_ref().to_lowercase();
            CHEAT_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .count() as u32
}

pub fn risk_score(profile: &ScoutProfile) -> u32 {
    let mut score = 0;
    if profile.vac_banned {
        score += 3;
    }
    if profile.game_bans > 0 {
        score += 2;
    }
    if profile.friends_vac_banned > 5 {
        score += 2;
    }
    if profile.cheating_comments_count > 0 {
        score += 2;
    }
    if profile.hours_played_cs2 < 50.0 {
        score += 1;
    }
    score.min(MAX_RISK_SCORE)
}

/// 1.0 for a VAC ban, otherwise a tenth per cheating comment, capped at 1.
pub fn cheat_likelihood(profile: &ScoutProfile) -> f64 {
    if profile.vac_banned {
        return 1.0;
    }
    round2((0.1 * f64::from(profile.cheating_comments_count)).min(1.0))
}

/// Threat level from performance numbers. A FACEIT rating of 2000 or more
/// overrides the stat thresholds.
pub fn infer_threat_level(kdr: f64, hs_rate: f64, accuracy: f64, faceit_elo: i64) -> ThreatLevel {
    if faceit_elo >= 2400 {
        return ThreatLevel::Medium;
    }
    if faceit_elo >= 2000 {
        return ThreatLevel::Low;
    }
    if kdr >= 3.5 && hs_rate >= 75.0 && accuracy >= 0.45 {
        ThreatLevel::Extreme
    } else if kdr >= 2.0 && hs_rate >= 60.0 {
        ThreatLevel::High
    } else if kdr >= 1.2 || hs_rate >= 40.0 {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Raw per-player numbers feeding the scout report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoutInput {
    pub name: String,
    pub team: String,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub headshots: u32,
    pub accuracy: f64,
    pub damage: f64,
    pub faceit_elo: i64,
}

impl ScoutInput {
    /// Reads one `playerStats` entry; missing numbers default to zero.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .map(|s| s.trim().to_string())
        };
        let count = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| obj.get(*k).and_then(as_i64_any))
                .find(|n| *n != 0)
                .map(|n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
                .unwrap_or(0)
        };
        let number = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| obj.get(*k).and_then(as_f64_any))
                .find(|n| *n != 0.0)
                .unwrap_or(0.0)
        };
        Some(Self {
            name: text(&["name", "Player"]).unwrap_or_else(|| "Unknown".to_string()),
            team: text(&["team"]).unwrap_or_else(|| "Unknown".to_string()),
            kills: count(&["kills", "Kills"]),
            deaths: count(&["deaths", "Deaths"]),
            assists: count(&["assists"]),
            headshots: count(&["headshot_kills", "headshots"]),
            accuracy: number(&["accuracy"]),
            damage: number(&["total_damage", "damage"]),
            faceit_elo: number(&["faceit_elo"]) as i64,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutPlayer {
    pub name: String,
    pub team: String,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub headshots: u32,
    pub headshot_rate: f64,
    pub accuracy: f64,
    pub damage: f64,
    pub kdr: f64,
    pub faceit_elo: i64,
    pub threat_level: ThreatLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatSummary {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub extreme: u32,
}

impl ThreatSummary {
    fn record(&mut self, level: ThreatLevel) {
        match level {
            ThreatLevel::Low => self.low += 1,
            ThreatLevel::Medium => self.medium += 1,
            ThreatLevel::High => self.high += 1,
            ThreatLevel::Extreme => self.extreme += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoutReport {
    pub players: Vec<ScoutPlayer>,
    pub threat_summary: ThreatSummary,
}

pub fn build_scout_report(rows: &[ScoutInput]) -> ScoutReport {
    let mut report = ScoutReport::default();
    for row in rows {
        let deaths = row.deaths.max(1);
        let kdr = round2(f64::from(row.kills) / f64::from(deaths));
        let headshot_rate = if row.kills > 0 {
            round2(100.0 * f64::from(row.headshots) / f64::from(row.kills))
        } else {
            0.0
        };
        let threat_level = infer_threat_level(kdr, headshot_rate, row.accuracy, row.faceit_elo);
        report.threat_summary.record(threat_level);
        report.players.push(ScoutPlayer {
            name: row.name.clone(),
            team: row.team.clone(),
            kills: row.kills,
            deaths,
            assists: row.assists,
            headshots: row.headshots,
            headshot_rate,
            accuracy: row.accuracy,
            damage: row.damage,
            kdr,
            faceit_elo: row.faceit_elo,
            threat_level,
        });
    }
    report
}

/// Profiles from the document's `scoutStats` map, keyed by canonical
/// player id. Entries that do not decode are skipped with a warning.
pub fn scout_profiles(doc: &Value) -> BTreeMap<String, ScoutProfile> {
    let mut out = BTreeMap::new();
    let Some(map) = doc.get("scoutStats").and_then(Value::as_object) else {
        return out;
    };
    for (id, raw) in map {
        match serde_json::from_value::<ScoutProfile>(raw.clone()) {
            Ok(mut profile) => {
                if profile.cheating_comments_count == 0 {
                    profile.cheating_comments_count = count_cheating_comments(profile.comments.as_slice());
                }
                out.insert(canonical_player_key(id), profile);
            }
            Err(err) => warn!(player = %id, error = %err, "skipping malformed scout profile"),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    pub player: String,
    pub persona_name: String,
    pub vac_banned: bool,
    pub game_bans: u32,
    pub hours_played_cs2: f64,
    pub cheating_comments: u32,
    pub likelihood: f64,
    pub score: u32,
    pub tier: RiskTier,
}

pub fn risk_rows(profiles: &BTreeMap<String, ScoutProfile>) -> Vec<RiskRow> {
    profiles
        .iter()
        .map(|(player, profile)| {
            let score = risk_score(profile);
            RiskRow {
                player: player.clone(),
                persona_name: profile.persona_name.clone(),
                vac_banned: profile.vac_banned,
                game_bans: profile.game_bans,
                hours_played_cs2: profile.hours_played_cs2,
                cheating_comments: profile.cheating_comments_count,
                likelihood: cheat_likelihood(profile),
                score,
                tier: RiskTier::from_score(score),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn elo_overrides_stat_heuristic() {
        assert_eq!(infer_threat_level(5.0, 90.0, 0.9, 2500), ThreatLevel::Medium);
        assert_eq!(infer_threat_level(5.0, 90.0, 0.9, 2100), ThreatLevel::Low);
        assert_eq!(infer_threat_level(3.5, 75.0, 0.45, 0), ThreatLevel::Extreme);
        assert_eq!(infer_threat_level(2.0, 60.0, 0.1, 0), ThreatLevel::High);
        assert_eq!(infer_threat_level(0.5, 40.0, 0.0, 0), ThreatLevel::Medium);
        assert_eq!(infer_threat_level(1.1, 39.9, 0.0, 0), ThreatLevel::Low);
    }

    #[test]
    fn risk_score_caps_and_tiers() {
        let profile = ScoutProfile {
            vac_banned: true,
            game_bans: 2,
            friends_vac_banned: 9,
            cheating_comments_count: 1,
            hours_played_cs2: 10.0,
            ..ScoutProfile::default()
        };
        assert_eq!(risk_score(&profile), 10);
        assert_eq!(RiskTier::from_score(10), RiskTier::High);
        assert_eq!(RiskTier::from_score(4), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(3), RiskTier::Low);

        let veteran = ScoutProfile {
            hours_played_cs2: 900.0,
            ..ScoutProfile::default()
        };
        assert_eq!(risk_score(&veteran), 0);
    }

    #[test]
    fn likelihood_scales_with_comments() {
        let mut profile = ScoutProfile {
            cheating_comments_count: 3,
            ..ScoutProfile::default()
        };
        assert!((cheat_likelihood(&profile) - 0.3).abs() < 1e-12);
        profile.cheating_comments_count = 40;
        assert_eq!(cheat_likelihood(&profile), 1.0);
        profile.vac_banned = true;
        profile.cheating_comments_count = 0;
        assert_eq!(cheat_likelihood(&profile), 1.0);
    }

    #[test]
    fn cheating_keywords_are_case_insensitive() {
        let comments = ["nice AIMBOT bro", "gg wp", "-rep hacker"];
        assert_eq!(count_cheating_comments(&comments[..]), 2);
    }

    #[test]
    fn oversized_counts_saturate() {
        let row = ScoutInput::from_value(&json!({"name": "x", "kills": 5_000_000_000i64, "deaths": -3}))
            .unwrap();
        assert_eq!(row.kills, u32::MAX);
        assert_eq!(row.deaths, 0);
    }

    #[test]
    fn report_floors_deaths_and_counts_levels() {
        let rows = vec![
            ScoutInput::from_value(&json!({"name": "a", "kills": 7, "deaths": 0, "headshots": 6, "accuracy": 0.5}))
                .unwrap(),
            ScoutInput::from_value(&json!({"name": "b", "kills": 3, "deaths": 9})).unwrap(),
        ];
        let report = build_scout_report(&rows);
        assert_eq!(report.players[0].deaths, 1);
        assert_eq!(report.players[0].kdr, 7.0);
        assert_eq!(report.players[0].headshot_rate, 85.71);
        assert_eq!(report.players[0].threat_level, ThreatLevel::Extreme);
        assert_eq!(report.players[1].kdr, 0.33);
        assert_eq!(report.threat_summary.extreme, 1);
        assert_eq!(report.threat_summary.low, 1);
    }

    #[test]
    fn profiles_are_keyed_canonically() {
        let doc = json!({"scoutStats": {
            "76561197960265729": {"persona_name": "alpha", "comments": ["wallhack obvious"]},
            "STEAM_1:0:1": {"game_bans": "lots"}
        }});
        let profiles = scout_profiles(&doc);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles["STEAM_1:1:0"].cheating_comments_count, 1);
        let rows = risk_rows(&profiles);
        assert_eq!(rows[0].score, 3);
        assert_eq!(rows[0].tier, RiskTier::Low);
    }
}
