use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{EventView, as_i64_any};

const REGULATION_HALF: usize = 12;
const OT_SET_ROUNDS: usize = 6;
const TEAM_T: i64 = 2;
const TEAM_CT: i64 = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundMetadata {
    pub indices: Vec<usize>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundScore {
    pub t_wins: u32,
    pub ct_wins: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub total_rounds: usize,
    pub team_wins: BTreeMap<String, u32>,
}

fn type_matches(etype: &str, snake: &str) -> bool {
    let joined: String = snake.split('_').collect();
    etype == snake || etype.ends_with(snake) || etype.ends_with(&format!(".{joined}"))
}

fn round_starts(events: &[EventView<'_>]) -> Vec<i64> {
    let mut starts = Vec::new();
    let mut last = None;
    for ev in events {
        if !type_matches(&ev.etype(), "round_start") {
            continue;
        }
        let tick = ev.tick();
        if last != Some(tick) {
            starts.push(tick);
            last = Some(tick);
        }
    }
    starts
}

/// A knife round has no gun fired and no bomb planted. Bayonets count as
/// knives.
fn is_knife_round(block: &[&EventView<'_>]) -> bool {
    for ev in block {
        let etype = ev.etype();
        if type_matches(&etype, "weapon_fire") {
            let weapon = ev.weapon().unwrap_or_default().to_lowercase();
            let weapon = weapon.strip_prefix("weapon_").unwrap_or(&weapon);
            if !(weapon.starts_with("knife") || weapon == "bayonet") {
                return false;
            }
        }
        if type_matches(&etype, "bomb_planted") {
            return false;
        }
    }
    true
}

/// Round indices and dropdown labels inferred from round-start markers.
///
/// Regulation rounds are labelled `1H-NN`/`2H-NN`; overtime is grouped in
/// MR3 sets of six as `OT{set}-R{n}`. A leading knife round gets index 0.
pub fn build_round_metadata(events: &[Value]) -> RoundMetadata {
    let views: Vec<EventView<'_>> = events.iter().filter_map(EventView::new).collect();
    let starts = round_starts(&views);
    let mut meta = RoundMetadata::default();

    for (pos, start) in starts.iter().enumerate() {
        let number = pos + 1;
        if number == 1 {
            let end = starts.get(1).copied().unwrap_or(i64::MAX);
            let block: Vec<&EventView<'_>> = views
                .iter()
                .filter(|ev| (*start..end).contains(&ev.tick()))
                .collect();
            if is_knife_round(&block) {
                meta.indices.push(0);
                meta.labels.push("Knife Round (pre-match)".to_string());
                continue;
            }
        }

        meta.indices.push(number);
        meta.labels.push(round_label(number));
    }
    meta
}

pub fn round_label(number: usize) -> String {
    if number <= REGULATION_HALF {
        return format!("1H-{number:02}");
    }
    if number <= REGULATION_HALF * 2 {
        return format!("2H-{number:02}");
    }
    let ot_idx = number - REGULATION_HALF * 2;
    let ot_set = (ot_idx - 1) / OT_SET_ROUNDS + 1;
    let ot_round = (ot_idx - 1) % OT_SET_ROUNDS + 1;
    format!("OT{ot_set}-R{ot_round}")
}

/// Wins per round number by side, from `round_end` events that carry an
/// integer `round` and a `winner` of 2 (T) or 3 (CT).
pub fn build_scoreboard(events: &[Value]) -> BTreeMap<i64, RoundScore> {
    let mut board: BTreeMap<i64, RoundScore> = BTreeMap::new();
    for ev in events.iter().filter_map(EventView::new) {
        if !type_matches(&ev.etype(), "round_end") {
            continue;
        }
        let Some(round) = ev.round() else { continue };
        let winner = ev.detail("winner").and_then(as_i64_any);
        match winner {
            Some(TEAM_T) => board.entry(round).or_default().t_wins += 1,
            Some(TEAM_CT) => board.entry(round).or_default().ct_wins += 1,
            _ => {}
        }
    }
    board
}

pub fn summarize_rounds(events: &[Value]) -> RoundSummary {
    let mut rounds = BTreeSet::new();
    let mut team_wins: BTreeMap<String, u32> = BTreeMap::new();
    for ev in events.iter().filter_map(EventView::new) {
        if let Some(round) = ev.round() {
            rounds.insert(round);
        }
        if type_matches(&ev.etype(), "round_end")
            && let Some(team) = ev.detail_str("winningTeam").filter(|t| !t.is_empty())
        {
            *team_wins.entry(team).or_insert(0) += 1;
        }
    }
    RoundSummary {
        total_rounds: rounds.len(),
        team_wins,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{build_round_metadata, build_scoreboard, round_label};

    #[test]
    fn labels_cover_halves_and_overtime() {
        assert_eq!(round_label(1), "1H-01");
        assert_eq!(round_label(13), "2H-13");
        assert_eq!(round_label(25), "OT1-R1");
        assert_eq!(round_label(30), "OT1-R6");
        assert_eq!(round_label(31), "OT2-R1");
    }

    #[test]
    fn knife_round_gets_index_zero() {
        let events = vec![
            json!({"type": "round_start", "tick": 10}),
            json!({"type": "weapon_fire", "tick": 12, "weapon": "weapon_knife_t"}),
            json!({"type": "events.RoundStart", "tick": 100}),
            json!({"type": "weapon_fire", "tick": 120, "weapon": "ak47"}),
            json!({"type": "round_start", "tick": 100}),
        ];
        let meta = build_round_metadata(&events);
        assert_eq!(meta.indices, vec![0, 2]);
        assert_eq!(meta.labels[0], "Knife Round (pre-match)");
        assert_eq!(meta.labels[1], "1H-02");
    }

    #[test]
    fn bayonet_only_first_round_is_knife() {
        let events = vec![
            json!({"type": "round_start", "tick": 1}),
            json!({"type": "weapon_fire", "tick": 5, "weapon": "weapon_bayonet"}),
            json!({"type": "round_start", "tick": 50}),
        ];
        let meta = build_round_metadata(&events);
        assert_eq!(meta.indices, vec![0, 2]);
        assert_eq!(meta.labels[0], "Knife Round (pre-match)");
    }

    #[test]
    fn gunfire_in_first_round_is_regular() {
        let events = vec![
            json!({"type": "round_start", "tick": 1}),
            json!({"type": "weapon_fire", "tick": 5, "details": {"weapon": "glock"}}),
        ];
        let meta = build_round_metadata(&events);
        assert_eq!(meta.indices, vec![1]);
        assert_eq!(meta.labels, vec!["1H-01".to_string()]);
    }

    #[test]
    fn scoreboard_ignores_unknown_winners() {
        let events = vec![
            json!({"type": "round_end", "round": 1, "winner": 2}),
            json!({"type": "round_end", "round": 2, "winner": 3}),
            json!({"type": "round_end", "round": 3, "winner": 1}),
            json!({"type": "round_end", "winner": 3}),
        ];
        let board = build_scoreboard(&events);
        assert_eq!(board.len(), 2);
        assert_eq!(board[&1].t_wins, 1);
        assert_eq!(board[&2].ct_wins, 1);
    }
}
