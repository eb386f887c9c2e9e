use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{EventView, player_id_from_value};
use crate::steam_id::{normalize_steam_id, parse_steam64};

static PLAYER_INFO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"XUID:0x([0-9a-fA-F]+).*?Name:\\?"([^"\\]+)\\?""#).expect("player info regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub steam64: Option<u64>,
    pub steam2: Option<String>,
}

impl PlayerEntry {
    fn from_raw(name: &str, raw_id: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            steam64: parse_steam64(raw_id),
            steam2: normalize_steam_id(raw_id),
        }
    }

    pub fn dropdown_label(&self) -> String {
        match self.steam2.as_deref() {
            Some(steam2) => format!("{} ({steam2})", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Default)]
struct RosterBuilder {
    seen: HashSet<String>,
    players: Vec<PlayerEntry>,
}

impl RosterBuilder {
    fn add(&mut self, name: Option<&str>, raw_id: Option<String>) {
        let (Some(name), Some(raw_id)) = (name, raw_id) else {
            return;
        };
        if name.trim().is_empty() || !self.seen.insert(raw_id.clone()) {
            return;
        }
        self.players.push(PlayerEntry::from_raw(name, &raw_id));
    }
}

/// Players named in the match document.
///
/// Sources, first non-empty wins: the `playerInfo` list, the `playerStats`
/// list, then `PlayerInfo`/`GenericGameEvent` strings carrying an XUID.
pub fn extract_roster(doc: &Value, events: &[Value]) -> Vec<PlayerEntry> {
    let mut builder = RosterBuilder::default();

    if let Some(list) = doc.get("playerInfo").and_then(Value::as_array) {
        for p in list {
            builder.add(
                p.get("name").and_then(Value::as_str),
                p.get("steamid").and_then(player_id_from_value),
            );
        }
    }

    if builder.players.is_empty()
        && let Some(list) = doc.get("playerStats").and_then(Value::as_array)
    {
        for p in list {
            let name = ["name", "Player"]
                .iter()
                .find_map(|k| p.get(*k).and_then(Value::as_str));
            let id = ["steamId", "steamid", "steam_id64"]
                .iter()
                .find_map(|k| p.get(*k).and_then(player_id_from_value));
            builder.add(name, id);
        }
    }

    if builder.players.is_empty() {
        for ev in events.iter().filter_map(EventView::new) {
            let etype = ev.etype();
            if !(etype.ends_with("playerinfo") || etype.ends_with("genericgameevent")) {
                continue;
            }
            let Some(raw) = ev.detail_str("string") else {
                continue;
            };
            if let Some(caps) = PLAYER_INFO_RE.captures(&raw) {
                let sid = format!("0x{}", &caps[1]);
                builder.add(Some(&caps[2]), Some(sid));
            }
        }
    }

    builder.players
}

/// Steam2 id → display name.
pub fn name_map(roster: &[PlayerEntry]) -> BTreeMap<String, String> {
    roster
        .iter()
        .filter_map(|p| p.steam2.clone().map(|s| (s, p.name.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_roster, name_map};

    #[test]
    fn player_info_list_is_preferred() {
        let doc = json!({
            "playerInfo": [
                {"steamid": "76561197960265729", "name": "alpha"},
                {"steamid": "76561197960265729", "name": "dupe"}
            ],
            "playerStats": [{"steamId": "76561197960265730", "name": "beta"}]
        });
        let roster = extract_roster(&doc, &[]);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].dropdown_label(), "alpha (STEAM_1:1:0)");
    }

    #[test]
    fn falls_back_to_xuid_strings() {
        let events = vec![json!({
            "type": "events.GenericGameEvent",
            "details": {"string": "XUID:0x110000100000002, Name:\\\"charlie\\\", team:2"}
        })];
        let roster = extract_roster(&json!({}), &events);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].name, "charlie");
        assert_eq!(roster[0].steam64, Some(76561197960265730));
        let names = name_map(&roster);
        assert_eq!(names.get("STEAM_1:0:1").map(String::as_str), Some("charlie"));
    }
}
