use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::EventView;
use crate::steam_id::canonical_player_key;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageRow {
    pub attacker: String,
    pub victim: String,
    pub round: i64,
    pub hp_damage: f64,
    pub armor_damage: f64,
    pub hitgroup: String,
    pub weapon: String,
    pub tick: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageTotals {
    pub damage: f64,
    pub kills: u32,
    pub deaths: u32,
}

fn is_hurt(etype: &str) -> bool {
    etype == "player_hurt" || etype.ends_with(".playerhurt")
}

fn is_death(etype: &str) -> bool {
    etype == "player_death" || etype.ends_with(".playerdeath")
}

/// Attacker and victim keys when both resolve and differ.
fn duel(ev: &EventView<'_>) -> Option<(String, String)> {
    let attacker = canonical_player_key(&ev.attacker()?);
    let victim = canonical_player_key(&ev.victim()?);
    (attacker != victim).then_some((attacker, victim))
}

fn hp_damage(ev: &EventView<'_>) -> f64 {
    ev.detail_f64("dmg_health")
        .or_else(|| ev.detail_f64("health_damage"))
        .filter(|d| *d >= 0.0)
        .unwrap_or(0.0)
}

fn display_name(names: &BTreeMap<String, String>, key: String) -> String {
    names.get(&key).cloned().unwrap_or(key)
}

/// One row per damage event between two different players, with ids
/// replaced by roster names where known.
pub fn damage_breakdown(events: &[Value], names: &BTreeMap<String, String>) -> Vec<DamageRow> {
    events
        .iter()
        .filter_map(EventView::new)
        .filter(|ev| is_hurt(&ev.etype()))
        .filter_map(|ev| {
            let (attacker, victim) = duel(&ev)?;
            Some(DamageRow {
                attacker: display_name(names, attacker),
                victim: display_name(names, victim),
                round: ev.round().unwrap_or(-1),
                hp_damage: hp_damage(&ev),
                armor_damage: ev
                    .detail_f64("dmg_armor")
                    .or_else(|| ev.detail_f64("armor_damage"))
                    .unwrap_or(0.0),
                hitgroup: ev.detail_str("hitgroup").unwrap_or_else(|| "UNK".to_string()),
                weapon: ev.weapon().unwrap_or_else(|| "UNK".to_string()),
                tick: ev.tick(),
            })
        })
        .collect()
}

/// Damage dealt, kills and deaths per player. Self-damage and suicides are
/// not counted.
pub fn damage_summary(events: &[Value]) -> BTreeMap<String, DamageTotals> {
    let mut totals: BTreeMap<String, DamageTotals> = BTreeMap::new();
    for ev in events.iter().filter_map(EventView::new) {
        let etype = ev.etype();
        if is_hurt(&etype) {
            if let Some((attacker, _)) = duel(&ev) {
                totals.entry(attacker).or_default().damage += hp_damage(&ev);
            }
        } else if is_death(&etype)
            && let Some((attacker, victim)) = duel(&ev)
        {
            totals.entry(attacker).or_default().kills += 1;
            totals.entry(victim).or_default().deaths += 1;
        }
    }
    totals
}
