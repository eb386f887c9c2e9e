use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::event::EventView;
use crate::steam_id::canonical_player_key;

/// Mean velocity below this counts as counter-strafing.
pub const COUNTER_STRAFE_VELOCITY: f64 = 50.0;
const PROGRESS_STEP: usize = 1000;

const HITGROUPS: [(i64, &str); 7] = [
    (1, "head"),
    (2, "chest"),
    (3, "stomach"),
    (4, "left_arm"),
    (5, "right_arm"),
    (6, "left_leg"),
    (7, "right_leg"),
];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicStats {
    pub kills: u32,
    pub deaths: u32,
    /// Total damage / max(1, deaths). Not a true per-round figure.
    pub adr: f64,
    pub headshot_pct: f64,
    pub total_damage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedStats {
    /// Mean observed movement velocity.
    pub velocity_pct: f64,
    pub counter_strafe_rating: f64,
    pub reaction_time: f64,
    pub headshot_hit_fraction: f64,
    pub spray_dispersion: usize,
    pub flicks: u32,
}

pub type BasicStatsMap = BTreeMap<String, BasicStats>;
pub type AdvancedStatsMap = BTreeMap<String, AdvancedStats>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundStats {
    pub basic: BasicStatsMap,
    pub advanced: AdvancedStatsMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpraySample {
    pub tick: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone)]
pub struct StatsProgress {
    pub current: usize,
    pub total: usize,
    pub skipped: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PlayerTally {
    pub(crate) kills: u32,
    pub(crate) headshots: u32,
    pub(crate) deaths: u32,
    pub(crate) damage: f64,
    pub(crate) hitgroups: HashMap<String, u32>,
    pub(crate) spray: Vec<SpraySample>,
    pub(crate) velocities: Vec<f64>,
    pub(crate) reactions: Vec<f64>,
    pub(crate) flicks: u32,
    pub(crate) ticks: Vec<i64>,
}

impl PlayerTally {
    pub(crate) fn basic_stats(&self) -> BasicStats {
        let headshot_pct = if self.kills > 0 {
            100.0 * f64::from(self.headshots) / f64::from(self.kills)
        } else {
            0.0
        };
        BasicStats {
            kills: self.kills,
            deaths: self.deaths,
            adr: self.damage / f64::from(self.deaths.max(1)),
            headshot_pct,
            total_damage: self.damage,
        }
    }

    pub(crate) fn advanced_stats(&self) -> AdvancedStats {
        let velocity = mean(&self.velocities);
        let counter_strafe_rating = if velocity < COUNTER_STRAFE_VELOCITY {
            1.0
        } else {
            0.5
        };
        let hits: u32 = self.hitgroups.values().sum();
        let head_hits = self.hitgroups.get("head").copied().unwrap_or(0);
        let headshot_hit_fraction = if hits > 0 {
            f64::from(head_hits) / f64::from(hits)
        } else {
            0.0
        };
        AdvancedStats {
            velocity_pct: velocity,
            counter_strafe_rating,
            reaction_time: mean(&self.reactions),
            headshot_hit_fraction,
            spray_dispersion: self.spray.len(),
            flicks: self.flicks,
        }
    }
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

/// Per-player basic and advanced stats over one full pass of `events`.
pub fn compute_stats(events: &[Value]) -> (BasicStatsMap, AdvancedStatsMap) {
    compute_stats_with_progress(events, |_| {})
}

/// [`compute_stats`] with progress reported every thousand events and once
/// at the end.
pub fn compute_stats_with_progress(
    events: &[Value],
    on_progress: impl FnMut(StatsProgress),
) -> (BasicStatsMap, AdvancedStatsMap) {
    let tallies = tally_events(events.iter(), events.len(), on_progress);
    finish(tallies)
}

pub(crate) fn tally_events<'a>(
    events: impl IntoIterator<Item = &'a Value>,
    total: usize,
    mut on_progress: impl FnMut(StatsProgress),
) -> HashMap<String, PlayerTally> {
    let mut tallies: HashMap<String, PlayerTally> = HashMap::new();
    let mut skipped = 0usize;
    let mut seen = 0usize;

    for raw in events {
        seen += 1;
        match EventView::new(raw) {
            Some(ev) => apply_event(&mut tallies, &ev),
            None => skipped += 1,
        }
        if seen % PROGRESS_STEP == 0 {
            on_progress(StatsProgress {
                current: seen,
                total,
                skipped,
                message: format!("{} players tracked", tallies.len()),
            });
        }
    }

    on_progress(StatsProgress {
        current: seen,
        total,
        skipped,
        message: "Stats pass complete".to_string(),
    });
    debug!(
        events = seen,
        skipped,
        players = tallies.len(),
        "stats pass complete"
    );
    tallies
}

fn apply_event(tallies: &mut HashMap<String, PlayerTally>, ev: &EventView<'_>) {
    let etype = ev.etype();
    let tick = ev.tick();
    let attacker = ev.attacker().map(|id| canonical_player_key(&id));
    let victim = ev.victim().map(|id| canonical_player_key(&id));
    let player = ev.player().map(|id| canonical_player_key(&id));

    match etype.as_str() {
        "player_hurt" => {
            if let Some(attacker) = attacker {
                let dmg = ev
                    .detail_f64("dmg_health")
                    .filter(|d| *d >= 0.0)
                    .unwrap_or(0.0);
                let hitgroup = ev.detail("hitgroup").map(hitgroup_name).unwrap_or_default();
                let tally = tallies.entry(attacker).or_default();
                tally.damage += dmg;
                *tally.hitgroups.entry(hitgroup).or_insert(0) += 1;
            }
        }
        "player_death" => {
            if let Some(attacker) = attacker {
                let tally = tallies.entry(attacker).or_default();
                tally.kills += 1;
                if ev.detail_truthy("headshot") {
                    tally.headshots += 1;
                }
            }
            if let Some(victim) = victim {
                tallies.entry(victim).or_default().deaths += 1;
            }
        }
        "bullet_impact" => {
            if let Some(player) = player.as_ref() {
                let sample = SpraySample {
                    tick,
                    x: ev.detail_f64("x").unwrap_or(0.0),
                    y: ev.detail_f64("y").unwrap_or(0.0),
                    z: ev.detail_f64("z").unwrap_or(0.0),
                };
                tallies.entry(player.clone()).or_default().spray.push(sample);
            }
        }
        "player_movement" => {
            if let Some(player) = player.as_ref() {
                let velocity = ev.detail_f64("velocity").unwrap_or(0.0);
                tallies
                    .entry(player.clone())
                    .or_default()
                    .velocities
                    .push(velocity);
            }
        }
        "reaction" => {
            if let Some(player) = player.as_ref() {
                let reaction = ev.detail_f64("reactionTime").unwrap_or(0.0);
                tallies
                    .entry(player.clone())
                    .or_default()
                    .reactions
                    .push(reaction);
            }
        }
        "flick" => {
            if let Some(player) = player.as_ref() {
                tallies.entry(player.clone()).or_default().flicks += 1;
            }
        }
        _ => {}
    }

    if let Some(player) = player {
        tallies.entry(player).or_default().ticks.push(tick);
    }
}

/// Lower-cased hitgroup name; numeric engine codes map to body regions.
fn hitgroup_name(value: &Value) -> String {
    if let Some(code) = value.as_i64() {
        return HITGROUPS
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("group_{code}"));
    }
    value
        .as_str()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default()
}

fn finish(tallies: HashMap<String, PlayerTally>) -> (BasicStatsMap, AdvancedStatsMap) {
    let mut basic = BasicStatsMap::new();
    let mut advanced = AdvancedStatsMap::new();
    for (player, tally) in tallies {
        basic.insert(player.clone(), tally.basic_stats());
        advanced.insert(player, tally.advanced_stats());
    }
    (basic, advanced)
}

/// Events bucketed by their `round`; events without a non-negative round
/// are left out.
pub fn group_events_by_round(events: &[Value]) -> BTreeMap<i64, Vec<&Value>> {
    let mut grouped: BTreeMap<i64, Vec<&Value>> = BTreeMap::new();
    for raw in events {
        let Some(round) = EventView::new(raw).and_then(|ev| ev.round()) else {
            continue;
        };
        if round >= 0 {
            grouped.entry(round).or_default().push(raw);
        }
    }
    grouped
}

/// Runs the stats pass independently for each round.
pub fn compute_stats_by_round(events: &[Value]) -> BTreeMap<i64, RoundStats> {
    let grouped = group_events_by_round(events);
    grouped
        .par_iter()
        .map(|(round, group)| {
            let tallies = tally_events(group.iter().copied(), group.len(), |_| {});
            let (basic, advanced) = finish(tallies);
            (*round, RoundStats { basic, advanced })
        })
        .collect()
}
