use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::report::MatchReport;

pub struct ExportSummary {
    pub basic_rows: usize,
    pub damage_rows: usize,
    pub round_rows: usize,
    pub chat_rows: usize,
    pub scout_rows: usize,
}

/// Pretty JSON, written to a sibling temp file and swapped into place.
pub fn write_json_report(path: &Path, report: &MatchReport) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(report).context("serialize match report")?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    info!(path = %path.display(), "json report written");
    Ok(())
}

pub fn write_workbook(path: &Path, report: &MatchReport) -> Result<ExportSummary> {
    let mut basic_rows = vec![vec![
        "Player".to_string(),
        "Name".to_string(),
        "Kills".to_string(),
        "Deaths".to_string(),
        "ADR".to_string(),
        "HS%".to_string(),
        "Total Damage".to_string(),
    ]];
    for (player, stats) in &report.basic {
        basic_rows.push(vec![
            player.clone(),
            report.display_name(player).to_string(),
            stats.kills.to_string(),
            stats.deaths.to_string(),
            format!("{:.1}", stats.adr),
            format!("{:.1}", stats.headshot_pct),
            format!("{:.0}", stats.total_damage),
        ]);
    }

    let mut advanced_rows = vec![vec![
        "Player".to_string(),
        "Velocity".to_string(),
        "CSR".to_string(),
        "RT(s)".to_string(),
        "Head Hit Fraction".to_string(),
        "Spray D".to_string(),
        "Flicks".to_string(),
    ]];
    for (player, stats) in &report.advanced {
        advanced_rows.push(vec![
            report.display_name(player).to_string(),
            format!("{:.1}", stats.velocity_pct),
            format!("{:.2}", stats.counter_strafe_rating),
            format!("{:.3}", stats.reaction_time),
            format!("{:.2}", stats.headshot_hit_fraction),
            stats.spray_dispersion.to_string(),
            stats.flicks.to_string(),
        ]);
    }

    let mut damage_rows = vec![vec![
        "Attacker".to_string(),
        "Victim".to_string(),
        "Round".to_string(),
        "HP Dmg".to_string(),
        "Armor Dmg".to_string(),
        "Hitgroup".to_string(),
        "Weapon".to_string(),
        "Tick".to_string(),
    ]];
    for row in &report.damage_events {
        damage_rows.push(vec![
            row.attacker.clone(),
            row.victim.clone(),
            row.round.to_string(),
            format!("{:.0}", row.hp_damage),
            format!("{:.0}", row.armor_damage),
            row.hitgroup.clone(),
            row.weapon.clone(),
            row.tick.to_string(),
        ]);
    }
    damage_rows.push(Vec::new());
    damage_rows.push(vec![
        "Player".to_string(),
        "Damage".to_string(),
        "Kills".to_string(),
        "Deaths".to_string(),
    ]);
    for (player, totals) in &report.damage {
        damage_rows.push(vec![
            report.display_name(player).to_string(),
            format!("{:.0}", totals.damage),
            totals.kills.to_string(),
            totals.deaths.to_string(),
        ]);
    }

    let mut round_rows = vec![vec![
        "Index".to_string(),
        "Label".to_string(),
        "T Wins".to_string(),
        "CT Wins".to_string(),
    ]];
    for (idx, label) in report.rounds.indices.iter().zip(&report.rounds.labels) {
        let score = report
            .scoreboard
            .get(&(*idx as i64))
            .copied()
            .unwrap_or_default();
        round_rows.push(vec![
            idx.to_string(),
            label.clone(),
            score.t_wins.to_string(),
            score.ct_wins.to_string(),
        ]);
    }

    let mut chat_rows = vec![vec![
        "Tick".to_string(),
        "Mode".to_string(),
        "Sender".to_string(),
        "Message".to_string(),
    ]];
    for msg in &report.chat.messages {
        chat_rows.push(vec![
            msg.tick.to_string(),
            msg.mode.clone(),
            msg.sender.clone(),
            msg.text.clone(),
        ]);
    }

    let mut scout_rows = vec![vec![
        "Name".to_string(),
        "Team".to_string(),
        "K/D".to_string(),
        "HS Rate".to_string(),
        "Accuracy".to_string(),
        "FACEIT".to_string(),
        "Threat".to_string(),
    ]];
    for player in &report.scout.players {
        scout_rows.push(vec![
            player.name.clone(),
            player.team.clone(),
            format!("{:.2}", player.kdr),
            format!("{:.2}", player.headshot_rate),
            format!("{:.2}", player.accuracy),
            player.faceit_elo.to_string(),
            player.threat_level.as_str().to_string(),
        ]);
    }
    if !report.risk.is_empty() {
        scout_rows.push(Vec::new());
        scout_rows.push(vec![
            "Player".to_string(),
            "Persona".to_string(),
            "VAC?".to_string(),
            "GameBans".to_string(),
            "CS2Hours".to_string(),
            "CheatCom".to_string(),
            "Likelihood".to_string(),
            "Risk".to_string(),
            "Tier".to_string(),
        ]);
        for risk in &report.risk {
            scout_rows.push(vec![
                risk.player.clone(),
                risk.persona_name.clone(),
                if risk.vac_banned { "Yes" } else { "No" }.to_string(),
                risk.game_bans.to_string(),
                format!("{:.1}", risk.hours_played_cs2),
                risk.cheating_comments.to_string(),
                format!("{:.2}", risk.likelihood),
                risk.score.to_string(),
                risk.tier.as_str().to_string(),
            ]);
        }
    }

    let mut workbook = Workbook::new();
    for (name, rows) in [
        ("BasicStats", &basic_rows),
        ("AdvancedStats", &advanced_rows),
        ("Damage", &damage_rows),
        ("Rounds", &round_rows),
        ("Chat", &chat_rows),
        ("Scout", &scout_rows),
    ] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_rows(sheet, rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    info!(path = %path.display(), "workbook written");

    Ok(ExportSummary {
        basic_rows: basic_rows.len().saturating_sub(1),
        damage_rows: report.damage_events.len(),
        round_rows: round_rows.len().saturating_sub(1),
        chat_rows: chat_rows.len().saturating_sub(1),
        scout_rows: report.scout.players.len(),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
