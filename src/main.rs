use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use rayon::prelude::*;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use cs2_inspect::config::AppConfig;
use cs2_inspect::export::{write_json_report, write_workbook};
use cs2_inspect::loader::load_match;
use cs2_inspect::report::{MatchReport, analyze};

const USAGE: &str = "usage: cs2_inspect <file.json|file.dem>... [--json <out>] [--xlsx <out>] [--by-round]";

#[derive(Debug, Default)]
struct CliArgs {
    inputs: Vec<PathBuf>,
    json_out: Option<PathBuf>,
    xlsx_out: Option<PathBuf>,
    by_round: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1).collect())?;
    let config = AppConfig::from_env();

    let results = with_analyze_pool(config.parallelism, || {
        args.inputs
            .par_iter()
            .map(|path| {
                let data = load_match(path, &config, |line| debug!(path = %path.display(), "{line}"))?;
                Ok(analyze(&data, args.by_round))
            })
            .collect::<Vec<Result<MatchReport>>>()
    });

    let multi = args.inputs.len() > 1;
    let mut failures = 0usize;
    for (path, result) in args.inputs.iter().zip(results) {
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                error!(path = %path.display(), "{err:#}");
                failures += 1;
                continue;
            }
        };
        print_report(&report);

        if let Some(out) = args.json_out.as_deref() {
            let out = output_path(out, path, multi);
            write_json_report(&out, &report)?;
            println!("JSON: {}", out.display());
        }
        if let Some(out) = args.xlsx_out.as_deref() {
            let out = output_path(out, path, multi);
            let summary = write_workbook(&out, &report)?;
            println!(
                "Workbook: {} (players={} damage={} rounds={} chat={} scout={})",
                out.display(),
                summary.basic_rows,
                summary.damage_rows,
                summary.round_rows,
                summary.chat_rows,
                summary.scout_rows
            );
        }
    }

    if failures == args.inputs.len() {
        return Err(anyhow!("no input could be analyzed"));
    }
    Ok(())
}

/// `RUST_LOG` directives when set and valid, otherwise `info`.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn parse_args(args: Vec<String>) -> Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "-h" || arg == "--help" {
            println!("{USAGE}");
            std::process::exit(0);
        }
        if arg == "--by-round" {
            out.by_round = true;
            continue;
        }
        if let Some(path) = arg.strip_prefix("--json=") {
            out.json_out = non_empty_path(path);
            continue;
        }
        if let Some(path) = arg.strip_prefix("--xlsx=") {
            out.xlsx_out = non_empty_path(path);
            continue;
        }
        if arg == "--json" || arg == "--xlsx" {
            let next = iter
                .next()
                .and_then(|p| non_empty_path(&p))
                .ok_or_else(|| anyhow!("{arg} needs a path\n{USAGE}"))?;
            if arg == "--json" {
                out.json_out = Some(next);
            } else {
                out.xlsx_out = Some(next);
            }
            continue;
        }
        if arg.starts_with("--") {
            return Err(anyhow!("unknown flag {arg}\n{USAGE}"));
        }
        out.inputs.push(PathBuf::from(arg));
    }
    if out.inputs.is_empty() {
        return Err(anyhow!("no input files\n{USAGE}"));
    }
    Ok(out)
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// With several inputs, `out.json` becomes `out-<input stem>.json`.
fn output_path(out: &Path, input: &Path, multi: bool) -> PathBuf {
    if !multi {
        return out.to_path_buf();
    }
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let input_stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "match".to_string());
    let name = match out.extension() {
        Some(ext) => format!("{stem}-{input_stem}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{input_stem}"),
    };
    out.with_file_name(name)
}

fn with_analyze_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

fn print_report(report: &MatchReport) {
    println!("== {} ==", report.source);
    println!(
        "events={} rounds={} chat={} players={}",
        report.flags.event_count,
        report.round_summary.total_rounds,
        report.chat.messages.len(),
        report.basic.len()
    );
    println!(
        "{:<24} {:>5} {:>6} {:>8} {:>6} {:>5} {:>7} {:>6}",
        "Player", "K", "D", "ADR", "HS%", "CSR", "RT", "Flicks"
    );
    for (player, basic) in &report.basic {
        let adv = report.advanced.get(player).copied().unwrap_or_default();
        println!(
            "{:<24} {:>5} {:>6} {:>8.1} {:>6.1} {:>5.2} {:>7.3} {:>6}",
            truncate(report.display_name(player), 24),
            basic.kills,
            basic.deaths,
            basic.adr,
            basic.headshot_pct,
            adv.counter_strafe_rating,
            adv.reaction_time,
            adv.flicks
        );
    }

    if !report.rounds.labels.is_empty() {
        println!("Rounds: {}", report.rounds.labels.join(", "));
    }
    for (team, wins) in &report.round_summary.team_wins {
        println!("  {team}: {wins} rounds won");
    }

    let threats = report.scout.threat_summary;
    println!(
        "Threats: low={} medium={} high={} extreme={}",
        threats.low, threats.medium, threats.high, threats.extreme
    );
    for risk in report.risk.iter().filter(|r| r.score > 0) {
        println!(
            "  {} ({}) risk {} [{}] likelihood {:.2}",
            report.display_name(&risk.player),
            risk.player,
            risk.score,
            risk.tier.as_str(),
            risk.likelihood
        );
    }

    let team = report.chat.team_lines();
    if !team.is_empty() {
        println!("Team chat:");
        for line in team.iter().take(10) {
            println!("  {line}");
        }
    }
    println!();
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{log_filter, output_path, parse_args};

    #[test]
    fn rust_log_level_is_not_overridden() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
        assert_eq!(
            log_filter(Some("cs2_inspect=trace")).to_string(),
            "cs2_inspect=trace"
        );
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("  ")).to_string(), "info");
    }

    #[test]
    fn parses_both_flag_styles() {
        let args = parse_args(
            ["a.json", "--json=out.json", "--xlsx", "out.xlsx", "--by-round", "b.dem"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap();
        assert_eq!(args.inputs, vec![PathBuf::from("a.json"), PathBuf::from("b.dem")]);
        assert_eq!(args.json_out, Some(PathBuf::from("out.json")));
        assert_eq!(args.xlsx_out, Some(PathBuf::from("out.xlsx")));
        assert!(args.by_round);
    }

    #[test]
    fn rejects_missing_inputs_and_unknown_flags() {
        assert!(parse_args(vec!["--by-round".to_string()]).is_err());
        assert!(parse_args(vec!["a.json".to_string(), "--nope".to_string()]).is_err());
    }

    #[test]
    fn multi_file_exports_get_stem_suffix() {
        let out = output_path(Path::new("reports/out.json"), Path::new("x/dust2.dem"), true);
        assert_eq!(out, PathBuf::from("reports/out-dust2.json"));
        let single = output_path(Path::new("out.json"), Path::new("dust2.dem"), false);
        assert_eq!(single, PathBuf::from("out.json"));
    }
}
