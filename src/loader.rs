use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::event::EventView;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFlags {
    pub event_count: usize,
    pub has_chat: bool,
    pub has_rounds: bool,
    pub has_player_hurt: bool,
    pub has_weapon_fire: bool,
    pub has_bullet_impact: bool,
}

impl EventFlags {
    pub fn scan(events: &[Value]) -> Self {
        let mut flags = Self {
            event_count: events.len(),
            ..Self::default()
        };
        for ev in events.iter().filter_map(EventView::new) {
            let etype = ev.etype();
            flags.has_chat |= etype.contains("chat");
            flags.has_rounds |= ev.round().is_some() || etype.contains("round");
            flags.has_player_hurt |= etype == "player_hurt" || etype.ends_with("playerhurt");
            flags.has_weapon_fire |= etype == "weapon_fire" || etype.ends_with("weaponfire");
            flags.has_bullet_impact |= etype == "bullet_impact" || etype.ends_with("bulletimpact");
        }
        flags
    }
}

/// A decoded match document with its event list split out.
#[derive(Debug, Clone)]
pub struct MatchData {
    pub source: PathBuf,
    /// The document without its event array.
    pub doc: Value,
    pub events: Vec<Value>,
    pub flags: EventFlags,
    pub loaded_at: DateTime<Utc>,
}

impl MatchData {
    pub fn from_document(source: impl Into<PathBuf>, mut doc: Value) -> Self {
        let events = take_events(&mut doc);
        let flags = EventFlags::scan(&events);
        Self {
            source: source.into(),
            doc,
            events,
            flags,
            loaded_at: Utc::now(),
        }
    }

    /// File stem of the source, used to tell matches apart in output names.
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "match".to_string())
    }
}

fn take_events(doc: &mut Value) -> Vec<Value> {
    let Some(obj) = doc.as_object_mut() else {
        warn!("match document is not an object");
        return Vec::new();
    };
    let key = if obj.contains_key("events") { "events" } else { "Events" };
    match obj.remove(key) {
        Some(Value::Array(events)) => events,
        Some(other) => {
            warn!(kind = %json_kind(&other), "event list is not an array");
            Vec::new()
        }
        None => Vec::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Loads a `.json` match export, or runs the configured parser over a
/// `.dem` and loads what it writes. Progress lines go to `on_log`.
pub fn load_match(path: &Path, config: &AppConfig, mut on_log: impl FnMut(&str)) -> Result<MatchData> {
    on_log(&format!("Loading input: {}", path.display()));
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let doc = match ext.as_str() {
        "json" => read_json_lossy(path)?,
        "dem" => {
            let parsed = run_parser(path, config, &mut on_log)?;
            on_log(&format!("Parsed demo: {}", parsed.display()));
            read_json_lossy(&parsed)?
        }
        _ => bail!("unsupported file type: {}", path.display()),
    };

    let data = MatchData::from_document(path, doc);
    info!(
        path = %path.display(),
        events = data.flags.event_count,
        "match loaded"
    );
    on_log(&format!("Loaded {} events", data.flags.event_count));
    Ok(data)
}

/// Reads JSON, replacing invalid UTF-8 rather than failing on it.
pub fn read_json_lossy(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    serde_json::from_str(&text).with_context(|| format!("parse json {}", path.display()))
}

fn run_parser(demo: &Path, config: &AppConfig, on_log: &mut impl FnMut(&str)) -> Result<PathBuf> {
    let exe = config
        .parser_exe
        .as_ref()
        .ok_or_else(|| anyhow!("CS2_PARSER_EXE is not set; cannot parse {}", demo.display()))?;
    let out_dir = &config.parser_output_dir;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("create parser output dir {}", out_dir.display()))?;

    let stem = demo
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .context("demo path has no file name")?;

    on_log(&format!(
        "Running {} -demo {} -outdir {}",
        exe.display(),
        demo.display(),
        out_dir.display()
    ));
    let mut child = Command::new(exe)
        .arg("-demo")
        .arg(demo)
        .arg("-outdir")
        .arg(out_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("spawn parser {}", exe.display()))?;

    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).context("read parser output")?;
            if read == 0 {
                break;
            }
            on_log(String::from_utf8_lossy(&buf).trim_end());
        }
    }

    let status = child.wait().context("wait for parser")?;
    if !status.success() {
        bail!("parser exited with {status}");
    }

    wait_for_output(out_dir, &stem, config.parser_wait)
        .ok_or_else(|| anyhow!("parser output for {stem} not found in {}", out_dir.display()))
}

fn wait_for_output(dir: &Path, stem: &str, wait: Duration) -> Option<PathBuf> {
    let deadline = Instant::now() + wait;
    loop {
        if let Some(found) = find_parser_output(dir, stem) {
            return Some(found);
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Known parser output names for `stem`: `{stem}_parsed.json`, then
/// `summary-{stem}.dem.json`, then any `{stem}*_parsed.json`.
pub fn find_parser_output(dir: &Path, stem: &str) -> Option<PathBuf> {
    for name in [format!("{stem}_parsed.json"), format!("summary-{stem}.dem.json")] {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    let mut hits: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(stem) && n.ends_with("_parsed.json"))
        })
        .collect();
    hits.sort();
    debug!(stem, candidates = hits.len(), "parser output scan");
    hits.into_iter().next()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{EventFlags, MatchData};

    #[test]
    fn capitalized_event_key_is_accepted() {
        let doc = json!({"Events": [{"type": "player_hurt"}, {"type": "chat_message"}], "map": "de_dust2"});
        let data = MatchData::from_document("demo.json", doc);
        assert_eq!(data.events.len(), 2);
        assert!(data.doc.get("Events").is_none());
        assert_eq!(data.doc["map"], "de_dust2");
        assert!(data.flags.has_player_hurt);
        assert!(data.flags.has_chat);
        assert!(!data.flags.has_weapon_fire);
        assert_eq!(data.stem(), "demo");
    }

    #[test]
    fn scan_detects_rounds_from_round_field() {
        let flags = EventFlags::scan(&[json!({"type": "flick", "round": 3}), json!(7)]);
        assert_eq!(flags.event_count, 2);
        assert!(flags.has_rounds);
    }
}
