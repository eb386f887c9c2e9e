use serde_json::Value;

/// Key paths tried for a named field, in precedence order: the top-level
/// alias first, then the same key nested under `details`, then `data`.
fn field_paths(key: &str) -> [[&str; 2]; 3] {
    [[key, ""], ["details", key], ["data", key]]
}

/// Returns the first candidate path whose value is present.
///
/// A value counts as present when it exists, is not `null`, and is not a
/// blank string. Each path is a sequence of object keys walked from `record`.
pub fn lookup<'a>(record: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    lookup_with(record, paths, Some)
}

/// Like [`lookup`], but keeps walking the candidates until `convert`
/// accepts one. A present value that fails conversion does not shadow a
/// later candidate.
pub fn lookup_with<'a, T>(
    record: &'a Value,
    paths: &[&[&str]],
    mut convert: impl FnMut(&'a Value) -> Option<T>,
) -> Option<T> {
    for path in paths {
        let Some(value) = walk(record, path) else {
            continue;
        };
        if !is_present(value) {
            continue;
        }
        if let Some(out) = convert(value) {
            return Some(out);
        }
    }
    None
}

fn walk<'a>(record: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = record;
    for key in path.iter().filter(|k| !k.is_empty()) {
        cur = cur.as_object()?.get(*key)?;
    }
    Some(cur)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Read-only view over one raw event record.
#[derive(Debug, Clone, Copy)]
pub struct EventView<'a> {
    raw: &'a Value,
}

impl<'a> EventView<'a> {
    /// `None` when the record is not a JSON object.
    pub fn new(raw: &'a Value) -> Option<Self> {
        raw.is_object().then_some(Self { raw })
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    /// Lower-cased `type`, empty when absent.
    pub fn etype(&self) -> String {
        lookup_with(self.raw, &[&["type"]], |v| v.as_str())
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default()
    }

    pub fn tick(&self) -> i64 {
        lookup_with(self.raw, &[&["tick"]], as_i64_any).unwrap_or(0)
    }

    /// `round` when it is an integer, at top level or nested.
    pub fn round(&self) -> Option<i64> {
        self.field_with("round", as_i64_any)
    }

    /// The nested payload: `details`, else `data`.
    pub fn details(&self) -> Option<&'a Value> {
        ["details", "data"]
            .iter()
            .filter_map(|k| self.raw.get(*k))
            .find(|v| v.is_object())
    }

    pub fn attacker(&self) -> Option<String> {
        self.actor("attacker", "attackerSteamID")
    }

    pub fn victim(&self) -> Option<String> {
        self.actor("victim", "victimSteamID")
    }

    pub fn player(&self) -> Option<String> {
        self.actor("player", "playerSteamID")
    }

    pub fn weapon(&self) -> Option<String> {
        self.field_with("weapon", as_trimmed_string)
    }

    /// Resolves an actor id: `key` at top level, in `details`, in `data`,
    /// then the alternate key in the same three places.
    fn actor(&self, key: &str, alt: &str) -> Option<String> {
        let [a, b, c] = field_paths(key);
        let [d, e, f] = field_paths(alt);
        let paths: [&[&str]; 6] = [&a, &b, &c, &d, &e, &f];
        lookup_with(self.raw, &paths, player_id_from_value)
    }

    /// Payload field: `details.key`, then `data.key`, then top-level `key`.
    pub fn detail(&self, key: &str) -> Option<&'a Value> {
        let paths: [&[&str]; 3] = [&["details", key], &["data", key], &[key]];
        lookup(self.raw, &paths)
    }

    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        let paths: [&[&str]; 3] = [&["details", key], &["data", key], &[key]];
        lookup_with(self.raw, &paths, as_f64_any)
    }

    pub fn detail_str(&self, key: &str) -> Option<String> {
        let paths: [&[&str]; 3] = [&["details", key], &["data", key], &[key]];
        lookup_with(self.raw, &paths, as_trimmed_string)
    }

    pub fn detail_truthy(&self, key: &str) -> bool {
        self.detail(key).is_some_and(truthy)
    }

    fn field_with<T>(&self, key: &str, convert: impl FnMut(&'a Value) -> Option<T>) -> Option<T> {
        let [a, b, c] = field_paths(key);
        let paths: [&[&str]; 3] = [&a, &b, &c];
        lookup_with(self.raw, &paths, convert)
    }
}

/// Extracts a raw player identifier from a string, a number, or an object
/// carrying one of the usual steam id keys.
pub fn player_id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ["steamid", "steamId", "steamID", "steam_id64", "steamid64"]
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(|v| match v {
                Value::Object(_) => None,
                other => player_id_from_value(other),
            }),
        _ => None,
    }
}

pub fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return n.is_finite().then_some(n);
    }
    let parsed = v.as_str()?.trim().parse::<f64>().ok()?;
    parsed.is_finite().then_some(parsed)
}

pub fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(n) = v.as_f64() {
        return (n.is_finite() && n.fract() == 0.0).then_some(n as i64);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

pub fn as_trimmed_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Loose truthiness: `false`, `0`, blank strings, `"false"`/`"0"`, empty
/// containers and `null` are false.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => {
            let t = s.trim();
            !(t.is_empty() || t == "0" || t.eq_ignore_ascii_case("false"))
        }
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
