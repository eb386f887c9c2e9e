//! Conversions between Steam64, Steam2 (`STEAM_1:Y:Z`) and Steam3
//! (`[U:1:N]`) identifiers.

pub const STEAM64_BASE: u64 = 76561197960265728;

/// `Y = S mod 2`, `Z = (S - BASE - Y) / 2`.
///
/// Ids below the base produce a negative `Z`, mirroring plain integer
/// arithmetic on the raw value.
pub fn steam64_to_steam2(sid64: u64) -> String {
    let y = sid64 % 2;
    let z = (i128::from(sid64) - i128::from(STEAM64_BASE) - i128::from(y)) / 2;
    format!("STEAM_1:{y}:{z}")
}

/// Parses a decimal Steam64, or hex when prefixed with `0x`.
pub fn parse_steam64(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok();
    }
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u64>().ok()
}

pub fn steam3_to_steam2(raw: &str) -> Option<String> {
    let account = raw
        .trim()
        .strip_prefix("[U:1:")?
        .strip_suffix(']')?
        .parse::<u64>()
        .ok()?;
    Some(format!("STEAM_1:{}:{}", account % 2, account / 2))
}

fn steam2_parts(raw: &str) -> Option<(u64, u64)> {
    let rest = raw.trim().strip_prefix("STEAM_")?;
    let mut parts = rest.split(':');
    let _universe = parts.next()?;
    let y = parts.next()?.parse::<u64>().ok()?;
    let z = parts.next()?.parse::<u64>().ok()?;
    if parts.next().is_some() || y > 1 {
        return None;
    }
    Some((y, z))
}

pub fn steam2_to_steam64(raw: &str) -> Option<u64> {
    let (y, z) = steam2_parts(raw)?;
    STEAM64_BASE.checked_add(z.checked_mul(2)?)?.checked_add(y)
}

pub fn steam2_to_steam3(raw: &str) -> Option<String> {
    let (y, z) = steam2_parts(raw)?;
    Some(format!("[U:1:{}]", z * 2 + y))
}

/// Normalizes Steam64 (decimal or hex), Steam3 or Steam2 input to Steam2.
pub fn normalize_steam_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with("STEAM_") {
        return steam2_parts(trimmed).map(|_| trimmed.to_string());
    }
    if trimmed.starts_with("[U:1:") {
        return steam3_to_steam2(trimmed);
    }
    parse_steam64(trimmed).map(steam64_to_steam2)
}

/// Display key for a raw player identifier.
///
/// Decimal Steam64 values at or above the base become Steam2, Steam3 ids
/// become Steam2, and anything else (bot names, short user ids, already
/// canonical keys) is kept as given.
pub fn canonical_player_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("[U:1:")
        && let Some(steam2) = steam3_to_steam2(trimmed)
    {
        return steam2;
    }
    if trimmed.bytes().all(|b| b.is_ascii_digit())
        && let Ok(sid64) = trimmed.parse::<u64>()
        && sid64 >= STEAM64_BASE
    {
        return steam64_to_steam2(sid64);
    }
    trimmed.to_string()
}
