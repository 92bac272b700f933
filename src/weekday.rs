//! First day of the week, as the host locale prefers it.
//!
//! Days are numbered 1 = Sunday through 7 = Saturday.

use std::process::Command;

pub const SUNDAY: u8 = 1;

/// Resolves the first weekday from the raw host preference.
///
/// Platforms without a locale preference always get Sunday, as do missing,
/// zero, out-of-range or non-numeric preferences.
pub fn resolve_first_weekday(locale_aware: bool, preference: Option<&str>) -> u8 {
    if !locale_aware {
        return SUNDAY;
    }
    preference
        .and_then(parse_preference)
        .unwrap_or(SUNDAY)
}

/// Parses the output of `defaults read -g AppleFirstWeekday`, a dictionary
/// keyed by calendar such as `{ gregorian = 2; }`. The first entry wins.
fn parse_preference(raw: &str) -> Option<u8> {
    let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    let entry = body.split(';').map(str::trim).find(|e| !e.is_empty())?;
    let (_calendar, value) = entry.split_once('=')?;
    let day: u8 = value.trim().trim_matches('"').parse().ok()?;
    (1..=7).contains(&day).then_some(day)
}

/// Reads the preference from the host.
pub fn first_weekday() -> u8 {
    if !cfg!(target_os = "macos") {
        return resolve_first_weekday(false, None);
    }

    let output = Command::new("defaults")
        .args(["read", "-g", "AppleFirstWeekday"])
        .output();
    match output {
        Ok(out) if out.status.success() => {
            let raw = String::from_utf8_lossy(&out.stdout);
            resolve_first_weekday(true, Some(&raw))
        }
        Ok(_) => resolve_first_weekday(true, None),
        Err(e) => {
            tracing::debug!(error = %e, "could not read first weekday preference");
            resolve_first_weekday(true, None)
        }
    }
}
