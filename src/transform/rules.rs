//! Value functions behind the built-in transform rules.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ExoResult;
use crate::value::FieldValue;

/// Strings the archive uses for "no data". Compared case-insensitively.
pub const NULL_SENTINELS: &[&str] = &["", "null", "nan", "n/a", "-", "--"];

/// Formats tried in order when a date column has no explicit format.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Canonical form of a column name.
///
/// Lowercases, turns every character that is not alphanumeric or `_` into
/// `_`, collapses `_` runs and trims `_` from both ends. Idempotent.
pub fn canonicalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        let c = if c.is_alphanumeric() || c == '_' { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

/// Null sentinel strings become [`FieldValue::Null`].
pub fn fold_null(value: &FieldValue) -> ExoResult<FieldValue> {
    if let FieldValue::String(s) = value {
        let trimmed = s.trim();
        if NULL_SENTINELS.iter().any(|n| n.eq_ignore_ascii_case(trimmed)) {
            return Ok(FieldValue::Null);
        }
    }
    Ok(value.clone())
}

/// Numeric strings become integers or floats.
///
/// Text without `.` or an exponent marker is read as an integer (falling back
/// to a float when it overflows `i64`); anything else as a float. Text that
/// does not parse is returned unchanged.
pub fn coerce_numeric(value: &FieldValue) -> ExoResult<FieldValue> {
    let FieldValue::String(raw) = value else {
        return Ok(value.clone());
    };
    let s = raw.trim();
    if s.is_empty() {
        return Ok(value.clone());
    }

    if !s.contains(['.', 'e', 'E']) {
        if let Ok(n) = s.parse::<i64>() {
            return Ok(FieldValue::Integer(n));
        }
        let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(f) = s.parse::<f64>() {
                return Ok(FieldValue::Float(f));
            }
        }
        return Ok(value.clone());
    }

    Ok(s.parse::<f64>()
        .map(FieldValue::Float)
        .unwrap_or_else(|_| value.clone()))
}

/// Multiply numeric values by `factor`; everything else passes through.
pub fn scale(value: &FieldValue, factor: f64) -> ExoResult<FieldValue> {
    Ok(match value.as_f64() {
        Some(n) => FieldValue::Float(n * factor),
        None => value.clone(),
    })
}

/// Parse a string into a timestamp.
///
/// With `format` only that format is tried, otherwise [`DATE_FORMATS`] in
/// order. Date-only formats produce midnight. Non-strings and unmatched text
/// are returned unchanged.
pub fn parse_date(value: &FieldValue, format: Option<&str>) -> ExoResult<FieldValue> {
    let FieldValue::String(s) = value else {
        return Ok(value.clone());
    };

    let parsed = match format {
        Some(fmt) => parse_with(s, fmt),
        None => DATE_FORMATS.iter().find_map(|fmt| parse_with(s, fmt)),
    };

    Ok(parsed.map(FieldValue::Timestamp).unwrap_or_else(|| value.clone()))
}

fn parse_with(s: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, fmt).ok().or_else(|| {
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

/// Look `value` up in `mapping`.
///
/// Strings match string keys case-insensitively first; otherwise keys must be
/// equal. Unmatched values are returned unchanged.
pub fn map_category(value: &FieldValue, mapping: &[(FieldValue, FieldValue)]) -> ExoResult<FieldValue> {
    if value.is_null() {
        return Ok(FieldValue::Null);
    }

    if let FieldValue::String(s) = value {
        let needle = s.to_lowercase();
        let hit = mapping.iter().find(|(key, _)| match key {
            FieldValue::String(k) => k.to_lowercase() == needle,
            _ => false,
        });
        if let Some((_, mapped)) = hit {
            return Ok(mapped.clone());
        }
    }

    Ok(mapping
        .iter()
        .find(|(key, _)| key == value)
        .map(|(_, mapped)| mapped.clone())
        .unwrap_or_else(|| value.clone()))
}
