//! Field-level cleaning for loosely typed catalog rows.

use crate::emotion::Emotion;
use sha2::{Digest, Sha256};

const MISSING_MARKERS: &[&str] = &["nan", "none", "null", "n/a"];

/// Blank cells and the textual NaN markers that dataframe exports leave behind.
pub fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || MISSING_MARKERS.contains(&value.to_lowercase().as_str())
}

pub fn present(value: Option<&str>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !is_missing(v))
}

/// Genre names as a comma-joined string.
///
/// Accepts a list of `{"id": .., "name": ..}` objects or bare strings (with
/// double or single quotes), or a plain `,`/`;` separated string.
pub fn parse_genres(raw: &str) -> String {
    let raw = raw.trim();
    if is_missing(raw) {
        return String::new();
    }

    if raw.starts_with('[') && (raw.contains("name") || raw.contains("id")) {
        if let Some(names) = parse_genre_list(raw) {
            return names.join(",");
        }
    }

    raw.replace(';', ",")
        .split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_genre_list(raw: &str) -> Option<Vec<String>> {
    let items: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(_) => serde_json::from_str(&python_literal_to_json(raw)?).ok()?,
    };

    Some(
        items
            .iter()
            .filter_map(|item| match item {
                serde_json::Value::Object(map) => map
                    .get("name")
                    .and_then(|n| n.as_str())
                    .map(|n| n.trim().to_string()),
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|name| !name.is_empty())
            .collect(),
    )
}

/// Rewrites a Python list/dict literal into JSON by re-quoting its strings.
///
/// Either quote character may delimit a string, and the other one is plain
/// text inside it, so `"Children's"` and `'Sci-Fi'` both survive. Returns
/// `None` on an unterminated string.
fn python_literal_to_json(raw: &str) -> Option<String> {
    let mut json = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\'' && c != '"' {
            json.push(c);
            continue;
        }

        let delimiter = c;
        json.push('"');
        loop {
            match chars.next()? {
                ch if ch == delimiter => break,
                '\\' => match chars.next()? {
                    '\'' => json.push('\''),
                    escaped => {
                        json.push('\\');
                        json.push(escaped);
                    }
                },
                '"' => json.push_str("\\\""),
                ch => json.push(ch),
            }
        }
        json.push('"');
    }
    Some(json)
}

/// Year from `YYYY`, `YYYY-MM-DD` or a float-formatted `YYYY.0`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if is_missing(raw) {
        return None;
    }
    let candidate = raw.split('-').next().unwrap_or(raw).trim();
    let year = match candidate.parse::<i32>() {
        Ok(year) => year,
        Err(_) => {
            let value = candidate.parse::<f64>().ok()?;
            if !value.is_finite() || value.fract() != 0.0 {
                return None;
            }
            value as i32
        }
    };
    (year > 0).then_some(year)
}

pub fn parse_float(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if is_missing(raw) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whole numbers, also when exported as `1234.0`.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let value = parse_float(raw)?;
    if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

/// Stable identifier for a row.
///
/// The native (imdb) id when present, else `tmdb_<secondary id>`, else a hash
/// of the lowercased title and year so that re-importing the same file
/// updates rows instead of duplicating them.
pub fn derive_movie_id(
    native_id: Option<&str>,
    secondary_id: Option<&str>,
    title: &str,
    year: Option<i32>,
) -> String {
    if let Some(native_id) = present(native_id) {
        return native_id.to_string();
    }
    if let Some(secondary_id) = present(secondary_id) {
        let secondary_id = secondary_id.strip_suffix(".0").unwrap_or(secondary_id);
        return format!("tmdb_{}", secondary_id);
    }

    let key = format!(
        "{}|{}",
        title.trim().to_lowercase(),
        year.map(|y| y.to_string()).unwrap_or_default()
    );
    let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
    format!("hash_{}", &digest[..12])
}

/// Emotion tags mapped onto vocabulary labels, deduplicated in order.
/// Tokens that are not labels (nor aliases of one) are kept lowercased and
/// returned separately so the caller can report them.
pub fn normalize_emotion_tags(raw: &str) -> (String, Vec<String>) {
    if is_missing(raw) {
        return (String::new(), vec![]);
    }

    let mut tags: Vec<String> = Vec::new();
    let mut unknown = Vec::new();
    for token in raw.replace(';', ",").split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let tag = match token.parse::<Emotion>() {
            Ok(emotion) => emotion.as_str().to_string(),
            Err(_) => {
                let lowered = token.to_lowercase();
                unknown.push(lowered.clone());
                lowered
            }
        };
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    (tags.join(","), unknown)
}
