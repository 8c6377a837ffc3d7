use chrono::NaiveDate;

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Cuts `value` to at most `max_chars` characters, appending `...` when
/// anything was dropped. Counts characters, not bytes.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &value[..byte_idx]),
        None => value.to_string(),
    }
}

/// Lowercases `value` and replaces anything outside `[a-z0-9_-]` with `-`,
/// so it can be used verbatim as a CSS class or badge key.
pub fn css_token(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.trim().chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut idx = 0usize;
    let mut value = bytes as f64;
    while value >= 1024.0 && idx < UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", format_quantity(rounded), UNITS[idx])
}

pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value:.3}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

pub fn parse_iso_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), ISO_DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD, got '{}': {e}", value.trim()))
}

pub fn or_na(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "N/A",
    }
}
