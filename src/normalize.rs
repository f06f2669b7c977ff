use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Placeholder the portal renders for an empty field.
pub const PLACEHOLDER: &str = "-";

const CURRENCY_PREFIXES: [&str; 3] = ["rs.", "rs", "inr"];

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a listing date in `DD-MM-YYYY`, `DD/MM/YYYY` or `YYYY-MM-DD` form.
///
/// Anything after the first whitespace (a time of day) is ignored. Returns
/// `None` for the placeholder, empty input, anything that does not split into
/// exactly three numeric segments, and dates that do not exist.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER {
        return None;
    }

    let date_part = trimmed.split_whitespace().next()?;
    let parts = date_part
        .split(['-', '/'])
        .map(str::trim)
        .collect::<Vec<_>>();
    if parts.len() != 3 || parts.iter().any(|part| part.is_empty()) {
        return None;
    }
    if !parts
        .iter()
        .all(|part| part.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }

    let (year, month, day) = if parts[0].len() == 4 {
        (parts[0], parts[1], parts[2])
    } else {
        (parts[2], parts[1], parts[0])
    };

    let year = year.parse::<i32>().ok()?;
    let month = month.parse::<u32>().ok()?;
    let day = day.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parses a tender value such as `₹1,000,000` or `Rs. 12,500.50`.
pub fn parse_value(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER {
        return None;
    }

    let mut working = trimmed.to_string();
    let lowered = working.to_ascii_lowercase();
    if let Some(prefix) = CURRENCY_PREFIXES
        .iter()
        .find(|prefix| lowered.starts_with(**prefix))
    {
        working = working[prefix.len()..].to_string();
    }

    let cleaned = working
        .chars()
        .filter(|c| !matches!(c, '₹' | '$' | '€' | '£' | ','))
        .filter(|c| !c.is_whitespace())
        .collect::<String>();
    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}
