//! Helpers turning raw backend values into display and comparison strings.

use std::path::Path;

use chrono::{Datelike, NaiveDate};

/// Formats seconds as `M:SS`. Unknown or zero durations render empty.
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s.is_finite() && s >= 1.0 => {
            let total = s.floor() as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        _ => String::new(),
    }
}

pub fn value_or_empty(value: Option<&str>) -> String {
    value.map(str::to_string).unwrap_or_default()
}

/// The only equality rule for duplicate detection: trimmed and lower-cased.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Title fallback for files whose tags carry none.
pub fn file_stem_title(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string()
}

/// Year of a release date for display; `"-"` when the date is unknown.
pub fn release_year(release_date: &str) -> String {
    let date = release_date.trim();
    if date.is_empty() || date == "-" {
        return "-".to_string();
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return parsed.year().to_string();
    }
    match date.get(..4) {
        Some(year) if year.chars().all(|c| c.is_ascii_digit()) => year.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(None), "");
        assert_eq!(format_duration(Some(0.0)), "");
        assert_eq!(format_duration(Some(5.9)), "0:05");
        assert_eq!(format_duration(Some(215.4)), "3:35");
        assert_eq!(format_duration(Some(3600.0)), "60:00");
    }

    #[test]
    fn titles_compare_trimmed_and_lowercased() {
        assert_eq!(normalize_title(" Hello"), normalize_title("hello "));
        assert_ne!(normalize_title("Héllo "), normalize_title("hello"));
    }

    #[test]
    fn file_stems() {
        assert_eq!(file_stem_title("01 - Intro.mp3"), "01 - Intro");
        assert_eq!(file_stem_title("noext"), "noext");
        assert_eq!(file_stem_title("archive.tar.mp3"), "archive.tar");
    }

    #[test]
    fn years() {
        assert_eq!(release_year(""), "-");
        assert_eq!(release_year("-"), "-");
        assert_eq!(release_year("2004-05-17"), "2004");
        assert_eq!(release_year("1999"), "1999");
        assert_eq!(release_year("someday"), "");
        assert_eq!(value_or_empty(None), "");
        assert_eq!(value_or_empty(Some("Rock")), "Rock");
    }
}
