use serde::{Deserialize, Serialize};
use shared::{library::CatalogEntry, upload::FinalTrack};

// Internal structs for the raw backend responses

/// `search-duplicates` answers with a bare list or wrapped in `{ "duplicates": [..] }`.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub(crate) enum DuplicatesResponse {
    List(Vec<DuplicateEntry>),
    Wrapped {
        #[serde(default)]
        duplicates: Vec<DuplicateEntry>,
    },
}

impl DuplicatesResponse {
    pub fn into_titles(self) -> Vec<String> {
        let entries = match self {
            DuplicatesResponse::List(entries) => entries,
            DuplicatesResponse::Wrapped { duplicates } => duplicates,
        };
        entries
            .into_iter()
            .filter_map(DuplicateEntry::into_title)
            .collect()
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub(crate) enum DuplicateEntry {
    Title(String),
    Track {
        #[serde(default)]
        title: Option<String>,
    },
    Other(serde_json::Value),
}

impl DuplicateEntry {
    fn into_title(self) -> Option<String> {
        match self {
            DuplicateEntry::Title(title) => Some(title),
            DuplicateEntry::Track { title } => title,
            DuplicateEntry::Other(_) => None,
        }
    }
}

/// Catalog listings, keeping only the entries that carry a name.
pub(crate) fn entry_names(entries: Vec<CatalogEntry>) -> Vec<String> {
    entries
        .iter()
        .filter_map(|e| e.name())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// One element of the batch commit's `tracks` field.
#[derive(Serialize, Debug)]
pub(crate) struct BatchTrack<'a> {
    pub temp_file: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub track_number: u32,
}

impl<'a> From<&'a FinalTrack> for BatchTrack<'a> {
    fn from(track: &'a FinalTrack) -> Self {
        BatchTrack {
            temp_file: &track.temp_token,
            title: &track.title,
            duration: track.duration_seconds,
            track_number: track.track_number,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// `detail` is a string for handled errors and a list for validation errors.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_in_both_shapes() {
        let bare: DuplicatesResponse = serde_json::from_str(r#"["One", "Two"]"#).unwrap();
        assert_eq!(bare.into_titles(), vec!["One", "Two"]);

        let wrapped: DuplicatesResponse =
            serde_json::from_str(r#"{"duplicates": ["One", {"title": "Two"}, 3]}"#).unwrap();
        assert_eq!(wrapped.into_titles(), vec!["One", "Two"]);
    }

    #[test]
    fn error_detail() {
        let handled: ErrorBody = serde_json::from_str(r#"{"detail": "File not found"}"#).unwrap();
        assert_eq!(handled.message().as_deref(), Some("File not found"));

        let none: ErrorBody = serde_json::from_str(r#"{"other": 1}"#).unwrap();
        assert_eq!(none.message(), None);
    }
}
