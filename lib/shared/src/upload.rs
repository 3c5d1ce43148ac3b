use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A file as it was dropped by the user, before analysis.
#[derive(Clone, PartialEq)]
pub struct FileBlob {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileBlob {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl fmt::Debug for FileBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBlob")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Tags extracted server-side from one uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(
        default,
        rename = "duration",
        deserialize_with = "deserialize_seconds"
    )]
    pub duration_seconds: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_track_number")]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, rename = "cover")]
    pub cover_ref: Option<String>,
}

/// Response of the analyze-file boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedFile {
    #[serde(rename = "temp_file")]
    pub temp_token: String,
    #[serde(default)]
    pub metadata: AnalyzedMetadata,
}

/// One file's successful analysis, tagged with its position in the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackCandidate {
    pub source_index: usize,
    pub temp_token: String,
    pub title: String,
    pub duration_seconds: Option<f64>,
    pub track_number: Option<u32>,
    pub original_file_name: String,
    pub metadata: AnalyzedMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub source_index: usize,
    pub file_name: String,
    pub reason: String,
}

/// User overrides for one track. `track_number` is kept as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackEdit {
    pub source_index: usize,
    pub title: Option<String>,
    pub track_number: Option<String>,
}

impl TrackEdit {
    pub fn new(source_index: usize) -> Self {
        Self {
            source_index,
            ..Default::default()
        }
    }
}

/// A track ready for the commit boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalTrack {
    #[serde(rename = "temp_file")]
    pub temp_token: String,
    pub title: String,
    #[serde(rename = "duration")]
    pub duration_seconds: Option<f64>,
    pub track_number: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn deserialize_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(n)) if n.is_finite() && n >= 0.0 => Some(n),
        Some(NumberOrText::Text(s)) => parse_seconds(&s),
        _ => None,
    })
}

// Accepts "215", "215.4" and "3:35".
fn parse_seconds(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.split_once(':') {
        Some((mins, secs)) => {
            let mins: u32 = mins.trim().parse().ok()?;
            let secs: f64 = secs.trim().parse().ok()?;
            Some(f64::from(mins) * 60.0 + secs)
        }
        None => raw.parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0),
    }
}

fn deserialize_track_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(n)) if n >= 1.0 && n <= f64::from(u32::MAX) => Some(n as u32),
        // ID3 style "3/12"
        Some(NumberOrText::Text(s)) => s
            .split('/')
            .next()
            .and_then(|n| n.trim().parse::<u32>().ok())
            .filter(|n| *n > 0),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzed_file_reads_backend_payload() {
        let json = r#"{
            "temp_file": "8c1f_track01.mp3",
            "metadata": {
                "title": "Intro",
                "artist": "Band",
                "duration": 215.4,
                "track_number": "3/12",
                "cover": "data:image/jpeg;base64,AAAA"
            }
        }"#;
        let file: AnalyzedFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.temp_token, "8c1f_track01.mp3");
        assert_eq!(file.metadata.title.as_deref(), Some("Intro"));
        assert_eq!(file.metadata.duration_seconds, Some(215.4));
        assert_eq!(file.metadata.track_number, Some(3));
        assert!(file.metadata.album.is_none());
        assert!(file.metadata.cover_ref.is_some());
    }

    #[test]
    fn loose_numbers_are_tolerated() {
        let md: AnalyzedMetadata =
            serde_json::from_str(r#"{"duration": "3:05", "track_number": 0}"#).unwrap();
        assert_eq!(md.duration_seconds, Some(185.0));
        assert_eq!(md.track_number, None);

        let md: AnalyzedMetadata =
            serde_json::from_str(r#"{"duration": "", "track_number": null}"#).unwrap();
        assert_eq!(md.duration_seconds, None);
        assert_eq!(md.track_number, None);
    }

    #[test]
    fn final_track_uses_wire_names() {
        let track = FinalTrack {
            temp_token: "abc.mp3".into(),
            title: "Song".into(),
            duration_seconds: Some(61.0),
            track_number: 2,
        };
        let value = serde_json::to_value(&track).unwrap();
        assert_eq!(value["temp_file"], "abc.mp3");
        assert_eq!(value["duration"], 61.0);
        assert_eq!(value["track_number"], 2);
    }
}
