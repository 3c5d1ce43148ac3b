use serde::{Deserialize, Serialize};

/// Input of the duplicate-query boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateQuery {
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// An artist known to the media server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryArtist {
    pub id: String,
    pub name: String,
}

/// An album already in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub genre: Option<String>,
    /// Cover art id on the media server.
    #[serde(default)]
    pub cover: Option<String>,
}

/// Catalog listings come back either as plain strings or as `{ "name": .. }` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    Name(String),
    Named {
        #[serde(default)]
        name: Option<String>,
    },
    Other(serde_json::Value),
}

impl CatalogEntry {
    pub fn name(&self) -> Option<&str> {
        match self {
            CatalogEntry::Name(name) => Some(name.as_str()),
            CatalogEntry::Named { name } => name.as_deref(),
            CatalogEntry::Other(_) => None,
        }
    }
}

/// Autocomplete lists for the album form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOptions {
    pub artists: Vec<LibraryArtist>,
    pub albums: Vec<String>,
    pub genres: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_entries_accept_mixed_shapes() {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(r#"["Rock", {"name": "Jazz"}, {"value": 3}, null]"#).unwrap();
        let names: Vec<_> = entries.iter().map(CatalogEntry::name).collect();
        assert_eq!(names, vec![Some("Rock"), Some("Jazz"), None, None]);
    }
}
