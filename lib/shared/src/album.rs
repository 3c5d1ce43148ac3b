use std::fmt;

use serde::{Deserialize, Serialize};

/// Cover image bytes, either picked by the user or fetched from a cover-art service.
#[derive(Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for CoverImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoverImage")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverRef {
    /// A cover the backend already knows about (embedded art, library cover URL,
    /// or the placeholder image). Nothing is uploaded for it.
    Reference(String),
    /// A replacement cover that is sent along with the commit.
    Image(CoverImage),
}

impl CoverRef {
    pub fn is_placeholder(&self, placeholder: &str) -> bool {
        match self {
            CoverRef::Reference(r) => {
                let placeholder = placeholder.trim();
                r.trim().is_empty() || (!placeholder.is_empty() && r.contains(placeholder))
            }
            CoverRef::Image(image) => image.bytes.is_empty(),
        }
    }

    pub fn image(&self) -> Option<&CoverImage> {
        match self {
            CoverRef::Image(image) => Some(image),
            CoverRef::Reference(_) => None,
        }
    }
}

/// Album-level metadata shared by every track of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumDraft {
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub release_date: String,
    pub cover: Option<CoverRef>,
}

impl AlbumDraft {
    pub fn has_usable_cover(&self, placeholder: &str) -> bool {
        self.cover
            .as_ref()
            .is_some_and(|cover| !cover.is_placeholder(placeholder))
    }
}

/// The album fields a user can edit directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlbumField {
    Artist,
    Album,
    Genre,
    ReleaseDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACEHOLDER: &str = "/static/img/default.png";

    #[test]
    fn cover_gate() {
        let mut draft = AlbumDraft::default();
        assert!(!draft.has_usable_cover(PLACEHOLDER));

        draft.cover = Some(CoverRef::Reference(PLACEHOLDER.to_string()));
        assert!(!draft.has_usable_cover(PLACEHOLDER));

        draft.cover = Some(CoverRef::Reference(format!("http://host{PLACEHOLDER}")));
        assert!(!draft.has_usable_cover(PLACEHOLDER));

        draft.cover = Some(CoverRef::Reference("/api/albums/cover/al-1?size=150".into()));
        assert!(draft.has_usable_cover(PLACEHOLDER));

        draft.cover = Some(CoverRef::Image(CoverImage {
            file_name: "cover.jpg".into(),
            content_type: "image/jpeg".into(),
            bytes: vec![0xff, 0xd8],
        }));
        assert!(draft.has_usable_cover(PLACEHOLDER));
    }

    #[test]
    fn blank_placeholder_matches_only_blank_references() {
        let cover = CoverRef::Reference("/api/albums/cover/al-1?size=150".into());
        assert!(!cover.is_placeholder(""));
        assert!(!cover.is_placeholder("  "));
        assert!(CoverRef::Reference(" ".into()).is_placeholder(""));
    }
}
