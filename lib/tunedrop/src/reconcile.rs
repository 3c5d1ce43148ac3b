//! Turns analyzed candidates into the shared album draft and the final,
//! ordered track list.

use std::collections::HashMap;

use itertools::Itertools;
use shared::{
    album::{AlbumDraft, CoverRef},
    upload::{FinalTrack, TrackCandidate, TrackEdit},
};

use crate::{
    error::{Result, UploadError},
    normalize::value_or_empty,
};

/// Album metadata comes from the lowest-index candidate that has an artist.
/// Without any, every field is empty and the cover is the placeholder.
pub fn build_draft(candidates: &[TrackCandidate], placeholder_cover: &str) -> AlbumDraft {
    let placeholder = || Some(CoverRef::Reference(placeholder_cover.to_string()));

    let Some(source) = candidates
        .iter()
        .filter(|c| c.metadata.artist.as_deref().is_some_and(|a| !a.trim().is_empty()))
        .min_by_key(|c| c.source_index)
    else {
        return AlbumDraft {
            cover: placeholder(),
            ..Default::default()
        };
    };

    let md = &source.metadata;
    let cover = match md.cover_ref.as_deref().map(str::trim) {
        Some(cover) if !cover.is_empty() => Some(CoverRef::Reference(cover.to_string())),
        _ => placeholder(),
    };

    AlbumDraft {
        artist: value_or_empty(md.artist.as_deref()),
        album: value_or_empty(md.album.as_deref()),
        genre: value_or_empty(md.genre.as_deref()),
        release_date: value_or_empty(md.release_date.as_deref()),
        cover,
    }
}

/// Merges each candidate with its edit, in `source_index` order.
///
/// A non-blank edited title wins over the analyzed one. A typed track number
/// is used when it is a positive integer and otherwise falls back to
/// `source_index + 1`; without an edit the analyzed number is kept, with the
/// same fallback. Conflicting numbers are passed through untouched.
pub fn apply_edits(candidates: &[TrackCandidate], edits: &[TrackEdit]) -> Result<Vec<FinalTrack>> {
    if candidates.is_empty() {
        return Err(UploadError::NoTracks(Vec::new()));
    }

    let edits: HashMap<usize, &TrackEdit> = edits.iter().map(|e| (e.source_index, e)).collect();

    let tracks = candidates
        .iter()
        .sorted_by_key(|c| c.source_index)
        .map(|candidate| {
            let edit = edits.get(&candidate.source_index);
            let fallback_number = candidate.source_index as u32 + 1;

            let title = edit
                .and_then(|e| e.title.as_deref())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(candidate.title.as_str())
                .to_string();

            let track_number = match edit.and_then(|e| e.track_number.as_deref()) {
                Some(typed) => parse_track_number(typed).unwrap_or(fallback_number),
                None => candidate
                    .track_number
                    .filter(|n| *n > 0)
                    .unwrap_or(fallback_number),
            };

            FinalTrack {
                temp_token: candidate.temp_token.clone(),
                title,
                duration_seconds: candidate.duration_seconds,
                track_number,
            }
        })
        .collect();

    Ok(tracks)
}

fn parse_track_number(typed: &str) -> Option<u32> {
    typed.trim().parse::<u32>().ok().filter(|n| *n > 0)
}
