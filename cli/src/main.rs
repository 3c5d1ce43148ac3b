//! Command-line front end for the upload engine.
//!
//! ```text
//! tunedrop [OPTIONS] <FILES>...
//! ```
//!
//! One file is committed as a single track, several as one album. The
//! analyzed track list is printed with duplicate markers before anything is
//! committed; `--dry-run` stops there.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context};
use clap::Parser;
use shared::{
    album::{AlbumField, CoverImage, CoverRef},
    commit::SessionMode,
    upload::FileBlob,
};
use tracing::{info, warn};
use tunedrop::{
    BackendClientBuilder, CommitOutcome, CoverArtArchive, MusicBrainzProvider, ServicesBuilder,
    UploadError, UploadSession,
};

mod config;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(version, about = "Analyze audio files and commit them to the music library")]
struct Args {
    /// Audio files to upload.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[arg(long)]
    artist: Option<String>,

    #[arg(long)]
    album: Option<String>,

    #[arg(long)]
    genre: Option<String>,

    #[arg(long)]
    release_date: Option<String>,

    /// Retitle a track, `N=TITLE` with N its 1-based position in FILES.
    #[arg(long = "title", value_name = "N=TITLE", value_parser = parse_assignment)]
    titles: Vec<(usize, String)>,

    /// Renumber a track, `N=NUMBER` with N its 1-based position in FILES.
    #[arg(long = "track", value_name = "N=NUMBER", value_parser = parse_assignment)]
    track_numbers: Vec<(usize, String)>,

    /// Fill album, genre and date from the best MusicBrainz match.
    #[arg(long)]
    lookup: bool,

    /// Copy details and cover from an album already in the library.
    #[arg(long, value_name = "NAME")]
    library_album: Option<String>,

    /// Use the front cover of this MusicBrainz release.
    #[arg(long, value_name = "MBID")]
    release_id: Option<String>,

    /// Upload this image as the album cover.
    #[arg(long, value_name = "IMAGE")]
    cover: Option<PathBuf>,

    /// Print the analyzed tracks without committing.
    #[arg(long)]
    dry_run: bool,
}

fn parse_assignment(arg: &str) -> Result<(usize, String), String> {
    let (position, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected N=VALUE, got `{arg}`"))?;
    let position: usize = position
        .trim()
        .parse()
        .map_err(|e| format!("invalid position `{position}`: {e}"))?;
    if position == 0 {
        return Err("positions start at 1".to_string());
    }
    Ok((position - 1, value.to_string()))
}

fn content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "mp3" => Some("audio/mpeg"),
        "flac" => Some("audio/flac"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_files(paths: &[PathBuf]) -> anyhow::Result<Vec<FileBlob>> {
    let mut blobs = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let blob = FileBlob::new(file_name(path), bytes);
        blobs.push(match content_type(path) {
            Some(mime) => blob.with_content_type(mime),
            None => blob,
        });
    }
    Ok(blobs)
}

async fn read_cover(path: &Path) -> anyhow::Result<CoverImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read cover {}", path.display()))?;
    Ok(CoverImage {
        file_name: file_name(path),
        content_type: content_type(path).unwrap_or("image/jpeg").to_string(),
        bytes,
    })
}

/// Applies the command-line overrides in the order the page would:
/// lookups first, then explicit fields, then per-track edits.
/// Returns whether a debounced duplicate check was scheduled.
async fn apply_overrides(session: &mut UploadSession, args: &Args) -> anyhow::Result<bool> {
    if args.lookup {
        let candidates = session.search_metadata().await?;
        match candidates.first() {
            Some(best) => {
                info!("Using '{}' by '{}' from MusicBrainz", best.title, best.artist);
                session.apply_metadata_candidate(best).await?;
            }
            None => warn!("MusicBrainz found nothing to fill in"),
        }
    }

    if let Some(name) = &args.library_album {
        let albums = session.artist_albums().await?;
        let album = albums
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name.trim()))
            .with_context(|| format!("No library album named '{name}' for this artist"))?;
        session.apply_library_album(album)?;
    }

    if let Some(release_id) = &args.release_id {
        if !session.fetch_cover(release_id).await? {
            warn!("Release {} has no usable cover", release_id);
        }
    }

    let mut recheck = false;
    let fields = [
        (AlbumField::Artist, &args.artist),
        (AlbumField::Album, &args.album),
        (AlbumField::Genre, &args.genre),
        (AlbumField::ReleaseDate, &args.release_date),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            session.set_field(field, value.as_str())?;
            recheck |= field == AlbumField::Artist;
        }
    }

    if let Some(path) = &args.cover {
        session.set_cover(CoverRef::Image(read_cover(path).await?))?;
    }

    for (index, title) in &args.titles {
        session.set_track_title(*index, title.as_str())?;
        recheck |= session.mode() == Some(SessionMode::Single);
    }
    for (index, number) in &args.track_numbers {
        session.set_track_number(*index, number.as_str())?;
    }

    Ok(recheck)
}

fn print_summary(session: &UploadSession) {
    if let Some(draft) = session.draft() {
        println!("{} - {} [{}] {}", draft.artist, draft.album, draft.genre, draft.release_date);
    }
    for row in session.track_rows() {
        println!(
            "{:>3}. {}{} ({}) <- {}",
            row.track_number,
            row.title,
            if row.duplicate { " [already in library]" } else { "" },
            row.duration,
            row.file_name
        );
    }
    for failure in session.failures() {
        println!("  x {}: {}", failure.file_name, failure.reason);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let backend = Arc::new(
        BackendClientBuilder::new()
            .base_url(&config.backend_url)
            .timeout(config.timeout)
            .build()?,
    );
    if !backend.check_connection().await {
        bail!("Cannot reach the backend at {}", config.backend_url);
    }
    let services = ServicesBuilder::new()
        .backend(backend)
        .cover_art(Arc::new(CoverArtArchive::new()?))
        .metadata(Arc::new(MusicBrainzProvider::new()))
        .build()
        .map_err(anyhow::Error::msg)?;
    for (boundary, name) in services.describe() {
        info!("{}: {}", boundary, name);
    }

    let mut session = UploadSession::new(services, config.upload);
    let files = read_files(&args.files).await?;

    let report = match session.select_files(files).await {
        Ok(report) => report,
        Err(UploadError::NoTracks(failures)) => {
            for failure in &failures {
                warn!("{}: {}", failure.file_name, failure.reason);
            }
            bail!("None of the {} files could be analyzed", failures.len());
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        "Analyzed {} tracks in {:?} mode, {} failed",
        report.tracks,
        report.mode,
        report.failures.len()
    );

    if apply_overrides(&mut session, &args).await? {
        session.wait_for_duplicates().await;
    }
    print_summary(&session);

    if args.dry_run {
        return Ok(());
    }

    match session.commit().await {
        Ok(outcome @ CommitOutcome::Saved { .. }) => info!("{}", outcome.notice()),
        Ok(outcome @ CommitOutcome::PartiallySaved { .. }) => warn!("{}", outcome.notice()),
        Err(UploadError::MissingCover) => {
            bail!("A cover is required: pass --cover, --release-id or --library-album")
        }
        Err(e) => return Err(e).context("Commit failed"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments() {
        assert_eq!(parse_assignment("2=Intro"), Ok((1, "Intro".to_string())));
        assert_eq!(parse_assignment("1=a=b"), Ok((0, "a=b".to_string())));
        assert!(parse_assignment("0=x").is_err());
        assert!(parse_assignment("Intro").is_err());
    }

    #[test]
    fn arguments_parse() {
        let args = Args::try_parse_from([
            "tunedrop",
            "--artist",
            "Band",
            "--title",
            "1=First",
            "--track",
            "2=7",
            "--dry-run",
            "a.mp3",
            "b.mp3",
        ])
        .unwrap();

        assert_eq!(args.files.len(), 2);
        assert_eq!(args.titles, vec![(0, "First".to_string())]);
        assert_eq!(args.track_numbers, vec![(1, "7".to_string())]);
        assert!(args.dry_run);
        assert_eq!(content_type(Path::new("A.MP3")), Some("audio/mpeg"));
    }
}
