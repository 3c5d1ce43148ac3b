pub mod backend;
pub mod config;
pub mod coverart;
pub mod duplicates;
pub mod error;
pub mod musicbrainz;
pub mod normalize;
pub mod pool;
pub mod reconcile;
pub mod services;
pub mod session;
pub mod traits;

#[cfg(test)]
mod testing;

pub use backend::{BackendClient, BackendClientBuilder};
pub use config::UploadConfig;
pub use coverart::CoverArtArchive;
pub use duplicates::{DebounceTimer, DuplicateIndex};
pub use error::{Result, UploadError};
pub use musicbrainz::MusicBrainzProvider;
pub use pool::{AnalysisBatch, UploadWorkerPool};
pub use services::{Services, ServicesBuilder};
pub use session::{AnalysisReport, CommitOutcome, Phase, TrackRow, UploadSession};
pub use traits::{
    AnalyzeBackend, CatalogSource, CommitBackend, CoverArtSource, DuplicateSource,
    MetadataProvider,
};
