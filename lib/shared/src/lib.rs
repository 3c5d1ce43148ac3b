pub mod album;
pub mod commit;
pub mod library;
pub mod musicbrainz;
pub mod upload;
