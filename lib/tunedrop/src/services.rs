use std::sync::Arc;

use crate::{
    AnalyzeBackend, CatalogSource, CommitBackend, CoverArtSource, DuplicateSource,
    MetadataProvider,
};

/// The external collaborators an upload session talks to.
#[derive(Clone)]
pub struct Services {
    analyzer: Arc<dyn AnalyzeBackend>,
    duplicates: Arc<dyn DuplicateSource>,
    committer: Arc<dyn CommitBackend>,
    cover_art: Option<Arc<dyn CoverArtSource>>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    catalog: Option<Arc<dyn CatalogSource>>,
}

impl Services {
    pub fn analyzer(&self) -> &Arc<dyn AnalyzeBackend> {
        &self.analyzer
    }

    pub fn duplicates(&self) -> &Arc<dyn DuplicateSource> {
        &self.duplicates
    }

    pub fn committer(&self) -> &Arc<dyn CommitBackend> {
        &self.committer
    }

    pub fn cover_art(&self) -> Option<&Arc<dyn CoverArtSource>> {
        self.cover_art.as_ref()
    }

    pub fn metadata(&self) -> Option<&Arc<dyn MetadataProvider>> {
        self.metadata.as_ref()
    }

    pub fn catalog(&self) -> Option<&Arc<dyn CatalogSource>> {
        self.catalog.as_ref()
    }

    pub fn describe(&self) -> Vec<(&'static str, &'static str)> {
        let mut out = vec![
            ("analyze", self.analyzer.name()),
            ("duplicates", self.duplicates.name()),
            ("commit", self.committer.name()),
        ];
        if let Some(c) = &self.cover_art {
            out.push(("cover-art", c.name()));
        }
        if let Some(m) = &self.metadata {
            out.push(("metadata", m.name()));
        }
        if let Some(c) = &self.catalog {
            out.push(("catalog", c.name()));
        }
        out
    }
}

#[derive(Default)]
pub struct ServicesBuilder {
    analyzer: Option<Arc<dyn AnalyzeBackend>>,
    duplicates: Option<Arc<dyn DuplicateSource>>,
    committer: Option<Arc<dyn CommitBackend>>,
    cover_art: Option<Arc<dyn CoverArtSource>>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    catalog: Option<Arc<dyn CatalogSource>>,
}

impl ServicesBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn AnalyzeBackend>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn duplicates(mut self, source: Arc<dyn DuplicateSource>) -> Self {
        self.duplicates = Some(source);
        self
    }

    pub fn committer(mut self, committer: Arc<dyn CommitBackend>) -> Self {
        self.committer = Some(committer);
        self
    }

    pub fn cover_art(mut self, source: Arc<dyn CoverArtSource>) -> Self {
        self.cover_art = Some(source);
        self
    }

    pub fn metadata(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(provider);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Registers one backend for every boundary it serves.
    pub fn backend<B>(self, backend: Arc<B>) -> Self
    where
        B: AnalyzeBackend + DuplicateSource + CommitBackend + CatalogSource + 'static,
    {
        self.analyzer(backend.clone())
            .duplicates(backend.clone())
            .committer(backend.clone())
            .catalog(backend)
    }

    pub fn build(self) -> Result<Services, &'static str> {
        let analyzer = self.analyzer.ok_or("an analyze backend is required")?;
        let duplicates = self.duplicates.ok_or("a duplicate source is required")?;
        let committer = self.committer.ok_or("a commit backend is required")?;

        Ok(Services {
            analyzer,
            duplicates,
            committer,
            cover_art: self.cover_art,
            metadata: self.metadata,
            catalog: self.catalog,
        })
    }
}
