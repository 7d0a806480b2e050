use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::{ConfigDocument, TemplateSummary};
use crate::error::{Result, StatusError};

/// Supplies the canonical configuration text, typically the deployed
/// `mapreduce.yaml`.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<String>;
}

/// File-backed configuration source.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| {
            StatusError::InvalidConfig(format!("cannot read {}: {e}", self.path.display()))
        })
    }
}

/// Fixed in-memory configuration text, mainly for tests and embedding.
pub struct StaticSource {
    text: String,
}

impl StaticSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ConfigSource for StaticSource {
    fn load(&self) -> Result<String> {
        Ok(self.text.clone())
    }
}

/// Process-wide cache of the parsed configuration document.
///
/// Collaborators share one registry instance and call [`get_document`]
/// instead of parsing directly; [`invalidate`] forces a reparse on the next
/// access (e.g. after a deployment swaps the source text).
///
/// [`get_document`]: ConfigRegistry::get_document
/// [`invalidate`]: ConfigRegistry::invalidate
pub struct ConfigRegistry {
    source: Box<dyn ConfigSource>,
    cached: RwLock<Option<Arc<ConfigDocument>>>,
}

/// Wire shape of the list-configs endpoint: `{"configs": [...]}`.
#[derive(Debug, Serialize)]
pub struct ConfigListing {
    pub configs: Vec<TemplateSummary>,
}

impl ConfigRegistry {
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cached: RwLock::new(None),
        }
    }

    /// Returns the cached document, loading and parsing the source on first
    /// access. Concurrent first calls may each parse; the last writer wins
    /// and every later call sees a single document. Failures are never
    /// cached, so the next call retries.
    pub async fn get_document(&self) -> Result<Arc<ConfigDocument>> {
        if let Some(document) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(document));
        }

        let text = self.source.load()?;
        let document = Arc::new(ConfigDocument::parse(&text)?);
        tracing::info!(
            templates = document.templates.len(),
            "loaded mapreduce configuration"
        );
        *self.cached.write().await = Some(Arc::clone(&document));
        Ok(document)
    }

    /// Drops the cached document; the next [`get_document`] reparses.
    ///
    /// [`get_document`]: ConfigRegistry::get_document
    pub async fn invalidate(&self) {
        tracing::info!("invalidating cached mapreduce configuration");
        *self.cached.write().await = None;
    }

    /// The list-configs operation: every job template rendered for clients.
    pub async fn list_configs(&self) -> Result<ConfigListing> {
        let document = self.get_document().await?;
        Ok(ConfigListing {
            configs: document.to_summaries(),
        })
    }
}
