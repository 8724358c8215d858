/*!
 * Provider Catalog.
 *
 * Loaded once from configuration and read-only afterwards, so it is shared
 * between requests behind an `Arc` without any locking.
 */

use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use super::{BackendDescriptor, BackendFamily};
use crate::app_config::Config;
use crate::errors::ConfigurationError;

/// Registry of every known translation backend
#[derive(Debug)]
pub struct ProviderCatalog {
    /// Backends in configuration order
    backends: Vec<Arc<BackendDescriptor>>,
    /// Index into `backends` by id
    by_id: HashMap<String, usize>,
}

impl ProviderCatalog {
    /// Build a catalog; the order of `backends` is the order of family members
    pub fn new(backends: Vec<BackendDescriptor>) -> Result<Self, ConfigurationError> {
        if backends.is_empty() {
            return Err(ConfigurationError::EmptyCatalog);
        }

        let mut by_id = HashMap::with_capacity(backends.len());
        let mut stored = Vec::with_capacity(backends.len());

        for (index, backend) in backends.into_iter().enumerate() {
            if by_id.insert(backend.id.clone(), index).is_some() {
                return Err(ConfigurationError::Invalid(format!("duplicate backend id: {}", backend.id)));
            }
            debug!("Catalog entry {}: {} ({}, {:?})", index, backend.id, backend.family, backend.cost_tier);
            stored.push(Arc::new(backend.canonicalized()));
        }

        info!("Loaded provider catalog with {} backends", stored.len());

        Ok(Self { backends: stored, by_id })
    }

    /// Build the catalog from the `catalog` section of the configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        Self::new(config.catalog.clone())
    }

    /// Look a backend up by id
    pub fn describe(&self, backend_id: &str) -> Result<Arc<BackendDescriptor>, ConfigurationError> {
        self.by_id
            .get(backend_id)
            .map(|&index| Arc::clone(&self.backends[index]))
            .ok_or_else(|| ConfigurationError::UnknownBackend(backend_id.to_string()))
    }

    /// Every backend in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BackendDescriptor>> {
        self.backends.iter()
    }

    /// Members of one family in configuration order
    pub fn members(&self, family: BackendFamily) -> impl Iterator<Item = &Arc<BackendDescriptor>> {
        self.backends.iter().filter(move |backend| backend.family == family)
    }

    /// First member of a family, regardless of language coverage
    pub fn first_member(&self, family: BackendFamily) -> Option<Arc<BackendDescriptor>> {
        self.members(family).next().cloned()
    }

    /// First member of a family that covers the language pair
    pub fn representative(
        &self,
        family: BackendFamily,
        source_language: &str,
        target_language: &str,
    ) -> Option<Arc<BackendDescriptor>> {
        self.members(family)
            .find(|backend| backend.supports_pair(source_language, target_language))
            .cloned()
    }

    /// Whether any member of the family covers the language pair
    pub fn family_supports_pair(&self, family: BackendFamily, source_language: &str, target_language: &str) -> bool {
        self.representative(family, source_language, target_language).is_some()
    }

    /// First backend in configuration order; `new` guarantees there is one
    pub fn default_backend(&self) -> Arc<BackendDescriptor> {
        Arc::clone(&self.backends[0])
    }

    /// Number of backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Always false for a constructed catalog
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
