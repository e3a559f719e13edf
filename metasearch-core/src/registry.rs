//! Provider registry: the fixed catalog of providers for a process.
//!
//! Built once at startup and read-only afterwards. Providers are kept in
//! display-name order, which is also the order the coordinator launches
//! lookups in.

use std::sync::Arc;

use crate::error::SearchError;
use crate::provider::SearchProvider;
use crate::types::ProviderDescriptor;

/// Read-only catalog of registered providers.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl ProviderRegistry {
    /// Start building a registry.
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Descriptors ordered by display name.
    pub fn list(&self) -> Vec<&ProviderDescriptor> {
        self.providers.iter().map(|p| p.descriptor()).collect()
    }

    /// Look up a provider by id.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::UnknownProvider`] if no provider has this id.
    pub fn get(&self, id: &str) -> Result<Arc<dyn SearchProvider>, SearchError> {
        self.providers
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| SearchError::UnknownProvider(id.to_owned()))
    }

    /// Look up a provider's descriptor by id.
    pub fn descriptor(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.providers
            .iter()
            .map(|p| p.descriptor())
            .find(|d| d.id == id)
    }

    /// Providers in launch order.
    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn SearchProvider>> {
        self.providers.iter()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.id()))
            .finish()
    }
}

/// Collects providers before the registry is frozen.
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl ProviderRegistryBuilder {
    /// Add a provider.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::DuplicateProvider`] if the id is already taken.
    pub fn register(mut self, provider: Arc<dyn SearchProvider>) -> Result<Self, SearchError> {
        if self.providers.iter().any(|p| p.id() == provider.id()) {
            return Err(SearchError::DuplicateProvider(provider.id().to_owned()));
        }
        self.providers.push(provider);
        Ok(self)
    }

    /// Freeze the registry, ordering providers by display name.
    pub fn build(mut self) -> ProviderRegistry {
        self.providers
            .sort_by(|a, b| a.descriptor().name.cmp(&b.descriptor().name));
        ProviderRegistry {
            providers: self.providers,
        }
    }
}
