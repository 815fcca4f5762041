//! Provider registry decoupling callers from concrete optimizer engines.
//!
//! Engines register under a string id; callers resolve them by id or by
//! preference order. The default registry ships the search-tree optimizer.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use rao_core::{CoreResult, Crac, State};

use crate::results::StateOptimization;
use crate::search_tree::{ObjectiveConfig, SearchTreeConfig, SearchTreeRao};
use crate::sensitivity::{SensitivityAdapter, SensitivityConfig};
use crate::traits::{NetworkHandle, SensitivityEngine};

/// A remedial-action optimization engine for a single state.
pub trait RaoProvider: Send + Sync {
    /// Stable identifier used for registration and lookup.
    fn id(&self) -> &'static str;

    /// Optimize the remedial actions of one state.
    fn optimize(
        &self,
        network: &dyn NetworkHandle,
        crac: &Crac,
        state: State,
    ) -> CoreResult<StateOptimization>;
}

impl RaoProvider for SearchTreeRao {
    fn id(&self) -> &'static str {
        "search-tree"
    }

    fn optimize(
        &self,
        network: &dyn NetworkHandle,
        crac: &Crac,
        state: State,
    ) -> CoreResult<StateOptimization> {
        SearchTreeRao::optimize(self, network, crac, state)
    }
}

/// Registry of optimizer providers keyed by id.
#[derive(Default)]
pub struct OptimizerRegistry {
    providers: HashMap<String, Arc<dyn RaoProvider>>,
}

impl OptimizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the search-tree optimizer wired to the
    /// given sensitivity engine, under default configurations.
    pub fn with_defaults(engine: Arc<dyn SensitivityEngine>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchTreeRao::new(
            SensitivityAdapter::new(engine, SensitivityConfig::default()),
            SearchTreeConfig::default(),
            ObjectiveConfig::default(),
        )));
        registry
    }

    /// Register a provider; a provider with the same id is replaced.
    pub fn register(&mut self, provider: Arc<dyn RaoProvider>) {
        debug!(id = provider.id(), "registering optimizer provider");
        self.providers.insert(provider.id().to_string(), provider);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn RaoProvider>> {
        self.providers.get(id).cloned()
    }

    /// Registered ids, sorted for stable output.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// First registered provider among `preferences`, in order.
    pub fn select(&self, preferences: &[&str]) -> Option<Arc<dyn RaoProvider>> {
        preferences.iter().find_map(|id| self.get(id))
    }
}
