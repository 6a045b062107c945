//! Probe registry indexed by category.

use crate::error::RegistryError;
use crate::probe::Probe;
use crate::types::Category;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable, ordered copy of a category's probes
pub type Snapshot = Arc<[Arc<dyn Probe>]>;

/// Holds every registered probe, grouped by category in registration order.
///
/// Mutations take a per-category shard lock for the duration of the
/// insert or remove only. Evaluations work from a [`Snapshot`], so no
/// lock is held while a probe runs and a probe that calls back into the
/// registry cannot deadlock.
#[derive(Default)]
pub struct Registry {
    probes: DashMap<Category, Vec<Arc<dyn Probe>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a probe to its category.
    ///
    /// Fails, leaving the registry untouched, if the name is blank or
    /// already taken within the category.
    pub fn register(&self, probe: Arc<dyn Probe>) -> Result<(), RegistryError> {
        let name = probe.name();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidName);
        }

        let category = probe.category();
        let mut entry = self.probes.entry(category).or_default();
        if entry.iter().any(|p| p.name() == name) {
            debug!(probe = name, %category, "Rejected duplicate probe");
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
                category,
            });
        }

        info!(probe = name, %category, "Registered probe");
        entry.push(probe);
        Ok(())
    }

    /// Remove a probe. Returns whether anything was removed; absence is not an error.
    pub fn unregister(&self, name: &str, category: Category) -> bool {
        let Some(mut entry) = self.probes.get_mut(&category) else {
            return false;
        };

        let before = entry.len();
        entry.retain(|p| p.name() != name);
        let removed = entry.len() != before;
        if removed {
            info!(probe = name, %category, "Unregistered probe");
        }
        removed
    }

    /// Ordered copy of the probes currently registered for `category`.
    pub fn snapshot(&self, category: Category) -> Snapshot {
        match self.probes.get(&category) {
            Some(entry) => entry.iter().cloned().collect(),
            None => Vec::new().into(),
        }
    }

    /// Names registered for `category`, in registration order
    pub fn names(&self, category: Category) -> Vec<String> {
        self.snapshot(category)
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn len(&self, category: Category) -> usize {
        self.probes.get(&category).map_or(0, |entry| entry.len())
    }

    pub fn is_empty(&self) -> bool {
        self.probes.iter().all(|entry| entry.is_empty())
    }
}
