//! Identity containers, including temporary ones
//!
//! Groups may require their tabs to run in a specific container. The
//! [`TEMPORARY_CONTAINER`] marker asks for a fresh container per tab,
//! removed again once no tab uses it.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::HostResult;
use crate::host::{ContainerPort, TabPort, TabQuery};
use crate::models::{Container, ContainerDetails, DEFAULT_COOKIE_STORE_ID, TEMPORARY_CONTAINER, TabId};

/// Name given to temporary containers
pub const TEMPORARY_CONTAINER_NAME: &str = "Temporary container";

/// Known containers, refreshed from the host
pub struct ContainerRegistry {
    port: Arc<dyn ContainerPort>,
    tabs: Arc<dyn TabPort>,
    known: Mutex<BTreeMap<String, Container>>,
}

impl ContainerRegistry {
    /// Creates an empty registry; call [`init`](Self::init) before use
    #[must_use]
    pub fn new(port: Arc<dyn ContainerPort>, tabs: Arc<dyn TabPort>) -> Self {
        Self {
            port,
            tabs,
            known: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Container>> {
        self.known.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads containers from the host
    ///
    /// # Errors
    ///
    /// Returns the host error if containers cannot be listed.
    pub async fn init(&self) -> HostResult<()> {
        let containers = self.port.query().await?;
        let mut known = self.lock();
        known.clear();
        for container in containers {
            known.insert(container.cookie_store_id.clone(), container);
        }
        tracing::debug!(count = known.len(), "Containers loaded");
        Ok(())
    }

    /// Default identity, or no container at all
    #[must_use]
    pub fn is_default(cookie_store_id: Option<&str>) -> bool {
        cookie_store_id.is_none_or(|id| id.is_empty() || id == DEFAULT_COOKIE_STORE_ID)
    }

    /// Temporary container or the temporary marker
    #[must_use]
    pub fn is_temporary(&self, cookie_store_id: &str) -> bool {
        cookie_store_id == TEMPORARY_CONTAINER
            || self
                .lock()
                .get(cookie_store_id)
                .is_some_and(|c| c.name == TEMPORARY_CONTAINER_NAME)
    }

    /// Looks up a container
    #[must_use]
    pub fn get(&self, cookie_store_id: &str) -> Option<Container> {
        self.lock().get(cookie_store_id).cloned()
    }

    /// All known containers by id
    #[must_use]
    pub fn get_all(&self) -> BTreeMap<String, Container> {
        self.lock().clone()
    }

    /// Maps unknown containers to the default one
    ///
    /// The temporary marker is kept as is.
    #[must_use]
    pub fn normalize(&self, cookie_store_id: Option<&str>) -> String {
        match cookie_store_id {
            Some(TEMPORARY_CONTAINER) => TEMPORARY_CONTAINER.to_string(),
            Some(id) if !Self::is_default(Some(id)) && self.lock().contains_key(id) => id.to_string(),
            _ => DEFAULT_COOKIE_STORE_ID.to_string(),
        }
    }

    /// Creates a new temporary container
    ///
    /// # Errors
    ///
    /// Returns the host error if the container cannot be created.
    pub async fn create_temporary(&self) -> HostResult<String> {
        let container = self
            .port
            .create(ContainerDetails {
                name: TEMPORARY_CONTAINER_NAME.to_string(),
                color: "toolbar".to_string(),
                icon: "chill".to_string(),
            })
            .await?;
        let id = container.cookie_store_id.clone();
        self.lock().insert(id.clone(), container);
        tracing::debug!(cookie_store_id = %id, "Temporary container created");
        Ok(id)
    }

    /// Removes a container
    ///
    /// # Errors
    ///
    /// Returns the host error if removal fails.
    pub async fn remove(&self, cookie_store_id: &str) -> HostResult<()> {
        self.lock().remove(cookie_store_id);
        self.port.remove(cookie_store_id).await
    }

    /// Removes a temporary container once no tab other than
    /// `closing_tab` uses it
    pub async fn check_temporary(&self, cookie_store_id: &str, closing_tab: Option<TabId>) {
        if !self.is_temporary(cookie_store_id) || cookie_store_id == TEMPORARY_CONTAINER {
            return;
        }

        let query = TabQuery {
            cookie_store_id: Some(cookie_store_id.to_string()),
            ..TabQuery::default()
        };
        let in_use = match self.tabs.query(query).await {
            Ok(tabs) => tabs.iter().any(|t| Some(t.id) != closing_tab),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot check temporary container usage");
                return;
            }
        };

        if !in_use && let Err(e) = self.remove(cookie_store_id).await {
            tracing::debug!(cookie_store_id, error = %e, "Temporary container already gone");
        }
    }

    /// Removes every temporary container no tab uses
    pub async fn remove_unused_temporary(&self) {
        let temporary: Vec<String> = self
            .lock()
            .values()
            .filter(|c| c.name == TEMPORARY_CONTAINER_NAME)
            .map(|c| c.cookie_store_id.clone())
            .collect();
        for id in temporary {
            self.check_temporary(&id, None).await;
        }
    }

    /// Finds or creates containers matching backup entries
    ///
    /// Returns a map from the backup's container ids to local ids. Existing
    /// containers are matched by name, color and icon.
    ///
    /// # Errors
    ///
    /// Returns the host error if a container cannot be created.
    pub async fn restore(
        &self,
        wanted: &BTreeMap<String, ContainerDetails>,
    ) -> HostResult<HashMap<String, String>> {
        let mut mapping = HashMap::new();
        for (backup_id, details) in wanted {
            let existing = self
                .lock()
                .values()
                .find(|c| c.name == details.name && c.color == details.color && c.icon == details.icon)
                .map(|c| c.cookie_store_id.clone());

            let local_id = match existing {
                Some(id) => id,
                None => {
                    let created = self.port.create(details.clone()).await?;
                    let id = created.cookie_store_id.clone();
                    self.lock().insert(id.clone(), created);
                    id
                }
            };
            mapping.insert(backup_id.clone(), local_id);
        }
        Ok(mapping)
    }
}
