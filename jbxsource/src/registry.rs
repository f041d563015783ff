//! # Adapter Registry - Gestionnaire des backends de lecture
//!
//! Registre centralisé des [`SourceAdapter`] indexés par leur identifiant.
//! Il sert à résoudre l'adapter d'une track lors de la mise en file, et à
//! agréger les recherches sur tous les backends.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::adapter::SourceAdapter;
use crate::track::AudioTrack;

/// Backend identification attached to search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub name: String,
    pub display_name: String,
}

/// Tracks found on one backend
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub service: ServiceInfo,
    pub tracks: Vec<AudioTrack>,
}

/// Registre des adapters de lecture
///
/// Le registre utilise `Arc<RwLock<...>>` : il peut être cloné et partagé
/// entre le moteur de file et la couche HTTP.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Arc<RwLock<BTreeMap<String, Arc<dyn SourceAdapter>>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre un adapter ; un adapter de même ID est remplacé
    pub async fn register(&self, adapter: Arc<dyn SourceAdapter>) {
        let id = adapter.id().to_string();
        info!(
            source_id = %id,
            source_name = %adapter.display_name(),
            "Registering playback backend"
        );
        self.adapters.write().await.insert(id, adapter);
    }

    /// Résout l'adapter capable de jouer les tracks de `source_id`
    pub async fn resolve(&self, source_id: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.read().await.get(source_id).cloned()
    }

    pub async fn list(&self) -> Vec<Arc<dyn SourceAdapter>> {
        self.adapters.read().await.values().cloned().collect()
    }

    pub async fn contains(&self, source_id: &str) -> bool {
        self.adapters.read().await.contains_key(source_id)
    }

    pub async fn remove(&self, source_id: &str) -> bool {
        let removed = self.adapters.write().await.remove(source_id).is_some();
        if removed {
            info!(source_id = %source_id, "Removed playback backend");
        }
        removed
    }

    /// État d'authentification de chaque backend
    pub async fn authentications(&self) -> BTreeMap<String, bool> {
        let adapters = self.list().await;
        let states = join_all(adapters.iter().map(|a| a.is_authenticated())).await;
        adapters
            .iter()
            .zip(states)
            .map(|(a, authed)| (a.id().to_string(), authed))
            .collect()
    }

    /// Recherche `query` sur tous les backends en parallèle.
    ///
    /// Les backends non authentifiés sont omis (ce n'est pas une erreur), les
    /// autres échecs sont journalisés puis omis. Une requête vide ne contacte
    /// aucun backend.
    pub async fn search_all(&self, query: &str) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        debug!(query = %query, "Searching all backends");

        let adapters = self.list().await;
        let answers = join_all(adapters.iter().map(|a| a.search_for(query))).await;

        adapters
            .iter()
            .zip(answers)
            .filter_map(|(adapter, answer)| match answer {
                Ok(tracks) => Some(SearchResult {
                    service: ServiceInfo {
                        name: adapter.id().to_string(),
                        display_name: adapter.display_name().to_string(),
                    },
                    tracks,
                }),
                Err(e) if e.is_not_authenticated() => {
                    debug!(source_id = %adapter.id(), "Backend not authenticated, skipping search");
                    None
                }
                Err(e) => {
                    warn!(source_id = %adapter.id(), error = %e, "Search failed");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SourceError};
    use crate::source::SharedSource;

    #[derive(Debug)]
    enum Behaviour {
        Answer,
        NotAuthenticated,
        Broken,
    }

    #[derive(Debug)]
    struct TestAdapter {
        id: String,
        behaviour: Behaviour,
    }

    impl TestAdapter {
        fn new(id: &str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                behaviour,
            })
        }
    }

    #[async_trait::async_trait]
    impl SourceAdapter for TestAdapter {
        fn id(&self) -> &str {
            &self.id
        }

        fn display_name(&self) -> &str {
            "Test"
        }

        fn create_audio_source(&self, _track: AudioTrack) -> Result<SharedSource> {
            Err(SourceError::backend("playback unavailable"))
        }

        async fn search_for(&self, query: &str) -> Result<Vec<AudioTrack>> {
            match self.behaviour {
                Behaviour::Answer => Ok(vec![AudioTrack::youtube(query, query, &self.id)]),
                Behaviour::NotAuthenticated => Err(SourceError::NotAuthenticated),
                Behaviour::Broken => Err(SourceError::backend("boom")),
            }
        }

        async fn is_authenticated(&self) -> bool {
            !matches!(self.behaviour, Behaviour::NotAuthenticated)
        }
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = AdapterRegistry::new();
        registry.register(TestAdapter::new("youtube", Behaviour::Answer)).await;

        assert!(registry.contains("youtube").await);
        assert_eq!(registry.resolve("youtube").await.unwrap().id(), "youtube");
        assert!(registry.resolve("spotify").await.is_none());
    }

    #[tokio::test]
    async fn test_replace_and_remove() {
        let registry = AdapterRegistry::new();
        registry.register(TestAdapter::new("youtube", Behaviour::Answer)).await;
        registry.register(TestAdapter::new("youtube", Behaviour::Broken)).await;
        assert_eq!(registry.list().await.len(), 1);

        assert!(registry.remove("youtube").await);
        assert!(!registry.remove("youtube").await);
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_search_all_omits_unauthenticated_and_failures() {
        let registry = AdapterRegistry::new();
        registry.register(TestAdapter::new("a", Behaviour::Answer)).await;
        registry.register(TestAdapter::new("b", Behaviour::NotAuthenticated)).await;
        registry.register(TestAdapter::new("c", Behaviour::Broken)).await;

        let results = registry.search_all("lofi").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].service.name, "a");
        assert_eq!(results[0].tracks[0].name, "lofi");
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let registry = AdapterRegistry::new();
        registry.register(TestAdapter::new("a", Behaviour::Answer)).await;
        assert!(registry.search_all("   ").await.is_empty());
    }

    #[tokio::test]
    async fn test_authentications() {
        let registry = AdapterRegistry::new();
        registry.register(TestAdapter::new("a", Behaviour::Answer)).await;
        registry.register(TestAdapter::new("b", Behaviour::NotAuthenticated)).await;

        let auths = registry.authentications().await;
        assert_eq!(auths.get("a"), Some(&true));
        assert_eq!(auths.get("b"), Some(&false));
    }
}
