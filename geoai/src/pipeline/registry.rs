//! Registry of live pipeline instances.
//!
//! At most one instance exists per distinct [`PipelineSignature`].
//! Concurrent requests for a signature that is still initialising wait for
//! that initialisation instead of starting their own. A failed
//! initialisation is not cached, so a later request retries it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, info};

use crate::config::GeoAiConfig;
use crate::error::GeoAiError;
use crate::inference::{InferenceError, ModelLoader, TaskCatalog};
use crate::provider::{AsyncHttpClient, AsyncReqwestClient, ProviderFactory};
use crate::tile::TilePlanner;

use super::{PipelineInstance, PipelineSignature, WeightCache};

/// Registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Calls to [`PipelineRegistry::get`]
    pub requests: u64,
    /// Initialisations started, successful or not
    pub initializations: u64,
    /// Instances currently held
    pub live_instances: u64,
}

/// Keyed store of pipeline instances with single-flight initialisation.
pub struct PipelineRegistry<C = AsyncReqwestClient> {
    instances: Cache<String, Arc<PipelineInstance<C>>>,
    catalog: TaskCatalog,
    weights: Arc<WeightCache<C>>,
    loader: Arc<dyn ModelLoader>,
    client: C,
    planner: TilePlanner,
    requests: AtomicU64,
    initializations: AtomicU64,
}

impl PipelineRegistry<AsyncReqwestClient> {
    /// Builds a registry from configuration, with the built-in task
    /// catalogue and a reqwest client.
    pub fn from_config(
        config: &GeoAiConfig,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<Self, GeoAiError> {
        let client = config
            .http_client()
            .map_err(GeoAiError::ProviderInitialization)?;
        let weights = Arc::new(WeightCache::new(
            config.cache.weights_directory.clone(),
            config.cache.memory_size,
            client.clone(),
        ));
        Ok(Self::new(
            TaskCatalog::builtin(&config.models.base_url),
            weights,
            loader,
            client,
            config.tile_planner(),
        ))
    }
}

impl<C> PipelineRegistry<C>
where
    C: AsyncHttpClient + Clone + 'static,
{
    pub fn new(
        catalog: TaskCatalog,
        weights: Arc<WeightCache<C>>,
        loader: Arc<dyn ModelLoader>,
        client: C,
        planner: TilePlanner,
    ) -> Self {
        Self {
            instances: Cache::builder().build(),
            catalog,
            weights,
            loader,
            client,
            planner,
            requests: AtomicU64::new(0),
            initializations: AtomicU64::new(0),
        }
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn weights(&self) -> &WeightCache<C> {
        &self.weights
    }

    /// Returns the instance for `signature`, initialising it on first use.
    ///
    /// Deep-equal signatures always yield the same `Arc`.
    pub async fn get(
        &self,
        signature: &PipelineSignature,
    ) -> Result<Arc<PipelineInstance<C>>, GeoAiError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let key = signature.cache_key()?;
        self.instances
            .try_get_with(key, self.initialize(signature))
            .await
            .map_err(GeoAiError::from)
    }

    /// Drops the instance for `signature`, if any.
    pub async fn remove(&self, signature: &PipelineSignature) -> Result<(), GeoAiError> {
        let key = signature.cache_key()?;
        self.instances.invalidate(&key).await;
        Ok(())
    }

    /// Current counters. Pending cache maintenance runs first so that
    /// `live_instances` reflects recent inserts and removals.
    pub async fn stats(&self) -> RegistryStats {
        self.instances.run_pending_tasks().await;
        RegistryStats {
            requests: self.requests.load(Ordering::Relaxed),
            initializations: self.initializations.load(Ordering::Relaxed),
            live_instances: self.instances.entry_count(),
        }
    }

    /// Binds the provider, fetches weights and loads the model.
    async fn initialize(
        &self,
        signature: &PipelineSignature,
    ) -> Result<Arc<PipelineInstance<C>>, GeoAiError> {
        self.initializations.fetch_add(1, Ordering::Relaxed);
        info!(
            model = %signature.model_id,
            provider = signature.provider.name(),
            "Initializing pipeline"
        );

        let spec = self.catalog.get(&signature.model_id)?.clone();
        let provider =
            ProviderFactory::create(&signature.provider).map_err(GeoAiError::ProviderInitialization)?;

        let weights = self.weights.get_weights(&spec.weights_url).await?;
        debug!(model = %spec.model_id, bytes = weights.len(), "Model weights ready");

        let session = self
            .loader
            .load(&spec, &signature.model_params, weights)
            .await
            .map_err(|e| match e {
                InferenceError::ModelLoad(_) => e,
                other => InferenceError::ModelLoad(other.to_string()),
            })?;

        Ok(Arc::new(PipelineInstance::new(
            signature.clone(),
            provider,
            spec,
            session,
            self.client.clone(),
            self.planner,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::inference::DEFAULT_MODELS_BASE_URL;
    use crate::pipeline::testing::CountingLoader;
    use crate::provider::{MockAsyncHttpClient, ProviderConfig};
    use tempfile::TempDir;

    fn registry(
        dir: &TempDir,
        loader: Arc<CountingLoader>,
    ) -> PipelineRegistry<MockAsyncHttpClient> {
        let client = MockAsyncHttpClient::returning(vec![0xAB; 16]);
        let weights = Arc::new(WeightCache::new(dir.path(), 1 << 20, client.clone()));
        PipelineRegistry::new(
            TaskCatalog::builtin(DEFAULT_MODELS_BASE_URL),
            weights,
            loader,
            client,
            TilePlanner::default(),
        )
    }

    fn mapbox(style: &str) -> PipelineSignature {
        PipelineSignature::new(
            ProviderConfig::Mapbox {
                api_key: "pk.test".to_string(),
                style: style.to_string(),
            },
            "building-footprint-segmentation",
        )
    }

    #[tokio::test]
    async fn test_equal_signatures_share_instance() {
        let dir = TempDir::new().unwrap();
        let loader = Arc::new(CountingLoader::new(Vec::new()));
        let registry = registry(&dir, loader.clone());

        let a = registry.get(&mapbox("mapbox/satellite-v9")).await.unwrap();
        let b = registry.get(&mapbox("mapbox/satellite-v9")).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loader.loads(), 1);
        let stats = registry.stats().await;
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.initializations, 1);
    }

    #[tokio::test]
    async fn test_nested_field_difference_gives_new_instance() {
        let dir = TempDir::new().unwrap();
        let loader = Arc::new(CountingLoader::new(Vec::new()));
        let registry = registry(&dir, loader.clone());

        let a = registry.get(&mapbox("mapbox/satellite-v9")).await.unwrap();
        let b = registry.get(&mapbox("mapbox/satellite-streets-v12")).await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(loader.loads(), 2);
        // Same model, so the weights were downloaded once
        assert_eq!(registry.weights().downloads(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_gets_initialize_once() {
        let dir = TempDir::new().unwrap();
        let loader = Arc::new(CountingLoader::new(Vec::new()));
        let registry = registry(&dir, loader.clone());
        let signature = mapbox("mapbox/satellite-v9");

        let instances =
            futures::future::join_all((0..8).map(|_| registry.get(&signature))).await;

        let first = instances[0].as_ref().unwrap();
        for instance in &instances {
            assert!(Arc::ptr_eq(first, instance.as_ref().unwrap()));
        }
        assert_eq!(loader.loads(), 1);
        assert_eq!(registry.stats().await.initializations, 1);
    }

    #[tokio::test]
    async fn test_unknown_model_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir, Arc::new(CountingLoader::new(Vec::new())));
        let signature = PipelineSignature::new(ProviderConfig::esri_world_imagery(), "no-such-model");

        let err = registry.get(&signature).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnknownTask);
        assert!(registry.get(&signature).await.is_err());
        assert_eq!(registry.stats().await.initializations, 2);
    }

    #[tokio::test]
    async fn test_invalid_provider_config() {
        let dir = TempDir::new().unwrap();
        let loader = Arc::new(CountingLoader::new(Vec::new()));
        let registry = registry(&dir, loader.clone());
        let signature = PipelineSignature::new(
            ProviderConfig::Mapbox {
                api_key: String::new(),
                style: "mapbox/satellite-v9".to_string(),
            },
            "object-detection",
        );

        let err = registry.get(&signature).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ProviderInitialization);
        assert_eq!(loader.loads(), 0);
    }

    #[tokio::test]
    async fn test_loader_failure_is_model_initialization() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir, Arc::new(CountingLoader::failing()));

        let err = registry.get(&mapbox("mapbox/satellite-v9")).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ModelInitialization);
    }

    #[tokio::test]
    async fn test_remove_forces_reinitialization() {
        let dir = TempDir::new().unwrap();
        let loader = Arc::new(CountingLoader::new(Vec::new()));
        let registry = registry(&dir, loader.clone());
        let signature = mapbox("mapbox/satellite-v9");

        let a = registry.get(&signature).await.unwrap();
        registry.remove(&signature).await.unwrap();
        let b = registry.get(&signature).await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(loader.loads(), 2);
    }

    #[tokio::test]
    async fn test_live_instances_tracks_inserts_and_removals() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir, Arc::new(CountingLoader::new(Vec::new())));
        let satellite = mapbox("mapbox/satellite-v9");

        registry.get(&satellite).await.unwrap();
        registry.get(&mapbox("mapbox/satellite-streets-v12")).await.unwrap();
        assert_eq!(registry.stats().await.live_instances, 2);

        registry.remove(&satellite).await.unwrap();
        assert_eq!(registry.stats().await.live_instances, 1);
    }
}
