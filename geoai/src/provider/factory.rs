//! Provider factory for centralized provider creation.
//!
//! Pipelines describe their imagery source as a [`ProviderConfig`], which is
//! part of the pipeline signature, so the config must be hashable and
//! serialise deterministically.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::esri::EsriProvider;
use super::geobase::GeobaseProvider;
use super::mapbox::MapboxProvider;
use super::tms::TmsProvider;
use super::types::{Provider, ProviderError};

fn default_tile_size() -> u32 {
    256
}

/// Configuration for creating a provider.
///
/// Serialised with a `provider` tag:
///
/// ```
/// use geoai::provider::ProviderConfig;
///
/// let config: ProviderConfig = serde_json::from_str(
///     r#"{"provider":"mapbox","apiKey":"tok","style":"mapbox://styles/mapbox/satellite-v9"}"#,
/// ).unwrap();
/// assert_eq!(config.name(), "mapbox");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ProviderConfig {
    /// Cloud-optimised GeoTIFF served by a Geobase project.
    Geobase {
        project_ref: String,
        apikey: String,
        cog_imagery: String,
    },

    /// Mapbox style rendered as raster tiles.
    Mapbox { api_key: String, style: String },

    /// ArcGIS REST tiled map service.
    Esri {
        service_url: String,
        service_name: String,
        #[serde(default = "default_tile_size")]
        tile_size: u32,
        #[serde(default)]
        attribution: String,
    },

    /// Any XYZ tile server.
    Tms {
        base_url: String,
        extension: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

impl ProviderConfig {
    /// Esri World Imagery with default settings.
    pub fn esri_world_imagery() -> Self {
        Self::Esri {
            service_url: super::esri::DEFAULT_SERVICE_URL.to_string(),
            service_name: super::esri::DEFAULT_SERVICE_NAME.to_string(),
            tile_size: default_tile_size(),
            attribution: String::new(),
        }
    }

    /// Returns the provider name for this configuration.
    pub fn name(&self) -> &str {
        match self {
            Self::Geobase { .. } => "geobase",
            Self::Mapbox { .. } => "mapbox",
            Self::Esri { .. } => "esri",
            Self::Tms { .. } => "tms",
        }
    }
}

/// Factory for creating providers from configuration.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] when a required field is
    /// missing or malformed.
    pub fn create(config: &ProviderConfig) -> Result<Arc<dyn Provider>, ProviderError> {
        let provider: Arc<dyn Provider> = match config {
            ProviderConfig::Geobase {
                project_ref,
                apikey,
                cog_imagery,
            } => Arc::new(GeobaseProvider::new(project_ref, apikey, cog_imagery)?),
            ProviderConfig::Mapbox { api_key, style } => {
                Arc::new(MapboxProvider::new(api_key, style)?)
            }
            ProviderConfig::Esri {
                service_url,
                service_name,
                tile_size,
                attribution,
            } => Arc::new(EsriProvider::new(
                service_url,
                service_name,
                *tile_size,
                attribution,
            )?),
            ProviderConfig::Tms {
                base_url,
                extension,
                api_key,
            } => Arc::new(TmsProvider::new(base_url, extension, api_key.clone())?),
        };

        tracing::debug!(provider = provider.name(), "Created imagery provider");
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::provider::{MapSourceParams, ZoomStrategy};

    #[test]
    fn test_config_names() {
        assert_eq!(ProviderConfig::esri_world_imagery().name(), "esri");
        let tms = ProviderConfig::Tms {
            base_url: "https://t".to_string(),
            extension: "png".to_string(),
            api_key: None,
        };
        assert_eq!(tms.name(), "tms");
    }

    #[test]
    fn test_deserialize_geobase() {
        let config: ProviderConfig = serde_json::from_str(
            r#"{"provider":"geobase","projectRef":"p","apikey":"k","cogImagery":"https://c/x.tif"}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            ProviderConfig::Geobase {
                project_ref: "p".to_string(),
                apikey: "k".to_string(),
                cog_imagery: "https://c/x.tif".to_string(),
            }
        );
    }

    #[test]
    fn test_deserialize_esri_defaults() {
        let config: ProviderConfig = serde_json::from_str(
            r#"{"provider":"esri","serviceUrl":"https://s","serviceName":"World_Imagery"}"#,
        )
        .unwrap();
        match config {
            ProviderConfig::Esri {
                tile_size,
                attribution,
                ..
            } => {
                assert_eq!(tile_size, 256);
                assert!(attribution.is_empty());
            }
            other => panic!("unexpected config {:?}", other),
        }
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result: Result<ProviderConfig, _> =
            serde_json::from_str(r#"{"provider":"bing"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_each_provider() {
        let configs = [
            ProviderConfig::Geobase {
                project_ref: "p".to_string(),
                apikey: "k".to_string(),
                cog_imagery: "https://c/x.tif".to_string(),
            },
            ProviderConfig::Mapbox {
                api_key: "tok".to_string(),
                style: "mapbox/satellite-v9".to_string(),
            },
            ProviderConfig::esri_world_imagery(),
            ProviderConfig::Tms {
                base_url: "https://t".to_string(),
                extension: "png".to_string(),
                api_key: None,
            },
        ];

        for config in &configs {
            let provider = ProviderFactory::create(config).unwrap();
            assert_eq!(provider.name(), config.name());
            let url = provider.tile_url(&TileCoord::new(0, 0, 1), &MapSourceParams::default());
            assert!(url.starts_with("https://"));
        }
    }

    #[test]
    fn test_only_geobase_searches_footprint() {
        let geobase = ProviderFactory::create(&ProviderConfig::Geobase {
            project_ref: "p".to_string(),
            apikey: "k".to_string(),
            cog_imagery: "c".to_string(),
        })
        .unwrap();
        let esri = ProviderFactory::create(&ProviderConfig::esri_world_imagery()).unwrap();
        assert_eq!(geobase.zoom_strategy(), ZoomStrategy::FitFootprint);
        assert_eq!(esri.zoom_strategy(), ZoomStrategy::Fixed);
    }

    #[test]
    fn test_create_reports_invalid_config() {
        let result = ProviderFactory::create(&ProviderConfig::Mapbox {
            api_key: String::new(),
            style: "mapbox/satellite-v9".to_string(),
        });
        assert!(matches!(result, Err(ProviderError::InvalidConfig(_))));
    }
}
