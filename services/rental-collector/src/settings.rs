//! Settings assembly: environment first, then optional YAML overrides.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use rental_ingest::{ConfigFile, GeocoderConfig, PipelineConfig};

/// Everything the collector needs for one session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub pipeline: PipelineConfig,
    /// `None` when geocoding is disabled
    pub geocoder: Option<GeocoderConfig>,
}

impl Settings {
    /// Load from the environment, overlaying `config_path` if given.
    pub fn load(config_path: Option<&Path>, geocode: bool) -> Result<Self> {
        let pipeline = PipelineConfig::from_env().context("Failed to load source settings")?;
        let geocoder = if geocode {
            Some(GeocoderConfig::from_env().context("Failed to load geocoder settings")?)
        } else {
            None
        };
        let overrides = match config_path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => None,
        };
        let settings = Self::assemble(pipeline, geocoder, overrides.as_ref())?;

        info!(
            page_size = settings.pipeline.pacing.page_size,
            max_attempts = settings.pipeline.retry.max_attempts,
            geocode = settings.geocoder.is_some(),
            "Loaded settings"
        );
        Ok(settings)
    }

    fn assemble(
        mut pipeline: PipelineConfig,
        mut geocoder: Option<GeocoderConfig>,
        overrides: Option<&ConfigFile>,
    ) -> Result<Self> {
        if let Some(file) = overrides {
            file.apply_to_pipeline(&mut pipeline);
            if let Some(geocoder) = geocoder.as_mut() {
                file.apply_to_geocoder(geocoder);
            }
        }
        pipeline.validate().context("Invalid settings")?;
        Ok(Self { pipeline, geocoder })
    }
}
