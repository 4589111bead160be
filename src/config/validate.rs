// src/config/validate.rs

use crate::config::model::{
    CONCURRENCY_CEILING, ConfigFile, PipelineConfig, PoolConfig, RawConfigFile,
};
use crate::errors::{PlandagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PlandagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.pool, raw.pipeline))
    }
}

pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_pool(&cfg.pool)?;
    validate_pipeline(&cfg.pipeline)?;
    Ok(())
}

pub fn validate_pool(pool: &PoolConfig) -> Result<()> {
    if pool.min_concurrent == 0 {
        return Err(PlandagError::ConfigError(
            "[pool].min_concurrent must be >= 1 (got 0)".to_string(),
        ));
    }

    if pool.max_concurrent < pool.min_concurrent {
        return Err(PlandagError::ConfigError(format!(
            "[pool].max_concurrent ({}) must be >= min_concurrent ({})",
            pool.max_concurrent, pool.min_concurrent
        )));
    }

    if pool.max_concurrent > CONCURRENCY_CEILING {
        return Err(PlandagError::ConfigError(format!(
            "[pool].max_concurrent ({}) exceeds the ceiling of {}",
            pool.max_concurrent, CONCURRENCY_CEILING
        )));
    }

    if pool.health_check_interval_ms == 0 {
        return Err(PlandagError::ConfigError(
            "[pool].health_check_interval_ms must be > 0".to_string(),
        ));
    }

    for (name, rate) in [
        ("error_rate_threshold", pool.error_rate_threshold),
        ("timeout_rate_threshold", pool.timeout_rate_threshold),
    ] {
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(PlandagError::ConfigError(format!(
                "[pool].{name} must be in (0.0, 1.0] (got {rate})"
            )));
        }
    }

    if pool.enable_cache && pool.cache_ttl_ms == 0 {
        return Err(PlandagError::ConfigError(
            "[pool].cache_ttl_ms must be > 0 when the cache is enabled".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_pipeline(pipeline: &PipelineConfig) -> Result<()> {
    if pipeline.enable_speculation && pipeline.speculative_cache_ttl_ms == 0 {
        return Err(PlandagError::ConfigError(
            "[pipeline].speculative_cache_ttl_ms must be > 0 when speculation is enabled"
                .to_string(),
        ));
    }

    Ok(())
}
