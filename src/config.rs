use super::core::constants::{
    DEFAULT_MAX_EXTERNAL_FEE_PERCENTAGE, DEFAULT_MAX_HOPS, DEFAULT_MIN_ROUTES_TO_KEEP,
    DEFAULT_PARTITION_COUNT, DEFAULT_SPOT_PRICE_PROBE_AMOUNT,
};
use super::core::{Context, Result};
use super::error::RouterError;
use super::types::RouterConfig;
use std::collections::HashMap;
use std::path::PathBuf;

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            partition_count: DEFAULT_PARTITION_COUNT,
            min_routes_to_keep: DEFAULT_MIN_ROUTES_TO_KEEP,
            max_hops: DEFAULT_MAX_HOPS,
            hop_budget: None,
            max_external_fee_percentage: DEFAULT_MAX_EXTERNAL_FEE_PERCENTAGE,
            spot_price_probe_amount: DEFAULT_SPOT_PRICE_PROBE_AMOUNT,
            protocols: HashMap::new(),
        }
    }
}

impl RouterConfig {
    // Helper method to load from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let config: Self = confy::load_path(&path)
            .with_context(|| format!("Error loading router config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), RouterError> {
        if self.partition_count == 0 {
            return Err(RouterError::configuration("partition_count must be at least 1"));
        }
        if self.min_routes_to_keep == 0 {
            return Err(RouterError::configuration("min_routes_to_keep must be at least 1"));
        }
        if self.max_hops == 0 {
            return Err(RouterError::configuration("max_hops must be at least 1"));
        }
        if self.hop_budget == Some(0) {
            return Err(RouterError::configuration("hop_budget must be at least 1"));
        }
        if !self.max_external_fee_percentage.is_finite() || self.max_external_fee_percentage < 0.0 {
            return Err(RouterError::configuration(
                "max_external_fee_percentage must be a non-negative number",
            ));
        }
        Ok(())
    }

    pub fn hop_budget(&self) -> usize {
        self.hop_budget.unwrap_or(self.max_hops)
    }
}
