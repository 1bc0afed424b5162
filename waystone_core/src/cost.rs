use waystone_proto::{WarpMode, WaystoneRef};

use crate::config::CostConfig;
use crate::permissions::Requester;

/// Estimates the experience-level cost of a selection. Advisory only.
#[derive(Debug, Clone, Default)]
pub struct CostPredictor {
    config: CostConfig,
}

impl CostPredictor {
    pub fn new(config: CostConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// Free warps, unknown origins and override holders cost nothing.
    /// Otherwise the cost never decreases as the distance grows.
    pub fn predict(
        &self,
        requester: &Requester,
        target: &WaystoneRef,
        warp_mode: WarpMode,
        origin: Option<&WaystoneRef>,
    ) -> u32 {
        let mode_multiplier = match warp_mode {
            WarpMode::Free => return 0,
            WarpMode::WarpStone => self.config.warp_stone_multiplier,
            WarpMode::InventoryItem => self.config.inventory_item_multiplier,
        };
        let Some(origin) = origin else {
            return 0;
        };
        if requester.override_capability {
            return 0;
        }

        let base = if origin.dimension != target.dimension {
            self.config.dimensional_warp_cost
        } else if self.config.blocks_per_level > 0.0 {
            origin.position.distance_to(&target.position) / self.config.blocks_per_level
        } else {
            0.0
        };
        let minimum = self.config.minimum_cost.max(0.0);
        let maximum = self.config.maximum_cost.max(minimum);
        let mut cost = base.clamp(minimum, maximum) * mode_multiplier.max(0.0);
        if target.global {
            cost *= self.config.global_multiplier.max(0.0);
        }

        if cost.is_finite() && cost > 0.0 {
            cost.round() as u32
        } else {
            0
        }
    }
}
