//! Target architecture configuration.
//!
//! The architecture describes the downstream execution environment: the flat
//! cost charged per tree node, an optional per-node-kind overlay, and the
//! hard ceiling a program's provable cost bound may not exceed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cost::{CostExpression, MAX_SAFE_COST_LIMIT};
use crate::fault::Fault;

/// Cost model and budget for one execution target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Architecture {
    /// Cost charged for a node kind with no overlay entry. Must be positive.
    pub default_node_cost: u64,
    /// Hard ceiling on any evaluated cost bound.
    pub cost_upper_limit: u64,
    /// Per-kind cost overrides, keyed by the node's `kind_name()` string.
    #[serde(default)]
    pub overlay: BTreeMap<String, u64>,
}

impl Architecture {
    pub fn new(default_node_cost: u64, cost_upper_limit: u64) -> Self {
        Self {
            default_node_cost,
            cost_upper_limit,
            overlay: BTreeMap::new(),
        }
    }

    pub fn with_overlay(mut self, kind: impl Into<String>, cost: u64) -> Self {
        self.overlay.insert(kind.into(), cost);
        self
    }

    /// Check the configuration. [`CostEvaluator`](crate::cost::CostEvaluator)
    /// construction runs this, so an invalid architecture is rejected before
    /// any bound is evaluated against it.
    pub fn validate(&self) -> Result<(), Fault> {
        if self.default_node_cost == 0 {
            return Err(Fault::CostNotPositive(
                "default per-node cost must be positive".to_string(),
            ));
        }
        if self.cost_upper_limit > MAX_SAFE_COST_LIMIT {
            return Err(Fault::UnsafeCostCeiling(format!(
                "cost ceiling {} exceeds the largest safely evaluable ceiling {}",
                self.cost_upper_limit, MAX_SAFE_COST_LIMIT
            )));
        }
        if let Some((kind, _)) = self.overlay.iter().find(|(_, c)| **c == 0) {
            return Err(Fault::CostNotPositive(format!(
                "overlay cost for '{kind}' must be positive"
            )));
        }
        Ok(())
    }

    /// The flat cost of one tree node of the given kind.
    pub fn node_cost(&self, kind: &str) -> CostExpression {
        match self.overlay.get(kind) {
            Some(c) => CostExpression::Fin(*c),
            None => CostExpression::ConstantFin,
        }
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Self::new(1, 1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_overrides_default() {
        let arch = Architecture::new(1, 100).with_overlay("foreach", 5);
        assert_eq!(arch.node_cost("foreach"), CostExpression::Fin(5));
        assert_eq!(arch.node_cost("call"), CostExpression::ConstantFin);
    }

    #[test]
    fn test_validate_rejects_zero_costs() {
        assert!(Architecture::new(0, 100).validate().is_err());
        assert!(Architecture::new(1, 100)
            .with_overlay("call", 0)
            .validate()
            .is_err());
        assert!(Architecture::new(1, 100).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unsafe_ceiling() {
        let err = Architecture::new(1, MAX_SAFE_COST_LIMIT + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Fault::UnsafeCostCeiling(_)));
    }

    #[test]
    fn test_config_roundtrip_from_json() {
        let arch: Architecture = serde_json::from_str(
            r#"{ "default_node_cost": 2, "cost_upper_limit": 500, "overlay": { "foreach": 4 } }"#,
        )
        .unwrap();
        assert_eq!(arch.default_node_cost, 2);
        assert_eq!(arch.node_cost("foreach"), CostExpression::Fin(4));
    }
}
