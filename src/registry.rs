// src/registry.rs

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::quantity::QuantityId;

/// Name -> quantity lookup, filled once at construction.
///
/// `B_ext` is deliberately absent: it only exists as a pipeline stage.
#[derive(Debug, Clone)]
pub struct Registry {
    by_name: HashMap<&'static str, QuantityId>,
    order: Vec<QuantityId>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let order: Vec<QuantityId> = QuantityId::ALL
            .iter()
            .copied()
            .filter(|&id| id != QuantityId::BExt)
            .collect();
        let by_name = order.iter().map(|&id| (id.name(), id)).collect();
        Self { by_name, order }
    }

    pub fn get(&self, name: &str) -> Result<QuantityId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownQuantity(name.to_string()))
    }

    /// Registered names in pipeline order.
    pub fn names(&self) -> Vec<&'static str> {
        self.order.iter().map(|id| id.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn every_pipeline_quantity_but_b_ext_is_registered() {
        let reg = Registry::new();
        assert_eq!(reg.get("B_eff").unwrap(), QuantityId::BEff);
        assert_eq!(reg.get("torque").unwrap(), QuantityId::Torque);
        assert_eq!(reg.get("exchangemask").unwrap(), QuantityId::ExchangeMask);
        assert_eq!(reg.names().len(), QuantityId::ALL.len() - 1);

        let err = reg.get("B_ext").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(reg.get("nonexistent").is_err());
    }
}
