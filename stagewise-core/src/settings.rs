//! Configuration for core model construction.

use crate::combine::CombineRule;

/// Settings applied when building a core model.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSettings {
    /// Value the caller uses for an absent bound.
    /// Carried through so consumers can recognise free rows and columns.
    pub infinity: f64,

    /// Merge policy used by every node built against the core.
    pub combine_rule: CombineRule,
}

impl Default for CoreSettings {
    fn default() -> Self {
        // Allow environment variable override for the infinity value
        let infinity = std::env::var("STAGEWISE_INFINITY")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(f64::INFINITY);

        // STAGEWISE_COMBINE=additive switches the merge policy
        let combine_rule = std::env::var("STAGEWISE_COMBINE")
            .ok()
            .and_then(|s| s.parse::<CombineRule>().ok())
            .unwrap_or_default();

        Self {
            infinity,
            combine_rule,
        }
    }
}

impl CoreSettings {
    /// Set the infinity value.
    pub fn with_infinity(mut self, infinity: f64) -> Self {
        self.infinity = infinity;
        self
    }

    /// Set the merge policy.
    pub fn with_combine_rule(mut self, rule: CombineRule) -> Self {
        self.combine_rule = rule;
        self
    }
}
