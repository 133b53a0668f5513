//! Resolver configuration

use serde::{Deserialize, Serialize};

use crate::error::{ClockError, Result};
use crate::types::constants;

/// Settings for the fixed-point clock resolver
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum number of full passes over all processes
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Run a cycle search when resolution does not converge
    #[serde(default = "default_diagnose_cycles")]
    pub diagnose_cycles: bool,
}

fn default_max_iterations() -> u32 {
    constants::CLOCK_CALCULATION_LIMIT
}

fn default_diagnose_cycles() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            diagnose_cycles: default_diagnose_cycles(),
        }
    }
}

impl ResolverConfig {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_cycle_diagnosis(mut self, enabled: bool) -> Self {
        self.diagnose_cycles = enabled;
        self
    }

    /// Reject values the resolver cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ClockError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
