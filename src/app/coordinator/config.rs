//! Configuration for a scheduler run

use serde::{Deserialize, Serialize};

use crate::app::models::CollisionPolicy;
use crate::constants::transfer;

/// Configuration for one run of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum number of transfers in flight at once
    pub concurrency: usize,
    /// What to do when two addresses map to the same target
    pub collision_policy: CollisionPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: transfer::DEFAULT_CONCURRENCY,
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Set the concurrency limit
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the collision policy
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("Concurrency limit must be greater than 0".to_string());
        }
        Ok(())
    }
}
