// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Session configuration
//!
//! One immutable [`WorldConfig`] is built at session start and handed by
//! reference to every component. Derived caches are invalidated through
//! generation counters, never by toggling flags on a shared object.

use crate::error::ConfigError;
use crate::messages::Severity;
use serde::{Deserialize, Serialize};

/// When permanent-tier types are demoted to the reclaimable tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemotionMode {
    /// Nothing is ever demoted; every resolved type stays permanent
    Disabled,
    /// Continuous sessions: demote any eligible type added since the last sweep
    Incremental,
    /// Batch sessions: additionally require the type to be emitted and fully woven
    Batch,
}

/// How aggressively reclaimable types are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReclaimPolicy {
    /// Unreachable reclaimable types are dropped on every collection
    Weak,
    /// Unreachable reclaimable types are dropped only under memory pressure
    Soft,
    /// Never drop anything
    Strong,
}

/// Resolution of two declare-precedence statements ordering the same pair
/// of aspects differently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictPolicy {
    /// Report the conflict and keep the most recently observed ordering
    LastWins,
    /// Report the conflict and treat the pair as unordered
    Reject,
}

/// Severities for the lint checks the engine performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// A type named in a pattern or signature could not be found
    pub cant_find_type: Severity,
    /// A fully qualified, wildcard-free name in a pattern matches no type
    pub invalid_absolute_type_name: Severity,
    /// Two declare-precedence statements disagree
    pub precedence_conflict: Severity,
    /// A call pointcut names a declaring type the target method is not declared in
    pub unmatched_super_type_in_call: Severity,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            cant_find_type: Severity::Error,
            invalid_absolute_type_name: Severity::Warning,
            precedence_conflict: Severity::Error,
            unmatched_super_type_in_call: Severity::Ignore,
        }
    }
}

/// Immutable configuration of one weaving session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Classify types declaring type variables as raw/generic pairs
    pub generics_mode: bool,
    /// Demotion strategy for the permanent tier
    pub demotion: DemotionMode,
    /// Reclamation strategy for the reclaimable tier
    pub reclaim_policy: ReclaimPolicy,
    /// Whether pointcuts are pre-filtered per enclosing type
    pub fast_match: bool,
    /// Handling of disagreeing declare-precedence statements
    pub conflict_policy: ConflictPolicy,
    pub lint: LintConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            generics_mode: true,
            demotion: DemotionMode::Incremental,
            reclaim_policy: ReclaimPolicy::Soft,
            fast_match: true,
            conflict_policy: ConflictPolicy::LastWins,
            lint: LintConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Configuration for a one-shot batch build
    pub fn batch() -> Self {
        Self {
            demotion: DemotionMode::Batch,
            ..Default::default()
        }
    }

    /// Configuration that keeps every resolved type alive
    pub fn retain_all() -> Self {
        Self {
            demotion: DemotionMode::Disabled,
            reclaim_policy: ReclaimPolicy::Strong,
            ..Default::default()
        }
    }

    pub fn with_generics_mode(mut self, enabled: bool) -> Self {
        self.generics_mode = enabled;
        self
    }

    pub fn with_demotion(mut self, mode: DemotionMode) -> Self {
        self.demotion = mode;
        self
    }

    pub fn with_reclaim_policy(mut self, policy: ReclaimPolicy) -> Self {
        self.reclaim_policy = policy;
        self
    }

    pub fn with_fast_match(mut self, enabled: bool) -> Self {
        self.fast_match = enabled;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_lint(mut self, lint: LintConfig) -> Self {
        self.lint = lint;
        self
    }

    /// Whether newly resolved, unexposed types may go to the reclaimable tier
    pub fn reclaimable_tier_enabled(&self) -> bool {
        self.demotion != DemotionMode::Disabled && self.reclaim_policy != ReclaimPolicy::Strong
    }

    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject combinations that cannot work together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.demotion == DemotionMode::Disabled && self.reclaim_policy == ReclaimPolicy::Weak {
            return Err(ConfigError::Invalid("weak reclamation requires demotion to be enabled".to_string()));
        }
        Ok(())
    }
}
