//! Resource limits applied while parsing and executing scripts.
//!
//! The defaults are the consensus values. Hosts may tighten them (for example
//! to bound the work done for a single mempool submission) and may load them
//! from their own configuration files, every field falls back to its default
//! when omitted.

use crate::constants::{
    MAX_OPS_PER_SCRIPT, MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_SIZE, MAX_STACK_SIZE,
};
use serde::{Deserialize, Serialize};

/// Budget for a single script-pair validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLimits {
    /// Maximum script length in bytes (consensus: 10 000).
    #[serde(default = "default_max_script_size")]
    pub max_script_size: usize,

    /// Maximum size of a single pushed element (consensus: 520).
    #[serde(default = "default_max_element_size")]
    pub max_element_size: usize,

    /// Maximum number of non-push operations per script, counted whether or
    /// not the operation is executed (consensus: 201).
    #[serde(default = "default_max_ops_per_script")]
    pub max_ops_per_script: usize,

    /// Maximum combined height of the main and alt stacks (consensus: 1000).
    #[serde(default = "default_max_stack_size")]
    pub max_stack_size: usize,

    /// Maximum number of simultaneously open OP_IF/OP_NOTIF frames.
    ///
    /// Each frame costs at least one counted operation, so the consensus op
    /// limit already bounds it; a lower value only matters for hosts that
    /// raise `max_ops_per_script`.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Maximum number of executed operations across both scripts. `None`
    /// disables the step budget.
    #[serde(default)]
    pub max_steps: Option<usize>,
}

fn default_max_script_size() -> usize {
    MAX_SCRIPT_SIZE
}

fn default_max_element_size() -> usize {
    MAX_SCRIPT_ELEMENT_SIZE
}

fn default_max_ops_per_script() -> usize {
    MAX_OPS_PER_SCRIPT
}

fn default_max_stack_size() -> usize {
    MAX_STACK_SIZE
}

fn default_max_nesting_depth() -> usize {
    MAX_OPS_PER_SCRIPT
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_script_size: default_max_script_size(),
            max_element_size: default_max_element_size(),
            max_ops_per_script: default_max_ops_per_script(),
            max_stack_size: default_max_stack_size(),
            max_nesting_depth: default_max_nesting_depth(),
            max_steps: None,
        }
    }
}

impl ScriptLimits {
    /// Consensus limits plus a cap on the number of executed operations.
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            max_steps: Some(max_steps),
            ..Default::default()
        }
    }
}
