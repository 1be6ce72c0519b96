//! Runtime checking of node input/output contracts.

use crate::errors::NodeError;
use crate::frame::PIPELINE_END_KEY;
use crate::nodes::NodeOutput;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// How strictly declared node contracts are checked while a tick runs.
///
/// Assembly-time chain validation and the check that every declared output
/// was produced always happen; this governs the remaining checks inside
/// `run_tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractEnforcement {
    /// Nodes may read any frame key and write undeclared outputs.
    #[default]
    Off,
    /// Undeclared outputs are logged.
    Warn,
    /// Undeclared reads and undeclared outputs fail the tick.
    Strict,
}

impl ContractEnforcement {
    /// Returns true if undeclared reads are rejected.
    #[must_use]
    pub fn restricts_inputs(self) -> bool {
        matches!(self, Self::Strict)
    }

    /// Checks produced outputs against the declared ones.
    ///
    /// Every declared output other than `pipeline_end` must be produced in
    /// all modes. Undeclared extras are ignored when `Off`, logged when
    /// `Warn` and rejected when `Strict`. The reserved `pipeline_end` key may
    /// always be written.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolation` when a declared output is missing, or in
    /// strict mode when an undeclared output is produced.
    pub fn check_outputs(
        self,
        node: &str,
        declared: &[String],
        produced: &NodeOutput,
    ) -> Result<(), NodeError> {
        let mut missing: Vec<String> = declared
            .iter()
            .filter(|key| key.as_str() != PIPELINE_END_KEY && !produced.contains_key(key.as_str()))
            .cloned()
            .collect();
        let mut undeclared: Vec<String> = match self {
            Self::Off => Vec::new(),
            Self::Warn | Self::Strict => produced
                .keys()
                .filter(|key| !declared.contains(key) && key.as_str() != PIPELINE_END_KEY)
                .cloned()
                .collect(),
        };
        missing.sort();
        undeclared.sort();

        if !missing.is_empty() || (self == Self::Strict && !undeclared.is_empty()) {
            return Err(NodeError::ContractViolation { missing, undeclared });
        }
        if !undeclared.is_empty() {
            warn!(
                node = %node,
                undeclared = ?undeclared,
                "Node produced outputs it does not declare"
            );
        }
        Ok(())
    }
}

impl fmt::Display for ContractEnforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Off => "off",
            Self::Warn => "warn",
            Self::Strict => "strict",
        };
        f.write_str(s)
    }
}

impl FromStr for ContractEnforcement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "warn" => Ok(Self::Warn),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown enforcement mode '{other}' (expected off, warn or strict)")),
        }
    }
}
